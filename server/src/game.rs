//! Authoritative world state and the resolvers that mutate it.
//!
//! Every mutation funnels through the single server loop in
//! [`crate::network`], so none of these methods need locking; each one
//! observes and updates a consistent view of the whole player set.

use log::info;
use rand::seq::IteratorRandom;
use shared::{
    hitboxes_overlap, Direction, Obstacle, Packet, Player, Rect, GAME_DURATION_SECONDS,
    HITBOX_PADDING, MAP_HEIGHT, MAP_WIDTH, PLAYER_SIZE, PLAYER_SPEED, SPAWN_MARGIN,
};
use std::collections::BTreeMap;

/// Match lifecycle. `Waiting` collects readiness, `Running` counts down,
/// `Over` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Running,
    Over,
}

#[derive(Debug, Clone)]
pub struct GameState {
    /// Keyed by player id. A BTreeMap keeps every scan (tag search,
    /// separation, winner) in ascending id order.
    players: BTreeMap<u32, Player>,
    obstacles: Vec<Obstacle>,
    phase: Phase,
    remaining_seconds: u32,
    winner: Option<u32>,
}

impl GameState {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self {
            players: BTreeMap::new(),
            obstacles,
            phase: Phase::Waiting,
            remaining_seconds: GAME_DURATION_SECONDS,
            winner: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn winner(&self) -> Option<u32> {
        self.winner
    }

    pub fn player(&self, player_id: u32) -> Option<&Player> {
        self.players.get(&player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Registers a new player on a staggered spawn, clamped into the map
    /// for late joiners.
    pub fn add_player(&mut self, player_id: u32) {
        let offset = SPAWN_MARGIN + player_id as i32 * 40;
        let x = offset.clamp(0, MAP_WIDTH - PLAYER_SIZE);
        let y = offset.clamp(0, MAP_HEIGHT - PLAYER_SIZE);

        let player = Player::new(player_id, x, y);
        info!("Added player {} at ({}, {})", player_id, x, y);
        self.players.insert(player_id, player);
    }

    /// Drops a player from the registry. A departing tagger is not
    /// replaced; the match simply continues without one.
    pub fn remove_player(&mut self, player_id: u32) {
        if self.players.remove(&player_id).is_some() {
            info!("Removed player {}", player_id);
        }
    }

    /// Marks a player ready and starts the match once every connected
    /// player is. No effect once the match has started.
    pub fn set_ready(&mut self, player_id: u32) {
        if self.phase != Phase::Waiting {
            return;
        }
        if let Some(player) = self.players.get_mut(&player_id) {
            player.is_ready = true;
            info!("Player {} is ready", player_id);
        }
        if !self.players.is_empty() && self.players.values().all(|p| p.is_ready) {
            self.start_match();
        }
    }

    fn start_match(&mut self) {
        self.phase = Phase::Running;
        self.remaining_seconds = GAME_DURATION_SECONDS;
        self.winner = None;
        for player in self.players.values_mut() {
            player.score = 0;
            player.is_tagger = false;
        }
        if let Some(tagger) = self.players.values_mut().choose(&mut rand::thread_rng()) {
            tagger.is_tagger = true;
            info!("All players ready; player {} starts as the tagger", tagger.id);
        }
    }

    /// Applies one movement command. Outside `Running` this is a silent
    /// no-op; the peer is simply early or late.
    pub fn apply_move(&mut self, player_id: u32, direction: Direction) {
        if self.phase != Phase::Running {
            return;
        }
        let (target_x, target_y, is_tagger) = match self.players.get(&player_id) {
            Some(player) => {
                let (dx, dy) = direction.delta();
                (
                    player.x + dx * PLAYER_SPEED,
                    player.y + dy * PLAYER_SPEED,
                    player.is_tagger,
                )
            }
            None => return,
        };

        self.try_move(player_id, target_x, target_y);

        // Tag and push-apart run on every movement attempt; if the move
        // was rejected they only matter when an overlap already existed.
        if is_tagger {
            self.resolve_tag(player_id);
        }
        self.separate_from_others(player_id);
    }

    /// Movement and collision resolver: clamps the target into the map,
    /// rejects it wholesale on any obstacle overlap, commits otherwise.
    /// There is deliberately no per-axis sliding fallback.
    pub fn try_move(&mut self, player_id: u32, target_x: i32, target_y: i32) -> bool {
        let clamped_x = target_x.clamp(0, MAP_WIDTH - PLAYER_SIZE);
        let clamped_y = target_y.clamp(0, MAP_HEIGHT - PLAYER_SIZE);

        // Only the moving box is padded; obstacles keep their full extents.
        let hitbox =
            Rect::new(clamped_x, clamped_y, PLAYER_SIZE, PLAYER_SIZE).shrink(HITBOX_PADDING);
        if self.obstacles.iter().any(|o| hitbox.overlaps(&o.bounds())) {
            return false;
        }

        match self.players.get_mut(&player_id) {
            Some(player) => {
                player.x = clamped_x;
                player.y = clamped_y;
                true
            }
            None => false,
        }
    }

    /// Transfers the tag to the first overlapping non-tagger in ascending
    /// id order; at most one transfer per move event.
    fn resolve_tag(&mut self, tagger_id: u32) {
        let tagger = match self.players.get(&tagger_id) {
            Some(p) if p.is_tagger => p.clone(),
            _ => return,
        };

        let target_id = self
            .players
            .values()
            .find(|other| {
                other.id != tagger_id && !other.is_tagger && hitboxes_overlap(&tagger, other)
            })
            .map(|other| other.id);

        if let Some(target_id) = target_id {
            if let Some(p) = self.players.get_mut(&tagger_id) {
                p.score += 1;
                p.is_tagger = false;
            }
            if let Some(p) = self.players.get_mut(&target_id) {
                p.is_tagger = true;
            }
            info!("Player {} tagged player {}", tagger_id, target_id);
        }
    }

    /// Pushes the mover and any player it overlaps apart along the axis
    /// of smaller overlap, splitting the correction between them. Both
    /// corrected positions are validated independently, so one side of a
    /// pair can stay pinned while the other gives way.
    fn separate_from_others(&mut self, mover_id: u32) {
        let other_ids: Vec<u32> = self
            .players
            .keys()
            .copied()
            .filter(|&id| id != mover_id)
            .collect();

        for other_id in other_ids {
            // Re-read positions each pair; an earlier push may have moved the mover.
            let (mover, other) = match (self.players.get(&mover_id), self.players.get(&other_id)) {
                (Some(m), Some(o)) => (m.clone(), o.clone()),
                _ => continue,
            };
            if !hitboxes_overlap(&mover, &other) {
                continue;
            }

            let a = mover.hitbox();
            let b = other.hitbox();
            let overlap_x = (a.x + a.w).min(b.x + b.w) - a.x.max(b.x);
            let overlap_y = (a.y + a.h).min(b.y + b.h) - a.y.max(b.y);

            let mut mover_target = (mover.x, mover.y);
            let mut other_target = (other.x, other.y);

            if overlap_x < overlap_y {
                let push = (overlap_x + 1) / 2;
                if mover.x < other.x {
                    mover_target.0 -= push;
                    other_target.0 += push;
                } else {
                    mover_target.0 += push;
                    other_target.0 -= push;
                }
            } else {
                let push = (overlap_y + 1) / 2;
                if mover.y < other.y {
                    mover_target.1 -= push;
                    other_target.1 += push;
                } else {
                    mover_target.1 += push;
                    other_target.1 -= push;
                }
            }

            self.try_move(mover_id, mover_target.0, mover_target.1);
            self.try_move(other_id, other_target.0, other_target.1);
        }
    }

    /// One 1 Hz tick of the countdown; only meaningful while `Running`.
    pub fn advance_clock(&mut self) {
        if self.phase == Phase::Running {
            self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        }
    }

    /// Ends the match: the strictly highest score wins, a tie for the
    /// maximum leaves no winner.
    pub fn finish_match(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.winner = self.compute_winner();
        self.phase = Phase::Over;
        match self.winner {
            Some(id) => info!("Game over; player {} wins", id),
            None => info!("Game over; no winner"),
        }
    }

    fn compute_winner(&self) -> Option<u32> {
        let mut best: Option<(u32, u32)> = None; // (score, id)
        let mut tie = false;
        for player in self.players.values() {
            match best {
                None => {
                    best = Some((player.score, player.id));
                }
                Some((top, _)) if player.score > top => {
                    best = Some((player.score, player.id));
                    tie = false;
                }
                Some((top, _)) if player.score == top => {
                    tie = true;
                }
                _ => {}
            }
        }
        match best {
            Some((_, id)) if !tie => Some(id),
            _ => None,
        }
    }

    /// Atomic copy of the world for broadcasting.
    pub fn snapshot(&self) -> Packet {
        Packet::Snapshot {
            players: self.players.values().cloned().collect(),
            obstacles: self.obstacles.clone(),
            remaining_seconds: self.remaining_seconds,
            game_over: self.phase == Phase::Over,
            winner: self.winner,
            game_started: self.phase != Phase::Waiting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ObstacleKind;

    fn obstacle(x: i32, y: i32, width: i32, height: i32) -> Obstacle {
        Obstacle {
            x,
            y,
            width,
            height,
            kind: ObstacleKind::Crate,
        }
    }

    /// Two players, both readied, match running.
    fn running_pair() -> GameState {
        let mut state = GameState::new(Vec::new());
        state.add_player(0);
        state.add_player(1);
        state.set_ready(0);
        state.set_ready(1);
        assert_eq!(state.phase(), Phase::Running);
        state
    }

    fn place(state: &mut GameState, id: u32, x: i32, y: i32) {
        let player = state.players.get_mut(&id).unwrap();
        player.x = x;
        player.y = y;
    }

    fn make_tagger(state: &mut GameState, id: u32) {
        for player in state.players.values_mut() {
            player.is_tagger = player.id == id;
        }
    }

    fn tagger_count(state: &GameState) -> usize {
        state.players().filter(|p| p.is_tagger).count()
    }

    #[test]
    fn test_add_player_staggered_spawn() {
        let mut state = GameState::new(Vec::new());
        state.add_player(0);
        state.add_player(1);

        assert_eq!((state.player(0).unwrap().x, state.player(0).unwrap().y), (35, 35));
        assert_eq!((state.player(1).unwrap().x, state.player(1).unwrap().y), (75, 75));
    }

    #[test]
    fn test_add_player_spawn_clamped_for_late_joiners() {
        let mut state = GameState::new(Vec::new());
        state.add_player(30);

        let p = state.player(30).unwrap();
        assert_eq!(p.x, MAP_WIDTH - PLAYER_SIZE);
        assert_eq!(p.y, MAP_HEIGHT - PLAYER_SIZE);
    }

    #[test]
    fn test_all_ready_starts_match() {
        // Scenario A.
        let state = running_pair();

        assert_eq!(state.remaining_seconds(), GAME_DURATION_SECONDS);
        assert_eq!(tagger_count(&state), 1);
        assert!(state.players().all(|p| p.score == 0));
    }

    #[test]
    fn test_match_does_not_start_until_everyone_is_ready() {
        let mut state = GameState::new(Vec::new());
        state.add_player(0);
        state.add_player(1);
        state.set_ready(0);

        assert_eq!(state.phase(), Phase::Waiting);
        assert_eq!(tagger_count(&state), 0);
    }

    #[test]
    fn test_empty_registry_never_starts() {
        let mut state = GameState::new(Vec::new());
        state.set_ready(0);
        assert_eq!(state.phase(), Phase::Waiting);
    }

    #[test]
    fn test_ready_is_idempotent_once_running() {
        let mut state = running_pair();
        state.players.get_mut(&0).unwrap().score = 3;

        state.set_ready(0);
        state.set_ready(1);

        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.player(0).unwrap().score, 3);
        assert_eq!(tagger_count(&state), 1);
    }

    #[test]
    fn test_move_ignored_while_waiting() {
        let mut state = GameState::new(Vec::new());
        state.add_player(0);
        let before = (state.player(0).unwrap().x, state.player(0).unwrap().y);

        state.apply_move(0, Direction::Right);

        let after = (state.player(0).unwrap().x, state.player(0).unwrap().y);
        assert_eq!(before, after);
    }

    #[test]
    fn test_move_ignored_once_over() {
        let mut state = running_pair();
        place(&mut state, 0, 500, 300);
        state.remaining_seconds = 1;
        state.advance_clock();
        state.finish_match();

        state.apply_move(0, Direction::Right);
        assert_eq!(state.player(0).unwrap().x, 500);
    }

    #[test]
    fn test_move_applies_player_speed() {
        let mut state = running_pair();
        place(&mut state, 0, 500, 300);
        place(&mut state, 1, 100, 100);

        state.apply_move(0, Direction::Right);
        assert_eq!(state.player(0).unwrap().x, 500 + PLAYER_SPEED);

        state.apply_move(0, Direction::Up);
        assert_eq!(state.player(0).unwrap().y, 300 - PLAYER_SPEED);
    }

    #[test]
    fn test_move_clamped_at_map_edges() {
        let mut state = running_pair();
        place(&mut state, 0, 2, 2);
        place(&mut state, 1, 500, 500);

        state.apply_move(0, Direction::Left);
        state.apply_move(0, Direction::Up);
        let p = state.player(0).unwrap();
        assert_eq!((p.x, p.y), (0, 0));

        place(&mut state, 0, MAP_WIDTH - PLAYER_SIZE - 2, MAP_HEIGHT - PLAYER_SIZE - 2);
        state.apply_move(0, Direction::Right);
        state.apply_move(0, Direction::Down);
        let p = state.player(0).unwrap();
        assert_eq!((p.x, p.y), (MAP_WIDTH - PLAYER_SIZE, MAP_HEIGHT - PLAYER_SIZE));
    }

    #[test]
    fn test_blocked_move_is_fully_rejected() {
        // Scenario B: no sliding, position left unchanged.
        let mut state = GameState::new(vec![obstacle(103, 100, 50, 50)]);
        state.add_player(0);
        state.set_ready(0);
        place(&mut state, 0, 100, 100);

        state.apply_move(0, Direction::Right);

        let p = state.player(0).unwrap();
        assert_eq!((p.x, p.y), (100, 100));
    }

    #[test]
    fn test_obstacle_test_uses_padded_player_box_only() {
        // The player's box is shrunk by the padding, so a target whose
        // full box grazes the obstacle by less than the padding passes.
        let mut state = GameState::new(vec![obstacle(200, 0, 50, 50)]);
        state.add_player(0);
        state.set_ready(0);
        place(&mut state, 0, 168, 0);

        // Padded box at x=170 spans [175, 195); obstacle starts at 200.
        assert!(state.try_move(0, 170, 0));
        // At x=180 the padded box spans [185, 205) and hits the obstacle.
        assert!(!state.try_move(0, 180, 0));
        let p = state.player(0).unwrap();
        assert_eq!((p.x, p.y), (170, 0));
    }

    #[test]
    fn test_tag_transfer_and_score() {
        let mut state = running_pair();
        make_tagger(&mut state, 0);
        place(&mut state, 0, 500, 300);
        place(&mut state, 1, 500 + PLAYER_SPEED + 10, 300);

        state.apply_move(0, Direction::Right);

        let mover = state.player(0).unwrap();
        let target = state.player(1).unwrap();
        assert!(!mover.is_tagger);
        assert!(target.is_tagger);
        assert_eq!(mover.score, 1);
        assert_eq!(target.score, 0);
        assert_eq!(tagger_count(&state), 1);
    }

    #[test]
    fn test_at_most_one_tag_per_move() {
        let mut state = running_pair();
        state.add_player(2);
        make_tagger(&mut state, 2);
        // Both runners overlap the tagger; ascending id order picks 0.
        place(&mut state, 0, 300, 300);
        place(&mut state, 1, 302, 302);
        place(&mut state, 2, 304, 300);

        state.apply_move(2, Direction::Left);

        assert!(state.player(0).unwrap().is_tagger);
        assert!(!state.player(1).unwrap().is_tagger);
        assert_eq!(state.player(2).unwrap().score, 1);
        assert_eq!(tagger_count(&state), 1);
    }

    #[test]
    fn test_non_tagger_move_never_tags() {
        let mut state = running_pair();
        make_tagger(&mut state, 1);
        place(&mut state, 0, 300, 300);
        place(&mut state, 1, 302, 300);

        state.apply_move(0, Direction::Right);

        assert!(state.player(1).unwrap().is_tagger);
        assert_eq!(state.player(0).unwrap().score, 0);
        assert_eq!(state.player(1).unwrap().score, 0);
    }

    #[test]
    fn test_separation_pushes_both_apart() {
        // Scenario C: overlap on x resolves along x, split between both.
        let mut state = running_pair();
        place(&mut state, 0, 500, 300);
        place(&mut state, 1, 505, 300);

        state.separate_from_others(0);

        let a = state.player(0).unwrap();
        let b = state.player(1).unwrap();
        assert!(a.x < 500);
        assert!(b.x > 505);
        assert!((b.x - a.x) >= PLAYER_SIZE - 2 * HITBOX_PADDING);
        assert!(!hitboxes_overlap(a, b));
        assert_eq!(a.y, 300);
        assert_eq!(b.y, 300);
    }

    #[test]
    fn test_separation_resolves_smaller_overlap_axis() {
        let mut state = running_pair();
        // Deeper overlap on x than on y, so the push goes along y.
        place(&mut state, 0, 500, 300);
        place(&mut state, 1, 502, 310);

        state.separate_from_others(0);

        let a = state.player(0).unwrap();
        let b = state.player(1).unwrap();
        assert_eq!(a.x, 500);
        assert_eq!(b.x, 502);
        assert!(a.y < 300);
        assert!(b.y > 310);
    }

    #[test]
    fn test_separation_partial_when_one_side_is_blocked() {
        // The pushed neighbour sits against an obstacle, so only the
        // mover's half of the correction lands.
        let mut state = GameState::new(vec![obstacle(537, 280, 50, 70)]);
        state.add_player(0);
        state.add_player(1);
        state.set_ready(0);
        state.set_ready(1);
        place(&mut state, 0, 500, 300);
        place(&mut state, 1, 505, 300);

        state.separate_from_others(0);

        let a = state.player(0).unwrap();
        let b = state.player(1).unwrap();
        assert!(a.x < 500);
        assert_eq!(b.x, 505);
    }

    #[test]
    fn test_countdown_and_strict_winner() {
        // Scenario D, decisive half.
        let mut state = running_pair();
        state.players.get_mut(&0).unwrap().score = 5;
        state.players.get_mut(&1).unwrap().score = 2;
        state.remaining_seconds = 1;

        state.advance_clock();
        assert_eq!(state.remaining_seconds(), 0);
        state.finish_match();

        assert_eq!(state.phase(), Phase::Over);
        assert_eq!(state.winner(), Some(0));
    }

    #[test]
    fn test_tie_leaves_no_winner() {
        // Scenario D, tied half.
        let mut state = running_pair();
        state.players.get_mut(&0).unwrap().score = 3;
        state.players.get_mut(&1).unwrap().score = 3;
        state.remaining_seconds = 1;

        state.advance_clock();
        state.finish_match();

        assert_eq!(state.phase(), Phase::Over);
        assert_eq!(state.winner(), None);
    }

    #[test]
    fn test_clock_is_a_noop_outside_running() {
        let mut state = GameState::new(Vec::new());
        state.add_player(0);

        state.advance_clock();
        assert_eq!(state.remaining_seconds(), GAME_DURATION_SECONDS);

        state.finish_match();
        assert_eq!(state.phase(), Phase::Waiting);
    }

    #[test]
    fn test_tagger_disconnect_leaves_zero_taggers() {
        // Scenario E.
        let mut state = running_pair();
        let tagger_id = state.players().find(|p| p.is_tagger).unwrap().id;

        state.remove_player(tagger_id);

        assert_eq!(state.player_count(), 1);
        assert_eq!(tagger_count(&state), 0);

        // The world keeps functioning without a tagger.
        let survivor = state.players().next().unwrap().id;
        state.apply_move(survivor, Direction::Down);
        state.advance_clock();
        match state.snapshot() {
            Packet::Snapshot { players, .. } => {
                assert_eq!(players.len(), 1);
                assert!(players.iter().all(|p| !p.is_tagger));
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }

    #[test]
    fn test_positions_stay_in_bounds_under_pressure() {
        let mut state = running_pair();
        place(&mut state, 1, 500, 500);
        place(&mut state, 0, 3, 3);

        for _ in 0..50 {
            state.apply_move(0, Direction::Left);
            state.apply_move(0, Direction::Up);
        }

        for p in state.players() {
            assert!(p.x >= 0 && p.x <= MAP_WIDTH - PLAYER_SIZE);
            assert!(p.y >= 0 && p.y <= MAP_HEIGHT - PLAYER_SIZE);
        }
    }

    #[test]
    fn test_snapshot_reflects_phase_flags() {
        let mut state = GameState::new(Vec::new());
        state.add_player(0);

        match state.snapshot() {
            Packet::Snapshot {
                game_started,
                game_over,
                winner,
                remaining_seconds,
                ..
            } => {
                assert!(!game_started);
                assert!(!game_over);
                assert_eq!(winner, None);
                assert_eq!(remaining_seconds, GAME_DURATION_SECONDS);
            }
            other => panic!("unexpected packet: {:?}", other),
        }

        state.set_ready(0);
        state.remaining_seconds = 1;
        state.advance_clock();
        state.finish_match();

        match state.snapshot() {
            Packet::Snapshot {
                game_started,
                game_over,
                winner,
                ..
            } => {
                assert!(game_started);
                assert!(game_over);
                assert_eq!(winner, Some(0));
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }
}
