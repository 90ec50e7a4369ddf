//! Fixed obstacle layout, generated once at server start.

use log::info;
use rand::Rng;
use shared::{
    Obstacle, ObstacleKind, MAP_HEIGHT, MAP_WIDTH, MIN_OBSTACLE_DISTANCE, NUM_OBSTACLES,
    SPAWN_MARGIN,
};

/// Rejection-samples `NUM_OBSTACLES` placements inside the spawn margin,
/// keeping at least `MIN_OBSTACLE_DISTANCE` between any two boxes. The
/// map is large enough relative to the obstacle count that sampling
/// always terminates.
pub fn generate<R: Rng>(rng: &mut R) -> Vec<Obstacle> {
    let mut obstacles: Vec<Obstacle> = Vec::with_capacity(NUM_OBSTACLES);

    for _ in 0..NUM_OBSTACLES {
        let kind = ObstacleKind::ALL[rng.gen_range(0..ObstacleKind::ALL.len())];
        let (width, height) = kind.size();

        let min_x = SPAWN_MARGIN;
        let max_x = MAP_WIDTH - width - SPAWN_MARGIN;
        let min_y = SPAWN_MARGIN;
        let max_y = MAP_HEIGHT - height - SPAWN_MARGIN;

        let range_x = (max_x - min_x).max(1);
        let range_y = (max_y - min_y).max(1);

        let placed = loop {
            let candidate = Obstacle::new(
                min_x + rng.gen_range(0..range_x),
                min_y + rng.gen_range(0..range_y),
                kind,
            );
            let padded = candidate.bounds().grow(MIN_OBSTACLE_DISTANCE);
            if !obstacles.iter().any(|o| padded.overlaps(&o.bounds())) {
                break candidate;
            }
        };
        obstacles.push(placed);
    }

    info!("Spawned {} obstacles", obstacles.len());
    obstacles
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_layout_has_full_obstacle_count() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(generate(&mut rng).len(), NUM_OBSTACLES);
    }

    #[test]
    fn test_layout_respects_map_margins() {
        let mut rng = StdRng::seed_from_u64(42);
        for o in generate(&mut rng) {
            assert!(o.x >= SPAWN_MARGIN);
            assert!(o.y >= SPAWN_MARGIN);
            assert!(o.x + o.width <= MAP_WIDTH - SPAWN_MARGIN);
            assert!(o.y + o.height <= MAP_HEIGHT - SPAWN_MARGIN);
        }
    }

    #[test]
    fn test_layout_keeps_minimum_separation() {
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let obstacles = generate(&mut rng);
            for (i, a) in obstacles.iter().enumerate() {
                for b in &obstacles[i + 1..] {
                    let padded = a.bounds().grow(MIN_OBSTACLE_DISTANCE);
                    assert!(
                        !padded.overlaps(&b.bounds()),
                        "obstacles too close: {:?} / {:?}",
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn test_sizes_match_kind() {
        let mut rng = StdRng::seed_from_u64(3);
        for o in generate(&mut rng) {
            assert_eq!((o.width, o.height), o.kind.size());
        }
    }
}
