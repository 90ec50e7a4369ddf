//! Length-prefixed bincode framing for the wire protocol.
//!
//! Each frame is a `u32` little-endian payload length followed by one
//! bincode-encoded [`Packet`]. Both peers use these helpers, so the
//! framing can only drift if this file does.

use crate::Packet;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame; anything larger means a corrupt or
/// hostile stream and the connection is dropped.
pub const MAX_FRAME_BYTES: u32 = 64 * 1024;

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = bincode::serialize(packet)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_u32_le(payload.len() as u32).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_packet<R>(reader: &mut R) -> io::Result<Packet>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32_le().await?;
    if len > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        ));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    bincode::deserialize(&payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
