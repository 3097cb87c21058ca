//! Length-prefixed framing: `u32` big-endian payload length, then payload

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use clipr_core::types::MAX_FRAME_SIZE;
use clipr_core::{ClipError, ClipResult};

/// Size of the length prefix
pub const FRAME_HEADER_LEN: usize = 4;

/// Write one frame and flush. No retries.
pub async fn write_frame<W>(w: &mut W, payload: &[u8]) -> ClipResult<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ClipError::FrameTooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    let header = (payload.len() as u32).to_be_bytes();
    w.write_all(&header).await?;
    w.write_all(payload).await?;
    w.flush().await?;
    Ok(())
}

/// Read one frame.
///
/// The declared length is checked against [`MAX_FRAME_SIZE`] before any
/// payload byte is read or allocated.
pub async fn read_frame<R>(r: &mut R) -> ClipResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut filled = 0;
    while filled < FRAME_HEADER_LEN {
        match r.read(&mut header[filled..]).await? {
            0 if filled == 0 => return Err(ClipError::ConnectionClosed),
            0 => return Err(ClipError::UnexpectedEof),
            n => filled += n,
        }
    }

    let size = u32::from_be_bytes(header) as usize;
    if size > MAX_FRAME_SIZE {
        return Err(ClipError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut payload = vec![0u8; size];
    let mut got = 0;
    while got < size {
        match r.read(&mut payload[got..]).await? {
            0 => {
                return Err(ClipError::TruncatedPayload {
                    expected: size,
                    got,
                })
            }
            n => got += n,
        }
    }
    Ok(payload)
}
