//! Native-messaging frame codec
//!
//! Each message is a 32-bit length in native byte order followed by that
//! many bytes of UTF-8 JSON. Browsers cap host-to-browser messages at 1 MiB
//! and browser-to-host messages at 64 MiB.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{IpcError, IpcResult};

/// Largest frame the host may send to the browser
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

/// Largest frame the browser may send to the host
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

/// Read one frame. Returns `Ok(None)` on a clean end of stream.
pub async fn read_frame<R>(reader: &mut R) -> IpcResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let size = u32::from_ne_bytes(len_buf) as usize;
    if size > MAX_INBOUND_FRAME {
        return Err(IpcError::FrameTooLarge {
            size,
            limit: MAX_INBOUND_FRAME,
        });
    }

    let mut payload = vec![0u8; size];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            IpcError::ConnectionClosed
        } else {
            IpcError::Io(e)
        }
    })?;

    Ok(Some(payload))
}

/// Write one frame and flush
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> IpcResult<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_OUTBOUND_FRAME {
        return Err(IpcError::FrameTooLarge {
            size: payload.len(),
            limit: MAX_OUTBOUND_FRAME,
        });
    }

    writer.write_all(&(payload.len() as u32).to_ne_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read and decode one JSON message
pub async fn read_message<R, T>(reader: &mut R) -> IpcResult<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    match read_frame(reader).await? {
        Some(payload) => Ok(Some(serde_json::from_slice(&payload)?)),
        None => Ok(None),
    }
}

/// Encode and write one JSON message
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> IpcResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(message)?;
    write_frame(writer, &payload).await
}
