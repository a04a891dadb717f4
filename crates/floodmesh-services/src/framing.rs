//! Async frame I/O: moves `Carrier`s across any byte stream.
//!
//! The encoding lives in `floodmesh_core::wire`; this module only deals with
//! pulling exactly one frame off a stream and pushing one onto it.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use floodmesh_core::wire::{self, WireError, FRAME_PREFIX_LEN};
use floodmesh_core::Carrier;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The transport failed or closed mid-frame. Nothing more can be read.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// A complete frame arrived but its contents were invalid. The stream is
    /// still aligned on the next frame.
    #[error("malformed frame: {0}")]
    Wire(#[from] WireError),
}

impl FrameError {
    /// Whether the stream is unusable after this error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FrameError::Io(_))
    }
}

/// Read one carrier.
///
/// Returns `Ok(None)` when the stream ends cleanly on a frame boundary.
/// Oversized frames are drained from the stream before the error is
/// returned so the next call starts on a fresh frame.
pub async fn read_carrier<R>(reader: &mut R) -> Result<Option<Carrier>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; FRAME_PREFIX_LEN];
    if reader.read(&mut prefix[..1]).await? == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut prefix[1..]).await?;

    let declared = match wire::frame_len(prefix) {
        Ok(len) => len,
        Err(e) => {
            let skip = u64::from(u32::from_be_bytes(prefix));
            let drained =
                tokio::io::copy(&mut (&mut *reader).take(skip), &mut tokio::io::sink()).await?;
            if drained < skip {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
            return Err(e.into());
        }
    };

    let mut body = vec![0u8; declared];
    reader.read_exact(&mut body).await?;
    tracing::trace!(bytes = declared, "frame read");
    Ok(Some(wire::decode_frame(&body)?))
}

/// Write one carrier and flush.
pub async fn write_carrier<W>(writer: &mut W, carrier: &Carrier) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let frame = wire::encode_carrier(carrier)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    tracing::trace!(bytes = frame.len(), "frame written");
    Ok(())
}
