//! Frame codec for the envelope wire protocol.
//!
//! Frame format:
//! ```text
//! ┌──────────┬──────────┬────────────────────────┐
//! │ len (4B) │ type(1B) │   JSON envelope        │
//! │ u32 BE   │ u8       │                        │
//! └──────────┴──────────┴────────────────────────┘
//! ```
//! Length = sizeof(type byte) + sizeof(payload), NOT including the 4-byte prefix.
//! The type byte repeats the envelope class so a peer can route a frame
//! before parsing it.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::channel::{Envelope, EnvelopeClass};
use crate::types::{Error, Result};

/// Message type: event or fire-and-forget send.
pub const MSG_EVENT: u8 = 0x01;
/// Message type: request expecting a response.
pub const MSG_REQUEST: u8 = 0x02;
/// Message type: response to a request.
pub const MSG_RESPONSE: u8 = 0x03;

fn class_byte(class: EnvelopeClass) -> u8 {
    match class {
        EnvelopeClass::Event => MSG_EVENT,
        EnvelopeClass::Request => MSG_REQUEST,
        EnvelopeClass::Response => MSG_RESPONSE,
    }
}

/// Encode an envelope into `(msg_type, payload_bytes)`.
pub fn encode_envelope(envelope: &Envelope) -> Result<(u8, Vec<u8>)> {
    let payload = serde_json::to_vec(envelope)?;
    Ok((class_byte(envelope.class()), payload))
}

/// Decode a frame body, checking the type byte against the envelope class.
pub fn decode_envelope(msg_type: u8, payload: &[u8]) -> Result<Envelope> {
    let envelope: Envelope = serde_json::from_slice(payload)?;
    let expected = class_byte(envelope.class());
    if msg_type != expected {
        return Err(Error::validation(format!(
            "Frame type 0x{:02X} does not match envelope kind={} (expected 0x{:02X})",
            msg_type, envelope.kind, expected
        )));
    }
    Ok(envelope)
}

/// Read one frame from the stream.
///
/// Returns `(msg_type, payload_bytes)`. Returns `None` on clean EOF.
/// `max_frame_bytes` caps the maximum accepted payload size.
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    max_frame_bytes: u32,
) -> std::io::Result<Option<(u8, Vec<u8>)>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let frame_len = u32::from_be_bytes(len_buf);
    if frame_len > max_frame_bytes {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Frame too large: {} bytes", frame_len),
        ));
    }
    if frame_len < 1 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Frame too short: missing type byte",
        ));
    }

    let mut frame_data = vec![0u8; frame_len as usize];
    reader.read_exact(&mut frame_data).await?;

    let msg_type = frame_data[0];
    let payload = frame_data.split_off(1);

    Ok(Some((msg_type, payload)))
}

/// Write one frame to the stream.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg_type: u8,
    payload: &[u8],
) -> std::io::Result<()> {
    let frame_len = u32::try_from(payload.len() + 1).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Frame exceeds u32 length")
    })?;
    writer.write_all(&frame_len.to_be_bytes()).await?;
    writer.write_all(&[msg_type]).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}
