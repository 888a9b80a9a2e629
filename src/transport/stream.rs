//! Framed transport over an async byte stream (stdio, sockets, pipes).
//!
//! `post` is synchronous, so outbound envelopes go through an unbounded queue
//! drained by a writer task. Once that task stops (write error or timeout),
//! every later `post` fails and the channel treats the peer as gone.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::codec::{decode_envelope, encode_envelope, read_frame, write_frame};
use super::Transport;
use crate::channel::Envelope;
use crate::types::{Error, Result, TransportConfig};

/// Outbound half backed by a writer task.
#[derive(Debug, Clone)]
pub struct FramedTransport {
    outbound: mpsc::UnboundedSender<Envelope>,
}

impl Transport for FramedTransport {
    fn post(&self, envelope: Envelope) -> Result<()> {
        self.outbound
            .send(envelope)
            .map_err(|_| Error::transport("frame writer stopped"))
    }
}

/// Spawn the writer task. The returned handle resolves when the transport is
/// dropped (`Ok`) or the stream fails (`Err`).
pub fn spawn_writer<W>(
    writer: W,
    config: &TransportConfig,
) -> (FramedTransport, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let write_timeout = config.write_timeout;
    let handle = tokio::spawn(write_loop(writer, rx, write_timeout));
    (FramedTransport { outbound: tx }, handle)
}

async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    write_timeout: Duration,
) -> Result<()> {
    while let Some(envelope) = rx.recv().await {
        let (msg_type, payload) = match encode_envelope(&envelope) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!("Envelope encoding failed kind={}: {}", envelope.kind, e);
                continue;
            }
        };
        timed_write(&mut writer, msg_type, &payload, write_timeout).await?;
    }
    writer.shutdown().await?;
    Ok(())
}

/// Write a frame with a timeout. A peer that stops reading is treated as gone.
async fn timed_write<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg_type: u8,
    payload: &[u8],
    timeout: Duration,
) -> Result<()> {
    tokio::time::timeout(timeout, write_frame(writer, msg_type, payload))
        .await
        .map_err(|_| {
            tracing::warn!("Write timeout ({:?}), stopping frame writer", timeout);
            Error::transport("write timeout")
        })??;
    Ok(())
}

/// Spawn the reader task, delivering decoded envelopes into `inbox`.
///
/// Malformed frames are logged and skipped. The task ends on EOF, on a framing
/// error, or when the inbox is closed.
pub fn spawn_reader<R, T>(
    reader: R,
    inbox: mpsc::UnboundedSender<T>,
    config: &TransportConfig,
) -> JoinHandle<Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
    T: From<Envelope> + Send + 'static,
{
    let max_frame_bytes = config.max_frame_bytes;
    tokio::spawn(read_loop(reader, inbox, max_frame_bytes))
}

async fn read_loop<R, T>(
    mut reader: R,
    inbox: mpsc::UnboundedSender<T>,
    max_frame_bytes: u32,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    T: From<Envelope>,
{
    while let Some((msg_type, payload)) = read_frame(&mut reader, max_frame_bytes).await? {
        let envelope = match decode_envelope(msg_type, &payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(code = e.code(), "Skipping malformed frame: {}", e);
                continue;
            }
        };
        if inbox.send(T::from(envelope)).is_err() {
            tracing::debug!("Inbox closed, stopping frame reader");
            break;
        }
    }
    tracing::debug!("Frame reader finished");
    Ok(())
}
