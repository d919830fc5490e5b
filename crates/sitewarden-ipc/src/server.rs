//! Native-messaging server over a byte stream pair (normally stdin/stdout)

use serde::Serialize;
use sitewarden_api::BrowserMessage;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::{IpcError, IpcResult, MAX_OUTBOUND_FRAME, read_frame, write_frame};

/// Duplex native-messaging endpoint.
///
/// A reader task decodes inbound frames into [`BrowserMessage`]s; a writer
/// task drains an outbound queue so senders never block on the pipe.
pub struct NativeMessagingServer {
    outbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    message_rx: Mutex<Option<mpsc::UnboundedReceiver<BrowserMessage>>>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl NativeMessagingServer {
    /// Serve over the process's stdin/stdout
    pub fn stdio() -> Self {
        Self::start(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Serve over an arbitrary reader/writer pair
    pub fn start<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let reader_task = tokio::spawn(read_loop(reader, message_tx));
        let writer_task = tokio::spawn(write_loop(writer, outbound_rx));

        Self {
            outbound_tx,
            message_rx: Mutex::new(Some(message_rx)),
            reader_task,
            writer_task,
        }
    }

    /// Get receiver for inbound messages. Closes when the browser disconnects.
    pub async fn take_message_receiver(&self) -> Option<mpsc::UnboundedReceiver<BrowserMessage>> {
        self.message_rx.lock().await.take()
    }

    /// Queue a message for the browser
    pub fn send<T: Serialize>(&self, message: &T) -> IpcResult<()> {
        let payload = serde_json::to_vec(message)?;
        if payload.len() > MAX_OUTBOUND_FRAME {
            return Err(IpcError::FrameTooLarge {
                size: payload.len(),
                limit: MAX_OUTBOUND_FRAME,
            });
        }

        self.outbound_tx
            .send(payload)
            .map_err(|_| IpcError::ConnectionClosed)
    }

    /// Whether the browser side is still connected
    pub fn is_connected(&self) -> bool {
        !self.reader_task.is_finished() && !self.writer_task.is_finished()
    }

    /// Stop both I/O tasks
    pub fn shutdown(&self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

impl Drop for NativeMessagingServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn read_loop<R>(mut reader: R, message_tx: mpsc::UnboundedSender<BrowserMessage>)
where
    R: AsyncRead + Unpin,
{
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(payload)) => match serde_json::from_slice::<BrowserMessage>(&payload) {
                Ok(message) => {
                    if message_tx.send(message).is_err() {
                        debug!("Message receiver dropped, stopping reader");
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, bytes = payload.len(), "Invalid browser message");
                }
            },
            Ok(None) => {
                debug!("Browser disconnected (EOF)");
                break;
            }
            Err(e) => {
                error!(error = %e, "Failed to read from browser");
                break;
            }
        }
    }
}

async fn write_loop<W>(mut writer: W, mut outbound_rx: mpsc::UnboundedReceiver<Vec<u8>>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(payload) = outbound_rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &payload).await {
            debug!(error = %e, "Write error");
            break;
        }
    }
}
