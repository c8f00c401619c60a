//! Newline-delimited JSON-RPC over a byte stream pair.
//!
//! One message per line in both directions. Logging must not go to stdout
//! while this transport owns it.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::handler::{RequestContext, RequestHandler, handle_message};
use crate::session::{PeerSession, Session, SessionSlot};

const OUTBOUND_CAPACITY: usize = 1024;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Serves a single client over stdin/stdout, or any reader/writer pair.
pub struct StdioTransport {
    /// Replaces stdin/stdout for the next `serve`.
    io: Mutex<Option<(BoxedReader, BoxedWriter)>>,
    shutdown_tx: watch::Sender<bool>,
}

impl StdioTransport {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            io: Mutex::new(None),
            shutdown_tx,
        }
    }

    /// A transport that serves `reader`/`writer` instead of stdin/stdout.
    pub fn with_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let transport = Self::new();
        *transport.io.lock() = Some((Box::new(reader), Box::new(writer)));
        transport
    }

    /// Serve until EOF or [`shutdown`](Self::shutdown).
    pub async fn serve<H: RequestHandler>(
        &self,
        handler: Arc<H>,
        sessions: SessionSlot,
    ) -> Result<(), TransportError> {
        let io = self.io.lock().take();
        match io {
            Some((reader, writer)) => self.serve_io(reader, writer, handler, sessions).await,
            None => {
                self.serve_io(tokio::io::stdin(), tokio::io::stdout(), handler, sessions)
                    .await
            }
        }
    }

    pub async fn serve_io<R, W, H>(
        &self,
        reader: R,
        mut writer: W,
        handler: Arc<H>,
        sessions: SessionSlot,
    ) -> Result<(), TransportError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
        H: RequestHandler,
    {
        let (peer, mut outbound_rx) = PeerSession::channel(OUTBOUND_CAPACITY);
        let session: Arc<dyn Session> = peer;
        let ctx = RequestContext::new(session.clone());
        sessions.attach(session.clone());
        info!("stdio transport serving session {}", session.id());

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut lines = BufReader::new(reader).lines();

        let result = loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if line.trim().is_empty() {
                                continue;
                            }
                            if let Some(reply) = handle_message(&line, handler.as_ref(), &ctx).await {
                                if let Err(e) = write_line(&mut writer, &reply).await {
                                    break Err(e.into());
                                }
                            }
                        }
                        Ok(None) => {
                            debug!("stdin closed");
                            break Ok(());
                        }
                        Err(e) => {
                            warn!("stdio read error: {e}");
                            break Err(e.into());
                        }
                    }
                }

                Some(notification) = outbound_rx.recv() => {
                    if let Err(e) = write_line(&mut writer, &notification).await {
                        break Err(e.into());
                    }
                }

                _ = stopped(&mut shutdown_rx) => {
                    debug!("stdio transport shutting down");
                    break Ok(());
                }
            }
        };

        sessions.detach(&session);
        handler.session_closed(session.id());
        info!("stdio transport stopped");
        result
    }

    /// Stop serving. Safe to call before, during or after `serve`.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once the shutdown flag is set.
pub(crate) async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stopped| *stopped).await;
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> std::io::Result<()> {
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
