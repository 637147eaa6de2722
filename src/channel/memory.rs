//! In-process suggestion channel.
//!
//! `MemoryService::new()` returns a connector for the client side and a
//! service handle that accepts one `ServiceConnection` per `connect()`.
//! Used by tests and demos in place of a real WebSocket server.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Connector, Transport};
use crate::error::{Result, TypeaheadError};
use crate::protocol::{SuggestionRequest, SuggestionResponse};

enum Frame {
    Text(String),
    Close,
}

enum Mode {
    Accept(mpsc::UnboundedSender<ServiceConnection>),
    Refuse,
    Stall,
}

/// Client-side connector for the in-memory service.
pub struct MemoryConnector {
    mode: Mode,
}

impl MemoryConnector {
    /// A connector whose handshake is always refused.
    pub fn refusing() -> Self {
        Self { mode: Mode::Refuse }
    }

    /// A connector whose handshake never completes.
    pub fn stalled() -> Self {
        Self { mode: Mode::Stall }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>> {
        let accept_tx = match &self.mode {
            Mode::Accept(tx) => tx,
            Mode::Refuse => {
                return Err(TypeaheadError::Handshake(format!(
                    "connection to {} refused",
                    endpoint
                )))
            }
            Mode::Stall => std::future::pending().await,
        };

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();

        accept_tx
            .send(ServiceConnection {
                requests: request_rx,
                frames: frame_tx,
            })
            .map_err(|_| TypeaheadError::Handshake("service is not listening".into()))?;

        Ok(Box::new(MemoryTransport {
            outbound: request_tx,
            inbound: frame_rx,
        }))
    }
}

struct MemoryTransport {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.outbound
            .send(text)
            .map_err(|_| TypeaheadError::ChannelFailure("service went away".into()))
    }

    async fn recv_text(&mut self) -> Option<Result<String>> {
        match self.inbound.recv().await? {
            Frame::Text(text) => Some(Ok(text)),
            Frame::Close => None,
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.inbound.close();
        Ok(())
    }
}

/// Service side of the in-memory channel.
pub struct MemoryService {
    accepted: mpsc::UnboundedReceiver<ServiceConnection>,
}

impl MemoryService {
    /// Create a listening service and a connector pointed at it.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (MemoryConnector, MemoryService) {
        let (accept_tx, accepted) = mpsc::unbounded_channel();
        (
            MemoryConnector {
                mode: Mode::Accept(accept_tx),
            },
            MemoryService { accepted },
        )
    }

    /// Wait for the next client connection.
    pub async fn accept(&mut self) -> Option<ServiceConnection> {
        self.accepted.recv().await
    }
}

/// One accepted client connection, seen from the service.
pub struct ServiceConnection {
    requests: mpsc::UnboundedReceiver<String>,
    frames: mpsc::UnboundedSender<Frame>,
}

impl ServiceConnection {
    /// Next decoded request; `None` once the client has gone.
    ///
    /// Undecodable requests are skipped, as a real service would.
    pub async fn next_request(&mut self) -> Option<SuggestionRequest> {
        loop {
            let text = self.requests.recv().await?;
            match serde_json::from_str(&text) {
                Ok(request) => return Some(request),
                Err(e) => tracing::debug!(error = %e, "Skipping undecodable request"),
            }
        }
    }

    /// Raw request text, for wire-level assertions.
    pub async fn next_raw_request(&mut self) -> Option<String> {
        self.requests.recv().await
    }

    /// Reply with an uncorrelated suggestion list.
    pub fn reply(&self, suggestions: &[&str]) {
        self.respond(&SuggestionResponse {
            suggestions: Some(suggestions.iter().map(|s| s.to_string()).collect()),
            seq: None,
        });
    }

    /// Reply with a suggestion list echoing `seq`.
    pub fn reply_to(&self, seq: u64, suggestions: &[&str]) {
        self.respond(&SuggestionResponse {
            suggestions: Some(suggestions.iter().map(|s| s.to_string()).collect()),
            seq: Some(seq),
        });
    }

    pub fn respond(&self, response: &SuggestionResponse) {
        if let Ok(text) = serde_json::to_string(response) {
            self.send_raw(&text);
        }
    }

    /// Send an arbitrary text frame.
    pub fn send_raw(&self, text: &str) {
        let _ = self.frames.send(Frame::Text(text.to_string()));
    }

    /// Close the channel from the service side.
    pub fn hang_up(self) {
        let _ = self.frames.send(Frame::Close);
    }
}
