//! Connection Manager: owns the live suggestion channel.
//!
//! ## Lifecycle
//!
//! ```text
//! Closed ──open()──► Connecting ──ok──► Open ──close()──► Closing ──► Closed
//!                        │                │
//!                        │                └──peer close / network error──► Closed
//!                        └──fail / timeout──► Failed (terminal)
//! ```
//!
//! The raw channel never leaves this module: callers see `send()`,
//! `next_batch()` and `close()` only. Nothing is queued while the channel is
//! not open; a dropped query is naturally retried by the next debounce window.
//! There is no automatic reconnect.

pub mod memory;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{CorrelationMode, TypeaheadConfig};
use crate::error::{Result, TypeaheadError};
use crate::protocol::{Query, SuggestionBatch, SuggestionRequest, SuggestionResponse};

pub use memory::{MemoryConnector, MemoryService, ServiceConnection};
pub use ws::WsConnector;

// ---------------------------------------------------------------------------
// ChannelState
// ---------------------------------------------------------------------------

/// Lifecycle state of the suggestion channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
    /// Handshake failed. A new manager is needed to retry.
    Failed,
}

impl ChannelState {
    pub fn is_open(self) -> bool {
        self == ChannelState::Open
    }

    pub fn is_terminal(self) -> bool {
        self == ChannelState::Failed
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::Closing => "closing",
            ChannelState::Closed => "closed",
            ChannelState::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// A connected, message-oriented channel carrying JSON text frames.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Next inbound text frame; `None` once the peer has closed.
    ///
    /// Must be cancel-safe: it is polled inside `tokio::select!`.
    async fn recv_text(&mut self) -> Option<Result<String>>;

    async fn close(&mut self) -> Result<()>;
}

/// An in-flight channel handshake, resolved with the connected transport.
pub type Handshake = BoxFuture<'static, Result<Box<dyn Transport>>>;

/// Establishes transports to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn Transport>>;
}

// ---------------------------------------------------------------------------
// ConnectionManager
// ---------------------------------------------------------------------------

/// Owns exactly one logical channel to the suggestion service.
///
/// Constructed per view; dropping it releases the transport even if
/// `close()` was never awaited.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    endpoint: String,
    limit: u32,
    correlate: bool,
    connect_timeout: Duration,
    state: ChannelState,
    state_tx: watch::Sender<ChannelState>,
    transport: Option<Box<dyn Transport>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, config: &TypeaheadConfig) -> Self {
        let (state_tx, _) = watch::channel(ChannelState::Closed);
        Self {
            connector,
            endpoint: config.endpoint.clone(),
            limit: config.limit,
            correlate: config.correlation == CorrelationMode::Sequence,
            connect_timeout: config.connect_timeout(),
            state: ChannelState::Closed,
            state_tx,
            transport: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ChannelState> {
        self.state_tx.subscribe()
    }

    /// Open the channel: Closed → Connecting → Open, or → Failed.
    pub async fn open(&mut self) -> Result<()> {
        let handshake = self.start_open()?;
        let outcome = handshake.await;
        self.finish_open(outcome)
    }

    /// Move to Connecting and return the handshake without awaiting it.
    ///
    /// The returned future borrows nothing from the manager, so an event
    /// loop can poll it next to other work. Hand its output to
    /// `finish_open`; dropping it abandons the attempt, after which
    /// `close()` moves the manager to Closed.
    pub fn start_open(&mut self) -> Result<Handshake> {
        if self.state != ChannelState::Closed {
            return Err(TypeaheadError::InvalidTransition {
                action: "open",
                state: self.state,
            });
        }

        self.set_state(ChannelState::Connecting);
        debug!(endpoint = %self.endpoint, "Opening suggestion channel");

        let connector = Arc::clone(&self.connector);
        let endpoint = self.endpoint.clone();
        let connect_timeout = self.connect_timeout;

        Ok(Box::pin(async move {
            match tokio::time::timeout(connect_timeout, connector.connect(&endpoint)).await {
                Ok(Ok(transport)) => Ok(transport),
                Ok(Err(e @ TypeaheadError::Handshake(_))) => Err(e),
                Ok(Err(e)) => Err(TypeaheadError::Handshake(e.to_string())),
                Err(_) => Err(TypeaheadError::Handshake(format!(
                    "timed out after {}ms",
                    connect_timeout.as_millis()
                ))),
            }
        }))
    }

    /// Apply the outcome of a handshake started with `start_open`.
    ///
    /// Rejected with `InvalidTransition` if the channel was closed while
    /// the handshake was in flight; a late transport is dropped.
    pub fn finish_open(&mut self, outcome: Result<Box<dyn Transport>>) -> Result<()> {
        if self.state != ChannelState::Connecting {
            return Err(TypeaheadError::InvalidTransition {
                action: "finish open",
                state: self.state,
            });
        }

        match outcome {
            Ok(transport) => {
                self.transport = Some(transport);
                self.set_state(ChannelState::Open);
                info!(endpoint = %self.endpoint, "Suggestion channel open");
                Ok(())
            }
            Err(e) => {
                self.set_state(ChannelState::Failed);
                warn!(endpoint = %self.endpoint, error = %e, "Suggestion channel handshake failed");
                Err(e)
            }
        }
    }

    /// Send a query. Never buffers: fails with `ChannelUnavailable` unless open.
    pub async fn send(&mut self, query: &Query) -> Result<()> {
        let unavailable = TypeaheadError::ChannelUnavailable { state: self.state };
        if !self.state.is_open() {
            return Err(unavailable);
        }
        let Some(transport) = self.transport.as_mut() else {
            return Err(unavailable);
        };

        let payload = SuggestionRequest::for_query(query, self.limit, self.correlate).encode()?;
        if let Err(e) = transport.send_text(payload).await {
            let reason = e.to_string();
            self.connection_lost(&reason);
            return Err(TypeaheadError::ChannelFailure(reason));
        }

        debug!(seq = query.seq(), prefix = %query.text(), "Query sent");
        Ok(())
    }

    /// Await the next inbound batch.
    ///
    /// - `Some(Ok(batch))`: a decoded batch (not yet checked for freshness)
    /// - `Some(Err(MalformedMessage))`: undecodable frame, channel stays open
    /// - `Some(Err(ChannelFailure))`: network error, channel is now Closed
    /// - `None`: peer closed the channel, or it was never open
    pub async fn next_batch(&mut self) -> Option<Result<SuggestionBatch>> {
        let transport = self.transport.as_mut()?;

        match transport.recv_text().await {
            Some(Ok(text)) => Some(SuggestionResponse::decode(&text)),
            Some(Err(e @ TypeaheadError::MalformedMessage { .. })) => Some(Err(e)),
            Some(Err(e)) => {
                let reason = e.to_string();
                self.connection_lost(&reason);
                Some(Err(TypeaheadError::ChannelFailure(reason)))
            }
            None => {
                self.connection_lost("closed by service");
                None
            }
        }
    }

    /// Close the channel. Idempotent; safe from any state.
    pub async fn close(&mut self) {
        match self.state {
            ChannelState::Closed | ChannelState::Failed => {
                self.transport = None;
            }
            ChannelState::Open | ChannelState::Connecting | ChannelState::Closing => {
                self.set_state(ChannelState::Closing);
                if let Some(mut transport) = self.transport.take() {
                    if let Err(e) = transport.close().await {
                        debug!(error = %e, "Close handshake failed (ignored)");
                    }
                }
                self.set_state(ChannelState::Closed);
                info!(endpoint = %self.endpoint, "Suggestion channel closed");
            }
        }
    }

    fn connection_lost(&mut self, reason: &str) {
        self.transport = None;
        self.set_state(ChannelState::Closed);
        warn!(endpoint = %self.endpoint, reason, "Suggestion channel lost");
    }

    fn set_state(&mut self, state: ChannelState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if self.transport.take().is_some() {
            debug!(endpoint = %self.endpoint, "Suggestion channel released on drop");
        }
    }
}
