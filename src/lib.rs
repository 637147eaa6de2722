//! Live suggestion ("typeahead") engine.
//!
//! Keeps one persistent channel to a suggestion service, debounces
//! keystrokes into queries, discards stale suggestion batches, and lets the
//! user navigate suggestions without the asynchronous stream overwriting a
//! manual selection. On commit the final query is handed to a
//! [`SearchNavigator`].
//!
//! # Architecture
//!
//! ```text
//! keystrokes ──► DebounceController ──► ConnectionManager ──► service
//!                                                                │
//!  SearchNavigator ◄── commit ── SelectionMachine ◄── SuggestionArbiter
//! ```
//!
//! All components are owned by one [`TypeaheadSession`] task; nothing is
//! shared across tasks.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use typeahead::{Key, TypeaheadConfig, TypeaheadSession, WsConnector};
//!
//! let config = TypeaheadConfig::from_env()?;
//! let session = TypeaheadSession::new(config, Arc::new(WsConnector), |q: &str| {
//!     println!("search for {q}");
//! });
//! let handle = session.spawn();
//! handle.type_text("gola").await;
//! handle.press(Key::ArrowDown).await;
//! handle.press(Key::Enter).await;
//! let outcome = handle.join().await;
//! ```

pub mod arbiter;
pub mod channel;
pub mod config;
pub mod debounce;
pub mod error;
pub mod navigation;
pub mod protocol;
pub mod selection;
pub mod session;

pub use arbiter::SuggestionArbiter;
pub use channel::{
    ChannelState, ConnectionManager, Connector, Handshake, MemoryConnector, MemoryService,
    ServiceConnection, Transport, WsConnector,
};
pub use config::{CorrelationMode, TypeaheadConfig};
pub use debounce::{DebounceController, DebounceOutcome};
pub use error::{Result, TypeaheadError};
pub use navigation::{SearchNavigator, SearchRoute};
pub use protocol::{Correlation, Query, SuggestionBatch, SuggestionRequest, SuggestionResponse};
pub use selection::{Direction, Offer, Origin, SelectionMachine, SelectionMode, SelectionState};
pub use session::{Key, SessionHandle, SessionOutcome, TypeaheadSession, ViewEvent, ViewSnapshot};
