//! Typeahead Session: the owning view's event loop.
//!
//! One tokio task owns every component and multiplexes five sources with
//! `tokio::select!`:
//!
//! | Source              | Handling                                          |
//! |---------------------|---------------------------------------------------|
//! | view events         | input edits, arrow keys, clicks, commit, teardown |
//! | channel handshake   | Connecting to Open or Failed                      |
//! | debounce deadline   | suppress / clear / dispatch a query               |
//! | inbound batches     | freshness check, then offer to the selection      |
//! | response deadline   | optional: give up on an unanswered query          |
//!
//! The handshake runs inside the loop, so view events are handled while the
//! channel is still connecting. Windows that elapse before it opens send
//! nothing. The channel is closed on every exit path, abandoning a handshake
//! still in flight. A failed handshake only disables live suggestions;
//! commit still works.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::arbiter::SuggestionArbiter;
use crate::channel::{ChannelState, ConnectionManager, Connector, Handshake, Transport};
use crate::config::TypeaheadConfig;
use crate::debounce::{DebounceController, DebounceOutcome};
use crate::error::{Result, TypeaheadError};
use crate::navigation::SearchNavigator;
use crate::protocol::SuggestionBatch;
use crate::selection::{Direction, Offer, SelectionMachine, SelectionMode};

/// Keys the session reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    Enter,
    Other,
}

/// Input from the owning view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// The user edited the input field; carries the full new text.
    TextChanged(String),
    Key(Key),
    SuggestionClicked(usize),
    /// Explicit submit action (e.g. a search button).
    Submit,
    /// The view is going away.
    Teardown,
}

/// Render model published after every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub input: String,
    pub items: Vec<String>,
    pub cursor: Option<usize>,
    pub mode: SelectionMode,
    pub channel: ChannelState,
}

impl Default for ViewSnapshot {
    fn default() -> Self {
        Self {
            input: String::new(),
            items: Vec::new(),
            cursor: None,
            mode: SelectionMode::Idle,
            channel: ChannelState::Closed,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The user committed this query to the search view.
    Committed(String),
    TornDown,
}

pub struct TypeaheadSession<N> {
    config: TypeaheadConfig,
    channel: ConnectionManager,
    debounce: DebounceController,
    arbiter: SuggestionArbiter,
    selection: SelectionMachine,
    navigator: N,
    input: String,
    view_tx: watch::Sender<ViewSnapshot>,
}

impl<N: SearchNavigator> TypeaheadSession<N> {
    pub fn new(config: TypeaheadConfig, connector: Arc<dyn Connector>, navigator: N) -> Self {
        let channel = ConnectionManager::new(connector, &config);
        let debounce = DebounceController::new(&config);
        let (view_tx, _) = watch::channel(ViewSnapshot::default());

        Self {
            config,
            channel,
            debounce,
            arbiter: SuggestionArbiter::new(),
            selection: SelectionMachine::new(),
            navigator,
            input: String::new(),
            view_tx,
        }
    }

    /// Observe the render model.
    pub fn view(&self) -> watch::Receiver<ViewSnapshot> {
        self.view_tx.subscribe()
    }

    /// Observe channel state transitions.
    pub fn channel_state(&self) -> watch::Receiver<ChannelState> {
        self.channel.subscribe()
    }

    /// Run until commit or teardown. The channel is closed on return.
    pub async fn run(mut self, events: mpsc::Receiver<ViewEvent>) -> SessionOutcome {
        let handshake = match self.channel.start_open() {
            Ok(handshake) => Some(handshake),
            Err(e) => {
                warn!(error = %e, "Live suggestions unavailable for this session");
                None
            }
        };
        self.publish();

        // A handshake still in flight is dropped with the loop
        let outcome = self.event_loop(events, handshake).await;

        self.debounce.cancel();
        self.channel.close().await;
        self.publish();
        info!(?outcome, "Typeahead session ended");
        outcome
    }

    async fn event_loop(
        &mut self,
        mut events: mpsc::Receiver<ViewEvent>,
        mut handshake: Option<Handshake>,
    ) -> SessionOutcome {
        loop {
            let debounce_at = self.debounce.deadline();
            let response_at = self
                .arbiter
                .response_deadline(self.config.response_timeout());
            let channel_open = self.channel.is_open();

            tokio::select! {
                event = events.recv() => match event {
                    None | Some(ViewEvent::Teardown) => return SessionOutcome::TornDown,
                    Some(event) => {
                        if let Some(query) = self.handle_event(event) {
                            info!(query = %query, "Query committed to search");
                            self.navigator.navigate(&query);
                            return SessionOutcome::Committed(query);
                        }
                    }
                },
                outcome = handshake_outcome(&mut handshake), if handshake.is_some() => {
                    handshake = None;
                    if let Err(e) = self.channel.finish_open(outcome) {
                        warn!(error = %e, "Live suggestions unavailable for this session");
                    }
                }
                _ = sleep_until(debounce_at.unwrap_or_else(Instant::now)), if debounce_at.is_some() => {
                    self.window_elapsed().await;
                }
                inbound = self.channel.next_batch(), if channel_open => {
                    self.handle_inbound(inbound);
                }
                _ = sleep_until(response_at.unwrap_or_else(Instant::now)), if response_at.is_some() => {
                    debug!(seq = ?self.arbiter.last_sent_seq(), "Suggestion request timed out");
                    self.arbiter.supersede();
                    self.selection.clear();
                }
            }

            self.publish();
        }
    }

    /// Apply a view event. Returns the committed query, if any.
    fn handle_event(&mut self, event: ViewEvent) -> Option<String> {
        match event {
            ViewEvent::TextChanged(text) => {
                self.selection.text_edited(&text);
                self.debounce.text_changed(&text);
                if text.is_empty() {
                    self.arbiter.supersede();
                }
                self.input = text;
                None
            }
            ViewEvent::Key(Key::ArrowDown) => {
                let text = self.selection.navigate(Direction::Next);
                self.mirror(text);
                None
            }
            ViewEvent::Key(Key::ArrowUp) => {
                let text = self.selection.navigate(Direction::Previous);
                self.mirror(text);
                None
            }
            ViewEvent::Key(Key::Enter) | ViewEvent::Submit => self.selection.commit(&self.input),
            ViewEvent::SuggestionClicked(index) => {
                let text = self.selection.click(index);
                if text.is_some() {
                    self.arbiter.supersede();
                }
                self.mirror(text);
                None
            }
            ViewEvent::Key(Key::Other) | ViewEvent::Teardown => None,
        }
    }

    /// Write machine-chosen text into the input. Like any input change it
    /// restarts the debounce window; the selection suppresses that window.
    fn mirror(&mut self, text: Option<String>) {
        if let Some(text) = text {
            self.debounce.text_changed(&text);
            self.input = text;
        }
    }

    async fn window_elapsed(&mut self) {
        let suppress = self.selection.take_suppression();

        match self.debounce.fire(suppress) {
            DebounceOutcome::Suppressed => {
                debug!(input = %self.input, "Debounce window suppressed after manual selection");
            }
            DebounceOutcome::Clear => {
                self.arbiter.supersede();
                self.selection.clear();
            }
            DebounceOutcome::Dispatch(query) => match self.channel.send(&query).await {
                Ok(()) => self.arbiter.dispatched(&query),
                Err(e) => debug!(seq = query.seq(), error = %e, "Query not sent"),
            },
        }
    }

    fn handle_inbound(&mut self, inbound: Option<Result<SuggestionBatch>>) {
        let batch = match inbound {
            Some(Ok(batch)) => batch,
            Some(Err(e @ TypeaheadError::MalformedMessage { .. })) => {
                debug!(error = %e, "Ignoring malformed suggestion message");
                return;
            }
            Some(Err(e)) => {
                warn!(error = %e, "Live suggestions lost");
                return;
            }
            None => {
                warn!("Suggestion service closed the channel");
                return;
            }
        };

        match self.arbiter.admit(batch) {
            Ok(items) => {
                let count = items.len();
                if self.selection.offer(items) == Offer::HeldBack {
                    debug!(count, "Batch held back during manual selection");
                }
            }
            Err(e) => debug!(error = %e, "Discarding stale batch"),
        }
    }

    fn snapshot(&self) -> ViewSnapshot {
        let state = self.selection.state();
        ViewSnapshot {
            input: self.input.clone(),
            items: state.items().to_vec(),
            cursor: state.cursor(),
            mode: self.selection.mode(),
            channel: self.channel.state(),
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.view_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}

async fn handshake_outcome(handshake: &mut Option<Handshake>) -> Result<Box<dyn Transport>> {
    match handshake {
        Some(handshake) => handshake.await,
        None => std::future::pending().await,
    }
}

impl<N: SearchNavigator + 'static> TypeaheadSession<N> {
    /// Run the session on its own task.
    pub fn spawn(self) -> SessionHandle {
        let (events_tx, events_rx) = mpsc::channel(64);
        let view = self.view();
        let channel = self.channel_state();
        let task = tokio::spawn(self.run(events_rx));

        SessionHandle {
            events: events_tx,
            view,
            channel,
            task,
        }
    }
}

/// Owning view's handle on a spawned session.
pub struct SessionHandle {
    events: mpsc::Sender<ViewEvent>,
    view: watch::Receiver<ViewSnapshot>,
    channel: watch::Receiver<ChannelState>,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    /// Deliver a view event. Returns false once the session has ended.
    pub async fn send(&self, event: ViewEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    pub async fn type_text(&self, text: &str) -> bool {
        self.send(ViewEvent::TextChanged(text.to_string())).await
    }

    pub async fn press(&self, key: Key) -> bool {
        self.send(ViewEvent::Key(key)).await
    }

    pub fn view(&self) -> watch::Receiver<ViewSnapshot> {
        self.view.clone()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.view.borrow().clone()
    }

    pub fn channel_state(&self) -> ChannelState {
        *self.channel.borrow()
    }

    /// Tear the view down and wait for the session to release its channel.
    pub async fn teardown(self) -> SessionOutcome {
        let _ = self.events.send(ViewEvent::Teardown).await;
        self.join().await
    }

    /// Wait for the session to end on its own (commit or teardown).
    pub async fn join(self) -> SessionOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Typeahead session task failed");
                SessionOutcome::TornDown
            }
        }
    }
}
