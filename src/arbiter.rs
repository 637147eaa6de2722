//! Suggestion Arbiter: decides whether an inbound batch is fresh.
//!
//! Acceptance is keyed to the last dispatched sequence number:
//!
//! - Correlated batches (`seq` on the wire) are accepted only if they answer
//!   the most recently dispatched query.
//! - Uncorrelated batches follow "latest received wins". Extreme reordering
//!   can still surface an older batch; the wire format gives no way to tell.
//!
//! In both modes, nothing is accepted after the list was cleared locally
//! (`supersede`) until the next query goes out.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Result, TypeaheadError};
use crate::protocol::{Correlation, Query, SuggestionBatch};

#[derive(Debug, Default)]
pub struct SuggestionArbiter {
    last_sent: Option<u64>,
    /// A dispatched query has not been superseded by a local clear.
    outstanding: bool,
    /// Dispatch time of the newest unanswered query.
    dispatched_at: Option<Instant>,
}

impl SuggestionArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `query` went out on the channel.
    pub fn dispatched(&mut self, query: &Query) {
        debug_assert!(
            self.last_sent.map_or(true, |last| query.seq() > last),
            "sequence numbers must strictly increase"
        );
        self.last_sent = Some(query.seq());
        self.outstanding = true;
        self.dispatched_at = Some(Instant::now());
    }

    /// Invalidate every outstanding query.
    pub fn supersede(&mut self) {
        self.outstanding = false;
        self.dispatched_at = None;
    }

    pub fn last_sent_seq(&self) -> Option<u64> {
        self.last_sent
    }

    /// Whether a response to the newest query is still expected.
    pub fn is_awaiting(&self) -> bool {
        self.dispatched_at.is_some()
    }

    /// When the newest unanswered query expires under `timeout`.
    pub fn response_deadline(&self, timeout: Option<Duration>) -> Option<Instant> {
        Some(self.dispatched_at? + timeout?)
    }

    /// Check a batch for freshness, returning its items if it may be shown.
    pub fn admit(&mut self, batch: SuggestionBatch) -> Result<Vec<String>> {
        let fresh = self.outstanding
            && match batch.correlation {
                Correlation::Sequence(seq) => Some(seq) == self.last_sent,
                Correlation::Latest => true,
            };

        if !fresh {
            return Err(TypeaheadError::StaleBatch {
                received: batch.correlation.to_string(),
                latest: self.last_sent,
            });
        }

        self.dispatched_at = None;
        Ok(batch.items)
    }
}
