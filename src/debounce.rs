//! Debounce Controller: turns keystrokes into a bounded rate of queries.
//!
//! Every text change restarts the window; only the text present when the
//! window elapses is considered. There is at most one pending window, held
//! as a deadline the owning event loop sleeps until.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::TypeaheadConfig;
use crate::protocol::Query;

/// What to do when a debounce window elapses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceOutcome {
    /// The window was consumed by a programmatic text update.
    Suppressed,
    /// Text is outside the length bounds: show no suggestions.
    Clear,
    /// Send this query.
    Dispatch(Query),
}

/// Input state owned by the debounce controller.
#[derive(Debug)]
pub struct DebounceController {
    delay: Duration,
    min_len: usize,
    max_len: usize,
    raw_text: String,
    deadline: Option<Instant>,
    last_seq: u64,
}

impl DebounceController {
    pub fn new(config: &TypeaheadConfig) -> Self {
        Self {
            delay: config.debounce(),
            min_len: config.min_query_len,
            max_len: config.max_query_len,
            raw_text: String::new(),
            deadline: None,
            last_seq: 0,
        }
    }

    /// Record a text change and restart the window, superseding any pending one.
    pub fn text_changed(&mut self, text: &str) {
        self.raw_text.clear();
        self.raw_text.push_str(text);
        self.deadline = Some(Instant::now() + self.delay);
    }

    /// When the pending window elapses, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drop the pending window without firing it.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Sequence number of the last query allocated, if any.
    pub fn last_sent_seq(&self) -> Option<u64> {
        (self.last_seq > 0).then_some(self.last_seq)
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Whether `text` is long enough to be useful and short enough to be indexed.
    pub fn in_bounds(&self, text: &str) -> bool {
        let len = text.chars().count();
        len >= self.min_len && len <= self.max_len
    }

    /// Consume the elapsed window.
    ///
    /// `suppress` is true when the window belongs to a programmatic text
    /// update; no query is sent and the list is left alone.
    pub fn fire(&mut self, suppress: bool) -> DebounceOutcome {
        self.deadline = None;

        if suppress {
            return DebounceOutcome::Suppressed;
        }
        if !self.in_bounds(&self.raw_text) {
            return DebounceOutcome::Clear;
        }

        self.last_seq += 1;
        DebounceOutcome::Dispatch(Query::new(self.raw_text.clone(), self.last_seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> DebounceController {
        DebounceController::new(&TypeaheadConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn text_change_arms_window() {
        let mut debounce = controller();
        assert!(!debounce.is_pending());

        let start = Instant::now();
        debounce.text_changed("gola");

        assert_eq!(debounce.deadline(), Some(start + Duration::from_millis(400)));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_changes_keep_one_window_with_final_text() {
        let mut debounce = controller();

        debounce.text_changed("go");
        tokio::time::advance(Duration::from_millis(20)).await;
        debounce.text_changed("gol");
        tokio::time::advance(Duration::from_millis(20)).await;
        let last_change = Instant::now();
        debounce.text_changed("gola");

        assert_eq!(
            debounce.deadline(),
            Some(last_change + Duration::from_millis(400))
        );
        match debounce.fire(false) {
            DebounceOutcome::Dispatch(query) => {
                assert_eq!(query.text(), "gola");
                assert_eq!(query.seq(), 1);
            }
            other => panic!("expected dispatch, got {:?}", other),
        }
        assert!(!debounce.is_pending());
    }

    #[test]
    fn out_of_bounds_text_clears() {
        let mut debounce = controller();

        for text in ["", "g", "go", "abcdefghijklmnopqrstu"] {
            debounce.text_changed(text);
            assert_eq!(debounce.fire(false), DebounceOutcome::Clear, "{text:?}");
        }
        assert_eq!(debounce.last_sent_seq(), None);
    }

    #[test]
    fn bounds_are_inclusive() {
        let debounce = controller();
        assert!(debounce.in_bounds("gol"));
        assert!(debounce.in_bounds("abcdefghijklmnopqrst"));
        assert!(!debounce.in_bounds("abcdefghijklmnopqrstu"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let debounce = controller();
        // 3 characters, 6 bytes
        assert!(debounce.in_bounds("äöü"));
    }

    #[test]
    fn suppressed_window_sends_nothing() {
        let mut debounce = controller();
        debounce.text_changed("golang");

        assert_eq!(debounce.fire(true), DebounceOutcome::Suppressed);
        assert_eq!(debounce.last_sent_seq(), None);
        assert!(!debounce.is_pending());
    }

    #[test]
    fn sequence_numbers_strictly_increase() {
        let mut debounce = controller();
        let mut seen = Vec::new();

        for text in ["gol", "gola", "gol", "golang"] {
            debounce.text_changed(text);
            if let DebounceOutcome::Dispatch(query) = debounce.fire(false) {
                seen.push(query.seq());
            }
            // Intervening clears do not reuse numbers
            debounce.text_changed("x");
            debounce.fire(false);
        }

        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(debounce.last_sent_seq(), Some(4));
    }

    #[test]
    fn cancel_drops_pending_window() {
        let mut debounce = controller();
        debounce.text_changed("gola");
        debounce.cancel();
        assert!(debounce.deadline().is_none());
    }
}
