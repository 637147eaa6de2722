//! Selection State Machine: cursor over the current suggestion list.
//!
//! ```text
//!            batch (non-empty)              arrow key / click
//!   Idle ─────────────────────► Suggesting ───────────────────► ManualOverride
//!    ▲  ◄──── empty batch / clear ───┘  ▲                            │
//!    │                                  └── next window suppressed ──┤
//!    └──────────────── (list empty) ◄────────────────────────────────┘
//! ```
//!
//! `ManualOverride` marks text that was written into the input by the
//! machine itself (arrow keys, clicks). The next debounce window is
//! suppressed exactly once so that text is not queried, and incoming
//! batches are held back so they cannot clobber the user's choice.

/// Machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Idle,
    Suggesting,
    ManualOverride,
}

/// Who produced the current input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    UserTyped,
    UserNavigated,
}

/// Cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Suggestions on display and the highlighted one.
///
/// `cursor` is `None` when nothing is highlighted and always `None` when
/// `items` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionState {
    items: Vec<String>,
    cursor: Option<usize>,
    origin: Origin,
}

impl SelectionState {
    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.cursor.map(|i| self.items[i].as_str())
    }
}

/// Result of offering a fresh batch to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Applied,
    /// Not applied: the user is in the middle of a manual selection.
    HeldBack,
}

#[derive(Debug, Default)]
pub struct SelectionMachine {
    state: SelectionState,
    mode: SelectionMode,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// The user edited the input.
    ///
    /// Leaves `ManualOverride`: typed text is the user's own and must be
    /// queried. Emptying the input drops the list and returns to `Idle`.
    pub fn text_edited(&mut self, text: &str) {
        self.state.origin = Origin::UserTyped;
        self.state.cursor = None;
        if text.is_empty() {
            self.state.items.clear();
        }
        self.mode = self.resting_mode();
    }

    /// Move the cursor with wrap-around.
    ///
    /// Returns the text to mirror into the input, or `None` when there is
    /// nothing to navigate.
    pub fn navigate(&mut self, direction: Direction) -> Option<String> {
        let len = self.state.items.len();
        if len == 0 {
            return None;
        }

        let next = match (direction, self.state.cursor) {
            (Direction::Next, None) => 0,
            (Direction::Next, Some(i)) => (i + 1) % len,
            (Direction::Previous, None) => len - 1,
            (Direction::Previous, Some(i)) => (i + len - 1) % len,
        };

        self.state.cursor = Some(next);
        self.state.origin = Origin::UserNavigated;
        self.mode = SelectionMode::ManualOverride;
        Some(self.state.items[next].clone())
    }

    /// The user clicked suggestion `index`.
    ///
    /// Returns the text to put into the input. The list is cleared; the
    /// click does not commit.
    pub fn click(&mut self, index: usize) -> Option<String> {
        let text = self.state.items.get(index)?.clone();

        self.state.items.clear();
        self.state.cursor = None;
        self.state.origin = Origin::UserNavigated;
        self.mode = SelectionMode::ManualOverride;
        Some(text)
    }

    /// Offer a fresh batch. Replaces the list wholesale with no highlight,
    /// unless a manual selection is in progress.
    pub fn offer(&mut self, items: Vec<String>) -> Offer {
        if self.mode == SelectionMode::ManualOverride {
            return Offer::HeldBack;
        }

        self.state = SelectionState {
            items,
            cursor: None,
            origin: Origin::UserTyped,
        };
        self.mode = self.resting_mode();
        Offer::Applied
    }

    /// Drop the list ("no suggestions for this input").
    pub fn clear(&mut self) {
        self.state.items.clear();
        self.state.cursor = None;
        if self.mode != SelectionMode::ManualOverride {
            self.mode = SelectionMode::Idle;
        }
    }

    /// Consume the one-shot suppression of a debounce window.
    ///
    /// Returns true if the elapsed window must not send a query.
    pub fn take_suppression(&mut self) -> bool {
        if self.mode != SelectionMode::ManualOverride {
            return false;
        }
        self.mode = self.resting_mode();
        true
    }

    /// Final query for the search view: the input trimmed, if non-empty.
    pub fn commit(&self, input: &str) -> Option<String> {
        let query = input.trim();
        (!query.is_empty()).then(|| query.to_string())
    }

    fn resting_mode(&self) -> SelectionMode {
        if self.state.items.is_empty() {
            SelectionMode::Idle
        } else {
            SelectionMode::Suggesting
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_with(items: &[&str]) -> SelectionMachine {
        let mut machine = SelectionMachine::new();
        assert_eq!(
            machine.offer(items.iter().map(|s| s.to_string()).collect()),
            Offer::Applied
        );
        machine
    }

    #[test]
    fn batch_moves_idle_to_suggesting() {
        let machine = machine_with(&["golang", "gopher"]);
        assert_eq!(machine.mode(), SelectionMode::Suggesting);
        assert_eq!(machine.state().cursor(), None);
    }

    #[test]
    fn empty_batch_keeps_idle() {
        let machine = machine_with(&[]);
        assert_eq!(machine.mode(), SelectionMode::Idle);
        assert!(machine.state().items().is_empty());
    }

    #[test]
    fn down_cycles_with_wrap_around() {
        let mut machine = machine_with(&["golang", "gopher"]);

        assert_eq!(machine.navigate(Direction::Next).as_deref(), Some("golang"));
        assert_eq!(machine.navigate(Direction::Next).as_deref(), Some("gopher"));
        assert_eq!(machine.navigate(Direction::Next).as_deref(), Some("golang"));
        assert_eq!(machine.state().cursor(), Some(0));
        assert_eq!(machine.mode(), SelectionMode::ManualOverride);
        assert_eq!(machine.state().origin(), Origin::UserNavigated);
    }

    #[test]
    fn previous_from_first_wraps_to_last() {
        let mut machine = machine_with(&["a", "b", "c"]);
        machine.navigate(Direction::Next);
        assert_eq!(machine.state().cursor(), Some(0));

        assert_eq!(machine.navigate(Direction::Previous).as_deref(), Some("c"));
        assert_eq!(machine.state().cursor(), Some(2));
    }

    #[test]
    fn previous_from_unselected_goes_to_last() {
        let mut machine = machine_with(&["a", "b", "c"]);
        assert_eq!(machine.navigate(Direction::Previous).as_deref(), Some("c"));
    }

    #[test]
    fn single_item_wraps_onto_itself() {
        let mut machine = machine_with(&["only"]);
        machine.navigate(Direction::Next);
        machine.navigate(Direction::Next);
        machine.navigate(Direction::Previous);
        assert_eq!(machine.state().cursor(), Some(0));
    }

    #[test]
    fn arrows_are_noops_without_items() {
        let mut machine = SelectionMachine::new();
        assert!(machine.navigate(Direction::Next).is_none());
        assert!(machine.navigate(Direction::Previous).is_none());
        assert_eq!(machine.mode(), SelectionMode::Idle);
        assert_eq!(machine.state().cursor(), None);
    }

    #[test]
    fn suppression_is_one_shot() {
        let mut machine = machine_with(&["golang", "gopher"]);
        machine.navigate(Direction::Next);

        assert!(machine.take_suppression());
        assert_eq!(machine.mode(), SelectionMode::Suggesting);
        assert!(!machine.take_suppression());
    }

    #[test]
    fn batches_are_held_back_during_manual_override() {
        let mut machine = machine_with(&["golang", "gopher"]);
        machine.navigate(Direction::Next);
        machine.navigate(Direction::Next);

        assert_eq!(
            machine.offer(vec!["something".into(), "else".into()]),
            Offer::HeldBack
        );
        assert_eq!(machine.state().highlighted(), Some("gopher"));

        machine.take_suppression();
        assert_eq!(machine.offer(vec!["fresh".into()]), Offer::Applied);
        assert_eq!(machine.state().items(), ["fresh".to_string()]);
        assert_eq!(machine.state().cursor(), None);
    }

    #[test]
    fn click_fills_input_and_clears_list() {
        let mut machine = machine_with(&["golang", "gopher"]);

        assert_eq!(machine.click(1).as_deref(), Some("gopher"));
        assert!(machine.state().items().is_empty());
        assert_eq!(machine.state().cursor(), None);
        assert_eq!(machine.mode(), SelectionMode::ManualOverride);

        assert!(machine.take_suppression());
        assert_eq!(machine.mode(), SelectionMode::Idle);
    }

    #[test]
    fn click_out_of_range_is_ignored() {
        let mut machine = machine_with(&["golang"]);
        assert!(machine.click(3).is_none());
        assert_eq!(machine.mode(), SelectionMode::Suggesting);
    }

    #[test]
    fn typing_leaves_manual_override() {
        let mut machine = machine_with(&["golang", "gopher"]);
        machine.navigate(Direction::Next);

        machine.text_edited("golang t");

        assert_eq!(machine.mode(), SelectionMode::Suggesting);
        assert_eq!(machine.state().cursor(), None);
        assert_eq!(machine.state().origin(), Origin::UserTyped);
        assert!(!machine.take_suppression());
    }

    #[test]
    fn clearing_input_returns_to_idle() {
        let mut machine = machine_with(&["golang", "gopher"]);
        machine.navigate(Direction::Next);

        machine.text_edited("");

        assert_eq!(machine.mode(), SelectionMode::Idle);
        assert!(machine.state().items().is_empty());
        assert_eq!(machine.state().cursor(), None);
    }

    #[test]
    fn clear_empties_list() {
        let mut machine = machine_with(&["golang"]);
        machine.clear();
        assert_eq!(machine.mode(), SelectionMode::Idle);
        assert!(machine.state().items().is_empty());
    }

    #[test]
    fn commit_trims_and_rejects_blank() {
        let machine = SelectionMachine::new();
        assert_eq!(
            machine.commit("kubernetes scheduling").as_deref(),
            Some("kubernetes scheduling")
        );
        assert_eq!(machine.commit("  golang \n").as_deref(), Some("golang"));
        assert!(machine.commit("   ").is_none());
        assert!(machine.commit("").is_none());
    }
}
