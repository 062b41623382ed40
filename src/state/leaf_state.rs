/// Leaf state definitions for the per-city pagination loop
///
/// ```text
/// ListPage(n) -> RecordSelected -> DetailLoaded -> RecordPersisted | RecordSkipped
///      ^                                                   |
///      +---------------------------------------------------+
/// ListPage(n) -> ListPage(n + 1) | Done
/// ```
use crate::CrawlError;
use std::fmt;

/// Represents the current state of a leaf in the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafState {
    /// Result list page `n` (1-based) is loaded and being enumerated
    ListPage(u32),

    /// A listing was re-resolved and is about to be opened
    RecordSelected,

    /// The detail page of a listing is loaded
    DetailLoaded,

    /// A record was appended to the store and written
    RecordPersisted,

    /// A listing was abandoned (no email, navigation failed, ...)
    RecordSkipped,

    /// No further list pages
    Done,
}

impl LeafState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if `next` is a legal successor of this state
    ///
    /// Returning to a list page after a record is allowed here for any page
    /// number; [`LeafCursor`] additionally requires it to be the same page.
    pub fn can_transition_to(&self, next: LeafState) -> bool {
        match (self, next) {
            (Self::ListPage(n), Self::ListPage(m)) => m == n + 1,
            (Self::ListPage(_), Self::RecordSelected | Self::RecordSkipped | Self::Done) => true,
            (Self::RecordSelected, Self::DetailLoaded | Self::RecordSkipped) => true,
            (Self::DetailLoaded, Self::RecordPersisted | Self::RecordSkipped) => true,
            (Self::RecordPersisted | Self::RecordSkipped, Self::ListPage(_)) => true,
            _ => false,
        }
    }

    /// Short machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListPage(_) => "list_page",
            Self::RecordSelected => "record_selected",
            Self::DetailLoaded => "detail_loaded",
            Self::RecordPersisted => "record_persisted",
            Self::RecordSkipped => "record_skipped",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for LeafState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListPage(n) => write!(f, "list_page({})", n),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Tracks one leaf's state and current page number
#[derive(Debug, Clone)]
pub struct LeafCursor {
    state: LeafState,
    page: u32,
}

impl LeafCursor {
    /// Starts on the first list page
    pub fn new() -> Self {
        Self {
            state: LeafState::ListPage(1),
            page: 1,
        }
    }

    pub fn state(&self) -> LeafState {
        self.state
    }

    /// Current 1-based list page
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Moves to `next`, or fails with `CrawlError::InvalidTransition`
    pub fn advance(&mut self, next: LeafState) -> Result<(), CrawlError> {
        let same_page = match (self.state, next) {
            (LeafState::RecordPersisted | LeafState::RecordSkipped, LeafState::ListPage(m)) => {
                m == self.page
            }
            _ => true,
        };

        if !same_page || !self.state.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        if let LeafState::ListPage(m) = next {
            self.page = m;
        }
        self.state = next;
        Ok(())
    }

    /// Returns to the current list page after a record
    pub fn back_to_list(&mut self) -> Result<(), CrawlError> {
        self.advance(LeafState::ListPage(self.page))
    }

    /// Moves to the following list page
    pub fn next_page(&mut self) -> Result<(), CrawlError> {
        self.advance(LeafState::ListPage(self.page + 1))
    }
}

impl Default for LeafCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_cycle() {
        let mut cursor = LeafCursor::new();
        cursor.advance(LeafState::RecordSelected).unwrap();
        cursor.advance(LeafState::DetailLoaded).unwrap();
        cursor.advance(LeafState::RecordPersisted).unwrap();
        cursor.back_to_list().unwrap();
        assert_eq!(cursor.state(), LeafState::ListPage(1));
    }

    #[test]
    fn test_pages_advance_in_order() {
        let mut cursor = LeafCursor::new();
        cursor.next_page().unwrap();
        cursor.next_page().unwrap();
        assert_eq!(cursor.page(), 3);

        assert!(cursor.advance(LeafState::ListPage(5)).is_err());
        assert!(cursor.advance(LeafState::ListPage(3)).is_err());
    }

    #[test]
    fn test_skip_from_any_record_state() {
        for path in [
            vec![LeafState::RecordSkipped],
            vec![LeafState::RecordSelected, LeafState::RecordSkipped],
            vec![
                LeafState::RecordSelected,
                LeafState::DetailLoaded,
                LeafState::RecordSkipped,
            ],
        ] {
            let mut cursor = LeafCursor::new();
            for state in path {
                cursor.advance(state).unwrap();
            }
            cursor.back_to_list().unwrap();
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let mut cursor = LeafCursor::new();
        assert!(cursor.advance(LeafState::DetailLoaded).is_err());
        assert!(cursor.advance(LeafState::RecordPersisted).is_err());

        cursor.next_page().unwrap();
        cursor.advance(LeafState::RecordSelected).unwrap();
        match cursor.advance(LeafState::ListPage(2)) {
            Err(CrawlError::InvalidTransition { from, to }) => {
                assert_eq!(from, LeafState::RecordSelected);
                assert_eq!(to, LeafState::ListPage(2));
            }
            other => panic!("expected invalid transition, got {:?}", other),
        }
    }

    #[test]
    fn test_record_returns_to_its_own_page() {
        let mut cursor = LeafCursor::new();
        cursor.next_page().unwrap();
        cursor.advance(LeafState::RecordSkipped).unwrap();
        assert!(cursor.advance(LeafState::ListPage(1)).is_err());
        cursor.advance(LeafState::ListPage(2)).unwrap();
    }

    #[test]
    fn test_done_is_terminal() {
        let mut cursor = LeafCursor::new();
        cursor.advance(LeafState::Done).unwrap();
        assert!(cursor.state().is_terminal());
        assert!(cursor.next_page().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(LeafState::ListPage(3).to_string(), "list_page(3)");
        assert_eq!(LeafState::RecordSkipped.to_string(), "record_skipped");
    }
}
