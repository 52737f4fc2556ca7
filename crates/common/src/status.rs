//! Book availability and receipt lifecycle states.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

impl std::fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} status '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseStatusError {}

/// Availability of a book.
///
/// State transitions:
/// ```text
/// Available ──► Placed ──► Taken
///     ▲           │          │
///     └───────────┴──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    /// On the shelf, free to be placed.
    #[default]
    Available,

    /// Held for a pending receipt.
    Placed,

    /// Physically lent out.
    Taken,
}

impl BookStatus {
    /// Returns true if `self → to` is an edge of the availability state machine.
    pub fn can_transition_to(&self, to: BookStatus) -> bool {
        matches!(
            (self, to),
            (BookStatus::Available, BookStatus::Placed)
                | (BookStatus::Placed, BookStatus::Taken)
                | (BookStatus::Placed, BookStatus::Available)
                | (BookStatus::Taken, BookStatus::Available)
        )
    }

    /// Returns true if a non-returned receipt holds the book.
    pub fn is_held(&self) -> bool {
        matches!(self, BookStatus::Placed | BookStatus::Taken)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Placed => "placed",
            BookStatus::Taken => "taken",
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(BookStatus::Available),
            "placed" => Ok(BookStatus::Placed),
            "taken" => Ok(BookStatus::Taken),
            other => Err(ParseStatusError {
                kind: "book",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle state of a receipt.
///
/// ```text
/// Pending ──► Owned ──► Returned
///    │          │
///    └──────────┴──► Canceled
/// ```
///
/// The diagram shows the intended product flow. The ledger guards only what
/// touches the book: a closed receipt cannot be canceled, and reopening one
/// must claim its book again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    /// Book is held for the user but not yet picked up.
    #[default]
    Pending,

    /// User has the book.
    Owned,

    /// Book came back.
    Returned,

    /// User withdrew the placement before pickup.
    Canceled,
}

impl ReceiptStatus {
    /// The book status a receipt entering this state forces, if any.
    ///
    /// `Owned` leaves the book untouched.
    pub fn book_effect(&self) -> Option<BookStatus> {
        match self {
            ReceiptStatus::Pending => Some(BookStatus::Placed),
            ReceiptStatus::Returned | ReceiptStatus::Canceled => Some(BookStatus::Available),
            ReceiptStatus::Owned => None,
        }
    }

    /// Returns true if a receipt in this state holds its book.
    pub fn is_active(&self) -> bool {
        matches!(self, ReceiptStatus::Pending | ReceiptStatus::Owned)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "pending",
            ReceiptStatus::Owned => "owned",
            ReceiptStatus::Returned => "returned",
            ReceiptStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReceiptStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReceiptStatus::Pending),
            "owned" => Ok(ReceiptStatus::Owned),
            "returned" => Ok(ReceiptStatus::Returned),
            "canceled" => Ok(ReceiptStatus::Canceled),
            other => Err(ParseStatusError {
                kind: "receipt",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_book_status_is_available() {
        assert_eq!(BookStatus::default(), BookStatus::Available);
    }

    #[test]
    fn test_legal_book_transitions() {
        assert!(BookStatus::Available.can_transition_to(BookStatus::Placed));
        assert!(BookStatus::Placed.can_transition_to(BookStatus::Taken));
        assert!(BookStatus::Placed.can_transition_to(BookStatus::Available));
        assert!(BookStatus::Taken.can_transition_to(BookStatus::Available));
    }

    #[test]
    fn test_illegal_book_transitions() {
        assert!(!BookStatus::Available.can_transition_to(BookStatus::Taken));
        assert!(!BookStatus::Available.can_transition_to(BookStatus::Available));
        assert!(!BookStatus::Taken.can_transition_to(BookStatus::Placed));
        assert!(!BookStatus::Placed.can_transition_to(BookStatus::Placed));
    }

    #[test]
    fn test_book_effects() {
        assert_eq!(
            ReceiptStatus::Pending.book_effect(),
            Some(BookStatus::Placed)
        );
        assert_eq!(
            ReceiptStatus::Returned.book_effect(),
            Some(BookStatus::Available)
        );
        assert_eq!(
            ReceiptStatus::Canceled.book_effect(),
            Some(BookStatus::Available)
        );
        assert_eq!(ReceiptStatus::Owned.book_effect(), None);
    }

    #[test]
    fn test_active_receipt_states() {
        assert!(ReceiptStatus::Pending.is_active());
        assert!(ReceiptStatus::Owned.is_active());
        assert!(!ReceiptStatus::Returned.is_active());
        assert!(!ReceiptStatus::Canceled.is_active());
    }

    #[test]
    fn test_wire_format_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&ReceiptStatus::Canceled).unwrap(),
            "\"canceled\""
        );
        let status: BookStatus = serde_json::from_str("\"taken\"").unwrap();
        assert_eq!(status, BookStatus::Taken);
        assert!(serde_json::from_str::<ReceiptStatus>("\"lost\"").is_err());
    }

    #[test]
    fn test_parse_matches_display() {
        for status in [
            ReceiptStatus::Pending,
            ReceiptStatus::Owned,
            ReceiptStatus::Returned,
            ReceiptStatus::Canceled,
        ] {
            assert_eq!(status.to_string().parse::<ReceiptStatus>(), Ok(status));
        }
        let err = "shelved".parse::<BookStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown book status 'shelved'");
    }
}
