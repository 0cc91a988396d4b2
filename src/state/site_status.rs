/// Site job status definitions
///
/// A job starts in `Indexing` and moves exactly once to a terminal state.
use std::fmt;

/// Represents the current state of one site job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteStatus {
    /// The site's crawl is in progress
    Indexing,

    /// The crawl finished without a fatal error
    Indexed,

    /// The crawl hit a fatal error or was stopped
    Failed,
}

impl SiteStatus {
    /// Returns true if no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Indexing)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: SiteStatus) -> bool {
        matches!(self, Self::Indexing) && next.is_terminal()
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "INDEXING" => Some(Self::Indexing),
            "INDEXED" => Some(Self::Indexed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
