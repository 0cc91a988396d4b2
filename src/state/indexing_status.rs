use std::fmt;

/// Process-wide indexing status
///
/// `Running` from a successful start until every site pool of that run has
/// terminated, `Stopped` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexingStatus {
    Running,
    #[default]
    Stopped,
}

impl IndexingStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for IndexingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}
