/// Crawl task status definitions
///
/// A task moves `Started -> Running -> {Completed | Failed | Stopped}`.
use std::fmt;

/// Represents the current status of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    // ===== Active States =====
    /// Task record created, run not yet begun
    Started,

    /// Task is crawling seed sites
    Running,

    // ===== Terminal States =====
    /// Every seed site was visited
    Completed,

    /// An error escaped the site loop
    Failed,

    /// A stop was requested before the run finished
    Stopped,
}

impl TaskStatus {
    /// Returns true if this is a terminal state (the task will not change again)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if the task may still make progress
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Started | Self::Running)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "started" => Some(Self::Started),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }

    /// Returns all possible task statuses
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Started,
            Self::Running,
            Self::Completed,
            Self::Failed,
            Self::Stopped,
        ]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
