/// Resource status definitions for tracking crawl progress
///
/// This module defines all possible states a resource can be in during a crawl
/// and the transitions allowed between them.
use std::fmt;

/// Represents the current state of a resource in the crawl process
///
/// Transitions are monotonic: a resource never moves back to an earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceStatus {
    // ===== Active States =====
    /// Resource has been discovered but not yet fetched
    Pending,

    /// Resource is being fetched and assigned a local path
    Fetching,

    /// Resource body is being scanned and its references rewritten
    Processing,

    // ===== Terminal Success State =====
    /// Resource was written to storage
    Saved,

    // ===== Terminal Error State =====
    /// Fetch, handler or persist failed
    Failed,

    // ===== Terminal Skip State =====
    /// Resource was filtered, beyond a depth ceiling, vetoed by a plugin,
    /// or turned out to be a redirect onto an already known resource
    Skipped,
}

impl ResourceStatus {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Saved | Self::Failed | Self::Skipped)
    }

    /// Returns true if this is an active state (resource may still be processed)
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved)
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// The happy path is `Pending -> Fetching -> Processing -> Saved`.
    /// `Failed` is reachable from any active state, `Skipped` only before
    /// processing starts.
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Fetching)
            | (Self::Fetching, Self::Processing)
            | (Self::Processing, Self::Saved) => true,
            (Self::Pending | Self::Fetching, Self::Skipped) => true,
            (current, Self::Failed) => current.is_active(),
            _ => false,
        }
    }

    /// Short lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Processing => "processing",
            Self::Saved => "saved",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Returns all possible statuses
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Fetching,
            Self::Processing,
            Self::Saved,
            Self::Failed,
            Self::Skipped,
        ]
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
