//! Lifecycle states of a crawl unit
//!
//! States only move forward: `Discovered -> InFlight -> Done`.

use std::fmt;

/// Represents the current state of a crawl unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitState {
    /// Admitted to the frontier, waiting to be fetched
    Discovered,

    /// Dispatched to the renderer
    InFlight,

    /// Fetch finished, with or without captured content
    Done,
}

impl UnitState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if moving from `self` to `next` keeps the lifecycle monotonic
    pub fn can_transition_to(&self, next: UnitState) -> bool {
        matches!(
            (self, next),
            (Self::Discovered, Self::InFlight) | (Self::InFlight, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::InFlight => "in_flight",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a finished unit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitOutcome {
    /// Content was captured
    Captured,

    /// The renderer could not open the page
    OpenFailed,

    /// The page did not open, become ready or yield its content within the wait budget
    TimedOut,

    /// The page opened but its content could not be read
    ExtractFailed,

    /// The fetch task panicked or was aborted
    TaskFailed,
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Captured)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Captured => "captured",
            Self::OpenFailed => "open_failed",
            Self::TimedOut => "timed_out",
            Self::ExtractFailed => "extract_failed",
            Self::TaskFailed => "task_failed",
        }
    }
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(UnitState::Discovered.can_transition_to(UnitState::InFlight));
        assert!(UnitState::InFlight.can_transition_to(UnitState::Done));
    }

    #[test]
    fn test_no_regression_or_skipping() {
        assert!(!UnitState::Discovered.can_transition_to(UnitState::Done));
        assert!(!UnitState::InFlight.can_transition_to(UnitState::Discovered));
        assert!(!UnitState::Done.can_transition_to(UnitState::InFlight));
        assert!(!UnitState::Done.can_transition_to(UnitState::Discovered));
        assert!(!UnitState::Done.can_transition_to(UnitState::Done));
    }

    #[test]
    fn test_terminal() {
        assert!(!UnitState::Discovered.is_terminal());
        assert!(!UnitState::InFlight.is_terminal());
        assert!(UnitState::Done.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(UnitState::InFlight.to_string(), "in_flight");
        assert_eq!(UnitOutcome::TimedOut.to_string(), "timed_out");
        assert!(UnitOutcome::Captured.is_success());
        assert!(!UnitOutcome::OpenFailed.is_success());
        assert_eq!(UnitOutcome::TaskFailed.to_string(), "task_failed");
    }
}
