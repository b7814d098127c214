//! Top-up lifecycle states
//!
//! Stored as TEXT in `coin_topups.status`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-up status
///
/// Legal transitions: PENDING → SUCCEEDED, PENDING → FAILED.
/// Terminal states: SUCCEEDED, FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopUpStatus {
    /// Created by checkout, awaiting a provider notification
    Pending,

    /// Terminal: payment confirmed, coins credited (or credit in flight)
    Succeeded,

    /// Terminal: session expired or payment failed
    Failed,
}

impl TopUpStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TopUpStatus::Succeeded | TopUpStatus::Failed)
    }

    /// Whether `self → next` is a legal ledger transition
    #[inline]
    pub fn can_transition_to(&self, next: TopUpStatus) -> bool {
        matches!(
            (self, next),
            (TopUpStatus::Pending, TopUpStatus::Succeeded)
                | (TopUpStatus::Pending, TopUpStatus::Failed)
        )
    }

    /// Column value in `coin_topups.status`
    pub fn as_str(&self) -> &'static str {
        match self {
            TopUpStatus::Pending => "pending",
            TopUpStatus::Succeeded => "succeeded",
            TopUpStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TopUpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TopUpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TopUpStatus::Pending),
            "succeeded" => Ok(TopUpStatus::Succeeded),
            "failed" => Ok(TopUpStatus::Failed),
            _ => Err(format!("Invalid top-up status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TopUpStatus::Succeeded.is_terminal());
        assert!(TopUpStatus::Failed.is_terminal());
        assert!(!TopUpStatus::Pending.is_terminal());
    }

    #[test]
    fn test_only_pending_transitions() {
        assert!(TopUpStatus::Pending.can_transition_to(TopUpStatus::Succeeded));
        assert!(TopUpStatus::Pending.can_transition_to(TopUpStatus::Failed));

        assert!(!TopUpStatus::Pending.can_transition_to(TopUpStatus::Pending));
        assert!(!TopUpStatus::Failed.can_transition_to(TopUpStatus::Succeeded));
        assert!(!TopUpStatus::Succeeded.can_transition_to(TopUpStatus::Failed));
        assert!(!TopUpStatus::Succeeded.can_transition_to(TopUpStatus::Pending));
    }

    #[test]
    fn test_parse_column_values() {
        assert_eq!("pending".parse(), Ok(TopUpStatus::Pending));
        assert_eq!("succeeded".parse(), Ok(TopUpStatus::Succeeded));
        assert_eq!("failed".parse(), Ok(TopUpStatus::Failed));
        assert!("SUCCEEDED".parse::<TopUpStatus>().is_err());
        assert!("refunded".parse::<TopUpStatus>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(TopUpStatus::Succeeded.to_string(), "succeeded");
    }
}
