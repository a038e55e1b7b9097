//! Preparation status values and the order they advance in.
//!
//! The string forms must match the `preparations.status` CHECK constraint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Where a preparation is in its lifecycle.
///
/// The lifecycle is strictly linear:
/// `RECEIVED -> IN_PREPARATION -> READY -> COMPLETED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreparationStatus {
    Received,
    InPreparation,
    Ready,
    Completed,
}

impl PreparationStatus {
    /// Statuses that appear on the waiting list, in display precedence.
    pub const WAITING: [PreparationStatus; 3] = [
        PreparationStatus::Ready,
        PreparationStatus::InPreparation,
        PreparationStatus::Received,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PreparationStatus::Received => "RECEIVED",
            PreparationStatus::InPreparation => "IN_PREPARATION",
            PreparationStatus::Ready => "READY",
            PreparationStatus::Completed => "COMPLETED",
        }
    }

    /// The single status this one may advance to, if any.
    pub fn next(self) -> Option<PreparationStatus> {
        match self {
            PreparationStatus::Received => Some(PreparationStatus::InPreparation),
            PreparationStatus::InPreparation => Some(PreparationStatus::Ready),
            PreparationStatus::Ready => Some(PreparationStatus::Completed),
            PreparationStatus::Completed => None,
        }
    }

    pub fn can_transition_to(self, target: PreparationStatus) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for PreparationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreparationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVED" => Ok(PreparationStatus::Received),
            "IN_PREPARATION" => Ok(PreparationStatus::InPreparation),
            "READY" => Ok(PreparationStatus::Ready),
            "COMPLETED" => Ok(PreparationStatus::Completed),
            other => Err(CoreError::Validation(format!(
                "Invalid preparation status '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PreparationStatus; 4] = [
        PreparationStatus::Received,
        PreparationStatus::InPreparation,
        PreparationStatus::Ready,
        PreparationStatus::Completed,
    ];

    #[test]
    fn only_the_immediate_successor_is_reachable() {
        for from in ALL {
            let legal: Vec<_> = ALL
                .into_iter()
                .filter(|to| from.can_transition_to(*to))
                .collect();
            assert_eq!(legal, from.next().into_iter().collect::<Vec<_>>());
        }
    }

    #[test]
    fn completed_is_terminal() {
        assert_eq!(PreparationStatus::Completed.next(), None);
        assert!(!PreparationStatus::Completed.can_transition_to(PreparationStatus::Received));
    }

    #[test]
    fn string_form_parses_back() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<PreparationStatus>().unwrap(), status);
        }
        assert!("received".parse::<PreparationStatus>().is_err());
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&PreparationStatus::InPreparation).unwrap();
        assert_eq!(json, "\"IN_PREPARATION\"");
    }
}
