//! Terminal outcomes and player seats of a duel.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::domain::{DomainError, ValidationKind};

/// Which of the two seats a member occupies in a session.
/// Slot A is the challenger, slot B the challenged member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerSlot {
    A,
    B,
}

/// Terminal result of a duel, produced by a game engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuelOutcome {
    #[serde(rename = "DRAW")]
    Draw,
    #[serde(rename = "WIN_A")]
    WinA,
    #[serde(rename = "WIN_B")]
    WinB,
}

impl DuelOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuelOutcome::Draw => "DRAW",
            DuelOutcome::WinA => "WIN_A",
            DuelOutcome::WinB => "WIN_B",
        }
    }

    /// The winning seat, or None on a draw.
    pub fn winner(&self) -> Option<PlayerSlot> {
        match self {
            DuelOutcome::Draw => None,
            DuelOutcome::WinA => Some(PlayerSlot::A),
            DuelOutcome::WinB => Some(PlayerSlot::B),
        }
    }
}

impl FromStr for DuelOutcome {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAW" => Ok(DuelOutcome::Draw),
            "WIN_A" => Ok(DuelOutcome::WinA),
            "WIN_B" => Ok(DuelOutcome::WinB),
            other => Err(DomainError::validation(
                ValidationKind::InvalidResult,
                format!("Unknown duel result '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_round_trips_through_str() {
        for outcome in [DuelOutcome::Draw, DuelOutcome::WinA, DuelOutcome::WinB] {
            assert_eq!(outcome.as_str().parse::<DuelOutcome>().unwrap(), outcome);
        }
    }

    #[test]
    fn unknown_result_is_rejected() {
        let err = "WIN_C".parse::<DuelOutcome>().unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(crate::errors::domain::ValidationKind::InvalidResult, _)
        ));
    }

    #[test]
    fn winner_seat() {
        assert_eq!(DuelOutcome::Draw.winner(), None);
        assert_eq!(DuelOutcome::WinA.winner(), Some(PlayerSlot::A));
        assert_eq!(DuelOutcome::WinB.winner(), Some(PlayerSlot::B));
    }
}
