//! Rock-paper-scissors, the reference game engine.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::outcome::{DuelOutcome, PlayerSlot};
use crate::domain::payload::DuelPayload;
use crate::errors::domain::{ConflictKind, DomainError, InfraErrorKind, ValidationKind};
use crate::games::{GameEngine, GameProgress};

pub const GAME_KEY: &str = "rps";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RpsMove {
    Rock,
    Paper,
    Scissors,
}

impl RpsMove {
    fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw.to_ascii_lowercase().as_str() {
            "rock" => Ok(RpsMove::Rock),
            "paper" => Ok(RpsMove::Paper),
            "scissors" => Ok(RpsMove::Scissors),
            other => Err(DomainError::validation(
                ValidationKind::InvalidMove,
                format!("Unknown move '{other}'"),
            )),
        }
    }

    /// Standard cyclic relation: rock beats scissors, scissors beats paper,
    /// paper beats rock.
    fn beats(&self, other: &RpsMove) -> bool {
        matches!(
            (self, other),
            (RpsMove::Rock, RpsMove::Scissors)
                | (RpsMove::Scissors, RpsMove::Paper)
                | (RpsMove::Paper, RpsMove::Rock)
        )
    }
}

/// Engine-owned section of the payload: one nullable move slot per seat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct RpsState {
    move_a: Option<RpsMove>,
    move_b: Option<RpsMove>,
}

impl RpsState {
    fn from_payload(payload: &DuelPayload) -> Result<Self, DomainError> {
        if payload.game.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(payload.game.clone()).map_err(|e| {
            DomainError::infra(InfraErrorKind::Payload, format!("Malformed rps state: {e}"))
        })
    }

    fn write_to(&self, payload: &mut DuelPayload) -> Result<(), DomainError> {
        payload.game = serde_json::to_value(self).map_err(|e| {
            DomainError::infra(
                InfraErrorKind::Payload,
                format!("Rps state serialization failed: {e}"),
            )
        })?;
        Ok(())
    }

    fn outcome(&self) -> Option<DuelOutcome> {
        let (a, b) = (self.move_a?, self.move_b?);
        if a == b {
            Some(DuelOutcome::Draw)
        } else if a.beats(&b) {
            Some(DuelOutcome::WinA)
        } else {
            Some(DuelOutcome::WinB)
        }
    }
}

pub struct RpsEngine;

impl GameEngine for RpsEngine {
    fn key(&self) -> &'static str {
        GAME_KEY
    }

    fn apply(
        &self,
        payload: &mut DuelPayload,
        slot: PlayerSlot,
        action: &str,
    ) -> Result<GameProgress, DomainError> {
        let mv = RpsMove::parse(action)?;
        let mut state = RpsState::from_payload(payload)?;

        let own_slot = match slot {
            PlayerSlot::A => &mut state.move_a,
            PlayerSlot::B => &mut state.move_b,
        };
        if own_slot.is_some() {
            return Err(DomainError::conflict(
                ConflictKind::AlreadyPlayed,
                "Move already submitted for this duel",
            ));
        }
        *own_slot = Some(mv);

        state.write_to(payload)?;
        Ok(match state.outcome() {
            Some(outcome) => GameProgress::Finished(outcome),
            None => GameProgress::Waiting,
        })
    }

    fn is_complete(&self, payload: &DuelPayload) -> bool {
        RpsState::from_payload(payload)
            .map(|state| state.move_a.is_some() && state.move_b.is_some())
            .unwrap_or(false)
    }

    fn resolve(&self, payload: &DuelPayload) -> Result<DuelOutcome, DomainError> {
        let state = RpsState::from_payload(payload)?;
        state.outcome().ok_or_else(|| {
            DomainError::infra(
                InfraErrorKind::Payload,
                "Cannot resolve an incomplete rps payload",
            )
        })
    }

    fn public_view(&self, payload: &DuelPayload) -> Value {
        let state = RpsState::from_payload(payload).unwrap_or_default();
        let complete = state.move_a.is_some() && state.move_b.is_some();
        // Moves stay hidden until both are in.
        if complete {
            json!({
                "player_a_played": true,
                "player_b_played": true,
                "move_a": state.move_a,
                "move_b": state.move_b,
            })
        } else {
            json!({
                "player_a_played": state.move_a.is_some(),
                "player_b_played": state.move_b.is_some(),
            })
        }
    }
}
