//! Pluggable mini-game engines and their registry.

pub mod rps;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::outcome::{DuelOutcome, PlayerSlot};
use crate::domain::payload::DuelPayload;
use crate::errors::domain::{DomainError, ValidationKind};

/// Progress of a game after applying one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameProgress {
    /// Not all participants have moved yet.
    Waiting,
    /// The game is over with the given result.
    Finished(DuelOutcome),
}

/// One mini-game implementation.
///
/// Engines are pure over the payload envelope: loading, participant and
/// status validation, and the compare-and-swap write cycle are owned by the
/// gameplay coordinator, so every engine gets the same concurrency
/// behaviour for free.
pub trait GameEngine: Send + Sync {
    /// Unique registry key (the `game_type` stored on a session).
    fn key(&self) -> &'static str;

    /// Apply one in-game action for the given seat, mutating the engine's
    /// section of the payload. Rejects repeated moves (`AlreadyPlayed`) and
    /// unknown move values (`InvalidMove`).
    fn apply(
        &self,
        payload: &mut DuelPayload,
        slot: PlayerSlot,
        action: &str,
    ) -> Result<GameProgress, DomainError>;

    /// Pure predicate: has this payload reached a terminal game state?
    /// Used by the sweeper to detect sessions that finished logically but
    /// were never settled.
    fn is_complete(&self, payload: &DuelPayload) -> bool;

    /// Compute the terminal result of a complete payload. Raises a payload
    /// error when called on an incomplete one.
    fn resolve(&self, payload: &DuelPayload) -> Result<DuelOutcome, DomainError>;

    /// Engine-specific section of snapshots. Must not leak information a
    /// participant should not see yet (e.g. the opponent's pending move).
    fn public_view(&self, payload: &DuelPayload) -> Value;
}

/// Maps game-type keys to engines. One explicit instance is constructed at
/// startup and shared by the coordinator and the sweeper.
#[derive(Default)]
pub struct GameRegistry {
    engines: HashMap<&'static str, Arc<dyn GameEngine>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all built-in engines.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(rps::RpsEngine));
        registry
    }

    pub fn register(&mut self, engine: Arc<dyn GameEngine>) {
        self.engines.insert(engine.key(), engine);
    }

    /// Look up an engine, failing closed on unknown keys.
    pub fn require(&self, key: &str) -> Result<Arc<dyn GameEngine>, DomainError> {
        self.engines.get(key).cloned().ok_or_else(|| {
            DomainError::validation(
                ValidationKind::InvalidGameType,
                format!("Unknown game type '{key}'"),
            )
        })
    }

    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.engines.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_rps() {
        let registry = GameRegistry::with_builtins();
        assert!(registry.require(rps::GAME_KEY).is_ok());
        assert_eq!(registry.keys(), vec![rps::GAME_KEY]);
    }

    #[test]
    fn unknown_key_fails_closed() {
        let registry = GameRegistry::with_builtins();
        let err = registry.require("tic_tac_toe").err().unwrap();
        assert!(matches!(
            err,
            DomainError::Validation(ValidationKind::InvalidGameType, _)
        ));
    }
}
