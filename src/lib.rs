#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

//! Wagered duel session engine for a community-chat bot.
//!
//! Two members of a space challenge each other, configure a game type and an
//! XP stake, and play a short mini-game to completion; the winner takes the
//! pooled stake. The engine owns the session lifecycle: the configuration
//! handshake, escrow and payout, the pluggable game-engine contract, and the
//! expiry/maintenance sweeper. All cross-actor invariants are enforced
//! through conditional writes against the store; there is no in-process
//! locking.

pub mod adapters;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod errors;
pub mod games;
pub mod infra;
pub mod repos;
pub mod services;

// Re-exports for public API
pub use config::DuelConfig;
pub use domain::outcome::{DuelOutcome, PlayerSlot};
pub use domain::snapshot::{DuelEffects, DuelSnapshot};
pub use entities::duels::DuelStatus;
pub use errors::DomainError;
pub use games::{GameEngine, GameProgress, GameRegistry};
pub use services::{DuelFlowService, GameplayService, MaintenanceSweeper, SweptDuel};
