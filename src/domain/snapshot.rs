//! Read-only projection of a duel session for the presentation layer.
//!
//! Every core operation emerges through here: the bot's command/UI layer
//! renders snapshots and never touches duel internals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::domain::levels::LevelChange;
use crate::entities::duels::DuelStatus;
use crate::repos::duels::Duel;

/// Core session fields, present in every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelPublic {
    pub id: i64,
    pub space_id: i64,
    pub channel_id: i64,
    pub player_a_id: i64,
    pub player_b_id: i64,
    pub status: DuelStatus,
    pub game_type: Option<String>,
    pub stake_xp: Option<i32>,
    pub message_ref: Option<String>,
    pub created_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
}

/// Configuration hints for rendering stake pickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiInfo {
    pub allowed_stakes: Vec<i32>,
}

/// Side effects of an operation the presentation layer must react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelEffects {
    pub xp_changed: bool,
    /// Members whose derived rank should be re-synced.
    pub sync_member_ids: Vec<i64>,
    pub level_changes: Vec<LevelChange>,
    pub auto_finished: bool,
}

/// Top-level snapshot: core fields plus optional enrichments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelSnapshot {
    pub duel: DuelPublic,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiInfo>,
    /// Member id -> current XP balance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp: Option<BTreeMap<i64, i64>>,
    /// Engine-specific public view of the in-progress game.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effects: Option<DuelEffects>,
}

/// Entry point: project a duel record into its public form.
pub fn snapshot(duel: &Duel) -> DuelSnapshot {
    DuelSnapshot {
        duel: DuelPublic {
            id: duel.id,
            space_id: duel.space_id,
            channel_id: duel.channel_id,
            player_a_id: duel.player_a_id,
            player_b_id: duel.player_b_id,
            status: duel.status.clone(),
            game_type: duel.game_type.clone(),
            stake_xp: duel.stake_xp,
            message_ref: duel.message_ref.clone(),
            created_at: duel.created_at,
            expires_at: duel.expires_at,
            finished_at: duel.finished_at,
        },
        ui: None,
        xp: None,
        game: None,
        effects: None,
    }
}

impl DuelSnapshot {
    pub fn with_ui(mut self, allowed_stakes: Vec<i32>) -> Self {
        self.ui = Some(UiInfo { allowed_stakes });
        self
    }

    pub fn with_xp(mut self, xp: BTreeMap<i64, i64>) -> Self {
        self.xp = Some(xp);
        self
    }

    pub fn with_game(mut self, game: Value) -> Self {
        self.game = Some(game);
        self
    }

    pub fn with_effects(mut self, effects: DuelEffects) -> Self {
        self.effects = Some(effects);
        self
    }
}
