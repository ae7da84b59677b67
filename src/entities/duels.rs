use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum DuelStatus {
    #[sea_orm(string_value = "CONFIG")]
    Config,
    #[sea_orm(string_value = "INVITED")]
    Invited,
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "FINISHED")]
    Finished,
    #[sea_orm(string_value = "EXPIRED")]
    Expired,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl DuelStatus {
    /// Terminal statuses are never revisited and are skipped by the
    /// expiry sweep.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DuelStatus::Finished | DuelStatus::Expired | DuelStatus::Cancelled
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "duels")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "space_id")]
    pub space_id: i64,
    #[sea_orm(column_name = "channel_id")]
    pub channel_id: i64,
    #[sea_orm(column_name = "player_a_id")]
    pub player_a_id: i64,
    #[sea_orm(column_name = "player_b_id")]
    pub player_b_id: i64,
    pub status: DuelStatus,
    #[sea_orm(column_name = "game_type")]
    pub game_type: Option<String>,
    #[sea_orm(column_name = "stake_xp")]
    pub stake_xp: Option<i32>,
    #[sea_orm(column_name = "message_ref")]
    pub message_ref: Option<String>,
    #[sea_orm(column_name = "created_at")]
    pub created_at: OffsetDateTime,
    #[sea_orm(column_name = "expires_at")]
    pub expires_at: Option<OffsetDateTime>,
    #[sea_orm(column_name = "finished_at")]
    pub finished_at: Option<OffsetDateTime>,
    /// Opaque game-engine-owned blob, serialized JSON. Only ever written
    /// through a compare-and-swap against the previously read text.
    #[sea_orm(column_type = "Text")]
    pub payload: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
