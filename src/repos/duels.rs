//! Duel repository functions for the domain layer.

use sea_orm::ConnectionTrait;
use time::OffsetDateTime;

use crate::adapters::duels_sea as duels_adapter;
use crate::adapters::duels_sea::{DuelCreate, DuelTransition, RetentionCutoffs};
use crate::domain::outcome::PlayerSlot;
use crate::entities::duels;
use crate::entities::duels::DuelStatus;
use crate::errors::domain::{DomainError, InfraErrorKind, NotFoundKind};
use crate::infra::db_errors;

/// Duel session domain model, converted from the database model when loaded
/// through repos functions.
#[derive(Debug, Clone, PartialEq)]
pub struct Duel {
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
    /// Raw stored payload text; parse through `DuelPayload::parse`.
    pub payload: String,
}

impl Duel {
    /// Whether the session's expiry window has passed at `now`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }

    /// Seat occupied by the given member, if they participate at all.
    pub fn slot_of(&self, member_id: i64) -> Option<PlayerSlot> {
        if member_id == self.player_a_id {
            Some(PlayerSlot::A)
        } else if member_id == self.player_b_id {
            Some(PlayerSlot::B)
        } else {
            None
        }
    }

    /// The stake, required to be present past CONFIG.
    pub fn require_stake(&self) -> Result<i32, DomainError> {
        self.stake_xp.ok_or_else(|| {
            DomainError::infra(
                InfraErrorKind::DataCorruption,
                format!("Duel {} has no stake past configuration", self.id),
            )
        })
    }
}

// Free functions generic over ConnectionTrait, mapping DbErr centrally.

pub async fn create_duel<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: DuelCreate,
) -> Result<Duel, DomainError> {
    let duel = duels_adapter::insert_duel(conn, dto).await.map_err(|e| {
        DomainError::infra(
            InfraErrorKind::Other("DuelInsert".into()),
            format!("Duel insert failed: {e}"),
        )
    })?;
    Ok(Duel::from(duel))
}

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    duel_id: i64,
) -> Result<Option<Duel>, DomainError> {
    let duel = duels_adapter::find_by_id(conn, duel_id)
        .await
        .map_err(db_errors::map_db_err)?;
    Ok(duel.map(Duel::from))
}

/// Find duel by ID or return a typed not-found error.
pub async fn require_duel<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    duel_id: i64,
) -> Result<Duel, DomainError> {
    find_by_id(conn, duel_id).await?.ok_or_else(|| {
        DomainError::not_found(NotFoundKind::Duel, format!("Duel {duel_id} not found"))
    })
}

pub async fn find_open_for_member<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    space_id: i64,
    member_id: i64,
    exclude_duel_id: Option<i64>,
) -> Result<Option<Duel>, DomainError> {
    let duel = duels_adapter::find_open_for_member(conn, space_id, member_id, exclude_duel_id)
        .await
        .map_err(db_errors::map_db_err)?;
    Ok(duel.map(Duel::from))
}

/// Conditional CONFIG-phase write. Returns false when the session already
/// left CONFIG; the caller owns the conflict mapping.
pub async fn set_game_type<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    duel_id: i64,
    game_type: &str,
) -> Result<bool, DomainError> {
    let rows = duels_adapter::set_game_type(conn, duel_id, game_type)
        .await
        .map_err(db_errors::map_db_err)?;
    Ok(rows > 0)
}

/// Conditional CONFIG-phase write, see `set_game_type`.
pub async fn set_stake<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    duel_id: i64,
    stake_xp: i32,
) -> Result<bool, DomainError> {
    let rows = duels_adapter::set_stake(conn, duel_id, stake_xp)
        .await
        .map_err(db_errors::map_db_err)?;
    Ok(rows > 0)
}

/// Conditional status transition. Returns false when another actor already
/// moved the session out of the expected prior status.
pub async fn transition<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: DuelTransition,
) -> Result<bool, DomainError> {
    let rows = duels_adapter::transition(conn, dto)
        .await
        .map_err(db_errors::map_db_err)?;
    Ok(rows > 0)
}

/// Payload compare-and-swap. Returns false on contention.
pub async fn swap_payload<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    duel_id: i64,
    expected_payload: &str,
    new_payload: String,
) -> Result<bool, DomainError> {
    let rows = duels_adapter::swap_payload(conn, duel_id, expected_payload, new_payload)
        .await
        .map_err(db_errors::map_db_err)?;
    Ok(rows > 0)
}

/// Write `finished_at` against a FINISHED status. A false return is a hard
/// consistency fault for the caller, not a benign race.
pub async fn set_finished_at<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    duel_id: i64,
    finished_at: OffsetDateTime,
) -> Result<bool, DomainError> {
    let rows = duels_adapter::set_finished_at(conn, duel_id, finished_at)
        .await
        .map_err(db_errors::map_db_err)?;
    Ok(rows > 0)
}

pub async fn list_expired<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    now: OffsetDateTime,
) -> Result<Vec<Duel>, DomainError> {
    let duels = duels_adapter::list_expired(conn, now)
        .await
        .map_err(db_errors::map_db_err)?;
    Ok(duels.into_iter().map(Duel::from).collect())
}

pub async fn delete_older_than<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    cutoffs: RetentionCutoffs,
) -> Result<u64, DomainError> {
    duels_adapter::delete_older_than(conn, cutoffs)
        .await
        .map_err(db_errors::map_db_err)
}

// Conversion between SeaORM model and domain model

impl From<duels::Model> for Duel {
    fn from(model: duels::Model) -> Self {
        Self {
            id: model.id,
            space_id: model.space_id,
            channel_id: model.channel_id,
            player_a_id: model.player_a_id,
            player_b_id: model.player_b_id,
            status: model.status,
            game_type: model.game_type,
            stake_xp: model.stake_xp,
            message_ref: model.message_ref,
            created_at: model.created_at,
            expires_at: model.expires_at,
            finished_at: model.finished_at,
            payload: model.payload,
        }
    }
}
