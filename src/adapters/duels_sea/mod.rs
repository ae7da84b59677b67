//! SeaORM adapter for the duel store - generic over ConnectionTrait.
//!
//! All conditional writes are expressed as `update_many` filtered on the
//! expected prior value (status or payload text) and report the affected row
//! count. Zero rows means the caller lost a race; the repos layer decides
//! which typed conflict that maps to at each call site.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};
use time::OffsetDateTime;

use crate::entities::duels::{self, DuelStatus};

pub mod dto;

pub use dto::{DuelCreate, DuelTransition, RetentionCutoffs};

// Adapter functions return DbErr; the repos layer maps to DomainError.

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    duel_id: i64,
) -> Result<Option<duels::Model>, sea_orm::DbErr> {
    duels::Entity::find()
        .filter(duels::Column::Id.eq(duel_id))
        .one(conn)
        .await
}

/// Any non-terminal commitment for this member in this space: a session in
/// INVITED or ACTIVE where the member occupies either seat. Callers checking
/// on behalf of an existing session exclude it by id.
pub async fn find_open_for_member<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    space_id: i64,
    member_id: i64,
    exclude_duel_id: Option<i64>,
) -> Result<Option<duels::Model>, sea_orm::DbErr> {
    let mut query = duels::Entity::find()
        .filter(duels::Column::SpaceId.eq(space_id))
        .filter(duels::Column::Status.is_in([DuelStatus::Invited, DuelStatus::Active]))
        .filter(
            Condition::any()
                .add(duels::Column::PlayerAId.eq(member_id))
                .add(duels::Column::PlayerBId.eq(member_id)),
        );
    if let Some(duel_id) = exclude_duel_id {
        query = query.filter(duels::Column::Id.ne(duel_id));
    }
    query.one(conn).await
}

pub async fn insert_duel<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: DuelCreate,
) -> Result<duels::Model, sea_orm::DbErr> {
    let now = OffsetDateTime::now_utc();
    let duel_active = duels::ActiveModel {
        id: NotSet,
        space_id: Set(dto.space_id),
        channel_id: Set(dto.channel_id),
        player_a_id: Set(dto.player_a_id),
        player_b_id: Set(dto.player_b_id),
        status: Set(DuelStatus::Config),
        game_type: NotSet,
        stake_xp: NotSet,
        message_ref: NotSet,
        created_at: Set(now),
        expires_at: Set(Some(dto.expires_at)),
        finished_at: NotSet,
        payload: Set(dto.payload),
    };

    duel_active.insert(conn).await
}

/// Write `game_type` while the session is still in CONFIG.
pub async fn set_game_type<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    duel_id: i64,
    game_type: &str,
) -> Result<u64, sea_orm::DbErr> {
    let update = duels::ActiveModel {
        game_type: Set(Some(game_type.to_string())),
        ..Default::default()
    };
    let result = duels::Entity::update_many()
        .set(update)
        .filter(duels::Column::Id.eq(duel_id))
        .filter(duels::Column::Status.eq(DuelStatus::Config))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Write `stake_xp` while the session is still in CONFIG.
pub async fn set_stake<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    duel_id: i64,
    stake_xp: i32,
) -> Result<u64, sea_orm::DbErr> {
    let update = duels::ActiveModel {
        stake_xp: Set(Some(stake_xp)),
        ..Default::default()
    };
    let result = duels::Entity::update_many()
        .set(update)
        .filter(duels::Column::Id.eq(duel_id))
        .filter(duels::Column::Status.eq(DuelStatus::Config))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Conditional status transition per the DTO. Returns affected row count.
pub async fn transition<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: DuelTransition,
) -> Result<u64, sea_orm::DbErr> {
    let update = duels::ActiveModel {
        status: Set(dto.to),
        expires_at: match dto.expires_at {
            Some(value) => Set(value),
            None => NotSet,
        },
        message_ref: match dto.message_ref {
            Some(message_ref) => Set(Some(message_ref)),
            None => NotSet,
        },
        finished_at: match dto.finished_at {
            Some(finished_at) => Set(Some(finished_at)),
            None => NotSet,
        },
        ..Default::default()
    };

    let result = duels::Entity::update_many()
        .set(update)
        .filter(duels::Column::Id.eq(dto.id))
        .filter(duels::Column::Status.eq(dto.from))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Compare-and-swap of the payload text. Returns affected row count.
pub async fn swap_payload<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    duel_id: i64,
    expected_payload: &str,
    new_payload: String,
) -> Result<u64, sea_orm::DbErr> {
    let update = duels::ActiveModel {
        payload: Set(new_payload),
        ..Default::default()
    };
    let result = duels::Entity::update_many()
        .set(update)
        .filter(duels::Column::Id.eq(duel_id))
        .filter(duels::Column::Payload.eq(expected_payload))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Write `finished_at`, required to land on a FINISHED session.
pub async fn set_finished_at<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    duel_id: i64,
    finished_at: OffsetDateTime,
) -> Result<u64, sea_orm::DbErr> {
    let update = duels::ActiveModel {
        finished_at: Set(Some(finished_at)),
        ..Default::default()
    };
    let result = duels::Entity::update_many()
        .set(update)
        .filter(duels::Column::Id.eq(duel_id))
        .filter(duels::Column::Status.eq(DuelStatus::Finished))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Non-terminal sessions whose expiry has passed, oldest expiry first.
pub async fn list_expired<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    now: OffsetDateTime,
) -> Result<Vec<duels::Model>, sea_orm::DbErr> {
    duels::Entity::find()
        .filter(duels::Column::Status.is_in([
            DuelStatus::Config,
            DuelStatus::Invited,
            DuelStatus::Active,
        ]))
        .filter(duels::Column::ExpiresAt.is_not_null())
        .filter(duels::Column::ExpiresAt.lte(now))
        .order_by_asc(duels::Column::ExpiresAt)
        .all(conn)
        .await
}

/// Physically delete terminal sessions past their retention cutoff.
pub async fn delete_older_than<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    cutoffs: RetentionCutoffs,
) -> Result<u64, sea_orm::DbErr> {
    let result = duels::Entity::delete_many()
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(
                            duels::Column::Status
                                .is_in([DuelStatus::Expired, DuelStatus::Cancelled]),
                        )
                        .add(duels::Column::FinishedAt.lt(cutoffs.expired_before)),
                )
                .add(
                    Condition::all()
                        .add(duels::Column::Status.eq(DuelStatus::Finished))
                        .add(duels::Column::FinishedAt.lt(cutoffs.finished_before)),
                ),
        )
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}
