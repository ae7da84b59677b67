//! SeaORM adapter for the per-member XP ledger - generic over ConnectionTrait.

use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set};
use time::OffsetDateTime;

use crate::entities::member_xp;

pub async fn find_balance<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    space_id: i64,
    member_id: i64,
) -> Result<Option<member_xp::Model>, sea_orm::DbErr> {
    member_xp::Entity::find()
        .filter(member_xp::Column::SpaceId.eq(space_id))
        .filter(member_xp::Column::MemberId.eq(member_id))
        .one(conn)
        .await
}

/// Apply a signed delta in place (`xp = xp + delta`), creating the row when
/// the member has no counter yet.
pub async fn apply_delta<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    space_id: i64,
    member_id: i64,
    delta: i64,
) -> Result<(), sea_orm::DbErr> {
    let now = OffsetDateTime::now_utc();

    let result = member_xp::Entity::update_many()
        .col_expr(
            member_xp::Column::Xp,
            Expr::col(member_xp::Column::Xp).add(delta),
        )
        .col_expr(member_xp::Column::UpdatedAt, Expr::val(now).into())
        .filter(member_xp::Column::SpaceId.eq(space_id))
        .filter(member_xp::Column::MemberId.eq(member_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        let row = member_xp::ActiveModel {
            id: NotSet,
            space_id: Set(space_id),
            member_id: Set(member_id),
            xp: Set(delta),
            updated_at: Set(now),
        };
        row.insert(conn).await?;
    }

    Ok(())
}
