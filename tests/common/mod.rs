//! Shared helpers for integration tests: an isolated in-memory database per
//! test with the schema derived from the entities, plus service constructors
//! and seed/inspection utilities.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use duelcore::config::DuelConfig;
use duelcore::entities::duels;
use duelcore::games::GameRegistry;
use duelcore::repos;
use duelcore::services::{DuelFlowService, GameplayService, MaintenanceSweeper};
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Schema, Set,
};
use time::{Duration, OffsetDateTime};

pub const SPACE: i64 = 10;
pub const CHANNEL: i64 = 77;
pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;

pub const STAKE: i32 = 100;
pub const STARTING_XP: i64 = 500;

pub async fn test_db() -> DatabaseConnection {
    init_tracing();

    // In-memory SQLite databases are per-connection; cap the pool at one.
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1);
    let db = Database::connect(opts).await.expect("connect test db");

    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    for stmt in [
        schema.create_table_from_entity(duelcore::entities::duels::Entity),
        schema.create_table_from_entity(duelcore::entities::member_xp::Entity),
    ] {
        db.execute(backend.build(&stmt)).await.expect("create table");
    }
    db
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn registry() -> Arc<GameRegistry> {
    Arc::new(GameRegistry::with_builtins())
}

pub fn flow() -> DuelFlowService {
    DuelFlowService::new(DuelConfig::default(), registry())
}

pub fn gameplay() -> GameplayService {
    GameplayService::new(registry())
}

pub fn sweeper() -> MaintenanceSweeper {
    MaintenanceSweeper::new(DuelConfig::default(), registry())
}

pub async fn seed_xp(db: &DatabaseConnection, member_id: i64, amount: i64) {
    repos::ledger::apply_delta(db, SPACE, member_id, amount)
        .await
        .expect("seed xp");
}

pub async fn balance(db: &DatabaseConnection, member_id: i64) -> i64 {
    repos::ledger::get_balance(db, SPACE, member_id)
        .await
        .expect("read balance")
}

pub async fn duel_status(db: &DatabaseConnection, duel_id: i64) -> duels::DuelStatus {
    repos::duels::require_duel(db, duel_id)
        .await
        .expect("load duel")
        .status
}

/// Create and fully configure a duel between Alice and Bob, seeded with
/// `STARTING_XP` each, and bring it to INVITED.
pub async fn invited_duel(db: &DatabaseConnection) -> i64 {
    seed_xp(db, ALICE, STARTING_XP).await;
    seed_xp(db, BOB, STARTING_XP).await;

    let service = flow();
    let created = service
        .create(db, SPACE, CHANNEL, ALICE, BOB)
        .await
        .expect("create duel");
    let duel_id = created.duel.id;
    service
        .configure_game_type(db, duel_id, "rps")
        .await
        .expect("configure game type");
    service
        .configure_stake(db, duel_id, STAKE)
        .await
        .expect("configure stake");
    service
        .send_invite(db, duel_id, "msg-1")
        .await
        .expect("send invite");
    duel_id
}

/// An accepted duel: stake escrowed, session ACTIVE.
pub async fn active_duel(db: &DatabaseConnection) -> i64 {
    let duel_id = invited_duel(db).await;
    flow()
        .accept(db, duel_id, BOB)
        .await
        .expect("accept duel");
    duel_id
}

/// Push the session's expiry into the past, bypassing the services.
pub async fn force_expire(db: &DatabaseConnection, duel_id: i64) {
    let past = OffsetDateTime::now_utc() - Duration::hours(1);
    duels::Entity::update_many()
        .set(duels::ActiveModel {
            expires_at: Set(Some(past)),
            ..Default::default()
        })
        .filter(duels::Column::Id.eq(duel_id))
        .exec(db)
        .await
        .expect("force expire");
}

/// Backdate `finished_at`, bypassing the services.
pub async fn force_finished_at(db: &DatabaseConnection, duel_id: i64, when: OffsetDateTime) {
    duels::Entity::update_many()
        .set(duels::ActiveModel {
            finished_at: Set(Some(when)),
            ..Default::default()
        })
        .filter(duels::Column::Id.eq(duel_id))
        .exec(db)
        .await
        .expect("force finished_at");
}
