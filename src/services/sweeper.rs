//! Periodic maintenance: expire stale sessions, reconcile logically-complete
//! ones, and physically delete terminal sessions past retention.
//!
//! One failing session must never stop a sweep; every per-item error is
//! logged and the batch continues.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use time::OffsetDateTime;
use tracing::{debug, error, info};

use crate::adapters::duels_sea::{DuelTransition, RetentionCutoffs};
use crate::config::DuelConfig;
use crate::db::with_txn;
use crate::domain::payload::DuelPayload;
use crate::entities::duels::DuelStatus;
use crate::errors::domain::DomainError;
use crate::games::GameRegistry;
use crate::repos::{duels, ledger};
use crate::services::gameplay::GameplayService;

/// Change record for one swept session, handed to the presentation layer so
/// it can edit or disable the associated message.
#[derive(Debug, Clone, PartialEq)]
pub struct SweptDuel {
    pub duel_id: i64,
    pub prior_status: DuelStatus,
    pub message_ref: Option<String>,
    /// True when the sweep settled a logically-complete session through the
    /// atomic finish procedure instead of expiring it.
    pub auto_finished: bool,
}

pub struct MaintenanceSweeper {
    config: DuelConfig,
    registry: Arc<GameRegistry>,
    gameplay: GameplayService,
}

impl MaintenanceSweeper {
    pub fn new(config: DuelConfig, registry: Arc<GameRegistry>) -> Self {
        let gameplay = GameplayService::new(Arc::clone(&registry));
        Self {
            config,
            registry,
            gameplay,
        }
    }

    /// Expire all non-terminal sessions whose window has passed at `now`.
    ///
    /// ACTIVE sessions whose game is already logically complete are settled
    /// through the shared finish procedure ("finish on time" wins over
    /// "expire on time"); everything else transitions to EXPIRED, refunding
    /// the escrowed stake when the prior status was ACTIVE.
    pub async fn sweep_expired(
        &self,
        db: &DatabaseConnection,
        now: OffsetDateTime,
    ) -> Result<Vec<SweptDuel>, DomainError> {
        let expired = duels::list_expired(db, now).await?;
        let candidates = expired.len();

        let mut swept = Vec::new();
        for duel in expired {
            match self.sweep_one(db, duel.id, now).await {
                Ok(Some(record)) => swept.push(record),
                Ok(None) => {}
                Err(err) => {
                    // Isolate the failure; the rest of the batch proceeds.
                    error!(duel_id = duel.id, error = %err, "Sweep failed for duel");
                }
            }
        }

        info!(candidates, swept = swept.len(), "Expiry sweep complete");
        Ok(swept)
    }

    async fn sweep_one(
        &self,
        db: &DatabaseConnection,
        duel_id: i64,
        now: OffsetDateTime,
    ) -> Result<Option<SweptDuel>, DomainError> {
        // Fresh re-read: the listing may be stale by the time we get here.
        let duel = match duels::find_by_id(db, duel_id).await? {
            Some(duel) => duel,
            None => return Ok(None),
        };
        if duel.status.is_terminal() || !duel.is_expired(now) {
            return Ok(None);
        }

        if duel.status == DuelStatus::Active {
            if let Some(game_type) = &duel.game_type {
                let engine = self.registry.require(game_type)?;
                let payload = DuelPayload::parse(&duel.payload)?;
                if engine.is_complete(&payload) {
                    let outcome = engine.resolve(&payload)?;
                    return match self.gameplay.finish_duel(db, duel_id, outcome, true).await {
                        Ok(()) => {
                            info!(duel_id, outcome = outcome.as_str(), "Duel auto-finished");
                            Ok(Some(SweptDuel {
                                duel_id,
                                prior_status: DuelStatus::Active,
                                message_ref: duel.message_ref.clone(),
                                auto_finished: true,
                            }))
                        }
                        Err(err) if err.is_finish_race() => {
                            debug!(duel_id, "Auto-finish race lost, already settled");
                            Ok(None)
                        }
                        Err(err) => Err(err),
                    };
                }
            }
        }

        self.expire(db, &duel, now).await
    }

    /// Plain expiry: conditional transition to EXPIRED, refunding the stake
    /// when it had been escrowed (prior status ACTIVE).
    async fn expire(
        &self,
        db: &DatabaseConnection,
        duel: &duels::Duel,
        now: OffsetDateTime,
    ) -> Result<Option<SweptDuel>, DomainError> {
        let prior_status = duel.status.clone();
        let refund = if prior_status == DuelStatus::Active {
            Some(i64::from(duel.require_stake()?))
        } else {
            None
        };

        let expired = with_txn(db, |txn| {
            let duel = duel.clone();
            let prior_status = prior_status.clone();
            Box::pin(async move {
                let transitioned = duels::transition(
                    txn,
                    DuelTransition::new(duel.id, prior_status, DuelStatus::Expired)
                        .with_finished_at(now),
                )
                .await?;
                if !transitioned {
                    // Another actor moved the session first.
                    return Ok(false);
                }

                if let Some(stake) = refund {
                    ledger::apply_delta(txn, duel.space_id, duel.player_a_id, stake).await?;
                    ledger::apply_delta(txn, duel.space_id, duel.player_b_id, stake).await?;
                }
                Ok(true)
            })
        })
        .await?;

        if !expired {
            debug!(duel_id = duel.id, "Expiry race lost, skipping");
            return Ok(None);
        }

        info!(
            duel_id = duel.id,
            prior_status = ?prior_status,
            refunded = refund.is_some(),
            "Duel expired"
        );
        Ok(Some(SweptDuel {
            duel_id: duel.id,
            prior_status,
            message_ref: duel.message_ref.clone(),
            auto_finished: false,
        }))
    }

    /// Physically delete terminal sessions older than their retention
    /// window: a shorter one for EXPIRED/CANCELLED, a longer one for
    /// FINISHED. Returns the number of rows removed.
    pub async fn sweep_retention(
        &self,
        db: &DatabaseConnection,
        now: OffsetDateTime,
    ) -> Result<u64, DomainError> {
        let deleted = duels::delete_older_than(
            db,
            RetentionCutoffs {
                expired_before: now - self.config.expired_retention,
                finished_before: now - self.config.finished_retention,
            },
        )
        .await?;

        info!(deleted, "Retention sweep complete");
        Ok(deleted)
    }
}
