//! Gameplay coordination: routes in-game actions to the configured engine
//! and drives the shared atomic finish procedure.
//!
//! The finish procedure is the single code path for payouts. The sweeper
//! calls it too, so an interactive move and a background reconciliation can
//! race on the same session and exactly one of them settles it.

use std::collections::BTreeMap;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::adapters::duels_sea::DuelTransition;
use crate::db::with_txn;
use crate::domain::levels;
use crate::domain::outcome::{DuelOutcome, PlayerSlot};
use crate::domain::payload::DuelPayload;
use crate::domain::snapshot::{self, DuelEffects, DuelSnapshot};
use crate::entities::duels::DuelStatus;
use crate::errors::domain::{ConflictKind, DomainError, InfraErrorKind};
use crate::games::{GameProgress, GameRegistry};
use crate::repos::duels::Duel;
use crate::repos::{duels, ledger};

/// Extra attempts after the first payload CAS failure. Contention here is
/// transient (two players moving near-simultaneously), unlike status CAS
/// failures which are never retried.
const PAYLOAD_CAS_RETRIES: usize = 2;

pub struct GameplayService {
    registry: Arc<GameRegistry>,
}

impl GameplayService {
    pub fn new(registry: Arc<GameRegistry>) -> Self {
        Self { registry }
    }

    /// Apply one in-game action for `acting_player` and, if that action ends
    /// the game, settle the session and enrich the snapshot with effects.
    pub async fn play_action(
        &self,
        db: &DatabaseConnection,
        duel_id: i64,
        acting_player: i64,
        action: &str,
    ) -> Result<DuelSnapshot, DomainError> {
        let initial = duels::require_duel(db, duel_id).await?;
        let game_type = initial.game_type.clone().ok_or_else(|| {
            DomainError::conflict(
                ConflictKind::WrongGameType,
                format!("Duel {duel_id} has no game type configured"),
            )
        })?;
        let engine = self.registry.require(&game_type)?;

        // Apply-and-write cycle: on CAS contention reload and redo the whole
        // cycle a bounded number of times.
        let mut attempt = 0;
        let (payload, progress) = loop {
            let duel = if attempt == 0 {
                initial.clone()
            } else {
                duels::require_duel(db, duel_id).await?
            };

            let slot = duel.slot_of(acting_player).ok_or_else(|| {
                DomainError::unauthorized(format!(
                    "Member {acting_player} does not participate in duel {duel_id}"
                ))
            })?;
            if duel.status != DuelStatus::Active {
                return Err(DomainError::conflict(
                    ConflictKind::NotActive,
                    format!("Duel {duel_id} is not active"),
                ));
            }
            if duel.game_type.as_deref() != Some(game_type.as_str()) {
                return Err(DomainError::conflict(
                    ConflictKind::WrongGameType,
                    format!("Duel {duel_id} is not a {game_type} duel"),
                ));
            }

            let mut payload = DuelPayload::parse(&duel.payload)?;
            let progress = engine.apply(&mut payload, slot, action)?;
            let new_raw = payload.to_stored()?;

            if duels::swap_payload(db, duel_id, &duel.payload, new_raw).await? {
                break (payload, progress);
            }

            attempt += 1;
            if attempt > PAYLOAD_CAS_RETRIES {
                warn!(duel_id, acting_player, "Payload CAS retries exhausted");
                return Err(DomainError::infra(
                    InfraErrorKind::Payload,
                    format!("Persistent payload contention on duel {duel_id}"),
                ));
            }
            debug!(duel_id, attempt, "Payload CAS contention, retrying");
        };

        let outcome = match progress {
            GameProgress::Waiting => {
                let duel = duels::require_duel(db, duel_id).await?;
                return Ok(
                    snapshot::snapshot(&duel).with_game(engine.public_view(&payload))
                );
            }
            GameProgress::Finished(outcome) => outcome,
        };

        // This call may lose the settle race against the sweeper or the
        // opponent's concurrent move; losing is benign, the session is
        // already paid out.
        let settled_here = match self.finish_duel(db, duel_id, outcome, false).await {
            Ok(()) => true,
            Err(err) if err.is_finish_race() => {
                debug!(duel_id, "Finish race lost, session already settled");
                false
            }
            Err(err) => return Err(err),
        };

        let duel = duels::require_duel(db, duel_id).await?;
        let balances = read_balances(db, &duel).await?;
        let final_payload = DuelPayload::parse(&duel.payload)?;
        let mut result = snapshot::snapshot(&duel)
            .with_game(engine.public_view(&final_payload))
            .with_xp(balances.clone());

        if settled_here {
            result = result.with_effects(build_effects(&duel, &final_payload, &balances, false));
        }
        Ok(result)
    }

    /// Atomic finish procedure, shared by the coordinator and the sweeper.
    ///
    /// Transitions ACTIVE -> FINISHED, applies the payout for `outcome`
    /// (a draw refunds the stake to both players; a win credits double the
    /// stake to the winner, the loser's escrowed stake stays forfeited) and
    /// stamps `finished_at`, all in one transaction.
    pub async fn finish_duel(
        &self,
        db: &DatabaseConnection,
        duel_id: i64,
        outcome: DuelOutcome,
        bypass_expiry: bool,
    ) -> Result<(), DomainError> {
        let duel = duels::require_duel(db, duel_id).await?;

        if !bypass_expiry && duel.is_expired(OffsetDateTime::now_utc()) {
            return Err(DomainError::conflict(
                ConflictKind::Expired,
                format!("Duel {duel_id} has expired"),
            ));
        }
        if duel.status != DuelStatus::Active {
            return Err(DomainError::conflict(
                ConflictKind::NotFinishable,
                format!("Duel {duel_id} is not active"),
            ));
        }
        let stake = i64::from(duel.require_stake()?);

        let now = OffsetDateTime::now_utc();
        with_txn(db, |txn| {
            let duel = duel.clone();
            Box::pin(async move {
                let transitioned = duels::transition(
                    txn,
                    DuelTransition::new(duel_id, DuelStatus::Active, DuelStatus::Finished)
                        .clear_expires_at(),
                )
                .await?;
                if !transitioned {
                    return Err(DomainError::conflict(
                        ConflictKind::AlreadyHandled,
                        format!("Duel {duel_id} was already finished by another actor"),
                    ));
                }

                match outcome.winner() {
                    None => {
                        ledger::apply_delta(txn, duel.space_id, duel.player_a_id, stake).await?;
                        ledger::apply_delta(txn, duel.space_id, duel.player_b_id, stake).await?;
                    }
                    Some(PlayerSlot::A) => {
                        ledger::apply_delta(txn, duel.space_id, duel.player_a_id, stake * 2)
                            .await?;
                    }
                    Some(PlayerSlot::B) => {
                        ledger::apply_delta(txn, duel.space_id, duel.player_b_id, stake * 2)
                            .await?;
                    }
                }

                if !duels::set_finished_at(txn, duel_id, now).await? {
                    return Err(DomainError::infra(
                        InfraErrorKind::DataCorruption,
                        format!("Duel {duel_id} lost FINISHED status before finished_at write"),
                    ));
                }
                Ok(())
            })
        })
        .await?;

        info!(
            duel_id,
            outcome = outcome.as_str(),
            stake,
            "Duel finished, payout applied"
        );
        Ok(())
    }
}

/// Effects for the presentation layer after a settle: balances moved, both
/// members need a rank re-sync, and levels are diffed against the pre-escrow
/// baseline when one was captured.
pub(crate) fn build_effects(
    duel: &Duel,
    payload: &DuelPayload,
    balances: &BTreeMap<i64, i64>,
    auto_finished: bool,
) -> DuelEffects {
    let level_changes = match payload.xp_baseline {
        Some(baseline) => levels::level_changes(&[
            (
                duel.player_a_id,
                baseline.player_a,
                balances.get(&duel.player_a_id).copied().unwrap_or(0),
            ),
            (
                duel.player_b_id,
                baseline.player_b,
                balances.get(&duel.player_b_id).copied().unwrap_or(0),
            ),
        ]),
        None => Vec::new(),
    };

    DuelEffects {
        xp_changed: true,
        sync_member_ids: vec![duel.player_a_id, duel.player_b_id],
        level_changes,
        auto_finished,
    }
}

pub(crate) async fn read_balances(
    db: &DatabaseConnection,
    duel: &Duel,
) -> Result<BTreeMap<i64, i64>, DomainError> {
    let mut balances = BTreeMap::new();
    for member_id in [duel.player_a_id, duel.player_b_id] {
        let balance = ledger::get_balance(db, duel.space_id, member_id).await?;
        balances.insert(member_id, balance);
    }
    Ok(balances)
}
