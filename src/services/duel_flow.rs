//! Duel configuration and acceptance handshake.
//!
//! Create -> configure game type -> configure stake -> send invite ->
//! accept/refuse. Pre-checks run on a fresh read for friendly errors; the
//! conditional write is the authority, and a zero-row write surfaces as the
//! typed conflict for that call site.

use std::collections::BTreeMap;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::adapters::duels_sea::{DuelCreate, DuelTransition};
use crate::config::DuelConfig;
use crate::db::with_txn;
use crate::domain::payload::{DuelPayload, XpBaseline};
use crate::domain::snapshot::{self, DuelSnapshot};
use crate::entities::duels::DuelStatus;
use crate::errors::domain::{ConflictKind, DomainError, ValidationKind};
use crate::games::GameRegistry;
use crate::repos::{duels, ledger};

pub struct DuelFlowService {
    config: DuelConfig,
    registry: Arc<GameRegistry>,
}

impl DuelFlowService {
    pub fn new(config: DuelConfig, registry: Arc<GameRegistry>) -> Self {
        Self { config, registry }
    }

    /// Create a session in CONFIG with the acceptance-window expiry.
    pub async fn create(
        &self,
        db: &DatabaseConnection,
        space_id: i64,
        channel_id: i64,
        player_a_id: i64,
        player_b_id: i64,
    ) -> Result<DuelSnapshot, DomainError> {
        if player_a_id == player_b_id {
            return Err(DomainError::validation(
                ValidationKind::SamePlayerDuel,
                "A member cannot duel themselves",
            ));
        }

        for member_id in [player_a_id, player_b_id] {
            if let Some(open) = duels::find_open_for_member(db, space_id, member_id, None).await? {
                return Err(DomainError::conflict(
                    ConflictKind::AlreadyInDuel,
                    format!("Member {member_id} is already in duel {}", open.id),
                ));
            }
        }

        let now = OffsetDateTime::now_utc();
        let duel = duels::create_duel(
            db,
            DuelCreate {
                space_id,
                channel_id,
                player_a_id,
                player_b_id,
                expires_at: now + self.config.config_window,
                payload: DuelPayload::new().to_stored()?,
            },
        )
        .await?;

        info!(
            duel_id = duel.id,
            space_id, player_a_id, player_b_id, "Duel created"
        );
        Ok(snapshot::snapshot(&duel).with_ui(self.config.allowed_stakes.clone()))
    }

    /// Set the game type while the session is still in CONFIG.
    pub async fn configure_game_type(
        &self,
        db: &DatabaseConnection,
        duel_id: i64,
        game_type: &str,
    ) -> Result<DuelSnapshot, DomainError> {
        let duel = duels::require_duel(db, duel_id).await?;
        require_not_expired(&duel)?;
        self.registry.require(game_type)?;

        if !duels::set_game_type(db, duel_id, game_type).await? {
            return Err(DomainError::conflict(
                ConflictKind::StaleConfig,
                format!("Duel {duel_id} is no longer configurable"),
            ));
        }

        debug!(duel_id, game_type, "Game type configured");
        let duel = duels::require_duel(db, duel_id).await?;
        Ok(snapshot::snapshot(&duel).with_ui(self.config.allowed_stakes.clone()))
    }

    /// Set the stake while the session is still in CONFIG. The amount must
    /// be a configured denomination and affordable for both players right now.
    pub async fn configure_stake(
        &self,
        db: &DatabaseConnection,
        duel_id: i64,
        stake_xp: i32,
    ) -> Result<DuelSnapshot, DomainError> {
        let duel = duels::require_duel(db, duel_id).await?;
        require_not_expired(&duel)?;

        if !self.config.allowed_stakes.contains(&stake_xp) {
            return Err(DomainError::validation(
                ValidationKind::InvalidStake,
                format!("Stake {stake_xp} is not an allowed denomination"),
            ));
        }

        let balances = read_balances(db, &duel).await?;
        require_affordable(&duel, stake_xp, &balances)?;

        if !duels::set_stake(db, duel_id, stake_xp).await? {
            return Err(DomainError::conflict(
                ConflictKind::StaleConfig,
                format!("Duel {duel_id} is no longer configurable"),
            ));
        }

        debug!(duel_id, stake_xp, "Stake configured");
        let duel = duels::require_duel(db, duel_id).await?;
        Ok(snapshot::snapshot(&duel)
            .with_ui(self.config.allowed_stakes.clone())
            .with_xp(balances))
    }

    /// CONFIG -> INVITED once the configuration is complete, attaching the
    /// presentation-layer message carrying the invite.
    pub async fn send_invite(
        &self,
        db: &DatabaseConnection,
        duel_id: i64,
        message_ref: &str,
    ) -> Result<DuelSnapshot, DomainError> {
        let duel = duels::require_duel(db, duel_id).await?;

        if duel.game_type.is_none() || duel.stake_xp.is_none() {
            return Err(DomainError::validation(
                ValidationKind::ConfigurationIncomplete,
                "Game type and stake must be configured before inviting",
            ));
        }
        if message_ref.is_empty() {
            return Err(DomainError::validation(
                ValidationKind::MissingMessageRef,
                "Invite requires a message reference",
            ));
        }
        // Parallel CONFIG sessions are allowed; only one of them may become
        // the members' open commitment.
        require_no_other_open(db, &duel).await?;

        let now = OffsetDateTime::now_utc();
        let transitioned = duels::transition(
            db,
            DuelTransition::new(duel_id, DuelStatus::Config, DuelStatus::Invited)
                .with_expires_at(now + self.config.invite_window)
                .with_message_ref(message_ref),
        )
        .await?;
        if !transitioned {
            return Err(already_handled(duel_id));
        }

        info!(duel_id, "Duel invite sent");
        let duel = duels::require_duel(db, duel_id).await?;
        Ok(snapshot::snapshot(&duel))
    }

    /// INVITED -> ACTIVE: escrow the stake from both players and capture the
    /// pre-escrow balance baseline, all in one transaction.
    pub async fn accept(
        &self,
        db: &DatabaseConnection,
        duel_id: i64,
        acting_player: i64,
    ) -> Result<DuelSnapshot, DomainError> {
        let duel = duels::require_duel(db, duel_id).await?;
        require_challenged(&duel, acting_player)?;
        require_invited(&duel)?;
        require_no_other_open(db, &duel).await?;

        let stake = i64::from(duel.require_stake()?);
        let balances = read_balances(db, &duel).await?;
        require_affordable(&duel, duel.require_stake()?, &balances)?;

        let now = OffsetDateTime::now_utc();
        let play_expiry = now + self.config.play_window;
        with_txn(db, |txn| {
            let duel = duel.clone();
            let balances = balances.clone();
            Box::pin(async move {
                let transitioned = duels::transition(
                    txn,
                    DuelTransition::new(duel_id, DuelStatus::Invited, DuelStatus::Active)
                        .with_expires_at(play_expiry),
                )
                .await?;
                if !transitioned {
                    return Err(already_handled(duel_id));
                }

                // One-time baseline capture, first-writer-wins. Losing the
                // CAS is harmless: the competing writer stored identical data.
                let payload = DuelPayload::parse(&duel.payload)?;
                if payload.xp_baseline.is_none() {
                    let mut with_baseline = payload;
                    with_baseline.xp_baseline = Some(XpBaseline {
                        player_a: balances[&duel.player_a_id],
                        player_b: balances[&duel.player_b_id],
                    });
                    let swapped = duels::swap_payload(
                        txn,
                        duel_id,
                        &duel.payload,
                        with_baseline.to_stored()?,
                    )
                    .await?;
                    if !swapped {
                        debug!(duel_id, "Baseline already captured by a concurrent writer");
                    }
                }

                ledger::apply_delta(txn, duel.space_id, duel.player_a_id, -stake).await?;
                ledger::apply_delta(txn, duel.space_id, duel.player_b_id, -stake).await?;
                Ok(())
            })
        })
        .await?;

        info!(duel_id, acting_player, stake, "Duel accepted, stake escrowed");
        let duel = duels::require_duel(db, duel_id).await?;
        let balances = read_balances(db, &duel).await?;
        Ok(snapshot::snapshot(&duel).with_xp(balances))
    }

    /// INVITED -> CANCELLED. No funds move; the stake is only escrowed on
    /// acceptance.
    pub async fn refuse(
        &self,
        db: &DatabaseConnection,
        duel_id: i64,
        acting_player: i64,
    ) -> Result<DuelSnapshot, DomainError> {
        let duel = duels::require_duel(db, duel_id).await?;
        require_challenged(&duel, acting_player)?;
        require_invited(&duel)?;

        let now = OffsetDateTime::now_utc();
        let transitioned = duels::transition(
            db,
            DuelTransition::new(duel_id, DuelStatus::Invited, DuelStatus::Cancelled)
                .clear_expires_at()
                .with_finished_at(now),
        )
        .await?;
        if !transitioned {
            return Err(already_handled(duel_id));
        }

        info!(duel_id, acting_player, "Duel refused");
        let duel = duels::require_duel(db, duel_id).await?;
        Ok(snapshot::snapshot(&duel))
    }
}

fn already_handled(duel_id: i64) -> DomainError {
    DomainError::conflict(
        ConflictKind::AlreadyHandled,
        format!("Duel {duel_id} was already handled by another actor"),
    )
}

fn require_not_expired(duel: &crate::repos::duels::Duel) -> Result<(), DomainError> {
    if duel.is_expired(OffsetDateTime::now_utc()) {
        return Err(DomainError::conflict(
            ConflictKind::Expired,
            format!("Duel {} has expired", duel.id),
        ));
    }
    Ok(())
}

/// No INVITED or ACTIVE session other than this one may hold either
/// participant.
async fn require_no_other_open(
    db: &DatabaseConnection,
    duel: &crate::repos::duels::Duel,
) -> Result<(), DomainError> {
    for member_id in [duel.player_a_id, duel.player_b_id] {
        if let Some(open) =
            duels::find_open_for_member(db, duel.space_id, member_id, Some(duel.id)).await?
        {
            return Err(DomainError::conflict(
                ConflictKind::AlreadyInDuel,
                format!("Member {member_id} is already in duel {}", open.id),
            ));
        }
    }
    Ok(())
}

fn require_challenged(
    duel: &crate::repos::duels::Duel,
    acting_player: i64,
) -> Result<(), DomainError> {
    if acting_player != duel.player_b_id {
        return Err(DomainError::unauthorized(format!(
            "Only the challenged member may answer duel {}",
            duel.id
        )));
    }
    Ok(())
}

fn require_invited(duel: &crate::repos::duels::Duel) -> Result<(), DomainError> {
    if duel.status != DuelStatus::Invited {
        return Err(DomainError::conflict(
            ConflictKind::NotAcceptable,
            format!("Duel {} is not awaiting an answer", duel.id),
        ));
    }
    Ok(())
}

fn require_affordable(
    duel: &crate::repos::duels::Duel,
    stake_xp: i32,
    balances: &BTreeMap<i64, i64>,
) -> Result<(), DomainError> {
    let stake = i64::from(stake_xp);
    for member_id in [duel.player_a_id, duel.player_b_id] {
        if balances.get(&member_id).copied().unwrap_or(0) < stake {
            return Err(DomainError::validation(
                ValidationKind::InsufficientXp,
                format!("Member {member_id} cannot afford a stake of {stake_xp}"),
            ));
        }
    }
    Ok(())
}

async fn read_balances(
    db: &DatabaseConnection,
    duel: &crate::repos::duels::Duel,
) -> Result<BTreeMap<i64, i64>, DomainError> {
    let mut balances = BTreeMap::new();
    for member_id in [duel.player_a_id, duel.player_b_id] {
        let balance = ledger::get_balance(db, duel.space_id, member_id).await?;
        balances.insert(member_id, balance);
    }
    Ok(balances)
}
