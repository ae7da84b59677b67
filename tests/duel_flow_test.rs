//! Configuration/acceptance handshake: validations, conditional writes,
//! escrow and the one-open-duel invariant.

mod common;

use common::{
    balance, duel_status, flow, force_expire, invited_duel, seed_xp, test_db, ALICE, BOB, CHANNEL,
    SPACE, STAKE, STARTING_XP,
};
use duelcore::adapters::duels_sea::DuelTransition;
use duelcore::domain::payload::DuelPayload;
use duelcore::entities::duels::DuelStatus;
use duelcore::errors::domain::{ConflictKind, DomainError, ValidationKind};
use duelcore::repos;

#[tokio::test]
async fn create_rejects_same_player() {
    let db = test_db().await;
    let err = flow()
        .create(&db, SPACE, CHANNEL, ALICE, ALICE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::SamePlayerDuel, _)
    ));
}

#[tokio::test]
async fn create_rejects_member_with_open_duel() {
    let db = test_db().await;
    invited_duel(&db).await;

    // Bob is committed to an INVITED session; a new challenge against him
    // must fail, whichever seat he would take.
    let charlie = 3;
    let err = flow()
        .create(&db, SPACE, CHANNEL, charlie, BOB)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(ConflictKind::AlreadyInDuel, _)
    ));
}

#[tokio::test]
async fn create_allows_parallel_config_sessions() {
    let db = test_db().await;
    // CONFIG sessions are not commitments yet; only INVITED/ACTIVE block.
    flow()
        .create(&db, SPACE, CHANNEL, ALICE, BOB)
        .await
        .unwrap();
    flow()
        .create(&db, SPACE, CHANNEL, ALICE, BOB)
        .await
        .unwrap();
}

#[tokio::test]
async fn only_one_parallel_config_session_can_be_invited() {
    let db = test_db().await;
    seed_xp(&db, ALICE, STARTING_XP).await;
    seed_xp(&db, BOB, STARTING_XP).await;
    let service = flow();

    let first = service.create(&db, SPACE, CHANNEL, ALICE, BOB).await.unwrap().duel.id;
    let second = service.create(&db, SPACE, CHANNEL, ALICE, BOB).await.unwrap().duel.id;
    for duel_id in [first, second] {
        service.configure_game_type(&db, duel_id, "rps").await.unwrap();
        service.configure_stake(&db, duel_id, STAKE).await.unwrap();
    }

    service.send_invite(&db, first, "msg-1").await.unwrap();

    // The first session is now the members' open commitment; the parallel
    // CONFIG session must not become a second one.
    let err = service.send_invite(&db, second, "msg-2").await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(ConflictKind::AlreadyInDuel, _)
    ));
    assert_eq!(duel_status(&db, second).await, DuelStatus::Config);
}

#[tokio::test]
async fn accept_rejected_while_members_hold_another_open_session() {
    let db = test_db().await;
    seed_xp(&db, ALICE, STARTING_XP).await;
    seed_xp(&db, BOB, STARTING_XP).await;
    let service = flow();

    let first = service.create(&db, SPACE, CHANNEL, ALICE, BOB).await.unwrap().duel.id;
    let second = service.create(&db, SPACE, CHANNEL, ALICE, BOB).await.unwrap().duel.id;
    for duel_id in [first, second] {
        service.configure_game_type(&db, duel_id, "rps").await.unwrap();
        service.configure_stake(&db, duel_id, STAKE).await.unwrap();
    }
    service.send_invite(&db, first, "msg-1").await.unwrap();

    // Force the second session to INVITED below the service layer, as a
    // lost invite race would.
    let forced = repos::duels::transition(
        &db,
        DuelTransition::new(second, DuelStatus::Config, DuelStatus::Invited),
    )
    .await
    .unwrap();
    assert!(forced);

    let err = service.accept(&db, second, BOB).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(ConflictKind::AlreadyInDuel, _)
    ));
    // No escrow happened for the rejected accept.
    assert_eq!(balance(&db, ALICE).await, STARTING_XP);
    assert_eq!(balance(&db, BOB).await, STARTING_XP);
}

#[tokio::test]
async fn full_handshake_reaches_active_with_escrow() {
    let db = test_db().await;
    seed_xp(&db, ALICE, STARTING_XP).await;
    seed_xp(&db, BOB, STARTING_XP).await;
    let service = flow();

    let created = service.create(&db, SPACE, CHANNEL, ALICE, BOB).await.unwrap();
    let duel_id = created.duel.id;
    assert_eq!(created.duel.status, DuelStatus::Config);
    assert!(created.duel.expires_at.is_some());
    assert_eq!(
        created.ui.unwrap().allowed_stakes,
        vec![50, 100, 250, 500, 1000]
    );

    service.configure_game_type(&db, duel_id, "rps").await.unwrap();
    let staked = service.configure_stake(&db, duel_id, STAKE).await.unwrap();
    assert_eq!(staked.xp.unwrap()[&ALICE], STARTING_XP);

    let invited = service.send_invite(&db, duel_id, "msg-42").await.unwrap();
    assert_eq!(invited.duel.status, DuelStatus::Invited);
    assert_eq!(invited.duel.message_ref.as_deref(), Some("msg-42"));

    let accepted = service.accept(&db, duel_id, BOB).await.unwrap();
    assert_eq!(accepted.duel.status, DuelStatus::Active);

    // Stake escrowed from both players.
    assert_eq!(balance(&db, ALICE).await, STARTING_XP - i64::from(STAKE));
    assert_eq!(balance(&db, BOB).await, STARTING_XP - i64::from(STAKE));

    // Pre-escrow baseline captured exactly once.
    let duel = repos::duels::require_duel(&db, duel_id).await.unwrap();
    let payload = DuelPayload::parse(&duel.payload).unwrap();
    let baseline = payload.xp_baseline.unwrap();
    assert_eq!(baseline.player_a, STARTING_XP);
    assert_eq!(baseline.player_b, STARTING_XP);
}

#[tokio::test]
async fn unknown_game_type_rejected() {
    let db = test_db().await;
    let created = flow().create(&db, SPACE, CHANNEL, ALICE, BOB).await.unwrap();
    let err = flow()
        .configure_game_type(&db, created.duel.id, "chess")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::InvalidGameType, _)
    ));
}

#[tokio::test]
async fn stake_outside_denominations_rejected() {
    let db = test_db().await;
    seed_xp(&db, ALICE, STARTING_XP).await;
    seed_xp(&db, BOB, STARTING_XP).await;
    let created = flow().create(&db, SPACE, CHANNEL, ALICE, BOB).await.unwrap();
    let err = flow()
        .configure_stake(&db, created.duel.id, 123)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::InvalidStake, _)
    ));
}

#[tokio::test]
async fn unaffordable_stake_rejected() {
    let db = test_db().await;
    seed_xp(&db, ALICE, STARTING_XP).await;
    seed_xp(&db, BOB, 40).await;
    let created = flow().create(&db, SPACE, CHANNEL, ALICE, BOB).await.unwrap();
    let err = flow()
        .configure_stake(&db, created.duel.id, STAKE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::InsufficientXp, _)
    ));
}

#[tokio::test]
async fn invite_requires_complete_configuration() {
    let db = test_db().await;
    let created = flow().create(&db, SPACE, CHANNEL, ALICE, BOB).await.unwrap();
    let duel_id = created.duel.id;

    let err = flow().send_invite(&db, duel_id, "msg-1").await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::ConfigurationIncomplete, _)
    ));
}

#[tokio::test]
async fn invite_requires_message_ref() {
    let db = test_db().await;
    seed_xp(&db, ALICE, STARTING_XP).await;
    seed_xp(&db, BOB, STARTING_XP).await;
    let service = flow();
    let created = service.create(&db, SPACE, CHANNEL, ALICE, BOB).await.unwrap();
    let duel_id = created.duel.id;
    service.configure_game_type(&db, duel_id, "rps").await.unwrap();
    service.configure_stake(&db, duel_id, STAKE).await.unwrap();

    let err = service.send_invite(&db, duel_id, "").await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationKind::MissingMessageRef, _)
    ));
}

#[tokio::test]
async fn configure_after_invite_is_stale() {
    let db = test_db().await;
    let duel_id = invited_duel(&db).await;

    let err = flow()
        .configure_game_type(&db, duel_id, "rps")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(ConflictKind::StaleConfig, _)
    ));
}

#[tokio::test]
async fn configure_on_expired_session_rejected() {
    let db = test_db().await;
    let created = flow().create(&db, SPACE, CHANNEL, ALICE, BOB).await.unwrap();
    force_expire(&db, created.duel.id).await;

    let err = flow()
        .configure_game_type(&db, created.duel.id, "rps")
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(ConflictKind::Expired, _)));
}

#[tokio::test]
async fn only_challenged_member_may_answer() {
    let db = test_db().await;
    let duel_id = invited_duel(&db).await;

    for actor in [ALICE, 99] {
        let err = flow().accept(&db, duel_id, actor).await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }
}

#[tokio::test]
async fn second_accept_conflicts_and_escrows_once() {
    let db = test_db().await;
    let duel_id = invited_duel(&db).await;

    flow().accept(&db, duel_id, BOB).await.unwrap();
    let err = flow().accept(&db, duel_id, BOB).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_, _)));

    // Exactly one escrow debit happened.
    assert_eq!(balance(&db, ALICE).await, STARTING_XP - i64::from(STAKE));
    assert_eq!(balance(&db, BOB).await, STARTING_XP - i64::from(STAKE));
}

#[tokio::test]
async fn refuse_cancels_without_moving_funds() {
    let db = test_db().await;
    let duel_id = invited_duel(&db).await;

    let refused = flow().refuse(&db, duel_id, BOB).await.unwrap();
    assert_eq!(refused.duel.status, DuelStatus::Cancelled);
    assert!(refused.duel.finished_at.is_some());

    assert_eq!(balance(&db, ALICE).await, STARTING_XP);
    assert_eq!(balance(&db, BOB).await, STARTING_XP);
    assert_eq!(duel_status(&db, duel_id).await, DuelStatus::Cancelled);
}

#[tokio::test]
async fn refuse_after_accept_conflicts() {
    let db = test_db().await;
    let duel_id = invited_duel(&db).await;

    flow().accept(&db, duel_id, BOB).await.unwrap();
    let err = flow().refuse(&db, duel_id, BOB).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict(ConflictKind::NotAcceptable, _)
    ));
}
