//! Roster manager, manual raids and signup form tests

mod common;

use chrono::{TimeZone, Utc};
use common::{event, five_signups, session, setup_db, signup};
use guild_common::config::CallerSeed;
use guild_common::db::{PlayerIdentity, RoleLabel};
use guild_common::Error;
use guild_roster::db::{callers, participants, raids};
use guild_roster::services::raids::{
    create_raid_manually, get_raid_info, list_priority_records, list_raids_for_caller,
    submit_signup, CreateRaid, SignupForm,
};
use guild_roster::services::reconcile;
use guild_roster::services::roster::{
    draw_random, edit_participant, finalize_raid, list_participants, toggle_priority,
    toggle_selected, ParticipantEdit,
};
use uuid::Uuid;

fn form(name: &str, external_id: Option<&str>, role: &str, gear_level: i64) -> SignupForm {
    SignupForm {
        name: name.to_string(),
        external_id: external_id.map(str::to_string),
        role: role.to_string(),
        secondary_role: None,
        gear_level,
    }
}

async fn seeded_raid(pool: &sqlx::SqlitePool) -> Uuid {
    reconcile(pool, &[event("e1", "Avalon", five_signups())]).await.unwrap();
    raids::find_by_external_id(pool, "e1").await.unwrap().unwrap().id
}

#[tokio::test]
async fn test_other_caller_is_forbidden() {
    let (_dir, pool) = setup_db().await;
    let raid_id = seeded_raid(&pool).await;
    let intruder = session("901");

    let err = list_participants(&pool, &intruder, raid_id).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let roster = participants::list_for_raid(&pool, raid_id).await.unwrap();
    let err = toggle_selected(&pool, &intruder, roster[0].id).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
    assert!(!participants::get_participant(&pool, roster[0].id)
        .await
        .unwrap()
        .unwrap()
        .selected);
}

#[tokio::test]
async fn test_toggles_delegate_to_state_machine() {
    let (_dir, pool) = setup_db().await;
    let raid_id = seeded_raid(&pool).await;
    let owner = session("900");
    let roster = participants::list_for_raid(&pool, raid_id).await.unwrap();
    let id = roster[0].id;

    assert!(toggle_priority(&pool, &owner, id).await.unwrap().priority);
    let selected = toggle_selected(&pool, &owner, id).await.unwrap();
    assert!(selected.selected && !selected.priority);

    let err = toggle_priority(&pool, &owner, id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    assert!(!toggle_selected(&pool, &owner, id).await.unwrap().selected);
    assert!(toggle_priority(&pool, &owner, id).await.unwrap().priority);
    assert!(!toggle_priority(&pool, &owner, id).await.unwrap().priority);
}

#[tokio::test]
async fn test_draw_random_empty_role_bucket() {
    let (_dir, pool) = setup_db().await;
    reconcile(&pool, &[event("e1", "Avalon", vec![signup("Mira", Some("1"), "Healer")])])
        .await
        .unwrap();
    let raid_id = raids::find_by_external_id(&pool, "e1").await.unwrap().unwrap().id;

    let err = draw_random(&pool, &session("900"), raid_id, RoleLabel::Decoy)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptySet(_)));
}

#[tokio::test]
async fn test_draw_random_stays_in_role_bucket() {
    let (_dir, pool) = setup_db().await;
    let raid_id = seeded_raid(&pool).await;
    let owner = session("900");

    for _ in 0..20 {
        let drawn = draw_random(&pool, &owner, raid_id, RoleLabel::Decoy).await.unwrap();
        assert_eq!(drawn.role, RoleLabel::Decoy);
        assert!(!drawn.selected);
    }
}

#[tokio::test]
async fn test_roster_ordering_priority_then_gear_then_name() {
    let (_dir, pool) = setup_db().await;
    let raid_id = seeded_raid(&pool).await;
    let owner = session("900");

    submit_signup(&pool, raid_id, &form("Mira", Some("1"), "Healer", 1200)).await.unwrap();
    submit_signup(&pool, raid_id, &form("Dax", Some("2"), "Ranged-DPS", 1400)).await.unwrap();
    submit_signup(&pool, raid_id, &form("Ruk", Some("3"), "Off-Tank", 1300)).await.unwrap();

    let lia = participants::list_roster(&pool, raid_id)
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.player_name == "Lia")
        .unwrap();
    toggle_priority(&pool, &owner, lia.participant.id).await.unwrap();

    let names: Vec<String> = list_participants(&pool, &owner, raid_id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.player_name)
        .collect();
    assert_eq!(names, vec!["Lia", "Dax", "Ruk", "Mira", "Oto"]);

    let roster = list_participants(&pool, &owner, raid_id).await.unwrap();
    assert!(roster[0].owed_priority);
    assert_eq!(roster[0].identity, PlayerIdentity::Unverified);
    assert_eq!(roster[1].identity, PlayerIdentity::Verified);
}

#[tokio::test]
async fn test_signup_updates_existing_registration() {
    let (_dir, pool) = setup_db().await;
    let raid_id = seeded_raid(&pool).await;
    let owner = session("900");

    let mira = participants::list_for_raid(&pool, raid_id).await.unwrap()[0].clone();
    toggle_priority(&pool, &owner, mira.id).await.unwrap();

    let updated = submit_signup(
        &pool,
        raid_id,
        &SignupForm {
            secondary_role: Some("Support-A".to_string()),
            ..form("Mira", Some("1"), "Healer", 1350)
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.id, mira.id);
    assert_eq!(updated.gear_level, 1350);
    assert_eq!(updated.secondary_role, Some(RoleLabel::SupportArcane));
    assert!(updated.priority);
    assert_eq!(common::registration_count(&pool).await, 5);
}

#[tokio::test]
async fn test_signup_validation_persists_nothing() {
    let (_dir, pool) = setup_db().await;
    let raid_id = seeded_raid(&pool).await;

    for bad in [
        form(" ", None, "Healer", 0),
        form("Nova", None, "Bard", 0),
        form("Nova", None, "Healer", -5),
    ] {
        let err = submit_signup(&pool, raid_id, &bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
    assert_eq!(common::registration_count(&pool).await, 5);

    let err = submit_signup(&pool, Uuid::new_v4(), &form("Nova", None, "Healer", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_unverified_signup_does_not_join_verified_player() {
    let (_dir, pool) = setup_db().await;
    let raid_id = seeded_raid(&pool).await;

    // "Mira" is verified from the feed; a name-only Mira is someone else
    let participant = submit_signup(&pool, raid_id, &form("Mira", None, "Scout", 900))
        .await
        .unwrap();

    assert_eq!(common::registration_count(&pool).await, 6);
    let roster = participants::list_roster(&pool, raid_id).await.unwrap();
    let miras: Vec<_> = roster.iter().filter(|e| e.player_name == "Mira").collect();
    assert_eq!(miras.len(), 2);
    assert!(miras.iter().any(|e| e.participant.id == participant.id
        && e.identity == PlayerIdentity::Unverified));
}

#[tokio::test]
async fn test_edit_participant() {
    let (_dir, pool) = setup_db().await;
    let raid_id = seeded_raid(&pool).await;
    let owner = session("900");
    let target = participants::list_for_raid(&pool, raid_id).await.unwrap()[4].clone();

    let edited = edit_participant(
        &pool,
        &owner,
        target.id,
        &ParticipantEdit {
            role: Some("Stealth".to_string()),
            gear_level: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(edited.role, RoleLabel::Stealth);
    assert_eq!(edited.gear_level, 0);

    let edited = edit_participant(
        &pool,
        &owner,
        target.id,
        &ParticipantEdit {
            role: None,
            gear_level: Some(1100),
        },
    )
    .await
    .unwrap();
    assert_eq!(edited.role, RoleLabel::Stealth);
    assert_eq!(edited.gear_level, 1100);

    let err = edit_participant(
        &pool,
        &owner,
        target.id,
        &ParticipantEdit {
            role: Some("Wizard".to_string()),
            gear_level: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_manual_raid_lifecycle() {
    let (_dir, pool) = setup_db().await;
    callers::seed_callers(
        &pool,
        &[CallerSeed {
            discord_id: "700".to_string(),
            name: "Ana".to_string(),
            avatar_url: None,
        }],
    )
    .await
    .unwrap();

    let owner = session("700");
    let when = Utc.with_ymd_and_hms(2025, 4, 2, 21, 0, 0).unwrap();

    let err = create_raid_manually(
        &pool,
        &owner,
        &CreateRaid {
            title: "  ".to_string(),
            description: None,
            scheduled_at: when,
            image_ref: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let raid = create_raid_manually(
        &pool,
        &owner,
        &CreateRaid {
            title: "Castle siege".to_string(),
            description: Some("Bring potions".to_string()),
            scheduled_at: when,
            image_ref: None,
        },
    )
    .await
    .unwrap();
    assert!(raid.raid_helper_id.is_none());
    assert!(raid.last_synced.is_none());
    assert_eq!(raid.caller_name.as_deref(), Some("Ana"));

    let info = get_raid_info(&pool, raid.id).await.unwrap();
    assert_eq!(info.title, "Castle siege");
    assert_eq!(info.scheduled_at, when);

    submit_signup(&pool, raid.id, &form("Nova", None, "Healer", 1000)).await.unwrap();
    let listed = list_raids_for_caller(&pool, "700").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].participants_count, 1);

    let err = create_raid_manually(
        &pool,
        &session("nobody"),
        &CreateRaid {
            title: "Ghost".to_string(),
            description: None,
            scheduled_at: when,
            image_ref: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_priority_records_listing() {
    let (_dir, pool) = setup_db().await;
    let raid_id = seeded_raid(&pool).await;
    let owner = session("900");
    let roster = participants::list_for_raid(&pool, raid_id).await.unwrap();

    toggle_priority(&pool, &owner, roster[1].id).await.unwrap();

    let listed = list_priority_records(&pool).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].player_name, "Dax");
    assert_eq!(listed[0].raid_title, "Avalon");
    assert_eq!(listed[0].caller_name.as_deref(), Some("Kael"));
    assert_eq!(listed[0].role, Some(RoleLabel::RangedDps));

    let summary = finalize_raid(&pool, &owner, raid_id).await.unwrap();
    assert!(summary.repaired.is_empty());
    assert_eq!(list_priority_records(&pool).await.unwrap().len(), 1);
}
