//! Shared fixtures for guild-roster integration tests

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use guild_common::api::CallerSession;
use guild_common::db::init_database;
use guild_roster::services::{CanonicalEvent, CanonicalSignup};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Fresh database in a temp dir; keep the `TempDir` alive for the test
pub async fn setup_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("guild.db")).await.unwrap();
    (temp_dir, pool)
}

pub fn signup(name: &str, external_id: Option<&str>, class_tag: &str) -> CanonicalSignup {
    CanonicalSignup {
        external_id: external_id.map(str::to_string),
        name: name.to_string(),
        class_tag: Some(class_tag.to_string()),
        spec_tag: None,
    }
}

pub fn event(external_id: &str, title: &str, signups: Vec<CanonicalSignup>) -> CanonicalEvent {
    CanonicalEvent {
        external_id: external_id.to_string(),
        title: title.to_string(),
        description: Some("Roads of Avalon".to_string()),
        scheduled_at: Utc.with_ymd_and_hms(2025, 3, 1, 20, 0, 0).unwrap(),
        leader_external_id: "900".to_string(),
        leader_name: "Kael".to_string(),
        image_ref: None,
        signups,
    }
}

/// Five signups with distinct roles
pub fn five_signups() -> Vec<CanonicalSignup> {
    vec![
        signup("Mira", Some("1"), "Holy Healer"),
        signup("Dax", Some("2"), "Crossbow"),
        signup("Ruk", Some("3"), "Guardian Tank"),
        signup("Lia", None, "Frost"),
        signup("Oto", None, "Roletroll"),
    ]
}

pub fn session(caller_id: &str) -> CallerSession {
    CallerSession {
        caller_id: caller_id.to_string(),
        token: format!("{}.test", caller_id),
    }
}

pub async fn registration_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM raid_registrations")
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn record_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM mor_status")
        .fetch_one(pool)
        .await
        .unwrap()
}
