//! Reconciliation of Raid Helper events into local raids
//!
//! Each event is applied in its own transaction: resolve the caller, upsert
//! the raid by external id, then replace the raid's registrations with the
//! event's signups. A failing event is recorded as a warning and the batch
//! moves on. Only conditions that keep the batch from running at all
//! (missing credential, feed failure, storage unreachable) surface as `Err`.

use chrono::{DateTime, Utc};
use guild_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{callers, participants, players, priority, raids};
use crate::db::raids::{SyncedRaid, UpsertKind};
use crate::roles::map_role;
use crate::services::raid_helper_client::{CanonicalEvent, FeedError, RaidHelperClient};

/// Result of applying one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum EventOutcome {
    Created,
    Updated,
    Failed(String),
}

/// Per-event line of a reconciliation report
#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub external_id: String,
    pub raid_id: Option<Uuid>,
    pub participants: usize,
    #[serde(flatten)]
    pub outcome: EventOutcome,
}

/// Outcome of a reconciliation batch
///
/// Counts are per distinct external id, classified by the first successful
/// application of that id within the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    pub processed_count: usize,
    pub created_count: usize,
    pub updated_count: usize,
    pub warnings: Vec<String>,
    pub events: Vec<EventReport>,
}

struct AppliedEvent {
    raid_id: Uuid,
    kind: UpsertKind,
    participants: usize,
    warnings: Vec<String>,
}

/// Fetch the feed and reconcile it
///
/// `api_key` is the resolved credential; `None` is the missing-credential
/// condition.
pub async fn reconcile_from_feed(
    db: &SqlitePool,
    client: &RaidHelperClient,
    api_key: Option<&str>,
) -> Result<ReconciliationReport> {
    let api_key = api_key.ok_or(FeedError::MissingCredential)?;
    let batch = client.fetch_events(api_key).await?;

    let mut report = reconcile(db, &batch.events).await?;
    let mut warnings = batch.warnings;
    warnings.append(&mut report.warnings);
    report.warnings = warnings;

    Ok(report)
}

/// Apply a batch of canonical events
pub async fn reconcile(db: &SqlitePool, events: &[CanonicalEvent]) -> Result<ReconciliationReport> {
    // Fail fast when the database cannot be reached at all
    sqlx::query("SELECT 1").execute(db).await?;

    let synced_at = guild_common::time::now();
    let mut report = ReconciliationReport::default();
    let mut counted: HashSet<&str> = HashSet::new();

    for event in events {
        report.processed_count += 1;

        match apply_event(db, event, synced_at).await {
            Ok(applied) => {
                if counted.insert(event.external_id.as_str()) {
                    match applied.kind {
                        UpsertKind::Inserted => report.created_count += 1,
                        UpsertKind::Updated => report.updated_count += 1,
                    }
                }

                info!(
                    external_id = %event.external_id,
                    raid_id = %applied.raid_id,
                    participants = applied.participants,
                    created = applied.kind == UpsertKind::Inserted,
                    "Reconciled event"
                );

                report.warnings.extend(applied.warnings);
                report.events.push(EventReport {
                    external_id: event.external_id.clone(),
                    raid_id: Some(applied.raid_id),
                    participants: applied.participants,
                    outcome: match applied.kind {
                        UpsertKind::Inserted => EventOutcome::Created,
                        UpsertKind::Updated => EventOutcome::Updated,
                    },
                });
            }
            Err(e) if e.is_storage_unreachable() => {
                warn!(external_id = %event.external_id, "Storage unreachable, stopping batch: {}", e);
                return Err(e);
            }
            Err(e) => {
                warn!(external_id = %event.external_id, "Event failed: {}", e);
                report.warnings.push(format!("event {}: {}", event.external_id, e));
                report.events.push(EventReport {
                    external_id: event.external_id.clone(),
                    raid_id: None,
                    participants: 0,
                    outcome: EventOutcome::Failed(e.to_string()),
                });
            }
        }
    }

    info!(
        processed = report.processed_count,
        created = report.created_count,
        updated = report.updated_count,
        warnings = report.warnings.len(),
        "Reconciliation finished"
    );

    Ok(report)
}

async fn apply_event(
    db: &SqlitePool,
    event: &CanonicalEvent,
    synced_at: DateTime<Utc>,
) -> Result<AppliedEvent> {
    if event.title.trim().is_empty() {
        return Err(Error::Validation(format!("event {} has a blank title", event.external_id)));
    }

    let mut tx = crate::db::begin_write(db).await?;

    let caller = callers::ensure_caller(&mut tx, &event.leader_external_id, &event.leader_name).await?;

    let (raid_id, kind) = raids::upsert_synced(
        &mut tx,
        &SyncedRaid {
            raid_helper_id: &event.external_id,
            title: event.title.trim(),
            description: event.description.as_deref(),
            date: event.scheduled_at,
            caller_id: &caller.discord_id,
            caller_name: &event.leader_name,
            image_url: event.image_ref.as_deref(),
            synced_at,
        },
    )
    .await?;

    // Full replace: records attributed to this raid go with its registrations
    let dropped_records = priority::delete_for_raid(&mut *tx, raid_id).await?;
    let dropped = participants::delete_for_raid(&mut *tx, raid_id).await?;
    debug!(raid_id = %raid_id, dropped, dropped_records, "Cleared registrations");

    let mut warnings = Vec::new();
    let mut seen_players = HashSet::new();

    for signup in &event.signups {
        let player =
            players::resolve_or_create(&mut tx, &signup.name, signup.external_id.as_deref()).await?;

        if !seen_players.insert(player.id) {
            warnings.push(format!(
                "event {}: duplicate signup for {} ignored",
                event.external_id, player.name
            ));
            continue;
        }

        let role = map_role(signup.class_tag.as_deref(), signup.spec_tag.as_deref());
        participants::insert_participant(&mut *tx, raid_id, player.id, role, None, 0).await?;
    }

    tx.commit().await?;

    Ok(AppliedEvent {
        raid_id,
        kind,
        participants: seen_players.len(),
        warnings,
    })
}
