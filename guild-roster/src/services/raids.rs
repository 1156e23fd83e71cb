//! Raid creation, public raid info and the signup form

use chrono::{DateTime, Utc};
use guild_common::api::CallerSession;
use guild_common::db::{Caller, Participant, Raid, RoleLabel};
use guild_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::raids::{NewRaid, RaidSummary};
use crate::db::{callers, participants, players, priority, raids};

/// Manual raid creation request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRaid {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub image_ref: Option<String>,
}

/// What the public signup page shows about a raid
#[derive(Debug, Clone, Serialize)]
pub struct RaidInfo {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub caller_name: Option<String>,
    pub image_ref: Option<String>,
}

/// Signup form as submitted by a player
#[derive(Debug, Clone, Deserialize)]
pub struct SignupForm {
    pub name: String,
    #[serde(default)]
    pub external_id: Option<String>,
    pub role: String,
    #[serde(default)]
    pub secondary_role: Option<String>,
    #[serde(default)]
    pub gear_level: i64,
}

/// Validated signup
#[derive(Debug, Clone, PartialEq)]
struct ValidSignup {
    name: String,
    external_id: Option<String>,
    role: RoleLabel,
    secondary_role: Option<RoleLabel>,
    gear_level: i64,
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_role_field(field: &str, value: &str) -> Result<RoleLabel> {
    value
        .parse()
        .map_err(|e| Error::Validation(format!("{}: {}", field, e)))
}

impl SignupForm {
    fn validate(&self) -> Result<ValidSignup> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("name must not be blank".to_string()));
        }
        if self.gear_level < 0 {
            return Err(Error::Validation(format!(
                "gear level must not be negative (got {})",
                self.gear_level
            )));
        }

        Ok(ValidSignup {
            name: name.to_string(),
            external_id: blank_to_none(self.external_id.as_deref()).map(str::to_string),
            role: parse_role_field("role", &self.role)?,
            secondary_role: blank_to_none(self.secondary_role.as_deref())
                .map(|r| parse_role_field("secondary_role", r))
                .transpose()?,
            gear_level: self.gear_level,
        })
    }
}

pub async fn list_callers(db: &SqlitePool) -> Result<Vec<Caller>> {
    callers::list_callers(db).await
}

/// The caller's raids, soonest first, with registration counts
pub async fn list_raids_for_caller(db: &SqlitePool, caller_id: &str) -> Result<Vec<RaidSummary>> {
    if callers::find_by_discord_id(db, caller_id).await?.is_none() {
        return Err(Error::NotFound(format!("caller {}", caller_id)));
    }
    raids::list_for_caller(db, caller_id).await
}

/// Create a raid owned by the session's caller
pub async fn create_raid_manually(
    db: &SqlitePool,
    session: &CallerSession,
    request: &CreateRaid,
) -> Result<Raid> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(Error::Validation("title must not be blank".to_string()));
    }

    let caller = callers::find_by_discord_id(db, &session.caller_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("caller {}", session.caller_id)))?;

    let raid = raids::insert_manual(
        db,
        &NewRaid {
            title: title.to_string(),
            description: blank_to_none(request.description.as_deref()).map(str::to_string),
            date: request.scheduled_at,
            caller_id: caller.discord_id.clone(),
            caller_name: caller.name.clone(),
            image_url: blank_to_none(request.image_ref.as_deref()).map(str::to_string),
        },
    )
    .await?;

    info!(raid_id = %raid.id, caller_id = %caller.discord_id, "Raid created");
    Ok(raid)
}

pub async fn get_raid_info(db: &SqlitePool, raid_id: Uuid) -> Result<RaidInfo> {
    let raid = raids::get_raid(db, raid_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("raid {}", raid_id)))?;

    Ok(RaidInfo {
        id: raid.id,
        title: raid.title,
        description: raid.description,
        scheduled_at: raid.date,
        caller_name: raid.caller_name,
        image_ref: raid.image_url,
    })
}

/// Register a player for a raid from the public form
///
/// A repeated signup updates role, secondary role and gear level and keeps
/// the selection and priority flags.
pub async fn submit_signup(db: &SqlitePool, raid_id: Uuid, form: &SignupForm) -> Result<Participant> {
    let signup = form.validate()?;

    let mut tx = crate::db::begin_write(db).await?;

    if raids::get_raid(&mut *tx, raid_id).await?.is_none() {
        return Err(Error::NotFound(format!("raid {}", raid_id)));
    }

    let player = players::resolve_or_create(&mut tx, &signup.name, signup.external_id.as_deref()).await?;

    let participant = match participants::find_for_player(&mut *tx, raid_id, player.id).await? {
        Some(existing) => {
            participants::update_signup(
                &mut *tx,
                existing.id,
                signup.role,
                signup.secondary_role,
                signup.gear_level,
            )
            .await?;
            Participant {
                role: signup.role,
                secondary_role: signup.secondary_role,
                gear_level: signup.gear_level,
                ..existing
            }
        }
        None => {
            participants::insert_participant(
                &mut *tx,
                raid_id,
                player.id,
                signup.role,
                signup.secondary_role,
                signup.gear_level,
            )
            .await?
        }
    };

    tx.commit().await?;

    info!(
        raid_id = %raid_id,
        player_id = %player.id,
        identity = ?player.identity(),
        role = %participant.role,
        "Signup recorded"
    );
    Ok(participant)
}

pub async fn list_priority_records(db: &SqlitePool) -> Result<Vec<priority::PriorityRecordView>> {
    priority::list_records(db).await
}
