//! Raid Helper event feed client
//!
//! Fetches posted events and their signups and normalizes them into
//! [`CanonicalEvent`]s. The feed has changed shape across API versions, so
//! every field is looked up through an ordered list of JSON pointers and
//! the first one present wins.

use chrono::{DateTime, Utc};
use guild_common::config::RaidHelperConfig;
use guild_common::time::from_unix_seconds;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("guild-roster/", env!("CARGO_PKG_VERSION"));

/// Top-level keys that may hold the event list, after the bare-array shape
const EVENT_LIST_KEYS: &[&str] = &["events", "postedEvents", "scheduledEvents", "data"];

/// Keys that may hold an event's signup list
const SIGNUP_LIST_KEYS: &[&str] = &["signUps", "signups", "participants"];

const EVENT_ID: &[&str] = &["/id", "/eventId"];
const EVENT_TITLE: &[&str] = &["/title", "/name"];
const EVENT_DESCRIPTION: &[&str] = &["/description"];
const EVENT_START: &[&str] = &["/startTime", "/start", "/date"];
const EVENT_IMAGE: &[&str] = &["/imageUrl", "/image"];
const LEADER_ID: &[&str] = &["/leaderId", "/author/id", "/leader/id"];
const LEADER_NAME: &[&str] = &["/leaderName", "/author/name", "/leader/name"];

const SIGNUP_USER_ID: &[&str] = &["/userId", "/user/id", "/discordId"];
const SIGNUP_NAME: &[&str] = &["/name", "/userName", "/user/name"];
const SIGNUP_CLASS: &[&str] = &["/className", "/class"];
const SIGNUP_SPEC: &[&str] = &["/specName", "/spec"];

/// Feed client errors
#[derive(Debug, Error)]
pub enum FeedError {
    /// Credential rejected by the feed (401/403)
    #[error("Raid Helper rejected the API key ({0})")]
    Authentication(String),

    /// Network failure, timeout or a non-success response
    #[error("Raid Helper request failed: {0}")]
    Transport(String),

    /// No API key configured in any source
    #[error("Raid Helper API key not configured")]
    MissingCredential,
}

impl From<FeedError> for guild_common::Error {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Authentication(_) | FeedError::MissingCredential => {
                guild_common::Error::Authentication(err.to_string())
            }
            FeedError::Transport(_) => guild_common::Error::Transport(err.to_string()),
        }
    }
}

/// One signup, as reported by the feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalSignup {
    pub external_id: Option<String>,
    pub name: String,
    pub class_tag: Option<String>,
    pub spec_tag: Option<String>,
}

/// One feed event in canonical form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEvent {
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub leader_external_id: String,
    pub leader_name: String,
    pub image_ref: Option<String>,
    pub signups: Vec<CanonicalSignup>,
}

/// Normalized feed response
///
/// Entries that could not be normalized are left out and described in
/// `warnings`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedBatch {
    pub events: Vec<CanonicalEvent>,
    pub warnings: Vec<String>,
}

/// Raid Helper API client
pub struct RaidHelperClient {
    http_client: reqwest::Client,
    base_url: String,
    server_id: Option<String>,
}

impl RaidHelperClient {
    pub fn new(config: &RaidHelperConfig) -> Result<Self, FeedError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            server_id: config.server_id.clone().filter(|s| !s.trim().is_empty()),
        })
    }

    fn events_url(&self) -> String {
        match &self.server_id {
            Some(server_id) => format!("{}/servers/{}/events", self.base_url, server_id),
            None => format!("{}/events", self.base_url),
        }
    }

    /// Fetch and normalize every event visible to `api_key`
    pub async fn fetch_events(&self, api_key: &str) -> Result<FeedBatch, FeedError> {
        if api_key.trim().is_empty() {
            return Err(FeedError::MissingCredential);
        }

        let url = self.events_url();
        tracing::debug!(url = %url, "Querying Raid Helper events");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(api_key.trim())
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FeedError::Authentication(status.to_string()));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FeedError::Transport(format!("{} {}", status, error_text.trim())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FeedError::Transport(format!("invalid JSON body: {}", e)))?;

        let batch = normalize_feed(&body);

        tracing::info!(
            events = batch.events.len(),
            skipped = batch.warnings.len(),
            "Retrieved events from Raid Helper"
        );

        Ok(batch)
    }
}

/// Normalize a feed response body
///
/// Never fails: an unrecognized envelope yields an empty batch.
pub fn normalize_feed(body: &Value) -> FeedBatch {
    let mut batch = FeedBatch::default();

    for (index, raw) in event_list(body).iter().enumerate() {
        match normalize_event(raw, &mut batch.warnings) {
            Ok(event) => batch.events.push(event),
            Err(reason) => batch.warnings.push(format!("event #{} skipped: {}", index, reason)),
        }
    }

    batch
}

/// Event list from the first matching envelope shape
fn event_list(body: &Value) -> &[Value] {
    if let Some(events) = body.as_array() {
        return events;
    }

    EVENT_LIST_KEYS
        .iter()
        .filter_map(|key| body.get(key).and_then(Value::as_array))
        .find(|events| !events.is_empty())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn normalize_event(raw: &Value, warnings: &mut Vec<String>) -> Result<CanonicalEvent, String> {
    let external_id = first_string(raw, EVENT_ID).ok_or("missing event id")?;
    let title = first_string(raw, EVENT_TITLE)
        .ok_or_else(|| format!("event {} has no title", external_id))?;
    let scheduled_at = first_timestamp(raw, EVENT_START)
        .ok_or_else(|| format!("event {} has no usable start time", external_id))?;
    let leader_external_id = first_string(raw, LEADER_ID)
        .ok_or_else(|| format!("event {} has no leader id", external_id))?;
    let leader_name = first_string(raw, LEADER_NAME).unwrap_or_else(|| leader_external_id.clone());

    // An empty list is a real answer: the raid has no signups left
    let raw_signups = SIGNUP_LIST_KEYS
        .iter()
        .find_map(|key| raw.get(key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut signups = Vec::with_capacity(raw_signups.len());
    for (index, raw_signup) in raw_signups.iter().enumerate() {
        match first_string(raw_signup, SIGNUP_NAME) {
            Some(name) => signups.push(CanonicalSignup {
                external_id: first_string(raw_signup, SIGNUP_USER_ID),
                name,
                class_tag: first_string(raw_signup, SIGNUP_CLASS),
                spec_tag: first_string(raw_signup, SIGNUP_SPEC),
            }),
            None => warnings.push(format!(
                "event {}: signup #{} skipped: missing name",
                external_id, index
            )),
        }
    }

    Ok(CanonicalEvent {
        external_id,
        title,
        description: first_string(raw, EVENT_DESCRIPTION),
        scheduled_at,
        leader_external_id,
        leader_name,
        image_ref: first_string(raw, EVENT_IMAGE),
        signups,
    })
}

/// First non-blank string (or number, rendered) under any of `pointers`
fn first_string(value: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|pointer| match value.pointer(pointer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First timestamp under any of `pointers`
///
/// Accepts Unix seconds (number or numeric string) and RFC 3339 text.
fn first_timestamp(value: &Value, pointers: &[&str]) -> Option<DateTime<Utc>> {
    pointers.iter().find_map(|pointer| match value.pointer(pointer)? {
        Value::Number(n) => n.as_i64().and_then(from_unix_seconds),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(secs) => from_unix_seconds(secs),
            Err(_) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        },
        _ => None,
    })
}
