//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A raid leader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caller {
    pub id: Uuid,
    /// External (Discord) identity, unique
    pub discord_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// One scheduled raid event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raid {
    pub id: Uuid,
    /// Raid Helper event id, the sync idempotency key
    pub raid_helper_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    /// Owning caller's external identity
    pub caller_id: String,
    /// Caller display name at the time of creation/last sync
    pub caller_name: Option<String>,
    pub image_url: Option<String>,
    pub last_synced: Option<DateTime<Utc>>,
}

/// How a player's identity was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerIdentity {
    /// Keyed by external identity
    Verified,
    /// Name-only signup, keyed by display name among unverified players
    Unverified,
}

/// A person who signed up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub discord_id: Option<String>,
}

impl Player {
    pub fn identity(&self) -> PlayerIdentity {
        if self.discord_id.is_some() {
            PlayerIdentity::Verified
        } else {
            PlayerIdentity::Unverified
        }
    }
}

/// A player's registration to one raid (`raid_registrations` row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub raid_id: Uuid,
    pub player_id: Uuid,
    pub role: RoleLabel,
    pub secondary_role: Option<RoleLabel>,
    /// Gear level ("IP")
    pub gear_level: i64,
    pub selected: bool,
    /// MOR flag
    pub priority: bool,
}

/// Active MOR status of a player (`mor_status` row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRecord {
    pub id: Uuid,
    pub player_id: Uuid,
    /// The raid the player was passed over for
    pub raid_id: Uuid,
    pub caller_id: String,
    pub granted_at: DateTime<Utc>,
}

/// Closed set of game-role labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleLabel {
    OffTank,
    Healer,
    SupportArcane,
    SupportSilence,
    FrostDps,
    FireDps,
    RangedDps,
    RangedDps2,
    Scout,
    Debuff,
    Root,
    /// Root build played as damage; only chosen on the signup form
    RootDps,
    Decoy,
    Stealth,
    Dps,
}

impl RoleLabel {
    pub const ALL: [RoleLabel; 15] = [
        RoleLabel::OffTank,
        RoleLabel::Healer,
        RoleLabel::SupportArcane,
        RoleLabel::SupportSilence,
        RoleLabel::FrostDps,
        RoleLabel::FireDps,
        RoleLabel::RangedDps,
        RoleLabel::RangedDps2,
        RoleLabel::Scout,
        RoleLabel::Debuff,
        RoleLabel::Root,
        RoleLabel::RootDps,
        RoleLabel::Decoy,
        RoleLabel::Stealth,
        RoleLabel::Dps,
    ];

    /// Canonical label, as stored and serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleLabel::OffTank => "Off-Tank",
            RoleLabel::Healer => "Healer",
            RoleLabel::SupportArcane => "Support-A",
            RoleLabel::SupportSilence => "Support-B",
            RoleLabel::FrostDps => "Frost-DPS",
            RoleLabel::FireDps => "Fire-DPS",
            RoleLabel::RangedDps => "Ranged-DPS",
            RoleLabel::RangedDps2 => "Ranged-DPS-2",
            RoleLabel::Scout => "Scout",
            RoleLabel::Debuff => "Debuff",
            RoleLabel::Root => "Root",
            RoleLabel::RootDps => "Root-DPS",
            RoleLabel::Decoy => "Decoy",
            RoleLabel::Stealth => "Stealth",
            RoleLabel::Dps => "DPS",
        }
    }

    /// In-game names the guild used on its forms before the labels were unified
    fn legacy_aliases(&self) -> &'static [&'static str] {
        match self {
            RoleLabel::OffTank => &["Off Tank"],
            RoleLabel::SupportArcane => &["Elevado"],
            RoleLabel::SupportSilence => &["Silence"],
            RoleLabel::FrostDps => &["Frost"],
            RoleLabel::FireDps => &["Fire"],
            RoleLabel::RangedDps => &["X-Bow"],
            RoleLabel::RangedDps2 => &["Águia", "Aguia"],
            RoleLabel::Root => &["Raiz Férrea", "Raiz Ferrea"],
            RoleLabel::RootDps => &["Raiz Férrea DPS", "Raiz Ferrea DPS"],
            RoleLabel::Decoy => &["Roletroll"],
            RoleLabel::Stealth => &["Oculto"],
            _ => &[],
        }
    }
}

impl fmt::Display for RoleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown role label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role label '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for RoleLabel {
    type Err = UnknownRole;

    /// Case-insensitive; accepts canonical labels and legacy aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RoleLabel::ALL
            .iter()
            .copied()
            .find(|role| {
                role.as_str().eq_ignore_ascii_case(wanted)
                    || role
                        .legacy_aliases()
                        .iter()
                        .any(|alias| alias.to_lowercase() == wanted.to_lowercase())
            })
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl Serialize for RoleLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RoleLabel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
