//! Core services: feed adapter, reconciliation, priority state machine and
//! roster management

pub mod priority;
pub mod raid_helper_client;
pub mod raids;
pub mod reconciler;
pub mod roster;

pub use raid_helper_client::{CanonicalEvent, CanonicalSignup, FeedBatch, FeedError, RaidHelperClient};
pub use reconciler::{reconcile, reconcile_from_feed, EventOutcome, ReconciliationReport};
