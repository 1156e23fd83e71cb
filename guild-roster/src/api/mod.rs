//! HTTP API handlers for guild-roster

pub mod auth;
pub mod callers;
pub mod health;
pub mod raids;
pub mod roster;
pub mod settings;
pub mod sync;

pub use auth::{auth_middleware, SESSION_HEADER};
pub use callers::caller_routes;
pub use health::health_routes;
pub use raids::{protected_raid_routes, public_raid_routes};
pub use roster::roster_routes;
pub use settings::settings_routes;
pub use sync::sync_routes;
