//! Shared HTTP API functionality
//!
//! This module contains ONLY pure functions and database operations.
//! No HTTP framework dependencies; the service wraps these in axum middleware.

pub mod auth;

pub use auth::{
    issue_session_token, issue_session_token_at, load_session_secret, sign_caller,
    verify_password, verify_session_token, verify_session_token_at, CallerSession,
    SESSION_TTL_SECS,
};
