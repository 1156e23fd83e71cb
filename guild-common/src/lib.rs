//! # Guild Common Library
//!
//! Shared code for the guild roster services including:
//! - Database schema and models
//! - Caller session tokens
//! - Configuration loading
//! - Error taxonomy
//! - Timestamp helpers

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
