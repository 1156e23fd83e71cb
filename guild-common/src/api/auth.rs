//! Caller session tokens
//!
//! A caller proves knowledge of the shared caller password once and receives
//! a capability token `"<caller_id>.<issued_at>.<signature>"`. The signature
//! is an HMAC-SHA256 over the caller id and issue time, keyed by a random
//! shared secret kept in the `settings` table. Tokens survive restarts,
//! cannot be moved to a different caller and expire after
//! [`SESSION_TTL_SECS`].

use crate::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::SqlitePool;

type HmacSha256 = Hmac<Sha256>;

const SECRET_KEY: &str = "session_shared_secret";

/// Session lifetime
pub const SESSION_TTL_SECS: i64 = 12 * 60 * 60;

/// Proof that a caller authenticated, passed explicitly into roster operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerSession {
    /// External identity of the authenticated caller
    pub caller_id: String,
    /// Token presented by the client
    pub token: String,
}

impl CallerSession {
    /// True when this session belongs to `caller_id`
    pub fn owns(&self, caller_id: &str) -> bool {
        self.caller_id == caller_id
    }
}

/// Load session secret from database settings, generating it on first use
///
/// The secret is a random non-zero i64.
pub async fn load_session_secret(db: &SqlitePool) -> Result<i64> {
    let result: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(SECRET_KEY)
        .fetch_optional(db)
        .await?;

    match result {
        Some((value,)) => value
            .parse::<i64>()
            .map_err(|e| Error::Config(format!("Invalid {}: {}", SECRET_KEY, e))),
        None => initialize_session_secret(db).await,
    }
}

async fn initialize_session_secret(db: &SqlitePool) -> Result<i64> {
    use rand::Rng;

    let secret: i64 = {
        let mut rng = rand::thread_rng();
        loop {
            let val = rng.gen::<i64>();
            if val != 0 {
                break val;
            }
        }
    };

    // INSERT OR IGNORE: a concurrent initializer may have won the race
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(SECRET_KEY)
        .bind(secret.to_string())
        .execute(db)
        .await?;

    let (stored,): (String,) = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(SECRET_KEY)
        .fetch_one(db)
        .await?;

    stored
        .parse::<i64>()
        .map_err(|e| Error::Config(format!("Invalid {}: {}", SECRET_KEY, e)))
}

fn session_mac(secret: i64) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(secret.to_string().as_bytes())
        .map_err(|e| Error::Internal(format!("HMAC key error: {}", e)))
}

fn signed_payload(caller_id: &str, issued_at: i64) -> String {
    format!("{}.{}", caller_id, issued_at)
}

/// Signature of a caller id and issue time under the shared secret (64 hex chars)
pub fn sign_caller(caller_id: &str, issued_at: i64, secret: i64) -> Result<String> {
    let mut mac = session_mac(secret)?;
    mac.update(signed_payload(caller_id, issued_at).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build the token handed to a caller after login
pub fn issue_session_token(caller_id: &str, secret: i64) -> Result<String> {
    issue_session_token_at(caller_id, secret, crate::time::now().timestamp())
}

pub fn issue_session_token_at(caller_id: &str, secret: i64, issued_at: i64) -> Result<String> {
    Ok(format!(
        "{}.{}",
        signed_payload(caller_id, issued_at),
        sign_caller(caller_id, issued_at, secret)?
    ))
}

/// Validate a presented token and recover the session
pub fn verify_session_token(token: &str, secret: i64) -> Result<CallerSession> {
    verify_session_token_at(token, secret, crate::time::now().timestamp())
}

/// Validate a token against an explicit clock (Unix seconds)
pub fn verify_session_token_at(token: &str, secret: i64, now: i64) -> Result<CallerSession> {
    let malformed = || Error::Authentication("Malformed session token".to_string());

    let mut parts = token.rsplitn(3, '.');
    let (Some(signature), Some(issued_at), Some(caller_id)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed());
    };
    let issued_at: i64 = issued_at.parse().map_err(|_| malformed())?;
    if caller_id.is_empty() {
        return Err(malformed());
    }

    let signature = hex::decode(signature)
        .map_err(|_| Error::Authentication("Invalid session token".to_string()))?;
    let mut mac = session_mac(secret)?;
    mac.update(signed_payload(caller_id, issued_at).as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| Error::Authentication("Invalid session token".to_string()))?;

    if now - issued_at > SESSION_TTL_SECS {
        return Err(Error::Authentication("Session token expired".to_string()));
    }

    Ok(CallerSession {
        caller_id: caller_id.to_string(),
        token: token.to_string(),
    })
}

/// Check a login password against the configured one
///
/// No configured password means caller login is disabled. Both values are
/// run through a keyed MAC so the comparison happens in `verify_slice`.
pub fn verify_password(provided: &str, configured: Option<&str>) -> Result<()> {
    let Some(expected) = configured else {
        return Err(Error::Authentication(
            "Caller login is not configured (set GUILD_CALLER_PASSWORD or caller_password)"
                .to_string(),
        ));
    };

    let password_mac = |password: &str| -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(password.as_bytes())
            .map_err(|e| Error::Internal(format!("HMAC key error: {}", e)))?;
        mac.update(b"guild-roster caller login");
        Ok(mac)
    };

    let expected_tag = password_mac(expected)?.finalize().into_bytes();
    password_mac(provided)?
        .verify_slice(&expected_tag)
        .map_err(|_| Error::Authentication("Wrong password".to_string()))
}
