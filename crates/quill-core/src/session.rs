//! Admin sessions and CSRF tokens
//!
//! A registry maps an opaque session token to its expiry and a per-session
//! CSRF token. The client only ever holds the session token (in a cookie).
//!
//! Expired entries are evicted lazily: an authentication check that finds an
//! expired entry deletes it. There is no background sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, info};

/// Session lifetime
pub const SESSION_TTL_HOURS: i64 = 24;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE_NAME: &str = "admin_session";

/// Random bytes per token before encoding
const TOKEN_BYTES: usize = 32;

/// Authentication failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No session, unknown token or expired session
    #[error("not authenticated")]
    Unauthenticated,

    /// Submitted anti-forgery value missing or different from the session's
    #[error("CSRF token mismatch")]
    CsrfMismatch,

    /// Username or password did not match
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The OS random source failed
    #[error("failed to generate random token: {0}")]
    RandomSource(String),
}

/// Source of "now", swappable in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    expires_at: DateTime<Utc>,
    csrf_token: String,
}

/// Process-wide session registry behind a single mutex
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Registry with the standard TTL and the system clock
    pub fn new() -> Self {
        Self::with_clock(Duration::hours(SESSION_TTL_HOURS), Arc::new(SystemClock))
    }

    /// Registry with a custom TTL and clock
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Session lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session and return its token
    pub fn create_session(&self) -> Result<String, AuthError> {
        let token = random_token()?;
        let csrf_token = random_token()?;
        let expires_at = self.clock.now() + self.ttl;

        self.lock().insert(
            token.clone(),
            SessionEntry {
                expires_at,
                csrf_token,
            },
        );
        info!("Created admin session expiring at {}", expires_at);
        Ok(token)
    }

    /// Whether `token` names a live session; expired entries are removed
    pub fn is_authenticated(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }

        let now = self.clock.now();
        let mut sessions = self.lock();
        let expired = match sessions.get(token) {
            None => return false,
            Some(entry) => now > entry.expires_at,
        };
        if expired {
            sessions.remove(token);
            debug!("Evicted expired admin session");
            return false;
        }
        true
    }

    /// CSRF token of a live session
    ///
    /// Returns `None` for unknown or expired sessions. Eviction is left to
    /// [`is_authenticated`](Self::is_authenticated).
    pub fn csrf_token(&self, token: &str) -> Option<String> {
        if token.is_empty() {
            return None;
        }

        let now = self.clock.now();
        self.lock()
            .get(token)
            .filter(|entry| now <= entry.expires_at)
            .map(|entry| entry.csrf_token.clone())
    }

    /// Check a submitted anti-forgery value against the session's token
    pub fn verify_csrf(&self, token: &str, submitted: Option<&str>) -> Result<(), AuthError> {
        let expected = self.csrf_token(token).ok_or(AuthError::CsrfMismatch)?;
        match submitted {
            Some(value) if !value.is_empty() && value == expected => Ok(()),
            _ => Err(AuthError::CsrfMismatch),
        }
    }

    /// End a session (logout). Returns whether it existed.
    pub fn destroy(&self, token: &str) -> bool {
        self.lock().remove(token).is_some()
    }

    /// Number of entries held, expired ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 32 random bytes, URL-safe base64 without padding
fn random_token() -> Result<String, AuthError> {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| AuthError::RandomSource(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

/// The admin username/password pair, compared for exact equality
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if self.username == username && self.password == password {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Attributes of the session cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub value: String,
    /// Seconds; zero clears the cookie
    pub max_age: i64,
}

impl SessionCookie {
    /// Cookie carrying a fresh session token
    pub fn issue(token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            value: token.into(),
            max_age: ttl.num_seconds(),
        }
    }

    /// Cookie that removes the session token from the client
    pub fn clear() -> Self {
        Self {
            value: String::new(),
            max_age: 0,
        }
    }

    /// `Set-Cookie` header value
    pub fn header_value(&self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE_NAME, self.value, self.max_age
        )
    }
}
