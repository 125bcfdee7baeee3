//! Session Module
//!
//! Holds the Web UI session cookie shared by every in-flight request.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "SID";

/// Opaque session token issued by the Web UI (`SID` cookie value)
///
/// Validity is unknown client-side; only a 403 from the server reveals expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Value for the `Cookie` request header
    pub fn cookie_header(&self) -> String {
        format!("{}={}", SESSION_COOKIE, self.0)
    }

    /// Short prefix safe to put in logs
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{}…", prefix)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Session").field(&self.redacted()).finish()
    }
}

/// Process-wide holder of the current session
///
/// Cloning yields another handle to the same slot.
#[derive(Clone, Default)]
pub struct SessionStore {
    current: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current session, which may be stale
    pub fn current(&self) -> Option<Session> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Atomically swap in a new session
    pub fn replace(&self, session: Session) {
        debug!("Session replaced: {}", session.redacted());
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    /// Drop the current session
    pub fn clear(&self) {
        info!("Session cleared");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").field("current", &self.current()).finish()
    }
}
