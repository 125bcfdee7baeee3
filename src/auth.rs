//! Authentication Module
//!
//! Logs in to the qBittorrent Web UI and keeps the session store current.

use reqwest::header::COOKIE;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{api, Config, Credentials};
use crate::error::{Error, Result};
use crate::session::{Session, SessionStore, SESSION_COOKIE};

/// Performs login/logout against the Web UI
pub struct Authenticator {
    http: reqwest::Client,
    login_url: String,
    logout_url: String,
    credentials: Credentials,
    store: SessionStore,
    /// Serializes renewals so concurrent 403s share one login
    renewal: Mutex<()>,
}

impl Authenticator {
    /// Create a new authenticator writing into `store`
    pub fn new(http: reqwest::Client, config: &Config, store: SessionStore) -> Self {
        Self {
            http,
            login_url: config.api_url(api::LOGIN),
            logout_url: config.api_url(api::LOGOUT),
            credentials: config.credentials.clone(),
            store,
            renewal: Mutex::new(()),
        }
    }

    /// Log in and store the issued session
    ///
    /// A response without the session cookie is a protocol violation and is
    /// reported as [`Error::Auth`] without retrying.
    pub async fn login(&self) -> Result<Session> {
        info!("Logging in as {}", self.credentials.username);

        let response = self
            .http
            .post(&self.login_url)
            .form(&[
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus { code: status.as_u16(), url: self.login_url.clone() });
        }

        let session = response
            .cookies()
            .find(|cookie| cookie.name() == SESSION_COOKIE && !cookie.value().is_empty())
            .map(|cookie| Session::new(cookie.value()))
            .ok_or_else(|| Error::Auth("missing session cookie".into()))?;

        debug!("{}={}", SESSION_COOKIE, session.redacted());
        self.store.replace(session.clone());
        info!("Saved session cookie");

        Ok(session)
    }

    /// Replace a session the server rejected
    ///
    /// `stale` is the session the failed request carried. If another caller
    /// already swapped in a different session while this one waited, that
    /// session is returned and no login is issued.
    pub async fn renew(&self, stale: Option<&Session>) -> Result<Session> {
        let _guard = self.renewal.lock().await;

        if let Some(current) = self.store.current() {
            if Some(&current) != stale {
                debug!("Session already renewed by a concurrent request");
                return Ok(current);
            }
        }

        info!("Session cookie invalid, logging in again");
        self.login().await
    }

    /// Invalidate the session on the server; never fails
    pub async fn logout(&self) {
        let mut request = self.http.post(&self.logout_url);
        if let Some(session) = self.store.current() {
            request = request.header(COOKIE, session.cookie_header());
        }

        match request.send().await {
            Ok(response) if !response.status().is_success() => {
                warn!("Logout returned status {}", response.status());
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Logout failed: {}", Error::from(e));
            }
        }

        self.store.clear();
        info!("Logged out");
    }

    /// The store this authenticator writes into
    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}
