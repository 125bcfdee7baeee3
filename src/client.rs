//! Resilient Client Module
//!
//! Wraps outbound HTTP calls with bounded retry and re-authentication when
//! the Web UI rejects the session.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::COOKIE;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use crate::auth::Authenticator;
use crate::config::REQUEST_TIMEOUT;
use crate::error::{Error, Result};
use crate::session::SessionStore;

/// Build the shared reqwest client used for every call
pub fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Which responses are retried, and which of those need a new session first
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, initial try included
    pub max_attempts: usize,
    pub retryable: RangeInclusive<u16>,
    pub renew_on: Vec<u16>,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retryable: 400..=599,
            renew_on: vec![StatusCode::FORBIDDEN.as_u16()],
            base_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retryable.contains(&status.as_u16())
    }

    pub fn requires_renewal(&self, status: StatusCode) -> bool {
        self.is_retryable(status) && self.renew_on.contains(&status.as_u16())
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        self.base_backoff.saturating_mul(1u32 << shift)
    }
}

/// HTTP client with retry and session renewal
pub struct ResilientClient {
    http: reqwest::Client,
    policy: RetryPolicy,
    store: SessionStore,
    auth: Arc<Authenticator>,
}

impl ResilientClient {
    /// Create a client with the default retry policy
    pub fn new(http: reqwest::Client, auth: Arc<Authenticator>) -> Self {
        Self { http, policy: RetryPolicy::default(), store: auth.store().clone(), auth }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.store
    }

    /// Start a request on the underlying reqwest client
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// Send without a session, retrying retryable statuses
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        self.execute(builder, false).await
    }

    /// Send with the current session attached, renewing it on 403
    pub async fn send_authenticated(&self, builder: RequestBuilder) -> Result<Response> {
        self.execute(builder, true).await
    }

    async fn execute(&self, builder: RequestBuilder, authenticated: bool) -> Result<Response> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            // Only buffered bodies can be replayed
            let mut cloned = builder.try_clone().ok_or_else(|| {
                Error::Config("request body cannot be cloned; buffer the body to enable retries".into())
            })?;

            // Read the store per attempt so a retry after renewal carries the new session
            let session = if authenticated { self.store.current() } else { None };
            if let Some(session) = &session {
                cloned = cloned.header(COOKIE, session.cookie_header());
            }

            let request = cloned.build()?;
            let method = request.method().clone();
            let url = request.url().to_string();
            debug!(attempt, %method, %url, "sending HTTP request");

            let response = self.http.execute(request).await.map_err(|e| {
                debug!(attempt, %method, %url, error = %e, "HTTP request failed");
                Error::from(e)
            })?;

            let status = response.status();
            debug!(attempt, %method, %url, %status, "received HTTP response");

            if !self.policy.is_retryable(status) {
                return Ok(response);
            }

            if attempt >= attempts {
                warn!("{} {} failed with {} after {} attempts", method, url, status, attempt);
                return Err(Error::HttpStatus { code: status.as_u16(), url });
            }

            if authenticated && self.policy.requires_renewal(status) {
                info!("Session rejected by {}, re-logging in (attempt {}/{})", url, attempt, attempts);
                self.auth.renew(session.as_ref()).await?;
            } else {
                info!("{} {} returned {}, retrying (attempt {}/{})", method, url, status, attempt, attempts);
            }

            let delay = self.policy.backoff_delay(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
