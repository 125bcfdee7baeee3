//! Tracker Sync Module
//!
//! One update cycle: download the public tracker list and push it to the
//! Web UI as the default tracker list.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, Response};
use tracing::{error, info};

use crate::client::ResilientClient;
use crate::config::{api, Config};
use crate::error::{Error, Result};
use crate::scheduler::ScheduledJob;

/// Outcome of one update cycle
#[derive(Debug)]
pub enum JobResult {
    Updated { trackers: usize },
    Failed(Error),
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Updated { .. })
    }
}

/// Drop blank lines and join the rest with commas, keeping source order
pub fn normalize(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Fetches the tracker list and updates the Web UI preferences
pub struct UpdateJob {
    client: Arc<ResilientClient>,
    tracker_list_url: String,
    preferences_url: String,
}

impl UpdateJob {
    /// Create a new update job
    pub fn new(client: Arc<ResilientClient>, config: &Config) -> Self {
        Self {
            client,
            tracker_list_url: config.tracker_list_url.clone(),
            preferences_url: config.api_url(api::SET_PREFERENCES),
        }
    }

    /// Run one cycle; failures are logged and returned, never propagated
    pub async fn run(&self) -> JobResult {
        match self.update().await {
            Ok(trackers) => {
                info!("Default trackers updated ({} trackers)", trackers);
                JobResult::Updated { trackers }
            }
            Err(e) => {
                error!(kind = %e.kind(), "Tracker update failed: {}", e);
                JobResult::Failed(e)
            }
        }
    }

    async fn update(&self) -> Result<usize> {
        let trackers = self.download_tracker_list().await?;
        let count = if trackers.is_empty() { 0 } else { trackers.split(',').count() };
        self.set_default_trackers(&trackers).await?;
        Ok(count)
    }

    /// Download and normalize the tracker list
    pub async fn download_tracker_list(&self) -> Result<String> {
        info!("Downloading tracker list from {}", self.tracker_list_url);

        let request = self.client.request(Method::GET, &self.tracker_list_url);
        let response = ensure_success(self.client.send(request).await?)?;
        let text = response.text().await?;

        Ok(normalize(&text))
    }

    /// Replace the default tracker list in the Web UI preferences
    pub async fn set_default_trackers(&self, trackers: &str) -> Result<()> {
        info!("Updating default trackers");

        let payload = serde_json::json!({
            "add_trackers_enabled": true,
            "add_trackers": trackers,
        });

        let request = self
            .client
            .request(Method::POST, &self.preferences_url)
            .form(&[("json", payload.to_string())]);

        ensure_success(self.client.send_authenticated(request).await?)?;
        Ok(())
    }
}

#[async_trait]
impl ScheduledJob for UpdateJob {
    async fn execute(&self) -> JobResult {
        self.run().await
    }
}

fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::HttpStatus { code: status.as_u16(), url: response.url().to_string() })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::tests::{client_for, mount_login};
    use crate::config::test_config;
    use crate::error::ErrorKind;
    use crate::session::Session;

    const TRACKERS: &str = "udp://tracker.one:1337/announce\n\nhttp://tracker.two/announce\r\n\n";

    fn job_for(server: &MockServer) -> UpdateJob {
        let client = client_for(&server.uri());
        client.session_store().replace(Session::new("current"));
        UpdateJob::new(Arc::new(client), &test_config(&server.uri()))
    }

    async fn mount_tracker_list(server: &MockServer, body: &str) {
        Mock::given(method("GET"))
            .and(path("/trackers.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    fn form_field(body: &[u8], name: &str) -> Option<String> {
        let mut url = reqwest::Url::parse("http://localhost/").unwrap();
        url.set_query(Some(std::str::from_utf8(body).unwrap()));
        url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
    }

    #[test]
    fn normalize_drops_blank_lines_and_joins() {
        assert_eq!(normalize("trackerA\ntrackerB\n\n"), "trackerA,trackerB");
        assert_eq!(normalize("a\r\n\r\n  b  \nc"), "a,b,c");
        assert_eq!(normalize("\n\n"), "");
    }

    #[tokio::test]
    async fn pushes_normalized_list_with_session() {
        let server = MockServer::start().await;
        mount_tracker_list(&server, TRACKERS).await;
        Mock::given(method("POST"))
            .and(path(api::SET_PREFERENCES))
            .and(header("cookie", "SID=current"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = job_for(&server).run().await;
        assert!(matches!(result, JobResult::Updated { trackers: 2 }));

        let requests = server.received_requests().await.unwrap();
        let push = requests.iter().find(|r| r.url.path() == api::SET_PREFERENCES).unwrap();
        let json = form_field(&push.body, "json").unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["add_trackers_enabled"], true);
        assert_eq!(
            payload["add_trackers"],
            "udp://tracker.one:1337/announce,http://tracker.two/announce"
        );
    }

    #[tokio::test]
    async fn push_failing_every_attempt_is_a_failed_cycle() {
        let server = MockServer::start().await;
        mount_tracker_list(&server, TRACKERS).await;
        Mock::given(method("POST"))
            .and(path(api::SET_PREFERENCES))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;
        mount_login(&server, "unused", 0).await;

        match job_for(&server).run().await {
            JobResult::Failed(e) => assert_eq!(e.status(), Some(500)),
            other => panic!("expected failed cycle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn download_failure_skips_push() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/trackers.txt"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(api::SET_PREFERENCES))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        match job_for(&server).run().await {
            JobResult::Failed(e) => assert_eq!(e.kind(), ErrorKind::HttpStatus),
            other => panic!("expected failed cycle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn expired_session_is_renewed_mid_cycle() {
        let server = MockServer::start().await;
        mount_tracker_list(&server, TRACKERS).await;
        Mock::given(method("POST"))
            .and(path(api::SET_PREFERENCES))
            .and(header("cookie", "SID=current"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(api::SET_PREFERENCES))
            .and(header("cookie", "SID=renewed"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        mount_login(&server, "renewed", 1).await;

        assert!(job_for(&server).run().await.is_success());
    }
}
