//! Configuration Module
//!
//! Reads the updater settings from the environment once at startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::trigger::ScheduleTrigger;

pub const ENV_ENDPOINT: &str = "QBITTORRENT_ENDPOINT";
pub const ENV_USERNAME: &str = "QBITTORRENT_USERNAME";
pub const ENV_PASSWORD: &str = "QBITTORRENT_PASSWORD";
pub const ENV_CRON: &str = "CRON";
pub const ENV_TRACKER_LIST: &str = "TRACKER_LIST_URL";
pub const ENV_LOG_DIR: &str = "LOG_DIR";

/// Top of every hour.
pub const DEFAULT_CRON: &str = "0 * * * *";

pub const DEFAULT_TRACKER_LIST_URL: &str =
    "https://raw.githubusercontent.com/ngosang/trackerslist/master/trackers_all.txt";

/// Timeout applied to every outbound HTTP call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// qBittorrent Web API paths, relative to the endpoint.
pub mod api {
    pub const LOGIN: &str = "/api/v2/auth/login";
    pub const LOGOUT: &str = "/api/v2/auth/logout";
    pub const SET_PREFERENCES: &str = "/api/v2/app/setPreferences";
}

/// Login credentials for the Web UI
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated updater configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Web UI base URL without a trailing slash
    pub endpoint: String,
    pub credentials: Credentials,
    pub trigger: ScheduleTrigger,
    pub tracker_list_url: String,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let endpoint = read(ENV_ENDPOINT);
        let username = read(ENV_USERNAME);
        let password = read(ENV_PASSWORD);

        let missing: Vec<&str> = [
            (ENV_ENDPOINT, endpoint.is_none()),
            (ENV_USERNAME, username.is_none()),
            (ENV_PASSWORD, password.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();

        let (Some(endpoint), Some(username), Some(password)) = (endpoint, username, password) else {
            return Err(Error::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        };

        let endpoint = validate_url(ENV_ENDPOINT, &endpoint)?;

        let cron = read(ENV_CRON).unwrap_or_else(|| DEFAULT_CRON.to_string());
        let trigger = ScheduleTrigger::parse(&cron)
            .map_err(|e| Error::Config(format!("{} is not a valid cron expression: {}", ENV_CRON, e)))?;

        let tracker_list_url = match read(ENV_TRACKER_LIST) {
            Some(url) => validate_url(ENV_TRACKER_LIST, &url)?,
            None => DEFAULT_TRACKER_LIST_URL.to_string(),
        };

        Ok(Self {
            endpoint,
            credentials: Credentials { username, password },
            trigger,
            tracker_list_url,
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        })
    }

    /// Absolute URL of a control API path
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

#[cfg(test)]
pub(crate) fn test_config(endpoint: &str) -> Config {
    Config {
        endpoint: endpoint.trim_end_matches('/').to_string(),
        credentials: Credentials { username: "admin".into(), password: "adminadmin".into() },
        trigger: ScheduleTrigger::parse(DEFAULT_CRON).expect("default cron"),
        tracker_list_url: format!("{}/trackers.txt", endpoint.trim_end_matches('/')),
        log_dir: None,
    }
}

fn validate_url(key: &str, value: &str) -> Result<String> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| Error::Config(format!("{} is not a valid URL: {}", key, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!("{} must use http or https", key)));
    }

    Ok(value.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::ErrorKind;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_ENDPOINT, "http://localhost:8080/"),
            (ENV_USERNAME, "admin"),
            (ENV_PASSWORD, "adminadmin"),
        ]
    }

    #[test]
    fn applies_defaults() {
        let config = load(&required()).unwrap();

        assert_eq!(config.endpoint, "http://localhost:8080");
        assert_eq!(config.api_url(api::LOGIN), "http://localhost:8080/api/v2/auth/login");
        assert_eq!(config.tracker_list_url, DEFAULT_TRACKER_LIST_URL);
        assert_eq!(config.trigger.expression(), DEFAULT_CRON);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn reports_every_missing_variable() {
        let err = load(&[(ENV_USERNAME, "admin"), (ENV_PASSWORD, "  ")]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Config);
        let message = err.to_string();
        assert!(message.contains(ENV_ENDPOINT));
        assert!(message.contains(ENV_PASSWORD));
        assert!(!message.contains(ENV_USERNAME));
    }

    #[test]
    fn reads_optional_overrides() {
        let mut vars = required();
        vars.push((ENV_CRON, "*/15 * * * *"));
        vars.push((ENV_TRACKER_LIST, "https://example.com/trackers.txt"));
        vars.push((ENV_LOG_DIR, "/var/log/qbt"));

        let config = load(&vars).unwrap();
        assert_eq!(config.trigger.expression(), "*/15 * * * *");
        assert_eq!(config.tracker_list_url, "https://example.com/trackers.txt");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/qbt")));
    }

    #[test]
    fn rejects_bad_cron_and_urls() {
        let mut vars = required();
        vars.push((ENV_CRON, "every hour"));
        assert_eq!(load(&vars).unwrap_err().kind(), ErrorKind::Config);

        let mut vars = required();
        vars[0] = (ENV_ENDPOINT, "localhost:8080");
        assert_eq!(load(&vars).unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let config = load(&required()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("adminadmin"));
    }
}
