//! Backend endpoints, credentials and decoder keys.

use std::time::Duration;

use serde::Deserialize;

use crate::envelope::StatusFields;

pub const DEFAULT_SESSION_URL: &str = "https://www.udacity.com";
pub const DEFAULT_RECORD_URL: &str = "https://api.parse.com";
pub const DEFAULT_RECORDS_PATH: &str = "1/classes/StudentLocation";

/// Errors from building a [`ClientConfig`] out of the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Configuration shared by [`SessionClient`](crate::SessionClient) and
/// [`RecordClient`](crate::RecordClient).
///
/// Deserializable so a host can ship it as JSON; every field has a default
/// except the record backend's identity pair, which defaults to empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub session_base_url: String,
    pub record_base_url: String,
    pub records_path: String,
    /// Sent as `X-Parse-Application-Id` on every record call.
    pub application_id: String,
    /// Sent as `X-Parse-REST-API-Key` on every record call.
    pub rest_api_key: String,
    pub session_status: StatusFields,
    pub record_status: StatusFields,
    pub timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session_base_url: DEFAULT_SESSION_URL.to_string(),
            record_base_url: DEFAULT_RECORD_URL.to_string(),
            records_path: DEFAULT_RECORDS_PATH.to_string(),
            application_id: String::new(),
            rest_api_key: String::new(),
            session_status: StatusFields::session_default(),
            record_status: StatusFields::record_default(),
            timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn new(application_id: impl Into<String>, rest_api_key: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            rest_api_key: rest_api_key.into(),
            ..Self::default()
        }
    }

    /// Point both backends at one host, as the mock server serves them.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.session_base_url = base_url.to_string();
        self.record_base_url = base_url.to_string();
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Read `ONTHEMAP_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup("ONTHEMAP_SESSION_URL") {
            config.session_base_url = url;
        }
        if let Some(url) = lookup("ONTHEMAP_RECORD_URL") {
            config.record_base_url = url;
        }
        if let Some(path) = lookup("ONTHEMAP_RECORDS_PATH") {
            config.records_path = path;
        }
        config.application_id = lookup("ONTHEMAP_APPLICATION_ID")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("ONTHEMAP_APPLICATION_ID"))?;
        config.rest_api_key = lookup("ONTHEMAP_REST_API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("ONTHEMAP_REST_API_KEY"))?;
        if let Some(raw) = lookup("ONTHEMAP_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "ONTHEMAP_TIMEOUT_SECS",
                value: raw.clone(),
            })?;
            config.timeout_secs = Some(secs);
        }
        Ok(config)
    }
}

/// Join a base URL and a relative path with exactly one `/` between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
