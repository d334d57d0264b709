use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::RefreshFailurePolicy;
use crate::client::SpaClientBuilder;
use crate::protocol::DEFAULT_BASE_URL;
use crate::{Error, Result};

/// Settings for one integration instance, as stored by the host.
#[derive(Clone, Deserialize)]
pub struct SpaConfig {
    pub username: String,
    pub password: String,
    /// Spa to control; the first owned spa is used when absent.
    #[serde(default)]
    pub spa_id: Option<String>,
    #[serde(default = "default_update_interval", alias = "updateintervalminutes")]
    pub update_interval_minutes: u64,
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub on_refresh_failure: RefreshFailurePolicy,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_update_interval() -> u64 {
    2
}

fn default_settle_delay() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    30
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl fmt::Debug for SpaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpaConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("spa_id", &self.spa_id)
            .field("update_interval_minutes", &self.update_interval_minutes)
            .field("settle_delay_secs", &self.settle_delay_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("on_refresh_failure", &self.on_refresh_failure)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SpaConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            spa_id: None,
            update_interval_minutes: default_update_interval(),
            settle_delay_secs: default_settle_delay(),
            request_timeout_secs: default_request_timeout(),
            accept_invalid_certs: false,
            on_refresh_failure: RefreshFailurePolicy::default(),
            base_url: default_base_url(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::Config("username is empty".to_string()));
        }
        if self.password.is_empty() {
            return Err(Error::Config("password is empty".to_string()));
        }
        if self.update_interval_minutes == 0 {
            return Err(Error::Config("update_interval_minutes must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_minutes * 60)
    }

    pub fn client_builder(&self) -> SpaClientBuilder {
        let mut builder = SpaClientBuilder::new(&self.username, &self.password)
            .base_url(&self.base_url)
            .settle_delay(Duration::from_secs(self.settle_delay_secs))
            .request_timeout(Duration::from_secs(self.request_timeout_secs))
            .accept_invalid_certs(self.accept_invalid_certs);
        if let Some(id) = &self.spa_id {
            builder = builder.spa_id(id);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_applied() {
        let config = SpaConfig::from_json_str(r#"{"username": "a@b.c", "password": "pw"}"#).unwrap();
        assert_eq!(config.update_interval(), Duration::from_secs(120));
        assert_eq!(config.settle_delay_secs, 5);
        assert_eq!(config.on_refresh_failure, RefreshFailurePolicy::Discard);
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.spa_id.is_none());
    }

    #[test]
    fn host_style_keys_accepted() {
        let config = SpaConfig::from_json_str(
            r#"{"username": "a", "password": "b", "updateintervalminutes": 5,
                "spa_id": "s1", "on_refresh_failure": "keep_stale"}"#,
        )
        .unwrap();
        assert_eq!(config.update_interval_minutes, 5);
        assert_eq!(config.spa_id.as_deref(), Some("s1"));
        assert_eq!(config.on_refresh_failure, RefreshFailurePolicy::KeepStale);
    }

    #[test]
    fn rejects_zero_interval_and_empty_credentials() {
        let err = SpaConfig::from_json_str(r#"{"username": "a", "password": "b", "update_interval_minutes": 0}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(SpaConfig::from_json_str(r#"{"username": " ", "password": "b"}"#).is_err());
        assert!(SpaConfig::from_json_str(r#"{"username": "a"}"#).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, r#"{{"username": "a", "password": "b", "settle_delay_secs": 1}}"#).unwrap();
        let config = SpaConfig::from_file(tmp.path()).unwrap();
        assert_eq!(config.settle_delay_secs, 1);
    }

    #[test]
    fn debug_masks_password() {
        let config = SpaConfig::new("a@b.c", "hunter2");
        let printed = format!("{config:?}");
        assert!(!printed.contains("hunter2"), "{printed}");
        assert!(printed.contains("***"));
        assert!(printed.contains("a@b.c"));
    }

    #[test]
    fn builder_carries_spa_id() {
        let mut config = SpaConfig::new("a", "b");
        config.spa_id = Some("spa-9".into());
        config.base_url = "http://127.0.0.1:9".into();
        let client = config.client_builder().build().unwrap();
        assert_eq!(client.spa_id().as_deref(), Some("spa-9"));
        assert_eq!(client.settle_delay(), Duration::from_secs(5));
    }
}
