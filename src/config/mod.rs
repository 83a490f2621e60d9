//! Configuration system (layered: defaults < config file < environment).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::auth::{ClientIdentity, CredentialStoreConfig, DeviceFlowClient, FileCredentialStore};
use crate::error::{DecanterError, Result};
use crate::poller::ResultPoller;
use crate::telemetry::HttpTelemetrySink;

pub const DEFAULT_HOST: &str = "https://autolab.cse.buffalo.edu";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolved client configuration.
///
/// Resolution order, later wins:
/// 1. Built-in defaults
/// 2. `<home>/config.toml`
/// 3. Environment (`DECANTER_*`, `.env` is loaded first if present)
#[derive(Debug, Clone, PartialEq)]
pub struct DecanterConfig {
    pub host: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub home_dir: PathBuf,
    pub profile: String,
    pub telemetry_url: Option<String>,
    pub telemetry_key: Option<String>,
    pub authorization_timeout: Duration,
    pub grade_poll_interval: Duration,
    pub grade_timeout: Duration,
}

impl Default for DecanterConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            client_id: None,
            client_secret: None,
            home_dir: CredentialStoreConfig::default_dir(),
            profile: "default".to_string(),
            telemetry_url: None,
            telemetry_key: None,
            authorization_timeout: Duration::from_secs(120),
            grade_poll_interval: Duration::from_secs(5),
            grade_timeout: Duration::from_secs(120),
        }
    }
}

/// On-disk shape of `config.toml`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    host: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    profile: Option<String>,
    telemetry_url: Option<String>,
    telemetry_key: Option<String>,
    authorization_timeout_secs: Option<u64>,
    grade_poll_interval_secs: Option<u64>,
    grade_timeout_secs: Option<u64>,
}

impl DecanterConfig {
    /// Load defaults, then the config file, then the process environment.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv(); // .env is optional
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) against an arbitrary environment lookup.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(home) = non_blank(&lookup, "DECANTER_HOME") {
            config.home_dir = PathBuf::from(home);
        }
        let path = config.home_dir.join(CONFIG_FILE_NAME);
        config.apply_file(&path)?;
        config.apply_env(lookup);
        Ok(config)
    }

    /// Overlay values from a TOML file; a missing file is not an error.
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(DecanterError::Io(err)),
        };
        let file: ConfigFile = toml::from_str(&raw).map_err(|e| {
            DecanterError::Configuration(format!("{}: {e}", path.display()))
        })?;

        if let Some(host) = file.host {
            self.host = host;
        }
        self.client_id = file.client_id.or(self.client_id.take());
        self.client_secret = file.client_secret.or(self.client_secret.take());
        if let Some(profile) = file.profile {
            self.profile = profile;
        }
        self.telemetry_url = file.telemetry_url.or(self.telemetry_url.take());
        self.telemetry_key = file.telemetry_key.or(self.telemetry_key.take());
        if let Some(secs) = file.authorization_timeout_secs {
            self.authorization_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.grade_poll_interval_secs {
            self.grade_poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = file.grade_timeout_secs {
            self.grade_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Overlay values from environment-style lookups.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| non_blank(&lookup, key);

        if let Some(host) = non_empty("DECANTER_HOST") {
            self.host = host;
        }
        if let Some(id) = non_empty("DECANTER_CLIENT_ID") {
            self.client_id = Some(id);
        }
        if let Some(secret) = non_empty("DECANTER_CLIENT_SECRET") {
            self.client_secret = Some(secret);
        }
        if let Some(home) = non_empty("DECANTER_HOME") {
            self.home_dir = PathBuf::from(home);
        }
        if let Some(profile) = non_empty("DECANTER_PROFILE") {
            self.profile = profile;
        }
        if let Some(url) = non_empty("DECANTER_TELEMETRY_URL") {
            self.telemetry_url = Some(url);
        }
        if let Some(key) = non_empty("DECANTER_TELEMETRY_KEY") {
            self.telemetry_key = Some(key);
        }
    }

    /// OAuth client registration; both id and secret are required.
    pub fn client_identity(&self) -> Result<ClientIdentity> {
        let client_id = self.client_id.as_deref().ok_or_else(|| {
            DecanterError::Configuration(
                "client id missing, set DECANTER_CLIENT_ID or client_id in config.toml".into(),
            )
        })?;
        let client_secret = self.client_secret.as_deref().ok_or_else(|| {
            DecanterError::Configuration(
                "client secret missing, set DECANTER_CLIENT_SECRET or client_secret in config.toml"
                    .into(),
            )
        })?;
        Ok(ClientIdentity::new(client_id, client_secret, &self.host))
    }

    pub fn device_flow_client(&self) -> Result<DeviceFlowClient> {
        Ok(DeviceFlowClient::new(self.client_identity()?)
            .with_authorization_timeout(self.authorization_timeout))
    }

    pub fn credential_store(&self) -> FileCredentialStore {
        FileCredentialStore::new(
            CredentialStoreConfig::new(self.home_dir.clone()).with_profile(self.profile.clone()),
        )
    }

    pub fn result_poller(&self) -> ResultPoller {
        ResultPoller::new(self.grade_poll_interval, self.grade_timeout)
    }

    /// Telemetry sink, when a collector URL is configured.
    pub fn telemetry_sink(&self) -> Option<HttpTelemetrySink> {
        self.telemetry_url
            .as_deref()
            .map(|url| HttpTelemetrySink::new(url, self.telemetry_key.clone()))
    }
}

fn non_blank(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}
