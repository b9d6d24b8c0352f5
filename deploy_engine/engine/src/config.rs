//! Per-call deployment configuration.
//!
//! There is no process-wide configuration: every pipeline invocation receives
//! its own [`DeployConfig`], so several configurations can coexist.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::derivation::{CredentialPath, Network};
use crate::error::DeployError;
use crate::submission::finality_budget;

/// Node address and transport security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub tls: bool,
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint {
            host: "localhost".to_string(),
            port: 20000,
            tls: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub network: Network,
    pub endpoint: Endpoint,
    /// Finality wait budget, in seconds.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Offset used when the caller asks for a fresh expiry.
    pub expiry_secs: u64,
    pub identity: CredentialPath,
}

impl Default for DeployConfig {
    fn default() -> Self {
        DeployConfig {
            network: Network::Testnet,
            endpoint: Endpoint::default(),
            timeout_secs: 10,
            connect_timeout_secs: 5,
            poll_interval_ms: 500,
            expiry_secs: 360,
            identity: CredentialPath::default(),
        }
    }
}

impl DeployConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), DeployError> {
        if self.endpoint.host.trim().is_empty() {
            return Err(DeployError::SchemaViolation("endpoint.host is empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(DeployError::SchemaViolation("timeout_secs must be positive".into()));
        }
        finality_budget(self.timeout(), Utc::now())?;
        if self.connect_timeout_secs == 0 {
            return Err(DeployError::SchemaViolation(
                "connect_timeout_secs must be positive".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(DeployError::SchemaViolation(
                "poll_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DeployError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DeployError::SchemaViolation(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config: DeployConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from `DEPLOY_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, DeployError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DeployError> {
        let mut config = DeployConfig::default();

        if let Some(v) = lookup("DEPLOY_NETWORK") {
            config.network = v.parse()?;
        }
        if let Some(v) = lookup("DEPLOY_HOST") {
            config.endpoint.host = v;
        }
        if let Some(v) = lookup("DEPLOY_PORT") {
            config.endpoint.port = parse_var("DEPLOY_PORT", &v)?;
        }
        if let Some(v) = lookup("DEPLOY_TLS") {
            config.endpoint.tls = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = lookup("DEPLOY_TIMEOUT_SECS") {
            config.timeout_secs = parse_var("DEPLOY_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("DEPLOY_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout_secs = parse_var("DEPLOY_CONNECT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("DEPLOY_POLL_INTERVAL_MS") {
            config.poll_interval_ms = parse_var("DEPLOY_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("DEPLOY_EXPIRY_SECS") {
            config.expiry_secs = parse_var("DEPLOY_EXPIRY_SECS", &v)?;
        }
        if let Some(v) = lookup("DEPLOY_PROVIDER") {
            config.identity.provider = parse_var("DEPLOY_PROVIDER", &v)?;
        }
        if let Some(v) = lookup("DEPLOY_IDENTITY_INDEX") {
            config.identity.identity_index = parse_var("DEPLOY_IDENTITY_INDEX", &v)?;
        }
        if let Some(v) = lookup("DEPLOY_CREDENTIAL_COUNTER") {
            config.identity.credential_counter = parse_var("DEPLOY_CREDENTIAL_COUNTER", &v)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, DeployError> {
    value
        .trim()
        .parse()
        .map_err(|_| DeployError::SchemaViolation(format!("{name}={value:?} is not a valid value")))
}
