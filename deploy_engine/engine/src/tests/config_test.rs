use std::collections::HashMap;
use std::time::Duration;

use crate::config::{DeployConfig, Endpoint};
use crate::derivation::Network;
use crate::error::ErrorKind;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn defaults_are_valid() {
    let config = DeployConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.network, Network::Testnet);
    assert_eq!(config.endpoint, Endpoint::default());
    assert_eq!(config.timeout(), Duration::from_secs(10));
    assert_eq!(config.poll_interval(), Duration::from_millis(500));
}

#[test]
fn environment_overrides_defaults() {
    let config = DeployConfig::from_lookup(lookup(&[
        ("DEPLOY_NETWORK", "mainnet"),
        ("DEPLOY_HOST", "node.example.net"),
        ("DEPLOY_PORT", "443"),
        ("DEPLOY_TLS", "true"),
        ("DEPLOY_TIMEOUT_SECS", "120"),
        ("DEPLOY_POLL_INTERVAL_MS", "2000"),
        ("DEPLOY_CREDENTIAL_COUNTER", "3"),
    ]))
    .unwrap();

    assert_eq!(config.network, Network::Mainnet);
    assert_eq!(
        config.endpoint,
        Endpoint {
            host: "node.example.net".into(),
            port: 443,
            tls: true,
        }
    );
    assert_eq!(config.timeout_secs, 120);
    assert_eq!(config.poll_interval_ms, 2000);
    assert_eq!(config.identity.credential_counter, 3);
    assert_eq!(config.identity.provider, 0);
}

#[test]
fn unparseable_variable_is_rejected() {
    let err = DeployConfig::from_lookup(lookup(&[("DEPLOY_PORT", "seventy")])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    assert!(err.diagnostic().contains("DEPLOY_PORT"));

    let err = DeployConfig::from_lookup(lookup(&[("DEPLOY_NETWORK", "devnet")])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
}

#[test]
fn zero_timeout_fails_validation() {
    let err = DeployConfig::from_lookup(lookup(&[("DEPLOY_TIMEOUT_SECS", "0")])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
}

#[test]
fn zero_connect_timeout_fails_validation() {
    let config = DeployConfig {
        connect_timeout_secs: 0,
        ..DeployConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    assert!(err.to_string().contains("connect_timeout_secs"), "{err}");
}

#[test]
fn timeout_past_the_calendar_fails_validation() {
    for secs in [u64::MAX, 10_000_000_000_000] {
        let config = DeployConfig {
            timeout_secs: secs,
            ..DeployConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaViolation, "timeout_secs = {secs}");
    }
}

#[test]
fn partial_json_takes_defaults() {
    let config: DeployConfig = serde_json::from_str(
        r#"{ "network": "mainnet", "endpoint": { "host": "10.0.0.5", "port": 20001 }, "identity": { "identity_index": 2 } }"#,
    )
    .unwrap();

    assert_eq!(config.network, Network::Mainnet);
    assert!(!config.endpoint.tls);
    assert_eq!(config.identity.identity_index, 2);
    assert_eq!(config.timeout_secs, 10);
}

#[test]
fn loads_from_json_file() {
    let path = std::env::temp_dir().join(format!("deploy-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "timeout_secs": 30, "endpoint": { "host": "", "port": 1 } }"#).unwrap();
    let err = DeployConfig::from_json_file(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);

    std::fs::write(&path, r#"{ "timeout_secs": 30 }"#).unwrap();
    let config = DeployConfig::from_json_file(&path).unwrap();
    assert_eq!(config.timeout_secs, 30);

    std::fs::remove_file(&path).unwrap();
    assert!(DeployConfig::from_json_file(&path).is_err());
}
