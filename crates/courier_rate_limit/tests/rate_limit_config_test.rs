//! Tests for the configuration system.

use courier_rate_limit::{CourierConfig, DispatchConfig, MethodTierConfig, Tier, TierConfig};
use std::collections::HashMap;
use std::io::Write;

#[test]
fn test_load_bundled_defaults() {
    let config = CourierConfig::load().unwrap();

    assert!(config.platforms.contains_key("graph"));
    assert!(config.platforms.contains_key("telegram"));

    let graph = &config.platforms["graph"];
    assert!(graph.tiers.contains_key("standard"));
    assert!(graph.api_base.is_some());
}

#[test]
fn test_get_tier_with_default() {
    let config = CourierConfig::load().unwrap();
    let tier = config.get_tier("telegram", None).unwrap();
    assert_eq!(tier.name(), "Private chats");
    assert_eq!(tier.rps(), Some(30));
}

#[test]
fn test_get_tier_unknown() {
    let config = CourierConfig::load().unwrap();
    assert!(config.get_tier("whatsapp", None).is_none());
    assert!(config.get_tier("graph", Some("enterprise")).is_none());
}

#[test]
fn test_tier_config_implements_tier_trait() {
    let tier = TierConfig {
        name: "Test Tier".to_string(),
        rps: Some(5),
        rpm: Some(100),
        rpd: Some(1000),
        max_concurrent: Some(2),
        methods: HashMap::new(),
    };

    assert_eq!(tier.rps(), Some(5));
    assert_eq!(tier.rpm(), Some(100));
    assert_eq!(tier.rpd(), Some(1000));
    assert_eq!(tier.max_concurrent(), Some(2));
    assert_eq!(tier.name(), "Test Tier");
}

#[test]
fn test_method_overrides() {
    let mut methods = HashMap::new();
    methods.insert(
        "sendPhoto".to_string(),
        MethodTierConfig {
            rpm: Some(10),
            ..Default::default()
        },
    );
    let tier = TierConfig {
        name: "Group".to_string(),
        rps: Some(1),
        rpm: Some(20),
        rpd: None,
        max_concurrent: Some(1),
        methods,
    };

    let photo = tier.for_method("sendPhoto");
    assert_eq!(photo.rpm, Some(10));
    assert_eq!(photo.rps, Some(1));
    assert!(photo.methods.is_empty());

    // Keys may come back lowercased from the config loader
    assert_eq!(tier.for_method("sendphoto").rpm, Some(10));
    assert_eq!(tier.for_method("sendMessage"), tier);
}

#[test]
fn test_from_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[dispatch]
max_batch_size = 10

[platforms.custom]
default_tier = "basic"
api_base = "https://chat.example.com/api/"

[platforms.custom.tiers.basic]
name = "Basic"
rpm = 30
"#
    )
    .unwrap();

    let config = CourierConfig::from_file(file.path()).unwrap();
    assert_eq!(config.dispatch.max_batch_size, 10);
    assert_eq!(config.dispatch.retry_attempts, DispatchConfig::default().retry_attempts);
    assert_eq!(config.api_base("custom"), Some("https://chat.example.com/api/"));
    assert_eq!(config.get_tier("custom", None).unwrap().rpm, Some(30));
}

#[test]
fn test_from_toml_str_rejects_invalid() {
    assert!(CourierConfig::from_toml_str("[platforms.x]\ntiers = 3").is_err());
}

#[test]
fn test_from_file_missing() {
    assert!(CourierConfig::from_file("/nonexistent/courier.toml").is_err());
}
