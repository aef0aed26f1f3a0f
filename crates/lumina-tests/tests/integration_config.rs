// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! - `test_load_*`: Files in every supported format
//! - `test_validation_*`: Rejected configurations
//! - `test_context_*`: Loaded configuration driving an access context

use std::fs;
use std::time::Duration;

use lumina_config::{
    load_config, load_config_str, ConfigError, ConfigFormat, ConfigLoader, LogFormat, LogLevel,
};
use lumina_core::{
    AccessContext, ContextError, RouteRequirement, RouteTable, Role, SUBSCRIPTION_PATH,
};
use lumina_tests::prelude::*;

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_full_yaml_file() {
    let dir = temp_test_dir("lumina-config");
    let path = dir.path().join("lumina.yaml");
    fs::write(&path, ConfigFixtures::full_yaml()).unwrap();

    let config = ConfigLoader::new()
        .with_env_prefix("LUMINA_IT_FULL")
        .load(&path)
        .unwrap();
    assert_eq!(config.api.base_url, "https://api.lumina.example/api");
    assert_eq!(config.api.timeout, Duration::from_secs(15));
    assert_eq!(config.api.user_agent, "lumina-tests");
    assert_eq!(config.entitlement.fetch_timeout, Some(Duration::from_secs(3)));
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Json);

    let routes = config.route_table();
    assert_eq!(routes.len(), 3);
    assert_eq!(
        routes.requirements_for("/studio/uploads"),
        &[RouteRequirement::AuthenticatedOnly, RouteRequirement::paid_tier()]
    );
    assert_eq!(
        routes.requirements_for("/admin/users"),
        &[
            RouteRequirement::AuthenticatedOnly,
            RouteRequirement::RoleAtLeast { role: Role::Admin }
        ]
    );
    assert!(routes.requirements_for("/gallery").is_empty());
}

#[test]
fn test_load_minimal_yaml_uses_defaults() {
    let config = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str(ConfigFixtures::minimal_yaml(), ConfigFormat::Yaml)
        .unwrap();

    assert_eq!(config.entitlement.fetch_timeout, None);
    assert_eq!(config.logging.level, LogLevel::Info);
    assert!(config.routes.is_none());
    assert_eq!(config.route_table(), RouteTable::standard());
}

#[test]
fn test_load_toml_and_json_files() {
    let dir = temp_test_dir("lumina-config");

    let toml_path = dir.path().join("lumina.toml");
    fs::write(&toml_path, ConfigFixtures::toml()).unwrap();
    let config = load_config(&toml_path).unwrap();
    assert_eq!(config.api.timeout, Duration::from_secs(5));
    assert_eq!(config.entitlement.fetch_timeout, Some(Duration::from_secs(2)));
    assert_eq!(config.logging.format, LogFormat::Compact);

    let json_path = dir.path().join("lumina.json");
    fs::write(&json_path, ConfigFixtures::json()).unwrap();
    let config = load_config(&json_path).unwrap();
    assert_eq!(config.api.base_url, "http://localhost:5000/api");
    assert_eq!(config.logging.level, LogLevel::Error);
}

#[test]
fn test_load_unknown_extension_rejected() {
    let dir = temp_test_dir("lumina-config");
    let path = dir.path().join("lumina.ini");
    fs::write(&path, "[api]").unwrap();

    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
}

#[test]
fn test_load_env_placeholder_in_file() {
    std::env::set_var("LUMINA_IT_BACKEND_HOST", "backend.internal");
    let yaml = r#"
api:
  base_url: "https://${LUMINA_IT_BACKEND_HOST}/api"
  timeout: ${LUMINA_IT_UNSET_TIMEOUT:7s}
"#;
    let config = ConfigLoader::new()
        .with_env_prefix("LUMINA_IT_PLACEHOLDER")
        .load_from_str(yaml, ConfigFormat::Yaml)
        .unwrap();
    assert_eq!(config.api.base_url, "https://backend.internal/api");
    assert_eq!(config.api.timeout, Duration::from_secs(7));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validation_rejects_route_without_requirements() {
    let err = load_config_str(ConfigFixtures::empty_route_json(), ConfigFormat::Json).unwrap_err();
    match err {
        ConfigError::Validation { field, .. } => assert_eq!(field, "routes"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn test_validation_rejects_non_http_base_url() {
    let err = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str(r#"{ "api": { "base_url": "ftp://files" } }"#, ConfigFormat::Json)
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.error_type(), "validation");
}

#[test]
fn test_validation_rejects_zero_fetch_timeout() {
    let err = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str(r#"{ "entitlement": { "fetch_timeout": "0s" } }"#, ConfigFormat::Json)
        .unwrap_err();
    assert!(err.is_validation());
}

// =============================================================================
// Config-Driven Context
// =============================================================================

#[tokio::test]
async fn test_context_uses_configured_routes() {
    let config = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str(ConfigFixtures::full_yaml(), ConfigFormat::Yaml)
        .unwrap();

    let provider = MockIdentityProvider::new().signed_in_as("e@x.com");
    let env = AccessFixture::build(provider, config.route_table(), config.entitlement_config());
    env.api.insert("e@x.com", Fixtures::explorer());

    let mut guard = env.context.guard("/studio/uploads");
    assert_redirect(&guard.resolve().await, SUBSCRIPTION_PATH, Some("/studio/uploads"));

    // Standard paths are public under this table.
    let mut guard = env.context.guard("/dashboard/user-gallery/add-image");
    assert_allowed(&guard.resolve().await);
    assert_eq!(
        env.context.entitlements().config().fetch_timeout,
        Some(Duration::from_secs(3))
    );
}

#[test]
fn test_context_builder_reports_missing_inputs() {
    let err = AccessContext::builder().build().unwrap_err();
    assert_eq!(err, ContextError::MissingIdentityProvider);
}
