//! Tests for configuration module

use super::*;
use crate::error::{Error, Result};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn create_temp_config_file(content: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .map_err(|e| Error::config(format!("Failed to create temp file: {e}")))?;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::config(format!("Failed to write temp file: {e}")))?;
    file.flush()
        .map_err(|e| Error::config(format!("Failed to flush temp file: {e}")))?;
    Ok(file)
}

fn valid_config() -> Config {
    let toml = r#"
        [server]
        api_endpoint = "http://localhost:8000/"
        token = "secret"

        [nodes.InfraDevice]
    "#;
    Config::from_toml_str(toml).expect("Failed to parse valid TOML")
}

#[test]
fn test_from_toml_str_full() {
    let toml = r#"
        [server]
        api_endpoint = "https://infrahub.example.com"
        token = "secret"
        branch = "staging"
        timeout_secs = 30
        validate_certs = false

        [nodes.InfraDevice]
        include = ["name", "platform"]
        filters = { "site__name__value" = "atl1" }

        [nodes.InfraInterfaceL3]
        exclude = ["description"]

        [compose]
        hostname = "name"
        platform = "platform.ansible_network_os"

        [[keyed_groups]]
        key = "site.name"
        prefix = "site"

        [inventory]
        strict = true

        [cache]
        enabled = true
        timeout_secs = 60
    "#;

    let config = Config::from_toml_str(toml).expect("Failed to parse valid TOML");
    assert_eq!(config.server.branch, "staging");
    assert_eq!(config.server.timeout_secs, 30);
    assert!(!config.server.validate_certs);

    let kinds: Vec<&str> = config.nodes.keys().map(NodeKind::as_str).collect();
    assert_eq!(kinds, vec!["InfraDevice", "InfraInterfaceL3"]);

    let device = &config.nodes["InfraDevice"];
    assert_eq!(
        device.include_override(),
        Some(&["name".to_string(), "platform".to_string()][..])
    );
    assert_eq!(
        device.filters.get("site__name__value"),
        Some(&serde_json::json!("atl1"))
    );
    assert_eq!(
        config.nodes["InfraInterfaceL3"].exclude,
        Some(vec!["description".to_string()])
    );

    assert_eq!(config.compose.len(), 2);
    assert_eq!(config.keyed_groups[0].key.as_deref(), Some("site.name"));
    assert_eq!(config.keyed_groups[0].separator, "_");
    assert!(config.inventory.strict);
    assert!(config.cache.enabled);
    assert_eq!(config.cache.timeout_secs, 60);
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_toml_str_minimal_defaults() {
    let config = Config::from_toml_str("").expect("Failed to parse empty TOML");
    assert_eq!(config.server.branch, "main");
    assert_eq!(config.server.timeout_secs, 10);
    assert!(config.server.validate_certs);
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.timeout_secs, 3600);
    assert!(config.nodes.is_empty());
}

#[test]
fn test_from_toml_str_invalid_syntax() {
    let result = Config::from_toml_str("[server\napi_endpoint = 1");
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Failed to parse TOML"));
}

#[test]
fn test_endpoint_trailing_slash_stripped() {
    let config = valid_config();
    assert_eq!(config.server.endpoint().unwrap(), "http://localhost:8000");
}

#[test]
fn test_validate_requires_nodes() {
    let mut config = valid_config();
    config.nodes.clear();

    let result = config.validate();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("'nodes' must be defined"));
}

#[test]
fn test_validate_requires_endpoint_and_token() {
    let mut config = valid_config();
    config.server.api_endpoint = None;
    let err = config.validate().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("Missing API endpoint"));

    let mut config = valid_config();
    config.server.token = Some(String::new());
    assert!(config
        .validate()
        .unwrap_err()
        .to_string()
        .contains("Missing API token"));
}

#[test]
fn test_validate_numeric_bounds() {
    let mut config = valid_config();
    config.server.timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_debug_redacts_token() {
    let config = valid_config();
    let debug = format!("{:?}", config.server);
    assert!(debug.contains("***REDACTED***"));
    assert!(!debug.contains("secret"));
}

#[test]
fn test_from_file_keeps_kind_case() {
    let file = create_temp_config_file(
        r#"
        [server]
        api_endpoint = "http://localhost:8000"
        token = "secret"

        [nodes.InfraDevice]
        exclude = ["description"]

        [compose]
        hostname = "name"
        "#,
    )
    .expect("Failed to create temp file");

    let config = Config::from_file(file.path()).expect("Failed to load config");
    assert!(config.nodes.contains_key("InfraDevice"));
    assert_eq!(config.compose["hostname"], "name");
    assert_eq!(config.server.branch, "main");
}

#[test]
fn test_from_file_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config =
        Config::from_file(&dir.path().join("absent.toml")).expect("Failed to load config");
    assert!(config.nodes.is_empty());
    assert_eq!(config.server.branch, "main");
}

#[test]
fn test_token_env_var_fallback() {
    let file = create_temp_config_file(
        r#"
        [server]
        api_endpoint = "http://localhost:8000"
        "#,
    )
    .expect("Failed to create temp file");

    std::env::set_var("INFRAHUB_API_TOKEN", "from-env");
    let result = Config::from_file(file.path());
    std::env::remove_var("INFRAHUB_API_TOKEN");

    let config = result.expect("Failed to load config");
    // INFRAHUB_TOKEN takes precedence when both are set
    let expected = std::env::var("INFRAHUB_TOKEN").unwrap_or_else(|_| "from-env".to_string());
    assert_eq!(config.server.token.as_deref(), Some(expected.as_str()));
}

#[test]
fn test_section_env_var_overrides_file() {
    let file = create_temp_config_file(
        r#"
        [server]
        api_endpoint = "http://localhost:8000"
        token = "secret"

        [inventory]
        strict = false

        [cache]
        enabled = false
        "#,
    )
    .expect("Failed to create temp file");

    std::env::set_var("INFRAHUB_INVENTORY__STRICT", "true");
    std::env::set_var("INFRAHUB_CACHE__ENABLED", "true");
    let result = Config::from_file(file.path());
    std::env::remove_var("INFRAHUB_INVENTORY__STRICT");
    std::env::remove_var("INFRAHUB_CACHE__ENABLED");

    let config = result.expect("Failed to load config");
    assert!(config.inventory.strict);
    assert!(config.cache.enabled);
    assert_eq!(config.server.api_endpoint.as_deref(), Some("http://localhost:8000"));
}
