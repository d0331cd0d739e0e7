//! Configuration loader
//!
//! Loads SDK configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `MOBILEREST_CLIENT_ID` is not set, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `MOBILEREST_CLIENT_ID`: OAuth client id (required)
//! - `MOBILEREST_CLIENT_SECRET`: OAuth client secret
//! - `MOBILEREST_LOGIN_HOST`: Login host used when credentials name none
//! - `MOBILEREST_API_VERSION`: REST API version, e.g. `v42.0`
//! - `MOBILEREST_ENDPOINT_PREFIX`: Endpoint prefix, e.g. `/services/data`
//! - `MOBILEREST_TIMEOUT_SECS`: Request timeout in seconds
//! - `MOBILEREST_USER_AGENT_QUALIFIER`: Suffix of the User-Agent marker
//! - `MOBILEREST_LOG_LEVEL`: Tracing filter directive
//! - `MOBILEREST_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./mobilerest.json` or `./mobilerest.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use mobilerest_domain::{ClientConfig, Result, SdkError};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the client id is
/// missing there, falls back to loading from a config file.
///
/// # Errors
/// Returns `SdkError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<ClientConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `MOBILEREST_CLIENT_ID` is required; every other field keeps its
/// default when its variable is unset.
///
/// # Errors
/// Returns `SdkError::Config` if the client id is missing or a variable has
/// an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::default();

    config.oauth.client_id = env_var("MOBILEREST_CLIENT_ID")?;
    config.oauth.client_secret = optional_env_var("MOBILEREST_CLIENT_SECRET");
    if let Some(login_host) = optional_env_var("MOBILEREST_LOGIN_HOST") {
        config.oauth.login_host = login_host;
    }

    if let Some(version) = optional_env_var("MOBILEREST_API_VERSION") {
        config.dispatch.api_version = version;
    }
    if let Ok(prefix) = std::env::var("MOBILEREST_ENDPOINT_PREFIX") {
        config.dispatch.endpoint_prefix = prefix;
    }

    if let Some(timeout) = optional_env_var("MOBILEREST_TIMEOUT_SECS") {
        config.transport.timeout_seconds = timeout
            .parse::<u64>()
            .map_err(|e| SdkError::Config(format!("Invalid request timeout: {}", e)))?;
    }
    config.transport.user_agent_qualifier = optional_env_var("MOBILEREST_USER_AGENT_QUALIFIER");

    if let Some(level) = optional_env_var("MOBILEREST_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("MOBILEREST_LOG_JSON", false);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `SdkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SdkError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SdkError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SdkError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `SdkError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SdkError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SdkError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(SdkError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches for config files in the following locations (in order):
/// 1. Current working directory (`./config.{json,toml}`,
///    `./mobilerest.{json,toml}`)
/// 2. Parent directories (up to 2 levels)
/// 3. Relative to executable location
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("mobilerest.json"),
        dir.join("mobilerest.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `SdkError::Config` if the variable is not set or empty.
fn env_var(key: &str) -> Result<String> {
    optional_env_var(key)
        .ok_or_else(|| SdkError::Config(format!("Missing required environment variable: {}", key)))
}

/// Non-empty value of an environment variable
fn optional_env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 9] = [
        "MOBILEREST_CLIENT_ID",
        "MOBILEREST_CLIENT_SECRET",
        "MOBILEREST_LOGIN_HOST",
        "MOBILEREST_API_VERSION",
        "MOBILEREST_ENDPOINT_PREFIX",
        "MOBILEREST_TIMEOUT_SECS",
        "MOBILEREST_USER_AGENT_QUALIFIER",
        "MOBILEREST_LOG_LEVEL",
        "MOBILEREST_LOG_JSON",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn write_temp(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("MOBILEREST_TEST_BOOL_ON", "on");
        std::env::set_var("MOBILEREST_TEST_BOOL_UPPER", "TRUE");
        std::env::set_var("MOBILEREST_TEST_BOOL_OFF", "0");

        assert!(env_bool("MOBILEREST_TEST_BOOL_ON", false));
        assert!(env_bool("MOBILEREST_TEST_BOOL_UPPER", false));
        assert!(!env_bool("MOBILEREST_TEST_BOOL_OFF", true));

        std::env::remove_var("MOBILEREST_TEST_BOOL_MISSING");
        assert!(env_bool("MOBILEREST_TEST_BOOL_MISSING", true));

        std::env::remove_var("MOBILEREST_TEST_BOOL_ON");
        std::env::remove_var("MOBILEREST_TEST_BOOL_UPPER");
        std::env::remove_var("MOBILEREST_TEST_BOOL_OFF");
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("MOBILEREST_CLIENT_ID", "3MVG9-mobile");
        std::env::set_var("MOBILEREST_CLIENT_SECRET", "s3cret");
        std::env::set_var("MOBILEREST_LOGIN_HOST", "https://test.salesforce.com");
        std::env::set_var("MOBILEREST_API_VERSION", "v58.0");
        std::env::set_var("MOBILEREST_ENDPOINT_PREFIX", "/services/apexrest");
        std::env::set_var("MOBILEREST_TIMEOUT_SECS", "10");
        std::env::set_var("MOBILEREST_USER_AGENT_QUALIFIER", "SmartSync");
        std::env::set_var("MOBILEREST_LOG_LEVEL", "mobilerest_core=debug");
        std::env::set_var("MOBILEREST_LOG_JSON", "yes");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.oauth.client_id, "3MVG9-mobile");
        assert_eq!(config.oauth.client_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.oauth.login_host, "https://test.salesforce.com");
        assert_eq!(config.dispatch.api_version, "v58.0");
        assert_eq!(config.dispatch.endpoint_prefix, "/services/apexrest");
        assert_eq!(config.transport.timeout_seconds, 10);
        assert_eq!(config.transport.user_agent_qualifier.as_deref(), Some("SmartSync"));
        assert_eq!(config.logging.level, "mobilerest_core=debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_from_env_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("MOBILEREST_CLIENT_ID", "3MVG9-mobile");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.dispatch.api_version, "v42.0");
        assert_eq!(config.dispatch.endpoint_prefix, "/services/data");
        assert_eq!(config.transport.timeout_seconds, 30);
        assert!(config.oauth.client_secret.is_none());
        assert!(!config.logging.json);
    }

    #[test]
    fn test_empty_endpoint_prefix_disables_prefixing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("MOBILEREST_CLIENT_ID", "3MVG9-mobile");
        std::env::set_var("MOBILEREST_ENDPOINT_PREFIX", "");

        let result = load_from_env();
        clear_env();

        assert_eq!(result.unwrap().dispatch.endpoint_prefix, "");
    }

    #[test]
    fn test_load_from_env_missing_client_id() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let result = load_from_env();

        assert!(matches!(result, Err(SdkError::Config(_))), "Should be a Config error");
    }

    #[test]
    fn test_load_from_env_invalid_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("MOBILEREST_CLIENT_ID", "3MVG9-mobile");

        std::env::set_var("MOBILEREST_TIMEOUT_SECS", "soon");
        assert!(matches!(load_from_env(), Err(SdkError::Config(_))));

        std::env::set_var("MOBILEREST_TIMEOUT_SECS", "0");
        assert!(matches!(load_from_env(), Err(SdkError::Config(_))));

        std::env::remove_var("MOBILEREST_TIMEOUT_SECS");
        std::env::set_var("MOBILEREST_API_VERSION", "v42.0/");
        assert!(matches!(load_from_env(), Err(SdkError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let path = write_temp(
            r#"{
                "dispatch": { "api_version": "v58.0" },
                "transport": { "timeout_seconds": 15 },
                "oauth": { "client_id": "3MVG9-mobile" }
            }"#,
            "json",
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();

        let config = result.unwrap();
        assert_eq!(config.dispatch.api_version, "v58.0");
        assert_eq!(config.dispatch.endpoint_prefix, "/services/data");
        assert_eq!(config.transport.timeout_seconds, 15);
        assert_eq!(config.oauth.client_id, "3MVG9-mobile");
    }

    #[test]
    fn test_load_from_file_toml() {
        let path = write_temp(
            r#"
[dispatch]
endpoint_prefix = "/services/apexrest"

[oauth]
client_id = "3MVG9-mobile"
client_secret = "s3cret"

[logging]
level = "debug"
json = true
"#,
            "toml",
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();

        let config = result.unwrap();
        assert_eq!(config.dispatch.endpoint_prefix, "/services/apexrest");
        assert_eq!(config.oauth.client_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let path = write_temp(r#"{ "dispatch": { "endpoint_prefix": "services/data" } }"#, "json");

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();

        assert!(matches!(result, Err(SdkError::Config(_))));
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(SdkError::Config(_))), "Should be a Config error");
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let path = write_temp(r#"{ "this is": "not valid json" "#, "json");

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();

        assert!(result.is_err(), "Should fail with invalid JSON");
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", &PathBuf::from("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }
}
