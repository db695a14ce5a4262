use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::ConfigError;

use super::schema::Config;

const SUPPORTED_VERSION: &str = "1.0";

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let config = load_config_from_str(&content)?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Parses and validates configuration from a JSON string.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.version != SUPPORTED_VERSION {
        return Err(validation(format!(
            "unsupported config version '{}', expected '{}'",
            config.version, SUPPORTED_VERSION
        )));
    }
    validate_endpoint("uploader.endpoint", &config.uploader.endpoint)?;
    validate_endpoint("notifier.endpoint", &config.notifier.endpoint)?;
    validate_address("notifier.recipient", &config.notifier.recipient)?;
    validate_address("notifier.sender", &config.notifier.sender)?;
    if config.request_timeout_secs == 0 {
        return Err(validation(
            "request_timeout_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validation(message: String) -> ConfigError {
    ConfigError::Validation { message }
}

fn validate_endpoint(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(validation(format!(
            "{field} must be an http(s) URL, got '{value}'"
        )))
    }
}

fn validate_address(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.contains('@') {
        Ok(())
    } else {
        Err(validation(format!(
            "{field} must be an email address, got '{value}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_json() -> String {
        r#"{
            "version": "1.0",
            "database_path": "/tmp/eoi-test.db",
            "uploader": {
                "endpoint": "https://storage.example.com/v1/objects",
                "token": {"value": "upload-token"}
            },
            "notifier": {
                "endpoint": "https://mail.example.com/v1/send",
                "token": {"value": "mail-token"},
                "recipient": "ops@example.com",
                "sender": "noreply@example.com"
            },
            "request_timeout_secs": 15
        }"#
        .to_string()
    }

    #[test]
    fn test_load_valid_config() {
        let config = load_config_from_str(&sample_json()).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(
            config.database_path.as_deref(),
            Some(Path::new("/tmp/eoi-test.db"))
        );
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.notifier.recipient, "ops@example.com");
    }

    #[test]
    fn test_timeout_defaults_when_omitted() {
        let mut value: serde_json::Value = serde_json::from_str(&sample_json()).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .remove("request_timeout_secs")
            .unwrap();
        let config = load_config_from_str(&value.to_string()).unwrap();
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let json = sample_json().replace(r#""version": "1.0""#, r#""version": "2.0""#);
        let err = load_config_from_str(&json).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_non_http_endpoint_rejected() {
        let json = sample_json().replace("https://storage.example.com/v1/objects", "ftp://nope");
        let err = load_config_from_str(&json).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_bad_recipient_rejected() {
        let json = sample_json().replace("ops@example.com", "not-an-address");
        let err = load_config_from_str(&json).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let json =
            sample_json().replace(r#""request_timeout_secs": 15"#, r#""request_timeout_secs": 0"#);
        let err = load_config_from_str(&json).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = load_config_from_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    fn test_secret_resolves_from_config_value() {
        use secrecy::ExposeSecret;
        let config = load_config_from_str(&sample_json()).unwrap();
        let token = config.uploader.token.resolve().unwrap();
        assert_eq!(token.expose_secret(), "upload-token");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.uploader.endpoint,
            "https://storage.example.com/v1/objects"
        );
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_config(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
