use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_FILENAME: &str = "archivo_emg.csv";
pub const DEFAULT_SCRATCH_DIR: &str = "csv_temp";
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DRIVE_FOLDER_ID must be set")]
    MissingFolderId,

    #[error("either GOOGLE_CREDENTIALS_JSON or GOOGLE_APPLICATION_CREDENTIALS must be set")]
    MissingCredentials,

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Where the service-account key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Path to a key file on disk
    File(PathBuf),
    /// Key JSON supplied directly by the environment
    Inline(String),
}

// Inline key material must never reach the logs.
impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::File(path) => f.debug_tuple("File").field(path).finish(),
            CredentialSource::Inline(_) => f.write_str("Inline(<redacted>)"),
        }
    }
}

impl CredentialSource {
    pub fn describe(&self) -> String {
        match self {
            CredentialSource::File(path) => format!("file {}", path.display()),
            CredentialSource::Inline(_) => "inline JSON".to_string(),
        }
    }
}

/// Runtime configuration for the relay
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address (default: 0.0.0.0)
    pub host: String,

    /// Listen port (default: 5000)
    pub port: u16,

    /// Drive folder that receives every upload
    pub drive_folder_id: String,

    /// Service-account key source
    pub credentials: CredentialSource,

    /// Pre-issued access token, bypasses the service-account exchange
    pub access_token: Option<String>,

    /// Local staging directory (default: csv_temp)
    pub scratch_dir: PathBuf,

    /// Name used when the caller sends no `nombre-archivo` header
    pub default_filename: String,

    /// Maximum request body in bytes (default: 50 MB)
    pub max_upload_size: usize,

    /// Timeout applied to each Drive API call (default: 30s)
    pub drive_timeout: Duration,

    /// Hold a per-filename lock across find/delete/create (default: true)
    pub serialize_uploads: bool,

    /// Drive API base URL
    pub drive_api_base: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let drive_folder_id = var("DRIVE_FOLDER_ID").ok_or(ConfigError::MissingFolderId)?;

        let credentials = match (
            var("GOOGLE_CREDENTIALS_JSON"),
            var("GOOGLE_APPLICATION_CREDENTIALS"),
        ) {
            (Some(json), _) => CredentialSource::Inline(json),
            (None, Some(path)) => CredentialSource::File(PathBuf::from(path)),
            (None, None) => return Err(ConfigError::MissingCredentials),
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(var("PORT"), "PORT", 5000)?,
            drive_folder_id,
            credentials,
            access_token: var("GOOGLE_ACCESS_TOKEN"),
            scratch_dir: var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRATCH_DIR)),
            default_filename: var("DEFAULT_FILENAME")
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            max_upload_size: parse_or(var("MAX_UPLOAD_SIZE"), "MAX_UPLOAD_SIZE", 50 * 1024 * 1024)?,
            drive_timeout: Duration::from_secs(parse_or(
                var("DRIVE_TIMEOUT_SECS"),
                "DRIVE_TIMEOUT_SECS",
                30,
            )?),
            serialize_uploads: var("SERIALIZE_UPLOADS")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
            drive_api_base: var("DRIVE_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_DRIVE_API_BASE.to_string()),
        })
    }

    /// Config for tests and local runs: a fixed folder and a static token.
    pub fn development(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            drive_folder_id: "test-folder".to_string(),
            credentials: CredentialSource::Inline("{}".to_string()),
            access_token: Some("dev-token".to_string()),
            scratch_dir: scratch_dir.into(),
            default_filename: DEFAULT_FILENAME.to_string(),
            max_upload_size: 50 * 1024 * 1024,
            drive_timeout: Duration::from_secs(5),
            serialize_uploads: true,
            drive_api_base: DEFAULT_DRIVE_API_BASE.to_string(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DRIVE_FOLDER_ID", "folder-1"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/etc/key.json"),
        ]))
        .unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.default_filename, "archivo_emg.csv");
        assert_eq!(config.scratch_dir, PathBuf::from("csv_temp"));
        assert_eq!(config.drive_timeout, Duration::from_secs(30));
        assert!(config.serialize_uploads);
        assert_eq!(
            config.credentials,
            CredentialSource::File(PathBuf::from("/etc/key.json"))
        );
    }

    #[test]
    fn test_port_override() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DRIVE_FOLDER_ID", "folder-1"),
            ("GOOGLE_CREDENTIALS_JSON", "{}"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DRIVE_FOLDER_ID", "folder-1"),
            ("GOOGLE_CREDENTIALS_JSON", "{}"),
            ("PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                name: "PORT",
                value: "not-a-port".to_string()
            }
        );
    }

    #[test]
    fn test_inline_credentials_win() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DRIVE_FOLDER_ID", "folder-1"),
            ("GOOGLE_CREDENTIALS_JSON", "{\"type\":\"service_account\"}"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/etc/key.json"),
        ]))
        .unwrap();
        assert!(matches!(config.credentials, CredentialSource::Inline(_)));
        assert_eq!(format!("{:?}", config.credentials), "Inline(<redacted>)");
    }

    #[test]
    fn test_missing_required_values() {
        let err = AppConfig::from_lookup(lookup(&[("GOOGLE_CREDENTIALS_JSON", "{}")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingFolderId);

        let err = AppConfig::from_lookup(lookup(&[("DRIVE_FOLDER_ID", "folder-1")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredentials);
    }

    #[test]
    fn test_serialize_uploads_can_be_disabled() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DRIVE_FOLDER_ID", "folder-1"),
            ("GOOGLE_CREDENTIALS_JSON", "{}"),
            ("SERIALIZE_UPLOADS", "false"),
            ("DRIVE_API_BASE", "http://localhost:9000/"),
        ]))
        .unwrap();
        assert!(!config.serialize_uploads);
        assert_eq!(config.drive_api_base, "http://localhost:9000");
    }
}
