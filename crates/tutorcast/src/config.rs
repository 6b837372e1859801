//! Configuration loading and management

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tutorcast_core::{DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_MB, UploadLimits};
use tutorcast_storage::{DEFAULT_REMOTE_TIMEOUT, LocalConfig, RemoteConfig, StorageConfig, StorageMode};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    /// local, s3 (or remote), or auto
    #[serde(default = "default_storage_type")]
    pub storage_type: String,
    #[serde(default)]
    pub local: LocalStorageConfig,
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            storage_type: default_storage_type(),
            local: LocalStorageConfig::default(),
            s3: S3StorageConfig::default(),
        }
    }
}

/// Local storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    #[serde(default = "default_recordings_path")]
    pub recordings_path: String,
    #[serde(default = "default_layouts_path")]
    pub layouts_path: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            recordings_path: default_recordings_path(),
            layouts_path: default_layouts_path(),
        }
    }
}

/// S3 storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct S3StorageConfig {
    /// Bucket for section recordings
    pub bucket: Option<String>,
    /// Bucket for learner layouts
    pub learner_bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub prefix: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
    /// Bound on each remote call, in seconds
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_auth_enabled")]
    pub enabled: bool,
    #[serde(default = "default_token_expiry_hours")]
    pub token_expiry_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            enabled: default_auth_enabled(),
            token_expiry_hours: default_token_expiry_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_mb: default_max_size_mb(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5002
}

fn default_storage_type() -> String {
    "auto".to_string()
}

fn default_recordings_path() -> String {
    "storage/recordings".to_string()
}

fn default_layouts_path() -> String {
    "storage/layouts".to_string()
}

fn default_jwt_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_auth_enabled() -> bool {
    true
}

fn default_token_expiry_hours() -> i64 {
    24
}

fn default_max_size_mb() -> u64 {
    DEFAULT_MAX_UPLOAD_MB
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn default_reports_dir() -> String {
    "storage/migration-reports".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Environment overrides, named after the variables the deployment already sets
#[derive(Args, Debug, Clone, Default)]
pub struct EnvOverrides {
    /// Storage mode: local, s3, remote or auto
    #[arg(long, env = "STORAGE_TYPE", global = true)]
    pub storage_type: Option<String>,

    #[arg(long, env = "LOCAL_STORAGE_RECORDINGS_PATH", global = true)]
    pub recordings_path: Option<String>,

    #[arg(long, env = "LOCAL_STORAGE_LAYOUTS_PATH", global = true)]
    pub layouts_path: Option<String>,

    #[arg(long, env = "S3_BUCKET_NAME", global = true)]
    pub s3_bucket: Option<String>,

    #[arg(long, env = "S3_LEARNER_BUCKET_NAME", global = true)]
    pub s3_learner_bucket: Option<String>,

    #[arg(long, env = "ACCESS_KEY_ID", hide_env_values = true, global = true)]
    pub access_key_id: Option<String>,

    #[arg(long, env = "SECRET_ACCESS_KEY", hide_env_values = true, global = true)]
    pub secret_access_key: Option<String>,

    #[arg(long, env = "AWS_REGION", global = true)]
    pub aws_region: Option<String>,

    #[arg(long, env = "S3_ENDPOINT", global = true)]
    pub s3_endpoint: Option<String>,

    #[arg(long, env = "APP_SECRET_KEY", hide_env_values = true, global = true)]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "MAX_UPLOAD_SIZE_MB", global = true)]
    pub max_upload_size_mb: Option<u64>,

    /// Comma-separated list, e.g. wav,json,txt
    #[arg(long, env = "ALLOWED_FILE_EXTENSIONS", global = true)]
    pub allowed_extensions: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        // Check if config file exists
        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Apply environment and command-line overrides on top of the file
    pub fn apply_overrides(&mut self, overrides: &EnvOverrides) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }
        fn set_some<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *target = value.clone();
            }
        }

        set(&mut self.storage.storage_type, &overrides.storage_type);
        set(&mut self.storage.local.recordings_path, &overrides.recordings_path);
        set(&mut self.storage.local.layouts_path, &overrides.layouts_path);
        set_some(&mut self.storage.s3.bucket, &overrides.s3_bucket);
        set_some(&mut self.storage.s3.learner_bucket, &overrides.s3_learner_bucket);
        set_some(&mut self.storage.s3.access_key, &overrides.access_key_id);
        set_some(&mut self.storage.s3.secret_key, &overrides.secret_access_key);
        set_some(&mut self.storage.s3.region, &overrides.aws_region);
        set_some(&mut self.storage.s3.endpoint, &overrides.s3_endpoint);
        set(&mut self.auth.jwt_secret, &overrides.jwt_secret);
        set(&mut self.upload.max_size_mb, &overrides.max_upload_size_mb);

        if let Some(list) = &overrides.allowed_extensions {
            self.upload.allowed_extensions = UploadLimits::parse_extensions(list);
        }
    }

    /// Resolve the storage section into the config every backend is built from
    pub fn storage_config(&self) -> Result<StorageConfig> {
        let mode: StorageMode = self
            .storage
            .storage_type
            .parse()
            .with_context(|| "Invalid [storage] storage_type")?;
        let s3 = &self.storage.s3;

        Ok(StorageConfig {
            mode,
            local: LocalConfig {
                recordings_path: PathBuf::from(&self.storage.local.recordings_path),
                layouts_path: PathBuf::from(&self.storage.local.layouts_path),
            },
            remote: RemoteConfig {
                recordings_bucket: s3.bucket.clone(),
                layouts_bucket: s3.learner_bucket.clone(),
                region: s3.region.clone().unwrap_or_else(|| "us-east-1".to_string()),
                endpoint: s3.endpoint.clone(),
                access_key_id: s3.access_key.clone(),
                secret_access_key: s3.secret_key.clone(),
                prefix: s3.prefix.clone(),
                allow_http: s3.allow_http,
                timeout: s3
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_REMOTE_TIMEOUT),
            },
        })
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits::new(self.upload.max_size_mb, self.upload.allowed_extensions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/tutorcast.toml").unwrap();
        assert_eq!(config.server.port, 5002);
        assert_eq!(config.storage.storage_type, "auto");
        assert_eq!(config.storage.local.recordings_path, "storage/recordings");
        assert!(config.auth.enabled);
        assert_eq!(config.upload.max_size_mb, 100);
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8080

[storage]
storage_type = "s3"

[storage.s3]
bucket = "tutorial-recordings"
learner_bucket = "learner-layouts"
region = "eu-west-1"
timeout_secs = 5

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.logging.format, "json");

        let storage = config.storage_config().unwrap();
        assert_eq!(storage.mode, StorageMode::Remote);
        assert_eq!(storage.remote.recordings_bucket.as_deref(), Some("tutorial-recordings"));
        assert_eq!(storage.remote.layouts_bucket.as_deref(), Some("learner-layouts"));
        assert_eq!(storage.remote.region, "eu-west-1");
        assert_eq!(storage.remote.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config.apply_overrides(&EnvOverrides {
            storage_type: Some("local".to_string()),
            recordings_path: Some("/srv/recordings".to_string()),
            s3_bucket: Some("bucket-a".to_string()),
            jwt_secret: Some("s3cret".to_string()),
            max_upload_size_mb: Some(10),
            allowed_extensions: Some("wav, json".to_string()),
            ..Default::default()
        });

        assert_eq!(config.storage.storage_type, "local");
        assert_eq!(config.storage.local.recordings_path, "/srv/recordings");
        assert_eq!(config.storage.local.layouts_path, "storage/layouts");
        assert_eq!(config.storage.s3.bucket.as_deref(), Some("bucket-a"));
        assert_eq!(config.auth.jwt_secret, "s3cret");

        let limits = config.upload_limits();
        assert_eq!(limits.max_bytes, 10 * 1024 * 1024);
        assert_eq!(limits.allowed_extensions, vec!["wav", "json"]);
    }

    #[test]
    fn test_invalid_storage_type() {
        let mut config = Config::default();
        config.storage.storage_type = "ftp".to_string();
        assert!(config.storage_config().is_err());
    }
}
