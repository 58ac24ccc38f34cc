use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Placeholder secret written into fresh configs. Startup warns while it is in use.
pub const DEFAULT_SECRET_KEY: &str = "smartanom-insecure-change-me";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,

    pub email: EmailConfig,

    pub sensors: SensorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// HMAC key for activation tokens. Rotating it invalidates outstanding links.
    pub secret_key: String,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    pub min_password_length: usize,

    /// Lifetime of activation links (default: 3 days)
    pub activation_token_ttl_seconds: u64,

    /// Failed-login lockout policy.
    pub lockout: LockoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Consecutive failures that trigger a lockout.
    pub max_attempts: u32,

    /// Lockout duration, counted from the last failure.
    pub lockout_seconds: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_seconds: 24 * 60 * 60,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 8,
            activation_token_ttl_seconds: 3 * 24 * 60 * 60,
            lockout: LockoutConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailBackend {
    /// Log outgoing mail instead of sending it.
    Console,
    Smtp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub backend: EmailBackend,

    pub smtp_host: String,

    pub smtp_port: u16,

    pub smtp_username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_password: Option<String>,

    /// Use STARTTLS on the submission port instead of implicit TLS.
    pub starttls: bool,

    pub from_address: String,

    /// Base of the activation link sent to new users.
    pub frontend_base_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            backend: EmailBackend::Console,
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            starttls: true,
            from_address: "SmarTanom <no-reply@smartanom.local>".to_string(),
            frontend_base_url: "http://10.0.2.2:8081".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorsConfig {
    /// Reject DHT22 samples outside the ranges below.
    pub validate_ranges: bool,

    pub temperature_min: f64,

    pub temperature_max: f64,

    pub humidity_min: f64,

    pub humidity_max: f64,

    /// Decimal places in latest-reading responses. `None` disables rounding.
    pub round_digits: Option<u32>,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            validate_ranges: true,
            temperature_min: -20.0,
            temperature_max: 50.0,
            humidity_min: 0.0,
            humidity_max: 100.0,
            round_digits: Some(2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "smartanom".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Emit logs as JSON lines instead of the human-readable format
    pub json_logs: bool,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/smartanom.db".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Secrets may come from the environment (or `.env`) instead of the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("SMARTANOM_SECRET_KEY")
            && !secret.is_empty()
        {
            self.security.secret_key = secret;
        }

        if let Ok(password) = std::env::var("SMARTANOM_SMTP_PASSWORD")
            && !password.is_empty()
        {
            self.email.smtp_password = Some(password);
        }

        if let Ok(url) = std::env::var("SMARTANOM_DATABASE_URL")
            && !url.is_empty()
        {
            self.general.database_path = url;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("smartanom").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".smartanom").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.secret_key.is_empty() {
            anyhow::bail!("security.secret_key cannot be empty");
        }

        if self.security.secret_key == DEFAULT_SECRET_KEY {
            warn!("security.secret_key is the built-in default; set SMARTANOM_SECRET_KEY");
        }

        if self.security.lockout.max_attempts == 0 {
            anyhow::bail!("security.lockout.max_attempts must be > 0");
        }

        if self.security.min_password_length == 0 {
            anyhow::bail!("security.min_password_length must be > 0");
        }

        if self.email.backend == EmailBackend::Smtp && self.email.smtp_host.is_empty() {
            anyhow::bail!("email.smtp_host cannot be empty when the smtp backend is selected");
        }

        if self.sensors.temperature_min > self.sensors.temperature_max
            || self.sensors.humidity_min > self.sensors.humidity_max
        {
            anyhow::bail!("sensor ranges must have min <= max");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.security.lockout.max_attempts, 5);
        assert_eq!(config.security.lockout.lockout_seconds, 86_400);
        assert_eq!(config.email.backend, EmailBackend::Console);
        assert_eq!(config.sensors.round_digits, Some(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[security.lockout]"));
        assert!(toml_str.contains("[email]"));
        assert!(toml_str.contains("[sensors]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [email]
            backend = "smtp"
            smtp_host = "smtp.example.com"

            [security.lockout]
            max_attempts = 3
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.email.backend, EmailBackend::Smtp);
        assert_eq!(config.security.lockout.max_attempts, 3);

        assert_eq!(config.security.lockout.lockout_seconds, 86_400);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.email.backend = EmailBackend::Smtp;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.security.secret_key.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.security.lockout.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
