use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Base URL clients reach this server at; used for image URLs and
    /// verification links.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_port: default_api_port(),
            data_dir: default_data_dir(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Bootstrap admin account, created (verified) on first startup.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    /// Ops API token accepted wherever a session is; acts as a synthetic
    /// admin. Regenerated on every start unless pinned in the config file.
    #[serde(default = "default_api_token")]
    pub api_token: String,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
    #[serde(default = "default_verification_ttl_hours")]
    pub verification_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
            api_token: default_api_token(),
            session_ttl_days: default_session_ttl_days(),
            verification_ttl_hours: default_verification_ttl_hours(),
        }
    }
}

fn default_admin_email() -> String {
    "admin@jerseycentral.local".to_string()
}

fn default_admin_password() -> String {
    // Random so an unconfigured install never ships a known password
    uuid::Uuid::new_v4().to_string()
}

fn default_api_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_session_ttl_days() -> i64 {
    7
}

fn default_verification_ttl_hours() -> i64 {
    24
}

/// Payee details baked into every payment request link.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    #[serde(default = "default_upi_vpa")]
    pub upi_vpa: String,
    #[serde(default = "default_payee_name")]
    pub payee_name: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            upi_vpa: default_upi_vpa(),
            payee_name: default_payee_name(),
        }
    }
}

fn default_upi_vpa() -> String {
    "store@upi".to_string()
}

fn default_payee_name() -> String {
    "Jersey Central".to_string()
}

/// SMTP relay for verification mail. Without a host configured, mail is
/// disabled and confirmation links are logged instead.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_smtp_from")]
    pub from: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_smtp_port(),
            username: None,
            password: None,
            from: default_smtp_from(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from() -> String {
    "Jersey Central <no-reply@jerseycentral.local>".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            payment: PaymentConfig::default(),
            smtp: SmtpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
