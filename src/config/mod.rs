use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub membership: MembershipConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub razorpay: RazorpayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    /// Frontend origin used in password reset / verification links.
    pub client_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    /// Access token lifetime in seconds (default 1h).
    pub access_token_secs: i64,
    /// Refresh token lifetime in seconds (default 7 days).
    pub refresh_token_secs: i64,
    pub max_login_attempts: i64,
    /// How long an account stays locked once the attempt cap is hit.
    pub lock_duration_secs: i64,
    /// Skips the email verification gate; for development only.
    #[serde(default)]
    pub skip_email_verification: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MembershipConfig {
    /// Annual renewal fee in minor currency units.
    pub annual_fee_minor: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub from_address: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RazorpayConfig {
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("server.client_url", "http://localhost:3001")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.access_token_secs", 3600)?
            .set_default("auth.refresh_token_secs", 604_800)?
            .set_default("auth.max_login_attempts", 5)?
            .set_default("auth.lock_duration_secs", 300)?
            .set_default("membership.annual_fee_minor", 10_000)?
            .set_default("membership.currency", "INR")?
            .set_default("email.enabled", false)?
            .set_default("razorpay.enabled", false)?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with ROLLBOOK__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("ROLLBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
                client_url: "http://localhost:3001".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://rollbook.db".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                jwt_refresh_secret: "change-me-too-in-production".to_string(),
                access_token_secs: 3600,
                refresh_token_secs: 604_800,
                max_login_attempts: 5,
                lock_duration_secs: 300,
                skip_email_verification: false,
            },
            membership: MembershipConfig {
                annual_fee_minor: 10_000,
                currency: "INR".to_string(),
            },
            email: EmailConfig::default(),
            razorpay: RazorpayConfig::default(),
        }
    }
}
