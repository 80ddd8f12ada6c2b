//! Service Configuration
//! Mission: Load every runtime knob from flags, environment, or `.env`

use clap::Parser;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Placeholder secrets that are only acceptable outside production.
pub const DEV_JWT_SECRET: &str = "dev-jwt-secret-change-in-production-minimum-32-chars";
pub const DEV_REGISTRATION_TOKEN: &str = "dev-admin-registration-token";
pub const DEV_ADMIN_PASSWORD: &str = "admin123";

/// bcrypt work factor bounds.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// Runtime configuration for the admin service.
#[derive(Debug, Clone, Parser)]
#[command(name = "admin-backoffice", version, about = "E-commerce admin back-office API")]
pub struct Config {
    /// HTTP listen port
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Deployment environment (development, staging, production)
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub environment: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_URL", default_value = "admin_backoffice.db")]
    pub database_url: String,

    /// HMAC secret used to sign access tokens
    #[arg(long, env = "JWT_SECRET", default_value = DEV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    /// Shared secret required by the admin registration endpoint
    #[arg(
        long,
        env = "ADMIN_REGISTRATION_TOKEN",
        default_value = DEV_REGISTRATION_TOKEN,
        hide_env_values = true
    )]
    pub registration_token: String,

    /// Comma-separated CORS origins
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        default_value = "http://localhost:3001,http://localhost:8080"
    )]
    pub allowed_origins: String,

    #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@ecommerce.com")]
    pub admin_email: String,

    #[arg(long, env = "ADMIN_PASSWORD", default_value = DEV_ADMIN_PASSWORD, hide_env_values = true)]
    pub admin_password: String,

    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    #[arg(long, env = "ADMIN_FIRST_NAME", default_value = "Admin")]
    pub admin_first_name: String,

    #[arg(long, env = "ADMIN_LAST_NAME", default_value = "User")]
    pub admin_last_name: String,

    /// Requests allowed per client inside one rate-limit window
    #[arg(long, env = "RATE_LIMIT_REQUESTS", default_value_t = 100)]
    pub rate_limit_requests: usize,

    /// Rate-limit window length in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 60)]
    pub rate_limit_window_secs: u64,

    /// Upper bound on a single store call in seconds
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value_t = 5)]
    pub store_timeout_secs: u64,

    /// bcrypt work factor
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} uses a development placeholder; set it explicitly in production")]
    PlaceholderSecret(&'static str),
    #[error("JWT_SECRET must be at least 32 bytes in production")]
    WeakJwtSecret,
    #[error("RATE_LIMIT_REQUESTS and RATE_LIMIT_WINDOW_SECS must be greater than zero")]
    InvalidRateLimit,
    #[error("BCRYPT_COST must be between {min} and {max}")]
    InvalidBcryptCost { min: u32, max: u32 },
}

impl Config {
    /// Parse configuration from `.env`, the environment and CLI flags.
    pub fn load() -> Result<Self, ConfigError> {
        load_env();
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Reject settings that would be unsafe or unusable at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit_requests == 0 || self.rate_limit_window_secs == 0 {
            return Err(ConfigError::InvalidRateLimit);
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost {
                min: MIN_BCRYPT_COST,
                max: MAX_BCRYPT_COST,
            });
        }

        if self.is_production() {
            if self.jwt_secret == DEV_JWT_SECRET {
                return Err(ConfigError::PlaceholderSecret("JWT_SECRET"));
            }
            if self.registration_token == DEV_REGISTRATION_TOKEN {
                return Err(ConfigError::PlaceholderSecret("ADMIN_REGISTRATION_TOKEN"));
            }
            if self.jwt_secret.len() < 32 {
                return Err(ConfigError::WeakJwtSecret);
            }
            if self.admin_password == DEV_ADMIN_PASSWORD {
                return Err(ConfigError::PlaceholderSecret("ADMIN_PASSWORD"));
            }
        }

        Ok(())
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv::dotenv();

    // 2) Also try the crate root when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }

    // 3) NODE_ENV is accepted as an alias for APP_ENV
    if std::env::var_os("APP_ENV").is_none() {
        if let Some(node_env) = std::env::var_os("NODE_ENV") {
            std::env::set_var("APP_ENV", node_env);
        }
    }
}
