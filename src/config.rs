use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Token signing configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub platform_admin_emails: Vec<String>,
}

/// Outbound mail configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from_address: String,
    pub outbox_dir: PathBuf,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub log_level: String,
    pub log_format: String,
    pub http_port: u16,
    pub environment: String,
    pub stripe_webhook_secret: Option<String>,
    pub audit_log_dir: PathBuf,
    pub import_match_threshold: f64,
}

const DEV_JWT_SECRET: &str = "subrent-development-secret";

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = parse_env::<u32>("DATABASE_MAX_CONNECTIONS").unwrap_or(10);
        let acquire_timeout_secs = parse_env::<u64>("DATABASE_ACQUIRE_TIMEOUT_SECS").unwrap_or(30);
        let idle_timeout_secs = parse_env::<u64>("DATABASE_IDLE_TIMEOUT_SECS").unwrap_or(600); // 10 minutes
        let max_lifetime_secs = parse_env::<u64>("DATABASE_MAX_LIFETIME_SECS").unwrap_or(1800); // 30 minutes
        let test_before_acquire = parse_env::<bool>("DATABASE_TEST_BEFORE_ACQUIRE").unwrap_or(true);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/subrent".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl_secs: 86_400,
            platform_admin_emails: Vec::new(),
        }
    }
}

impl AuthConfig {
    pub fn is_platform_admin(&self, email: &str) -> bool {
        self.platform_admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_address: "no-reply@subrent.local".to_string(),
            outbox_dir: PathBuf::from("./mail_outbox"),
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
        let http_port = parse_env::<u16>("HTTP_PORT").unwrap_or(8080);
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&log_format.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: {:?}",
                log_format, valid_log_formats
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        let environment = environment.to_lowercase();
        if !valid_environments.contains(&environment.as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        // The development secret is never acceptable outside development
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == "development" => DEV_JWT_SECRET.to_string(),
            _ => return Err("JWT_SECRET is required outside development".to_string()),
        };

        let jwt_ttl_secs = parse_env::<i64>("JWT_TTL_SECS").unwrap_or(86_400);
        if jwt_ttl_secs <= 0 {
            return Err("JWT_TTL_SECS must be greater than 0".to_string());
        }

        let platform_admin_emails = env::var("PLATFORM_ADMIN_EMAILS")
            .map(|raw| split_list(&raw))
            .unwrap_or_default();

        let import_match_threshold = parse_env::<f64>("IMPORT_MATCH_THRESHOLD").unwrap_or(0.85);
        if !(0.0..=1.0).contains(&import_match_threshold) || import_match_threshold == 0.0 {
            return Err("IMPORT_MATCH_THRESHOLD must be in (0, 1]".to_string());
        }

        let mail_defaults = MailConfig::default();
        let mail = MailConfig {
            from_address: env::var("MAIL_FROM").unwrap_or(mail_defaults.from_address),
            outbox_dir: env::var("MAIL_OUTBOX_DIR")
                .map(PathBuf::from)
                .unwrap_or(mail_defaults.outbox_dir),
        };

        Ok(Self {
            database,
            auth: AuthConfig {
                jwt_secret,
                jwt_ttl_secs,
                platform_admin_emails,
            },
            mail,
            log_level: log_level.to_lowercase(),
            log_format: log_format.to_lowercase(),
            http_port,
            environment,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            audit_log_dir: PathBuf::from(
                env::var("AUDIT_LOG_DIR").unwrap_or_else(|_| "./logs".to_string()),
            ),
            import_match_threshold,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Get database URL (convenience method)
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            mail: MailConfig::default(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            http_port: 8080,
            environment: "development".to_string(),
            stripe_webhook_secret: None,
            audit_log_dir: PathBuf::from("./logs"),
            import_match_threshold: 0.85,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout_secs, 30);
        assert_eq!(config.idle_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.http_port, 8080);
        assert!(config.is_development());
        assert!(!config.is_production());
        assert!(!config.json_logs());
        assert_eq!(config.import_match_threshold, 0.85);
    }

    #[test]
    fn test_platform_admin_lookup_ignores_case() {
        let auth = AuthConfig {
            platform_admin_emails: split_list(" Ops@Subrent.io, ,root@subrent.io"),
            ..AuthConfig::default()
        };
        assert_eq!(auth.platform_admin_emails.len(), 2);
        assert!(auth.is_platform_admin("ops@subrent.io"));
        assert!(auth.is_platform_admin("ROOT@subrent.io"));
        assert!(!auth.is_platform_admin("someone@subrent.io"));
    }
}
