use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Seller identifier used for our own listing when none is configured
pub const DEFAULT_OUR_COMPANY: &str = "Our company";

/// Message line used for each rank change when no template is configured
pub const DEFAULT_TEMPLATE: &str =
    "Product ID: {product_id} ({product_name}), Previous Rank: {previous_rank}, Current Rank: {current_rank}";

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

/// Which notifier adapter receives rank change batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    Log,
    Webhook,
}

impl NotifierKind {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "log" => Ok(NotifierKind::Log),
            "webhook" => Ok(NotifierKind::Webhook),
            _ => Err(format!(
                "Invalid NOTIFIER_KIND: {}. Must be one of: [\"log\", \"webhook\"]",
                s
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotifierKind::Log => "log",
            NotifierKind::Webhook => "webhook",
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    pub webhook_url: Option<String>,
    pub sender: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub template: String,
    pub timeout_secs: u64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub notifier: NotifierConfig,
    pub our_company: String,
    pub log_level: String,
    pub log_json: bool,
    pub environment: String,
    pub audit_log_dir: Option<PathBuf>,
    pub migrations_path: String,
}

/// Parse an optional variable; a set but malformed value is an error
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("Invalid {}: {:?}", key, raw)),
        Err(_) => Ok(None),
    }
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = env_parse::<u32>("DATABASE_MAX_CONNECTIONS")?.unwrap_or(5);
        let acquire_timeout_secs = env_parse::<u64>("DATABASE_ACQUIRE_TIMEOUT_SECS")?.unwrap_or(30);
        let idle_timeout_secs = env_parse::<u64>("DATABASE_IDLE_TIMEOUT_SECS")?.unwrap_or(600); // 10 minutes
        let max_lifetime_secs = env_parse::<u64>("DATABASE_MAX_LIFETIME_SECS")?.unwrap_or(1800); // 30 minutes
        let test_before_acquire = env_parse::<bool>("DATABASE_TEST_BEFORE_ACQUIRE")?.unwrap_or(true);

        let config = Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if self.acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(())
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
            url: "postgresql://localhost/products".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl NotifierConfig {
    /// Create notifier config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let kind = match env::var("NOTIFIER_KIND") {
            Ok(s) => NotifierKind::from_str(&s)?,
            Err(_) => NotifierKind::Log,
        };

        let webhook_url = env::var("NOTIFIER_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let recipients = env::var("NOTIFIER_RECIPIENTS")
            .map(|s| parse_recipients(&s))
            .unwrap_or_default();

        let defaults = Self::default();
        let config = Self {
            kind,
            webhook_url,
            sender: env::var("NOTIFIER_SENDER").unwrap_or(defaults.sender),
            recipients,
            subject: env::var("NOTIFIER_SUBJECT").unwrap_or(defaults.subject),
            template: env::var("NOTIFIER_TEMPLATE").unwrap_or(defaults.template),
            timeout_secs: env_parse::<u64>("NOTIFIER_TIMEOUT_SECS")?.unwrap_or(defaults.timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.kind == NotifierKind::Webhook {
            if self.webhook_url.is_none() {
                return Err("NOTIFIER_WEBHOOK_URL is required when NOTIFIER_KIND=webhook".to_string());
            }
            if self.recipients.is_empty() {
                return Err("NOTIFIER_RECIPIENTS is required when NOTIFIER_KIND=webhook".to_string());
            }
        }

        if self.template.trim().is_empty() {
            return Err("NOTIFIER_TEMPLATE must not be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("NOTIFIER_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: NotifierKind::Log,
            webhook_url: None,
            sender: "price-monitor@localhost".to_string(),
            recipients: Vec::new(),
            subject: "Product rank changes".to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Split a comma-separated recipient list, dropping blanks
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let notifier = NotifierConfig::from_env()?;

        let our_company = env::var("OUR_COMPANY_SELLER")
            .unwrap_or_else(|_| DEFAULT_OUR_COMPANY.to_string());

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("LOG_FORMAT")
            .map(|s| s.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let audit_log_dir = env::var("AUDIT_LOG_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let migrations_path =
            env::var("MIGRATIONS_PATH").unwrap_or_else(|_| "./migrations".to_string());

        let config = Self {
            database,
            notifier,
            our_company: our_company.trim().to_string(),
            log_level: log_level.to_lowercase(),
            log_json,
            environment: environment.to_lowercase(),
            audit_log_dir,
            migrations_path,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.our_company.is_empty() {
            return Err("OUR_COMPANY_SELLER must not be empty".to_string());
        }

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                self.log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.environment.as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                self.environment, valid_environments
            ));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            notifier: NotifierConfig::default(),
            our_company: DEFAULT_OUR_COMPANY.to_string(),
            log_level: "info".to_string(),
            log_json: false,
            environment: "development".to_string(),
            audit_log_dir: None,
            migrations_path: "./migrations".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.acquire_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config_rejects_zero_connections() {
        let config = DatabaseConfig {
            max_connections: 0,
            ..DatabaseConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.our_company, "Our company");
        assert_eq!(config.notifier.kind, NotifierKind::Log);
        assert_eq!(config.environment, "development");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_rejects_bad_log_level() {
        let config = AppConfig {
            log_level: "verbose".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_webhook_notifier_requires_url_and_recipients() {
        let mut config = NotifierConfig {
            kind: NotifierKind::Webhook,
            ..NotifierConfig::default()
        };
        assert!(config.validate().is_err());

        config.webhook_url = Some("http://relay.local/send".to_string());
        assert!(config.validate().is_err());

        config.recipients = vec!["ops@example.com".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_notifier_kind_parsing() {
        assert_eq!(NotifierKind::from_str("LOG").unwrap(), NotifierKind::Log);
        assert_eq!(NotifierKind::from_str("webhook").unwrap(), NotifierKind::Webhook);
        assert!(NotifierKind::from_str("smtp").is_err());
    }

    #[test]
    fn test_env_parse_rejects_malformed_values() {
        env::set_var("PRICE_RANK_TEST_MALFORMED_CONNECTIONS", "abc");
        env::set_var("PRICE_RANK_TEST_PADDED_TIMEOUT", " 15 ");

        let malformed = env_parse::<u32>("PRICE_RANK_TEST_MALFORMED_CONNECTIONS");
        assert!(malformed.unwrap_err().contains("PRICE_RANK_TEST_MALFORMED_CONNECTIONS"));
        assert_eq!(env_parse::<u64>("PRICE_RANK_TEST_PADDED_TIMEOUT"), Ok(Some(15)));
        assert_eq!(env_parse::<bool>("PRICE_RANK_TEST_NEVER_SET"), Ok(None));
    }

    #[test]
    fn test_parse_recipients() {
        let parsed = parse_recipients(" a@x.com, ,b@y.com ,");
        assert_eq!(parsed, vec!["a@x.com".to_string(), "b@y.com".to_string()]);
    }
}
