//! Configuration management for the election system
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present) with validation.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default session lifetime in seconds (30 minutes)
const DEFAULT_SESSION_LIFETIME: u64 = 1800;

/// Minimum decoded length of the credential salt
pub const MIN_SALT_BYTES: usize = 32;

/// Election metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    /// Display name of the election
    pub name: String,

    /// Scheduled election day
    pub scheduled_for: DateTime<Utc>,

    /// Cap on retained audit entries (None = library default)
    pub audit_max_entries: Option<usize>,
}

impl ElectionConfig {
    pub fn from_env() -> Result<Self> {
        let name = std::env::var("ELECTION_NAME").unwrap_or_else(|_| "General Election".to_string());

        let scheduled_for = match std::env::var("ELECTION_DATE") {
            Ok(raw) => DateTime::parse_from_rfc3339(&raw)
                .map_err(|_| Error::configuration("ELECTION_DATE must be an RFC 3339 timestamp"))?
                .with_timezone(&Utc),
            Err(_) => Utc::now() + Duration::days(30),
        };

        let audit_max_entries = match std::env::var("AUDIT_MAX_ENTRIES") {
            Ok(raw) => Some(
                raw.parse()
                    .map_err(|_| Error::configuration("Invalid AUDIT_MAX_ENTRIES"))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            name,
            scheduled_for,
            audit_max_entries,
        })
    }

    pub fn for_testing() -> Self {
        Self {
            name: "Test Election".to_string(),
            scheduled_for: Utc::now() + Duration::days(30),
            audit_max_entries: None,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Credential hashing salt (base64 encoded, minimum 32 bytes)
    pub credential_salt: String,

    /// Session lifetime in seconds
    pub session_lifetime_seconds: u64,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self> {
        let credential_salt = std::env::var("AUTH_CREDENTIAL_SALT").map_err(|_| {
            Error::configuration("AUTH_CREDENTIAL_SALT environment variable required")
        })?;

        Self::validate_salt(&credential_salt, "AUTH_CREDENTIAL_SALT")?;

        let session_lifetime_seconds = std::env::var("AUTH_SESSION_LIFETIME_SECONDS")
            .unwrap_or_else(|_| DEFAULT_SESSION_LIFETIME.to_string())
            .parse()
            .map_err(|_| Error::configuration("Invalid AUTH_SESSION_LIFETIME_SECONDS"))?;

        Ok(Self {
            credential_salt,
            session_lifetime_seconds,
        })
    }

    /// Create configuration for testing with a random salt
    pub fn for_testing() -> Self {
        use base64::Engine;
        let credential_salt =
            base64::engine::general_purpose::STANDARD.encode(rand::random::<[u8; 32]>());

        Self {
            credential_salt,
            session_lifetime_seconds: 300, // 5 minutes for testing
        }
    }

    /// Validate a base64-encoded salt
    fn validate_salt(salt: &str, name: &str) -> Result<()> {
        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(salt)
            .map_err(|_| Error::configuration(format!("{name} must be valid base64")))?;

        if decoded.len() < MIN_SALT_BYTES {
            return Err(Error::configuration(format!(
                "{name} must be at least {MIN_SALT_BYTES} bytes when decoded"
            )));
        }

        Ok(())
    }

    /// Get credential salt as bytes
    pub fn credential_salt_bytes(&self) -> Result<Vec<u8>> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&self.credential_salt)
            .map_err(|_| Error::configuration("Invalid credential salt"))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `compact` or `pretty`
    pub format: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub election: ElectionConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            election: ElectionConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            logging: LoggingConfig::from_env(),
        })
    }

    /// Create configuration for testing
    pub fn for_testing() -> Self {
        Self {
            election: ElectionConfig::for_testing(),
            auth: AuthConfig::for_testing(),
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testing_config_is_valid() {
        let config = Config::for_testing();

        assert!(config.auth.credential_salt_bytes().unwrap().len() >= MIN_SALT_BYTES);
        assert!(config.auth.session_lifetime_seconds > 0);
        assert!(config.election.scheduled_for > Utc::now());
    }

    #[test]
    fn test_salt_validation() {
        use base64::Engine;
        // Valid salt (32 bytes)
        let valid_salt = base64::engine::general_purpose::STANDARD.encode([0u8; 32]);
        assert!(AuthConfig::validate_salt(&valid_salt, "TEST").is_ok());

        // Too short
        let short_salt = base64::engine::general_purpose::STANDARD.encode([0u8; 16]);
        assert!(matches!(
            AuthConfig::validate_salt(&short_salt, "TEST"),
            Err(Error::Configuration { .. })
        ));

        // Invalid base64
        assert!(AuthConfig::validate_salt("invalid_base64!", "TEST").is_err());
    }
}
