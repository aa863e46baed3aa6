use base64::{engine::general_purpose, Engine as _};
use std::env;
use thiserror::Error;

const DEFAULT_REMINDER_CRON: &str = "0 0 * * * *";
const DEFAULT_OUTBOX_CRON: &str = "30 * * * * *";
const DEFAULT_MAIL_FROM: &str = "noreply@example.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} missing")]
    Missing(&'static str),
    #[error("environment variable {key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    /// JSON mail API endpoint. Messages are only logged when unset.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Clone, Debug)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub session_key: Vec<u8>,
    pub mail: MailConfig,
    pub reminder_cron: String,
    pub outbox_cron: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                reason: e.to_string(),
            })?,
            None => 10,
        };

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| {
            let port = lookup("PORT").unwrap_or_else(|| "8000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let session_key_b64 = lookup("SESSION_KEY").ok_or(ConfigError::Missing("SESSION_KEY"))?;
        let session_key = general_purpose::STANDARD
            .decode(session_key_b64.trim())
            .map_err(|e| ConfigError::Invalid {
                key: "SESSION_KEY",
                reason: e.to_string(),
            })?;
        if session_key.len() < 32 {
            return Err(ConfigError::Invalid {
                key: "SESSION_KEY",
                reason: "must decode to at least 32 bytes".to_string(),
            });
        }

        let mail = MailConfig {
            api_url: lookup("MAIL_API_URL").filter(|v| !v.trim().is_empty()),
            api_key: lookup("MAIL_API_KEY").filter(|v| !v.trim().is_empty()),
            from: lookup("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
        };

        let bootstrap_admin = match (lookup("BOOTSTRAP_ADMIN_EMAIL"), lookup("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some(BootstrapAdmin { email, password })
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            database_max_connections,
            bind_addr,
            session_key,
            mail,
            reminder_cron: lookup("REMINDER_CRON").unwrap_or_else(|| DEFAULT_REMINDER_CRON.to_string()),
            outbox_cron: lookup("OUTBOX_CRON").unwrap_or_else(|| DEFAULT_OUTBOX_CRON.to_string()),
            bootstrap_admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn key_b64() -> String {
        general_purpose::STANDARD.encode([7u8; 32])
    }

    #[test]
    fn test_defaults_applied() {
        let key = key_b64();
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/feedback"),
            ("SESSION_KEY", &key),
        ]))
        .unwrap();

        assert_eq!(cfg.bind_addr, "0.0.0.0:8000");
        assert_eq!(cfg.database_max_connections, 10);
        assert_eq!(cfg.reminder_cron, DEFAULT_REMINDER_CRON);
        assert!(cfg.mail.api_url.is_none());
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn test_port_used_when_bind_addr_missing() {
        let key = key_b64();
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/feedback"),
            ("SESSION_KEY", &key),
            ("PORT", "9100"),
        ]))
        .unwrap();

        assert_eq!(cfg.bind_addr, "0.0.0.0:9100");
    }

    #[test]
    fn test_missing_database_url() {
        let key = key_b64();
        let err = AppConfig::from_lookup(lookup_from(&[("SESSION_KEY", &key)])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_short_session_key_rejected() {
        let short = general_purpose::STANDARD.encode([1u8; 8]);
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/feedback"),
            ("SESSION_KEY", &short),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SESSION_KEY", .. }));
    }
}
