// Environment configuration
//
// Odoo credentials are only validated when a bill is actually submitted, so a
// half-configured deployment still answers 401/400 and reports what is
// missing on the first real command.

use crate::error::{WebhookError, WebhookResult};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Webhook configuration, read once at startup.
#[derive(Clone, Default)]
pub struct Config {
    /// Odoo base URL, without trailing slash
    pub odoo_url: Option<String>,

    /// Odoo database name
    pub odoo_db: Option<String>,

    /// Odoo login
    pub odoo_login: Option<String>,

    /// Odoo password or API key
    pub odoo_api_key: Option<String>,

    /// Shared secret callers must present
    pub webhook_secret: Option<String>,

    /// Listen address for the server binary
    pub bind_addr: String,
}

/// Complete set of values needed to log in to Odoo.
#[derive(Clone)]
pub struct OdooCredentials {
    pub url: String,
    pub db: String,
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for OdooCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OdooCredentials")
            .field("url", &self.url)
            .field("db", &self.db)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("odoo_url", &self.odoo_url)
            .field("odoo_db", &self.odoo_db)
            .field("odoo_login", &self.odoo_login)
            .field("odoo_api_key", &self.odoo_api_key.as_ref().map(|_| "<redacted>"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup (tests use a map).
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            odoo_url: get("ODOO_URL").map(|url| url.trim_end_matches('/').to_string()),
            odoo_db: get("ODOO_DB"),
            odoo_login: get("ODOO_LOGIN"),
            odoo_api_key: get("ODOO_API_KEY"),
            webhook_secret: get("WEBHOOK_SECRET"),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        }
    }

    /// Odoo login values, or an auth error naming every missing variable.
    pub fn odoo_credentials(&self) -> WebhookResult<OdooCredentials> {
        let missing: Vec<&str> = [
            ("ODOO_URL", &self.odoo_url),
            ("ODOO_DB", &self.odoo_db),
            ("ODOO_LOGIN", &self.odoo_login),
            ("ODOO_API_KEY", &self.odoo_api_key),
        ]
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect();

        match (&self.odoo_url, &self.odoo_db, &self.odoo_login, &self.odoo_api_key) {
            (Some(url), Some(db), Some(login), Some(password)) => Ok(OdooCredentials {
                url: url.clone(),
                db: db.clone(),
                login: login.clone(),
                password: password.clone(),
            }),
            _ => Err(WebhookError::Auth(format!(
                "Missing Odoo env vars: {}",
                missing.join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_full_config() {
        let config = config_from(&[
            ("ODOO_URL", "https://acme.odoo.com/"),
            ("ODOO_DB", "acme"),
            ("ODOO_LOGIN", "bot@acme.gy"),
            ("ODOO_API_KEY", "key-123"),
            ("WEBHOOK_SECRET", "s3cret"),
        ]);

        assert_eq!(config.webhook_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.bind_addr, "0.0.0.0:3000");

        let creds = config.odoo_credentials().unwrap();
        assert_eq!(creds.url, "https://acme.odoo.com");
        assert_eq!(creds.db, "acme");
        assert_eq!(creds.login, "bot@acme.gy");
        assert_eq!(creds.password, "key-123");
    }

    #[test]
    fn test_missing_credentials_are_named() {
        let config = config_from(&[("ODOO_URL", "https://acme.odoo.com"), ("ODOO_DB", "acme")]);

        let err = config.odoo_credentials().unwrap_err();
        assert!(matches!(err, WebhookError::Auth(_)));
        assert_eq!(
            err.to_string(),
            "Missing Odoo env vars: ODOO_LOGIN, ODOO_API_KEY"
        );
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = config_from(&[("WEBHOOK_SECRET", "  "), ("BIND_ADDR", "127.0.0.1:8080")]);
        assert!(config.webhook_secret.is_none());
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = config_from(&[("ODOO_API_KEY", "key-123"), ("WEBHOOK_SECRET", "s3cret")]);
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("key-123"));
        assert!(!rendered.contains("s3cret"));
    }
}
