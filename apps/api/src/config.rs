use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub auth_enabled: bool,
    pub allowed_emails: Vec<String>,
    /// Identity attached to every request while auth is disabled.
    pub default_username: String,
    pub youtube_api_key: Option<String>,
    /// `None` allows any origin.
    pub cors_allow_origin: Option<String>,
    pub run_migrations: bool,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let auth_enabled = parse_bool("AUTH_ENABLED", get("AUTH_ENABLED"), true)?;
        let allowed_emails: Vec<String> = get("ALLOWED_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if auth_enabled && allowed_emails.is_empty() {
            bail!("ALLOWED_EMAILS must list at least one e-mail while AUTH_ENABLED is true");
        }

        Ok(Config {
            database_url: get("DATABASE_URL")
                .context("Required environment variable 'DATABASE_URL' is not set")?,
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            auth_enabled,
            allowed_emails,
            default_username: get("DEFAULT_USERNAME")
                .unwrap_or_else(|| "guest@localhost".to_string()),
            youtube_api_key: get("YOUTUBE_API_KEY"),
            cors_allow_origin: get("CORS_ALLOW_ORIGIN"),
            run_migrations: parse_bool("RUN_MIGRATIONS", get("RUN_MIGRATIONS"), true)?,
            db_max_connections: get("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "10".to_string())
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
        })
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => bail!("{key} must be true or false, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/practicelog"),
            ("ALLOWED_EMAILS", "me@example.com, friend@example.com"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.auth_enabled);
        assert!(config.run_migrations);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.allowed_emails, vec!["me@example.com", "friend@example.com"]);
        assert_eq!(config.default_username, "guest@localhost");
        assert!(config.youtube_api_key.is_none());
    }

    #[test]
    fn test_database_url_required() {
        let err = load(&[("AUTH_ENABLED", "false")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_allow_list_required_with_auth() {
        assert!(load(&[("DATABASE_URL", "postgres://x")]).is_err());
        assert!(load(&[("DATABASE_URL", "postgres://x"), ("AUTH_ENABLED", "false")]).is_ok());
    }

    #[test]
    fn test_rejects_malformed_values() {
        let base = [("DATABASE_URL", "postgres://x"), ("AUTH_ENABLED", "off")];
        assert!(load(&[base[0], base[1], ("PORT", "eighty")]).is_err());
        assert!(load(&[base[0], ("AUTH_ENABLED", "maybe")]).is_err());
    }
}
