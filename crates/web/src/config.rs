use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: i64,
    pub document_root: PathBuf,
    pub min_birth_year: i32,
    pub recalc_timeout_ms: u64,
    pub environment: String,
    pub admin: Option<AdminAccount>,
}

/// Operator account created at startup when it does not exist yet.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminAccount {
                name: lookup("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            database_url: lookup("DATABASE_URL").context("Cannot load DATABASE_URL env variable")?,
            jwt_secret: lookup("JWT_SECRET").context("Cannot load JWT_SECRET env variable")?,
            jwt_expiration_secs: parse_or(&lookup, "JWT_EXPIRATION_SECS", 86_400)?,
            document_root: lookup("DOCUMENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            min_birth_year: parse_or(&lookup, "MIN_BIRTH_YEAR", 2011)?,
            recalc_timeout_ms: parse_or(&lookup, "RECALC_TIMEOUT_MS", 5_000)?,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            admin,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn recalc_timeout(&self) -> Duration {
        Duration::from_millis(self.recalc_timeout_ms)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/raceday"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_expiration_secs, 86_400);
        assert_eq!(config.min_birth_year, 2011);
        assert_eq!(config.recalc_timeout(), Duration::from_millis(5_000));
        assert_eq!(config.document_root, PathBuf::from("./uploads"));
        assert!(!config.is_production());
        assert!(config.admin.is_none());
    }

    #[test]
    fn test_missing_database_url() {
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", "secret")])).is_err());
    }

    #[test]
    fn test_bad_port() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/raceday"),
            ("JWT_SECRET", "secret"),
            ("PORT", "eighty"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_admin_requires_email_and_password() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/raceday"),
            ("JWT_SECRET", "secret"),
            ("ADMIN_EMAIL", "ops@example.com"),
            ("ADMIN_PASSWORD", "hunter22"),
            ("ENVIRONMENT", "Production"),
        ]))
        .unwrap();

        let admin = config.admin.as_ref().unwrap();
        assert_eq!(admin.name, "Administrator");
        assert!(config.is_production());
    }
}
