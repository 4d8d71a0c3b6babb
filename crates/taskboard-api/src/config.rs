use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::rate_limit::RateLimitConfig;

/// Secrets that ship in sample `.env` files and must never sign real tokens.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

/// One year.
const MAX_TOKEN_TTL_HOURS: u64 = 365 * 24;

/// Process-wide settings, built once at startup and handed to the router.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// The single origin allowed to call the API from a browser.
    pub frontend_url: String,
    pub token_ttl: Duration,
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Reads `TASKBOARD_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = get("TASKBOARD_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("TASKBOARD_JWT_SECRET is unset or still a placeholder");
        }

        let ttl_hours: u64 = parse_or(&get, "TASKBOARD_TOKEN_TTL_HOURS", 720)?;
        if ttl_hours == 0 || ttl_hours > MAX_TOKEN_TTL_HOURS {
            bail!(
                "TASKBOARD_TOKEN_TTL_HOURS must be between 1 and {}",
                MAX_TOKEN_TTL_HOURS
            );
        }
        let window_secs: u64 = parse_or(&get, "TASKBOARD_RATE_LIMIT_WINDOW_SECS", 900)?;
        let max_requests: u32 = parse_or(&get, "TASKBOARD_RATE_LIMIT_MAX", 100)?;
        if window_secs == 0 || max_requests == 0 {
            bail!("rate limit window and max must both be greater than zero");
        }

        Ok(Self {
            host: get("TASKBOARD_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "TASKBOARD_PORT", 8000)?,
            db_path: get("TASKBOARD_DB_PATH")
                .unwrap_or_else(|| "taskboard.db".into())
                .into(),
            jwt_secret,
            frontend_url: get("TASKBOARD_FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".into()),
            token_ttl: Duration::from_secs(ttl_hours * 3600),
            rate_limit: RateLimitConfig {
                max_requests,
                window: Duration::from_secs(window_secs),
                ..RateLimitConfig::default()
            },
        })
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
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
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup(&[("TASKBOARD_JWT_SECRET", "s3cr3t-value")])).unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.frontend_url, "http://localhost:5173");
        assert_eq!(config.token_ttl, Duration::from_secs(30 * 24 * 3600));
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window, Duration::from_secs(15 * 60));
    }

    #[test]
    fn placeholder_secret_is_refused() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("TASKBOARD_JWT_SECRET", "dev-secret-change-me")])).is_err());
    }

    #[test]
    fn bad_numbers_are_startup_errors() {
        let res = Config::from_lookup(lookup(&[
            ("TASKBOARD_JWT_SECRET", "s3cr3t-value"),
            ("TASKBOARD_PORT", "eighty"),
        ]));
        let err = res.err().unwrap();
        assert!(err.to_string().contains("TASKBOARD_PORT"));
    }

    #[test]
    fn token_ttl_out_of_range_is_a_startup_error() {
        for hours in ["0", "8761", "18446744073709551615"] {
            let res = Config::from_lookup(lookup(&[
                ("TASKBOARD_JWT_SECRET", "s3cr3t-value"),
                ("TASKBOARD_TOKEN_TTL_HOURS", hours),
            ]));
            let err = res.err().unwrap();
            assert!(err.to_string().contains("TASKBOARD_TOKEN_TTL_HOURS"), "{}", hours);
        }

        let config = Config::from_lookup(lookup(&[
            ("TASKBOARD_JWT_SECRET", "s3cr3t-value"),
            ("TASKBOARD_TOKEN_TTL_HOURS", "8760"),
        ]))
        .unwrap();
        assert_eq!(config.token_ttl, Duration::from_secs(8760 * 3600));
    }
}
