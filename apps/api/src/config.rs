use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub auth_url: String,
    pub auth_anon_key: String,
    /// Directory backing the local résumé cache.
    pub local_cache_dir: PathBuf,
    /// Externally reachable base URL, used for OAuth redirects.
    pub public_url: String,
    pub notification_webhook_url: Option<String>,
    /// Permission for out-of-band notification delivery.
    pub desktop_notifications: bool,
    pub digest_interval_secs: u64,
    pub connectivity_interval_secs: u64,
    pub ai_retry_attempts: u32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port: u16 = optional_env("PORT", 8080)?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            auth_url: require_env("AUTH_URL")?,
            auth_anon_key: require_env("AUTH_ANON_KEY")?,
            local_cache_dir: std::env::var("LOCAL_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".cache/resume-coach")),
            public_url: std::env::var("PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            notification_webhook_url: std::env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            desktop_notifications: optional_env("DESKTOP_NOTIFICATIONS", false)?,
            digest_interval_secs: optional_env("DIGEST_INTERVAL_SECS", 300)?,
            connectivity_interval_secs: optional_env("CONNECTIVITY_INTERVAL_SECS", 30)?,
            ai_retry_attempts: optional_env("AI_RETRY_ATTEMPTS", 3)?,
            port,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn oauth_redirect_url(&self) -> String {
        format!(
            "{}/api/v1/auth/callback",
            self.public_url.trim_end_matches('/')
        )
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/test".to_string(),
            redis_url: "redis://localhost".to_string(),
            s3_bucket: "resumes".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            auth_url: "http://localhost:9999".to_string(),
            auth_anon_key: "anon".to_string(),
            local_cache_dir: PathBuf::from("/tmp/resume-coach-test"),
            public_url: "http://localhost:8080".to_string(),
            notification_webhook_url: None,
            desktop_notifications: false,
            digest_interval_secs: 300,
            connectivity_interval_secs: 30,
            ai_retry_attempts: 3,
            port: 8080,
            rust_log: "debug".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_env_default_and_parse() {
        std::env::remove_var("COACH_TEST_UNSET");
        assert_eq!(optional_env("COACH_TEST_UNSET", 42u64).unwrap(), 42);

        std::env::set_var("COACH_TEST_INTERVAL", " 15 ");
        assert_eq!(optional_env("COACH_TEST_INTERVAL", 300u64).unwrap(), 15);

        std::env::set_var("COACH_TEST_FLAG", "maybe");
        assert!(optional_env("COACH_TEST_FLAG", false).is_err());
    }

    #[test]
    fn test_redirect_url() {
        let mut config = Config::for_tests();
        config.public_url = "https://coach.example.com/".to_string();
        assert_eq!(
            config.oauth_redirect_url(),
            "https://coach.example.com/api/v1/auth/callback"
        );
    }
}
