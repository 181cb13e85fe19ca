use std::time::Duration;

use crate::errors::{HarvestError, HarvestResult};
use crate::fetch::FetchSettings;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub user_agent: String,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    pub renderer_url: Option<String>,
    pub default_backend: String,
    pub fetch: FetchSettings,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> HarvestResult<Self> {
        let exe_dir = Self::exe_dir();

        // Try to load .env from executable's directory first
        if let Some(ref dir) = exe_dir {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        // Default db_path is relative to executable directory
        let db_path = std::env::var("HARVEST_DB_PATH").unwrap_or_else(|_| {
            exe_dir
                .map(|d| d.join("harvest.db").to_string_lossy().into_owned())
                .unwrap_or_else(|| "./harvest.db".to_string())
        });

        let defaults = FetchSettings::default();
        let fetch = FetchSettings {
            max_attempts: env_number("HARVEST_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_backoff: Duration::from_millis(env_number(
                "HARVEST_RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )?),
            cache_ttl: Duration::from_secs(env_number(
                "HARVEST_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            min_content_length: env_number(
                "HARVEST_MIN_CONTENT_LENGTH",
                defaults.min_content_length,
            )?,
            navigation_timeout: Duration::from_millis(env_number(
                "HARVEST_NAV_TIMEOUT_MS",
                defaults.navigation_timeout.as_millis() as u64,
            )?),
            ..defaults
        };

        if fetch.max_attempts == 0 {
            return Err(HarvestError::Config(
                "HARVEST_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            db_path,
            user_agent: std::env::var("HARVEST_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            browserless_url: non_empty_var("BROWSERLESS_URL"),
            browserless_token: non_empty_var("BROWSERLESS_TOKEN"),
            renderer_url: non_empty_var("RENDERER_URL"),
            default_backend: std::env::var("HARVEST_DEFAULT_BACKEND")
                .unwrap_or_else(|_| "browserless".to_string()),
            fetch,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_number<T>(name: &str, default: T) -> HarvestResult<T>
where
    T: std::str::FromStr,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| HarvestError::Config(format!("{} must be a number, got '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}
