use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

/// Typed runtime configuration, loaded from the environment (with an
/// optional `.env` file that never overrides real env vars).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub bot_token: String,
    /// Chat id of the operator channel; commands are only honored there and
    /// audit notifications are posted to it.
    pub operator_chat_id: i64,
    /// Shared secret gating user registration.
    pub secret_password: String,

    // Content
    pub total_dir: PathBuf,
    pub lang_dir: PathBuf,

    // Directory backend
    pub database_url: Option<String>,

    // Delivery timing
    pub series_count: u32,
    pub series_interval: Duration,
    pub broadcast_pacing: Duration,

    // Outbound flood control
    pub throttle_global_interval: Duration,
    pub throttle_per_chat_interval: Duration,

    // Audit
    pub audit_log_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bot_token = env_str("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let operator_chat_id = env_i64("CHAT_ID").ok_or_else(|| {
            Error::Config("CHAT_ID environment variable is required".to_string())
        })?;

        let secret_password = env_str("SECRET_PASSWORD")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("SECRET_PASSWORD environment variable is required".to_string())
            })?;

        let total_dir = env_path("TOTAL_DIR").unwrap_or_else(|| PathBuf::from("totals"));
        let lang_dir = env_path("LANG_DIR").unwrap_or_else(|| PathBuf::from("lang"));

        let database_url = env_str("DATABASE_URL").and_then(non_empty);

        let series_count = env_u32("SERIES_COUNT").unwrap_or(10);
        let series_interval = Duration::from_secs(env_u64("SERIES_INTERVAL_SECS").unwrap_or(60));
        let broadcast_pacing =
            Duration::from_millis(env_u64("BROADCAST_PACING_MS").unwrap_or(50));

        let throttle_global_interval =
            Duration::from_millis(env_u64("THROTTLE_GLOBAL_MS").unwrap_or(40));
        let throttle_per_chat_interval =
            Duration::from_millis(env_u64("THROTTLE_PER_CHAT_MS").unwrap_or(1050));

        let audit_log_path = PathBuf::from(
            env_str("AUDIT_LOG_PATH").unwrap_or("/tmp/avio-audit.log".to_string()),
        );

        Ok(Self {
            bot_token,
            operator_chat_id,
            secret_password,
            total_dir,
            lang_dir,
            database_url,
            series_count,
            series_interval,
            broadcast_pacing,
            throttle_global_interval,
            throttle_per_chat_interval,
            audit_log_path,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
