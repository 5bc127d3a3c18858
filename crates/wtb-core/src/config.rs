use std::{env, fs, path::Path, time::Duration};

use url::Url;

use crate::{errors::Error, Result};

pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 5;
pub const MAX_HISTORY_PAGE_SIZE: u32 = 50;

/// Typed configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_safe_limit: usize,

    // Tracking backend
    pub tracker_api_url: Url,
    pub tracker_api_token: Option<String>,
    pub tracker_timeout: Duration,

    // Mini app
    pub mini_app_url: Option<Url>,

    // Presentation
    pub history_page_size: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    /// Build from an arbitrary key lookup (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;

        let tracker_api_url = get("TRACKER_API_URL").ok_or_else(|| {
            Error::Config("TRACKER_API_URL environment variable is required".to_string())
        })?;
        let tracker_api_url = parse_url("TRACKER_API_URL", &tracker_api_url)?;
        let tracker_api_token = get("TRACKER_API_TOKEN");
        let tracker_timeout =
            Duration::from_millis(parse_num(get("TRACKER_TIMEOUT_MS")).unwrap_or(10_000));

        let mini_app_url = get("MINI_APP_URL")
            .map(|raw| parse_url("MINI_APP_URL", &raw))
            .transpose()?;

        let telegram_safe_limit = parse_num(get("TELEGRAM_SAFE_LIMIT")).unwrap_or(4000);
        let history_page_size = parse_num(get("HISTORY_PAGE_SIZE"))
            .unwrap_or(DEFAULT_HISTORY_PAGE_SIZE)
            .clamp(1, MAX_HISTORY_PAGE_SIZE);

        Ok(Self {
            telegram_bot_token,
            telegram_safe_limit,
            tracker_api_url,
            tracker_api_token,
            tracker_timeout,
            mini_app_url,
            history_page_size,
        })
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| Error::Config(format!("{key} is not a valid URL: {e}")))
}

fn parse_num<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.trim().parse::<T>().ok())
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = &val[1..val.len() - 1];
        }
        out.push((key.to_string(), val.to_string()));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
