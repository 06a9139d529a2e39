//! Runtime configuration from the environment
//!
//! A `.env` file in the working directory is loaded first when present;
//! variables already set in the process environment take precedence.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::controller::Timings;
use crate::model::DEFAULT_SNAPSHOT_FILE;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000/api";
const DEFAULT_API_TIMEOUT_MS: u64 = 15_000;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    pub api_timeout: Duration,
    pub image_base_url: String,
    pub snapshot_path: PathBuf,
    pub device_name: String,
    timings: Timings,
}

impl Config {
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_base_url = get("NOWPLAYING_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let image_base_url = get("NOWPLAYING_IMAGE_BASE_URL").unwrap_or_else(|| server_origin(&api_base_url));
        let device_name = get("NOWPLAYING_DEVICE_NAME").unwrap_or_else(host_name);

        let defaults = Timings::default();
        let millis = |key: &str, default: Duration| {
            parse_or(key, get(key), default.as_millis() as u64).map_or(default, Duration::from_millis)
        };
        let timings = Timings {
            seek_debounce: millis("NOWPLAYING_SEEK_DEBOUNCE_MS", defaults.seek_debounce),
            volume_debounce: millis("NOWPLAYING_VOLUME_DEBOUNCE_MS", defaults.volume_debounce),
            tick: millis("NOWPLAYING_TICK_MS", defaults.tick).max(Duration::from_millis(10)),
            end_epsilon_sec: parse_or("NOWPLAYING_END_EPSILON_SEC", get("NOWPLAYING_END_EPSILON_SEC"), defaults.end_epsilon_sec)
                .filter(|eps| eps.is_finite() && *eps >= 0.0)
                .unwrap_or(defaults.end_epsilon_sec),
            notice_ttl: millis("NOWPLAYING_NOTICE_MS", defaults.notice_ttl),
        };

        Self {
            api_base_url,
            api_timeout: millis("NOWPLAYING_API_TIMEOUT_MS", Duration::from_millis(DEFAULT_API_TIMEOUT_MS)),
            image_base_url,
            snapshot_path: get("NOWPLAYING_SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_FILE)),
            device_name,
            timings,
        }
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }
}

/// `None` only when the value is present but unparsable
fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Option<T> {
    let Some(raw) = value else {
        return Some(default);
    };
    match raw.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
            None
        }
    }
}

/// `http://host:3000/api` -> `http://host:3000`
fn server_origin(api_base_url: &str) -> String {
    match reqwest::Url::parse(api_base_url) {
        Ok(url) if url.has_host() => url.origin().ascii_serialization(),
        _ => api_base_url.trim_end_matches("/api").to_string(),
    }
}

fn host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config(&[("NOWPLAYING_DEVICE_NAME", "Kitchen")]);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.image_base_url, "http://127.0.0.1:3000");
        assert_eq!(config.api_timeout, Duration::from_secs(15));
        assert_eq!(config.snapshot_path, PathBuf::from(DEFAULT_SNAPSHOT_FILE));
        assert_eq!(config.device_name, "Kitchen");
        assert_eq!(config.timings(), Timings::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config(&[
            ("NOWPLAYING_API_BASE_URL", "https://music.example/api/"),
            ("NOWPLAYING_SEEK_DEBOUNCE_MS", "90"),
            ("NOWPLAYING_END_EPSILON_SEC", "0.5"),
            ("NOWPLAYING_SNAPSHOT_PATH", "/tmp/np.json"),
        ]);
        assert_eq!(config.api_base_url, "https://music.example/api");
        assert_eq!(config.image_base_url, "https://music.example");
        assert_eq!(config.timings().seek_debounce, Duration::from_millis(90));
        assert_eq!(config.timings().end_epsilon_sec, 0.5);
        assert_eq!(config.snapshot_path, PathBuf::from("/tmp/np.json"));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = config(&[
            ("NOWPLAYING_VOLUME_DEBOUNCE_MS", "soon"),
            ("NOWPLAYING_END_EPSILON_SEC", "-1"),
            ("NOWPLAYING_API_TIMEOUT_MS", ""),
        ]);
        let defaults = Timings::default();
        assert_eq!(config.timings().volume_debounce, defaults.volume_debounce);
        assert_eq!(config.timings().end_epsilon_sec, defaults.end_epsilon_sec);
        assert_eq!(config.api_timeout, Duration::from_millis(DEFAULT_API_TIMEOUT_MS));
    }

    #[test]
    fn explicit_image_base_wins() {
        let config = config(&[("NOWPLAYING_IMAGE_BASE_URL", "http://cdn.local")]);
        assert_eq!(config.image_base_url, "http://cdn.local");
    }
}
