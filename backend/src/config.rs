use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HISTORY_CAP: usize = 100;
pub const DEFAULT_TRACK_CAP: usize = 500;
pub const DEFAULT_OFFLINE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_STATUS_DISPLAY_MS: u64 = 10_000;

const DEFAULT_HTTP_PORT: u16 = 3000;
const DEFAULT_FEED_URL: &str = "ws://127.0.0.1:5000/ws";
const DEFAULT_ASSETS_DIR: &str = "./backend/assets";
const DEFAULT_STATIC_DIR: &str = "./frontend/dist/public";

/// Runtime configuration, environment-derived with compiled defaults.
/// Values that fail to parse fall back to their default.
#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: SocketAddr,
    pub feed_url: String,
    pub simulate: bool,
    pub history_cap: usize,
    pub track_cap: usize,
    pub offline_timeout: Duration,
    pub status_display: Duration,
    pub assets_dir: PathBuf,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let bind = get("HTTP_BIND")
            .and_then(|v| v.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = get("HTTP_PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_HTTP_PORT);

        Self {
            http_addr: SocketAddr::new(bind, port),
            feed_url: get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            simulate: get("FEED_SIMULATE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            history_cap: get("HISTORY_CAP")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HISTORY_CAP),
            track_cap: get("TRACK_CAP")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TRACK_CAP),
            offline_timeout: Duration::from_millis(
                get("OFFLINE_TIMEOUT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_OFFLINE_TIMEOUT_MS),
            ),
            status_display: Duration::from_millis(
                get("STATUS_DISPLAY_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_STATUS_DISPLAY_MS),
            ),
            assets_dir: get("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR)),
            static_dir: get("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = Config::from_lookup(|_| None);
        assert_eq!(cfg.http_addr.port(), DEFAULT_HTTP_PORT);
        assert_eq!(cfg.feed_url, DEFAULT_FEED_URL);
        assert!(!cfg.simulate);
        assert_eq!(cfg.history_cap, 100);
        assert_eq!(cfg.track_cap, 500);
        assert_eq!(cfg.offline_timeout, Duration::from_millis(5_000));
        assert_eq!(cfg.status_display, Duration::from_millis(10_000));
    }

    #[test]
    fn overrides_and_bad_values() {
        let cfg = Config::from_lookup(|key| match key {
            "HTTP_PORT" => Some("8080".into()),
            "FEED_SIMULATE" => Some("true".into()),
            "HISTORY_CAP" => Some("not-a-number".into()),
            "OFFLINE_TIMEOUT_MS" => Some("250".into()),
            _ => None,
        });
        assert_eq!(cfg.http_addr.port(), 8080);
        assert!(cfg.simulate);
        // unparsable value falls back, it does not abort startup
        assert_eq!(cfg.history_cap, DEFAULT_HISTORY_CAP);
        assert_eq!(cfg.offline_timeout, Duration::from_millis(250));
    }
}
