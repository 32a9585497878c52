use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration loaded from environment variables or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding the exported `overview.json` / `orders.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Referrers starting with any of these (the shop's own domains) are
    /// treated as self-traffic and dropped from the referrer breakdown.
    #[serde(default)]
    pub excluded_referrer_prefixes: Vec<String>,
    /// Order source generated by the system itself, left out of order counts.
    #[serde(default)]
    pub excluded_order_source: Option<String>,
    /// Start in live mode instead of historical.
    #[serde(default)]
    pub live: bool,
    /// Historical period: `day`, `7d`, `30d` or `90d`.
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default = "default_live_window_mins")]
    pub live_window_mins: u32,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_countdown_secs")]
    pub countdown_secs: u32,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_period() -> String {
    "7d".to_string()
}

const fn default_live_window_mins() -> u32 {
    30
}

const fn default_refresh_interval_secs() -> u64 {
    10
}

const fn default_countdown_secs() -> u32 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            excluded_referrer_prefixes: Vec::new(),
            excluded_order_source: None,
            live: false,
            period: default_period(),
            live_window_mins: default_live_window_mins(),
            refresh_interval_secs: default_refresh_interval_secs(),
            countdown_secs: default_countdown_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `INSIGHTS_DATA_DIR` → data_dir
    /// - `INSIGHTS_EXCLUDED_REFERRERS` → excluded_referrer_prefixes (comma separated)
    /// - `INSIGHTS_EXCLUDED_ORDER_SOURCE` → excluded_order_source
    /// - `INSIGHTS_LIVE` → live
    /// - `INSIGHTS_PERIOD` → period
    /// - `INSIGHTS_LIVE_WINDOW` → live_window_mins
    /// - `INSIGHTS_REFRESH_INTERVAL` → refresh_interval_secs
    /// - `INSIGHTS_COUNTDOWN` → countdown_secs
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        // Environment variable overrides
        if let Ok(dir) = std::env::var("INSIGHTS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(val) = std::env::var("INSIGHTS_EXCLUDED_REFERRERS") {
            config.excluded_referrer_prefixes = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(val) = std::env::var("INSIGHTS_EXCLUDED_ORDER_SOURCE") {
            config.excluded_order_source = Some(val).filter(|s| !s.is_empty());
        }
        if let Ok(val) = std::env::var("INSIGHTS_LIVE") {
            config.live = val != "0" && val.to_lowercase() != "false";
        }
        if let Ok(val) = std::env::var("INSIGHTS_PERIOD") {
            config.period = val;
        }
        if let Ok(val) = std::env::var("INSIGHTS_LIVE_WINDOW") {
            if let Ok(m) = val.parse() {
                config.live_window_mins = m;
            }
        }
        if let Ok(val) = std::env::var("INSIGHTS_REFRESH_INTERVAL") {
            if let Ok(s) = val.parse() {
                config.refresh_interval_secs = s;
            }
        }
        if let Ok(val) = std::env::var("INSIGHTS_COUNTDOWN") {
            if let Ok(s) = val.parse() {
                config.countdown_secs = s;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    /// Serializes tests that call `Config::load`, which reads process-wide
    /// environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.excluded_referrer_prefixes.is_empty());
        assert!(config.excluded_order_source.is_none());
        assert!(!config.live);
        assert_eq!(config.period, "7d");
        assert_eq!(config.live_window_mins, 30);
        assert_eq!(config.refresh_interval_secs, 10);
        assert_eq!(config.countdown_secs, 10);
    }

    #[test]
    fn test_load_from_toml() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        write!(
            file,
            r#"
data_dir = "/srv/insights"
excluded_referrer_prefixes = ["https://admin.shop.example.com", "http://localhost"]
excluded_order_source = "subscription-renewal"
live = true
period = "30d"
live_window_mins = 15
refresh_interval_secs = 5
countdown_secs = 5
"#
        )
        .unwrap();

        let config = Config::load(Some(&config_path));
        assert_eq!(config.data_dir, PathBuf::from("/srv/insights"));
        assert_eq!(
            config.excluded_referrer_prefixes,
            vec!["https://admin.shop.example.com", "http://localhost"]
        );
        assert_eq!(
            config.excluded_order_source.as_deref(),
            Some("subscription-renewal")
        );
        assert!(config.live);
        assert_eq!(config.period, "30d");
        assert_eq!(config.live_window_mins, 15);
        assert_eq!(config.refresh_interval_secs, 5);
        assert_eq!(config.countdown_secs, 5);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let config = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert_eq!(config.refresh_interval_secs, 10);
    }

    #[test]
    fn test_load_no_path_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let config = Config::load(None);
        assert_eq!(config.live_window_mins, 30);
        assert_eq!(config.period, "7d");
    }

    #[test]
    fn test_env_var_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();

        let orig = std::env::var("INSIGHTS_EXCLUDED_REFERRERS").ok();

        std::env::set_var(
            "INSIGHTS_EXCLUDED_REFERRERS",
            "https://a.example.com, https://b.example.com,",
        );
        let config = Config::load(None);
        assert_eq!(
            config.excluded_referrer_prefixes,
            vec!["https://a.example.com", "https://b.example.com"]
        );

        match orig {
            Some(v) => std::env::set_var("INSIGHTS_EXCLUDED_REFERRERS", v),
            None => std::env::remove_var("INSIGHTS_EXCLUDED_REFERRERS"),
        }
    }

    #[test]
    fn test_invalid_toml_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "this is not valid toml {{{").unwrap();

        let config = Config::load(Some(&config_path));
        assert_eq!(config.countdown_secs, 10);
    }
}
