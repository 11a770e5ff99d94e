use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 5000;
const DEFAULT_COMPACT_THRESHOLD: u64 = 1000;
const WAL_FILE_NAME: &str = "bookings.wal";

/// Runtime settings, read from `PITCHTIME_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Prometheus listener port; metrics are off when unset.
    pub metrics_port: Option<u16>,
    pub sweep_interval: Duration,
    pub compact_threshold: u64,
    /// Optional JSON list of venues to seed the in-memory directory.
    pub venues_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            metrics_port: None,
            sweep_interval: Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS),
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
            venues_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("PITCHTIME_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into());
        let metrics_port: Option<u16> = lookup("PITCHTIME_METRICS_PORT").and_then(|s| s.parse().ok());
        let sweep_ms: u64 = lookup("PITCHTIME_SWEEP_INTERVAL_MS")
            .and_then(|s| s.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS);
        let compact_threshold: u64 = lookup("PITCHTIME_COMPACT_THRESHOLD")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_COMPACT_THRESHOLD);
        let venues_file = lookup("PITCHTIME_VENUES_FILE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Self {
            data_dir: PathBuf::from(data_dir),
            metrics_port,
            sweep_interval: Duration::from_millis(sweep_ms),
            compact_threshold,
            venues_file,
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(WAL_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(lookup(&[]));
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.wal_path(), PathBuf::from("./data/bookings.wal"));
    }

    #[test]
    fn reads_all_keys() {
        let cfg = Config::from_lookup(lookup(&[
            ("PITCHTIME_DATA_DIR", "/var/lib/pitchtime"),
            ("PITCHTIME_METRICS_PORT", "9100"),
            ("PITCHTIME_SWEEP_INTERVAL_MS", "250"),
            ("PITCHTIME_COMPACT_THRESHOLD", "50"),
            ("PITCHTIME_VENUES_FILE", "venues.json"),
        ]));
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/pitchtime"));
        assert_eq!(cfg.metrics_port, Some(9100));
        assert_eq!(cfg.sweep_interval, Duration::from_millis(250));
        assert_eq!(cfg.compact_threshold, 50);
        assert_eq!(cfg.venues_file, Some(PathBuf::from("venues.json")));
    }

    #[test]
    fn garbage_falls_back() {
        let cfg = Config::from_lookup(lookup(&[
            ("PITCHTIME_METRICS_PORT", "not-a-port"),
            ("PITCHTIME_SWEEP_INTERVAL_MS", "0"),
            ("PITCHTIME_COMPACT_THRESHOLD", "-3"),
            ("PITCHTIME_VENUES_FILE", ""),
        ]));
        assert_eq!(cfg, Config::default());
    }
}
