use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::{EngineSettings, RetryPolicy, default_event_types};
use crate::model::EventType;

/// Server configuration, read from `ROOMLEDGER_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub max_connections: usize,
    pub metrics_port: Option<u16>,
    pub compact_threshold: u64,
    pub compact_interval: Duration,
    pub lock_wait: Duration,
    pub commit_timeout: Duration,
    pub read_retries: usize,
    pub event_types: Vec<EventType>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5480,
            data_dir: PathBuf::from("./data"),
            max_connections: 256,
            metrics_port: None,
            compact_threshold: 1000,
            compact_interval: Duration::from_secs(30),
            lock_wait: Duration::from_millis(2000),
            commit_timeout: Duration::from_millis(5000),
            read_retries: 3,
            event_types: default_event_types(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Malformed values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let parsed = ParsedLookup(&lookup);
        Self {
            bind: lookup("ROOMLEDGER_BIND").unwrap_or(d.bind),
            port: parsed.get("ROOMLEDGER_PORT").unwrap_or(d.port),
            data_dir: lookup("ROOMLEDGER_DATA_DIR").map(PathBuf::from).unwrap_or(d.data_dir),
            max_connections: parsed.get::<usize>("ROOMLEDGER_MAX_CONNECTIONS")
                .filter(|&n| n > 0)
                .unwrap_or(d.max_connections),
            metrics_port: parsed.get("ROOMLEDGER_METRICS_PORT"),
            compact_threshold: parsed.get("ROOMLEDGER_COMPACT_THRESHOLD").unwrap_or(d.compact_threshold),
            compact_interval: parsed.get::<u64>("ROOMLEDGER_COMPACT_INTERVAL_SECS")
                .filter(|&s| s > 0)
                .map(Duration::from_secs)
                .unwrap_or(d.compact_interval),
            lock_wait: parsed.get("ROOMLEDGER_LOCK_WAIT_MS")
                .map(Duration::from_millis)
                .unwrap_or(d.lock_wait),
            commit_timeout: parsed.get("ROOMLEDGER_COMMIT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(d.commit_timeout),
            read_retries: parsed.get("ROOMLEDGER_READ_RETRIES").unwrap_or(d.read_retries),
            event_types: lookup("ROOMLEDGER_EVENT_TYPES")
                .and_then(|s| parse_event_types(&s))
                .unwrap_or(d.event_types),
        }
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("roomledger.wal")
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            lock_wait: self.lock_wait,
            commit_timeout: self.commit_timeout,
            read_retry: RetryPolicy::default().with_max_retries(self.read_retries),
            event_types: self.event_types.clone(),
        }
    }
}

fn parse_trimmed<T: FromStr>(s: &str) -> Option<T> {
    s.trim().parse().ok()
}

struct ParsedLookup<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> ParsedLookup<'_, F> {
    fn get<T: FromStr>(&self, key: &str) -> Option<T> {
        (self.0)(key).and_then(|s| parse_trimmed(&s))
    }
}

/// `"1:Wedding,2:Conference"`. Any malformed pair rejects the whole list.
pub fn parse_event_types(s: &str) -> Option<Vec<EventType>> {
    let mut types = Vec::new();
    for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (id, name) = pair.split_once(':')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        types.push(EventType {
            id: parse_trimmed(id)?,
            name: name.to_string(),
        });
    }
    if types.is_empty() { None } else { Some(types) }
}
