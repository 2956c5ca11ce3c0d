//! Runtime configuration loading from environment variables.
//!
//! All configuration values are loaded from `INGEST_CORE_*` environment
//! variables with sensible defaults. Invalid values fall back to defaults
//! without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `INGEST_CORE_BATCH_SIZE` | 3 | Work items per batch |
//! | `INGEST_CORE_RATE_LIMIT_MS` | 5000 | Pause after every batch (ms) |
//! | `INGEST_CORE_WORK_LATENCY_MS` | 1000 | Simulated per-item call latency (ms) |
//! | `INGEST_CORE_MAX_PENDING` | 0 | Max queued batches (0 = unbounded) |
//! | `INGEST_CORE_SHUTDOWN_TIMEOUT` | 30 | Graceful shutdown timeout (secs) |
//! | `INGEST_CORE_LOG_LEVEL` | info | Log filter directive |
//! | `INGEST_CORE_LOG_FORMAT` | json | `json` or `pretty` |
//! | `INGEST_CORE_LOG_FILE` | unset | Log to this file instead of stderr |

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::scheduler::{
    BatchConfig, BatchQueueConfig, SchedulerConfig, WorkerConfig, DEFAULT_BATCH_SIZE,
    DEFAULT_RATE_LIMIT, DEFAULT_WORK_LATENCY,
};
use crate::telemetry::{LogConfig, LogFormat};

pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Effective runtime configuration summary (serializable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    pub batch_size: usize,
    pub rate_limit_ms: u64,
    pub work_latency_ms: u64,
    pub max_pending: usize,
    pub shutdown_timeout_secs: u64,
    pub log_level: String,
    pub log_format: String,
    pub log_file: Option<PathBuf>,
}

impl EffectiveConfig {
    /// `KEY=value` lines in environment variable form.
    pub fn to_env_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("INGEST_CORE_BATCH_SIZE={}", self.batch_size),
            format!("INGEST_CORE_RATE_LIMIT_MS={}", self.rate_limit_ms),
            format!("INGEST_CORE_WORK_LATENCY_MS={}", self.work_latency_ms),
            format!("INGEST_CORE_MAX_PENDING={}", self.max_pending),
            format!("INGEST_CORE_SHUTDOWN_TIMEOUT={}", self.shutdown_timeout_secs),
            format!("INGEST_CORE_LOG_LEVEL={}", self.log_level),
            format!("INGEST_CORE_LOG_FORMAT={}", self.log_format),
        ];
        if let Some(path) = &self.log_file {
            lines.push(format!("INGEST_CORE_LOG_FILE={}", path.display()));
        }
        lines
    }
}

/// All runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub scheduler: SchedulerConfig,
    pub work_latency: Duration,
    pub shutdown_timeout: Duration,
    pub log: LogConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            work_latency: DEFAULT_WORK_LATENCY,
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            log: LogConfig::default(),
        }
    }
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_millis(key: &str, default: Duration) -> Duration {
    Duration::from_millis(parse_u64(key, default.as_millis() as u64))
}

fn load_scheduler_config() -> SchedulerConfig {
    let batch_size = parse_usize("INGEST_CORE_BATCH_SIZE", DEFAULT_BATCH_SIZE);
    let max_pending = parse_usize("INGEST_CORE_MAX_PENDING", 0);
    let rate_limit = parse_millis("INGEST_CORE_RATE_LIMIT_MS", DEFAULT_RATE_LIMIT);
    SchedulerConfig {
        batch: BatchConfig::with_size(batch_size),
        queue: BatchQueueConfig { max_pending },
        worker: WorkerConfig { rate_limit },
    }
}

fn load_log_config() -> LogConfig {
    let level = std::env::var("INGEST_CORE_LOG_LEVEL")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    let format = std::env::var("INGEST_CORE_LOG_FORMAT")
        .ok()
        .and_then(|v| v.trim().parse::<LogFormat>().ok())
        .unwrap_or_default();
    let output_path = std::env::var_os("INGEST_CORE_LOG_FILE")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    LogConfig {
        format,
        level,
        output_path,
    }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    let shutdown_secs = parse_u64("INGEST_CORE_SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT_SECS);
    let shutdown_secs = shutdown_secs.max(1);

    EnvConfig {
        scheduler: load_scheduler_config(),
        work_latency: parse_millis("INGEST_CORE_WORK_LATENCY_MS", DEFAULT_WORK_LATENCY),
        shutdown_timeout: Duration::from_secs(shutdown_secs),
        log: load_log_config(),
    }
}

impl EnvConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            batch_size: self.scheduler.batch.batch_size,
            rate_limit_ms: self.scheduler.worker.rate_limit.as_millis() as u64,
            work_latency_ms: self.work_latency.as_millis() as u64,
            max_pending: self.scheduler.queue.max_pending,
            shutdown_timeout_secs: self.shutdown_timeout.as_secs(),
            log_level: self.log.level.clone(),
            log_format: self.log.format.as_str().to_string(),
            log_file: self.log.output_path.clone(),
        }
    }
}

/// Serializes env-mutating tests across modules.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_KEYS: &[&str] = &[
        "INGEST_CORE_BATCH_SIZE",
        "INGEST_CORE_RATE_LIMIT_MS",
        "INGEST_CORE_WORK_LATENCY_MS",
        "INGEST_CORE_MAX_PENDING",
        "INGEST_CORE_SHUTDOWN_TIMEOUT",
        "INGEST_CORE_LOG_LEVEL",
        "INGEST_CORE_LOG_FORMAT",
        "INGEST_CORE_LOG_FILE",
    ];

    fn clear_env_vars() {
        for k in ENV_KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn test_defaults_are_sensible() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        let cfg = load();
        assert_eq!(cfg.scheduler.batch.batch_size, 3);
        assert_eq!(cfg.scheduler.worker.rate_limit, Duration::from_millis(5000));
        assert_eq!(cfg.scheduler.queue.max_pending, 0);
        assert!(!cfg.scheduler.queue.is_bounded());
        assert_eq!(cfg.work_latency, Duration::from_millis(1000));
        assert_eq!(cfg.shutdown_timeout.as_secs(), 30);
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert!(cfg.log.output_path.is_none());
    }

    #[test]
    fn test_env_vars_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        std::env::set_var("INGEST_CORE_BATCH_SIZE", "10");
        std::env::set_var("INGEST_CORE_RATE_LIMIT_MS", "250");
        std::env::set_var("INGEST_CORE_WORK_LATENCY_MS", "5");
        std::env::set_var("INGEST_CORE_MAX_PENDING", "64");
        std::env::set_var("INGEST_CORE_SHUTDOWN_TIMEOUT", "60");
        std::env::set_var("INGEST_CORE_LOG_LEVEL", "ingest_core=debug");
        std::env::set_var("INGEST_CORE_LOG_FORMAT", "Pretty");
        std::env::set_var("INGEST_CORE_LOG_FILE", "/tmp/ingest.log");
        let cfg = load();
        assert_eq!(cfg.scheduler.batch.batch_size, 10);
        assert_eq!(cfg.scheduler.worker.rate_limit, Duration::from_millis(250));
        assert_eq!(cfg.work_latency, Duration::from_millis(5));
        assert_eq!(cfg.scheduler.queue.max_pending, 64);
        assert_eq!(cfg.shutdown_timeout.as_secs(), 60);
        assert_eq!(cfg.log.level, "ingest_core=debug");
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        assert_eq!(cfg.log.output_path, Some(PathBuf::from("/tmp/ingest.log")));
        clear_env_vars();
    }

    #[test]
    fn test_invalid_env_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        std::env::set_var("INGEST_CORE_BATCH_SIZE", "three");
        std::env::set_var("INGEST_CORE_RATE_LIMIT_MS", "-1");
        std::env::set_var("INGEST_CORE_LOG_FORMAT", "xml");
        let cfg = load();
        assert_eq!(cfg.scheduler.batch.batch_size, 3);
        assert_eq!(cfg.scheduler.worker.rate_limit, DEFAULT_RATE_LIMIT);
        assert_eq!(cfg.log.format, LogFormat::Json);
        clear_env_vars();
    }

    #[test]
    fn test_floors_are_applied() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        std::env::set_var("INGEST_CORE_BATCH_SIZE", "0");
        std::env::set_var("INGEST_CORE_SHUTDOWN_TIMEOUT", "0");
        std::env::set_var("INGEST_CORE_RATE_LIMIT_MS", "0");
        let cfg = load();
        assert_eq!(cfg.scheduler.batch.batch_size, 1, "batch size must have floor");
        assert_eq!(cfg.shutdown_timeout.as_secs(), 1);
        assert_eq!(cfg.scheduler.worker.rate_limit, Duration::ZERO);
        clear_env_vars();
    }

    #[test]
    fn test_effective_config_matches_loaded() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env_vars();
        let eff = load().effective_config();
        assert_eq!(eff, EnvConfig::default().effective_config());
        assert_eq!(
            eff.to_env_lines(),
            vec![
                "INGEST_CORE_BATCH_SIZE=3",
                "INGEST_CORE_RATE_LIMIT_MS=5000",
                "INGEST_CORE_WORK_LATENCY_MS=1000",
                "INGEST_CORE_MAX_PENDING=0",
                "INGEST_CORE_SHUTDOWN_TIMEOUT=30",
                "INGEST_CORE_LOG_LEVEL=info",
                "INGEST_CORE_LOG_FORMAT=json",
            ]
        );

        let json = serde_json::to_value(&eff).unwrap();
        assert_eq!(json["batch_size"], 3);
        assert_eq!(json["log_file"], serde_json::Value::Null);
    }
}
