//! Config CLI subcommands: show, defaults, validate.
//!
//! These commands read configuration directly from environment variables
//! and never start the scheduler.

use crate::config::{self, EffectiveConfig, EnvConfig};
use crate::telemetry::{build_filter, LogFormat};

const NUMERIC_KEYS: &[&str] = &[
    "INGEST_CORE_BATCH_SIZE",
    "INGEST_CORE_RATE_LIMIT_MS",
    "INGEST_CORE_WORK_LATENCY_MS",
    "INGEST_CORE_MAX_PENDING",
    "INGEST_CORE_SHUTDOWN_TIMEOUT",
];

/// Print effective config to stdout, as `KEY=value` lines or JSON.
pub fn run_show(json: bool) -> i32 {
    let cfg = config::load().effective_config();
    if json {
        match serde_json::to_string_pretty(&cfg) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Failed to encode config: {}", e);
                return 1;
            }
        }
    } else {
        print_config(&cfg);
    }
    0
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    print_config(&EnvConfig::default().effective_config());
}

/// Check the environment for values that would silently fall back.
///
/// Returns 0 if valid, 1 if any warnings are found.
pub fn run_validate() -> i32 {
    let warnings = collect_warnings();
    for warning in &warnings {
        eprintln!("WARNING: {}", warning);
    }
    if warnings.is_empty() {
        println!("Configuration is valid.");
        0
    } else {
        1
    }
}

fn collect_warnings() -> Vec<String> {
    let mut warnings = Vec::new();

    for key in NUMERIC_KEYS {
        if let Ok(raw) = std::env::var(key) {
            if raw.trim().parse::<u64>().is_err() {
                warnings.push(format!("{}={:?} is not a number; using default", key, raw));
            }
        }
    }

    if let Ok(raw) = std::env::var("INGEST_CORE_LOG_FORMAT") {
        if raw.trim().parse::<LogFormat>().is_err() {
            warnings.push(format!(
                "INGEST_CORE_LOG_FORMAT={:?} is not json or pretty; using json",
                raw
            ));
        }
    }

    let env = config::load();
    if let Err(e) = build_filter(&env.log) {
        warnings.push(format!("INGEST_CORE_LOG_LEVEL: {}", e));
    }
    if env.scheduler.worker.rate_limit.is_zero() {
        warnings.push("INGEST_CORE_RATE_LIMIT_MS is 0; batches are not rate limited".into());
    }

    warnings
}

fn print_config(cfg: &EffectiveConfig) {
    for line in cfg.to_env_lines() {
        println!("{}", line);
    }
}
