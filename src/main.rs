//! ingest-core entry point.
//!
//! ## CLI Subcommands
//!
//! - `ingest-core-cli` or `ingest-core-cli serve` - Serve requests (default)
//! - `ingest-core-cli config show|defaults|validate` - Inspect configuration
//! - `ingest-core-cli version` - Print version

use std::process::ExitCode;

use ingest_core::cli::{config_cmd, run_serve};
use ingest_core::config as ingest_config;
use ingest_core::shutdown::ShutdownResult;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    match command {
        "serve" | "" => serve(),
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => {
                    let json = args.get(3).map(|s| s.as_str()) == Some("--json");
                    ExitCode::from(config_cmd::run_show(json) as u8)
                }
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                "validate" => ExitCode::from(config_cmd::run_validate() as u8),
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    ExitCode::FAILURE
                }
            }
        }
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = args.get(2) {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("ingest-core {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn serve() -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return ExitCode::from(2u8);
        }
    };

    let result = runtime.block_on(run_serve(ingest_config::load()));
    // A pending stdin read never returns while the input stays open.
    runtime.shutdown_background();

    match result {
        Ok(ShutdownResult::Complete) => ExitCode::SUCCESS,
        Ok(ShutdownResult::Timeout { remaining }) => {
            eprintln!("Shutdown timed out with {} batches not started", remaining);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::from(2u8)
        }
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "ingest-core - priority-aware, rate-limited batch ingestion v{}

USAGE:
    ingest-core-cli [COMMAND] [OPTIONS]

COMMANDS:
    serve        Serve requests on stdin/stdout (default)
    config       Inspect configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

EXAMPLES:
    ingest-core-cli                      # Serve requests (default)
    echo '{{\"type\":\"ingest\",\"ids\":[1,2,3,4,5],\"priority\":\"HIGH\"}}' | ingest-core-cli
    ingest-core-cli config show --json   # Effective configuration as JSON

ENVIRONMENT:
    INGEST_CORE_BATCH_SIZE        Work items per batch (default: 3)
    INGEST_CORE_RATE_LIMIT_MS     Pause after every batch (default: 5000)
    INGEST_CORE_WORK_LATENCY_MS   Simulated per-item latency (default: 1000)
    INGEST_CORE_MAX_PENDING       Max queued batches, 0 = unbounded (default: 0)
    INGEST_CORE_SHUTDOWN_TIMEOUT  Drain timeout in seconds (default: 30)
    INGEST_CORE_LOG_LEVEL         Log filter (default: info)
    INGEST_CORE_LOG_FORMAT        json or pretty (default: json)
    INGEST_CORE_LOG_FILE          Write logs to a file instead of stderr

EXIT CODES:
    0  Success
    1  Failure / shutdown timed out / config warnings
    2  Startup or I/O error
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "serve" => {
            eprintln!(
                "ingest-core-cli serve - Serve requests

USAGE:
    ingest-core-cli serve

DESCRIPTION:
    Reads one JSON message per stdin line and writes one JSON response
    per stdout line. Logs go to stderr.

    Requests:
      {{\"type\":\"ingest\",\"ids\":[1,2,3],\"priority\":\"MEDIUM\"}}
      {{\"type\":\"status\",\"ingestion_id\":\"<uuid>\"}}

    Responses:
      {{\"code\":201,\"body\":{{\"ingestion_id\":\"<uuid>\"}}}}
      {{\"code\":200,\"body\":{{\"ingestion_id\":...,\"status\":...,\"batches\":[...]}}}}

    On EOF or Ctrl+C, new submissions are refused and queued batches
    are drained before exit, up to INGEST_CORE_SHUTDOWN_TIMEOUT.
"
            );
        }
        "config" => {
            eprintln!(
                "ingest-core-cli config - Inspect configuration

USAGE:
    ingest-core-cli config <SUBCOMMAND>

SUBCOMMANDS:
    show [--json]  Show effective configuration
    defaults       Show default configuration
    validate       Warn about values that fall back to defaults

EXAMPLES:
    ingest-core-cli config show
    INGEST_CORE_BATCH_SIZE=10 ingest-core-cli config validate
"
            );
        }
        _ => {
            eprintln!("No detailed help for '{}'.", command);
            print_usage();
        }
    }
}
