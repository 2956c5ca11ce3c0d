//! CLI module for ingest-core commands.
//!
//! ## Usage
//!
//! ```bash
//! ingest-core-cli serve            # Serve requests on stdin/stdout
//! ingest-core-cli config show      # Effective configuration
//! ingest-core-cli config defaults  # Built-in defaults
//! ingest-core-cli config validate  # Warn about ignored values
//! ```

pub mod config_cmd;
pub mod serve;

pub use serve::{run_serve, serve, serve_lines, ServeError};
