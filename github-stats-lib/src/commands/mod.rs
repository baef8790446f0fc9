//! Command-line interface and orchestration for github-stats
//!
//! This module implements the CLI commands, loads configuration, and wires the
//! GitHub fetcher, the aggregator and the JSON report together.
//!
//! # Implementation Model
//!
//! ## Commands
//!
//! - **stats**: Aggregate a user's commits, created pull requests, reviewed pull
//!   requests and review lead time per repository of an organization, then print
//!   the result as JSON on stdout
//! - **init**: Generate a default configuration file
//!
//! ## Execution Flow
//!
//! The `run` function parses command-line arguments using clap and routes to the
//! appropriate command handler. The `stats` command then:
//!
//! 1. Initializes logging from `--log-level` / `--verbose`
//! 2. Checks the token and date range and loads configuration, all before any
//!    network access
//! 3. Runs the aggregation, racing it against Ctrl-C and the optional
//!    `aggregation_timeout`
//! 4. Writes the JSON report to the host's output stream
//!
//! Failures are written to the host's error stream followed by `Host::exit(1)`.

mod common;
mod config;
mod date_range;
mod host;
mod init;
mod run;
mod stats;

#[cfg(debug_assertions)]
pub use config::Config;

pub use host::Host;
pub use init::{InitArgs, init_config};
pub use run::run;
pub use stats::{StatsArgs, process_stats};
