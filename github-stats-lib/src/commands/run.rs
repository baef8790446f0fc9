//! Command dispatch logic for github-stats

use super::{InitArgs, StatsArgs, init_config, process_stats};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};
use std::io::Write;

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "github-stats", version, author, long_about = None)]
#[command(about = "Aggregate a GitHub user's contributions per repository within an organization")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect per-repository statistics and print them as JSON
    Stats(Box<StatsArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
///
/// Help and version output go to the host's output stream with exit code 0;
/// usage errors go to the error stream with clap's exit code.
///
/// # Errors
///
/// Returns an error if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let rendered = e.render();
            if e.use_stderr() {
                let _ = write!(host.error(), "{rendered}");
            } else {
                let _ = write!(host.output(), "{rendered}");
            }
            host.exit(e.exit_code());
            return Ok(());
        }
    };

    match &cli.command {
        Command::Stats(stats_args) => process_stats(host, stats_args).await,
        Command::Init(init_args) => init_config(host, init_args),
    }
}
