use super::Host;
use super::common::{LogLevel, init_logging};
use super::config::Config;
use super::date_range::{DateRange, parse_date};
use crate::Result;
use crate::fetch::GitHubFetcher;
use crate::reports::generate_json;
use crate::stats::{AggregateRequest, Aggregator};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use clap::{ArgAction, Parser};
use core::fmt::Display;
use core::time::Duration;
use ohno::{AppError, IntoAppError, app_err, bail};
use std::io::Write;

const LOG_TARGET: &str = "     stats";

#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// GitHub organization to search
    #[arg(long, short = 'o', value_name = "ORG")]
    pub org: String,

    /// GitHub user whose contributions are counted
    #[arg(long, short = 'u', value_name = "USER")]
    pub user: String,

    /// Only count contributions on or after this date
    #[arg(long, value_name = "YYYY/MM/DD", value_parser = parse_date)]
    pub from: Option<NaiveDate>,

    /// Only count contributions on or before this date
    #[arg(long, value_name = "YYYY/MM/DD", value_parser = parse_date)]
    pub to: Option<NaiveDate>,

    /// Analyze review lead time of the user's closed pull requests
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub lead_time: bool,

    /// Show progress information on stderr (same as `--log-level info`)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Path to configuration file (default is `github-stats.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

/// Everything needed to run one aggregation, checked before any network call.
#[derive(Debug)]
struct Prepared {
    fetcher: GitHubFetcher,
    request: AggregateRequest,
    aggregation_timeout: Option<Duration>,
}

fn prepare(args: &StatsArgs) -> Result<Prepared> {
    let token = match args.github_token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => token,
        _ => bail!("GITHUB_TOKEN environment variable is not set."),
    };

    let range = DateRange::new(args.from, args.to)?;
    let config = Config::load(Utf8Path::new("."), args.config.as_ref())?;
    let fetcher = GitHubFetcher::new(token, config.fetcher_settings()?)?;

    Ok(Prepared {
        fetcher,
        request: AggregateRequest {
            org: args.org.clone(),
            user: args.user.clone(),
            commit_date_filter: range.commit_filter(),
            pr_date_filter: range.pr_filter(),
            include_lead_time: args.lead_time,
        },
        aggregation_timeout: config.aggregation_timeout,
    })
}

fn fail<H: Host>(host: &mut H, message: impl Display) {
    let _ = writeln!(host.error(), "{message}");
    host.exit(1);
}

/// Resolves once the user presses Ctrl-C.
async fn interrupted() -> AppError {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!(target: LOG_TARGET, "Unable to listen for Ctrl-C: {e}");
        core::future::pending::<()>().await;
    }

    app_err!("aggregation cancelled")
}

/// Resolves when the aggregation should be abandoned.
async fn cancellation(timeout: Option<Duration>) -> AppError {
    match timeout {
        Some(limit) => {
            tokio::select! {
                err = interrupted() => err,
                () = tokio::time::sleep(limit) => app_err!("aggregation timed out after {limit:?}"),
            }
        }
        None => interrupted().await,
    }
}

pub async fn process_stats<H: Host>(host: &mut H, args: &StatsArgs) -> Result<()> {
    init_logging(LogLevel::resolve(args.log_level, args.verbose));

    let prepared = match prepare(args) {
        Ok(prepared) => prepared,
        Err(e) => {
            fail(host, format_args!("Error: {e}"));
            return Ok(());
        }
    };

    log::info!(target: LOG_TARGET, "Analyzing contributions of '{}' in organization '{}'", args.user, args.org);

    let aggregator = Aggregator::new(prepared.fetcher);
    let stats = match aggregator
        .aggregate_with_cancellation(&prepared.request, cancellation(prepared.aggregation_timeout))
        .await
    {
        Ok(stats) => stats,
        Err(e) => {
            fail(host, format_args!("Failed to aggregate stats: {e}"));
            return Ok(());
        }
    };

    let mut report = String::new();
    if let Err(e) = generate_json(&stats, &mut report) {
        fail(host, format_args!("Error: unable to serialize results: {e}"));
        return Ok(());
    }

    write!(host.output(), "{report}").into_app_err("writing report")?;
    Ok(())
}
