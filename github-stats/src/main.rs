//! Command-line entry point for `github-stats`.
//!
//! Reports how much a GitHub user contributed to each repository of an
//! organization: commits, pull requests opened and reviewed, and optionally
//! percentiles of the time their pull requests waited for a final review.
//! The report is printed to stdout as pretty JSON sorted by repository name.
//!
//! ```text
//! github-stats stats --org acme --user octocat --from 2024/01/01 --to 2024/12/31
//! github-stats init
//! ```
//!
//! The token comes from `--github-token` or `GITHUB_TOKEN`. All of the work
//! lives in `github-stats-lib`; this binary binds it to the process streams
//! and exit status so errors print to stderr and exit with status 1.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use github_stats_lib::{Host, run};
use std::io::Write;
use std::io::{stderr, stdout};

/// Host bound to the process's stdout, stderr and exit status.
#[derive(Debug, Clone, Default)]
struct ProcessHost;

#[cfg_attr(coverage_nightly, coverage(off))]
impl Host for ProcessHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }

    fn exit(&mut self, code: i32) {
        std::process::exit(code);
    }
}

#[tokio::main]
#[cfg_attr(coverage_nightly, coverage(off))]
async fn main() -> Result<(), ohno::AppError> {
    run(&mut ProcessHost, std::env::args()).await
}
