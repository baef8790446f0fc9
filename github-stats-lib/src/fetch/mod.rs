//! Data sources for contribution statistics
//!
//! The [`Fetcher`] trait is the contract the aggregation engine consumes. Each
//! operation runs one kind of query for a user within an organization, paginates
//! until the upstream source is exhausted, and returns one fully materialized map
//! keyed by the repository's `owner/repo` name.
//!
//! [`GitHubFetcher`] implements the contract against the GitHub REST API (commit
//! search) and GraphQL API (pull request search). Authentication, rate-limit
//! waits and pagination all live behind the trait; callers only ever see
//! complete maps or an error.
//!
//! Date filters are opaque query fragments (for example ` created:2024-01-01..*`)
//! appended verbatim to the search query. An empty fragment means unbounded
//! history.

mod client;
mod github;
mod graphql;
mod resilient_http;

pub use github::{FetcherSettings, GitHubFetcher};

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Number of contributions of one kind, keyed by repository name.
pub type RepoCounts = HashMap<String, u64>;

/// Lead time data for the pull requests of each repository, in upstream order.
pub type LeadTimesByRepo = HashMap<String, Vec<PrLeadTimeDatum>>;

/// Creation and last review time of a single pull request.
///
/// Pull requests without any submitted review never produce a datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrLeadTimeDatum {
    pub created_at: DateTime<Utc>,
    pub last_reviewed_at: DateTime<Utc>,
}

impl PrLeadTimeDatum {
    #[must_use]
    pub const fn new(created_at: DateTime<Utc>, last_reviewed_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            last_reviewed_at,
        }
    }

    /// Time from creation to the last review, in seconds. Never negative.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "acceptable for duration")]
    pub fn lead_time_seconds(&self) -> f64 {
        let millis = (self.last_reviewed_at - self.created_at).num_milliseconds();
        (millis as f64 / 1000.0).max(0.0)
    }
}

/// Source of per-repository contribution data.
///
/// Implementations must be safe to call concurrently through a shared reference:
/// the aggregator drives all four operations at the same time.
pub trait Fetcher: Send + Sync {
    /// Count commits authored by `user` per repository.
    fn fetch_commits(&self, org: &str, user: &str, date_filter: &str) -> impl Future<Output = crate::Result<RepoCounts>> + Send;

    /// Count pull requests created by `user` per repository.
    fn fetch_created_prs(&self, org: &str, user: &str, date_filter: &str) -> impl Future<Output = crate::Result<RepoCounts>> + Send;

    /// Count pull requests reviewed by `user` per repository.
    fn fetch_reviewed_prs(&self, org: &str, user: &str, date_filter: &str) -> impl Future<Output = crate::Result<RepoCounts>> + Send;

    /// Collect creation and last review times for closed pull requests authored by `user`.
    fn fetch_pr_lead_times(
        &self,
        org: &str,
        user: &str,
        date_filter: &str,
    ) -> impl Future<Output = crate::Result<LeadTimesByRepo>> + Send;
}
