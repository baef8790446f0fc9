use super::RepoStats;
use crate::Result;
use crate::fetch::{Fetcher, LeadTimesByRepo, RepoCounts};
use ohno::AppError;
use std::collections::HashMap;

const LOG_TARGET: &str = " aggregate";

/// Parameters of one aggregation call.
#[derive(Debug, Clone, Default)]
pub struct AggregateRequest {
    pub org: String,
    pub user: String,

    /// Query fragment appended to the commit search, for example ` author-date:2024-01-01..*`
    pub commit_date_filter: String,

    /// Query fragment appended to the pull request searches, for example ` created:2024-01-01..*`
    pub pr_date_filter: String,

    pub include_lead_time: bool,
}

/// Combines every [`Fetcher`] operation into one sorted list of [`RepoStats`].
#[derive(Debug)]
pub struct Aggregator<F> {
    fetcher: F,
}

impl<F: Fetcher> Aggregator<F> {
    #[must_use]
    pub const fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Fetch all data kinds concurrently and merge them.
    ///
    /// The first fetch to fail fails the whole aggregation; the remaining fetches
    /// are dropped and nothing is merged.
    pub async fn aggregate(&self, request: &AggregateRequest) -> Result<Vec<RepoStats>> {
        log::info!(target: LOG_TARGET, "Starting data aggregation...");

        let org = request.org.as_str();
        let user = request.user.as_str();

        let lead_times = async {
            if request.include_lead_time {
                self.fetcher.fetch_pr_lead_times(org, user, &request.pr_date_filter).await.map(Some)
            } else {
                log::debug!(target: LOG_TARGET, "Lead time analysis disabled, skipping review data");
                Ok(None)
            }
        };

        let (commits, created_prs, reviewed_prs, lead_times) = tokio::try_join!(
            self.fetcher.fetch_commits(org, user, &request.commit_date_filter),
            self.fetcher.fetch_created_prs(org, user, &request.pr_date_filter),
            self.fetcher.fetch_reviewed_prs(org, user, &request.pr_date_filter),
            lead_times,
        )?;

        log::info!(target: LOG_TARGET, "All data fetched successfully.");

        let stats = merge(commits, created_prs, reviewed_prs, lead_times);

        log::info!(target: LOG_TARGET, "Aggregation complete. {} repositories found.", stats.len());
        Ok(stats)
    }

    /// Like [`Self::aggregate`], but gives up as soon as `cancel` resolves.
    ///
    /// The error produced by `cancel` becomes the aggregation's error and all
    /// in-flight fetches are dropped.
    pub async fn aggregate_with_cancellation(
        &self,
        request: &AggregateRequest,
        cancel: impl Future<Output = AppError>,
    ) -> Result<Vec<RepoStats>> {
        tokio::select! {
            result = self.aggregate(request) => result,
            err = cancel => {
                log::debug!(target: LOG_TARGET, "Aggregation cancelled: {err}");
                Err(err)
            }
        }
    }
}

/// Union of all source maps, one record per repository name, sorted by name.
fn merge(commits: RepoCounts, created_prs: RepoCounts, reviewed_prs: RepoCounts, lead_times: Option<LeadTimesByRepo>) -> Vec<RepoStats> {
    let mut by_name: HashMap<String, RepoStats> = HashMap::new();

    for (name, count) in commits {
        by_name.entry(name).or_insert_with_key(|name| RepoStats::new(name.as_str())).commits = count;
    }

    for (name, count) in created_prs {
        by_name.entry(name).or_insert_with_key(|name| RepoStats::new(name.as_str())).created_prs = count;
    }

    for (name, count) in reviewed_prs {
        by_name.entry(name).or_insert_with_key(|name| RepoStats::new(name.as_str())).reviewed_prs = count;
    }

    for (name, data) in lead_times.unwrap_or_default() {
        by_name
            .entry(name)
            .or_insert_with_key(|name| RepoStats::new(name.as_str()))
            .lead_time_samples
            .extend(data.iter().map(crate::fetch::PrLeadTimeDatum::lead_time_seconds));
    }

    let mut stats: Vec<RepoStats> = by_name.into_values().collect();
    stats.sort_by(|a, b| a.name.cmp(&b.name));
    stats
}
