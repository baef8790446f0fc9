use crate::stats::{LeadTimePercentiles, RepoStats, summarize};
use serde::Serialize;

/// Serialized form of one repository's statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord<'a> {
    pub name: &'a str,
    pub commits: u64,
    pub created_prs: u64,
    pub reviewed_prs: u64,

    #[serde(skip_serializing_if = "is_zero")]
    pub analyzed_pr_count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_time_percentiles_hours: Option<LeadTimePercentiles>,
}

#[expect(clippy::trivially_copy_pass_by_ref, reason = "signature required by serde")]
const fn is_zero(count: &usize) -> bool {
    *count == 0
}

impl<'a> From<&'a RepoStats> for OutputRecord<'a> {
    fn from(stats: &'a RepoStats) -> Self {
        Self {
            name: &stats.name,
            commits: stats.commits,
            created_prs: stats.created_prs,
            reviewed_prs: stats.reviewed_prs,
            analyzed_pr_count: stats.analyzed_pr_count(),
            lead_time_percentiles_hours: summarize(&stats.lead_time_samples),
        }
    }
}
