use super::percentiles::is_valid_sample;

/// Contributions of one user to one repository.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RepoStats {
    /// Full `owner/repo` name as reported upstream
    pub name: String,
    pub commits: u64,
    pub created_prs: u64,
    pub reviewed_prs: u64,

    /// Seconds from creation to last review, one per analyzed pull request
    pub lead_time_samples: Vec<f64>,
}

impl RepoStats {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Number of pull requests whose lead time is counted in the percentiles
    #[must_use]
    pub fn analyzed_pr_count(&self) -> usize {
        self.lead_time_samples.iter().filter(|&&s| is_valid_sample(s)).count()
    }
}
