use super::client::{ApiResult, Client};
use super::graphql::{self, PullRequestNode, PullRequestReviewsNode, SearchData};
use super::resilient_http::RetryPolicy;
use super::{Fetcher, LeadTimesByRepo, PrLeadTimeDatum, RepoCounts};
use crate::Result;
use chrono::Utc;
use core::time::Duration;
use ohno::{IntoAppError, app_err, bail};
use reqwest::Response;
use reqwest::header::{HeaderMap, LINK};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

const LOG_TARGET: &str = "    github";
const MAX_PAGE_SIZE: u8 = 100;

/// Connection and pagination settings for [`GitHubFetcher`]
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    /// Base URL of the REST API
    pub api_url: Url,

    /// URL of the GraphQL endpoint
    pub graphql_url: Url,

    /// Results requested per page (1..=100)
    pub page_size: u8,

    /// Stop paginating a query after this many pages
    pub max_pages: Option<u32>,

    /// Timeout for each individual HTTP request
    pub request_timeout: Duration,

    /// Longest rate-limit wait the fetcher will sleep through
    pub max_rate_limit_wait: Duration,

    /// Number of times a single request is retried after a transient failure or rate limit
    pub max_retries: u32,

    /// Backoff delay before the first retry of a transient failure
    pub retry_base_delay: Duration,
}

impl FetcherSettings {
    const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            request_timeout: self.request_timeout,
            max_retries: self.max_retries,
            base_delay: self.retry_base_delay,
            max_rate_limit_wait: self.max_rate_limit_wait,
        }
    }
}

/// REST commit search response, reduced to the fields we need
#[derive(Debug, Deserialize)]
struct CommitSearchResults {
    #[serde(default)]
    items: Vec<CommitItem>,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    repository: Option<CommitRepository>,
}

#[derive(Debug, Deserialize)]
struct CommitRepository {
    full_name: String,
}

/// [`Fetcher`] backed by the GitHub REST and GraphQL APIs.
#[derive(Debug, Clone)]
pub struct GitHubFetcher {
    client: Client,
    settings: FetcherSettings,
}

impl GitHubFetcher {
    pub fn new(token: &str, settings: FetcherSettings) -> Result<Self> {
        if settings.page_size == 0 || settings.page_size > MAX_PAGE_SIZE {
            bail!("page size must be between 1 and {MAX_PAGE_SIZE}, got {}", settings.page_size);
        }

        Ok(Self {
            client: Client::new(token, settings.retry_policy())?,
            settings,
        })
    }

    fn search_commits_url(&self, query: &str, page: u32) -> Result<Url> {
        let mut url = self
            .settings
            .api_url
            .join("search/commits")
            .into_app_err("building commit search URL")?;

        let _ = url
            .query_pairs_mut()
            .append_pair("q", query)
            .append_pair("per_page", &self.settings.page_size.to_string())
            .append_pair("page", &page.to_string());

        Ok(url)
    }

    fn reached_page_cap(&self, pages_fetched: u32, query: &str) -> bool {
        let capped = self.settings.max_pages.is_some_and(|max| pages_fetched >= max);
        if capped {
            log::debug!(target: LOG_TARGET, "Reached maximum page limit ({pages_fetched}) for query '{query}', stopping pagination");
        }
        capped
    }

    /// Await a request and turn its final classification into a result.
    async fn send(&self, operation: &str, request: impl Future<Output = ApiResult<Response>>) -> Result<Response> {
        match request.await {
            ApiResult::Success(resp) => Ok(resp),
            ApiResult::Failed(e) => Err(app_err!("{operation} failed: {e}")),
            ApiResult::RateLimited(limited) => {
                let wait = limited.wait_from(Utc::now());
                let max_wait = self.client.max_rate_limit_wait();
                if wait > max_wait {
                    bail!(
                        "{operation} failed: GitHub rate limit resets in {}s, longer than the maximum wait of {}s",
                        wait.as_secs(),
                        max_wait.as_secs()
                    );
                }

                Err(app_err!(
                    "{operation} failed: GitHub rate limit still exceeded after {} retries",
                    self.client.max_retries()
                ))
            }
        }
    }

    /// Run a paginated GraphQL search, handing every node to `visit`.
    async fn search_pull_requests<N, V>(&self, operation: &str, document: &'static str, query: &str, mut visit: V) -> Result<()>
    where
        N: DeserializeOwned,
        V: FnMut(N),
    {
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let body = graphql::Request {
                query: document,
                variables: graphql::Variables {
                    query,
                    first: self.settings.page_size,
                    cursor: cursor.as_deref(),
                },
            };

            let resp = self
                .send(operation, self.client.post_json(self.settings.graphql_url.clone(), &body))
                .await?;

            let response: graphql::Response<SearchData<N>> = resp
                .json()
                .await
                .into_app_err_with(|| format!("decoding GraphQL response while {operation}"))?;

            let search = response
                .into_data()
                .map_err(|e| app_err!("{operation} failed: {e}"))?
                .search;
            pages += 1;

            for node in search.nodes.into_iter().flatten() {
                visit(node);
            }

            if !search.page_info.has_next_page || self.reached_page_cap(pages, query) {
                break;
            }

            match search.page_info.end_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }

            log::debug!(target: LOG_TARGET, "  Fetching page {} of pull requests for query '{query}'...", pages + 1);
        }

        log::info!(target: LOG_TARGET, "Completed fetching pull requests for query '{query}' ({pages} page(s))");
        Ok(())
    }

    async fn count_pull_requests(&self, operation: &str, query: &str) -> Result<RepoCounts> {
        let mut counts = RepoCounts::new();
        self.search_pull_requests(operation, graphql::SEARCH_PULL_REQUESTS, query, |node: PullRequestNode| {
            if let Some(name) = node.repository_name() {
                *counts.entry(name.to_string()).or_default() += 1;
            }
        })
        .await?;
        Ok(counts)
    }
}

/// Whether the `Link` header advertises another page
fn has_next_page(headers: &HeaderMap) -> bool {
    headers
        .get(LINK)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|link_str| link_str.contains(r#"rel="next""#))
}

impl Fetcher for GitHubFetcher {
    async fn fetch_commits(&self, org: &str, user: &str, date_filter: &str) -> Result<RepoCounts> {
        log::info!(target: LOG_TARGET, "[1/4] Fetching commit data using REST API...");
        let query = format!("org:{org} author:{user}{date_filter}");

        let mut counts = RepoCounts::new();
        let mut page = 1u32;

        loop {
            let url = self.search_commits_url(&query, page)?;
            let resp = self.send("searching commits", self.client.get(url)).await?;
            let more = has_next_page(resp.headers());

            let results: CommitSearchResults = resp.json().await.into_app_err("decoding commit search results")?;
            if results.items.is_empty() {
                break;
            }

            for item in results.items {
                if let Some(repo) = item.repository {
                    *counts.entry(repo.full_name).or_default() += 1;
                }
            }

            if !more || self.reached_page_cap(page, &query) {
                break;
            }

            page += 1;
            log::debug!(target: LOG_TARGET, "  Fetching page {page} of commits...");
        }

        log::info!(target: LOG_TARGET, "Completed fetching commit data ({} repositories)", counts.len());
        Ok(counts)
    }

    async fn fetch_created_prs(&self, org: &str, user: &str, date_filter: &str) -> Result<RepoCounts> {
        log::info!(target: LOG_TARGET, "[2/4] Fetching created PR data...");
        let query = format!("org:{org} author:{user} is:pr{date_filter}");
        self.count_pull_requests("searching created pull requests", &query).await
    }

    async fn fetch_reviewed_prs(&self, org: &str, user: &str, date_filter: &str) -> Result<RepoCounts> {
        log::info!(target: LOG_TARGET, "[3/4] Fetching reviewed PR data...");
        let query = format!("org:{org} reviewed-by:{user} is:pr{date_filter}");
        self.count_pull_requests("searching reviewed pull requests", &query).await
    }

    async fn fetch_pr_lead_times(&self, org: &str, user: &str, date_filter: &str) -> Result<LeadTimesByRepo> {
        log::info!(target: LOG_TARGET, "[4/4] Fetching PR review lead time data...");
        let query = format!("org:{org} author:{user} is:pr is:closed{date_filter}");

        let mut lead_times = LeadTimesByRepo::new();
        let mut skipped = 0u64;
        self.search_pull_requests(
            "searching pull request reviews",
            graphql::SEARCH_PULL_REQUEST_REVIEWS,
            &query,
            |node: PullRequestReviewsNode| {
                let last_reviewed_at = node.last_reviewed_at();
                match (node.repository, node.created_at, last_reviewed_at) {
                    (Some(repo), Some(created_at), Some(last_reviewed_at)) if !repo.name_with_owner.is_empty() => {
                        lead_times
                            .entry(repo.name_with_owner)
                            .or_default()
                            .push(PrLeadTimeDatum::new(created_at, last_reviewed_at));
                    }
                    _ => skipped += 1,
                }
            },
        )
        .await?;

        log::debug!(target: LOG_TARGET, "Skipped {skipped} pull request(s) without a submitted review");
        Ok(lead_times)
    }
}
