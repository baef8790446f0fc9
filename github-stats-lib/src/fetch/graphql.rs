//! GraphQL documents and response shapes for pull request searches

use chrono::{DateTime, Utc};
use ohno::bail;
use serde::{Deserialize, Serialize};

/// Search that only resolves the repository of each pull request.
pub const SEARCH_PULL_REQUESTS: &str = "query($query: String!, $first: Int!, $cursor: String) {
  search(query: $query, type: ISSUE, first: $first, after: $cursor) {
    pageInfo { hasNextPage endCursor }
    nodes {
      ... on PullRequest {
        repository { nameWithOwner }
      }
    }
  }
}";

/// Search that also resolves creation time and review submission times.
pub const SEARCH_PULL_REQUEST_REVIEWS: &str = "query($query: String!, $first: Int!, $cursor: String) {
  search(query: $query, type: ISSUE, first: $first, after: $cursor) {
    pageInfo { hasNextPage endCursor }
    nodes {
      ... on PullRequest {
        createdAt
        repository { nameWithOwner }
        reviews(last: 100) { nodes { submittedAt } }
      }
    }
  }
}";

/// Request body posted to the GraphQL endpoint
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub query: &'static str,
    pub variables: Variables<'a>,
}

#[derive(Debug, Serialize)]
pub struct Variables<'a> {
    pub query: &'a str,
    pub first: u8,
    pub cursor: Option<&'a str>,
}

/// Top-level GraphQL response envelope
#[derive(Debug, Deserialize)]
pub struct Response<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<ResponseError>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseError {
    pub message: String,
}

impl<T> Response<T> {
    /// Extract the data, failing if the server reported any error.
    pub fn into_data(self) -> crate::Result<T> {
        if !self.errors.is_empty() {
            let messages: Vec<_> = self.errors.into_iter().map(|e| e.message).collect();
            bail!("GraphQL query failed: {}", messages.join("; "));
        }

        match self.data {
            Some(data) => Ok(data),
            None => bail!("GraphQL response contained no data"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchData<N> {
    pub search: SearchConnection<N>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConnection<N> {
    pub page_info: PageInfo,
    #[serde(default = "Vec::new")]
    pub nodes: Vec<Option<N>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRef {
    pub name_with_owner: String,
}

/// Node of [`SEARCH_PULL_REQUESTS`]. Issues that are not pull requests come back as `{}`.
#[derive(Debug, Deserialize)]
pub struct PullRequestNode {
    pub repository: Option<RepositoryRef>,
}

impl PullRequestNode {
    pub fn repository_name(&self) -> Option<&str> {
        self.repository
            .as_ref()
            .map(|r| r.name_with_owner.as_str())
            .filter(|name| !name.is_empty())
    }
}

/// Node of [`SEARCH_PULL_REQUEST_REVIEWS`]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestReviewsNode {
    pub created_at: Option<DateTime<Utc>>,
    pub repository: Option<RepositoryRef>,
    pub reviews: Option<ReviewConnection>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewConnection {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<Option<ReviewNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewNode {
    pub submitted_at: Option<DateTime<Utc>>,
}

impl PullRequestReviewsNode {
    /// Latest submission time across all reviews. Pending reviews have no submission time.
    pub fn last_reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviews
            .as_ref()?
            .nodes
            .iter()
            .flatten()
            .filter_map(|review| review.submitted_at)
            .max()
    }
}
