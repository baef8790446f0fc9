//! GitHub API client
//!
//! Minimal authenticated HTTP client that sends through the resilient
//! request layer and classifies the final GitHub response into success, rate
//! limited, or failed.

use chrono::{DateTime, Utc};
use core::time::Duration;
use ohno::app_err;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use super::resilient_http::{HttpRequest, RetryPolicy, resilient_send};
use url::Url;

const USER_AGENT: &str = "github-stats";

/// Wait used when a rate-limited response carries no hint about when to retry.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Rate limit information from response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub remaining: usize,
    pub reset_at: DateTime<Utc>,
}

/// Details of a rate-limited response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    /// Value of the `Retry-After` header, used by secondary rate limits
    pub retry_after: Option<Duration>,

    /// Primary rate limit headers, if present
    pub rate_limit: Option<RateLimitInfo>,
}

impl RateLimited {
    /// How long to wait before retrying, measured from `now`
    pub fn wait_from(&self, now: DateTime<Utc>) -> Duration {
        if let Some(retry_after) = self.retry_after {
            return retry_after;
        }

        self.rate_limit.map_or(DEFAULT_RATE_LIMIT_WAIT, |rl| {
            (rl.reset_at - now).to_std().unwrap_or(Duration::ZERO)
        })
    }
}

/// Result of a GitHub API call
#[derive(Debug)]
pub enum ApiResult<T> {
    /// Request succeeded
    Success(T),

    /// Still rate limited once retries stopped
    RateLimited(RateLimited),

    /// Request failed permanently - should NOT retry
    Failed(ohno::AppError),
}

/// Error payload returned by the GitHub REST API
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
#[expect(clippy::struct_field_names, reason = "client field stores the underlying HTTP client")]
pub struct Client {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl Client {
    /// Create a new client that authenticates every request with `token`
    pub fn new(token: &str, policy: RetryPolicy) -> crate::Result<Self> {
        use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};

        let mut auth_val = HeaderValue::from_str(&format!("Bearer {token}"))?;
        auth_val.set_sensitive(true);

        let mut headers = HeaderMap::new();
        let _ = headers.insert(AUTHORIZATION, auth_val);
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));

        let client = reqwest::Client::builder().user_agent(USER_AGENT).default_headers(headers).build()?;

        Ok(Self { client, policy })
    }

    /// Issue a GET request and classify the result
    pub async fn get(&self, url: Url) -> ApiResult<Response> {
        self.send(HttpRequest::get(url)).await
    }

    /// Issue a POST request with a JSON body and classify the result
    pub async fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> ApiResult<Response> {
        match serde_json::to_string(body) {
            Ok(body) => self.send(HttpRequest::post_json(url, body)).await,
            Err(e) => ApiResult::Failed(e.into()),
        }
    }

    /// Maximum number of retries for a single request
    pub const fn max_retries(&self) -> u32 {
        self.policy.max_retries
    }

    /// Longest rate-limit wait that is slept through
    pub const fn max_rate_limit_wait(&self) -> Duration {
        self.policy.max_rate_limit_wait
    }

    async fn send(&self, request: HttpRequest) -> ApiResult<Response> {
        let resp = match resilient_send(&self.client, request, self.policy).await {
            Ok(r) => r,
            Err(e) => return ApiResult::Failed(e),
        };

        let status = resp.status();
        if status.is_success() {
            return ApiResult::Success(resp);
        }

        if let Some(limited) = classify_rate_limit(status, resp.headers()) {
            return ApiResult::RateLimited(limited);
        }

        // Any other HTTP error is a permanent failure
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body).map_or(body, |e| e.message);
        if message.is_empty() {
            ApiResult::Failed(app_err!("HTTP {status}"))
        } else {
            ApiResult::Failed(app_err!("HTTP {status}: {message}"))
        }
    }
}

/// Decide whether an unsuccessful response is a rate limit.
///
/// 429 is always a rate limit. 403 is a rate limit only when the primary quota is
/// exhausted or a `Retry-After` header is present; otherwise it is a permission error.
pub fn classify_rate_limit(status: StatusCode, headers: &HeaderMap) -> Option<RateLimited> {
    let limited = RateLimited {
        retry_after: parse_retry_after(headers),
        rate_limit: extract_rate_limit_from_headers(headers),
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => Some(limited),
        StatusCode::FORBIDDEN if limited.retry_after.is_some() || limited.rate_limit.is_some_and(|rl| rl.remaining == 0) => {
            Some(limited)
        }
        _ => None,
    }
}

/// Parse the `Retry-After` header value as seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers.get(RETRY_AFTER)?.to_str().ok()?.parse::<u64>().ok()?;
    Some(Duration::from_secs(secs))
}

/// Extract rate limit information from API response headers
fn extract_rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let remaining = headers.get("x-ratelimit-remaining")?.to_str().ok()?.parse::<usize>().ok()?;

    let reset_timestamp = headers.get("x-ratelimit-reset")?.to_str().ok()?.parse::<i64>().ok()?;

    let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

    Some(RateLimitInfo { remaining, reset_at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let _ = headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_extract_rate_limit_from_headers() {
        let headers = headers(&[("x-ratelimit-remaining", "4999"), ("x-ratelimit-reset", "1704067200")]);

        let rate_limit = extract_rate_limit_from_headers(&headers).unwrap();

        assert_eq!(rate_limit.remaining, 4999);
        assert_eq!(rate_limit.reset_at.timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_extract_rate_limit_missing_headers() {
        assert!(extract_rate_limit_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_extract_rate_limit_invalid_remaining() {
        let headers = headers(&[("x-ratelimit-remaining", "invalid"), ("x-ratelimit-reset", "1704067200")]);
        assert!(extract_rate_limit_from_headers(&headers).is_none());
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(&headers(&[("retry-after", "30")])), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after(&headers(&[("retry-after", "soon")])), None);
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
    }

    #[test]
    fn test_classify_429_without_headers() {
        let limited = classify_rate_limit(StatusCode::TOO_MANY_REQUESTS, &HeaderMap::new()).unwrap();
        assert_eq!(limited.retry_after, None);
        assert_eq!(limited.rate_limit, None);
    }

    #[test]
    fn test_classify_403_exhausted_quota() {
        let headers = headers(&[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "1704067200")]);
        assert!(classify_rate_limit(StatusCode::FORBIDDEN, &headers).is_some());
    }

    #[test]
    fn test_classify_403_secondary_limit() {
        let headers = headers(&[("retry-after", "5")]);
        let limited = classify_rate_limit(StatusCode::FORBIDDEN, &headers).unwrap();
        assert_eq!(limited.retry_after, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_classify_403_permission_error() {
        let headers = headers(&[("x-ratelimit-remaining", "4000"), ("x-ratelimit-reset", "1704067200")]);
        assert!(classify_rate_limit(StatusCode::FORBIDDEN, &headers).is_none());
    }

    #[test]
    fn test_classify_other_errors() {
        assert!(classify_rate_limit(StatusCode::UNAUTHORIZED, &HeaderMap::new()).is_none());
        assert!(classify_rate_limit(StatusCode::INTERNAL_SERVER_ERROR, &HeaderMap::new()).is_none());
    }

    #[test]
    fn test_wait_prefers_retry_after() {
        let now = DateTime::from_timestamp(1_704_067_000, 0).unwrap();
        let limited = RateLimited {
            retry_after: Some(Duration::from_secs(7)),
            rate_limit: Some(RateLimitInfo {
                remaining: 0,
                reset_at: DateTime::from_timestamp(1_704_067_200, 0).unwrap(),
            }),
        };
        assert_eq!(limited.wait_from(now), Duration::from_secs(7));
    }

    #[test]
    fn test_wait_until_reset() {
        let now = DateTime::from_timestamp(1_704_067_000, 0).unwrap();
        let limited = RateLimited {
            retry_after: None,
            rate_limit: Some(RateLimitInfo {
                remaining: 0,
                reset_at: DateTime::from_timestamp(1_704_067_200, 0).unwrap(),
            }),
        };
        assert_eq!(limited.wait_from(now), Duration::from_secs(200));
    }

    #[test]
    fn test_wait_reset_in_the_past() {
        let now = DateTime::from_timestamp(1_704_067_300, 0).unwrap();
        let limited = RateLimited {
            retry_after: None,
            rate_limit: Some(RateLimitInfo {
                remaining: 0,
                reset_at: DateTime::from_timestamp(1_704_067_200, 0).unwrap(),
            }),
        };
        assert_eq!(limited.wait_from(now), Duration::ZERO);
    }

    #[test]
    fn test_wait_default() {
        let limited = RateLimited {
            retry_after: None,
            rate_limit: None,
        };
        assert_eq!(limited.wait_from(Utc::now()), DEFAULT_RATE_LIMIT_WAIT);
    }

    #[test]
    fn test_client_new() {
        let policy = RetryPolicy {
            request_timeout: Duration::from_secs(5),
            max_retries: 2,
            base_delay: Duration::from_millis(10),
            max_rate_limit_wait: Duration::from_secs(60),
        };
        let client = Client::new("test_token", policy).unwrap();
        assert_eq!(client.max_retries(), 2);
        assert_eq!(client.max_rate_limit_wait(), Duration::from_secs(60));
    }
}
