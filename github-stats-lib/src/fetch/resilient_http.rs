//! Resilient HTTP requests with retry and timeout handling
//!
//! Every attempt is bounded by the request timeout. Transport errors, timeouts
//! and 5xx responses are retried with exponential backoff. Rate-limited
//! responses are retried after the wait GitHub asks for, as long as that wait
//! is within the configured maximum.

use super::client::{RateLimited, classify_rate_limit};
use crate::Result;
use chrono::Utc;
use core::time::Duration;
use layered::{Execute, Service, Stack};
use ohno::app_err;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response};
use seatbelt::retry::{Backoff, Retry};
use seatbelt::timeout::Timeout;
use seatbelt::{RecoveryInfo, ResilienceContext};
use tick::Clock;
use url::Url;

const LOG_TARGET: &str = "      http";

/// Retry and timeout limits applied to every GitHub API request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Timeout for each individual attempt
    pub request_timeout: Duration,

    /// Retries on top of the original attempt
    pub max_retries: u32,

    /// Backoff delay before the first retry of a transient failure
    pub base_delay: Duration,

    /// Longest rate-limit wait that is slept through rather than reported
    pub max_rate_limit_wait: Duration,
}

/// A request that can be replayed for every attempt
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,

    /// Serialized JSON body
    pub body: Option<String>,
}

impl HttpRequest {
    pub const fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            body: None,
        }
    }

    pub const fn post_json(url: Url, body: String) -> Self {
        Self {
            method: Method::POST,
            url,
            body: Some(body),
        }
    }
}

/// Send `request`, retrying according to `policy`.
///
/// The last response is returned when retries run out or the response is not
/// worth retrying, so callers still see the final status.
pub async fn resilient_send(client: &reqwest::Client, request: HttpRequest, policy: RetryPolicy) -> Result<Response> {
    let clock = Clock::new_tokio();
    let context = ResilienceContext::new(&clock).name("github_api");
    let client = client.clone();
    let max_rate_limit_wait = policy.max_rate_limit_wait;

    let service = (
        Retry::layer("retry", &context)
            .clone_input()
            .recovery_with(move |result: &Result<Response>, _| should_retry_response(result, max_rate_limit_wait))
            .max_retry_attempts(policy.max_retries)
            .base_delay(policy.base_delay)
            .backoff(Backoff::Exponential)
            .on_retry(|_output, args| {
                log::debug!(
                    target: LOG_TARGET,
                    "Retrying GitHub API request (attempt {}, delay {}ms)",
                    args.attempt().index() + 1,
                    args.retry_delay().as_millis()
                );
            }),
        Timeout::layer("timeout", &context)
            .timeout_error(|_| app_err!("HTTP request timed out"))
            .timeout(policy.request_timeout),
        Execute::new(move |request: HttpRequest| {
            let client = client.clone();
            async move { send_once(&client, request).await }
        }),
    )
        .into_service();

    service.execute(request).await
}

async fn send_once(client: &reqwest::Client, request: HttpRequest) -> Result<Response> {
    let mut builder = client.request(request.method, request.url);
    if let Some(body) = request.body {
        builder = builder.header(CONTENT_TYPE, "application/json").body(body);
    }

    Ok(builder.send().await?)
}

/// Decide whether a request should be retried
fn should_retry_response(result: &Result<Response>, max_rate_limit_wait: Duration) -> RecoveryInfo {
    let Ok(resp) = result else {
        // Transport errors and timeouts
        return RecoveryInfo::retry();
    };

    let status = resp.status();
    if status.is_server_error() {
        return RecoveryInfo::retry();
    }

    classify_rate_limit(status, resp.headers()).map_or_else(RecoveryInfo::never, |limited| {
        rate_limit_wait(&limited, max_rate_limit_wait).map_or_else(RecoveryInfo::never, |wait| RecoveryInfo::retry().delay(wait))
    })
}

/// The wait before retrying a rate-limited request, or `None` when it exceeds `max_wait`
fn rate_limit_wait(limited: &RateLimited, max_wait: Duration) -> Option<Duration> {
    if let Some(rl) = limited.rate_limit {
        log::debug!(
            target: LOG_TARGET,
            "GitHub API rate limit: {} remaining, resets at {}",
            rl.remaining,
            rl.reset_at.with_timezone(&chrono::Local).format("%T")
        );
    }

    let wait = limited.wait_from(Utc::now());
    if wait > max_wait {
        return None;
    }

    log::warn!(target: LOG_TARGET, "Hit GitHub rate limit, waiting up to {}s", wait.as_secs());
    Some(wait)
}
