//! End-to-end tests for the `stats` command.
//!
//! A wiremock server stands in for both the REST and GraphQL APIs; a temporary
//! configuration file points the command at it.

use github_stats_lib::{Host, run};
use serde_json::{Value, json};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test host that captures output to in-memory buffers.
#[derive(Debug, Default)]
struct TestHost {
    output_buf: Vec<u8>,
    error_buf: Vec<u8>,
    exit_code: Option<i32>,
}

impl TestHost {
    fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output_buf).into_owned()
    }

    fn error_str(&self) -> String {
        String::from_utf8_lossy(&self.error_buf).into_owned()
    }
}

impl Host for TestHost {
    fn output(&mut self) -> impl Write {
        &mut self.output_buf
    }

    fn error(&mut self) -> impl Write {
        &mut self.error_buf
    }

    fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}

fn write_config(server: &MockServer) -> (TempDir, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let config_path = tmp.path().join("github-stats.toml");
    fs::write(
        &config_path,
        format!(
            "api_url = \"{uri}\"\ngraphql_url = \"{uri}/graphql\"\nrequest_timeout = \"10s\"\naggregation_timeout = \"30s\"\nretry_base_delay = \"10ms\"\n",
            uri = server.uri()
        ),
    )
    .unwrap();
    (tmp, config_path)
}

fn search_page(nodes: &Value) -> Value {
    json!({
        "data": {
            "search": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": nodes
            }
        }
    })
}

async fn mount_search(server: &MockServer, query: &str, nodes: &Value) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "variables": { "query": query } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(nodes)))
        .mount(server)
        .await;
}

async fn mount_github(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search/commits"))
        .and(query_param("q", "org:acme author:octocat author-date:2024-01-01..2024-12-31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 3,
            "items": [
                { "repository": { "full_name": "acme/widgets" } },
                { "repository": { "full_name": "acme/widgets" } },
                { "repository": { "full_name": "acme/gadgets" } }
            ]
        })))
        .mount(server)
        .await;

    mount_search(
        server,
        "org:acme author:octocat is:pr created:2024-01-01..2024-12-31",
        &json!([{ "repository": { "nameWithOwner": "acme/widgets" } }]),
    )
    .await;

    mount_search(
        server,
        "org:acme reviewed-by:octocat is:pr created:2024-01-01..2024-12-31",
        &json!([{ "repository": { "nameWithOwner": "acme/docs" } }]),
    )
    .await;

    mount_search(
        server,
        "org:acme author:octocat is:pr is:closed created:2024-01-01..2024-12-31",
        &json!([{
            "createdAt": "2024-03-01T10:00:00Z",
            "repository": { "nameWithOwner": "acme/widgets" },
            "reviews": { "nodes": [{ "submittedAt": "2024-03-01T11:00:00Z" }] }
        }]),
    )
    .await;
}

fn stats_args<'a>(config_path: &'a str, extra: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec![
        "github-stats",
        "stats",
        "--org",
        "acme",
        "--user",
        "octocat",
        "--from",
        "2024/01/01",
        "--to",
        "2024/12/31",
        "--github-token",
        "test-token",
        "--config",
        config_path,
    ];
    args.extend_from_slice(extra);
    args
}

#[tokio::test]
async fn test_stats_prints_sorted_json() {
    let server = MockServer::start().await;
    mount_github(&server).await;
    let (_tmp, config_path) = write_config(&server);
    let config_path = config_path.to_str().unwrap();

    let mut host = TestHost::default();
    run(&mut host, stats_args(config_path, &[])).await.unwrap();

    assert_eq!(host.exit_code, None, "stderr: {}", host.error_str());

    let report: Value = serde_json::from_str(&host.output_str()).unwrap();
    assert_eq!(
        report,
        json!([
            { "name": "acme/docs", "commits": 0, "created_prs": 0, "reviewed_prs": 1 },
            { "name": "acme/gadgets", "commits": 1, "created_prs": 0, "reviewed_prs": 0 },
            {
                "name": "acme/widgets",
                "commits": 2,
                "created_prs": 1,
                "reviewed_prs": 0,
                "analyzed_pr_count": 1,
                "lead_time_percentiles_hours": {
                    "p99_hours": 1.0,
                    "p95_hours": 1.0,
                    "p90_hours": 1.0,
                    "p75_hours": 1.0,
                    "p50_hours": 1.0
                }
            }
        ])
    );

    // pretty-printed with two-space indentation
    assert!(host.output_str().starts_with("[\n  {\n    \"name\": \"acme/docs\""));
}

#[tokio::test]
async fn test_stats_without_lead_time() {
    let server = MockServer::start().await;
    mount_github(&server).await;
    let (_tmp, config_path) = write_config(&server);
    let config_path = config_path.to_str().unwrap();

    let mut host = TestHost::default();
    run(&mut host, stats_args(config_path, &["--lead-time", "false"])).await.unwrap();

    assert_eq!(host.exit_code, None, "stderr: {}", host.error_str());

    let report: Value = serde_json::from_str(&host.output_str()).unwrap();
    let widgets = &report[2];
    assert_eq!(widgets["name"], "acme/widgets");
    assert!(widgets.get("analyzed_pr_count").is_none());
    assert!(widgets.get("lead_time_percentiles_hours").is_none());

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests
            .iter()
            .all(|r| !String::from_utf8_lossy(&r.body).contains("is:closed")),
        "lead time search must not be issued"
    );
}

#[tokio::test]
async fn test_stats_reports_upstream_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/commits"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "Server Error" })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page(&json!([]))))
        .mount(&server)
        .await;

    let (_tmp, config_path) = write_config(&server);
    let config_path = config_path.to_str().unwrap();

    let mut host = TestHost::default();
    run(&mut host, stats_args(config_path, &[])).await.unwrap();

    assert_eq!(host.exit_code, Some(1));
    assert!(host.output_buf.is_empty());

    let stderr = host.error_str();
    assert!(stderr.starts_with("Failed to aggregate stats: "), "stderr: {stderr}");
    assert!(stderr.contains("Server Error"));
}

#[tokio::test]
async fn test_stats_rejects_invalid_config_before_network() {
    let server = MockServer::start().await;

    let tmp = tempfile::tempdir().unwrap();
    let config_path = tmp.path().join("github-stats.toml");
    fs::write(&config_path, "page_size = 500\n").unwrap();
    let config_path = config_path.to_str().unwrap();

    let mut host = TestHost::default();
    run(&mut host, stats_args(config_path, &[])).await.unwrap();

    assert_eq!(host.exit_code, Some(1));
    assert!(host.error_str().starts_with("Error: "));
    assert!(server.received_requests().await.unwrap().is_empty());
}
