//! Tests for CodacyClient against a wiremock server, plus one end-to-end run of
//! the synchronise driver publishing through the real client.

use std::time::Duration;

use coverage_sync::upload::CodacyClient;
use coverage_sync_core::config::SynchroniseConfig;
use coverage_sync_core::contract::{
    CoveragePublisher, CoverageRow, MockRecordSource, ProjectRecord, PublishRequest,
};
use coverage_sync_core::error::PublishError;
use coverage_sync_core::report::{CoverageReport, FileReport};
use coverage_sync_core::synchronise::{synchronise, RunSummary};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> CodacyClient {
    CodacyClient::new(&server.uri(), Duration::from_secs(5)).expect("client should build")
}

fn sample_report() -> CoverageReport {
    CoverageReport {
        total: 0,
        file_reports: vec![FileReport {
            filename: Some("a.py".into()),
            total: Some(80.0),
            coverage: json!({"1": 1, "2": 0}),
        }],
    }
}

fn request<'a>(report: &'a CoverageReport, language: Option<&'a str>) -> PublishRequest<'a> {
    PublishRequest {
        api_token: "test-token",
        provider: "gh",
        owner: "acme",
        repo: "widgets",
        commit_uuid: "c0ffee",
        language,
        report,
    }
}

#[tokio::test]
async fn posts_report_with_token_and_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2.0/gh/acme/widgets/commit/c0ffee/coverage/python"))
        .and(header("api-token", "test-token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "total": 0,
            "fileReports": [{"filename": "a.py", "total": 80, "coverage": {"1": 1, "2": 0}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":"ok"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let report = sample_report();
    let response = client_for(&server)
        .publish(request(&report, Some("python")))
        .await
        .expect("publish should get a response");

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert!(response.body.contains("ok"));
}

#[tokio::test]
async fn non_success_status_is_a_response_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("commit not found"))
        .mount(&server)
        .await;

    let report = sample_report();
    let response = client_for(&server)
        .publish(request(&report, Some("python")))
        .await
        .expect("a 404 is still a response");

    assert_eq!(response.status, 404);
    assert!(!response.is_success());
    assert_eq!(response.body, "commit not found");
}

#[tokio::test]
async fn path_segments_are_percent_encoded() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let report = sample_report();
    let mut req = request(&report, Some("C#"));
    req.repo = "my repo";

    let url = client.coverage_url(&req).unwrap();

    assert!(
        url.path().ends_with("/2.0/gh/acme/my%20repo/commit/c0ffee/coverage/C%23"),
        "unexpected path {}",
        url.path()
    );
}

#[tokio::test]
async fn null_and_empty_languages_post_to_different_urls() {
    let client = CodacyClient::new("https://api.codacy.com/", Duration::from_secs(5)).unwrap();
    let report = sample_report();

    let null_url = client.coverage_url(&request(&report, None)).unwrap();
    let empty_url = client.coverage_url(&request(&report, Some(""))).unwrap();

    assert_eq!(
        null_url.as_str(),
        "https://api.codacy.com/2.0/gh/acme/widgets/commit/c0ffee/coverage/None"
    );
    assert_eq!(
        empty_url.as_str(),
        "https://api.codacy.com/2.0/gh/acme/widgets/commit/c0ffee/coverage/"
    );
    assert_ne!(null_url, empty_url);
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = CodacyClient::new(&uri, Duration::from_secs(2)).unwrap();
    let report = sample_report();
    let err = client
        .publish(request(&report, Some("python")))
        .await
        .expect_err("nothing is listening any more");

    assert!(matches!(err, PublishError::Transport(_)));
}

#[test]
fn rejects_unparsable_base_url() {
    assert!(CodacyClient::new("not a url", Duration::from_secs(1)).is_err());
}

#[tokio::test]
async fn synchronise_publishes_through_the_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2.0/gh/acme/widgets/commit/uuid-5/coverage/python"))
        .and(header("api-token", "run-token"))
        .and(body_json(json!({
            "total": 0,
            "fileReports": [{"filename": "a.py", "total": 80, "coverage": {"1": 1, "2": 0}}]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2.0/gh/acme/widgets/commit/uuid-5/coverage/java"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut source = MockRecordSource::new();
    source.expect_fetch_projects().return_once(|| {
        Ok(vec![ProjectRecord {
            project_id: 9,
            repo_name: Some("widgets".into()),
            organization_id: Some(1),
            owner: Some("acme".into()),
            provider: Some("gh".into()),
        }])
    });
    source.expect_fetch_coverage_rows().return_once(|| {
        Ok(vec![
            CoverageRow {
                commit_id: 5,
                file_id: 1,
                coverage: Some(r#"{"1":1,"2":0}"#.into()),
                commit_uuid: Some("uuid-5".into()),
                project_id: Some(9),
                language: Some("python".into()),
                filename: Some("a.py".into()),
                total: Some(80.0),
            },
            CoverageRow {
                commit_id: 5,
                file_id: 2,
                coverage: Some("{}".into()),
                commit_uuid: Some("uuid-5".into()),
                project_id: Some(9),
                language: Some("java".into()),
                filename: Some("A.java".into()),
                total: Some(10.0),
            },
        ])
    });

    let config = SynchroniseConfig::new("run-token").with_pause(Duration::ZERO);
    let report = synchronise(&config, &source, &client_for(&server))
        .await
        .expect("synchronise should succeed");

    assert_eq!(
        report.summary(),
        RunSummary {
            commits: 1,
            published: 1,
            rejected: 1,
            ..RunSummary::default()
        }
    );
}
