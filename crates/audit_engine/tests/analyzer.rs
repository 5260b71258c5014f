use std::time::Duration;

use audit_engine::{Analyzer, AnalyzerSettings, FailureKind, HttpAnalyzer, TaskKind};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_for(server: &MockServer) -> AnalyzerSettings {
    AnalyzerSettings {
        base_url: format!("{}/api", server.uri()),
        ..AnalyzerSettings::default()
    }
}

#[tokio::test]
async fn analyzer_returns_payload_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analyze/ssl"))
        .and(query_param("url", "example.com"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"grade": "A", "days_left": 42})),
        )
        .mount(&server)
        .await;

    let analyzer = HttpAnalyzer::new(TaskKind::Ssl, settings_for(&server));
    assert_eq!(analyzer.kind(), TaskKind::Ssl);

    let report = analyzer.analyze("example.com").await.expect("analysis ok");
    assert_eq!(report.payload["grade"], "A");
    assert_eq!(report.payload["days_left"], 42);
}

#[tokio::test]
async fn analyzer_maps_http_status_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analyze/dns"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let analyzer = HttpAnalyzer::new(TaskKind::Dns, settings_for(&server));
    let err = analyzer.analyze("example.com").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(502));
}

#[tokio::test]
async fn analyzer_times_out_on_slow_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analyze/performance"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(serde_json::json!({})),
        )
        .mount(&server)
        .await;

    let settings = AnalyzerSettings {
        request_timeout: Duration::from_millis(50),
        ..settings_for(&server)
    };
    let analyzer = HttpAnalyzer::new(TaskKind::Performance, settings);
    let err = analyzer.analyze("example.com").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn analyzer_rejects_malformed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analyze/links"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "application/json"))
        .mount(&server)
        .await;

    let analyzer = HttpAnalyzer::new(TaskKind::Links, settings_for(&server));
    let err = analyzer.analyze("example.com").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Decode);
}

#[tokio::test]
async fn analyzer_rejects_empty_target() {
    let analyzer = HttpAnalyzer::new(TaskKind::Api, AnalyzerSettings::default());
    let err = analyzer.analyze("   ").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
