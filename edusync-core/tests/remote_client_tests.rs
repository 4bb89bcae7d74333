use std::time::{Duration, Instant};

use chrono::{Datelike, Utc};
use edusync_core::remote::count_path;
use edusync_core::{
    format_identifier, Credentials, EntityKind, IdMinter, RemoteClient, RemoteConfig,
    RemoteDocument, RemoteError,
};
use reqwest::Method;
use serde_json::{json, Map};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COUNT_FIELDS: &str = r#"["count(name) as total"]"#;

fn config(server: &MockServer) -> RemoteConfig {
    RemoteConfig::new(server.uri())
        .with_credentials(Credentials::new("key", "secret"))
        .with_retry(3, Duration::ZERO)
}

fn client(server: &MockServer) -> RemoteClient {
    RemoteClient::new(&config(server)).unwrap()
}

fn program(name: &str) -> RemoteDocument {
    let mut fields = Map::new();
    fields.insert("program_name".to_string(), json!("Science"));
    RemoteDocument::new(EntityKind::Program, name, fields)
}

// ── Authentication ──────────────────────────────────────────────

#[tokio::test]
async fn sends_basic_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/method/frappe.ping"))
        .and(header("authorization", "Basic a2V5OnNlY3JldA=="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "pong"})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server).ping().await);
}

#[tokio::test]
async fn omits_authorization_without_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/method/frappe.ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "pong"})))
        .mount(&server)
        .await;

    let client = RemoteClient::new(&RemoteConfig::new(server.uri())).unwrap();
    assert!(client.ping().await);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

// ── Retry ───────────────────────────────────────────────────────

#[tokio::test]
async fn gives_up_after_retry_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"exception": "InternalServerError"})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server)
        .execute(Method::GET, "/api/resource/Program", None)
        .await
        .unwrap_err();

    match err {
        RemoteError::Rejection { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "InternalServerError");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn retry_attempts_follow_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program"))
        .respond_with(ResponseTemplate::new(502))
        .expect(5)
        .mount(&server)
        .await;

    let client = RemoteClient::new(&config(&server).with_retry(5, Duration::ZERO)).unwrap();
    let err = client
        .execute(Method::GET, "/api/resource/Program", None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn zero_retry_attempts_still_sends_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = RemoteClient::new(&config(&server).with_retry(0, Duration::ZERO)).unwrap();
    assert!(client
        .execute(Method::GET, "/api/resource/Program", None)
        .await
        .is_err());
}

#[tokio::test]
async fn waits_retry_delay_between_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client =
        RemoteClient::new(&config(&server).with_retry(3, Duration::from_millis(50))).unwrap();
    let started = Instant::now();
    let result = client
        .execute(Method::GET, "/api/resource/Program", None)
        .await;

    assert!(result.is_err());
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn slow_response_times_out_as_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = RemoteClient::new(
        &config(&server)
            .with_retry(1, Duration::ZERO)
            .with_timeout(Duration::from_millis(100)),
    )
    .unwrap();
    let err = client
        .execute(Method::GET, "/api/resource/Program", None)
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::Network(_)), "got {:?}", err);
}

#[tokio::test]
async fn recovers_from_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let value = client(&server)
        .execute(Method::GET, "/api/resource/Program", None)
        .await
        .unwrap();
    assert_eq!(value, json!({"data": []}));
}

#[tokio::test]
async fn network_failure_is_network_error() {
    let client = RemoteClient::new(
        &RemoteConfig::new("http://127.0.0.1:1")
            .with_retry(2, Duration::ZERO)
            .with_timeout(Duration::from_secs(2)),
    )
    .unwrap();
    let err = client
        .execute(Method::GET, "/api/resource/Program", None)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Network(_)));
}

#[tokio::test]
async fn success_with_non_json_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .execute(Method::GET, "/api/resource/Program", None)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Decode(_)));
}

// ── Existence check ─────────────────────────────────────────────

#[tokio::test]
async fn exists_reports_found_and_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program/EDU-PRG-2025-00001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program/EDU-PRG-2025-00002"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.exists("Program", "EDU-PRG-2025-00001").await.unwrap());
    assert!(!client.exists("Program", "EDU-PRG-2025-00002").await.unwrap());
}

#[tokio::test]
async fn lenient_exists_treats_server_errors_as_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program/EDU-PRG-2025-00001"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let exists = client(&server)
        .exists("Program", "EDU-PRG-2025-00001")
        .await
        .unwrap();
    assert!(!exists);
}

#[tokio::test]
async fn strict_exists_surfaces_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program/EDU-PRG-2025-00001"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Program/EDU-PRG-2025-00002"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client =
        RemoteClient::new(&config(&server).with_strict_existence_check(true)).unwrap();

    let err = client
        .exists("Program", "EDU-PRG-2025-00001")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(!client.exists("Program", "EDU-PRG-2025-00002").await.unwrap());
}

#[tokio::test]
async fn exists_encodes_path_segments() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Academic%20Term/2025-26%20%28Term%201%29"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server)
        .exists("Academic Term", "2025-26 (Term 1)")
        .await
        .unwrap());
}

// ── Create / update ─────────────────────────────────────────────

#[tokio::test]
async fn create_posts_document_with_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/resource/Program"))
        .and(body_partial_json(json!({
            "name": "EDU-PRG-2025-00001",
            "program_name": "Science"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .create(&program("EDU-PRG-2025-00001"))
        .await
        .unwrap();
}

#[tokio::test]
async fn update_puts_to_document_path() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/resource/Program/EDU-PRG-2025-00001"))
        .and(body_partial_json(json!({"program_name": "Science"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .update(&program("EDU-PRG-2025-00001"))
        .await
        .unwrap();
}

#[tokio::test]
async fn rejection_carries_remote_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/resource/Program"))
        .respond_with(
            ResponseTemplate::new(417).set_body_json(json!({"message": "Program Code is required"})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .create(&program("EDU-PRG-2025-00001"))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "remote rejected request (417): Program Code is required"
    );
}

// ── Count / minting ─────────────────────────────────────────────

#[tokio::test]
async fn count_reads_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Student"))
        .and(query_param("fields", COUNT_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"total": "41"}]})))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client(&server).count("Student").await.unwrap(), 41);
    assert!(count_path("Student").starts_with("/api/resource/Student?fields="));
}

#[tokio::test]
async fn minter_uses_count_plus_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Student"))
        .and(query_param("fields", COUNT_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"total": 41}]})))
        .mount(&server)
        .await;

    let client = client(&server);
    let id = IdMinter::new(&client).mint("EDU-STU", "Student").await.unwrap();
    assert_eq!(id, format_identifier("EDU-STU", Utc::now().year(), 42));
}

#[tokio::test]
async fn minter_fails_when_count_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Student"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(IdMinter::new(&client).mint("EDU-STU", "Student").await.is_err());
}

// ── Ping ────────────────────────────────────────────────────────

#[tokio::test]
async fn ping_is_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/method/frappe.ping"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!client(&server).ping().await);
}
