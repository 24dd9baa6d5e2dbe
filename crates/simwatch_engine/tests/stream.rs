use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use simwatch_engine::{
    EngineEvent, EngineSettings, EventSink, FailureKind, ReqwestStatusSource, StatusSource,
    StatusUpdate, StreamEnd,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn updates(&self) -> Vec<StatusUpdate> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Status { update, .. } => Some(update.clone()),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn source_for(server: &MockServer) -> ReqwestStatusSource {
    ReqwestStatusSource::new(EngineSettings {
        base_url: server.uri(),
        ..EngineSettings::default()
    })
}

fn request_body() -> serde_json::Value {
    json!({
        "lat_max": 10.0,
        "lat_min": -10.0,
        "lon_max": 30.0,
        "lon_min": 20.0,
        "date": "2024-05-01",
        "duration": 24.0,
        "resolution": 0.5
    })
}

#[tokio::test]
async fn streams_status_frames_until_end_of_data() {
    let server = MockServer::start().await;
    let body = concat!(
        r#"{"status": 0.1, "message": "Preparing"}"#,
        "\n",
        r#"{"status": 0.5, "message": "Integrating"}{"broken"}"#,
        "\n",
        r#"{"status": 1.0, "message": "Filename: run-001.nc"}"#,
    );
    Mock::given(method("POST"))
        .and(path("/run-simulation/"))
        .and(header("content-type", "application/json"))
        .and(body_json(request_body()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let cancel = CancellationToken::new();
    let end = source_for(&server)
        .stream(4, &request_body(), &cancel, &sink)
        .await
        .expect("stream ok");

    assert_eq!(end, StreamEnd::Ended);
    let updates = sink.updates();
    let messages: Vec<_> = updates.iter().map(|u| u.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["Preparing", "Integrating", "Filename: run-001.nc"]
    );
    assert_eq!(updates[2].percent, Some(100.0));
    assert_eq!(updates[2].artifact.as_deref(), Some("run-001.nc"));
    assert!(sink
        .events
        .lock()
        .unwrap()
        .iter()
        .all(|event| matches!(event, EngineEvent::Status { run_id: 4, .. })));
}

#[tokio::test]
async fn non_success_status_is_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-simulation/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("solver crashed"))
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let err = source_for(&server)
        .stream(1, &request_body(), &CancellationToken::new(), &sink)
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(500));
    assert_eq!(err.message, "solver crashed");
    assert!(sink.updates().is_empty());
}

#[tokio::test]
async fn cancellation_while_waiting_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run-simulation/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(10))
                .set_body_string(r#"{"status": 0.9, "message": "too late"}"#),
        )
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let end = source_for(&server)
        .stream(2, &request_body(), &cancel, &sink)
        .await
        .expect("cancellation is not a failure");

    assert_eq!(end, StreamEnd::Cancelled);
    assert!(sink.updates().is_empty());
}

/// Serves a single chunked response: `first` right away, `second` after `gap`.
async fn spawn_chunked_server(
    first: &'static str,
    second: &'static str,
    gap: Duration,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request: Vec<u8> = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let head = concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: text/plain\r\n",
            "Transfer-Encoding: chunked\r\n\r\n",
        );
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket
            .write_all(format!("{:x}\r\n{first}\r\n", first.len()).as_bytes())
            .await;
        let _ = socket.flush().await;

        tokio::time::sleep(gap).await;
        let _ = socket
            .write_all(format!("{:x}\r\n{second}\r\n0\r\n\r\n", second.len()).as_bytes())
            .await;
        let _ = socket.flush().await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn cancellation_between_chunks_stops_decoding() {
    let base_url = spawn_chunked_server(
        r#"{"status": 0.3, "message": "first chunk"}"#,
        r#"{"status": 0.6, "message": "second chunk"}"#,
        Duration::from_millis(500),
    )
    .await;
    let source = ReqwestStatusSource::new(EngineSettings {
        base_url,
        ..EngineSettings::default()
    });

    let sink = TestSink::default();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let end = source
        .stream(7, &request_body(), &cancel, &sink)
        .await
        .expect("cancellation is not a failure");
    assert_eq!(end, StreamEnd::Cancelled);

    // Give the server time to send the second chunk; nothing more is decoded.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let messages: Vec<_> = sink
        .updates()
        .into_iter()
        .map(|update| update.message)
        .collect();
    assert_eq!(messages, vec!["first chunk".to_string()]);
}

#[tokio::test]
async fn pre_cancelled_token_decodes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"status": 0.2, "message": "x"}"#),
        )
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let end = source_for(&server)
        .stream(3, &request_body(), &cancel, &sink)
        .await
        .unwrap();
    assert_eq!(end, StreamEnd::Cancelled);
    assert!(sink.updates().is_empty());
}

#[tokio::test]
async fn unreachable_service_is_a_network_failure() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let source = ReqwestStatusSource::new(EngineSettings {
        base_url: uri,
        connect_timeout: Duration::from_millis(500),
        ..EngineSettings::default()
    });
    let err = source
        .stream(5, &request_body(), &CancellationToken::new(), &TestSink::default())
        .await
        .unwrap_err();

    assert!(matches!(err.kind, FailureKind::Network | FailureKind::Timeout));
}

#[tokio::test]
async fn invalid_base_url_fails_before_connecting() {
    let source = ReqwestStatusSource::new(EngineSettings {
        base_url: "::not a url::".to_string(),
        ..EngineSettings::default()
    });
    let err = source
        .stream(6, &request_body(), &CancellationToken::new(), &TestSink::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}
