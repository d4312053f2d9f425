//! HTTP processor exercised against a local axum webservice.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use parking_lot::Mutex;
use serde_json::{Value, json};
use sessionbridge::fake::{CallbackCall, RecordingCallback};
use sessionbridge::protocol::{Blob, CorrelationId, DEVICE_KEY_HEADER, ExternalReferenceId, ProcessRequestBody, USER_AGENT_HEADER};
use sessionbridge::{BridgeConfig, HttpProcessor, SessionBridge, SessionOutcome};
use tokio::net::TcpListener;

#[derive(Default)]
struct Seen {
	bodies: Mutex<Vec<ProcessRequestBody>>,
	device_keys: Mutex<Vec<Option<String>>>,
	user_agents: Mutex<Vec<Option<String>>>,
}

impl Seen {
	fn record(&self, headers: &HeaderMap, body: ProcessRequestBody) {
		let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string);
		self.device_keys.lock().push(header(DEVICE_KEY_HEADER));
		self.user_agents.lock().push(header(USER_AGENT_HEADER));
		self.bodies.lock().push(body);
	}
}

async fn process_ok(State(seen): State<Arc<Seen>>, headers: HeaderMap, Json(body): Json<ProcessRequestBody>) -> Json<Value> {
	seen.record(&headers, body);
	Json(json!({
		"responseBlob": "opaque-response-blob_v1",
		"result": { "officialIDPhotoImage": "cGhvdG8=" },
	}))
}

async fn process_without_blob(State(seen): State<Arc<Seen>>, headers: HeaderMap, Json(body): Json<ProcessRequestBody>) -> (StatusCode, Json<Value>) {
	seen.record(&headers, body);
	(StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": true })))
}

async fn process_garbage() -> &'static str {
	"definitely not json"
}

async fn serve(app: Router) -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
	addr
}

fn config_for(endpoint: String) -> BridgeConfig {
	BridgeConfig {
		endpoint,
		device_key_identifier: Some("dk-test".to_string()),
		user_agent: "sessionbridge-tests/1.0".to_string(),
		upload_chunk_size: 8,
		retry_delay_ms: 10,
		..BridgeConfig::default()
	}
}

/// Wires a bridge to an HTTP processor through the in-memory channel.
fn start(config: &BridgeConfig) -> (Arc<SessionBridge>, Arc<HttpProcessor>) {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let parts = sessionbridge::pair();
	let bridge = Arc::new(SessionBridge::new(Arc::new(parts.channel), config.client_metadata()));
	let processor = Arc::new(HttpProcessor::new(config).unwrap());

	tokio::spawn(parts.endpoint.serve(Arc::clone(&processor)));
	let runner = Arc::clone(&bridge);
	let inbound_rx = parts.inbound_rx;
	tokio::spawn(async move { runner.run(inbound_rx).await });

	(bridge, processor)
}

async fn wait_for_terminal(callback: &RecordingCallback) -> Vec<CallbackCall> {
	tokio::time::timeout(Duration::from_secs(10), async {
		loop {
			let calls = callback.calls();
			if calls.iter().any(|call| matches!(call, CallbackCall::Response(_) | CallbackCall::Abort)) {
				return calls;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await
	.expect("session should reach a terminal callback")
}

#[tokio::test]
async fn successful_exchange_reports_progress_then_response() {
	let seen = Arc::new(Seen::default());
	let addr = serve(Router::new().route("/process", post(process_ok)).with_state(Arc::clone(&seen))).await;
	let config = config_for(format!("http://{addr}/process"));
	let (bridge, processor) = start(&config);
	let callback = Arc::new(RecordingCallback::default());

	bridge.arm_reference(ExternalReferenceId::new("ref_42"));
	let handle = bridge
		.on_session_request(CorrelationId::new("c-1"), Blob::new(b"a request blob longer than one chunk".to_vec()), callback.clone())
		.unwrap();

	let calls = wait_for_terminal(&callback).await;
	let (last, progress) = calls.split_last().unwrap();
	assert_eq!(*last, CallbackCall::Response(Blob::new(b"opaque-response-blob_v1".to_vec())));
	assert!(progress.len() > 1, "expected several progress updates, got {progress:?}");
	assert!(progress.iter().all(|call| matches!(call, CallbackCall::Progress(_))));
	assert_eq!(progress.last(), Some(&CallbackCall::Progress(1.0)));
	assert!(!handle.is_valid());

	let bodies = seen.bodies.lock();
	assert_eq!(bodies.len(), 1);
	assert_eq!(bodies[0].request_blob, "a request blob longer than one chunk");
	assert_eq!(bodies[0].external_database_ref_id.as_ref().map(|id| id.as_str()), Some("ref_42"));
	assert_eq!(seen.device_keys.lock()[0].as_deref(), Some("dk-test"));
	assert_eq!(seen.user_agents.lock()[0].as_deref(), Some("sessionbridge-tests/1.0"));
	assert_eq!(processor.latest_official_id_photo().as_deref(), Some("cGhvdG8="));
}

#[tokio::test]
async fn blobs_cross_the_webservice_as_sdk_text() {
	let seen = Arc::new(Seen::default());
	let addr = serve(Router::new().route("/process", post(process_ok)).with_state(Arc::clone(&seen))).await;
	let config = config_for(format!("http://{addr}/process"));
	let (bridge, _processor) = start(&config);
	let callback = Arc::new(RecordingCallback::default());

	bridge
		.on_session_request(CorrelationId::new("c-text"), Blob::new(b"SDKREQUESTBLOB".to_vec()), callback.clone())
		.unwrap();

	let calls = wait_for_terminal(&callback).await;
	assert_eq!(calls.last(), Some(&CallbackCall::Response(Blob::new(b"opaque-response-blob_v1".to_vec()))));
	assert_eq!(seen.bodies.lock()[0].request_blob, "SDKREQUESTBLOB");
}

#[tokio::test]
async fn non_text_payload_aborts_without_a_request() {
	let seen = Arc::new(Seen::default());
	let addr = serve(Router::new().route("/process", post(process_ok)).with_state(Arc::clone(&seen))).await;
	let config = config_for(format!("http://{addr}/process"));
	let (bridge, _processor) = start(&config);
	let callback = Arc::new(RecordingCallback::default());

	bridge
		.on_session_request(CorrelationId::new("c-bin"), Blob::new(vec![0xff, 0xfe, 0x00]), callback.clone())
		.unwrap();

	let calls = wait_for_terminal(&callback).await;
	assert_eq!(calls, vec![CallbackCall::Abort]);
	assert!(seen.bodies.lock().is_empty());
}

#[tokio::test]
async fn reply_without_response_blob_aborts_the_session() {
	let seen = Arc::new(Seen::default());
	let addr = serve(Router::new().route("/process", post(process_without_blob)).with_state(Arc::clone(&seen))).await;
	let config = config_for(format!("http://{addr}/process"));
	let (bridge, processor) = start(&config);
	let callback = Arc::new(RecordingCallback::default());

	bridge.on_session_request(CorrelationId::new("c-2"), Blob::new(b"req".to_vec()), callback.clone()).unwrap();

	let calls = wait_for_terminal(&callback).await;
	assert_eq!(calls.last(), Some(&CallbackCall::Abort));
	assert!(callback.responses().is_empty());
	assert_eq!(seen.bodies.lock().len(), 1);
	assert_eq!(processor.latest_official_id_photo(), None);
}

#[tokio::test]
async fn malformed_reply_aborts_the_session() {
	let addr = serve(Router::new().route("/process", post(process_garbage))).await;
	let config = config_for(format!("http://{addr}/process"));
	let (bridge, _processor) = start(&config);
	let callback = Arc::new(RecordingCallback::default());

	bridge.on_session_request(CorrelationId::new("c-3"), Blob::new(b"req".to_vec()), callback.clone()).unwrap();

	let calls = wait_for_terminal(&callback).await;
	assert_eq!(calls.last(), Some(&CallbackCall::Abort));
	assert_eq!(callback.abort_count(), 1);
}

#[tokio::test]
async fn unreachable_webservice_is_retried_then_aborted() {
	let addr = {
		let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		listener.local_addr().unwrap()
	};
	let config = BridgeConfig {
		max_retries: 2,
		retry_delay_ms: 25,
		..config_for(format!("http://{addr}/process"))
	};
	let (bridge, _processor) = start(&config);
	let callback = Arc::new(RecordingCallback::default());

	let started = Instant::now();
	bridge.on_session_request(CorrelationId::new("c-4"), Blob::new(b"req".to_vec()), callback.clone()).unwrap();

	let calls = wait_for_terminal(&callback).await;
	assert_eq!(calls.last(), Some(&CallbackCall::Abort));
	assert!(started.elapsed() >= Duration::from_millis(50), "two retry delays should have elapsed");
	assert!(callback.responses().is_empty());

	tokio::time::sleep(Duration::from_millis(20)).await;
	assert_eq!(bridge.last_outcome(), Some(SessionOutcome::Aborted));
}
