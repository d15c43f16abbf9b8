//! HTTP-level tests: the axum app in-process via `oneshot`, and the full
//! serve/drain loop over TCP.

use crate::mock_infrastructure::{
    parse_body, rpc_request, runtime_for, runtime_for_config, test_config, InstrumentedUpstream,
    RpcMockBuilder, UNREACHABLE_URL,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use relay_core::runtime::{DrainOutcome, LifecycleState, RelayRuntime};
use serde_json::json;
use serial_test::serial;
use server::{app, middleware::X_REQUEST_ID, router::X_CACHE_STATUS};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceExt;

const INTERNAL_ERROR: &str = r#"{"error":{"code":-32603,"message":"Internal error"}}"#;

fn app_for(runtime: &Arc<RelayRuntime>) -> Router {
    app::create_app(Arc::clone(runtime.proxy_engine()), &runtime.config().server)
}

fn post(path: &str, body: impl Into<Body>) -> Request<Body> {
    Request::post(path).header("content-type", "application/json").body(body.into()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

#[tokio::test]
#[serial]
async fn test_miss_then_hit_headers() {
    let mut mock = RpcMockBuilder::new().await;
    mock.expect_result("eth_blockNumber", json!("0x10"), 1);
    let runtime = runtime_for(&[mock.url()]);
    let request = rpc_request(0, "eth_blockNumber", &json!([]));

    let first = app_for(&runtime).oneshot(post("/", request.clone())).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["content-type"], "application/json");
    assert_eq!(first.headers()[X_CACHE_STATUS], "MISS");
    assert!(first.headers().contains_key(&X_REQUEST_ID));
    let first_body = body_bytes(first).await;

    // Any path works.
    let second = app_for(&runtime).oneshot(post("/some/other/path", request)).await.unwrap();
    assert_eq!(second.headers()[X_CACHE_STATUS], "HIT");
    assert_eq!(body_bytes(second).await, first_body);
    assert_eq!(parse_body(&first_body)["result"], "0x10");

    mock.assert_all().await;
}

#[tokio::test]
#[serial]
async fn test_get_returns_405() {
    let mut mock = RpcMockBuilder::new().await;
    mock.expect_http_status(200, "{}", 0);
    let runtime = runtime_for(&[mock.url()]);

    for method in ["GET", "PUT", "DELETE"] {
        let request = Request::builder().method(method).uri("/").body(Body::empty()).unwrap();
        let response = app_for(&runtime).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_bytes(response).await, "Method Not Allowed");
    }
    mock.assert_all().await;
}

#[tokio::test]
#[serial]
async fn test_malformed_body_returns_envelope() {
    let runtime = runtime_for(&[UNREACHABLE_URL]);

    for body in ["{broken", r#"{"jsonrpc":"2.0","id":1}"#, ""] {
        let response = app_for(&runtime).oneshot(post("/", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(body_bytes(response).await, INTERNAL_ERROR);
    }
    assert!(runtime.response_cache().is_empty());
}

#[tokio::test]
#[serial]
async fn test_unreachable_upstream_returns_envelope() {
    let runtime = runtime_for(&[UNREACHABLE_URL]);
    let request = rpc_request(1, "eth_blockNumber", &json!([]));

    let response = app_for(&runtime).oneshot(post("/", request)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_bytes(response).await, INTERNAL_ERROR);
    assert!(runtime.response_cache().is_empty());
}

#[tokio::test]
#[serial]
async fn test_oversized_body_rejected() {
    let mut mock = RpcMockBuilder::new().await;
    mock.expect_http_status(200, "{}", 0);
    let mut config = test_config(&[mock.url()]);
    config.server.max_body_bytes = 64;
    let runtime = runtime_for_config(config);

    let big = rpc_request(1, "eth_call", &json!(["x".repeat(256)]));
    let response = app_for(&runtime).oneshot(post("/", big)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    mock.assert_all().await;
}

#[tokio::test]
#[serial]
async fn test_non_post_with_oversized_body_is_405() {
    let mut mock = RpcMockBuilder::new().await;
    mock.expect_http_status(200, "{}", 0);
    let mut config = test_config(&[mock.url()]);
    config.server.max_body_bytes = 64;
    let runtime = runtime_for_config(config);

    for method in ["GET", "PUT"] {
        let big = rpc_request(1, "eth_call", &json!(["x".repeat(256)]));
        let request = Request::builder()
            .method(method)
            .uri("/")
            .header("content-length", big.len())
            .body(Body::from(big))
            .unwrap();
        let response = app_for(&runtime).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(response.headers()["allow"], "POST");
        assert_eq!(body_bytes(response).await, "Method Not Allowed");
    }
    mock.assert_all().await;
}

#[tokio::test]
#[serial]
async fn test_client_request_id_is_echoed() {
    let mut mock = RpcMockBuilder::new().await;
    mock.mock_result("eth_chainId", json!("0xa"));
    let runtime = runtime_for(&[mock.url()]);

    let request = Request::post("/")
        .header(X_REQUEST_ID.clone(), "trace-me-123")
        .body(Body::from(rpc_request(1, "eth_chainId", &json!([]))))
        .unwrap();
    let response = app_for(&runtime).oneshot(request).await.unwrap();

    assert_eq!(response.headers()[&X_REQUEST_ID], "trace-me-123");
}

async fn start_server(
    runtime: &Arc<RelayRuntime>,
) -> (String, tokio::sync::oneshot::Sender<()>, tokio::task::JoinHandle<DrainOutcome>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let runtime = Arc::clone(runtime);
    let handle = tokio::spawn(async move {
        let signal = async move {
            let _ = stop_rx.await;
        };
        app::serve(runtime, listener, signal).await.unwrap()
    });

    (url, stop_tx, handle)
}

async fn wait_for_state(runtime: &RelayRuntime, state: LifecycleState) {
    let mut rx = runtime.state_receiver();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == state))
        .await
        .expect("state not reached in time")
        .expect("state channel closed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_serve_over_tcp_then_signal_shutdown() {
    let mut mock = RpcMockBuilder::new().await;
    mock.expect_result("eth_blockNumber", json!("0x10"), 1);
    let runtime = runtime_for(&[mock.url()]);

    let (url, stop_tx, handle) = start_server(&runtime).await;
    wait_for_state(&runtime, LifecycleState::Running).await;

    let client = reqwest::Client::new();
    let body = rpc_request(0, "eth_blockNumber", &json!([]));
    let first = client.post(&url).body(body.clone()).send().await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(first.headers()[X_CACHE_STATUS], "MISS");
    let second = client.post(&url).body(body).send().await.unwrap();
    assert_eq!(second.headers()[X_CACHE_STATUS], "HIT");

    let get = client.get(&url).send().await.unwrap();
    assert_eq!(get.status(), 405);
    assert_eq!(get.text().await.unwrap(), "Method Not Allowed");

    stop_tx.send(()).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(10), handle).await.unwrap().unwrap();

    assert_eq!(outcome, DrainOutcome::Graceful);
    assert_eq!(runtime.state(), LifecycleState::Stopped);
    assert!(runtime.response_cache().is_empty(), "cache invalidated on drain");
    assert!(runtime.http_client().is_closed(), "transport closed on drain");
    assert!(client.post(&url).body("{}").send().await.is_err(), "listener is gone");
    mock.assert_all().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_programmatic_shutdown_and_double_trigger() {
    let runtime = runtime_for(&[UNREACHABLE_URL]);
    let (_url, _stop_tx, handle) = start_server(&runtime).await;
    wait_for_state(&runtime, LifecycleState::Running).await;

    assert!(runtime.trigger_shutdown());
    assert!(!runtime.trigger_shutdown());

    let outcome = tokio::time::timeout(Duration::from_secs(10), handle).await.unwrap().unwrap();
    assert_eq!(outcome, DrainOutcome::Graceful);
    assert_eq!(runtime.shutdown().await, DrainOutcome::AlreadyDraining);
    assert_eq!(runtime.state(), LifecycleState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_in_flight_request_completes_during_drain() {
    let upstream = InstrumentedUpstream::start(Duration::from_millis(300)).await;
    let runtime = runtime_for(&[upstream.url()]);
    let (url, stop_tx, handle) = start_server(&runtime).await;
    wait_for_state(&runtime, LifecycleState::Running).await;

    let request = tokio::spawn({
        let url = url.clone();
        async move {
            reqwest::Client::new()
                .post(&url)
                .body(rpc_request(1, "eth_blockNumber", &json!([])))
                .send()
                .await
        }
    });

    // Let the request reach the upstream before shutting down.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(upstream.requests(), 1);
    stop_tx.send(()).unwrap();

    let response = request.await.unwrap().expect("in-flight request should complete");
    assert_eq!(response.status(), 200);

    let outcome = tokio::time::timeout(Duration::from_secs(10), handle).await.unwrap().unwrap();
    assert_eq!(outcome, DrainOutcome::Graceful);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_stuck_request_forces_shutdown() {
    let upstream = InstrumentedUpstream::start(Duration::from_secs(30)).await;
    let mut config = test_config(&[upstream.url()]);
    config.upstreams.timeout_seconds = 60;
    config.shutdown.grace_period_seconds = 1;
    config.shutdown.force_timeout_seconds = 1;
    let runtime = runtime_for_config(config);
    let (url, stop_tx, handle) = start_server(&runtime).await;
    wait_for_state(&runtime, LifecycleState::Running).await;

    let _request = tokio::spawn(async move {
        reqwest::Client::new()
            .post(&url)
            .body(rpc_request(1, "eth_blockNumber", &json!([])))
            .send()
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = std::time::Instant::now();
    stop_tx.send(()).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(10), handle).await.unwrap().unwrap();

    assert_eq!(outcome, DrainOutcome::Forced);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(runtime.state(), LifecycleState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[serial]
async fn test_concurrency_cap_bounds_in_flight_requests() {
    let upstream = InstrumentedUpstream::start(Duration::from_millis(100)).await;
    let mut config = test_config(&[upstream.url()]);
    config.server.max_concurrent_requests = 3;
    let runtime = runtime_for_config(config);
    let (url, stop_tx, handle) = start_server(&runtime).await;
    wait_for_state(&runtime, LifecycleState::Running).await;

    let client = reqwest::Client::new();
    let requests: Vec<_> = (0..12_u64)
        .map(|i| {
            let client = client.clone();
            let url = url.clone();
            // Distinct params so nothing is served from cache.
            let body = rpc_request(i, "eth_getBalance", &json!([format!("0x{i:x}"), "latest"]));
            tokio::spawn(async move { client.post(&url).body(body).send().await })
        })
        .collect();

    for result in futures::future::join_all(requests).await {
        assert_eq!(result.unwrap().unwrap().status(), 200, "excess requests wait, not fail");
    }

    assert_eq!(upstream.requests(), 12);
    assert!(upstream.peak_in_flight() <= 3, "peak was {}", upstream.peak_in_flight());

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(10), handle).await.unwrap().unwrap();
}
