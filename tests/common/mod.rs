//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use asset_portal::auth::{AuthGate, HttpSignatureVerifier, RequestAuthenticator, TokenIssuer};
use asset_portal::config::StorageConfig;
use asset_portal::database::SqliteDatabase;
use asset_portal::server::AppState;
use asset_portal::storage::S3Store;

/// A well-formed 48-character wallet address for tests
pub const TEST_ADDRESS: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

/// A second wallet, for ownership checks
pub const OTHER_ADDRESS: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";

/// Create an in-memory database for testing
pub async fn create_test_database() -> Arc<SqliteDatabase> {
    Arc::new(
        SqliteDatabase::new(":memory:")
            .await
            .expect("Failed to create test database"),
    )
}

/// Create an object storage client pointed at the given endpoint
pub fn create_test_storage(endpoint: &str) -> S3Store {
    let config = StorageConfig {
        bucket: "test-bucket".to_string(),
        endpoint: Some(endpoint.to_string()),
        ..Default::default()
    };
    S3Store::new(&config).expect("Failed to create test storage")
}

/// Application state with authentication disabled
///
/// Mutating requests pass through with whatever address `X-Address` claims.
pub fn create_open_state(
    db: Arc<SqliteDatabase>,
    storage_endpoint: &str,
) -> AppState<SqliteDatabase> {
    AppState {
        authenticator: Arc::new(RequestAuthenticator::Disabled),
        issuer: Arc::new(TokenIssuer::new(
            Arc::clone(&db),
            chrono::Duration::minutes(5),
        )),
        database: db,
        storage: Arc::new(create_test_storage(storage_endpoint)),
    }
}

/// Application state enforcing the handshake against the given verifier URL
pub fn create_gated_state(
    db: Arc<SqliteDatabase>,
    verifier_url: &str,
) -> AppState<SqliteDatabase> {
    let verifier = HttpSignatureVerifier::new(verifier_url, std::time::Duration::from_secs(2))
        .expect("Failed to create verifier client");
    let gate = AuthGate::new(Arc::clone(&db), Arc::new(verifier));

    AppState {
        authenticator: Arc::new(RequestAuthenticator::Enforced(gate)),
        issuer: Arc::new(TokenIssuer::new(
            Arc::clone(&db),
            chrono::Duration::minutes(5),
        )),
        database: db,
        // Uploads are not part of the handshake tests; nothing listens here
        storage: Arc::new(create_test_storage("http://127.0.0.1:1")),
    }
}

/// Start a verifier stub that approves every signature
pub async fn start_approving_verifier() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/verify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "ok": true, "message": "" })),
        )
        .mount(&server)
        .await;
    server
}

/// Start a verifier stub that rejects every signature with the given reason
pub async fn start_rejecting_verifier(reason: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/verify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "ok": false, "message": reason })),
        )
        .mount(&server)
        .await;
    server
}

/// Attach the three handshake headers to a request
pub fn with_auth_headers(
    request: reqwest::RequestBuilder,
    address: &str,
    signature: &str,
    message: &str,
) -> reqwest::RequestBuilder {
    request
        .header("X-Address", address)
        .header("X-Signature", signature)
        .header("X-Message", message)
}

/// Fetch a nonce from the running server and return its raw value
pub async fn fetch_nonce(client: &reqwest::Client, addr: &std::net::SocketAddr) -> String {
    let response = client
        .get(format!("http://{}/nonce", addr))
        .send()
        .await
        .expect("Failed to request nonce");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = response.json().await.expect("Failed to parse nonce JSON");
    body["token"]
        .as_str()
        .expect("nonce body has no token value")
        .to_string()
}

/// Run a test server in the background and return the address
/// The server will be shut down when the returned shutdown sender is dropped or sent
pub async fn run_test_server(
    state: AppState<SqliteDatabase>,
) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local address");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let app = asset_portal::server::build_router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("Server error");
    });

    // Give the server a moment to start (100ms is sufficient for slow CI systems)
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    (addr, shutdown_tx)
}
