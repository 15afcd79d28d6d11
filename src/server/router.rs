//! HTTP router for asset-portal
//!
//! This module defines the axum router that handles all HTTP requests.
//! It provides routes for:
//! - Health checks and nonce issuance
//! - Asset CRUD, with writes gated behind the wallet handshake
//! - Image upload to object storage

use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{RequestAuthenticator, TokenIssuer};
use crate::database::Database;
use crate::error::{DbError, ValidationError};
use crate::models::asset::{validate_id, MAX_FILE_SIZE};
use crate::models::{ApiResponse, Asset, ListAssetsParams, NewAsset, UpdateAsset};
use crate::server::middleware::{auth_middleware, AuthenticatedWallet};
use crate::storage::ObjectStore;

/// Upload request body cap: the file size limit plus multipart framing
const UPLOAD_BODY_LIMIT: usize = MAX_FILE_SIZE + 64 * 1024;

/// Shared application state
pub struct AppState<D: Database> {
    /// Authentication policy applied to protected routes
    pub authenticator: Arc<RequestAuthenticator<D>>,

    /// Nonce token issuance
    pub issuer: Arc<TokenIssuer<D>>,

    /// Database
    pub database: Arc<D>,

    /// Object storage for uploaded images
    pub storage: Arc<dyn ObjectStore>,
}

impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            authenticator: Arc::clone(&self.authenticator),
            issuer: Arc::clone(&self.issuer),
            database: Arc::clone(&self.database),
            storage: Arc::clone(&self.storage),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Build the main application router
///
/// Asset writes pass through the authentication gate; reads, nonce
/// issuance, and uploads do not.
pub fn build_router<D: Database + 'static>(state: AppState<D>) -> Router {
    let authenticator = Arc::clone(&state.authenticator);

    let protected = Router::new()
        .route("/assets", post(create_asset_handler::<D>))
        .route(
            "/assets/:id",
            put(update_asset_handler::<D>).delete(delete_asset_handler::<D>),
        )
        .route_layer(middleware::from_fn_with_state(
            authenticator,
            auth_middleware::<D>,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/nonce", get(nonce_handler::<D>))
        .route("/assets", get(list_assets_handler::<D>))
        .route("/assets/:id", get(get_asset_handler::<D>))
        .route("/upload", post(upload_handler::<D>))
        .merge(protected)
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .with_state(state)
}

fn error_response(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiResponse>) {
    (status, Json(ApiResponse::error(message)))
}

fn validation_failure(error: ValidationError) -> (StatusCode, Json<ApiResponse>) {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
}

// =============================================================================
// Health and Nonce Handlers
// =============================================================================

/// Health check endpoint handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Nonce issuance handler
///
/// Returns the bare token object rather than the response envelope; the
/// client signs the `token` value and echoes it in `X-Message`.
async fn nonce_handler<D: Database + 'static>(State(state): State<AppState<D>>) -> Response {
    match state.issuer.issue().await {
        Ok(token) => (StatusCode::OK, Json(token)).into_response(),
        Err(e) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// =============================================================================
// Asset Handlers
// =============================================================================

/// Create asset handler
async fn create_asset_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(wallet): Extension<AuthenticatedWallet>,
    Json(payload): Json<NewAsset>,
) -> (StatusCode, Json<ApiResponse>) {
    if let Err(e) = payload.validate() {
        return validation_failure(e);
    }

    let now = Utc::now();
    let asset = Asset {
        id: payload.id,
        address: wallet.0.address,
        description: payload.description,
        image: payload.image,
        social: payload.social,
        created_at: now,
        updated_at: now,
    };

    match state.database.create_asset(&asset).await {
        Ok(()) => (StatusCode::CREATED, Json(ApiResponse::data(&asset))),
        Err(DbError::ConstraintViolation(_)) => {
            error_response(StatusCode::UNPROCESSABLE_ENTITY, "id exists")
        }
        Err(e) => {
            tracing::error!(error = %e, id = %asset.id, "asset insert failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error creating asset in database",
            )
        }
    }
}

/// List assets handler
async fn list_assets_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Query(params): Query<ListAssetsParams>,
) -> (StatusCode, Json<ApiResponse>) {
    let query = match params.validate() {
        Ok(query) => query,
        Err(e) => return validation_failure(e),
    };

    match state.database.get_assets(&query).await {
        Ok(assets) => (StatusCode::OK, Json(ApiResponse::data(&assets))),
        Err(e) => {
            tracing::error!(error = %e, "asset listing failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error getting asset in database",
            )
        }
    }
}

/// Get asset by id handler
async fn get_asset_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    if let Err(e) = validate_id(&id) {
        return validation_failure(e);
    }

    match state.database.get_asset_by_id(&id).await {
        Ok(Some(asset)) => (StatusCode::OK, Json(ApiResponse::data(&asset))),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "asset not found"),
        Err(e) => {
            tracing::error!(error = %e, id = %id, "asset lookup failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error getting asset in database",
            )
        }
    }
}

/// Update asset handler
///
/// Only the asset's owner can update it; everyone else sees the same 404
/// as for a missing asset.
async fn update_asset_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
    Extension(wallet): Extension<AuthenticatedWallet>,
    Json(changes): Json<UpdateAsset>,
) -> (StatusCode, Json<ApiResponse>) {
    if let Err(e) = validate_id(&id) {
        return validation_failure(e);
    }
    if let Err(e) = changes.validate() {
        return validation_failure(e);
    }

    match state
        .database
        .update_asset(&id, &wallet.0.address, &changes)
        .await
    {
        Ok(asset) => (StatusCode::OK, Json(ApiResponse::data(&asset))),
        Err(DbError::NotFound) => error_response(
            StatusCode::NOT_FOUND,
            "asset does not exist or do not belong to the user",
        ),
        Err(e) => {
            tracing::error!(error = %e, id = %id, "asset update failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error updating asset in database",
            )
        }
    }
}

/// Delete asset handler
async fn delete_asset_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
    Extension(wallet): Extension<AuthenticatedWallet>,
) -> (StatusCode, Json<ApiResponse>) {
    if let Err(e) = validate_id(&id) {
        return validation_failure(e);
    }

    match state.database.delete_asset(&id, &wallet.0.address).await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::empty())),
        Err(DbError::NotFound) => error_response(
            StatusCode::NOT_FOUND,
            "asset does not exist or do not belong to the user",
        ),
        Err(e) => {
            tracing::error!(error = %e, id = %id, "asset delete failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error deleting asset in database",
            )
        }
    }
}

// =============================================================================
// Upload Handler
// =============================================================================

/// Detect the image format from its leading bytes
///
/// Returns the content type and the file extension for the stored key.
fn sniff_image(bytes: &[u8]) -> Option<(&'static str, &'static str)> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(("image/jpeg", ".jpg"));
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        return Some(("image/png", ".png"));
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some(("image/gif", ".gif"));
    }
    None
}

fn form_read_failure() -> (StatusCode, Json<ApiResponse>) {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to read file data")
}

/// Image upload handler
///
/// Accepts a multipart form with an `id` field and a `file` field. The
/// declared content type is ignored; the format comes from the file's own
/// leading bytes.
async fn upload_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    mut multipart: Multipart,
) -> (StatusCode, Json<ApiResponse>) {
    let mut id = String::new();
    let mut file: Option<Bytes> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => match field.name() {
                Some("id") => match field.text().await {
                    Ok(text) => id = text,
                    Err(_) => return form_read_failure(),
                },
                Some("file") => match field.bytes().await {
                    Ok(bytes) => file = Some(bytes),
                    Err(_) => return form_read_failure(),
                },
                _ => {}
            },
            Ok(None) => break,
            Err(_) => return form_read_failure(),
        }
    }

    if let Err(e) = validate_id(&id) {
        return validation_failure(e);
    }
    let Some(file) = file else {
        return validation_failure(ValidationError::MissingFile);
    };
    if file.len() > MAX_FILE_SIZE {
        return validation_failure(ValidationError::FileTooLarge(MAX_FILE_SIZE / (1024 * 1024)));
    }
    let Some((content_type, extension)) = sniff_image(&file) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            ValidationError::UnsupportedFileType.to_string(),
        );
    };

    let key = format!("{}_{}{}", id, Utc::now().timestamp(), extension);

    match state.storage.upload(&key, file, content_type).await {
        Ok(url) => (
            StatusCode::OK,
            Json(ApiResponse::data(&serde_json::json!({ "url": url }))),
        ),
        Err(e) => {
            tracing::error!(error = %e, key = %key, "file upload failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to upload image")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verifier::{MockSignatureVerifier, Verdict};
    use crate::auth::AuthGate;
    use crate::database::MockDatabase;
    use crate::error::AuthError;
    use crate::models::{ConsumeOutcome, Token};
    use crate::server::middleware::{X_ADDRESS, X_MESSAGE, X_SIGNATURE};
    use crate::storage::MockObjectStore;
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use chrono::Duration;

    const ADDRESS: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
    const NONCE: &str = "a3f2b8c1d4e5f6a7";

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn stored_asset(id: &str) -> Asset {
        let now = Utc::now();
        Asset {
            id: id.to_string(),
            address: ADDRESS.to_string(),
            description: Some("a test asset".to_string()),
            image: None,
            social: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// State with authentication disabled; the claimed address passes through
    fn open_state(db: MockDatabase, storage: MockObjectStore) -> AppState<MockDatabase> {
        let db = Arc::new(db);
        AppState {
            authenticator: Arc::new(RequestAuthenticator::Disabled),
            issuer: Arc::new(TokenIssuer::new(Arc::clone(&db), Duration::minutes(5))),
            database: db,
            storage: Arc::new(storage),
        }
    }

    /// State enforcing the full handshake against the given mocks
    fn gated_state(db: MockDatabase, verifier: MockSignatureVerifier) -> AppState<MockDatabase> {
        let db = Arc::new(db);
        let gate = AuthGate::new(Arc::clone(&db), Arc::new(verifier));
        AppState {
            authenticator: Arc::new(RequestAuthenticator::Enforced(gate)),
            issuer: Arc::new(TokenIssuer::new(Arc::clone(&db), Duration::minutes(5))),
            database: db,
            storage: Arc::new(MockObjectStore::new()),
        }
    }

    fn test_server(state: AppState<MockDatabase>) -> TestServer {
        TestServer::new(build_router(state)).unwrap()
    }

    fn address_header() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(X_ADDRESS),
            HeaderValue::from_static(ADDRESS),
        )
    }

    // Test 1: Health endpoint returns OK
    #[tokio::test]
    async fn test_health_endpoint() {
        let server = test_server(open_state(MockDatabase::new(), MockObjectStore::new()));

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: HealthResponse = response.json();
        assert_eq!(body.status, "healthy");
        assert!(!body.version.is_empty());
    }

    // Test 2: Nonce endpoint returns the bare token object
    #[tokio::test]
    async fn test_nonce_endpoint() {
        let mut db = MockDatabase::new();
        db.expect_create_token().returning(|_| Ok(()));

        let server = test_server(open_state(db, MockObjectStore::new()));

        let response = server.get("/nonce").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        let token = body["token"].as_str().unwrap();
        assert_eq!(token.len(), 64);
        assert!(body.get("ok").is_none(), "nonce body is not enveloped");
        assert!(body["expires_at"].is_string());
    }

    // Test 3: Nonce endpoint reports persistence failures
    #[tokio::test]
    async fn test_nonce_endpoint_store_failure() {
        let mut db = MockDatabase::new();
        db.expect_create_token()
            .returning(|_| Err(DbError::Connection("connection lost".to_string())));

        let server = test_server(open_state(db, MockObjectStore::new()));

        let response = server.get("/nonce").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        let body: ApiResponse = response.json();
        assert_eq!(
            body.message.as_deref(),
            Some("error creating token in database")
        );
    }

    // Test 4: Creating an asset returns 201 with the stored record
    #[tokio::test]
    async fn test_create_asset() {
        let mut db = MockDatabase::new();
        db.expect_create_asset()
            .withf(|asset| asset.id == "abc123" && asset.address == ADDRESS)
            .returning(|_| Ok(()));

        let server = test_server(open_state(db, MockObjectStore::new()));
        let (name, value) = address_header();

        let response = server
            .post("/assets")
            .add_header(name, value)
            .json(&serde_json::json!({
                "id": "abc123",
                "description": "a test asset",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse = response.json();
        assert!(body.ok);
        let data = body.data.unwrap();
        assert_eq!(data["id"], "abc123");
        assert_eq!(data["address"], ADDRESS);
    }

    // Test 5: Create rejects an invalid id before touching the database
    #[tokio::test]
    async fn test_create_asset_invalid_id() {
        let server = test_server(open_state(MockDatabase::new(), MockObjectStore::new()));
        let (name, value) = address_header();

        let response = server
            .post("/assets")
            .add_header(name, value)
            .json(&serde_json::json!({ "id": "0invalid" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: ApiResponse = response.json();
        assert_eq!(
            body.message.as_deref(),
            Some("id must be a valid Base58 string")
        );
    }

    // Test 6: A duplicate id reads as "id exists"
    #[tokio::test]
    async fn test_create_asset_duplicate_id() {
        let mut db = MockDatabase::new();
        db.expect_create_asset()
            .returning(|_| Err(DbError::ConstraintViolation("assets.id".to_string())));

        let server = test_server(open_state(db, MockObjectStore::new()));
        let (name, value) = address_header();

        let response = server
            .post("/assets")
            .add_header(name, value)
            .json(&serde_json::json!({ "id": "abc123" }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: ApiResponse = response.json();
        assert_eq!(body.message.as_deref(), Some("id exists"));
    }

    // Test 7: Database failure on create is a 500 with the generic message
    #[tokio::test]
    async fn test_create_asset_db_failure() {
        let mut db = MockDatabase::new();
        db.expect_create_asset()
            .returning(|_| Err(DbError::Connection("connection lost".to_string())));

        let server = test_server(open_state(db, MockObjectStore::new()));
        let (name, value) = address_header();

        let response = server
            .post("/assets")
            .add_header(name, value)
            .json(&serde_json::json!({ "id": "abc123" }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: ApiResponse = response.json();
        assert_eq!(
            body.message.as_deref(),
            Some("error creating asset in database")
        );
    }

    // Test 8: Listing assets passes the address filter through
    #[tokio::test]
    async fn test_list_assets_with_filter() {
        let mut db = MockDatabase::new();
        db.expect_get_assets()
            .withf(|query| query.address.as_deref() == Some(ADDRESS))
            .returning(|_| Ok(vec![stored_asset("abc123")]));

        let server = test_server(open_state(db, MockObjectStore::new()));

        let response = server
            .get("/assets")
            .add_query_param("address", ADDRESS)
            .await;

        response.assert_status_ok();
        let body: ApiResponse = response.json();
        let data = body.data.unwrap();
        assert_eq!(data.as_array().unwrap().len(), 1);
        assert_eq!(data[0]["id"], "abc123");
    }

    // Test 9: Listing rejects an unknown ordering column
    #[tokio::test]
    async fn test_list_assets_invalid_order() {
        let server = test_server(open_state(MockDatabase::new(), MockObjectStore::new()));

        let response = server.get("/assets").add_query_param("order", "color").await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: ApiResponse = response.json();
        assert_eq!(
            body.message.as_deref(),
            Some("order fields are: id, address, and created_at")
        );
    }

    // Test 10: Getting a known asset returns it enveloped
    #[tokio::test]
    async fn test_get_asset() {
        let mut db = MockDatabase::new();
        db.expect_get_asset_by_id()
            .withf(|id| id == "abc123")
            .returning(|_| Ok(Some(stored_asset("abc123"))));

        let server = test_server(open_state(db, MockObjectStore::new()));

        let response = server.get("/assets/abc123").await;
        response.assert_status_ok();

        let body: ApiResponse = response.json();
        assert_eq!(body.data.unwrap()["id"], "abc123");
    }

    // Test 11: An unknown asset id is a 404
    #[tokio::test]
    async fn test_get_asset_not_found() {
        let mut db = MockDatabase::new();
        db.expect_get_asset_by_id().returning(|_| Ok(None));

        let server = test_server(open_state(db, MockObjectStore::new()));

        let response = server.get("/assets/abc123").await;
        response.assert_status(StatusCode::NOT_FOUND);

        let body: ApiResponse = response.json();
        assert_eq!(body.message.as_deref(), Some("asset not found"));
    }

    // Test 12: Updating an owned asset returns the stored record
    #[tokio::test]
    async fn test_update_asset() {
        let mut db = MockDatabase::new();
        db.expect_update_asset()
            .withf(|id, address, changes| {
                id == "abc123"
                    && address == ADDRESS
                    && changes.description.as_deref() == Some("updated")
            })
            .returning(|_, _, _| {
                let mut asset = stored_asset("abc123");
                asset.description = Some("updated".to_string());
                Ok(asset)
            });

        let server = test_server(open_state(db, MockObjectStore::new()));
        let (name, value) = address_header();

        let response = server
            .put("/assets/abc123")
            .add_header(name, value)
            .json(&serde_json::json!({ "description": "updated" }))
            .await;

        response.assert_status_ok();
        let body: ApiResponse = response.json();
        assert_eq!(body.data.unwrap()["description"], "updated");
    }

    // Test 13: Updating someone else's asset is a 404
    #[tokio::test]
    async fn test_update_asset_not_owned() {
        let mut db = MockDatabase::new();
        db.expect_update_asset()
            .returning(|_, _, _| Err(DbError::NotFound));

        let server = test_server(open_state(db, MockObjectStore::new()));
        let (name, value) = address_header();

        let response = server
            .put("/assets/abc123")
            .add_header(name, value)
            .json(&serde_json::json!({ "description": "updated" }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: ApiResponse = response.json();
        assert_eq!(
            body.message.as_deref(),
            Some("asset does not exist or do not belong to the user")
        );
    }

    // Test 14: Deleting an owned asset returns the empty envelope
    #[tokio::test]
    async fn test_delete_asset() {
        let mut db = MockDatabase::new();
        db.expect_delete_asset()
            .withf(|id, address| id == "abc123" && address == ADDRESS)
            .returning(|_, _| Ok(()));

        let server = test_server(open_state(db, MockObjectStore::new()));
        let (name, value) = address_header();

        let response = server.delete("/assets/abc123").add_header(name, value).await;

        response.assert_status_ok();
        let body: ApiResponse = response.json();
        assert!(body.ok);
        assert!(body.data.is_none());
    }

    // Test 15: Deleting someone else's asset is a 404
    #[tokio::test]
    async fn test_delete_asset_not_owned() {
        let mut db = MockDatabase::new();
        db.expect_delete_asset()
            .returning(|_, _| Err(DbError::NotFound));

        let server = test_server(open_state(db, MockObjectStore::new()));
        let (name, value) = address_header();

        let response = server.delete("/assets/abc123").add_header(name, value).await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: ApiResponse = response.json();
        assert_eq!(
            body.message.as_deref(),
            Some("asset does not exist or do not belong to the user")
        );
    }

    // Test 16: Uploading a PNG stores it under a derived key
    #[tokio::test]
    async fn test_upload_png() {
        let mut storage = MockObjectStore::new();
        storage
            .expect_upload()
            .withf(|key, _, content_type| {
                key.starts_with("abc123_") && key.ends_with(".png") && content_type == "image/png"
            })
            .returning(|key, _, _| Ok(format!("https://media.s3.amazonaws.com/{}", key)));

        let server = test_server(open_state(MockDatabase::new(), storage));

        let form = MultipartForm::new().add_text("id", "abc123").add_part(
            "file",
            Part::bytes(PNG_MAGIC.to_vec())
                .file_name("image.png")
                .mime_type("image/png"),
        );

        let response = server.post("/upload").multipart(form).await;

        response.assert_status_ok();
        let body: ApiResponse = response.json();
        let url = body.data.unwrap()["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("https://media.s3.amazonaws.com/abc123_"));
        assert!(url.ends_with(".png"));
    }

    // Test 17: Upload rejects files that are not JPEG, PNG, or GIF
    #[tokio::test]
    async fn test_upload_wrong_type() {
        let server = test_server(open_state(MockDatabase::new(), MockObjectStore::new()));

        let form = MultipartForm::new().add_text("id", "abc123").add_part(
            "file",
            Part::bytes(b"%PDF-1.4 not an image".to_vec())
                .file_name("doc.pdf")
                .mime_type("application/pdf"),
        );

        let response = server.post("/upload").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ApiResponse = response.json();
        assert_eq!(
            body.message.as_deref(),
            Some("invalid file type; only JPEG, PNG, and GIF are allowed")
        );
    }

    // Test 18: Upload without a file part is a validation failure
    #[tokio::test]
    async fn test_upload_missing_file() {
        let server = test_server(open_state(MockDatabase::new(), MockObjectStore::new()));

        let form = MultipartForm::new().add_text("id", "abc123");
        let response = server.post("/upload").multipart(form).await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: ApiResponse = response.json();
        assert_eq!(body.message.as_deref(), Some("file is required"));
    }

    // Test 19: Writes without handshake headers never reach the database
    #[tokio::test]
    async fn test_protected_route_rejects_anonymous() {
        let server = test_server(gated_state(
            MockDatabase::new(),
            MockSignatureVerifier::new(),
        ));

        let response = server
            .post("/assets")
            .json(&serde_json::json!({ "id": "abc123" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ApiResponse = response.json();
        assert_eq!(
            body.message.as_deref(),
            Some(AuthError::MissingHeaders.to_string().as_str())
        );
    }

    // Test 20: A complete handshake creates the asset for the proven wallet
    #[tokio::test]
    async fn test_protected_route_full_handshake() {
        let mut db = MockDatabase::new();
        let mut verifier = MockSignatureVerifier::new();

        db.expect_get_token()
            .returning(|_| Ok(Some(Token::new(NONCE, Duration::minutes(5)))));
        verifier.expect_verify().returning(|_, _, _| {
            Ok(Verdict {
                ok: true,
                message: String::new(),
            })
        });
        db.expect_consume_token()
            .returning(|_| Ok(ConsumeOutcome::Consumed));
        db.expect_create_asset()
            .withf(|asset| asset.address == ADDRESS)
            .returning(|_| Ok(()));

        let server = test_server(gated_state(db, verifier));

        let response = server
            .post("/assets")
            .add_header(
                HeaderName::from_static(X_ADDRESS),
                HeaderValue::from_static(ADDRESS),
            )
            .add_header(
                HeaderName::from_static(X_SIGNATURE),
                HeaderValue::from_static("0xdeadbeef"),
            )
            .add_header(
                HeaderName::from_static(X_MESSAGE),
                HeaderValue::from_static(NONCE),
            )
            .json(&serde_json::json!({ "id": "abc123" }))
            .await;

        response.assert_status(StatusCode::CREATED);

        // Reads stay open
        let mut db = MockDatabase::new();
        db.expect_get_asset_by_id().returning(|_| Ok(None));
        let server = test_server(gated_state(db, MockSignatureVerifier::new()));

        let response = server.get("/assets/abc123").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}
