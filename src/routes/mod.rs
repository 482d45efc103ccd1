pub mod api;
pub mod auth_middleware;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::handlers::{health_check, ready_check};
use crate::ws::websocket_handler;
use crate::AppState;
pub use api::create_api_routes;

/// Assemble the full application: probes, the real-time endpoint, the JSON
/// API and the generated docs.
pub fn create_app(state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/ws", get(websocket_handler))
        .with_state(state.clone())
        // Mount API routes
        .nest("/api", create_api_routes(state.clone()))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add tracing layer
        .layer(TraceLayer::new_for_http());

    let origins = state.config.cors_origin_list();
    if origins.is_empty() {
        app
    } else {
        info!("CORS enabled for {:?}", origins);
        app.layer(cors_layer(&origins))
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{CodeExecutor, ExecutionError};
    use crate::config::Config;
    use crate::db::{DocumentStore, MemoryDocumentStore, StoreError, StoredDocument};
    use crate::models::ServerEvent;
    use crate::services::auth_service::testing::{mint_token, SECRET};
    use crate::ws::session::UserIdentity;
    use crate::ws::Hub;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::{self, Message};
    use tower::ServiceExt;

    struct StubExecutor;

    #[async_trait]
    impl CodeExecutor for StubExecutor {
        async fn execute(&self, code: &str, language: &str) -> Result<Option<String>, ExecutionError> {
            match (code, language) {
                (_, "cobol") => Err(ExecutionError::UnsupportedLanguage(language.to_string())),
                ("silent", _) => Ok(None),
                _ => Ok(Some("42\n".to_string())),
            }
        }
    }

    struct UnreachableStore;

    fn unreachable() -> StoreError {
        StoreError::Database(sqlx::Error::PoolClosed)
    }

    #[async_trait]
    impl DocumentStore for UnreachableStore {
        async fn create_document(&self, _: &str, _: &str, _: &str) -> Result<StoredDocument, StoreError> {
            Err(unreachable())
        }
        async fn find_document(&self, _: &str) -> Result<Option<StoredDocument>, StoreError> {
            Err(unreachable())
        }
        async fn save_document(&self, _: &str, _: &str, _: &str) -> Result<StoredDocument, StoreError> {
            Err(unreachable())
        }
        async fn add_permission(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(unreachable())
        }
        async fn mark_saved(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(unreachable())
        }
        async fn saved_documents(&self, _: &str) -> Result<Vec<StoredDocument>, StoreError> {
            Err(unreachable())
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(unreachable())
        }
    }

    fn state(executor: Option<Arc<dyn CodeExecutor>>) -> AppState {
        AppState {
            config: Arc::new(Config {
                auth_jwt_secret: Some(SECRET.to_string()),
                ..Config::default()
            }),
            hub: Arc::new(Hub::new("javascript")),
            store: Arc::new(MemoryDocumentStore::new()),
            executor,
        }
    }

    async fn call(
        state: &AppState,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&body).unwrap())
            }
            None => Body::empty(),
        };

        let response = create_app(state.clone())
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn init_document(state: &AppState, token: &str) -> String {
        let (status, body) = call(state, Method::POST, "/api/init-document", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        body["documentId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn probes_are_public_and_api_requires_a_token() {
        let state = state(None);
        let (status, body) = call(&state, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = call(&state, Method::GET, "/api/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

        let (status, body) = call(&state, Method::GET, "/api/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], 401);

        let token = mint_token("u-1", "alice!", &[]);
        let (status, body) = call(&state, Method::GET, "/api/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"user": {"id": "u-1", "username": "alice"}}));
    }

    #[tokio::test]
    async fn readiness_follows_the_document_store() {
        let ready = state(None);
        let (status, body) = call(&ready, Method::GET, "/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let down = AppState {
            store: Arc::new(UnreachableStore),
            ..state(None)
        };
        let (status, body) = call(&down, Method::GET, "/ready", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unavailable");

        let token = mint_token("u-1", "alice", &[]);
        let (status, body) = call(&down, Method::POST, "/api/init-document", Some(&token), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], 500);
    }

    #[tokio::test]
    async fn missing_secret_is_a_server_error_with_body() {
        let state = AppState {
            config: Arc::new(Config::default()),
            ..state(None)
        };
        let token = mint_token("u-1", "alice", &[]);
        let (status, body) = call(&state, Method::GET, "/api/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], 500);
    }

    #[tokio::test]
    async fn auth_status_reports_token_validity() {
        let state = state(None);
        let (_, body) = call(&state, Method::GET, "/api/auth-status", None, None).await;
        assert_eq!(body["authenticated"], false);

        let token = mint_token("u-1", "alice", &[]);
        let (_, body) = call(&state, Method::GET, "/api/auth-status", Some(&token), None).await;
        assert_eq!(body["authenticated"], true);
    }

    #[tokio::test]
    async fn document_lifecycle_respects_ownership() {
        let state = state(None);
        let owner = mint_token("owner", "olive", &[]);
        let stranger = mint_token("stranger", "sam", &[]);

        let document_id = init_document(&state, &owner).await;
        assert!(document_id.starts_with("doc-"));

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/save-document",
            Some(&owner),
            Some(json!({"documentId": document_id, "language": "python"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/save-document",
            Some(&owner),
            Some(json!({"documentId": "doc-missing", "content": "x", "language": "python"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let save = json!({"documentId": document_id, "content": "print(1)", "language": "python"});
        let (status, _) = call(&state, Method::POST, "/api/save-document", Some(&stranger), Some(save.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&state, Method::POST, "/api/save-document", Some(&owner), Some(save)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["document"]["content"], "print(1)");
        assert_eq!(body["document"]["language"], "python");

        let (_, body) = call(&state, Method::GET, "/api/load-documents", Some(&owner), None).await;
        assert_eq!(body["documents"].as_array().unwrap().len(), 1);
        assert_eq!(body["documents"][0]["documentId"], document_id.as_str());

        let uri = format!("/api/load-document/{document_id}");
        let (status, body) = call(&state, Method::GET, &uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["document"]["ownerId"], "owner");

        let (status, body) = call(&state, Method::GET, &uri, Some(&stranger), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], 403);

        let (status, _) = call(&state, Method::GET, "/api/load-document/doc-missing", Some(&owner), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn permission_routes_signal_live_identity_channels() {
        let state = state(None);
        let owner = mint_token("owner", "olive", &[]);
        let guest = mint_token("guest", "gus!", &[]);
        let document_id = init_document(&state, &owner).await;

        let (_owner_session, mut owner_rx) = state
            .hub
            .connect(UserIdentity { user_id: "owner".into(), username: "olive".into() })
            .await;
        let (_guest_session, mut guest_rx) = state
            .hub
            .connect(UserIdentity { user_id: "guest".into(), username: "gus".into() })
            .await;

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/request-permission",
            Some(&guest),
            Some(json!({"documentId": document_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            *owner_rx.try_recv().unwrap(),
            ServerEvent::PermissionRequest {
                document_id: document_id.clone(),
                requester_id: "guest".to_string(),
                requester_name: "gus".to_string(),
            }
        );

        let grant = json!({"documentId": document_id, "userId": "guest"});
        let (status, _) = call(&state, Method::POST, "/api/grant-permission", Some(&guest), Some(grant.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&state, Method::POST, "/api/grant-permission", Some(&owner), Some(grant)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            *guest_rx.try_recv().unwrap(),
            ServerEvent::PermissionGranted { document_id: document_id.clone() }
        );

        let uri = format!("/api/load-document/{document_id}");
        let (status, _) = call(&state, Method::GET, &uri, Some(&guest), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/request-permission",
            Some(&guest),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn run_code_maps_executor_outcomes() {
        let token = mint_token("u-1", "alice", &[]);

        let unconfigured = state(None);
        let (status, _) = call(
            &unconfigured,
            Method::POST,
            "/api/run-code",
            Some(&token),
            Some(json!({"code": "1", "language": "python"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let state = state(Some(Arc::new(StubExecutor)));
        let (status, body) = call(
            &state,
            Method::POST,
            "/api/run-code",
            Some(&token),
            Some(json!({"code": "print(42)", "language": "python"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"output": "42\n", "executedBy": "alice"}));

        let (_, body) = call(
            &state,
            Method::POST,
            "/api/run-code",
            Some(&token),
            Some(json!({"code": "silent", "language": "python"})),
        )
        .await;
        assert_eq!(body["output"], "No output");

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/run-code",
            Some(&token),
            Some(json!({"code": "x", "language": "cobol"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/run-code",
            Some(&token),
            Some(json!({"language": "python"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn diagnostics_require_admin_role() {
        let state = state(None);
        let user = mint_token("u-1", "alice", &[]);
        let admin = mint_token("root", "root", &["admin"]);

        let (_session, _rx) = state
            .hub
            .connect(UserIdentity { user_id: "u-1".into(), username: "alice".into() })
            .await;

        let (status, _) = call(&state, Method::GET, "/api/diagnostics", Some(&user), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&state, Method::GET, "/api/diagnostics", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["n_conn"], 1);
        assert_eq!(body["n_identity_channels"], 1);
        assert_eq!(body["n_rooms"], 0);
    }

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn next_of_type(client: &mut Client, kind: &str) -> Value {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let frame = client.next().await.expect("socket closed").expect("socket error");
                if let Message::Text(_) = frame {
                    let value: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
                    if value["type"] == kind {
                        return value;
                    }
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    async fn send(client: &mut Client, value: Value) {
        client.send(Message::text(value.to_string())).await.unwrap();
    }

    #[tokio::test]
    async fn websocket_session_end_to_end() {
        let state = state(None);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let err = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap_err();
        assert!(matches!(err, tungstenite::Error::Http(ref response) if response.status() == 401));

        let alice = mint_token("u-a", "alice", &[]);
        let bob = mint_token("u-b", "bob", &[]);
        let (mut a, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws?token={alice}"))
            .await
            .unwrap();
        let (mut b, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws?token={bob}"))
            .await
            .unwrap();

        send(&mut a, json!({"type": "join-document", "documentId": "doc-e2e", "username": "alice!"})).await;
        let content = next_of_type(&mut a, "document-content").await;
        assert_eq!(content["content"], "");
        assert_eq!(content["language"], "javascript");
        assert_eq!(next_of_type(&mut a, "users-count").await["count"], 1);

        send(&mut a, json!({"type": "text-change", "documentId": "doc-e2e", "content": "let x = 1;"})).await;
        // malformed frames are dropped without closing the connection
        a.send(Message::text("{not json")).await.unwrap();
        send(&mut a, json!({"type": "chat-message", "documentId": "doc-e2e", "message": "ready"})).await;
        assert_eq!(next_of_type(&mut a, "chat-message").await["username"], "alice");

        send(&mut b, json!({"type": "join-document", "documentId": "doc-e2e", "username": "bob"})).await;
        let content = next_of_type(&mut b, "document-content").await;
        assert_eq!(content["content"], "let x = 1;");
        let participants = next_of_type(&mut b, "participants-update").await;
        let names: Vec<_> = participants["participants"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["username"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(next_of_type(&mut a, "users-count").await["count"], 2);

        send(&mut b, json!({"type": "chat-message", "documentId": "doc-e2e", "message": "hi"})).await;
        let chat = next_of_type(&mut a, "chat-message").await;
        assert_eq!(chat["username"], "bob");
        assert_eq!(chat["message"], "hi");

        b.close(None).await.unwrap();
        next_of_type(&mut a, "user-disconnected").await;
        let count = next_of_type(&mut a, "users-count").await;
        assert_eq!(count["count"], 1);
    }
}
