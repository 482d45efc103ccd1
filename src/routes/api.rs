use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::{
    auth_status, diagnostics, grant_permission, init_document, load_document, load_documents,
    me, request_permission, run_code, save_document,
};
use crate::routes::auth_middleware::auth_middleware;
use crate::AppState;

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/init-document", post(init_document))
        .route("/save-document", post(save_document))
        .route("/load-documents", get(load_documents))
        .route("/load-document/:document_id", get(load_document))
        .route("/request-permission", post(request_permission))
        .route("/grant-permission", post(grant_permission))
        .route("/run-code", post(run_code))
        .route("/diagnostics", get(diagnostics))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)); // Applies to all routes added above

    Router::new()
        .route("/auth-status", get(auth_status))
        .merge(protected)
        .with_state(state)
}
