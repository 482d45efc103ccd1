use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use crate::db::StoredDocument;
use crate::models::*;

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness probe
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Document store unavailable", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Whether the caller's token is accepted
#[utoipa::path(
    get,
    path = "/api/auth-status",
    responses(
        (status = 200, description = "Authentication state", body = AuthStatusResponse)
    )
)]
#[allow(dead_code)]
pub async fn auth_status_doc() {}

/// Verified identity of the caller
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []), ("cookie" = []))
)]
#[allow(dead_code)]
pub async fn me_doc() {}

/// Create an empty document owned by the caller
#[utoipa::path(
    post,
    path = "/api/init-document",
    responses(
        (status = 200, description = "Document created", body = InitDocumentResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    ),
    security(("bearer" = []), ("cookie" = []))
)]
#[allow(dead_code)]
pub async fn init_document_doc() {}

/// Persist a document's content and language
#[utoipa::path(
    post,
    path = "/api/save-document",
    request_body = SaveDocumentRequest,
    responses(
        (status = 200, description = "Document saved", body = SaveDocumentResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 403, description = "Caller may not edit the document", body = ErrorResponse),
        (status = 404, description = "Unknown document", body = ErrorResponse)
    ),
    security(("bearer" = []), ("cookie" = []))
)]
#[allow(dead_code)]
pub async fn save_document_doc() {}

/// Documents the caller has saved
#[utoipa::path(
    get,
    path = "/api/load-documents",
    responses(
        (status = 200, description = "Saved documents", body = DocumentListResponse)
    ),
    security(("bearer" = []), ("cookie" = []))
)]
#[allow(dead_code)]
pub async fn load_documents_doc() {}

/// Load one document
#[utoipa::path(
    get,
    path = "/api/load-document/{document_id}",
    params(("document_id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document", body = DocumentResponse),
        (status = 403, description = "Caller may not load the document", body = ErrorResponse),
        (status = 404, description = "Unknown document", body = ErrorResponse)
    ),
    security(("bearer" = []), ("cookie" = []))
)]
#[allow(dead_code)]
pub async fn load_document_doc() {}

/// Ask a document's owner for access
#[utoipa::path(
    post,
    path = "/api/request-permission",
    request_body = RequestPermissionRequest,
    responses(
        (status = 200, description = "Request relayed", body = MessageResponse),
        (status = 404, description = "Unknown document", body = ErrorResponse)
    ),
    security(("bearer" = []), ("cookie" = []))
)]
#[allow(dead_code)]
pub async fn request_permission_doc() {}

/// Grant a user access to a document
#[utoipa::path(
    post,
    path = "/api/grant-permission",
    request_body = GrantPermissionRequest,
    responses(
        (status = 200, description = "Permission granted", body = MessageResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Unknown document", body = ErrorResponse)
    ),
    security(("bearer" = []), ("cookie" = []))
)]
#[allow(dead_code)]
pub async fn grant_permission_doc() {}

/// Run a snippet through the execution provider
#[utoipa::path(
    post,
    path = "/api/run-code",
    request_body = RunCodeRequest,
    responses(
        (status = 200, description = "Program output", body = RunCodeResponse),
        (status = 400, description = "Missing fields or unsupported language", body = ErrorResponse),
        (status = 500, description = "Provider failure", body = ErrorResponse),
        (status = 503, description = "No provider configured", body = ErrorResponse)
    ),
    security(("bearer" = []), ("cookie" = []))
)]
#[allow(dead_code)]
pub async fn run_code_doc() {}

/// Hub and process statistics
#[utoipa::path(
    get,
    path = "/api/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = DiagnosticsResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer" = []), ("cookie" = []))
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("token"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        auth_status_doc,
        me_doc,
        init_document_doc,
        save_document_doc,
        load_documents_doc,
        load_document_doc,
        request_permission_doc,
        grant_permission_doc,
        run_code_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            DiagnosticsResponse,
            AuthStatusResponse,
            MeResponse,
            UserResponse,
            InitDocumentResponse,
            SaveDocumentRequest,
            SaveDocumentResponse,
            DocumentResponse,
            DocumentListResponse,
            RequestPermissionRequest,
            GrantPermissionRequest,
            MessageResponse,
            RunCodeRequest,
            RunCodeResponse,
            StoredDocument,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "api", description = "Document, permission and execution endpoints")
    )
)]
pub struct ApiDoc;
