use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::error;

use crate::clients::ExecutionError;
use crate::models::{ApiError, ErrorResponse, RunCodeRequest, RunCodeResponse};
use crate::services::auth_service::AuthUser;
use crate::AppState;

const NO_OUTPUT: &str = "No output";

/// Run a snippet through the execution provider. Clients share the result
/// with their room afterwards via `code-execution-result`.
pub async fn run_code(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RunCodeRequest>,
) -> Result<(StatusCode, Json<RunCodeResponse>), ApiError> {
    let Some(executor) = state.executor.as_ref() else {
        return Err(ErrorResponse::build(
            StatusCode::SERVICE_UNAVAILABLE,
            "Code execution is not configured",
        ));
    };

    let (Some(code), Some(language)) = (
        body.code.filter(|c| !c.is_empty()),
        body.language.filter(|l| !l.is_empty()),
    ) else {
        return Err(ErrorResponse::bad_request("Code and language are required."));
    };

    match executor.execute(&code, &language).await {
        Ok(output) => Ok((
            StatusCode::OK,
            Json(RunCodeResponse {
                output: output
                    .filter(|o| !o.is_empty())
                    .unwrap_or_else(|| NO_OUTPUT.to_string()),
                executed_by: user.username,
            }),
        )),
        Err(ExecutionError::UnsupportedLanguage(_)) => {
            Err(ErrorResponse::bad_request("Unsupported language."))
        }
        Err(e) => {
            error!("Code execution failed for {}: {}", user.id, e);
            Err(ErrorResponse::internal(format!("Code execution failed: {}", e)))
        }
    }
}
