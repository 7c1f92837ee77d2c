pub mod assignments;
pub mod availability;
pub mod certifications;
pub mod evaluations;
pub mod psms;
pub mod registration;
pub mod rewards;
pub mod sessions;
pub mod upload;
pub mod users;

use axum::http::StatusCode;
use axum::response::Json;

use motusdao_common::{ApiResponse, AppError};

pub type HandlerError = (StatusCode, Json<ApiResponse<()>>);
pub type HandlerResult<T> = Result<Json<ApiResponse<T>>, HandlerError>;

/// Convert an `AppError` into the JSON error envelope. Client errors
/// keep their descriptive message as-is; everything else interpolates
/// the caught error after the operation context, the way the route
/// handlers have always reported failures.
pub(crate) fn error_reply(context: &str, err: AppError) -> HandlerError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = match &err {
        AppError::Validation(msg)
        | AppError::NotFound(msg)
        | AppError::Conflict(msg)
        | AppError::ExternalService(msg) => msg.clone(),
        _ => format!("{}: {}", context, err),
    };

    if status.is_server_error() {
        tracing::error!("{}: {:?}", context, err);
    }

    (status, Json(ApiResponse::error(message)))
}

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success(
        "MotusDAO platform API is healthy".to_string(),
    ))
}
