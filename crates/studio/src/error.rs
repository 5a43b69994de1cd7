use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use protocol::ErrorBody;
use thiserror::Error;
use tracing::{error, warn};

use crate::decode::DecodeError;
use crate::export::ExportError;
use crate::gateway::UpstreamError;
use crate::prompt::ValidationError;

const BAD_BODY: &str = "요청 형식이 올바르지 않습니다.";
const MISSING_CREDENTIAL: &str = "API 키가 설정되지 않았습니다.";
const UPSTREAM_FAILED: &str = "AI 응답을 받는 중 오류가 발생했습니다.";
const DECODE_FAILED: &str = "AI 응답을 해석할 수 없습니다.";
const EXPORT_FAILED: &str = "파일 생성 중 오류가 발생했습니다.";
const INTERNAL_FAILED: &str = "요청을 처리하는 중 오류가 발생했습니다.";

/// Request-boundary error; every variant maps to a status and a stable message.
#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("request body rejected: {0}")]
    Body(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("background task failed: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, err.message.clone()),
            ApiError::Body(_) => (StatusCode::BAD_REQUEST, BAD_BODY.to_string()),
            ApiError::Upstream(UpstreamError::MissingCredential { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, MISSING_CREDENTIAL.to_string())
            }
            ApiError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_FAILED.to_string()),
            ApiError::Decode(_) => (StatusCode::INTERNAL_SERVER_ERROR, DECODE_FAILED.to_string()),
            ApiError::Export(_) => (StatusCode::INTERNAL_SERVER_ERROR, EXPORT_FAILED.to_string()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_FAILED.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(event = "request.failed", status = %status, error = %self, "request failed");
        } else {
            warn!(event = "request.rejected", status = %status, error = %self, "request rejected");
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
