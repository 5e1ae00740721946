//! ApiError - RunError を HTTP 応答に変換
//!
//! ステータスは `ErrorKind` だけで決める。本文は
//! `{ "error": <code>, "requestId": <req-...>, "message": <detail> }`。
//! 500 系では内部の詳細（パスなど）を返さず、ログにだけ残す。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tollbooth_core::domain::{ErrorKind, RequestId, RunError};

#[derive(Debug)]
pub struct ApiError {
    pub error: RunError,
    pub request_id: RequestId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    request_id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Gone => StatusCode::GONE,
        ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.error.kind();
        let status = status_for(kind);

        let message = if kind == ErrorKind::Internal {
            tracing::error!(
                request_id = %self.request_id,
                code = self.error.code(),
                error = %self.error,
                "request failed"
            );
            None
        } else {
            tracing::debug!(
                request_id = %self.request_id,
                code = self.error.code(),
                status = status.as_u16(),
                "request rejected"
            );
            Some(self.error.to_string())
        };

        let body = ErrorBody {
            error: self.error.code(),
            request_id: self.request_id,
            message,
        };
        (status, Json(body)).into_response()
    }
}
