//! HTTP handlers
//!
//! | Method | Path | 内容 |
//! |---|---|---|
//! | POST | `/api/preview/:tool_slug` | multipart の `file` を受け取り無料プレビュー |
//! | POST | `/api/unlock` | `{ runId }` を支払い済みに |
//! | POST | `/api/process/:tool_slug` | `{ runId }` を処理 |
//! | GET | `/api/run/:run_id` | 状態照会 |
//! | GET | `/download/:run_id` | 出力ファイル |
//! | GET | `/api/tools` | カタログ |
//! | GET | `/health` | `ok` |
//!
//! ロジックは持たず、入力を取り出して RunService を呼ぶだけ。

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tollbooth_core::app::{PreviewReceipt, RunView, UnlockReceipt, Upload, parse_run_id};
use tollbooth_core::domain::{RunError, RunId, RunStatus, Tool, ToolSlug};

use crate::AppState;
use crate::error::ApiError;

type ApiResult<T> = Result<T, ApiError>;

fn reject(state: &AppState, error: RunError) -> ApiError {
    ApiError {
        error,
        request_id: state.service.new_request_id(),
    }
}

/// `{ "runId": "..." }`
#[derive(Debug, Deserialize)]
pub struct RunIdBody {
    #[serde(rename = "runId", default)]
    pub run_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub ok: bool,
    pub status: RunStatus,
}

/// 本文が読めない・runId がない場合はどちらも missing_run_id
fn run_id_from(body: Result<Json<RunIdBody>, JsonRejection>) -> Result<RunId, RunError> {
    let Ok(Json(body)) = body else {
        return Err(RunError::MissingRunId);
    };
    parse_run_id(body.run_id.as_deref().unwrap_or_default())
}

fn multipart_error(err: MultipartError, max_size_mb: u64) -> RunError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RunError::TooLarge { max_size_mb }
    } else {
        tracing::debug!(error = %err, "unreadable multipart body");
        RunError::MissingFile
    }
}

/// `file` フィールド（ファイル名つき）を探す。見つからなければ None
async fn read_upload(mut multipart: Multipart, max_size_mb: u64) -> Result<Option<Upload>, RunError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return Err(multipart_error(e, max_size_mb)),
        };
        if field.name() != Some("file") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_size_mb))?;
        return Ok(Some(Upload {
            filename,
            bytes: bytes.to_vec(),
        }));
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<Tool>> {
    Json(state.service.tools())
}

pub async fn preview(
    State(state): State<AppState>,
    Path(tool_slug): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<PreviewReceipt>> {
    let slug = ToolSlug::new(tool_slug);
    // 本文を読む前に Tool と Handler を確認（404 / 400 を 413 より優先）
    let max_size_mb = state
        .service
        .check_tool(&slug)
        .map(|tool| tool.input.max_size_mb)
        .map_err(|e| reject(&state, e))?;

    let upload = match multipart {
        Ok(multipart) => read_upload(multipart, max_size_mb)
            .await
            .map_err(|e| reject(&state, e))?,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "request is not multipart");
            None
        }
    };

    state
        .service
        .preview(&slug, upload)
        .await
        .map(Json)
        .map_err(|e| reject(&state, e))
}

pub async fn unlock(
    State(state): State<AppState>,
    body: Result<Json<RunIdBody>, JsonRejection>,
) -> ApiResult<Json<UnlockReceipt>> {
    let run_id = run_id_from(body).map_err(|e| reject(&state, e))?;
    state
        .service
        .unlock(run_id)
        .await
        .map(Json)
        .map_err(|e| reject(&state, e))
}

pub async fn process(
    State(state): State<AppState>,
    Path(tool_slug): Path<String>,
    body: Result<Json<RunIdBody>, JsonRejection>,
) -> ApiResult<Json<ProcessResponse>> {
    let slug = ToolSlug::new(tool_slug);
    // runId より先に Tool と Handler
    state
        .service
        .check_tool(&slug)
        .map_err(|e| reject(&state, e))?;
    let run_id = run_id_from(body).map_err(|e| reject(&state, e))?;
    let status = state
        .service
        .process(&slug, run_id)
        .await
        .map_err(|e| reject(&state, e))?;
    Ok(Json(ProcessResponse { ok: true, status }))
}

pub async fn run_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<RunView>> {
    let run_id = parse_run_id(&run_id).map_err(|e| reject(&state, e))?;
    state
        .service
        .status(run_id)
        .await
        .map(Json)
        .map_err(|e| reject(&state, e))
}

pub async fn download(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Response> {
    let run_id = parse_run_id(&run_id).map_err(|e| reject(&state, e))?;
    let download = state
        .service
        .download(run_id)
        .await
        .map_err(|e| reject(&state, e))?;

    let disposition = format!("attachment; filename=\"{}\"", download.filename);
    Ok((
        [
            (header::CONTENT_TYPE, download.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    )
        .into_response())
}
