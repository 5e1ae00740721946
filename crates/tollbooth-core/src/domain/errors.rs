//! Errors - エラー型と分類
//!
//! `ErrorKind` は運用分類です。HTTP 層はこの分類だけを見てステータスを決めます。
//! `RunError::code()` はクライアント向けの安定した機械可読コードです。

use std::path::PathBuf;

use super::ids::RunId;
use super::tool::ToolSlug;

/// ErrorKind は実行エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 対象が存在しない（404）
    NotFound,
    /// リクエストが不正（400）
    InvalidInput,
    /// 支払い前（402）
    PaymentRequired,
    /// 状態が合わない（409）
    Conflict,
    /// 期限切れ（410）
    Gone,
    /// アップロード上限超過（413）
    PayloadTooLarge,
    /// ストレージ・ハンドラの障害（500）
    Internal,
}

/// ストレージ（RunStore / ArtifactStore）のエラー
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("run record is not valid JSON: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("artifact not found: {0}")]
    MissingArtifact(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// ToolHandler の変換エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("input is not valid UTF-8")]
    NotUtf8,

    #[error("could not encode output: {0}")]
    Encode(String),
}

/// Run ライフサイクルのエラー
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("tool not found: {0}")]
    UnknownTool(ToolSlug),

    #[error("no handler registered for tool {0}")]
    NoHandler(ToolSlug),

    #[error("no file uploaded")]
    MissingFile,

    #[error("request has no runId")]
    MissingRunId,

    #[error("file too large: the limit is {max_size_mb} MB")]
    TooLarge { max_size_mb: u64 },

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("run {run_id} belongs to tool {actual}, not {requested}")]
    ToolMismatch {
        run_id: RunId,
        requested: ToolSlug,
        actual: ToolSlug,
    },

    #[error("run {0} has expired")]
    Expired(RunId),

    #[error("run {0} has not been paid for")]
    NotPaid(RunId),

    #[error("run {0} is not ready for download")]
    NotReady(RunId),

    #[error("preview failed: {0}")]
    PreviewFailed(#[source] HandlerError),

    #[error("processing failed: {0}")]
    ProcessingFailed(#[source] HandlerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::UnknownTool(_) | RunError::RunNotFound(_) => ErrorKind::NotFound,
            RunError::NoHandler(_)
            | RunError::MissingFile
            | RunError::MissingRunId
            | RunError::ToolMismatch { .. }
            | RunError::PreviewFailed(HandlerError::NotUtf8)
            | RunError::ProcessingFailed(HandlerError::NotUtf8) => ErrorKind::InvalidInput,
            RunError::TooLarge { .. } => ErrorKind::PayloadTooLarge,
            RunError::Expired(_) => ErrorKind::Gone,
            RunError::NotPaid(_) => ErrorKind::PaymentRequired,
            RunError::NotReady(_) => ErrorKind::Conflict,
            RunError::PreviewFailed(_) | RunError::ProcessingFailed(_) | RunError::Store(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// クライアント向けのエラーコード
    pub fn code(&self) -> &'static str {
        match self {
            RunError::UnknownTool(_) => "tool_not_found",
            RunError::NoHandler(_) => "no_handler",
            RunError::MissingFile => "no_file",
            RunError::MissingRunId => "missing_run_id",
            RunError::TooLarge { .. } => "too_large",
            RunError::RunNotFound(_) => "run_not_found",
            RunError::ToolMismatch { .. } => "tool_mismatch",
            RunError::Expired(_) => "expired",
            RunError::NotPaid(_) => "not_paid",
            RunError::NotReady(_) => "not_ready",
            RunError::PreviewFailed(_) => "preview_failed",
            RunError::ProcessingFailed(_) => "processing_failed",
            RunError::Store(_) => "storage_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn lifecycle_errors_have_distinct_kinds() {
        let id = RunId::from_ulid(Ulid::new());
        assert_eq!(RunError::Expired(id).kind(), ErrorKind::Gone);
        assert_eq!(RunError::NotPaid(id).kind(), ErrorKind::PaymentRequired);
        assert_eq!(RunError::NotReady(id).kind(), ErrorKind::Conflict);
        assert_eq!(
            RunError::RunNotFound(id.to_string()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn store_errors_are_internal() {
        let err: RunError = StoreError::MissingArtifact("inputs/x.csv".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.code(), "storage_failed");
    }
}
