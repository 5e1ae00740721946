//! Status - Run の状態照会ビュー

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{PreviewMeta, Run, RunId, RunState, RunStatus, ToolSlug};

/// RunView は `GET /api/run/:run_id` の応答
///
/// `status` は永続化された値、`expired` は照会時刻での判定です。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    pub run_id: RunId,
    pub tool_slug: ToolSlug,
    pub status: RunStatus,
    pub state: RunState,
    pub expired: bool,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub expires_at: Option<DateTime<Utc>>,
    pub preview: Option<PreviewMeta>,
}

impl RunView {
    pub fn of(run: &Run, now: DateTime<Utc>) -> Self {
        Self {
            run_id: run.id,
            tool_slug: run.tool_slug.clone(),
            status: run.status(),
            state: run.state(now),
            expired: run.is_expired(now),
            expires_at: run.expires_at(),
            preview: (!run.preview_meta.is_empty()).then(|| run.preview_meta.clone()),
        }
    }
}
