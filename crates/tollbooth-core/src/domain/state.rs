//! State - Run の状態
//!
//! # 状態遷移
//! - preview_ready → paid（unlock）
//! - paid → ready（process）
//! - ready → ready（process の再実行）
//! - paid/ready → expired（expires_at を過ぎた時点。永続化はしない）

use serde::{Deserialize, Serialize};
use std::fmt;

/// RunStatus は永続化される状態
///
/// `expired` は時刻から導出されるので、ここには含めない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// プレビュー済み、未払い
    PreviewReady,
    /// 支払い済み、未処理
    Paid,
    /// 出力ファイルあり（ダウンロード可能）
    Ready,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::PreviewReady => "preview_ready",
            RunStatus::Paid => "paid",
            RunStatus::Ready => "ready",
        }
    }

    /// process を受け付けるか
    pub fn is_paid(self) -> bool {
        matches!(self, RunStatus::Paid | RunStatus::Ready)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RunState はある時点で観測される状態（RunStatus + expired）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    PreviewReady,
    Paid,
    Ready,
    /// 時間切れ（終端）
    Expired,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Expired)
    }
}

impl From<RunStatus> for RunState {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::PreviewReady => RunState::PreviewReady,
            RunStatus::Paid => RunState::Paid,
            RunStatus::Ready => RunState::Ready,
        }
    }
}
