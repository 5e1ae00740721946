//! Events - ドメインイベント
//!
//! RunService が状態遷移のたびに EventSink へ送ります。

use chrono::{DateTime, Utc};

use super::ids::RunId;
use super::run::PreviewMeta;
use super::tool::ToolSlug;

/// DomainEvent はドメインで発生したイベント
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// プレビューを計算し、Run を作成した
    Previewed {
        run_id: RunId,
        tool: ToolSlug,
        input_bytes: u64,
        preview: PreviewMeta,
    },
    /// 支払い済みになった（unlock の初回のみ）
    Unlocked {
        run_id: RunId,
        expires_at: DateTime<Utc>,
    },
    /// 出力を書き出した
    Processed { run_id: RunId, output_bytes: u64 },
    /// 出力をダウンロードさせた
    Downloaded { run_id: RunId },
    /// GC で削除した
    Purged { run_id: RunId },
}

impl DomainEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            DomainEvent::Previewed { run_id, .. }
            | DomainEvent::Unlocked { run_id, .. }
            | DomainEvent::Processed { run_id, .. }
            | DomainEvent::Downloaded { run_id }
            | DomainEvent::Purged { run_id } => *run_id,
        }
    }

    /// ログ用の短い名前
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::Previewed { .. } => "run.previewed",
            DomainEvent::Unlocked { .. } => "run.unlocked",
            DomainEvent::Processed { .. } => "run.processed",
            DomainEvent::Downloaded { .. } => "run.downloaded",
            DomainEvent::Purged { .. } => "run.purged",
        }
    }
}
