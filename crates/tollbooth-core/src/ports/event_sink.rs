//! EventSink port - イベント記録の抽象化
//!
//! # 実装
//! - TracingEventSink: `tracing` の構造化イベントとして出力
//! - NoopEventSink: 何もしない

use crate::domain::DomainEvent;

/// EventSink はドメインイベントを記録
///
/// 記録の失敗で状態遷移を巻き戻さないよう、戻り値は持たない。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &DomainEvent);
}
