//! EventSink の実装

use std::sync::Mutex;

use crate::domain::DomainEvent;
use crate::ports::EventSink;

/// `tracing` の INFO イベントとして出力
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &DomainEvent) {
        match event {
            DomainEvent::Previewed {
                run_id,
                tool,
                input_bytes,
                preview,
            } => {
                let preview = serde_json::to_string(preview).unwrap_or_default();
                tracing::info!(event = event.name(), %run_id, %tool, input_bytes, %preview);
            }
            DomainEvent::Unlocked { run_id, expires_at } => {
                tracing::info!(event = event.name(), %run_id, %expires_at);
            }
            DomainEvent::Processed {
                run_id,
                output_bytes,
            } => {
                tracing::info!(event = event.name(), %run_id, output_bytes);
            }
            DomainEvent::Downloaded { run_id } | DomainEvent::Purged { run_id } => {
                tracing::info!(event = event.name(), %run_id);
            }
        }
    }
}

/// 何もしない
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &DomainEvent) {}
}

/// 受け取ったイベントを溜める（テスト用）
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: &DomainEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
