//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **FsRunStore / FsArtifactStore**: ローカルディスク（本番用）
//! - **InMemoryRunStore / InMemoryArtifactStore**: 開発・テスト用
//! - **TracingEventSink / NoopEventSink / RecordingEventSink**

pub mod event_sink;
pub mod fs_store;
pub mod inmem;

pub use self::event_sink::{NoopEventSink, RecordingEventSink, TracingEventSink};
pub use self::fs_store::{FsArtifactStore, FsRunStore};
pub use self::inmem::{InMemoryArtifactStore, InMemoryRunStore};
