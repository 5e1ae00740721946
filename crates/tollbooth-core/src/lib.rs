//! tollbooth-core
//!
//! Core building blocks for the Tollbooth pay-per-run service.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, tool, run, state, errors, events）
//! - **ports**: 抽象化レイヤー（RunStore, ArtifactStore, Clock, IdGenerator, EventSink）
//! - **impls**: 実装（ファイルシステム、InMemory、tracing）
//! - **tools**: ツールカタログと ToolHandler（組み込み: CSV 重複除去 / 行数集計）
//! - **app**: アプリケーションロジック（builder, RunService, GcLoop）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod tools;
