//! App - アプリケーション層
//!
//! ports を組み合わせて Run ライフサイクルを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 構築とワイヤリング（起動時検証つき）
//! - **RunService**: preview / unlock / process / status / download
//! - **GcLoop**: 期限切れ Run の削除
//! - **RunLocks**: Run 単位の直列化

pub mod builder;
pub mod config;
pub mod gc_loop;
pub mod locks;
pub mod service;
pub mod status;

pub use self::builder::{AppBuilder, BuildError};
pub use self::config::{GcConfig, ServiceConfig};
pub use self::gc_loop::GcLoop;
pub use self::locks::RunLocks;
pub use self::service::{
    Download, PreviewReceipt, RunService, UnlockReceipt, Upload, parse_run_id,
};
pub use self::status::RunView;
