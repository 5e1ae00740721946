//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! RunService はこれらの trait だけに依存し、ファイルシステムや
//! 時刻の実装は impls 側で差し替えます。

pub mod artifact_store;
pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod run_store;

pub use self::artifact_store::{ArtifactKey, ArtifactKind, ArtifactStore};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::run_store::RunStore;
