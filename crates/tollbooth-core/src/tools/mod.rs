//! Tools - カタログとハンドラ
//!
//! # 二層構造
//! - **カタログ（ToolCatalog）**: 価格・入力制限・出力形式などのメタ情報
//! - **ハンドラ（ToolHandler）**: プレビューと本処理の実装
//!
//! 両者の対応は AppBuilder::build() が起動時に検証します。

pub mod catalog;
pub mod csv_lines;
pub mod handler;
pub mod registry;

pub use self::catalog::{CatalogError, ToolCatalog};
pub use self::csv_lines::{CountCsvRows, LineStats, RemoveDuplicateCsv};
pub use self::handler::ToolHandler;
pub use self::registry::{HandlerRegistry, RegistryError};
