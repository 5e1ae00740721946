//! ToolHandler trait - プレビューと本処理の定義
//!
//! Handler は純粋な変換です（バイト列 → 統計 / バイト列 → バイト列）。
//! 入出力の保存や状態遷移は RunService が行うので、Handler はストレージに触れません。

use async_trait::async_trait;

use crate::domain::{HandlerError, PreviewMeta};

/// ToolHandler は 1 つの Tool の変換を実装
///
/// # 使用例
/// ```ignore
/// struct Upper;
///
/// #[async_trait]
/// impl ToolHandler for Upper {
///     fn slug(&self) -> &'static str { "uppercase-text" }
///     async fn preview(&self, input: &[u8]) -> Result<PreviewMeta, HandlerError> {
///         Ok(PreviewMeta::new().with("bytes", input.len() as u64))
///     }
///     async fn process(&self, input: &[u8]) -> Result<Vec<u8>, HandlerError> {
///         Ok(input.to_ascii_uppercase())
///     }
/// }
/// ```
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// 対応する Tool の slug
    fn slug(&self) -> &'static str;

    /// 入力 artifact の拡張子
    fn input_ext(&self) -> &'static str {
        "csv"
    }

    /// 無料プレビュー（読み取りのみ）
    async fn preview(&self, input: &[u8]) -> Result<PreviewMeta, HandlerError>;

    /// 支払い後の本処理。同じ入力に対して何度呼んでも同じ出力を返すこと
    async fn process(&self, input: &[u8]) -> Result<Vec<u8>, HandlerError>;
}
