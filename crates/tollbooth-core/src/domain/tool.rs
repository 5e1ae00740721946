//! Tool - カタログ上の 1 ツール（slug, 価格, 入力制限, 出力形式）

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tool の URL slug（例: `remove-duplicate-csv`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolSlug(String);

impl ToolSlug {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ToolSlug {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// 入力制限
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInput {
    /// 受け付ける MIME type
    pub accepts: Vec<String>,
    pub max_size_mb: u64,
}

/// カタログ上の Tool 定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub slug: ToolSlug,
    pub title: String,
    pub one_liner: String,
    pub price_usd: f64,
    pub input: ToolInput,
    /// 出力ファイルの拡張子（小文字、ドットなし）
    pub output_ext: String,
}

impl Tool {
    /// アップロード上限（バイト）
    pub fn max_bytes(&self) -> u64 {
        self.input.max_size_mb.saturating_mul(1024 * 1024)
    }
}

/// 拡張子の正規化: 先頭の `.` を落として小文字に。空なら `csv`。
pub fn normalize_ext(raw: &str) -> String {
    let ext = raw.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() { "csv".to_string() } else { ext }
}

/// 出力拡張子から Content-Type を決める
pub fn content_type_for_ext(ext: &str) -> &'static str {
    match normalize_ext(ext).as_str() {
        "csv" => "text/csv; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        _ => "application/octet-stream",
    }
}
