//! CSV を「行」の単位で扱う組み込みツール
//!
//! - `remove-duplicate-csv`: 重複行を除去（ヘッダ行は保持）
//! - `count-csv-rows`: 行数の集計を JSON レポートとして出力
//!
//! どちらも CSV の中身はパースせず、CRLF を LF に揃えた上で行単位で比較します。

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;

use super::handler::ToolHandler;
use crate::domain::{HandlerError, PreviewMeta};

pub const TOTAL_ROWS: &str = "totalRows";
pub const UNIQUE_ROWS: &str = "uniqueRows";
pub const DUPLICATES: &str = "duplicates";

fn decode(input: &[u8]) -> Result<String, HandlerError> {
    let text = std::str::from_utf8(input).map_err(|_| HandlerError::NotUtf8)?;
    // 先頭の BOM はヘッダ行に混ぜない
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    Ok(text.replace("\r\n", "\n"))
}

/// 行数の集計（ヘッダ行も 1 行として数える）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineStats {
    pub total_rows: u64,
    pub unique_rows: u64,
    pub duplicates: u64,
}

impl LineStats {
    /// 前後の空白を落としてから LF で分割。空入力は 0 行
    pub fn of(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self {
                total_rows: 0,
                unique_rows: 0,
                duplicates: 0,
            };
        }
        let lines: Vec<&str> = trimmed.split('\n').collect();
        let unique: HashSet<&str> = lines.iter().copied().collect();
        let total_rows = lines.len() as u64;
        let unique_rows = unique.len() as u64;
        Self {
            total_rows,
            unique_rows,
            duplicates: total_rows - unique_rows,
        }
    }

    pub fn to_preview(self) -> PreviewMeta {
        PreviewMeta::new()
            .with(TOTAL_ROWS, self.total_rows)
            .with(UNIQUE_ROWS, self.unique_rows)
            .with(DUPLICATES, self.duplicates)
    }
}

/// 先頭行をヘッダとして残し、本文の重複行を最初の出現だけ残して除去
///
/// 末尾の空白は trim しないので、末尾改行は空行 1 つとして残る。
/// 先頭行が空ならヘッダは出力しない。
pub fn dedupe_lines(text: &str) -> String {
    let mut lines = text.split('\n');
    let header = lines.next().unwrap_or("");

    let mut seen = HashSet::new();
    let body = lines.filter(|line| seen.insert(*line));

    let out: Vec<&str> = if header.is_empty() {
        body.collect()
    } else {
        std::iter::once(header).chain(body).collect()
    };
    out.join("\n")
}

/// `remove-duplicate-csv`
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveDuplicateCsv;

#[async_trait]
impl ToolHandler for RemoveDuplicateCsv {
    fn slug(&self) -> &'static str {
        "remove-duplicate-csv"
    }

    async fn preview(&self, input: &[u8]) -> Result<PreviewMeta, HandlerError> {
        Ok(LineStats::of(&decode(input)?).to_preview())
    }

    async fn process(&self, input: &[u8]) -> Result<Vec<u8>, HandlerError> {
        Ok(dedupe_lines(&decode(input)?).into_bytes())
    }
}

/// `count-csv-rows`
#[derive(Debug, Clone, Copy, Default)]
pub struct CountCsvRows;

#[async_trait]
impl ToolHandler for CountCsvRows {
    fn slug(&self) -> &'static str {
        "count-csv-rows"
    }

    async fn preview(&self, input: &[u8]) -> Result<PreviewMeta, HandlerError> {
        Ok(LineStats::of(&decode(input)?).to_preview())
    }

    async fn process(&self, input: &[u8]) -> Result<Vec<u8>, HandlerError> {
        let stats = LineStats::of(&decode(input)?);
        serde_json::to_vec_pretty(&stats).map_err(|e| HandlerError::Encode(e.to_string()))
    }
}
