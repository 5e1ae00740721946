//! ToolCatalog - `tools.csv` マニフェストから Tool 一覧を読む
//!
//! # フォーマット
//! ```text
//! slug,title,oneLiner,priceUsd,accepts,maxSizeMb[,outputExt]
//! remove-duplicate-csv,Remove duplicates,"Remove duplicate rows, keep header",2,text/csv,10,csv
//! ```
//! - ダブルクオートで囲んだフィールドは `,` を含められる（`""` はエスケープ）
//! - `accepts` は `|` 区切り
//! - 空行と slug が空の行は無視
//! - 2 行未満ならカタログは空

use std::collections::HashSet;
use std::path::Path;

use crate::domain::{Tool, ToolInput, ToolSlug, normalize_ext};

/// 組み込みのカタログ
const BUILTIN_MANIFEST: &str = include_str!("../../tools.csv");

const REQUIRED_COLUMNS: [&str; 6] = ["slug", "title", "oneLiner", "priceUsd", "accepts", "maxSizeMb"];

/// CatalogError はマニフェストの読み込みエラー
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("could not read tool manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tool manifest is missing required columns: {0:?}")]
    MissingColumns(Vec<&'static str>),

    #[error("line {line}: column {column} is not a number: {value:?}")]
    InvalidNumber {
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("tool slug {0} is listed more than once")]
    DuplicateSlug(ToolSlug),
}

/// Tool の一覧（マニフェストの順序を保持）
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
}

impl ToolCatalog {
    pub fn new(tools: Vec<Tool>) -> Self {
        Self { tools }
    }

    /// 組み込みマニフェスト
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::parse(BUILTIN_MANIFEST)
    }

    /// ファイルから読む
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let lines: Vec<(usize, &str)> = raw
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty())
            .collect();
        if lines.len() < 2 {
            return Ok(Self::default());
        }

        let header = split_csv_line(lines[0].1);
        let idx = |name: &str| header.iter().position(|h| h == name);

        let missing: Vec<&'static str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| idx(c).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::MissingColumns(missing));
        }
        // 上で存在を確認済み
        let col = |name: &str| idx(name).unwrap_or_default();
        let (i_slug, i_title, i_one, i_price, i_acc, i_max) = (
            col("slug"),
            col("title"),
            col("oneLiner"),
            col("priceUsd"),
            col("accepts"),
            col("maxSizeMb"),
        );
        let i_out = idx("outputExt");

        let mut seen = HashSet::new();
        let mut tools = Vec::new();
        for &(line_no, line) in &lines[1..] {
            let cols = split_csv_line(line);
            let field = |i: usize| cols.get(i).map(String::as_str).unwrap_or("");

            let slug = field(i_slug);
            if slug.is_empty() {
                continue;
            }
            let slug = ToolSlug::new(slug);
            if !seen.insert(slug.clone()) {
                return Err(CatalogError::DuplicateSlug(slug));
            }

            let price_usd = parse_number::<f64>(field(i_price), line_no, "priceUsd")?;
            let max_size_mb = parse_number::<u64>(field(i_max), line_no, "maxSizeMb")?;
            let accepts = field(i_acc)
                .split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            let output_ext = normalize_ext(i_out.map(field).unwrap_or(""));

            tools.push(Tool {
                slug,
                title: field(i_title).to_string(),
                one_liner: field(i_one).to_string(),
                price_usd,
                input: ToolInput {
                    accepts,
                    max_size_mb,
                },
                output_ext,
            });
        }

        Ok(Self { tools })
    }

    pub fn get(&self, slug: &ToolSlug) -> Option<&Tool> {
        self.tools.iter().find(|t| &t.slug == slug)
    }

    pub fn contains(&self, slug: &ToolSlug) -> bool {
        self.get(slug).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 全ツール中で最大のアップロード上限（HTTP の body limit 用）
    pub fn max_upload_bytes(&self) -> u64 {
        self.tools.iter().map(Tool::max_bytes).max().unwrap_or(0)
    }
}

fn parse_number<T: std::str::FromStr>(
    raw: &str,
    line: usize,
    column: &'static str,
) -> Result<T, CatalogError> {
    let raw = if raw.is_empty() { "0" } else { raw };
    raw.parse().map_err(|_| CatalogError::InvalidNumber {
        line,
        column,
        value: raw.to_string(),
    })
}

/// 1 行を CSV フィールドに分割（各フィールドは trim 済み）
fn split_csv_line(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut cur)),
            _ => cur.push(ch),
        }
    }
    out.push(cur);
    out.into_iter().map(|s| s.trim().to_string()).collect()
}
