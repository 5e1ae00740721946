//! ArtifactStore port - アップロード入力と変換出力のバイト列
//!
//! # 実装
//! - **FsArtifactStore**: `<root>/inputs`, `<root>/outputs`
//! - **InMemoryArtifactStore**: テスト用

use std::fmt;

use async_trait::async_trait;

use crate::domain::{RunId, StoreError};

/// 入力か出力か
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Input,
    Output,
}

impl ArtifactKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            ArtifactKind::Input => "inputs",
            ArtifactKind::Output => "outputs",
        }
    }
}

/// Artifact の論理キー
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub kind: ArtifactKind,
    pub run_id: RunId,
    pub ext: String,
}

impl ArtifactKey {
    pub fn input(run_id: RunId, ext: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Input,
            run_id,
            ext: ext.into(),
        }
    }

    pub fn output(run_id: RunId, ext: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Output,
            run_id,
            ext: ext.into(),
        }
    }

    /// `inputs/run-01H....csv` 形式のファイル名
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.run_id, self.ext)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.dir_name(), self.file_name())
    }
}

/// ArtifactStore はファイル本体を保存
///
/// # 設計原則
/// - メタ情報は RunStore 側（Run の input_ext / output_ext）
/// - 期限切れの削除は GcLoop が行う
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// 保存（上書き）。書いたバイト数を返す
    async fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<u64, StoreError>;

    /// 取得。存在しなければ `StoreError::MissingArtifact`
    async fn get(&self, key: &ArtifactKey) -> Result<Vec<u8>, StoreError>;

    /// 削除。存在しなくてもエラーにしない
    async fn delete(&self, key: &ArtifactKey) -> Result<(), StoreError>;
}
