//! RunStore port - Run レコードの正本（source of truth）
//!
//! # 実装
//! - **FsRunStore**: `<root>/runs/<run-id>.json`（本番用）
//! - **InMemoryRunStore**: テスト用

use async_trait::async_trait;

use crate::domain::{Run, RunId, StoreError};

/// RunStore は Run レコードを 1 件 = 1 ドキュメントで保存
///
/// # 設計原則
/// - `save` は上書き（read-modify-write の直列化は RunService 側の責務）
/// - `load` は存在しない場合 `Ok(None)`
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn save(&self, run: &Run) -> Result<(), StoreError>;

    async fn load(&self, id: RunId) -> Result<Option<Run>, StoreError>;

    async fn exists(&self, id: RunId) -> Result<bool, StoreError> {
        Ok(self.load(id).await?.is_some())
    }

    /// 全 Run（GC 用）
    async fn list(&self) -> Result<Vec<Run>, StoreError>;

    /// 削除。存在しなくてもエラーにしない
    async fn delete(&self, id: RunId) -> Result<(), StoreError>;
}
