//! InMemoryRunStore / InMemoryArtifactStore - 開発・テスト用
//!
//! # 実装詳細
//! - HashMap を tokio の Mutex で保護
//! - ロックを保持したまま await しない

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Run, RunId, StoreError};
use crate::ports::{ArtifactKey, ArtifactStore, RunStore};

/// メモリ上の RunStore
#[derive(Debug, Clone, Default)]
pub struct InMemoryRunStore {
    runs: Arc<Mutex<HashMap<RunId, Run>>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.runs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.lock().await.is_empty()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn save(&self, run: &Run) -> Result<(), StoreError> {
        self.runs.lock().await.insert(run.id, run.clone());
        Ok(())
    }

    async fn load(&self, id: RunId) -> Result<Option<Run>, StoreError> {
        Ok(self.runs.lock().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Run>, StoreError> {
        Ok(self.runs.lock().await.values().cloned().collect())
    }

    async fn delete(&self, id: RunId) -> Result<(), StoreError> {
        self.runs.lock().await.remove(&id);
        Ok(())
    }
}

/// メモリ上の ArtifactStore
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactStore {
    blobs: Arc<Mutex<HashMap<ArtifactKey, Vec<u8>>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &ArtifactKey) -> bool {
        self.blobs.lock().await.contains_key(key)
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<u64, StoreError> {
        self.blobs.lock().await.insert(key.clone(), bytes.to_vec());
        Ok(bytes.len() as u64)
    }

    async fn get(&self, key: &ArtifactKey) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::MissingArtifact(key.to_string()))
    }

    async fn delete(&self, key: &ArtifactKey) -> Result<(), StoreError> {
        self.blobs.lock().await.remove(key);
        Ok(())
    }
}
