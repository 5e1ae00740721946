//! FsRunStore / FsArtifactStore - ローカルファイルシステム実装
//!
//! # レイアウト
//! ```text
//! <root>/runs/run-01H....json
//! <root>/inputs/run-01H....csv
//! <root>/outputs/run-01H....csv
//! ```
//!
//! ディレクトリは初回書き込み時に作成します。Run レコードは一時ファイルに
//! 書いてから rename するので、読み手が書きかけの JSON を見ることはありません。

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use ulid::Ulid;

use crate::domain::{Run, RunId, StoreError};
use crate::ports::{ArtifactKey, ArtifactStore, RunStore};

const RUNS_DIR: &str = "runs";

/// 一時ファイルに書いてから rename
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::io(path, std::io::Error::from(IoErrorKind::InvalidInput)))?;
    fs::create_dir_all(dir)
        .await
        .map_err(|e| StoreError::io(dir, e))?;

    let tmp = path.with_extension(format!("{}.tmp", Ulid::new()));
    fs::write(&tmp, bytes)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Run レコードを JSON ファイルで保存
#[derive(Debug, Clone)]
pub struct FsRunStore {
    dir: PathBuf,
}

impl FsRunStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(RUNS_DIR),
        }
    }

    fn path_for(&self, id: RunId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl RunStore for FsRunStore {
    async fn save(&self, run: &Run) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(run)?;
        write_atomic(&self.path_for(run.id), &bytes).await
    }

    async fn load(&self, id: RunId) -> Result<Option<Run>, StoreError> {
        let path = self.path_for(id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn exists(&self, id: RunId) -> Result<bool, StoreError> {
        let path = self.path_for(id);
        fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    async fn list(&self) -> Result<Vec<Run>, StoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut runs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                // 並行して削除された
                Err(e) if e.kind() == IoErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::io(path, e)),
            };
            match serde_json::from_slice::<Run>(&bytes) {
                Ok(run) => runs.push(run),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable run record");
                }
            }
        }
        Ok(runs)
    }

    async fn delete(&self, id: RunId) -> Result<(), StoreError> {
        remove_if_exists(&self.path_for(id)).await
    }
}

/// Artifact をファイルで保存
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.kind.dir_name()).join(key.file_name())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<u64, StoreError> {
        write_atomic(&self.path_for(key), bytes).await?;
        Ok(bytes.len() as u64)
    }

    async fn get(&self, key: &ArtifactKey) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                Err(StoreError::MissingArtifact(key.to_string()))
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn delete(&self, key: &ArtifactKey) -> Result<(), StoreError> {
        remove_if_exists(&self.path_for(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InputMeta, PreviewMeta, ToolSlug};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_run() -> Run {
        Run::preview(
            RunId::from_ulid(Ulid::new()),
            ToolSlug::new("remove-duplicate-csv"),
            Utc::now(),
            InputMeta {
                filename: "a.csv".into(),
                size: 3,
            },
            PreviewMeta::new().with("totalRows", 3),
            "csv",
            "csv",
        )
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = FsRunStore::new(dir.path());
        let run = sample_run();

        store.save(&run).await.unwrap();
        let loaded = store.load(run.id).await.unwrap().unwrap();

        assert_eq!(loaded.id, run.id);
        assert_eq!(loaded.tool_slug, run.tool_slug);
        assert!(store.exists(run.id).await.unwrap());
        assert!(
            dir.path()
                .join("runs")
                .join(format!("{}.json", run.id))
                .exists()
        );
    }

    #[tokio::test]
    async fn missing_run_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = FsRunStore::new(dir.path());
        let id = RunId::from_ulid(Ulid::new());

        assert!(store.load(id).await.unwrap().is_none());
        assert!(!store.exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_record_is_a_codec_error() {
        let dir = TempDir::new().unwrap();
        let store = FsRunStore::new(dir.path());
        let id = RunId::from_ulid(Ulid::new());
        std::fs::create_dir_all(dir.path().join("runs")).unwrap();
        std::fs::write(dir.path().join("runs").join(format!("{id}.json")), b"{oops").unwrap();

        assert!(matches!(store.load(id).await, Err(StoreError::Codec(_))));
        // list は壊れたレコードを飛ばす
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = FsRunStore::new(dir.path());
        assert!(store.list().await.unwrap().is_empty());

        let a = sample_run();
        let b = sample_run();
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);

        store.delete(a.id).await.unwrap();
        store.delete(a.id).await.unwrap();
        let left = store.list().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, b.id);
    }

    #[tokio::test]
    async fn artifacts_roundtrip_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let key = ArtifactKey::input(RunId::from_ulid(Ulid::new()), "csv");

        assert_eq!(store.put(&key, b"email\na@x\n").await.unwrap(), 10);
        assert_eq!(store.get(&key).await.unwrap(), b"email\na@x\n");
        assert!(store.path_for(&key).starts_with(dir.path().join("inputs")));

        store.delete(&key).await.unwrap();
        assert!(matches!(
            store.get(&key).await,
            Err(StoreError::MissingArtifact(_))
        ));
    }
}
