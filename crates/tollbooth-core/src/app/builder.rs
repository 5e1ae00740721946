//! AppBuilder - RunService の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::path::Path;
use std::sync::Arc;

use super::config::ServiceConfig;
use super::service::RunService;
use crate::impls::{FsArtifactStore, FsRunStore, InMemoryArtifactStore, InMemoryRunStore, TracingEventSink};
use crate::ports::{ArtifactStore, Clock, EventSink, IdGenerator, RunStore, SystemClock, UlidGenerator};
use crate::tools::{CatalogError, HandlerRegistry, RegistryError, ToolCatalog, ToolHandler};

/// AppBuilder は RunService を構築
///
/// # 使用例
/// ```ignore
/// let service = AppBuilder::new()
///     .with_catalog(ToolCatalog::load("tools.csv").await?)
///     .with_builtin_handlers()
///     .with_fs_storage("./tmp")
///     .require_handlers_for_all_tools()
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - 登録された Handler は必ずカタログ上の Tool に対応していること
/// - require_handlers_for_all_tools() を呼んだ場合、カタログの全 Tool に Handler があること
/// - 不足があれば build() が BuildError を返す
pub struct AppBuilder {
    catalog: Option<ToolCatalog>,
    registry: HandlerRegistry,
    runs: Arc<dyn RunStore>,
    artifacts: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
    events: Arc<dyn EventSink>,
    config: ServiceConfig,
    require_all_tools: bool,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Handlers without matching tool slug: {0:?}")]
    HandlersWithoutTool(Vec<String>),

    #[error("Missing handlers for tool slugs: {0:?}")]
    ToolsWithoutHandler(Vec<String>),
}

impl AppBuilder {
    /// 既定値: 組み込みカタログ、Handler なし、メモリ上のストレージ、実時刻
    pub fn new() -> Self {
        Self {
            catalog: None,
            registry: HandlerRegistry::new(),
            runs: Arc::new(InMemoryRunStore::new()),
            artifacts: Arc::new(InMemoryArtifactStore::new()),
            clock: Arc::new(SystemClock),
            ids: None,
            events: Arc::new(TracingEventSink),
            config: ServiceConfig::default(),
            require_all_tools: false,
        }
    }

    pub fn with_catalog(mut self, catalog: ToolCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Handler を登録
    pub fn register<H: ToolHandler + 'static>(mut self, handler: H) -> Result<Self, RegistryError> {
        self.registry.register(handler)?;
        Ok(self)
    }

    /// 組み込み Handler で置き換える
    pub fn with_builtin_handlers(mut self) -> Self {
        self.registry = HandlerRegistry::builtin();
        self
    }

    pub fn with_run_store<S: RunStore + 'static>(mut self, store: S) -> Self {
        self.runs = Arc::new(store);
        self
    }

    pub fn with_artifact_store<S: ArtifactStore + 'static>(mut self, store: S) -> Self {
        self.artifacts = Arc::new(store);
        self
    }

    /// `<root>/runs`, `<root>/inputs`, `<root>/outputs` を使う
    pub fn with_fs_storage(self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        self.with_run_store(FsRunStore::new(root))
            .with_artifact_store(FsArtifactStore::new(root))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 未指定なら clock を使う UlidGenerator
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn require_handlers_for_all_tools(mut self) -> Self {
        self.require_all_tools = true;
        self
    }

    /// 検証して RunService を生成
    pub fn build(self) -> Result<RunService, BuildError> {
        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => ToolCatalog::builtin()?,
        };

        let extra: Vec<String> = self
            .registry
            .registered_slugs()
            .into_iter()
            .filter(|slug| !catalog.contains(slug))
            .map(|slug| slug.to_string())
            .collect();
        if !extra.is_empty() {
            return Err(BuildError::HandlersWithoutTool(extra));
        }

        if self.require_all_tools {
            let missing: Vec<String> = catalog
                .iter()
                .filter(|tool| self.registry.get(&tool.slug).is_none())
                .map(|tool| tool.slug.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::ToolsWithoutHandler(missing));
            }
        }

        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(self.clock.clone())),
        };

        Ok(RunService::new(
            catalog,
            self.registry,
            self.runs,
            self.artifacts,
            self.clock,
            ids,
            self.events,
            self.config,
        ))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::RemoveDuplicateCsv;

    const ONLY_DEDUPE: &str = "slug,title,oneLiner,priceUsd,accepts,maxSizeMb\n\
                               remove-duplicate-csv,Dedupe,x,2,text/csv,10\n";

    #[test]
    fn test_build_success() {
        let service = AppBuilder::new()
            .with_builtin_handlers()
            .require_handlers_for_all_tools()
            .build();
        assert!(service.is_ok());
    }

    #[test]
    fn test_build_handler_without_tool() {
        let service = AppBuilder::new()
            .with_catalog(ToolCatalog::parse(ONLY_DEDUPE).unwrap())
            .with_builtin_handlers()
            .build();
        assert!(matches!(
            service,
            Err(BuildError::HandlersWithoutTool(extra)) if extra == vec!["count-csv-rows".to_string()]
        ));
    }

    #[test]
    fn test_build_missing_handlers() {
        let service = AppBuilder::new()
            .register(RemoveDuplicateCsv)
            .unwrap()
            .require_handlers_for_all_tools()
            .build();
        assert!(matches!(
            service,
            Err(BuildError::ToolsWithoutHandler(missing)) if missing == vec!["count-csv-rows".to_string()]
        ));
    }

    #[test]
    fn test_build_partial_handlers_allowed_by_default() {
        let service = AppBuilder::new().register(RemoveDuplicateCsv).unwrap().build();
        assert!(service.is_ok());
    }
}
