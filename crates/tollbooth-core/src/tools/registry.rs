//! HandlerRegistry - slug → ToolHandler の対応表
//!
//! # 学習ポイント
//! - HashMap での trait object の管理
//! - Arc による共有所有権（リクエストごとに clone して使う）

use std::collections::HashMap;
use std::sync::Arc;

use super::csv_lines::{CountCsvRows, RemoveDuplicateCsv};
use super::handler::ToolHandler;
use crate::domain::ToolSlug;

/// RegistryError は HandlerRegistry の操作エラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for tool '{0}' is already registered")]
    AlreadyRegistered(ToolSlug),
}

/// HandlerRegistry は ToolHandler を登録・管理
///
/// 初期化時に組み立て（mutable）、実行時は読むだけ（immutable）なのでロック不要。
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<ToolSlug, Arc<dyn ToolHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// 組み込みハンドラを全て登録済みのレジストリ
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(Arc::new(RemoveDuplicateCsv));
        registry.insert(Arc::new(CountCsvRows));
        registry
    }

    fn insert(&mut self, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(ToolSlug::new(handler.slug()), handler);
    }

    pub fn register<H: ToolHandler + 'static>(&mut self, handler: H) -> Result<(), RegistryError> {
        let slug = ToolSlug::new(handler.slug());
        if self.handlers.contains_key(&slug) {
            return Err(RegistryError::AlreadyRegistered(slug));
        }
        self.handlers.insert(slug, Arc::new(handler));
        Ok(())
    }

    pub fn get(&self, slug: &ToolSlug) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(slug).cloned()
    }

    /// 登録済みの slug（ソート済み）
    pub fn registered_slugs(&self) -> Vec<ToolSlug> {
        let mut slugs: Vec<ToolSlug> = self.handlers.keys().cloned().collect();
        slugs.sort();
        slugs
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = HandlerRegistry::new();
        registry.register(RemoveDuplicateCsv).unwrap();

        let retrieved = registry.get(&ToolSlug::new("remove-duplicate-csv"));
        assert!(retrieved.is_some());
        assert!(registry.get(&ToolSlug::new("count-csv-rows")).is_none());
    }

    #[test]
    fn test_double_registration() {
        let mut registry = HandlerRegistry::new();
        registry.register(RemoveDuplicateCsv).unwrap();
        let result = registry.register(RemoveDuplicateCsv);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[test]
    fn test_builtin_slugs() {
        let registry = HandlerRegistry::builtin();
        assert_eq!(
            registry.registered_slugs(),
            vec![
                ToolSlug::new("count-csv-rows"),
                ToolSlug::new("remove-duplicate-csv")
            ]
        );
    }
}
