//! DomainCatalog - ドメイン識別子から明示的なファクトリ関数への対応表
//!
//! # 学習ポイント
//! - 関数ポインタ（`fn(&WorkerConfig) -> ...`）による遅延生成
//! - import 時の副作用ではなく、呼び出したときにだけ descriptor を組み立てる

use std::collections::BTreeMap;

use crate::config::WorkerConfig;
use crate::domain::{DomainDescriptor, DomainResolutionError};

/// ドメイン 1 つ分のファクトリ
pub type DomainFactory = fn(&WorkerConfig) -> Result<DomainDescriptor, DomainResolutionError>;

/// RegistryError は DomainCatalog の操作エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Domain '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// DomainCatalog は識別子 → ファクトリの対応表
///
/// # 使用例
/// ```ignore
/// let mut catalog = DomainCatalog::new();
/// catalog.register("hello", hello::descriptor)?;
///
/// let descriptor = catalog.resolve("hello", &config)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct DomainCatalog {
    factories: BTreeMap<String, DomainFactory>,
}

impl DomainCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        factory: DomainFactory,
    ) -> Result<(), RegistryError> {
        let identifier = identifier.into().trim().to_string();
        if self.factories.contains_key(&identifier) {
            return Err(RegistryError::AlreadyRegistered(identifier));
        }
        self.factories.insert(identifier, factory);
        Ok(())
    }

    /// 識別子を解決して descriptor を組み立てる
    pub fn resolve(
        &self,
        identifier: &str,
        config: &WorkerConfig,
    ) -> Result<DomainDescriptor, DomainResolutionError> {
        let identifier = identifier.trim();
        let factory = self
            .factories
            .get(identifier)
            .ok_or_else(|| DomainResolutionError::NotFound(identifier.to_string()))?;
        factory(config)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::testing::EchoActivity;

    fn echo(_: &WorkerConfig) -> Result<DomainDescriptor, DomainResolutionError> {
        Ok(DomainDescriptor::builder("echo")
            .task_queue("echo-queue")
            .activity(EchoActivity)
            .build())
    }

    fn broken(_: &WorkerConfig) -> Result<DomainDescriptor, DomainResolutionError> {
        Err(DomainResolutionError::build("broken", "payment gateway unreachable"))
    }

    #[test]
    fn register_and_resolve() {
        let mut catalog = DomainCatalog::new();
        catalog.register("echo", echo).unwrap();

        let descriptor = catalog.resolve(" echo ", &WorkerConfig::default()).unwrap();
        assert_eq!(descriptor.name(), "echo");
        assert_eq!(catalog.identifiers().collect::<Vec<_>>(), vec!["echo"]);
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut catalog = DomainCatalog::new();
        catalog.register("echo", echo).unwrap();
        assert_eq!(
            catalog.register("echo", broken),
            Err(RegistryError::AlreadyRegistered("echo".to_string()))
        );
    }

    #[test]
    fn unknown_identifier_is_not_found() {
        let catalog = DomainCatalog::new();
        assert!(matches!(
            catalog.resolve("ghost", &WorkerConfig::default()),
            Err(DomainResolutionError::NotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn factory_failure_is_passed_through() {
        let mut catalog = DomainCatalog::new();
        catalog.register("broken", broken).unwrap();
        assert!(matches!(
            catalog.resolve("broken", &WorkerConfig::default()),
            Err(DomainResolutionError::Build { .. })
        ));
    }
}
