//! AppBuilder - アプリケーションの構築とワイヤリング（composition root）
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 組み込みドメインを既定にしつつ、テストでは差し替えられる

use std::sync::Arc;

use tracing::info;

use super::composer::{ComposeError, WorkerComposer, WorkerGroup};
use super::worker_loop::WorkerOptions;
use crate::codec::PayloadCodec;
use crate::config::WorkerConfig;
use crate::domains;
use crate::ports::Transport;
use crate::registry::{Diagnostic, DomainCatalog, DomainRegistry, QueueBundles, WorkflowRoutes};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(WorkerConfig::from_env()?)
///     .expect_queues(&["pizza-task-queue"])
///     .build()?;
/// let group = app.start(transport).await?;
/// ```
///
/// # Fail-fast 設計
/// - expect_queues() で必ず起動すべき queue を指定
/// - build() 時に「期待集合 ⊆ 集約済み queue」をチェック
/// - ワーカーが 0 の判断は build ではなく start（WorkerComposer）が行う
pub struct AppBuilder {
    config: WorkerConfig,
    catalog: DomainCatalog,
    routes: WorkflowRoutes,
    codec: PayloadCodec,
    expected_queues: Option<Vec<String>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task queues: {0:?}. These queues were expected but no enabled domain serves them.")]
    MissingTaskQueues(Vec<String>),
}

impl AppBuilder {
    /// 組み込みのドメインと既定のコーデックで AppBuilder を作成
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            catalog: domains::builtin_catalog(),
            routes: domains::builtin_routes(),
            codec: PayloadCodec::default(),
            expected_queues: None,
        }
    }

    pub fn with_catalog(mut self, catalog: DomainCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_routes(mut self, routes: WorkflowRoutes) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_codec(mut self, codec: PayloadCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn expect_queues(mut self, task_queues: &[&str]) -> Self {
        self.expected_queues = Some(task_queues.iter().map(|q| q.to_string()).collect());
        self
    }

    /// 設定に書かれたドメインを読み込んで App を生成
    ///
    /// ドメインごとの失敗は App の diagnostics に残り、ここではエラーになりません。
    pub fn build(self) -> Result<App, BuildError> {
        let report = DomainRegistry::new(&self.catalog, &self.routes)
            .load(self.config.enabled_domains(), &self.config);

        if let Some(expected) = &self.expected_queues {
            let missing: Vec<String> = expected
                .iter()
                .filter(|queue| report.bundles.get(queue).is_none())
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingTaskQueues(missing));
            }
        }

        info!(
            domains = ?self.config.enabled_domains(),
            queues = report.bundles.len(),
            diagnostics = report.diagnostics.len(),
            "domains loaded"
        );
        Ok(App {
            config: self.config,
            codec: Arc::new(self.codec),
            bundles: report.bundles,
            diagnostics: report.diagnostics,
        })
    }
}

/// App は読み込み済みのドメインとコーデックを持つ
pub struct App {
    config: WorkerConfig,
    codec: Arc<PayloadCodec>,
    bundles: QueueBundles,
    diagnostics: Vec<Diagnostic>,
}

impl App {
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn codec(&self) -> Arc<PayloadCodec> {
        Arc::clone(&self.codec)
    }

    pub fn bundles(&self) -> &QueueBundles {
        &self.bundles
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// ワーカー群を起動する
    pub async fn start(self, transport: Arc<dyn Transport>) -> Result<WorkerGroup, ComposeError> {
        WorkerComposer::new(self.codec, WorkerOptions::from_config(&self.config))
            .compose(self.bundles, transport)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::{hello, pizza};
    use crate::impls::InMemoryTransport;

    #[test]
    fn build_loads_enabled_builtin_domains() {
        let config = WorkerConfig::default().with_enabled_domains(["hello", "pizza"]);
        let app = AppBuilder::new(config)
            .expect_queues(&[hello::TASK_QUEUE, pizza::TASK_QUEUE])
            .build()
            .unwrap();

        assert_eq!(app.bundles().len(), 2);
        assert!(app.diagnostics().is_empty());
    }

    #[test]
    fn build_missing_expected_queue() {
        let config = WorkerConfig::default().with_enabled_domains(["hello"]);
        let result = AppBuilder::new(config)
            .expect_queues(&[hello::TASK_QUEUE, pizza::TASK_QUEUE])
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingTaskQueues(missing)) if missing == vec![pizza::TASK_QUEUE.to_string()]
        ));
    }

    #[test]
    fn unknown_domain_is_reported_not_fatal() {
        let config = WorkerConfig::default().with_enabled_domains(["hello", "billing"]);
        let app = AppBuilder::new(config).build().unwrap();

        assert_eq!(app.bundles().len(), 1);
        assert_eq!(app.diagnostics().len(), 1);
        assert_eq!(app.diagnostics()[0].domain, "billing");
    }

    #[tokio::test]
    async fn empty_configuration_fails_to_start() {
        let app = AppBuilder::new(WorkerConfig::default()).build().unwrap();
        let transport = InMemoryTransport::connect("localhost:7233").unwrap();

        let result = app.start(transport).await;
        assert!(matches!(result, Err(ComposeError::NoWorkersRegistered)));
    }
}
