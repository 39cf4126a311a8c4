//! WorkerComposer - queue ごとの集約結果からワーカー群を起動する
//!
//! # 学習ポイント
//! - watch チャネルで全ワーカーに shutdown を伝える
//! - JoinSet で起動済みワーカーをまとめて join する
//! - 途中で失敗したら、起動済みのワーカーを止めてから失敗を返す
//!
//! # shutdown の順序
//! 1. 全ワーカーの Workflow Poller を止め、実行中の Workflow が終わるのを待つ
//! 2. その間も Activity Poller は動き続ける（Workflow が残りの Activity を呼べる）
//! 3. Workflow が出揃ったら Activity Poller を止めて待つ

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::status::{WorkerCounters, WorkerCounts};
use super::worker_loop::{QueueWorker, WorkerOptions};
use crate::codec::PayloadCodec;
use crate::domain::TaskQueue;
use crate::ports::Transport;
use crate::registry::QueueBundles;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error("No workers were registered: no enabled domain contributed any handler")]
    NoWorkersRegistered,

    #[error("Worker for task queue '{task_queue}' failed to start: {reason}")]
    WorkerStartFailed { task_queue: TaskQueue, reason: String },
}

/// WorkerComposer は QueueBundles を受け取り、queue ごとに 1 ワーカーを起動する
///
/// # 使用例
/// ```ignore
/// let composer = WorkerComposer::new(codec, WorkerOptions::default());
/// let group = composer.compose(report.bundles, transport).await?;
/// group.run_until(shutdown_signal()).await;
/// ```
pub struct WorkerComposer {
    codec: Arc<PayloadCodec>,
    options: WorkerOptions,
}

impl WorkerComposer {
    pub fn new(codec: Arc<PayloadCodec>, options: WorkerOptions) -> Self {
        Self { codec, options }
    }

    /// ワーカー群を起動する
    ///
    /// ワーカーの集合は起動時に固定され、後から追加・削除はできません。
    pub async fn compose(
        &self,
        bundles: QueueBundles,
        transport: Arc<dyn Transport>,
    ) -> Result<WorkerGroup, ComposeError> {
        if bundles.is_empty() {
            error!("no workers were registered");
            return Err(ComposeError::NoWorkersRegistered);
        }

        let (stop_workflows, workflows_rx) = watch::channel(false);
        let (stop_activities, activities_rx) = watch::channel(false);
        let mut group = WorkerGroup {
            stop_workflows,
            stop_activities,
            workflow_pollers: JoinSet::new(),
            activity_pollers: JoinSet::new(),
            counters: BTreeMap::new(),
        };

        for bundle in bundles {
            let task_queue = bundle.task_queue().clone();
            let worker = match QueueWorker::new(
                bundle,
                Arc::clone(&transport),
                Arc::clone(&self.codec),
                &self.options,
            ) {
                Ok(worker) => worker,
                Err(err) => {
                    error!(%task_queue, error = %err, started = group.len(), "worker failed to start; stopping started workers");
                    group.shutdown_and_join().await;
                    return Err(ComposeError::WorkerStartFailed {
                        task_queue,
                        reason: err.to_string(),
                    });
                }
            };

            group.counters.insert(task_queue, worker.counters());
            let (workflows, activities) = worker.into_pollers();
            group.workflow_pollers.spawn(workflows.run(workflows_rx.clone()));
            group.activity_pollers.spawn(activities.run(activities_rx.clone()));
        }

        info!(
            workers = group.len(),
            endpoint = transport.endpoint(),
            "worker process running"
        );
        Ok(group)
    }
}

/// Worker group handle.
/// - `request_shutdown()` で全ワーカーが新しい Workflow の受け取りをやめる
/// - `shutdown_and_join()` で全ワーカーの終了（実行中タスクの完了）を待てる
pub struct WorkerGroup {
    stop_workflows: watch::Sender<bool>,
    stop_activities: watch::Sender<bool>,
    workflow_pollers: JoinSet<()>,
    activity_pollers: JoinSet<()>,
    counters: BTreeMap<TaskQueue, Arc<WorkerCounters>>,
}

impl WorkerGroup {
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn task_queues(&self) -> impl Iterator<Item = &TaskQueue> {
        self.counters.keys()
    }

    pub fn counts(&self, task_queue: &str) -> Option<WorkerCounts> {
        self.counters.get(task_queue).map(|c| c.snapshot())
    }

    /// Request shutdown for all workers.
    /// 実行中のハンドラは中断せず、新しい Workflow を取らなくなるだけ。
    /// Activity の受け取りは `shutdown_and_join()` が Workflow を待ち終えてから止める。
    pub fn request_shutdown(&self) {
        // 受信側がすでに drop されていても構わない
        self.stop_workflows.send_replace(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(mut self) {
        self.request_shutdown();
        join_all(&mut self.workflow_pollers).await;
        self.stop_activities.send_replace(true);
        join_all(&mut self.activity_pollers).await;
    }

    /// signal が完了するまで動かし、その後 shutdown する
    ///
    /// 全ワーカーが先に止まった（Transport が閉じた等）場合もそこで戻ります。
    pub async fn run_until(mut self, signal: impl Future<Output = ()>) {
        let stopped = async {
            join_all(&mut self.workflow_pollers).await;
            join_all(&mut self.activity_pollers).await;
        };
        tokio::select! {
            _ = signal => info!("shutdown requested"),
            _ = stopped => warn!("every worker stopped before shutdown was requested"),
        }
        self.shutdown_and_join().await;
    }
}

impl fmt::Debug for WorkerGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerGroup")
            .field("task_queues", &self.counters.keys().collect::<Vec<_>>())
            .field(
                "running",
                &(self.workflow_pollers.len() + self.activity_pollers.len()),
            )
            .finish()
    }
}

async fn join_all(joins: &mut JoinSet<()>) {
    while let Some(joined) = joins.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "worker task ended abnormally");
        }
    }
}
