//! WorkerLoop - queue 1 つ分のタスク実行ループ
//!
//! # フロー
//! 1. 同時実行数の枠（Semaphore）を確保
//! 2. Transport::poll() で次のタスクを待つ（shutdown と select で競合させる）
//! 3. ハンドラを名前で引いて、別 task で実行
//! 4. 結果を TaskLease で返す（エラーも panic も返す。ループは止めない）
//!
//! Workflow と Activity は別々の Poller が、別々の枠で受け取ります。
//! Workflow が枠を使い切っていても、その Workflow が待つ Activity は必ず poll されます。
//!
//! shutdown 後は新しいタスクを取らず、実行中のものが終わるのを待ちます。
//! 猶予（`shutdown_grace`）を過ぎても終わらないものは中断します。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, info, warn};

use super::status::WorkerCounters;
use crate::codec::{Payload, PayloadCodec};
use crate::config::{DEFAULT_MAX_CONCURRENT_TASKS, DEFAULT_SHUTDOWN_GRACE, WorkerConfig};
use crate::domain::{HandlerError, HandlerKind, TaskId, TaskQueue, WorkerId};
use crate::ports::{TaskLease, TaskResult, Transport};
use crate::registry::QueueBundle;
use crate::typed::WorkflowContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOptions {
    /// 1 ワーカーが種類（Workflow / Activity）ごとに同時に実行するタスク数の上限
    pub max_concurrent_tasks: usize,
    /// shutdown 後、実行中のタスクを待つ上限
    pub shutdown_grace: Duration,
}

impl WorkerOptions {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            max_concurrent_tasks: config.max_concurrent_tasks(),
            shutdown_grace: config.shutdown_grace(),
        }
    }
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error("task queue '{0}' has no handlers")]
    EmptyBundle(TaskQueue),

    #[error("max_concurrent_tasks must be greater than 0")]
    NoConcurrency,
}

/// QueueWorker は 1 つの queue を担当するワーカー
///
/// 実際に poll するのは `into_pollers` で得られる Workflow 用と Activity 用の 2 つの Poller です。
pub struct QueueWorker {
    id: WorkerId,
    bundle: Arc<QueueBundle>,
    transport: Arc<dyn Transport>,
    codec: Arc<PayloadCodec>,
    counters: Arc<WorkerCounters>,
    options: WorkerOptions,
}

impl QueueWorker {
    pub fn new(
        bundle: QueueBundle,
        transport: Arc<dyn Transport>,
        codec: Arc<PayloadCodec>,
        options: &WorkerOptions,
    ) -> Result<Self, WorkerError> {
        if bundle.is_empty() {
            return Err(WorkerError::EmptyBundle(bundle.task_queue().clone()));
        }
        if options.max_concurrent_tasks == 0 {
            return Err(WorkerError::NoConcurrency);
        }

        Ok(Self {
            id: WorkerId::generate(),
            bundle: Arc::new(bundle),
            transport,
            codec,
            counters: Arc::new(WorkerCounters::default()),
            options: options.clone(),
        })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn task_queue(&self) -> &TaskQueue {
        self.bundle.task_queue()
    }

    pub(crate) fn counters(&self) -> Arc<WorkerCounters> {
        Arc::clone(&self.counters)
    }

    /// (Workflow 用, Activity 用) の Poller に分ける
    ///
    /// 2 つは件数カウンタを共有し、同時実行の枠は別々に持ちます。
    pub fn into_pollers(self) -> (Poller, Poller) {
        info!(
            worker_id = %self.id,
            task_queue = %self.bundle.task_queue(),
            activities = self.bundle.activity_names().count(),
            workflows = self.bundle.workflow_names().count(),
            "worker started"
        );
        let poller = |kind| Poller {
            worker_id: self.id,
            kind,
            bundle: Arc::clone(&self.bundle),
            transport: Arc::clone(&self.transport),
            codec: Arc::clone(&self.codec),
            counters: Arc::clone(&self.counters),
            permits: Arc::new(Semaphore::new(self.options.max_concurrent_tasks)),
            shutdown_grace: self.options.shutdown_grace,
        };
        (poller(HandlerKind::Workflow), poller(HandlerKind::Activity))
    }
}

/// Poller は 1 つの queue から 1 種類のタスクを受け取って実行する
pub struct Poller {
    worker_id: WorkerId,
    kind: HandlerKind,
    bundle: Arc<QueueBundle>,
    transport: Arc<dyn Transport>,
    codec: Arc<PayloadCodec>,
    counters: Arc<WorkerCounters>,
    permits: Arc<Semaphore>,
    shutdown_grace: Duration,
}

impl Poller {
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    /// shutdown が要求されるか Transport が閉じるまでタスクを処理する
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let (worker_id, kind) = (self.worker_id, self.kind);
        let task_queue = self.bundle.task_queue().clone();

        let mut in_flight = JoinSet::new();
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            // 枠が空いてから poll する（受け取ったタスクを抱えたまま待たない）
            let permit = tokio::select! {
                changed = shutdown_rx.changed() => {
                    // Sender が drop された場合も shutdown とみなす
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let lease = tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                lease = self.transport.poll(&task_queue, kind) => lease,
            };

            let Some(lease) = lease else {
                warn!(%worker_id, %task_queue, %kind, "transport closed; poller stopping");
                break;
            };

            while let Some(finished) = in_flight.try_join_next() {
                if let Err(err) = finished {
                    warn!(%worker_id, %kind, error = %err, "task runner ended abnormally");
                }
            }

            in_flight.spawn(execute(
                lease,
                Arc::clone(&self.bundle),
                Arc::clone(&self.transport),
                Arc::clone(&self.codec),
                Arc::clone(&self.counters),
                permit,
            ));
        }

        let draining = in_flight.len();
        if draining > 0 {
            info!(%worker_id, %task_queue, %kind, draining, "waiting for in-flight tasks");
        }
        let drained = tokio::time::timeout(self.shutdown_grace, async {
            while let Some(finished) = in_flight.join_next().await {
                if let Err(err) = finished {
                    warn!(%worker_id, %kind, error = %err, "task runner ended abnormally");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                %worker_id,
                %task_queue,
                %kind,
                cancelled = in_flight.len(),
                grace = ?self.shutdown_grace,
                "in-flight tasks outlived the shutdown grace period; cancelling"
            );
            in_flight.shutdown().await;
        }

        let counts = self.counters.snapshot();
        info!(
            %worker_id,
            %task_queue,
            %kind,
            completed = counts.completed,
            failed = counts.failed,
            "poller stopped"
        );
    }
}

// 外側の task が中断されたら、ハンドラの task も止める
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn execute(
    lease: TaskLease,
    bundle: Arc<QueueBundle>,
    transport: Arc<dyn Transport>,
    codec: Arc<PayloadCodec>,
    counters: Arc<WorkerCounters>,
    _permit: OwnedSemaphorePermit,
) {
    let (task_id, kind, attempt) = (lease.id(), lease.kind(), lease.attempt());
    let handler = lease.handler().to_string();
    debug!(%task_id, %kind, handler = %handler, attempt, "task received");

    // ハンドラは内側の task で動かし、panic を JoinError として受け取る
    let run = tokio::spawn(dispatch(
        task_id,
        kind,
        handler.clone(),
        lease.input().clone(),
        bundle,
        transport,
        codec,
    ));
    let _abort = AbortOnDrop(run.abort_handle());
    let result = match run.await {
        Ok(result) => result,
        Err(err) => Err(HandlerError::retryable(format!("{kind} '{handler}' panicked: {err}"))),
    };

    match &result {
        Ok(_) => {
            counters.record_completed();
            debug!(%task_id, %kind, handler = %handler, attempt, "task completed");
        }
        Err(err) => {
            counters.record_failed();
            warn!(%task_id, %kind, handler = %handler, attempt, error = %err, "task failed");
        }
    }

    if !lease.complete(result) {
        debug!(%task_id, "submitter is no longer waiting for the result");
    }
}

async fn dispatch(
    task_id: TaskId,
    kind: HandlerKind,
    handler: String,
    input: Payload,
    bundle: Arc<QueueBundle>,
    transport: Arc<dyn Transport>,
    codec: Arc<PayloadCodec>,
) -> TaskResult {
    let unknown = || {
        HandlerError::non_retryable(format!(
            "no {kind} '{handler}' is registered on task queue '{}'",
            bundle.task_queue()
        ))
    };

    match kind {
        HandlerKind::Activity => {
            let activity = bundle.activity(&handler).cloned().ok_or_else(unknown)?;
            activity.execute_dyn(&codec, input).await
        }
        HandlerKind::Workflow => {
            let workflow = bundle.workflow(&handler).cloned().ok_or_else(unknown)?;
            let ctx = WorkflowContext::new(
                task_id,
                bundle.task_queue().clone(),
                transport,
                Arc::clone(&codec),
            );
            workflow.run_dyn(&ctx, &codec, input).await
        }
    }
}
