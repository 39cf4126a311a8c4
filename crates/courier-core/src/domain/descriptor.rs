//! DomainDescriptor - プラグイン可能なドメインが満たす契約
//!
//! 各ドメインは明示的なファクトリ関数の中で DomainDescriptor を組み立てます。
//! ハンドラは実行時に探索せず、builder に列挙したものだけが登録されます。

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::DomainResolutionError;
use super::task_queue::TaskQueue;
use crate::typed::{Activity, DynActivity, DynWorkflow, TypedActivity, TypedWorkflow, Workflow};

/// ハンドラの種類（エンジンが配送するタスクの種類でもある）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    Activity,
    Workflow,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Activity => f.write_str("activity"),
            HandlerKind::Workflow => f.write_str("workflow"),
        }
    }
}

/// DomainDescriptor は 1 ドメイン分の登録内容
///
/// # 不変条件
/// - 生成後は読み取り専用
/// - task_queue を持たないものは `validate()` で拒否される（既定値で補わない）
pub struct DomainDescriptor {
    name: String,
    task_queue: Option<String>,
    activities: Vec<Arc<dyn DynActivity>>,
    workflows: Vec<Arc<dyn DynWorkflow>>,
}

impl DomainDescriptor {
    /// 明示的な登録リストを組み立てる builder
    ///
    /// # 使用例
    /// ```ignore
    /// let descriptor = DomainDescriptor::builder("hello")
    ///     .task_queue("hello-task-queue")
    ///     .activity(SayHello)
    ///     .workflow(GreetingWorkflow)
    ///     .build();
    /// ```
    pub fn builder(name: impl Into<String>) -> DomainDescriptorBuilder {
        DomainDescriptorBuilder {
            descriptor: DomainDescriptor {
                name: name.into(),
                task_queue: None,
                activities: Vec::new(),
                workflows: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn activities(&self) -> &[Arc<dyn DynActivity>] {
        &self.activities
    }

    pub fn workflows(&self) -> &[Arc<dyn DynWorkflow>] {
        &self.workflows
    }

    /// 契約を検証して queue 名を返す
    ///
    /// # 検証
    /// - task_queue が宣言されていて空白でないこと
    /// - 同じハンドラ名が種類ごとに 1 回しか現れないこと
    pub fn validate(&self) -> Result<TaskQueue, DomainResolutionError> {
        let task_queue = self
            .task_queue
            .as_deref()
            .and_then(|raw| TaskQueue::new(raw).ok())
            .ok_or_else(|| DomainResolutionError::MissingTaskQueue(self.name.clone()))?;

        let activity_names = self.activities.iter().map(|a| a.name());
        self.ensure_unique(HandlerKind::Activity, activity_names)?;
        let workflow_names = self.workflows.iter().map(|w| w.name());
        self.ensure_unique(HandlerKind::Workflow, workflow_names)?;

        Ok(task_queue)
    }

    fn ensure_unique<'a>(
        &self,
        kind: HandlerKind,
        names: impl Iterator<Item = &'a str>,
    ) -> Result<(), DomainResolutionError> {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                return Err(DomainResolutionError::DuplicateHandler {
                    domain: self.name.clone(),
                    kind,
                    handler: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for DomainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainDescriptor")
            .field("name", &self.name)
            .field("task_queue", &self.task_queue)
            .field(
                "activities",
                &self.activities.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field(
                "workflows",
                &self.workflows.iter().map(|w| w.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// DomainDescriptor の builder
pub struct DomainDescriptorBuilder {
    descriptor: DomainDescriptor,
}

impl DomainDescriptorBuilder {
    pub fn task_queue(mut self, task_queue: impl Into<String>) -> Self {
        self.descriptor.task_queue = Some(task_queue.into());
        self
    }

    /// 型付き Activity を登録（内部で TypedActivity に包んで型消去する）
    pub fn activity<A: Activity>(self, activity: A) -> Self {
        self.dyn_activity(Arc::new(TypedActivity::new(activity)))
    }

    pub fn workflow<W: Workflow>(self, workflow: W) -> Self {
        self.dyn_workflow(Arc::new(TypedWorkflow::new(workflow)))
    }

    pub fn dyn_activity(mut self, activity: Arc<dyn DynActivity>) -> Self {
        self.descriptor.activities.push(activity);
        self
    }

    pub fn dyn_workflow(mut self, workflow: Arc<dyn DynWorkflow>) -> Self {
        self.descriptor.workflows.push(workflow);
        self
    }

    pub fn build(self) -> DomainDescriptor {
        self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::testing::{EchoActivity, EchoWorkflow, ShoutActivity};

    #[test]
    fn valid_descriptor_yields_its_queue() {
        let descriptor = DomainDescriptor::builder("echo")
            .task_queue("echo-queue")
            .activity(EchoActivity)
            .activity(ShoutActivity)
            .workflow(EchoWorkflow)
            .build();

        let queue = descriptor.validate().unwrap();
        assert_eq!(queue.as_str(), "echo-queue");
        assert_eq!(descriptor.activities().len(), 2);
        assert_eq!(descriptor.workflows().len(), 1);
    }

    #[test]
    fn missing_task_queue_is_rejected() {
        let descriptor = DomainDescriptor::builder("echo")
            .activity(EchoActivity)
            .build();

        assert_eq!(
            descriptor.validate(),
            Err(DomainResolutionError::MissingTaskQueue("echo".to_string()))
        );
    }

    #[test]
    fn blank_task_queue_is_rejected_not_defaulted() {
        let descriptor = DomainDescriptor::builder("echo")
            .task_queue("   ")
            .activity(EchoActivity)
            .build();

        assert!(matches!(
            descriptor.validate(),
            Err(DomainResolutionError::MissingTaskQueue(_))
        ));
    }

    #[test]
    fn duplicate_activity_names_are_rejected() {
        let descriptor = DomainDescriptor::builder("echo")
            .task_queue("echo-queue")
            .activity(EchoActivity)
            .activity(EchoActivity)
            .build();

        assert!(matches!(
            descriptor.validate(),
            Err(DomainResolutionError::DuplicateHandler { kind: HandlerKind::Activity, ref handler, .. })
                if handler == "echo"
        ));
    }
}
