//! QueueBundle - 1 つの queue に集約されたハンドラ集合

use std::any::TypeId;
use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::domain::TaskQueue;
use crate::typed::{DynActivity, DynWorkflow};

/// 同名のハンドラを合流させた結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Merge {
    Added,
    /// 同じ実装が既にある（1 つにまとめる）
    AlreadyPresent,
    /// 別の実装と名前が衝突した。その名前はこの queue から外れる
    Conflict,
}

/// QueueBundle は queue を主張した全ドメイン（と WorkflowRoutes）の和集合
///
/// # 不変条件
/// - ハンドラ名は種類ごとに一意
/// - 同名で実装が異なるものは、どちらも載せない（読み込み順で勝者が変わらない）
/// - 集約が終わった後は読み取り専用
pub struct QueueBundle {
    task_queue: TaskQueue,
    activities: BTreeMap<String, Arc<dyn DynActivity>>,
    workflows: BTreeMap<String, Arc<dyn DynWorkflow>>,
    conflicted_activities: BTreeSet<String>,
    conflicted_workflows: BTreeSet<String>,
}

impl QueueBundle {
    pub fn new(task_queue: TaskQueue) -> Self {
        Self {
            task_queue,
            activities: BTreeMap::new(),
            workflows: BTreeMap::new(),
            conflicted_activities: BTreeSet::new(),
            conflicted_workflows: BTreeSet::new(),
        }
    }

    pub fn task_queue(&self) -> &TaskQueue {
        &self.task_queue
    }

    pub(crate) fn add_activity(&mut self, activity: Arc<dyn DynActivity>) -> Merge {
        let implementation = activity.implementation();
        merge(
            &mut self.activities,
            &mut self.conflicted_activities,
            activity.name().to_string(),
            implementation,
            activity,
            |existing| existing.implementation(),
        )
    }

    pub(crate) fn add_workflow(&mut self, workflow: Arc<dyn DynWorkflow>) -> Merge {
        let implementation = workflow.implementation();
        merge(
            &mut self.workflows,
            &mut self.conflicted_workflows,
            workflow.name().to_string(),
            implementation,
            workflow,
            |existing| existing.implementation(),
        )
    }

    pub fn activity(&self, name: &str) -> Option<&Arc<dyn DynActivity>> {
        self.activities.get(name)
    }

    pub fn workflow(&self, name: &str) -> Option<&Arc<dyn DynWorkflow>> {
        self.workflows.get(name)
    }

    pub fn activity_names(&self) -> impl Iterator<Item = &str> {
        self.activities.keys().map(String::as_str)
    }

    pub fn workflow_names(&self) -> impl Iterator<Item = &str> {
        self.workflows.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty() && self.workflows.is_empty()
    }
}

impl fmt::Debug for QueueBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueBundle")
            .field("task_queue", &self.task_queue)
            .field("activities", &self.activities.keys().collect::<Vec<_>>())
            .field("workflows", &self.workflows.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn merge<H: ?Sized>(
    handlers: &mut BTreeMap<String, Arc<H>>,
    conflicted: &mut BTreeSet<String>,
    name: String,
    implementation: TypeId,
    handler: Arc<H>,
    implementation_of: impl Fn(&H) -> TypeId,
) -> Merge {
    if conflicted.contains(&name) {
        return Merge::Conflict;
    }
    match handlers.entry(name) {
        btree_map::Entry::Vacant(slot) => {
            slot.insert(handler);
            Merge::Added
        }
        btree_map::Entry::Occupied(existing) => {
            if implementation_of(existing.get().as_ref()) == implementation {
                Merge::AlreadyPresent
            } else {
                let (name, _) = existing.remove_entry();
                conflicted.insert(name);
                Merge::Conflict
            }
        }
    }
}

/// queue 名 → QueueBundle
///
/// BTreeMap なのでワーカーの起動順は queue 名順で決定的になります。
#[derive(Debug, Default)]
pub struct QueueBundles {
    bundles: BTreeMap<TaskQueue, QueueBundle>,
}

impl QueueBundles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, task_queue: &str) -> Option<&QueueBundle> {
        self.bundles.get(task_queue)
    }

    pub fn queues(&self) -> impl Iterator<Item = &TaskQueue> {
        self.bundles.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueBundle> {
        self.bundles.values()
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub(crate) fn entry(&mut self, task_queue: &TaskQueue) -> &mut QueueBundle {
        self.bundles
            .entry(task_queue.clone())
            .or_insert_with(|| QueueBundle::new(task_queue.clone()))
    }

    /// ハンドラを 1 つも持たない queue を捨てる
    pub(crate) fn retain_non_empty(&mut self) {
        self.bundles.retain(|_, bundle| !bundle.is_empty());
    }
}

impl IntoIterator for QueueBundles {
    type Item = QueueBundle;
    type IntoIter = btree_map::IntoValues<TaskQueue, QueueBundle>;

    fn into_iter(self) -> Self::IntoIter {
        self.bundles.into_values()
    }
}
