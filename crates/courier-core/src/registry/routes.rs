//! WorkflowRoutes - ドメインから独立した Workflow → queue の登録表
//!
//! 複数ドメインにまたがる Workflow は特定ドメインの descriptor に属さないため、
//! ここで queue を指定して登録します。

use std::fmt;
use std::sync::Arc;

use crate::domain::TaskQueue;
use crate::typed::{DynWorkflow, TypedWorkflow, Workflow};

#[derive(Default)]
pub struct WorkflowRoutes {
    routes: Vec<(TaskQueue, Arc<dyn DynWorkflow>)>,
}

impl WorkflowRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<W: Workflow>(mut self, task_queue: TaskQueue, workflow: W) -> Self {
        self.routes
            .push((task_queue, Arc::new(TypedWorkflow::new(workflow))));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TaskQueue, &Arc<dyn DynWorkflow>)> {
        self.routes.iter().map(|(queue, workflow)| (queue, workflow))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for WorkflowRoutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.routes.iter().map(|(queue, w)| (w.name(), queue.as_str())))
            .finish()
    }
}
