//! DomainRegistry - 設定に書かれたドメインを読み込み、queue ごとに集約する
//!
//! # 集約ルール
//! - ドメインごとに独立して解決する（1 つの失敗で他を止めない）
//! - 同じ queue への寄与は和集合（後勝ちで上書きしない）
//! - 同名のハンドラは、同じ実装なら 1 つにまとめ、別の実装ならどちらも載せない
//! - WorkflowRoutes の Workflow は、解決できたドメインが主張した queue にだけ合流する
//! - ハンドラを 1 つも持たない queue は結果に含めない
//!
//! 読み込みの可否（ワーカーが 0 なら起動失敗、など）は判断せず、起きたことを報告するだけです。

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, error, info, warn};

use super::bundle::{Merge, QueueBundles};
use super::catalog::DomainCatalog;
use super::routes::WorkflowRoutes;
use crate::config::WorkerConfig;
use crate::domain::{DomainResolutionError, HandlerKind, TaskQueue};

/// WorkflowRoutes 由来の診断に使う発生元名
pub const ROUTES_SOURCE: &str = "workflow-routes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// ドメインを読み込めなかった（スキップ）
    Unresolved(DomainResolutionError),
    /// activity も workflow も持たない
    NoHandlers { task_queue: TaskQueue },
    /// workflow だけを持つ（受理）
    NoActivities { task_queue: TaskQueue },
    /// 同じ queue に同じ実装の同名ハンドラが既にある（1 つにまとめる）
    DuplicateHandler {
        task_queue: TaskQueue,
        kind: HandlerKind,
        handler: String,
    },
    /// 同じ queue に別の実装の同名ハンドラがある（その名前は queue から外す）
    ConflictingHandler {
        task_queue: TaskQueue,
        kind: HandlerKind,
        handler: String,
    },
}

/// 1 ドメイン分の読み込み結果の報告
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub domain: String,
    pub severity: Severity,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    fn error(domain: &str, kind: DiagnosticKind) -> Self {
        Self {
            domain: domain.to_string(),
            severity: Severity::Error,
            kind,
        }
    }

    fn warning(domain: &str, kind: DiagnosticKind) -> Self {
        Self {
            domain: domain.to_string(),
            severity: Severity::Warning,
            kind,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::Unresolved(err) => write!(f, "{err}"),
            DiagnosticKind::NoHandlers { task_queue } => write!(
                f,
                "domain '{}' registers no handlers on '{task_queue}'",
                self.domain
            ),
            DiagnosticKind::NoActivities { task_queue } => write!(
                f,
                "domain '{}' registers no activities on '{task_queue}'",
                self.domain
            ),
            DiagnosticKind::DuplicateHandler {
                task_queue,
                kind,
                handler,
            } => write!(
                f,
                "{} contributes {kind} '{handler}' to '{task_queue}' which already has it; registering it once",
                self.domain
            ),
            DiagnosticKind::ConflictingHandler {
                task_queue,
                kind,
                handler,
            } => write!(
                f,
                "{} contributes a different {kind} named '{handler}' to '{task_queue}'; the name is left unregistered",
                self.domain
            ),
        }
    }
}

/// LoadDomains の結果
#[derive(Debug, Default)]
pub struct LoadReport {
    pub bundles: QueueBundles,
    /// 入力順
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadReport {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// DomainRegistry は DomainCatalog と WorkflowRoutes を使ってドメインを読み込む
pub struct DomainRegistry<'a> {
    catalog: &'a DomainCatalog,
    routes: &'a WorkflowRoutes,
}

impl<'a> DomainRegistry<'a> {
    pub fn new(catalog: &'a DomainCatalog, routes: &'a WorkflowRoutes) -> Self {
        Self { catalog, routes }
    }

    pub fn load<S: AsRef<str>>(&self, identifiers: &[S], config: &WorkerConfig) -> LoadReport {
        let mut bundles = QueueBundles::new();
        let mut diagnostics = Vec::new();
        let mut claimed = BTreeSet::new();

        for identifier in identifiers {
            let identifier = identifier.as_ref().trim();
            if identifier.is_empty() {
                continue;
            }

            let resolved = self
                .catalog
                .resolve(identifier, config)
                .and_then(|descriptor| descriptor.validate().map(|queue| (descriptor, queue)));
            let (descriptor, task_queue) = match resolved {
                Ok(resolved) => resolved,
                Err(err) => {
                    error!(domain = identifier, error = %err, "skipping domain");
                    diagnostics.push(Diagnostic::error(identifier, DiagnosticKind::Unresolved(err)));
                    continue;
                }
            };
            claimed.insert(task_queue.clone());

            let (activities, workflows) = (descriptor.activities(), descriptor.workflows());
            if activities.is_empty() && workflows.is_empty() {
                warn!(domain = identifier, %task_queue, "domain has no handlers");
                diagnostics.push(Diagnostic::warning(
                    identifier,
                    DiagnosticKind::NoHandlers { task_queue },
                ));
                continue;
            }
            if activities.is_empty() {
                warn!(domain = identifier, %task_queue, "domain has no activities");
                diagnostics.push(Diagnostic::warning(
                    identifier,
                    DiagnosticKind::NoActivities {
                        task_queue: task_queue.clone(),
                    },
                ));
            }

            let bundle = bundles.entry(&task_queue);
            for activity in activities {
                let merged = bundle.add_activity(activity.clone());
                diagnostics.extend(merge_diagnostic(
                    merged,
                    identifier,
                    &task_queue,
                    HandlerKind::Activity,
                    activity.name(),
                ));
            }
            for workflow in workflows {
                let merged = bundle.add_workflow(workflow.clone());
                diagnostics.extend(merge_diagnostic(
                    merged,
                    identifier,
                    &task_queue,
                    HandlerKind::Workflow,
                    workflow.name(),
                ));
            }
            info!(
                domain = identifier,
                %task_queue,
                activities = activities.len(),
                workflows = workflows.len(),
                "domain loaded"
            );
        }

        for (task_queue, workflow) in self.routes.iter() {
            if !claimed.contains(task_queue) {
                debug!(
                    %task_queue,
                    workflow = workflow.name(),
                    "no enabled domain claims the routed queue; skipping workflow"
                );
                continue;
            }
            let merged = bundles.entry(task_queue).add_workflow(workflow.clone());
            diagnostics.extend(merge_diagnostic(
                merged,
                ROUTES_SOURCE,
                task_queue,
                HandlerKind::Workflow,
                workflow.name(),
            ));
        }

        bundles.retain_non_empty();
        LoadReport {
            bundles,
            diagnostics,
        }
    }
}

fn merge_diagnostic(
    merged: Merge,
    domain: &str,
    task_queue: &TaskQueue,
    kind: HandlerKind,
    handler: &str,
) -> Option<Diagnostic> {
    let (task_queue, handler) = (task_queue.clone(), handler.to_string());
    match merged {
        Merge::Added => None,
        Merge::AlreadyPresent => {
            warn!(domain, %task_queue, %kind, handler = %handler, "duplicate handler name; registering it once");
            Some(Diagnostic::warning(
                domain,
                DiagnosticKind::DuplicateHandler {
                    task_queue,
                    kind,
                    handler,
                },
            ))
        }
        Merge::Conflict => {
            error!(domain, %task_queue, %kind, handler = %handler, "conflicting handler implementations; dropping the name");
            Some(Diagnostic::error(
                domain,
                DiagnosticKind::ConflictingHandler {
                    task_queue,
                    kind,
                    handler,
                },
            ))
        }
    }
}
