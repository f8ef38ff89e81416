use std::{collections::HashMap, future::Future, pin::Pin, time::Duration};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use patchbay_common::interp;

use crate::{
    run::{Run, RunOutcome, RunStatus},
    template::WorkflowTemplate,
};

// ── Types ────────────────────────────────────────────────────────────────────

/// Parameters and interpolation context handed to one task invocation.
pub struct TaskInput {
    /// The task's params as written in the template, not yet interpolated.
    pub params: Map<String, Value>,
    /// `{route, data, output}` snapshot for `{$path}` tokens in params.
    pub ctx: Value,
}

/// What a task produces: a value folded into the run's output (objects merge,
/// `null` is a no-op), or a failure payload that ends the run.
pub type TaskResult = Result<Value, Value>;

/// A boxed async task implementation.
pub type TaskFn =
    Box<dyn Fn(TaskInput) -> Pin<Box<dyn Future<Output = TaskResult> + Send>> + Send + Sync>;

// ── Engine seam ──────────────────────────────────────────────────────────────

/// The execution seam the dispatcher depends on.
///
/// `ready` is the precondition checked before a run is started; a run whose
/// template is not ready stays inert and never produces an outcome.
/// `execute` drives a run to its single terminal outcome.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    fn ready(&self, template: &WorkflowTemplate) -> bool;
    async fn execute(&self, run: &mut Run) -> RunOutcome;
}

// ── Task registry engine ─────────────────────────────────────────────────────

/// Built-in engine: runs a template's task list in order through a registry
/// of task kinds. A template is ready when every kind it names is registered.
pub struct TaskEngine {
    tasks: HashMap<String, TaskFn>,
}

impl Default for TaskEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskEngine {
    pub fn new() -> Self {
        let mut engine = Self {
            tasks: HashMap::new(),
        };
        engine.register_builtins();
        engine
    }

    pub fn register(&mut self, kind: impl Into<String>, task: TaskFn) {
        self.tasks.insert(kind.into(), task);
    }

    pub fn task_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<_> = self.tasks.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    fn register_builtins(&mut self) {
        // set: interpolate params and fold them into the output
        self.register(
            "set",
            Box::new(|input| {
                Box::pin(async move {
                    interp::render_deep(&Value::Object(input.params), &input.ctx)
                        .map_err(|e| json!({ "message": e.to_string() }))
                })
            }),
        );

        // delay: suspend for `ms` milliseconds
        self.register(
            "delay",
            Box::new(|input| {
                Box::pin(async move {
                    let ms = input.params.get("ms").and_then(Value::as_u64).unwrap_or(0);
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(Value::Null)
                })
            }),
        );

        // fail: end the run as failed with `message`
        self.register(
            "fail",
            Box::new(|input| {
                Box::pin(async move {
                    let message = input
                        .params
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("task failed");
                    Err(json!({ "message": message }))
                })
            }),
        );
    }
}

#[async_trait]
impl WorkflowEngine for TaskEngine {
    fn ready(&self, template: &WorkflowTemplate) -> bool {
        template
            .tasks
            .iter()
            .all(|spec| self.tasks.contains_key(&spec.kind))
    }

    async fn execute(&self, run: &mut Run) -> RunOutcome {
        run.status = RunStatus::Running;
        let specs = run.template.tasks.clone();

        for spec in &specs {
            let Some(task) = self.tasks.get(&spec.kind) else {
                // Reachable only when execute is called without the ready gate.
                warn!(run_id = %run.id, kind = %spec.kind, "unknown task kind");
                run.status = RunStatus::Failed;
                return RunOutcome::Failed(json!({
                    "message": format!("unknown task kind: {}", spec.kind),
                }));
            };

            let input = TaskInput {
                params: spec.params.clone(),
                ctx: run.task_context(),
            };
            match task(input).await {
                Ok(patch) => run.merge_output(patch),
                Err(error) => {
                    debug!(run_id = %run.id, kind = %spec.kind, "task failed");
                    run.status = RunStatus::Failed;
                    return RunOutcome::Failed(error);
                },
            }
        }

        run.status = RunStatus::Completed;
        RunOutcome::Completed(run.output.clone())
    }
}
