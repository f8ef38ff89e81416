use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::template::WorkflowTemplate;

/// What a run is bound to: the request that triggered it and the connection
/// it arrived on.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub route: String,
    pub data: Value,
    pub conn_id: String,
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Created,
    Running,
    /// Failed the readiness precondition. A dead end: no outcome ever.
    Inert,
    Completed,
    Failed,
}

/// Terminal result of a run. Produced at most once, by a single return from
/// the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Value),
    Failed(Value),
}

impl RunOutcome {
    /// The context presenter templates interpolate against: the request plus
    /// the run's produced value under `output` (or `error` on failure).
    #[must_use]
    pub fn present_context(&self, ctx: &RunContext) -> Value {
        match self {
            Self::Completed(output) => json!({
                "route": ctx.route,
                "data": ctx.data,
                "output": output,
            }),
            Self::Failed(error) => json!({
                "route": ctx.route,
                "data": ctx.data,
                "error": error,
            }),
        }
    }
}

/// One isolated execution of a [`WorkflowTemplate`].
///
/// Construction clones the template, so the definition and any concurrent
/// runs are untouched by whatever this run does to its own state.
#[derive(Debug)]
pub struct Run {
    pub id: Uuid,
    pub template: WorkflowTemplate,
    pub ctx: RunContext,
    pub status: RunStatus,
    /// State tasks build up; becomes the completed value.
    pub output: Value,
}

impl Run {
    #[must_use]
    pub fn new(template: &WorkflowTemplate, ctx: RunContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            template: template.clone(),
            ctx,
            status: RunStatus::Created,
            output: Value::Object(Map::new()),
        }
    }

    /// Snapshot of the interpolation context tasks see: `route` and `data`
    /// from the request, `output` as built up so far.
    #[must_use]
    pub fn task_context(&self) -> Value {
        json!({
            "route": self.ctx.route,
            "data": self.ctx.data,
            "output": self.output,
        })
    }

    /// Fold one task's produced value into the run output.
    ///
    /// Objects merge key by key, `null` is a no-op, anything else replaces
    /// the output wholesale.
    pub fn merge_output(&mut self, patch: Value) {
        match patch {
            Value::Null => {},
            Value::Object(entries) => {
                if let Value::Object(output) = &mut self.output {
                    for (key, value) in entries {
                        output.insert(key, value);
                    }
                } else {
                    self.output = Value::Object(entries);
                }
            },
            other => self.output = other,
        }
    }
}
