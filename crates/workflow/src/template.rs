use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An immutable workflow definition owned by configuration.
///
/// Cloning a template is a deep structural copy. A run mutates only its own
/// copy's state, so concurrent runs of the same definition share nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    /// Display name used in logs. Empty means unnamed.
    #[serde(default)]
    pub name: String,
    /// Tasks executed in order by the engine. An empty list completes
    /// immediately.
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Task kind, resolved against the engine's registry.
    pub kind: String,
    /// Kind-specific parameters. String values may carry `{$path}` tokens,
    /// interpolated against the run context at execution time.
    #[serde(default)]
    pub params: Map<String, Value>,
}
