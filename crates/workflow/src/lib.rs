//! Workflow templates, isolated runs, and the execution engine seam.
//!
//! A [`WorkflowTemplate`] is an immutable definition owned by configuration.
//! Dispatching a message clones the matched template into a [`Run`] bound to
//! the triggering request and connection, then hands the run to a
//! [`WorkflowEngine`], which drives it to a single terminal [`RunOutcome`].
//! [`TaskEngine`] is the built-in engine: templates list tasks executed in
//! order against the run's output state.

pub mod engine;
pub mod run;
pub mod template;

pub use engine::{TaskEngine, TaskFn, TaskInput, TaskResult, WorkflowEngine};
pub use run::{Run, RunContext, RunOutcome, RunStatus};
pub use template::{TaskSpec, WorkflowTemplate};
