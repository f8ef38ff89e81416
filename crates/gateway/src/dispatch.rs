use std::sync::Arc;

use {
    async_trait::async_trait,
    tracing::{debug, info},
};

use {
    patchbay_protocol::Request,
    patchbay_routing::RouteTable,
    patchbay_workflow::{Run, RunContext, RunStatus, WorkflowEngine},
};

use crate::{present::PresentJob, signal::DispatchSignal, state::GatewayState};

/// What became of one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A workflow run was started; its outcome will reach the presenter.
    Launched,
    /// A route matched but the workflow is not ready. The run stays inert
    /// and never produces an outcome.
    Inert,
    /// No route matched. An `unknown` signal fired; the client gets nothing.
    Unmatched,
}

/// Decides what happens to a parsed request.
///
/// The gateway hands every request on a connection to exactly one router,
/// injected at construction. [`TableRouter`] is the standard table-driven
/// implementation; substituting another replaces matching and dispatch
/// wholesale.
#[async_trait]
pub trait MessageRouter: Send + Sync {
    async fn dispatch(
        &self,
        request: Request,
        conn_id: &str,
        state: &Arc<GatewayState>,
    ) -> DispatchOutcome;
}

/// Table-driven router: the first pattern matching the request's route wins,
/// and its workflow template is instantiated into a fresh run.
pub struct TableRouter {
    table: RouteTable,
    engine: Arc<dyn WorkflowEngine>,
}

impl TableRouter {
    pub fn new(table: RouteTable, engine: Arc<dyn WorkflowEngine>) -> Self {
        Self { table, engine }
    }
}

#[async_trait]
impl MessageRouter for TableRouter {
    async fn dispatch(
        &self,
        request: Request,
        conn_id: &str,
        state: &Arc<GatewayState>,
    ) -> DispatchOutcome {
        let Some(binding) = self.table.first_match(&request.route) else {
            debug!(conn_id = %conn_id, route = %request.route, "dispatch: no route matched");
            state.emit(DispatchSignal::Unknown {
                route: request.route,
                conn_id: conn_id.to_string(),
            });
            return DispatchOutcome::Unmatched;
        };

        debug!(
            conn_id = %conn_id,
            route = %request.route,
            pattern = %binding.pattern,
            "dispatch: route matched"
        );
        state.emit(DispatchSignal::Matched {
            route: request.route.clone(),
            conn_id: conn_id.to_string(),
        });

        // Each run gets its own template copy; concurrent runs off the same
        // binding share nothing mutable.
        let ctx = RunContext {
            route: request.route,
            data: request.data,
            conn_id: conn_id.to_string(),
        };
        let mut run = Run::new(&binding.workflow, ctx);

        if !self.engine.ready(&run.template) {
            run.status = RunStatus::Inert;
            info!(
                run_id = %run.id,
                route = %run.ctx.route,
                "dispatch: workflow not ready; run left inert"
            );
            return DispatchOutcome::Inert;
        }

        // Execution happens off this task; the connection's read loop moves
        // on to its next message immediately.
        let engine = Arc::clone(&self.engine);
        let state = Arc::clone(state);
        tokio::spawn(async move {
            let outcome = engine.execute(&mut run).await;
            state.enqueue_presentation(PresentJob {
                presenter: binding.presenter.clone(),
                ctx: run.ctx,
                outcome,
            });
        });
        DispatchOutcome::Launched
    }
}
