use std::sync::Arc;

use {
    tokio::sync::mpsc,
    tracing::{debug, warn},
};

use {
    patchbay_common::interp,
    patchbay_config::PresenterSpec,
    patchbay_protocol::{NO_MESSAGE_REPLY, compose},
    patchbay_workflow::{RunContext, RunOutcome},
};

use crate::state::GatewayState;

/// A terminal run queued for presentation.
pub struct PresentJob {
    pub presenter: Option<PresenterSpec>,
    pub ctx: RunContext,
    pub outcome: RunOutcome,
}

/// Drain the completion queue until every sender is gone.
///
/// One loop serves the whole gateway. Jobs are presented one at a time, so
/// a broadcast finishes delivering before the next outcome is rendered.
pub async fn run_presenter(
    state: Arc<GatewayState>,
    mut jobs: mpsc::UnboundedReceiver<PresentJob>,
) {
    while let Some(job) = jobs.recv().await {
        present(&state, job).await;
    }
    debug!("presenter: completion queue closed");
}

/// Render one terminal run and deliver the result.
///
/// A run without a presenter produces nothing, whatever its outcome. A
/// failed run, or any render failure, degrades to the fixed error line sent
/// only to the originating connection.
async fn present(state: &Arc<GatewayState>, job: PresentJob) {
    let Some(spec) = &job.presenter else {
        debug!(route = %job.ctx.route, "presenter: no presenter bound; outcome dropped");
        return;
    };

    match render_line(spec, &job.outcome, &job.ctx) {
        Ok(line) => {
            if spec.broadcast {
                let senders = state.sender_snapshot().await;
                debug!(
                    route = %job.ctx.route,
                    clients = senders.len(),
                    "presenter: broadcasting"
                );
                for sender in senders {
                    let _ = sender.send(line.clone());
                }
            } else if !state.send_to(&job.ctx.conn_id, &line).await {
                debug!(conn_id = %job.ctx.conn_id, "presenter: originator gone; line dropped");
            }
        },
        Err(reason) => {
            warn!(
                route = %job.ctx.route,
                conn_id = %job.ctx.conn_id,
                reason = %reason,
                "presenter: degrading to the error reply"
            );
            if !state.send_to(&job.ctx.conn_id, NO_MESSAGE_REPLY).await {
                debug!(conn_id = %job.ctx.conn_id, "presenter: originator gone; error reply dropped");
            }
        },
    }
}

/// Render the outbound line for a completed run.
///
/// Any failure, including the run itself having failed, is an `Err` carrying
/// the reason; the caller degrades to the fixed error reply.
fn render_line(
    spec: &PresenterSpec,
    outcome: &RunOutcome,
    ctx: &RunContext,
) -> Result<String, String> {
    let RunOutcome::Completed(_) = outcome else {
        return Err("run failed".into());
    };
    let render_ctx = outcome.present_context(ctx);

    // A header without tokens is used verbatim, stray braces and all.
    let header = if interp::tokens(&spec.header).is_empty() {
        spec.header.clone()
    } else {
        interp::render_text(&spec.header, &render_ctx).map_err(|e| e.to_string())?
    };

    let vars = interp::render_deep(&spec.vars, &render_ctx).map_err(|e| e.to_string())?;
    Ok(compose(&header, &vars))
}
