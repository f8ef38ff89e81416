//! Gateway: WebSocket server, request dispatch, outcome presentation.
//!
//! Lifecycle:
//! 1. Load + validate config
//! 2. Compile the route table
//! 3. Bind the listener (TLS when configured)
//! 4. Attach the WebSocket upgrade handler
//! 5. Drain terminal runs through the presenter loop
//!
//! Workflow execution lives in `patchbay-workflow` and is reached through
//! the `MessageRouter` seam in `dispatch`; injecting a custom router
//! replaces matching and dispatch wholesale.

pub mod dispatch;
pub mod present;
pub mod server;
pub mod signal;
pub mod state;
pub mod ws;
