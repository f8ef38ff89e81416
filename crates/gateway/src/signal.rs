use std::net::SocketAddr;

/// Lifecycle signals emitted by the gateway for external observers.
///
/// Signals are advisory. They carry no reply semantics and are dropped
/// when nobody is subscribed.
#[derive(Debug, Clone)]
pub enum DispatchSignal {
    /// The listener is bound and accepting connections.
    Ready { addr: SocketAddr },
    /// An inbound request matched a route.
    Matched { route: String, conn_id: String },
    /// An inbound request matched no route. The client gets no reply.
    Unknown { route: String, conn_id: String },
}
