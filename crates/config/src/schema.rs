/// Config schema types: server binding, TLS, and the ordered route table.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use patchbay_workflow::WorkflowTemplate;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchbayConfig {
    pub server: ServerConfig,
    /// Ordered route table. Must deserialize as a sequence; the first entry
    /// whose pattern matches a request wins.
    pub routes: Vec<RouteConfig>,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on. Required; startup refuses to serve without one.
    pub port: Option<u16>,
    pub tls: TlsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: None,
            tls: TlsConfig::default(),
        }
    }
}

/// TLS termination for the transport. Plain TCP when no key pair is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// PEM certificate chain path.
    pub cert_path: Option<String>,
    /// PEM private key path.
    pub key_path: Option<String>,
}

impl TlsConfig {
    /// True when both halves of the key pair are configured.
    #[must_use]
    pub fn configured(&self) -> bool {
        self.cert_path.is_some() && self.key_path.is_some()
    }
}

/// One entry of the route table: a pattern, the workflow it triggers, and
/// how terminal outcomes are presented.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Pattern matched against the full route string of each request.
    pub pattern: String,
    /// Workflow definition cloned into a fresh run per matched message.
    #[serde(default)]
    pub workflow: WorkflowTemplate,
    /// Rendering and delivery of outcomes. `None` means the workflow runs
    /// silently and nothing is sent back.
    #[serde(default)]
    pub presenter: Option<PresenterSpec>,
}

/// Rendering and delivery of a terminal run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterSpec {
    /// Outbound header template. Without `{$path}` tokens it is sent
    /// verbatim, braces and all.
    pub header: String,
    /// Vars template, rendered against the run's result context and
    /// JSON-encoded after the header. Strings interpolate; structured
    /// values keep their shape with templated strings substituted.
    pub vars: Value,
    /// Deliver to every live connection instead of just the originator.
    pub broadcast: bool,
}
