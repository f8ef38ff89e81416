//! Default configuration template with the options documented.
//!
//! Written out by `patchbay init` when creating a new config file, so users
//! can see everything that can be configured without consulting the docs.

/// Generate the default config template with a specific port.
pub fn default_config_template(port: u16) -> String {
    format!(
        r##"# Patchbay Configuration
# ======================
# All available options, with defaults where they exist. Uncomment and adjust
# as needed. Changes require a restart to take effect.
#
# Environment variable substitution is supported in string values: ${{ENV_VAR}}
# Example: cert_path = "${{PATCHBAY_CERT}}"

# ══════════════════════════════════════════════════════════════════════════════
# SERVER
# ══════════════════════════════════════════════════════════════════════════════

[server]
bind = "127.0.0.1"                # Address to bind to ("0.0.0.0" for all interfaces)
port = {port}                           # Port to listen on (required)

# ── TLS ───────────────────────────────────────────────────────────────────────
# The gateway serves plain ws:// unless both halves of a PEM key pair are set.

# [server.tls]
# cert_path = "/path/to/cert.pem" # Certificate chain
# key_path = "/path/to/key.pem"   # Private key

# ══════════════════════════════════════════════════════════════════════════════
# ROUTES
# ══════════════════════════════════════════════════════════════════════════════
# Inbound frames look like `route:payload`. The route is matched against each
# pattern below in order and the first match wins, so put specific patterns
# before catch-alls. Patterns are anchored regular expressions: "chat/send"
# matches exactly that route, "chat/.*" matches everything under chat/.
#
# Workflow tasks run in order. Builtin kinds:
#   set   - interpolate params and fold them into the run's output
#   delay - suspend for params.ms milliseconds
#   fail  - end the run as failed with params.message
#
# `{{$path}}` tokens in task params and presenter templates resolve against
# the run's context: route, data, and output (error for failed runs).

# Echo the payload's text back to the sender.
[[routes]]
pattern = "chat/send"

[routes.workflow]
name = "relay"

[[routes.workflow.tasks]]
kind = "set"
params = {{ text = "{{$data.text}}" }}

[routes.presenter]
header = "chat/send"              # Used verbatim when it has no {{$path}} tokens
vars = "{{$output.text}}"
broadcast = false                 # true = deliver to every live connection

# A silent route: without a presenter the workflow runs and nothing is sent.
# [[routes]]
# pattern = "audit/.*"
#
# [routes.workflow]
# name = "audit"
#
# [[routes.workflow.tasks]]
# kind = "delay"
# params = {{ ms = 100 }}
"##
    )
}
