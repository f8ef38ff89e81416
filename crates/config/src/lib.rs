//! Configuration loading, validation, and env substitution.
//!
//! Config files: `patchbay.toml`, `patchbay.yaml`, or `patchbay.json`,
//! searched in `./` then `~/.config/patchbay/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{PatchbayConfig, PresenterSpec, RouteConfig, ServerConfig, TlsConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
