use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{env_subst::substitute_env, schema::PatchbayConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "patchbay.toml",
    "patchbay.yaml",
    "patchbay.yml",
    "patchbay.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<PatchbayConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./patchbay.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/patchbay/patchbay.{toml,yaml,yml,json}` (user-global)
///
/// Returns `PatchbayConfig::default()` if no config file is found; command
/// line flags can still supply the required server settings. A file that
/// exists but fails to parse is an error, never silently skipped.
pub fn discover_and_load() -> anyhow::Result<PatchbayConfig> {
    match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)
        },
        None => {
            debug!("no config file found, using defaults");
            Ok(PatchbayConfig::default())
        },
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/patchbay/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "patchbay") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/patchbay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "patchbay").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<PatchbayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Write;

    use super::*;

    fn write_config(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "patchbay.toml",
            r#"
[server]
bind = "0.0.0.0"
port = 7331

[[routes]]
pattern = "echo"
presenter = { header = "echo", vars = "{$data}" }
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0");
        assert_eq!(cfg.server.port, Some(7331));
        assert_eq!(cfg.routes.len(), 1);
    }

    #[test]
    fn loads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "patchbay.yaml",
            r"
server:
  port: 7331
routes:
  - pattern: echo
    presenter:
      header: echo
      vars: '{$data}'
",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, Some(7331));
        assert_eq!(cfg.routes[0].pattern, "echo");
    }

    #[test]
    fn loads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "patchbay.json",
            r#"{"server": {"port": 7331}, "routes": []}"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, Some(7331));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "patchbay.toml", "routes = 3");
        assert!(load_config(&path).is_err());
    }
}
