//! Configuration validation.
//!
//! Validates configuration files against the known schema, detects
//! unknown/misspelled fields, and reports semantic problems (a missing
//! port, a half-configured TLS key pair, unreachable routes) before the
//! gateway starts accepting connections.

use std::{collections::HashMap, path::Path};

use crate::schema::PatchbayConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "required",
    /// "routes", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "server.bnd" or "routes[1].pattern"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Represents the expected shape of the configuration schema.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// A map with free-form keys (task params, presenter vars).
    Map(Box<KnownKeys>),
    /// An array of typed items.
    Array(Box<KnownKeys>),
    /// Scalar or free-form value; recursion stops here.
    Leaf,
}

/// Build the schema map mirroring every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Array, Leaf, Map, Struct};

    let tls = || {
        Struct(HashMap::from([
            ("cert_path", Leaf),
            ("key_path", Leaf),
        ]))
    };

    let task = || {
        Struct(HashMap::from([
            ("kind", Leaf),
            ("params", Map(Box::new(Leaf))),
        ]))
    };

    let workflow = || {
        Struct(HashMap::from([
            ("name", Leaf),
            ("tasks", Array(Box::new(task()))),
        ]))
    };

    let presenter = || {
        Struct(HashMap::from([
            ("header", Leaf),
            ("vars", Leaf),
            ("broadcast", Leaf),
        ]))
    };

    let route = || {
        Struct(HashMap::from([
            ("pattern", Leaf),
            ("workflow", workflow()),
            ("presenter", presenter()),
        ]))
    };

    Struct(HashMap::from([
        (
            "server",
            Struct(HashMap::from([
                ("bind", Leaf),
                ("port", Leaf),
                ("tls", tls()),
            ])),
        ),
        ("routes", Array(Box::new(route()))),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, &ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Find the best match for `needle` among `candidates` using Levenshtein
/// distance. Returns `Some(best)` if the distance is <= `max_distance`.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (candidate, levenshtein(needle, candidate)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(candidate, _)| candidate)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = if let Some(p) = path {
        Some(p.to_path_buf())
    } else {
        crate::loader::find_config_file()
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let is_toml = actual_path
        .extension()
        .and_then(|e| e.to_str())
        .is_none_or(|ext| ext == "toml");

    let mut result = if is_toml {
        match std::fs::read_to_string(actual_path) {
            Ok(content) => validate_toml_str(&content),
            Err(e) => ValidationResult {
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    category: "syntax",
                    path: String::new(),
                    message: format!("failed to read config file: {e}"),
                }],
                config_path: None,
            },
        }
    } else {
        // YAML/JSON get type and semantic checks only; the unknown-field
        // walk covers the TOML path.
        match crate::loader::load_config(actual_path) {
            Ok(config) => {
                let mut diagnostics = Vec::new();
                check_semantics(&config, &mut diagnostics);
                ValidationResult {
                    diagnostics,
                    config_path: None,
                }
            },
            Err(e) => ValidationResult {
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    category: "type-error",
                    path: String::new(),
                    message: format!("{e}"),
                }],
                config_path: None,
            },
        }
    };

    result.config_path = Some(actual_path.clone());
    if let Ok(config) = crate::loader::load_config(actual_path) {
        check_file_references(&config, &mut result.diagnostics);
    }
    result
}

/// Validate a TOML string without file-system side effects (useful for tests
/// and the `check` command).
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Syntax: parse raw TOML
    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    // 2. Unknown fields: walk the TOML tree against KnownKeys
    let schema = build_schema_map();
    check_unknown_fields(&toml_value, &schema, "", &mut diagnostics);

    // 3. Type check: attempt full deserialization
    match toml::from_str::<PatchbayConfig>(toml_str) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Walk the TOML value tree against the schema tree and flag unknown keys.
fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (value, schema) {
        (toml::Value::Table(table), KnownKeys::Struct(fields)) => {
            let known_keys: Vec<&str> = fields.keys().copied().collect();
            for (key, child_value) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child_value, child_schema, &path, diagnostics);
                } else {
                    let level = if prefix.is_empty() {
                        "at top level "
                    } else {
                        ""
                    };
                    let suggestion = suggest(key, &known_keys, 3);
                    let msg = if let Some(s) = suggestion {
                        format!("unknown field {level}(did you mean \"{s}\"?)")
                    } else {
                        format!("unknown field {level}")
                    };
                    diagnostics.push(Diagnostic {
                        severity: Severity::Error,
                        category: "unknown-field",
                        path,
                        message: msg.trim().to_string(),
                    });
                }
            }
        },
        (toml::Value::Table(table), KnownKeys::Map(value_schema)) => {
            for (key, child_value) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                check_unknown_fields(child_value, value_schema, &path, diagnostics);
            }
        },
        (toml::Value::Array(arr), KnownKeys::Array(item_schema)) => {
            for (i, item) in arr.iter().enumerate() {
                let path = format!("{prefix}[{i}]");
                check_unknown_fields(item, item_schema, &path, diagnostics);
            }
        },
        // Leaf or type mismatch; recursion stops (type errors caught later)
        _ => {},
    }
}

/// Run semantic checks on a successfully parsed config.
fn check_semantics(config: &PatchbayConfig, diagnostics: &mut Vec<Diagnostic>) {
    // The port has no usable default; serving requires one.
    if config.server.port.is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "required",
            path: "server.port".into(),
            message: "server.port is required (set it in the config file or pass --port)".into(),
        });
    }

    // TLS cert without key or vice versa
    let has_cert = config.server.tls.cert_path.is_some();
    let has_key = config.server.tls.key_path.is_some();
    if has_cert && !has_key {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "required",
            path: "server.tls".into(),
            message: "server.tls.cert_path is set but server.tls.key_path is missing".into(),
        });
    }
    if has_key && !has_cert {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "required",
            path: "server.tls".into(),
            message: "server.tls.key_path is set but server.tls.cert_path is missing".into(),
        });
    }

    if config.routes.is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "routes",
            path: "routes".into(),
            message: "no routes configured; every message will go unmatched".into(),
        });
    }

    for (idx, route) in config.routes.iter().enumerate() {
        if route.pattern.is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "routes",
                path: format!("routes[{idx}].pattern"),
                message: "pattern must not be empty".into(),
            });
        }

        if let Some(presenter) = &route.presenter
            && presenter.header.is_empty()
        {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "routes",
                path: format!("routes[{idx}].presenter.header"),
                message: "presenter.header is empty; replies will start with \":\"".into(),
            });
        }

        // First match wins, so an exact duplicate can never be reached.
        if let Some(first) = config
            .routes
            .iter()
            .position(|r| r.pattern == route.pattern)
            && first < idx
        {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "routes",
                path: format!("routes[{idx}].pattern"),
                message: format!(
                    "duplicate of routes[{first}].pattern; this entry is unreachable"
                ),
            });
        }
    }
}

/// Check that file paths referenced in TLS config exist on disk.
fn check_file_references(config: &PatchbayConfig, diagnostics: &mut Vec<Diagnostic>) {
    let file_refs: &[(&str, &Option<String>)] = &[
        ("server.tls.cert_path", &config.server.tls.cert_path),
        ("server.tls.key_path", &config.server.tls.key_path),
    ];

    for (path_name, value) in file_refs {
        if let Some(file_path) = value {
            let p = Path::new(file_path);
            if !p.exists() {
                diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    category: "file-ref",
                    path: (*path_name).into(),
                    message: format!("file not found: {file_path}"),
                });
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
