//! Variable System (C5): merges defaults, auto-loaded var files, explicit
//! var files, and CLI overrides into one resolved `{name → Value}` table,
//! per §4.5.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::expr::{self, EvalContext};
use crate::schema::VariableBlock;
use crate::types::{self, Type};
use crate::value::Value;

/// The three fixed auto-loaded file names/patterns, checked in this order in
/// the configuration's base directory (§4.5): `hostcfg.vars.hcl`,
/// `hostcfg.vars.hcl.local`, then every `*.auto.vars.hcl` lexically sorted.
pub fn auto_load_paths(base_dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for fixed in ["hostcfg.vars.hcl", "hostcfg.vars.hcl.local"] {
        let p = base_dir.join(fixed);
        if p.is_file() {
            paths.push(p);
        }
    }

    let mut autos: Vec<PathBuf> = std::fs::read_dir(base_dir)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".auto.vars.hcl"))
        })
        .collect();
    autos.sort();
    paths.extend(autos);
    paths
}

/// Parses and evaluates a flat var file (`NAME = EXPR` assignments, no
/// blocks) in an empty context: no `var`/`fact`/resource references, only
/// function calls are permitted (§4.5).
pub fn load_var_file(path: &Path) -> Result<BTreeMap<String, Value>, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let body: hcl::Body = hcl::from_str(&text).map_err(|e| ConfigError::Parse {
        file: path.display().to_string(),
        message: e.to_string(),
    })?;

    let ctx = EvalContext::empty();
    let mut out = BTreeMap::new();
    for structure in body.into_iter() {
        let attr = match structure {
            hcl::Structure::Attribute(attr) => attr,
            hcl::Structure::Block(block) => {
                return Err(ConfigError::Parse {
                    file: path.display().to_string(),
                    message: format!(
                        "var file may only contain attribute assignments, found block `{}`",
                        block.identifier()
                    ),
                })
            }
        };
        let value = expr::eval_expr(attr.expr(), &ctx)?;
        out.insert(attr.key().to_string(), value);
    }
    Ok(out)
}

/// Parses one `-e NAME=VALUE` CLI argument. Missing `=` fails with a
/// "malformed variable" error (§4.5).
pub fn parse_cli_assignment(raw: &str) -> Result<(String, String), ConfigError> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(ConfigError::MalformedVariable(raw.to_string())),
    }
}

/// Resolves a variable's declared type constraint: `Type::Dynamic` when no
/// `type` attribute is present, the bare-identifier shorthand, or the
/// call-form expression (§4.2/§9).
pub fn resolve_declared_type(decl: &VariableBlock) -> Result<Type, ConfigError> {
    match &decl.type_expr {
        None => Ok(Type::Dynamic),
        Some(expr) => expr::parse_type_expr(expr),
    }
}

/// Merges every source into the final `{name → Value}` table per the
/// precedence in §4.5 (highest wins): CLI `-e` > explicit `--var-file`s (in
/// listed order) > auto-loaded files (in defined order) > `default`.
///
/// `file_assignments` is the merged result of applying auto-loaded files then
/// explicit `--var-file`s, each layer overwriting same-named entries from the
/// previous one, left to the caller (`load_var_file` per path, merged in
/// order) so this function stays a pure fold over already-resolved layers.
pub fn resolve(
    declared: &[VariableBlock],
    file_assignments: &BTreeMap<String, Value>,
    cli_assignments: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, Value>, ConfigError> {
    let mut resolved = BTreeMap::new();

    for decl in declared {
        let ty = resolve_declared_type(decl)?;

        let value = if let Some(raw) = cli_assignments.get(&decl.name) {
            types::coerce_string_from_cli(raw, &ty)?
        } else if let Some(v) = file_assignments.get(&decl.name) {
            types::convert(v, &ty)?
        } else if let Some(default_expr) = &decl.default_expr {
            let default = expr::eval_expr(default_expr, &EvalContext::empty())?;
            types::convert(&default, &ty)?
        } else {
            return Err(ConfigError::MissingAttribute {
                block: format!("variable \"{}\"", decl.name),
                attribute: "default".to_string(),
            });
        };

        resolved.insert(decl.name.clone(), value);
    }

    Ok(resolved)
}

/// Merges a sequence of var-file layers, later paths overriding earlier ones
/// on a per-key basis, as required for both the auto-loaded ordering and the
/// explicit `--var-file` ordering in §4.5.
pub fn merge_layers(layers: impl IntoIterator<Item = BTreeMap<String, Value>>) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    for layer in layers {
        out.extend(layer);
    }
    out
}

/// Builds the final CLI-assignment map from a sequence of raw `-e` strings,
/// later assignments to the same name overriding earlier ones.
pub fn merge_cli_assignments(
    raws: impl IntoIterator<Item = impl AsRef<str>>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut out = BTreeMap::new();
    for raw in raws {
        let (name, value) = parse_cli_assignment(raw.as_ref())?;
        out.insert(name, value);
    }
    Ok(out)
}
