//! Role Loader (C9): loads a role directory as a scoped bundle of resources,
//! per §4.9.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, RoleError};
use crate::expr::{self, EvalContext};
use crate::schema::{self, ResourceBlock, RoleBlock, TopLevelBlock, VariableBlock};
use crate::types::Type;
use crate::value::Value;
use crate::variables;

/// A loaded role: flat, name-prefixed resources ready for the registry,
/// plus the role's own `depends_on` (§3 "Role").
#[derive(Debug)]
pub struct Role {
    pub name: String,
    pub source_path: PathBuf,
    pub resources: Vec<ResourceBlock>,
    pub depends_on: Vec<String>,
}

impl Role {
    /// Every resource id this role contributes, used to expand `role.<R>`
    /// dependency entries at graph-build time (§4.8).
    pub fn member_ids(&self) -> Vec<String> {
        self.resources.iter().map(ResourceBlock::id).collect()
    }
}

/// Loads the role directory named by `block.source`, resolved relative to
/// `config_base_dir`. The `fact` namespace is global and unaffected by role
/// loading — only `var` and the effective base directory are role-scoped.
/// `cli_overrides` applies only to variables the role itself declares (§4.9
/// step 4).
pub fn load(
    block: &RoleBlock,
    config_base_dir: &Path,
    cli_overrides: &BTreeMap<String, String>,
) -> Result<Role, RoleError> {
    let source_path = resolve_source(config_base_dir, &block.source);
    if !source_path.is_dir() {
        return Err(RoleError::Invalid {
            name: block.name.clone(),
            message: format!("role source is not a directory: {}", source_path.display()),
        });
    }

    let declared_vars = load_role_variables(&source_path).map_err(|e| RoleError::Config {
        name: block.name.clone(),
        source: e,
    })?;

    let var_scope = build_variable_scope(&declared_vars, block, cli_overrides).map_err(|e| RoleError::Config {
        name: block.name.clone(),
        source: e,
    })?;

    let resource_blocks = load_role_resources(&source_path).map_err(|e| RoleError::Config {
        name: block.name.clone(),
        source: e,
    })?;

    let mut resources = Vec::with_capacity(resource_blocks.len());
    for mut rb in resource_blocks {
        rb.depends_on = rb
            .depends_on
            .iter()
            .map(|d| rewrite_dependency(d, &block.name))
            .collect();
        rb.name_label = format!("{}_{}", block.name, rb.name_label);
        rb.var_scope = Some(var_scope.clone());
        rb.base_dir = Some(source_path.clone());
        resources.push(rb);
    }

    Ok(Role {
        name: block.name.clone(),
        source_path,
        resources,
        depends_on: block.depends_on.clone(),
    })
}

fn resolve_source(config_base_dir: &Path, source: &str) -> PathBuf {
    let p = Path::new(source);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        config_base_dir.join(p)
    }
}

/// `"<TYPE>.<INNER>"` → `"<TYPE>.<role_name>_<INNER>"`; `"role.<OTHER>"` is
/// left untouched, expanded later by the executor (§4.9 step 7).
fn rewrite_dependency(dep: &str, role_name: &str) -> String {
    if dep.starts_with("role.") {
        return dep.to_string();
    }
    match dep.split_once('.') {
        Some((ty, inner)) => format!("{ty}.{role_name}_{inner}"),
        None => dep.to_string(),
    }
}

fn load_role_variables(source_path: &Path) -> Result<Vec<VariableBlock>, ConfigError> {
    let path = source_path.join("variables.hcl");
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(&path)?;
    let body: hcl::Body = hcl::from_str(&text).map_err(|e| ConfigError::Parse {
        file: path.display().to_string(),
        message: e.to_string(),
    })?;
    let blocks = schema::decode_body(body)?;
    Ok(blocks
        .into_iter()
        .filter_map(|b| match b {
            TopLevelBlock::Variable(v) => Some(v),
            _ => None,
        })
        .collect())
}

fn load_role_resources(source_path: &Path) -> Result<Vec<ResourceBlock>, ConfigError> {
    let mut out = Vec::new();
    let entries = std::fs::read_dir(source_path)?;
    let mut hcl_files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().and_then(|e| e.to_str()) == Some("hcl")
                && p.file_name().and_then(|n| n.to_str()) != Some("variables.hcl")
        })
        .collect();
    hcl_files.sort();

    for path in hcl_files {
        let text = std::fs::read_to_string(&path)?;
        let body: hcl::Body = hcl::from_str(&text).map_err(|e| ConfigError::Parse {
            file: path.display().to_string(),
            message: e.to_string(),
        })?;
        for block in schema::decode_body(body)? {
            if let TopLevelBlock::Resource(rb) = block {
                out.push(rb);
            }
        }
    }
    Ok(out)
}

/// Builds the role's variable scope (§4.9 step 4): `defaults < instantiation
/// "variables = {...}" < matching CLI overrides`.
fn build_variable_scope(
    declared: &[VariableBlock],
    role_block: &RoleBlock,
    cli_overrides: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, Value>, ConfigError> {
    let instantiation: BTreeMap<String, hcl::Expression> = match &role_block.variables {
        Some(hcl::Expression::Object(obj)) => obj
            .iter()
            .filter_map(|(k, v)| object_key_as_string(k).map(|k| (k, v.clone())))
            .collect(),
        _ => BTreeMap::new(),
    };

    let mut out = BTreeMap::new();
    for decl in declared {
        let ty = variables::resolve_declared_type(decl).unwrap_or(Type::Dynamic);

        let value = if let Some(raw) = cli_overrides.get(&decl.name) {
            crate::types::coerce_string_from_cli(raw, &ty)?
        } else if let Some(expr) = instantiation.get(&decl.name) {
            let v = expr::eval_expr(expr, &EvalContext::empty())?;
            crate::types::convert(&v, &ty)?
        } else if let Some(default_expr) = &decl.default_expr {
            let v = expr::eval_expr(default_expr, &EvalContext::empty())?;
            crate::types::convert(&v, &ty)?
        } else {
            return Err(ConfigError::MissingAttribute {
                block: format!("role variable \"{}\"", decl.name),
                attribute: "default".to_string(),
            });
        };
        out.insert(decl.name.clone(), value);
    }
    Ok(out)
}

fn object_key_as_string(key: &hcl::expr::ObjectKey) -> Option<String> {
    match key {
        hcl::expr::ObjectKey::Identifier(ident) => Some(ident.as_str().to_string()),
        hcl::expr::ObjectKey::Expression(hcl::Expression::String(s)) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_block(name: &str, source: &str, variables: Option<&str>) -> RoleBlock {
        RoleBlock {
            name: name.to_string(),
            source: source.to_string(),
            variables: variables.map(|v| v.parse().unwrap()),
            depends_on: Vec::new(),
        }
    }

    #[test]
    fn load_prefixes_resource_names_and_rewrites_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.hcl"),
            r#"
            resource "package" "nginx" {
              name = "nginx"
            }
            resource "service" "nginx" {
              name       = "nginx"
              depends_on = ["package.nginx"]
            }
            "#,
        )
        .unwrap();

        let block = role_block("web", ".", None);
        let role = load(&block, dir.path(), &BTreeMap::new()).unwrap();

        let ids: Vec<String> = role.member_ids();
        assert!(ids.contains(&"package.web_nginx".to_string()));
        assert!(ids.contains(&"service.web_nginx".to_string()));

        let service = role
            .resources
            .iter()
            .find(|r| r.name_label == "web_nginx" && r.type_label == "service")
            .unwrap();
        assert_eq!(service.depends_on, vec!["package.web_nginx".to_string()]);
    }

    #[test]
    fn load_leaves_role_references_untouched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.hcl"),
            r#"
            resource "exec" "setup" {
              command    = "true"
              depends_on = ["role.base"]
            }
            "#,
        )
        .unwrap();

        let block = role_block("web", ".", None);
        let role = load(&block, dir.path(), &BTreeMap::new()).unwrap();
        assert_eq!(role.resources[0].depends_on, vec!["role.base".to_string()]);
    }

    #[test]
    fn load_resolves_variable_scope_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("variables.hcl"),
            r#"
            variable "owner" {
              default = "root"
            }
            "#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("main.hcl"),
            r#"resource "stat" "probe" { path = "/tmp" }"#,
        )
        .unwrap();

        let block = role_block("web", ".", Some(r#"{ owner = "alice" }"#));
        let role = load(&block, dir.path(), &BTreeMap::new()).unwrap();
        let scope = role.resources[0].var_scope.as_ref().unwrap();
        assert_eq!(scope.get("owner").and_then(Value::as_str), Some("alice"));

        let mut cli_overrides = BTreeMap::new();
        cli_overrides.insert("owner".to_string(), "bob".to_string());
        let role = load(&block, dir.path(), &cli_overrides).unwrap();
        let scope = role.resources[0].var_scope.as_ref().unwrap();
        assert_eq!(scope.get("owner").and_then(Value::as_str), Some("bob"));
    }

    #[test]
    fn load_rejects_non_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        let block = role_block("web", "does-not-exist", None);
        assert!(load(&block, dir.path(), &BTreeMap::new()).is_err());
    }
}
