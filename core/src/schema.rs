//! Top-level block decoding (C4): `variable`, `resource`, `role`.
//!
//! Block *structure* — labels and the `depends_on`/`description` meta-arguments
//! common to every resource — is decoded eagerly from the raw `hcl::Body`.
//! Resource-type-specific attributes stay as an undecoded `hcl::Body` until the
//! registry's factory evaluates them (§4.4's two-pass load, §4.10 step 5).

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::value::Value;

/// `variable "NAME" { type = TYPE_EXPR?, default = EXPR?, description = STRING? }`
#[derive(Clone, Debug)]
pub struct VariableBlock {
    pub name: String,
    pub type_expr: Option<hcl::Expression>,
    pub default_expr: Option<hcl::Expression>,
    pub description: Option<String>,
}

/// `resource "TYPE" "NAME" { depends_on = [...]?, description = STRING?, ... }`
#[derive(Clone, Debug)]
pub struct ResourceBlock {
    pub type_label: String,
    pub name_label: String,
    pub depends_on: Vec<String>,
    pub description: Option<String>,
    /// Everything other than `depends_on`/`description`: the type-specific body,
    /// handed to the registry's factory unevaluated.
    pub body: hcl::Body,
    /// Set by the Role Loader (§4.9 steps 4–5): the role's resolved `var`
    /// scope, used in place of the global variable table while this
    /// resource's body is evaluated. `None` for top-level resources.
    pub var_scope: Option<BTreeMap<String, Value>>,
    /// Set by the Role Loader: the role's source directory, used in place of
    /// the main configuration directory for `file()`/`template()` resolution
    /// while this resource's body is evaluated. `None` for top-level
    /// resources.
    pub base_dir: Option<PathBuf>,
}

impl ResourceBlock {
    pub fn id(&self) -> String {
        format!("{}.{}", self.type_label, self.name_label)
    }
}

/// `role "NAME" { source = STRING, variables = {...}?, depends_on = [...]? }`
#[derive(Clone, Debug)]
pub struct RoleBlock {
    pub name: String,
    pub source: String,
    pub variables: Option<hcl::Expression>,
    pub depends_on: Vec<String>,
}

/// The three top-level block kinds, after structural decoding but before
/// attribute evaluation.
#[derive(Clone, Debug)]
pub enum TopLevelBlock {
    Variable(VariableBlock),
    Resource(ResourceBlock),
    Role(RoleBlock),
}

/// Decodes every top-level block of a raw `hcl::Body` (§4.4). Unknown block
/// identifiers fail the load; bare top-level attributes are rejected the same
/// way (this grammar has no top-level attributes, only blocks).
pub fn decode_body(body: hcl::Body) -> Result<Vec<TopLevelBlock>, ConfigError> {
    let mut out = Vec::new();
    for structure in body.into_iter() {
        match structure {
            hcl::Structure::Block(block) => out.push(decode_block(block)?),
            hcl::Structure::Attribute(attr) => {
                return Err(ConfigError::UnknownBlockKind(format!(
                    "top-level attribute `{}` (only blocks are permitted here)",
                    attr.key()
                )));
            }
        }
    }
    Ok(out)
}

fn decode_block(block: hcl::Block) -> Result<TopLevelBlock, ConfigError> {
    match block.identifier() {
        "variable" => Ok(TopLevelBlock::Variable(decode_variable(block)?)),
        "resource" => Ok(TopLevelBlock::Resource(decode_resource(block)?)),
        "role" => Ok(TopLevelBlock::Role(decode_role(block)?)),
        other => Err(ConfigError::UnknownBlockKind(other.to_string())),
    }
}

fn single_label(block: &hcl::Block, kind: &str) -> Result<String, ConfigError> {
    block
        .labels()
        .first()
        .map(|l| l.as_str().to_string())
        .ok_or_else(|| ConfigError::Parse {
            file: String::new(),
            message: format!("`{kind}` block requires a name label"),
        })
}

fn decode_variable(block: hcl::Block) -> Result<VariableBlock, ConfigError> {
    let name = single_label(&block, "variable")?;
    let mut type_expr = None;
    let mut default_expr = None;
    let mut description = None;

    for attr in block.body().attributes() {
        match attr.key() {
            "type" => type_expr = Some(attr.expr().clone()),
            "default" => default_expr = Some(attr.expr().clone()),
            "description" => description = expr_as_string(attr.expr()),
            other => {
                return Err(ConfigError::UnknownBlockKind(format!(
                    "variable \"{name}\": unknown attribute `{other}`"
                )))
            }
        }
    }

    Ok(VariableBlock {
        name,
        type_expr,
        default_expr,
        description,
    })
}

fn decode_resource(block: hcl::Block) -> Result<ResourceBlock, ConfigError> {
    let labels = block.labels();
    if labels.len() != 2 {
        return Err(ConfigError::Parse {
            file: String::new(),
            message: "`resource` block requires exactly two labels: type and name".to_string(),
        });
    }
    let type_label = labels[0].as_str().to_string();
    let name_label = labels[1].as_str().to_string();

    let mut depends_on = Vec::new();
    let mut description = None;
    let mut rest = hcl::Body::builder();

    for structure in block.into_body().into_iter() {
        match structure {
            hcl::Structure::Attribute(attr) if attr.key() == "depends_on" => {
                depends_on = expr_as_string_list(attr.expr())?;
            }
            hcl::Structure::Attribute(attr) if attr.key() == "description" => {
                description = expr_as_string(attr.expr());
            }
            other => rest = rest.add_structure(other),
        }
    }

    Ok(ResourceBlock {
        type_label,
        name_label,
        depends_on,
        description,
        body: rest.build(),
        var_scope: None,
        base_dir: None,
    })
}

fn decode_role(block: hcl::Block) -> Result<RoleBlock, ConfigError> {
    let name = single_label(&block, "role")?;
    let mut source = None;
    let mut variables = None;
    let mut depends_on = Vec::new();

    for attr in block.body().attributes() {
        match attr.key() {
            "source" => source = expr_as_string(attr.expr()),
            "variables" => variables = Some(attr.expr().clone()),
            "depends_on" => depends_on = expr_as_string_list(attr.expr())?,
            other => {
                return Err(ConfigError::UnknownBlockKind(format!(
                    "role \"{name}\": unknown attribute `{other}`"
                )))
            }
        }
    }

    let source = source.ok_or_else(|| ConfigError::MissingAttribute {
        block: format!("role \"{name}\""),
        attribute: "source".to_string(),
    })?;

    Ok(RoleBlock {
        name,
        source,
        variables,
        depends_on,
    })
}

fn expr_as_string(expr: &hcl::Expression) -> Option<String> {
    match expr {
        hcl::Expression::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn expr_as_string_list(expr: &hcl::Expression) -> Result<Vec<String>, ConfigError> {
    match expr {
        hcl::Expression::Array(items) => items
            .iter()
            .map(|item| {
                expr_as_string(item).ok_or_else(|| ConfigError::Parse {
                    file: String::new(),
                    message: "depends_on entries must be string literals".to_string(),
                })
            })
            .collect(),
        other => Err(ConfigError::Parse {
            file: String::new(),
            message: format!("expected a list of strings, got {other:?}"),
        }),
    }
}
