//! The evaluation context (§3 "Eval context"): `{variables, functions}`,
//! rebuilt whenever variables or resource references change, and borrowed for
//! the duration of a single expression evaluation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::value::Value;

/// `{variables: {"var"→Object, "fact"→Object, "<type>"→Object(by name), "each"→Object?}, functions: {...}}`.
///
/// Functions are not stored here directly — they are re-registered into a
/// fresh `hcl::eval::Context` on every evaluation (`to_hcl_context`), since
/// `hcl::eval::FuncDef` closures are not `Clone` and the set of functions
/// never changes across evaluations within one process.
#[derive(Clone, Debug, Default)]
pub struct EvalContext {
    /// Top-level namespaces: "var", "fact", "each", and one per resource type
    /// ("file", "directory", "package", ...) holding that type's known
    /// instances by name (§4.10 step 5, the two-pass load's shallow
    /// projection).
    pub namespaces: BTreeMap<String, Value>,
    /// The effective base directory for `file()`/`template()` (§4.3): the
    /// role base directory while evaluating a role's resources, the main
    /// configuration directory otherwise.
    pub base_dir: PathBuf,
    /// Var-file assignments are evaluated in an *empty* context: no variable,
    /// fact, or resource references, functions only (§4.5). Set when building
    /// the var-file evaluation context.
    pub best_effort: bool,
}

impl EvalContext {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        EvalContext {
            namespaces: BTreeMap::new(),
            base_dir: base_dir.into(),
            best_effort: false,
        }
    }

    /// An empty context with no namespaces at all, used for var-file
    /// assignment evaluation (§4.5) and literal coercion (§4.1).
    pub fn empty() -> Self {
        EvalContext {
            namespaces: BTreeMap::new(),
            base_dir: PathBuf::from("."),
            best_effort: false,
        }
    }

    /// Returns a copy whose `best_effort` flag permits the two-pass loader's
    /// first pass to silently skip attributes that reference not-yet-projected
    /// siblings (§9 "Two-pass load ambiguity").
    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    pub fn with_namespace(mut self, name: impl Into<String>, value: Value) -> Self {
        self.namespaces.insert(name.into(), value);
        self
    }

    pub fn set_namespace(&mut self, name: impl Into<String>, value: Value) {
        self.namespaces.insert(name.into(), value);
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Builds a fresh `hcl::eval::Context` with every namespace installed as
    /// a top-level variable and the entire standard + I/O function library
    /// registered (§4.2/§4.3).
    pub fn to_hcl_context(&self) -> hcl::eval::Context<'static> {
        let mut ctx = hcl::eval::Context::new();
        for (name, value) in &self.namespaces {
            ctx.declare_var(name.clone(), super::value_to_hcl(value));
        }
        let template_vars = value_to_minijinja(&self.merged_object());
        crate::functions::register_all(&mut ctx, &self.base_dir, template_vars);
        ctx
    }

    /// All namespaces combined into one `Object`, used as the `minijinja`
    /// variable namespace for `template()` (§4.3): "the current evaluation
    /// context's variables".
    fn merged_object(&self) -> Value {
        Value::Object(self.namespaces.clone())
    }
}

/// Converts a `Value` into a `minijinja::Value`, flattening objects to
/// string-keyed maps, numbers to doubles, booleans to booleans, and lists to
/// sequences, recursively, per §4.3's `template()` contract.
pub fn value_to_minijinja(v: &Value) -> minijinja::Value {
    match v {
        Value::String(s) => minijinja::Value::from(s.as_str()),
        Value::Number(n) => minijinja::Value::from(n.as_f64()),
        Value::Bool(b) => minijinja::Value::from(*b),
        Value::List(items) | Value::Set(items) | Value::Tuple(items) => {
            minijinja::Value::from(items.iter().map(value_to_minijinja).collect::<Vec<_>>())
        }
        Value::Map(m) | Value::Object(m) => {
            let map: std::collections::BTreeMap<String, minijinja::Value> = m
                .iter()
                .map(|(k, v)| (k.clone(), value_to_minijinja(v)))
                .collect();
            minijinja::Value::from(map)
        }
        Value::Null(_) | Value::Unknown(_) => minijinja::Value::UNDEFINED,
    }
}

/// Resolves the effective base directory for role resources (§4.9 step 5):
/// the role's own source directory, not the main configuration directory.
pub fn role_base_dir(role_source: &Path) -> PathBuf {
    role_source.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_to_minijinja_flattens_objects_to_string_keyed_maps() {
        let mut inner = BTreeMap::new();
        inner.insert("name".to_string(), Value::String("alice".to_string()));
        let v = Value::Object(inner);
        let rendered = value_to_minijinja(&v);
        assert_eq!(rendered.kind(), minijinja::value::ValueKind::Map);
    }

    #[test]
    fn value_to_minijinja_maps_null_and_unknown_to_undefined() {
        assert!(value_to_minijinja(&Value::Null(crate::types::Type::Dynamic)).is_undefined());
    }

    #[test]
    fn role_base_dir_is_the_role_source_unchanged() {
        let p = Path::new("/etc/hostcfg/roles/web");
        assert_eq!(role_base_dir(p), p.to_path_buf());
    }

    #[test]
    fn to_hcl_context_installs_every_namespace_as_a_variable() {
        use hcl::eval::Evaluate;
        let mut vars = BTreeMap::new();
        vars.insert("greeting".to_string(), Value::String("hi".to_string()));
        let ctx = EvalContext::empty().with_namespace("var", Value::Object(vars));
        let hcl_ctx = ctx.to_hcl_context();
        let expr: hcl::Expression = "var.greeting".parse().unwrap();
        let result = expr.evaluate(&hcl_ctx).unwrap();
        assert_eq!(result.as_str(), Some("hi"));
    }
}
