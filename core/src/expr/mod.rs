//! Expression evaluator (C2).
//!
//! Parsing of the surface grammar — literals, dotted/indexed access, arithmetic,
//! comparisons, template interpolation, function calls, `for` comprehensions — is
//! delegated entirely to `hcl-rs`, which already implements this grammar faithfully
//! (it *is* an HCL implementation). This module is the boundary: it builds an
//! `hcl::eval::Context` from an `EvalContext`, evaluates an `hcl::Expression`
//! through it, and converts the resulting `hcl::Value` into our own `Value` (§4.1)
//! so everything above this layer works exclusively in terms of `Value`/`Type`.

pub mod context;
pub mod typeexpr;

use std::collections::BTreeMap;

use hcl::eval::Evaluate;

use crate::error::ConfigError;
use crate::value::{Number, Value};

pub use context::EvalContext;
pub use typeexpr::parse_type_expr;

/// Evaluates a single `hcl::Expression` against an `EvalContext`, returning our
/// engine-native `Value`. This is the single seam every other component goes
/// through; no component outside this module touches `hcl::Value` directly.
pub fn eval_expr(expr: &hcl::Expression, ctx: &EvalContext) -> Result<Value, ConfigError> {
    let hcl_ctx = ctx.to_hcl_context();
    let result = expr.evaluate(&hcl_ctx).map_err(|e| {
        if e.to_string().contains("division") || e.to_string().contains("by zero") {
            ConfigError::DivisionByZero
        } else {
            ConfigError::Eval(e.to_string())
        }
    })?;
    Ok(hcl_to_value(&result))
}

/// Evaluates every attribute of a raw `hcl::Body` against an `EvalContext`,
/// returning a name→Value map. Used by the schema decoder (§4.4) both for the
/// shallow first-pass projection and the authoritative second pass.
pub fn eval_body(body: &hcl::Body, ctx: &EvalContext) -> Result<BTreeMap<String, Value>, ConfigError> {
    let mut out = BTreeMap::new();
    for attr in body.attributes() {
        match eval_expr(attr.expr(), ctx) {
            Ok(v) => {
                out.insert(attr.key().to_string(), v);
            }
            Err(e) => {
                // Two-pass load ambiguity (§9): the first pass is best-effort.
                // Attributes whose expression cannot yet be evaluated (because
                // it references a sibling resource not yet projected) are
                // silently skipped here; the second, authoritative pass runs
                // with the enriched context and must succeed.
                if !ctx.best_effort {
                    return Err(e);
                }
            }
        }
    }
    Ok(out)
}

/// Evaluates a bare literal expression string with an empty context. Used by
/// `CoerceStringFromCLI`'s final fallback (§4.1) and by var-file assignment
/// evaluation (§4.5, which explicitly forbids variable/fact/resource references
/// but still permits function calls).
pub fn eval_literal(s: &str) -> Result<Value, ConfigError> {
    let expr: hcl::Expression = s
        .parse()
        .map_err(|e: hcl::Error| ConfigError::Eval(e.to_string()))?;
    let ctx = EvalContext::empty();
    eval_expr(&expr, &ctx)
}

/// Converts an `hcl::Value` into our `Value` universe. `hcl::Value` has no
/// `Set`/`Tuple`/`Unknown` variants, so arrays always decode as `List` and
/// objects always decode as `Object`; callers that need `Set`/`Tuple`/`Unknown`
/// semantics apply `convert` (§4.1, `crate::types::convert`) afterwards against
/// a declared type constraint.
pub fn hcl_to_value(v: &hcl::Value) -> Value {
    match v {
        hcl::Value::Null => Value::Null(crate::types::Type::Dynamic),
        hcl::Value::Bool(b) => Value::Bool(*b),
        hcl::Value::Number(n) => Value::Number(
            n.as_f64()
                .map(Number::from_f64)
                .unwrap_or_else(|| Number::from_i64(n.as_i64().unwrap_or(0))),
        ),
        hcl::Value::String(s) => Value::String(s.clone()),
        hcl::Value::Array(items) => Value::List(items.iter().map(hcl_to_value).collect()),
        hcl::Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k.to_string(), hcl_to_value(v));
            }
            Value::Object(out)
        }
    }
}

/// Scans every attribute expression of `body` for identifier references of
/// the form `<TYPE>.<NAME>` where `<TYPE>` is a known resource type label,
/// collecting `<TYPE>.<NAME>` as an implicit dependency (§4.8). Duplicates
/// are removed while preserving first-seen order.
pub fn find_resource_references(body: &hcl::Body) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut out = Vec::new();
    for attr in body.attributes() {
        collect_refs(attr.expr(), &mut seen, &mut out);
    }
    out
}

fn collect_refs(expr: &hcl::Expression, seen: &mut std::collections::BTreeSet<String>, out: &mut Vec<String>) {
    use hcl::expr::TraversalOperator;
    use hcl::Expression as E;

    match expr {
        E::Traversal(t) => {
            if let E::Variable(ident) = t.expr.clone() {
                if crate::registry::is_known_type(ident.as_str()) {
                    if let Some(TraversalOperator::GetAttr(name)) = t.operators.first() {
                        let id = format!("{}.{}", ident.as_str(), name.as_str());
                        if seen.insert(id.clone()) {
                            out.push(id);
                        }
                    }
                }
            }
            collect_refs(&t.expr, seen, out);
            for op in &t.operators {
                if let TraversalOperator::Index(idx) = op {
                    collect_refs(idx, seen, out);
                }
            }
        }
        E::Array(items) => {
            for item in items {
                collect_refs(item, seen, out);
            }
        }
        E::Object(obj) => {
            for (_, v) in obj.iter() {
                collect_refs(v, seen, out);
            }
        }
        E::Parenthesis(inner) => collect_refs(inner, seen, out),
        E::Conditional(c) => {
            collect_refs(&c.cond_expr, seen, out);
            collect_refs(&c.true_expr, seen, out);
            collect_refs(&c.false_expr, seen, out);
        }
        E::Operation(op) => match op.as_ref() {
            hcl::expr::Operation::Unary(u) => collect_refs(&u.expr, seen, out),
            hcl::expr::Operation::Binary(b) => {
                collect_refs(&b.lhs_expr, seen, out);
                collect_refs(&b.rhs_expr, seen, out);
            }
        },
        E::ForExpr(f) => {
            collect_refs(&f.collection_expr, seen, out);
            if let Some(key_expr) = &f.key_expr {
                collect_refs(key_expr, seen, out);
            }
            collect_refs(&f.value_expr, seen, out);
            if let Some(cond) = &f.cond_expr {
                collect_refs(cond, seen, out);
            }
        }
        E::TemplateExpr(t) => {
            if let Some(raw) = template_source(t) {
                if let Ok(template) = raw.parse::<hcl::template::Template>() {
                    collect_template_refs(&template, seen, out);
                }
            }
        }
        _ => {}
    }
}

fn template_source(t: &hcl::expr::TemplateExpr) -> Option<String> {
    match t {
        hcl::expr::TemplateExpr::QuotedString(s) => Some(s.clone()),
        hcl::expr::TemplateExpr::Heredoc(h) => Some(h.template.clone()),
    }
}

/// Walks a parsed template's interpolations and directives, recursing into
/// every embedded expression (§4.8: `"${file.base.path}"` contributes a
/// dependency just like an attribute-level reference does).
fn collect_template_refs(
    template: &hcl::template::Template,
    seen: &mut std::collections::BTreeSet<String>,
    out: &mut Vec<String>,
) {
    use hcl::template::{Directive, Element};

    for element in template.elements() {
        match element {
            Element::Literal(_) => {}
            Element::Interpolation(interp) => collect_refs(&interp.expr, seen, out),
            Element::Directive(Directive::If(if_dir)) => {
                collect_refs(&if_dir.cond_expr, seen, out);
                collect_template_refs(&if_dir.true_template, seen, out);
                if let Some(false_template) = &if_dir.false_template {
                    collect_template_refs(false_template, seen, out);
                }
            }
            Element::Directive(Directive::For(for_dir)) => {
                collect_refs(&for_dir.collection_expr, seen, out);
                collect_template_refs(&for_dir.template, seen, out);
            }
        }
    }
}

/// Converts our `Value` back into `hcl::Value`, for installing resource
/// attribute projections (§4.10 step 5) as evaluation context variables and for
/// rendering `template()` (§4.3) inputs.
pub fn value_to_hcl(v: &Value) -> hcl::Value {
    match v {
        Value::String(s) => hcl::Value::String(s.clone()),
        Value::Number(n) => hcl::Value::from(n.as_f64()),
        Value::Bool(b) => hcl::Value::Bool(*b),
        Value::List(items) | Value::Set(items) | Value::Tuple(items) => {
            hcl::Value::Array(items.iter().map(value_to_hcl).collect())
        }
        Value::Map(m) | Value::Object(m) => {
            let mut out = hcl::Map::new();
            for (k, v) in m {
                out.insert(k.clone(), value_to_hcl(v));
            }
            hcl::Value::Object(out)
        }
        Value::Null(_) => hcl::Value::Null,
        Value::Unknown(_) => hcl::Value::Null,
    }
}
