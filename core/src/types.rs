//! Type constraints (C1) and value conversion/coercion rules.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigError;
use crate::value::{Number, Value};

/// A recursive type constraint, as described in §3 and parsed as a restricted
/// expression per §4.2 (`string`, `number`, `bool`, `any`, `list(T)`, `set(T)`,
/// `map(T)`, `tuple([T,...])`, `object({n=T,...})`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    String,
    Number,
    Bool,
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>),
    Object(BTreeMap<String, Type>),
    Tuple(Vec<Type>),
    Dynamic,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::String => write!(f, "string"),
            Type::Number => write!(f, "number"),
            Type::Bool => write!(f, "bool"),
            Type::List(t) => write!(f, "list({t})"),
            Type::Set(t) => write!(f, "set({t})"),
            Type::Map(t) => write!(f, "map({t})"),
            Type::Object(fields) => {
                write!(f, "object({{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                write!(f, "}})")
            }
            Type::Tuple(items) => {
                write!(f, "tuple([")?;
                for (i, t) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, "])")
            }
            Type::Dynamic => write!(f, "any"),
        }
    }
}

impl Type {
    /// Parses the bare-identifier shorthand (`string`, `number`, `bool`, `any`)
    /// used when `variable.type` is a plain scalar name. The call-form
    /// (`list(string)`, `object({...})`, ...) is parsed by the evaluator from
    /// the `hcl::Expression` tree directly (see `crate::expr::parse_type_expr`),
    /// since it needs access to the expression AST, not just a string.
    pub fn from_identifier(ident: &str) -> Option<Type> {
        match ident {
            "string" => Some(Type::String),
            "number" => Some(Type::Number),
            "bool" => Some(Type::Bool),
            "any" => Some(Type::Dynamic),
            _ => None,
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        if matches!(self, Type::Dynamic) {
            return true;
        }
        match (self, value) {
            (_, Value::Unknown(_)) | (_, Value::Null(_)) => true,
            (Type::String, Value::String(_)) => true,
            (Type::Number, Value::Number(_)) => true,
            (Type::Bool, Value::Bool(_)) => true,
            (Type::List(t), Value::List(items)) => items.iter().all(|v| t.matches(v)),
            (Type::Set(t), Value::Set(items)) => items.iter().all(|v| t.matches(v)),
            (Type::Map(t), Value::Map(m)) => m.values().all(|v| t.matches(v)),
            (Type::Object(fields), Value::Object(obj)) => fields
                .iter()
                .all(|(k, t)| obj.get(k).is_some_and(|v| t.matches(v))),
            (Type::Tuple(types), Value::Tuple(items)) => {
                types.len() == items.len() && types.iter().zip(items).all(|(t, v)| t.matches(v))
            }
            _ => false,
        }
    }
}

/// `convert(value, target_type)`: minimal widening/narrowing per §4.1.
pub fn convert(value: &Value, target: &Type) -> Result<Value, ConfigError> {
    if matches!(target, Type::Dynamic) {
        return Ok(value.clone());
    }
    if let Value::Null(_) = value {
        return Ok(Value::Null(target.clone()));
    }
    if let Value::Unknown(_) = value {
        return Ok(Value::Unknown(target.clone()));
    }

    match (target, value) {
        (Type::String, Value::String(_)) => Ok(value.clone()),
        (Type::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (Type::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),

        (Type::Number, Value::Number(_)) => Ok(value.clone()),
        (Type::Number, Value::String(s)) => parse_number(s)
            .map(Value::Number)
            .ok_or_else(|| mismatch("number", "string", s)),

        (Type::Bool, Value::Bool(_)) => Ok(value.clone()),
        (Type::Bool, Value::String(s)) => parse_bool_literal(s)
            .map(Value::Bool)
            .ok_or_else(|| mismatch("bool", "string", s)),

        // list <-> set: dedup when narrowing to a set.
        (Type::List(t), Value::List(items)) | (Type::List(t), Value::Set(items)) => {
            let converted: Result<Vec<_>, _> = items.iter().map(|v| convert(v, t)).collect();
            Ok(Value::List(converted?))
        }
        (Type::Set(t), Value::List(items)) | (Type::Set(t), Value::Set(items)) => {
            let converted: Result<Vec<_>, _> = items.iter().map(|v| convert(v, t)).collect();
            Ok(Value::Set(dedup(converted?)))
        }

        (Type::Map(t), Value::Map(m)) | (Type::Map(t), Value::Object(m)) => {
            let mut out = BTreeMap::new();
            for (k, v) in m {
                out.insert(k.clone(), convert(v, t)?);
            }
            Ok(Value::Map(out))
        }

        (Type::Object(fields), Value::Object(obj)) | (Type::Object(fields), Value::Map(obj)) => {
            let mut out = BTreeMap::new();
            for (k, t) in fields {
                let v = obj
                    .get(k)
                    .ok_or_else(|| ConfigError::MissingAttribute {
                        block: "object literal".into(),
                        attribute: k.clone(),
                    })?;
                out.insert(k.clone(), convert(v, t)?);
            }
            Ok(Value::Object(out))
        }

        (Type::Tuple(types), Value::Tuple(items))
        | (Type::Tuple(types), Value::List(items)) => {
            if types.len() != items.len() {
                return Err(mismatch(&target.to_string(), &value.type_of().to_string(), "<value>"));
            }
            let converted: Result<Vec<_>, _> = types
                .iter()
                .zip(items)
                .map(|(t, v)| convert(v, t))
                .collect();
            Ok(Value::Tuple(converted?))
        }

        _ => Err(mismatch(
            &target.to_string(),
            &value.type_of().to_string(),
            "<value>",
        )),
    }
}

fn mismatch(expected: &str, actual: &str, raw: &str) -> ConfigError {
    ConfigError::TypeMismatch {
        name: raw.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

fn dedup(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.iter().any(|existing| existing.structural_eq(&item)) {
            out.push(item);
        }
    }
    out
}

fn parse_bool_literal(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "TRUE" | "1" | "yes" | "on" => Some(true),
        "false" | "False" | "FALSE" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<Number> {
    s.trim().parse::<f64>().ok().map(Number::from_f64)
}

/// `CoerceStringFromCLI(s, T)` per §4.1 / testable property 7-8.
pub fn coerce_string_from_cli(s: &str, target: &Type) -> Result<Value, ConfigError> {
    match target {
        Type::String | Type::Dynamic => Ok(Value::String(s.to_string())),
        Type::Bool => parse_bool_literal(s)
            .map(Value::Bool)
            .ok_or_else(|| mismatch("bool", "string", s)),
        Type::Number => parse_number(s)
            .map(Value::Number)
            .ok_or_else(|| mismatch("number", "string", s)),
        _ => {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(s) {
                let value = json_to_value(&json);
                return convert(&value, target);
            }
            if let Ok(value) = crate::expr::eval_literal(s) {
                return convert(&value, target);
            }
            Err(mismatch(&target.to_string(), "string", s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_identifier_recognizes_scalar_keywords() {
        assert_eq!(Type::from_identifier("string"), Some(Type::String));
        assert_eq!(Type::from_identifier("number"), Some(Type::Number));
        assert_eq!(Type::from_identifier("bool"), Some(Type::Bool));
        assert_eq!(Type::from_identifier("any"), Some(Type::Dynamic));
        assert_eq!(Type::from_identifier("frobnicate"), None);
    }

    #[test]
    fn convert_widens_number_and_bool_to_string() {
        let n = convert(&Value::Number(Number::from_i64(8)), &Type::String).unwrap();
        assert_eq!(n.as_str(), Some("8"));
        let b = convert(&Value::Bool(true), &Type::String).unwrap();
        assert_eq!(b.as_str(), Some("true"));
    }

    #[test]
    fn convert_narrows_string_to_number_and_bool() {
        let n = convert(&Value::String("42".to_string()), &Type::Number).unwrap();
        assert_eq!(n.as_number().and_then(|x| x.as_i64()), Some(42));
        let b = convert(&Value::String("true".to_string()), &Type::Bool).unwrap();
        assert_eq!(b.as_bool(), Some(true));
    }

    #[test]
    fn convert_rejects_unparseable_string_to_number() {
        assert!(convert(&Value::String("not-a-number".to_string()), &Type::Number).is_err());
    }

    #[test]
    fn convert_list_to_set_deduplicates() {
        let list = Value::List(vec![
            Value::String("a".to_string()),
            Value::String("a".to_string()),
            Value::String("b".to_string()),
        ]);
        let set = convert(&list, &Type::Set(Box::new(Type::String))).unwrap();
        assert_eq!(set.as_list().map(|l| l.len()), Some(2));
    }

    #[test]
    fn convert_dynamic_target_is_identity() {
        let v = Value::Bool(false);
        let out = convert(&v, &Type::Dynamic).unwrap();
        assert_eq!(out.as_bool(), Some(false));
    }

    #[test]
    fn convert_null_preserves_null_with_target_type() {
        let out = convert(&Value::Null(Type::Dynamic), &Type::Number).unwrap();
        assert!(matches!(out, Value::Null(Type::Number)));
    }

    #[test]
    fn coerce_string_from_cli_parses_scalars() {
        assert_eq!(
            coerce_string_from_cli("8080", &Type::Number)
                .unwrap()
                .as_number()
                .and_then(|n| n.as_i64()),
            Some(8080)
        );
        assert_eq!(
            coerce_string_from_cli("yes", &Type::Bool).unwrap().as_bool(),
            Some(true)
        );
        assert_eq!(
            coerce_string_from_cli("plain", &Type::String).unwrap().as_str(),
            Some("plain")
        );
    }

    #[test]
    fn coerce_string_from_cli_parses_json_list_for_list_target() {
        let v = coerce_string_from_cli(r#"["a","b"]"#, &Type::List(Box::new(Type::String))).unwrap();
        assert_eq!(v.as_list().map(|l| l.len()), Some(2));
    }

    #[test]
    fn coerce_string_from_cli_rejects_malformed_bool() {
        assert!(coerce_string_from_cli("maybe", &Type::Bool).is_err());
    }

    #[test]
    fn type_matches_dynamic_accepts_anything() {
        assert!(Type::Dynamic.matches(&Value::Number(Number::from_i64(1))));
    }

    #[test]
    fn type_matches_checks_nested_list_elements() {
        let ty = Type::List(Box::new(Type::Number));
        let ok = Value::List(vec![Value::Number(Number::from_i64(1))]);
        let bad = Value::List(vec![Value::String("x".to_string())]);
        assert!(ty.matches(&ok));
        assert!(!ty.matches(&bad));
    }
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null(Type::Dynamic),
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(Number::from_f64(n.as_f64().unwrap_or(0.0))),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k.clone(), json_to_value(v));
            }
            Value::Object(out)
        }
    }
}
