//! Tagged value universe (C1) and conversion rules.
//!
//! `Value` is deliberately *not* a re-export of `hcl::Value`: the configuration
//! language distinguishes `Set` and `Tuple` from `List`, and permits an explicit
//! `Unknown` marker at any type, neither of which `hcl::Value` models. Conversion
//! to/from `hcl::Value` happens once, at the evaluator boundary (see `crate::expr`).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::types::Type;

/// A dynamically typed configuration value.
#[derive(Clone, Debug)]
pub enum Value {
    String(String),
    Number(Number),
    Bool(bool),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(BTreeMap<String, Value>),
    Tuple(Vec<Value>),
    Null(Type),
    Unknown(Type),
}

/// Arbitrary-precision-enough numeric type. The engine does not need true
/// bignum arithmetic; an `f64` mantissa covers every host-configuration use
/// case (counts, ports, modes-as-numbers) while `i64` is kept for exact
/// integral formatting so `tostring(1)` renders `"1"` and not `"1.0"`.
#[derive(Clone, Copy, Debug)]
pub struct Number(f64);

impl Number {
    pub fn from_i64(v: i64) -> Self {
        Number(v as f64)
    }

    pub fn from_f64(v: f64) -> Self {
        Number(v)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }

    pub fn as_i64(&self) -> Option<i64> {
        if self.0.fract() == 0.0 && self.0.abs() < i64::MAX as f64 {
            Some(self.0 as i64)
        } else {
            None
        }
    }

    pub fn is_integer(&self) -> bool {
        self.0.fract() == 0.0
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(i) = self.as_i64() {
            write!(f, "{i}")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl Value {
    pub fn null(ty: Type) -> Self {
        Value::Null(ty)
    }

    pub fn unknown(ty: Type) -> Self {
        Value::Unknown(ty)
    }

    pub fn type_of(&self) -> Type {
        match self {
            Value::String(_) => Type::String,
            Value::Number(_) => Type::Number,
            Value::Bool(_) => Type::Bool,
            Value::List(items) => Type::List(Box::new(Self::common_element_type(items))),
            Value::Set(items) => Type::Set(Box::new(Self::common_element_type(items))),
            Value::Map(m) => Type::Map(Box::new(
                m.values()
                    .next()
                    .map(Value::type_of)
                    .unwrap_or(Type::Dynamic),
            )),
            Value::Object(fields) => Type::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.type_of()))
                    .collect(),
            ),
            Value::Tuple(items) => Type::Tuple(items.iter().map(Value::type_of).collect()),
            Value::Null(t) | Value::Unknown(t) => t.clone(),
        }
    }

    fn common_element_type(items: &[Value]) -> Type {
        items
            .first()
            .map(Value::type_of)
            .unwrap_or(Type::Dynamic)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) | Value::Set(v) | Value::Tuple(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Structural equality. Null/Unknown only equal another Null/Unknown of the
    /// same type, never a concrete value.
    pub fn structural_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y))
            }
            (Value::Set(a), Value::Set(b)) => {
                let sa: BTreeSet<String> = a.iter().map(|v| format!("{v:?}")).collect();
                let sb: BTreeSet<String> = b.iter().map(|v| format!("{v:?}")).collect();
                sa == sb
            }
            (Value::Map(a), Value::Object(b)) | (Value::Object(a), Value::Map(b)) => {
                let am: BTreeMap<_, _> = a.clone();
                let bm: BTreeMap<_, _> = b.clone();
                am.len() == bm.len()
                    && am
                        .iter()
                        .all(|(k, v)| bm.get(k).is_some_and(|w| v.structural_eq(w)))
            }
            (Value::Map(a), Value::Map(b)) | (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.structural_eq(w)))
            }
            (Value::Null(t1), Value::Null(t2)) => t1 == t2,
            (Value::Unknown(t1), Value::Unknown(t2)) => t1 == t2,
            _ => false,
        }
    }

    /// Total ordering, defined only for String and Number per §3.
    pub fn partial_compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(Number::from_i64(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(Number::from_f64(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_eq_matches_scalars() {
        assert!(Value::String("a".to_string()).structural_eq(&Value::String("a".to_string())));
        assert!(!Value::String("a".to_string()).structural_eq(&Value::String("b".to_string())));
        assert!(Value::from(1i64).structural_eq(&Value::from(1i64)));
        assert!(Value::Bool(true).structural_eq(&Value::Bool(true)));
    }

    #[test]
    fn structural_eq_treats_map_and_object_as_interchangeable() {
        let mut m = BTreeMap::new();
        m.insert("a".to_string(), Value::from(1i64));
        let map = Value::Map(m.clone());
        let obj = Value::Object(m);
        assert!(map.structural_eq(&obj));
    }

    #[test]
    fn structural_eq_set_is_order_independent() {
        let a = Value::Set(vec![Value::from(1i64), Value::from(2i64)]);
        let b = Value::Set(vec![Value::from(2i64), Value::from(1i64)]);
        assert!(a.structural_eq(&b));
    }

    #[test]
    fn structural_eq_null_requires_matching_type() {
        assert!(Value::Null(Type::String).structural_eq(&Value::Null(Type::String)));
        assert!(!Value::Null(Type::String).structural_eq(&Value::Null(Type::Number)));
        assert!(!Value::Null(Type::String).structural_eq(&Value::String(String::new())));
    }

    #[test]
    fn partial_compare_orders_strings_and_numbers() {
        assert_eq!(
            Value::from(1i64).partial_compare(&Value::from(2i64)),
            Some(std::cmp::Ordering::Less)
        );
        assert_eq!(
            Value::String("a".to_string()).partial_compare(&Value::String("b".to_string())),
            Some(std::cmp::Ordering::Less)
        );
    }

    #[test]
    fn partial_compare_is_undefined_across_types() {
        assert_eq!(Value::Bool(true).partial_compare(&Value::Bool(false)), None);
        assert_eq!(Value::from(1i64).partial_compare(&Value::String("1".to_string())), None);
    }

    #[test]
    fn number_as_i64_requires_an_integral_value() {
        assert_eq!(Number::from_i64(5).as_i64(), Some(5));
        assert_eq!(Number::from_f64(5.5).as_i64(), None);
    }
}
