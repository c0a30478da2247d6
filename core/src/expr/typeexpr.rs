//! Type-constraint expression parsing (§4.2, §9 "type expression form").
//!
//! `variable.type` is written as an expression, not a string: `string`,
//! `list(string)`, `object({name = string, port = number})`, and so on. The
//! bare-identifier scalars (`string`/`number`/`bool`/`any`) are recognized by
//! `Type::from_identifier`; everything call-shaped is parsed here directly
//! from the `hcl::Expression` AST, since `hcl-rs` has no notion of a type
//! constraint and parses `list(string)` as an ordinary function call whose
//! argument is the traversal `string`.
//!
//! Per the Open Question in §9: the expression form is authoritative. A
//! `variable` block with no `type` attribute at all defaults to `any`.

use crate::error::ConfigError;
use crate::types::Type;

/// Parses an `hcl::Expression` naming a type constraint into a `Type`.
pub fn parse_type_expr(expr: &hcl::Expression) -> Result<Type, ConfigError> {
    match expr {
        hcl::Expression::Variable(ident) => Type::from_identifier(ident.as_str())
            .ok_or_else(|| bad_type(&format!("{ident}"))),

        hcl::Expression::FuncCall(call) => {
            let name = call.name.as_str();
            match name {
                "list" => Ok(Type::List(Box::new(parse_single_arg(call)?))),
                "set" => Ok(Type::Set(Box::new(parse_single_arg(call)?))),
                "map" => Ok(Type::Map(Box::new(parse_single_arg(call)?))),
                "tuple" => {
                    let inner = single_arg(call)?;
                    let items = match inner {
                        hcl::Expression::Array(items) => items
                            .iter()
                            .map(parse_type_expr)
                            .collect::<Result<Vec<_>, _>>()?,
                        other => return Err(bad_type(&format!("{other:?}"))),
                    };
                    Ok(Type::Tuple(items))
                }
                "object" => {
                    let inner = single_arg(call)?;
                    let fields = match inner {
                        hcl::Expression::Object(obj) => {
                            let mut out = std::collections::BTreeMap::new();
                            for (k, v) in obj.iter() {
                                let key = object_key_to_string(k)?;
                                out.insert(key, parse_type_expr(v)?);
                            }
                            out
                        }
                        other => return Err(bad_type(&format!("{other:?}"))),
                    };
                    Ok(Type::Object(fields))
                }
                other => Err(bad_type(other)),
            }
        }

        other => Err(bad_type(&format!("{other:?}"))),
    }
}

fn single_arg(call: &hcl::expr::FuncCall) -> Result<&hcl::Expression, ConfigError> {
    if call.args.len() != 1 {
        return Err(bad_type(&format!(
            "{}(...) expects exactly one argument",
            call.name
        )));
    }
    Ok(&call.args[0])
}

fn parse_single_arg(call: &hcl::expr::FuncCall) -> Result<Type, ConfigError> {
    parse_type_expr(single_arg(call)?)
}

fn object_key_to_string(key: &hcl::expr::ObjectKey) -> Result<String, ConfigError> {
    match key {
        hcl::expr::ObjectKey::Identifier(ident) => Ok(ident.as_str().to_string()),
        hcl::expr::ObjectKey::Expression(hcl::Expression::String(s)) => Ok(s.clone()),
        other => Err(bad_type(&format!("{other:?}"))),
    }
}

fn bad_type(raw: &str) -> ConfigError {
    ConfigError::InvalidTypeExpression(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Type {
        let expr: hcl::Expression = src.parse().unwrap();
        parse_type_expr(&expr).unwrap()
    }

    #[test]
    fn bare_scalar_identifiers() {
        assert_eq!(parse("string"), Type::String);
        assert_eq!(parse("number"), Type::Number);
        assert_eq!(parse("bool"), Type::Bool);
        assert_eq!(parse("any"), Type::Dynamic);
    }

    #[test]
    fn list_and_set_and_map() {
        assert_eq!(parse("list(string)"), Type::List(Box::new(Type::String)));
        assert_eq!(parse("set(number)"), Type::Set(Box::new(Type::Number)));
        assert_eq!(parse("map(bool)"), Type::Map(Box::new(Type::Bool)));
    }

    #[test]
    fn nested_list_of_list() {
        assert_eq!(
            parse("list(list(string))"),
            Type::List(Box::new(Type::List(Box::new(Type::String))))
        );
    }

    #[test]
    fn object_type() {
        let ty = parse("object({name = string, port = number})");
        match ty {
            Type::Object(fields) => {
                assert_eq!(fields.get("name"), Some(&Type::String));
                assert_eq!(fields.get("port"), Some(&Type::Number));
            }
            other => panic!("expected object type, got {other:?}"),
        }
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let expr: hcl::Expression = "frobnicate".parse().unwrap();
        assert!(parse_type_expr(&expr).is_err());
    }

    #[test]
    fn wrong_arity_call_is_rejected() {
        let expr: hcl::Expression = "list(string, number)".parse().unwrap();
        assert!(parse_type_expr(&expr).is_err());
    }
}
