//! Collection functions (§4.3): `length`, `coalesce`, `concat`, `contains`,
//! `distinct`, `flatten`, `keys`, `values`, `merge`, `reverse`, `sort`.

use hcl::eval::{Context, FuncArgs, FuncDef, ParamType};
use hcl::Value;

pub fn register(ctx: &mut Context) {
    ctx.declare_func(
        "length",
        FuncDef::builder()
            .param(ParamType::Any)
            .build(|args: FuncArgs| {
                let n = match &args[0] {
                    Value::Array(items) => items.len(),
                    Value::Object(m) => m.len(),
                    Value::String(s) => s.chars().count(),
                    Value::Null => 0,
                    _ => return Err("length() expects a collection or string".to_string()),
                };
                Ok(Value::from(n as f64))
            }),
    );

    ctx.declare_func(
        "coalesce",
        FuncDef::builder()
            .variadic_param(ParamType::Any)
            .build(|args: FuncArgs| {
                for v in args.iter() {
                    if !matches!(v, Value::Null) {
                        return Ok(v.clone());
                    }
                }
                Ok(Value::Null)
            }),
    );

    ctx.declare_func(
        "concat",
        FuncDef::builder()
            .variadic_param(ParamType::Array(Box::new(ParamType::Any)))
            .build(|args: FuncArgs| {
                let mut out = Vec::new();
                for v in args.iter() {
                    if let Value::Array(items) = v {
                        out.extend(items.iter().cloned());
                    }
                }
                Ok(Value::Array(out))
            }),
    );

    ctx.declare_func(
        "contains",
        FuncDef::builder()
            .param(ParamType::Array(Box::new(ParamType::Any)))
            .param(ParamType::Any)
            .build(|args: FuncArgs| {
                let items = args[0].as_array().cloned().unwrap_or_default();
                let needle = &args[1];
                Ok(Value::Bool(items.iter().any(|v| v == needle)))
            }),
    );

    ctx.declare_func(
        "distinct",
        FuncDef::builder()
            .param(ParamType::Array(Box::new(ParamType::Any)))
            .build(|args: FuncArgs| {
                let items = args[0].as_array().cloned().unwrap_or_default();
                let mut out: Vec<Value> = Vec::new();
                for item in items {
                    if !out.contains(&item) {
                        out.push(item);
                    }
                }
                Ok(Value::Array(out))
            }),
    );

    ctx.declare_func(
        "flatten",
        FuncDef::builder()
            .param(ParamType::Array(Box::new(ParamType::Any)))
            .build(|args: FuncArgs| {
                let items = args[0].as_array().cloned().unwrap_or_default();
                let mut out = Vec::new();
                flatten_into(&items, &mut out);
                Ok(Value::Array(out))
            }),
    );

    ctx.declare_func(
        "keys",
        FuncDef::builder()
            .param(ParamType::Object(Box::new(ParamType::Any)))
            .build(|args: FuncArgs| {
                let mut ks: Vec<String> = match &args[0] {
                    Value::Object(m) => m.keys().map(|k| k.to_string()).collect(),
                    _ => vec![],
                };
                ks.sort();
                Ok(Value::Array(ks.into_iter().map(Value::String).collect()))
            }),
    );

    ctx.declare_func(
        "values",
        FuncDef::builder()
            .param(ParamType::Object(Box::new(ParamType::Any)))
            .build(|args: FuncArgs| {
                let mut entries: Vec<(String, Value)> = match &args[0] {
                    Value::Object(m) => m.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
                    _ => vec![],
                };
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                Ok(Value::Array(entries.into_iter().map(|(_, v)| v).collect()))
            }),
    );

    ctx.declare_func(
        "merge",
        FuncDef::builder()
            .variadic_param(ParamType::Object(Box::new(ParamType::Any)))
            .build(|args: FuncArgs| {
                let mut out = hcl::Map::new();
                for v in args.iter() {
                    if let Value::Object(m) = v {
                        for (k, v) in m {
                            out.insert(k.clone(), v.clone());
                        }
                    }
                }
                Ok(Value::Object(out))
            }),
    );

    ctx.declare_func(
        "reverse",
        FuncDef::builder()
            .param(ParamType::Array(Box::new(ParamType::Any)))
            .build(|args: FuncArgs| {
                let mut items = args[0].as_array().cloned().unwrap_or_default();
                items.reverse();
                Ok(Value::Array(items))
            }),
    );

    ctx.declare_func(
        "sort",
        FuncDef::builder()
            .param(ParamType::Array(Box::new(ParamType::Any)))
            .build(|args: FuncArgs| {
                let mut items = args[0].as_array().cloned().unwrap_or_default();
                items.sort_by(|a, b| {
                    let sa = a.as_str().map(str::to_string).unwrap_or_else(|| a.to_string());
                    let sb = b.as_str().map(str::to_string).unwrap_or_else(|| b.to_string());
                    sa.cmp(&sb)
                });
                Ok(Value::Array(items))
            }),
    );
}

fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) => flatten_into(inner, out),
            other => out.push(other.clone()),
        }
    }
}
