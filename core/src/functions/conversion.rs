//! Conversion functions (§4.3): `tostring`, `tonumber`, `tobool`, `toset`, `tomap`.

use hcl::eval::{Context, FuncArgs, FuncDef, ParamType};
use hcl::Value;

pub fn register(ctx: &mut Context) {
    ctx.declare_func(
        "tostring",
        FuncDef::builder()
            .param(ParamType::Any)
            .build(|args: FuncArgs| {
                let s = match &args[0] {
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                Ok(Value::String(s))
            }),
    );

    ctx.declare_func(
        "tonumber",
        FuncDef::builder()
            .param(ParamType::Any)
            .build(|args: FuncArgs| match &args[0] {
                Value::Number(n) => Ok(Value::Number(n.clone())),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| format!("cannot convert \"{s}\" to number")),
                _ => Err("cannot convert to number".to_string()),
            }),
    );

    ctx.declare_func(
        "tobool",
        FuncDef::builder()
            .param(ParamType::Any)
            .build(|args: FuncArgs| match &args[0] {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::String(s) => match s.as_str() {
                    "true" | "True" | "TRUE" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                    "false" | "False" | "FALSE" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                    other => Err(format!("cannot convert \"{other}\" to bool")),
                },
                _ => Err("cannot convert to bool".to_string()),
            }),
    );

    ctx.declare_func(
        "toset",
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
        "tomap",
        FuncDef::builder()
            .param(ParamType::Object(Box::new(ParamType::Any)))
            .build(|args: FuncArgs| match &args[0] {
                Value::Object(m) => Ok(Value::Object(m.clone())),
                _ => Err("cannot convert to map".to_string()),
            }),
    );
}
