//! String functions (§4.3): `upper`, `lower`, `trim`, `trimprefix`, `trimsuffix`,
//! `trimspace`, `replace`, `substr`, `join`, `split`, `format`, `formatlist`.

use hcl::eval::{Context, FuncArgs, FuncDef, ParamType};
use hcl::Value;

pub fn register(ctx: &mut Context) {
    ctx.declare_func("upper", unary_str(|s| s.to_uppercase()));
    ctx.declare_func("lower", unary_str(|s| s.to_lowercase()));
    ctx.declare_func("trim", unary_str(|s| s.trim().to_string()));
    ctx.declare_func("trimspace", unary_str(|s| s.trim().to_string()));

    ctx.declare_func(
        "trimprefix",
        FuncDef::builder()
            .param(ParamType::String)
            .param(ParamType::String)
            .build(|args: FuncArgs| {
                let s = arg_str(&args, 0)?;
                let prefix = arg_str(&args, 1)?;
                Ok(Value::String(
                    s.strip_prefix(prefix.as_str()).unwrap_or(&s).to_string(),
                ))
            }),
    );

    ctx.declare_func(
        "trimsuffix",
        FuncDef::builder()
            .param(ParamType::String)
            .param(ParamType::String)
            .build(|args: FuncArgs| {
                let s = arg_str(&args, 0)?;
                let suffix = arg_str(&args, 1)?;
                Ok(Value::String(
                    s.strip_suffix(suffix.as_str()).unwrap_or(&s).to_string(),
                ))
            }),
    );

    ctx.declare_func(
        "replace",
        FuncDef::builder()
            .param(ParamType::String)
            .param(ParamType::String)
            .param(ParamType::String)
            .build(|args: FuncArgs| {
                let s = arg_str(&args, 0)?;
                let old = arg_str(&args, 1)?;
                let new = arg_str(&args, 2)?;
                Ok(Value::String(s.replace(old.as_str(), &new)))
            }),
    );

    ctx.declare_func(
        "substr",
        FuncDef::builder()
            .param(ParamType::String)
            .param(ParamType::Number)
            .param(ParamType::Number)
            .build(|args: FuncArgs| {
                let s = arg_str(&args, 0)?;
                let offset = arg_num(&args, 1)? as usize;
                let length = arg_num(&args, 2)? as usize;
                let chars: Vec<char> = s.chars().collect();
                let end = (offset + length).min(chars.len());
                let start = offset.min(chars.len());
                Ok(Value::String(chars[start..end].iter().collect()))
            }),
    );

    ctx.declare_func(
        "join",
        FuncDef::builder()
            .param(ParamType::String)
            .param(ParamType::Array(Box::new(ParamType::String)))
            .build(|args: FuncArgs| {
                let sep = arg_str(&args, 0)?;
                let items = arg_array(&args, 1)?;
                let strs: Vec<String> = items
                    .iter()
                    .map(|v| v.as_str().unwrap_or_default().to_string())
                    .collect();
                Ok(Value::String(strs.join(&sep)))
            }),
    );

    ctx.declare_func(
        "split",
        FuncDef::builder()
            .param(ParamType::String)
            .param(ParamType::String)
            .build(|args: FuncArgs| {
                let sep = arg_str(&args, 0)?;
                let s = arg_str(&args, 1)?;
                let parts: Vec<Value> = s
                    .split(sep.as_str())
                    .map(|p| Value::String(p.to_string()))
                    .collect();
                Ok(Value::Array(parts))
            }),
    );

    ctx.declare_func(
        "format",
        FuncDef::builder()
            .param(ParamType::String)
            .variadic_param(ParamType::Any)
            .build(|args: FuncArgs| {
                let fmt = arg_str(&args, 0)?;
                Ok(Value::String(simple_format(&fmt, &args[1..])))
            }),
    );

    ctx.declare_func(
        "formatlist",
        FuncDef::builder()
            .param(ParamType::String)
            .variadic_param(ParamType::Array(Box::new(ParamType::Any)))
            .build(|args: FuncArgs| {
                let fmt = arg_str(&args, 0)?;
                let lists: Vec<&[Value]> = args[1..]
                    .iter()
                    .map(|v| v.as_array().map(|a| a.as_slice()).unwrap_or(&[]))
                    .collect();
                let len = lists.iter().map(|l| l.len()).max().unwrap_or(0);
                let mut out = Vec::with_capacity(len);
                for i in 0..len {
                    let row: Vec<Value> = lists
                        .iter()
                        .map(|l| l.get(i % l.len().max(1)).cloned().unwrap_or(Value::Null))
                        .collect();
                    out.push(Value::String(simple_format(&fmt, &row)));
                }
                Ok(Value::Array(out))
            }),
    );
}

fn unary_str(f: impl Fn(&str) -> String + Send + Sync + 'static) -> FuncDef {
    FuncDef::builder()
        .param(ParamType::String)
        .build(move |args: FuncArgs| {
            let s = arg_str(&args, 0)?;
            Ok(Value::String(f(&s)))
        })
}

fn simple_format(fmt: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(fmt.len());
    let mut idx = 0;
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' && chars.peek() == Some(&'s') {
            chars.next();
            if let Some(v) = args.get(idx) {
                out.push_str(&value_to_display(v));
            }
            idx += 1;
        } else {
            out.push(c);
        }
    }
    out
}

fn value_to_display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn arg_str(args: &FuncArgs, i: usize) -> Result<String, String> {
    args.get(i)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| format!("argument {i} is not a string"))
}

pub(crate) fn arg_num(args: &FuncArgs, i: usize) -> Result<f64, String> {
    args.get(i)
        .and_then(|v| v.as_number())
        .and_then(|n| n.as_f64())
        .ok_or_else(|| format!("argument {i} is not a number"))
}

pub(crate) fn arg_array(args: &FuncArgs, i: usize) -> Result<Vec<Value>, String> {
    args.get(i)
        .and_then(|v| v.as_array())
        .cloned()
        .ok_or_else(|| format!("argument {i} is not an array"))
}
