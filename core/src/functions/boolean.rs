//! Boolean functions (§4.3): `not`, `and`, `or`.
//!
//! The configuration language already has `!`, `&&`, `||` operators handled
//! directly by `hcl-rs`'s own evaluator (§4.2); these function forms exist
//! for use in pipelines like `list.map(not)`-style expressions and parity
//! with the rest of the standard library's function-call surface.

use hcl::eval::{Context, FuncArgs, FuncDef, ParamType};
use hcl::Value;

pub fn register(ctx: &mut Context) {
    ctx.declare_func(
        "not",
        FuncDef::builder()
            .param(ParamType::Bool)
            .build(|args: FuncArgs| Ok(Value::Bool(!arg_bool(&args, 0)?))),
    );
    ctx.declare_func(
        "and",
        FuncDef::builder()
            .variadic_param(ParamType::Bool)
            .build(|args: FuncArgs| {
                let mut result = true;
                for i in 0..args.len() {
                    result &= arg_bool(&args, i)?;
                }
                Ok(Value::Bool(result))
            }),
    );
    ctx.declare_func(
        "or",
        FuncDef::builder()
            .variadic_param(ParamType::Bool)
            .build(|args: FuncArgs| {
                let mut result = false;
                for i in 0..args.len() {
                    result |= arg_bool(&args, i)?;
                }
                Ok(Value::Bool(result))
            }),
    );
}

fn arg_bool(args: &FuncArgs, i: usize) -> Result<bool, String> {
    args.get(i)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| format!("argument {i} is not a bool"))
}
