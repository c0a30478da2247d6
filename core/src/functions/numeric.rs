//! Numeric functions (§4.3): `abs`, `ceil`, `floor`, `max`, `min`.

use hcl::eval::{Context, FuncArgs, FuncDef, ParamType};
use hcl::Value;

use super::string::arg_num;

pub fn register(ctx: &mut Context) {
    ctx.declare_func(
        "abs",
        FuncDef::builder()
            .param(ParamType::Number)
            .build(|args: FuncArgs| Ok(Value::from(arg_num(&args, 0)?.abs()))),
    );
    ctx.declare_func(
        "ceil",
        FuncDef::builder()
            .param(ParamType::Number)
            .build(|args: FuncArgs| Ok(Value::from(arg_num(&args, 0)?.ceil()))),
    );
    ctx.declare_func(
        "floor",
        FuncDef::builder()
            .param(ParamType::Number)
            .build(|args: FuncArgs| Ok(Value::from(arg_num(&args, 0)?.floor()))),
    );
    ctx.declare_func(
        "max",
        FuncDef::builder()
            .variadic_param(ParamType::Number)
            .build(|args: FuncArgs| {
                let mut best = f64::NEG_INFINITY;
                for i in 0..args.len() {
                    best = best.max(arg_num(&args, i)?);
                }
                Ok(Value::from(best))
            }),
    );
    ctx.declare_func(
        "min",
        FuncDef::builder()
            .variadic_param(ParamType::Number)
            .build(|args: FuncArgs| {
                let mut best = f64::INFINITY;
                for i in 0..args.len() {
                    best = best.min(arg_num(&args, i)?);
                }
                Ok(Value::from(best))
            }),
    );
}

#[cfg(test)]
mod tests {
    use crate::expr::eval_literal;

    #[test]
    fn abs_ceil_floor() {
        assert_eq!(eval_literal("abs(-3)").unwrap().as_number().unwrap().as_f64(), 3.0);
        assert_eq!(eval_literal("ceil(1.2)").unwrap().as_number().unwrap().as_f64(), 2.0);
        assert_eq!(eval_literal("floor(1.8)").unwrap().as_number().unwrap().as_f64(), 1.0);
    }

    #[test]
    fn max_and_min_pick_the_extremes() {
        assert_eq!(eval_literal("max(1, 5, 3)").unwrap().as_number().unwrap().as_f64(), 5.0);
        assert_eq!(eval_literal("min(1, 5, 3)").unwrap().as_number().unwrap().as_f64(), 1.0);
    }
}
