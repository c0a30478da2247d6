//! Standard function library (C3): string, collection, numeric, boolean,
//! conversion, and I/O functions, registered into an `hcl::eval::Context` as
//! typed `FuncDef`s so arity/type mismatches are rejected by the evaluator
//! itself (§4.3).

mod boolean;
mod collection;
mod conversion;
mod io;
mod numeric;
mod string;

use hcl::eval::Context;

/// Registers every standard and I/O function (§4.3) into `ctx`. `base_dir` is
/// the *effective base directory* used by `file()`/`template()` (role base
/// directory when evaluating inside a role, the main configuration directory
/// otherwise — see §4.3 and §4.9 step 5). `template_vars` is a snapshot of the
/// current evaluation context's variables, already flattened for `minijinja`
/// (§4.3): objects to string-keyed maps, numbers to doubles, lists to slices.
pub fn register_all(
    ctx: &mut Context,
    base_dir: &std::path::Path,
    template_vars: minijinja::Value,
) {
    string::register(ctx);
    collection::register(ctx);
    numeric::register(ctx);
    boolean::register(ctx);
    conversion::register(ctx);
    io::register(ctx, base_dir, template_vars);
}
