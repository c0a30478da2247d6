//! I/O functions (§4.3): `env`, `file`, `basename`, `dirname`, `template`.
//!
//! These are the only impure functions in the standard library: they read the
//! process environment or the filesystem once per call.

use std::path::{Path, PathBuf};

use hcl::eval::{Context, FuncArgs, FuncDef, ParamType};
use hcl::Value;

pub fn register(ctx: &mut Context, base_dir: &Path, template_vars: minijinja::Value) {
    ctx.declare_func(
        "env",
        FuncDef::builder()
            .param(ParamType::String)
            .build(|args: FuncArgs| {
                let name = args[0].as_str().unwrap_or_default();
                Ok(Value::String(std::env::var(name).unwrap_or_default()))
            }),
    );

    let read_base = base_dir.to_path_buf();
    ctx.declare_func(
        "file",
        FuncDef::builder()
            .param(ParamType::String)
            .build(move |args: FuncArgs| {
                let rel = args[0].as_str().unwrap_or_default();
                let path = resolve(&read_base, rel);
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| format!("file(\"{}\"): {e}", path.display()))?;
                Ok(Value::String(trim_one_trailing_newline(&content)))
            }),
    );

    ctx.declare_func(
        "basename",
        FuncDef::builder()
            .param(ParamType::String)
            .build(|args: FuncArgs| {
                let p = args[0].as_str().unwrap_or_default();
                let name = Path::new(p)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                Ok(Value::String(name))
            }),
    );

    ctx.declare_func(
        "dirname",
        FuncDef::builder()
            .param(ParamType::String)
            .build(|args: FuncArgs| {
                let p = args[0].as_str().unwrap_or_default();
                let dir = Path::new(p)
                    .parent()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                Ok(Value::String(dir))
            }),
    );

    let tmpl_base = base_dir.to_path_buf();
    ctx.declare_func(
        "template",
        FuncDef::builder()
            .param(ParamType::String)
            .build(move |args: FuncArgs| {
                let rel = args[0].as_str().unwrap_or_default();
                let path = resolve(&tmpl_base, rel);
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| format!("template(\"{}\"): {e}", path.display()))?;

                let mut env = minijinja::Environment::new();
                env.add_template("tpl", &content)
                    .map_err(|e| format!("template(\"{}\"): {e}", path.display()))?;
                let tpl = env
                    .get_template("tpl")
                    .map_err(|e| e.to_string())?;

                let rendered = tpl
                    .render(template_vars.clone())
                    .map_err(|e| format!("template(\"{}\"): {e}", path.display()))?;
                Ok(Value::String(rendered))
            }),
    );
}

fn resolve(base: &Path, rel: &str) -> PathBuf {
    let p = Path::new(rel);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn trim_one_trailing_newline(s: &str) -> String {
    if let Some(stripped) = s.strip_suffix("\r\n") {
        stripped.to_string()
    } else if let Some(stripped) = s.strip_suffix('\n') {
        stripped.to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::{eval_expr, EvalContext};

    #[test]
    fn env_reads_the_process_environment() {
        std::env::set_var("HOSTCFG_IO_FN_TEST_VAR", "fixture-value");
        let expr: hcl::Expression = r#"env("HOSTCFG_IO_FN_TEST_VAR")"#.parse().unwrap();
        let value = eval_expr(&expr, &EvalContext::empty()).unwrap();
        assert_eq!(value.as_str(), Some("fixture-value"));
        std::env::remove_var("HOSTCFG_IO_FN_TEST_VAR");
    }

    #[test]
    fn env_defaults_to_empty_string_for_unset_variables() {
        let expr: hcl::Expression = r#"env("HOSTCFG_IO_FN_TEST_VAR_UNSET")"#.parse().unwrap();
        let value = eval_expr(&expr, &EvalContext::empty()).unwrap();
        assert_eq!(value.as_str(), Some(""));
    }

    #[test]
    fn file_reads_a_file_relative_to_the_base_dir_and_trims_one_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("motd"), "welcome\n").unwrap();
        let ctx = EvalContext::new(dir.path());
        let expr: hcl::Expression = r#"file("motd")"#.parse().unwrap();
        let value = eval_expr(&expr, &ctx).unwrap();
        assert_eq!(value.as_str(), Some("welcome"));
    }

    #[test]
    fn file_reports_an_error_for_a_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = EvalContext::new(dir.path());
        let expr: hcl::Expression = r#"file("missing")"#.parse().unwrap();
        assert!(eval_expr(&expr, &ctx).is_err());
    }

    #[test]
    fn basename_and_dirname_split_a_path() {
        let expr: hcl::Expression = r#"basename("/etc/hostcfg/hostcfg.hcl")"#.parse().unwrap();
        let value = eval_expr(&expr, &EvalContext::empty()).unwrap();
        assert_eq!(value.as_str(), Some("hostcfg.hcl"));

        let expr: hcl::Expression = r#"dirname("/etc/hostcfg/hostcfg.hcl")"#.parse().unwrap();
        let value = eval_expr(&expr, &EvalContext::empty()).unwrap();
        assert_eq!(value.as_str(), Some("/etc/hostcfg"));
    }

    #[test]
    fn template_renders_a_minijinja_template_against_the_context_variables() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("greeting.tmpl"), "hello {{ var.name }}").unwrap();
        let mut vars = std::collections::BTreeMap::new();
        vars.insert("name".to_string(), crate::value::Value::String("alice".to_string()));
        let ctx = EvalContext::new(dir.path()).with_namespace("var", crate::value::Value::Object(vars));
        let expr: hcl::Expression = r#"template("greeting.tmpl")"#.parse().unwrap();
        let value = eval_expr(&expr, &ctx).unwrap();
        assert_eq!(value.as_str(), Some("hello alice"));
    }
}
