//! Printer (C14, ambient default implementation): `similar` unified diffs +
//! `ansi_term` colorization behind a swappable `Printer` trait, per §4.14/§6.

use ansi_term::Color;
use similar::TextDiff;

use crate::resources::{Action, Plan};
use crate::value::Value;

/// `{print_plan, print_summary, print_no_changes}` per §6. Responsible for
/// colorization and unified-diff rendering of multi-line string changes.
pub trait Printer {
    fn print_plan(&self, id: &str, plan: &Plan);
    fn print_summary(&self, to_add: usize, to_change: usize, to_destroy: usize, to_skip: usize);
    fn print_no_changes(&self);
}

/// The shipped default implementation. `--no-color` or a non-tty stdout
/// disables `ansi_term` styling but keeps the glyphs and diff structure.
pub struct TermPrinter {
    pub color: bool,
}

impl TermPrinter {
    pub fn new(color: bool) -> Self {
        TermPrinter { color }
    }

    fn style(&self, color: Color, s: &str) -> String {
        if self.color {
            color.paint(s).to_string()
        } else {
            s.to_string()
        }
    }

    fn glyph_and_color(action: Action) -> (&'static str, Color) {
        match action {
            Action::Create => ("+", Color::Green),
            Action::Update => ("~", Color::Yellow),
            Action::Delete => ("-", Color::Red),
            Action::Noop | Action::Skip => ("\u{b7}", Color::Fixed(8)),
        }
    }

    fn render_value(v: &Value) -> String {
        match v {
            Value::String(s) => s.clone(),
            other => format!("{other:?}"),
        }
    }
}

impl Printer for TermPrinter {
    fn print_plan(&self, id: &str, plan: &Plan) {
        let (glyph, color) = Self::glyph_and_color(plan.action);
        println!("{} {id} ({})", self.style(color, glyph), plan.action);

        if let Some(reason) = &plan.skip_reason {
            println!("    skipped: {reason}");
            return;
        }

        for change in &plan.changes {
            let old = change.old.as_ref().map(Self::render_value);
            let new = change.new.as_ref().map(Self::render_value);

            match (&old, &new) {
                (Some(o), Some(n)) if o.contains('\n') && n.contains('\n') => {
                    println!("    {}:", change.attribute);
                    let diff = TextDiff::from_lines(o, n);
                    for hunk in diff.unified_diff().context_radius(2).iter_hunks() {
                        for line in format!("{hunk}").lines() {
                            println!("      {line}");
                        }
                    }
                }
                _ => {
                    println!(
                        "    {}: {} -> {}",
                        change.attribute,
                        old.as_deref().unwrap_or("null"),
                        new.as_deref().unwrap_or("null"),
                    );
                }
            }
        }
    }

    fn print_summary(&self, to_add: usize, to_change: usize, to_destroy: usize, to_skip: usize) {
        println!(
            "Plan: {} to add, {} to change, {} to destroy, {} to skip.",
            to_add, to_change, to_destroy, to_skip
        );
    }

    fn print_no_changes(&self) {
        println!("No changes. Configuration already matches desired state.");
    }
}
