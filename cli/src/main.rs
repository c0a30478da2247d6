//! Main driver for `hostcfg`, a declarative host configuration engine.
//!
//! Usage:
//!
//! ```text
//! hostcfg [OPTIONS] <COMMAND>
//!
//! Commands:
//!   plan      Load and print the plan; never mutates the host
//!   apply     Load, plan, print, confirm, apply
//!   validate  Parse and validate the configuration only
//!   facts     Emit gathered facts
//!   version   Print version, commit, build date
//!
//! Options:
//!   -c, --config <CONFIG>  Configuration file or directory
//!   -e, --var <VAR>        Variable assignment NAME=VALUE
//!       --var-file <PATH>  Path to a variable file
//!       --no-color         Disable ANSI colors
//!   -v, --verbose...       Verbose mode
//!   -D, --debug            Debug mode
//! ```

mod cli;
mod error;
mod executor;
mod init;

use std::io::{self, Write};

use clap::Parser;
use eyre::{eyre, Result};
use tracing::trace;

use hostcfg_core::expr;
use hostcfg_core::printer::{Printer, TermPrinter};

use crate::cli::{ApplyOpts, FactsFormat, FactsOpts, Opts, SubCommand};
use crate::executor::Executor;
use crate::init::init_runtime;

/// Binary name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Binary version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Commit this binary was built from, embedded by `build.rs`.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};
/// Build date, embedded by `build.rs`.
pub const BUILD_DATE: &str = match option_env!("VERGEN_BUILD_TIMESTAMP") {
    Some(ts) => ts,
    None => "unknown",
};

fn main() -> Result<()> {
    color_eyre::install()?;
    let opts = Opts::parse();

    init_runtime(opts.verbose, opts.debug)?;
    trace!("executor starting");

    ctrlc::set_handler(|| {
        eprintln!("\ninterrupted");
        std::process::exit(1);
    })?;

    let executor = Executor::locate(opts.config.clone(), opts.var_file.clone(), opts.var.clone())?;
    let printer = TermPrinter::new(!opts.no_color);

    match &opts.subcmd {
        SubCommand::Plan => run_plan(&executor, &printer),
        SubCommand::Apply(aopts) => run_apply(&executor, &printer, aopts),
        SubCommand::Validate => run_validate(&executor),
        SubCommand::Facts(fopts) => run_facts(fopts),
        SubCommand::Version => {
            println!("{NAME} {VERSION} ({GIT_SHA}, built {BUILD_DATE})");
            Ok(())
        }
    }
}

fn run_plan(executor: &Executor, printer: &TermPrinter) -> Result<()> {
    let (_graph, result) = executor.plan()?;
    print_plan(printer, &result);
    Ok(())
}

fn run_apply(executor: &Executor, printer: &TermPrinter, opts: &ApplyOpts) -> Result<()> {
    let (graph, result) = executor.plan()?;
    print_plan(printer, &result);

    if !result.has_changes() {
        return Ok(());
    }
    if opts.dry_run {
        return Ok(());
    }
    if !opts.yes && !confirm()? {
        println!("Apply cancelled.");
        return Ok(());
    }

    executor.apply(&graph, &result)
}

fn run_validate(executor: &Executor) -> Result<()> {
    executor.validate()?;
    println!("Configuration is valid.");
    Ok(())
}

fn run_facts(opts: &FactsOpts) -> Result<()> {
    let facts = hostcfg_core::Facts::gather();
    let value = facts.to_value(!opts.no_env);
    let hcl_value = expr::value_to_hcl(&value);

    let rendered = match opts.format {
        FactsFormat::Hcl => hcl::to_string(&hcl_value).map_err(|e| eyre!(e))?,
        FactsFormat::Json => serde_json::to_string_pretty(&hcl_value)?,
        FactsFormat::Yaml => serde_yaml::to_string(&hcl_value)?,
    };
    println!("{rendered}");
    Ok(())
}

fn print_plan(printer: &TermPrinter, result: &executor::PlanResult) {
    if !result.has_changes() {
        printer.print_no_changes();
        return;
    }
    for id in &result.order {
        printer.print_plan(id, &result.plans[id]);
    }
    printer.print_summary(result.to_add, result.to_change, result.to_destroy, result.to_skip);
}

fn confirm() -> Result<bool> {
    print!("Do you want to apply these changes? Only 'yes' will be accepted: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "yes" || answer == "y")
}
