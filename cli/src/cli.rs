//! Command-line surface (C11): `Opts`/`SubCommand`, in the manner of the
//! host project's `acutectl::cli`.

use std::path::PathBuf;

use clap::{crate_authors, crate_description, crate_name, crate_version, Parser};

/// hostcfg: a declarative host configuration engine.
#[derive(Parser)]
#[clap(name = crate_name!(), about = crate_description!())]
#[clap(version = crate_version!(), author = crate_authors!())]
pub struct Opts {
    /// Configuration file or directory.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// Variable assignment, `NAME=VALUE`. May be repeated.
    #[clap(short = 'e', long = "var")]
    pub var: Vec<String>,
    /// Path to a variable file. May be repeated; later files win ties.
    #[clap(long = "var-file")]
    pub var_file: Vec<PathBuf>,
    /// Disable ANSI colors in the printer.
    #[clap(long)]
    pub no_color: bool,
    /// Verbose mode, can be repeated (-v, -vv).
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Debug mode: trace verbosity plus the hierarchical log tree.
    #[clap(short = 'D', long = "debug")]
    pub debug: bool,
    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Debug, Parser)]
pub enum SubCommand {
    /// Load and print the plan; never mutates the host.
    Plan,
    /// Load, plan, print, confirm, apply.
    Apply(ApplyOpts),
    /// Parse and validate the configuration only; no Read calls.
    Validate,
    /// Emit gathered facts.
    Facts(FactsOpts),
    /// Print version, commit, build date.
    Version,
}

#[derive(Debug, Parser)]
pub struct ApplyOpts {
    /// Print the plan and stop; do not apply.
    #[clap(long)]
    pub dry_run: bool,
    /// Skip the interactive confirmation prompt.
    #[clap(short = 'y', long = "yes", visible_alias = "auto-approve")]
    pub yes: bool,
}

#[derive(Debug, Parser)]
pub struct FactsOpts {
    /// Output format.
    #[clap(long, default_value = "hcl")]
    pub format: FactsFormat,
    /// Omit the process environment from the output.
    #[clap(long)]
    pub no_env: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum FactsFormat {
    Hcl,
    Json,
    Yaml,
}
