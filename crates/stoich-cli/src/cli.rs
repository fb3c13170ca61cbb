use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "stoich - compile chemical reaction networks into stoichiometry matrices and rate-term arrays for kinetic solvers.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile the reaction system of one compartment and report its layout.
    Compile(CompileArgs),
    /// List the model objects matching a wildcard path.
    Find(FindArgs),
}

/// Arguments for the `compile` subcommand.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Path to the model definition file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub model: PathBuf,

    /// Path to the build configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Write the compile report to this TOML file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print the stoichiometry matrix and include it in the report.
    #[arg(long)]
    pub matrix: bool,

    /// Override `options.one-way` from the config file.
    #[command(flatten)]
    pub mode: ReactionMode,

    /// Let pool counts go negative, overriding the config file.
    #[arg(long)]
    pub allow_negative: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S options.one-way=true
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Mutually exclusive flags choosing how reversible reactions are installed.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct ReactionMode {
    /// Split reversible reactions into separate forward and reverse terms.
    #[arg(long)]
    pub one_way: bool,
    /// Install reversible reactions as one composite term.
    #[arg(long)]
    pub combined: bool,
}

/// Arguments for the `find` subcommand.
#[derive(Args, Debug)]
pub struct FindArgs {
    /// Path to the model definition file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub model: PathBuf,

    /// Wildcard path, e.g. '/cyt/##' or '/cyt/#'.
    #[arg(required = true)]
    pub pattern: String,
}
