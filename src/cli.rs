use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::ffi::OsString;

#[derive(Debug, Clone, Parser)]
#[command(name = "package-scanner")]
#[command(about = "List every class of a Java package across the directories and jars of a classpath")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Classpath entry, a class directory or a jar. Repeatable, and each value
    /// may itself be a platform path list. Defaults to $CLASSPATH, then `.`.
    #[arg(short = 'c', long = "classpath", value_name = "PATH", global = true)]
    pub classpath: Vec<OsString>,

    /// Raise log verbosity (-v debug, -vv trace). Overrides RUST_LOG.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// List the classes under a package.
    Scan {
        package: String,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(long)]
        sort: bool,

        /// Skip archives that cannot be opened and locations that cannot be
        /// decoded instead of failing.
        #[arg(long)]
        skip_errors: bool,

        #[arg(long)]
        parallel: bool,

        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },
    /// Show where a package is provided on the classpath.
    Locate {
        package: String,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
