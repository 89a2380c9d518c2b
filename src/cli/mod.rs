//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Concurrent test runner for stdin/stdout programs
#[derive(Parser, Debug)]
#[command(name = "javatest")]
#[command(version)]
#[command(about = "Compile a Java program and run it against a directory of test cases")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and run the test suite
    Run(RunArgs),

    /// List the test files that would be run
    List(ListArgs),

    /// Show or initialise configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Source path for java source files
    #[arg(short = 's', long)]
    pub src_dir: Option<PathBuf>,

    /// Output directory for the class files
    #[arg(short = 'o', long)]
    pub bin_dir: Option<PathBuf>,

    /// Test files directory
    #[arg(short = 't', long)]
    pub test_dir: Option<PathBuf>,

    /// Entry point of the java program
    #[arg(short = 'm', long)]
    pub entry: Option<String>,

    /// Release version for the java compiler
    #[arg(short = 'r', long)]
    pub release: Option<u32>,

    /// Number of concurrent test tasks
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Per-test deadline in seconds (0 disables it)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Run this program instead of `java -cp <bin> <entry>`
    #[arg(long)]
    pub program: Option<String>,

    /// Argument for --program (repeatable)
    #[arg(long = "arg", requires = "program", allow_hyphen_values = true)]
    pub program_args: Vec<String>,

    /// Skip the javac step
    #[arg(long)]
    pub skip_compile: bool,

    /// Output format (table, json, json-pretty, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Also save the summary as JSON to this file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Test files directory
    #[arg(short = 't', long)]
    pub test_dir: Option<PathBuf>,

    /// Show parsed input/output sizes
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as YAML
    Show,

    /// Write a default configuration file
    Init {
        /// Destination path
        #[arg(default_value = "javatest.yaml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Describe the supported environment variables
    Env,
}
