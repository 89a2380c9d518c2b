//! javatest - concurrent test runner for stdin/stdout programs
//!
//! Compiles a Java program once, then runs it against every test file in a
//! directory, several cases at a time, with a per-case deadline.
//!
//! ## Features
//!
//! - Parallel execution with a fixed worker pool
//! - Deadline enforcement that kills runaway programs
//! - Whitespace-insensitive output comparison
//! - Table, JSON, and summary output formats
//!
//! ## Usage
//!
//! ```bash
//! # Compile src/*.java and run tests/*.javatest with 4 workers
//! javatest run -c 4
//!
//! # Run an arbitrary program against the same test files
//! javatest run --program python3 --arg solve.py
//!
//! # List discovered test files
//! javatest list --detailed
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

mod cli;
mod compiler;
mod config;
mod executor;
mod models;
mod output;
mod suite;
mod utils;

use cli::Args;
use compiler::{find_sources, JavaCompiler};
use config::{AppConfig, EnvConfig};
use executor::{Harness, Target};
use output::{OutputFormat, ResultFormatter};
use suite::TestSuite;
use utils::logger::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    init_logger(LogLevel::from_verbose(
        args.verbose || env.verbose.unwrap_or(false),
    ));

    let config_path = args
        .config
        .clone()
        .or_else(|| env.config_file.as_ref().map(Into::into));
    let config = AppConfig::resolve(config_path.as_deref())?.merge_env(&env);

    match args.command {
        cli::Command::Run(run_args) => {
            let all_passed = run_suite(config, &env, run_args).await?;
            if !all_passed {
                std::process::exit(1);
            }
        }
        cli::Command::List(list_args) => {
            list_tests(&config, list_args)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(&config, config_args)?;
        }
    }

    Ok(())
}

fn apply_run_args(mut config: AppConfig, args: &cli::RunArgs) -> AppConfig {
    if let Some(v) = &args.src_dir {
        config.src_dir = v.clone();
    }
    if let Some(v) = &args.bin_dir {
        config.bin_dir = v.clone();
    }
    if let Some(v) = &args.test_dir {
        config.test_dir = v.clone();
    }
    if let Some(v) = &args.entry {
        config.entry = v.clone();
    }
    if let Some(v) = args.release {
        config.release = v;
    }
    if let Some(v) = args.concurrency {
        config.concurrency = v;
    }
    if let Some(v) = args.timeout {
        config.timeout_secs = v;
    }
    config
}

async fn run_suite(config: AppConfig, env: &EnvConfig, args: cli::RunArgs) -> Result<bool> {
    let config = apply_run_args(config, &args);
    config.validate()?;

    let format_name = args
        .format
        .clone()
        .or_else(|| env.format.clone())
        .unwrap_or_else(|| "table".to_string());
    let format = OutputFormat::from_str(&format_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {format_name}"))?;

    let suite = TestSuite::open(&config.test_dir, &config.test_extension)?;

    let target = match &args.program {
        Some(program) => Target::new(program).args(args.program_args.iter().cloned()),
        None => {
            if !args.skip_compile {
                let sources = find_sources(&config.src_dir, &config.source_extension)?;
                JavaCompiler::from_config(&config).compile(&sources).await?;
            }
            Target::java(
                &config.java,
                &config.bin_dir.display().to_string(),
                &config.entry,
            )
        }
    };

    info!(
        "Running {} tests against `{}` ({} workers, {}s deadline)",
        suite.len(),
        target,
        config.concurrency,
        config.timeout_secs
    );

    let summary = Harness::from_config(&config, target).run(suite).await?;

    let mut formatter = ResultFormatter::new(format);
    if args.no_color {
        formatter = formatter.no_color();
    }
    println!("{}", formatter.format_summary(&summary));

    if let Some(path) = &args.output {
        output::write_summary_to_file(path, &summary)
            .with_context(|| format!("Failed to save summary to {}", path.display()))?;
        info!("Summary saved to {}", path.display());
    }

    Ok(summary.is_all_passed())
}

fn list_tests(config: &AppConfig, args: cli::ListArgs) -> Result<()> {
    let test_dir = args.test_dir.as_ref().unwrap_or(&config.test_dir);
    let suite = TestSuite::open(test_dir, &config.test_extension)?;

    println!(
        "\nTest files in {} ({} total)\n",
        suite.dir().display(),
        suite.len()
    );

    if args.detailed {
        for case in suite {
            println!(
                "  {:30} in: {:>6} bytes  out: {:>6} bytes",
                case.name(),
                case.input().len(),
                case.expected_output().len()
            );
        }
    } else {
        for file in suite.files() {
            println!("  {}", file.display());
        }
    }
    println!();

    Ok(())
}

fn manage_config(config: &AppConfig, args: cli::ConfigArgs) -> Result<()> {
    match args.action {
        cli::ConfigAction::Show => {
            print!("{}", serde_yaml::to_string(config)?);
        }
        cli::ConfigAction::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            AppConfig::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        cli::ConfigAction::Env => {
            config::print_env_help();
            println!();
            EnvConfig::load().print_summary();
        }
    }

    Ok(())
}
