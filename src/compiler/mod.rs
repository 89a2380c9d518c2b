//! Java compilation step
//!
//! Runs `javac` once, before the suite, with no deadline.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;
use crate::executor::{ProcessRunner, Target};
use crate::models::ExecutionOutcome;

/// Compilation errors
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Error while looking for source files in {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Did not find any {pattern} files in {}", .path.display())]
    NoSources { path: PathBuf, pattern: String },

    #[error("Failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error while compiling program: {0}")]
    Failed(String),
}

/// Collect files in `dir` whose name contains `.<extension>`, sorted
pub fn find_sources(dir: impl AsRef<Path>, extension: &str) -> Result<Vec<PathBuf>, CompileError> {
    let dir = dir.as_ref();
    let pattern = format!(".{}", extension.trim_start_matches('.'));
    let read_err = |source| CompileError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut sources = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if entry.file_name().to_string_lossy().contains(&pattern) && entry.path().is_file() {
            sources.push(entry.path());
        }
    }

    if sources.is_empty() {
        return Err(CompileError::NoSources {
            path: dir.to_path_buf(),
            pattern,
        });
    }

    sources.sort();
    Ok(sources)
}

/// `javac` invocation settings
#[derive(Clone, Debug)]
pub struct JavaCompiler {
    javac: String,
    release: u32,
    out_dir: PathBuf,
    runner: ProcessRunner,
}

impl JavaCompiler {
    pub fn new(javac: impl Into<String>, release: u32, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            javac: javac.into(),
            release,
            out_dir: out_dir.into(),
            runner: ProcessRunner::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.javac, config.release, &config.bin_dir)
            .with_runner(ProcessRunner::new().with_max_output(config.max_output_bytes))
    }

    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    /// `javac --release <n> -d <out> <files...>`
    pub fn command(&self, files: &[PathBuf]) -> Target {
        Target::new(&self.javac)
            .arg("--release")
            .arg(self.release.to_string())
            .arg("-d")
            .arg(self.out_dir.display().to_string())
            .args(files.iter().map(|f| f.display().to_string()))
    }

    /// Compile `files`; waits for javac without a deadline
    pub async fn compile(&self, files: &[PathBuf]) -> Result<(), CompileError> {
        fs::create_dir_all(&self.out_dir).map_err(|source| CompileError::OutputDir {
            path: self.out_dir.clone(),
            source,
        })?;

        let command = self.command(files);
        info!("Compiling files: {}", join_paths(files));

        match self.runner.run_target(&command, None, Duration::ZERO).await {
            ExecutionOutcome::Success(_) => Ok(()),
            failed => Err(CompileError::Failed(failed.to_string())),
        }
    }
}

fn join_paths(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|f| f.display().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_find_sources() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Main.java"), "class Main {}").unwrap();
        fs::write(dir.path().join("Util.java"), "class Util {}").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let sources = find_sources(dir.path(), "java").unwrap();
        let names: Vec<_> = sources
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Main.java", "Util.java"]);
    }

    #[test]
    fn test_find_sources_none() {
        let dir = tempdir().unwrap();
        let err = find_sources(dir.path(), "java").unwrap_err();
        assert!(matches!(err, CompileError::NoSources { .. }));
    }

    #[test]
    fn test_command_line() {
        let compiler = JavaCompiler::new("javac", 11, "bin");
        let target = compiler.command(&[PathBuf::from("src/Main.java")]);
        assert_eq!(target.to_string(), "javac --release 11 -d bin src/Main.java");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compile_success_creates_out_dir() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("classes");

        let compiler = JavaCompiler::new("true", 8, &out);
        compiler
            .compile(&[PathBuf::from("Main.java")])
            .await
            .unwrap();
        assert!(out.is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compile_failure() {
        let dir = tempdir().unwrap();
        let compiler = JavaCompiler::new("false", 8, dir.path());

        let err = compiler
            .compile(&[PathBuf::from("Main.java")])
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error while compiling program"));
    }
}
