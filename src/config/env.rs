//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "JAVATEST";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Worker count from JAVATEST_CONCURRENCY
    pub concurrency: Option<usize>,
    /// Per-case deadline from JAVATEST_TIMEOUT
    pub timeout: Option<u64>,
    /// Source directory from JAVATEST_SRC_DIR
    pub src_dir: Option<String>,
    /// Class output directory from JAVATEST_BIN_DIR
    pub bin_dir: Option<String>,
    /// Test directory from JAVATEST_TEST_DIR
    pub test_dir: Option<String>,
    /// Entry class from JAVATEST_ENTRY
    pub entry: Option<String>,
    /// javac release from JAVATEST_RELEASE
    pub release: Option<u32>,
    /// Config file from JAVATEST_CONFIG
    pub config_file: Option<String>,
    /// Verbose from JAVATEST_VERBOSE
    pub verbose: Option<bool>,
    /// Output format from JAVATEST_FORMAT
    pub format: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, keyed by the full variable name
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));

        Self {
            concurrency: parse(get("CONCURRENCY")),
            timeout: parse(get("TIMEOUT")),
            src_dir: get("SRC_DIR"),
            bin_dir: get("BIN_DIR"),
            test_dir: get("TEST_DIR"),
            entry: get("ENTRY"),
            release: parse(get("RELEASE")),
            config_file: get("CONFIG"),
            verbose: get("VERBOSE").map(|v| is_truthy(&v)),
            format: get("FORMAT"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.concurrency.is_some()
            || self.timeout.is_some()
            || self.src_dir.is_some()
            || self.bin_dir.is_some()
            || self.test_dir.is_some()
            || self.entry.is_some()
            || self.release.is_some()
            || self.config_file.is_some()
            || self.verbose.is_some()
            || self.format.is_some()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_CONCURRENCY: {:?}", ENV_PREFIX, self.concurrency);
        println!("  {}_TIMEOUT:     {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_SRC_DIR:     {:?}", ENV_PREFIX, self.src_dir);
        println!("  {}_BIN_DIR:     {:?}", ENV_PREFIX, self.bin_dir);
        println!("  {}_TEST_DIR:    {:?}", ENV_PREFIX, self.test_dir);
        println!("  {}_ENTRY:       {:?}", ENV_PREFIX, self.entry);
        println!("  {}_RELEASE:     {:?}", ENV_PREFIX, self.release);
        println!("  {}_CONFIG:      {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_VERBOSE:     {:?}", ENV_PREFIX, self.verbose);
        println!("  {}_FORMAT:      {:?}", ENV_PREFIX, self.format);
    }
}

fn parse<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.parse().ok())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

/// Print all JAVATEST environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_CONCURRENCY  Number of concurrent test workers");
    println!("  {ENV_PREFIX}_TIMEOUT      Per-test deadline in seconds (0 = none)");
    println!("  {ENV_PREFIX}_SRC_DIR      Java source directory");
    println!("  {ENV_PREFIX}_BIN_DIR      Output directory for class files");
    println!("  {ENV_PREFIX}_TEST_DIR     Test case directory");
    println!("  {ENV_PREFIX}_ENTRY        Entry point class");
    println!("  {ENV_PREFIX}_RELEASE      javac --release value");
    println!("  {ENV_PREFIX}_CONFIG       Path to configuration file");
    println!("  {ENV_PREFIX}_VERBOSE      Enable verbose output (true/false)");
    println!("  {ENV_PREFIX}_FORMAT       Output format (table, json, json-pretty, summary)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_CONCURRENCY=8");
    println!("  javatest run");
}
