//! Output formatters for run summaries
//!
//! Provides colored table, JSON, and one-line summary output.

use std::io::Write;
use std::path::Path;

use crate::models::{FailureRecord, Summary};

const RESET: &str = "\x1b[0m";
const GREEN: &str = "\x1b[32m";
const FAIL_BANNER: &str = "\x1b[1;37;41m";

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Summary formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a run summary
    pub fn format_summary(&self, summary: &Summary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn paint(&self, style: &str, text: &str) -> String {
        if self.colorize {
            format!("{style}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn format_failure(&self, index: usize, failure: &FailureRecord) -> String {
        let mut output = String::new();
        let banner = format!("Test ({index})");
        output.push_str(&format!(
            "{} {} [{}]\n",
            self.paint(FAIL_BANNER, &banner),
            failure.name,
            failure.kind
        ));
        output.push_str("\tExpected:\n");
        output.push_str(&format!("\t{}\n", indent(&failure.expected)));
        output.push_str("\tGot:\n");
        output.push_str(&format!("\t{}\n\n", indent(&failure.got)));
        output
    }

    fn format_summary_table(&self, summary: &Summary) -> String {
        let mut output = String::new();

        let counts = format!("({}/{})", summary.passed, summary.total);
        let counts = if summary.is_all_passed() {
            self.paint(GREEN, &counts)
        } else {
            counts
        };
        output.push_str(&format!("Successful Tests {counts}\n"));

        if !summary.failed.is_empty() {
            output.push_str("\nFailed Tests: \n");
            for (i, failure) in summary.failed.iter().enumerate() {
                output.push_str(&self.format_failure(i, failure));
            }
        }

        output.push_str(&format!("Finished in {:?}", summary.elapsed));
        output
    }

    fn format_summary_brief(&self, summary: &Summary) -> String {
        format!(
            "{}/{} passed ({:.1}%), {} failed in {}ms",
            summary.passed,
            summary.total,
            summary.pass_rate(),
            summary.failed_count(),
            summary.elapsed.as_millis()
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Keep multi-line text aligned under its tab-indented heading
fn indent(text: &str) -> String {
    text.replace('\n', "\n\t")
}

/// Save a summary as pretty JSON
pub fn write_summary_to_file(path: impl AsRef<Path>, summary: &Summary) -> anyhow::Result<()> {
    let formatter = ResultFormatter::new(OutputFormat::JsonPretty).no_color();
    let content = formatter.format_summary(summary);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
