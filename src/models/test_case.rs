//! Test case and failure models
//!
//! Defines the unit of work handed to workers and the record kept for
//! every case that did not pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One input/expected-output pair to run against the target program
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    name: String,
    input: Vec<u8>,
    expected_output: Vec<u8>,
}

impl TestCase {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<Vec<u8>>,
        expected_output: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }

    pub fn expected_output(&self) -> &[u8] {
        &self.expected_output
    }

    /// Split the case into its parts, handing the input buffer to the caller
    pub fn into_parts(self) -> (String, Vec<u8>, Vec<u8>) {
        (self.name, self.input, self.expected_output)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes in)", self.name, self.input.len())
    }
}

/// Why a test case was recorded as failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The program could not be started
    Startup,
    /// The program ran past the deadline and was killed
    Timeout,
    /// The program exited with an error status
    Runtime,
    /// The program succeeded but printed the wrong answer
    Mismatch,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Startup => write!(f, "STARTUP"),
            FailureKind::Timeout => write!(f, "TIMEOUT"),
            FailureKind::Runtime => write!(f, "RUNTIME"),
            FailureKind::Mismatch => write!(f, "MISMATCH"),
        }
    }
}

/// Durable record of one failed test case
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailureRecord {
    pub name: String,
    pub kind: FailureKind,
    pub expected: String,
    pub got: String,
}

impl FailureRecord {
    pub fn new(
        name: impl Into<String>,
        kind: FailureKind,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn mismatch(
        name: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self::new(name, FailureKind::Mismatch, expected, got)
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: expected {:?}, got {:?}",
            self.kind, self.name, self.expected, self.got
        )
    }
}
