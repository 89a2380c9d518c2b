//! Test suite loading
//!
//! Supplies test cases to the harness from `*.javatest` files.

#![allow(dead_code)]

mod loader;
mod parser;

pub use loader::TestSuite;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent the suite from being read at all
#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Failed to read test directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No test files matching `{pattern}` in {}", .path.display())]
    Empty { path: PathBuf, pattern: String },
}
