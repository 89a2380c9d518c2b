//! Test suite discovery
//!
//! Lists test files up front (failure there aborts the run) and parses them
//! lazily while the harness consumes the suite.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::parser::parse_test_case;
use super::SuiteError;
use crate::models::TestCase;

/// Ordered set of test files from one directory
#[derive(Clone, Debug)]
pub struct TestSuite {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl TestSuite {
    /// List every file in `dir` whose name contains `.<extension>`
    pub fn open(dir: impl AsRef<Path>, extension: &str) -> Result<Self, SuiteError> {
        let dir = dir.as_ref();
        let pattern = format!(".{}", extension.trim_start_matches('.'));

        let entries = fs::read_dir(dir).map_err(|source| SuiteError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SuiteError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            let matches = entry.file_name().to_string_lossy().contains(&pattern);
            if matches && path.is_file() {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(SuiteError::Empty {
                path: dir.to_path_buf(),
                pattern,
            });
        }

        files.sort();
        debug!("Found {} test files in {}", files.len(), dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl IntoIterator for TestSuite {
    type Item = TestCase;
    type IntoIter = SuiteIter;

    fn into_iter(self) -> SuiteIter {
        SuiteIter {
            files: self.files.into_iter(),
        }
    }
}

/// Reads and parses one test file per step; unreadable files are skipped
pub struct SuiteIter {
    files: std::vec::IntoIter<PathBuf>,
}

impl Iterator for SuiteIter {
    type Item = TestCase;

    fn next(&mut self) -> Option<TestCase> {
        for path in self.files.by_ref() {
            match fs::read(&path) {
                Ok(content) => return Some(parse_test_case(case_name(&path), &content)),
                Err(e) => warn!("Skipping test file {}: {}", path.display(), e),
            }
        }
        None
    }
}

fn case_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
