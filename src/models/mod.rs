//! Data models for the test harness
//!
//! This module contains the data structures passed between the supplier,
//! the worker pool, and the aggregator.

#![allow(dead_code)]

mod outcome;
mod summary;
mod test_case;

pub use outcome::ExecutionOutcome;
pub use summary::Summary;
pub use test_case::{FailureKind, FailureRecord, TestCase};
