//! Test execution engine
//!
//! Process lifecycle, the worker pool, failure aggregation, and the harness
//! that ties them together.

#![allow(dead_code)]

mod aggregator;
mod harness;
mod pool;
mod process;

pub use aggregator::DEFAULT_FAILURE_BUFFER;
pub use harness::Harness;
pub use process::{ProcessRunner, Target, DEFAULT_MAX_OUTPUT_BYTES};
