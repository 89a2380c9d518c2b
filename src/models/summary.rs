//! Run summary model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use super::FailureRecord;

/// Final report of a harness run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Summary {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis", deserialize_with = "from_millis")]
    pub elapsed: Duration,
    pub failed: Vec<FailureRecord>,
}

impl Summary {
    pub fn new(
        started_at: DateTime<Utc>,
        total: usize,
        failed: Vec<FailureRecord>,
        elapsed: Duration,
    ) -> Self {
        debug_assert!(total >= failed.len(), "more failures than cases");
        Self {
            started_at,
            total,
            passed: total.saturating_sub(failed.len()),
            elapsed,
            failed,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successful Tests ({}/{}) in {}ms",
            self.passed,
            self.total,
            self.elapsed.as_millis()
        )
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

fn from_millis<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
    u64::deserialize(d).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;

    #[test]
    fn test_summary_counts() {
        let failed = vec![
            FailureRecord::mismatch("a", "1", "2"),
            FailureRecord::new("b", FailureKind::Timeout, "3", "too slow"),
        ];
        let summary = Summary::new(Utc::now(), 4, failed, Duration::from_millis(20));

        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed_count(), 2);
        assert_eq!(summary.pass_rate(), 50.0);
        assert!(!summary.is_all_passed());
    }

    #[test]
    fn test_summary_json_roundtrip() {
        let summary = Summary::new(Utc::now(), 1, Vec::new(), Duration::from_millis(1234));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["elapsed_ms"], 1234);

        let back: Summary = serde_json::from_value(json).unwrap();
        assert_eq!(back.elapsed, Duration::from_millis(1234));
        assert!(back.is_all_passed());
    }

    #[test]
    fn test_empty_summary() {
        let summary = Summary::new(Utc::now(), 0, Vec::new(), Duration::ZERO);
        assert_eq!(summary.pass_rate(), 0.0);
        assert_eq!(summary.to_string(), "Successful Tests (0/0) in 0ms");
    }
}
