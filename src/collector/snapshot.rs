//! Per-cycle snapshot.

use std::time::Duration;

use crate::probe::ProbeResult;

/// Results of one collection cycle, in configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    pub results: Vec<ProbeResult>,
    /// True iff no result carries an error.
    pub healthy: bool,
    pub elapsed: Duration,
}

impl CollectionSnapshot {
    pub fn new(results: Vec<ProbeResult>, elapsed: Duration) -> Self {
        let healthy = results.iter().all(ProbeResult::is_ok);
        Self { results, healthy, elapsed }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{MountStatus, ProbeError};

    fn ok(target: &str) -> ProbeResult {
        ProbeResult {
            target: target.to_string(),
            status: MountStatus::NotMounted,
            info: None,
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_empty_snapshot_is_healthy() {
        let snapshot = CollectionSnapshot::new(Vec::new(), Duration::ZERO);
        assert!(snapshot.healthy);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_any_error_makes_unhealthy() {
        let results = vec![ok("/a"), ProbeResult::failed("/b", ProbeError::CircuitOpen, Duration::ZERO), ok("/c")];
        let snapshot = CollectionSnapshot::new(results, Duration::from_millis(3));
        assert!(!snapshot.healthy);
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn test_not_mounted_is_still_healthy() {
        let snapshot = CollectionSnapshot::new(vec![ok("/a")], Duration::ZERO);
        assert!(snapshot.healthy);
    }
}
