//! Probe result types.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::probe::error::ProbeError;

/// Whether a target is currently mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MountStatus {
    Mounted,
    NotMounted,
    Unknown,
}

impl fmt::Display for MountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountStatus::Mounted => write!(f, "mounted"),
            MountStatus::NotMounted => write!(f, "not_mounted"),
            MountStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Attributes reported for a mounted target.
///
/// Fields missing from a short output line are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MountInfo {
    pub target: String,
    pub fs_type: String,
    pub options: String,
    pub source: String,
}

/// One evaluation of one target. Never mutated after it is returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    /// The configured mount point that was probed.
    pub target: String,
    pub status: MountStatus,
    pub info: Option<MountInfo>,
    pub error: Option<ProbeError>,
    pub elapsed: Duration,
}

impl ProbeResult {
    /// An `Unknown` result carrying `error`.
    pub fn failed(target: impl Into<String>, error: ProbeError, elapsed: Duration) -> Self {
        Self {
            target: target.into(),
            status: MountStatus::Unknown,
            info: None,
            error: Some(error),
            elapsed,
        }
    }

    /// True if the probe finished without an error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Gauge value: 1 for mounted, 0 otherwise.
    pub fn status_value(&self) -> f64 {
        if self.error.is_none() && self.status == MountStatus::Mounted {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(MountStatus::Mounted.to_string(), "mounted");
        assert_eq!(MountStatus::NotMounted.to_string(), "not_mounted");
        assert_eq!(MountStatus::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_failed_result() {
        let result = ProbeResult::failed("/data", ProbeError::CircuitOpen, Duration::ZERO);
        assert_eq!(result.status, MountStatus::Unknown);
        assert!(!result.is_ok());
        assert_eq!(result.status_value(), 0.0);
        assert!(result.info.is_none());
    }
}
