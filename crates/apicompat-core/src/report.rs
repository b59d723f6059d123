//! Report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use crate::change::{sort_changes, Change, Severity};
use serde::{Deserialize, Serialize};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of changes
    pub total: usize,

    /// Number of errors
    pub errors: usize,

    /// Number of warnings
    pub warnings: usize,

    /// Number of info messages
    pub info: usize,

    /// Number of operations with at least one change
    pub operations_affected: usize,
}

/// Compatibility report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// All changes, in report order
    pub changes: Vec<Change>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self::from_changes(Vec::new())
    }

    /// Create a report from changes
    pub fn from_changes(mut changes: Vec<Change>) -> Self {
        sort_changes(&mut changes);

        let mut operations: Vec<(&str, &str)> = changes
            .iter()
            .map(|c| (c.operation.as_str(), c.path.as_str()))
            .collect();
        operations.sort_unstable();
        operations.dedup();

        let summary = ReportSummary {
            total: changes.len(),
            errors: changes.iter().filter(|c| c.severity == Severity::Error).count(),
            warnings: changes.iter().filter(|c| c.severity == Severity::Warn).count(),
            info: changes.iter().filter(|c| c.severity == Severity::Info).count(),
            operations_affected: operations.len(),
        };

        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary,
            changes,
        }
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report() {
        let report = Report::new();
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary.total, 0);
        assert!(!report.has_errors());
    }

    #[test]
    fn report_with_changes() {
        let changes = vec![
            Change::new("endpoint-deprecated", Severity::Info, "GET", "/pets"),
            Change::new("api-removed-without-deprecation", Severity::Error, "DELETE", "/pets"),
            Change::new("request-property-removed", Severity::Warn, "GET", "/pets"),
        ];

        let report = Report::from_changes(changes);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.summary.info, 1);
        assert_eq!(report.summary.operations_affected, 2);
        assert!(report.has_errors());
        assert_eq!(report.changes[0].id, "api-removed-without-deprecation");
    }

    #[test]
    fn report_serialization() {
        let report = Report::new();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"changes\""));
    }
}
