//! Findings emitted by the compatibility rules
//!
//! IMPORTANT: change ids are versioned and stable.
//! NEVER rename or remove ids - users reference them in severity
//! overrides and CI allowlists. Add new ids only.

use serde::{Deserialize, Serialize};

/// Change severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, not a compatibility problem
    Info,

    /// Warning - may break some clients, should be reviewed
    Warn,

    /// Error - breaking change that should fail CI
    Error,
}

impl Severity {
    /// Numeric level (`ERR` = 3 > `WARN` = 2 > `INFO` = 1)
    pub const fn level(&self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Warn => 2,
            Self::Error => 3,
        }
    }

    /// Whether this severity marks a breaking change
    pub const fn is_breaking(&self) -> bool {
        !matches!(self, Self::Info)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Position of an element in a source document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Document path or URL
    pub file: String,

    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A compatibility finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// Stable change id (also the localization template id)
    pub id: String,

    /// Effective severity after config overrides
    pub severity: Severity,

    /// HTTP method in upper case
    pub operation: String,

    /// API path (`/pets/{id}`)
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,

    /// Schema location inside the request/response (`/properties/name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,

    /// Positional localization arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Detail suffix, e.g. `(media type: application/json)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_source: Option<SourceLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_source: Option<SourceLocation>,
}

impl Change {
    /// Create a change with the minimal fields
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        operation: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            operation: operation.into(),
            path: path.into(),
            operation_id: None,
            property: None,
            args: Vec::new(),
            comment: None,
            base_source: None,
            revision_source: None,
        }
    }

    pub fn with_operation_id(mut self, operation_id: Option<String>) -> Self {
        self.operation_id = operation_id;
        self
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_sources(
        mut self,
        base: Option<SourceLocation>,
        revision: Option<SourceLocation>,
    ) -> Self {
        self.base_source = base;
        self.revision_source = revision;
        self
    }
}

/// Sort into report order: severity descending, then path, operation,
/// id, then args compared one by one
pub fn sort_changes(changes: &mut [Change]) {
    changes.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.operation.cmp(&b.operation))
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.args.cmp(&b.args))
    });
}
