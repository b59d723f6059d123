//! Per-run inputs shared by every rule

use crate::catalog::{self, Key, RuleEntry};
use apicompat_core::{Change, Config, Severity, SourceLocation};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source positions of operations, keyed by path then lowercase method
pub type OperationSources = BTreeMap<String, BTreeMap<String, SourceLocation>>;

/// Where each operation was declared in the base and revision documents
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sources {
    #[serde(default)]
    pub base: OperationSources,

    #[serde(default)]
    pub revision: OperationSources,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, path: &str, method: &str, location: SourceLocation) -> Self {
        insert(&mut self.base, path, method, location);
        self
    }

    pub fn with_revision(mut self, path: &str, method: &str, location: SourceLocation) -> Self {
        insert(&mut self.revision, path, method, location);
        self
    }

    pub fn base(&self, path: &str, method: &str) -> Option<&SourceLocation> {
        lookup(&self.base, path, method)
    }

    pub fn revision(&self, path: &str, method: &str) -> Option<&SourceLocation> {
        lookup(&self.revision, path, method)
    }
}

fn insert(map: &mut OperationSources, path: &str, method: &str, location: SourceLocation) {
    map.entry(path.to_string())
        .or_default()
        .insert(method.to_lowercase(), location);
}

fn lookup<'a>(map: &'a OperationSources, path: &str, method: &str) -> Option<&'a SourceLocation> {
    map.get(path)?.get(&method.to_lowercase())
}

/// The operation a change is reported against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRef<'a> {
    /// Lowercase HTTP method, as keyed in the diff
    pub method: &'a str,
    pub path: &'a str,
    pub operation_id: Option<&'a str>,
}

/// Read-only view handed to every rule
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub config: &'a Config,
    pub sources: &'a Sources,

    /// Date sunset windows are measured from
    pub today: NaiveDate,
}

impl<'a> RuleContext<'a> {
    pub fn new(config: &'a Config, sources: &'a Sources) -> Self {
        Self {
            config,
            sources,
            today: config.evaluation_date(),
        }
    }

    /// Effective severity of an entry after config overrides
    pub fn severity(&self, entry: &RuleEntry) -> Severity {
        self.config.severity.get_severity(entry.id, entry.level)
    }

    /// Build the change classified by `key`, `None` if the catalogue has no
    /// such entry
    pub fn change(&self, key: Key, operation: &OperationRef<'_>, args: Vec<String>) -> Option<Change> {
        let Some(entry) = catalog::find(key) else {
            tracing::warn!(?key, "no catalogue entry for classification");
            return None;
        };

        Some(
            Change::new(
                entry.id,
                self.severity(entry),
                operation.method.to_uppercase(),
                operation.path,
            )
            .with_operation_id(operation.operation_id.map(String::from))
            .with_args(args)
            .with_sources(
                self.sources.base(operation.path, operation.method).cloned(),
                self.sources.revision(operation.path, operation.method).cloned(),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Action, Direction, Site, Subject};

    #[test]
    fn sources_are_case_insensitive_on_method() {
        let sources = Sources::new().with_base("/pets", "GET", SourceLocation::new("base.yaml", 10, 5));
        assert_eq!(sources.base("/pets", "get").map(|l| l.line), Some(10));
        assert!(sources.revision("/pets", "get").is_none());
    }

    #[test]
    fn change_carries_override_and_sources() {
        let mut config = Config::default();
        config
            .severity
            .set_override("response-property-type-widened", Severity::Warn);
        let sources = Sources::new()
            .with_base("/pets", "get", SourceLocation::new("base.yaml", 3, 1))
            .with_revision("/pets", "get", SourceLocation::new("revision.yaml", 4, 1));
        let ctx = RuleContext::new(&config, &sources);

        let operation = OperationRef {
            method: "get",
            path: "/pets",
            operation_id: Some("listPets"),
        };
        let key = Key::new(Direction::Response, Site::Property, Subject::Type, Action::Widened);
        let change = ctx.change(key, &operation, vec!["/properties/id".into()]).unwrap();

        assert_eq!(change.id, "response-property-type-widened");
        assert_eq!(change.severity, Severity::Warn);
        assert_eq!(change.operation, "GET");
        assert_eq!(change.operation_id.as_deref(), Some("listPets"));
        assert_eq!(change.base_source.map(|l| l.line), Some(3));
        assert_eq!(change.revision_source.map(|l| l.file), Some("revision.yaml".to_string()));
    }

    #[test]
    fn unknown_key_yields_nothing() {
        let config = Config::default();
        let sources = Sources::new();
        let ctx = RuleContext::new(&config, &sources);
        let operation = OperationRef {
            method: "get",
            path: "/",
            operation_id: None,
        };
        let key = Key::new(Direction::Response, Site::Parameter, Subject::Type, Action::Widened);
        assert!(ctx.change(key, &operation, Vec::new()).is_none());
    }
}
