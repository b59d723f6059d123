//! apicompat core
//!
//! Domain model shared by the merge engine and the compatibility engine.
//! Never rename change ids - they are part of the public API.

pub mod change;
pub mod config;
pub mod diff;
pub mod report;
pub mod schema;

pub use change::{sort_changes, Change, Severity, SourceLocation};
pub use config::{Config, ConfigError, RuleSelection, SeverityOverrides, StabilityLevel, SunsetPolicy};
pub use diff::{
    ApiDiff, ChildDiff, ContentDiff, EnumDiff, IndexedDiff, ModifiedSubschema, Operation,
    OperationDiff, OperationsDiff, ParameterDiff, ParameterLocation, PathItem, PathsDiff,
    PropertiesDiff, SchemaDiff, StringsDiff, Subschema, SubschemaKey, SubschemasDiff, ValueDiff,
};
pub use report::{Report, ReportSummary, ReportVersion};
pub use schema::{
    ref_name, AdditionalProperties, Components, NumericFormat, Reference, Schema, SchemaRef,
    SchemaType,
};
