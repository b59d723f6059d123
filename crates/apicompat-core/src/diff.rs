//! Difference trees handed to the compatibility engine
//!
//! These types are produced by an upstream structural diff and consumed
//! read-only. Scalar keywords are mirrored as optional `{from, to}` pairs;
//! composition children are an explicit sum type ([`ChildDiff`]) so every
//! traversal has to say what it does with each kind.

use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A changed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDiff<T> {
    pub from: T,
    pub to: T,
}

impl<T> ValueDiff<T> {
    pub fn new(from: T, to: T) -> Self {
        Self { from, to }
    }
}

/// Set-like change of a list of strings (`required`, ...)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StringsDiff {
    #[serde(default)]
    pub added: Vec<String>,

    #[serde(default)]
    pub deleted: Vec<String>,
}

/// Set-like change of `enum` values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnumDiff {
    #[serde(default)]
    pub added: Vec<Value>,

    #[serde(default)]
    pub deleted: Vec<Value>,
}

/// Field-by-field and child-by-child difference of one schema node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaDiff {
    /// Snapshot of the node in the base version
    pub base: Schema,

    /// Snapshot of the node in the revision
    pub revision: Schema,

    pub title: Option<ValueDiff<Option<String>>>,
    pub description: Option<ValueDiff<Option<String>>>,

    /// Declared type names (empty list = unconstrained)
    #[serde(rename = "type")]
    pub type_diff: Option<ValueDiff<Vec<String>>>,

    pub format: Option<ValueDiff<Option<String>>>,
    pub minimum: Option<ValueDiff<Option<f64>>>,
    pub maximum: Option<ValueDiff<Option<f64>>>,
    pub exclusive_minimum: Option<ValueDiff<bool>>,
    pub exclusive_maximum: Option<ValueDiff<bool>>,
    pub multiple_of: Option<ValueDiff<Option<f64>>>,
    pub min_length: Option<ValueDiff<Option<u64>>>,
    pub max_length: Option<ValueDiff<Option<u64>>>,
    pub min_items: Option<ValueDiff<Option<u64>>>,
    pub max_items: Option<ValueDiff<Option<u64>>>,
    pub min_properties: Option<ValueDiff<Option<u64>>>,
    pub max_properties: Option<ValueDiff<Option<u64>>>,
    pub unique_items: Option<ValueDiff<bool>>,
    pub pattern: Option<ValueDiff<Option<String>>>,

    #[serde(rename = "enum")]
    pub enum_diff: Option<EnumDiff>,

    #[serde(rename = "const")]
    pub const_diff: Option<ValueDiff<Option<Value>>>,

    pub default: Option<ValueDiff<Option<Value>>>,
    pub nullable: Option<ValueDiff<bool>>,
    pub read_only: Option<ValueDiff<bool>>,
    pub write_only: Option<ValueDiff<bool>>,
    pub deprecated: Option<ValueDiff<bool>>,
    pub required: Option<StringsDiff>,
    pub dependent_required: BTreeMap<String, StringsDiff>,
    pub content_media_type: Option<ValueDiff<Option<String>>>,
    pub content_encoding: Option<ValueDiff<Option<String>>>,

    /// Vendor extensions and other unrecognized keywords, by key
    pub extensions: BTreeMap<String, ValueDiff<Option<Value>>>,

    /// Changed composition children
    pub children: Vec<ChildDiff>,
}

impl SchemaDiff {
    /// Diff between two snapshots with no field diffs filled in yet
    pub fn between(base: Schema, revision: Schema) -> Self {
        Self {
            base,
            revision,
            ..Self::default()
        }
    }

    /// The `properties` child, if any property changed
    pub fn properties(&self) -> Option<&PropertiesDiff> {
        self.children.iter().find_map(|child| match child {
            ChildDiff::Properties(diff) => Some(diff),
            _ => None,
        })
    }
}

/// How a list-shaped subschema is identified inside its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubschemaKey {
    /// Position in the revision list (base list for deletions)
    pub index: usize,

    /// `$ref` target, when the entry is a reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl SubschemaKey {
    /// Path label: the component name for refs, `#index` otherwise
    pub fn label(&self) -> String {
        match &self.reference {
            Some(reference) => crate::schema::ref_name(reference).to_string(),
            None => format!("#{}", self.index),
        }
    }
}

/// An added or deleted entry of `allOf`/`anyOf`/`oneOf`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subschema {
    #[serde(flatten)]
    pub key: SubschemaKey,

    pub schema: Schema,
}

/// A modified entry of `allOf`/`anyOf`/`oneOf`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedSubschema {
    #[serde(flatten)]
    pub key: SubschemaKey,

    pub diff: SchemaDiff,
}

/// Changes of a list of alternatives
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubschemasDiff {
    pub added: Vec<Subschema>,
    pub deleted: Vec<Subschema>,
    pub modified: Vec<ModifiedSubschema>,
}

/// Changes of a name-keyed map of schemas (`properties`, `patternProperties`, ...)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertiesDiff {
    pub added: BTreeMap<String, Schema>,
    pub deleted: BTreeMap<String, Schema>,
    pub modified: BTreeMap<String, SchemaDiff>,
}

/// Changes of a position-keyed list of schemas (`prefixItems`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexedDiff {
    pub added: BTreeMap<usize, Schema>,
    pub deleted: BTreeMap<usize, Schema>,
    pub modified: BTreeMap<usize, SchemaDiff>,
}

/// One changed composition child of a schema node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "keyword", content = "diff", rename_all = "camelCase")]
pub enum ChildDiff {
    AllOf(SubschemasDiff),
    AnyOf(SubschemasDiff),
    OneOf(SubschemasDiff),
    Not(Box<SchemaDiff>),
    Items(Box<SchemaDiff>),
    Properties(PropertiesDiff),
    AdditionalProperties(Box<SchemaDiff>),
    PatternProperties(PropertiesDiff),
    DependentSchemas(PropertiesDiff),
    PrefixItems(IndexedDiff),
    Contains(Box<SchemaDiff>),
    PropertyNames(Box<SchemaDiff>),
    If(Box<SchemaDiff>),
    Then(Box<SchemaDiff>),
    Else(Box<SchemaDiff>),
    UnevaluatedItems(Box<SchemaDiff>),
    UnevaluatedProperties(Box<SchemaDiff>),
    ContentSchema(Box<SchemaDiff>),
}

/// Operation header fields the lifecycle policy reads
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,

    #[serde(default)]
    pub deprecated: bool,

    /// Vendor extensions (`x-sunset`, `x-stability-level`, ...)
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl Operation {
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }
}

/// Where a parameter lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
            Self::Header => write!(f, "header"),
            Self::Cookie => write!(f, "cookie"),
        }
    }
}

/// A modified parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDiff {
    #[serde(rename = "in")]
    pub location: ParameterLocation,

    pub name: String,

    #[serde(default)]
    pub required: Option<ValueDiff<bool>>,

    #[serde(default)]
    pub schema: Option<SchemaDiff>,
}

/// Modified media types of a request body or response
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentDiff {
    pub media_types: BTreeMap<String, SchemaDiff>,
}

/// Difference of one operation present in both versions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationDiff {
    pub base: Operation,
    pub revision: Operation,
    pub request_body: Option<ContentDiff>,

    /// Keyed by status code (`"200"`, `"default"`, ...)
    pub responses: BTreeMap<String, ContentDiff>,

    pub parameters: Vec<ParameterDiff>,
}

/// Operations of one path, keyed by lowercase HTTP method
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationsDiff {
    pub added: BTreeMap<String, Operation>,
    pub deleted: BTreeMap<String, Operation>,
    pub modified: BTreeMap<String, OperationDiff>,
}

/// A path item: its operations by method
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathItem {
    pub operations: BTreeMap<String, Operation>,
}

/// Changes under `paths`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsDiff {
    pub added: BTreeMap<String, PathItem>,
    pub deleted: BTreeMap<String, PathItem>,
    pub modified: BTreeMap<String, OperationsDiff>,
}

/// Whole-document difference
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiDiff {
    pub paths: PathsDiff,
}

impl ApiDiff {
    /// Parse from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn child_diff_is_adjacently_tagged() {
        let diff: SchemaDiff = serde_json::from_value(json!({
            "children": [
                {"keyword": "items", "diff": {"type": {"from": ["string"], "to": ["integer"]}}},
                {"keyword": "properties", "diff": {"added": {"name": {"type": "string"}}}}
            ]
        }))
        .unwrap();

        assert_eq!(diff.children.len(), 2);
        assert!(matches!(diff.children[0], ChildDiff::Items(_)));
        let props = diff.properties().unwrap();
        assert!(props.added.contains_key("name"));
    }

    #[test]
    fn subschema_label_prefers_ref_name() {
        let by_ref = SubschemaKey {
            index: 0,
            reference: Some("#/components/schemas/Pet".to_string()),
        };
        let by_index = SubschemaKey {
            index: 2,
            reference: None,
        };
        assert_eq!(by_ref.label(), "Pet");
        assert_eq!(by_index.label(), "#2");
    }

    #[test]
    fn api_diff_from_json() {
        let diff = ApiDiff::from_json(
            r#"{
                "paths": {
                    "modified": {
                        "/pets": {
                            "deleted": {"get": {"operationId": "listPets", "x-sunset": "2025-01-01"}}
                        }
                    }
                }
            }"#,
        )
        .unwrap();

        let ops = &diff.paths.modified["/pets"];
        let get = &ops.deleted["get"];
        assert_eq!(get.operation_id.as_deref(), Some("listPets"));
        assert_eq!(get.extension("x-sunset"), Some(&json!("2025-01-01")));
    }
}
