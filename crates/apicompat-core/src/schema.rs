//! Schema types (OpenAPI 3.x / JSON Schema 2020-12 subset)
//!
//! The model keeps every keyword the merge engine and the compatibility
//! rules reason about. Anything else, vendor extensions included, lands in
//! [`Schema::extensions`] so it survives a round trip.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The `type` keyword: a single name or a list of names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    /// `"type": "string"`
    Single(String),

    /// `"type": ["string", "null"]`
    Multiple(Vec<String>),
}

impl SchemaType {
    /// Build from a list, collapsing a one-element list into [`SchemaType::Single`]
    pub fn from_names(mut names: Vec<String>) -> Self {
        if names.len() == 1 {
            Self::Single(names.remove(0))
        } else {
            Self::Multiple(names)
        }
    }

    /// Type names in declaration order
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Multiple(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(name) => write!(f, "{}", name),
            Self::Multiple(names) => write!(f, "[{}]", names.join(", ")),
        }
    }
}

/// Numeric formats ordered from narrowest to widest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericFormat {
    Int32,
    Int64,
    Float,
    Double,
}

impl NumericFormat {
    /// Parse a `format` value, returning `None` for non-numeric formats
    pub fn parse(format: &str) -> Option<Self> {
        match format {
            "int32" => Some(Self::Int32),
            "int64" => Some(Self::Int64),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
}

/// Either a `$ref` to a named component or an inline schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaRef {
    /// `{"$ref": "#/components/schemas/Pet"}`
    Ref(Reference),

    /// Inline schema object
    Inline(Box<Schema>),
}

impl SchemaRef {
    /// Create a reference to a component
    pub fn reference(target: impl Into<String>) -> Self {
        Self::Ref(Reference {
            reference: target.into(),
        })
    }

    /// Wrap an inline schema
    pub fn inline(schema: Schema) -> Self {
        Self::Inline(Box::new(schema))
    }

    /// The component name if this is a `$ref`
    pub fn ref_name(&self) -> Option<&str> {
        match self {
            Self::Ref(reference) => Some(reference.name()),
            Self::Inline(_) => None,
        }
    }

    /// The inline schema, if any
    pub fn as_inline(&self) -> Option<&Schema> {
        match self {
            Self::Inline(schema) => Some(schema),
            Self::Ref(_) => None,
        }
    }
}

impl From<Schema> for SchemaRef {
    fn from(schema: Schema) -> Self {
        Self::inline(schema)
    }
}

/// A JSON reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "$ref")]
    pub reference: String,
}

impl Reference {
    /// Component name: the last segment of the pointer
    pub fn name(&self) -> &str {
        ref_name(&self.reference)
    }
}

/// Last segment of a JSON pointer such as `#/components/schemas/Pet`
pub fn ref_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// `additionalProperties`: a boolean or a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<SchemaRef>),
}

/// A schema node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    /// OpenAPI 3.0 boolean form
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_minimum: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_maximum: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub unique_items: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,

    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub write_only: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<SchemaRef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaRef>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pattern_properties: BTreeMap<String, SchemaRef>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependent_schemas: BTreeMap<String, SchemaRef>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependent_required: BTreeMap<String, Vec<String>>,

    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub if_schema: Option<Box<SchemaRef>>,

    #[serde(rename = "then", default, skip_serializing_if = "Option::is_none")]
    pub then_schema: Option<Box<SchemaRef>>,

    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_schema: Option<Box<SchemaRef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<Box<SchemaRef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_names: Option<Box<SchemaRef>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix_items: Vec<SchemaRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unevaluated_items: Option<Box<SchemaRef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unevaluated_properties: Option<Box<SchemaRef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_schema: Option<Box<SchemaRef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_media_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,

    /// Unrecognized keywords, including `x-` vendor extensions
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Schema {
    /// Create an empty schema (accepts anything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schema with a single type
    pub fn typed(name: impl Into<String>) -> Self {
        Self {
            schema_type: Some(SchemaType::Single(name.into())),
            ..Self::default()
        }
    }

    /// Add a property
    pub fn with_property(mut self, name: impl Into<String>, schema: impl Into<SchemaRef>) -> Self {
        self.properties.insert(name.into(), schema.into());
        self
    }

    /// Declared type names, empty when unconstrained
    pub fn type_names(&self) -> Vec<&str> {
        self.schema_type
            .as_ref()
            .map(SchemaType::names)
            .unwrap_or_default()
    }

    /// `additionalProperties: false`
    pub fn is_closed(&self) -> bool {
        matches!(self.additional_properties, Some(AdditionalProperties::Bool(false)))
    }

    /// Whether `name` is listed in `required`
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Look up a vendor extension
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }
}

/// Named component schemas a `$ref` can point at
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub schemas: BTreeMap<String, Schema>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under `name`
    pub fn with_schema(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.schemas.insert(name.into(), schema);
        self
    }

    /// Resolve a `$ref` string or a bare component name
    pub fn resolve(&self, reference: &str) -> Option<&Schema> {
        self.schemas.get(ref_name(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_accepts_string_or_array() {
        let single: Schema = serde_json::from_value(json!({"type": "string"})).unwrap();
        assert_eq!(single.type_names(), vec!["string"]);

        let multiple: Schema = serde_json::from_value(json!({"type": ["string", "integer"]})).unwrap();
        assert_eq!(multiple.type_names(), vec!["string", "integer"]);
    }

    #[test]
    fn ref_and_inline_children() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "object",
            "properties": {
                "owner": {"$ref": "#/components/schemas/User"},
                "name": {"type": "string", "x-internal": true}
            },
            "additionalProperties": false
        }))
        .unwrap();

        assert_eq!(schema.properties["owner"].ref_name(), Some("User"));
        let name = schema.properties["name"].as_inline().unwrap();
        assert_eq!(name.extension("x-internal"), Some(&json!(true)));
        assert!(schema.is_closed());
    }

    #[test]
    fn keywords_2020_12_deserialize() {
        let schema: Schema = serde_json::from_value(json!({
            "prefixItems": [{"type": "string"}, {"type": "integer"}],
            "if": {"required": ["a"]},
            "then": {"required": ["b"]},
            "dependentRequired": {"a": ["b"]},
            "unevaluatedProperties": {"type": "string"}
        }))
        .unwrap();

        assert_eq!(schema.prefix_items.len(), 2);
        assert!(schema.if_schema.is_some());
        assert!(schema.then_schema.is_some());
        assert_eq!(schema.dependent_required["a"], vec!["b".to_string()]);
        assert!(schema.unevaluated_properties.is_some());
        assert!(schema.extensions.is_empty());
    }

    #[test]
    fn numeric_format_order() {
        assert!(NumericFormat::Int32 < NumericFormat::Int64);
        assert!(NumericFormat::Float < NumericFormat::Double);
        assert_eq!(NumericFormat::parse("date-time"), None);
    }

    #[test]
    fn components_resolve_by_pointer() {
        let components = Components::new().with_schema("Pet", Schema::typed("object"));
        assert!(components.resolve("#/components/schemas/Pet").is_some());
        assert!(components.resolve("Pet").is_some());
        assert!(components.resolve("#/components/schemas/Missing").is_none());
    }
}
