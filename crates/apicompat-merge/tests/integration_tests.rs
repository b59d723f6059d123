//! Integration tests for allOf flattening

use apicompat_core::{Components, Schema, SchemaRef};
use apicompat_merge::{merge, merge_schema, MergeError};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn schema(value: Value) -> Schema {
    serde_json::from_value(value).unwrap()
}

fn components(value: Value) -> Components {
    serde_json::from_value(json!({ "schemas": value })).unwrap()
}

#[test]
fn end_to_end_all_of() {
    let input = schema(json!({
        "allOf": [
            {"type": "integer", "minimum": 5},
            {"type": "integer", "minimum": 10, "maximum": 20}
        ]
    }));

    assert_eq!(
        merge_schema(&input).unwrap(),
        schema(json!({"type": "integer", "minimum": 10, "maximum": 20}))
    );
}

#[test]
fn bounds_take_the_tightest_value() {
    let input = schema(json!({
        "allOf": [
            {"minimum": 5, "maximum": 20},
            {"minimum": 10, "maximum": 15}
        ]
    }));

    let merged = merge_schema(&input).unwrap();
    assert_eq!(merged.minimum, Some(10.0));
    assert_eq!(merged.maximum, Some(15.0));
}

#[test]
fn multiple_of_uses_scaled_lcm() {
    let integers = schema(json!({"allOf": [{"multipleOf": 2}, {"multipleOf": 3}]}));
    assert_eq!(merge_schema(&integers).unwrap().multiple_of, Some(6.0));

    let decimals = schema(json!({"allOf": [{"multipleOf": 0.1}, {"multipleOf": 0.2}]}));
    assert_eq!(merge_schema(&decimals).unwrap().multiple_of, Some(0.2));
}

#[test]
fn multiple_of_without_exact_lcm_stays_separate() {
    let input = schema(json!({
        "allOf": [
            {"multipleOf": 1000000007},
            {"multipleOf": 1000000009},
            {"multipleOf": 998244353}
        ]
    }));

    let merged = merge_schema(&input).unwrap();
    assert_eq!(merged.multiple_of, Some(1000000007.0));
    assert_eq!(
        merged.all_of,
        vec![
            SchemaRef::inline(schema(json!({"multipleOf": 1000000009}))),
            SchemaRef::inline(schema(json!({"multipleOf": 998244353}))),
        ]
    );
}

#[test]
fn integer_and_number_merge_to_integer() {
    let input = schema(json!({"allOf": [{"type": "integer"}, {"type": "number"}]}));
    assert_eq!(merge_schema(&input).unwrap(), Schema::typed("integer"));
}

#[test]
fn string_and_integer_conflict() {
    let input = schema(json!({"allOf": [{"type": "string"}, {"type": "integer"}]}));
    assert!(matches!(
        merge_schema(&input),
        Err(MergeError::TypeConflict(_))
    ));
}

#[test]
fn disjoint_enums_conflict() {
    let input = schema(json!({"allOf": [{"enum": ["a", "b"]}, {"enum": ["c"]}]}));
    assert_eq!(merge_schema(&input), Err(MergeError::EmptyEnum));
}

#[test]
fn self_referencing_all_of_terminates() {
    let components = components(json!({
        "Node": {
            "allOf": [
                {"$ref": "#/components/schemas/Node"},
                {
                    "type": "object",
                    "properties": {
                        "children": {
                            "type": "array",
                            "items": {"$ref": "#/components/schemas/Node"}
                        }
                    }
                }
            ]
        }
    }));

    let root = SchemaRef::reference("#/components/schemas/Node");
    let flattened = merge(&root, &components).unwrap();

    assert_eq!(flattened.schema, root);
    assert!(flattened.circular_refs.contains("Node"));

    let node = &flattened.components["Node"];
    assert!(node.all_of.is_empty());
    assert_eq!(node.type_names(), vec!["object"]);

    let children = node.properties["children"].as_inline().unwrap();
    assert_eq!(children.items.as_deref(), Some(&root));
}

#[test]
fn referenced_components_are_merged_into_the_group() {
    let components = components(json!({
        "Pet": {
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        }
    }));

    let root = SchemaRef::inline(schema(json!({
        "allOf": [
            {"$ref": "#/components/schemas/Pet"},
            {
                "properties": {"tag": {"type": "string"}},
                "required": ["tag"]
            }
        ]
    })));

    let flattened = merge(&root, &components).unwrap();
    let merged = flattened.schema.as_inline().unwrap();

    assert_eq!(merged.type_names(), vec!["object"]);
    assert_eq!(merged.required, vec!["name", "tag"]);
    assert_eq!(
        merged.properties.keys().collect::<Vec<_>>(),
        vec!["name", "tag"]
    );
    assert!(flattened.components.contains_key("Pet"));
    assert!(flattened.circular_refs.is_empty());
}

#[test]
fn closed_objects_intersect_property_names() {
    let input = schema(json!({
        "allOf": [
            {
                "type": "object",
                "properties": {"id": {"type": "string"}, "name": {"type": "string"}},
                "additionalProperties": false
            },
            {
                "properties": {"id": {"maxLength": 36}, "extra": {"type": "integer"}}
            }
        ]
    }));

    let merged = merge_schema(&input).unwrap();
    assert!(merged.is_closed());
    assert_eq!(
        merged.properties.keys().collect::<Vec<_>>(),
        vec!["id", "name"]
    );
    assert_eq!(
        merged.properties["id"],
        SchemaRef::inline(schema(json!({"type": "string", "maxLength": 36})))
    );
}

#[test]
fn additional_properties_schemas_merge() {
    let input = schema(json!({
        "allOf": [
            {"additionalProperties": {"type": "string"}},
            {"additionalProperties": {"maxLength": 4}}
        ]
    }));

    let merged = merge_schema(&input).unwrap();
    assert_eq!(
        merged.additional_properties,
        Some(apicompat_core::AdditionalProperties::Schema(Box::new(
            SchemaRef::inline(schema(json!({"type": "string", "maxLength": 4})))
        )))
    );
}

#[test]
fn one_of_lists_form_a_cartesian_product() {
    let input = schema(json!({
        "allOf": [
            {"oneOf": [{"type": "string"}, {"type": "integer"}]},
            {"oneOf": [{"minLength": 1}, {"nullable": true}]}
        ]
    }));

    let merged = merge_schema(&input).unwrap();
    assert_eq!(
        merged.one_of,
        vec![
            SchemaRef::inline(schema(json!({"type": "string", "minLength": 1}))),
            SchemaRef::inline(schema(json!({"type": "string"}))),
            SchemaRef::inline(schema(json!({"type": "integer", "minLength": 1}))),
            SchemaRef::inline(schema(json!({"type": "integer"}))),
        ]
    );
}

#[test]
fn circular_items_in_a_group_are_rejected() {
    let components = components(json!({
        "List": {
            "type": "object",
            "properties": {
                "next": {
                    "allOf": [
                        {"type": "array", "items": {"$ref": "#/components/schemas/List"}},
                        {"items": {"type": "object"}}
                    ]
                }
            }
        }
    }));

    let root = SchemaRef::reference("#/components/schemas/List");
    assert_eq!(
        merge(&root, &components),
        Err(MergeError::CircularItems("#/components/schemas/List".to_string()))
    );
}

#[test]
fn annotated_self_reference_keeps_the_ref() {
    let components = components(json!({
        "Node": {
            "type": "object",
            "properties": {
                "next": {
                    "allOf": [
                        {"$ref": "#/components/schemas/Node"},
                        {"description": "the next node"}
                    ]
                }
            }
        }
    }));

    let root = SchemaRef::reference("#/components/schemas/Node");
    let flattened = merge(&root, &components).unwrap();

    assert!(flattened.circular_refs.contains("Node"));
    assert_eq!(
        flattened.components["Node"].properties["next"],
        SchemaRef::inline(schema(json!({
            "description": "the next node",
            "allOf": [{"$ref": "#/components/schemas/Node"}]
        })))
    );
}

#[test]
fn mutual_all_of_cycle_resolves() {
    let components = components(json!({
        "A": {"type": "object", "allOf": [{"$ref": "#/components/schemas/B"}]},
        "B": {
            "properties": {"x": {"type": "string"}},
            "allOf": [{"$ref": "#/components/schemas/A"}]
        }
    }));

    let root = SchemaRef::reference("#/components/schemas/A");
    let flattened = merge(&root, &components).unwrap();
    assert!(flattened.circular_refs.contains("A"));

    let a = &flattened.components["A"];
    assert_eq!(a.type_names(), vec!["object"]);
    assert_eq!(a.properties.keys().collect::<Vec<_>>(), vec!["x"]);
    assert!(a.all_of.is_empty());

    let b = &flattened.components["B"];
    assert_eq!(b.all_of, vec![SchemaRef::reference("#/components/schemas/A")]);
}

#[test]
fn circular_one_of_branch_is_rejected() {
    let components = components(json!({
        "Tree": {
            "type": "object",
            "properties": {
                "child": {
                    "allOf": [
                        {"oneOf": [{"$ref": "#/components/schemas/Tree"}, {"type": "string"}]},
                        {"oneOf": [{"nullable": true}]}
                    ]
                }
            }
        }
    }));

    let root = SchemaRef::reference("#/components/schemas/Tree");
    assert_eq!(
        merge(&root, &components),
        Err(MergeError::CircularRef {
            keyword: "oneOf",
            reference: "#/components/schemas/Tree".to_string(),
        })
    );
}

#[test]
fn circular_property_in_a_group_is_rejected() {
    let components = components(json!({
        "Person": {
            "type": "object",
            "properties": {
                "friend": {
                    "allOf": [
                        {"properties": {"best": {"$ref": "#/components/schemas/Person"}}},
                        {"properties": {"best": {"description": "closest friend"}}}
                    ]
                }
            }
        }
    }));

    let root = SchemaRef::reference("#/components/schemas/Person");
    assert_eq!(
        merge(&root, &components),
        Err(MergeError::CircularProperty {
            property: "best".to_string(),
            reference: "#/components/schemas/Person".to_string(),
        })
    );
}
