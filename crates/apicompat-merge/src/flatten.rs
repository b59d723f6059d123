//! allOf flattening
//!
//! [`merge`] rewrites a schema graph so that no `allOf` with more than one
//! resolvable member is left: every group is replaced by a single schema that
//! accepts exactly the documents all members accept. `$ref`s are kept as
//! references and the components they reach are flattened alongside.

use crate::error::MergeError;
use crate::keywords;
use crate::state::{Handle, MergeState};
use apicompat_core::{AdditionalProperties, Components, Reference, Schema, SchemaRef};
use std::collections::{BTreeMap, BTreeSet};

/// Result of flattening a schema graph
#[derive(Debug, Clone, PartialEq)]
pub struct Flattened {
    /// The flattened root
    pub schema: SchemaRef,

    /// Flattened form of every component the root reaches
    pub components: BTreeMap<String, Schema>,

    /// Components found to take part in a reference cycle
    pub circular_refs: BTreeSet<String>,
}

/// Flatten `root` and every component it reaches
pub fn merge(root: &SchemaRef, components: &Components) -> Result<Flattened, MergeError> {
    let mut merger = Merger::new(components);
    let schema = merger.merge_ref(root)?;
    let (components, circular_refs) = merger.state.into_components();

    tracing::debug!(
        components = components.len(),
        circular = circular_refs.len(),
        "flattened schema graph"
    );

    Ok(Flattened {
        schema,
        components,
        circular_refs,
    })
}

/// Flatten a self-contained schema (no `$ref`s to resolve)
pub fn merge_schema(schema: &Schema) -> Result<Schema, MergeError> {
    let components = Components::new();
    Merger::new(&components).flatten(schema, None)
}

/// A member of a group being intersected
enum Part {
    Schema(Schema),
    /// A reference whose target is still being merged or is known circular
    Circular(Reference),
}

struct Merger<'a> {
    components: &'a Components,
    state: MergeState,
}

impl<'a> Merger<'a> {
    fn new(components: &'a Components) -> Self {
        Self {
            components,
            state: MergeState::new(),
        }
    }

    fn merge_ref(&mut self, schema_ref: &SchemaRef) -> Result<SchemaRef, MergeError> {
        match schema_ref {
            SchemaRef::Inline(schema) => Ok(SchemaRef::inline(self.flatten(schema, None)?)),
            SchemaRef::Ref(reference) => {
                self.enter_ref(reference)?;
                Ok(schema_ref.clone())
            }
        }
    }

    /// Flatten the component behind `reference` once; later hits reuse the slot
    fn enter_ref(&mut self, reference: &Reference) -> Result<Handle, MergeError> {
        let name = reference.name();

        if let Some(handle) = self.state.lookup(name) {
            if self.state.is_pending(handle) {
                tracing::debug!(reference = %reference.reference, "circular reference");
                self.state.mark_circular(handle);
            }
            return Ok(handle);
        }

        let components = self.components;
        let target = components
            .resolve(&reference.reference)
            .ok_or_else(|| MergeError::UnresolvedRef(reference.reference.clone()))?;

        tracing::trace!(component = name, "entering reference");
        let handle = self.state.reserve(name);
        let merged = self.flatten(target, Some(name))?;
        self.state.complete(handle, merged);
        Ok(handle)
    }

    /// Flatten one schema node. `identity` names the component being
    /// flattened, so an `allOf` entry pointing back at it can be dropped.
    ///
    /// A member whose merge is still in progress cannot be intersected yet;
    /// its `$ref` stays behind as a residual `allOf` entry.
    fn flatten(&mut self, schema: &Schema, identity: Option<&str>) -> Result<Schema, MergeError> {
        let base = self.flatten_children(schema)?;
        if schema.all_of.is_empty() {
            return Ok(base);
        }

        let mut members = Vec::with_capacity(schema.all_of.len() + 1);
        if base != Schema::default() {
            members.push(base);
        }

        let mut pending = Vec::new();
        for member in &schema.all_of {
            if identity.is_some() && member.ref_name() == identity {
                tracing::trace!(component = identity, "dropping allOf self-reference");
                continue;
            }
            match self.resolve(member)? {
                Part::Schema(resolved) => members.push(resolved),
                Part::Circular(reference) => {
                    tracing::debug!(reference = %reference.reference, "keeping circular allOf member");
                    pending.push(SchemaRef::Ref(reference));
                }
            }
        }

        let mut merged = self.merge_members(members)?;
        for reference in pending {
            if !merged.all_of.contains(&reference) {
                merged.all_of.push(reference);
            }
        }
        if identity.is_some() {
            // residuals of members that loop back here resolve to this result
            merged.all_of.retain(|member| member.ref_name() != identity);
        }
        Ok(merged)
    }

    /// Copy of `schema` with every child flattened and `allOf` removed
    fn flatten_children(&mut self, schema: &Schema) -> Result<Schema, MergeError> {
        let mut out = schema.clone();
        out.all_of.clear();

        out.any_of = self.merge_list(&schema.any_of)?;
        out.one_of = self.merge_list(&schema.one_of)?;
        out.prefix_items = self.merge_list(&schema.prefix_items)?;

        out.not = self.merge_boxed(&schema.not)?;
        out.items = self.merge_boxed(&schema.items)?;
        out.contains = self.merge_boxed(&schema.contains)?;
        out.property_names = self.merge_boxed(&schema.property_names)?;
        out.if_schema = self.merge_boxed(&schema.if_schema)?;
        out.then_schema = self.merge_boxed(&schema.then_schema)?;
        out.else_schema = self.merge_boxed(&schema.else_schema)?;
        out.unevaluated_items = self.merge_boxed(&schema.unevaluated_items)?;
        out.unevaluated_properties = self.merge_boxed(&schema.unevaluated_properties)?;
        out.content_schema = self.merge_boxed(&schema.content_schema)?;

        out.properties = self.merge_map(&schema.properties)?;
        out.pattern_properties = self.merge_map(&schema.pattern_properties)?;
        out.dependent_schemas = self.merge_map(&schema.dependent_schemas)?;

        if let Some(AdditionalProperties::Schema(inner)) = &schema.additional_properties {
            out.additional_properties =
                Some(AdditionalProperties::Schema(Box::new(self.merge_ref(inner)?)));
        }

        Ok(out)
    }

    fn merge_list(&mut self, list: &[SchemaRef]) -> Result<Vec<SchemaRef>, MergeError> {
        list.iter().map(|child| self.merge_ref(child)).collect()
    }

    fn merge_boxed(
        &mut self,
        child: &Option<Box<SchemaRef>>,
    ) -> Result<Option<Box<SchemaRef>>, MergeError> {
        child
            .as_deref()
            .map(|child| self.merge_ref(child).map(Box::new))
            .transpose()
    }

    fn merge_map(
        &mut self,
        map: &BTreeMap<String, SchemaRef>,
    ) -> Result<BTreeMap<String, SchemaRef>, MergeError> {
        map.iter()
            .map(|(key, child)| self.merge_ref(child).map(|merged| (key.clone(), merged)))
            .collect()
    }

    fn resolve(&mut self, schema_ref: &SchemaRef) -> Result<Part, MergeError> {
        match schema_ref {
            SchemaRef::Inline(schema) => Ok(Part::Schema(self.flatten(schema, None)?)),
            SchemaRef::Ref(reference) => {
                let handle = self.enter_ref(reference)?;
                match self.state.merged(handle) {
                    Some(schema) if !self.state.is_circular(handle) => {
                        Ok(Part::Schema(schema.clone()))
                    }
                    _ => Ok(Part::Circular(reference.clone())),
                }
            }
        }
    }

    /// Merge children that several members declare for the same keyword
    fn merge_group(
        &mut self,
        refs: Vec<&SchemaRef>,
        on_circular: impl Fn(String) -> MergeError,
    ) -> Result<SchemaRef, MergeError> {
        let refs = distinct(refs);
        if let [single] = refs.as_slice() {
            return Ok((*single).clone());
        }

        let mut parts = Vec::with_capacity(refs.len());
        for schema_ref in refs {
            parts.push(self.resolve(schema_ref)?);
        }

        let members = into_schemas(parts, on_circular)?;
        Ok(SchemaRef::inline(self.merge_members(members)?))
    }

    fn merge_optional(
        &mut self,
        refs: Vec<&SchemaRef>,
        on_circular: impl Fn(String) -> MergeError,
    ) -> Result<Option<Box<SchemaRef>>, MergeError> {
        if refs.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(self.merge_group(refs, on_circular)?)))
    }

    /// Intersect already flattened members into one schema
    fn merge_members(&mut self, mut members: Vec<Schema>) -> Result<Schema, MergeError> {
        match members.len() {
            0 => return Ok(Schema::default()),
            1 => return Ok(members.remove(0)),
            _ => {}
        }

        let (minimum, exclusive_minimum) = keywords::resolve_minimum(&members);
        let (maximum, exclusive_maximum) = keywords::resolve_maximum(&members);
        let (multiple_of, residual_multiples) = keywords::resolve_multiple_of(&members);

        let mut merged = Schema {
            title: keywords::first_some(&members, |s| s.title.as_ref()),
            description: keywords::first_some(&members, |s| s.description.as_ref()),
            schema_type: keywords::resolve_type(&members)?,
            format: keywords::resolve_format(&members)?,
            minimum,
            maximum,
            exclusive_minimum,
            exclusive_maximum,
            multiple_of,
            min_length: keywords::max_of(&members, |s| s.min_length),
            max_length: keywords::min_of(&members, |s| s.max_length),
            min_items: keywords::max_of(&members, |s| s.min_items),
            max_items: keywords::min_of(&members, |s| s.max_items),
            min_properties: keywords::max_of(&members, |s| s.min_properties),
            max_properties: keywords::min_of(&members, |s| s.max_properties),
            unique_items: members.iter().any(|s| s.unique_items),
            pattern: keywords::resolve_pattern(&members),
            enum_values: keywords::resolve_enum(&members)?,
            const_value: keywords::resolve_const(&members)?,
            default: keywords::first_some(&members, |s| s.default.as_ref()),
            nullable: members.iter().all(|s| s.nullable),
            read_only: members.iter().any(|s| s.read_only),
            write_only: members.iter().any(|s| s.write_only),
            deprecated: members.iter().any(|s| s.deprecated),
            required: keywords::union_strings(members.iter().map(|s| &s.required)),
            dependent_required: keywords::resolve_dependent_required(&members),
            content_media_type: keywords::first_some(&members, |s| s.content_media_type.as_ref()),
            content_encoding: keywords::first_some(&members, |s| s.content_encoding.as_ref()),
            extensions: keywords::resolve_extensions(&members),
            ..Schema::default()
        };

        self.merge_composites(&members, &mut merged)?;
        merged.all_of.extend(residual_multiples.into_iter().map(|multiple_of| {
            SchemaRef::inline(Schema {
                multiple_of: Some(multiple_of),
                ..Schema::default()
            })
        }));
        Ok(merged)
    }

    fn merge_composites(&mut self, members: &[Schema], merged: &mut Schema) -> Result<(), MergeError> {
        merged.items = self.merge_optional(
            members.iter().filter_map(|s| s.items.as_deref()).collect(),
            MergeError::CircularItems,
        )?;
        merged.property_names = self.merge_optional(
            members.iter().filter_map(|s| s.property_names.as_deref()).collect(),
            circular("propertyNames"),
        )?;
        merged.unevaluated_items = self.merge_optional(
            members.iter().filter_map(|s| s.unevaluated_items.as_deref()).collect(),
            circular("unevaluatedItems"),
        )?;
        merged.unevaluated_properties = self.merge_optional(
            members.iter().filter_map(|s| s.unevaluated_properties.as_deref()).collect(),
            circular("unevaluatedProperties"),
        )?;
        merged.content_schema = self.merge_optional(
            members.iter().filter_map(|s| s.content_schema.as_deref()).collect(),
            circular("contentSchema"),
        )?;

        merged.properties = self.merge_properties(members)?;
        merged.additional_properties = self.merge_additional(members)?;
        merged.pattern_properties = self.merge_keyed(
            members.iter().map(|s| &s.pattern_properties).collect(),
            "patternProperties",
        )?;
        merged.dependent_schemas = self.merge_keyed(
            members.iter().map(|s| &s.dependent_schemas).collect(),
            "dependentSchemas",
        )?;
        merged.prefix_items = self.merge_prefix_items(members)?;

        merged.one_of = self.merge_alternatives(members.iter().map(|s| &s.one_of).collect(), "oneOf")?;
        merged.any_of = self.merge_alternatives(members.iter().map(|s| &s.any_of).collect(), "anyOf")?;

        let nots = distinct(members.iter().filter_map(|s| s.not.as_deref()).collect());
        merged.not = match nots.as_slice() {
            [] => None,
            [single] => Some(Box::new((*single).clone())),
            _ => Some(Box::new(SchemaRef::inline(Schema {
                any_of: nots.iter().map(|not| (*not).clone()).collect(),
                ..Schema::default()
            }))),
        };

        keep_residuals(members, merged);
        Ok(())
    }

    fn merge_properties(&mut self, members: &[Schema]) -> Result<BTreeMap<String, SchemaRef>, MergeError> {
        let closed: Vec<&Schema> = members.iter().filter(|s| s.is_closed()).collect();

        let names: BTreeSet<&String> = match closed.first() {
            None => members.iter().flat_map(|s| s.properties.keys()).collect(),
            Some(first) => first
                .properties
                .keys()
                .filter(|name| closed.iter().all(|s| s.properties.contains_key(*name)))
                .collect(),
        };

        let mut properties = BTreeMap::new();
        for name in names {
            let refs = members.iter().filter_map(|s| s.properties.get(name)).collect();
            let property = self.merge_group(refs, |reference| MergeError::CircularProperty {
                property: name.clone(),
                reference,
            })?;
            properties.insert(name.clone(), property);
        }
        Ok(properties)
    }

    fn merge_additional(&mut self, members: &[Schema]) -> Result<Option<AdditionalProperties>, MergeError> {
        if members.iter().any(Schema::is_closed) {
            return Ok(Some(AdditionalProperties::Bool(false)));
        }

        let schemas: Vec<&SchemaRef> = members
            .iter()
            .filter_map(|s| match &s.additional_properties {
                Some(AdditionalProperties::Schema(inner)) => Some(inner.as_ref()),
                _ => None,
            })
            .collect();

        if schemas.is_empty() {
            let open = members
                .iter()
                .any(|s| s.additional_properties == Some(AdditionalProperties::Bool(true)));
            return Ok(open.then_some(AdditionalProperties::Bool(true)));
        }

        let merged = self.merge_group(schemas, circular("additionalProperties"))?;
        Ok(Some(AdditionalProperties::Schema(Box::new(merged))))
    }

    fn merge_keyed(
        &mut self,
        maps: Vec<&BTreeMap<String, SchemaRef>>,
        keyword: &'static str,
    ) -> Result<BTreeMap<String, SchemaRef>, MergeError> {
        let keys: BTreeSet<&String> = maps.iter().flat_map(|map| map.keys()).collect();

        let mut out = BTreeMap::new();
        for key in keys {
            let refs = maps.iter().filter_map(|map| map.get(key)).collect();
            out.insert(key.clone(), self.merge_group(refs, circular(keyword))?);
        }
        Ok(out)
    }

    fn merge_prefix_items(&mut self, members: &[Schema]) -> Result<Vec<SchemaRef>, MergeError> {
        let len = members.iter().map(|s| s.prefix_items.len()).max().unwrap_or(0);

        (0..len)
            .map(|index| {
                let refs = members.iter().filter_map(|s| s.prefix_items.get(index)).collect();
                self.merge_group(refs, circular("prefixItems"))
            })
            .collect()
    }

    /// Cartesian product of every member's alternatives; each branch is
    /// merged with allOf semantics
    fn merge_alternatives(
        &mut self,
        lists: Vec<&Vec<SchemaRef>>,
        keyword: &'static str,
    ) -> Result<Vec<SchemaRef>, MergeError> {
        let lists: Vec<&Vec<SchemaRef>> = lists.into_iter().filter(|l| !l.is_empty()).collect();
        match lists.as_slice() {
            [] => return Ok(Vec::new()),
            [single] => return Ok((*single).clone()),
            _ => {}
        }

        let mut branches: Vec<Vec<&SchemaRef>> = vec![Vec::new()];
        for list in &lists {
            branches = branches
                .iter()
                .flat_map(|prefix| {
                    list.iter().map(move |alternative| {
                        let mut branch = prefix.clone();
                        branch.push(alternative);
                        branch
                    })
                })
                .collect();
        }

        tracing::trace!(keyword, branches = branches.len(), "merging alternatives");

        branches
            .into_iter()
            .map(|branch| self.merge_group(branch, circular(keyword)))
            .collect()
    }
}

fn circular(keyword: &'static str) -> impl Fn(String) -> MergeError {
    move |reference| MergeError::CircularRef { keyword, reference }
}

/// Concrete schemas of a group, failing if any member is circular
fn into_schemas(
    parts: Vec<Part>,
    on_circular: impl Fn(String) -> MergeError,
) -> Result<Vec<Schema>, MergeError> {
    parts
        .into_iter()
        .map(|part| match part {
            Part::Schema(schema) => Ok(schema),
            Part::Circular(reference) => {
                tracing::debug!(reference = %reference.reference, "cannot merge circular reference");
                Err(on_circular(reference.reference))
            }
        })
        .collect()
}

fn distinct(refs: Vec<&SchemaRef>) -> Vec<&SchemaRef> {
    let mut out: Vec<&SchemaRef> = Vec::with_capacity(refs.len());
    for schema_ref in refs {
        if !out.contains(&schema_ref) {
            out.push(schema_ref);
        }
    }
    out
}

/// `contains` and `if`/`then`/`else` do not combine conjunctively: the first
/// member keeps its keyword, later ones become residual `allOf` fragments
fn keep_residuals(members: &[Schema], merged: &mut Schema) {
    for member in members {
        merged.all_of.extend(member.all_of.iter().cloned());
    }

    let mut containing = members.iter().filter_map(|s| s.contains.as_ref());
    merged.contains = containing.next().cloned();
    for contains in containing {
        merged.all_of.push(SchemaRef::inline(Schema {
            contains: Some(contains.clone()),
            ..Schema::default()
        }));
    }

    let mut conditionals = members
        .iter()
        .filter(|s| s.if_schema.is_some() || s.then_schema.is_some() || s.else_schema.is_some());
    if let Some(first) = conditionals.next() {
        merged.if_schema = first.if_schema.clone();
        merged.then_schema = first.then_schema.clone();
        merged.else_schema = first.else_schema.clone();
    }
    for other in conditionals {
        merged.all_of.push(SchemaRef::inline(Schema {
            if_schema: other.if_schema.clone(),
            then_schema: other.then_schema.clone(),
            else_schema: other.else_schema.clone(),
            ..Schema::default()
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn schema(value: Value) -> Schema {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn schema_without_all_of_is_unchanged() {
        let input = schema(json!({
            "type": "object",
            "properties": {"name": {"type": "string", "maxLength": 10}},
            "required": ["name"]
        }));
        assert_eq!(merge_schema(&input).unwrap(), input);
    }

    #[test]
    fn nested_all_of_is_flattened() {
        let input = schema(json!({
            "type": "object",
            "properties": {
                "age": {"allOf": [{"type": "integer"}, {"minimum": 0}]}
            }
        }));
        let merged = merge_schema(&input).unwrap();
        assert_eq!(
            merged.properties["age"],
            SchemaRef::inline(schema(json!({"type": "integer", "minimum": 0})))
        );
    }

    #[test]
    fn base_keywords_join_the_group() {
        let input = schema(json!({
            "maxLength": 8,
            "allOf": [{"type": "string", "maxLength": 12}]
        }));
        assert_eq!(
            merge_schema(&input).unwrap(),
            schema(json!({"type": "string", "maxLength": 8}))
        );
    }

    #[test]
    fn nullable_requires_every_member() {
        let input = schema(json!({
            "allOf": [{"nullable": true}, {"nullable": true, "readOnly": true}, {"type": "string"}]
        }));
        let merged = merge_schema(&input).unwrap();
        assert!(!merged.nullable);
        assert!(merged.read_only);
    }

    #[test]
    fn multiple_nots_become_any_of() {
        let input = schema(json!({
            "allOf": [{"not": {"type": "string"}}, {"not": {"type": "boolean"}}]
        }));
        let merged = merge_schema(&input).unwrap();
        assert_eq!(
            merged.not.as_deref(),
            Some(&SchemaRef::inline(schema(json!({
                "anyOf": [{"type": "string"}, {"type": "boolean"}]
            }))))
        );
    }

    #[test]
    fn second_contains_is_kept_as_residual() {
        let input = schema(json!({
            "allOf": [
                {"type": "array", "contains": {"type": "string"}},
                {"contains": {"type": "integer"}}
            ]
        }));
        let merged = merge_schema(&input).unwrap();
        assert_eq!(
            merged.contains.as_deref(),
            Some(&SchemaRef::inline(Schema::typed("string")))
        );
        assert_eq!(
            merged.all_of,
            vec![SchemaRef::inline(schema(json!({"contains": {"type": "integer"}})))]
        );
    }

    #[test]
    fn prefix_items_merge_by_position() {
        let input = schema(json!({
            "allOf": [
                {"prefixItems": [{"type": "string"}, {"type": "integer"}]},
                {"prefixItems": [{"maxLength": 3}]}
            ]
        }));
        let merged = merge_schema(&input).unwrap();
        assert_eq!(
            merged.prefix_items,
            vec![
                SchemaRef::inline(schema(json!({"type": "string", "maxLength": 3}))),
                SchemaRef::inline(Schema::typed("integer")),
            ]
        );
    }

    #[test]
    fn unresolved_reference_fails() {
        let input = schema(json!({"allOf": [{"$ref": "#/components/schemas/Missing"}]}));
        assert_eq!(
            merge_schema(&input),
            Err(MergeError::UnresolvedRef("#/components/schemas/Missing".to_string()))
        );
    }
}
