//! Schema diff traversal
//!
//! Every schema rule reaches the nodes it inspects through [`walk`]: a
//! depth-first, pre-order descent over a [`SchemaDiff`] that is exhaustive
//! over [`ChildDiff`]. Paths mirror the JSON pointer route to the node:
//!
//! - `/properties/<name>`, `/items`, `/additionalProperties`
//! - `/allOf[<label>]`, `/anyOf[<label>]`, `/oneOf[<label>]` (label is the
//!   ref name or `#<index>`)
//! - `/prefixItems[<index>]`, `/patternProperties[<pattern>]`,
//!   `/dependentSchemas[<key>]`
//! - `/contains`, `/propertyNames`, `/if`, `/then`, `/else`,
//!   `/unevaluatedItems`, `/unevaluatedProperties`, `/contentSchema`
//!
//! `not` is never descended: widening beneath it narrows the outer schema.
//! A property reachable through two composition branches is visited once
//! per branch. `readOnly`/`writeOnly` declared on a node carry down to
//! everything beneath it.

use apicompat_core::{ChildDiff, PropertiesDiff, Schema, SchemaDiff, SubschemasDiff};

/// `readOnly`/`writeOnly` in force at a node: its own or an ancestor's,
/// on either side of the diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Access {
    pub read_only: bool,
    pub write_only: bool,
}

impl Access {
    pub fn with(self, schema: &Schema) -> Self {
        Self {
            read_only: self.read_only || schema.read_only,
            write_only: self.write_only || schema.write_only,
        }
    }

    fn enter(self, node: &SchemaDiff) -> Self {
        self.with(&node.base).with(&node.revision)
    }
}

/// A modified node
#[derive(Debug, Clone)]
pub struct Visit<'a> {
    /// Route from the root (`""` for the root itself)
    pub path: String,

    /// Property name, empty for unnamed nodes
    pub name: &'a str,

    pub node: &'a SchemaDiff,

    /// The node this one was reached from, `None` for the root
    pub parent: Option<&'a SchemaDiff>,

    pub access: Access,
}

/// An added or deleted property
#[derive(Debug, Clone)]
pub struct Leaf<'a> {
    /// Route to the property, `/properties/<name>` included
    pub path: String,

    pub name: &'a str,

    /// Revision schema for additions, base schema for deletions
    pub schema: &'a Schema,

    /// The modified node owning the property
    pub parent: &'a SchemaDiff,

    /// Access of the owning node; the property's own flags are not included
    pub access: Access,
}

/// Callbacks invoked by [`walk`]
pub trait Visitor<'a> {
    fn modified(&mut self, _visit: &Visit<'a>) {}

    fn added(&mut self, _leaf: &Leaf<'a>) {}

    fn deleted(&mut self, _leaf: &Leaf<'a>) {}
}

/// Walk `diff` and everything reachable from it
pub fn walk<'a, V: Visitor<'a>>(diff: &'a SchemaDiff, visitor: &mut V) {
    descend(String::new(), "", diff, None, visitor);
}

/// Call `f` for the root and every modified node beneath it
pub fn walk_modified<'a, F: FnMut(&Visit<'a>)>(diff: &'a SchemaDiff, f: F) {
    walk(diff, &mut OnModified(f));
}

/// Call `f` for every added property
pub fn walk_added<'a, F: FnMut(&Leaf<'a>)>(diff: &'a SchemaDiff, f: F) {
    walk(diff, &mut OnAdded(f));
}

/// Call `f` for every deleted property
pub fn walk_deleted<'a, F: FnMut(&Leaf<'a>)>(diff: &'a SchemaDiff, f: F) {
    walk(diff, &mut OnDeleted(f));
}

struct OnModified<F>(F);
struct OnAdded<F>(F);
struct OnDeleted<F>(F);

impl<'a, F: FnMut(&Visit<'a>)> Visitor<'a> for OnModified<F> {
    fn modified(&mut self, visit: &Visit<'a>) {
        (self.0)(visit)
    }
}

impl<'a, F: FnMut(&Leaf<'a>)> Visitor<'a> for OnAdded<F> {
    fn added(&mut self, leaf: &Leaf<'a>) {
        (self.0)(leaf)
    }
}

impl<'a, F: FnMut(&Leaf<'a>)> Visitor<'a> for OnDeleted<F> {
    fn deleted(&mut self, leaf: &Leaf<'a>) {
        (self.0)(leaf)
    }
}

fn descend<'a, V: Visitor<'a>>(
    path: String,
    name: &'a str,
    node: &'a SchemaDiff,
    parent: Option<&Visit<'a>>,
    visitor: &mut V,
) {
    let inherited = parent.map_or_else(Access::default, |parent| parent.access);
    let visit = Visit {
        path,
        name,
        node,
        parent: parent.map(|parent| parent.node),
        access: inherited.enter(node),
    };
    visitor.modified(&visit);

    for child in &node.children {
        match child {
            ChildDiff::AllOf(diff) => subschemas(&visit, "allOf", diff, visitor),
            ChildDiff::AnyOf(diff) => subschemas(&visit, "anyOf", diff, visitor),
            ChildDiff::OneOf(diff) => subschemas(&visit, "oneOf", diff, visitor),
            ChildDiff::Not(_) => {}
            ChildDiff::Items(diff) => single(&visit, "items", diff, visitor),
            ChildDiff::Properties(diff) => properties(&visit, diff, visitor),
            ChildDiff::AdditionalProperties(diff) => {
                single(&visit, "additionalProperties", diff, visitor)
            }
            ChildDiff::PatternProperties(diff) => {
                keyed(&visit, "patternProperties", diff, visitor)
            }
            ChildDiff::DependentSchemas(diff) => {
                keyed(&visit, "dependentSchemas", diff, visitor)
            }
            ChildDiff::PrefixItems(diff) => {
                for (index, modified) in &diff.modified {
                    let route = format!("{}/prefixItems[{}]", visit.path, index);
                    descend(route, "", modified, Some(&visit), visitor);
                }
            }
            ChildDiff::Contains(diff) => single(&visit, "contains", diff, visitor),
            ChildDiff::PropertyNames(diff) => single(&visit, "propertyNames", diff, visitor),
            ChildDiff::If(diff) => single(&visit, "if", diff, visitor),
            ChildDiff::Then(diff) => single(&visit, "then", diff, visitor),
            ChildDiff::Else(diff) => single(&visit, "else", diff, visitor),
            ChildDiff::UnevaluatedItems(diff) => {
                single(&visit, "unevaluatedItems", diff, visitor)
            }
            ChildDiff::UnevaluatedProperties(diff) => {
                single(&visit, "unevaluatedProperties", diff, visitor)
            }
            ChildDiff::ContentSchema(diff) => single(&visit, "contentSchema", diff, visitor),
        }
    }
}

fn single<'a, V: Visitor<'a>>(
    parent: &Visit<'a>,
    keyword: &str,
    diff: &'a SchemaDiff,
    visitor: &mut V,
) {
    let route = format!("{}/{}", parent.path, keyword);
    descend(route, "", diff, Some(parent), visitor);
}

fn subschemas<'a, V: Visitor<'a>>(
    parent: &Visit<'a>,
    keyword: &str,
    diff: &'a SubschemasDiff,
    visitor: &mut V,
) {
    for modified in &diff.modified {
        let route = format!("{}/{}[{}]", parent.path, keyword, modified.key.label());
        descend(route, "", &modified.diff, Some(parent), visitor);
    }
}

fn keyed<'a, V: Visitor<'a>>(
    parent: &Visit<'a>,
    keyword: &str,
    diff: &'a PropertiesDiff,
    visitor: &mut V,
) {
    for (key, modified) in &diff.modified {
        let route = format!("{}/{}[{}]", parent.path, keyword, key);
        descend(route, "", modified, Some(parent), visitor);
    }
}

fn properties<'a, V: Visitor<'a>>(
    parent: &Visit<'a>,
    diff: &'a PropertiesDiff,
    visitor: &mut V,
) {
    let path = &parent.path;

    for (name, schema) in &diff.added {
        visitor.added(&Leaf {
            path: format!("{}/properties/{}", path, name),
            name,
            schema,
            parent: parent.node,
            access: parent.access,
        });
    }

    for (name, schema) in &diff.deleted {
        visitor.deleted(&Leaf {
            path: format!("{}/properties/{}", path, name),
            name,
            schema,
            parent: parent.node,
            access: parent.access,
        });
    }

    for (name, modified) in &diff.modified {
        let route = format!("{}/properties/{}", path, name);
        descend(route, name, modified, Some(parent), visitor);
    }
}
