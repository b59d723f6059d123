//! Compatibility rules
//!
//! Each rule is an independent pure function over the whole diff. Schema
//! rules inspect one node at a time through [`check_nodes`]; the variance of
//! the finding comes from the payload the node was reached from.

mod bounds;
mod endpoints;
mod properties;
mod types;
mod values;

use crate::catalog::{Action, Direction, Key, Site, Subject};
use crate::context::{OperationRef, RuleContext};
use crate::walk::{walk_modified, Access, Visit};
use apicompat_core::{ApiDiff, Change, OperationDiff, SchemaDiff};

/// Signature shared by all rules
pub type RuleFn = fn(&ApiDiff, &RuleContext<'_>) -> Vec<Change>;

/// A registered rule
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub check: RuleFn,
}

/// Every rule, in execution order
pub static RULES: &[Rule] = &[
    Rule { name: "type", check: types::check_type },
    Rule { name: "format", check: types::check_format },
    Rule { name: "enum", check: values::check_enum },
    Rule { name: "nullable", check: values::check_nullable },
    Rule { name: "x-extensible-enum", check: values::check_extensible_enum },
    Rule { name: "bounds", check: bounds::check_bounds },
    Rule { name: "pattern", check: bounds::check_pattern },
    Rule { name: "required", check: properties::check_required },
    Rule { name: "added-properties", check: properties::check_added },
    Rule { name: "removed-properties", check: properties::check_removed },
    Rule { name: "parameter-required", check: properties::check_parameter_required },
    Rule { name: "endpoint-added", check: endpoints::check_added },
    Rule { name: "endpoint-lifecycle", check: endpoints::check_lifecycle },
    Rule { name: "stability", check: endpoints::check_stability },
];

/// A classified observation before it is bound to a catalogue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub subject: Subject,
    pub action: Action,

    /// Arguments after the target label
    pub args: Vec<String>,

    /// Location of the finding when it is not the visited node itself
    pub property: Option<String>,
}

impl Finding {
    pub fn new(subject: Subject, action: Action, args: Vec<String>) -> Self {
        Self {
            subject,
            action,
            args,
            property: None,
        }
    }

    pub fn at(mut self, property: String) -> Self {
        self.property = Some(property);
        self
    }
}

/// A schema reached from an operation: a request body media type, a
/// response media type or a parameter
#[derive(Debug, Clone)]
pub struct Payload<'a> {
    pub direction: Direction,
    pub site: Site,
    pub diff: &'a SchemaDiff,

    /// `"<in> <name>"` for parameters, empty for bodies
    pub parameter: String,

    /// `(media type: ...)` suffix for bodies
    pub comment: Option<String>,
}

impl Payload<'_> {
    /// readOnly nodes never appear in requests, writeOnly nodes never
    /// appear in responses; either flag covers the whole subtree
    pub fn exempts(&self, access: Access) -> bool {
        match self.direction {
            Direction::Request => access.read_only,
            Direction::Response => access.write_only,
            Direction::Neutral => false,
        }
    }

    /// First message argument: where the change is
    pub fn label(&self, path: &str) -> String {
        match (self.parameter.is_empty(), path.is_empty()) {
            (true, true) => "/".to_string(),
            (true, false) => path.to_string(),
            (false, true) => self.parameter.clone(),
            (false, false) => format!("{}{}", self.parameter, path),
        }
    }
}

/// Every operation present in both versions
pub fn modified_operations(api: &ApiDiff) -> impl Iterator<Item = (OperationRef<'_>, &OperationDiff)> {
    api.paths.modified.iter().flat_map(|(path, operations)| {
        operations.modified.iter().map(move |(method, diff)| {
            let operation = OperationRef {
                method,
                path,
                operation_id: diff
                    .revision
                    .operation_id
                    .as_deref()
                    .or(diff.base.operation_id.as_deref()),
            };
            (operation, diff)
        })
    })
}

/// Schemas an operation diff carries, in request-body, response, parameter order
pub fn payloads(diff: &OperationDiff) -> Vec<Payload<'_>> {
    let mut payloads = Vec::new();

    if let Some(body) = &diff.request_body {
        for (media_type, schema) in &body.media_types {
            payloads.push(Payload {
                direction: Direction::Request,
                site: Site::Property,
                diff: schema,
                parameter: String::new(),
                comment: Some(format!("(media type: {})", media_type)),
            });
        }
    }

    for (status, content) in &diff.responses {
        for (media_type, schema) in &content.media_types {
            payloads.push(Payload {
                direction: Direction::Response,
                site: Site::Property,
                diff: schema,
                parameter: String::new(),
                comment: Some(format!("(media type: {}, status: {})", media_type, status)),
            });
        }
    }

    for parameter in &diff.parameters {
        if let Some(schema) = &parameter.schema {
            payloads.push(Payload {
                direction: Direction::Request,
                site: Site::Parameter,
                diff: schema,
                parameter: format!("{} {}", parameter.location, parameter.name),
                comment: None,
            });
        }
    }

    payloads
}

/// Bind a finding to its catalogue entry
pub fn emit(
    ctx: &RuleContext<'_>,
    operation: &OperationRef<'_>,
    payload: &Payload<'_>,
    path: &str,
    finding: Finding,
) -> Option<Change> {
    let key = Key::new(payload.direction, payload.site, finding.subject, finding.action);

    let mut args = Vec::with_capacity(finding.args.len() + 1);
    args.push(payload.label(path));
    args.extend(finding.args);

    let mut change = ctx.change(key, operation, args)?;
    if !path.is_empty() {
        change = change.with_property(path);
    }
    if let Some(comment) = &payload.comment {
        change = change.with_comment(comment.clone());
    }
    Some(change)
}

/// Run `check` on every modified, non-exempt schema node of every operation
pub fn check_nodes<F>(api: &ApiDiff, ctx: &RuleContext<'_>, check: F) -> Vec<Change>
where
    F: Fn(&Payload<'_>, &Visit<'_>) -> Vec<Finding>,
{
    let mut changes = Vec::new();

    for (operation, diff) in modified_operations(api) {
        for payload in payloads(diff) {
            walk_modified(payload.diff, |visit| {
                if payload.exempts(visit.access) {
                    return;
                }
                for mut finding in check(&payload, visit) {
                    let path = finding.property.take().unwrap_or_else(|| visit.path.clone());
                    changes.extend(emit(ctx, &operation, &payload, &path, finding));
                }
            });
        }
    }

    changes
}

/// `none` for an absent value
pub(crate) fn show<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "none".to_string(), ToString::to_string)
}
