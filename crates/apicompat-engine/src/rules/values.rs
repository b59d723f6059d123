//! Value-set changes: `enum`, `nullable`, `x-extensible-enum`

use super::{check_nodes, Finding};
use crate::catalog::{Action, Subject};
use crate::context::RuleContext;
use apicompat_core::{ApiDiff, Change};
use serde_json::Value;

const EXTENSIBLE_ENUM: &str = "x-extensible-enum";

fn show_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn check_enum(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    check_nodes(api, ctx, |_, visit| {
        let node = visit.node;
        let Some(diff) = &node.enum_diff else {
            return Vec::new();
        };

        // introducing or dropping the whole enumeration is not a per-value change
        if node.base.enum_values.is_empty() || node.revision.enum_values.is_empty() {
            return Vec::new();
        }

        let added = diff
            .added
            .iter()
            .map(|value| Finding::new(Subject::Enum, Action::Widened, vec![show_value(value)]));
        let deleted = diff
            .deleted
            .iter()
            .map(|value| Finding::new(Subject::Enum, Action::Narrowed, vec![show_value(value)]));
        added.chain(deleted).collect()
    })
}

pub fn check_nullable(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    check_nodes(api, ctx, |_, visit| match &visit.node.nullable {
        Some(diff) if !diff.from && diff.to => {
            vec![Finding::new(Subject::Nullable, Action::Widened, Vec::new())]
        }
        Some(diff) if diff.from && !diff.to => {
            vec![Finding::new(Subject::Nullable, Action::Narrowed, Vec::new())]
        }
        _ => Vec::new(),
    })
}

/// Values of an `x-extensible-enum`, or why it is malformed
pub(crate) fn extensible_values(value: &Value) -> Result<Vec<String>, String> {
    let Value::Array(items) = value else {
        return Err(format!("expected an array, got {}", value));
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            other => Err(format!("unsupported value {}", other)),
        })
        .collect()
}

pub fn check_extensible_enum(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    check_nodes(api, ctx, |_, visit| {
        let Some(diff) = visit.node.extensions.get(EXTENSIBLE_ENUM) else {
            return Vec::new();
        };
        let (Some(from), Some(to)) = (&diff.from, &diff.to) else {
            return match &diff.to {
                Some(to) => malformed(to).into_iter().collect(),
                None => Vec::new(),
            };
        };

        let to = match extensible_values(to) {
            Ok(values) => values,
            Err(reason) => {
                return vec![Finding::new(Subject::ExtensibleEnum, Action::Invalid, vec![reason])]
            }
        };
        // a malformed base was reported against the previous version
        let Ok(from) = extensible_values(from) else {
            return Vec::new();
        };

        let added = to
            .iter()
            .filter(|value| !from.contains(value))
            .map(|value| Finding::new(Subject::ExtensibleEnum, Action::Widened, vec![value.clone()]));
        let removed = from
            .iter()
            .filter(|value| !to.contains(value))
            .map(|value| Finding::new(Subject::ExtensibleEnum, Action::Narrowed, vec![value.clone()]));
        added.chain(removed).collect()
    })
}

fn malformed(value: &Value) -> Option<Finding> {
    extensible_values(value)
        .err()
        .map(|reason| Finding::new(Subject::ExtensibleEnum, Action::Invalid, vec![reason]))
}
