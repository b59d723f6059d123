//! `type` and `format` changes

use super::{check_nodes, show, Finding};
use crate::catalog::{Action, Subject};
use crate::context::RuleContext;
use apicompat_core::{ApiDiff, Change, NumericFormat};

/// Whether a type list accepts every value of type `name`
/// (an empty list is unconstrained, `integer` values are numbers)
fn admits(types: &[String], name: &str) -> bool {
    types.is_empty()
        || types.iter().any(|t| t == name)
        || (name == "integer" && types.iter().any(|t| t == "number"))
}

fn covers(outer: &[String], inner: &[String]) -> bool {
    if inner.is_empty() {
        return outer.is_empty();
    }
    inner.iter().all(|name| admits(outer, name))
}

/// Classify a change of the accepted type set
pub(crate) fn classify_types(from: &[String], to: &[String]) -> Option<Action> {
    match (covers(to, from), covers(from, to)) {
        (true, true) => None,
        (true, false) => Some(Action::Widened),
        (false, true) => Some(Action::Narrowed),
        (false, false) => Some(Action::Changed),
    }
}

fn show_types(types: &[String]) -> String {
    if types.is_empty() {
        "any".to_string()
    } else {
        types.join(", ")
    }
}

pub fn check_type(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    check_nodes(api, ctx, |_, visit| {
        let Some(diff) = &visit.node.type_diff else {
            return Vec::new();
        };

        classify_types(&diff.from, &diff.to)
            .map(|action| {
                Finding::new(
                    Subject::Type,
                    action,
                    vec![show_types(&diff.from), show_types(&diff.to)],
                )
            })
            .into_iter()
            .collect()
    })
}

/// Classify a change of `format`. Dropping a format accepts more, adding
/// one accepts less; numeric formats compare by range.
pub(crate) fn classify_format(from: Option<&str>, to: Option<&str>) -> Option<Action> {
    match (from, to) {
        (None, None) => None,
        (Some(_), None) => Some(Action::Widened),
        (None, Some(_)) => Some(Action::Narrowed),
        (Some(a), Some(b)) if a == b => None,
        (Some(a), Some(b)) => match (NumericFormat::parse(a), NumericFormat::parse(b)) {
            (Some(a), Some(b)) if b > a => Some(Action::Widened),
            (Some(a), Some(b)) if b < a => Some(Action::Narrowed),
            _ => Some(Action::Changed),
        },
    }
}

pub fn check_format(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    check_nodes(api, ctx, |_, visit| {
        let Some(diff) = &visit.node.format else {
            return Vec::new();
        };

        classify_format(diff.from.as_deref(), diff.to.as_deref())
            .map(|action| {
                Finding::new(
                    Subject::Format,
                    action,
                    vec![show(&diff.from), show(&diff.to)],
                )
            })
            .into_iter()
            .collect()
    })
}
