//! Numeric, length and item-count bounds, and `pattern`

use super::{check_nodes, show, Finding};
use crate::catalog::{Action, Subject};
use crate::context::RuleContext;
use apicompat_core::{ApiDiff, Change, ValueDiff};
use std::fmt::Display;

/// An upper bound: raising or dropping it accepts more
pub(crate) fn classify_upper<T: PartialOrd>(from: &Option<T>, to: &Option<T>) -> Option<Action> {
    match (from, to) {
        (Some(_), None) => Some(Action::Widened),
        (None, Some(_)) => Some(Action::Narrowed),
        (Some(a), Some(b)) if b > a => Some(Action::Widened),
        (Some(a), Some(b)) if b < a => Some(Action::Narrowed),
        _ => None,
    }
}

/// A lower bound: lowering or dropping it accepts more
pub(crate) fn classify_lower<T: PartialOrd>(from: &Option<T>, to: &Option<T>) -> Option<Action> {
    match (from, to) {
        (Some(_), None) => Some(Action::Widened),
        (None, Some(_)) => Some(Action::Narrowed),
        (Some(a), Some(b)) if b < a => Some(Action::Widened),
        (Some(a), Some(b)) if b > a => Some(Action::Narrowed),
        _ => None,
    }
}

fn bound<T: PartialOrd + Display>(
    subject: Subject,
    diff: &Option<ValueDiff<Option<T>>>,
    classify: fn(&Option<T>, &Option<T>) -> Option<Action>,
) -> Option<Finding> {
    let diff = diff.as_ref()?;
    let action = classify(&diff.from, &diff.to)?;
    Some(Finding::new(subject, action, vec![show(&diff.from), show(&diff.to)]))
}

pub fn check_bounds(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    check_nodes(api, ctx, |_, visit| {
        let node = visit.node;
        [
            bound(Subject::MaxLength, &node.max_length, classify_upper),
            bound(Subject::MinLength, &node.min_length, classify_lower),
            bound(Subject::Maximum, &node.maximum, classify_upper),
            bound(Subject::Minimum, &node.minimum, classify_lower),
            bound(Subject::MaxItems, &node.max_items, classify_upper),
            bound(Subject::MinItems, &node.min_items, classify_lower),
        ]
        .into_iter()
        .flatten()
        .collect()
    })
}

pub fn check_pattern(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    check_nodes(api, ctx, |_, visit| {
        let Some(diff) = &visit.node.pattern else {
            return Vec::new();
        };

        let finding = match (&diff.from, &diff.to) {
            (Some(from), None) => Finding::new(Subject::Pattern, Action::Widened, vec![from.clone()]),
            (None, Some(to)) => Finding::new(Subject::Pattern, Action::Narrowed, vec![to.clone()]),
            (Some(from), Some(to)) if from != to => {
                Finding::new(Subject::Pattern, Action::Changed, vec![from.clone(), to.clone()])
            }
            _ => return Vec::new(),
        };
        vec![finding]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_bounds() {
        assert_eq!(classify_upper(&Some(10u64), &Some(20)), Some(Action::Widened));
        assert_eq!(classify_upper(&Some(10u64), &Some(5)), Some(Action::Narrowed));
        assert_eq!(classify_upper(&None, &Some(5u64)), Some(Action::Narrowed));
        assert_eq!(classify_upper(&Some(5.5f64), &None), Some(Action::Widened));
        assert_eq!(classify_upper(&Some(5u64), &Some(5)), None);
    }

    #[test]
    fn lower_bounds() {
        assert_eq!(classify_lower(&Some(1u64), &Some(3)), Some(Action::Narrowed));
        assert_eq!(classify_lower(&Some(3.0f64), &Some(0.5)), Some(Action::Widened));
        assert_eq!(classify_lower(&None, &Some(1u64)), Some(Action::Narrowed));
        assert_eq!(classify_lower(&Some(1u64), &None), Some(Action::Widened));
    }

    #[test]
    fn bound_finding_carries_values() {
        let diff = Some(ValueDiff::new(Some(10.0f64), Some(5.0)));
        let finding = bound(Subject::Maximum, &diff, classify_upper).unwrap();
        assert_eq!(finding.action, Action::Narrowed);
        assert_eq!(finding.args, vec!["10", "5"]);
    }
}
