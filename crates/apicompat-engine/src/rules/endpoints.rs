//! Operation lifecycle: additions, deprecation, sunset and removal

use super::modified_operations;
use crate::catalog::{Action, Direction, Key, Site, Subject};
use crate::context::{OperationRef, RuleContext};
use crate::lifecycle::{evaluate_modified, evaluate_removed, evaluate_stability, Decision};
use apicompat_core::{ApiDiff, Change, Operation};

fn operation_ref<'a>(path: &'a str, method: &'a str, operation: &'a Operation) -> OperationRef<'a> {
    OperationRef {
        method,
        path,
        operation_id: operation.operation_id.as_deref(),
    }
}

fn decide(ctx: &RuleContext<'_>, operation: &OperationRef<'_>, decision: &Decision) -> Option<Change> {
    let key = Key::new(Direction::Neutral, Site::Endpoint, decision.subject(), decision.action());
    ctx.change(key, operation, decision.args())
}

/// Operations only present in the revision, whether or not their path is new
fn added(api: &ApiDiff) -> impl Iterator<Item = OperationRef<'_>> {
    let new_paths = api.paths.added.iter().flat_map(|(path, item)| {
        item.operations
            .iter()
            .map(move |(method, operation)| operation_ref(path, method, operation))
    });
    let new_methods = api.paths.modified.iter().flat_map(|(path, operations)| {
        operations
            .added
            .iter()
            .map(move |(method, operation)| operation_ref(path, method, operation))
    });
    new_paths.chain(new_methods)
}

/// Operations only present in the base, with their base declaration
fn deleted(api: &ApiDiff) -> impl Iterator<Item = (OperationRef<'_>, &Operation)> {
    let gone_paths = api.paths.deleted.iter().flat_map(|(path, item)| {
        item.operations
            .iter()
            .map(move |(method, operation)| (operation_ref(path, method, operation), operation))
    });
    let gone_methods = api.paths.modified.iter().flat_map(|(path, operations)| {
        operations
            .deleted
            .iter()
            .map(move |(method, operation)| (operation_ref(path, method, operation), operation))
    });
    gone_paths.chain(gone_methods)
}

pub fn check_added(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    let key = Key::new(Direction::Neutral, Site::Endpoint, Subject::Lifecycle, Action::Added);
    added(api)
        .filter_map(|operation| ctx.change(key, &operation, Vec::new()))
        .collect()
}

pub fn check_lifecycle(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    let policy = &ctx.config.sunset;
    let mut changes = Vec::new();

    for (operation, diff) in modified_operations(api) {
        if let Some(decision) = evaluate_modified(&diff.base, &diff.revision, policy, ctx.today) {
            tracing::debug!(path = operation.path, method = operation.method, ?decision, "lifecycle");
            changes.extend(decide(ctx, &operation, &decision));
        }
    }

    for (operation, base) in deleted(api) {
        let decision = evaluate_removed(base, policy, ctx.today);
        tracing::debug!(path = operation.path, method = operation.method, ?decision, "removal");
        changes.extend(decide(ctx, &operation, &decision));
    }

    changes
}

pub fn check_stability(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    modified_operations(api)
        .filter_map(|(operation, diff)| {
            let decision =
                evaluate_stability(&diff.base, &diff.revision, ctx.config.require_stability_level)?;
            decide(ctx, &operation, &decision)
        })
        .collect()
}
