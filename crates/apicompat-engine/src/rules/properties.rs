//! Property presence, `required`, and parameter `required`

use super::{check_nodes, emit, modified_operations, payloads, Finding, Payload};
use crate::catalog::{Action, Direction, Key, Site, Subject};
use crate::context::RuleContext;
use crate::walk::{walk_added, walk_deleted, Access, Leaf};
use apicompat_core::{ApiDiff, Change, SchemaDiff};

/// Whether the property is readOnly/writeOnly on the side `payload` travels
fn exempt_property(payload: &Payload<'_>, node: &SchemaDiff, name: &str) -> bool {
    [&node.base, &node.revision]
        .into_iter()
        .filter_map(|schema| schema.properties.get(name)?.as_inline())
        .any(|property| payload.exempts(Access::default().with(property)))
}

pub fn check_required(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    check_nodes(api, ctx, |payload, visit| {
        let node = visit.node;
        let Some(diff) = &node.required else {
            return Vec::new();
        };
        let properties = node.properties();

        // presence rules own properties that appeared or vanished together
        // with their `required` entry
        let fresh = |name: &String| properties.map_or(false, |p| p.added.contains_key(name));
        let gone = |name: &String| properties.map_or(false, |p| p.deleted.contains_key(name));

        let became_required = diff
            .added
            .iter()
            .filter(|name| !fresh(name))
            .map(|name| (name, Action::Narrowed));
        let became_optional = diff
            .deleted
            .iter()
            .filter(|name| !gone(name))
            .map(|name| (name, Action::Widened));

        became_required
            .chain(became_optional)
            .filter(|(name, _)| !exempt_property(payload, node, name))
            .map(|(name, action)| {
                Finding::new(Subject::Required, action, Vec::new())
                    .at(format!("{}/properties/{}", visit.path, name))
            })
            .collect()
    })
}

/// Collect added (or deleted) properties of every body payload and classify
/// each one that is not readOnly/writeOnly on its side
fn check_leaves<F>(api: &ApiDiff, ctx: &RuleContext<'_>, added: bool, classify: F) -> Vec<Change>
where
    F: Fn(&Payload<'_>, &Leaf<'_>) -> Action,
{
    let mut changes = Vec::new();

    for (operation, diff) in modified_operations(api) {
        for payload in payloads(diff) {
            if payload.site != Site::Property {
                continue;
            }

            let mut leaves = Vec::new();
            if added {
                walk_added(payload.diff, |leaf| leaves.push(leaf.clone()));
            } else {
                walk_deleted(payload.diff, |leaf| leaves.push(leaf.clone()));
            }

            for leaf in &leaves {
                if payload.exempts(leaf.access.with(leaf.schema)) {
                    continue;
                }
                let finding = Finding::new(Subject::Presence, classify(&payload, leaf), Vec::new());
                changes.extend(emit(ctx, &operation, &payload, &leaf.path, finding));
            }
        }
    }

    changes
}

pub fn check_added(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    check_leaves(api, ctx, true, |_, leaf| {
        if leaf.parent.revision.is_required(leaf.name) {
            Action::AddedRequired
        } else {
            Action::AddedOptional
        }
    })
}

pub fn check_removed(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    check_leaves(api, ctx, false, |payload, leaf| match payload.direction {
        Direction::Response if leaf.parent.base.is_required(leaf.name) => Action::RemovedRequired,
        Direction::Response => Action::RemovedOptional,
        _ => Action::Removed,
    })
}

pub fn check_parameter_required(api: &ApiDiff, ctx: &RuleContext<'_>) -> Vec<Change> {
    let mut changes = Vec::new();

    for (operation, diff) in modified_operations(api) {
        for parameter in &diff.parameters {
            let action = match &parameter.required {
                Some(required) if !required.from && required.to => Action::Narrowed,
                Some(required) if required.from && !required.to => Action::Widened,
                _ => continue,
            };
            let key = Key::new(Direction::Request, Site::Parameter, Subject::Required, action);
            let label = format!("{} {}", parameter.location, parameter.name);
            changes.extend(ctx.change(key, &operation, vec![label]));
        }
    }

    changes
}
