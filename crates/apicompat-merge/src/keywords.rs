//! Scalar keyword resolution
//!
//! Each function takes the full group of subschemas being intersected and
//! returns the single value that satisfies all of them.

use crate::error::MergeError;
use apicompat_core::{NumericFormat, Schema, SchemaType};
use serde_json::Value;
use std::collections::BTreeMap;

const LOOKAHEAD_PREFIX: &str = "(?=";

/// Whether a type set admits values of type `name` (`integer` is a `number`)
fn admits(set: &[&str], name: &str) -> bool {
    set.contains(&name) || (name == "integer" && set.contains(&"number"))
}

pub(crate) fn resolve_type(members: &[Schema]) -> Result<Option<SchemaType>, MergeError> {
    let declared: Vec<Vec<&str>> = members
        .iter()
        .map(Schema::type_names)
        .filter(|names| !names.is_empty())
        .collect();

    if declared.is_empty() {
        return Ok(None);
    }

    let mut candidates: Vec<&str> = Vec::new();
    for name in declared.iter().flatten() {
        if !candidates.contains(name) {
            candidates.push(*name);
        }
    }

    let common: Vec<String> = candidates
        .iter()
        .filter(|name| declared.iter().all(|set| admits(set, name)))
        .map(|name| name.to_string())
        .collect();

    if common.is_empty() {
        return Err(MergeError::TypeConflict(
            candidates.iter().map(|name| name.to_string()).collect(),
        ));
    }

    Ok(Some(SchemaType::from_names(common)))
}

pub(crate) fn resolve_format(members: &[Schema]) -> Result<Option<String>, MergeError> {
    let mut formats: Vec<&str> = Vec::new();
    for format in members.iter().filter_map(|s| s.format.as_deref()) {
        if !formats.contains(&format) {
            formats.push(format);
        }
    }

    match formats.len() {
        0 => return Ok(None),
        1 => return Ok(Some(formats[0].to_string())),
        _ => {}
    }

    let numeric: Option<Vec<NumericFormat>> =
        formats.iter().map(|f| NumericFormat::parse(f)).collect();

    match numeric.and_then(|all| all.into_iter().min()) {
        Some(narrowest) => Ok(Some(narrowest.as_str().to_string())),
        None => Err(MergeError::FormatConflict(
            formats.iter().map(|f| f.to_string()).collect(),
        )),
    }
}

/// Tightest lower bound; a tie prefers the exclusive one
pub(crate) fn resolve_minimum(members: &[Schema]) -> (Option<f64>, bool) {
    let mut best: Option<(f64, bool)> = None;
    for schema in members {
        let Some(value) = schema.minimum else { continue };
        let exclusive = schema.exclusive_minimum;
        best = match best {
            Some((current, current_exclusive))
                if current > value || (current == value && (current_exclusive || !exclusive)) =>
            {
                Some((current, current_exclusive))
            }
            _ => Some((value, exclusive)),
        };
    }
    best.map_or((None, false), |(value, exclusive)| (Some(value), exclusive))
}

/// Tightest upper bound; a tie prefers the exclusive one
pub(crate) fn resolve_maximum(members: &[Schema]) -> (Option<f64>, bool) {
    let mut best: Option<(f64, bool)> = None;
    for schema in members {
        let Some(value) = schema.maximum else { continue };
        let exclusive = schema.exclusive_maximum;
        best = match best {
            Some((current, current_exclusive))
                if current < value || (current == value && (current_exclusive || !exclusive)) =>
            {
                Some((current, current_exclusive))
            }
            _ => Some((value, exclusive)),
        };
    }
    best.map_or((None, false), |(value, exclusive)| (Some(value), exclusive))
}

fn decimal_places(value: f64) -> u32 {
    let text = value.to_string();
    text.split_once('.')
        .map_or(0, |(_, fraction)| fraction.len() as u32)
}

/// Largest integer every f64 below it represents exactly
const EXACT_INTEGER: u64 = 1 << 53;

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u64, b: u64) -> Option<u64> {
    (a / gcd(a, b))
        .checked_mul(b)
        .filter(|multiple| *multiple <= EXACT_INTEGER)
}

/// Least common multiple, computed on values scaled to integers
fn scaled_lcm(values: &[f64]) -> Option<f64> {
    let places = values.iter().map(|v| decimal_places(*v)).max().unwrap_or(0);
    let factor = 10u64.checked_pow(places).filter(|f| *f <= EXACT_INTEGER)? as f64;

    values
        .iter()
        .map(|v| {
            let scaled = (v * factor).round();
            (1.0..=EXACT_INTEGER as f64).contains(&scaled).then_some(scaled as u64)
        })
        .try_fold(1, |acc, scaled| lcm(acc, scaled?))
        .map(|combined| combined as f64 / factor)
}

/// Combined `multipleOf` and the values that must stay separate constraints.
/// When the least common multiple cannot be represented exactly, the first
/// value is kept and every other one is returned as a residual.
pub(crate) fn resolve_multiple_of(members: &[Schema]) -> (Option<f64>, Vec<f64>) {
    let values: Vec<f64> = members
        .iter()
        .filter_map(|s| s.multiple_of)
        .filter(|v| *v > 0.0)
        .collect();

    match values.as_slice() {
        [] => (None, Vec::new()),
        [single] => (Some(*single), Vec::new()),
        [first, rest @ ..] => match scaled_lcm(&values) {
            Some(combined) => (Some(combined), Vec::new()),
            None => {
                tracing::debug!(?values, "multipleOf values have no exact common multiple");
                (Some(*first), rest.to_vec())
            }
        },
    }
}

pub(crate) fn max_of(members: &[Schema], field: impl Fn(&Schema) -> Option<u64>) -> Option<u64> {
    members.iter().filter_map(field).max()
}

pub(crate) fn min_of(members: &[Schema], field: impl Fn(&Schema) -> Option<u64>) -> Option<u64> {
    members.iter().filter_map(field).min()
}

fn as_lookahead(pattern: &str) -> String {
    if pattern.starts_with(LOOKAHEAD_PREFIX) && pattern.ends_with(')') {
        pattern.to_string()
    } else {
        format!("{}{})", LOOKAHEAD_PREFIX, pattern)
    }
}

/// Conjunction of patterns as a chain of lookaheads
pub(crate) fn resolve_pattern(members: &[Schema]) -> Option<String> {
    let mut patterns: Vec<&str> = Vec::new();
    for pattern in members.iter().filter_map(|s| s.pattern.as_deref()) {
        if !patterns.contains(&pattern) {
            patterns.push(pattern);
        }
    }

    match patterns.len() {
        0 => None,
        1 => Some(patterns[0].to_string()),
        _ => Some(patterns.iter().map(|p| as_lookahead(p)).collect()),
    }
}

pub(crate) fn resolve_enum(members: &[Schema]) -> Result<Vec<Value>, MergeError> {
    let mut lists = members
        .iter()
        .map(|s| &s.enum_values)
        .filter(|values| !values.is_empty());

    let Some(first) = lists.next() else {
        return Ok(Vec::new());
    };

    let mut common: Vec<Value> = first.clone();
    for values in lists {
        common.retain(|value| values.contains(value));
    }

    if common.is_empty() {
        return Err(MergeError::EmptyEnum);
    }
    Ok(common)
}

pub(crate) fn resolve_const(members: &[Schema]) -> Result<Option<Value>, MergeError> {
    let mut values = members.iter().filter_map(|s| s.const_value.as_ref());
    let Some(first) = values.next() else {
        return Ok(None);
    };
    if values.any(|value| value != first) {
        return Err(MergeError::EmptyEnum);
    }
    Ok(Some(first.clone()))
}

/// Deduplicated union, first-seen order
pub(crate) fn union_strings<'a>(lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in lists.flatten() {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

pub(crate) fn resolve_dependent_required(members: &[Schema]) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for schema in members {
        for (key, names) in &schema.dependent_required {
            let entry = out.entry(key.clone()).or_default();
            for name in names {
                if !entry.contains(name) {
                    entry.push(name.clone());
                }
            }
        }
    }
    out
}

pub(crate) fn first_some<T: Clone>(members: &[Schema], field: impl Fn(&Schema) -> Option<&T>) -> Option<T> {
    members.iter().find_map(|s| field(s).cloned())
}

/// Union of unrecognized keywords, first declaration wins
pub(crate) fn resolve_extensions(members: &[Schema]) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    for schema in members {
        for (key, value) in &schema.extensions {
            out.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    out
}
