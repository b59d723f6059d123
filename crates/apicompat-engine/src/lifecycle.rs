//! Deprecation and sunset policy
//!
//! An operation moves through
//! `Active -> Deprecated (no sunset) -> Deprecated (sunset ahead) ->
//! EligibleForRemoval (sunset reached) -> Removed`.
//! The required notice window depends on the operation's
//! `x-stability-level`; a missing level counts as `stable`.
//!
//! Everything here is pure: callers pass the evaluation date in.

use crate::catalog::{Action, Subject};
use apicompat_core::{Operation, StabilityLevel, SunsetPolicy};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// Sunset date extension
pub const SUNSET_EXTENSION: &str = "x-sunset";

/// Stability level extension
pub const STABILITY_EXTENSION: &str = "x-stability-level";

/// Declared sunset of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sunset {
    Missing,
    Invalid { value: String, reason: String },
    Date(NaiveDate),
}

impl Sunset {
    pub fn of(operation: &Operation) -> Self {
        match operation.extension(SUNSET_EXTENSION) {
            None => Self::Missing,
            Some(value) => match parse_sunset(value) {
                Ok(date) => Self::Date(date),
                Err(reason) => Self::Invalid {
                    value: display_value(value),
                    reason,
                },
            },
        }
    }
}

/// Declared stability of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stability {
    Missing,
    Invalid { value: String, reason: String },
    Level(StabilityLevel),
}

impl Stability {
    pub fn of(operation: &Operation) -> Self {
        match operation.extension(STABILITY_EXTENSION) {
            None => Self::Missing,
            Some(Value::String(text)) => match text.parse() {
                Ok(level) => Self::Level(level),
                Err(reason) => Self::Invalid {
                    value: text.clone(),
                    reason,
                },
            },
            Some(other) => Self::Invalid {
                value: other.to_string(),
                reason: "expected a string".to_string(),
            },
        }
    }

    /// Level used to pick the notice window
    pub fn effective(&self) -> StabilityLevel {
        match self {
            Self::Level(level) => *level,
            Self::Missing | Self::Invalid { .. } => StabilityLevel::Stable,
        }
    }
}

/// Where an operation stands on `today`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Active,

    /// Deprecated, sunset missing, malformed or still ahead
    Deprecated(Sunset),

    /// Deprecated and the sunset date has been reached
    EligibleForRemoval(NaiveDate),
}

impl LifecycleState {
    pub fn of(operation: &Operation, today: NaiveDate) -> Self {
        if !operation.deprecated {
            return Self::Active;
        }
        match Sunset::of(operation) {
            Sunset::Date(date) if date <= today => Self::EligibleForRemoval(date),
            sunset => Self::Deprecated(sunset),
        }
    }
}

/// Outcome of evaluating one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Reactivated,
    Deprecated {
        sunset: Option<NaiveDate>,
    },
    SunsetMissing {
        required_days: u32,
    },
    SunsetInvalid {
        value: String,
        reason: String,
    },
    SunsetTooSmall {
        sunset: NaiveDate,
        required_days: u32,
        today: NaiveDate,
    },
    SunsetChangedTooSmall {
        from: NaiveDate,
        to: NaiveDate,
        required_days: u32,
        today: NaiveDate,
    },
    Removed,
    RemovedWithoutDeprecation,
    RemovedWithoutSunset,
    RemovedBeforeSunset {
        sunset: NaiveDate,
    },
    StabilityDecreased {
        from: StabilityLevel,
        to: StabilityLevel,
    },
    StabilityInvalid {
        value: String,
        reason: String,
    },
    StabilityMissing,
}

impl Decision {
    pub fn subject(&self) -> Subject {
        match self {
            Self::StabilityDecreased { .. } | Self::StabilityInvalid { .. } | Self::StabilityMissing => {
                Subject::Stability
            }
            _ => Subject::Lifecycle,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Self::Reactivated => Action::Reactivated,
            Self::Deprecated { .. } => Action::Deprecated,
            Self::SunsetMissing { .. } => Action::SunsetMissing,
            Self::SunsetInvalid { .. } => Action::SunsetInvalid,
            Self::SunsetTooSmall { .. } => Action::SunsetTooSmall,
            Self::SunsetChangedTooSmall { .. } => Action::SunsetChangedTooSmall,
            Self::Removed => Action::Removed,
            Self::RemovedWithoutDeprecation => Action::RemovedWithoutDeprecation,
            Self::RemovedWithoutSunset => Action::RemovedWithoutSunset,
            Self::RemovedBeforeSunset { .. } => Action::RemovedBeforeSunset,
            Self::StabilityDecreased { .. } => Action::Decreased,
            Self::StabilityInvalid { .. } => Action::Invalid,
            Self::StabilityMissing => Action::Missing,
        }
    }

    /// Positional message arguments
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::Reactivated
            | Self::Removed
            | Self::RemovedWithoutDeprecation
            | Self::RemovedWithoutSunset
            | Self::StabilityMissing => Vec::new(),
            Self::Deprecated { sunset } => sunset.iter().map(ToString::to_string).collect(),
            Self::SunsetMissing { required_days } => vec![required_days.to_string()],
            Self::SunsetInvalid { value, reason } | Self::StabilityInvalid { value, reason } => {
                vec![value.clone(), reason.clone()]
            }
            Self::SunsetTooSmall {
                sunset,
                required_days,
                today,
            } => vec![sunset.to_string(), required_days.to_string(), today.to_string()],
            Self::SunsetChangedTooSmall {
                from,
                to,
                required_days,
                today,
            } => vec![
                from.to_string(),
                to.to_string(),
                required_days.to_string(),
                today.to_string(),
            ],
            Self::RemovedBeforeSunset { sunset } => vec![sunset.to_string()],
            Self::StabilityDecreased { from, to } => vec![from.to_string(), to.to_string()],
        }
    }
}

/// Parse an `x-sunset` value: `YYYY-MM-DD` or an RFC 3339 timestamp
pub fn parse_sunset(value: &Value) -> Result<NaiveDate, String> {
    let Value::String(text) = value else {
        return Err("expected a string".to_string());
    };

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(text)
        .map(|timestamp| timestamp.date_naive())
        .map_err(|e| e.to_string())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}

/// Notice window that applies to `operation`
pub fn required_days(operation: &Operation, policy: &SunsetPolicy) -> u32 {
    policy.required_days(Stability::of(operation).effective())
}

/// Evaluate an operation present in both versions
pub fn evaluate_modified(
    base: &Operation,
    revision: &Operation,
    policy: &SunsetPolicy,
    today: NaiveDate,
) -> Option<Decision> {
    let window = required_days(revision, policy);

    match (base.deprecated, revision.deprecated) {
        (true, false) => Some(Decision::Reactivated),
        (false, true) => Some(evaluate_deprecation(revision, window, today)),
        (true, true) => evaluate_sunset_change(base, revision, window, today),
        (false, false) => None,
    }
}

fn evaluate_deprecation(revision: &Operation, window: u32, today: NaiveDate) -> Decision {
    match Sunset::of(revision) {
        Sunset::Missing if window > 0 => Decision::SunsetMissing {
            required_days: window,
        },
        Sunset::Missing => Decision::Deprecated { sunset: None },
        Sunset::Invalid { value, reason } => Decision::SunsetInvalid { value, reason },
        Sunset::Date(sunset) if window > 0 && days_until(sunset, today) < i64::from(window) => {
            Decision::SunsetTooSmall {
                sunset,
                required_days: window,
                today,
            }
        }
        Sunset::Date(sunset) => Decision::Deprecated {
            sunset: Some(sunset),
        },
    }
}

/// Already deprecated: the sunset must stay parsable and may not be
/// pulled inside the window
fn evaluate_sunset_change(
    base: &Operation,
    revision: &Operation,
    window: u32,
    today: NaiveDate,
) -> Option<Decision> {
    let (from, to) = match (Sunset::of(base), Sunset::of(revision)) {
        (_, Sunset::Invalid { value, reason }) => {
            return Some(Decision::SunsetInvalid { value, reason });
        }
        (Sunset::Date(from), Sunset::Date(to)) => (from, to),
        _ => return None,
    };

    if to < from && window > 0 && days_until(to, today) < i64::from(window) {
        return Some(Decision::SunsetChangedTooSmall {
            from,
            to,
            required_days: window,
            today,
        });
    }
    None
}

/// Evaluate an operation that no longer exists in the revision
pub fn evaluate_removed(base: &Operation, policy: &SunsetPolicy, today: NaiveDate) -> Decision {
    let window = required_days(base, policy);

    match LifecycleState::of(base, today) {
        LifecycleState::Active if window > 0 => Decision::RemovedWithoutDeprecation,
        LifecycleState::Deprecated(Sunset::Missing) if window > 0 => Decision::RemovedWithoutSunset,
        LifecycleState::Deprecated(Sunset::Invalid { value, reason }) if window > 0 => {
            Decision::SunsetInvalid { value, reason }
        }
        LifecycleState::Deprecated(Sunset::Date(sunset)) => Decision::RemovedBeforeSunset { sunset },
        _ => Decision::Removed,
    }
}

/// Evaluate the stability annotation of an operation present in both versions
pub fn evaluate_stability(
    base: &Operation,
    revision: &Operation,
    require_level: bool,
) -> Option<Decision> {
    match (Stability::of(base), Stability::of(revision)) {
        (_, Stability::Invalid { value, reason }) => Some(Decision::StabilityInvalid { value, reason }),
        (_, Stability::Missing) if require_level => Some(Decision::StabilityMissing),
        (Stability::Level(from), Stability::Level(to)) if to < from => {
            Some(Decision::StabilityDecreased { from, to })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn operation(value: Value) -> Operation {
        serde_json::from_value(value).unwrap()
    }

    fn today() -> NaiveDate {
        date(2024, 1, 1)
    }

    #[test]
    fn sunset_formats() {
        assert_eq!(parse_sunset(&json!("2025-02-03")), Ok(date(2025, 2, 3)));
        assert_eq!(parse_sunset(&json!("2025-02-03T10:00:00Z")), Ok(date(2025, 2, 3)));
        assert!(parse_sunset(&json!("next week")).is_err());
        assert!(parse_sunset(&json!(20250203)).is_err());
    }

    #[test]
    fn reactivation_is_reported() {
        let base = operation(json!({"deprecated": true}));
        let revision = operation(json!({}));
        assert_eq!(
            evaluate_modified(&base, &revision, &SunsetPolicy::default(), today()),
            Some(Decision::Reactivated)
        );
    }

    #[test]
    fn deprecation_without_sunset() {
        let base = operation(json!({}));
        let revision = operation(json!({"deprecated": true}));

        assert_eq!(
            evaluate_modified(&base, &revision, &SunsetPolicy::default(), today()),
            Some(Decision::SunsetMissing { required_days: 180 })
        );
        assert_eq!(
            evaluate_modified(&base, &revision, &SunsetPolicy::disabled(), today()),
            Some(Decision::Deprecated { sunset: None })
        );
    }

    #[test]
    fn deprecation_window_follows_stability() {
        let base = operation(json!({}));
        let revision = operation(json!({
            "deprecated": true,
            "x-sunset": "2024-02-15",
            "x-stability-level": "beta"
        }));

        assert_eq!(
            evaluate_modified(&base, &revision, &SunsetPolicy::default(), today()),
            Some(Decision::Deprecated {
                sunset: Some(date(2024, 2, 15))
            })
        );

        let stable = operation(json!({"deprecated": true, "x-sunset": "2024-02-15"}));
        assert_eq!(
            evaluate_modified(&base, &stable, &SunsetPolicy::default(), today()),
            Some(Decision::SunsetTooSmall {
                sunset: date(2024, 2, 15),
                required_days: 180,
                today: today(),
            })
        );
    }

    #[test]
    fn sunset_far_enough_is_informational() {
        let base = operation(json!({}));
        let revision = operation(json!({"deprecated": true, "x-sunset": "2025-02-04"}));

        assert_eq!(
            evaluate_modified(&base, &revision, &SunsetPolicy::default(), today()),
            Some(Decision::Deprecated {
                sunset: Some(date(2025, 2, 4))
            })
        );
    }

    #[test]
    fn unparsable_sunset() {
        let base = operation(json!({}));
        let revision = operation(json!({"deprecated": true, "x-sunset": "soon"}));

        assert!(matches!(
            evaluate_modified(&base, &revision, &SunsetPolicy::default(), today()),
            Some(Decision::SunsetInvalid { value, .. }) if value == "soon"
        ));
    }

    #[test]
    fn sunset_broken_on_deprecated_operation() {
        let base = operation(json!({"deprecated": true, "x-sunset": "2025-06-01"}));
        let revision = operation(json!({"deprecated": true, "x-sunset": "soon"}));

        assert!(matches!(
            evaluate_modified(&base, &revision, &SunsetPolicy::default(), today()),
            Some(Decision::SunsetInvalid { value, .. }) if value == "soon"
        ));
    }

    #[test]
    fn sunset_pulled_forward() {
        let base = operation(json!({"deprecated": true, "x-sunset": "2025-01-01"}));
        let revision = operation(json!({"deprecated": true, "x-sunset": "2024-03-01"}));

        assert!(matches!(
            evaluate_modified(&base, &revision, &SunsetPolicy::default(), today()),
            Some(Decision::SunsetChangedTooSmall { .. })
        ));

        let later = operation(json!({"deprecated": true, "x-sunset": "2025-06-01"}));
        assert_eq!(
            evaluate_modified(&base, &later, &SunsetPolicy::default(), today()),
            None
        );
    }

    #[test]
    fn removal_decisions() {
        let policy = SunsetPolicy::default();

        let active = operation(json!({}));
        assert_eq!(evaluate_removed(&active, &policy, today()), Decision::RemovedWithoutDeprecation);

        let draft = operation(json!({"x-stability-level": "draft"}));
        assert_eq!(evaluate_removed(&draft, &policy, today()), Decision::Removed);

        let no_sunset = operation(json!({"deprecated": true}));
        assert_eq!(evaluate_removed(&no_sunset, &policy, today()), Decision::RemovedWithoutSunset);

        let early = operation(json!({"deprecated": true, "x-sunset": "2024-06-01"}));
        assert_eq!(
            evaluate_removed(&early, &policy, today()),
            Decision::RemovedBeforeSunset {
                sunset: date(2024, 6, 1)
            }
        );

        let reached = operation(json!({"deprecated": true, "x-sunset": "2023-12-31"}));
        assert_eq!(evaluate_removed(&reached, &policy, today()), Decision::Removed);
    }

    #[test]
    fn lifecycle_states() {
        assert_eq!(LifecycleState::of(&operation(json!({})), today()), LifecycleState::Active);
        assert_eq!(
            LifecycleState::of(&operation(json!({"deprecated": true})), today()),
            LifecycleState::Deprecated(Sunset::Missing)
        );
        assert_eq!(
            LifecycleState::of(&operation(json!({"deprecated": true, "x-sunset": "2024-01-01"})), today()),
            LifecycleState::EligibleForRemoval(date(2024, 1, 1))
        );
    }

    #[test]
    fn stability_checks() {
        let stable = operation(json!({"x-stability-level": "stable"}));
        let beta = operation(json!({"x-stability-level": "beta"}));
        let bogus = operation(json!({"x-stability-level": "experimental"}));
        let missing = operation(json!({}));

        assert_eq!(
            evaluate_stability(&stable, &beta, false),
            Some(Decision::StabilityDecreased {
                from: StabilityLevel::Stable,
                to: StabilityLevel::Beta
            })
        );
        assert_eq!(evaluate_stability(&beta, &stable, false), None);
        assert!(matches!(
            evaluate_stability(&stable, &bogus, false),
            Some(Decision::StabilityInvalid { .. })
        ));
        assert_eq!(evaluate_stability(&stable, &missing, false), None);
        assert_eq!(evaluate_stability(&stable, &missing, true), Some(Decision::StabilityMissing));
    }
}
