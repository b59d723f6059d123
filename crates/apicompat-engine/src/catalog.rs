//! Change catalogue
//!
//! Every change id the engine can emit, with its default severity and its
//! English message template. The table is built at compile time and checked
//! for duplicate ids and classification keys on first use.
//!
//! IMPORTANT: ids are part of the public API (severity overrides, custom
//! rule selections). Never rename an entry.

use apicompat_core::Severity;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Which side of the exchange a schema describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Sent by the client, consumed by the server (contravariant)
    Request,

    /// Produced by the server, consumed by the client (covariant)
    Response,

    /// Not tied to a payload (endpoint lifecycle)
    Neutral,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Neutral => "-",
        }
    }
}

/// Where in the operation the change was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Site {
    Property,
    Parameter,
    Endpoint,
}

impl Site {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Property => "property",
            Self::Parameter => "parameter",
            Self::Endpoint => "endpoint",
        }
    }
}

/// What changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subject {
    Type,
    Format,
    Enum,
    Nullable,
    MaxLength,
    MinLength,
    Maximum,
    Minimum,
    MaxItems,
    MinItems,
    Pattern,
    Required,
    ExtensibleEnum,
    Presence,
    Lifecycle,
    Stability,
}

/// How it changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// The set of accepted values grew
    Widened,

    /// The set of accepted values shrank
    Narrowed,

    /// Neither a superset nor a subset
    Changed,

    Invalid,
    AddedRequired,
    AddedOptional,
    Removed,
    RemovedRequired,
    RemovedOptional,
    Added,
    Reactivated,
    Deprecated,
    SunsetMissing,
    SunsetInvalid,
    SunsetTooSmall,
    SunsetChangedTooSmall,
    RemovedWithoutDeprecation,
    RemovedWithoutSunset,
    RemovedBeforeSunset,
    Decreased,
    Missing,
}

/// Classification key of a catalogue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub direction: Direction,
    pub site: Site,
    pub subject: Subject,
    pub action: Action,
}

impl Key {
    pub const fn new(direction: Direction, site: Site, subject: Subject, action: Action) -> Self {
        Self {
            direction,
            site,
            subject,
            action,
        }
    }
}

/// One catalogue row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    pub id: &'static str,
    pub direction: Direction,
    pub site: Site,
    pub subject: Subject,
    pub action: Action,

    /// Default severity, before config overrides
    pub level: Severity,

    /// English message; `{n}` is replaced by the n-th argument
    pub template: &'static str,
}

impl RuleEntry {
    pub const fn key(&self) -> Key {
        Key::new(self.direction, self.site, self.subject, self.action)
    }
}

/// Default severity of a widening or narrowing.
///
/// Requests are contravariant: accepting more is safe, accepting less breaks
/// clients. Responses are covariant: producing more breaks clients that
/// match on a closed set, producing less is safe.
pub const fn variance_level(direction: Direction, action: Action) -> Severity {
    match (direction, action) {
        (Direction::Request, Action::Widened) => Severity::Info,
        (Direction::Request, Action::Narrowed) => Severity::Error,
        (Direction::Response, Action::Widened) => Severity::Error,
        (Direction::Response, Action::Narrowed) => Severity::Info,
        _ => Severity::Warn,
    }
}

/// Catalogue inconsistencies and references to ids it does not know
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate change id '{0}'")]
    DuplicateId(&'static str),

    #[error("change id '{id}' repeats classification key {key}")]
    DuplicateKey { id: &'static str, key: String },

    #[error("severity override for unknown change id '{0}'")]
    UnknownOverride(String),

    #[error("custom rule selection names unknown change id '{0}'")]
    UnknownRule(String),
}

macro_rules! entry {
    ($direction:ident, $site:ident, $subject:ident, $action:ident, $level:expr, $id:expr, $template:expr) => {
        RuleEntry {
            id: $id,
            direction: Direction::$direction,
            site: Site::$site,
            subject: Subject::$subject,
            action: Action::$action,
            level: $level,
            template: $template,
        }
    };
}

/// Widened/narrowed pairs for every payload site, severities from
/// [`variance_level`]
macro_rules! variance {
    ($subject:ident, $widened:literal => $widened_text:literal, $narrowed:literal => $narrowed_text:literal) => {
        [
            variance!(@site Request, Property, $subject, Widened, $widened, $widened_text),
            variance!(@site Request, Property, $subject, Narrowed, $narrowed, $narrowed_text),
            variance!(@site Request, Parameter, $subject, Widened, $widened, $widened_text),
            variance!(@site Request, Parameter, $subject, Narrowed, $narrowed, $narrowed_text),
            variance!(@site Response, Property, $subject, Widened, $widened, $widened_text),
            variance!(@site Response, Property, $subject, Narrowed, $narrowed, $narrowed_text),
        ]
    };
    (@site Request, Property, $subject:ident, $action:ident, $suffix:literal, $text:literal) => {
        entry!(Request, Property, $subject, $action,
            variance_level(Direction::Request, Action::$action),
            concat!("request-property-", $suffix), concat!("request property {0} ", $text))
    };
    (@site Request, Parameter, $subject:ident, $action:ident, $suffix:literal, $text:literal) => {
        entry!(Request, Parameter, $subject, $action,
            variance_level(Direction::Request, Action::$action),
            concat!("request-parameter-", $suffix), concat!("request parameter {0} ", $text))
    };
    (@site Response, Property, $subject:ident, $action:ident, $suffix:literal, $text:literal) => {
        entry!(Response, Property, $subject, $action,
            variance_level(Direction::Response, Action::$action),
            concat!("response-property-", $suffix), concat!("response property {0} ", $text))
    };
}

/// One action for every payload site with explicit severities
macro_rules! per_site {
    ($subject:ident, $action:ident, $suffix:literal => $text:literal,
     [$request_property:ident, $request_parameter:ident, $response_property:ident]) => {
        [
            entry!(Request, Property, $subject, $action, Severity::$request_property,
                concat!("request-property-", $suffix), concat!("request property {0} ", $text)),
            entry!(Request, Parameter, $subject, $action, Severity::$request_parameter,
                concat!("request-parameter-", $suffix), concat!("request parameter {0} ", $text)),
            entry!(Response, Property, $subject, $action, Severity::$response_property,
                concat!("response-property-", $suffix), concat!("response property {0} ", $text)),
        ]
    };
}

static CATALOG: &[&[RuleEntry]] = &[
    &variance!(Type,
        "type-widened" => "type was widened from {1} to {2}",
        "type-narrowed" => "type was narrowed from {1} to {2}"),
    &per_site!(Type, Changed, "type-changed" => "type was changed from {1} to {2}",
        [Error, Error, Error]),
    &variance!(Format,
        "format-widened" => "format was widened from {1} to {2}",
        "format-narrowed" => "format was narrowed from {1} to {2}"),
    &per_site!(Format, Changed, "format-changed" => "format was changed from {1} to {2}",
        [Error, Error, Error]),
    &variance!(Enum,
        "enum-value-added" => "enum value {1} was added",
        "enum-value-removed" => "enum value {1} was removed"),
    &variance!(Nullable,
        "became-nullable" => "became nullable",
        "became-not-nullable" => "became not nullable"),
    &variance!(MaxLength,
        "max-length-increased" => "maxLength was increased from {1} to {2}",
        "max-length-decreased" => "maxLength was decreased from {1} to {2}"),
    &variance!(MinLength,
        "min-length-decreased" => "minLength was decreased from {1} to {2}",
        "min-length-increased" => "minLength was increased from {1} to {2}"),
    &variance!(Maximum,
        "max-increased" => "maximum was increased from {1} to {2}",
        "max-decreased" => "maximum was decreased from {1} to {2}"),
    &variance!(Minimum,
        "min-decreased" => "minimum was decreased from {1} to {2}",
        "min-increased" => "minimum was increased from {1} to {2}"),
    &variance!(MaxItems,
        "max-items-increased" => "maxItems was increased from {1} to {2}",
        "max-items-decreased" => "maxItems was decreased from {1} to {2}"),
    &variance!(MinItems,
        "min-items-decreased" => "minItems was decreased from {1} to {2}",
        "min-items-increased" => "minItems was increased from {1} to {2}"),
    &variance!(Pattern,
        "pattern-removed" => "pattern {1} was removed",
        "pattern-added" => "pattern {1} was added"),
    &per_site!(Pattern, Changed, "pattern-changed" => "pattern was changed from {1} to {2}",
        [Warn, Warn, Warn]),
    &variance!(Required,
        "became-optional" => "became optional",
        "became-required" => "became required"),
    &per_site!(ExtensibleEnum, Widened,
        "x-extensible-enum-value-added" => "x-extensible-enum value {1} was added",
        [Info, Info, Info]),
    &per_site!(ExtensibleEnum, Narrowed,
        "x-extensible-enum-value-removed" => "x-extensible-enum value {1} was removed",
        [Error, Error, Info]),
    &per_site!(ExtensibleEnum, Invalid,
        "x-extensible-enum-invalid" => "has a malformed x-extensible-enum: {1}",
        [Error, Error, Error]),
    &[
        entry!(Request, Property, Presence, AddedRequired, Severity::Error,
            "new-required-request-property", "added required request property {0}"),
        entry!(Request, Property, Presence, AddedOptional, Severity::Info,
            "new-optional-request-property", "added optional request property {0}"),
        entry!(Request, Property, Presence, Removed, Severity::Warn,
            "request-property-removed", "removed request property {0}"),
        entry!(Response, Property, Presence, AddedRequired, Severity::Info,
            "response-required-property-added", "added required response property {0}"),
        entry!(Response, Property, Presence, AddedOptional, Severity::Info,
            "response-optional-property-added", "added optional response property {0}"),
        entry!(Response, Property, Presence, RemovedRequired, Severity::Error,
            "response-required-property-removed", "removed required response property {0}"),
        entry!(Response, Property, Presence, RemovedOptional, Severity::Warn,
            "response-optional-property-removed", "removed optional response property {0}"),
    ],
    &[
        entry!(Neutral, Endpoint, Lifecycle, Added, Severity::Info,
            "endpoint-added", "endpoint added"),
        entry!(Neutral, Endpoint, Lifecycle, Reactivated, Severity::Info,
            "endpoint-reactivated", "endpoint reactivated"),
        entry!(Neutral, Endpoint, Lifecycle, Deprecated, Severity::Info,
            "endpoint-deprecated", "endpoint deprecated"),
        entry!(Neutral, Endpoint, Lifecycle, SunsetMissing, Severity::Error,
            "api-deprecated-sunset-missing",
            "api deprecated without a sunset date, at least {0} days of notice are required"),
        entry!(Neutral, Endpoint, Lifecycle, SunsetInvalid, Severity::Error,
            "api-deprecated-sunset-parse", "failed to parse sunset date {0}: {1}"),
        entry!(Neutral, Endpoint, Lifecycle, SunsetTooSmall, Severity::Error,
            "api-sunset-date-too-small",
            "sunset date {0} is too early, it must be at least {1} days after {2}"),
        entry!(Neutral, Endpoint, Lifecycle, SunsetChangedTooSmall, Severity::Error,
            "api-sunset-date-changed-too-small",
            "sunset date moved from {0} to {1}, it must stay at least {2} days after {3}"),
        entry!(Neutral, Endpoint, Lifecycle, Removed, Severity::Info,
            "endpoint-removed", "endpoint removed"),
        entry!(Neutral, Endpoint, Lifecycle, RemovedWithoutDeprecation, Severity::Error,
            "api-removed-without-deprecation", "api removed without deprecation"),
        entry!(Neutral, Endpoint, Lifecycle, RemovedWithoutSunset, Severity::Error,
            "api-removed-without-sunset", "api removed after deprecation without a sunset date"),
        entry!(Neutral, Endpoint, Lifecycle, RemovedBeforeSunset, Severity::Error,
            "api-removed-before-sunset", "api removed before the sunset date {0}"),
        entry!(Neutral, Endpoint, Stability, Decreased, Severity::Error,
            "api-stability-decreased", "stability level decreased from {0} to {1}"),
        entry!(Neutral, Endpoint, Stability, Invalid, Severity::Error,
            "api-invalid-stability-level", "invalid stability level {0}: {1}"),
        entry!(Neutral, Endpoint, Stability, Missing, Severity::Error,
            "api-stability-level-missing", "stability level is missing"),
    ],
];

struct Index {
    by_id: HashMap<&'static str, &'static RuleEntry>,
    by_key: HashMap<Key, &'static RuleEntry>,
    error: Option<CatalogError>,
}

fn index() -> &'static Index {
    static INDEX: OnceLock<Index> = OnceLock::new();
    INDEX.get_or_init(|| build_index(entries()))
}

fn build_index(entries: impl Iterator<Item = &'static RuleEntry>) -> Index {
    let mut index = Index {
        by_id: HashMap::new(),
        by_key: HashMap::new(),
        error: None,
    };

    for entry in entries {
        if index.by_id.insert(entry.id, entry).is_some() && index.error.is_none() {
            index.error = Some(CatalogError::DuplicateId(entry.id));
        }
        if index.by_key.insert(entry.key(), entry).is_some() && index.error.is_none() {
            index.error = Some(CatalogError::DuplicateKey {
                id: entry.id,
                key: format!("{:?}", entry.key()),
            });
        }
    }

    index
}

/// All entries in declaration order
pub fn entries() -> impl Iterator<Item = &'static RuleEntry> {
    CATALOG.iter().flat_map(|group| group.iter())
}

/// Check the table for duplicate ids and keys (computed once per process)
pub fn validate() -> Result<(), CatalogError> {
    match &index().error {
        Some(error) => Err(error.clone()),
        None => Ok(()),
    }
}

/// Look up an entry by change id
pub fn by_id(id: &str) -> Option<&'static RuleEntry> {
    index().by_id.get(id).copied()
}

/// Look up the entry classifying `key`
pub fn find(key: Key) -> Option<&'static RuleEntry> {
    index().by_key.get(&key).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_consistent() {
        assert_eq!(validate(), Ok(()));
        assert!(entries().count() > 100);
    }

    #[test]
    fn variance_ids_and_levels() {
        let widened = find(Key::new(Direction::Response, Site::Property, Subject::Type, Action::Widened)).unwrap();
        assert_eq!(widened.id, "response-property-type-widened");
        assert_eq!(widened.level, Severity::Error);

        let widened = find(Key::new(Direction::Request, Site::Property, Subject::Type, Action::Widened)).unwrap();
        assert_eq!(widened.id, "request-property-type-widened");
        assert_eq!(widened.level, Severity::Info);

        let narrowed = by_id("request-parameter-max-length-decreased").unwrap();
        assert_eq!(narrowed.level, Severity::Error);
        assert_eq!(narrowed.template, "request parameter {0} maxLength was decreased from {1} to {2}");
    }

    #[test]
    fn changed_levels() {
        assert_eq!(by_id("response-property-format-changed").unwrap().level, Severity::Error);
        assert_eq!(by_id("request-property-pattern-changed").unwrap().level, Severity::Warn);
    }

    #[test]
    fn lifecycle_entries_present() {
        for id in [
            "endpoint-reactivated",
            "api-deprecated-sunset-missing",
            "api-deprecated-sunset-parse",
            "api-sunset-date-too-small",
            "endpoint-deprecated",
            "api-removed-without-deprecation",
            "api-removed-without-sunset",
            "api-removed-before-sunset",
            "endpoint-removed",
            "api-sunset-date-changed-too-small",
            "api-stability-decreased",
            "api-invalid-stability-level",
            "api-stability-level-missing",
        ] {
            assert!(by_id(id).is_some(), "missing {}", id);
        }
    }

    #[test]
    fn duplicate_ids_are_detected() {
        static DUPLICATED: [RuleEntry; 2] = [
            entry!(Neutral, Endpoint, Lifecycle, Added, Severity::Info, "endpoint-added", "a"),
            entry!(Neutral, Endpoint, Lifecycle, Removed, Severity::Info, "endpoint-added", "b"),
        ];
        let index = build_index(DUPLICATED.iter());
        assert_eq!(index.error, Some(CatalogError::DuplicateId("endpoint-added")));
    }

    #[test]
    fn duplicate_keys_are_detected() {
        static DUPLICATED: [RuleEntry; 2] = [
            entry!(Neutral, Endpoint, Lifecycle, Added, Severity::Info, "first", "a"),
            entry!(Neutral, Endpoint, Lifecycle, Added, Severity::Info, "second", "b"),
        ];
        let index = build_index(DUPLICATED.iter());
        assert!(matches!(index.error, Some(CatalogError::DuplicateKey { id: "second", .. })));
    }
}
