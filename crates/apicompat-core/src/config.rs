//! Configuration schema (apicompat.toml)

use crate::change::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which rules report findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSelection {
    /// Every rule, informational findings included
    All,

    /// Only findings whose effective severity is warning or error
    Breaking,

    /// Only the listed change ids
    Custom(Vec<String>),
}

impl Default for RuleSelection {
    fn default() -> Self {
        Self::All
    }
}

impl RuleSelection {
    /// Whether a finding with this id and effective severity is reported
    pub fn includes(&self, id: &str, severity: Severity) -> bool {
        match self {
            Self::All => true,
            Self::Breaking => severity.is_breaking(),
            Self::Custom(ids) => ids.iter().any(|i| i == id),
        }
    }
}

/// Severity overrides for specific change ids
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeverityOverrides {
    /// Map of change id to severity override
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl SeverityOverrides {
    /// Get severity for a change id, or default
    pub fn get_severity(&self, id: &str, default: Severity) -> Severity {
        self.overrides.get(id).copied().unwrap_or(default)
    }

    /// Set severity override for an id
    pub fn set_override(&mut self, id: impl Into<String>, severity: Severity) {
        self.overrides.insert(id.into(), severity);
    }
}

/// Declared maturity of an operation (`x-stability-level`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityLevel {
    Draft,
    Alpha,
    Beta,
    Stable,
}

impl StabilityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Stable => "stable",
        }
    }
}

impl std::str::FromStr for StabilityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "alpha" => Ok(Self::Alpha),
            "beta" => Ok(Self::Beta),
            "stable" => Ok(Self::Stable),
            other => Err(format!("unknown stability level '{}'", other)),
        }
    }
}

impl std::fmt::Display for StabilityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimum sunset notice window per stability level, in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunsetPolicy {
    #[serde(default)]
    pub draft: u32,

    #[serde(default)]
    pub alpha: u32,

    #[serde(default = "default_beta_days")]
    pub beta: u32,

    #[serde(default = "default_stable_days")]
    pub stable: u32,
}

fn default_beta_days() -> u32 {
    31
}

fn default_stable_days() -> u32 {
    180
}

impl Default for SunsetPolicy {
    fn default() -> Self {
        Self {
            draft: 0,
            alpha: 0,
            beta: default_beta_days(),
            stable: default_stable_days(),
        }
    }
}

impl SunsetPolicy {
    /// No notice required at any level
    pub fn disabled() -> Self {
        Self {
            draft: 0,
            alpha: 0,
            beta: 0,
            stable: 0,
        }
    }

    /// Required notice window for a stability level
    pub fn required_days(&self, level: StabilityLevel) -> u32 {
        match level {
            StabilityLevel::Draft => self.draft,
            StabilityLevel::Alpha => self.alpha,
            StabilityLevel::Beta => self.beta,
            StabilityLevel::Stable => self.stable,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active rule subset
    #[serde(default)]
    pub rules: RuleSelection,

    /// Severity overrides
    #[serde(default)]
    pub severity: SeverityOverrides,

    /// Sunset notice windows
    #[serde(default)]
    pub sunset: SunsetPolicy,

    /// Report operations without `x-stability-level`
    #[serde(default)]
    pub require_stability_level: bool,

    /// Evaluate sunset dates against this day instead of today (UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub today: Option<chrono::NaiveDate>,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// The evaluation date: the configured day, or today in UTC
    pub fn evaluation_date(&self) -> chrono::NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.rules, RuleSelection::All);
        assert_eq!(config.sunset.required_days(StabilityLevel::Stable), 180);
        assert_eq!(config.sunset.required_days(StabilityLevel::Beta), 31);
        assert_eq!(config.sunset.required_days(StabilityLevel::Alpha), 0);
    }

    #[test]
    fn severity_override() {
        let mut overrides = SeverityOverrides::default();
        overrides.set_override("response-property-enum-value-added", Severity::Warn);

        assert_eq!(
            overrides.get_severity("response-property-enum-value-added", Severity::Error),
            Severity::Warn
        );
        assert_eq!(
            overrides.get_severity("request-property-removed", Severity::Warn),
            Severity::Warn
        );
    }

    #[test]
    fn parse_full_toml() {
        let config = Config::from_toml(
            r#"
            rules = "breaking"
            require_stability_level = true
            today = "2024-06-01"

            [severity.overrides]
            "request-property-removed" = "error"

            [sunset]
            beta = 14
            "#,
        )
        .unwrap();

        assert_eq!(config.rules, RuleSelection::Breaking);
        assert!(config.require_stability_level);
        assert_eq!(config.sunset.beta, 14);
        assert_eq!(config.sunset.stable, 180);
        assert_eq!(
            config.severity.get_severity("request-property-removed", Severity::Warn),
            Severity::Error
        );
        assert_eq!(
            config.evaluation_date(),
            chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }

    #[test]
    fn custom_rule_selection() {
        let config = Config::from_toml(r#"rules = { custom = ["endpoint-removed"] }"#).unwrap();
        assert!(config.rules.includes("endpoint-removed", Severity::Info));
        assert!(!config.rules.includes("api-removed-before-sunset", Severity::Error));
    }

    #[test]
    fn breaking_selection_drops_info() {
        assert!(!RuleSelection::Breaking.includes("endpoint-deprecated", Severity::Info));
        assert!(RuleSelection::Breaking.includes("request-property-removed", Severity::Warn));
    }

    #[test]
    fn stability_level_parsing() {
        assert_eq!("beta".parse::<StabilityLevel>(), Ok(StabilityLevel::Beta));
        assert!("experimental".parse::<StabilityLevel>().is_err());
        assert!(StabilityLevel::Stable > StabilityLevel::Beta);
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }
}
