//! Compatibility check orchestration
//!
//! [`Checker`] runs every registered rule over an [`ApiDiff`], applies the
//! configured rule selection and returns the findings in report order.

use crate::catalog::{self, CatalogError};
use crate::context::{RuleContext, Sources};
use crate::localizer::{English, Localizer};
use crate::rules::RULES;
use apicompat_core::{sort_changes, ApiDiff, Change, Config, Report, RuleSelection};

/// Runs the rule set under one configuration
#[derive(Debug, Clone)]
pub struct Checker<L = English> {
    config: Config,
    localizer: L,
}

impl Checker {
    /// Validate the catalogue and every change id the config refers to
    pub fn new(config: Config) -> Result<Self, CatalogError> {
        catalog::validate()?;

        let mut overrides: Vec<&String> = config.severity.overrides.keys().collect();
        overrides.sort();
        if let Some(id) = overrides.into_iter().find(|id| catalog::by_id(id).is_none()) {
            return Err(CatalogError::UnknownOverride(id.clone()));
        }

        if let RuleSelection::Custom(ids) = &config.rules {
            if let Some(id) = ids.iter().find(|id| catalog::by_id(id).is_none()) {
                return Err(CatalogError::UnknownRule(id.clone()));
            }
        }

        Ok(Self {
            config,
            localizer: English,
        })
    }
}

impl<L: Localizer> Checker<L> {
    /// Render messages with another localizer
    pub fn with_localizer<M: Localizer>(self, localizer: M) -> Checker<M> {
        Checker {
            config: self.config,
            localizer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every rule and return the selected changes in report order
    pub fn check(&self, diff: &ApiDiff, sources: &Sources) -> Vec<Change> {
        let ctx = RuleContext::new(&self.config, sources);
        tracing::debug!(today = %ctx.today, rules = RULES.len(), "running compatibility rules");

        let mut changes = Vec::new();
        for rule in RULES {
            let found = (rule.check)(diff, &ctx);
            tracing::debug!(rule = rule.name, changes = found.len(), "rule finished");
            changes.extend(found);
        }

        let total = changes.len();
        changes.retain(|change| self.config.rules.includes(&change.id, change.severity));
        tracing::debug!(total, selected = changes.len(), "rule selection applied");

        sort_changes(&mut changes);
        changes
    }

    /// Run the check and wrap the result in a report
    pub fn report(&self, diff: &ApiDiff, sources: &Sources) -> Report {
        Report::from_changes(self.check(diff, sources))
    }

    /// Display text for a change
    pub fn message(&self, change: &Change) -> String {
        self.localizer.message(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apicompat_core::Severity;

    #[test]
    fn unknown_override_is_rejected() {
        let mut config = Config::default();
        config.severity.set_override("no-such-change", Severity::Info);

        assert_eq!(
            Checker::new(config).err(),
            Some(CatalogError::UnknownOverride("no-such-change".to_string()))
        );
    }

    #[test]
    fn unknown_custom_rule_is_rejected() {
        let config = Config {
            rules: RuleSelection::Custom(vec!["endpoint-added".to_string(), "bogus".to_string()]),
            ..Config::default()
        };

        assert_eq!(
            Checker::new(config).err(),
            Some(CatalogError::UnknownRule("bogus".to_string()))
        );
    }

    #[test]
    fn empty_diff_has_no_changes() {
        let checker = Checker::new(Config::default()).unwrap();
        assert!(checker.check(&ApiDiff::default(), &Sources::new()).is_empty());
    }

    struct Shouting;

    impl Localizer for Shouting {
        fn localize(&self, id: &str, _args: &[String]) -> Option<String> {
            Some(id.to_uppercase())
        }
    }

    #[test]
    fn custom_localizer_is_used() {
        let checker = Checker::new(Config::default()).unwrap().with_localizer(Shouting);
        let change = Change::new("endpoint-added", Severity::Info, "GET", "/pets");
        assert_eq!(checker.message(&change), "ENDPOINT-ADDED");
    }
}
