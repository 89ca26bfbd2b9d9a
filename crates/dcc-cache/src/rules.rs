//! # Business Rules Cache
//!
//! Rules by country code. Country codes are compared case-insensitively;
//! they are stored and looked up in upper case.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dcc_validation::{Rule, RulesProvider};

use crate::config::DownloadSchedule;
use crate::error::CacheError;
use crate::refresh::{RefreshGate, RefreshOutcome};
use crate::snapshot::Snapshot;

/// Snapshot cache of business rules.
#[derive(Debug)]
pub struct RulesCache {
    snapshot: Snapshot<BTreeMap<String, Vec<Rule>>>,
    gate: RefreshGate,
}

fn normalize(country: &str) -> String {
    country.trim().to_ascii_uppercase()
}

impl RulesCache {
    /// An empty cache refreshed on `schedule`.
    pub fn new(schedule: DownloadSchedule) -> Self {
        Self {
            snapshot: Snapshot::default(),
            gate: RefreshGate::new("business_rules", schedule),
        }
    }

    /// Replace the rules of one country, leaving the others in place.
    pub fn replace_country(&self, country: &str, rules: Vec<Rule>) {
        let country = normalize(country);
        tracing::debug!(%country, rules = rules.len(), "country rules replaced");
        self.snapshot.update(|all| {
            if rules.is_empty() {
                all.remove(&country);
            } else {
                all.insert(country, rules);
            }
        });
    }

    /// Replace every country's rules.
    pub fn replace_all(&self, rules: BTreeMap<String, Vec<Rule>>) {
        let normalized = rules
            .into_iter()
            .map(|(country, rules)| (normalize(&country), rules))
            .collect();
        self.snapshot.store(normalized);
    }

    /// Parse a JSON array of rules and set them as `country`'s rules.
    pub fn load_country_json(&self, country: &str, json: &str) -> Result<usize, CacheError> {
        let rules: Vec<Rule> = serde_json::from_str(json)?;
        let count = rules.len();
        self.replace_country(country, rules);
        Ok(count)
    }

    /// Rules of `country`, empty when none are cached.
    pub fn rules_for_country(&self, country: &str) -> Vec<Rule> {
        self.snapshot
            .load()
            .get(&normalize(country))
            .cloned()
            .unwrap_or_default()
    }

    /// Countries with at least one rule.
    pub fn countries(&self) -> Vec<String> {
        self.snapshot.load().keys().cloned().collect()
    }

    /// Refresh every country from `loader` if due.
    pub fn refresh_with(
        &self,
        now: DateTime<Utc>,
        loader: impl FnOnce() -> Result<BTreeMap<String, Vec<Rule>>, CacheError>,
    ) -> Result<RefreshOutcome, CacheError> {
        self.gate.run(now, loader, |rules| self.replace_all(rules))
    }
}

impl RulesProvider for RulesCache {
    fn rules_for_country(&self, country: &str) -> Vec<Rule> {
        RulesCache::rules_for_country(self, country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcc_validation::testing::sample_rule;
    use dcc_validation::RuleType;

    #[test]
    fn country_lookup_is_case_insensitive() {
        let cache = RulesCache::new(DownloadSchedule::default());
        cache.replace_country("de", vec![sample_rule("GR-DE-0001", "DE", None)]);
        assert_eq!(cache.rules_for_country("DE").len(), 1);
        assert_eq!(cache.rules_for_country(" de ").len(), 1);
        assert!(cache.rules_for_country("AT").is_empty());
        assert_eq!(cache.countries(), vec!["DE"]);
    }

    #[test]
    fn replacing_one_country_keeps_others() {
        let cache = RulesCache::new(DownloadSchedule::default());
        cache.replace_country("DE", vec![sample_rule("GR-DE-0001", "DE", None)]);
        cache.replace_country("AT", vec![sample_rule("GR-AT-0001", "AT", None)]);
        cache.replace_country("DE", Vec::new());
        assert!(cache.rules_for_country("DE").is_empty());
        assert_eq!(cache.rules_for_country("AT")[0].identifier, "GR-AT-0001");
    }

    #[test]
    fn load_country_json_parses_eu_layout() {
        let cache = RulesCache::new(DownloadSchedule::default());
        let rule = sample_rule("VR-DE-0001", "DE", Some(RuleType::Acceptance));
        let json = serde_json::to_string(&vec![rule.clone()]).unwrap();
        assert!(json.contains("\"Identifier\""));
        assert_eq!(cache.load_country_json("DE", &json).unwrap(), 1);
        assert_eq!(cache.rules_for_country("de"), vec![rule]);
    }

    #[test]
    fn malformed_json_leaves_snapshot() {
        let cache = RulesCache::new(DownloadSchedule::default());
        cache.replace_country("DE", vec![sample_rule("GR-DE-0001", "DE", None)]);
        assert!(matches!(
            cache.load_country_json("DE", "[{"),
            Err(CacheError::Json(_))
        ));
        assert_eq!(cache.rules_for_country("DE").len(), 1);
    }
}
