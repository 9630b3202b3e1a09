use std::convert::Infallible;

use crate::{Rule, RuleId};

/// Loads and persists rule collections.
///
/// The engine itself never calls a source; [`RuleSet::populate`](crate::RuleSet::populate)
/// is a convenience for the application layer that owns both.
pub trait RuleSource {
    type Error;

    /// Loads up to `limit` rules, or every rule if `limit` is `None`.
    fn load(&mut self, limit: Option<usize>) -> Result<Vec<Rule>, Self::Error>;

    /// Persists the given rules, replacing what the source held before.
    fn save(&mut self, rules: &[Rule]) -> Result<(), Self::Error>;
}

/// Rule source backed by a vector, for tests and experiments.
///
/// [`MemoryRuleSource::new`] pre-creates `count` empty rules with ids `0..count`; the
/// caller fills in weights and payloads after loading them.
#[derive(Debug, Default, Clone)]
pub struct MemoryRuleSource {
    rules: Vec<Rule>,
}

impl MemoryRuleSource {
    #[must_use]
    pub fn new(count: u64) -> Self {
        Self {
            rules: (0..count).map(|id| Rule::new(RuleId(id))).collect(),
        }
    }

    #[must_use]
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

impl RuleSource for MemoryRuleSource {
    type Error = Infallible;

    fn load(&mut self, limit: Option<usize>) -> Result<Vec<Rule>, Self::Error> {
        let end = limit.map_or(self.rules.len(), |limit| limit.min(self.rules.len()));
        Ok(self.rules[..end].to_vec())
    }

    fn save(&mut self, rules: &[Rule]) -> Result<(), Self::Error> {
        self.rules = rules.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuleSet;

    #[test]
    fn test_new_creates_sequential_ids() {
        let source = MemoryRuleSource::new(3);
        let ids: Vec<_> = source.rules().iter().map(Rule::id).collect();
        assert_eq!(ids, vec![RuleId(0), RuleId(1), RuleId(2)]);
    }

    #[test]
    fn test_load_respects_limit() {
        let mut source = MemoryRuleSource::new(5);
        assert_eq!(source.load(None).unwrap().len(), 5);
        assert_eq!(source.load(Some(2)).unwrap().len(), 2);
        assert_eq!(source.load(Some(0)).unwrap().len(), 0);
        assert_eq!(source.load(Some(50)).unwrap().len(), 5);
    }

    #[test]
    fn test_save_replaces_rules() {
        let mut source = MemoryRuleSource::new(5);
        source
            .save(&[Rule::with_payload(RuleId(9), "x")])
            .unwrap();
        let loaded = source.load(None).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id(), RuleId(9));
    }

    #[test]
    fn test_populate_rule_set() {
        let mut source = MemoryRuleSource::from_rules(
            (0..4)
                .map(|i| Rule::new(RuleId(i)).with_weight(3.0).unwrap())
                .collect(),
        );
        let mut rule_set = RuleSet::new(0.0, 10.0).unwrap();
        let count = rule_set.populate(&mut source, Some(3)).unwrap();
        assert_eq!(count, 3);
        assert_eq!(rule_set.len(), 3);
        assert!((rule_set.total_weight() - 9.0).abs() < 1e-9);
    }
}
