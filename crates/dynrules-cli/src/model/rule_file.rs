use std::{convert::Infallible, path::Path};

use chrono::{DateTime, Utc};
use dynrules_engine::{Rule, RuleSet, RuleSource};
use serde::{Deserialize, Serialize};

use crate::util;

/// On-disk rule population.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleFile {
    pub name: String,
    pub updated_at: DateTime<Utc>,
    pub min_weight: f64,
    pub max_weight: f64,
    pub rules: Vec<Rule>,
}

impl RuleFile {
    pub fn open<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        util::read_json_file("rules", path)
    }

    pub fn from_rule_set(name: impl Into<String>, rule_set: &RuleSet) -> Self {
        Self {
            name: name.into(),
            updated_at: Utc::now(),
            min_weight: rule_set.min_weight(),
            max_weight: rule_set.max_weight(),
            rules: rule_set.rules().cloned().collect(),
        }
    }

    /// Builds a rule set with this file's bounds and rules.
    pub fn to_rule_set(&mut self) -> anyhow::Result<RuleSet> {
        let mut rule_set = RuleSet::new(self.min_weight, self.max_weight)?;
        let Ok(count) = rule_set.populate(self, None);
        tracing::debug!(count, name = %self.name, "loaded rule file");
        Ok(rule_set)
    }
}

impl RuleSource for RuleFile {
    type Error = Infallible;

    fn load(&mut self, limit: Option<usize>) -> Result<Vec<Rule>, Self::Error> {
        let end = limit.map_or(self.rules.len(), |limit| limit.min(self.rules.len()));
        Ok(self.rules[..end].to_vec())
    }

    fn save(&mut self, rules: &[Rule]) -> Result<(), Self::Error> {
        self.rules = rules.to_vec();
        self.updated_at = Utc::now();
        Ok(())
    }
}
