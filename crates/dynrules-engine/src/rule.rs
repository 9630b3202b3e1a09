use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Payload, RuleError};

/// Caller-assigned identity of a rule.
///
/// Ids are unique within a [`RuleSet`](crate::RuleSet) and also determine the order in
/// which the set iterates its rules.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct RuleId(pub u64);

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

fn next_instance() -> u64 {
    NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

fn deserialize_weight<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let weight = f64::deserialize(deserializer)?;
    if !weight.is_finite() || weight < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "invalid rule weight: {weight}"
        )));
    }
    Ok(weight)
}

/// A weighted, identified unit of script content.
///
/// Besides its id, weight and payload, each rule carries an instance token assigned
/// when it is constructed (or deserialized). Clones share the token. The token lets
/// [`RuleSet::remove`](crate::RuleSet::remove) tell the tracked rule apart from an
/// unrelated rule that merely reuses its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    id: RuleId,
    #[serde(deserialize_with = "deserialize_weight")]
    weight: f64,
    #[serde(default)]
    used: bool,
    #[serde(default)]
    payload: Payload,
    #[serde(skip, default = "next_instance")]
    instance: u64,
}

impl Rule {
    /// Creates a rule with zero weight, an empty payload, and `used` unset.
    #[must_use]
    pub fn new(id: RuleId) -> Self {
        Self {
            id,
            weight: 0.0,
            used: false,
            payload: Payload::new(),
            instance: next_instance(),
        }
    }

    /// Creates a rule with the given payload.
    #[must_use]
    pub fn with_payload<P>(id: RuleId, payload: P) -> Self
    where
        P: Into<Payload>,
    {
        let mut rule = Self::new(id);
        rule.payload = payload.into();
        rule
    }

    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Sets the weight of a rule that is not (yet) owned by a set.
    ///
    /// Rules owned by a [`RuleSet`](crate::RuleSet) are only reweighted through the
    /// set, which keeps its total weight and bounds consistent.
    pub fn set_weight(&mut self, weight: f64) -> Result<(), RuleError> {
        if !weight.is_finite() {
            return Err(RuleError::NonFiniteWeight { weight });
        }
        if weight < 0.0 {
            return Err(RuleError::NegativeWeight { weight });
        }
        self.weight = weight;
        Ok(())
    }

    /// Builder-style variant of [`Self::set_weight`].
    pub fn with_weight(mut self, weight: f64) -> Result<Self, RuleError> {
        self.set_weight(weight)?;
        Ok(self)
    }

    /// Returns whether the rule took part in the last evaluated script.
    #[must_use]
    pub fn used(&self) -> bool {
        self.used
    }

    pub fn set_used(&mut self, used: bool) {
        self.used = used;
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn set_payload<P>(&mut self, payload: P)
    where
        P: Into<Payload>,
    {
        self.payload = payload.into();
    }

    /// Returns `true` if both values descend from the same constructed rule.
    #[must_use]
    pub fn is_same_instance(&self, other: &Rule) -> bool {
        self.instance == other.instance
    }

    // Callers keep weights within the owning set's bounds.
    pub(crate) fn assign_weight(&mut self, weight: f64) {
        debug_assert!(weight >= 0.0, "rule weight must not be negative");
        self.weight = weight;
    }
}
