//! The weighted rule container and the redistribution algorithm.
//!
//! A [`RuleSet`] owns its rules by id and keeps two invariants after every operation:
//!
//! - **Total weight** - [`RuleSet::total_weight`] equals the sum of all rule weights
//! - **Bounds** - rules added through [`RuleSet::add`] or reweighted by
//!   [`RuleSet::update_weights`] lie within `[min_weight, max_weight]`
//!
//! Changing the bounds later does not retroactively clamp existing rules.
//!
//! # Weight Update
//!
//! After a script has been evaluated, the caller marks the rules that were used and
//! calls [`RuleSet::update_weights`]:
//!
//! 1. If no rule or every rule was used, nothing changes
//! 2. The policy turns the fitness into an `adjustment` for used rules
//! 3. Unused rules receive `compensation = -(used * adjustment) / unused`, so the
//!    deltas sum to zero
//! 4. Weights are clamped into the bounds; the clamped-off amount is the `remainder`
//! 5. The policy redistributes the remainder
//! 6. The total weight is recomputed from the rules

use std::collections::BTreeMap;

use crate::{
    Payload, PolicyError, Rule, RuleId, RuleSetError, RuleSource,
    policy::{BoxedWeightPolicy, RemainderTarget, clamp_weight},
};

/// A population of rules with bounded weights.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: BTreeMap<RuleId, Rule>,
    total_weight: f64,
    min_weight: f64,
    max_weight: f64,
    policy: Option<BoxedWeightPolicy>,
}

/// Outcome of [`RuleSet::update_weights`].
#[derive(Debug, Clone, Copy, PartialEq, derive_more::IsVariant)]
pub enum WeightUpdate {
    /// No rule or every rule was used; weights are untouched.
    Unchanged,
    Redistributed(RedistributionReport),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedistributionReport {
    /// Delta applied to each used rule before clamping.
    pub adjustment: f64,
    /// Delta applied to each unused rule before clamping.
    pub compensation: f64,
    /// Sum of `unclamped - clamped` over all clamped rules.
    pub remainder: f64,
    /// Part of the remainder the policy left undistributed.
    pub leftover: f64,
}

fn sum_weights(rules: &BTreeMap<RuleId, Rule>) -> f64 {
    rules.values().map(Rule::weight).sum()
}

fn validate_bounds(min: f64, max: f64) -> Result<(), RuleSetError> {
    if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
        return Err(RuleSetError::InvalidBound { min, max });
    }
    Ok(())
}

impl RuleSet {
    /// Creates an empty set whose rule weights must stay within `[min_weight, max_weight]`.
    pub fn new(min_weight: f64, max_weight: f64) -> Result<Self, RuleSetError> {
        validate_bounds(min_weight, max_weight)?;
        Ok(Self {
            rules: BTreeMap::new(),
            total_weight: 0.0,
            min_weight,
            max_weight,
            policy: None,
        })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: BoxedWeightPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn set_policy(&mut self, policy: BoxedWeightPolicy) {
        self.policy = Some(policy);
    }

    #[must_use]
    pub fn policy(&self) -> Option<&BoxedWeightPolicy> {
        self.policy.as_ref()
    }

    #[must_use]
    pub fn min_weight(&self) -> f64 {
        self.min_weight
    }

    #[must_use]
    pub fn max_weight(&self) -> f64 {
        self.max_weight
    }

    pub fn set_min_weight(&mut self, min_weight: f64) -> Result<(), RuleSetError> {
        validate_bounds(min_weight, self.max_weight)?;
        self.min_weight = min_weight;
        Ok(())
    }

    pub fn set_max_weight(&mut self, max_weight: f64) -> Result<(), RuleSetError> {
        validate_bounds(self.min_weight, max_weight)?;
        self.max_weight = max_weight;
        Ok(())
    }

    /// Replaces both bounds at once, validating them against each other only.
    pub fn set_bounds(&mut self, min_weight: f64, max_weight: f64) -> Result<(), RuleSetError> {
        validate_bounds(min_weight, max_weight)?;
        self.min_weight = min_weight;
        self.max_weight = max_weight;
        Ok(())
    }

    /// Sum of all rule weights, accumulated in id order.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterates the rules in ascending id order.
    pub fn rules(&self) -> impl ExactSizeIterator<Item = &Rule> + Clone {
        self.rules.values()
    }

    /// Adds a rule, replacing any rule with the same id.
    ///
    /// The weight is clamped into the set's bounds before it is added to the total.
    pub fn add(&mut self, rule: Rule) {
        self.insert_clamped(rule);
        self.total_weight = sum_weights(&self.rules);
    }

    fn insert_clamped(&mut self, mut rule: Rule) {
        let (weight, _) = clamp_weight(rule.weight(), self.min_weight, self.max_weight);
        rule.assign_weight(weight);
        self.rules.insert(rule.id(), rule);
    }

    /// Removes the tracked rule.
    ///
    /// Fails with [`RuleSetError::NotFound`] if no rule has this id, and with
    /// [`RuleSetError::Mismatch`] if the tracked rule is a different instance (for
    /// example a rule that was replaced by a later [`Self::add`]).
    pub fn remove(&mut self, rule: &Rule) -> Result<Rule, RuleSetError> {
        let id = rule.id();
        let tracked = self.rules.get(&id).ok_or(RuleSetError::NotFound { id })?;
        if !tracked.is_same_instance(rule) {
            return Err(RuleSetError::Mismatch { id });
        }
        let removed = self
            .rules
            .remove(&id)
            .ok_or(RuleSetError::NotFound { id })?;
        self.total_weight = sum_weights(&self.rules);
        Ok(removed)
    }

    #[must_use]
    pub fn find(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// Sets the `used` flag of one rule.
    pub fn mark_used(&mut self, id: RuleId, used: bool) -> Result<(), RuleSetError> {
        let rule = self
            .rules
            .get_mut(&id)
            .ok_or(RuleSetError::NotFound { id })?;
        rule.set_used(used);
        Ok(())
    }

    /// Clears the `used` flag of every rule.
    pub fn reset_used(&mut self) {
        for rule in self.rules.values_mut() {
            rule.set_used(false);
        }
    }

    /// Replaces the payload of one rule.
    pub fn set_payload<P>(&mut self, id: RuleId, payload: P) -> Result<(), RuleSetError>
    where
        P: Into<Payload>,
    {
        let rule = self
            .rules
            .get_mut(&id)
            .ok_or(RuleSetError::NotFound { id })?;
        rule.set_payload(payload);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.rules.clear();
        self.total_weight = 0.0;
    }

    /// Loads rules from a source and adds each of them.
    ///
    /// Returns the number of rules loaded.
    pub fn populate<S>(&mut self, source: &mut S, limit: Option<usize>) -> Result<usize, S::Error>
    where
        S: RuleSource + ?Sized,
    {
        let rules = source.load(limit)?;
        let count = rules.len();
        self.extend(rules);
        tracing::debug!(count, total_weight = self.total_weight, "populated rule set");
        Ok(count)
    }

    /// Rewards the used rules and compensates the others.
    ///
    /// See the [module documentation](self) for the algorithm.
    pub fn update_weights(&mut self, fitness: f64) -> Result<WeightUpdate, RuleSetError> {
        let count = self.rules.len();
        let used_count = self.rules.values().filter(|rule| rule.used()).count();
        if used_count == 0 || used_count == count {
            tracing::debug!(count, used_count, "no weights to redistribute");
            return Ok(WeightUpdate::Unchanged);
        }

        let policy = self.policy.as_ref().ok_or(PolicyError::NotImplemented {
            operation: "calculate_adjustment",
        })?;

        let non_active = count - used_count;
        let adjustment = policy.calculate_adjustment(fitness)?;
        #[expect(clippy::cast_precision_loss)]
        let compensation = -(used_count as f64 * adjustment) / non_active as f64;
        for (name, value) in [("adjustment", adjustment), ("compensation", compensation)] {
            if !value.is_finite() {
                return Err(PolicyError::InvalidParameter { name, value }.into());
            }
        }

        let (min, max) = (self.min_weight, self.max_weight);
        let mut remainder = 0.0;
        for rule in self.rules.values_mut() {
            let delta = if rule.used() { adjustment } else { compensation };
            let (weight, overflow) = clamp_weight(rule.weight() + delta, min, max);
            rule.assign_weight(weight);
            remainder += overflow;
        }

        let mut target = RemainderTarget::new(&mut self.rules, min, max);
        let distributed = policy.distribute_remainder(remainder, &mut target);
        self.total_weight = sum_weights(&self.rules);
        let leftover = distributed?;

        tracing::debug!(
            used_count,
            non_active,
            adjustment,
            compensation,
            remainder,
            leftover,
            total_weight = self.total_weight,
            "redistributed rule weights"
        );

        Ok(WeightUpdate::Redistributed(RedistributionReport {
            adjustment,
            compensation,
            remainder,
            leftover,
        }))
    }
}

impl Extend<Rule> for RuleSet {
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = Rule>,
    {
        for rule in iter {
            self.insert_clamped(rule);
        }
        self.total_weight = sum_weights(&self.rules);
    }
}
