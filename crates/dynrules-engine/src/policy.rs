//! Weight update policies.
//!
//! [`RuleSet::update_weights`](crate::RuleSet::update_weights) implements the
//! redistribution algorithm but leaves two decisions to a [`WeightPolicy`]:
//!
//! 1. **Adjustment** - how a fitness value translates into the weight change applied to
//!    every used rule ([`WeightPolicy::calculate_adjustment`])
//! 2. **Remainder** - what to do with the weight lost or gained when adjusted weights
//!    are clamped into the set's bounds ([`WeightPolicy::distribute_remainder`])
//!
//! # Stock Policies
//!
//! - [`FixedPolicy`] - constant adjustment regardless of fitness
//! - [`SpronckPolicy`] - the reward/penalty function from Spronck et al. (2005)
//! - [`ThresholdPolicy`] - piecewise adjustment around a fitness threshold
//!
//! All stock policies delegate remainder handling to a [`RemainderStrategy`].
//!
//! # Remainder Sign
//!
//! The remainder is the sum of `unclamped - clamped` over all clamped rules. A positive
//! remainder means weight was cut off at the upper bound and should be given back to the
//! population; a negative remainder means weight was added at the lower bound and should
//! be taken away. Adding `remainder / len` to every rule therefore restores the total.

use std::{collections::BTreeMap, fmt};

use crate::{PolicyError, Rule, RuleId};

pub trait WeightPolicy: fmt::Debug + Send + Sync {
    /// Converts a fitness value into the weight delta applied to every used rule.
    ///
    /// Positive values reward the used rules, negative values penalise them.
    fn calculate_adjustment(&self, fitness: f64) -> Result<f64, PolicyError>;

    /// Re-injects the remainder produced by clamping into the rules.
    ///
    /// Returns the part of `remainder` that is still undistributed.
    fn distribute_remainder(
        &self,
        remainder: f64,
        target: &mut RemainderTarget<'_>,
    ) -> Result<f64, PolicyError> {
        let _ = (remainder, target);
        Err(PolicyError::NotImplemented {
            operation: "distribute_remainder",
        })
    }

    fn clone_boxed(&self) -> BoxedWeightPolicy;
}

pub type BoxedWeightPolicy = Box<dyn WeightPolicy>;

impl Clone for BoxedWeightPolicy {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

/// Mutable view of a rule set's weights handed to
/// [`WeightPolicy::distribute_remainder`].
///
/// Every write is clamped into the set's bounds; the part of a delta that does not fit
/// is returned to the policy as overflow.
#[derive(Debug)]
pub struct RemainderTarget<'a> {
    rules: &'a mut BTreeMap<RuleId, Rule>,
    min_weight: f64,
    max_weight: f64,
}

impl<'a> RemainderTarget<'a> {
    pub(crate) fn new(
        rules: &'a mut BTreeMap<RuleId, Rule>,
        min_weight: f64,
        max_weight: f64,
    ) -> Self {
        Self {
            rules,
            min_weight,
            max_weight,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn min_weight(&self) -> f64 {
        self.min_weight
    }

    #[must_use]
    pub fn max_weight(&self) -> f64 {
        self.max_weight
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Adds `delta` to one rule's weight.
    ///
    /// Returns the overflow that did not fit into the bounds, or `None` if there is no
    /// rule with this id. A non-finite delta is not applied and comes back whole.
    pub fn adjust(&mut self, id: RuleId, delta: f64) -> Option<f64> {
        let (min, max) = (self.min_weight, self.max_weight);
        let rule = self.rules.get_mut(&id)?;
        Some(apply_clamped(rule, delta, min, max))
    }

    /// Adds `delta` to every rule's weight and returns the summed overflow.
    ///
    /// A non-finite delta is not applied and comes back whole.
    pub fn adjust_all(&mut self, delta: f64) -> f64 {
        if !delta.is_finite() {
            return delta;
        }
        let (min, max) = (self.min_weight, self.max_weight);
        self.rules
            .values_mut()
            .map(|rule| apply_clamped(rule, delta, min, max))
            .sum()
    }
}

/// Clamps `weight` into `[min, max]` and returns `(clamped, weight - clamped)`.
pub(crate) fn clamp_weight(weight: f64, min: f64, max: f64) -> (f64, f64) {
    let clamped = weight.clamp(min, max);
    (clamped, weight - clamped)
}

fn apply_clamped(rule: &mut Rule, delta: f64, min: f64, max: f64) -> f64 {
    if !delta.is_finite() {
        return delta;
    }
    let (weight, overflow) = clamp_weight(rule.weight() + delta, min, max);
    rule.assign_weight(weight);
    overflow
}

/// How stock policies handle the clamping remainder.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum RemainderStrategy {
    /// Leave the remainder undistributed; the total weight drifts by it.
    #[default]
    Ignore,
    /// Spread the remainder evenly over all rules (clamped).
    Spread,
}

impl RemainderStrategy {
    pub fn distribute(self, remainder: f64, target: &mut RemainderTarget<'_>) -> f64 {
        match self {
            Self::Ignore => remainder,
            Self::Spread => {
                if target.is_empty() || remainder == 0.0 || !remainder.is_finite() {
                    return remainder;
                }
                #[expect(clippy::cast_precision_loss)]
                let share = remainder / target.len() as f64;
                target.adjust_all(share)
            }
        }
    }
}

fn finite(name: &'static str, value: f64) -> Result<f64, PolicyError> {
    if !value.is_finite() {
        return Err(PolicyError::InvalidParameter { name, value });
    }
    Ok(value)
}

/// Applies the same adjustment after every evaluation, regardless of fitness.
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy {
    pub adjustment: f64,
    pub remainder: RemainderStrategy,
}

impl FixedPolicy {
    pub fn new(adjustment: f64, remainder: RemainderStrategy) -> Result<Self, PolicyError> {
        Ok(Self {
            adjustment: finite("adjustment", adjustment)?,
            remainder,
        })
    }
}

impl WeightPolicy for FixedPolicy {
    fn calculate_adjustment(&self, _fitness: f64) -> Result<f64, PolicyError> {
        Ok(self.adjustment)
    }

    fn distribute_remainder(
        &self,
        remainder: f64,
        target: &mut RemainderTarget<'_>,
    ) -> Result<f64, PolicyError> {
        Ok(self.remainder.distribute(remainder, target))
    }

    fn clone_boxed(&self) -> BoxedWeightPolicy {
        Box::new(*self)
    }
}

/// Reward/penalty function of Spronck et al. (2005).
///
/// Fitness is expected in `[0.0, 1.0]` (values outside are clamped). With break-even
/// point `b`:
///
/// ```text
/// F < b:  ΔW = -max_penalty * (b - F) / b
/// F >= b: ΔW =  max_reward  * (F - b) / (1 - b)
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SpronckPolicy {
    pub break_even: f64,
    pub max_reward: f64,
    pub max_penalty: f64,
    pub remainder: RemainderStrategy,
}

impl SpronckPolicy {
    pub fn new(
        break_even: f64,
        max_reward: f64,
        max_penalty: f64,
        remainder: RemainderStrategy,
    ) -> Result<Self, PolicyError> {
        if !(break_even > 0.0 && break_even < 1.0) {
            return Err(PolicyError::InvalidParameter {
                name: "break_even",
                value: break_even,
            });
        }
        if !(max_reward.is_finite() && max_reward >= 0.0) {
            return Err(PolicyError::InvalidParameter {
                name: "max_reward",
                value: max_reward,
            });
        }
        if !(max_penalty.is_finite() && max_penalty >= 0.0) {
            return Err(PolicyError::InvalidParameter {
                name: "max_penalty",
                value: max_penalty,
            });
        }
        Ok(Self {
            break_even,
            max_reward,
            max_penalty,
            remainder,
        })
    }
}

impl WeightPolicy for SpronckPolicy {
    fn calculate_adjustment(&self, fitness: f64) -> Result<f64, PolicyError> {
        if fitness.is_nan() {
            return Err(PolicyError::InvalidParameter {
                name: "fitness",
                value: fitness,
            });
        }
        let fitness = fitness.clamp(0.0, 1.0);
        let b = self.break_even;
        if fitness < b {
            Ok(-self.max_penalty * (b - fitness) / b)
        } else {
            Ok(self.max_reward * (fitness - b) / (1.0 - b))
        }
    }

    fn distribute_remainder(
        &self,
        remainder: f64,
        target: &mut RemainderTarget<'_>,
    ) -> Result<f64, PolicyError> {
        Ok(self.remainder.distribute(remainder, target))
    }

    fn clone_boxed(&self) -> BoxedWeightPolicy {
        Box::new(*self)
    }
}

/// Piecewise adjustment around a fitness threshold.
///
/// Fitness above the threshold rewards by the excess, negative fitness penalises by its
/// value, and anything in between yields `threshold - fitness`.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdPolicy {
    pub threshold: f64,
    pub remainder: RemainderStrategy,
}

impl ThresholdPolicy {
    pub fn new(threshold: f64, remainder: RemainderStrategy) -> Result<Self, PolicyError> {
        Ok(Self {
            threshold: finite("threshold", threshold)?,
            remainder,
        })
    }
}

impl WeightPolicy for ThresholdPolicy {
    fn calculate_adjustment(&self, fitness: f64) -> Result<f64, PolicyError> {
        if !fitness.is_finite() {
            return Err(PolicyError::InvalidParameter {
                name: "fitness",
                value: fitness,
            });
        }
        let adjustment = if fitness > self.threshold {
            fitness - self.threshold
        } else if fitness < 0.0 {
            fitness
        } else {
            self.threshold - fitness
        };
        Ok(adjustment)
    }

    fn distribute_remainder(
        &self,
        remainder: f64,
        target: &mut RemainderTarget<'_>,
    ) -> Result<f64, PolicyError> {
        Ok(self.remainder.distribute(remainder, target))
    }

    fn clone_boxed(&self) -> BoxedWeightPolicy {
        Box::new(*self)
    }
}
