//! Roulette-wheel script generation.
//!
//! [`ScriptGenerator::generate`] fills up to `slot_count` slots. For each slot it draws
//! `fraction` uniformly from `[0, total_weight)` and walks the rules in id order,
//! selecting the first rule whose cumulative weight exceeds `fraction`. Because the
//! comparison is strict, a rule with zero weight is never selected, and boundary draws
//! go to the earlier rule.
//!
//! # Limits
//!
//! - **Slot count** - at most one rule is selected per slot
//! - **Byte ceiling** - generation stops as soon as the next payload would push the
//!   body past [`GeneratorLimits::max_output_bytes`], or when the body reaches it
//!   exactly; remaining slots are abandoned
//! - **Attempts** - a spin can fail to select when the cached total weight exceeds the
//!   actual sum through rounding; such spins are retried up to
//!   [`GeneratorLimits::max_attempts_per_slot`] times before the slot is skipped
//!
//! An empty rule set, or one whose total weight is zero, yields an empty script. A total
//! that overflowed to infinity cannot be sampled and fails with
//! [`GenerateError::NonFiniteTotal`].

use dynrules_engine::{Payload, Rule, RuleId, RuleSet};
use rand::Rng;

use crate::GenerateError;

pub const DEFAULT_MAX_ATTEMPTS_PER_SLOT: usize = 100;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024;

/// Bounds on a single [`ScriptGenerator::generate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorLimits {
    max_attempts_per_slot: usize,
    max_output_bytes: usize,
}

impl Default for GeneratorLimits {
    fn default() -> Self {
        Self {
            max_attempts_per_slot: DEFAULT_MAX_ATTEMPTS_PER_SLOT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

fn at_least_one(name: &'static str, value: usize) -> Result<usize, GenerateError> {
    if value < 1 {
        return Err(GenerateError::InvalidArgument { name, value });
    }
    Ok(value)
}

impl GeneratorLimits {
    pub fn new(
        max_attempts_per_slot: usize,
        max_output_bytes: usize,
    ) -> Result<Self, GenerateError> {
        Ok(Self {
            max_attempts_per_slot: at_least_one("max_attempts_per_slot", max_attempts_per_slot)?,
            max_output_bytes: at_least_one("max_output_bytes", max_output_bytes)?,
        })
    }

    #[must_use]
    pub fn max_attempts_per_slot(&self) -> usize {
        self.max_attempts_per_slot
    }

    pub fn set_max_attempts_per_slot(&mut self, value: usize) -> Result<(), GenerateError> {
        self.max_attempts_per_slot = at_least_one("max_attempts_per_slot", value)?;
        Ok(())
    }

    /// Maximum size of the generated body, excluding header and footer.
    #[must_use]
    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }

    pub fn set_max_output_bytes(&mut self, value: usize) -> Result<(), GenerateError> {
        self.max_output_bytes = at_least_one("max_output_bytes", value)?;
        Ok(())
    }
}

/// A generated script body and the rules it was assembled from.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Script {
    body: Payload,
    selected: Vec<RuleId>,
}

impl Script {
    /// Concatenated payloads of the selected rules.
    #[must_use]
    pub fn body(&self) -> &Payload {
        &self.body
    }

    /// Ids of the selected rules, in selection order (may repeat).
    #[must_use]
    pub fn selected(&self) -> &[RuleId] {
        &self.selected
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    #[must_use]
    pub fn into_body(self) -> Payload {
        self.body
    }

    fn push(&mut self, rule: &Rule) {
        self.body.extend_from(rule.payload());
        self.selected.push(rule.id());
    }
}

/// Samples scripts from a borrowed rule set.
#[derive(Debug, Clone, Copy)]
pub struct ScriptGenerator<'a> {
    rule_set: &'a RuleSet,
    limits: GeneratorLimits,
}

impl<'a> ScriptGenerator<'a> {
    #[must_use]
    pub fn new(rule_set: &'a RuleSet) -> Self {
        Self {
            rule_set,
            limits: GeneratorLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: GeneratorLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn rule_set(&self) -> &'a RuleSet {
        self.rule_set
    }

    pub fn set_rule_set(&mut self, rule_set: &'a RuleSet) {
        self.rule_set = rule_set;
    }

    #[must_use]
    pub fn limits(&self) -> &GeneratorLimits {
        &self.limits
    }

    pub fn limits_mut(&mut self) -> &mut GeneratorLimits {
        &mut self.limits
    }

    /// Generates a script of at most `slot_count` rules.
    ///
    /// See the [module documentation](self) for the sampling procedure and limits.
    pub fn generate<R>(&self, slot_count: usize, rng: &mut R) -> Result<Script, GenerateError>
    where
        R: Rng + ?Sized,
    {
        at_least_one("slot_count", slot_count)?;

        let total_weight = self.rule_set.total_weight();
        if !total_weight.is_finite() {
            return Err(GenerateError::NonFiniteTotal { total_weight });
        }
        let rules: Vec<&Rule> = self.rule_set.rules().collect();
        let mut script = Script::default();
        if rules.is_empty() || total_weight <= 0.0 {
            tracing::debug!(
                rules = rules.len(),
                total_weight,
                "nothing to select from, returning empty script"
            );
            return Ok(script);
        }

        let max_output_bytes = self.limits.max_output_bytes;
        for slot in 0..slot_count {
            let Some(rule) = (0..self.limits.max_attempts_per_slot)
                .find_map(|_| spin(&rules, total_weight, rng))
            else {
                tracing::warn!(
                    slot,
                    attempts = self.limits.max_attempts_per_slot,
                    "no rule selected for slot"
                );
                continue;
            };

            if script.len() + rule.payload().len() > max_output_bytes {
                tracing::debug!(
                    slot,
                    rule = %rule.id(),
                    size = script.len(),
                    max_output_bytes,
                    "next payload exceeds byte ceiling"
                );
                return Ok(script);
            }
            tracing::trace!(slot, rule = %rule.id(), "selected rule");
            script.push(rule);
            if script.len() >= max_output_bytes {
                tracing::debug!(slot, size = script.len(), "byte ceiling reached");
                return Ok(script);
            }
        }

        tracing::debug!(
            slots = slot_count,
            selected = script.selected.len(),
            size = script.len(),
            "generated script"
        );
        Ok(script)
    }
}

/// One turn of the roulette wheel.
fn spin<'r, R>(rules: &[&'r Rule], total_weight: f64, rng: &mut R) -> Option<&'r Rule>
where
    R: Rng + ?Sized,
{
    let fraction = rng.random_range(0.0..total_weight);
    let mut sum = 0.0;
    for &rule in rules {
        sum += rule.weight();
        if sum > fraction {
            return Some(rule);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn rng() -> Pcg64Mcg {
        Pcg64Mcg::seed_from_u64(0x5eed)
    }

    fn rule_set_with(rules: &[(u64, f64, &str)]) -> RuleSet {
        let mut rule_set = RuleSet::new(0.0, 100.0).unwrap();
        for &(id, weight, payload) in rules {
            rule_set.add(
                Rule::with_payload(RuleId(id), payload)
                    .with_weight(weight)
                    .unwrap(),
            );
        }
        rule_set
    }

    #[test]
    fn test_zero_slots_is_invalid() {
        let rule_set = rule_set_with(&[(0, 1.0, "a")]);
        let err = ScriptGenerator::new(&rule_set)
            .generate(0, &mut rng())
            .unwrap_err();
        assert_eq!(
            err,
            GenerateError::InvalidArgument {
                name: "slot_count",
                value: 0
            }
        );
    }

    #[test]
    fn test_limits_reject_zero() {
        assert!(GeneratorLimits::new(0, 10).unwrap_err().is_invalid_argument());
        assert!(GeneratorLimits::new(10, 0).unwrap_err().is_invalid_argument());

        let mut limits = GeneratorLimits::default();
        assert_eq!(limits.max_attempts_per_slot(), 100);
        assert_eq!(limits.max_output_bytes(), 1024);
        assert!(limits.set_max_attempts_per_slot(0).is_err());
        assert!(limits.set_max_output_bytes(0).is_err());
        limits.set_max_output_bytes(1).unwrap();
        assert_eq!(limits.max_output_bytes(), 1);
        assert_eq!(limits.max_attempts_per_slot(), 100);
    }

    #[test]
    fn test_slot_ceiling() {
        let rule_set = rule_set_with(&[(0, 1.0, "a;"), (1, 2.0, "b;"), (2, 3.0, "c;")]);
        let limits = GeneratorLimits::new(100, usize::MAX).unwrap();
        let generator = ScriptGenerator::new(&rule_set).with_limits(limits);
        let mut rng = rng();
        for slots in 1..20 {
            let script = generator.generate(slots, &mut rng).unwrap();
            assert_eq!(script.selected().len(), slots);
            assert_eq!(script.len(), 2 * slots);
        }
    }

    #[test]
    fn test_byte_ceiling_stops_before_overflow() {
        // Every payload is 3 bytes; 10 bytes fit 3 payloads, the 4th would overflow.
        let rule_set = rule_set_with(&[(0, 1.0, "aa;"), (1, 1.0, "bb;")]);
        let limits = GeneratorLimits::new(100, 10).unwrap();
        let script = ScriptGenerator::new(&rule_set)
            .with_limits(limits)
            .generate(50, &mut rng())
            .unwrap();
        assert_eq!(script.len(), 9);
        assert_eq!(script.selected().len(), 3);
    }

    #[test]
    fn test_byte_ceiling_reached_exactly() {
        let rule_set = rule_set_with(&[(0, 1.0, "ab")]);
        let limits = GeneratorLimits::new(100, 6).unwrap();
        let script = ScriptGenerator::new(&rule_set)
            .with_limits(limits)
            .generate(50, &mut rng())
            .unwrap();
        assert_eq!(script.body().as_bytes(), b"ababab");
    }

    #[test]
    fn test_oversized_first_payload_yields_empty_script() {
        let rule_set = rule_set_with(&[(0, 1.0, "0123456789")]);
        let limits = GeneratorLimits::new(100, 5).unwrap();
        let script = ScriptGenerator::new(&rule_set)
            .with_limits(limits)
            .generate(3, &mut rng())
            .unwrap();
        assert!(script.is_empty());
        assert!(script.selected().is_empty());
    }

    #[test]
    fn test_never_selects_zero_weight_rule() {
        let rule_set = rule_set_with(&[(0, 0.0, "zero;"), (1, 5.0, "one;"), (2, 0.0, "two;")]);
        let limits = GeneratorLimits::new(100, usize::MAX).unwrap();
        let script = ScriptGenerator::new(&rule_set)
            .with_limits(limits)
            .generate(200, &mut rng())
            .unwrap();
        assert!(script.selected().iter().all(|&id| id == RuleId(1)));
    }

    #[test]
    fn test_selection_follows_weights() {
        let rule_set = rule_set_with(&[(0, 1.0, "a"), (1, 9.0, "b")]);
        let limits = GeneratorLimits::new(100, usize::MAX).unwrap();
        let script = ScriptGenerator::new(&rule_set)
            .with_limits(limits)
            .generate(10_000, &mut rng())
            .unwrap();
        let heavy = script
            .selected()
            .iter()
            .filter(|&&id| id == RuleId(1))
            .count();
        // expected 9000
        assert!((8700..9300).contains(&heavy), "heavy rule selected {heavy} times");
    }

    #[test]
    fn test_empty_rule_set_yields_empty_script() {
        let rule_set = RuleSet::new(0.0, 10.0).unwrap();
        let script = ScriptGenerator::new(&rule_set)
            .generate(5, &mut rng())
            .unwrap();
        assert!(script.is_empty());
    }

    #[test]
    fn test_zero_total_weight_yields_empty_script() {
        let rule_set = rule_set_with(&[(0, 0.0, "a"), (1, 0.0, "b")]);
        let script = ScriptGenerator::new(&rule_set)
            .generate(5, &mut rng())
            .unwrap();
        assert!(script.is_empty());
    }

    #[test]
    fn test_overflowing_total_is_an_error() {
        let mut rule_set = RuleSet::new(0.0, f64::MAX).unwrap();
        for id in 0..2 {
            rule_set.add(Rule::with_payload(RuleId(id), "x").with_weight(f64::MAX).unwrap());
        }
        assert!(rule_set.total_weight().is_infinite());
        let err = ScriptGenerator::new(&rule_set)
            .generate(1, &mut rng())
            .unwrap_err();
        assert!(err.is_non_finite_total());
    }

    #[test]
    fn test_small_rule_left_after_removing_large_one_is_selected() {
        let mut rule_set = RuleSet::new(0.0, 1e17).unwrap();
        let large = Rule::with_payload(RuleId(0), "big;").with_weight(1e17).unwrap();
        rule_set.add(large.clone());
        rule_set.add(Rule::with_payload(RuleId(1), "small;").with_weight(1.0).unwrap());
        rule_set.remove(&large).unwrap();

        let script = ScriptGenerator::new(&rule_set)
            .generate(3, &mut rng())
            .unwrap();
        assert_eq!(script.selected(), &[RuleId(1), RuleId(1), RuleId(1)]);
    }

    #[test]
    fn test_generate_does_not_touch_rules() {
        let rule_set = rule_set_with(&[(0, 1.0, "a"), (1, 2.0, "b")]);
        let before: Vec<(f64, bool)> = rule_set.rules().map(|r| (r.weight(), r.used())).collect();
        ScriptGenerator::new(&rule_set)
            .generate(10, &mut rng())
            .unwrap();
        let after: Vec<(f64, bool)> = rule_set.rules().map(|r| (r.weight(), r.used())).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_same_seed_same_script() {
        let rule_set = rule_set_with(&[(0, 1.0, "a"), (1, 2.0, "b"), (2, 3.0, "c")]);
        let generator = ScriptGenerator::new(&rule_set);
        let a = generator.generate(20, &mut rng()).unwrap();
        let b = generator.generate(20, &mut rng()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_spin_misses_when_total_overstated() {
        let a = Rule::with_payload(RuleId(0), "a").with_weight(1.0).unwrap();
        let b = Rule::with_payload(RuleId(1), "b").with_weight(1.0).unwrap();
        let rules = [&a, &b];
        // A draw can never reach the total, so the walk always selects something.
        let mut rng = rng();
        for _ in 0..100 {
            assert!(spin(&rules, 2.0, &mut rng).is_some());
        }
        // A total larger than the actual sum makes some spins fall through.
        let misses = (0..1000)
            .filter(|_| spin(&rules, 4.0, &mut rng).is_none())
            .count();
        assert!(misses > 0);
    }

    #[test]
    fn test_replace_rule_set() {
        let first = rule_set_with(&[(0, 1.0, "a")]);
        let second = rule_set_with(&[(7, 1.0, "z")]);
        let mut generator = ScriptGenerator::new(&first);
        generator.set_rule_set(&second);
        let script = generator.generate(2, &mut rng()).unwrap();
        assert_eq!(script.selected(), &[RuleId(7), RuleId(7)]);
    }
}
