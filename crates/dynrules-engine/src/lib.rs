//! Weighted rule population for Dynamic Scripting.
//!
//! This crate implements the rule container at the heart of Dynamic Scripting
//! (Spronck et al. 2005, *Adaptive Game AI with Dynamic Scripting*). A population of
//! weighted [`Rule`]s is kept in a [`RuleSet`]; after a generated script has been
//! evaluated, the rules that took part in it are rewarded or penalised and the other
//! rules are compensated so that the aggregate weight stays constant.
//!
//! # Architecture
//!
//! ```text
//! RuleSource (load/save)
//!     ↓ populates
//! RuleSet (weights within [min, max], total weight)
//!     ↓ sampled by
//! ScriptGenerator (dynrules-script)
//!     ↓ caller marks used rules, computes fitness
//! RuleSet::update_weights(fitness)
//!     ↓ delegates to
//! WeightPolicy (adjustment + remainder)
//! ```
//!
//! # Modules
//!
//! - [`rule`] - [`Rule`] and [`RuleId`]
//! - [`payload`] - opaque rule content ([`Payload`])
//! - [`rule_set`] - the weighted container and the redistribution algorithm
//! - [`policy`] - [`WeightPolicy`] strategy trait and stock policies
//! - [`source`] - [`RuleSource`] trait and an in-memory implementation
//!
//! # Example
//!
//! ```
//! use dynrules_engine::{Rule, RuleId, RuleSet, policy::{FixedPolicy, RemainderStrategy}};
//!
//! let mut rule_set = RuleSet::new(10.0, 20.0)?;
//! for id in 0..10 {
//!     let mut rule = Rule::new(RuleId(id));
//!     rule.set_weight(15.0)?;
//!     rule_set.add(rule);
//! }
//! rule_set.set_policy(Box::new(FixedPolicy::new(3.0, RemainderStrategy::Ignore)?));
//!
//! rule_set.mark_used(RuleId(3), true)?;
//! rule_set.mark_used(RuleId(7), true)?;
//! rule_set.update_weights(0.0)?;
//!
//! assert!(rule_set.find(RuleId(3)).unwrap().weight() > 15.0);
//! assert!(rule_set.find(RuleId(0)).unwrap().weight() < 15.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use self::{
    payload::Payload,
    policy::{BoxedWeightPolicy, RemainderTarget, WeightPolicy},
    rule::{Rule, RuleId},
    rule_set::{RedistributionReport, RuleSet, WeightUpdate},
    source::{MemoryRuleSource, RuleSource},
};

pub mod payload;
pub mod policy;
pub mod rule;
pub mod rule_set;
pub mod source;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    derive_more::Display,
    derive_more::Error,
    derive_more::IsVariant,
)]
pub enum RuleError {
    #[display("weight must not be negative (got {weight})")]
    NegativeWeight { weight: f64 },
    #[display("weight must be finite (got {weight})")]
    NonFiniteWeight { weight: f64 },
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    derive_more::Display,
    derive_more::Error,
    derive_more::IsVariant,
)]
pub enum PolicyError {
    #[display("weight policy does not implement {operation}")]
    NotImplemented { operation: &'static str },
    #[display("invalid weight policy parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    derive_more::Display,
    derive_more::Error,
    derive_more::From,
    derive_more::IsVariant,
)]
pub enum RuleSetError {
    #[display("invalid weight bounds: min = {min}, max = {max}")]
    #[from(ignore)]
    InvalidBound { min: f64, max: f64 },
    #[display("rule {id} does not exist")]
    #[from(ignore)]
    NotFound { id: RuleId },
    #[display("rule {id} does not match the rule tracked by the set")]
    #[from(ignore)]
    Mismatch { id: RuleId },
    #[display("weight policy failed: {_0}")]
    Policy(PolicyError),
}
