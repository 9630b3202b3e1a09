//! Script generation for Dynamic Scripting.
//!
//! This crate turns a weighted [`RuleSet`](dynrules_engine::RuleSet) into scripts. Each
//! script is assembled by roulette-wheel sampling: rules are drawn with probability
//! proportional to their weight and their payloads are concatenated, up to a slot
//! count and a byte ceiling.
//!
//! # How Generation Fits In
//!
//! 1. **Generate** - [`ScriptGenerator::generate`] samples rules into a [`Script`]
//! 2. **Emit** - [`ScriptFrame::emit`] writes header, body and footer to a [`ScriptSink`]
//! 3. **Evaluate** - the application runs the script and computes a fitness (out of scope)
//! 4. **Learn** - the application marks [`Script::selected`] rules as used and calls
//!    [`RuleSet::update_weights`](dynrules_engine::RuleSet::update_weights)
//!
//! Generation never mutates the rule set.
//!
//! # Example
//!
//! ```
//! use dynrules_engine::{Rule, RuleId, RuleSet};
//! use dynrules_script::{ScriptFrame, ScriptGenerator, WriterSink};
//!
//! let mut rule_set = RuleSet::new(0.0, 10.0)?;
//! for id in 0..20 {
//!     let rule = Rule::with_payload(RuleId(id), format!("# CODE FOR RULE {id}\n"))
//!         .with_weight(1.0)?;
//!     rule_set.add(rule);
//! }
//!
//! let generator = ScriptGenerator::new(&rule_set);
//! let script = generator.generate(10, &mut rand::rng())?;
//! assert_eq!(script.selected().len(), 10);
//!
//! let frame = ScriptFrame::new("# HEADER\n", "# FOOTER\n");
//! let mut sink = WriterSink::new(Vec::new());
//! frame.emit(&script, &mut sink)?;
//! assert!(sink.into_inner().starts_with(b"# HEADER\n"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use self::{
    generator::{GeneratorLimits, Script, ScriptGenerator},
    sink::{ScriptFrame, ScriptSink, WriterSink},
};

pub mod generator;
pub mod sink;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    derive_more::Display,
    derive_more::Error,
    derive_more::IsVariant,
)]
pub enum GenerateError {
    #[display("{name} must be at least 1 (got {value})")]
    InvalidArgument { name: &'static str, value: usize },
    #[display("total rule weight is not finite (got {total_weight})")]
    NonFiniteTotal { total_weight: f64 },
}
