use std::collections::{BTreeMap, BTreeSet};

use dynrules_engine::{
    Rule, RuleId, RuleSet,
    policy::{RemainderStrategy, SpronckPolicy},
};
use dynrules_script::{GeneratorLimits, ScriptGenerator, generator::DEFAULT_MAX_ATTEMPTS_PER_SLOT};
use rand::Rng;

use super::generate::seeded_rng;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    /// Number of rules in the population
    #[arg(long, default_value_t = 20)]
    rules: u64,
    /// Number of generate/evaluate/update cycles
    #[arg(long, default_value_t = 50)]
    generations: usize,
    /// Rules per generated script
    #[arg(long, default_value_t = 5)]
    slots: usize,
    /// Initial weight of every rule
    #[arg(long, default_value_t = 1.0)]
    initial_weight: f64,
    /// Minimum rule weight
    #[arg(long, default_value_t = 0.0)]
    min_weight: f64,
    /// Maximum rule weight
    #[arg(long, default_value_t = 10.0)]
    max_weight: f64,
    /// Break-even fitness
    #[arg(long, default_value_t = 0.5)]
    break_even: f64,
    /// Maximum reward per evaluation
    #[arg(long, default_value_t = 1.0)]
    max_reward: f64,
    /// Maximum penalty per evaluation
    #[arg(long, default_value_t = 0.7)]
    max_penalty: f64,
    /// What to do with weight clamped off at the bounds
    #[arg(long, default_value = "spread")]
    remainder: RemainderStrategy,
    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
struct WeightSummary {
    min: f64,
    max: f64,
    mean: f64,
}

impl WeightSummary {
    fn new(rule_set: &RuleSet) -> Option<Self> {
        let mut weights = rule_set.rules().map(Rule::weight);
        let first = weights.next()?;
        let (min, max) = weights.fold((first, first), |(min, max), w| (min.min(w), max.max(w)));
        #[expect(clippy::cast_precision_loss)]
        let mean = rule_set.total_weight() / rule_set.len() as f64;
        Some(Self { min, max, mean })
    }
}

/// Mean hidden quality of the distinct rules in a script.
fn evaluate(used: &BTreeSet<RuleId>, qualities: &BTreeMap<RuleId, f64>) -> f64 {
    if used.is_empty() {
        return 0.0;
    }
    let sum: f64 = used.iter().filter_map(|id| qualities.get(id)).sum();
    #[expect(clippy::cast_precision_loss)]
    let count = used.len() as f64;
    sum / count
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let mut rng = seeded_rng(arg.seed);

    let policy = SpronckPolicy::new(
        arg.break_even,
        arg.max_reward,
        arg.max_penalty,
        arg.remainder,
    )?;
    let mut rule_set = RuleSet::new(arg.min_weight, arg.max_weight)?.with_policy(Box::new(policy));
    let mut qualities = BTreeMap::new();
    for id in (0..arg.rules).map(RuleId) {
        qualities.insert(id, rng.random_range(0.0..=1.0));
        rule_set.add(
            Rule::with_payload(id, format!("rule_{id}();\n")).with_weight(arg.initial_weight)?,
        );
    }
    let limits = GeneratorLimits::new(DEFAULT_MAX_ATTEMPTS_PER_SLOT, usize::MAX)?;

    for generation in 0..arg.generations {
        let script = ScriptGenerator::new(&rule_set)
            .with_limits(limits)
            .generate(arg.slots, &mut rng)?;
        let used: BTreeSet<RuleId> = script.selected().iter().copied().collect();
        let fitness = evaluate(&used, &qualities);

        for id in &used {
            rule_set.mark_used(*id, true)?;
        }
        rule_set.update_weights(fitness)?;
        rule_set.reset_used();

        if let Some(summary) = WeightSummary::new(&rule_set) {
            eprintln!(
                "Generation #{generation:3}: fitness {fitness:.3}, \
                 weights min {:.3} / mean {:.3} / max {:.3}",
                summary.min, summary.mean, summary.max
            );
        }
    }

    let mut ranked: Vec<&Rule> = rule_set.rules().collect();
    ranked.sort_by(|a, b| b.weight().total_cmp(&a.weight()));
    eprintln!("Heaviest rules:");
    for rule in ranked.iter().take(5) {
        let quality = qualities.get(&rule.id()).copied().unwrap_or_default();
        eprintln!(
            "  {:>3}: weight {:.3}, quality {quality:.3}",
            rule.id(),
            rule.weight()
        );
    }
    eprintln!("Total weight: {:.3}", rule_set.total_weight());
    Ok(())
}
