use std::{collections::BTreeSet, path::PathBuf};

use dynrules_engine::{
    BoxedWeightPolicy, Rule, RuleId, RuleSource as _, WeightUpdate,
    policy::{FixedPolicy, RemainderStrategy, SpronckPolicy, ThresholdPolicy},
};

use crate::{
    model::{rule_file::RuleFile, selection::SelectionRecord},
    util::Output,
};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum PolicyKind {
    Fixed,
    #[default]
    Spronck,
    Threshold,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct UpdateArg {
    /// Rule file to update
    rules: PathBuf,
    /// Ids of the rules used by the evaluated script
    #[arg(long, value_delimiter = ',')]
    used: Vec<u64>,
    /// Selection record written by `generate --selected-output`
    #[arg(long)]
    selection: Option<PathBuf>,
    /// Fitness of the evaluated script
    #[arg(long, allow_hyphen_values = true)]
    fitness: f64,
    /// Weight policy turning fitness into an adjustment
    #[arg(long, default_value = "spronck")]
    policy: PolicyKind,
    /// Adjustment applied by the `fixed` policy
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    adjustment: f64,
    /// Break-even fitness of the `spronck` policy
    #[arg(long, default_value_t = 0.3)]
    break_even: f64,
    /// Maximum reward of the `spronck` policy
    #[arg(long, default_value_t = 1.0)]
    max_reward: f64,
    /// Maximum penalty of the `spronck` policy
    #[arg(long, default_value_t = 0.7)]
    max_penalty: f64,
    /// Fitness threshold of the `threshold` policy
    #[arg(long, default_value_t = 3.0)]
    threshold: f64,
    /// What to do with weight clamped off at the bounds
    #[arg(long, default_value = "spread")]
    remainder: RemainderStrategy,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

fn build_policy(arg: &UpdateArg) -> anyhow::Result<BoxedWeightPolicy> {
    let policy: BoxedWeightPolicy = match arg.policy {
        PolicyKind::Fixed => Box::new(FixedPolicy::new(arg.adjustment, arg.remainder)?),
        PolicyKind::Spronck => Box::new(SpronckPolicy::new(
            arg.break_even,
            arg.max_reward,
            arg.max_penalty,
            arg.remainder,
        )?),
        PolicyKind::Threshold => Box::new(ThresholdPolicy::new(arg.threshold, arg.remainder)?),
    };
    Ok(policy)
}

fn collect_used(arg: &UpdateArg) -> anyhow::Result<BTreeSet<RuleId>> {
    let mut used: BTreeSet<RuleId> = arg.used.iter().copied().map(RuleId).collect();
    if let Some(path) = &arg.selection {
        let record = SelectionRecord::open(path)?;
        if record.rules_file != arg.rules {
            tracing::warn!(
                recorded = %record.rules_file.display(),
                given = %arg.rules.display(),
                "selection was generated from a different rule file"
            );
        }
        used.extend(record.selected);
    }
    Ok(used)
}

pub(crate) fn run(arg: &UpdateArg) -> anyhow::Result<()> {
    let mut rule_file = RuleFile::open(&arg.rules)?;
    let mut rule_set = rule_file.to_rule_set()?;
    rule_set.set_policy(build_policy(arg)?);

    let used = collect_used(arg)?;
    for id in &used {
        rule_set.mark_used(*id, true)?;
    }

    let before = rule_set.total_weight();
    let update = rule_set.update_weights(arg.fitness)?;
    rule_set.reset_used();

    let rules: Vec<Rule> = rule_set.rules().cloned().collect();
    let Ok(()) = rule_file.save(&rules);
    Output::save_json(&rule_file, arg.output.clone())?;

    eprintln!("Weights updated ({:?} policy)", arg.policy);
    eprintln!("  Used rules: {} of {}", used.len(), rule_set.len());
    match update {
        WeightUpdate::Unchanged => {
            eprintln!("  No redistribution (no rule or every rule was used)");
        }
        WeightUpdate::Redistributed(report) => {
            eprintln!("  Adjustment:   {:+.3}", report.adjustment);
            eprintln!("  Compensation: {:+.3}", report.compensation);
            eprintln!("  Remainder:    {:+.3}", report.remainder);
            eprintln!("  Leftover:     {:+.3}", report.leftover);
        }
    }
    eprintln!(
        "  Total weight: {before:.3} -> {:.3}",
        rule_set.total_weight()
    );
    Ok(())
}
