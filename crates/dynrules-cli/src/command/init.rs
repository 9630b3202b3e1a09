use std::path::PathBuf;

use dynrules_engine::{Rule, RuleId, RuleSet};

use crate::{model::rule_file::RuleFile, util::Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InitArg {
    /// Name stored in the rule file
    #[arg(long, default_value = "rules")]
    name: String,
    /// Number of rules to create
    #[arg(long, default_value_t = 20)]
    count: u64,
    /// Initial weight of every rule
    #[arg(long, default_value_t = 1.0)]
    weight: f64,
    /// Minimum rule weight
    #[arg(long, default_value_t = 0.0)]
    min_weight: f64,
    /// Maximum rule weight
    #[arg(long, default_value_t = 10.0)]
    max_weight: f64,
    /// Payload template; `{id}` is replaced by the rule id
    #[arg(long, default_value = "# CODE FOR RULE {id}\n")]
    payload_template: String,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &InitArg) -> anyhow::Result<()> {
    let InitArg {
        name,
        count,
        weight,
        min_weight,
        max_weight,
        payload_template,
        output,
    } = arg;

    let mut rule_set = RuleSet::new(*min_weight, *max_weight)?;
    for id in 0..*count {
        let payload = payload_template.replace("{id}", &id.to_string());
        rule_set.add(Rule::with_payload(RuleId(id), payload).with_weight(*weight)?);
    }

    let file = RuleFile::from_rule_set(name.clone(), &rule_set);
    Output::save_json(&file, output.clone())?;

    eprintln!("Rule file created");
    if let Some(path) = output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Rules: {}", rule_set.len());
    eprintln!("  Total weight: {:.3}", rule_set.total_weight());
    Ok(())
}
