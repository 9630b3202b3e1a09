use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use dynrules_script::{
    GeneratorLimits, ScriptFrame, ScriptGenerator, WriterSink,
    generator::{DEFAULT_MAX_ATTEMPTS_PER_SLOT, DEFAULT_MAX_OUTPUT_BYTES},
};
use rand::SeedableRng as _;
use rand_pcg::Pcg64Mcg;

use crate::{
    model::{rule_file::RuleFile, selection::SelectionRecord},
    util::Output,
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GenerateArg {
    /// Rule file to sample from
    rules: PathBuf,
    /// Maximum number of rules in the script
    #[arg(long, default_value_t = 10)]
    slots: usize,
    /// Maximum script body size in bytes (header and footer excluded)
    #[arg(long, default_value_t = DEFAULT_MAX_OUTPUT_BYTES)]
    max_bytes: usize,
    /// Maximum selection attempts per slot
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS_PER_SLOT)]
    max_attempts: usize,
    /// Seed for reproducible scripts
    #[arg(long)]
    seed: Option<u64>,
    /// Text written before the script body
    #[arg(long, default_value = "")]
    header: String,
    /// Text written after the script body
    #[arg(long, default_value = "")]
    footer: String,
    /// Script output path
    #[arg(long)]
    output: Option<PathBuf>,
    /// Append to the script output file instead of replacing it
    #[arg(long, requires = "output")]
    append: bool,
    /// Where to record the selected rule ids (input for `update --selection`)
    #[arg(long)]
    selected_output: Option<PathBuf>,
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> Pcg64Mcg {
    match seed {
        Some(seed) => Pcg64Mcg::seed_from_u64(seed),
        None => Pcg64Mcg::from_rng(&mut rand::rng()),
    }
}

pub(crate) fn run(arg: &GenerateArg) -> anyhow::Result<()> {
    let GenerateArg {
        rules,
        slots,
        max_bytes,
        max_attempts,
        seed,
        header,
        footer,
        output,
        append,
        selected_output,
    } = arg;

    let mut rule_file = RuleFile::open(rules)?;
    let rule_set = rule_file.to_rule_set()?;
    let limits = GeneratorLimits::new(*max_attempts, *max_bytes)?;
    let generator = ScriptGenerator::new(&rule_set).with_limits(limits);

    let mut rng = seeded_rng(*seed);
    let script = generator.generate(*slots, &mut rng)?;

    let output = match output {
        Some(path) if *append => Output::append(path.clone())?,
        _ => Output::from_output_path(output.clone())?,
    };
    let output_path = output.display_path();
    let frame = ScriptFrame::new(header.as_str(), footer.as_str());
    let mut sink = WriterSink::new(output);
    frame
        .emit(&script, &mut sink)
        .with_context(|| format!("Failed to write script to {output_path}"))?;

    if let Some(path) = selected_output {
        let record = SelectionRecord {
            rules_file: rules.clone(),
            generated_at: Utc::now(),
            seed: *seed,
            selected: script.selected().to_vec(),
        };
        Output::save_json(&record, Some(path.clone()))?;
    }

    eprintln!("Script generated");
    eprintln!("  Output: {output_path}");
    eprintln!("  Rules: {} of {} slots", script.selected().len(), slots);
    eprintln!("  Size: {} of {} bytes", script.len(), max_bytes);
    Ok(())
}
