use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use self::{generate::GenerateArg, init::InitArg, simulate::SimulateArg, update::UpdateArg};

mod generate;
mod init;
mod simulate;
mod update;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log filter used when `RUST_LOG` is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Write a fresh rule file
    Init(#[clap(flatten)] InitArg),
    /// Generate a script from a rule file
    Generate(#[clap(flatten)] GenerateArg),
    /// Reward or penalise the rules used by a script
    Update(#[clap(flatten)] UpdateArg),
    /// Run a synthetic learning loop and report how the weights evolve
    Simulate(#[clap(flatten)] SimulateArg),
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_tracing(&args.log_level);
    dispatch(args.mode)
}

fn dispatch(mode: Mode) -> anyhow::Result<()> {
    match mode {
        Mode::Init(arg) => init::run(&arg)?,
        Mode::Generate(arg) => generate::run(&arg)?,
        Mode::Update(arg) => update::run(&arg)?,
        Mode::Simulate(arg) => simulate::run(&arg)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::CommandFactory as _;

    use super::*;
    use crate::model::{rule_file::RuleFile, selection::SelectionRecord};

    fn run_with<I>(args: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let args = CommandArgs::try_parse_from(args)?;
        dispatch(args.mode)
    }

    fn path_arg(path: &Path) -> String {
        path.to_str().unwrap().to_owned()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_cli_definition() {
        CommandArgs::command().debug_assert();
    }

    #[test]
    fn test_parse_update_arguments() {
        let parsed = CommandArgs::try_parse_from([
            "dynrules", "update", "rules.json", "--used", "3,7", "--fitness", "-0.5", "--policy",
            "fixed", "--remainder", "ignore",
        ])
        .unwrap();
        assert!(matches!(parsed.mode, Mode::Update(_)));
    }

    #[test]
    fn test_init_generate_update_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("rules.json");
        let script = dir.path().join("script.txt");
        let selection = dir.path().join("selection.json");
        let updated = dir.path().join("updated.json");

        let mut init = args(&["dynrules", "init", "--count", "8", "--weight", "5", "--output"]);
        init.push(path_arg(&rules));
        run_with(init).unwrap();

        let mut generate = args(&["dynrules", "generate"]);
        generate.push(path_arg(&rules));
        generate.extend(args(&["--slots", "3", "--seed", "7", "--header", "BEGIN\n"]));
        generate.extend(["--output".to_owned(), path_arg(&script)]);
        generate.extend(["--selected-output".to_owned(), path_arg(&selection)]);
        run_with(generate).unwrap();

        let text = std::fs::read_to_string(&script).unwrap();
        assert!(text.starts_with("BEGIN"));
        assert_eq!(text.matches("# CODE FOR RULE").count(), 3);
        let record = SelectionRecord::open(&selection).unwrap();
        assert_eq!(record.selected.len(), 3);

        let mut update = args(&["dynrules", "update"]);
        update.push(path_arg(&rules));
        update.extend(args(&["--fitness", "1", "--policy", "fixed", "--adjustment", "1"]));
        update.extend(["--selection".to_owned(), path_arg(&selection)]);
        update.extend(["--output".to_owned(), path_arg(&updated)]);
        run_with(update).unwrap();

        let file = RuleFile::open(&updated).unwrap();
        let total: f64 = file.rules.iter().map(dynrules_engine::Rule::weight).sum();
        assert!((total - 40.0).abs() < 1e-9);
        for rule in &file.rules {
            assert!(!rule.used());
            if record.selected.contains(&rule.id()) {
                assert!((rule.weight() - 6.0).abs() < 1e-9);
            } else {
                assert!(rule.weight() < 5.0);
            }
        }
    }

    #[test]
    fn test_generate_append_keeps_previous_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("rules.json");
        let script = dir.path().join("script.txt");
        let mut init = args(&["dynrules", "init", "--count", "4", "--output"]);
        init.push(path_arg(&rules));
        run_with(init).unwrap();

        let generate = |extra: &[&str]| {
            let mut generate = args(&["dynrules", "generate"]);
            generate.push(path_arg(&rules));
            generate.extend(args(&["--slots", "2", "--header", "BEGIN\n"]));
            generate.extend(["--output".to_owned(), path_arg(&script)]);
            generate.extend(args(extra));
            run_with(generate).unwrap();
        };
        generate(&[]);
        generate(&["--append"]);
        let text = std::fs::read_to_string(&script).unwrap();
        assert_eq!(text.matches("BEGIN").count(), 2);

        generate(&[]);
        let text = std::fs::read_to_string(&script).unwrap();
        assert_eq!(text.matches("BEGIN").count(), 1);
    }

    #[test]
    fn test_update_rejects_infinite_adjustment() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("rules.json");
        let mut init = args(&["dynrules", "init", "--count", "3", "--output"]);
        init.push(path_arg(&rules));
        run_with(init).unwrap();

        let mut update = args(&["dynrules", "update"]);
        update.push(path_arg(&rules));
        update.extend(args(&["--used", "0", "--fitness", "1"]));
        update.extend(args(&["--policy", "fixed", "--adjustment", "inf"]));
        update.extend(["--output".to_owned(), path_arg(&dir.path().join("out.json"))]);
        let err = run_with(update).unwrap_err();
        assert!(err.to_string().contains("invalid weight policy parameter adjustment"));
    }

    #[test]
    fn test_update_rejects_unknown_rule() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("rules.json");
        let mut init = args(&["dynrules", "init", "--count", "2", "--output"]);
        init.push(path_arg(&rules));
        run_with(init).unwrap();

        let mut update = args(&["dynrules", "update"]);
        update.push(path_arg(&rules));
        update.extend(args(&["--used", "99", "--fitness", "0.5"]));
        update.extend(["--output".to_owned(), path_arg(&dir.path().join("out.json"))]);
        let err = run_with(update).unwrap_err();
        assert!(err.to_string().contains("rule 99 does not exist"));
    }
}
