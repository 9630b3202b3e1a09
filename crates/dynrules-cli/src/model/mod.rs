pub mod rule_file;
pub mod selection;
