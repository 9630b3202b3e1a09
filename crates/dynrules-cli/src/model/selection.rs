use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dynrules_engine::RuleId;
use serde::{Deserialize, Serialize};

use crate::util;

/// Rules selected for a generated script, recorded so a later `update` can reward them.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionRecord {
    pub rules_file: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub seed: Option<u64>,
    pub selected: Vec<RuleId>,
}

impl SelectionRecord {
    pub fn open<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        util::read_json_file("selection", path)
    }
}
