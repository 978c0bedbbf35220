use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::stats::{Anomaly, Stats};

/// What a finished run hands back to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Seed that reproduces the run.
    pub seed: u64,
    pub gateway: String,
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub iterations: u64,
    pub stats: Stats,
    pub errors: Vec<Anomaly>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Pounded {} for {} iterations with the {} gateway (seed {})",
            self.root.display(),
            self.iterations,
            self.gateway,
            self.seed
        )?;
        writeln!(f, "{}, {} errors", self.stats, self.errors.len())?;
        writeln!(f)?;
        if self.errors.is_empty() {
            writeln!(f, "No problems detected")
        } else {
            writeln!(f, "Errors reported:")?;
            for error in &self.errors {
                writeln!(f, "{}", error)?;
            }
            Ok(())
        }
    }
}
