use std::path::{Path, PathBuf};

use crate::types::PounderConfig;

impl PounderConfig {
    /// Fill in values that depend on the process environment.
    /// This mutates the config in place.
    pub fn apply_defaults(&mut self, cwd: &Path) {
        // The harness pounds the working directory unless told otherwise.
        if self.root.is_none() {
            self.root = Some(cwd.to_string_lossy().into_owned());
        }
    }

    /// Returns a new config with all defaults applied.
    pub fn effective(&self, cwd: &Path) -> PounderConfig {
        let mut config = self.clone();
        config.apply_defaults(cwd);
        config
    }

    /// The root directory, resolved against `cwd` when relative.
    pub fn root_path(&self, cwd: &Path) -> PathBuf {
        match &self.root {
            Some(root) => {
                let root = Path::new(root);
                if root.is_absolute() {
                    root.to_path_buf()
                } else {
                    cwd.join(root)
                }
            }
            None => cwd.to_path_buf(),
        }
    }
}
