use crate::types::{GateConfig, PounderConfig};
use crate::ConfigError;

impl PounderConfig {
    /// Validate the configuration and return a list of errors.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Some(root) = &self.root {
            if root.trim().is_empty() {
                errors.push(ConfigError::InvalidConfig(
                    "root must not be an empty string".to_string(),
                ));
            }
        }

        let gates = [
            ("delete_file", self.gates.delete_file),
            ("pop_directory", self.gates.pop_directory),
            ("delete_directory", self.gates.delete_directory),
        ];
        for (name, value) in gates {
            if value > GateConfig::DRAW_RANGE {
                errors.push(ConfigError::InvalidGate(name.to_string(), value));
            }
        }

        if self.retry.max_attempts == 0 {
            errors.push(ConfigError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.retry.base_delay.as_duration() > self.retry.max_delay.as_duration() {
            errors.push(ConfigError::InvalidConfig(format!(
                "retry.base_delay ({}) exceeds retry.max_delay ({})",
                self.retry.base_delay, self.retry.max_delay
            )));
        }

        if self.content.recent_capacity == 0 {
            errors.push(ConfigError::InvalidConfig(
                "content.recent_capacity must be at least 1".to_string(),
            ));
        }

        if self.content.max_repetitions == 0 {
            errors.push(ConfigError::InvalidConfig(
                "content.max_repetitions must be at least 1".to_string(),
            ));
        }

        errors
    }

    /// Validate and return Ok(()) if valid, or Err with the first error.
    pub fn validate_or_err(&self) -> Result<(), ConfigError> {
        match self.validate().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
