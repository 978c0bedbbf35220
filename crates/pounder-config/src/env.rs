use std::env;

use regex::{Captures, Regex};

use crate::ConfigError;

/// Expand `${VAR_NAME}` references in a config document from the process environment.
///
/// Every missing variable is reported, not just the first.
pub fn interpolate_env(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

    let mut missing: Vec<String> = Vec::new();
    let expanded = re.replace_all(input, |cap: &Captures<'_>| {
        let name = &cap[1];
        match env::var(name) {
            Ok(value) => value,
            Err(_) => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        return Err(ConfigError::MissingEnvVars(missing));
    }

    Ok(expanded.into_owned())
}
