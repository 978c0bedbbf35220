use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for a pounding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PounderConfig {
    /// Directory to pound. Falls back to the working directory when unset.
    pub root: Option<String>,

    /// Which storage gateway binding to use.
    pub gateway: GatewayKind,

    /// Seed for the random source. `None` draws one from OS entropy.
    pub seed: Option<u64>,

    /// Iterations between status summaries (0 disables them).
    pub status_interval: u64,

    /// Stop after this many iterations even without cancellation.
    pub max_iterations: Option<u64>,

    /// Secondary probability gates for the destructive operations.
    pub gates: GateConfig,

    /// Retry tuning for the robust gateway.
    pub retry: RetryConfig,

    /// Random content and recency-window tuning.
    pub content: ContentConfig,
}

impl Default for PounderConfig {
    fn default() -> Self {
        PounderConfig {
            root: None,
            gateway: GatewayKind::Standard,
            seed: None,
            status_interval: 100,
            max_iterations: None,
            gates: GateConfig::default(),
            retry: RetryConfig::default(),
            content: ContentConfig::default(),
        }
    }
}

/// Storage gateway binding, selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// Plain filesystem calls
    #[default]
    Standard,
    /// Retrying, atomic-replace filesystem calls
    Robust,
}

impl fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayKind::Standard => write!(f, "standard"),
            GatewayKind::Robust => write!(f, "robust"),
        }
    }
}

/// Secondary gates, each expressed as "proceed when a draw in `0..10` is below N".
///
/// A value of 10 always proceeds, 0 never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub delete_file: u32,
    pub pop_directory: u32,
    pub delete_directory: u32,
}

impl GateConfig {
    pub const DRAW_RANGE: u32 = 10;

    /// Gates that never hold an operation back.
    pub fn always() -> Self {
        GateConfig {
            delete_file: Self::DRAW_RANGE,
            pop_directory: Self::DRAW_RANGE,
            delete_directory: Self::DRAW_RANGE,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        // Destruction lags creation so the tree fills up between teardowns.
        GateConfig {
            delete_file: 8,
            pop_directory: 1,
            delete_directory: 4,
        }
    }
}

/// Retry backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Linearly increasing delay
    Linear,
    /// Exponentially increasing delay
    #[default]
    Exponential,
}

/// Robust gateway retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    pub base_delay: HumanDuration,
    pub max_delay: HumanDuration,
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 10,
            base_delay: HumanDuration(std::time::Duration::from_millis(10)),
            max_delay: HumanDuration(std::time::Duration::from_millis(500)),
            backoff: BackoffStrategy::Exponential,
        }
    }
}

impl RetryConfig {
    /// Delay to sleep before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> std::time::Duration {
        let base = self.base_delay.as_duration();
        let delay = match self.backoff {
            BackoffStrategy::Fixed => base,
            BackoffStrategy::Linear => base.saturating_mul(retry.max(1)),
            BackoffStrategy::Exponential => {
                let shift = retry.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << shift)
            }
        };
        delay.min(self.max_delay.as_duration())
    }
}

/// Shape of generated file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Exclusive upper bound on phrase repetitions per file.
    pub max_repetitions: u32,
    /// Phrase each generated line starts with.
    pub phrase: String,
    /// Capacity of the recently-written window used to bias reads.
    pub recent_capacity: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        ContentConfig {
            max_repetitions: 300,
            phrase: "This is some random stuff ".to_string(),
            recent_capacity: 9,
        }
    }
}

/// Human-readable duration (e.g., "200ms", "5s", "1m").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanDuration(pub std::time::Duration);

impl Default for HumanDuration {
    fn default() -> Self {
        HumanDuration(std::time::Duration::from_secs(0))
    }
}

impl HumanDuration {
    pub fn as_duration(&self) -> std::time::Duration {
        self.0
    }
}

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        let (num_str, unit) = if let Some(num) = s.strip_suffix("ms") {
            (num, "ms")
        } else if let Some(num) = s.strip_suffix('s') {
            (num, "s")
        } else if let Some(num) = s.strip_suffix('m') {
            (num, "m")
        } else {
            return Err(format!("Invalid duration format: {}", s));
        };

        let num: u64 = num_str
            .parse()
            .map_err(|_| format!("Invalid number in duration: {}", s))?;

        let duration = match unit {
            "ms" => std::time::Duration::from_millis(num),
            "s" => std::time::Duration::from_secs(num),
            _ => std::time::Duration::from_secs(num * 60),
        };

        Ok(HumanDuration(duration))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.as_millis();
        let secs = self.0.as_secs();

        if millis < 1000 || millis % 1000 != 0 {
            write!(f, "{}ms", millis)
        } else if secs < 60 || secs % 60 != 0 {
            write!(f, "{}s", secs)
        } else {
            write!(f, "{}m", secs / 60)
        }
    }
}

impl Serialize for HumanDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        HumanDuration::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_human_duration_parse() {
        assert_eq!(
            "250ms".parse::<HumanDuration>().unwrap().as_duration(),
            Duration::from_millis(250)
        );
        assert_eq!(
            "3s".parse::<HumanDuration>().unwrap().as_duration(),
            Duration::from_secs(3)
        );
        assert_eq!(
            "2m".parse::<HumanDuration>().unwrap().as_duration(),
            Duration::from_secs(120)
        );
        assert!("ten".parse::<HumanDuration>().is_err());
        assert!("5h".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_human_duration_display() {
        assert_eq!(HumanDuration(Duration::from_millis(10)).to_string(), "10ms");
        assert_eq!(HumanDuration(Duration::from_millis(1500)).to_string(), "1500ms");
        assert_eq!(HumanDuration(Duration::from_secs(5)).to_string(), "5s");
        assert_eq!(HumanDuration(Duration::from_secs(180)).to_string(), "3m");
    }

    #[test]
    fn test_default_gates_favor_accumulation() {
        let gates = GateConfig::default();
        assert_eq!(gates.delete_file, 8);
        assert_eq!(gates.pop_directory, 1);
        assert_eq!(gates.delete_directory, 4);
    }

    #[test]
    fn test_retry_delay_exponential_capped() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for(1), Duration::from_millis(10));
        assert_eq!(retry.delay_for(2), Duration::from_millis(20));
        assert_eq!(retry.delay_for(4), Duration::from_millis(80));
        assert_eq!(retry.delay_for(20), Duration::from_millis(500));
    }

    #[test]
    fn test_retry_delay_linear_and_fixed() {
        let mut retry = RetryConfig {
            backoff: BackoffStrategy::Linear,
            ..Default::default()
        };
        assert_eq!(retry.delay_for(3), Duration::from_millis(30));

        retry.backoff = BackoffStrategy::Fixed;
        assert_eq!(retry.delay_for(7), Duration::from_millis(10));
    }
}
