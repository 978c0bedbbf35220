use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::error::GatewayError;
use crate::traits::StorageGateway;

/// Configuration for fault injection.
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// Probability of injecting an error per call (0.0-1.0).
    pub error_rate: f64,
    /// Probability of corrupting read data via bit flip (0.0-1.0).
    pub corruption_rate: f64,
}

/// Statistics about injected faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultStats {
    pub fault_count: usize,
    pub corruption_count: usize,
}

/// A gateway wrapper that randomly injects errors and corrupts reads.
pub struct FaultyGateway<G> {
    inner: G,
    rng: Mutex<ChaCha8Rng>,
    config: FaultConfig,
    fault_count: AtomicUsize,
    corruption_count: AtomicUsize,
}

impl<G: StorageGateway> FaultyGateway<G> {
    pub fn new(inner: G, rng: ChaCha8Rng, config: FaultConfig) -> Self {
        FaultyGateway {
            inner,
            rng: Mutex::new(rng),
            config,
            fault_count: AtomicUsize::new(0),
            corruption_count: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn stats(&self) -> FaultStats {
        FaultStats {
            fault_count: self.fault_count.load(Ordering::Relaxed),
            corruption_count: self.corruption_count.load(Ordering::Relaxed),
        }
    }

    fn roll(&self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        let roll: f64 = self.rng.lock().unwrap_or_else(|e| e.into_inner()).gen();
        roll < rate
    }

    /// Fail the call with an injected error if the dice say so.
    fn maybe_fail(&self, operation: &str, path: &Path) -> Result<(), GatewayError> {
        if self.roll(self.config.error_rate) {
            self.fault_count.fetch_add(1, Ordering::Relaxed);
            return Err(GatewayError::Injected {
                operation: operation.to_string(),
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Flip one low bit of one byte. Low bits keep ASCII text ASCII.
    fn corrupt(&self, content: String) -> String {
        if content.is_empty() {
            return content;
        }
        self.corruption_count.fetch_add(1, Ordering::Relaxed);
        let mut bytes = content.into_bytes();
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let byte_idx = rng.gen_range(0..bytes.len());
        let bit_idx = rng.gen_range(0..7u8);
        bytes[byte_idx] ^= 1 << bit_idx;
        String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
    }
}

impl<G: StorageGateway> StorageGateway for FaultyGateway<G> {
    fn name(&self) -> &'static str {
        "faulty"
    }

    fn create_directory(&self, path: &Path) -> Result<(), GatewayError> {
        self.maybe_fail("create_directory", path)?;
        self.inner.create_directory(path)
    }

    fn delete_directory_recursive(&self, path: &Path) -> Result<(), GatewayError> {
        self.maybe_fail("delete_directory_recursive", path)?;
        self.inner.delete_directory_recursive(path)
    }

    fn write_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        self.maybe_fail("write_text", path)?;
        self.inner.write_text(path, content)
    }

    fn read_text(&self, path: &Path) -> Result<String, GatewayError> {
        self.maybe_fail("read_text", path)?;
        let content = self.inner.read_text(path)?;
        if self.roll(self.config.corruption_rate) {
            return Ok(self.corrupt(content));
        }
        Ok(content)
    }

    fn delete_file(&self, path: &Path) -> Result<(), GatewayError> {
        self.maybe_fail("delete_file", path)?;
        self.inner.delete_file(path)
    }

    fn exists(&self, path: &Path) -> Result<bool, GatewayError> {
        // Audits must see the truth.
        self.inner.exists(path)
    }

    fn is_directory(&self, path: &Path) -> Result<bool, GatewayError> {
        self.inner.is_directory(path)
    }

    fn replace_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        self.maybe_fail("replace_text", path)?;
        self.inner.replace_text(path, content)
    }
}
