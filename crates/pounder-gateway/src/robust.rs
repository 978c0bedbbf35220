use std::path::Path;
use std::thread;

use pounder_config::RetryConfig;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::fs::StandardGateway;
use crate::traits::StorageGateway;

/// Retry-hardened binding.
///
/// Transient failures are retried with the configured backoff. Writes go
/// through `replace_text` on the inner gateway, so with the filesystem binding
/// a reader sees either the old or the new content, never a torn write.
pub struct RobustGateway<G = StandardGateway> {
    inner: G,
    retry: RetryConfig,
}

impl RobustGateway<StandardGateway> {
    /// Robust binding over the real filesystem.
    pub fn new(retry: RetryConfig) -> Self {
        RobustGateway {
            inner: StandardGateway::new(),
            retry,
        }
    }
}

impl<G: StorageGateway> RobustGateway<G> {
    /// Robust binding over an arbitrary gateway.
    pub fn wrap(inner: G, retry: RetryConfig) -> Self {
        RobustGateway { inner, retry }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `call` receives the 1-based attempt number.
    fn with_retry<T>(
        &self,
        operation: &str,
        path: &Path,
        mut call: impl FnMut(u32) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call(attempt) {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, path = %path.display(), attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    debug!(
                        operation,
                        path = %path.display(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    warn!(operation, path = %path.display(), attempts = attempt, "retries exhausted");
                    return Err(GatewayError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<G: StorageGateway> StorageGateway for RobustGateway<G> {
    fn name(&self) -> &'static str {
        "robust"
    }

    fn create_directory(&self, path: &Path) -> Result<(), GatewayError> {
        self.with_retry("create_directory", path, |_| {
            self.inner.create_directory(path)
        })
    }

    fn delete_directory_recursive(&self, path: &Path) -> Result<(), GatewayError> {
        self.with_retry("delete_directory_recursive", path, |attempt| {
            match self.inner.delete_directory_recursive(path) {
                // An earlier attempt may have finished the job before failing.
                Err(e) if attempt > 1 && e.is_not_found() => Ok(()),
                other => other,
            }
        })
    }

    fn write_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        self.with_retry("write_text", path, |_| self.inner.replace_text(path, content))
    }

    fn read_text(&self, path: &Path) -> Result<String, GatewayError> {
        self.with_retry("read_text", path, |_| self.inner.read_text(path))
    }

    fn delete_file(&self, path: &Path) -> Result<(), GatewayError> {
        self.with_retry("delete_file", path, |attempt| {
            match self.inner.delete_file(path) {
                Err(e) if attempt > 1 && e.is_not_found() => Ok(()),
                other => other,
            }
        })
    }

    fn exists(&self, path: &Path) -> Result<bool, GatewayError> {
        self.with_retry("exists", path, |_| self.inner.exists(path))
    }

    fn is_directory(&self, path: &Path) -> Result<bool, GatewayError> {
        self.with_retry("is_directory", path, |_| self.inner.is_directory(path))
    }

    fn replace_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        self.write_text(path, content)
    }
}
