//! Storage gateway bindings for the pounder harness.
//!
//! The engine only ever talks to a [`StorageGateway`]. Which binding sits
//! behind it is decided once at startup by [`build_gateway`].

mod error;
mod fault;
mod fs;
mod memory;
mod robust;
mod traits;

use pounder_config::{GatewayKind, RetryConfig};

pub use error::{GatewayError, FAULT_PREFIX};
pub use fault::{FaultConfig, FaultStats, FaultyGateway};
pub use fs::StandardGateway;
pub use memory::MemoryGateway;
pub use robust::RobustGateway;
pub use traits::StorageGateway;

/// Build the filesystem binding selected by configuration.
pub fn build_gateway(kind: GatewayKind, retry: &RetryConfig) -> Box<dyn StorageGateway> {
    match kind {
        GatewayKind::Standard => Box::new(StandardGateway::new()),
        GatewayKind::Robust => Box::new(RobustGateway::new(retry.clone())),
    }
}
