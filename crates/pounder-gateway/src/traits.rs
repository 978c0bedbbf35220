use std::path::Path;
use std::sync::Arc;

use crate::error::GatewayError;

/// The file-I/O capability the engine pounds on.
///
/// Every call is synchronous and blocking. Implementations must support
/// `write_text` both creating a new file and replacing an existing one.
pub trait StorageGateway: Send + Sync {
    /// Short label for logs and reports.
    fn name(&self) -> &'static str;

    /// Create a directory (and any missing ancestors).
    fn create_directory(&self, path: &Path) -> Result<(), GatewayError>;

    /// Delete a directory and everything under it.
    fn delete_directory_recursive(&self, path: &Path) -> Result<(), GatewayError>;

    /// Write text to a file, creating or truncating it.
    fn write_text(&self, path: &Path, content: &str) -> Result<(), GatewayError>;

    /// Read a whole file as text.
    fn read_text(&self, path: &Path) -> Result<String, GatewayError>;

    /// Delete a single file.
    fn delete_file(&self, path: &Path) -> Result<(), GatewayError>;

    /// Check if a path exists. Only used for post-run audits.
    fn exists(&self, path: &Path) -> Result<bool, GatewayError>;

    /// Check if a path exists and is a directory. Used to vet the root at startup.
    fn is_directory(&self, path: &Path) -> Result<bool, GatewayError>;

    /// Replace a file's content so readers never observe a partial write.
    ///
    /// Defaults to `write_text` for bindings whose writes are already atomic.
    fn replace_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        self.write_text(path, content)
    }
}

/// Lets a caller keep a handle on a gateway (e.g. to read fault stats)
/// while handing a clone to the engine.
impl<G: StorageGateway + ?Sized> StorageGateway for Arc<G> {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn create_directory(&self, path: &Path) -> Result<(), GatewayError> {
        (**self).create_directory(path)
    }
    fn delete_directory_recursive(&self, path: &Path) -> Result<(), GatewayError> {
        (**self).delete_directory_recursive(path)
    }
    fn write_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        (**self).write_text(path, content)
    }
    fn read_text(&self, path: &Path) -> Result<String, GatewayError> {
        (**self).read_text(path)
    }
    fn delete_file(&self, path: &Path) -> Result<(), GatewayError> {
        (**self).delete_file(path)
    }
    fn exists(&self, path: &Path) -> Result<bool, GatewayError> {
        (**self).exists(path)
    }
    fn is_directory(&self, path: &Path) -> Result<bool, GatewayError> {
        (**self).is_directory(path)
    }
    fn replace_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        (**self).replace_text(path, content)
    }
}

impl<G: StorageGateway + ?Sized> StorageGateway for Box<G> {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn create_directory(&self, path: &Path) -> Result<(), GatewayError> {
        (**self).create_directory(path)
    }
    fn delete_directory_recursive(&self, path: &Path) -> Result<(), GatewayError> {
        (**self).delete_directory_recursive(path)
    }
    fn write_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        (**self).write_text(path, content)
    }
    fn read_text(&self, path: &Path) -> Result<String, GatewayError> {
        (**self).read_text(path)
    }
    fn delete_file(&self, path: &Path) -> Result<(), GatewayError> {
        (**self).delete_file(path)
    }
    fn exists(&self, path: &Path) -> Result<bool, GatewayError> {
        (**self).exists(path)
    }
    fn is_directory(&self, path: &Path) -> Result<bool, GatewayError> {
        (**self).is_directory(path)
    }
    fn replace_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        (**self).replace_text(path, content)
    }
}
