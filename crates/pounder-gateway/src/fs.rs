use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::error::GatewayError;
use crate::traits::StorageGateway;

/// Plain `std::fs` binding. Every call is a single filesystem syscall sequence
/// with no retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGateway;

impl StandardGateway {
    pub fn new() -> Self {
        StandardGateway
    }
}

/// Sibling path used to stage an atomic replace of `path`.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.pounder-tmp", name))
}

impl StorageGateway for StandardGateway {
    fn name(&self) -> &'static str {
        "standard"
    }

    #[instrument(skip(self), fields(gateway = "standard", path = %path.display()))]
    fn create_directory(&self, path: &Path) -> Result<(), GatewayError> {
        debug!("creating directory");
        fs::create_dir_all(path).map_err(|e| GatewayError::from_io(e, path))
    }

    #[instrument(skip(self), fields(gateway = "standard", path = %path.display()))]
    fn delete_directory_recursive(&self, path: &Path) -> Result<(), GatewayError> {
        debug!("deleting directory tree");
        fs::remove_dir_all(path).map_err(|e| GatewayError::from_io(e, path))
    }

    #[instrument(skip(self, content), fields(gateway = "standard", path = %path.display(), size = content.len()))]
    fn write_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        debug!("writing file");
        fs::write(path, content).map_err(|e| GatewayError::from_io(e, path))
    }

    #[instrument(skip(self), fields(gateway = "standard", path = %path.display()))]
    fn read_text(&self, path: &Path) -> Result<String, GatewayError> {
        debug!("reading file");
        fs::read_to_string(path).map_err(|e| GatewayError::from_io(e, path))
    }

    #[instrument(skip(self), fields(gateway = "standard", path = %path.display()))]
    fn delete_file(&self, path: &Path) -> Result<(), GatewayError> {
        debug!("deleting file");
        fs::remove_file(path).map_err(|e| GatewayError::from_io(e, path))
    }

    fn exists(&self, path: &Path) -> Result<bool, GatewayError> {
        path.try_exists().map_err(|e| GatewayError::from_io(e, path))
    }

    fn is_directory(&self, path: &Path) -> Result<bool, GatewayError> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GatewayError::from_io(e, path)),
        }
    }

    #[instrument(skip(self, content), fields(gateway = "standard", path = %path.display(), size = content.len()))]
    fn replace_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        let staging = staging_path(path);
        debug!(staging = %staging.display(), "staging atomic replace");

        if let Err(e) = fs::write(&staging, content) {
            discard_staging(&staging);
            return Err(GatewayError::from_io(e, &staging));
        }
        if let Err(e) = fs::rename(&staging, path) {
            discard_staging(&staging);
            return Err(GatewayError::from_io(e, path));
        }
        Ok(())
    }
}

/// Best-effort removal of a staging file left behind by a failed replace.
fn discard_staging(staging: &Path) {
    match fs::remove_file(staging) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!(staging = %staging.display(), error = %e, "failed to remove staging file"),
    }
}
