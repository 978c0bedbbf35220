use std::io;
use std::path::{Path, PathBuf};

/// Marker carried by every injected failure so it can be told apart from a real one.
pub const FAULT_PREFIX: &str = "[fault-injected]";

/// Errors raised by a storage gateway call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Path does not exist.
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Path already exists with an incompatible kind.
    #[error("Path already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Any other IO failure, tagged with the path it happened on.
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The robust binding gave up on a transient failure.
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<GatewayError>,
    },

    /// Failure injected by a fault-injecting gateway.
    #[error("[fault-injected] {operation} failed on {}", .path.display())]
    Injected { operation: String, path: PathBuf },
}

impl GatewayError {
    /// Map an IO error on `path` to the most specific variant.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => GatewayError::NotFound(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => GatewayError::AlreadyExists(path.to_path_buf()),
            _ => GatewayError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Returns true if this error is transient and the call may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Injected { .. } => true,
            GatewayError::Io { source, .. } => is_transient_io(source),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}

fn is_transient_io(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    ) {
        return true;
    }

    // Sharing and lock violations surface as access denied on Windows.
    #[cfg(windows)]
    {
        if err.kind() == io::ErrorKind::PermissionDenied {
            return true;
        }
        if matches!(err.raw_os_error(), Some(32) | Some(33)) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_not_found() {
        let err = GatewayError::from_io(
            io::Error::new(io::ErrorKind::NotFound, "gone"),
            Path::new("/root/a.txt"),
        );
        assert!(matches!(err, GatewayError::NotFound(ref p) if p == Path::new("/root/a.txt")));
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_from_io_other_keeps_path() {
        let err = GatewayError::from_io(io::Error::other("disk on fire"), Path::new("/x/y"));
        let msg = err.to_string();
        assert!(msg.contains("/x/y"));
        assert!(msg.contains("disk on fire"));
    }

    #[test]
    fn test_interrupted_is_transient() {
        let err = GatewayError::from_io(
            io::Error::new(io::ErrorKind::Interrupted, "eintr"),
            Path::new("/x"),
        );
        assert!(err.is_transient());
    }

    #[test]
    fn test_injected_is_transient_and_marked() {
        let err = GatewayError::Injected {
            operation: "write_text".to_string(),
            path: PathBuf::from("/x"),
        };
        assert!(err.is_transient());
        assert!(err.to_string().starts_with(FAULT_PREFIX));
    }

    #[test]
    fn test_exhausted_not_transient() {
        let err = GatewayError::RetriesExhausted {
            attempts: 3,
            last: Box::new(GatewayError::Injected {
                operation: "read_text".to_string(),
                path: PathBuf::from("/x"),
            }),
        };
        assert!(!err.is_transient());
        assert!(err.to_string().contains("3 attempts"));
    }
}
