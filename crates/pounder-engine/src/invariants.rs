//! Post-run and per-state consistency checks.

use pounder_gateway::StorageGateway;
use serde::Serialize;

use crate::shadow::ShadowModel;

/// A broken invariant found while auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub invariant: String,
    pub details: String,
}

impl Violation {
    fn new(invariant: &str, details: String) -> Self {
        Violation {
            invariant: invariant.to_string(),
            details,
        }
    }
}

/// Compare every file and directory the shadow model believes in against
/// storage. Uses `exists` and `read_text` directly, so nothing here is counted
/// in the run statistics.
pub fn check_final_consistency(
    shadow: &ShadowModel,
    gateway: &dyn StorageGateway,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    for dir in shadow.directories() {
        match gateway.exists(dir) {
            Ok(true) => {}
            Ok(false) => violations.push(Violation::new(
                "directory-exists",
                format!("'{}' is in the model but not on disk", dir.display()),
            )),
            Err(e) => violations.push(Violation::new(
                "directory-exists",
                format!("could not check '{}': {}", dir.display(), e),
            )),
        }
    }

    for (path, expected) in shadow.files() {
        match gateway.read_text(path) {
            Ok(actual) if actual == expected => {}
            Ok(actual) => violations.push(Violation::new(
                "file-content-match",
                format!(
                    "'{}' expected {} bytes, got {} bytes",
                    path.display(),
                    expected.len(),
                    actual.len()
                ),
            )),
            Err(e) => violations.push(Violation::new(
                "file-exists",
                format!("'{}' is in the model but unreadable: {}", path.display(), e),
            )),
        }
    }

    violations
}

/// Structural invariants of the shadow model itself.
pub fn check_shadow_invariants(shadow: &ShadowModel) -> Vec<Violation> {
    let mut violations = Vec::new();

    let cursor = shadow.current_path();
    if !shadow.is_at_root() && !shadow.contains_directory(cursor) {
        violations.push(Violation::new(
            "cursor-known",
            format!("cursor '{}' is neither root nor recorded", cursor.display()),
        ));
    }

    if shadow.recent_len() > shadow.recent_capacity() {
        violations.push(Violation::new(
            "recent-bounded",
            format!(
                "{} recent entries exceed capacity {}",
                shadow.recent_len(),
                shadow.recent_capacity()
            ),
        ));
    }

    for path in shadow.recent() {
        if !shadow.contains_file(path) {
            violations.push(Violation::new(
                "recent-subset",
                format!("recent entry '{}' has no file record", path.display()),
            ));
        }
    }

    for path in shadow.directories() {
        if path == shadow.root() || !path.starts_with(shadow.root()) {
            violations.push(Violation::new(
                "directory-under-root",
                format!("'{}' is not strictly under the root", path.display()),
            ));
        }
    }

    violations
}
