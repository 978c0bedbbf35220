use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::GatewayError;
use crate::traits::StorageGateway;

#[derive(Debug, Default)]
struct Tree {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, String>,
}

/// In-memory gateway for testing.
///
/// Models a directory tree under a pre-existing root with the same parent and
/// kind rules as a real filesystem: files can only be written into existing
/// directories, and a directory delete removes everything beneath it.
pub struct MemoryGateway {
    root: PathBuf,
    tree: RwLock<Tree>,
}

impl MemoryGateway {
    /// Create an empty tree rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        MemoryGateway {
            root: root.as_ref().to_path_buf(),
            tree: RwLock::new(Tree::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of files currently stored.
    pub fn file_count(&self) -> usize {
        self.tree.read().unwrap_or_else(|e| e.into_inner()).files.len()
    }

    /// Number of directories currently stored, not counting the root.
    pub fn dir_count(&self) -> usize {
        self.tree.read().unwrap_or_else(|e| e.into_inner()).dirs.len()
    }

    /// Overwrite a file behind the engine's back.
    pub fn tamper(&self, path: &Path, content: &str) {
        let mut tree = self.tree.write().unwrap_or_else(|e| e.into_inner());
        tree.files.insert(path.to_path_buf(), content.to_string());
    }

    /// The root and everything above it always exist.
    fn is_dir(&self, tree: &Tree, path: &Path) -> bool {
        self.root.starts_with(path) || tree.dirs.contains(path)
    }

    fn parent_must_exist(&self, tree: &Tree, path: &Path) -> Result<(), GatewayError> {
        match path.parent() {
            Some(parent) if self.is_dir(tree, parent) => Ok(()),
            Some(parent) => Err(GatewayError::NotFound(parent.to_path_buf())),
            None => Err(GatewayError::NotFound(path.to_path_buf())),
        }
    }
}

fn is_a_directory(path: &Path) -> GatewayError {
    GatewayError::Io {
        path: path.to_path_buf(),
        source: io::Error::other("is a directory"),
    }
}

impl StorageGateway for MemoryGateway {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn create_directory(&self, path: &Path) -> Result<(), GatewayError> {
        let mut tree = self.tree.write().unwrap_or_else(|e| e.into_inner());

        let missing: Vec<PathBuf> = path
            .ancestors()
            .take_while(|p| !self.is_dir(&tree, p))
            .map(Path::to_path_buf)
            .collect();

        if let Some(file) = missing.iter().find(|p| tree.files.contains_key(*p)) {
            return Err(GatewayError::AlreadyExists(file.clone()));
        }
        tree.dirs.extend(missing);
        Ok(())
    }

    fn delete_directory_recursive(&self, path: &Path) -> Result<(), GatewayError> {
        let mut tree = self.tree.write().unwrap_or_else(|e| e.into_inner());

        if !tree.dirs.contains(path) {
            return Err(GatewayError::NotFound(path.to_path_buf()));
        }
        tree.dirs.retain(|d| !d.starts_with(path));
        tree.files.retain(|f, _| !f.starts_with(path));
        Ok(())
    }

    fn write_text(&self, path: &Path, content: &str) -> Result<(), GatewayError> {
        let mut tree = self.tree.write().unwrap_or_else(|e| e.into_inner());

        self.parent_must_exist(&tree, path)?;
        if self.is_dir(&tree, path) {
            return Err(is_a_directory(path));
        }
        tree.files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn read_text(&self, path: &Path) -> Result<String, GatewayError> {
        let tree = self.tree.read().unwrap_or_else(|e| e.into_inner());

        if let Some(content) = tree.files.get(path) {
            return Ok(content.clone());
        }
        if self.is_dir(&tree, path) {
            return Err(is_a_directory(path));
        }
        Err(GatewayError::NotFound(path.to_path_buf()))
    }

    fn delete_file(&self, path: &Path) -> Result<(), GatewayError> {
        let mut tree = self.tree.write().unwrap_or_else(|e| e.into_inner());

        if tree.files.remove(path).is_some() {
            Ok(())
        } else if self.is_dir(&tree, path) {
            Err(is_a_directory(path))
        } else {
            Err(GatewayError::NotFound(path.to_path_buf()))
        }
    }

    fn exists(&self, path: &Path) -> Result<bool, GatewayError> {
        let tree = self.tree.read().unwrap_or_else(|e| e.into_inner());
        Ok(tree.files.contains_key(path) || self.is_dir(&tree, path))
    }

    fn is_directory(&self, path: &Path) -> Result<bool, GatewayError> {
        let tree = self.tree.read().unwrap_or_else(|e| e.into_inner());
        Ok(self.is_dir(&tree, path))
    }
}
