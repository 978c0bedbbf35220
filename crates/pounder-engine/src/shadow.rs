use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use rand::Rng;

/// Ground truth for what the engine believes is on disk.
///
/// Every recorded file was written by the engine and not deleted since, and
/// its content is exactly the last successful write. Pure bookkeeping: no
/// method here touches storage or can fail.
#[derive(Debug, Clone)]
pub struct ShadowModel {
    root: PathBuf,
    /// Directory new files and directories are created under.
    current: PathBuf,
    files: IndexMap<PathBuf, String>,
    /// Directories created by the engine. Never contains the root.
    directories: IndexSet<PathBuf>,
    /// Most recently written paths, oldest first. May repeat a path.
    recent: VecDeque<PathBuf>,
    recent_capacity: usize,
}

impl ShadowModel {
    /// Default size of the recency window.
    pub const RECENT_CAPACITY: usize = 9;

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_recent_capacity(root, Self::RECENT_CAPACITY)
    }

    pub fn with_recent_capacity(root: impl Into<PathBuf>, recent_capacity: usize) -> Self {
        let root = root.into();
        ShadowModel {
            current: root.clone(),
            root,
            files: IndexMap::new(),
            directories: IndexSet::new(),
            recent: VecDeque::with_capacity(recent_capacity + 1),
            recent_capacity: recent_capacity.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current_path(&self) -> &Path {
        &self.current
    }

    pub fn is_at_root(&self) -> bool {
        self.current == self.root
    }

    /// Make a recorded directory the creation cursor. Unknown paths are ignored.
    pub fn enter_directory(&mut self, path: &Path) {
        if path == self.root || self.directories.contains(path) {
            self.current = path.to_path_buf();
        }
    }

    /// Move the cursor to its parent. Returns false when already at the root.
    pub fn pop_directory(&mut self) -> bool {
        if self.is_at_root() {
            return false;
        }
        match self.current.parent() {
            Some(parent) if parent.starts_with(&self.root) => {
                self.current = parent.to_path_buf();
            }
            _ => self.current = self.root.clone(),
        }
        true
    }

    pub fn record_directory_created(&mut self, path: PathBuf) {
        if path != self.root {
            self.directories.insert(path);
        }
    }

    /// Forget a directory and everything beneath it.
    ///
    /// Matching is by path component, so deleting `d/abc` leaves `d/abcd` alone.
    /// Resets the cursor to the root if it was inside the deleted tree.
    pub fn record_directory_deleted(&mut self, path: &Path) {
        self.directories.retain(|d| !d.starts_with(path));
        self.files.retain(|f, _| !f.starts_with(path));
        self.recent.retain(|r| !r.starts_with(path));
        if self.current.starts_with(path) {
            self.current = self.root.clone();
        }
    }

    /// Upsert a file's content and push it onto the recency window.
    ///
    /// Returns true if the path was already recorded (an overwrite).
    pub fn record_file_written(&mut self, path: PathBuf, content: String) -> bool {
        self.recent.push_back(path.clone());
        while self.recent.len() > self.recent_capacity {
            self.recent.pop_front();
        }
        self.files.insert(path, content).is_some()
    }

    pub fn record_file_deleted(&mut self, path: &Path) {
        self.files.swap_remove(path);
        self.recent.retain(|r| r != path);
    }

    pub fn contains_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn contains_directory(&self, path: &Path) -> bool {
        self.directories.contains(path)
    }

    /// Recorded content of a file, if the engine believes it exists.
    pub fn content_of(&self, path: &Path) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn pick_random_file<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<PathBuf> {
        if self.files.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.files.len());
        self.files.get_index(idx).map(|(path, _)| path.clone())
    }

    pub fn pick_random_directory<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<PathBuf> {
        if self.directories.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.directories.len());
        self.directories.get_index(idx).cloned()
    }

    pub fn pick_random_recent_file<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<PathBuf> {
        if self.recent.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.recent.len());
        self.recent.get(idx).cloned()
    }

    pub fn files(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().map(|(p, c)| (p.as_path(), c.as_str()))
    }

    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        self.directories.iter().map(PathBuf::as_path)
    }

    pub fn recent(&self) -> impl Iterator<Item = &Path> {
        self.recent.iter().map(PathBuf::as_path)
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    pub fn recent_capacity(&self) -> usize {
        self.recent_capacity
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn has_directories(&self) -> bool {
        !self.directories.is_empty()
    }
}
