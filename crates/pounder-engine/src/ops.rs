//! The nine randomized operations.
//!
//! Every operation takes the engine state and the gateway explicitly. None of
//! them returns an error: gateway failures and content mismatches are turned
//! into [`Anomaly`] entries on the collector and the run carries on.

use std::fmt;
use std::path::{Path, PathBuf};

use pounder_config::GateConfig;
use pounder_gateway::StorageGateway;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, trace};

use crate::content::{random_content, random_directory_name, random_file_name};
use crate::engine::EngineState;
use crate::stats::Anomaly;

/// One entry of the operation catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    MakeDirectory,
    WriteRandomFile,
    ReadRandomFile,
    DeleteRandomFile,
    ReadRecentFile,
    WriteThenDelete,
    OverwriteRandomFile,
    PopDirectory,
    DeleteDirectory,
}

impl OpKind {
    pub const ALL: [OpKind; 9] = [
        OpKind::MakeDirectory,
        OpKind::WriteRandomFile,
        OpKind::ReadRandomFile,
        OpKind::DeleteRandomFile,
        OpKind::ReadRecentFile,
        OpKind::WriteThenDelete,
        OpKind::OverwriteRandomFile,
        OpKind::PopDirectory,
        OpKind::DeleteDirectory,
    ];

    /// Uniform pick over the catalog.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> OpKind {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::MakeDirectory => "make directory",
            OpKind::WriteRandomFile => "write random file",
            OpKind::ReadRandomFile => "read random file",
            OpKind::DeleteRandomFile => "delete random file",
            OpKind::ReadRecentFile => "read recent file",
            OpKind::WriteThenDelete => "write then delete",
            OpKind::OverwriteRandomFile => "overwrite random file",
            OpKind::PopDirectory => "pop directory",
            OpKind::DeleteDirectory => "delete directory",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run one catalog entry against the state.
pub fn dispatch(kind: OpKind, state: &mut EngineState, gateway: &dyn StorageGateway) {
    trace!(op = %kind, "dispatch");
    match kind {
        OpKind::MakeDirectory => make_directory(state, gateway),
        OpKind::WriteRandomFile => {
            write_random_file(state, gateway, kind);
        }
        OpKind::ReadRandomFile => read_random_file(state, gateway),
        OpKind::DeleteRandomFile => delete_random_file(state, gateway),
        OpKind::ReadRecentFile => read_recent_file(state, gateway),
        OpKind::WriteThenDelete => write_then_delete(state, gateway),
        OpKind::OverwriteRandomFile => overwrite_random_file(state, gateway),
        OpKind::PopDirectory => pop_directory(state),
        OpKind::DeleteDirectory => delete_directory(state, gateway),
    }
}

/// Proceed when a draw in `0..10` falls below `threshold`.
fn gate<R: Rng + ?Sized>(rng: &mut R, threshold: u32) -> bool {
    rng.gen_range(0..GateConfig::DRAW_RANGE) < threshold
}

/// Create a new directory under the cursor and move the cursor into it.
pub fn make_directory(state: &mut EngineState, gateway: &dyn StorageGateway) {
    let path = state
        .shadow
        .current_path()
        .join(random_directory_name(&mut state.rng));

    state.collector.stats.directories_made += 1;
    match gateway.create_directory(&path) {
        Ok(()) => {
            debug!(path = %path.display(), "directory created");
            state.shadow.record_directory_created(path.clone());
            state.shadow.enter_directory(&path);
        }
        Err(e) => state
            .collector
            .record(Anomaly::operation_failed(OpKind::MakeDirectory, &path, &e)),
    }
}

/// Write a freshly named file under the cursor. Returns the path if the write
/// succeeded.
pub fn write_random_file(
    state: &mut EngineState,
    gateway: &dyn StorageGateway,
    op: OpKind,
) -> Option<PathBuf> {
    let path = state
        .shadow
        .current_path()
        .join(random_file_name(&mut state.rng));
    write_file_at(state, gateway, path, op)
}

/// Write random content to `path`, record it, then read it straight back.
pub fn write_file_at(
    state: &mut EngineState,
    gateway: &dyn StorageGateway,
    path: PathBuf,
    op: OpKind,
) -> Option<PathBuf> {
    let content = random_content(&mut state.rng, &state.content);
    let overwrite = state.shadow.contains_file(&path);

    state.collector.stats.files_written += 1;
    if overwrite {
        state.collector.stats.files_overwritten += 1;
    }

    if let Err(e) = gateway.write_text(&path, &content) {
        state
            .collector
            .record(Anomaly::write_failed(op, &path, overwrite, &e));
        return None;
    }

    debug!(path = %path.display(), bytes = content.len(), overwrite, "file written");
    state.shadow.record_file_written(path.clone(), content);
    read_and_verify(state, gateway, &path, op);
    Some(path)
}

/// Read `path` and compare against the shadow model.
pub fn read_and_verify(
    state: &mut EngineState,
    gateway: &dyn StorageGateway,
    path: &Path,
    op: OpKind,
) {
    state.collector.stats.files_read += 1;
    let actual = match gateway.read_text(path) {
        Ok(content) => content,
        Err(e) => {
            state
                .collector
                .record(Anomaly::operation_failed(op, path, &e));
            return;
        }
    };

    let Some(expected) = state.shadow.content_of(path) else {
        return;
    };
    if actual != expected {
        let anomaly = Anomaly::ContentMismatch {
            op,
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        };
        state.collector.record(anomaly);
    }
}

pub fn read_random_file(state: &mut EngineState, gateway: &dyn StorageGateway) {
    if let Some(path) = state.shadow.pick_random_file(&mut state.rng) {
        read_and_verify(state, gateway, &path, OpKind::ReadRandomFile);
    }
}

pub fn delete_random_file(state: &mut EngineState, gateway: &dyn StorageGateway) {
    if !state.shadow.has_files() {
        return;
    }
    if !gate(&mut state.rng, state.gates.delete_file) {
        return;
    }
    if let Some(path) = state.shadow.pick_random_file(&mut state.rng) {
        delete_file(state, gateway, &path, OpKind::DeleteRandomFile);
    }
}

fn delete_file(state: &mut EngineState, gateway: &dyn StorageGateway, path: &Path, op: OpKind) {
    state.collector.stats.files_deleted += 1;
    match gateway.delete_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "file deleted");
            state.shadow.record_file_deleted(path);
        }
        Err(e) => state.collector.record(Anomaly::operation_failed(op, path, &e)),
    }
}

pub fn read_recent_file(state: &mut EngineState, gateway: &dyn StorageGateway) {
    if let Some(path) = state.shadow.pick_random_recent_file(&mut state.rng) {
        read_and_verify(state, gateway, &path, OpKind::ReadRecentFile);
    }
}

/// A full random write followed by deleting the same file.
pub fn write_then_delete(state: &mut EngineState, gateway: &dyn StorageGateway) {
    if let Some(path) = write_random_file(state, gateway, OpKind::WriteThenDelete) {
        delete_file(state, gateway, &path, OpKind::WriteThenDelete);
    }
}

pub fn overwrite_random_file(state: &mut EngineState, gateway: &dyn StorageGateway) {
    if let Some(path) = state.shadow.pick_random_file(&mut state.rng) {
        write_file_at(state, gateway, path, OpKind::OverwriteRandomFile);
    }
}

/// Move the cursor up one level. Touches no storage.
pub fn pop_directory(state: &mut EngineState) {
    if state.shadow.is_at_root() {
        return;
    }
    if !gate(&mut state.rng, state.gates.pop_directory) {
        return;
    }
    state.shadow.pop_directory();
}

/// Recursively delete a known directory and everything recorded under it.
pub fn delete_directory(state: &mut EngineState, gateway: &dyn StorageGateway) {
    if !state.shadow.has_directories() {
        return;
    }
    if !gate(&mut state.rng, state.gates.delete_directory) {
        return;
    }
    let Some(path) = state.shadow.pick_random_directory(&mut state.rng) else {
        return;
    };

    state.collector.stats.directories_deleted += 1;
    match gateway.delete_directory_recursive(&path) {
        Ok(()) => {
            debug!(path = %path.display(), "directory deleted");
            state.shadow.record_directory_deleted(&path);
        }
        Err(e) => state.collector.record(Anomaly::operation_failed(
            OpKind::DeleteDirectory,
            &path,
            &e,
        )),
    }
}
