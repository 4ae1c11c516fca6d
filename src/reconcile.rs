use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{ManagedPath, PathKind};
use crate::error::{FsError, FsOp};
use crate::fs::{EntryKind, HomeFs};

/// How a detached managed path was written back into storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushAction {
    /// A plain file copied over the stored one
    CopiedFile,
    /// A directory merged into the stored tree; counts files and links written
    MergedDir { entries: usize },
}

#[derive(Debug)]
pub struct FlushRecord {
    /// Live path in the home directory
    pub source: PathBuf,
    /// Slot inside the environment's storage
    pub destination: PathBuf,
    pub result: Result<FlushAction, FsError>,
}

/// Outcome of writing one environment's detached paths back into storage.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub records: Vec<FlushRecord>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn flushed(&self) -> impl Iterator<Item = &FlushRecord> {
        self.records.iter().filter(|record| record.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FsError> {
        self.records
            .iter()
            .filter_map(|record| record.result.as_ref().err())
    }
}

/// Copy every managed path that is no longer a symlink back into
/// `storage_root/env`, so live edits survive the switch.
///
/// Symlinked and missing paths are left alone. A failure on one path is
/// recorded and the remaining paths are still processed.
pub fn flush_outgoing<F: HomeFs + ?Sized>(
    fs: &F,
    env: &str,
    managed_paths: &[ManagedPath],
    home: &Path,
    storage_root: &Path,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let env_dir = storage_root.join(env);

    for managed in managed_paths {
        let source = home.join(&managed.path);
        let destination = env_dir.join(&managed.path);

        let result = match fs.entry_kind(&source) {
            Ok(EntryKind::File) => {
                copy_file_into(fs, &source, &destination).map(|()| FlushAction::CopiedFile)
            }
            Ok(EntryKind::Dir) => merge_tree(fs, &source, &destination)
                .map(|entries| FlushAction::MergedDir { entries }),
            Ok(EntryKind::Symlink | EntryKind::Missing) => continue,
            Err(err) => Err(FsError::new(FsOp::Inspect, &source, err)),
        };

        match &result {
            Ok(action) => debug!("Flushed {:?} -> {:?} ({:?})", source, destination, action),
            Err(err) => warn!("Could not save {:?} into '{}': {}", source, env, err),
        }

        report.records.push(FlushRecord {
            source,
            destination,
            result,
        });
    }

    report
}

/// Byte-for-byte copy, replacing whatever file or link sits at `to`.
pub(crate) fn copy_file_into<F: HomeFs + ?Sized>(
    fs: &F,
    from: &Path,
    to: &Path,
) -> Result<(), FsError> {
    if let Some(parent) = to.parent() {
        fs.create_dir_all(parent)
            .map_err(|err| FsError::new(FsOp::CreateDir, parent, err))?;
    }
    // Copying onto a symlink would write through it
    if fs.is_symlink(to) {
        fs.remove_file(to)
            .map_err(|err| FsError::new(FsOp::Remove, to, err))?;
    }
    fs.copy_file(from, to)
        .map_err(|err| FsError::new(FsOp::Copy, to, err))
}

/// Merge `from` into `to`: entries only present in `to` are kept, entries
/// present in both are overwritten from `from`.
pub(crate) fn merge_tree<F: HomeFs + ?Sized>(
    fs: &F,
    from: &Path,
    to: &Path,
) -> Result<usize, FsError> {
    fs.create_dir_all(to)
        .map_err(|err| FsError::new(FsOp::CreateDir, to, err))?;

    let entries = fs
        .walk(from)
        .map_err(|err| FsError::new(FsOp::Read, from, err))?;

    let mut written = 0;
    for entry in entries {
        let source = from.join(&entry.relative);
        let destination = to.join(&entry.relative);

        match entry.kind {
            EntryKind::Dir => {
                fs.create_dir_all(&destination)
                    .map_err(|err| FsError::new(FsOp::CreateDir, &destination, err))?;
            }
            EntryKind::File => {
                copy_file_into(fs, &source, &destination)?;
                written += 1;
            }
            EntryKind::Symlink => {
                let target = fs
                    .read_link(&source)
                    .map_err(|err| FsError::new(FsOp::Read, &source, err))?;
                match fs.entry_kind(&destination) {
                    Ok(EntryKind::Missing) => {}
                    Ok(EntryKind::Dir) => fs
                        .remove_dir_all(&destination)
                        .map_err(|err| FsError::new(FsOp::Remove, &destination, err))?,
                    Ok(EntryKind::File | EntryKind::Symlink) => fs
                        .remove_file(&destination)
                        .map_err(|err| FsError::new(FsOp::Remove, &destination, err))?,
                    Err(err) => return Err(FsError::new(FsOp::Inspect, &destination, err)),
                }
                fs.symlink(&target, &destination, PathKind::File)
                    .map_err(|err| FsError::new(FsOp::Symlink, &destination, err))?;
                written += 1;
            }
            EntryKind::Missing => {}
        }
    }

    Ok(written)
}
