use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::{ManagedPath, PathKind};
use crate::error::{Error, FsError, FsOp, Result};
use crate::fs::{EntryKind, HomeFs};
use crate::inspect::ActivationState;
use crate::layout::CONFIG_FILE_NAME;
use crate::reconcile::{self, ReconcileReport};
use crate::state::EnvState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Moving pre-existing configuration into a new environment (init)
    Adopt,
    /// Removing the outgoing links
    Unlink,
    /// Creating the target's storage slots
    Prepare,
    /// Creating the new links
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Moved { to: PathBuf },
    Unlinked,
    /// A real file or directory sat where a link was expected and was left in place
    SkippedUnmanaged,
    Linked {
        target: PathBuf,
        /// Whatever had to be removed from the link location first
        replaced: Option<EntryKind>,
    },
}

#[derive(Debug)]
pub struct StepRecord {
    pub phase: Phase,
    pub path: PathBuf,
    pub result: std::result::Result<StepAction, FsError>,
}

impl StepRecord {
    fn new(phase: Phase, path: &Path, result: std::result::Result<StepAction, FsError>) -> Self {
        match &result {
            Ok(action) => debug!("{:?} {:?}: {:?}", phase, path, action),
            Err(err) => warn!("{err}"),
        }
        Self {
            phase,
            path: path.to_path_buf(),
            result,
        }
    }
}

/// Everything one activation did, one record per path and phase.
#[derive(Debug)]
pub struct ActivationReport {
    pub target: String,
    pub outgoing: Option<String>,
    pub flush: ReconcileReport,
    pub steps: Vec<StepRecord>,
}

impl ActivationReport {
    pub fn failures(&self) -> impl Iterator<Item = &FsError> {
        self.flush.failures().chain(
            self.steps
                .iter()
                .filter_map(|step| step.result.as_ref().err()),
        )
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn linked(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.steps.iter().filter_map(|step| match &step.result {
            Ok(StepAction::Linked { target, .. }) => Some((step.path.as_path(), target.as_path())),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &Path> {
        self.steps.iter().filter_map(|step| match &step.result {
            Ok(StepAction::SkippedUnmanaged) => Some(step.path.as_path()),
            _ => None,
        })
    }
}

/// Redirects the managed paths in `home` to one environment's storage.
pub struct Activator<'a, F: HomeFs + ?Sized> {
    fs: &'a F,
    home: &'a Path,
    storage_root: &'a Path,
    managed_paths: &'a [ManagedPath],
}

impl<'a, F: HomeFs + ?Sized> Activator<'a, F> {
    /// The first of `managed_paths` is the primary path.
    pub fn new(
        fs: &'a F,
        home: &'a Path,
        storage_root: &'a Path,
        managed_paths: &'a [ManagedPath],
    ) -> Self {
        Self {
            fs,
            home,
            storage_root,
            managed_paths,
        }
    }

    /// Switch the home directory over to `target`.
    ///
    /// Only a missing storage directory or an unwritable state file fails the
    /// call; per-path problems are collected in the report.
    pub fn activate(
        &self,
        target: &str,
        state: &mut EnvState,
        state_path: &Path,
    ) -> Result<ActivationReport> {
        let env_dir = self.storage_root.join(target);
        if !self.fs.is_dir(&env_dir) {
            return Err(Error::EnvironmentNotFound { path: env_dir });
        }

        let primary = match self.managed_paths.first() {
            Some(managed) => self.home.join(&managed.path),
            None => {
                return Err(Error::EmptyManagedPaths {
                    path: state_path.with_file_name(CONFIG_FILE_NAME),
                })
            }
        };
        let outgoing = ActivationState::derive(
            self.fs,
            &primary,
            self.storage_root,
            state.last_active_env.as_deref(),
        )
        .outgoing()
        .map(str::to_string);

        let flush = match &outgoing {
            Some(env) if env != target && self.fs.is_dir(&self.storage_root.join(env)) => {
                reconcile::flush_outgoing(self.fs, env, self.managed_paths, self.home, self.storage_root)
            }
            _ => ReconcileReport::default(),
        };

        let mut steps = Vec::new();
        for managed in self.managed_paths {
            if let Some(step) = self.unlink(&self.home.join(&managed.path)) {
                steps.push(step);
            }
        }

        for managed in self.managed_paths {
            let slot = env_dir.join(&managed.path);
            let link = self.home.join(&managed.path);
            match self.prepare(&slot, managed.kind()) {
                Ok(()) => steps.push(self.link(&slot, &link, managed.kind())),
                Err(err) => steps.push(StepRecord::new(Phase::Prepare, &slot, Err(err))),
            }
        }

        state.last_active_env = Some(target.to_string());
        state.save(state_path)?;

        Ok(ActivationReport {
            target: target.to_string(),
            outgoing,
            flush,
            steps,
        })
    }

    fn unlink(&self, link: &Path) -> Option<StepRecord> {
        let result = match self.fs.entry_kind(link) {
            Ok(EntryKind::Missing) => return None,
            Ok(EntryKind::Symlink) => self
                .fs
                .remove_file(link)
                .map(|()| StepAction::Unlinked)
                .map_err(|err| FsError::new(FsOp::Remove, link, err)),
            Ok(EntryKind::File | EntryKind::Dir) => {
                warn!("{:?} is not a symlink, skipping removal", link);
                Ok(StepAction::SkippedUnmanaged)
            }
            Err(err) => Err(FsError::new(FsOp::Inspect, link, err)),
        };
        Some(StepRecord::new(Phase::Unlink, link, result))
    }

    /// Make sure the link will have something valid to resolve to.
    fn prepare(&self, slot: &Path, kind: PathKind) -> std::result::Result<(), FsError> {
        let dir = match kind {
            PathKind::Directory => Some(slot),
            PathKind::File => slot.parent(),
        };
        match dir {
            Some(dir) => self
                .fs
                .create_dir_all(dir)
                .map_err(|err| FsError::new(FsOp::CreateDir, dir, err)),
            None => Ok(()),
        }
    }

    fn link(&self, slot: &Path, link: &Path, kind: PathKind) -> StepRecord {
        StepRecord::new(Phase::Link, link, self.replace_with_link(slot, link, kind))
    }

    fn replace_with_link(
        &self,
        slot: &Path,
        link: &Path,
        kind: PathKind,
    ) -> std::result::Result<StepAction, FsError> {
        if let Some(parent) = link.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|err| FsError::new(FsOp::CreateDir, parent, err))?;
        }

        let existing = self
            .fs
            .entry_kind(link)
            .map_err(|err| FsError::new(FsOp::Inspect, link, err))?;
        let removed = match existing {
            EntryKind::Missing => Ok(()),
            EntryKind::Dir => self.fs.remove_dir_all(link),
            EntryKind::File | EntryKind::Symlink => self.fs.remove_file(link),
        };
        removed.map_err(|err| FsError::new(FsOp::Remove, link, err))?;

        self.fs
            .symlink(slot, link, kind)
            .map_err(|err| FsError::new(FsOp::Symlink, link, err))?;

        Ok(StepAction::Linked {
            target: slot.to_path_buf(),
            replaced: (existing != EntryKind::Missing).then_some(existing),
        })
    }
}
