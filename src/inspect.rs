use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::fs::{EntryKind, HomeFs};

const MAX_LINK_HOPS: usize = 40;

/// Which environment the home directory is wired to, derived on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationState {
    /// The primary path is a symlink resolving into this environment's storage.
    Active(String),
    /// No valid link. `hint` is the recorded `last_active_env`, if any.
    Disconnected { hint: Option<String> },
}

impl ActivationState {
    /// Compute the state from the primary link, consulting `hint` only when
    /// no valid link exists.
    pub fn derive<F: HomeFs + ?Sized>(
        fs: &F,
        primary: &Path,
        storage_root: &Path,
        hint: Option<&str>,
    ) -> Self {
        match resolve_active_environment(fs, primary, storage_root) {
            Some(name) => ActivationState::Active(name),
            None => ActivationState::Disconnected {
                hint: hint.map(str::to_string),
            },
        }
    }

    pub fn active(&self) -> Option<&str> {
        match self {
            ActivationState::Active(name) => Some(name),
            ActivationState::Disconnected { .. } => None,
        }
    }

    /// The environment whose live edits must be flushed before switching away.
    pub fn outgoing(&self) -> Option<&str> {
        match self {
            ActivationState::Active(name) => Some(name),
            ActivationState::Disconnected { hint } => hint.as_deref(),
        }
    }
}

/// Name of the environment `primary` links into, or `None` when `primary` is
/// not a symlink, cannot be resolved, or resolves outside `storage_root`.
pub fn resolve_active_environment<F: HomeFs + ?Sized>(
    fs: &F,
    primary: &Path,
    storage_root: &Path,
) -> Option<String> {
    if !fs.is_symlink(primary) {
        return None;
    }

    let resolved = match resolve_link(fs, primary) {
        Ok(path) => path,
        Err(err) => {
            debug!("Cannot resolve {:?}: {}", primary, err);
            return None;
        }
    };

    let root = fs
        .canonicalize(storage_root)
        .unwrap_or_else(|_| storage_root.to_path_buf());

    let relative = resolved.strip_prefix(&root).ok()?;
    match relative.components().next() {
        Some(Component::Normal(name)) => name.to_str().map(str::to_string),
        _ => None,
    }
}

/// Absolute real path a symlink points to.
///
/// The final target may be missing (a fresh environment whose file the client
/// has not written yet); its parent directory must exist.
fn resolve_link<F: HomeFs + ?Sized>(fs: &F, link: &Path) -> io::Result<PathBuf> {
    match fs.canonicalize(link) {
        Ok(path) => return Ok(path),
        Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
        Err(_) => {}
    }

    let mut current = link.to_path_buf();
    for _ in 0..MAX_LINK_HOPS {
        let target = fs.read_link(&current)?;
        let target = if target.is_absolute() {
            target
        } else {
            current
                .parent()
                .map(|parent| parent.join(&target))
                .unwrap_or(target)
        };

        match fs.entry_kind(&target)? {
            EntryKind::Symlink => current = target,
            EntryKind::Missing => {
                let not_found = || io::Error::from(io::ErrorKind::NotFound);
                let parent = target.parent().ok_or_else(not_found)?;
                let name = target.file_name().ok_or_else(not_found)?;
                return Ok(fs.canonicalize(parent)?.join(name));
            }
            EntryKind::File | EntryKind::Dir => return fs.canonicalize(&target),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::Other,
        "too many levels of symbolic links",
    ))
}
