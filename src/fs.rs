use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::PathKind;

/// What sits at a path, without following a final symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Missing,
    File,
    Dir,
    Symlink,
}

/// An entry found below a walked directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path relative to the walked root
    pub relative: PathBuf,
    pub kind: EntryKind,
}

/// Access to the home and storage trees.
///
/// Every operation the activation protocol performs goes through this trait so
/// the engines can run against a sandbox or a recording double.
pub trait HomeFs {
    /// `lstat` the path; a missing path is `Ok(EntryKind::Missing)`.
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind>;
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
    /// All entries below `root` (not including it), parents before children.
    /// Symlinks are reported, never followed.
    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>>;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    /// Remove a file or a symlink (never its target).
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    fn symlink(&self, target: &Path, link: &Path, kind: PathKind) -> io::Result<()>;

    fn is_symlink(&self, path: &Path) -> bool {
        matches!(self.entry_kind(path), Ok(EntryKind::Symlink))
    }

    /// True for anything present at the path, dangling symlinks included.
    fn exists(&self, path: &Path) -> bool {
        !matches!(self.entry_kind(path), Ok(EntryKind::Missing) | Err(_))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entry_kind(path), Ok(EntryKind::Dir))
    }
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

fn kind_of(file_type: fs::FileType) -> EntryKind {
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Dir
    } else {
        EntryKind::File
    }
}

impl HomeFs for LocalFs {
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        match fs::symlink_metadata(path) {
            Ok(metadata) => Ok(kind_of(metadata.file_type())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(EntryKind::Missing),
            Err(err) => Err(err),
        }
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?
                .to_path_buf();
            entries.push(WalkEntry {
                relative,
                kind: kind_of(entry.file_type()),
            });
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    #[cfg(unix)]
    fn symlink(&self, target: &Path, link: &Path, _kind: PathKind) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    fn symlink(&self, target: &Path, link: &Path, kind: PathKind) -> io::Result<()> {
        match kind {
            PathKind::File => std::os::windows::fs::symlink_file(target, link),
            PathKind::Directory => std::os::windows::fs::symlink_dir(target, link),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// `LocalFs` that records every mutating call.
    #[derive(Debug, Default)]
    pub struct RecordingFs {
        inner: LocalFs,
        log: RefCell<Vec<String>>,
    }

    impl RecordingFs {
        pub fn mutations(&self) -> Vec<String> {
            self.log.borrow().clone()
        }

        pub fn clear(&self) {
            self.log.borrow_mut().clear();
        }

        fn record(&self, op: &str, path: &Path) {
            self.log
                .borrow_mut()
                .push(format!("{op} {}", path.display()));
        }
    }

    impl HomeFs for RecordingFs {
        fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
            self.inner.entry_kind(path)
        }

        fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
            self.inner.read_link(path)
        }

        fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
            self.inner.canonicalize(path)
        }

        fn walk(&self, root: &Path) -> io::Result<Vec<WalkEntry>> {
            self.inner.walk(root)
        }

        fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.inner.read(path)
        }

        fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
            self.record("write", path);
            self.inner.write(path, contents)
        }

        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            self.record("mkdir", path);
            self.inner.create_dir_all(path)
        }

        fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
            self.record("copy", to);
            self.inner.copy_file(from, to)
        }

        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            self.record("rename", from);
            self.inner.rename(from, to)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            self.record("rm", path);
            self.inner.remove_file(path)
        }

        fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
            self.record("rmdir", path);
            self.inner.remove_dir_all(path)
        }

        fn symlink(&self, target: &Path, link: &Path, kind: PathKind) -> io::Result<()> {
            self.record("ln", link);
            self.inner.symlink(target, link, kind)
        }
    }
}
