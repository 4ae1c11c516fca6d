use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::layout::Layout;

/// Directory names treated as directories when a managed path has no `kind`.
const KNOWN_DIRECTORIES: &[&str] = &[".claude"];

const DEFAULT_CREDENTIALS_FILE: &str = ".claude.json";

/// Whether a managed path holds a single file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    File,
    Directory,
}

/// A path under the home directory that is redirected into environment storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ManagedPathEntry")]
pub struct ManagedPath {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<PathKind>,
}

/// Accepts both `- .claude` and `- { path: .claude, kind: directory }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ManagedPathEntry {
    Bare(PathBuf),
    Detailed {
        path: PathBuf,
        #[serde(default)]
        kind: Option<PathKind>,
    },
}

impl From<ManagedPathEntry> for ManagedPath {
    fn from(entry: ManagedPathEntry) -> Self {
        match entry {
            ManagedPathEntry::Bare(path) => Self { path, kind: None },
            ManagedPathEntry::Detailed { path, kind } => Self { path, kind },
        }
    }
}

impl ManagedPath {
    pub fn new(path: impl Into<PathBuf>, kind: PathKind) -> Self {
        Self {
            path: path.into(),
            kind: Some(kind),
        }
    }

    /// Declared kind, or the naming convention when none was declared:
    /// no extension or a known directory name means a directory.
    pub fn kind(&self) -> PathKind {
        self.kind.unwrap_or_else(|| {
            let known = self
                .path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| KNOWN_DIRECTORIES.contains(&name));
            if known || self.path.extension().is_none() {
                PathKind::Directory
            } else {
                PathKind::File
            }
        })
    }

    fn is_contained(&self) -> bool {
        !self.path.as_os_str().is_empty()
            && self
                .path
                .components()
                .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
    }
}

/// `config.yaml` inside the tool root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Storage root holding one directory per environment. `~` and `$VARS` are expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<String>,
    /// Live credentials file inspected by `status`, relative to home unless absolute.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    /// Ordered; the first entry is the primary path used to detect the active environment.
    #[serde(default = "default_managed_paths")]
    pub managed_paths: Vec<ManagedPath>,
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from(DEFAULT_CREDENTIALS_FILE)
}

fn default_managed_paths() -> Vec<ManagedPath> {
    vec![
        ManagedPath::new(DEFAULT_CREDENTIALS_FILE, PathKind::File),
        ManagedPath::new(".claude", PathKind::Directory),
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            credentials_file: default_credentials_file(),
            managed_paths: default_managed_paths(),
        }
    }
}

impl AppConfig {
    /// Load the config, writing defaults when the file does not exist.
    ///
    /// A file that cannot be read or parsed degrades to defaults with a warning.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("No config file, creating default config at {:?}", path);
            let config = Self::default();
            if let Err(err) = config.save(path) {
                warn!("{err}");
            }
            return config;
        }

        match Self::read(path) {
            Ok(config) => config,
            Err(err) => {
                warn!("{err}; using default configuration");
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let load_error = |message: String| Error::ConfigLoad {
            path: path.to_path_buf(),
            message,
        };
        let contents = fs::read_to_string(path).map_err(|err| load_error(err.to_string()))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|err| load_error(err.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let write_error = |message: String| Error::ConfigLoad {
            path: path.to_path_buf(),
            message,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| write_error(err.to_string()))?;
        }
        let contents = serde_yaml::to_string(self).map_err(|err| write_error(err.to_string()))?;
        fs::write(path, contents).map_err(|err| write_error(err.to_string()))
    }

    /// Reject configurations the activation protocol cannot run with.
    pub fn validate(&self, path: &Path) -> Result<()> {
        if self.managed_paths.is_empty() {
            return Err(Error::EmptyManagedPaths {
                path: path.to_path_buf(),
            });
        }
        if let Some(bad) = self.managed_paths.iter().find(|entry| !entry.is_contained()) {
            return Err(Error::InvalidManagedPath {
                path: bad.path.clone(),
            });
        }
        Ok(())
    }

    /// First managed path; callers must have validated the config.
    pub fn primary(&self) -> &ManagedPath {
        &self.managed_paths[0]
    }

    pub fn storage_root(&self, layout: &Layout) -> PathBuf {
        match &self.base_dir {
            Some(raw) => absolutize(&expand(raw, layout.home()), layout.home()),
            None => layout.root().to_path_buf(),
        }
    }

    pub fn credentials_path(&self, layout: &Layout) -> PathBuf {
        absolutize(&self.credentials_file, layout.home())
    }
}

fn expand(raw: &str, home: &Path) -> PathBuf {
    let expanded = shellexpand::full_with_context(
        raw,
        || home.to_str(),
        |var| Ok::<_, std::env::VarError>(std::env::var(var).ok()),
    );
    match expanded {
        Ok(value) => PathBuf::from(value.into_owned()),
        Err(_) => PathBuf::from(raw),
    }
}

fn absolutize(path: &Path, home: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}
