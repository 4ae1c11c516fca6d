use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Overrides the tool root when set
pub const ROOT_ENV_VAR: &str = "CLAUDE_ENV_HOME";

const ROOT_DIR_NAME: &str = ".claude_env";
pub(crate) const CONFIG_FILE_NAME: &str = "config.yaml";
pub(crate) const STATE_FILE_NAME: &str = "env.yaml";
const LAUNCHER_NAME: &str = "claude_env";

/// Where claude_env keeps its own files, and whose home it manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    home: PathBuf,
    root: PathBuf,
}

impl Layout {
    /// Locate the home directory and tool root
    ///
    /// Root is `$CLAUDE_ENV_HOME` or `~/.claude_env` if not set
    pub fn discover() -> Result<Self> {
        let home = directories::BaseDirs::new()
            .context("Failed to get home directory")?
            .home_dir()
            .to_path_buf();

        let root = env::var_os(ROOT_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(ROOT_DIR_NAME));

        Ok(Self::new(home, root))
    }

    pub fn new(home: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            root: root.into(),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join(STATE_FILE_NAME)
    }

    /// Returns `$HOME/.local/bin`
    pub fn bin_dir(&self) -> PathBuf {
        self.home.join(".local/bin")
    }

    /// Global launcher installed by the setup script
    pub fn launcher_path(&self) -> PathBuf {
        self.bin_dir().join(LAUNCHER_NAME)
    }
}
