use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// `env.yaml`: the recorded environments and the last-activated hint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvState {
    /// Environment names in creation order
    #[serde(default)]
    pub environments: Vec<String>,
    /// Fallback for detecting the outgoing environment once its links are gone.
    /// Never consulted while a valid link exists.
    #[serde(default)]
    pub last_active_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl EnvState {
    /// Load the state file, creating an empty one when it does not exist.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("No state file, creating {:?}", path);
            let mut state = Self::default();
            if let Err(err) = state.save(path) {
                warn!("{err}");
            }
            return state;
        }

        let parsed = fs::read_to_string(path)
            .map_err(|err| err.to_string())
            .and_then(|contents| {
                if contents.trim().is_empty() {
                    Ok(Self::default())
                } else {
                    serde_yaml::from_str(&contents).map_err(|err| err.to_string())
                }
            });

        match parsed {
            Ok(state) => state,
            Err(message) => {
                let err = Error::ConfigLoad {
                    path: path.to_path_buf(),
                    message,
                };
                warn!("{err}; using empty state");
                Self::default()
            }
        }
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        let state_error = |message: String| Error::State {
            path: path.to_path_buf(),
            message,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| state_error(err.to_string()))?;
        }

        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
        let contents = serde_yaml::to_string(self).map_err(|err| state_error(err.to_string()))?;
        fs::write(path, contents).map_err(|err| state_error(err.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.environments.iter().any(|env| env == name)
    }

    pub fn add(&mut self, name: &str) {
        if !self.contains(name) {
            self.environments.push(name.to_string());
        }
    }

    /// Drop an environment, clearing the hint if it named it.
    pub fn remove(&mut self, name: &str) {
        self.environments.retain(|env| env != name);
        if self.last_active_env.as_deref() == Some(name) {
            self.last_active_env = None;
        }
    }

    /// Rename in place, keeping list order and the hint consistent.
    pub fn rename(&mut self, from: &str, to: &str) {
        for env in self.environments.iter_mut().filter(|env| env.as_str() == from) {
            *env = to.to_string();
        }
        if self.last_active_env.as_deref() == Some(from) {
            self.last_active_env = Some(to.to_string());
        }
    }
}
