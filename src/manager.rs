use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::activation::{ActivationReport, Activator, Phase, StepAction, StepRecord};
use crate::config::{AppConfig, PathKind};
use crate::credentials::{self, CredentialsSummary};
use crate::error::{Error, FsError, FsOp, Result};
use crate::fs::{EntryKind, HomeFs, LocalFs};
use crate::inspect::ActivationState;
use crate::layout::{Layout, CONFIG_FILE_NAME, STATE_FILE_NAME};
use crate::reconcile::{self, ReconcileReport};
use crate::state::EnvState;

const DEFAULT_ENV_NAME: &str = "default";

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._@+-]*$").expect("environment name pattern is valid")
});

/// The tool's own files share the default storage root with environments.
const RESERVED_NAMES: &[&str] = &[CONFIG_FILE_NAME, STATE_FILE_NAME];

/// Environment names double as directory names under the storage root.
pub fn validate_name(name: &str) -> Result<()> {
    if NAME_PATTERN.is_match(name) && !RESERVED_NAMES.contains(&name) {
        Ok(())
    } else {
        Err(Error::InvalidEnvironmentName(name.to_string()))
    }
}

#[derive(Debug)]
pub enum InitOutcome {
    /// Environments are already recorded
    AlreadyInitialized { environments: Vec<String> },
    /// No real primary file to adopt
    NoExistingConfig,
    Adopted {
        name: String,
        moved: Vec<StepRecord>,
        activation: ActivationReport,
    },
}

#[derive(Debug)]
pub enum SwitchOutcome {
    AlreadyActive(String),
    Switched(ActivationReport),
}

#[derive(Debug)]
pub struct RenameOutcome {
    pub from: String,
    pub to: String,
    pub activation: ActivationReport,
}

#[derive(Debug)]
pub enum RemoveOutcome {
    Removed { name: String, path: PathBuf },
    Cancelled,
}

#[derive(Debug)]
pub enum SaveOutcome {
    /// Every managed path is still linked; nothing was detached
    UpToDate(String),
    Saved {
        flush: ReconcileReport,
        activation: ActivationReport,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    ActiveReady,
    ActiveUnconfigured,
    Ready,
    Unconfigured,
}

#[derive(Debug, Clone)]
pub struct EnvironmentSummary {
    pub name: String,
    pub path: PathBuf,
    pub active: bool,
    pub credentials: CredentialsSummary,
}

impl EnvironmentSummary {
    pub fn readiness(&self) -> Readiness {
        match (self.active, self.credentials.valid) {
            (true, true) => Readiness::ActiveReady,
            (true, false) => Readiness::ActiveUnconfigured,
            (false, true) => Readiness::Ready,
            (false, false) => Readiness::Unconfigured,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusWarning {
    /// The primary path is a real file or directory, so edits are not being written through
    PrimaryDetached(PathBuf),
    /// Credentials exist at the live path but no environment owns them
    Unowned,
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub state: ActivationState,
    pub storage_root: PathBuf,
    pub primary: PathBuf,
    pub primary_kind: EntryKind,
    pub credentials_path: PathBuf,
    pub credentials: CredentialsSummary,
}

impl StatusReport {
    pub fn warning(&self) -> Option<StatusWarning> {
        if matches!(self.primary_kind, EntryKind::File | EntryKind::Dir) {
            return Some(StatusWarning::PrimaryDetached(self.primary.clone()));
        }
        if self.state.active().is_none() && self.credentials.auth != credentials::AuthKind::Unknown {
            return Some(StatusWarning::Unowned);
        }
        None
    }
}

#[derive(Debug, Clone)]
pub struct ApiKeyOutcome {
    pub env: String,
    pub path: PathBuf,
}

/// Lifecycle operations over the recorded environments.
pub struct EnvironmentManager<F: HomeFs = LocalFs> {
    fs: F,
    layout: Layout,
    config: AppConfig,
    state: EnvState,
    storage_root: PathBuf,
}

impl EnvironmentManager<LocalFs> {
    pub fn open(layout: Layout) -> Result<Self> {
        Self::with_fs(LocalFs, layout)
    }
}

impl<F: HomeFs> EnvironmentManager<F> {
    /// Load config and state for `layout`. Only an unusable managed path list
    /// is fatal.
    pub fn with_fs(fs: F, layout: Layout) -> Result<Self> {
        let config_path = layout.config_file();
        let config = AppConfig::load(&config_path);
        config.validate(&config_path)?;
        let state = EnvState::load(&layout.state_file());
        let storage_root = config.storage_root(&layout);
        debug!("Storage root: {:?}", storage_root);

        Ok(Self {
            fs,
            layout,
            config,
            state,
            storage_root,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &EnvState {
        &self.state
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn env_dir(&self, name: &str) -> PathBuf {
        self.storage_root.join(name)
    }

    fn primary_link(&self) -> PathBuf {
        self.layout.home().join(&self.config.primary().path)
    }

    pub fn activation_state(&self) -> ActivationState {
        ActivationState::derive(
            &self.fs,
            &self.primary_link(),
            &self.storage_root,
            self.state.last_active_env.as_deref(),
        )
    }

    /// Derived from the primary link on every call.
    pub fn active_environment(&self) -> Option<String> {
        self.activation_state().active().map(str::to_string)
    }

    fn activate(&mut self, name: &str) -> Result<ActivationReport> {
        let activator = Activator::new(
            &self.fs,
            self.layout.home(),
            &self.storage_root,
            &self.config.managed_paths,
        );
        activator.activate(name, &mut self.state, &self.layout.state_file())
    }

    fn save_state(&mut self) -> Result<()> {
        self.state.save(&self.layout.state_file())
    }

    /// Adopt an existing configuration as the first environment.
    pub fn init(&mut self) -> Result<InitOutcome> {
        if !self.state.environments.is_empty() {
            return Ok(InitOutcome::AlreadyInitialized {
                environments: self.state.environments.clone(),
            });
        }

        let primary = self.primary_link();
        let primary_kind = self
            .fs
            .entry_kind(&primary)
            .map_err(|err| FsError::new(FsOp::Inspect, &primary, err))?;
        if primary_kind != EntryKind::File {
            info!("No existing configuration at {:?}", primary);
            return Ok(InitOutcome::NoExistingConfig);
        }

        let name = CredentialsSummary::read(&self.fs, &primary)
            .email()
            .filter(|email| validate_name(email).is_ok())
            .unwrap_or(DEFAULT_ENV_NAME)
            .to_string();

        let env_dir = self.env_dir(&name);
        self.fs
            .create_dir_all(&env_dir)
            .map_err(|err| FsError::new(FsOp::CreateDir, &env_dir, err))?;

        let mut moved = Vec::new();
        for managed in &self.config.managed_paths {
            let source = self.layout.home().join(&managed.path);
            let destination = env_dir.join(&managed.path);
            let kind = match self.fs.entry_kind(&source) {
                Ok(EntryKind::File) => PathKind::File,
                Ok(EntryKind::Dir) => PathKind::Directory,
                Ok(EntryKind::Missing | EntryKind::Symlink) => continue,
                Err(err) => return Err(FsError::new(FsOp::Inspect, &source, err).into()),
            };
            // Activation replaces whatever is left at the source, so a failed
            // move must stop here
            move_path(&self.fs, &source, &destination, kind)?;
            moved.push(StepRecord {
                phase: Phase::Adopt,
                path: source,
                result: Ok(StepAction::Moved { to: destination }),
            });
        }

        self.state.add(&name);
        self.save_state()?;
        let activation = self.activate(&name)?;

        Ok(InitOutcome::Adopted {
            name,
            moved,
            activation,
        })
    }

    /// Create an empty environment and switch to it.
    pub fn add(&mut self, name: &str) -> Result<ActivationReport> {
        validate_name(name)?;
        if self.state.contains(name) {
            return Err(Error::DuplicateEnvironment(name.to_string()));
        }

        let env_dir = self.env_dir(name);
        self.fs
            .create_dir_all(&env_dir)
            .map_err(|err| FsError::new(FsOp::CreateDir, &env_dir, err))?;
        for managed in &self.config.managed_paths {
            let slot = env_dir.join(&managed.path);
            let dir = match managed.kind() {
                PathKind::Directory => Some(slot.as_path()),
                PathKind::File => slot.parent(),
            };
            if let Some(dir) = dir {
                if let Err(err) = self.fs.create_dir_all(dir) {
                    warn!("{}", FsError::new(FsOp::CreateDir, dir, err));
                }
            }
        }

        self.state.add(name);
        self.save_state()?;
        info!("Created environment '{}' at {:?}", name, env_dir);

        self.activate(name)
    }

    pub fn switch(&mut self, name: &str) -> Result<SwitchOutcome> {
        if !self.state.contains(name) {
            return Err(Error::UnknownEnvironment(name.to_string()));
        }
        if self.active_environment().as_deref() == Some(name) {
            return Ok(SwitchOutcome::AlreadyActive(name.to_string()));
        }
        self.activate(name).map(SwitchOutcome::Switched)
    }

    /// Rename the active environment, rolling back on failure.
    pub fn rename(&mut self, new_name: &str) -> Result<RenameOutcome> {
        let old_name = self.active_environment().ok_or(Error::NoActiveEnvironment)?;
        validate_name(new_name)?;
        let old_dir = self.env_dir(&old_name);
        let new_dir = self.env_dir(new_name);
        if self.state.contains(new_name) || self.fs.exists(&new_dir) {
            return Err(Error::DuplicateEnvironment(new_name.to_string()));
        }

        if let Err(err) = self.fs.rename(&old_dir, &new_dir) {
            return Err(Error::RenameFailed {
                cause: Box::new(FsError::new(FsOp::Move, &old_dir, err).into()),
                rolled_back: true,
            });
        }

        let previous = self.state.clone();
        self.state.rename(&old_name, new_name);
        let result = self.save_state().and_then(|()| self.activate(new_name));

        match result {
            Ok(activation) => Ok(RenameOutcome {
                from: old_name,
                to: new_name.to_string(),
                activation,
            }),
            Err(err) => {
                warn!("Rename to '{}' failed, rolling back: {}", new_name, err);
                let rolled_back = self.roll_back_rename(&new_dir, &old_dir, previous);
                Err(Error::RenameFailed {
                    cause: Box::new(err),
                    rolled_back,
                })
            }
        }
    }

    fn roll_back_rename(&mut self, new_dir: &Path, old_dir: &Path, previous: EnvState) -> bool {
        let moved_back = match self.fs.rename(new_dir, old_dir) {
            Ok(()) => true,
            Err(err) => {
                warn!("{}", FsError::new(FsOp::Move, new_dir, err));
                false
            }
        };

        self.state = previous;
        let restored = match self.save_state() {
            Ok(()) => true,
            Err(err) => {
                warn!("{err}");
                false
            }
        };

        moved_back && restored
    }

    /// Delete an inactive environment once `confirm` agrees.
    pub fn remove<C>(&mut self, name: &str, confirm: C) -> Result<RemoveOutcome>
    where
        C: FnOnce(&EnvironmentSummary) -> bool,
    {
        if !self.state.contains(name) {
            return Err(Error::UnknownEnvironment(name.to_string()));
        }
        if self.active_environment().as_deref() == Some(name) {
            return Err(Error::CannotRemoveActive(name.to_string()));
        }

        let summary = self.summary(name, false);
        if !confirm(&summary) {
            return Ok(RemoveOutcome::Cancelled);
        }

        if self.fs.exists(&summary.path) {
            self.fs
                .remove_dir_all(&summary.path)
                .map_err(|err| FsError::new(FsOp::Remove, &summary.path, err))?;
        }
        self.state.remove(name);
        self.save_state()?;

        Ok(RemoveOutcome::Removed {
            name: name.to_string(),
            path: summary.path,
        })
    }

    fn summary(&self, name: &str, active: bool) -> EnvironmentSummary {
        let path = self.env_dir(name);
        let credentials = CredentialsSummary::read(&self.fs, &path.join(&self.config.primary().path));
        EnvironmentSummary {
            name: name.to_string(),
            path,
            active,
            credentials,
        }
    }

    /// Recorded environments in creation order.
    pub fn list(&self) -> Vec<EnvironmentSummary> {
        let active = self.active_environment();
        self.state
            .environments
            .iter()
            .map(|name| self.summary(name, active.as_deref() == Some(name.as_str())))
            .collect()
    }

    pub fn status(&self) -> StatusReport {
        let primary = self.primary_link();
        let primary_kind = self.fs.entry_kind(&primary).unwrap_or(EntryKind::Missing);
        let credentials_path = self.config.credentials_path(&self.layout);
        let credentials = CredentialsSummary::read(&self.fs, &credentials_path);

        StatusReport {
            state: self.activation_state(),
            storage_root: self.storage_root.clone(),
            primary,
            primary_kind,
            credentials_path,
            credentials,
        }
    }

    /// Write detached live edits back into the current environment and relink.
    pub fn save(&mut self) -> Result<SaveOutcome> {
        let state = self.activation_state();
        let env = state
            .outgoing()
            .filter(|env| self.state.contains(env))
            .map(str::to_string)
            .ok_or(Error::NoActiveEnvironment)?;

        let all_linked = self
            .config
            .managed_paths
            .iter()
            .all(|managed| self.fs.is_symlink(&self.layout.home().join(&managed.path)));
        if state.active() == Some(env.as_str()) && all_linked {
            return Ok(SaveOutcome::UpToDate(env));
        }

        // Activation only flushes an environment it switches away from
        let flush = reconcile::flush_outgoing(
            &self.fs,
            &env,
            &self.config.managed_paths,
            self.layout.home(),
            &self.storage_root,
        );
        let activation = self.activate(&env)?;
        Ok(SaveOutcome::Saved { flush, activation })
    }

    /// Point the active environment at an API key instead of an OAuth login.
    pub fn set_api_key(&self, key: &str, endpoint: &str) -> Result<ApiKeyOutcome> {
        let env = self.active_environment().ok_or(Error::NoActiveEnvironment)?;
        let path = self.env_dir(&env).join(&self.config.primary().path);
        credentials::write_api_key(&self.fs, &path, key, endpoint)?;
        Ok(ApiKeyOutcome { env, path })
    }
}

/// Rename, falling back to copy-then-delete across filesystems.
fn move_path<F: HomeFs + ?Sized>(
    fs: &F,
    source: &Path,
    destination: &Path,
    kind: PathKind,
) -> std::result::Result<(), FsError> {
    if let Some(parent) = destination.parent() {
        fs.create_dir_all(parent)
            .map_err(|err| FsError::new(FsOp::CreateDir, parent, err))?;
    }
    match fs.rename(source, destination) {
        Ok(()) => return Ok(()),
        Err(err) => debug!("rename {:?} failed ({}), copying instead", source, err),
    }

    let removed = match kind {
        PathKind::File => {
            reconcile::copy_file_into(fs, source, destination)?;
            fs.remove_file(source)
        }
        PathKind::Directory => {
            reconcile::merge_tree(fs, source, destination)?;
            fs.remove_dir_all(source)
        }
    };
    removed.map_err(|err| FsError::new(FsOp::Remove, source, err))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::fs::testing::RecordingFs;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    struct Sandbox {
        _temp: TempDir,
        home: PathBuf,
        layout: Layout,
    }

    impl Sandbox {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let home = temp.path().join("home");
            fs::create_dir_all(&home).unwrap();
            let layout = Layout::new(&home, home.join(".claude_env"));
            Self {
                _temp: temp,
                home,
                layout,
            }
        }

        fn manager(&self) -> EnvironmentManager {
            EnvironmentManager::open(self.layout.clone()).unwrap()
        }

        fn recording_manager(&self) -> EnvironmentManager<RecordingFs> {
            EnvironmentManager::with_fs(RecordingFs::default(), self.layout.clone()).unwrap()
        }
    }

    #[rstest]
    #[case("work", true)]
    #[case("dev@example.com", true)]
    #[case("team+1.v2_x", true)]
    #[case("", false)]
    #[case(".hidden", false)]
    #[case("../escape", false)]
    #[case("a/b", false)]
    #[case("with space", false)]
    #[case("config.yaml", false)]
    #[case("env.yaml", false)]
    fn test_validate_name(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(validate_name(name).is_ok(), ok);
    }

    #[test]
    fn test_add_makes_environment_active() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();

        manager.add("work").unwrap();

        assert_eq!(manager.active_environment().as_deref(), Some("work"));
        assert!(manager.env_dir("work").join(".claude").is_dir());
        assert_eq!(manager.state().environments, vec!["work"]);
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("work").unwrap();

        let err = manager.add("work").unwrap_err();

        assert!(matches!(err, Error::DuplicateEnvironment(name) if name == "work"));
        assert_eq!(manager.state().environments.len(), 1);
    }

    #[test]
    fn test_remove_active_is_refused_and_keeps_storage() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("work").unwrap();

        let err = manager.remove("work", |_| true).unwrap_err();

        assert!(matches!(err, Error::CannotRemoveActive(_)));
        assert!(manager.env_dir("work").is_dir());
        assert!(manager.state().contains("work"));
    }

    #[test]
    fn test_remove_inactive_deletes_storage() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("old").unwrap();
        manager.add("work").unwrap();

        let outcome = manager.remove("old", |summary| summary.name == "old").unwrap();

        assert!(matches!(outcome, RemoveOutcome::Removed { .. }));
        assert!(!manager.env_dir("old").exists());
        assert_eq!(manager.state().environments, vec!["work"]);
    }

    #[test]
    fn test_remove_cancelled_changes_nothing() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("old").unwrap();
        manager.add("work").unwrap();

        let outcome = manager.remove("old", |_| false).unwrap();

        assert!(matches!(outcome, RemoveOutcome::Cancelled));
        assert!(manager.env_dir("old").is_dir());
        assert!(manager.state().contains("old"));
    }

    #[test]
    fn test_switch_to_active_environment_touches_nothing() {
        let sb = Sandbox::new();
        let mut manager = sb.recording_manager();
        manager.add("work").unwrap();
        manager.fs.clear();
        // State is written through std::fs, which the recorder cannot see
        let state_before = fs::read_to_string(sb.layout.state_file()).unwrap();

        let outcome = manager.switch("work").unwrap();

        assert!(matches!(outcome, SwitchOutcome::AlreadyActive(_)));
        assert!(manager.fs.mutations().is_empty());
        assert_eq!(
            fs::read_to_string(sb.layout.state_file()).unwrap(),
            state_before
        );
    }

    #[test]
    fn test_switch_to_unknown_environment() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();

        let err = manager.switch("ghost").unwrap_err();
        assert!(matches!(err, Error::UnknownEnvironment(_)));
    }

    #[test]
    fn test_edits_survive_switching_away_and_back() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("personal").unwrap();
        fs::write(sb.home.join(".claude.json"), r#"{"userID":"personal"}"#).unwrap();
        manager.add("work").unwrap();
        fs::write(sb.home.join(".claude.json"), r#"{"userID":"work"}"#).unwrap();

        manager.switch("personal").unwrap();
        assert_eq!(
            fs::read_to_string(sb.home.join(".claude.json")).unwrap(),
            r#"{"userID":"personal"}"#
        );

        manager.switch("work").unwrap();
        assert_eq!(
            fs::read_to_string(sb.home.join(".claude.json")).unwrap(),
            r#"{"userID":"work"}"#
        );
    }

    #[test]
    fn test_switch_keeps_edits_made_after_link_was_replaced() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("personal").unwrap();
        manager.add("work").unwrap();
        // The client rewrote the file atomically, replacing the link
        fs::remove_file(sb.home.join(".claude.json")).unwrap();
        fs::write(sb.home.join(".claude.json"), r#"{"userID":"w"}"#).unwrap();

        manager.switch("personal").unwrap();

        assert_eq!(
            fs::read_to_string(manager.env_dir("work").join(".claude.json")).unwrap(),
            r#"{"userID":"w"}"#
        );
    }

    #[test]
    fn test_init_without_primary_file() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();

        let outcome = manager.init().unwrap();

        assert!(matches!(outcome, InitOutcome::NoExistingConfig));
        assert!(manager.state().environments.is_empty());
    }

    #[test]
    fn test_init_adopts_existing_configuration_under_email() {
        let sb = Sandbox::new();
        fs::write(
            sb.home.join(".claude.json"),
            r#"{"userID":"abc","user":{"email":"dev@example.com"}}"#,
        )
        .unwrap();
        fs::create_dir_all(sb.home.join(".claude")).unwrap();
        fs::write(sb.home.join(".claude/settings.json"), "{}").unwrap();
        let mut manager = sb.manager();

        let outcome = manager.init().unwrap();

        let InitOutcome::Adopted { name, moved, .. } = outcome else {
            panic!("expected adoption");
        };
        assert_eq!(name, "dev@example.com");
        assert_eq!(moved.len(), 2);
        assert_eq!(manager.active_environment().as_deref(), Some("dev@example.com"));
        assert!(manager
            .env_dir("dev@example.com")
            .join(".claude/settings.json")
            .is_file());
        assert!(fs::symlink_metadata(sb.home.join(".claude"))
            .unwrap()
            .file_type()
            .is_symlink());
    }

    #[test]
    fn test_init_without_email_uses_default_name() {
        let sb = Sandbox::new();
        fs::write(sb.home.join(".claude.json"), r#"{"userID":"abc"}"#).unwrap();
        let mut manager = sb.manager();

        let outcome = manager.init().unwrap();

        assert!(matches!(outcome, InitOutcome::Adopted { ref name, .. } if name == "default"));
    }

    #[test]
    fn test_init_twice_reports_existing_environments() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("work").unwrap();

        let outcome = manager.init().unwrap();

        assert!(matches!(outcome, InitOutcome::AlreadyInitialized { environments } if environments == vec!["work"]));
    }

    #[test]
    fn test_rename_active_environment() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("first").unwrap();
        manager.add("work").unwrap();
        fs::write(sb.home.join(".claude.json"), r#"{"userID":"w"}"#).unwrap();

        let outcome = manager.rename("job").unwrap();

        assert_eq!(outcome.from, "work");
        assert_eq!(manager.state().environments, vec!["first", "job"]);
        assert_eq!(manager.active_environment().as_deref(), Some("job"));
        assert!(!manager.env_dir("work").exists());
        assert_eq!(
            fs::read_to_string(sb.home.join(".claude.json")).unwrap(),
            r#"{"userID":"w"}"#
        );
    }

    #[test]
    fn test_rename_onto_existing_name_is_rejected() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("first").unwrap();
        manager.add("work").unwrap();

        let err = manager.rename("first").unwrap_err();

        assert!(matches!(err, Error::DuplicateEnvironment(_)));
        assert_eq!(manager.active_environment().as_deref(), Some("work"));
    }

    #[test]
    fn test_rename_rolls_back_when_state_cannot_be_written() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("work").unwrap();
        let state_file = sb.layout.state_file();
        fs::remove_file(&state_file).unwrap();
        fs::create_dir_all(&state_file).unwrap();

        let err = manager.rename("job").unwrap_err();

        // The directory moves back, but the state file still cannot be written
        assert!(matches!(
            err,
            Error::RenameFailed {
                rolled_back: false,
                ..
            }
        ));
        assert!(manager.env_dir("work").is_dir());
        assert!(!manager.env_dir("job").exists());
        assert_eq!(manager.state().environments, vec!["work"]);
        assert_eq!(manager.state().last_active_env.as_deref(), Some("work"));
    }

    #[test]
    fn test_rename_without_active_environment() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();

        assert!(matches!(
            manager.rename("job").unwrap_err(),
            Error::NoActiveEnvironment
        ));
    }

    #[test]
    fn test_list_marks_active_and_reads_credentials() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("personal").unwrap();
        fs::write(
            sb.home.join(".claude.json"),
            r#"{"userID":"abc","user":{"email":"me@example.com"}}"#,
        )
        .unwrap();
        manager.add("work").unwrap();

        let list = manager.list();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "personal");
        assert_eq!(list[0].readiness(), Readiness::Ready);
        assert_eq!(list[0].credentials.email(), Some("me@example.com"));
        assert_eq!(list[1].readiness(), Readiness::ActiveUnconfigured);
    }

    #[test]
    fn test_status_warns_about_detached_primary() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("work").unwrap();
        fs::remove_file(sb.home.join(".claude.json")).unwrap();
        fs::write(sb.home.join(".claude.json"), r#"{"userID":"abc"}"#).unwrap();

        let report = manager.status();

        assert_eq!(report.state.active(), None);
        assert_eq!(report.state.outgoing(), Some("work"));
        assert_eq!(
            report.warning(),
            Some(StatusWarning::PrimaryDetached(sb.home.join(".claude.json")))
        );
    }

    #[test]
    fn test_save_relinks_detached_paths() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("work").unwrap();
        assert!(matches!(manager.save().unwrap(), SaveOutcome::UpToDate(_)));

        fs::remove_file(sb.home.join(".claude.json")).unwrap();
        fs::write(sb.home.join(".claude.json"), r#"{"userID":"abc"}"#).unwrap();

        let outcome = manager.save().unwrap();

        assert!(matches!(&outcome, SaveOutcome::Saved { flush, .. } if flush.flushed().count() == 1));
        assert_eq!(manager.active_environment().as_deref(), Some("work"));
        assert_eq!(
            fs::read_to_string(manager.env_dir("work").join(".claude.json")).unwrap(),
            r#"{"userID":"abc"}"#
        );
    }

    #[test]
    fn test_save_without_any_environment() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();

        assert!(matches!(
            manager.save().unwrap_err(),
            Error::NoActiveEnvironment
        ));
    }

    #[test]
    fn test_set_api_key_writes_into_active_environment() {
        let sb = Sandbox::new();
        let mut manager = sb.manager();
        manager.add("work").unwrap();

        let outcome = manager
            .set_api_key("sk-ant-0123456789", "https://api.example.com")
            .unwrap();

        assert_eq!(outcome.env, "work");
        let summary = CredentialsSummary::read(&LocalFs, &sb.home.join(".claude.json"));
        assert_eq!(summary.auth, credentials::AuthKind::ApiKey);
        assert!(summary.valid);
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let sb = Sandbox::new();
        fs::create_dir_all(sb.layout.root()).unwrap();
        fs::write(sb.layout.config_file(), "managed_paths: []\n").unwrap();

        let err = EnvironmentManager::open(sb.layout.clone()).err().unwrap();

        assert!(matches!(err, Error::EmptyManagedPaths { .. }));
    }
}
