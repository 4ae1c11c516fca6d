// Public API
pub mod cli;
pub mod commands;
pub mod ui;

// Core domain types
mod activation;
mod config;
mod credentials;
mod error;
mod fs;
mod inspect;
mod layout;
mod manager;
mod reconcile;
mod state;

// Re-export main types
pub use activation::{ActivationReport, Activator, Phase, StepAction, StepRecord};
pub use config::{AppConfig, ManagedPath, PathKind};
pub use credentials::{mask_api_key, write_api_key, AuthKind, CredentialsSummary, Identity};
pub use error::{Error, FsError, FsOp, Result};
pub use fs::{EntryKind, HomeFs, LocalFs, WalkEntry};
pub use inspect::{resolve_active_environment, ActivationState};
pub use layout::{Layout, ROOT_ENV_VAR};
pub use manager::{
    validate_name, ApiKeyOutcome, EnvironmentManager, EnvironmentSummary, InitOutcome,
    Readiness, RemoveOutcome, RenameOutcome, SaveOutcome, StatusReport, StatusWarning,
    SwitchOutcome,
};
pub use reconcile::{flush_outgoing, FlushAction, FlushRecord, ReconcileReport};
pub use state::EnvState;
