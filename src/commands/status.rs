use crate::{ui, ActivationState, EnvironmentManager, StatusWarning};
use anyhow::Result;

pub fn execute(manager: &EnvironmentManager) -> Result<()> {
    let report = manager.status();

    match &report.state {
        ActivationState::Active(name) => ui::success("Active", name),
        ActivationState::Disconnected { hint } => {
            ui::status("Active", "none (disconnected)");
            if let Some(hint) = hint {
                ui::detail(format!("last active: {hint}"));
            }
        }
    }

    let credentials = &report.credentials;
    ui::detail(format!("storage: {}", report.storage_root.display()));
    ui::detail(format!(
        "credentials: {} ({})",
        report.credentials_path.display(),
        credentials.auth
    ));
    if let Some(identity) = &credentials.identity {
        ui::detail(format!("user: {identity}"));
    }
    if let Some(endpoint) = &credentials.endpoint {
        ui::detail(format!("endpoint: {endpoint}"));
    }

    match report.warning() {
        Some(StatusWarning::PrimaryDetached(path)) => ui::warn(format!(
            "{} is not a symlink. Run 'claude_env init' or 'claude_env switch <name>'.",
            path.display()
        )),
        Some(StatusWarning::Unowned) => ui::warn(
            "Credentials exist but no environment link resolves. Run 'claude_env switch <name>'.",
        ),
        None => {}
    }
    Ok(())
}
