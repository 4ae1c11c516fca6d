use crate::{ui, AuthKind, EnvironmentManager, EnvironmentSummary, Readiness};
use anyhow::Result;

pub fn execute(manager: &EnvironmentManager) -> Result<()> {
    let environments = manager.list();
    if environments.is_empty() {
        ui::info("No environments yet. Run 'claude_env init' or 'claude_env add <name>'.");
        return Ok(());
    }

    for summary in &environments {
        let line = format!("{} ({})", summary.name, readiness_text(summary.readiness()));
        if summary.active {
            ui::success("Active", line);
        } else {
            ui::status("Environment", line);
        }
        ui::detail(details(summary));
    }
    Ok(())
}

fn readiness_text(readiness: Readiness) -> &'static str {
    match readiness {
        Readiness::ActiveReady | Readiness::Ready => "ready",
        Readiness::ActiveUnconfigured => "not logged in",
        Readiness::Unconfigured => "not configured",
    }
}

fn details(summary: &EnvironmentSummary) -> String {
    let credentials = &summary.credentials;
    let user = credentials
        .identity
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    let endpoint = match credentials.auth {
        AuthKind::OAuth => "official".to_string(),
        AuthKind::ApiKey => credentials
            .endpoint
            .clone()
            .unwrap_or_else(|| "needs config".to_string()),
        AuthKind::Unknown => "-".to_string(),
    };

    format!(
        "auth: {}  user: {}  endpoint: {}\npath: {}",
        credentials.auth,
        user,
        endpoint,
        summary.path.display()
    )
}
