use crate::{ui, EnvironmentManager, SwitchOutcome};
use anyhow::Result;

pub fn execute(manager: &mut EnvironmentManager, name: &str) -> Result<()> {
    let progress = ui::Progress::new("Switching", format!("to '{name}'"));
    match manager.switch(name)? {
        SwitchOutcome::AlreadyActive(_) => progress.warn("Unchanged", "already active"),
        SwitchOutcome::Switched(report) => {
            let from = report
                .outgoing
                .as_deref()
                .filter(|outgoing| *outgoing != name)
                .map(|outgoing| format!("from '{outgoing}'"));
            super::render_activation(&report);
            progress.success("Switched", from);
        }
    }
    Ok(())
}
