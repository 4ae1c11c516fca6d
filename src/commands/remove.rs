use crate::{ui, EnvironmentManager, RemoveOutcome};
use anyhow::Result;

pub fn execute(manager: &mut EnvironmentManager, name: &str, yes: bool) -> Result<()> {
    let outcome = manager.remove(name, |summary| {
        yes || {
            ui::warn(format!(
                "This deletes '{}' and everything stored in {}",
                summary.name,
                summary.path.display()
            ));
            ui::confirm("Type 'yes' to continue:", &["yes"])
        }
    })?;

    match outcome {
        RemoveOutcome::Removed { name, .. } => ui::success("Removed", format!("'{name}'")),
        RemoveOutcome::Cancelled => ui::info("Cancelled."),
    }
    Ok(())
}
