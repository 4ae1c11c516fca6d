use crate::{ui, EnvironmentManager, SaveOutcome};
use anyhow::Result;

pub fn execute(manager: &mut EnvironmentManager) -> Result<()> {
    match manager.save()? {
        SaveOutcome::UpToDate(env) => {
            ui::info(format!("Nothing to save; every path of '{env}' is linked."))
        }
        SaveOutcome::Saved { flush, activation } => {
            super::render_flush(&flush);
            super::render_activation(&activation);
            ui::success("Saved", format!("configuration into '{}'", activation.target));
        }
    }
    Ok(())
}
