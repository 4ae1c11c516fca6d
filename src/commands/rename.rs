use crate::{ui, EnvironmentManager};
use anyhow::Result;

pub fn execute(manager: &mut EnvironmentManager, new_name: &str) -> Result<()> {
    let outcome = manager.rename(new_name)?;
    super::render_activation(&outcome.activation);
    ui::success("Renamed", format!("'{}' to '{}'", outcome.from, outcome.to));
    Ok(())
}
