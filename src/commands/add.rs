use crate::{ui, EnvironmentManager};
use anyhow::Result;

pub fn execute(manager: &mut EnvironmentManager, name: &str) -> Result<()> {
    let progress = ui::Progress::new("Creating", format!("environment '{name}'"));
    let report = manager.add(name)?;
    progress.success("Created", Some(format!("at {}", manager.env_dir(name).display())));

    super::render_activation(&report);
    ui::success("Active", format!("'{name}'. Run 'claude' to log in to this account."));
    Ok(())
}
