use crate::{ui, Layout};
use anyhow::{Context, Result};
use std::fs;

pub fn execute(layout: &Layout, yes: bool, purge: bool) -> Result<()> {
    if !yes && !ui::confirm("Remove the claude_env launcher? Type 'yes' to continue:", &["yes"]) {
        ui::info("Cancelled.");
        return Ok(());
    }

    let launcher = layout.launcher_path();
    if fs::symlink_metadata(&launcher).is_ok() {
        fs::remove_file(&launcher)
            .with_context(|| format!("Failed to remove {}", launcher.display()))?;
        ui::success("Removed", launcher.display());
    } else {
        ui::info(format!("No launcher at {}", launcher.display()));
    }

    let root = layout.root();
    if !root.exists() {
        return Ok(());
    }

    let delete = purge
        || ui::confirm(
            &format!(
                "Also delete {} and every environment stored there? [y/N]",
                root.display()
            ),
            &["y", "yes"],
        );
    if delete {
        fs::remove_dir_all(root)
            .with_context(|| format!("Failed to remove {}", root.display()))?;
        ui::success("Removed", root.display());
    } else {
        ui::info(format!("Kept {}", root.display()));
    }
    Ok(())
}
