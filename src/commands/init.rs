use crate::{ui, EnvironmentManager, InitOutcome};
use anyhow::Result;

pub fn execute(manager: &mut EnvironmentManager) -> Result<()> {
    match manager.init()? {
        InitOutcome::AlreadyInitialized { environments } => {
            ui::info(format!(
                "Already initialized with {} environment(s): {}",
                environments.len(),
                environments.join(", ")
            ));
        }
        InitOutcome::NoExistingConfig => {
            ui::info("No existing configuration detected.");
            ui::info("Create an environment with: claude_env add <name>");
        }
        InitOutcome::Adopted {
            name,
            moved,
            activation,
        } => {
            super::render_steps(&moved);
            super::render_activation(&activation);
            ui::success("Initialized", format!("environment '{name}' is active"));
        }
    }
    Ok(())
}
