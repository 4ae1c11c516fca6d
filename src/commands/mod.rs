use crate::cli::{Cli, Commands};
use crate::{
    ui, ActivationReport, EnvironmentManager, Layout, ReconcileReport, StepAction, StepRecord,
};
use anyhow::Result;

mod add;
mod init;
mod list;
mod remove;
mod rename;
mod save;
mod set_api;
mod status;
mod switch;
mod uninstall;

pub fn execute(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        ui::info("Welcome to claude_env. Run 'claude_env --help' for commands, or 'claude_env init' to get started.");
        return Ok(());
    };

    let layout = Layout::discover()?;
    let open = || EnvironmentManager::open(layout.clone());

    match command {
        Commands::Init => init::execute(&mut open()?),
        Commands::Add { name } => add::execute(&mut open()?, &name),
        Commands::Switch { name } => switch::execute(&mut open()?, &name),
        Commands::Rename { name } => rename::execute(&mut open()?, &name),
        Commands::List => list::execute(&open()?),
        Commands::Save => save::execute(&mut open()?),
        Commands::Status => status::execute(&open()?),
        Commands::SetApi { key, endpoint } => set_api::execute(&open()?, &key, &endpoint),
        Commands::Remove { name, yes } => remove::execute(&mut open()?, &name, yes),
        // Needs no config, so it still works when config.yaml is broken
        Commands::Uninstall { yes, purge } => uninstall::execute(&layout, yes, purge),
    }
}

/// Print what an activation did; failed steps are warnings.
fn render_activation(report: &ActivationReport) {
    render_flush(&report.flush);
    render_steps(&report.steps);

    let failed = report.failures().count();
    if failed > 0 {
        ui::warn(format!(
            "{failed} step(s) failed; run 'claude_env status' to check the links"
        ));
    }
}

fn render_flush(flush: &ReconcileReport) {
    for record in &flush.records {
        match &record.result {
            Ok(_) => ui::status("Saved", record.source.display()),
            Err(err) => ui::warn(err),
        }
    }
}

fn render_steps(steps: &[StepRecord]) {
    for step in steps {
        match &step.result {
            Ok(StepAction::Moved { to }) => {
                ui::status("Moved", format!("{} -> {}", step.path.display(), to.display()))
            }
            Ok(StepAction::Linked { target, .. }) => {
                ui::status("Linked", format!("{} -> {}", step.path.display(), target.display()))
            }
            Ok(StepAction::SkippedUnmanaged) => ui::warn(format!(
                "{} was not a symlink; replacing it with a link",
                step.path.display()
            )),
            Ok(StepAction::Unlinked) => {}
            Err(err) => ui::warn(err),
        }
    }
}
