use crate::{credentials, ui, EnvironmentManager};
use anyhow::Result;

pub fn execute(manager: &EnvironmentManager, key: &str, endpoint: &str) -> Result<()> {
    let outcome = manager.set_api_key(key, endpoint)?;
    ui::success("Configured", format!("'{}' to use an API key", outcome.env));
    ui::detail(format!("Key:      {}", credentials::mask_api_key(key)));
    ui::detail(format!("Endpoint: {endpoint}"));
    ui::detail(format!("File:     {}", outcome.path.display()));
    Ok(())
}
