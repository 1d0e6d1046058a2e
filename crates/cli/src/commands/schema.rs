use anyhow::Result;
use drover_core::configs::workspace::workspace_config_schema;

pub fn execute() -> Result<()> {
    let schema = workspace_config_schema()
        .map_err(|e| anyhow::anyhow!("Failed to render schema: {}", e))?;
    println!("{}", schema);
    Ok(())
}
