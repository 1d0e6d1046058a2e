use anyhow::Result;
use drover_core::workspace_manager::WorkspaceManager;

pub fn execute(manager: &WorkspaceManager) -> Result<()> {
    let targets = manager
        .list_targets()
        .map_err(|e| anyhow::anyhow!("Failed to list tasks: {}", e))?;

    // One name per line so the output can be piped
    for target in targets {
        println!("{}", target);
    }

    Ok(())
}
