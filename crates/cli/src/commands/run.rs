use anyhow::Result;
use colored::*;
use drover_core::text::bool_env_var;
use drover_core::workspace_manager::{RunOptions, WorkspaceManager};

pub async fn execute(manager: &WorkspaceManager, task: &str, confirm_release: bool) -> Result<()> {
    println!("{} {}", "Running task".bold(), task.cyan());

    let options = RunOptions {
        confirm_release: confirm_release || bool_env_var("DROVER_CONFIRM_RELEASE"),
    };

    // Execute task using workspace manager
    let report = manager
        .run_task(task, options)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run task: {}", e))?;

    println!();
    println!(
        "{} {}",
        "✓".green().bold(),
        format!("{} task(s) completed successfully!", report.outcomes.len())
            .green()
            .bold()
    );

    Ok(())
}
