use anyhow::Result;
use colored::*;
use drover_core::workspace_manager::WorkspaceManager;

pub async fn execute(manager: &WorkspaceManager, task: &str) -> Result<()> {
    println!("{} {}", "Execution plan for".bold(), task.cyan());

    // Get execution plan from workspace manager
    let result = manager
        .get_execution_plan(task)
        .map_err(|e| anyhow::anyhow!("Failed to get execution plan: {}", e))?;

    println!("\n{}:", "Execution order".bold());
    for (i, name) in result.plan.iter().enumerate() {
        let label = match result.task_colors.get(name) {
            Some(color) => name.color(*color).bold(),
            None => name.normal(),
        };
        let mut notes = Vec::new();
        if let Some(declared) = manager.graph.get(name) {
            if declared.phony {
                notes.push("phony");
            }
            if declared.is_organizational() {
                notes.push("no command");
            }
        }
        if notes.is_empty() {
            println!("  {}. {}", i + 1, label);
        } else {
            let notes = format!("({})", notes.join(", "));
            println!("  {}. {} {}", i + 1, label, notes.dimmed());
        }
    }

    Ok(())
}
