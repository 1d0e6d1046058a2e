use std::collections::HashSet;

use anyhow::Result;
use colored::*;
use drover_core::workspace_manager::WorkspaceManager;

pub fn execute(manager: &WorkspaceManager) -> Result<()> {
    let result = manager
        .get_dependency_graph()
        .map_err(|e| anyhow::anyhow!("Failed to get dependency graph: {}", e))?;

    println!("{}", "Task Dependency Graph:".bold().underline());
    if result.tasks.is_empty() {
        println!("No tasks declared");
        return Ok(());
    }

    let cyclic: HashSet<&str> = result.cycles.iter().flatten().map(String::as_str).collect();
    for cycle in &result.cycles {
        println!(
            "{} {}",
            "cycle:".red().bold(),
            cycle.join(" -> ").red()
        );
    }
    if !result.cycles.is_empty() {
        println!();
    }

    for (name, needs) in &result.tasks {
        let label = if cyclic.contains(name.as_str()) {
            name.red().bold()
        } else {
            name.blue().bold()
        };
        let needed_by = manager.graph.dependents(name);

        println!("{}", label);
        println!("  {} {}", "needs:".dimmed(), list_or_dash(needs));
        println!("  {} {}", "needed by:".dimmed(), list_or_dash(&needed_by));
    }

    Ok(())
}

fn list_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}
