//! Discovery of invocable task names

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::task_graph::TaskGraph;
use crate::types::{DroverError, DroverResult};

fn hidden_set(patterns: &[String]) -> DroverResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            DroverError::Config(format!("Invalid hidden task pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| DroverError::Config(format!("Invalid hidden task patterns: {}", e)))
}

/// Sorted names a user can invoke, leaving out names matching any `hidden` pattern
pub fn list_targets(graph: &TaskGraph, hidden: &[String]) -> DroverResult<Vec<String>> {
    let hidden = hidden_set(hidden)?;
    Ok(graph
        .list_all()
        .into_iter()
        .filter(|name| !hidden.is_match(name))
        .collect())
}
