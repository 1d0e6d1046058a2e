//! Task graph and execution planning
//!
//! The graph maps task names to their declared prerequisites. Resolving a task walks
//! prerequisites depth-first, in declaration order, and yields a deduplicated plan in
//! which every prerequisite precedes the task that needs it. Cycles are configuration
//! errors; they are reported when a resolution reaches them, never at declaration time.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::algo::kosaraju_scc;
use petgraph::prelude::*;

use crate::configs::tasks::TaskConfig;
use crate::types::{DroverError, DroverResult};

/// Ordered, duplicate-free list of task names produced by a single resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub requested: String,
    pub tasks: Vec<String>,
}

impl ExecutionPlan {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(String::as_str)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t == name)
    }
}

#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: BTreeMap<String, TaskConfig>,
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl TaskGraph {
    /// Build the graph; a later declaration replaces an earlier one with the same name
    pub fn new(tasks: impl IntoIterator<Item = TaskConfig>) -> Self {
        let tasks: BTreeMap<String, TaskConfig> = tasks
            .into_iter()
            .map(|task| (task.name.clone(), task))
            .collect();

        let mut graph = DiGraph::<String, ()>::new();
        let mut nodes = HashMap::new();
        for name in tasks.keys() {
            nodes.insert(name.clone(), graph.add_node(name.clone()));
        }

        // Edge: task -> prerequisite. Undeclared prerequisites only surface on resolution.
        for task in tasks.values() {
            let from = nodes[&task.name];
            for dep in task.dependencies() {
                if let Some(&to) = nodes.get(dep) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self {
            tasks,
            graph,
            nodes,
        }
    }

    pub fn get(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn prerequisites(&self, name: &str) -> &[String] {
        self.tasks
            .get(name)
            .map(|task| task.dependencies())
            .unwrap_or_default()
    }

    /// Every declared task name, sorted
    pub fn list_all(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    /// Expand `name` into the ordered list of tasks that must run
    pub fn resolve(&self, name: &str) -> DroverResult<ExecutionPlan> {
        if !self.contains(name) {
            return Err(DroverError::UnknownTask {
                name: name.to_string(),
            });
        }

        let mut placed = HashSet::new();
        let mut visiting = Vec::new();
        let mut order = Vec::new();
        self.visit(name, &mut visiting, &mut placed, &mut order)?;

        Ok(ExecutionPlan {
            requested: name.to_string(),
            tasks: order,
        })
    }

    fn visit(
        &self,
        name: &str,
        visiting: &mut Vec<String>,
        placed: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) -> DroverResult<()> {
        if placed.contains(name) {
            return Ok(());
        }
        if let Some(start) = visiting.iter().position(|v| v == name) {
            let mut cycle = visiting[start..].to_vec();
            cycle.push(name.to_string());
            return Err(DroverError::CyclicDependency { cycle });
        }

        let task = self.tasks.get(name).ok_or_else(|| DroverError::UnknownTask {
            name: name.to_string(),
        })?;

        visiting.push(name.to_string());
        for dep in task.dependencies() {
            self.visit(dep, visiting, placed, order)?;
        }
        visiting.pop();

        placed.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }

    /// All strongly connected groups of tasks, each sorted, for diagnostics
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter_map(|component| {
                if component.len() > 1 {
                    let mut cycle = component
                        .iter()
                        .map(|node| self.graph[*node].clone())
                        .collect::<Vec<_>>();
                    cycle.sort();
                    Some(cycle)
                } else {
                    let node = component[0];
                    if self.graph.contains_edge(node, node) {
                        Some(vec![self.graph[node].clone()])
                    } else {
                        None
                    }
                }
            })
            .collect();

        cycles.sort();
        cycles
    }

    /// One dependency path per cyclic group, closed back on the task it starts from
    pub fn cycle_paths(&self) -> Vec<Vec<String>> {
        self.cycles()
            .into_iter()
            .map(|group| match self.resolve(&group[0]) {
                Err(DroverError::CyclicDependency { cycle }) => cycle,
                _ => group,
            })
            .collect()
    }

    /// Names of tasks that declare `name` as a direct prerequisite, sorted
    pub fn dependents(&self, name: &str) -> Vec<String> {
        let Some(&node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut dependents: Vec<String> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect();
        dependents.sort();
        dependents.dedup();
        dependents
    }
}
