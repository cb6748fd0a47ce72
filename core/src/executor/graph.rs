use std::collections::{HashMap, HashSet};

use crate::error::ExecutorError;
use crate::executor::types::Task;

/// Task dependency graph (DAG)
///
/// Flat adjacency maps keyed by task id. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Task nodes: task_id -> Task
    pub nodes: HashMap<String, Task>,

    /// Dependent edges: task_id -> tasks that depend on it.
    /// "B depends on A" is stored as `edges[A] = [.., B, ..]`.
    pub edges: HashMap<String, Vec<String>>,

    /// Original insertion order (for stable sorting)
    insertion_order: Vec<String>,

    /// task_id -> index in `insertion_order`
    positions: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Construct the graph from a task list.
    ///
    /// Never fails: unknown dependency ids and cycles are reported by
    /// [`validate`](Self::validate) and the ordering functions.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut nodes = HashMap::with_capacity(tasks.len());
        let mut edges: HashMap<String, Vec<String>> = HashMap::with_capacity(tasks.len());
        let mut insertion_order = Vec::with_capacity(tasks.len());
        let mut positions = HashMap::with_capacity(tasks.len());

        // Add all nodes
        for task in tasks {
            if nodes.insert(task.id.clone(), task.clone()).is_none() {
                positions.insert(task.id.clone(), insertion_order.len());
                insertion_order.push(task.id.clone());
            }
            edges.entry(task.id.clone()).or_default();
        }

        // Record each dependency as an edge from the prerequisite to the dependent
        for task in tasks {
            for dep in &task.dependencies {
                edges.entry(dep.clone()).or_default().push(task.id.clone());
            }
        }

        Self {
            nodes,
            edges,
            insertion_order,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.nodes.get(task_id)
    }

    /// Tasks that declare `task_id` as a dependency.
    pub fn dependents(&self, task_id: &str) -> &[String] {
        self.edges.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn insertion_order(&self) -> &[String] {
        &self.insertion_order
    }

    /// Validate dependency relationships
    pub fn validate(&self) -> Result<(), ExecutorError> {
        self.check_dependencies()?;
        self.topological_order().map(|_| ())
    }

    fn check_dependencies(&self) -> Result<(), ExecutorError> {
        for task_id in &self.insertion_order {
            let Some(task) = self.nodes.get(task_id) else {
                continue;
            };
            for dep in &task.dependencies {
                if !self.nodes.contains_key(dep) {
                    return Err(ExecutorError::DependencyNotFound {
                        task_id: task_id.clone(),
                        missing_dep: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Depth-first topological order: every task appears before the tasks
    /// that depend on it.
    ///
    /// A node is expanded by visiting all of its dependents first and is then
    /// prepended to the output. Re-entering a node that is still on the
    /// current path means a cycle.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of tasks, E = number of dependencies
    pub fn topological_order(&self) -> Result<Vec<String>, ExecutorError> {
        let mut visited = HashSet::with_capacity(self.nodes.len());
        let mut path = Vec::new();
        let mut post_order = Vec::with_capacity(self.nodes.len());

        for task_id in &self.insertion_order {
            self.visit(task_id, &mut visited, &mut path, &mut post_order)?;
        }

        post_order.reverse();
        Ok(post_order)
    }

    fn visit(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
        post_order: &mut Vec<String>,
    ) -> Result<(), ExecutorError> {
        if let Some(pos) = path.iter().position(|x| x == node) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(node.to_string());
            return Err(ExecutorError::CircularDependency(format_cycle_path(&cycle)));
        }
        if visited.contains(node) {
            return Ok(());
        }

        path.push(node.to_string());
        for dependent in self.dependents(node) {
            self.visit(dependent, visited, path, post_order)?;
        }
        path.pop();

        visited.insert(node.to_string());
        if self.nodes.contains_key(node) {
            post_order.push(node.to_string());
        }
        Ok(())
    }

    /// Group tasks into execution layers.
    ///
    /// Layer 0 holds tasks without dependencies; layer k holds tasks whose
    /// dependencies are all in layers < k. Tasks in the same layer can run in
    /// parallel. Within a layer, tasks keep their input order.
    ///
    /// # Algorithm
    ///
    /// 1. Calculate in-degree for all nodes
    /// 2. Find all nodes with in-degree 0 (first layer)
    /// 3. Remove these nodes and update in-degrees
    /// 4. Repeat until all nodes processed; leftovers mean a cycle
    pub fn layers(&self) -> Result<Vec<Vec<String>>, ExecutorError> {
        self.check_dependencies()?;

        let mut in_degree: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(id, task)| (id.as_str(), task.dependencies.len()))
            .collect();

        let mut layers: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = self
            .insertion_order
            .iter()
            .filter(|id| in_degree.get(id.as_str()) == Some(&0))
            .cloned()
            .collect();

        let mut processed = 0;

        while !current.is_empty() {
            processed += current.len();

            let mut next = Vec::new();
            for task_id in &current {
                for dependent in self.dependents(task_id) {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            next.push(dependent.clone());
                        }
                    }
                }
            }

            // Preserve input order
            next.sort_by_key(|id| self.position(id).unwrap_or(usize::MAX));
            next.dedup();

            layers.push(std::mem::replace(&mut current, next));
        }

        // Verify all nodes processed (no cycles)
        if processed != self.nodes.len() {
            return Err(self.topological_order().err().unwrap_or_else(|| {
                ExecutorError::CircularDependency(
                    "unable to schedule remaining tasks (cycle detected)".to_string(),
                )
            }));
        }

        Ok(layers)
    }

    /// Index of `task_id` in the input list (first occurrence).
    pub fn position(&self, task_id: &str) -> Option<usize> {
        self.positions.get(task_id).copied()
    }
}

fn format_cycle_path(stack: &[String]) -> String {
    stack.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn task(id: &str, deps: &[&str]) -> Task {
        Task::new(id, format!("{id} description"), format!("{id} prompt"))
            .with_dependencies(deps.iter().copied())
    }

    #[test]
    fn edges_point_from_prerequisite_to_dependent() {
        let graph = DependencyGraph::from_tasks(&[
            task("a", &[]),
            task("b", &["a"]),
            task("c", &["a"]),
        ]);
        assert_eq!(graph.dependents("a"), &["b".to_string(), "c".to_string()]);
        assert!(graph.dependents("b").is_empty());
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let tasks = vec![
            task("report", &["analysis", "charts"]),
            task("charts", &["data"]),
            task("analysis", &["data"]),
            task("data", &[]),
        ];
        let graph = DependencyGraph::from_tasks(&tasks);
        let order = graph.topological_order().unwrap();
        assert_eq!(order.len(), 4);

        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        for t in &tasks {
            for dep in &t.dependencies {
                assert!(pos(dep) < pos(&t.id), "{dep} must come before {}", t.id);
            }
        }
    }

    #[test]
    fn two_node_cycle_is_rejected() {
        let graph = DependencyGraph::from_tasks(&[task("a", &["b"]), task("b", &["a"])]);
        let err = graph.topological_order().unwrap_err();
        match err {
            ExecutorError::CircularDependency(path) => {
                assert!(path.contains("a") && path.contains("b"), "path: {path}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            graph.layers(),
            Err(ExecutorError::CircularDependency(_))
        ));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let graph = DependencyGraph::from_tasks(&[task("a", &["a"])]);
        assert!(matches!(
            graph.validate(),
            Err(ExecutorError::CircularDependency(_))
        ));
    }

    #[test]
    fn layers_group_independent_tasks() {
        let graph = DependencyGraph::from_tasks(&[
            task("t1", &[]),
            task("t2", &[]),
            task("t3", &["t1", "t2"]),
            task("t4", &["t3"]),
            task("t5", &["t1"]),
        ]);
        let layers = graph.layers().unwrap();
        assert_eq!(
            layers,
            vec![
                vec!["t1".to_string(), "t2".to_string()],
                vec!["t3".to_string(), "t5".to_string()],
                vec!["t4".to_string()],
            ]
        );
    }

    #[test]
    fn layers_are_not_fooled_by_input_order() {
        // Dependent listed before its prerequisite: a single topological pass
        // over the input would skip it.
        let graph = DependencyGraph::from_tasks(&[task("t2", &["t1"]), task("t1", &[])]);
        let layers = graph.layers().unwrap();
        assert_eq!(layers, vec![vec!["t1".to_string()], vec!["t2".to_string()]]);
    }

    #[test]
    fn duplicate_dependency_entries_are_harmless() {
        let graph = DependencyGraph::from_tasks(&[task("a", &[]), task("b", &["a", "a"])]);
        let layers = graph.layers().unwrap();
        assert_eq!(layers, vec![vec!["a".to_string()], vec!["b".to_string()]]);
    }

    #[test]
    fn unknown_dependency_is_reported() {
        let graph = DependencyGraph::from_tasks(&[task("a", &["ghost"])]);
        match graph.layers().unwrap_err() {
            ExecutorError::DependencyNotFound {
                task_id,
                missing_dep,
            } => {
                assert_eq!(task_id, "a");
                assert_eq!(missing_dep, "ghost");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_graph_has_no_layers() {
        let graph = DependencyGraph::from_tasks(&[]);
        assert!(graph.is_empty());
        assert!(graph.layers().unwrap().is_empty());
        assert!(graph.topological_order().unwrap().is_empty());
    }

    #[test]
    fn positions_follow_input_order() {
        let graph = DependencyGraph::from_tasks(&[
            task("c", &["a"]),
            task("a", &[]),
            task("b", &["a"]),
        ]);
        assert_eq!(graph.position("c"), Some(0));
        assert_eq!(graph.position("b"), Some(2));
        assert_eq!(graph.position("zzz"), None);
        // dependents of `a` come back in input order, not edge order
        assert_eq!(
            graph.layers().unwrap(),
            vec![vec!["a".to_string()], vec!["c".to_string(), "b".to_string()]]
        );
    }
}
