//! Dependency resolution over a wave's task set.
//!
//! Builds the dependency graph once, then answers ordering, layering,
//! grouping, and closure queries over it. All tie-breaks follow task
//! declaration order, so repeated runs produce identical orders, waves,
//! and critical paths.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::domain::errors::{OrchestratorError, OrchestratorResult};
use crate::domain::models::Task;

/// Resolver over one task set. Tasks are indexed by id at construction;
/// the graph is read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    /// Task ids in declaration order. Canonical tie-break everywhere.
    order: Vec<String>,
    /// task id -> its dependency ids, in declared order.
    deps: HashMap<String, Vec<String>>,
    /// task id -> ids of tasks that depend on it, in declaration order.
    dependents: HashMap<String, Vec<String>>,
}

// Standalone helper for cycle detection (no self needed)
fn detect_cycle_util(
    node: &str,
    deps: &HashMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
    rec_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> bool {
    visited.insert(node.to_string());
    rec_stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(neighbors) = deps.get(node) {
        for neighbor in neighbors {
            if !deps.contains_key(neighbor.as_str()) {
                // Dangling reference; reported by validate(), not a cycle.
                continue;
            }
            if !visited.contains(neighbor) {
                if detect_cycle_util(neighbor, deps, visited, rec_stack, path) {
                    return true;
                }
            } else if rec_stack.contains(neighbor) {
                if let Some(cycle_start) = path.iter().position(|id| id == neighbor) {
                    path.drain(0..cycle_start);
                    return true;
                }
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    false
}

impl DependencyResolver {
    /// Index a task set into a resolver.
    pub fn new(tasks: &[Task]) -> Self {
        let mut order = Vec::with_capacity(tasks.len());
        let mut deps: HashMap<String, Vec<String>> = HashMap::with_capacity(tasks.len());
        for task in tasks {
            order.push(task.id.clone());
            deps.insert(task.id.clone(), task.depends_on.clone());
        }

        let mut dependents: HashMap<String, Vec<String>> = HashMap::with_capacity(tasks.len());
        for id in &order {
            dependents.entry(id.clone()).or_default();
        }
        for id in &order {
            for dep in deps.get(id).cloned().unwrap_or_default() {
                if let Some(entry) = dependents.get_mut(&dep) {
                    entry.push(id.clone());
                }
            }
        }

        Self {
            order,
            deps,
            dependents,
        }
    }

    /// Number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Collect all structural errors: dangling references and cycles.
    ///
    /// A detected cycle is reported with a concrete id sequence, never
    /// just "invalid".
    pub fn validate(&self) -> Vec<OrchestratorError> {
        let mut errors = Vec::new();

        for id in &self.order {
            if let Some(task_deps) = self.deps.get(id) {
                for dep in task_deps {
                    if !self.deps.contains_key(dep.as_str()) {
                        errors.push(OrchestratorError::MissingDependency {
                            task: id.clone(),
                            dependency: dep.clone(),
                        });
                    }
                }
            }
        }

        if let Some(cycle) = self.find_cycle() {
            errors.push(OrchestratorError::DependencyCycle(cycle));
        }

        errors
    }

    /// Return the first structural error as a hard failure, or Ok.
    fn check_structure(&self) -> OrchestratorResult<()> {
        match self.validate().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Find one concrete cycle, if any exists.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for id in &self.order {
            if !visited.contains(id)
                && detect_cycle_util(id, &self.deps, &mut visited, &mut rec_stack, &mut path)
            {
                return Some(path);
            }
        }
        None
    }

    /// Full ordering via Kahn's algorithm.
    ///
    /// Every task appears strictly after all of its dependencies. Fails
    /// with the offending cycle if not all nodes can be ordered.
    pub fn topological_order(&self) -> OrchestratorResult<Vec<String>> {
        self.check_structure()?;

        let mut in_degree: HashMap<&str, usize> = self
            .order
            .iter()
            .map(|id| (id.as_str(), self.deps[id.as_str()].len()))
            .collect();

        let mut queue: VecDeque<&str> = self
            .order
            .iter()
            .filter(|id| in_degree[id.as_str()] == 0)
            .map(String::as_str)
            .collect();

        let mut sorted = Vec::with_capacity(self.order.len());
        while let Some(id) = queue.pop_front() {
            sorted.push(id.to_string());
            for dependent in &self.dependents[id] {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent.as_str());
                    }
                }
            }
        }

        if sorted.len() != self.order.len() {
            let cycle = self.find_cycle().unwrap_or_default();
            return Err(OrchestratorError::DependencyCycle(cycle));
        }

        Ok(sorted)
    }

    /// Partition all tasks into ordered layers such that a task appears
    /// strictly after every layer containing any of its dependencies.
    ///
    /// An empty candidate set before all tasks are placed indicates an
    /// unresolved cycle and is a hard error; this never loops forever.
    pub fn execution_waves(&self) -> OrchestratorResult<Vec<Vec<String>>> {
        self.check_structure()?;

        let mut placed: HashSet<String> = HashSet::with_capacity(self.order.len());
        let mut waves = Vec::new();

        while placed.len() < self.order.len() {
            let ready: Vec<String> = self
                .order
                .iter()
                .filter(|id| !placed.contains(id.as_str()))
                .filter(|id| {
                    self.deps[id.as_str()]
                        .iter()
                        .all(|dep| placed.contains(dep.as_str()))
                })
                .cloned()
                .collect();

            if ready.is_empty() {
                let cycle = self.find_cycle().unwrap_or_default();
                return Err(OrchestratorError::DependencyCycle(cycle));
            }

            placed.extend(ready.iter().cloned());
            waves.push(ready);
        }

        Ok(waves)
    }

    /// The layers from [`Self::execution_waves`], each chunked into
    /// sub-groups of at most `max_parallel` ids, preserving layer order.
    pub fn parallel_groups(&self, max_parallel: usize) -> OrchestratorResult<Vec<Vec<Vec<String>>>> {
        if max_parallel == 0 {
            return Err(OrchestratorError::Config(
                "max_parallel must be at least 1".to_string(),
            ));
        }
        let waves = self.execution_waves()?;
        Ok(waves
            .into_iter()
            .map(|wave| wave.chunks(max_parallel).map(<[String]>::to_vec).collect())
            .collect())
    }

    /// Longest chain by dependency depth, via dynamic programming over
    /// the topological order. Ties break to the first-seen predecessor,
    /// so the result is deterministic.
    pub fn critical_path(&self) -> OrchestratorResult<Vec<String>> {
        let sorted = self.topological_order()?;
        if sorted.is_empty() {
            return Ok(Vec::new());
        }

        // distance[t] = 1 + max(distance[dep]) over its dependencies.
        let mut distance: HashMap<String, usize> = HashMap::with_capacity(sorted.len());
        let mut predecessor: HashMap<String, String> = HashMap::new();

        for id in &sorted {
            let mut best = 0usize;
            let mut chosen: Option<&String> = None;
            for dep in &self.deps[id.as_str()] {
                let dep_distance = distance.get(dep.as_str()).copied().unwrap_or(0);
                // Strict > keeps the first-seen predecessor on ties.
                if dep_distance > best {
                    best = dep_distance;
                    chosen = Some(dep);
                }
            }
            distance.insert(id.clone(), 1 + best);
            if let Some(dep) = chosen {
                predecessor.insert(id.clone(), dep.clone());
            }
        }

        // First-seen maximum in declaration order.
        let mut end = self.order[0].clone();
        let mut max_distance = 0usize;
        for id in &self.order {
            let d = distance.get(id.as_str()).copied().unwrap_or(0);
            if d > max_distance {
                max_distance = d;
                end = id.clone();
            }
        }

        let mut path = vec![end.clone()];
        let mut cursor = end;
        while let Some(prev) = predecessor.get(&cursor) {
            path.push(prev.clone());
            cursor = prev.clone();
        }
        path.reverse();
        Ok(path)
    }

    /// All tasks the given task transitively depends on (BFS).
    pub fn transitive_dependencies(&self, id: &str) -> OrchestratorResult<HashSet<String>> {
        self.closure(id, &self.deps)
    }

    /// All tasks that transitively depend on the given task (BFS over
    /// the reverse graph).
    pub fn dependents(&self, id: &str) -> OrchestratorResult<HashSet<String>> {
        self.closure(id, &self.dependents)
    }

    fn closure(
        &self,
        id: &str,
        edges: &HashMap<String, Vec<String>>,
    ) -> OrchestratorResult<HashSet<String>> {
        if !self.deps.contains_key(id) {
            return Err(OrchestratorError::TaskNotFound(id.to_string()));
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(id.to_string());

        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = edges.get(current.as_str()) {
                for neighbor in neighbors {
                    if self.deps.contains_key(neighbor.as_str()) && seen.insert(neighbor.clone()) {
                        queue.push_back(neighbor.clone());
                    }
                }
            }
        }

        Ok(seen)
    }

    /// True iff no id's transitive-dependency set intersects the given
    /// id set: the tasks are mutually independent.
    pub fn can_run_in_parallel(&self, ids: &[String]) -> OrchestratorResult<bool> {
        let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();
        for id in ids {
            let deps = self.transitive_dependencies(id)?;
            if deps.iter().any(|dep| id_set.contains(dep.as_str())) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
