use crate::domain::step_definition::{StepDefinition, StepId};
use crate::CoreError;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// A total order of step ids in which every step follows all of its
/// dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOrder(pub Vec<StepId>);

impl ExecutionOrder {
    /// Iterate the ids in execution order
    pub fn iter(&self) -> impl Iterator<Item = &StepId> {
        self.0.iter()
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the order is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of a step in the order
    pub fn position(&self, id: &StepId) -> Option<usize> {
        self.0.iter().position(|s| s == id)
    }
}

impl IntoIterator for ExecutionOrder {
    type Item = StepId;
    type IntoIter = std::vec::IntoIter<StepId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Compute a topological order of the steps.
///
/// Ties are broken by declaration order, so the result is deterministic for a
/// given definition set. Fails with `DuplicateStep`, `UnknownDependency` or
/// `CyclicDependency` (listing the steps that could not be scheduled).
pub fn resolve_order(steps: &[StepDefinition]) -> Result<ExecutionOrder, CoreError> {
    let mut index: HashMap<&StepId, usize> = HashMap::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        if index.insert(&step.id, i).is_some() {
            return Err(CoreError::DuplicateStep(step.id.0.clone()));
        }
    }

    let mut in_degree = vec![0usize; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];

    for (i, step) in steps.iter().enumerate() {
        for dep in &step.depends_on {
            let &d = index.get(dep).ok_or_else(|| CoreError::UnknownDependency {
                step: step.id.0.clone(),
                dependency: dep.0.clone(),
            })?;
            in_degree[i] += 1;
            dependents[d].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..steps.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(steps.len());

    while let Some(next) = ready.pop_first() {
        order.push(steps[next].id.clone());
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != steps.len() {
        let stuck = steps
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, s)| s.id.0.clone())
            .collect();
        return Err(CoreError::CyclicDependency { steps: stuck });
    }

    Ok(ExecutionOrder(order))
}

/// Reverse-edge view of the dependency relation
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependents: HashMap<StepId, Vec<StepId>>,
}

impl DependencyGraph {
    /// Build the graph from step definitions
    pub fn from_steps(steps: &[StepDefinition]) -> Self {
        let mut dependents: HashMap<StepId, Vec<StepId>> = HashMap::new();
        for step in steps {
            dependents.entry(step.id.clone()).or_default();
            for dep in &step.depends_on {
                dependents.entry(dep.clone()).or_default().push(step.id.clone());
            }
        }
        Self { dependents }
    }

    /// Steps that directly consume the given step's output
    pub fn direct_dependents(&self, id: &StepId) -> &[StepId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every step that transitively depends on the given step
    pub fn transitive_dependents(&self, id: &StepId) -> HashSet<StepId> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&StepId> = self.direct_dependents(id).iter().collect();

        while let Some(current) = queue.pop_front() {
            if seen.insert(current.clone()) {
                queue.extend(self.direct_dependents(current));
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step_definition::PromptContract;

    fn step(id: &str, deps: &[&str]) -> StepDefinition {
        StepDefinition::new(id, PromptContract::new("")).depends_on(deps.iter().copied())
    }

    fn ids(order: &ExecutionOrder) -> Vec<&str> {
        order.iter().map(StepId::as_str).collect()
    }

    #[test]
    fn test_diamond_order() {
        let steps = vec![step("a", &[]), step("b", &["a"]), step("c", &["a"]), step("d", &["b", "c"])];
        let order = resolve_order(&steps).unwrap();
        assert_eq!(ids(&order), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_ties_broken_by_declaration_order() {
        let steps = vec![step("z", &[]), step("y", &[]), step("x", &["z"])];
        let order = resolve_order(&steps).unwrap();
        assert_eq!(ids(&order), vec!["z", "y", "x"]);
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let steps = vec![
            step("d", &["b", "c"]),
            step("c", &["a"]),
            step("b", &["a"]),
            step("a", &[]),
        ];
        let order = resolve_order(&steps).unwrap();

        for s in &steps {
            let pos = order.position(&s.id).unwrap();
            for dep in &s.depends_on {
                assert!(order.position(dep).unwrap() < pos, "{} must precede {}", dep, s.id);
            }
        }
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn test_unknown_dependency() {
        let err = resolve_order(&[step("a", &["ghost"])]).unwrap_err();
        assert_eq!(
            err,
            CoreError::UnknownDependency {
                step: "a".to_string(),
                dependency: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_cycle_lists_unschedulable_steps() {
        let steps = vec![step("root", &[]), step("a", &["b"]), step("b", &["a"]), step("leaf", &["a"])];
        let err = resolve_order(&steps).unwrap_err();
        assert_eq!(
            err,
            CoreError::CyclicDependency {
                steps: vec!["a".to_string(), "b".to_string(), "leaf".to_string()]
            }
        );
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = resolve_order(&[step("a", &["a"])]).unwrap_err();
        assert!(matches!(err, CoreError::CyclicDependency { .. }));
    }

    #[test]
    fn test_duplicate_step() {
        let err = resolve_order(&[step("a", &[]), step("a", &[])]).unwrap_err();
        assert_eq!(err, CoreError::DuplicateStep("a".to_string()));
    }

    #[test]
    fn test_empty_definition_set() {
        assert!(resolve_order(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_transitive_dependents() {
        let steps = vec![step("a", &[]), step("b", &["a"]), step("c", &["a"]), step("d", &["b", "c"]), step("e", &[])];
        let graph = DependencyGraph::from_steps(&steps);

        let from_b = graph.transitive_dependents(&StepId::new("b"));
        assert_eq!(from_b, HashSet::from([StepId::new("d")]));

        let from_a = graph.transitive_dependents(&StepId::new("a"));
        assert_eq!(from_a.len(), 3);
        assert!(graph.transitive_dependents(&StepId::new("e")).is_empty());
    }
}
