use fieldbook_model::FieldId;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

/// A would-be circular reference, rejected before the graph is mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub field_id: FieldId,
}

impl CycleError {
    /// The message surfaced to field-configuration callers.
    pub const MESSAGE: &'static str = "Circular reference detected in formula dependencies";
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::MESSAGE)
    }
}

impl std::error::Error for CycleError {}

/// Counts useful for asserting the internal representation in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    pub formula_fields: usize,
    pub dependency_edges: usize,
}

/// Tracks which computed fields read which other fields.
///
/// Two adjacency maps are kept in lockstep: `dependencies` (field -> fields it
/// reads) and `dependents` (field -> fields that read it). The graph is always
/// acyclic: every mutation that would introduce a cycle is rejected atomically,
/// which is what lets the evaluator skip cycle detection entirely.
///
/// Mutations must be serialized by the owner (the engine holds the graph
/// behind `&mut self`); readers operate on plain `&self`.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependencies: HashMap<FieldId, HashSet<FieldId>>,
    dependents: HashMap<FieldId, HashSet<FieldId>>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            formula_fields: self.dependencies.len(),
            dependency_edges: self.dependencies.values().map(HashSet::len).sum(),
        }
    }

    /// (Re)register a computed field's dependency set, replacing any prior
    /// set for that field.
    ///
    /// Before committing, every new dependency is checked against the current
    /// reverse-edge closure of `field_id`: if a dependency already
    /// (transitively) reads `field_id` — or is `field_id` itself — the call
    /// fails and the graph is left unchanged.
    pub fn add_formula_field(
        &mut self,
        field_id: FieldId,
        dependencies: HashSet<FieldId>,
    ) -> Result<(), CycleError> {
        if dependencies.contains(&field_id) {
            return Err(CycleError { field_id });
        }
        if !dependencies.is_empty() {
            let downstream = self.reverse_closure(&field_id);
            if dependencies.iter().any(|dep| downstream.contains(dep)) {
                return Err(CycleError { field_id });
            }
        }

        self.detach_forward_edges(&field_id);
        for dep in &dependencies {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .insert(field_id.clone());
        }
        self.dependencies.insert(field_id, dependencies);
        Ok(())
    }

    /// Delete a field's forward edges and unregister it from every
    /// dependency's reverse-adjacency.
    ///
    /// Reverse edges *into* the removed field (formulas that read it) are kept;
    /// those formulas now resolve the field to null at evaluation time.
    pub fn remove_formula_field(&mut self, field_id: &FieldId) {
        self.detach_forward_edges(field_id);
        self.dependencies.remove(field_id);
    }

    /// Direct (one-hop) dependencies of `field_id`.
    #[must_use]
    pub fn dependencies_of(&self, field_id: &FieldId) -> HashSet<FieldId> {
        self.dependencies.get(field_id).cloned().unwrap_or_default()
    }

    /// Direct (one-hop) dependents of `field_id`.
    #[must_use]
    pub fn dependents_of(&self, field_id: &FieldId) -> HashSet<FieldId> {
        self.dependents.get(field_id).cloned().unwrap_or_default()
    }

    /// Every computed field whose value could change when `field_id` changes:
    /// the transitive closure over reverse edges, breadth-first, with
    /// deterministic ordering (nearest first, lexicographic within a level).
    #[must_use]
    pub fn affected_fields(&self, field_id: &FieldId) -> Vec<FieldId> {
        let mut out = Vec::new();
        let mut seen: HashSet<FieldId> = HashSet::new();
        let mut queue = VecDeque::new();

        seen.insert(field_id.clone());
        queue.push_back(field_id.clone());

        while let Some(current) = queue.pop_front() {
            let mut next: Vec<FieldId> = self
                .dependents
                .get(&current)
                .map(|deps| deps.iter().cloned().collect())
                .unwrap_or_default();
            next.sort();
            for dependent in next {
                if seen.insert(dependent.clone()) {
                    out.push(dependent.clone());
                    queue.push_back(dependent);
                }
            }
        }

        out
    }

    /// Topological ordering of `fields`, considering only dependency edges
    /// *within* the set (Kahn's algorithm with an ordered ready-queue, so the
    /// output is deterministic).
    ///
    /// Returns an empty list if a cycle is detected among the requested set —
    /// a defensive fallback that should be unreachable given the invariant
    /// maintained by [`DependencyGraph::add_formula_field`].
    #[must_use]
    pub fn evaluation_order(&self, fields: &HashSet<FieldId>) -> Vec<FieldId> {
        let mut in_degree: HashMap<&FieldId, usize> = HashMap::with_capacity(fields.len());
        for field in fields {
            let degree = self
                .dependencies
                .get(field)
                .map_or(0, |deps| deps.iter().filter(|d| fields.contains(*d)).count());
            in_degree.insert(field, degree);
        }

        let mut ready: BTreeSet<&FieldId> = in_degree
            .iter()
            .filter_map(|(field, &degree)| (degree == 0).then_some(*field))
            .collect();

        let mut out = Vec::with_capacity(fields.len());
        while let Some(field) = ready.pop_first() {
            out.push(field.clone());
            if let Some(dependents) = self.dependents.get(field) {
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            ready.insert(dependent);
                        }
                    }
                }
            }
        }

        if out.len() != fields.len() {
            return Vec::new();
        }
        out
    }

    /// Empty both adjacency maps.
    pub fn clear(&mut self) {
        self.dependencies.clear();
        self.dependents.clear();
    }

    /// All fields transitively reachable from `field_id` via reverse edges,
    /// including `field_id` itself. Iterative so adversarially large graphs
    /// cannot overflow the stack.
    fn reverse_closure(&self, field_id: &FieldId) -> HashSet<FieldId> {
        let mut seen: HashSet<FieldId> = HashSet::new();
        let mut queue = VecDeque::new();

        seen.insert(field_id.clone());
        queue.push_back(field_id.clone());

        while let Some(current) = queue.pop_front() {
            if let Some(dependents) = self.dependents.get(&current) {
                for dependent in dependents {
                    if seen.insert(dependent.clone()) {
                        queue.push_back(dependent.clone());
                    }
                }
            }
        }

        seen
    }

    fn detach_forward_edges(&mut self, field_id: &FieldId) {
        if let Some(old_deps) = self.dependencies.get_mut(field_id) {
            let old: Vec<FieldId> = old_deps.drain().collect();
            for dep in old {
                if let Some(set) = self.dependents.get_mut(&dep) {
                    set.remove(field_id);
                    if set.is_empty() {
                        self.dependents.remove(&dep);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> FieldId {
        FieldId::new(s)
    }

    fn set(ids: &[&str]) -> HashSet<FieldId> {
        ids.iter().map(|s| id(s)).collect()
    }

    #[test]
    fn replacing_dependencies_detaches_old_reverse_edges() {
        let mut graph = DependencyGraph::new();
        graph.add_formula_field(id("total"), set(&["price", "qty"])).unwrap();
        graph.add_formula_field(id("total"), set(&["qty"])).unwrap();

        assert!(graph.dependents_of(&id("price")).is_empty());
        assert_eq!(graph.dependents_of(&id("qty")), set(&["total"]));
        assert_eq!(
            graph.stats(),
            GraphStats {
                formula_fields: 1,
                dependency_edges: 1
            }
        );
    }

    #[test]
    fn rejected_update_leaves_graph_unchanged() {
        let mut graph = DependencyGraph::new();
        graph.add_formula_field(id("a"), set(&["b"])).unwrap();
        graph.add_formula_field(id("b"), set(&["c"])).unwrap();

        // b -> a would close the cycle a -> b -> a.
        let err = graph.add_formula_field(id("b"), set(&["a"])).unwrap_err();
        assert_eq!(err.to_string(), CycleError::MESSAGE);
        assert_eq!(graph.dependencies_of(&id("b")), set(&["c"]));
    }
}
