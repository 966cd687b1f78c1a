//! Directed graph of automatic type conversions.
//!
//! An edge A -> B means "a value classified as A can be converted to B" and
//! carries a pure conversion function plus an integer cost (>= 1). Dispatch
//! consults direct edges by default; multi-hop chains are an explicit opt-in
//! bounded by a maximum hop count so table lookup stays cheap and chain
//! selection stays deterministic.

use crate::error::{CallError, ConversionError};
use crate::registry::{TypeId, TypeRegistry};
use numera_values::Value;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Pure conversion from one runtime type to another; may fail, and its
/// failure propagates as-is rather than being folded into a no-match.
pub type ConversionFn = fn(&Value) -> Result<Value, CallError>;

/// A single registered conversion edge
#[derive(Debug, Clone)]
pub struct ConversionEdge {
    pub from: TypeId,
    pub to: TypeId,
    pub convert: ConversionFn,
    pub cost: u32,
}

/// A chain of conversion edges resolved for one argument position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPath {
    /// Indices into the graph's edge list, applied in order
    pub steps: Vec<usize>,
    pub total_cost: u32,
}

/// Conversion graph for one library instance
#[derive(Debug, Clone)]
pub struct ConversionGraph {
    graph: DiGraph<TypeId, usize>,
    nodes: HashMap<TypeId, NodeIndex>,
    edges: Vec<ConversionEdge>,
    by_pair: HashMap<(TypeId, TypeId), usize>,
}

impl ConversionGraph {
    /// Create an empty conversion graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
            edges: Vec::new(),
            by_pair: HashMap::new(),
        }
    }

    fn node(&mut self, id: TypeId) -> NodeIndex {
        if let Some(&index) = self.nodes.get(&id) {
            return index;
        }
        let index = self.graph.add_node(id);
        self.nodes.insert(id, index);
        index
    }

    /// Register a conversion edge between two registered types.
    /// Re-registering an existing edge with an identical cost is a no-op.
    pub fn add_conversion(
        &mut self,
        registry: &TypeRegistry,
        from: &str,
        to: &str,
        convert: ConversionFn,
        cost: u32,
    ) -> Result<(), ConversionError> {
        let from_id = registry.id_of(from)?;
        let to_id = registry.id_of(to)?;
        if from_id == to_id {
            return Err(ConversionError::SelfConversion {
                name: from.to_string(),
            });
        }
        if cost == 0 {
            return Err(ConversionError::InvalidCost {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        if let Some(&existing) = self.by_pair.get(&(from_id, to_id)) {
            let existing_cost = self.edges[existing].cost;
            if existing_cost == cost {
                return Ok(());
            }
            return Err(ConversionError::ConflictingEdge {
                from: from.to_string(),
                to: to.to_string(),
                existing: existing_cost,
                requested: cost,
            });
        }

        let edge_index = self.edges.len();
        self.edges.push(ConversionEdge {
            from: from_id,
            to: to_id,
            convert,
            cost,
        });
        self.by_pair.insert((from_id, to_id), edge_index);
        let source = self.node(from_id);
        let target = self.node(to_id);
        self.graph.add_edge(source, target, edge_index);
        Ok(())
    }

    /// Look up a direct conversion edge
    pub fn find_conversion(&self, from: TypeId, to: TypeId) -> Option<&ConversionEdge> {
        self.by_pair
            .get(&(from, to))
            .map(|&index| &self.edges[index])
    }

    /// Find the cheapest conversion chain of at most `max_hops` edges.
    /// Ties break on fewer hops, then on registration order, so the chosen
    /// chain is deterministic.
    pub fn find_path(&self, from: TypeId, to: TypeId, max_hops: usize) -> Option<ConversionPath> {
        if from == to || max_hops == 0 {
            return None;
        }
        let start = *self.nodes.get(&from)?;
        let goal = *self.nodes.get(&to)?;
        let mut best: Option<ConversionPath> = None;
        let mut trail = Vec::new();
        self.search(start, goal, max_hops, 0, &mut trail, &mut best);
        best
    }

    fn search(
        &self,
        node: NodeIndex,
        goal: NodeIndex,
        hops_left: usize,
        cost: u32,
        trail: &mut Vec<usize>,
        best: &mut Option<ConversionPath>,
    ) {
        if hops_left == 0 {
            return;
        }
        let mut outgoing: Vec<(usize, NodeIndex)> = self
            .graph
            .edges(node)
            .map(|edge| (*edge.weight(), edge.target()))
            .collect();
        outgoing.sort_by_key(|(index, _)| *index);

        for (edge_index, target) in outgoing {
            let step_cost = cost + self.edges[edge_index].cost;
            trail.push(edge_index);
            if target == goal {
                let candidate = ConversionPath {
                    steps: trail.clone(),
                    total_cost: step_cost,
                };
                let improves = match best {
                    None => true,
                    Some(current) => {
                        (candidate.total_cost, candidate.steps.len())
                            < (current.total_cost, current.steps.len())
                    }
                };
                if improves {
                    *best = Some(candidate);
                }
            } else {
                self.search(target, goal, hops_left - 1, step_cost, trail, best);
            }
            trail.pop();
        }
    }

    /// Apply a resolved conversion chain to a value
    pub fn apply(&self, path: &ConversionPath, value: &Value) -> Result<Value, CallError> {
        let mut current = value.clone();
        for &step in &path.steps {
            current = (self.edges[step].convert)(&current)?;
        }
        Ok(current)
    }

    /// Number of registered conversion edges
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Iterate registered edges in registration order
    pub fn edges(&self) -> impl Iterator<Item = &ConversionEdge> {
        self.edges.iter()
    }
}

impl Default for ConversionGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn is_number(value: &Value) -> bool {
        matches!(value, Value::Number(_))
    }

    fn is_boolean(value: &Value) -> bool {
        matches!(value, Value::Boolean(_))
    }

    fn is_string(value: &Value) -> bool {
        matches!(value, Value::Str(_))
    }

    fn boolean_to_number(value: &Value) -> Result<Value, CallError> {
        match value {
            Value::Boolean(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
            other => Err(CallError::conversion_failed(
                "boolean",
                "number",
                format!("value is {}", other.type_name()),
            )),
        }
    }

    fn number_to_string(value: &Value) -> Result<Value, CallError> {
        match value {
            Value::Number(n) => Ok(Value::Str(n.to_string())),
            other => Err(CallError::conversion_failed(
                "number",
                "string",
                format!("value is {}", other.type_name()),
            )),
        }
    }

    fn test_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register("boolean", is_boolean, 10).unwrap();
        registry.register("number", is_number, 20).unwrap();
        registry.register("string", is_string, 30).unwrap();
        registry
    }

    #[test]
    fn test_unknown_type_rejected() {
        let registry = test_registry();
        let mut graph = ConversionGraph::new();
        let result = graph.add_conversion(&registry, "boolean", "missing", boolean_to_number, 1);
        assert!(matches!(result, Err(ConversionError::Registry(_))));
    }

    #[test]
    fn test_conflicting_cost_rejected_identical_allowed() {
        let registry = test_registry();
        let mut graph = ConversionGraph::new();
        graph
            .add_conversion(&registry, "boolean", "number", boolean_to_number, 1)
            .unwrap();
        // Identical re-registration is idempotent.
        graph
            .add_conversion(&registry, "boolean", "number", boolean_to_number, 1)
            .unwrap();
        assert_eq!(graph.len(), 1);

        let result = graph.add_conversion(&registry, "boolean", "number", boolean_to_number, 2);
        assert!(matches!(
            result,
            Err(ConversionError::ConflictingEdge { existing: 1, requested: 2, .. })
        ));
    }

    #[test]
    fn test_direct_lookup_and_apply() {
        let registry = test_registry();
        let mut graph = ConversionGraph::new();
        graph
            .add_conversion(&registry, "boolean", "number", boolean_to_number, 1)
            .unwrap();

        let from = registry.id_of("boolean").unwrap();
        let to = registry.id_of("number").unwrap();
        let edge = graph.find_conversion(from, to).unwrap();
        assert_eq!(edge.cost, 1);
        assert!(graph.find_conversion(to, from).is_none());

        let path = graph.find_path(from, to, 1).unwrap();
        assert_eq!(path.total_cost, 1);
        assert_eq!(
            graph.apply(&path, &Value::Boolean(true)).unwrap(),
            Value::Number(1.0)
        );
    }

    #[test]
    fn test_hop_limit_bounds_search() {
        let registry = test_registry();
        let mut graph = ConversionGraph::new();
        graph
            .add_conversion(&registry, "boolean", "number", boolean_to_number, 1)
            .unwrap();
        graph
            .add_conversion(&registry, "number", "string", number_to_string, 1)
            .unwrap();

        let from = registry.id_of("boolean").unwrap();
        let to = registry.id_of("string").unwrap();
        assert!(graph.find_path(from, to, 1).is_none());

        let path = graph.find_path(from, to, 2).unwrap();
        assert_eq!(path.total_cost, 2);
        assert_eq!(path.steps.len(), 2);
        assert_eq!(
            graph.apply(&path, &Value::Boolean(true)).unwrap(),
            Value::Str("1".to_string())
        );
    }

    #[test]
    fn test_failed_conversion_propagates_own_error() {
        let registry = test_registry();
        let mut graph = ConversionGraph::new();
        graph
            .add_conversion(&registry, "boolean", "number", boolean_to_number, 1)
            .unwrap();
        let from = registry.id_of("boolean").unwrap();
        let to = registry.id_of("number").unwrap();
        let path = graph.find_path(from, to, 1).unwrap();
        // Feeding the wrong value surfaces the conversion's own error.
        let err = graph.apply(&path, &Value::Str("x".to_string())).unwrap_err();
        assert!(matches!(err, CallError::ConversionFailed { .. }));
    }
}
