//! Stage dependency graph module.
//!
//! Provides the `StageGraph` type, which records which stage reads a
//! scratch field written by which other stage. The pipeline uses it to
//! check that its registration order runs every writer before its readers.

use crate::error::VariableError;
use crate::stage_id::StageId;
use crate::state::ScratchField;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};

/// A directed graph of scratch-field dependencies between stages.
///
/// An edge goes from the writer of a field to each of its readers.
///
/// # Examples
///
/// ```rust
/// use adqstat::graph::StageGraph;
/// use adqstat::state::ScratchField;
/// use adqstat::StageId;
///
/// let dtg = StageId::from_str("DTG by plant");
/// let nodu = StageId::from_str("NODU by plant");
///
/// let mut graph = StageGraph::new();
/// let field = ScratchField::ThermalClusterProductionForYear;
/// graph.add_dependency(nodu.clone(), dtg.clone(), field);
///
/// assert!(graph.check_order(&[dtg.clone(), nodu.clone()]).is_ok());
/// assert!(graph.check_order(&[nodu, dtg]).is_err());
/// ```
pub struct StageGraph {
    graph: DiGraph<StageId, ScratchField>,
    node_map: HashMap<StageId, NodeIndex>,
}

impl StageGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Add a node if it doesn't exist and return its index.
    pub fn add_node(&mut self, stage: StageId) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&stage) {
            idx
        } else {
            let idx = self.graph.add_node(stage.clone());
            self.node_map.insert(stage, idx);
            idx
        }
    }

    /// `reader` consumes `field`, written by `writer`.
    pub fn add_dependency(&mut self, reader: StageId, writer: StageId, field: ScratchField) {
        let reader_idx = self.add_node(reader);
        let writer_idx = self.add_node(writer);
        self.graph.add_edge(writer_idx, reader_idx, field);
    }

    /// Detect circular dependencies.
    pub fn detect_cycles(&self) -> Result<(), VariableError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node_idx in self.graph.node_indices() {
            if !visited.contains(&node_idx) {
                let mut path = Vec::new();
                if let Some(cycle) =
                    self.dfs_cycle_detect(node_idx, &mut visited, &mut rec_stack, &mut path)
                {
                    return Err(cycle);
                }
            }
        }

        Ok(())
    }

    fn dfs_cycle_detect(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        rec_stack: &mut HashSet<NodeIndex>,
        path: &mut Vec<StageId>,
    ) -> Option<VariableError> {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(self.graph[node].clone());

        for neighbor in self
            .graph
            .neighbors_directed(node, petgraph::Direction::Outgoing)
        {
            if !visited.contains(&neighbor) {
                if let Some(cycle) = self.dfs_cycle_detect(neighbor, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(&neighbor) {
                let neighbor_stage = self.graph[neighbor].clone();
                let start = path.iter().position(|s| s == &neighbor_stage).unwrap_or(0);
                let mut cycle: Vec<StageId> = path[start..].to_vec();
                cycle.push(neighbor_stage);
                return Some(VariableError::Cycle { path: cycle });
            }
        }

        rec_stack.remove(&node);
        path.pop();
        None
    }

    /// Check that `order` runs every writer before the readers of its fields.
    pub fn check_order(&self, order: &[StageId]) -> Result<(), VariableError> {
        self.detect_cycles()?;

        let position: HashMap<&StageId, usize> =
            order.iter().enumerate().map(|(pos, id)| (id, pos)).collect();
        for edge in self.graph.edge_references() {
            let writer = &self.graph[edge.source()];
            let reader = &self.graph[edge.target()];
            match (position.get(writer), position.get(reader)) {
                (Some(w), Some(r)) if w < r => {}
                _ => {
                    return Err(VariableError::ScratchReadBeforeWrite {
                        reader: reader.clone(),
                        writer: writer.clone(),
                        field: *edge.weight(),
                    })
                }
            }
        }
        Ok(())
    }
}

impl Default for StageGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROD: ScratchField = ScratchField::ThermalClusterProductionForYear;
    const PMIN: ScratchField = ScratchField::ThermalClusterPMinForYear;

    #[test]
    fn test_cycle_path() {
        let mut graph = StageGraph::new();
        let a = StageId::from_str("A");
        let b = StageId::from_str("B");
        graph.add_dependency(b.clone(), a.clone(), PROD);
        graph.add_dependency(a.clone(), b.clone(), PMIN);

        match graph.detect_cycles() {
            Err(VariableError::Cycle { path }) => {
                assert_eq!(path.len(), 3);
                assert_eq!(path[0], path[2]);
            }
            other => panic!("Expected Cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_check_order_reports_offending_pair() {
        let mut graph = StageGraph::new();
        let w = StageId::from_str("W");
        let r = StageId::from_str("R");
        graph.add_dependency(r.clone(), w.clone(), PROD);

        assert_eq!(
            graph.check_order(&[r.clone(), w.clone()]),
            Err(VariableError::ScratchReadBeforeWrite {
                reader: r,
                writer: w,
                field: PROD
            })
        );
    }
}
