//! The authoritative node/edge store.
//!
//! All structural mutations requested by the canvas UI go through
//! [`WorkflowGraph`] methods; node ids are minted here and node kinds are
//! immutable after creation. Mutation and deletion are store capabilities
//! rather than closures embedded in node data.

use flowbench_types::{Edge, FlowError, Node, NodeData, NodeKind, Position, Result};

use crate::styling;

/// Ordered collection of nodes and directed edges, mutated by user
/// interaction (add, move, connect, delete).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default session graph: a single empty dataset node.
    pub fn seed() -> Self {
        let mut graph = Self::new();
        let id = graph.add_node(NodeKind::Dataset, Position::new(50.0, 50.0));
        if let Some(node) = graph.node_mut_internal(&id) {
            if let NodeData::Dataset { label, .. } = &mut node.data {
                *label = "Dataset Node".to_string();
            }
        }
        graph
    }

    /// Rebuild a graph from persisted parts, re-running the edge-sync pass
    /// so stale styles and dangling edges never survive a restore.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut graph = Self { nodes, edges };
        graph.sync_edges();
        graph
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub(crate) fn node_mut_internal(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// The source node of the unique edge into `id`, if any.
    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        let edge = self.edges.iter().find(|e| e.target == id)?;
        self.node(&edge.source)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    /// Create a node with kind-appropriate default data. Always succeeds;
    /// returns the minted id.
    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.nodes.push(Node {
            id: id.clone(),
            position,
            data: NodeData::default_for(kind),
        });
        tracing::debug!(%id, %kind, "node added");
        id
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> Result<()> {
        let node = self
            .node_mut_internal(id)
            .ok_or_else(|| FlowError::UnknownNode { id: id.to_string() })?;
        node.position = position;
        Ok(())
    }

    /// Replace the data bag of `id`. The node's kind cannot change. If a
    /// dataset node's `columns` changed, the new list is propagated onto
    /// every model node so downstream target-column selectors stay in sync.
    pub fn update_node_data(&mut self, id: &str, data: NodeData) -> Result<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| FlowError::UnknownNode { id: id.to_string() })?;
        if node.kind() != data.kind() {
            return Err(FlowError::KindMismatch {
                id: id.to_string(),
                expected: node.kind(),
                actual: data.kind(),
            });
        }

        let propagate = match (&node.data, &data) {
            (
                NodeData::Dataset { columns: old, .. },
                NodeData::Dataset { columns: new, .. },
            ) if old != new => Some(new.clone()),
            _ => None,
        };
        node.data = data;

        if let Some(cols) = propagate {
            for node in &mut self.nodes {
                if let NodeData::Model { columns, .. } = &mut node.data {
                    *columns = cols.clone();
                }
            }
            tracing::debug!(dataset = %id, "dataset columns propagated to model nodes");
        }
        Ok(())
    }

    /// Remove a node. Edges referencing it are dropped by the edge-sync
    /// pass rather than an explicit cascade.
    pub fn delete_node(&mut self, id: &str) {
        self.nodes.retain(|n| n.id != id);
        self.sync_edges();
    }

    /// Create an edge from `source` to `target`, colored by the source
    /// kind. Any pre-existing edge into `target` is removed first (fan-in
    /// is at most 1; fan-out is unrestricted).
    pub fn connect(&mut self, source: &str, target: &str) -> Result<String> {
        let source_kind = self
            .node(source)
            .map(|n| n.kind())
            .ok_or_else(|| FlowError::UnknownNode { id: source.to_string() })?;
        if self.node(target).is_none() {
            return Err(FlowError::UnknownNode { id: target.to_string() });
        }

        self.edges.retain(|e| e.target != target);

        let id = uuid::Uuid::new_v4().to_string();
        self.edges.push(Edge {
            id: id.clone(),
            source: source.to_string(),
            target: target.to_string(),
            animated: true,
            style: styling::style_for(Some(source_kind)),
        });
        Ok(id)
    }

    /// The reactive styling pass: drop edges whose endpoints no longer
    /// exist, and recolor every edge from its current source node's kind.
    /// Idempotent; a no-op when nothing changed.
    pub fn sync_edges(&mut self) {
        let ids: std::collections::HashSet<&str> =
            self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .retain(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()));

        for edge in &mut self.edges {
            let kind = self
                .nodes
                .iter()
                .find(|n| n.id == edge.source)
                .map(|n| n.kind());
            edge.style = styling::style_for(kind);
        }
    }

    /// Incoming edge count for `id`. `connect` keeps this at most 1; it can
    /// only exceed that in hand-edited workflow files.
    pub fn fan_in(&self, id: &str) -> usize {
        self.edges.iter().filter(|e| e.target == id).count()
    }
}
