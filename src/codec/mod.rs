//! # Graph Codec
//!
//! Translation between a [`Graph`] and a plain document tree of node
//! records, used by host persistence.
//!
//! One record per node, in graph order:
//!
//! | Key     | Type            | Meaning                                      |
//! |---------|-----------------|----------------------------------------------|
//! | `x`,`y` | integers        | editor position                              |
//! | `id`    | string          | node type id, resolved against the catalog   |
//! | `wires` | array           | one entry per input pin                      |
//! | `next`  | integer or null | flow output index, only for out-flow nodes   |
//!
//! Wire entries are `null` (unbound), a string (immediate literal), or an
//! object `{ "node": n, "pin": p }` (data link). The codec validates shape
//! only; reference bounds and type compatibility are the compiler's concern.

use serde::{Deserialize, Serialize};

use crate::catalog::NodeCatalog;
use crate::graph::{Graph, Node, Wire};
use crate::{NodeflowError, Result};

/// One node's persisted form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Editor x position
    pub x: i64,

    /// Editor y position
    pub y: i64,

    /// Node type id
    pub id: String,

    /// One entry per input pin; omitted when the node has no inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wires: Option<Vec<Option<WireRecord>>>,

    /// Flow output index (-1 when unset); present only for out-flow nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<i64>,
}

/// A bound wire's persisted form. Unbound wires persist as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireRecord {
    /// Data link to another record's output pin
    Link { node: usize, pin: usize },

    /// Immediate literal text
    Immediate(String),
}

/// Serializes a graph to node records, in graph order.
///
/// Wires are emitted in input pin order; `next` is emitted only for nodes
/// whose type has out-flow. Selection state is not persisted.
pub fn save_graph(graph: &Graph) -> Vec<NodeRecord> {
    graph
        .nodes
        .iter()
        .map(|node| {
            let wires: Vec<Option<WireRecord>> = node
                .inputs
                .iter()
                .map(|wire| match wire {
                    Wire::Unbound => None,
                    Wire::Immediate(text) if text.is_empty() => None,
                    Wire::Immediate(text) => Some(WireRecord::Immediate(text.clone())),
                    Wire::Link { node, pin } => Some(WireRecord::Link {
                        node: *node,
                        pin: *pin,
                    }),
                })
                .collect();
            NodeRecord {
                x: node.position.0 as i64,
                y: node.position.1 as i64,
                id: node.node_type.id().to_string(),
                wires: if wires.is_empty() { None } else { Some(wires) },
                next: if node.node_type.has_out_flow() {
                    Some(node.flow_next.map_or(-1, |next| next as i64))
                } else {
                    None
                },
            }
        })
        .collect()
}

/// Reconstructs a graph from node records against a catalog.
///
/// Fails with [`NodeflowError::UnknownNodeType`] when an id is not in the
/// catalog, and with [`NodeflowError::WireCountMismatch`] when a record's
/// wire array disagrees with its node type's input pin count. Link targets
/// are not bounds-checked here.
pub fn load_graph(catalog: &NodeCatalog, records: &[NodeRecord]) -> Result<Graph> {
    let mut graph = Graph::new();
    for record in records {
        let node_type = catalog
            .find(&record.id)
            .ok_or_else(|| NodeflowError::UnknownNodeType {
                id: record.id.clone(),
            })?;
        let mut node = Node::new(node_type, record.x as i32, record.y as i32);

        let empty = Vec::new();
        let wires = record.wires.as_ref().unwrap_or(&empty);
        if wires.len() != node.inputs.len() {
            return Err(NodeflowError::WireCountMismatch {
                id: record.id.clone(),
                got: wires.len(),
                want: node.inputs.len(),
            });
        }
        for (wire, entry) in node.inputs.iter_mut().zip(wires) {
            *wire = match entry {
                None => Wire::Unbound,
                Some(WireRecord::Immediate(text)) => Wire::Immediate(text.clone()),
                Some(WireRecord::Link { node, pin }) => Wire::Link {
                    node: *node,
                    pin: *pin,
                },
            };
        }

        node.flow_next = match record.next {
            Some(next) if next >= 0 => Some(next as usize),
            _ => None,
        };
        graph.add(node);
    }
    tracing::debug!(nodes = graph.nodes.len(), "graph loaded");
    Ok(graph)
}

/// Serializes a graph to a JSON document value.
pub fn save_json(graph: &Graph) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(save_graph(graph))?)
}

/// Reconstructs a graph from a JSON document value.
pub fn load_json(catalog: &NodeCatalog, document: serde_json::Value) -> Result<Graph> {
    let records: Vec<NodeRecord> = serde_json::from_value(document)?;
    load_graph(catalog, &records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_record_forms() {
        let link: WireRecord = serde_json::from_str(r#"{"node": 2, "pin": 0}"#).unwrap();
        assert_eq!(link, WireRecord::Link { node: 2, pin: 0 });

        let immediate: WireRecord = serde_json::from_str(r#""3.14""#).unwrap();
        assert_eq!(immediate, WireRecord::Immediate("3.14".to_string()));

        let unbound: Option<WireRecord> = serde_json::from_str("null").unwrap();
        assert_eq!(unbound, None);
    }

    #[test]
    fn record_without_wires_or_next() {
        let record: NodeRecord =
            serde_json::from_str(r#"{"x": 10, "y": 20, "id": "event:Start"}"#).unwrap();
        assert_eq!(record.id, "event:Start");
        assert!(record.wires.is_none());
        assert!(record.next.is_none());

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("wires"));
        assert!(!json.contains("next"));
    }

    #[test]
    fn record_next_accepts_null() {
        let record: NodeRecord =
            serde_json::from_str(r#"{"x": 0, "y": 0, "id": "n", "next": null}"#).unwrap();
        assert!(record.next.is_none());
    }
}
