//! # Graph Model
//!
//! Nodes, data wires, and flow wires - the mutable structure an editor works
//! on and the compiler consumes.
//!
//! All references between nodes are indices into the graph's node list.
//! Editor state (position, selection) rides along on nodes but has no effect
//! on execution.
//!
//! # Example
//!
//! ```no_run
//! use nodeflow::{Graph, Node, NodeType};
//!
//! # fn demo(start: &NodeType, mul: &NodeType) -> nodeflow::Result<()> {
//! let mut graph = Graph::new();
//! let entry = graph.add(Node::new(start, 0, 0));
//! let product = graph.add(Node::new(mul, 200, 0));
//! graph.set_immediate(product, 0, "2")?;
//! graph.set_immediate(product, 1, "3")?;
//! graph.connect_flow(entry, product)?;
//! # Ok(())
//! # }
//! ```

use std::cmp::Ordering;

use crate::catalog::NodeType;
use crate::registry::TypeRegistry;
use crate::runtime::Program;
use crate::{NodeflowError, Result};

/// The binding of one input pin.
///
/// Exactly one of the three states holds: wired to a producer pin, given a
/// textual immediate (parsed into a constant at compile time), or unbound
/// (a compile error if the pin is reached).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Wire {
    /// Not hooked up yet
    #[default]
    Unbound,

    /// Textual literal, parsed at the pin's type during compilation
    Immediate(String),

    /// Data link to another node's output pin
    Link { node: usize, pin: usize },
}

impl Wire {
    /// Whether this wire links to a producer.
    #[inline]
    pub fn is_link(&self) -> bool {
        matches!(self, Wire::Link { .. })
    }

    /// Whether this wire supplies anything at all.
    #[inline]
    pub fn is_bound(&self) -> bool {
        !matches!(self, Wire::Unbound)
    }
}

/// One node in a graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// The node's type (shared, immutable)
    pub node_type: NodeType,

    /// One wire per input pin
    pub inputs: Vec<Wire>,

    /// Flow wire passing execution onward after this node runs
    pub flow_next: Option<usize>,

    /// Editor position; serialized but ignored by execution
    pub position: (i32, i32),

    /// Editor selection flag; never serialized
    pub selected: bool,
}

impl Node {
    /// Creates a node of the given type with all inputs unbound.
    pub fn new(node_type: &NodeType, x: i32, y: i32) -> Self {
        Self {
            inputs: vec![Wire::Unbound; node_type.input_count()],
            node_type: node_type.clone(),
            flow_next: None,
            position: (x, y),
            selected: false,
        }
    }
}

/// An ordered list of nodes wired together by index.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// All nodes; wire and flow references index into this list
    pub nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Appends a node, returning its index.
    pub fn add(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Wires a producer output pin into a consumer input pin.
    ///
    /// Only type-identity compatibility is checked; the passing mode of the
    /// consuming pin decides how the slot is read at run time. The input
    /// side holds exactly one wire, so the last connection wins.
    pub fn connect_data(&mut self, source: (usize, usize), target: (usize, usize)) -> Result<()> {
        let (src, src_pin) = source;
        let (dst, dst_pin) = target;
        let out_ty = self
            .nodes
            .get(src)
            .and_then(|n| n.node_type.outputs().get(src_pin))
            .ok_or_else(|| {
                NodeflowError::InvalidConnection(format!("no output pin {src_pin} on node {src}"))
            })?
            .ty;
        let in_ty = self
            .nodes
            .get(dst)
            .and_then(|n| n.node_type.inputs().get(dst_pin))
            .ok_or_else(|| {
                NodeflowError::InvalidConnection(format!("no input pin {dst_pin} on node {dst}"))
            })?
            .ty;
        if out_ty.ty != in_ty.ty {
            return Err(NodeflowError::TypeMismatch {
                expected: in_ty.ty.rust_name().to_string(),
                actual: out_ty.ty.rust_name().to_string(),
            });
        }
        self.nodes[dst].inputs[dst_pin] = Wire::Link {
            node: src,
            pin: src_pin,
        };
        Ok(())
    }

    /// Wires one node's flow output to another's flow input.
    pub fn connect_flow(&mut self, from: usize, to: usize) -> Result<()> {
        let from_node = self.nodes.get(from).ok_or_else(|| {
            NodeflowError::InvalidConnection(format!("no node {from}"))
        })?;
        if !from_node.node_type.has_out_flow() {
            return Err(NodeflowError::InvalidConnection(format!(
                "node {from} has no flow output"
            )));
        }
        let to_node = self.nodes.get(to).ok_or_else(|| {
            NodeflowError::InvalidConnection(format!("no node {to}"))
        })?;
        if !to_node.node_type.has_in_flow() {
            return Err(NodeflowError::InvalidConnection(format!(
                "node {to} has no flow input"
            )));
        }
        self.nodes[from].flow_next = Some(to);
        Ok(())
    }

    /// Attaches a textual immediate to an input pin.
    pub fn set_immediate(
        &mut self,
        node: usize,
        pin: usize,
        text: impl Into<String>,
    ) -> Result<()> {
        let wire = self
            .nodes
            .get_mut(node)
            .and_then(|n| n.inputs.get_mut(pin))
            .ok_or(NodeflowError::InvalidWire { node, pin })?;
        *wire = Wire::Immediate(text.into());
        Ok(())
    }

    /// Unbinds an input pin.
    pub fn disconnect(&mut self, node: usize, pin: usize) -> Result<()> {
        let wire = self
            .nodes
            .get_mut(node)
            .and_then(|n| n.inputs.get_mut(pin))
            .ok_or(NodeflowError::InvalidWire { node, pin })?;
        *wire = Wire::Unbound;
        Ok(())
    }

    /// Clears a node's flow output.
    pub fn clear_flow(&mut self, node: usize) -> Result<()> {
        let node = self
            .nodes
            .get_mut(node)
            .ok_or(NodeflowError::InvalidWire { node, pin: 0 })?;
        node.flow_next = None;
        Ok(())
    }

    /// Removes a node and repairs every index reference.
    ///
    /// Wires and flow links to the removed node become unbound; references
    /// past it shift down by one. Out-of-range indices are ignored.
    pub fn delete_node(&mut self, index: usize) {
        if index >= self.nodes.len() {
            return;
        }
        self.nodes.remove(index);
        for node in &mut self.nodes {
            for wire in &mut node.inputs {
                if let Wire::Link { node: target, .. } = wire {
                    match (*target).cmp(&index) {
                        Ordering::Equal => *wire = Wire::Unbound,
                        Ordering::Greater => *target -= 1,
                        Ordering::Less => {}
                    }
                }
            }
            node.flow_next = match node.flow_next {
                Some(next) if next == index => None,
                Some(next) if next > index => Some(next - 1),
                other => other,
            };
        }
        tracing::debug!(index, remaining = self.nodes.len(), "node deleted");
    }

    /// Compiles this graph starting from an event node.
    pub fn compile(&self, entry: usize, registry: &TypeRegistry) -> Result<Program> {
        crate::compiler::compile(self, entry, registry)
    }
}
