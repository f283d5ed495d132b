//! # Graph Compiler
//!
//! Turns (graph, entry node) into an executable [`Program`].
//!
//! Compilation runs in three phases:
//!
//! 1. **Constants**: walk the flow chain from the entry; for every reachable
//!    node, parse its immediates into the constants vector and mark it used.
//!    Nodes unreachable from the entry never appear in the program.
//! 2. **Slot layout**: constants occupy the first slots, the entry's output
//!    block (the program's argument slots) comes next, then one output block
//!    per used node; link inputs resolve to their producer's output slot.
//! 3. **Emission**: walk the flow chain again. Before each sequenced node
//!    runs, its pure data dependencies are refreshed on demand - a pure node
//!    is re-emitted exactly when it has never run or some transitive pure
//!    input ran more recently, and at most once per step. Reading a
//!    sequenced dependency that has not yet run is a sequencing error.
//!
//! Emission order is fully deterministic: the flow chain fixes sequenced
//! order, and pure dependencies are visited in input pin order.

use smallvec::SmallVec;

use crate::catalog::NodeKind;
use crate::graph::{Graph, Wire};
use crate::registry::{QualType, TypeRegistry, Value};
use crate::runtime::{Line, Program, MAX_INPUTS};
use crate::{NodeflowError, Result};

/// Compiles a graph into a program, starting from an event node.
///
/// # Example
///
/// ```no_run
/// # fn demo(graph: &nodeflow::Graph, registry: &nodeflow::TypeRegistry) -> nodeflow::Result<()> {
/// let program = nodeflow::compile(graph, 0, registry)?;
/// program.run(&[])?;
/// # Ok(())
/// # }
/// ```
pub fn compile(graph: &Graph, entry: usize, registry: &TypeRegistry) -> Result<Program> {
    Compiler::new(graph, registry).compile(entry)
}

struct SlotRecord {
    input_slots: Vec<usize>,
    output_slots: Vec<usize>,
    used: bool,
    timestamp: usize,
    in_stack: bool,
}

struct Compiler<'a> {
    graph: &'a Graph,
    registry: &'a TypeRegistry,
    records: Vec<SlotRecord>,
    constants: Vec<Value>,
    lines: Vec<Line>,
    timestamp: usize,
}

impl<'a> Compiler<'a> {
    fn new(graph: &'a Graph, registry: &'a TypeRegistry) -> Self {
        let records = graph
            .nodes
            .iter()
            .map(|node| SlotRecord {
                input_slots: vec![0; node.node_type.input_count()],
                output_slots: vec![0; node.node_type.output_count()],
                used: false,
                timestamp: 0,
                in_stack: false,
            })
            .collect();
        Self {
            graph,
            registry,
            records,
            constants: Vec::new(),
            lines: Vec::new(),
            timestamp: 0,
        }
    }

    fn compile(mut self, entry: usize) -> Result<Program> {
        let entry_node = self
            .graph
            .nodes
            .get(entry)
            .ok_or(NodeflowError::InvalidEntry { node: entry })?;
        if entry_node.node_type.kind() != NodeKind::Event {
            return Err(NodeflowError::InvalidEntry { node: entry });
        }

        // Compile all constants and mark used nodes
        let chain = self.flow_chain(entry)?;
        for &index in &chain {
            self.compile_constants(index)?;
        }

        // The interpreter passes inputs through a fixed-size array
        for index in 0..self.records.len() {
            let count = self.graph.nodes[index].node_type.input_count();
            if self.records[index].used && count > MAX_INPUTS {
                return Err(NodeflowError::ArityOverflow { node: index, count });
            }
        }

        // Reserve output slot blocks: the entry first, so its outputs sit
        // directly after the constants and form the argument block
        let mut total = self.constants.len();
        self.reserve_outputs(entry, &mut total);
        for index in 0..self.records.len() {
            if index != entry && self.records[index].used {
                self.reserve_outputs(index, &mut total);
            }
        }

        // Resolve link inputs to producer output slots
        for index in 0..self.records.len() {
            if !self.records[index].used {
                continue;
            }
            for (pin, wire) in self.graph.nodes[index].inputs.iter().enumerate() {
                if let Wire::Link { node, pin: src_pin } = wire {
                    let slot = self.records[*node].output_slots[*src_pin];
                    self.records[index].input_slots[pin] = slot;
                }
            }
        }

        // Emit calls in flow order, refreshing pure dependencies on demand
        for &index in &chain {
            self.timestamp += 1;
            for wire in &self.graph.nodes[index].inputs {
                if let Wire::Link { node, .. } = wire {
                    self.refresh_pure_node(*node)?;
                }
            }
            self.emit_line(index);
        }

        let arg_types: Vec<QualType> = entry_node
            .node_type
            .outputs()
            .iter()
            .map(|pin| pin.ty)
            .collect();
        tracing::debug!(
            lines = self.lines.len(),
            slots = total,
            constants = self.constants.len(),
            args = arg_types.len(),
            "graph compiled"
        );
        Program::load(self.constants, arg_types, self.lines)
    }

    /// Follows flow outputs from the entry, rejecting loops.
    fn flow_chain(&self, entry: usize) -> Result<Vec<usize>> {
        let mut chain = Vec::new();
        let mut on_chain = vec![false; self.graph.nodes.len()];
        let mut next = Some(entry);
        while let Some(index) = next {
            let node = self.graph.nodes.get(index).ok_or_else(|| {
                NodeflowError::InvalidConnection(format!("flow wire to missing node {index}"))
            })?;
            if on_chain[index] {
                return Err(NodeflowError::CyclicDependency { node: index });
            }
            on_chain[index] = true;
            chain.push(index);
            next = node.flow_next;
        }
        Ok(chain)
    }

    /// Marks a node used and folds its immediates into constant slots.
    ///
    /// Recurses through data links, so every node reachable from the flow
    /// chain is visited exactly once.
    fn compile_constants(&mut self, index: usize) -> Result<()> {
        if self.records[index].used {
            return Ok(());
        }
        self.records[index].used = true;

        let node = &self.graph.nodes[index];
        for (pin, wire) in node.inputs.iter().enumerate() {
            match wire {
                Wire::Unbound => {
                    return Err(NodeflowError::UnboundInput { node: index, pin });
                }
                Wire::Immediate(text) => {
                    let ty = node.node_type.inputs()[pin].ty;
                    let parser = self.registry.literal_parser(ty.ty).ok_or_else(|| {
                        NodeflowError::UnsupportedImmediate {
                            node: index,
                            pin,
                            type_name: self.registry.display_name(ty.ty).to_string(),
                        }
                    })?;
                    let value =
                        parser(text).ok_or_else(|| NodeflowError::ImmediateParse {
                            node: index,
                            pin,
                            type_name: self.registry.display_name(ty.ty).to_string(),
                            text: text.clone(),
                        })?;
                    self.constants.push(value);
                    self.records[index].input_slots[pin] = self.constants.len() - 1;
                }
                Wire::Link { node: src, pin: src_pin } => {
                    let (src, src_pin) = (*src, *src_pin);
                    let producer = self
                        .graph
                        .nodes
                        .get(src)
                        .ok_or(NodeflowError::InvalidWire { node: index, pin })?;
                    if src_pin >= producer.node_type.output_count() {
                        return Err(NodeflowError::InvalidWire { node: index, pin });
                    }
                    self.compile_constants(src)?;
                }
            }
        }
        Ok(())
    }

    fn reserve_outputs(&mut self, index: usize, total: &mut usize) {
        let record = &mut self.records[index];
        for (pin, slot) in record.output_slots.iter_mut().enumerate() {
            *slot = *total + pin;
        }
        *total += record.output_slots.len();
    }

    /// Re-emits a pure dependency when it is stale; verifies sequenced
    /// dependencies have already run.
    fn refresh_pure_node(&mut self, index: usize) -> Result<()> {
        let node = &self.graph.nodes[index];

        // A sequenced node runs where it sits on the flow chain; reading it
        // before that point is an error, and it is never re-emitted here
        if node.node_type.is_sequenced() {
            if self.records[index].timestamp == 0 {
                return Err(NodeflowError::Sequencing { node: index });
            }
            return Ok(());
        }

        if self.records[index].timestamp == self.timestamp {
            return Ok(()); // already refreshed this step
        }
        if self.records[index].in_stack {
            return Err(NodeflowError::CyclicDependency { node: index });
        }
        self.records[index].in_stack = true;

        let mut needs_update = self.records[index].timestamp == 0;
        for wire in &node.inputs {
            if let Wire::Link { node: dep, .. } = wire {
                let dep = *dep;
                self.refresh_pure_node(dep)?;
                if self.records[dep].timestamp > self.records[index].timestamp {
                    needs_update = true;
                }
            }
        }

        self.records[index].in_stack = false;
        if needs_update {
            self.emit_line(index);
        }
        Ok(())
    }

    fn emit_line(&mut self, index: usize) {
        let node = &self.graph.nodes[index];
        // The entry's output slots are written by the interpreter's argument
        // installation, not by evaluating the event
        let outputs: SmallVec<[usize; 4]> = if node.node_type.kind() == NodeKind::Event {
            SmallVec::new()
        } else {
            self.records[index].output_slots.iter().copied().collect()
        };
        tracing::trace!(node = index, id = node.node_type.id(), "emit line");
        self.lines.push(Line {
            node_type: node.node_type.clone(),
            inputs: self.records[index].input_slots.iter().copied().collect(),
            outputs,
        });
        self.records[index].timestamp = self.timestamp;
    }
}
