//! # Nodeflow - Typed Node-Graph Scripting Runtime
//!
//! Nodeflow lets a host application expose its types and functions to a
//! data-driven node graph, compile one graph into a flat program, and execute
//! that program by passing values between node invocations.
//!
//! ## Architecture
//!
//! Nodeflow follows a linear pipeline:
//!
//! ```text
//! ┌─────────────────┐
//! │  Type Registry  │  (Host types, records, functions)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  Node Catalog   │  (Event / Function / Split / Build node types)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  Graph          │  (Nodes, data wires, flow wires)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  Compiler       │  (Constant folding, slot layout,
//! │                 │   demand-driven pure ordering)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  Program        │  (Straight-line slot machine,
//! │  + Interpreter  │   event argument binding)
//! └─────────────────┘
//! ```
//!
//! The [`codec`] module sits beside the pipeline and translates graphs to and
//! from a plain document tree for persistence.
//!
//! ## Core Concepts
//!
//! ### Values
//! All runtime data lives in [`Value`] cells: owned, dynamically typed
//! containers tagged with a [`TypeKey`]. Cloning a `Value` shares the cell;
//! evaluators borrow from it or move out of it depending on the declared
//! parameter passing mode.
//!
//! ### Node Types
//! - **Event**: an entry point; its declared parameters become the program's
//!   arguments
//! - **Function**: a call to a registered host function; sequenced
//! - **Split**: record in, one output per field
//! - **Build**: one input per field, record out
//!
//! ### Programs
//! A compiled [`Program`] is an immutable list of [`Line`]s over a slot
//! array. Slots hold constants first, then event arguments, then one block of
//! output slots per used node.

pub mod registry;
pub mod catalog;
pub mod graph;
pub mod compiler;
pub mod runtime;
pub mod codec;

// Re-export commonly used types
pub use registry::{
    TypeRegistry, TypeDef, TypeKey, TypeKind, QualType, Passing, FieldDef,
    FuncDef, Value, ClassBuilder, IntoFunction, ByValue, ByRef, ByMut,
};

pub use catalog::{NodeType, NodeKind, NodeCatalog, PinDef};

pub use graph::{Graph, Node, Wire};

pub use compiler::compile;

pub use runtime::{Program, Line, Event, MAX_INPUTS};

pub use codec::{save_graph, load_graph, save_json, load_json, NodeRecord, WireRecord};

/// Result type used throughout Nodeflow
pub type Result<T> = std::result::Result<T, NodeflowError>;

/// Error types for Nodeflow
#[derive(Debug, thiserror::Error)]
pub enum NodeflowError {
    #[error("input {pin} of node {node} is neither wired nor given an immediate")]
    UnboundInput { node: usize, pin: usize },

    #[error("cannot parse {type_name} from \"{text}\" (node {node}, input {pin})")]
    ImmediateParse {
        node: usize,
        pin: usize,
        type_name: String,
        text: String,
    },

    #[error("immediates are not supported for {type_name} (node {node}, input {pin})")]
    UnsupportedImmediate {
        node: usize,
        pin: usize,
        type_name: String,
    },

    #[error("sequencing error: node {node} is read as a dependency before it has run")]
    Sequencing { node: usize },

    #[error("cyclic dependency detected at node {node}, check your graph for looping wires")]
    CyclicDependency { node: usize },

    #[error("node {node} has {count} inputs, more than the interpreter's fixed maximum")]
    ArityOverflow { node: usize, count: usize },

    #[error("node {node} is not an event node and cannot be a program entry")]
    InvalidEntry { node: usize },

    #[error("input {pin} of node {node} references a node or pin that does not exist")]
    InvalidWire { node: usize, pin: usize },

    #[error("unrecognized node type: {id}")]
    UnknownNodeType { id: String },

    #[error("node type {id} expects {want} wires, document has {got}")]
    WireCountMismatch { id: String, got: usize, want: usize },

    #[error("document error: {0}")]
    Document(#[from] serde_json::Error),

    #[error("node type id already registered: {id}")]
    DuplicateNodeType { id: String },

    #[error("ill-formed program: {reason}")]
    InvalidProgram { reason: String },

    #[error("invalid connection: {0}")]
    InvalidConnection(String),

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("value of type {type_name} is already borrowed")]
    ValueBorrowed { type_name: &'static str },

    #[error("slot {slot} read while empty")]
    EmptySlot { slot: usize },

    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("{type_name} is not a record type")]
    NotARecord { type_name: String },

    #[error("{type_name} has no default constructor")]
    NotDefaultConstructible { type_name: String },
}
