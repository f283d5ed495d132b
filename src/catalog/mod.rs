//! # Node Type Catalog
//!
//! The four node type factories and the id-keyed catalog graphs resolve
//! against.
//!
//! A [`NodeType`] is immutable once built and cheap to clone (nodes, lines,
//! and catalogs all share the same instance). Its stable string id doubles
//! as the persistence key:
//!
//! - `event:Name` - entry point; declared parameters become output pins
//! - `func:signature` - call to a registered host function
//! - `split:Type` - record in, one output per field
//! - `build:Type` - one input per field, record out

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

use crate::registry::{FuncDef, QualType, TypeDef, Value};
use crate::{NodeflowError, Result};

/// Owned values produced by one node evaluation, in output pin order.
pub type Outputs = SmallVec<[Value; 4]>;

type EvalFn = dyn Fn(&[Value]) -> Result<Outputs>;

/// The closed set of node type cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Entry point; its parameters are the program's arguments
    Event,

    /// Sequenced call to a host function
    Call,

    /// Record to fields (pure)
    Split,

    /// Fields to record (pure)
    Build,
}

/// A typed connection point on a node type.
#[derive(Debug, Clone)]
pub struct PinDef {
    /// Display label (field identifier, parameter name, or empty)
    pub label: String,

    /// Qualified pin type
    pub ty: QualType,
}

struct Inner {
    id: String,
    label: String,
    kind: NodeKind,
    inputs: Vec<PinDef>,
    outputs: Vec<PinDef>,
    has_in_flow: bool,
    has_out_flow: bool,
    eval: Box<EvalFn>,
}

/// An immutable, shareable node type.
#[derive(Clone)]
pub struct NodeType {
    inner: Rc<Inner>,
}

impl NodeType {
    /// Stable unique id; the persistence key.
    #[inline]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Human-readable label.
    #[inline]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Which of the four cases this is.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.inner.kind
    }

    /// Ordered input pins.
    #[inline]
    pub fn inputs(&self) -> &[PinDef] {
        &self.inner.inputs
    }

    /// Ordered output pins.
    #[inline]
    pub fn outputs(&self) -> &[PinDef] {
        &self.inner.outputs
    }

    #[inline]
    pub fn input_count(&self) -> usize {
        self.inner.inputs.len()
    }

    #[inline]
    pub fn output_count(&self) -> usize {
        self.inner.outputs.len()
    }

    /// Whether execution can flow into this node.
    #[inline]
    pub fn has_in_flow(&self) -> bool {
        self.inner.has_in_flow
    }

    /// Whether execution flows onward from this node.
    #[inline]
    pub fn has_out_flow(&self) -> bool {
        self.inner.has_out_flow
    }

    /// A sequenced node runs where it sits on the flow chain.
    #[inline]
    pub fn is_sequenced(&self) -> bool {
        self.inner.has_in_flow || self.inner.has_out_flow
    }

    /// A pure node is re-evaluated on demand when its inputs change.
    #[inline]
    pub fn is_pure(&self) -> bool {
        !self.is_sequenced()
    }

    /// Runs the evaluator over one value per input pin.
    pub fn evaluate(&self, inputs: &[Value]) -> Result<Outputs> {
        (self.inner.eval)(inputs)
    }

    /// Event node type: the entry point of a program.
    ///
    /// Declared parameters become output pins so wires can read the event's
    /// arguments; the interpreter installs the caller-supplied values into
    /// those slots before the first line runs. A parameterless event has no
    /// pins at all.
    pub fn event(name: &str, params: &[(&str, QualType)]) -> NodeType {
        let outputs = params
            .iter()
            .map(|(label, ty)| PinDef {
                label: label.to_string(),
                ty: *ty,
            })
            .collect();
        NodeType {
            inner: Rc::new(Inner {
                id: format!("event:{name}"),
                label: format!("On {name}"),
                kind: NodeKind::Event,
                inputs: Vec::new(),
                outputs,
                has_in_flow: false,
                has_out_flow: true,
                eval: Box::new(|_| Ok(SmallVec::new())),
            }),
        }
    }

    /// Function node type: a sequenced call to a bound host function.
    ///
    /// Inputs mirror the function's parameters; a non-void return becomes
    /// the single output pin.
    pub fn function(func: &FuncDef) -> NodeType {
        Self::call_node(func, true)
    }

    /// Pure function node type: a call with no flow pins.
    ///
    /// For side-effect-free host functions. Pure calls do not sit on the
    /// flow chain; the compiler emits them on demand, re-evaluating only
    /// when some transitive input has changed.
    pub fn pure_function(func: &FuncDef) -> NodeType {
        Self::call_node(func, false)
    }

    fn call_node(func: &FuncDef, sequenced: bool) -> NodeType {
        let inputs = func
            .params()
            .iter()
            .zip(func.param_names())
            .map(|(ty, name)| PinDef {
                label: name.clone(),
                ty: *ty,
            })
            .collect();
        let mut outputs = Vec::new();
        if func.returns_value() {
            outputs.push(PinDef {
                label: String::new(),
                ty: func.ret(),
            });
        }
        let eval = func.eval_handle();
        NodeType {
            inner: Rc::new(Inner {
                id: format!("func:{}", func.signature()),
                label: func.name().to_string(),
                kind: NodeKind::Call,
                inputs,
                outputs,
                has_in_flow: sequenced,
                has_out_flow: sequenced,
                eval: Box::new(move |args| Ok(eval(args)?.into_iter().collect())),
            }),
        }
    }

    /// Split node type: one record in by reference, one output per field.
    ///
    /// Outputs are copies of the fields, taken at evaluation time.
    pub fn split(ty: &TypeDef) -> Result<NodeType> {
        if !ty.is_record() {
            return Err(NodeflowError::NotARecord {
                type_name: ty.name.clone(),
            });
        }
        let inputs = vec![PinDef {
            label: String::new(),
            ty: QualType::by_ref(ty.key),
        }];
        let outputs = ty
            .fields
            .iter()
            .map(|f| PinDef {
                label: f.name.clone(),
                ty: f.ty,
            })
            .collect();
        let getters: Vec<_> = ty.fields.iter().map(|f| f.getter()).collect();
        Ok(NodeType {
            inner: Rc::new(Inner {
                id: format!("split:{}", ty.name),
                label: format!("split {}", ty.name),
                kind: NodeKind::Split,
                inputs,
                outputs,
                has_in_flow: false,
                has_out_flow: false,
                eval: Box::new(move |args| {
                    let record = args.first().ok_or(NodeflowError::ArityMismatch {
                        expected: 1,
                        got: 0,
                    })?;
                    let record = record.borrow_dyn()?;
                    getters.iter().map(|get| get(&*record)).collect()
                }),
            }),
        })
    }

    /// Build node type: one input per field, one record out by value.
    ///
    /// Evaluation default-constructs the record, then copy-assigns each
    /// field from the corresponding input.
    pub fn build(ty: &TypeDef) -> Result<NodeType> {
        if !ty.is_record() {
            return Err(NodeflowError::NotARecord {
                type_name: ty.name.clone(),
            });
        }
        let default_new = ty
            .default_op()
            .ok_or_else(|| NodeflowError::NotDefaultConstructible {
                type_name: ty.name.clone(),
            })?;
        let inputs: Vec<_> = ty
            .fields
            .iter()
            .map(|f| PinDef {
                label: f.name.clone(),
                ty: f.ty,
            })
            .collect();
        let outputs = vec![PinDef {
            label: String::new(),
            ty: QualType::value(ty.key),
        }];
        let setters: Vec<_> = ty.fields.iter().map(|f| f.setter()).collect();
        Ok(NodeType {
            inner: Rc::new(Inner {
                id: format!("build:{}", ty.name),
                label: format!("build {}", ty.name),
                kind: NodeKind::Build,
                inputs,
                outputs,
                has_in_flow: false,
                has_out_flow: false,
                eval: Box::new(move |args| {
                    if args.len() != setters.len() {
                        return Err(NodeflowError::ArityMismatch {
                            expected: setters.len(),
                            got: args.len(),
                        });
                    }
                    let out = default_new();
                    {
                        let mut record = out.borrow_dyn_mut()?;
                        for (set, input) in setters.iter().zip(args) {
                            let src = input.borrow_dyn()?;
                            set(&mut *record, &*src)?;
                        }
                    }
                    Ok(smallvec![out])
                }),
            }),
        })
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("id", &self.inner.id)
            .field("inputs", &self.inner.inputs.len())
            .field("outputs", &self.inner.outputs.len())
            .finish()
    }
}

/// The set of node types a host exposes to its graphs.
///
/// Ids are unique across a catalog; they are what graph documents store.
pub struct NodeCatalog {
    types: Vec<NodeType>,
    by_id: FxHashMap<String, usize>,
}

impl NodeCatalog {
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            by_id: FxHashMap::default(),
        }
    }

    /// Adds a node type; fails if its id is already present.
    pub fn register(&mut self, node_type: NodeType) -> Result<()> {
        if self.by_id.contains_key(node_type.id()) {
            return Err(NodeflowError::DuplicateNodeType {
                id: node_type.id().to_string(),
            });
        }
        self.by_id
            .insert(node_type.id().to_string(), self.types.len());
        self.types.push(node_type);
        Ok(())
    }

    /// Resolves a node type by stable id.
    ///
    /// # Performance
    ///
    /// O(1) via the id index.
    #[inline]
    pub fn find(&self, id: &str) -> Option<&NodeType> {
        self.by_id.get(id).map(|&index| &self.types[index])
    }

    /// All node types in registration order.
    #[inline]
    pub fn all(&self) -> &[NodeType] {
        &self.types
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for NodeCatalog {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
