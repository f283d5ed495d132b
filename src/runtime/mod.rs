//! # Program & Interpreter
//!
//! The compiled form of a graph and the slot machine that executes it.
//!
//! A [`Program`] is an immutable list of [`Line`]s over a slot array. Slot
//! `[0, K)` holds the K compiled constants, `[K, K+A)` the A caller-supplied
//! event arguments, and the rest one output block per used node. Execution
//! walks the lines in order: each line hands its input slots to its node
//! type's evaluator and stores the returned owned values into its output
//! slots, dropping whatever was there before.
//!
//! Programs validate the slot-write invariant at construction - every input
//! slot of every line is written earlier by a constant, an argument, or a
//! previous line - so a successfully constructed program cannot read an
//! unwritten slot at run time.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::catalog::NodeType;
use crate::registry::{QualType, Value};
use crate::{NodeflowError, Result};

/// Fixed size of the interpreter's per-call argument array.
///
/// Nodes with more inputs than this are rejected at compile time.
pub const MAX_INPUTS: usize = 8;

/// One step of a compiled program: a node type plus the slots it reads and
/// writes.
#[derive(Debug, Clone)]
pub struct Line {
    /// The node type whose evaluator runs
    pub node_type: NodeType,

    /// Input slot indices, one per input pin
    pub inputs: SmallVec<[usize; MAX_INPUTS]>,

    /// Output slot indices, one per produced value
    pub outputs: SmallVec<[usize; 4]>,
}

/// An immutable compiled program.
pub struct Program {
    constants: Vec<Value>,
    arg_types: Vec<QualType>,
    lines: Vec<Line>,
    slot_count: usize,
}

impl Program {
    /// Assembles a program, validating its slot discipline.
    ///
    /// Fails with [`NodeflowError::InvalidProgram`] if any line reads a slot
    /// that no constant, argument, or earlier line wrote, or exceeds the
    /// interpreter's input arity. The total slot count is derived from the
    /// highest referenced slot.
    pub fn load(constants: Vec<Value>, arg_types: Vec<QualType>, lines: Vec<Line>) -> Result<Self> {
        let mut written = vec![true; constants.len() + arg_types.len()];
        for (number, line) in lines.iter().enumerate() {
            if line.inputs.len() > MAX_INPUTS {
                return Err(NodeflowError::InvalidProgram {
                    reason: format!("line {number} has {} inputs", line.inputs.len()),
                });
            }
            for &slot in &line.inputs {
                if slot >= written.len() {
                    written.resize(slot + 1, false);
                }
                if !written[slot] {
                    return Err(NodeflowError::InvalidProgram {
                        reason: format!("line {number} reads slot {slot} before it is written"),
                    });
                }
            }
            for &slot in &line.outputs {
                if slot >= written.len() {
                    written.resize(slot + 1, false);
                }
                written[slot] = true;
            }
        }
        Ok(Self {
            slot_count: written.len(),
            constants,
            arg_types,
            lines,
        })
    }

    /// Compiled constants, in slot order.
    #[inline]
    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// The call sequence.
    #[inline]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Total slot array size.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Declared argument count.
    #[inline]
    pub fn arg_count(&self) -> usize {
        self.arg_types.len()
    }

    /// Declared argument types, in slot order.
    #[inline]
    pub fn arg_types(&self) -> &[QualType] {
        &self.arg_types
    }

    /// Executes the program with the given event arguments.
    ///
    /// Arguments are checked for count and type, then installed into the
    /// argument slot block. The argument cells are shared with the caller,
    /// so mutations through `&mut` parameters remain visible after the call;
    /// constants are deep-copied per run so one execution cannot bleed into
    /// the next.
    pub fn run(&self, args: &[Value]) -> Result<()> {
        if args.len() != self.arg_types.len() {
            return Err(NodeflowError::ArityMismatch {
                expected: self.arg_types.len(),
                got: args.len(),
            });
        }
        for (arg, ty) in args.iter().zip(&self.arg_types) {
            if arg.key() != ty.ty {
                return Err(NodeflowError::TypeMismatch {
                    expected: ty.ty.rust_name().to_string(),
                    actual: arg.key().rust_name().to_string(),
                });
            }
        }

        let mut slots: Vec<Option<Value>> = vec![None; self.slot_count];
        for (slot, constant) in slots.iter_mut().zip(&self.constants) {
            *slot = Some(constant.deep_clone());
        }
        for (offset, arg) in args.iter().enumerate() {
            slots[self.constants.len() + offset] = Some(arg.clone());
        }

        tracing::trace!(
            lines = self.lines.len(),
            slots = self.slot_count,
            "program start"
        );
        let mut call_args: SmallVec<[Value; MAX_INPUTS]> = SmallVec::new();
        for line in &self.lines {
            call_args.clear();
            for &slot in &line.inputs {
                let value = slots[slot]
                    .as_ref()
                    .ok_or(NodeflowError::EmptySlot { slot })?;
                call_args.push(value.clone());
            }

            let outputs = line.node_type.evaluate(&call_args)?;
            if outputs.len() != line.outputs.len() {
                return Err(NodeflowError::InvalidProgram {
                    reason: format!(
                        "{} produced {} outputs, line stores {}",
                        line.node_type.id(),
                        outputs.len(),
                        line.outputs.len()
                    ),
                });
            }
            for (&slot, value) in line.outputs.iter().zip(outputs) {
                slots[slot] = Some(value);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("constants", &self.constants.len())
            .field("args", &self.arg_types.len())
            .field("lines", &self.lines.len())
            .field("slots", &self.slot_count)
            .finish()
    }
}

/// A bound event: a cheap-to-clone handle that runs a shared program.
///
/// Multiple events may share one program; invoking checks argument count and
/// types before execution.
///
/// # Example
///
/// ```no_run
/// # fn demo(program: nodeflow::Program) -> nodeflow::Result<()> {
/// use nodeflow::Event;
///
/// let on_start = Event::from_program(program);
/// let again = on_start.clone();
/// on_start.invoke(&[])?;
/// again.invoke(&[])?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Event {
    program: Rc<Program>,
}

impl Event {
    /// Binds an already-shared program.
    pub fn new(program: Rc<Program>) -> Self {
        Self { program }
    }

    /// Takes ownership of a program and binds it.
    pub fn from_program(program: Program) -> Self {
        Self {
            program: Rc::new(program),
        }
    }

    /// The underlying program.
    #[inline]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Runs the program with the given arguments.
    pub fn invoke(&self, args: &[Value]) -> Result<()> {
        self.program.run(args)
    }
}
