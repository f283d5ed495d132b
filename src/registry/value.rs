//! # Owned Values
//!
//! [`Value`] is the dynamically typed container every slot, constant, and
//! evaluator result lives in.
//!
//! A `Value` is a type-tagged, reference-counted cell. Cloning shares the
//! cell (the clone is another handle onto the same storage), which is how the
//! interpreter passes values between lines without copying. Deep copies are
//! only taken where the runtime needs a genuinely fresh value - refreshing
//! program constants at the start of each execution.
//!
//! By-value consumption is [`Value::take`]: the value moves out and the cell
//! is left holding the type's default-constructed sentinel, so a later reader
//! of the same slot observes `T::default()`.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use super::types::TypeKey;
use crate::{NodeflowError, Result};

type DeepCopy = Rc<dyn Fn(&dyn Any) -> Option<Box<dyn Any>>>;

/// An owned, dynamically typed value.
#[derive(Clone)]
pub struct Value {
    key: TypeKey,
    cell: Rc<RefCell<Box<dyn Any>>>,
    deep_copy: Option<DeepCopy>,
}

impl Value {
    /// Wraps a cloneable host value.
    ///
    /// Values built this way can be deep-copied, which the interpreter uses
    /// to refresh program constants per execution.
    ///
    /// # Example
    ///
    /// ```
    /// use nodeflow::Value;
    ///
    /// let v = Value::new(42i32);
    /// assert_eq!(*v.borrow::<i32>().unwrap(), 42);
    /// ```
    pub fn new<T: Any + Clone>(value: T) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            cell: Rc::new(RefCell::new(Box::new(value))),
            deep_copy: Some(Rc::new(|any: &dyn Any| {
                any.downcast_ref::<T>()
                    .map(|v| Box::new(v.clone()) as Box<dyn Any>)
            })),
        }
    }

    /// Wraps a host value that cannot (or should not) be copied.
    pub fn move_only<T: Any>(value: T) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            cell: Rc::new(RefCell::new(Box::new(value))),
            deep_copy: None,
        }
    }

    /// Identity of the contained type.
    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Checks whether the contained value is a `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.key.is::<T>()
    }

    /// Borrows the contained value.
    ///
    /// Fails if the value is mutably borrowed elsewhere or is not a `T`.
    pub fn borrow<T: Any>(&self) -> Result<Ref<'_, T>> {
        let inner = self
            .cell
            .try_borrow()
            .map_err(|_| NodeflowError::ValueBorrowed {
                type_name: self.key.rust_name(),
            })?;
        Ref::filter_map(inner, |boxed| boxed.downcast_ref::<T>()).map_err(|_| {
            NodeflowError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                actual: self.key.rust_name().to_string(),
            }
        })
    }

    /// Mutably borrows the contained value.
    pub fn borrow_mut<T: Any>(&self) -> Result<RefMut<'_, T>> {
        let inner = self
            .cell
            .try_borrow_mut()
            .map_err(|_| NodeflowError::ValueBorrowed {
                type_name: self.key.rust_name(),
            })?;
        RefMut::filter_map(inner, |boxed| boxed.downcast_mut::<T>()).map_err(|_| {
            NodeflowError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                actual: self.key.rust_name().to_string(),
            }
        })
    }

    /// Moves the contained value out, leaving `T::default()` in the cell.
    ///
    /// This is by-value parameter marshalling: the slot keeps its type but
    /// any other handle onto the cell now observes the default-constructed
    /// state.
    pub fn take<T: Any + Default>(&self) -> Result<T> {
        let mut inner = self
            .cell
            .try_borrow_mut()
            .map_err(|_| NodeflowError::ValueBorrowed {
                type_name: self.key.rust_name(),
            })?;
        let boxed = std::mem::replace(&mut *inner, Box::new(T::default()) as Box<dyn Any>);
        match boxed.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(original) => {
                *inner = original;
                Err(NodeflowError::TypeMismatch {
                    expected: std::any::type_name::<T>().to_string(),
                    actual: self.key.rust_name().to_string(),
                })
            }
        }
    }

    /// Clones the contained value out of the cell.
    pub fn get<T: Any + Clone>(&self) -> Result<T> {
        self.borrow::<T>().map(|v| (*v).clone())
    }

    /// Borrows the contained value without a static type.
    pub(crate) fn borrow_dyn(&self) -> Result<Ref<'_, dyn Any>> {
        let inner = self
            .cell
            .try_borrow()
            .map_err(|_| NodeflowError::ValueBorrowed {
                type_name: self.key.rust_name(),
            })?;
        Ok(Ref::map(inner, |boxed| boxed.as_ref()))
    }

    /// Mutably borrows the contained value without a static type.
    pub(crate) fn borrow_dyn_mut(&self) -> Result<RefMut<'_, dyn Any>> {
        let inner = self
            .cell
            .try_borrow_mut()
            .map_err(|_| NodeflowError::ValueBorrowed {
                type_name: self.key.rust_name(),
            })?;
        Ok(RefMut::map(inner, |boxed| boxed.as_mut()))
    }

    /// A copy with its own cell when the value supports it, otherwise
    /// another handle onto this cell.
    pub(crate) fn deep_clone(&self) -> Value {
        if let Some(copy) = &self.deep_copy {
            if let Ok(inner) = self.cell.try_borrow() {
                if let Some(fresh) = copy(inner.as_ref()) {
                    return Value {
                        key: self.key,
                        cell: Rc::new(RefCell::new(fresh)),
                        deep_copy: Some(copy.clone()),
                    };
                }
            }
        }
        self.clone()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.key.rust_name())
    }
}
