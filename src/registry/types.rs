//! # Type Descriptions
//!
//! Identity, kind, and qualifier information for every host type the runtime
//! can traffic in.
//!
//! A [`TypeKey`] is the stable process-wide identity of a host type (one key
//! per Rust type, first registration wins). A [`TypeDef`] is the registry's
//! record for that key: display name, size, kind, and - for records - the
//! ordered field list that drives Split/Build node pin layout.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use super::value::Value;
use crate::Result;

/// Stable identity of a host type.
///
/// Wraps [`std::any::TypeId`] together with the compiler's type name for
/// diagnostics. Equality and hashing consider only the identity, never the
/// name.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    rust_name: &'static str,
}

impl TypeKey {
    /// Returns the key for a host type.
    #[inline]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            rust_name: std::any::type_name::<T>(),
        }
    }

    /// The compiler-reported Rust name, for diagnostics.
    ///
    /// Display names used in node ids come from the registry's [`TypeDef`]
    /// instead; this string is not stable across toolchains.
    #[inline]
    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    /// Checks whether this key identifies `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.rust_name)
    }
}

/// Structural classification of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Built-in scalar (integers, floats, bool, char, unit)
    Fundamental,

    /// Struct with named fields
    Class,

    /// Untagged overlay of fields
    Union,

    /// Closed set of variants
    Enum,

    /// Fixed-length sequence of one element type
    Array,

    /// Address of another value
    Pointer,

    /// Callable signature
    Function,
}

/// How a parameter reads its slot.
///
/// This is the marshalling policy per declared parameter, not a property of
/// the runtime value: the same slot can be moved out of by one call and
/// borrowed by the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passing {
    /// The slot's value is moved into the callee; the slot is left holding
    /// the type's default-constructed sentinel
    Value,

    /// Shared borrow for the duration of the call
    Ref,

    /// Exclusive borrow for the duration of the call
    Mut,
}

/// A type identity qualified with its passing mode.
///
/// Used for pin types, function parameters, and returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualType {
    /// Identity of the underlying type
    pub ty: TypeKey,

    /// How values of this type cross the call boundary
    pub passing: Passing,
}

impl QualType {
    /// By-value qualified type.
    #[inline]
    pub fn value(ty: TypeKey) -> Self {
        Self {
            ty,
            passing: Passing::Value,
        }
    }

    /// Shared-reference qualified type.
    #[inline]
    pub fn by_ref(ty: TypeKey) -> Self {
        Self {
            ty,
            passing: Passing::Ref,
        }
    }

    /// Mutable-reference qualified type.
    #[inline]
    pub fn by_mut(ty: TypeKey) -> Self {
        Self {
            ty,
            passing: Passing::Mut,
        }
    }
}

/// A named field of a record type.
///
/// Field order is registration order; it defines the pin order of Split and
/// Build nodes. The accessor closures are built from field projection
/// functions at registration time: `get` clones the field out of a record,
/// `set` copy-assigns a value into it.
pub struct FieldDef {
    /// Field identifier
    pub name: String,

    /// Field type (always by value)
    pub ty: QualType,

    pub(crate) get: Rc<dyn Fn(&dyn Any) -> Result<Value>>,
    pub(crate) set: Rc<dyn Fn(&mut dyn Any, &dyn Any) -> Result<()>>,
}

impl FieldDef {
    #[inline]
    pub(crate) fn getter(&self) -> Rc<dyn Fn(&dyn Any) -> Result<Value>> {
        self.get.clone()
    }

    #[inline]
    pub(crate) fn setter(&self) -> Rc<dyn Fn(&mut dyn Any, &dyn Any) -> Result<()>> {
        self.set.clone()
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish()
    }
}

/// The registry's record for one host type.
pub struct TypeDef {
    /// Stable identity
    pub key: TypeKey,

    /// Registered display name; used in node type ids, so it is the
    /// persistence-stable name of the type
    pub name: String,

    /// Size in bytes of one value
    pub size: usize,

    /// Structural kind
    pub kind: TypeKind,

    /// Element type for arrays and pointers
    pub element: Option<TypeKey>,

    /// Ordered fields (records only)
    pub fields: Vec<FieldDef>,

    pub(crate) default_new: Option<Rc<dyn Fn() -> Value>>,
}

impl TypeDef {
    /// Whether this type has fields to split or build.
    #[inline]
    pub fn is_record(&self) -> bool {
        matches!(self.kind, TypeKind::Class | TypeKind::Union)
    }

    /// Whether a fresh value can be constructed without arguments.
    #[inline]
    pub fn is_default_constructible(&self) -> bool {
        self.default_new.is_some()
    }

    /// Looks up a field by identifier.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[inline]
    pub(crate) fn default_op(&self) -> Option<Rc<dyn Fn() -> Value>> {
        self.default_new.clone()
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("kind", &self.kind)
            .field("fields", &self.fields)
            .finish()
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
