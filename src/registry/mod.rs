//! # Value Universe
//!
//! The registry of host types and functions everything else is built over.
//!
//! A host application registers its primitive types, records (with fields,
//! methods, and constructors), and free functions once at startup. The
//! registry hands out stable [`TypeKey`] identities, reflected [`TypeDef`]
//! descriptions, and invokable [`FuncDef`]s; node type factories and the
//! compiler consume those.
//!
//! # Example
//!
//! ```
//! use nodeflow::TypeRegistry;
//!
//! #[derive(Clone, Default)]
//! struct Point { x: f32, y: f32 }
//!
//! fn length(p: &Point) -> f32 { (p.x * p.x + p.y * p.y).sqrt() }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_primitive::<f32>("f32");
//! registry.enable_literals::<f32>();
//! registry
//!     .bind_class::<Point>("Point")
//!     .with_default()
//!     .field("x", |p| &p.x, |p| &mut p.x)
//!     .field("y", |p| &p.y, |p| &mut p.y)
//!     .method("length", &[], length);
//! ```

mod bind;
mod types;
mod value;

pub use bind::{ByMut, ByRef, ByValue, FromSlot, FuncDef, IntoFunction};
pub use types::{FieldDef, Passing, QualType, TypeDef, TypeKey, TypeKind};
pub use value::Value;

use std::any::Any;
use std::marker::PhantomData;
use std::rc::Rc;
use std::str::FromStr;

use rustc_hash::FxHashMap;

use crate::{NodeflowError, Result};

type LiteralParser = Rc<dyn Fn(&str) -> Option<Value>>;

/// Registry of reflected host types and functions.
///
/// Type identity follows first-registration-wins: registering the same host
/// type again returns the existing entry untouched, so field order and
/// display names are stable for the life of the process.
///
/// # Thread Safety
///
/// The registry is designed to be populated once and then treated as
/// read-only during compilation and execution. It is not `Sync`; share it by
/// handing out shared references on a single thread.
pub struct TypeRegistry {
    types: FxHashMap<TypeKey, TypeDef>,
    order: Vec<TypeKey>,
    functions: Vec<FuncDef>,
    literal_parsers: FxHashMap<TypeKey, LiteralParser>,
}

impl TypeRegistry {
    /// Creates a registry holding only the unit type (the return type of
    /// void functions).
    pub fn new() -> Self {
        let mut registry = Self {
            types: FxHashMap::default(),
            order: Vec::new(),
            functions: Vec::new(),
            literal_parsers: FxHashMap::default(),
        };
        registry.register_primitive::<()>("()");
        registry
    }

    /// Registers a scalar host type under a display name.
    ///
    /// Idempotent: a second registration of the same type returns the
    /// existing key and ignores the new name.
    ///
    /// # Example
    ///
    /// ```
    /// use nodeflow::TypeRegistry;
    ///
    /// let mut registry = TypeRegistry::new();
    /// let a = registry.register_primitive::<i32>("i32");
    /// let b = registry.register_primitive::<i32>("int");
    /// assert_eq!(a, b);
    /// assert_eq!(registry.get_type(a).unwrap().name, "i32");
    /// ```
    pub fn register_primitive<T: Any + Clone + Default>(&mut self, name: &str) -> TypeKey {
        let key = TypeKey::of::<T>();
        if self.types.contains_key(&key) {
            return key;
        }
        let def = TypeDef {
            key,
            name: name.to_string(),
            size: std::mem::size_of::<T>(),
            kind: TypeKind::Fundamental,
            element: None,
            fields: Vec::new(),
            default_new: Some(Rc::new(|| Value::new(T::default()))),
        };
        tracing::debug!(name, "registered primitive type");
        self.types.insert(key, def);
        self.order.push(key);
        key
    }

    /// Registers an enum host type under a display name.
    pub fn register_enum<T: Any>(&mut self, name: &str) -> TypeKey {
        let key = TypeKey::of::<T>();
        if self.types.contains_key(&key) {
            return key;
        }
        let def = TypeDef {
            key,
            name: name.to_string(),
            size: std::mem::size_of::<T>(),
            kind: TypeKind::Enum,
            element: None,
            fields: Vec::new(),
            default_new: None,
        };
        tracing::debug!(name, "registered enum type");
        self.types.insert(key, def);
        self.order.push(key);
        key
    }

    /// Registers a fixed-length array type over an already-registered
    /// element type.
    ///
    /// # Panics
    ///
    /// Panics if the element type has not been registered.
    pub fn register_array<E: Any, const N: usize>(&mut self, name: &str) -> TypeKey {
        let element = self.expect_key::<E>();
        let key = TypeKey::of::<[E; N]>();
        if self.types.contains_key(&key) {
            return key;
        }
        let def = TypeDef {
            key,
            name: name.to_string(),
            size: std::mem::size_of::<E>() * N,
            kind: TypeKind::Array,
            element: Some(element),
            fields: Vec::new(),
            default_new: None,
        };
        tracing::debug!(name, "registered array type");
        self.types.insert(key, def);
        self.order.push(key);
        key
    }

    /// Starts fluent registration of a record type.
    ///
    /// Field registration order defines Split/Build pin order. Re-binding an
    /// already-registered class keeps the first registration's fields and
    /// name.
    pub fn bind_class<C: Any>(&mut self, name: &str) -> ClassBuilder<'_, C> {
        let key = TypeKey::of::<C>();
        let fresh = !self.types.contains_key(&key);
        if fresh {
            let def = TypeDef {
                key,
                name: name.to_string(),
                size: std::mem::size_of::<C>(),
                kind: TypeKind::Class,
                element: None,
                fields: Vec::new(),
                default_new: None,
            };
            tracing::debug!(name, "registered class type");
            self.types.insert(key, def);
            self.order.push(key);
        }
        ClassBuilder {
            registry: self,
            fresh,
            _class: PhantomData,
        }
    }

    /// Installs a literal parser for an already-registered type, enabling
    /// compile-time immediates on pins of that type.
    ///
    /// The stock hosts enable this for their integer and real types; any
    /// other type without a parser fails compilation with an
    /// unsupported-immediate error.
    ///
    /// # Panics
    ///
    /// Panics if the type has not been registered.
    pub fn enable_literals<T: Any + Clone + FromStr>(&mut self) {
        let key = self.expect_key::<T>();
        self.literal_parsers
            .entry(key)
            .or_insert_with(|| Rc::new(|text| text.trim().parse::<T>().ok().map(Value::new)));
    }

    /// Binds a host function under a name.
    ///
    /// Parameter marshalling is deduced from the Rust signature (`&T`
    /// borrows, `&mut T` borrows exclusively, `T` moves out of the slot).
    /// Missing parameter names default to empty strings; duplicate function
    /// names are allowed and [`get_function`](Self::get_function) returns
    /// the first.
    ///
    /// # Panics
    ///
    /// Panics if a parameter or return type is not registered.
    ///
    /// # Example
    ///
    /// ```
    /// use nodeflow::TypeRegistry;
    ///
    /// fn mul(a: i32, b: i32) -> i32 { a * b }
    ///
    /// let mut registry = TypeRegistry::new();
    /// registry.register_primitive::<i32>("i32");
    /// let f = registry.register_fn("mul", &["a", "b"], mul);
    /// assert_eq!(f.signature(), "mul(i32, i32) -> i32");
    /// ```
    pub fn register_fn<Marker>(
        &mut self,
        name: &str,
        param_names: &[&str],
        f: impl IntoFunction<Marker>,
    ) -> &FuncDef {
        let func = f.into_function(self, name, param_names);
        tracing::debug!(signature = func.signature(), "registered function");
        let index = self.functions.len();
        self.functions.push(func);
        &self.functions[index]
    }

    /// Looks up a type description by key.
    #[inline]
    pub fn get_type(&self, key: TypeKey) -> Option<&TypeDef> {
        self.types.get(&key)
    }

    /// Looks up the type description of a host type.
    #[inline]
    pub fn get_type_of<T: Any>(&self) -> Option<&TypeDef> {
        self.types.get(&TypeKey::of::<T>())
    }

    /// Returns the first function registered under a name.
    pub fn get_function(&self, name: &str) -> Option<&FuncDef> {
        self.functions.iter().find(|f| f.name() == name)
    }

    /// All registered functions in registration order.
    #[inline]
    pub fn all_functions(&self) -> &[FuncDef] {
        &self.functions
    }

    /// All registered types in registration order.
    pub fn all_types(&self) -> impl Iterator<Item = &TypeDef> {
        self.order.iter().filter_map(|key| self.types.get(key))
    }

    /// The registered display name for a key, falling back to the Rust name
    /// for unregistered types.
    pub fn display_name(&self, key: TypeKey) -> &str {
        self.types
            .get(&key)
            .map(|t| t.name.as_str())
            .unwrap_or(key.rust_name())
    }

    /// Returns the key of a registered host type.
    ///
    /// # Panics
    ///
    /// Panics if the type has not been registered; using an unregistered
    /// type in a signature is a programmer error and fails fast.
    pub fn expect_key<T: Any>(&self) -> TypeKey {
        let key = TypeKey::of::<T>();
        assert!(
            self.types.contains_key(&key),
            "type `{}` is not registered; register it before use",
            key.rust_name()
        );
        key
    }

    #[inline]
    pub(crate) fn literal_parser(&self, key: TypeKey) -> Option<&LiteralParser> {
        self.literal_parsers.get(&key)
    }
}

impl Default for TypeRegistry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent registration of a record type.
///
/// Returned by [`TypeRegistry::bind_class`]. Fields define Split/Build pin
/// order; methods and constructors are registered as free functions (the
/// receiver becomes the first parameter, named `this`).
pub struct ClassBuilder<'r, C: Any> {
    registry: &'r mut TypeRegistry,
    fresh: bool,
    _class: PhantomData<fn() -> C>,
}

impl<'r, C: Any> ClassBuilder<'r, C> {
    /// Registers a field from a pair of projection functions.
    ///
    /// # Panics
    ///
    /// Panics if the field type is not registered.
    ///
    /// # Example
    ///
    /// ```
    /// # use nodeflow::TypeRegistry;
    /// #[derive(Clone, Default)]
    /// struct Point { x: f32, y: f32 }
    ///
    /// let mut registry = TypeRegistry::new();
    /// registry.register_primitive::<f32>("f32");
    /// registry
    ///     .bind_class::<Point>("Point")
    ///     .field("x", |p| &p.x, |p| &mut p.x)
    ///     .field("y", |p| &p.y, |p| &mut p.y);
    /// ```
    pub fn field<F: Any + Clone>(
        self,
        name: &str,
        get: fn(&C) -> &F,
        get_mut: fn(&mut C) -> &mut F,
    ) -> Self {
        if !self.fresh {
            return self;
        }
        let field_key = self.registry.expect_key::<F>();
        let getter: Rc<dyn Fn(&dyn Any) -> Result<Value>> = Rc::new(move |obj| {
            let record = obj
                .downcast_ref::<C>()
                .ok_or_else(record_mismatch::<C>)?;
            Ok(Value::new(get(record).clone()))
        });
        let setter: Rc<dyn Fn(&mut dyn Any, &dyn Any) -> Result<()>> =
            Rc::new(move |obj, src| {
                let value = src
                    .downcast_ref::<F>()
                    .ok_or_else(field_mismatch::<F>)?;
                let record = obj
                    .downcast_mut::<C>()
                    .ok_or_else(record_mismatch::<C>)?;
                *get_mut(record) = value.clone();
                Ok(())
            });
        if let Some(def) = self.registry.types.get_mut(&TypeKey::of::<C>()) {
            def.fields.push(FieldDef {
                name: name.to_string(),
                ty: QualType::value(field_key),
                get: getter,
                set: setter,
            });
        }
        self
    }

    /// Marks the record default-constructible (Build nodes need this).
    pub fn with_default(self) -> Self
    where
        C: Default,
    {
        if self.fresh {
            if let Some(def) = self.registry.types.get_mut(&TypeKey::of::<C>()) {
                def.default_new = Some(Rc::new(|| Value::move_only(C::default())));
            }
        }
        self
    }

    /// Registers a method as a free function whose first parameter is the
    /// receiver; `this` is prepended to the parameter names.
    pub fn method<Marker>(
        self,
        name: &str,
        param_names: &[&str],
        f: impl IntoFunction<Marker>,
    ) -> Self {
        let mut names = vec!["this"];
        names.extend_from_slice(param_names);
        self.registry.register_fn(name, &names, f);
        self
    }

    /// Registers a constructor under the record's display name.
    pub fn constructor<Marker>(self, param_names: &[&str], f: impl IntoFunction<Marker>) -> Self {
        let name = self.registry.display_name(TypeKey::of::<C>()).to_string();
        self.registry.register_fn(&name, param_names, f);
        self
    }
}

fn record_mismatch<C>() -> NodeflowError {
    NodeflowError::TypeMismatch {
        expected: std::any::type_name::<C>().to_string(),
        actual: "a different record type".to_string(),
    }
}

fn field_mismatch<F>() -> NodeflowError {
    NodeflowError::TypeMismatch {
        expected: std::any::type_name::<F>().to_string(),
        actual: "a different field type".to_string(),
    }
}
