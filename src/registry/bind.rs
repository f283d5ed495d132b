//! # Function Binding
//!
//! Turns plain Rust functions into registry [`FuncDef`]s: reflected
//! signature metadata plus an evaluator closure that reads its arguments out
//! of [`Value`] slots.
//!
//! The marshalling mode of every parameter is deduced from the Rust
//! signature:
//!
//! - `&T` borrows the slot for the duration of the call
//! - `&mut T` borrows the slot exclusively
//! - `T` moves the value out of the slot (requires `T: Default`; the slot is
//!   left holding the default-constructed sentinel)
//!
//! Functions of arity 0 through 8 are supported - the interpreter passes
//! arguments through a fixed-size array, and the compiler rejects nodes that
//! would exceed it.

use std::any::{Any, TypeId};
use std::cell::{Ref, RefMut};
use std::fmt;
use std::rc::Rc;

use super::types::{Passing, QualType};
use super::value::Value;
use super::TypeRegistry;
use crate::{NodeflowError, Result};

/// A host function bound into the registry.
///
/// Carries the reflected signature (parameter names, qualified parameter
/// types, return type) and the evaluator closure the interpreter calls.
/// Functions returning `()` are void: their evaluator yields no value and
/// function nodes built from them have no output pin.
#[derive(Clone)]
pub struct FuncDef {
    pub(crate) name: String,
    pub(crate) param_names: Vec<String>,
    pub(crate) params: Vec<QualType>,
    pub(crate) ret: QualType,
    pub(crate) signature: String,
    pub(crate) eval: Rc<dyn Fn(&[Value]) -> Result<Option<Value>>>,
}

impl FuncDef {
    /// Registered name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter names, parallel to [`params`](Self::params).
    #[inline]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Qualified parameter types.
    #[inline]
    pub fn params(&self) -> &[QualType] {
        &self.params
    }

    /// Qualified return type; the unit type for void functions.
    #[inline]
    pub fn ret(&self) -> QualType {
        self.ret
    }

    /// Printed signature, e.g. `mul(i32, i32) -> i32`. Unique per
    /// name-and-signature pair; function node ids derive from it.
    #[inline]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Whether invoking produces a value.
    #[inline]
    pub fn returns_value(&self) -> bool {
        !self.ret.ty.is::<()>()
    }

    /// Invokes the bound function over slot values.
    ///
    /// The caller must supply exactly one value per declared parameter; the
    /// compiler guarantees this for compiled programs.
    pub fn invoke(&self, args: &[Value]) -> Result<Option<Value>> {
        (self.eval)(args)
    }

    #[inline]
    pub(crate) fn eval_handle(&self) -> Rc<dyn Fn(&[Value]) -> Result<Option<Value>>> {
        self.eval.clone()
    }
}

impl fmt::Debug for FuncDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FuncDef({})", self.signature)
    }
}

/// Marker: parameter taken by value (moved out of the slot).
pub struct ByValue;

/// Marker: parameter taken by shared reference.
pub struct ByRef;

/// Marker: parameter taken by mutable reference.
pub struct ByMut;

/// Extraction of one declared parameter from a slot value.
///
/// Implemented for `T` (by value), `&T`, and `&mut T`; the marker type
/// disambiguates the three shapes. A guard object holds the borrow (or the
/// moved-out value) for the duration of the call.
pub trait FromSlot<M>: 'static {
    /// Holds the extracted argument while the call runs.
    type Guard<'v>;

    /// The parameter exactly as the bound function receives it.
    type Item<'a>;

    /// The qualified type this parameter declares.
    ///
    /// # Panics
    ///
    /// Panics if the underlying type has not been registered - binding a
    /// function over unregistered types is a programmer error.
    fn qual_type(registry: &TypeRegistry) -> QualType;

    /// Extracts the argument from a slot value.
    fn guard(value: &Value) -> Result<Self::Guard<'_>>;

    /// Produces the argument from its guard.
    fn item<'g, 'v>(guard: &'g mut Self::Guard<'v>) -> Self::Item<'g>;
}

impl<T: Any + Default> FromSlot<ByValue> for T {
    type Guard<'v> = Option<T>;
    type Item<'a> = T;

    fn qual_type(registry: &TypeRegistry) -> QualType {
        QualType::value(registry.expect_key::<T>())
    }

    fn guard(value: &Value) -> Result<Option<T>> {
        value.take::<T>().map(Some)
    }

    fn item<'g, 'v>(guard: &'g mut Option<T>) -> T {
        guard.take().unwrap_or_default()
    }
}

impl<T: Any> FromSlot<ByRef> for &'static T {
    type Guard<'v> = Ref<'v, T>;
    type Item<'a> = &'a T;

    fn qual_type(registry: &TypeRegistry) -> QualType {
        QualType::by_ref(registry.expect_key::<T>())
    }

    fn guard(value: &Value) -> Result<Ref<'_, T>> {
        value.borrow::<T>()
    }

    fn item<'g, 'v>(guard: &'g mut Ref<'v, T>) -> &'g T {
        &**guard
    }
}

impl<T: Any> FromSlot<ByMut> for &'static mut T {
    type Guard<'v> = RefMut<'v, T>;
    type Item<'a> = &'a mut T;

    fn qual_type(registry: &TypeRegistry) -> QualType {
        QualType::by_mut(registry.expect_key::<T>())
    }

    fn guard(value: &Value) -> Result<RefMut<'_, T>> {
        value.borrow_mut::<T>()
    }

    fn item<'g, 'v>(guard: &'g mut RefMut<'v, T>) -> &'g mut T {
        &mut **guard
    }
}

/// Conversion of a Rust function into a [`FuncDef`].
///
/// Implemented for functions and closures of arity 0..=8 whose parameters
/// are `T`, `&T`, or `&mut T` over registered types. The `Marker` parameter
/// only drives inference; callers never name it.
pub trait IntoFunction<Marker> {
    /// Builds the function definition.
    ///
    /// # Panics
    ///
    /// Panics if a parameter or return type is not registered.
    fn into_function(self, registry: &TypeRegistry, name: &str, param_names: &[&str])
        -> FuncDef;
}

fn wrap_return<R: Any>(value: R) -> Option<Value> {
    if TypeId::of::<R>() == TypeId::of::<()>() {
        None
    } else {
        Some(Value::move_only(value))
    }
}

fn build_signature(registry: &TypeRegistry, name: &str, params: &[QualType], ret: QualType) -> String {
    let mut sig = String::from(name);
    sig.push('(');
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            sig.push_str(", ");
        }
        match param.passing {
            Passing::Value => {}
            Passing::Ref => sig.push('&'),
            Passing::Mut => sig.push_str("&mut "),
        }
        sig.push_str(registry.display_name(param.ty));
    }
    sig.push_str(") -> ");
    sig.push_str(registry.display_name(ret.ty));
    sig
}

fn resize_names(param_names: &[&str], count: usize) -> Vec<String> {
    let mut names: Vec<String> = param_names.iter().map(|s| s.to_string()).collect();
    names.resize(count, String::new());
    names
}

impl<Fun, R> IntoFunction<(R,)> for Fun
where
    Fun: Fn() -> R + 'static,
    R: Any,
{
    fn into_function(
        self,
        registry: &TypeRegistry,
        name: &str,
        param_names: &[&str],
    ) -> FuncDef {
        let params = Vec::new();
        let ret = QualType::value(registry.expect_key::<R>());
        let signature = build_signature(registry, name, &params, ret);
        let param_names = resize_names(param_names, 0);
        let f = self;
        let eval: Rc<dyn Fn(&[Value]) -> Result<Option<Value>>> = Rc::new(move |args| {
            if !args.is_empty() {
                return Err(NodeflowError::ArityMismatch {
                    expected: 0,
                    got: args.len(),
                });
            }
            Ok(wrap_return(f()))
        });
        FuncDef {
            name: name.to_string(),
            param_names,
            params,
            ret,
            signature,
            eval,
        }
    }
}

macro_rules! impl_into_function {
    ($(($A:ident, $M:ident, $guard:ident, $idx:tt)),+) => {
        impl<Fun, R, $($A, $M),+> IntoFunction<(R, $(($A, $M)),+)> for Fun
        where
            Fun: Fn($($A),+) -> R
                + for<'a> Fn($(<$A as FromSlot<$M>>::Item<'a>),+) -> R
                + 'static,
            R: Any,
            $($A: FromSlot<$M>,)+
        {
            fn into_function(
                self,
                registry: &TypeRegistry,
                name: &str,
                param_names: &[&str],
            ) -> FuncDef {
                let params = vec![$(<$A as FromSlot<$M>>::qual_type(registry)),+];
                let ret = QualType::value(registry.expect_key::<R>());
                let signature = build_signature(registry, name, &params, ret);
                let param_names = resize_names(param_names, params.len());
                let expected = params.len();
                let f = self;
                let eval: Rc<dyn Fn(&[Value]) -> Result<Option<Value>>> =
                    Rc::new(move |args| {
                        if args.len() != expected {
                            return Err(NodeflowError::ArityMismatch {
                                expected,
                                got: args.len(),
                            });
                        }
                        $(let mut $guard = <$A as FromSlot<$M>>::guard(&args[$idx])?;)+
                        let out = f($(<$A as FromSlot<$M>>::item(&mut $guard)),+);
                        Ok(wrap_return(out))
                    });
                FuncDef {
                    name: name.to_string(),
                    param_names,
                    params,
                    ret,
                    signature,
                    eval,
                }
            }
        }
    };
}

impl_into_function!((A0, M0, g0, 0));
impl_into_function!((A0, M0, g0, 0), (A1, M1, g1, 1));
impl_into_function!((A0, M0, g0, 0), (A1, M1, g1, 1), (A2, M2, g2, 2));
impl_into_function!((A0, M0, g0, 0), (A1, M1, g1, 1), (A2, M2, g2, 2), (A3, M3, g3, 3));
impl_into_function!(
    (A0, M0, g0, 0),
    (A1, M1, g1, 1),
    (A2, M2, g2, 2),
    (A3, M3, g3, 3),
    (A4, M4, g4, 4)
);
impl_into_function!(
    (A0, M0, g0, 0),
    (A1, M1, g1, 1),
    (A2, M2, g2, 2),
    (A3, M3, g3, 3),
    (A4, M4, g4, 4),
    (A5, M5, g5, 5)
);
impl_into_function!(
    (A0, M0, g0, 0),
    (A1, M1, g1, 1),
    (A2, M2, g2, 2),
    (A3, M3, g3, 3),
    (A4, M4, g4, 4),
    (A5, M5, g5, 5),
    (A6, M6, g6, 6)
);
impl_into_function!(
    (A0, M0, g0, 0),
    (A1, M1, g1, 1),
    (A2, M2, g2, 2),
    (A3, M3, g3, 3),
    (A4, M4, g4, 4),
    (A5, M5, g5, 5),
    (A6, M6, g6, 6),
    (A7, M7, g7, 7)
);
