//! Dynamic values passed through the registries.
//!
//! `Value` is a closed tagged union. Scalars are stored inline; strings are
//! `Arc<str>` so cloning an argument list never copies text, and host
//! instances travel as [`Object`] handles with reference semantics.
//!
//! Construct values with the factory methods (`Value::int`, `Value::string`,
//! `Value::object`) or through [`IntoValue`]; read them back with the
//! `as_*` accessors or through [`FromValue`].

mod convert;
mod object;

use std::fmt;
use std::sync::Arc;

pub use convert::{FromValue, IntoValue};
pub use object::{Obj, Object};
pub(crate) use object::short_type_name;

use crate::errors::CallError;

/// Runtime value carried by argument lists and call results.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value. Also the only representation of a void result.
    #[default]
    None,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Immutable shared string.
    Str(Arc<str>),
    /// Reference to a host instance.
    Object(Object),
}

impl Value {
    // Factory methods

    #[inline]
    pub fn none() -> Self {
        Value::None
    }

    #[inline]
    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    #[inline]
    pub fn float(f: f64) -> Self {
        Value::Float(f)
    }

    /// Create a string value.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Move `instance` behind a fresh object handle.
    pub fn object<T>(instance: T) -> Self
    where
        T: std::any::Any + Send + Sync,
    {
        Value::Object(Object::new(instance))
    }

    // Accessors

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Float payload. Integers are not coerced here; see `FromValue for f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Dynamic type name used in conversion errors.
    ///
    /// Objects report the short name of their instance type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Object(o) => o.type_name(),
        }
    }

    /// Convert to `T`, or `None` if the payload does not fit.
    pub fn convert<T: FromValue>(&self) -> Option<T> {
        T::from_value(self).ok()
    }

    /// Convert to `T`, reporting a `Conversion` error on mismatch.
    pub fn try_convert<T: FromValue>(&self) -> Result<T, CallError> {
        T::from_value(self)
    }

    /// Debug representation, e.g. `Int(3)` or `Object(Counter)`.
    pub fn to_repr(&self) -> String {
        format!("{self:?}")
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Str(s) => write!(f, "Str({:?})", &**s),
            Value::Object(o) => write!(f, "{o:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{:?}", &**s),
            Value::Object(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            // Objects compare by identity
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}
