//! Conversions between Rust types and `Value`.
//!
//! `FromValue` is fallible and strict about variants, with two deliberate
//! widenings: integers convert to floats, and `Option<T>` accepts `none`.
//! Narrow integer types are range-checked. `IntoValue` is infallible; `()`
//! boxes to `Value::None`, which is how void results are represented.

use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

use super::object::short_type_name;
use super::{Obj, Object, Value};
use crate::errors::{conversion_failed, CallError};

/// Fallible extraction of a typed value.
pub trait FromValue: Sized {
    /// Convert, or fail with a `Conversion` error naming both types.
    fn from_value(value: &Value) -> Result<Self, CallError>;

    /// Static type name used in error messages and signatures.
    fn type_label() -> Cow<'static, str> {
        Cow::Borrowed(short_type_name::<Self>())
    }
}

/// Infallible boxing into a `Value`.
pub trait IntoValue {
    fn into_value(self) -> Value;

    fn type_label() -> Cow<'static, str>
    where
        Self: Sized,
    {
        Cow::Borrowed(short_type_name::<Self>())
    }
}

#[cold]
fn mismatch<T: FromValue>(value: &Value) -> CallError {
    conversion_failed(None, value.type_name(), &T::type_label())
}

// FromValue

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, CallError> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, CallError> {
        value.as_bool().ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, CallError> {
        value.as_int().ok_or_else(|| mismatch::<Self>(value))
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, CallError> {
                    value
                        .as_int()
                        .and_then(|n| <$ty>::try_from(n).ok())
                        .ok_or_else(|| mismatch::<Self>(value))
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, isize, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    #[allow(
        clippy::cast_precision_loss,
        reason = "int to float widening is part of the conversion contract"
    )]
    fn from_value(value: &Value) -> Result<Self, CallError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Ok(*n as f64),
            _ => Err(mismatch::<Self>(value)),
        }
    }
}

impl FromValue for f32 {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "in-range values round to the nearest f32; out-of-range ones are rejected"
    )]
    fn from_value(value: &Value) -> Result<Self, CallError> {
        let wide = f64::from_value(value).map_err(|_| mismatch::<Self>(value))?;
        let narrow = wide as f32;
        if wide.is_finite() && narrow.is_infinite() {
            return Err(mismatch::<Self>(value));
        }
        Ok(narrow)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, CallError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromValue for Arc<str> {
    fn from_value(value: &Value) -> Result<Self, CallError> {
        match value {
            Value::Str(s) => Ok(Arc::clone(s)),
            _ => Err(mismatch::<Self>(value)),
        }
    }

    fn type_label() -> Cow<'static, str> {
        Cow::Borrowed("str")
    }
}

impl FromValue for Object {
    fn from_value(value: &Value) -> Result<Self, CallError> {
        value.as_object().cloned().ok_or_else(|| mismatch::<Self>(value))
    }
}

impl<T: Any + Send + Sync> FromValue for Obj<T> {
    fn from_value(value: &Value) -> Result<Self, CallError> {
        value
            .as_object()
            .and_then(Object::downcast::<T>)
            .ok_or_else(|| mismatch::<Self>(value))
    }

    fn type_label() -> Cow<'static, str> {
        Cow::Borrowed(short_type_name::<T>())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, CallError> {
        if value.is_none() {
            return Ok(None);
        }
        T::from_value(value)
            .map(Some)
            .map_err(|_| mismatch::<Self>(value))
    }

    fn type_label() -> Cow<'static, str> {
        Cow::Owned(format!("Option<{}>", T::type_label()))
    }
}

// IntoValue

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::None
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

macro_rules! impl_into_value_int {
    ($($ty:ty),*) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::Int(i64::from(self))
                }
            }
        )*
    };
}

impl_into_value_int!(i8, i16, i32, i64, u8, u16, u32);

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self.into())
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.into())
    }
}

impl IntoValue for Arc<str> {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for Object {
    fn into_value(self) -> Value {
        Value::Object(self)
    }
}

impl<T: Any + Send + Sync> IntoValue for Obj<T> {
    fn into_value(self) -> Value {
        Value::Object(self.into_object())
    }

    fn type_label() -> Cow<'static, str> {
        Cow::Borrowed(short_type_name::<T>())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::None, IntoValue::into_value)
    }
}
