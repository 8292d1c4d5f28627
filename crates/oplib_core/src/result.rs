//! Return values of invocations.

use std::fmt;

use crate::errors::{void_result, CallError};
use crate::value::{FromValue, IntoValue, Value};

/// Zero or one value returned by a call.
///
/// Empty results come from void functions; a present `Value::None` is
/// normalized to empty, so `has_value()` alone tells the two apart.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallResult {
    value: Option<Value>,
}

impl CallResult {
    /// The canonical empty result.
    pub fn void_result() -> Self {
        CallResult { value: None }
    }

    pub fn from_value(value: Value) -> Self {
        if value.is_none() {
            return Self::void_result();
        }
        CallResult { value: Some(value) }
    }

    #[inline]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Raw access; `Value::None` when empty.
    pub fn value(&self) -> &Value {
        const EMPTY: &Value = &Value::None;
        self.value.as_ref().unwrap_or(EMPTY)
    }

    pub fn into_value(self) -> Value {
        self.value.unwrap_or_default()
    }

    /// Typed access.
    ///
    /// Fails with `VoidResult` when empty and `Conversion` on a type mismatch.
    pub fn get<T: FromValue>(&self) -> Result<T, CallError> {
        match &self.value {
            Some(value) => T::from_value(value),
            None => Err(void_result(&T::type_label())),
        }
    }
}

impl<T: IntoValue> From<T> for CallResult {
    fn from(value: T) -> Self {
        CallResult::from_value(value.into_value())
    }
}

impl fmt::Display for CallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "CallResult({})", value.to_repr()),
            None => write!(f, "CallResult(void)"),
        }
    }
}
