//! Opaque host instances.
//!
//! An [`Object`] is an `Arc` around a `parking_lot::RwLock<T>` with the
//! concrete `T` erased. Cloning shares the instance. [`Obj<T>`] is the typed
//! view recovered by downcasting; bound methods lock it for `&T` or `&mut T`
//! for the duration of one call. Those locks never block: a receiver already
//! locked by a call in progress fails with `ReceiverBorrowed`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Value;
use crate::errors::{receiver_borrowed, CallError};

/// Type-erased, shared host instance.
#[derive(Clone)]
pub struct Object {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Object {
    pub fn new<T: Any + Send + Sync>(instance: T) -> Self {
        Obj::new(instance).into_object()
    }

    /// Short type name of the instance (`Counter`, not `my_crate::Counter`).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the instance is a `T`.
    pub fn is<T: Any + Send + Sync>(&self) -> bool {
        self.inner.is::<RwLock<T>>()
    }

    /// Typed handle to the same instance, if it is a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Obj<T>> {
        Arc::clone(&self.inner)
            .downcast::<RwLock<T>>()
            .ok()
            .map(|inner| Obj { inner })
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }

    /// Number of handles sharing the instance.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.type_name)
    }
}

/// Typed handle to a host instance of type `T`.
pub struct Obj<T> {
    inner: Arc<RwLock<T>>,
}

impl<T: Any + Send + Sync> Obj<T> {
    pub fn new(instance: T) -> Self {
        Obj {
            inner: Arc::new(RwLock::new(instance)),
        }
    }

    /// Shared access to the instance.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    /// Exclusive access to the instance.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }

    /// Shared access, failing instead of waiting on an exclusive borrow.
    pub fn try_read(&self) -> Result<RwLockReadGuard<'_, T>, CallError> {
        self.inner
            .try_read_recursive()
            .ok_or_else(|| receiver_borrowed(short_type_name::<T>(), false))
    }

    /// Exclusive access, failing instead of waiting on any other borrow.
    pub fn try_write(&self) -> Result<RwLockWriteGuard<'_, T>, CallError> {
        self.inner
            .try_write()
            .ok_or_else(|| receiver_borrowed(short_type_name::<T>(), true))
    }

    /// Whether `value` holds this same instance.
    pub fn is_held_by(&self, value: &Value) -> bool {
        value.as_object().is_some_and(|object| {
            std::ptr::addr_eq(Arc::as_ptr(&object.inner), Arc::as_ptr(&self.inner))
        })
    }

    /// Erase the type, keeping the same instance.
    pub fn into_object(self) -> Object {
        Object {
            inner: self.inner,
            type_name: short_type_name::<T>(),
        }
    }
}

impl<T> Clone for Obj<T> {
    fn clone(&self) -> Self {
        Obj {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Any + Send + Sync> fmt::Debug for Obj<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Obj({})", short_type_name::<T>())
    }
}

/// Last path segment of `std::any::type_name::<T>()`.
///
/// Generic types keep their full name since their parameters contain `::`.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    if full.contains('<') {
        return full;
    }
    full.rsplit("::").next().unwrap_or(full)
}
