#![allow(
    clippy::result_large_err,
    reason = "CallError carries its source chain inline; boxing would touch every call path"
)]
//! oplib core - values, argument marshalling and invocation adapters.
//!
//! This crate provides:
//! - The dynamic value type (`Value`) and object handles (`Object`, `Obj<T>`)
//! - Conversions between Rust types and values (`FromValue`, `IntoValue`)
//! - Call arguments and results (`ArgumentList`, `CallResult`)
//! - Type-erased callables (`Invokable`) derived from typed Rust functions
//! - The shared error type (`CallError`, `CallErrorKind`)
//!
//! The registries themselves live in `oplib_registry`; nothing here knows
//! about names, namespaces or dispatch keys.
//!
//! # Example
//!
//! ```
//! use oplib_core::{args, Invokable};
//!
//! let add = Invokable::new(|a: i64, b: i64| a + b);
//! let result = add.call_with_args(&args![2, 3]).unwrap();
//! assert_eq!(result.get::<i64>().unwrap(), 5);
//! ```

mod args;
pub mod errors;
mod invokable;
mod result;
pub mod signature;
mod value;

pub use args::{ArgumentList, FromArgs};
pub use errors::{CallError, CallErrorKind, CallOrigin, CallOutcome, Entity};
pub use invokable::Invokable;
pub use result::CallResult;
pub use signature::{Constructible, IntoInvokable, IntoMethod, Signature};
pub use value::{FromValue, IntoValue, Obj, Object, Value};
