#![allow(
    clippy::result_large_err,
    reason = "CallError carries its source chain inline; boxing would touch every call path"
)]
//! oplib registry - operator and class registration with dispatch.
//!
//! This crate provides:
//! - `OperatorRegistry`: qualified operator names to schemas and
//!   per-`DispatchKey` implementations, with CPU fallback
//! - `ClassRegistry`: qualified class names to constructors (resolved by
//!   trial, in registration order), instance methods and static methods
//! - `Registries`: the process-wide pair of both, with a sealable
//!   registration phase and environment-driven `RegistryConfig`
//! - `Library` / `ClassBuilder`: the registration facade
//! - `LibraryInit` and the `library!` family of macros for named
//!   registration units
//!
//! Values, argument lists and adapters come from `oplib_core` and are
//! re-exported here.
//!
//! # Logging
//!
//! Registrations log at `debug`, dispatch decisions and rejected constructor
//! candidates at `trace`. Call [`init_tracing`] and set `RUST_LOG` (for
//! example `RUST_LOG=oplib_registry=trace`) to see them.

mod classes;
pub mod config;
mod dispatch_key;
mod init;
mod library;
mod operators;
mod registries;

use std::sync::Once;

pub use classes::{ClassRegistration, ClassRegistry};
pub use config::{ClassRedefinition, RegistryConfig};
pub use dispatch_key::{DispatchKey, ParseDispatchKeyError};
pub use init::{InitFn, LibraryInit};
pub use library::{operator_name, ClassBuilder, Library, LibraryKind, SourceLocation};
pub use operators::{OperatorRegistration, OperatorRegistry};
pub use registries::Registries;

pub use oplib_core::{
    args, errors, ArgumentList, CallError, CallErrorKind, CallOrigin, CallResult, Constructible,
    Entity, FromArgs, FromValue, IntoInvokable, IntoMethod, IntoValue, Invokable, Obj, Object,
    Signature, Value,
};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
