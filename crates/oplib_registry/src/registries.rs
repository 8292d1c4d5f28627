//! Process-wide registries.
//!
//! `Registries` pairs an [`OperatorRegistry`] with a [`ClassRegistry`], each
//! behind a `parking_lot::RwLock`. The global instance is created on first
//! use from [`RegistryConfig::from_env`]; tests build their own instances
//! with [`Registries::new`].
//!
//! # Lifecycle
//!
//! Registration happens in a load-time phase that ends with
//! [`Registries::seal`]. Every registration after that fails with `Sealed`.
//!
//! # Calls
//!
//! Call entry points look the adapter up under a read lock, clone its `Arc`
//! out and release the lock before invoking it, so an implementation may call
//! back into the registries.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;

use oplib_core::errors::sealed;
use oplib_core::{ArgumentList, CallError, CallResult, Invokable, Value};
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

use crate::classes::{self, ClassRegistry};
use crate::config::RegistryConfig;
use crate::dispatch_key::DispatchKey;
use crate::operators::{self, OperatorRegistry};

static GLOBAL: LazyLock<Registries> =
    LazyLock::new(|| Registries::new(RegistryConfig::from_env()));

/// Operator and class registries sharing one lifecycle.
pub struct Registries {
    operators: RwLock<OperatorRegistry>,
    classes: RwLock<ClassRegistry>,
    config: RegistryConfig,
    sealed: AtomicBool,
}

impl Default for Registries {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl Registries {
    pub fn new(config: RegistryConfig) -> Self {
        Registries {
            operators: RwLock::new(OperatorRegistry::new()),
            classes: RwLock::new(ClassRegistry::with_redefinition(
                config.class_redefinition,
            )),
            config,
            sealed: AtomicBool::new(false),
        }
    }

    /// The process-wide instance.
    pub fn global() -> &'static Registries {
        &GLOBAL
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// End the registration phase.
    pub fn seal(&self) {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            debug!(
                operators = self.operators.read().len(),
                classes = self.classes.read().len(),
                "registries sealed"
            );
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    fn ensure_open(&self, what: impl FnOnce() -> String) -> Result<(), CallError> {
        if self.is_sealed() {
            return Err(sealed(&what()));
        }
        Ok(())
    }

    /// Read access for introspection. Do not hold across calls that register.
    pub fn operators(&self) -> RwLockReadGuard<'_, OperatorRegistry> {
        self.operators.read()
    }

    /// Read access for introspection. Do not hold across calls that register.
    pub fn classes(&self) -> RwLockReadGuard<'_, ClassRegistry> {
        self.classes.read()
    }

    // Registration

    pub fn register_schema(&self, qualified_name: &str, schema: &str) -> Result<(), CallError> {
        self.ensure_open(|| format!("schema for {qualified_name}"))?;
        self.operators.write().register_schema(qualified_name, schema);
        Ok(())
    }

    pub fn register_implementation(
        &self,
        qualified_name: &str,
        key: DispatchKey,
        implementation: Invokable,
    ) -> Result<(), CallError> {
        self.ensure_open(|| format!("{key} implementation of {qualified_name}"))?;
        self.operators
            .write()
            .register_implementation(qualified_name, key, implementation);
        Ok(())
    }

    pub fn register_class(&self, namespace: &str, class_name: &str) -> Result<String, CallError> {
        self.ensure_open(|| format!("class {namespace}::{class_name}"))?;
        self.classes.write().register_class(namespace, class_name)
    }

    pub fn register_constructor(
        &self,
        qualified_name: &str,
        constructor: Invokable,
    ) -> Result<(), CallError> {
        self.ensure_open(|| format!("constructor for {qualified_name}"))?;
        self.classes
            .write()
            .register_constructor(qualified_name, constructor)
    }

    pub fn register_method(
        &self,
        qualified_name: &str,
        method: &str,
        implementation: Invokable,
    ) -> Result<(), CallError> {
        self.ensure_open(|| format!("method {qualified_name}.{method}"))?;
        self.classes
            .write()
            .register_method(qualified_name, method, implementation)
    }

    pub fn register_static_method(
        &self,
        qualified_name: &str,
        method: &str,
        implementation: Invokable,
    ) -> Result<(), CallError> {
        self.ensure_open(|| format!("static method {qualified_name}.{method}"))?;
        self.classes
            .write()
            .register_static_method(qualified_name, method, implementation)
    }

    // Calls

    /// Run an operator with no arguments; see [`OperatorRegistry::execute_operator`].
    #[tracing::instrument(level = "debug", skip_all, fields(operator = qualified_name, %key))]
    pub fn execute_operator(&self, qualified_name: &str, key: DispatchKey) -> Result<bool, CallError> {
        let lookup = self.operators.read().lookup(qualified_name, key);
        operators::execute(qualified_name, lookup)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(operator = qualified_name, %key))]
    pub fn execute_operator_with_args(
        &self,
        qualified_name: &str,
        key: DispatchKey,
        args: &ArgumentList,
    ) -> Result<CallResult, CallError> {
        let lookup = self.operators.read().lookup(qualified_name, key);
        operators::execute_with_args(qualified_name, lookup, args)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(class = qualified_name))]
    pub fn call_constructor_with_args(
        &self,
        qualified_name: &str,
        args: &ArgumentList,
    ) -> Result<CallResult, CallError> {
        let candidates = self.classes.read().constructors_of(qualified_name)?;
        classes::construct(qualified_name, &candidates, args)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(class = qualified_name, method = method))]
    pub fn call_method_with_args(
        &self,
        qualified_name: &str,
        method: &str,
        args: &ArgumentList,
    ) -> Result<CallResult, CallError> {
        let adapter = self.classes.read().method_of(qualified_name, method)?;
        adapter.call_with_args(args)
    }

    pub fn call_method_on(
        &self,
        qualified_name: &str,
        method: &str,
        instance: &Value,
        args: &ArgumentList,
    ) -> Result<CallResult, CallError> {
        let full = ArgumentList::with_receiver(instance.clone(), args);
        self.call_method_with_args(qualified_name, method, &full)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(class = qualified_name, method = method))]
    pub fn call_static_method_with_args(
        &self,
        qualified_name: &str,
        method: &str,
        args: &ArgumentList,
    ) -> Result<CallResult, CallError> {
        let adapter = self.classes.read().static_method_of(qualified_name, method)?;
        adapter.call_with_args(args)
    }

    /// Combined report of both registries.
    pub fn describe(&self) -> String {
        let mut out = self.operators.read().describe();
        out.push_str(&self.classes.read().describe());
        if self.is_sealed() {
            let _ = writeln!(out, "sealed");
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests;
