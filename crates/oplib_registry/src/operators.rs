//! Operator registry.
//!
//! Operators are keyed by qualified name (`"<namespace>::<name>"`). Each one
//! carries an optional schema string and at most one implementation per
//! [`DispatchKey`]. Entries are created lazily by whichever registration
//! arrives first.
//!
//! # Resolution
//!
//! A call under key `K` uses the implementation registered for `K`. If there
//! is none and `K` is not CPU, the CPU implementation is used instead.
//! Otherwise the call fails with `OperatorNotImplemented`.

use std::fmt::Write as _;
use std::sync::Arc;

use oplib_core::errors::{not_found, operator_failed, operator_not_implemented};
use oplib_core::{ArgumentList, CallError, CallResult, Entity, Invokable};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::dispatch_key::DispatchKey;

/// One registered operator.
pub struct OperatorRegistration {
    qualified_name: String,
    schema: Option<String>,
    implementations: FxHashMap<DispatchKey, Arc<Invokable>>,
}

impl OperatorRegistration {
    fn new(qualified_name: &str) -> Self {
        OperatorRegistration {
            qualified_name: qualified_name.to_string(),
            schema: None,
            implementations: FxHashMap::default(),
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Implementation registered for exactly `key`, without fallback.
    pub fn implementation(&self, key: DispatchKey) -> Option<&Invokable> {
        self.implementations.get(&key).map(Arc::as_ref)
    }

    pub fn has_implementation(&self, key: DispatchKey) -> bool {
        self.implementations.contains_key(&key)
    }

    /// Keys with an implementation, sorted.
    pub fn keys(&self) -> Vec<DispatchKey> {
        let mut keys: Vec<_> = self.implementations.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Pick the implementation for `key`, falling back to CPU.
    pub(crate) fn resolve(&self, key: DispatchKey) -> Result<Resolved, CallError> {
        if let Some(adapter) = self.implementations.get(&key) {
            trace!(operator = %self.qualified_name, %key, "resolved implementation");
            return Ok(Resolved {
                adapter: Arc::clone(adapter),
                requested: key,
                fallback: false,
            });
        }
        if key == DispatchKey::FALLBACK {
            return Err(operator_not_implemented(&self.qualified_name, &[key]));
        }
        match self.implementations.get(&DispatchKey::FALLBACK) {
            Some(adapter) => {
                trace!(
                    operator = %self.qualified_name,
                    %key,
                    fallback = %DispatchKey::FALLBACK,
                    "no implementation for key, using fallback"
                );
                Ok(Resolved {
                    adapter: Arc::clone(adapter),
                    requested: key,
                    fallback: true,
                })
            }
            None => Err(operator_not_implemented(
                &self.qualified_name,
                &[key, DispatchKey::FALLBACK],
            )),
        }
    }
}

/// An implementation picked for a call, detached from the registry.
pub(crate) struct Resolved {
    adapter: Arc<Invokable>,
    requested: DispatchKey,
    fallback: bool,
}

impl Resolved {
    /// Invoke, attaching operator name and key to any failure.
    pub(crate) fn invoke(
        &self,
        qualified_name: &str,
        args: &ArgumentList,
    ) -> Result<CallResult, CallError> {
        self.adapter.call_with_args(args).map_err(|err| {
            operator_failed(qualified_name, self.requested.as_str(), self.fallback, err)
        })
    }
}

/// Outcome of looking an operator up: the outer error is `NotFound`, the
/// inner one a failed resolution.
pub(crate) type Lookup = Result<Result<Resolved, CallError>, CallError>;

/// Run a looked-up operator with no arguments.
///
/// Only `NotFound` is returned as an error. A missing implementation or a
/// failing call is logged and reported as `Ok(false)`.
pub(crate) fn execute(qualified_name: &str, lookup: Lookup) -> Result<bool, CallError> {
    let outcome = lookup?
        .and_then(|resolved| resolved.invoke(qualified_name, &ArgumentList::new()));
    match outcome {
        Ok(_) => Ok(true),
        Err(err) => {
            warn!(operator = qualified_name, %err, "operator execution failed");
            Ok(false)
        }
    }
}

/// Run a looked-up operator, propagating every failure.
pub(crate) fn execute_with_args(
    qualified_name: &str,
    lookup: Lookup,
    args: &ArgumentList,
) -> Result<CallResult, CallError> {
    lookup??.invoke(qualified_name, args)
}

/// Qualified operator name to registration.
#[derive(Default)]
pub struct OperatorRegistry {
    operators: FxHashMap<String, OperatorRegistration>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, qualified_name: &str) -> &mut OperatorRegistration {
        self.operators
            .entry(qualified_name.to_string())
            .or_insert_with(|| OperatorRegistration::new(qualified_name))
    }

    /// Set (or overwrite) the schema of an operator, creating it if needed.
    pub fn register_schema(&mut self, qualified_name: &str, schema: &str) {
        debug!(operator = qualified_name, schema, "registering schema");
        self.entry(qualified_name).schema = Some(schema.to_string());
    }

    /// Set (or overwrite) the implementation for `key`, creating the operator if needed.
    pub fn register_implementation(
        &mut self,
        qualified_name: &str,
        key: DispatchKey,
        implementation: Invokable,
    ) {
        debug!(operator = qualified_name, %key, "registering implementation");
        self.entry(qualified_name)
            .implementations
            .insert(key, Arc::new(implementation));
    }

    pub fn find_operator(&self, qualified_name: &str) -> Option<&OperatorRegistration> {
        self.operators.get(qualified_name)
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.operators.contains_key(qualified_name)
    }

    /// Registration for `qualified_name`, or `NotFound`.
    pub fn registration(&self, qualified_name: &str) -> Result<&OperatorRegistration, CallError> {
        self.find_operator(qualified_name)
            .ok_or_else(|| not_found(Entity::Operator, qualified_name))
    }

    /// Run an operator with no arguments.
    ///
    /// Fails only if the operator is unknown. A missing implementation or a
    /// failing call is logged and reported as `Ok(false)`.
    #[tracing::instrument(level = "debug", skip_all, fields(operator = qualified_name, %key))]
    pub fn execute_operator(&self, qualified_name: &str, key: DispatchKey) -> Result<bool, CallError> {
        execute(qualified_name, self.lookup(qualified_name, key))
    }

    /// Run an operator, propagating every failure.
    #[tracing::instrument(level = "debug", skip_all, fields(operator = qualified_name, %key))]
    pub fn execute_operator_with_args(
        &self,
        qualified_name: &str,
        key: DispatchKey,
        args: &ArgumentList,
    ) -> Result<CallResult, CallError> {
        execute_with_args(qualified_name, self.lookup(qualified_name, key), args)
    }

    /// Resolve without invoking. The result owns its adapter, so callers may
    /// release any lock on the registry before running it.
    pub(crate) fn lookup(&self, qualified_name: &str, key: DispatchKey) -> Lookup {
        Ok(self.registration(qualified_name)?.resolve(key))
    }

    /// Every qualified operator name, sorted.
    pub fn list_all_operators(&self) -> Vec<String> {
        let mut names: Vec<_> = self.operators.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Registrations in unspecified order.
    pub fn operators(&self) -> impl Iterator<Item = &OperatorRegistration> {
        self.operators.values()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Human-readable listing of every operator, its schema and implementations.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "operators: {}", self.len());
        for name in self.list_all_operators() {
            let Some(registration) = self.find_operator(&name) else {
                continue;
            };
            let _ = writeln!(out, "  {name}");
            if let Some(schema) = registration.schema() {
                let _ = writeln!(out, "    schema: {schema}");
            }
            for key in registration.keys() {
                match registration.implementation(key).and_then(Invokable::signature) {
                    Some(signature) => {
                        let _ = writeln!(out, "    {key}: {signature}");
                    }
                    None => {
                        let _ = writeln!(out, "    {key}: <raw>");
                    }
                }
            }
        }
        out
    }
}
