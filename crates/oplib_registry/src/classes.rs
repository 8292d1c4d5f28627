//! Class registry.
//!
//! A class is a qualified name with an ordered list of constructors and two
//! name-keyed method tables (instance and static). Instances themselves are
//! never stored here; constructors return them as object values and callers
//! pass them back as the receiver of instance methods.

use std::fmt::Write as _;
use std::sync::Arc;

use oplib_core::errors::{duplicate_class, method_not_found, no_matching_overload, not_found};
use oplib_core::{ArgumentList, CallError, CallResult, Entity, Invokable, Value};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::config::ClassRedefinition;

/// One registered class.
pub struct ClassRegistration {
    namespace: String,
    class_name: String,
    qualified_name: String,
    constructors: Vec<Arc<Invokable>>,
    methods: FxHashMap<String, Arc<Invokable>>,
    static_methods: FxHashMap<String, Arc<Invokable>>,
}

impl ClassRegistration {
    fn new(namespace: &str, class_name: &str) -> Self {
        ClassRegistration {
            namespace: namespace.to_string(),
            class_name: class_name.to_string(),
            qualified_name: format!("{namespace}::{class_name}"),
            constructors: Vec::new(),
            methods: FxHashMap::default(),
            static_methods: FxHashMap::default(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Constructors in registration order.
    pub fn constructors(&self) -> impl Iterator<Item = &Invokable> {
        self.constructors.iter().map(Arc::as_ref)
    }

    pub fn constructor_count(&self) -> usize {
        self.constructors.len()
    }

    pub fn method(&self, name: &str) -> Option<&Invokable> {
        self.methods.get(name).map(Arc::as_ref)
    }

    pub fn static_method(&self, name: &str) -> Option<&Invokable> {
        self.static_methods.get(name).map(Arc::as_ref)
    }

    /// Instance method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        sorted_names(&self.methods)
    }

    /// Static method names, sorted.
    pub fn static_method_names(&self) -> Vec<&str> {
        sorted_names(&self.static_methods)
    }

    fn member_count(&self) -> usize {
        self.constructors.len() + self.methods.len() + self.static_methods.len()
    }
}

fn sorted_names(table: &FxHashMap<String, Arc<Invokable>>) -> Vec<&str> {
    let mut names: Vec<_> = table.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

/// Try each constructor in order; the first success wins.
///
/// Candidate failures are expected during overload resolution and are only
/// traced.
pub(crate) fn construct(
    qualified_name: &str,
    candidates: &[Arc<Invokable>],
    args: &ArgumentList,
) -> Result<CallResult, CallError> {
    if candidates.is_empty() {
        return Err(not_found(Entity::Constructor, qualified_name));
    }
    for (index, candidate) in candidates.iter().enumerate() {
        match candidate.call_with_args(args) {
            Ok(result) => {
                trace!(class = qualified_name, candidate = index, "constructor matched");
                return Ok(result);
            }
            Err(err) => {
                trace!(class = qualified_name, candidate = index, %err, "constructor rejected");
            }
        }
    }
    Err(no_matching_overload(qualified_name, candidates.len()))
}

/// Qualified class name to registration.
#[derive(Default)]
pub struct ClassRegistry {
    classes: FxHashMap<String, ClassRegistration>,
    redefinition: ClassRedefinition,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_redefinition(redefinition: ClassRedefinition) -> Self {
        ClassRegistry {
            classes: FxHashMap::default(),
            redefinition,
        }
    }

    pub fn redefinition(&self) -> ClassRedefinition {
        self.redefinition
    }

    // Registration

    /// Register `namespace::class_name` and return the qualified name.
    ///
    /// An existing registration is handled per [`ClassRedefinition`].
    pub fn register_class(
        &mut self,
        namespace: &str,
        class_name: &str,
    ) -> Result<String, CallError> {
        let registration = ClassRegistration::new(namespace, class_name);
        let qualified_name = registration.qualified_name.clone();

        match self.classes.get(&qualified_name) {
            None => {
                debug!(class = %qualified_name, "registering class");
                self.classes.insert(qualified_name.clone(), registration);
            }
            Some(existing) => match self.redefinition {
                ClassRedefinition::Reject => return Err(duplicate_class(&qualified_name)),
                ClassRedefinition::Merge => {
                    debug!(class = %qualified_name, "class already registered, merging");
                }
                ClassRedefinition::Replace => {
                    warn!(
                        class = %qualified_name,
                        dropped = existing.member_count(),
                        "class already registered, replacing"
                    );
                    self.classes.insert(qualified_name.clone(), registration);
                }
            },
        }
        Ok(qualified_name)
    }

    fn class_mut(&mut self, qualified_name: &str) -> Result<&mut ClassRegistration, CallError> {
        self.classes
            .get_mut(qualified_name)
            .ok_or_else(|| not_found(Entity::Class, qualified_name))
    }

    /// Append a constructor overload.
    pub fn register_constructor(
        &mut self,
        qualified_name: &str,
        constructor: Invokable,
    ) -> Result<(), CallError> {
        let class = self.class_mut(qualified_name)?;
        debug!(
            class = qualified_name,
            overload = class.constructors.len(),
            "registering constructor"
        );
        class.constructors.push(Arc::new(constructor));
        Ok(())
    }

    /// Add or overwrite an instance method.
    pub fn register_method(
        &mut self,
        qualified_name: &str,
        method: &str,
        implementation: Invokable,
    ) -> Result<(), CallError> {
        let class = self.class_mut(qualified_name)?;
        debug!(class = qualified_name, method, "registering method");
        class
            .methods
            .insert(method.to_string(), Arc::new(implementation));
        Ok(())
    }

    /// Add or overwrite a static method.
    pub fn register_static_method(
        &mut self,
        qualified_name: &str,
        method: &str,
        implementation: Invokable,
    ) -> Result<(), CallError> {
        let class = self.class_mut(qualified_name)?;
        debug!(class = qualified_name, method, "registering static method");
        class
            .static_methods
            .insert(method.to_string(), Arc::new(implementation));
        Ok(())
    }

    // Lookup

    /// Registration for `qualified_name`, or `NotFound`.
    pub fn registration(&self, qualified_name: &str) -> Result<&ClassRegistration, CallError> {
        self.classes
            .get(qualified_name)
            .ok_or_else(|| not_found(Entity::Class, qualified_name))
    }

    pub(crate) fn constructors_of(
        &self,
        qualified_name: &str,
    ) -> Result<Vec<Arc<Invokable>>, CallError> {
        Ok(self.registration(qualified_name)?.constructors.clone())
    }

    pub(crate) fn method_of(
        &self,
        qualified_name: &str,
        method: &str,
    ) -> Result<Arc<Invokable>, CallError> {
        self.registration(qualified_name)?
            .methods
            .get(method)
            .cloned()
            .ok_or_else(|| method_not_found(qualified_name, method, false))
    }

    pub(crate) fn static_method_of(
        &self,
        qualified_name: &str,
        method: &str,
    ) -> Result<Arc<Invokable>, CallError> {
        self.registration(qualified_name)?
            .static_methods
            .get(method)
            .cloned()
            .ok_or_else(|| method_not_found(qualified_name, method, true))
    }

    // Calls

    /// Construct an instance, trying constructors in registration order.
    #[tracing::instrument(level = "debug", skip_all, fields(class = qualified_name))]
    pub fn call_constructor_with_args(
        &self,
        qualified_name: &str,
        args: &ArgumentList,
    ) -> Result<CallResult, CallError> {
        let candidates = self.constructors_of(qualified_name)?;
        construct(qualified_name, &candidates, args)
    }

    /// Call an instance method. The receiver is `args[0]`.
    #[tracing::instrument(level = "debug", skip_all, fields(class = qualified_name, method = method))]
    pub fn call_method_with_args(
        &self,
        qualified_name: &str,
        method: &str,
        args: &ArgumentList,
    ) -> Result<CallResult, CallError> {
        self.method_of(qualified_name, method)?.call_with_args(args)
    }

    /// Call an instance method on `instance` with the remaining `args`.
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
        self.static_method_of(qualified_name, method)?
            .call_with_args(args)
    }

    // Introspection

    pub fn has_class(&self, qualified_name: &str) -> bool {
        self.classes.contains_key(qualified_name)
    }

    pub fn has_method(&self, qualified_name: &str, method: &str) -> bool {
        self.classes
            .get(qualified_name)
            .is_some_and(|class| class.methods.contains_key(method))
    }

    pub fn has_static_method(&self, qualified_name: &str, method: &str) -> bool {
        self.classes
            .get(qualified_name)
            .is_some_and(|class| class.static_methods.contains_key(method))
    }

    pub fn class(&self, qualified_name: &str) -> Option<&ClassRegistration> {
        self.classes.get(qualified_name)
    }

    /// Every qualified class name, sorted.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Human-readable listing of every class and its members.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "classes: {}", self.len());
        for name in self.class_names() {
            let Some(class) = self.classes.get(name) else {
                continue;
            };
            let _ = writeln!(out, "  {name}");
            for (index, ctor) in class.constructors.iter().enumerate() {
                let _ = writeln!(out, "    init[{index}]: {}", describe_adapter(ctor));
            }
            for method in class.method_names() {
                if let Some(adapter) = class.method(method) {
                    let _ = writeln!(out, "    def {method}: {}", describe_adapter(adapter));
                }
            }
            for method in class.static_method_names() {
                if let Some(adapter) = class.static_method(method) {
                    let _ = writeln!(out, "    static {method}: {}", describe_adapter(adapter));
                }
            }
        }
        out
    }
}

fn describe_adapter(adapter: &Invokable) -> String {
    adapter
        .signature()
        .map_or_else(|| "<raw>".to_string(), ToString::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests;
