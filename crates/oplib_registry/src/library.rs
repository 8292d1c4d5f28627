//! Registration sessions.
//!
//! A [`Library`] binds a namespace, a [`LibraryKind`] and an optional
//! dispatch key to one [`Registries`] instance. Its builder methods qualify
//! names, derive adapters from plain Rust callables and forward to the
//! registries. Failures do not interrupt the session: they are logged,
//! collected, and the first one is returned by [`Library::finish`].
//!
//! ```
//! use oplib_registry::{args, DispatchKey, Library, LibraryKind, Registries};
//!
//! let registries = Registries::default();
//! let mut lib = Library::new(&registries, LibraryKind::Def, "ns", None);
//! lib.def_fn("add(int a, int b) -> int", |a: i64, b: i64| a + b);
//! lib.finish().unwrap();
//!
//! let result = registries
//!     .execute_operator_with_args("ns::add", DispatchKey::Cuda, &args![2, 3])
//!     .unwrap();
//! assert_eq!(result.get::<i64>().unwrap(), 5);
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use oplib_core::{CallError, Constructible, FromArgs, IntoInvokable, IntoMethod, Invokable};
use tracing::{error, warn};

use crate::dispatch_key::DispatchKey;
use crate::registries::Registries;

/// What a library block may register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LibraryKind {
    /// Defines operators and classes.
    Def,
    /// Adds definitions to a namespace defined elsewhere.
    Fragment,
    /// Supplies implementations only; schema definitions are ignored.
    Impl,
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryKind::Def => write!(f, "def"),
            LibraryKind::Fragment => write!(f, "fragment"),
            LibraryKind::Impl => write!(f, "impl"),
        }
    }
}

/// Where a library was declared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Operator name from a name or schema: the text before the first `(`.
pub fn operator_name(name_or_schema: &str) -> &str {
    name_or_schema
        .split_once('(')
        .map_or(name_or_schema, |(name, _)| name)
        .trim()
}

/// Registration session for one namespace.
pub struct Library<'r> {
    registries: &'r Registries,
    kind: LibraryKind,
    namespace: String,
    dispatch_key: Option<DispatchKey>,
    location: Option<SourceLocation>,
    errors: Vec<CallError>,
}

impl<'r> Library<'r> {
    pub fn new(
        registries: &'r Registries,
        kind: LibraryKind,
        namespace: impl Into<String>,
        dispatch_key: Option<DispatchKey>,
    ) -> Self {
        Library {
            registries,
            kind,
            namespace: namespace.into(),
            dispatch_key,
            location: None,
            errors: Vec::new(),
        }
    }

    /// Record the declaration site.
    #[must_use]
    pub fn at(mut self, file: &'static str, line: u32) -> Self {
        self.location = Some(SourceLocation { file, line });
        self
    }

    pub fn kind(&self) -> LibraryKind {
        self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn dispatch_key(&self) -> Option<DispatchKey> {
        self.dispatch_key
    }

    pub fn location(&self) -> Option<SourceLocation> {
        self.location
    }

    pub fn registries(&self) -> &'r Registries {
        self.registries
    }

    /// One-line summary, e.g. `library impl ns (CUDA) at src/ops.rs:12`.
    pub fn info(&self) -> String {
        let mut info = format!("library {} {}", self.kind, self.namespace);
        if let Some(key) = self.dispatch_key {
            info.push_str(&format!(" ({key})"));
        }
        if let Some(location) = self.location {
            info.push_str(&format!(" at {location}"));
        }
        info
    }

    /// Failures collected so far.
    pub fn errors(&self) -> &[CallError] {
        &self.errors
    }

    /// End the session, returning the first failure if any.
    pub fn finish(self) -> Result<(), CallError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn qualify(&self, name: &str) -> String {
        format!("{}::{}", self.namespace, name)
    }

    fn implementation_key(&self) -> DispatchKey {
        self.dispatch_key.unwrap_or(DispatchKey::FALLBACK)
    }

    fn record(&mut self, result: Result<(), CallError>) -> &mut Self {
        if let Err(err) = result {
            error!(
                library = %self.namespace,
                kind = %self.kind,
                location = ?self.location,
                %err,
                "registration failed"
            );
            self.errors.push(err);
        }
        self
    }

    // Operators

    /// Declare an operator schema, e.g. `"add(Tensor a, Tensor b) -> Tensor"`.
    ///
    /// Ignored with a warning in `Impl` libraries.
    pub fn def(&mut self, schema: &str) -> &mut Self {
        if self.kind == LibraryKind::Impl {
            warn!(library = %self.namespace, schema, "schema definition ignored in impl library");
            return self;
        }
        let qualified_name = self.qualify(operator_name(schema));
        let result = self.registries.register_schema(&qualified_name, schema);
        self.record(result)
    }

    /// Define an operator with an implementation.
    ///
    /// A schema (anything containing `(`) is registered as well. The
    /// implementation goes under the library's dispatch key, or CPU.
    pub fn def_fn<M, F: IntoInvokable<M>>(&mut self, name_or_schema: &str, f: F) -> &mut Self {
        let qualified_name = self.qualify(operator_name(name_or_schema));
        if name_or_schema.contains('(') {
            let result = self.registries.register_schema(&qualified_name, name_or_schema);
            self.record(result);
        }
        let key = self.implementation_key();
        let result =
            self.registries
                .register_implementation(&qualified_name, key, f.into_invokable());
        self.record(result)
    }

    /// Add an implementation for an operator, without touching its schema.
    pub fn impl_fn<M, F: IntoInvokable<M>>(&mut self, name: &str, f: F) -> &mut Self {
        let qualified_name = self.qualify(operator_name(name));
        let key = self.implementation_key();
        let result =
            self.registries
                .register_implementation(&qualified_name, key, f.into_invokable());
        self.record(result)
    }

    // Classes

    /// Register a class and return a builder for its members.
    pub fn class<T: Any + Send + Sync>(&mut self, class_name: &str) -> ClassBuilder<'_, 'r, T> {
        let result = self.registries.register_class(&self.namespace, class_name);
        let registered = result.is_ok();
        let qualified_name = self.qualify(class_name);
        self.record(result.map(|_| ()));
        ClassBuilder {
            library: self,
            qualified_name,
            registered,
            _instance: PhantomData,
        }
    }
}

/// Member registration for one class.
///
/// If the class itself could not be registered, member registrations are
/// skipped; the class failure is already recorded on the library.
pub struct ClassBuilder<'l, 'r, T> {
    library: &'l mut Library<'r>,
    qualified_name: String,
    registered: bool,
    _instance: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<'_, '_, T> {
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Add a constructor taking `Args`, e.g. `def_init::<(i64,)>()`.
    pub fn def_init<Args>(&mut self) -> &mut Self
    where
        Args: FromArgs,
        T: Constructible<Args>,
    {
        if self.registered {
            let result = self
                .library
                .registries
                .register_constructor(&self.qualified_name, Invokable::constructor::<T, Args>());
            self.library.record(result);
        }
        self
    }

    /// Add an instance method taking `&T` or `&mut T` first.
    pub fn def<M, F: IntoMethod<T, M>>(&mut self, name: &str, method: F) -> &mut Self {
        if self.registered {
            let result = self.library.registries.register_method(
                &self.qualified_name,
                name,
                method.into_method(),
            );
            self.library.record(result);
        }
        self
    }

    /// Add a static method.
    pub fn def_static<M, F: IntoInvokable<M>>(&mut self, name: &str, f: F) -> &mut Self {
        if self.registered {
            let result = self.library.registries.register_static_method(
                &self.qualified_name,
                name,
                f.into_invokable(),
            );
            self.library.record(result);
        }
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests;
