//! Named registration units.
//!
//! A [`LibraryInit`] is a `static` describing one library block: kind,
//! namespace, dispatch key, declaration site and the function that performs
//! the registrations. It is declared with [`library!`](crate::library),
//! [`library_fragment!`](crate::library_fragment) or
//! [`library_impl!`](crate::library_impl) and run by the embedding program
//! before the first lookup.
//!
//! ```
//! use oplib_registry::{args, library, DispatchKey, Registries};
//!
//! library!(MATH, math, |m| {
//!     m.def_fn("mul(int a, int b) -> int", |a: i64, b: i64| a * b);
//! });
//!
//! MATH.run().unwrap();
//! let product = Registries::global()
//!     .execute_operator_with_args("math::mul", DispatchKey::Cpu, &args![6, 7])
//!     .unwrap();
//! assert_eq!(product.get::<i64>().unwrap(), 42);
//! ```

use std::sync::OnceLock;

use oplib_core::CallError;
use tracing::debug;

use crate::dispatch_key::DispatchKey;
use crate::library::{Library, LibraryKind, SourceLocation};
use crate::registries::Registries;

/// Registration function of a library block.
pub type InitFn = for<'l, 'r> fn(&'l mut Library<'r>);

/// A library block that registers into the registries when run.
pub struct LibraryInit {
    kind: LibraryKind,
    namespace: &'static str,
    dispatch_key: Option<DispatchKey>,
    location: SourceLocation,
    init: InitFn,
    outcome: OnceLock<Result<(), CallError>>,
}

impl LibraryInit {
    pub const fn new(
        kind: LibraryKind,
        namespace: &'static str,
        dispatch_key: Option<DispatchKey>,
        file: &'static str,
        line: u32,
        init: InitFn,
    ) -> Self {
        LibraryInit {
            kind,
            namespace,
            dispatch_key,
            location: SourceLocation { file, line },
            init,
            outcome: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> LibraryKind {
        self.kind
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn dispatch_key(&self) -> Option<DispatchKey> {
        self.dispatch_key
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// Register into [`Registries::global`], at most once per process.
    ///
    /// Later calls return the outcome of the first.
    pub fn run(&self) -> Result<(), CallError> {
        self.outcome
            .get_or_init(|| self.apply(Registries::global()))
            .clone()
    }

    pub fn has_run(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Register into `registries`. Not memoized.
    pub fn apply(&self, registries: &Registries) -> Result<(), CallError> {
        debug!(
            kind = %self.kind,
            namespace = self.namespace,
            location = %self.location,
            "applying library"
        );
        let mut library = Library::new(registries, self.kind, self.namespace, self.dispatch_key)
            .at(self.location.file, self.location.line);
        (self.init)(&mut library);
        library.finish()
    }
}

/// Declare a `Def` library block as a `static` [`LibraryInit`].
///
/// ```ignore
/// library!(pub MY_OPS, myops, |m| {
///     m.def("relu(Tensor x) -> Tensor");
/// });
/// ```
#[macro_export]
macro_rules! library {
    ($vis:vis $unit:ident, $namespace:ident, |$lib:ident| $body:block) => {
        $crate::__library_init!(
            $vis $unit, Def, $namespace, ::core::option::Option::None, |$lib| $body
        );
    };
}

/// Declare a `Fragment` library block as a `static` [`LibraryInit`].
#[macro_export]
macro_rules! library_fragment {
    ($vis:vis $unit:ident, $namespace:ident, |$lib:ident| $body:block) => {
        $crate::__library_init!(
            $vis $unit, Fragment, $namespace, ::core::option::Option::None, |$lib| $body
        );
    };
}

/// Declare an `Impl` library block for one dispatch key.
///
/// ```ignore
/// library_impl!(MY_OPS_CUDA, myops, Cuda, |m| {
///     m.impl_fn("relu", relu_cuda);
/// });
/// ```
#[macro_export]
macro_rules! library_impl {
    ($vis:vis $unit:ident, $namespace:ident, $key:ident, |$lib:ident| $body:block) => {
        $crate::__library_init!(
            $vis $unit,
            Impl,
            $namespace,
            ::core::option::Option::Some($crate::DispatchKey::$key),
            |$lib| $body
        );
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __library_init {
    ($vis:vis $unit:ident, $kind:ident, $namespace:ident, $key:expr, |$lib:ident| $body:block) => {
        $vis static $unit: $crate::LibraryInit = $crate::LibraryInit::new(
            $crate::LibraryKind::$kind,
            ::core::stringify!($namespace),
            $key,
            ::core::file!(),
            ::core::line!(),
            {
                fn init($lib: &mut $crate::Library<'_>) $body
                init
            },
        );
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests;
