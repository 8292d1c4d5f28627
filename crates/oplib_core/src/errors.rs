//! Error types for registration and invocation.
//!
//! Every fallible path in the registries funnels through `CallError`.
//! `CallErrorKind` carries the structured category so callers can match on
//! the failure instead of parsing strings; factory functions (e.g.
//! `not_found()`, `wrong_arg_count()`) are the construction API and fill in
//! both `kind` and `message`.
//!
//! # Wrapping
//!
//! Adapter boundaries re-raise inner failures as `CallFailed`, and the
//! operator path re-raises them as `OperatorFailed`. Both keep the original
//! error as `source`; `CallError::root()` walks the chain back to it.

use std::fmt;

use thiserror::Error;

/// Result of an invocation through the registries.
pub type CallOutcome<T> = Result<T, CallError>;

/// What kind of registered entity a lookup was looking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
    Class,
    Operator,
    Constructor,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class => write!(f, "class"),
            Self::Operator => write!(f, "operator"),
            Self::Constructor => write!(f, "constructor for"),
        }
    }
}

/// Which adapter shape raised a wrapped failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOrigin {
    /// Free function or closure with an introspected signature.
    Function,
    /// Bound method (receiver passed first).
    Method,
    /// Raw closure over the whole argument list.
    Closure,
    /// Generated constructor adapter.
    Constructor,
}

impl fmt::Display for CallOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Method => write!(f, "method"),
            Self::Closure => write!(f, "closure"),
            Self::Constructor => write!(f, "constructor"),
        }
    }
}

/// Typed error category.
///
/// The `Display` impl (derived through `thiserror`) produces the
/// human-readable message stored on `CallError::message`.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CallErrorKind {
    // Lookup
    #[error("{entity} {name} not found")]
    NotFound { entity: Entity, name: String },
    #[error("{} {method} not found in {class}", if *is_static { "static method" } else { "method" })]
    MethodNotFound {
        class: String,
        method: String,
        is_static: bool,
    },

    // Arguments
    #[error("{}", arity_message(context, *expected, *got))]
    ArityMismatch {
        context: String,
        expected: usize,
        got: usize,
    },
    #[error("{}", conversion_message(*index, from, to))]
    Conversion {
        index: Option<usize>,
        from: String,
        to: String,
    },
    #[error("argument index {index} out of range for {len} arguments")]
    IndexOutOfRange { index: usize, len: usize },

    // Dispatch
    #[error("no suitable constructor found for {class} ({candidates} tried)")]
    NoMatchingOverload { class: String, candidates: usize },
    #[error("no implementation found for {name} with {}", tried.join(" or "))]
    OperatorNotImplemented { name: String, tried: Vec<String> },
    #[error("invokable is not bound to a callable")]
    UnboundCallable,
    #[error("no return value (void result), cannot convert to {to}")]
    VoidResult { to: String },
    #[error("cannot borrow {type_name}{}", if *exclusive { " mutably: instance is already in use" } else { ": instance is mutably borrowed" })]
    ReceiverBorrowed { type_name: String, exclusive: bool },

    // Wrapped failures
    #[error("{origin} call failed: {source}")]
    CallFailed {
        origin: CallOrigin,
        source: Box<CallError>,
    },
    #[error("error executing operator {name} with {key}{}: {source}", if *fallback { " (CPU fallback)" } else { "" })]
    OperatorFailed {
        name: String,
        key: String,
        fallback: bool,
        source: Box<CallError>,
    },

    // Registration
    #[error("class {name} is already registered")]
    DuplicateClass { name: String },
    #[error("registries are sealed, cannot register {what}")]
    Sealed { what: String },

    /// Failure reported by a fallible native function.
    #[error("{message}")]
    Custom { message: String },
}

fn arity_message(context: &str, expected: usize, got: usize) -> String {
    let arg_word = if expected == 1 {
        "argument"
    } else {
        "arguments"
    };
    format!("{context} expects {expected} {arg_word}, got {got}")
}

fn conversion_message(index: Option<usize>, from: &str, to: &str) -> String {
    match index {
        Some(index) => format!("cannot convert argument {index} from {from} to {to}"),
        None => format!("cannot convert {from} to {to}"),
    }
}

/// Registration or invocation error.
#[derive(Clone, Debug, PartialEq)]
pub struct CallError {
    /// Structured error category.
    pub kind: CallErrorKind,
    /// Human-readable message, equal to `kind.to_string()`.
    pub message: String,
    /// Additional context attached while the error propagated.
    pub notes: Vec<String>,
}

impl CallError {
    /// Create a `Custom` error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_kind(CallErrorKind::Custom {
            message: message.into(),
        })
    }

    fn from_kind(kind: CallErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            notes: Vec::new(),
        }
    }

    /// Add a context note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// The innermost error, unwrapping `CallFailed` and `OperatorFailed`.
    pub fn root(&self) -> &CallError {
        let mut current = self;
        while let CallErrorKind::CallFailed { source, .. }
        | CallErrorKind::OperatorFailed { source, .. } = &current.kind
        {
            current = source;
        }
        current
    }

    /// Kind of the innermost error.
    pub fn root_kind(&self) -> &CallErrorKind {
        &self.root().kind
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for note in &self.notes {
            write!(f, " (note: {note})")?;
        }
        Ok(())
    }
}

impl std::error::Error for CallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            CallErrorKind::CallFailed { source, .. }
            | CallErrorKind::OperatorFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

// Lookup errors

/// A class, operator or constructor set is not registered.
#[cold]
pub fn not_found(entity: Entity, name: &str) -> CallError {
    CallError::from_kind(CallErrorKind::NotFound {
        entity,
        name: name.to_string(),
    })
}

/// The class exists but the named method does not.
#[cold]
pub fn method_not_found(class: &str, method: &str, is_static: bool) -> CallError {
    CallError::from_kind(CallErrorKind::MethodNotFound {
        class: class.to_string(),
        method: method.to_string(),
        is_static,
    })
}

// Argument errors

/// Argument count mismatch.
#[cold]
pub fn wrong_arg_count(context: &str, expected: usize, got: usize) -> CallError {
    CallError::from_kind(CallErrorKind::ArityMismatch {
        context: context.to_string(),
        expected,
        got,
    })
}

/// Value at `index` (or a standalone value) cannot convert to `to`.
#[cold]
pub fn conversion_failed(index: Option<usize>, from: &str, to: &str) -> CallError {
    CallError::from_kind(CallErrorKind::Conversion {
        index,
        from: from.to_string(),
        to: to.to_string(),
    })
}

/// Argument index outside `[0, len)`.
#[cold]
pub fn index_out_of_range(index: usize, len: usize) -> CallError {
    CallError::from_kind(CallErrorKind::IndexOutOfRange { index, len })
}

// Dispatch errors

/// Every constructor candidate failed.
#[cold]
pub fn no_matching_overload(class: &str, candidates: usize) -> CallError {
    CallError::from_kind(CallErrorKind::NoMatchingOverload {
        class: class.to_string(),
        candidates,
    })
}

/// Neither the requested key nor the fallback has an implementation.
#[cold]
pub fn operator_not_implemented<K: fmt::Display>(name: &str, tried: &[K]) -> CallError {
    CallError::from_kind(CallErrorKind::OperatorNotImplemented {
        name: name.to_string(),
        tried: tried.iter().map(ToString::to_string).collect(),
    })
}

/// Invoking an adapter that was never given a closure.
#[cold]
pub fn unbound_callable() -> CallError {
    CallError::from_kind(CallErrorKind::UnboundCallable)
}

/// Typed access to an empty call result.
#[cold]
pub fn void_result(to: &str) -> CallError {
    CallError::from_kind(CallErrorKind::VoidResult { to: to.to_string() })
}

/// Bound method receiver locked by a call already in progress.
#[cold]
pub fn receiver_borrowed(type_name: &str, exclusive: bool) -> CallError {
    CallError::from_kind(CallErrorKind::ReceiverBorrowed {
        type_name: type_name.to_string(),
        exclusive,
    })
}

// Wrapped errors

/// Re-raise a failure from inside a wrapped callable.
#[cold]
pub fn call_failed(origin: CallOrigin, source: CallError) -> CallError {
    CallError::from_kind(CallErrorKind::CallFailed {
        origin,
        source: Box::new(source),
    })
}

/// Re-raise a failure from an operator implementation with dispatch context.
#[cold]
pub fn operator_failed(name: &str, key: &str, fallback: bool, source: CallError) -> CallError {
    CallError::from_kind(CallErrorKind::OperatorFailed {
        name: name.to_string(),
        key: key.to_string(),
        fallback,
        source: Box::new(source),
    })
}

// Registration errors

/// Class re-registration rejected.
#[cold]
pub fn duplicate_class(name: &str) -> CallError {
    CallError::from_kind(CallErrorKind::DuplicateClass {
        name: name.to_string(),
    })
}

/// Registration attempted after the registries were sealed.
#[cold]
pub fn sealed(what: &str) -> CallError {
    CallError::from_kind(CallErrorKind::Sealed {
        what: what.to_string(),
    })
}
