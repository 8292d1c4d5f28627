//! Type-erased callables.
//!
//! An `Invokable` owns one boxed closure over an [`ArgumentList`]. The typed
//! glue that checks arity and converts arguments is generated in
//! [`signature`](crate::signature); this module only stores and calls it.
//!
//! Every failure raised while the wrapped closure runs is re-raised as
//! `CallFailed` with the original error as its source.

use std::any::Any;
use std::fmt;

use crate::args::{ArgumentList, FromArgs};
use crate::errors::{call_failed, unbound_callable, wrong_arg_count, CallError, CallOrigin};
use crate::result::CallResult;
use crate::signature::{Constructible, IntoInvokable, IntoMethod, Signature};
use crate::value::{short_type_name, Value};

type BoxedCall = Box<dyn Fn(&ArgumentList) -> Result<CallResult, CallError> + Send + Sync>;

/// Move-only, type-erased callable.
#[derive(Default)]
pub struct Invokable {
    func: Option<BoxedCall>,
    signature: Option<Signature>,
}

impl Invokable {
    /// Adapter for a free function or closure with typed parameters.
    pub fn new<M, F: IntoInvokable<M>>(f: F) -> Self {
        f.into_invokable()
    }

    /// Adapter for a method on `T`; the receiver is passed as argument 0.
    pub fn method<T, M, F: IntoMethod<T, M>>(f: F) -> Self {
        f.into_method()
    }

    /// Adapter that builds a `T` from arguments converted as `Args`.
    ///
    /// Requires exactly `Args::ARITY` arguments.
    pub fn constructor<T, Args>() -> Self
    where
        Args: FromArgs,
        T: Constructible<Args> + Any + Send + Sync,
    {
        let signature = Signature::new(Args::labels(), short_type_name::<T>().into());
        Self::wrap(CallOrigin::Constructor, Some(signature), |args| {
            if args.len() != Args::ARITY {
                return Err(wrong_arg_count("constructor", Args::ARITY, args.len()));
            }
            let tuple = Args::from_args(args, 0)?;
            Ok(CallResult::from_value(Value::object(T::construct(tuple))))
        })
    }

    /// Adapter over the whole argument list. No arity checking is done.
    pub fn from_raw<F>(f: F) -> Self
    where
        F: Fn(&ArgumentList) -> Result<CallResult, CallError> + Send + Sync + 'static,
    {
        Self::wrap(CallOrigin::Closure, None, f)
    }

    /// Like [`from_raw`](Self::from_raw), for closures returning a bare `Value`.
    pub fn from_value_fn<F>(f: F) -> Self
    where
        F: Fn(&ArgumentList) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self::wrap(CallOrigin::Closure, None, move |args| {
            f(args).map(CallResult::from_value)
        })
    }

    /// An adapter with nothing to call.
    pub fn unbound() -> Self {
        Self::default()
    }

    pub(crate) fn wrap<F>(origin: CallOrigin, signature: Option<Signature>, f: F) -> Self
    where
        F: Fn(&ArgumentList) -> Result<CallResult, CallError> + Send + Sync + 'static,
    {
        Invokable {
            func: Some(Box::new(move |args| {
                f(args).map_err(|err| call_failed(origin, err))
            })),
            signature,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.func.is_some()
    }

    /// Introspected signature, absent for raw closures.
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Number of arguments the adapter requires, if known.
    pub fn arity(&self) -> Option<usize> {
        self.signature.as_ref().map(Signature::arity)
    }

    pub fn call_with_args(&self, args: &ArgumentList) -> Result<CallResult, CallError> {
        let Some(func) = &self.func else {
            return Err(unbound_callable());
        };
        func(args)
    }

    pub fn call(&self) -> Result<CallResult, CallError> {
        self.call_with_args(&ArgumentList::new())
    }

    pub fn call_values<I>(&self, values: I) -> Result<CallResult, CallError>
    where
        I: IntoIterator<Item = Value>,
    {
        self.call_with_args(&values.into_iter().collect())
    }
}

impl fmt::Debug for Invokable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.func, &self.signature) {
            (None, _) => write!(f, "Invokable(unbound)"),
            (Some(_), Some(sig)) => write!(f, "Invokable{sig}"),
            (Some(_), None) => write!(f, "Invokable(raw)"),
        }
    }
}
