//! Signature introspection.
//!
//! Adapters are derived from ordinary Rust callables at registration time.
//! The traits here are implemented for every `Fn` shape the registries
//! accept, distinguished by marker types so a single generic entry point
//! (`Invokable::new`, `Invokable::method`) can take any of them:
//!
//! | shape                                   | trait                 |
//! |-----------------------------------------|-----------------------|
//! | `Fn(A1..An) -> R`                       | `IntoInvokable`       |
//! | `Fn(A1..An) -> Result<R, E>`            | `IntoInvokable`       |
//! | `Fn(&T, A1..An) -> R` (and `Result`)    | `IntoMethod<T>`       |
//! | `Fn(&mut T, A1..An) -> R` (and `Result`)| `IntoMethod<T>`       |
//!
//! Parameters convert through `FromValue`, results box through `IntoValue`
//! (`()` becomes a void result), and errors `E: Display` become `Custom`.
//! Free functions take up to eight parameters, methods up to six besides the
//! receiver.
//!
//! Bound methods lock the receiver with `try_read` / `try_write`. A receiver
//! already locked by an outer call, or passed again as an argument to a
//! `&mut T` method, fails with `ReceiverBorrowed` instead of waiting.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;

use crate::args::{ArgumentList, FromArgs};
use crate::errors::{receiver_borrowed, wrong_arg_count, CallError, CallOrigin};
use crate::invokable::Invokable;
use crate::result::CallResult;
use crate::value::{short_type_name, FromValue, IntoValue, Obj};

/// Marker types selecting an adapter shape. Never constructed.
pub mod markers {
    /// Returns its value directly.
    pub struct Plain;
    /// Returns `Result<R, E>`.
    pub struct Fallible;
    /// Takes the receiver by `&T`.
    pub struct Shared;
    /// Takes the receiver by `&mut T`.
    pub struct Exclusive;
    /// Already an `Invokable`.
    pub struct Erased;
}

use markers::{Erased, Exclusive, Fallible, Plain, Shared};

/// Parameter and return types recorded for an adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    receiver: Option<Cow<'static, str>>,
    params: Vec<Cow<'static, str>>,
    returns: Cow<'static, str>,
}

impl Signature {
    pub fn new(params: Vec<Cow<'static, str>>, returns: Cow<'static, str>) -> Self {
        Signature {
            receiver: None,
            params,
            returns,
        }
    }

    #[must_use]
    pub fn with_receiver(mut self, receiver: impl Into<Cow<'static, str>>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    pub fn receiver(&self) -> Option<&str> {
        self.receiver.as_deref()
    }

    pub fn params(&self) -> &[Cow<'static, str>] {
        &self.params
    }

    pub fn returns(&self) -> &str {
        &self.returns
    }

    /// Required argument count, receiver included.
    pub fn arity(&self) -> usize {
        self.params.len() + usize::from(self.receiver.is_some())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let receiver = self.receiver.iter();
        for (i, param) in receiver.chain(self.params.iter()).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

/// Callables convertible to a free-function adapter.
pub trait IntoInvokable<Marker> {
    fn into_invokable(self) -> Invokable;
}

/// Callables convertible to a bound-method adapter on `T`.
pub trait IntoMethod<T, Marker> {
    fn into_method(self) -> Invokable;
}

/// Types constructible from converted constructor arguments.
///
/// `()` uses `Default`, a single argument uses `From<A1>`, and longer lists
/// use `From<(A1, .., An)>`.
pub trait Constructible<Args>: Sized {
    fn construct(args: Args) -> Self;
}

impl<T: Default> Constructible<()> for T {
    fn construct((): ()) -> Self {
        T::default()
    }
}

impl<T: From<A1>, A1> Constructible<(A1,)> for T {
    fn construct((a1,): (A1,)) -> Self {
        T::from(a1)
    }
}

impl IntoInvokable<Erased> for Invokable {
    fn into_invokable(self) -> Invokable {
        self
    }
}

impl<T> IntoMethod<T, Erased> for Invokable {
    fn into_method(self) -> Invokable {
        self
    }
}

fn check_arity(context: &str, expected: usize, args: &ArgumentList) -> Result<(), CallError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(wrong_arg_count(context, expected, args.len()))
    }
}

fn custom_error<E: fmt::Display>(err: &E) -> CallError {
    CallError::new(err.to_string())
}

fn receiver_label<T>(exclusive: bool) -> String {
    let prefix = if exclusive { "&mut " } else { "&" };
    format!("{prefix}{}", short_type_name::<T>())
}

macro_rules! impl_function_adapters {
    ($arity:literal; $($idx:tt $A:ident),*) => {
        impl<Func, R, $($A,)*> IntoInvokable<(Plain, fn($($A,)*) -> R)> for Func
        where
            Func: Fn($($A),*) -> R + Send + Sync + 'static,
            R: IntoValue,
            $($A: FromValue,)*
        {
            fn into_invokable(self) -> Invokable {
                let signature = Signature::new(
                    <($($A,)*) as FromArgs>::labels(),
                    <R as IntoValue>::type_label(),
                );
                Invokable::wrap(CallOrigin::Function, Some(signature), move |args| {
                    check_arity("function", $arity, args)?;
                    #[allow(unused_variables, reason = "unused by nullary functions")]
                    let converted = <($($A,)*) as FromArgs>::from_args(args, 0)?;
                    let out = (self)($(converted.$idx),*);
                    Ok(CallResult::from_value(out.into_value()))
                })
            }
        }

        impl<Func, R, E, $($A,)*> IntoInvokable<(Fallible, fn($($A,)*) -> Result<R, E>)> for Func
        where
            Func: Fn($($A),*) -> Result<R, E> + Send + Sync + 'static,
            R: IntoValue,
            E: fmt::Display,
            $($A: FromValue,)*
        {
            fn into_invokable(self) -> Invokable {
                let signature = Signature::new(
                    <($($A,)*) as FromArgs>::labels(),
                    <R as IntoValue>::type_label(),
                );
                Invokable::wrap(CallOrigin::Function, Some(signature), move |args| {
                    check_arity("function", $arity, args)?;
                    #[allow(unused_variables, reason = "unused by nullary functions")]
                    let converted = <($($A,)*) as FromArgs>::from_args(args, 0)?;
                    let out = (self)($(converted.$idx),*).map_err(|err| custom_error(&err))?;
                    Ok(CallResult::from_value(out.into_value()))
                })
            }
        }
    };
}

macro_rules! impl_method_adapters {
    ($arity:literal; $($idx:tt $A:ident),*) => {
        impl<T, Func, R, $($A,)*> IntoMethod<T, (Shared, Plain, fn($($A,)*) -> R)> for Func
        where
            T: Any + Send + Sync,
            Func: Fn(&T, $($A),*) -> R + Send + Sync + 'static,
            R: IntoValue,
            $($A: FromValue,)*
        {
            fn into_method(self) -> Invokable {
                let signature = Signature::new(
                    <($($A,)*) as FromArgs>::labels(),
                    <R as IntoValue>::type_label(),
                )
                .with_receiver(receiver_label::<T>(false));
                Invokable::wrap(CallOrigin::Method, Some(signature), move |args| {
                    check_arity("method", $arity + 1, args)?;
                    let receiver = args.get::<Obj<T>>(0)?;
                    #[allow(unused_variables, reason = "unused by receiver-only methods")]
                    let converted = <($($A,)*) as FromArgs>::from_args(args, 1)?;
                    let guard = receiver.try_read()?;
                    let out = (self)(&*guard, $(converted.$idx),*);
                    Ok(CallResult::from_value(out.into_value()))
                })
            }
        }

        impl<T, Func, R, E, $($A,)*> IntoMethod<T, (Shared, Fallible, fn($($A,)*) -> Result<R, E>)> for Func
        where
            T: Any + Send + Sync,
            Func: Fn(&T, $($A),*) -> Result<R, E> + Send + Sync + 'static,
            R: IntoValue,
            E: fmt::Display,
            $($A: FromValue,)*
        {
            fn into_method(self) -> Invokable {
                let signature = Signature::new(
                    <($($A,)*) as FromArgs>::labels(),
                    <R as IntoValue>::type_label(),
                )
                .with_receiver(receiver_label::<T>(false));
                Invokable::wrap(CallOrigin::Method, Some(signature), move |args| {
                    check_arity("method", $arity + 1, args)?;
                    let receiver = args.get::<Obj<T>>(0)?;
                    #[allow(unused_variables, reason = "unused by receiver-only methods")]
                    let converted = <($($A,)*) as FromArgs>::from_args(args, 1)?;
                    let guard = receiver.try_read()?;
                    let out = (self)(&*guard, $(converted.$idx),*)
                        .map_err(|err| custom_error(&err))?;
                    Ok(CallResult::from_value(out.into_value()))
                })
            }
        }

        impl<T, Func, R, $($A,)*> IntoMethod<T, (Exclusive, Plain, fn($($A,)*) -> R)> for Func
        where
            T: Any + Send + Sync,
            Func: Fn(&mut T, $($A),*) -> R + Send + Sync + 'static,
            R: IntoValue,
            $($A: FromValue,)*
        {
            fn into_method(self) -> Invokable {
                let signature = Signature::new(
                    <($($A,)*) as FromArgs>::labels(),
                    <R as IntoValue>::type_label(),
                )
                .with_receiver(receiver_label::<T>(true));
                Invokable::wrap(CallOrigin::Method, Some(signature), move |args| {
                    check_arity("method", $arity + 1, args)?;
                    let receiver = args.get::<Obj<T>>(0)?;
                    #[allow(unused_variables, reason = "unused by receiver-only methods")]
                    let converted = <($($A,)*) as FromArgs>::from_args(args, 1)?;
                    if args.iter().skip(1).any(|value| receiver.is_held_by(value)) {
                        return Err(receiver_borrowed(short_type_name::<T>(), true));
                    }
                    let mut guard = receiver.try_write()?;
                    let out = (self)(&mut *guard, $(converted.$idx),*);
                    Ok(CallResult::from_value(out.into_value()))
                })
            }
        }

        impl<T, Func, R, E, $($A,)*> IntoMethod<T, (Exclusive, Fallible, fn($($A,)*) -> Result<R, E>)> for Func
        where
            T: Any + Send + Sync,
            Func: Fn(&mut T, $($A),*) -> Result<R, E> + Send + Sync + 'static,
            R: IntoValue,
            E: fmt::Display,
            $($A: FromValue,)*
        {
            fn into_method(self) -> Invokable {
                let signature = Signature::new(
                    <($($A,)*) as FromArgs>::labels(),
                    <R as IntoValue>::type_label(),
                )
                .with_receiver(receiver_label::<T>(true));
                Invokable::wrap(CallOrigin::Method, Some(signature), move |args| {
                    check_arity("method", $arity + 1, args)?;
                    let receiver = args.get::<Obj<T>>(0)?;
                    #[allow(unused_variables, reason = "unused by receiver-only methods")]
                    let converted = <($($A,)*) as FromArgs>::from_args(args, 1)?;
                    if args.iter().skip(1).any(|value| receiver.is_held_by(value)) {
                        return Err(receiver_borrowed(short_type_name::<T>(), true));
                    }
                    let mut guard = receiver.try_write()?;
                    let out = (self)(&mut *guard, $(converted.$idx),*)
                        .map_err(|err| custom_error(&err))?;
                    Ok(CallResult::from_value(out.into_value()))
                })
            }
        }
    };
}

macro_rules! impl_constructible {
    ($($A:ident),*) => {
        impl<T, $($A,)*> Constructible<($($A,)*)> for T
        where
            T: From<($($A,)*)>,
        {
            fn construct(args: ($($A,)*)) -> Self {
                T::from(args)
            }
        }
    };
}

impl_function_adapters!(0;);
impl_function_adapters!(1; 0 A1);
impl_function_adapters!(2; 0 A1, 1 A2);
impl_function_adapters!(3; 0 A1, 1 A2, 2 A3);
impl_function_adapters!(4; 0 A1, 1 A2, 2 A3, 3 A4);
impl_function_adapters!(5; 0 A1, 1 A2, 2 A3, 3 A4, 4 A5);
impl_function_adapters!(6; 0 A1, 1 A2, 2 A3, 3 A4, 4 A5, 5 A6);
impl_function_adapters!(7; 0 A1, 1 A2, 2 A3, 3 A4, 4 A5, 5 A6, 6 A7);
impl_function_adapters!(8; 0 A1, 1 A2, 2 A3, 3 A4, 4 A5, 5 A6, 6 A7, 7 A8);

impl_method_adapters!(0;);
impl_method_adapters!(1; 0 A1);
impl_method_adapters!(2; 0 A1, 1 A2);
impl_method_adapters!(3; 0 A1, 1 A2, 2 A3);
impl_method_adapters!(4; 0 A1, 1 A2, 2 A3, 3 A4);
impl_method_adapters!(5; 0 A1, 1 A2, 2 A3, 3 A4, 4 A5);
impl_method_adapters!(6; 0 A1, 1 A2, 2 A3, 3 A4, 4 A5, 5 A6);

impl_constructible!(A1, A2);
impl_constructible!(A1, A2, A3);
impl_constructible!(A1, A2, A3, A4);
impl_constructible!(A1, A2, A3, A4, A5);
impl_constructible!(A1, A2, A3, A4, A5, A6);
impl_constructible!(A1, A2, A3, A4, A5, A6, A7);
impl_constructible!(A1, A2, A3, A4, A5, A6, A7, A8);
