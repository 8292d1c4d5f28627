//! Ordered, type-erased call arguments.

use std::borrow::Cow;
use std::fmt;
use std::ops::Index;

use smallvec::SmallVec;

use crate::errors::{conversion_failed, index_out_of_range, wrong_arg_count, CallError};
use crate::value::{FromValue, IntoValue, Value};

/// Arguments for one invocation, in call-site order.
///
/// Most calls carry a receiver and a couple of operands, so the first four
/// values are stored inline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArgumentList {
    values: SmallVec<[Value; 4]>,
}

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value. Used while building a list; see [`args!`](crate::args).
    pub fn push(&mut self, value: impl IntoValue) {
        self.values.push(value.into_value());
    }

    /// `receiver` followed by every value of `rest`.
    pub fn with_receiver(receiver: Value, rest: &ArgumentList) -> Self {
        let mut values = SmallVec::with_capacity(rest.len() + 1);
        values.push(receiver);
        values.extend(rest.iter().cloned());
        ArgumentList { values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checked access to the raw value at `index`.
    pub fn value(&self, index: usize) -> Result<&Value, CallError> {
        self.values
            .get(index)
            .ok_or_else(|| index_out_of_range(index, self.len()))
    }

    /// Convert the value at `index` to `T`.
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T, CallError> {
        let value = self.value(index)?;
        T::from_value(value)
            .map_err(|_| conversion_failed(Some(index), value.type_name(), &T::type_label()))
    }

    /// Convert the whole list to a tuple.
    ///
    /// The length is checked before any conversion runs.
    pub fn to_tuple<T: FromArgs>(&self) -> Result<T, CallError> {
        if self.len() != T::ARITY {
            return Err(wrong_arg_count("argument list", T::ARITY, self.len()));
        }
        T::from_args(self, 0)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}

impl Index<usize> for ArgumentList {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl<'a> IntoIterator for &'a ArgumentList {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Value> for ArgumentList {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        ArgumentList {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Value>> for ArgumentList {
    fn from(values: Vec<Value>) -> Self {
        ArgumentList {
            values: SmallVec::from_vec(values),
        }
    }
}

impl fmt::Display for ArgumentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArgumentList[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}

/// Build an [`ArgumentList`] from heterogeneous values.
///
/// ```
/// use oplib_core::args;
///
/// let list = args![1, "x", 2.5];
/// assert_eq!(list.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::ArgumentList::new()
    };
    ($($arg:expr),+ $(,)?) => {{
        let mut list = $crate::ArgumentList::new();
        $( list.push($arg); )+
        list
    }};
}

/// Tuples that can be built positionally from an argument list.
///
/// Implemented for tuples of `FromValue` types up to eight elements.
pub trait FromArgs: Sized {
    /// Number of values consumed.
    const ARITY: usize;

    /// Static type names of the elements, in order.
    fn labels() -> Vec<Cow<'static, str>>;

    /// Convert `args[offset..offset + ARITY]`. Callers check the length.
    fn from_args(args: &ArgumentList, offset: usize) -> Result<Self, CallError>;
}

macro_rules! impl_from_args {
    ($arity:literal; $($idx:tt $T:ident),*) => {
        impl<$($T: FromValue),*> FromArgs for ($($T,)*) {
            const ARITY: usize = $arity;

            fn labels() -> Vec<Cow<'static, str>> {
                vec![$(<$T as FromValue>::type_label()),*]
            }

            #[allow(unused_variables, reason = "unused by the empty tuple")]
            fn from_args(args: &ArgumentList, offset: usize) -> Result<Self, CallError> {
                Ok(($(args.get::<$T>(offset + $idx)?,)*))
            }
        }
    };
}

impl_from_args!(0;);
impl_from_args!(1; 0 A1);
impl_from_args!(2; 0 A1, 1 A2);
impl_from_args!(3; 0 A1, 1 A2, 2 A3);
impl_from_args!(4; 0 A1, 1 A2, 2 A3, 3 A4);
impl_from_args!(5; 0 A1, 1 A2, 2 A3, 3 A4, 4 A5);
impl_from_args!(6; 0 A1, 1 A2, 2 A3, 3 A4, 4 A5, 5 A6);
impl_from_args!(7; 0 A1, 1 A2, 2 A3, 3 A4, 4 A5, 5 A6, 6 A7);
impl_from_args!(8; 0 A1, 1 A2, 2 A3, 3 A4, 4 A5, 5 A6, 6 A7, 7 A8);
