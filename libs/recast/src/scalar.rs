use std::borrow::Cow;

use crate::reflect::{Reflect, ReflectMut, ReflectRef, Shape, TypeDesc};

/// Canonical scalar representation.
///
/// Every primitive widens into one variant on read and narrows back on
/// write, so coercion only needs to reason about variants:
/// - Signed integers → `Int`, unsigned → `UInt`, floats → `Float`
/// - `String` borrows as `Str` (zero-copy on read)
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar<'a> {
    Bool(bool),
    Int(i128),
    UInt(u128),
    Float(f64),
    Char(char),
    Str(Cow<'a, str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
    Char,
    Str,
}

impl ScalarKind {
    fn is_integer(self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::UInt)
    }

    /// Whether a value of kind `self` may be stored into a slot of kind `to`.
    ///
    /// Numbers convert freely between each other; `char` only to and from
    /// integers; `bool` and strings only to themselves.
    pub fn coercible_to(self, to: ScalarKind) -> bool {
        if self == to {
            return true;
        }
        match (self, to) {
            (ScalarKind::Char, other) | (other, ScalarKind::Char) => other.is_integer(),
            (ScalarKind::Bool | ScalarKind::Str, _) | (_, ScalarKind::Bool | ScalarKind::Str) => {
                false
            }
            _ => true,
        }
    }
}

impl Scalar<'_> {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::UInt(_) => ScalarKind::UInt,
            Scalar::Float(_) => ScalarKind::Float,
            Scalar::Char(_) => ScalarKind::Char,
            Scalar::Str(_) => ScalarKind::Str,
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match *self {
            Scalar::Int(v) => Some(v),
            Scalar::UInt(v) => Some(v as i128),
            Scalar::Float(v) => Some(v as i128),
            Scalar::Char(c) => Some(c as u32 as i128),
            Scalar::Bool(_) | Scalar::Str(_) => None,
        }
    }

    fn as_u128(&self) -> Option<u128> {
        match *self {
            Scalar::Int(v) => Some(v as u128),
            Scalar::UInt(v) => Some(v),
            Scalar::Float(v) => Some(v as u128),
            Scalar::Char(c) => Some(c as u128),
            Scalar::Bool(_) | Scalar::Str(_) => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match *self {
            Scalar::Int(v) => Some(v as f64),
            Scalar::UInt(v) => Some(v as f64),
            Scalar::Float(v) => Some(v),
            Scalar::Bool(_) | Scalar::Char(_) | Scalar::Str(_) => None,
        }
    }

    fn as_char(&self) -> Option<char> {
        match *self {
            Scalar::Char(c) => Some(c),
            Scalar::Int(v) => u32::try_from(v).ok().and_then(char::from_u32),
            Scalar::UInt(v) => u32::try_from(v).ok().and_then(char::from_u32),
            _ => None,
        }
    }
}

/// A primitive with a canonical [`Scalar`] form.
pub trait ScalarValue: Sized {
    const KIND: ScalarKind;

    fn to_scalar(&self) -> Scalar<'_>;

    /// `None` when the value cannot be represented (e.g. an invalid code
    /// point for `char`).
    fn from_scalar(value: Scalar<'_>) -> Option<Self>;
}

/// Object-safe write side of [`ScalarValue`].
pub trait ScalarSlot {
    fn kind(&self) -> ScalarKind;

    /// Stores `value`, returning `false` if it does not fit this slot.
    fn store(&mut self, value: Scalar<'_>) -> bool;
}

impl<T: ScalarValue> ScalarSlot for T {
    fn kind(&self) -> ScalarKind {
        T::KIND
    }

    fn store(&mut self, value: Scalar<'_>) -> bool {
        match T::from_scalar(value) {
            Some(v) => {
                *self = v;
                true
            }
            None => false,
        }
    }
}

macro_rules! impl_reflect_scalar {
    ($($ty:ty),+) => {
        $(
            impl Reflect for $ty {
                fn type_desc() -> TypeDesc {
                    TypeDesc::new::<Self>(|| Shape::Scalar(<$ty as ScalarValue>::KIND))
                }

                fn reflect_ref(&self) -> ReflectRef<'_> {
                    ReflectRef::Scalar(self.to_scalar())
                }

                fn reflect_mut(&mut self) -> ReflectMut<'_> {
                    ReflectMut::Scalar(self)
                }
            }
        )+
    };
}

macro_rules! impl_signed {
    ($($ty:ty),+) => {
        $(
            impl ScalarValue for $ty {
                const KIND: ScalarKind = ScalarKind::Int;

                fn to_scalar(&self) -> Scalar<'_> {
                    Scalar::Int(*self as i128)
                }

                fn from_scalar(value: Scalar<'_>) -> Option<Self> {
                    value.as_i128().map(|v| v as $ty)
                }
            }
        )+
        impl_reflect_scalar!($($ty),+);
    };
}

macro_rules! impl_unsigned {
    ($($ty:ty),+) => {
        $(
            impl ScalarValue for $ty {
                const KIND: ScalarKind = ScalarKind::UInt;

                fn to_scalar(&self) -> Scalar<'_> {
                    Scalar::UInt(*self as u128)
                }

                fn from_scalar(value: Scalar<'_>) -> Option<Self> {
                    value.as_u128().map(|v| v as $ty)
                }
            }
        )+
        impl_reflect_scalar!($($ty),+);
    };
}

impl_signed!(i8, i16, i32, i64, i128, isize);
impl_unsigned!(u8, u16, u32, u64, u128, usize);

impl ScalarValue for f32 {
    const KIND: ScalarKind = ScalarKind::Float;

    fn to_scalar(&self) -> Scalar<'_> {
        Scalar::Float(f64::from(*self))
    }

    fn from_scalar(value: Scalar<'_>) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }
}

impl ScalarValue for f64 {
    const KIND: ScalarKind = ScalarKind::Float;

    fn to_scalar(&self) -> Scalar<'_> {
        Scalar::Float(*self)
    }

    fn from_scalar(value: Scalar<'_>) -> Option<Self> {
        value.as_f64()
    }
}

impl ScalarValue for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn to_scalar(&self) -> Scalar<'_> {
        Scalar::Bool(*self)
    }

    fn from_scalar(value: Scalar<'_>) -> Option<Self> {
        match value {
            Scalar::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl ScalarValue for char {
    const KIND: ScalarKind = ScalarKind::Char;

    fn to_scalar(&self) -> Scalar<'_> {
        Scalar::Char(*self)
    }

    fn from_scalar(value: Scalar<'_>) -> Option<Self> {
        value.as_char()
    }
}

impl ScalarValue for String {
    const KIND: ScalarKind = ScalarKind::Str;

    fn to_scalar(&self) -> Scalar<'_> {
        Scalar::Str(Cow::Borrowed(self))
    }

    fn from_scalar(value: Scalar<'_>) -> Option<Self> {
        match value {
            Scalar::Str(s) => Some(s.into_owned()),
            _ => None,
        }
    }
}

impl_reflect_scalar!(f32, f64, bool, char, String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_kinds_are_interconvertible() {
        for from in [ScalarKind::Int, ScalarKind::UInt, ScalarKind::Float] {
            for to in [ScalarKind::Int, ScalarKind::UInt, ScalarKind::Float] {
                assert!(from.coercible_to(to), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn char_only_pairs_with_integers() {
        assert!(ScalarKind::Char.coercible_to(ScalarKind::UInt));
        assert!(ScalarKind::Int.coercible_to(ScalarKind::Char));
        assert!(!ScalarKind::Char.coercible_to(ScalarKind::Float));
        assert!(!ScalarKind::Float.coercible_to(ScalarKind::Char));
    }

    #[test]
    fn bool_and_str_only_match_themselves() {
        assert!(ScalarKind::Bool.coercible_to(ScalarKind::Bool));
        assert!(ScalarKind::Str.coercible_to(ScalarKind::Str));
        assert!(!ScalarKind::Bool.coercible_to(ScalarKind::Int));
        assert!(!ScalarKind::Int.coercible_to(ScalarKind::Str));
        assert!(!ScalarKind::Str.coercible_to(ScalarKind::Bool));
    }

    #[test]
    fn narrowing_follows_as_semantics() {
        let mut narrow = 0u8;
        assert!(narrow.store(300i32.to_scalar()));
        assert_eq!(narrow, 300i32 as u8);

        let mut truncated = 0i64;
        assert!(truncated.store(1.9f64.to_scalar()));
        assert_eq!(truncated, 1);
    }

    #[test]
    fn float_widening_round_trips() {
        let mut wide = 0f64;
        assert!(wide.store(1.2f32.to_scalar()));
        let mut back = 0f32;
        assert!(back.store(wide.to_scalar()));
        assert_eq!(back, 1.2f32);
    }

    #[test]
    fn invalid_code_point_is_rejected() {
        let mut c = 'a';
        assert!(!c.store(Scalar::UInt(0xD800)));
        assert_eq!(c, 'a');
        assert!(c.store(Scalar::Int(0x41)));
        assert_eq!(c, 'A');
    }

    #[test]
    fn strings_borrow_on_read() {
        let s = String::from("abc");
        match s.to_scalar() {
            Scalar::Str(Cow::Borrowed(b)) => assert_eq!(b, "abc"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
