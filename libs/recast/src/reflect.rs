use std::any::{type_name, Any, TypeId};
use std::fmt;

use crate::scalar::{Scalar, ScalarKind, ScalarSlot};

/// Identity and lazily-built structure of a convertible type.
///
/// `shape` is a function rather than a value so that describing a
/// self-referential type never recurses.
#[derive(Clone, Copy)]
pub struct TypeDesc {
    pub id: TypeId,
    pub name: &'static str,
    pub shape: fn() -> Shape,
}

impl TypeDesc {
    pub fn new<T: Any>(shape: fn() -> Shape) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            shape,
        }
    }

    /// Descriptor for a type the converter never looks inside.
    pub fn opaque<T: Any>() -> Self {
        Self::new::<T>(|| Shape::Opaque)
    }

    pub fn shape(&self) -> Shape {
        (self.shape)()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.shape(), Shape::Pointer(_))
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDesc {}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Kind-level structure of a type.
#[derive(Debug, Clone)]
pub enum Shape {
    Scalar(ScalarKind),
    /// `Option<T>` (nullable) or `Box<T>`.
    Pointer(TypeDesc),
    /// `Vec<T>`.
    Sequence(TypeDesc),
    /// Declared fields in declaration order.
    Record(Vec<FieldDesc>),
    Opaque,
}

/// One declared field of a record, as written in the source.
#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub name: &'static str,
    /// Declaration position; the index `Record::field` accepts.
    pub index: usize,
    /// Raw `#[convert(tag = "...")]` value.
    pub tag: Option<&'static str>,
    /// Anonymous embedding (`#[convert(embedded)]`).
    pub embedded: bool,
    /// `false` for fields without `pub` visibility.
    pub exported: bool,
    pub ty: TypeDesc,
}

/// Borrowed read view over a value.
pub enum ReflectRef<'a> {
    Scalar(Scalar<'a>),
    Pointer(Option<&'a dyn Reflect>),
    Sequence(&'a dyn Sequence),
    Record(&'a dyn Record),
    Opaque,
}

/// Borrowed write view over a value.
pub enum ReflectMut<'a> {
    Scalar(&'a mut dyn ScalarSlot),
    Pointer(Option<&'a mut dyn Reflect>),
    Sequence(&'a mut dyn Sequence),
    Record(&'a mut dyn Record),
    Opaque,
}

/// A type the converter can read from and write into.
///
/// Records get this through `#[derive(Reflect)]`; scalars, `Option`, `Box`
/// and `Vec` are covered here. Use [`reflect_opaque!`](crate::reflect_opaque)
/// for leaf types that should only be copied whole.
pub trait Reflect: AsReflect + Any {
    fn type_desc() -> TypeDesc
    where
        Self: Sized;

    fn reflect_ref(&self) -> ReflectRef<'_>;

    fn reflect_mut(&mut self) -> ReflectMut<'_>;

    /// Follows every pointer layer. `None` when a layer is nil.
    fn deref(&self) -> Option<&dyn Reflect> {
        Some(self.as_reflect())
    }

    /// Follows every pointer layer, allocating nil ones with `Default`.
    fn deref_alloc(&mut self) -> &mut dyn Reflect {
        self.as_reflect_mut()
    }

    /// Clears a nullable pointer. No-op for everything else.
    fn set_nil(&mut self) {}
}

/// Object-safe helpers implemented for every `Reflect + Clone` type.
pub trait AsReflect {
    fn as_reflect(&self) -> &dyn Reflect;

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn reflect_desc(&self) -> TypeDesc;

    /// Copies `src` into `self` when both are the same type.
    fn assign_from(&mut self, src: &dyn Reflect) -> bool;
}

impl<T: Reflect + Clone> AsReflect for T {
    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn reflect_desc(&self) -> TypeDesc {
        T::type_desc()
    }

    fn assign_from(&mut self, src: &dyn Reflect) -> bool {
        match src.as_any().downcast_ref::<T>() {
            Some(value) => {
                self.clone_from(value);
                true
            }
            None => false,
        }
    }
}

/// Field access by declaration index.
pub trait Record {
    fn field(&self, index: usize) -> Option<&dyn Reflect>;

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;
}

/// Indexed element access plus resizing.
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<&dyn Reflect>;

    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;

    /// Replaces the contents with `len` default elements.
    fn reset(&mut self, len: usize);
}

impl ReflectRef<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            ReflectRef::Scalar(_) => "scalar",
            ReflectRef::Pointer(_) => "pointer",
            ReflectRef::Sequence(_) => "sequence",
            ReflectRef::Record(_) => "record",
            ReflectRef::Opaque => "opaque",
        }
    }
}

// ---------------------------------------------------------------------------
// Pointers
// ---------------------------------------------------------------------------

impl<T: Reflect + Clone + Default> Reflect for Option<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::new::<Self>(|| Shape::Pointer(T::type_desc()))
    }

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Pointer(self.as_ref().map(|v| v as &dyn Reflect))
    }

    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::Pointer(self.as_mut().map(|v| v as &mut dyn Reflect))
    }

    fn deref(&self) -> Option<&dyn Reflect> {
        self.as_ref().and_then(|v| v.deref())
    }

    fn deref_alloc(&mut self) -> &mut dyn Reflect {
        self.get_or_insert_with(T::default).deref_alloc()
    }

    fn set_nil(&mut self) {
        *self = None;
    }
}

impl<T: Reflect + Clone> Reflect for Box<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::new::<Self>(|| Shape::Pointer(T::type_desc()))
    }

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Pointer(Some(&**self as &dyn Reflect))
    }

    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::Pointer(Some(&mut **self as &mut dyn Reflect))
    }

    fn deref(&self) -> Option<&dyn Reflect> {
        (**self).deref()
    }

    fn deref_alloc(&mut self) -> &mut dyn Reflect {
        (**self).deref_alloc()
    }

    fn set_nil(&mut self) {
        (**self).set_nil()
    }
}

// ---------------------------------------------------------------------------
// Sequences
// ---------------------------------------------------------------------------

impl<T: Reflect + Clone + Default> Reflect for Vec<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::new::<Self>(|| Shape::Sequence(T::type_desc()))
    }

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Sequence(self)
    }

    fn reflect_mut(&mut self) -> ReflectMut<'_> {
        ReflectMut::Sequence(self)
    }
}

impl<T: Reflect + Clone + Default> Sequence for Vec<T> {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn get(&self, index: usize) -> Option<&dyn Reflect> {
        <[T]>::get(self, index).map(|v| v as &dyn Reflect)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Reflect> {
        <[T]>::get_mut(self, index).map(|v| v as &mut dyn Reflect)
    }

    fn reset(&mut self, len: usize) {
        self.clear();
        self.resize_with(len, T::default);
    }
}

/// Implements [`Reflect`] for leaf types the converter copies whole.
///
/// ```ignore
/// #[derive(Clone)]
/// pub struct Timestamp(i64);
/// recast::reflect_opaque!(Timestamp);
/// ```
#[macro_export]
macro_rules! reflect_opaque {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Reflect for $ty {
                fn type_desc() -> $crate::TypeDesc {
                    $crate::TypeDesc::opaque::<Self>()
                }

                fn reflect_ref(&self) -> $crate::ReflectRef<'_> {
                    $crate::ReflectRef::Opaque
                }

                fn reflect_mut(&mut self) -> $crate::ReflectMut<'_> {
                    $crate::ReflectMut::Opaque
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_deref_follows_layers() {
        let nested: Option<Box<Option<i32>>> = Some(Box::new(Some(7)));
        let inner = nested.deref().expect("non-nil");
        assert_eq!(inner.reflect_desc(), i32::type_desc());

        let nil: Option<Box<Option<i32>>> = Some(Box::new(None));
        assert!(nil.deref().is_none());
    }

    #[test]
    fn deref_alloc_fills_every_layer() {
        let mut slot: Option<Box<Option<u8>>> = None;
        let target = slot.deref_alloc();
        assert_eq!(target.reflect_desc(), u8::type_desc());
        assert_eq!(slot, Some(Box::new(Some(0))));
    }

    #[test]
    fn set_nil_clears_nullable_pointers() {
        let mut value = Some(3u16);
        value.set_nil();
        assert_eq!(value, None);

        let mut plain = 3u16;
        plain.set_nil();
        assert_eq!(plain, 3);

        let mut boxed = Box::new(Some(3u16));
        boxed.set_nil();
        assert_eq!(*boxed, None);

        let mut boxed_plain = Box::new(3u16);
        boxed_plain.set_nil();
        assert_eq!(*boxed_plain, 3);
    }

    #[test]
    fn vec_reset_replaces_contents() {
        let mut items = vec![1i64, 2, 3];
        Sequence::reset(&mut items, 2);
        assert_eq!(items, vec![0, 0]);
    }

    #[test]
    fn assign_from_requires_same_type() {
        let mut dest = String::from("old");
        assert!(dest.assign_from(&String::from("new")));
        assert_eq!(dest, "new");
        assert!(!dest.assign_from(&5i32));
        assert_eq!(dest, "new");
    }

    #[test]
    fn shapes_describe_containers() {
        match <Vec<Option<f32>>>::type_desc().shape() {
            Shape::Sequence(elem) => {
                assert!(elem.is_pointer());
                assert_eq!(elem, <Option<f32>>::type_desc());
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }
}
