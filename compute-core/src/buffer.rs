#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

use downcast_rs::{Downcast, impl_downcast};

use crate::element_type::{ElementType, ElementTyped};

//=================================================================================================|

/// What protocol [`ResourceSpec::validate`](crate::resource_spec::ResourceSpec::validate)
/// uses to check a candidate buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// An externally-owned handle this crate does not interpret (e.g. a GPU-side field
    /// descriptor). Out-of-scope subsystems are expected to wrap their own handles in
    /// [`OpaqueBuffer`].
    OpaqueBuffer,

    /// An element-typed, shaped array.
    TypedArray,

    /// An opaque scalar/struct value with no shape or element-type contract.
    PlainValue,
}

/// The payload a [`Resource`](crate::resource::Resource) holds.
///
/// Typically a numeric array ([`TypedArray`]), a plain value ([`PlainValue`]), or an
/// opaque GPU-side handle ([`OpaqueBuffer`]). Downcastable so
/// [`ResourceRef<T>`](crate::resource_ref::ResourceRef) can recover its concrete type.
pub trait Buffer: Downcast + std::fmt::Debug {
    /// The [`ResourceKind`] discriminator used by [`ResourceSpec::validate`](crate::resource_spec::ResourceSpec::validate).
    fn kind(&self) -> ResourceKind;

    /// The buffer's element type, if it has one.
    fn element_type(&self) -> Option<ElementType> {
        None
    }

    /// The buffer's inner vector-lane width, if it has one.
    fn lanes(&self) -> Option<usize> {
        None
    }

    /// The buffer's exact shape, if it has one.
    fn shape(&self) -> Option<&[usize]> {
        None
    }
}

impl_downcast!(Buffer);

//=================================================================================================|

/// An element-typed, shaped array buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedArray<T> {
    pub data: Vec<T>,
    pub shape: Vec<usize>,
    pub lanes: Option<usize>,
}

impl<T> TypedArray<T> {
    pub fn new(data: Vec<T>, shape: Vec<usize>) -> Self {
        Self { data, shape, lanes: None }
    }

    pub fn with_lanes(data: Vec<T>, shape: Vec<usize>, lanes: usize) -> Self {
        Self { data, shape, lanes: Some(lanes) }
    }
}

impl<T> Buffer for TypedArray<T>
where
    T: ElementTyped + std::fmt::Debug + 'static,
{
    fn kind(&self) -> ResourceKind {
        ResourceKind::TypedArray
    }

    fn element_type(&self) -> Option<ElementType> {
        Some(T::ELEMENT_TYPE)
    }

    fn lanes(&self) -> Option<usize> {
        self.lanes
    }

    fn shape(&self) -> Option<&[usize]> {
        Some(&self.shape)
    }
}

//=================================================================================================|

/// A plain value with no shape or element-type contract.
#[derive(Clone, Debug, PartialEq)]
pub struct PlainValue<T>(pub T);

impl<T> Buffer for PlainValue<T>
where
    T: std::fmt::Debug + 'static,
{
    fn kind(&self) -> ResourceKind {
        ResourceKind::PlainValue
    }
}

//=================================================================================================|

/// A stand-in for an externally-owned handle (a GPU-side field descriptor, a Houdini
/// cook-context token, etc). The engine never interprets `descriptor`; it exists so
/// external collaborators can round-trip a handle through the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpaqueBuffer {
    pub descriptor: String,
}

impl OpaqueBuffer {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self { descriptor: descriptor.into() }
    }
}

impl Buffer for OpaqueBuffer {
    fn kind(&self) -> ResourceKind {
        ResourceKind::OpaqueBuffer
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod t {
    use super::*;

    #[test_log::test]
    fn typed_array_reports_element_type_and_shape() {
        let a = TypedArray::new(vec![1.0f32, 2.0, 3.0], vec![3]);
        assert_eq!(a.kind(), ResourceKind::TypedArray);
        assert_eq!(a.element_type(), Some(ElementType::F32));
        assert_eq!(a.shape(), Some([3usize].as_slice()));
        assert_eq!(a.lanes(), None);
    }

    #[test_log::test]
    fn plain_value_has_no_shape_or_element_type() {
        let v = PlainValue(42i64);
        assert_eq!(v.kind(), ResourceKind::PlainValue);
        assert_eq!(v.element_type(), None);
        assert_eq!(v.shape(), None);
    }

    #[test_log::test]
    fn buffer_trait_object_downcasts_back_to_concrete_type() {
        let boxed: Box<dyn Buffer> = Box::new(TypedArray::with_lanes(vec![1.0f32, 2.0], vec![2], 1));
        let back = boxed.downcast_ref::<TypedArray<f32>>();
        assert!(back.is_some());
        assert!(boxed.downcast_ref::<PlainValue<i64>>().is_none());
    }
}
