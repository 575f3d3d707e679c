#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

use std::fmt;

//=================================================================================================|

/// The element type a [`TypedArray`](crate::buffer::TypedArray) is validated against.
///
/// `Other` is an escape hatch for external collaborators (e.g. a GPU runtime) whose
/// element types this crate has no built-in knowledge of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    F32,
    F64,
    I32,
    U32,
    Bool,
    Other(&'static str),
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::F32 => write!(f, "f32"),
            ElementType::F64 => write!(f, "f64"),
            ElementType::I32 => write!(f, "i32"),
            ElementType::U32 => write!(f, "u32"),
            ElementType::Bool => write!(f, "bool"),
            ElementType::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Implemented by the element types a [`TypedArray<T>`](crate::buffer::TypedArray) may
/// hold, so that [`ResourceSpec::validate`](crate::resource_spec::ResourceSpec::validate)
/// can inspect the element type generically.
pub trait ElementTyped {
    const ELEMENT_TYPE: ElementType;
}

impl ElementTyped for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::F32;
}

impl ElementTyped for f64 {
    const ELEMENT_TYPE: ElementType = ElementType::F64;
}

impl ElementTyped for i32 {
    const ELEMENT_TYPE: ElementType = ElementType::I32;
}

impl ElementTyped for u32 {
    const ELEMENT_TYPE: ElementType = ElementType::U32;
}

impl ElementTyped for bool {
    const ELEMENT_TYPE: ElementType = ElementType::Bool;
}
