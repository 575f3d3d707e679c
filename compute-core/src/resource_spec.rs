#![deny(clippy::expect_used)]
#![deny(clippy::manual_assert)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]

use std::rc::Rc;

use crate::{
    buffer::{Buffer, ResourceKind},
    element_type::ElementType,
    errors::{ComputeError, ComputeResult},
    name::Name,
    registry::Registry,
};

//=================================================================================================|

/// The shape half of a [`ResourceSpec`].
///
/// The distilled form of this engine's spec represents this as two `Option` fields
/// ("`shape`" and "`shape_fn`") plus an invariant that at most one is set. This enum
/// makes that invariant unrepresentable instead of merely checked.
#[derive(Clone)]
pub enum ShapeSpec {
    /// No shape contract.
    Any,

    /// An exact, statically-known shape.
    Static(Vec<usize>),

    /// A shape computed from currently committed upstream buffers. Must not mutate the
    /// registry; it is called with a read-only view during validation.
    Dynamic(Rc<dyn Fn(&Registry) -> ComputeResult<Vec<usize>>>),
}

impl std::fmt::Debug for ShapeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeSpec::Any => write!(f, "Any"),
            ShapeSpec::Static(shape) => write!(f, "Static({shape:?})"),
            ShapeSpec::Dynamic(_) => write!(f, "Dynamic(<fn>)"),
        }
    }
}

//=================================================================================================|

/// The declarative runtime contract a [`Resource`](crate::resource::Resource)'s buffer
/// is validated against at write time.
#[derive(Clone, Debug)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub element_type: Option<ElementType>,
    pub lanes: Option<usize>,
    pub shape: ShapeSpec,
    pub allow_null: bool,
}

impl ResourceSpec {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            element_type: None,
            lanes: None,
            shape: ShapeSpec::Any,
            allow_null: false,
        }
    }

    pub fn with_element_type(mut self, element_type: ElementType) -> Self {
        self.element_type = Some(element_type);
        self
    }

    pub fn with_lanes(mut self, lanes: usize) -> Self {
        self.lanes = Some(lanes);
        self
    }

    pub fn with_shape(mut self, shape: Vec<usize>) -> Self {
        self.shape = ShapeSpec::Static(shape);
        self
    }

    pub fn with_shape_fn(
        mut self,
        shape_fn: impl Fn(&Registry) -> ComputeResult<Vec<usize>> + 'static,
    ) -> Self {
        self.shape = ShapeSpec::Dynamic(Rc::new(shape_fn));
        self
    }

    pub fn allowing_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Validates a candidate buffer. `name` is the resource name being written, used
    /// only to label validation errors. `registry` is consulted for
    /// [`ShapeSpec::Dynamic`] and is not mutated.
    pub fn validate(
        &self,
        name: &Name,
        buffer: Option<&dyn Buffer>,
        registry: &Registry,
    ) -> ComputeResult<()> {
        let Some(buffer) = buffer else {
            return if self.allow_null {
                Ok(())
            } else {
                Err(ComputeError::ValidationFailed {
                    name: name.clone(),
                    reason: "null buffer not permitted by spec (allow_null = false)".to_string(),
                })
            };
        };

        let fail = |reason: String| {
            Err(ComputeError::ValidationFailed { name: name.clone(), reason })
        };

        if buffer.kind() != self.kind {
            return fail(format!(
                "expected resource kind {:?}, got {:?}",
                self.kind,
                buffer.kind()
            ));
        }

        if let Some(expected) = self.element_type {
            match buffer.element_type() {
                Some(actual) if actual == expected => {}
                actual => {
                    return fail(format!(
                        "expected element type {expected}, got {actual:?}"
                    ));
                }
            }
        }

        if let Some(expected) = self.lanes {
            match buffer.lanes() {
                Some(actual) if actual == expected => {}
                actual => {
                    return fail(format!("expected {expected} lanes, got {actual:?}"));
                }
            }
        }

        match &self.shape {
            ShapeSpec::Any => {}
            ShapeSpec::Static(expected) => {
                if buffer.shape() != Some(expected.as_slice()) {
                    return fail(format!(
                        "expected shape {expected:?}, got {:?}",
                        buffer.shape()
                    ));
                }
            }
            ShapeSpec::Dynamic(shape_fn) => {
                let expected = shape_fn(registry)?;
                if buffer.shape() != Some(expected.as_slice()) {
                    return fail(format!(
                        "expected dynamic shape {expected:?}, got {:?}",
                        buffer.shape()
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod t {
    use super::*;
    use crate::{buffer::TypedArray, element_type::ElementType, module::World};

    #[test_log::test]
    fn null_buffer_rejected_unless_allowed() {
        let world = World::new();
        let spec = ResourceSpec::new(ResourceKind::PlainValue);
        let name = Name::from("m.x");
        assert!(spec.validate(&name, None, world.registry()).is_err());

        let spec = spec.allowing_null();
        assert!(spec.validate(&name, None, world.registry()).is_ok());
    }

    #[test_log::test]
    fn kind_mismatch_is_rejected() {
        let world = World::new();
        let spec = ResourceSpec::new(ResourceKind::PlainValue);
        let name = Name::from("m.x");
        let buf = TypedArray::new(vec![1.0f32], vec![1]);
        let err = spec.validate(&name, Some(&buf), world.registry()).unwrap_err();
        assert!(matches!(err, ComputeError::ValidationFailed { .. }));
    }

    #[test_log::test]
    fn static_shape_must_match_exactly() {
        let world = World::new();
        let spec = ResourceSpec::new(ResourceKind::TypedArray)
            .with_element_type(ElementType::F32)
            .with_shape(vec![3]);
        let name = Name::from("m.x");

        let ok_buf = TypedArray::new(vec![1.0f32, 2.0, 3.0], vec![3]);
        assert!(spec.validate(&name, Some(&ok_buf), world.registry()).is_ok());

        let bad_buf = TypedArray::new(vec![1.0f32, 2.0], vec![2]);
        assert!(spec.validate(&name, Some(&bad_buf), world.registry()).is_err());
    }
}
