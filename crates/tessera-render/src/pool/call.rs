use std::fmt;
use std::rc::Rc;

use crate::pool::buffer::DrawBufferRef;
use crate::pool::coords::CoordsBuffer;
use crate::pool::method::DrawMethod;
use crate::pool::state::{Action, PaintState};
use crate::raster::DrawMode;

/// The methods drawn by one call.
#[derive(Debug, Clone, PartialEq)]
pub enum Methods {
    Single(DrawMethod),
    Batched(Vec<DrawMethod>),
}

impl Methods {
    /// Append a method, promoting a single method to a list.
    pub fn push(&mut self, method: DrawMethod) {
        match self {
            Methods::Single(first) => {
                let first = *first;
                *self = Methods::Batched(vec![first, method]);
            }
            Methods::Batched(list) => list.push(method),
        }
    }

    pub fn as_slice(&self) -> &[DrawMethod] {
        match self {
            Methods::Single(method) => std::slice::from_ref(method),
            Methods::Batched(list) => list,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// What an `add` draws: a primitive, or geometry the producer already built.
#[derive(Debug, Clone)]
pub enum Geometry {
    Method(DrawMethod),
    Coords(Rc<CoordsBuffer>),
}

impl From<DrawMethod> for Geometry {
    fn from(method: DrawMethod) -> Self {
        Geometry::Method(method)
    }
}

impl From<Rc<CoordsBuffer>> for Geometry {
    fn from(coords: Rc<CoordsBuffer>) -> Self {
        Geometry::Coords(coords)
    }
}

/// A draw of one or more methods under a single paint state.
#[derive(Clone)]
pub struct GeometryCall {
    pub mode: DrawMode,
    pub state: PaintState,
    /// Empty for calls carrying external coords.
    pub methods: Methods,
    /// Cache slot the call was emitted through, if any.
    pub buffer: Option<DrawBufferRef>,
    pub coords: Option<Rc<CoordsBuffer>>,
}

impl GeometryCall {
    /// Whether `method` may be appended to this call.
    pub(crate) fn accepts(
        &self,
        state: &PaintState,
        mode: DrawMode,
        buffer: Option<&DrawBufferRef>,
    ) -> bool {
        let same_slot = match (&self.buffer, buffer) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };

        self.coords.is_none()
            && same_slot
            && self.mode.is_batchable()
            && mode.is_batchable()
            && self.state == *state
    }

    /// Append a method. A call holding more than one method is always a
    /// triangle list.
    pub(crate) fn merge(&mut self, method: DrawMethod) {
        self.methods.push(method);
        self.mode = DrawMode::Triangles;
    }
}

impl fmt::Debug for GeometryCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeometryCall")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("methods", &self.methods)
            .field("buffered", &self.buffer.is_some())
            .field("coords", &self.coords.as_ref().map(|c| c.vertex_count()))
            .finish()
    }
}

/// One entry of a pool bucket.
#[derive(Clone)]
pub enum DrawCall {
    Geometry(GeometryCall),
    Action(Action),
}

impl DrawCall {
    pub fn as_geometry(&self) -> Option<&GeometryCall> {
        match self {
            DrawCall::Geometry(call) => Some(call),
            DrawCall::Action(_) => None,
        }
    }

    pub fn as_geometry_mut(&mut self) -> Option<&mut GeometryCall> {
        match self {
            DrawCall::Geometry(call) => Some(call),
            DrawCall::Action(_) => None,
        }
    }

    pub fn state(&self) -> Option<&PaintState> {
        self.as_geometry().map(|call| &call.state)
    }
}

impl fmt::Debug for DrawCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawCall::Geometry(call) => call.fmt(f),
            DrawCall::Action(_) => f.write_str("Action"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::geometry::Rect;

    #[test]
    fn test_push_promotes_single() {
        let a = DrawMethod::filled(Rect::new(0, 0, 1, 1));
        let b = DrawMethod::filled(Rect::new(1, 0, 1, 1));
        let mut methods = Methods::Single(a);
        methods.push(b);
        assert_eq!(methods, Methods::Batched(vec![a, b]));
        assert_eq!(methods.len(), 2);
    }

    #[test]
    fn test_merge_forces_triangles() {
        let a = DrawMethod::filled(Rect::new(0, 0, 1, 1));
        let mut call = GeometryCall {
            mode: DrawMode::TriangleStrip,
            state: PaintState::default(),
            methods: Methods::Single(a),
            buffer: None,
            coords: None,
        };
        assert!(call.accepts(&PaintState::default(), DrawMode::TriangleStrip, None));
        call.merge(a);
        assert_eq!(call.mode, DrawMode::Triangles);
    }

    #[test]
    fn test_lines_never_merge() {
        let call = GeometryCall {
            mode: DrawMode::Lines,
            state: PaintState::default(),
            methods: Methods::Single(DrawMethod::filled(Rect::new(0, 0, 1, 1))),
            buffer: None,
            coords: None,
        };
        assert!(!call.accepts(&PaintState::default(), DrawMode::Lines, None));
    }
}
