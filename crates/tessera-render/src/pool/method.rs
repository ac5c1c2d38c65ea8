use tessera_core::geometry::{Pos, Rect};

use crate::pool::coords::CoordsBuffer;
use crate::raster::DrawMode;

/// One primitive request. Coordinates are integer target pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMethod {
    /// `dst` filled with the `src` region of the bound texture.
    Rect { src: Rect<i32>, dst: Rect<i32> },
    Triangle { a: Pos<i32>, b: Pos<i32>, c: Pos<i32> },
    /// `src` tiled across `dst`.
    RepeatedRect { src: Rect<i32>, dst: Rect<i32> },
    /// Border of `dst`, `inner_line_width` pixels thick.
    BoundingRect { dst: Rect<i32>, inner_line_width: u16 },
    UpsideDownRect { src: Rect<i32>, dst: Rect<i32> },
}

impl DrawMethod {
    /// Filled rect without texture coordinates.
    pub fn filled(dst: Rect<i32>) -> Self {
        DrawMethod::Rect {
            src: Rect::default(),
            dst,
        }
    }

    /// Whether the method covers no pixels.
    pub fn is_empty(&self) -> bool {
        match self {
            DrawMethod::Rect { dst, .. }
            | DrawMethod::UpsideDownRect { dst, .. }
            | DrawMethod::BoundingRect { dst, .. } => !dst.is_valid(),
            DrawMethod::RepeatedRect { src, dst } => !dst.is_valid() || !src.is_valid(),
            DrawMethod::Triangle { a, b, c } => {
                // twice the signed area
                let area = (b.x - a.x) as i64 * (c.y - a.y) as i64
                    - (c.x - a.x) as i64 * (b.y - a.y) as i64;
                area == 0
            }
        }
    }

    /// Only a plain rect can be drawn as a four-vertex strip.
    pub fn supports_strip(&self) -> bool {
        matches!(self, DrawMethod::Rect { .. })
    }

    /// Expand into vertices for `mode`.
    pub fn expand(&self, mode: DrawMode, coords: &mut CoordsBuffer) {
        if mode == DrawMode::Lines {
            self.expand_outline(coords);
            return;
        }

        match self {
            DrawMethod::Rect { src, dst } => {
                if mode == DrawMode::TriangleStrip {
                    coords.add_quad_strip(dst, src);
                } else {
                    coords.add_rect(dst, src);
                }
            }
            DrawMethod::Triangle { a, b, c } => coords.add_triangle(*a, *b, *c),
            DrawMethod::RepeatedRect { src, dst } => coords.add_repeated_rects(dst, src),
            DrawMethod::BoundingRect {
                dst,
                inner_line_width,
            } => coords.add_bounding_rect(dst, i32::from(*inner_line_width)),
            DrawMethod::UpsideDownRect { src, dst } => coords.add_upside_down_rect(dst, src),
        }
    }

    fn expand_outline(&self, coords: &mut CoordsBuffer) {
        match self {
            DrawMethod::Triangle { a, b, c } => coords.add_line_loop(&[*a, *b, *c]),
            DrawMethod::Rect { dst, .. }
            | DrawMethod::RepeatedRect { dst, .. }
            | DrawMethod::BoundingRect { dst, .. }
            | DrawMethod::UpsideDownRect { dst, .. } => {
                let (l, t, r, b) = (dst.left(), dst.top(), dst.right(), dst.bottom());
                coords.add_line_loop(&[
                    Pos::new(l, t),
                    Pos::new(r, t),
                    Pos::new(r, b),
                    Pos::new(l, b),
                ]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_mode_emits_four_indices() {
        let mut coords = CoordsBuffer::new();
        DrawMethod::filled(Rect::new(0, 0, 4, 4)).expand(DrawMode::TriangleStrip, &mut coords);
        assert_eq!(coords.index_count(), 4);
    }

    #[test]
    fn test_lines_mode_outlines_rect() {
        let mut coords = CoordsBuffer::new();
        DrawMethod::filled(Rect::new(0, 0, 4, 4)).expand(DrawMode::Lines, &mut coords);
        assert_eq!(coords.vertex_count(), 4);
        assert_eq!(coords.index_count(), 8);
    }

    #[test]
    fn test_collinear_triangle_is_empty() {
        let method = DrawMethod::Triangle {
            a: Pos::new(0, 0),
            b: Pos::new(1, 1),
            c: Pos::new(2, 2),
        };
        assert!(method.is_empty());
        assert!(DrawMethod::filled(Rect::new(0, 0, 0, 5)).is_empty());
        assert!(!DrawMethod::filled(Rect::new(0, 0, 1, 5)).is_empty());
    }
}
