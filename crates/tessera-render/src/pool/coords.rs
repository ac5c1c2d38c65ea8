//! Expanded vertex data ready for upload.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use tessera_core::geometry::{Pos, Rect};

/// One vertex of pool geometry.
///
/// Positions are in target pixels; texture coordinates are in texel units of
/// the bound texture and are normalized by the rasterizer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

const_assert_eq!(std::mem::size_of::<Vertex>(), 16);

impl Vertex {
    pub fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y],
            uv: [u, v],
        }
    }

    /// Returns the wgpu vertex buffer layout.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRS: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
            // location 0: position (vec2)
            0 => Float32x2,
            // location 1: uv (vec2)
            1 => Float32x2,
        ];

        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

/// Four corners of a rect as `(x, y)` floats: top-left, top-right,
/// bottom-left, bottom-right.
fn corners(rect: &Rect<i32>) -> [[f32; 2]; 4] {
    let (l, t) = (rect.x as f32, rect.y as f32);
    let (r, b) = (l + rect.width as f32, t + rect.height as f32);
    [[l, t], [r, t], [l, b], [r, b]]
}

/// Indexed vertex storage for one draw call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordsBuffer {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl CoordsBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(quads: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(quads * 4),
            indices: Vec::with_capacity(quads * 6),
        }
    }

    /// Append raw vertices; `indices` are relative to the first new vertex.
    pub fn append(&mut self, vertices: &[Vertex], indices: &[u32]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.indices.extend(indices.iter().map(|i| base + i));
    }

    /// Append the full content of another buffer.
    pub fn extend_from(&mut self, other: &CoordsBuffer) {
        self.append(&other.vertices, &other.indices);
    }

    /// Drop all geometry, keeping the allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Vertex data as bytes, for `queue.write_buffer`.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    fn push_quad(&mut self, dst: &Rect<i32>, uv: [[f32; 2]; 4], indices: &[u32]) {
        let pos = corners(dst);
        let vertices: [Vertex; 4] =
            std::array::from_fn(|i| Vertex::new(pos[i][0], pos[i][1], uv[i][0], uv[i][1]));
        self.append(&vertices, indices);
    }

    /// Two triangles covering `dst`, textured from `src`.
    pub fn add_rect(&mut self, dst: &Rect<i32>, src: &Rect<i32>) {
        if !dst.is_valid() {
            return;
        }
        self.push_quad(dst, corners(src), &[0, 1, 2, 2, 1, 3]);
    }

    /// A single quad as a four-vertex strip. Only meaningful when the buffer
    /// holds exactly this quad and is drawn as a triangle strip.
    pub fn add_quad_strip(&mut self, dst: &Rect<i32>, src: &Rect<i32>) {
        if !dst.is_valid() {
            return;
        }
        self.push_quad(dst, corners(src), &[0, 1, 2, 3]);
    }

    /// Like [`add_rect`](Self::add_rect) with texture rows flipped.
    pub fn add_upside_down_rect(&mut self, dst: &Rect<i32>, src: &Rect<i32>) {
        if !dst.is_valid() {
            return;
        }
        let [tl, tr, bl, br] = corners(src);
        self.push_quad(dst, [bl, br, tl, tr], &[0, 1, 2, 2, 1, 3]);
    }

    /// An untextured triangle.
    pub fn add_triangle(&mut self, a: Pos<i32>, b: Pos<i32>, c: Pos<i32>) {
        let vertices = [a, b, c].map(|p| Vertex::new(p.x as f32, p.y as f32, 0.0, 0.0));
        self.append(&vertices, &[0, 1, 2]);
    }

    /// Tile `src` over `dst`, clipping the last column and row.
    pub fn add_repeated_rects(&mut self, dst: &Rect<i32>, src: &Rect<i32>) {
        if !dst.is_valid() || !src.is_valid() {
            return;
        }

        // Edges past i32::MAX are clamped; tiling stops where the next
        // tile origin would overflow.
        let right = dst.x.saturating_add(dst.width);
        let bottom = dst.y.saturating_add(dst.height);

        let mut y = dst.top();
        while y < bottom {
            let height = src.height.min(bottom.saturating_sub(y));
            let mut x = dst.left();
            while x < right {
                let width = src.width.min(right.saturating_sub(x));
                self.add_rect(
                    &Rect::new(x, y, width, height),
                    &Rect::new(src.x, src.y, width, height),
                );
                let Some(next) = x.checked_add(src.width) else {
                    break;
                };
                x = next;
            }
            let Some(next) = y.checked_add(src.height) else {
                break;
            };
            y = next;
        }
    }

    /// The border of `dst` as four untextured edge rects of `inner_width`.
    pub fn add_bounding_rect(&mut self, dst: &Rect<i32>, inner_width: i32) {
        if !dst.is_valid() || inner_width <= 0 {
            return;
        }

        let w = inner_width.min(dst.width).min(dst.height);
        let none = Rect::default();
        let side_height = dst.height - 2 * w;

        // top, bottom
        self.add_rect(&Rect::new(dst.x, dst.y, dst.width, w), &none);
        self.add_rect(&Rect::new(dst.x, dst.bottom() - w, dst.width, w), &none);
        // left, right
        self.add_rect(&Rect::new(dst.x, dst.y + w, w, side_height), &none);
        self.add_rect(&Rect::new(dst.right() - w, dst.y + w, w, side_height), &none);
    }

    /// Closed outline through `points` as a line list.
    pub fn add_line_loop(&mut self, points: &[Pos<i32>]) {
        if points.len() < 2 {
            return;
        }

        let vertices: Vec<Vertex> = points
            .iter()
            .map(|p| Vertex::new(p.x as f32, p.y as f32, 0.0, 0.0))
            .collect();
        let n = points.len() as u32;
        let indices: Vec<u32> = (0..n).flat_map(|i| [i, (i + 1) % n]).collect();
        self.append(&vertices, &indices);
    }
}
