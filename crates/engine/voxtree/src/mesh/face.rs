use crate::core::{Aabb, Side};
use glam::{Vec2, Vec3};

/// Geometry of one emitted face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    /// Corners in counter-clockwise order when viewed from outside
    pub vertices: [Vec3; 4],
    pub uvs: [Vec2; 4],
    pub normal: Vec3,
}

impl Quad {
    /// The face of `bounds` on `side`
    pub fn new(side: Side, bounds: Aabb) -> Self {
        Self {
            vertices: vertices(side, bounds.min, bounds.size),
            uvs: uvs(side),
            normal: side.normal(),
        }
    }

    /// Part of the `side` face of a cell covered by a smaller neighbor
    /// sub-cell `covered`, lying on the other side of the shared plane
    pub fn covered_by(side: Side, covered: Aabb) -> Self {
        Self::new(side, covered.shifted(side.opposite()))
    }

    /// Area of the quad
    pub fn area(&self) -> f32 {
        let [a, b, c, _] = self.vertices;
        (b - a).cross(c - b).length()
    }
}

/// Four vertices for a face in counter-clockwise order when viewed from outside
fn vertices(side: Side, min: Vec3, size: f32) -> [Vec3; 4] {
    let (x, y, z) = (min.x, min.y, min.z);
    let s = size;
    let v = Vec3::new;
    match side {
        Side::Above => [
            v(x, y + s, z),
            v(x, y + s, z + s),
            v(x + s, y + s, z + s),
            v(x + s, y + s, z),
        ],
        Side::Below => [
            v(x, y, z),
            v(x + s, y, z),
            v(x + s, y, z + s),
            v(x, y, z + s),
        ],
        Side::Left => [
            v(x, y, z + s),
            v(x, y + s, z + s),
            v(x, y + s, z),
            v(x, y, z),
        ],
        Side::Right => [
            v(x + s, y, z),
            v(x + s, y + s, z),
            v(x + s, y + s, z + s),
            v(x + s, y, z + s),
        ],
        Side::Forward => [
            v(x + s, y, z + s),
            v(x + s, y + s, z + s),
            v(x, y + s, z + s),
            v(x, y, z + s),
        ],
        Side::Back => [
            v(x, y, z),
            v(x, y + s, z),
            v(x + s, y + s, z),
            v(x + s, y, z),
        ],
    }
}

/// UV coordinates matching the vertex order: (0,0) bottom-left, (1,1) top-right
fn uvs(side: Side) -> [Vec2; 4] {
    match side {
        Side::Below => [Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
        _ => [Vec2::ZERO, Vec2::Y, Vec2::ONE, Vec2::X],
    }
}
