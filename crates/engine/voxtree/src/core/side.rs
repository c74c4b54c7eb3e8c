use crate::core::coord::ChildCoord;
use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Face-adjacency direction of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Above,   // +Y
    Below,   // -Y
    Left,    // -X
    Right,   // +X
    Forward, // +Z
    Back,    // -Z
}

impl Side {
    /// All six sides in order
    pub const ALL: [Side; 6] = [
        Side::Above,
        Side::Below,
        Side::Left,
        Side::Right,
        Side::Forward,
        Side::Back,
    ];

    /// Position in `ALL`, used to index per-side arrays
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Above => Side::Below,
            Side::Below => Side::Above,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Forward => Side::Back,
            Side::Back => Side::Forward,
        }
    }

    /// Axis this side is perpendicular to (0 = x, 1 = y, 2 = z)
    #[inline]
    pub fn axis(self) -> usize {
        match self {
            Side::Left | Side::Right => 0,
            Side::Above | Side::Below => 1,
            Side::Forward | Side::Back => 2,
        }
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        matches!(self, Side::Above | Side::Right | Side::Forward)
    }

    /// Side perpendicular to `axis`, facing its positive or negative end
    ///
    /// # Panics
    ///
    /// Panics if `axis` is not 0, 1 or 2.
    pub fn from_axis(axis: usize, positive: bool) -> Self {
        match (axis, positive) {
            (0, true) => Side::Right,
            (0, false) => Side::Left,
            (1, true) => Side::Above,
            (1, false) => Side::Below,
            (2, true) => Side::Forward,
            (2, false) => Side::Back,
            _ => panic!("axis {axis} out of range"),
        }
    }

    /// Unit grid step toward the neighbor on this side
    #[inline]
    pub fn offset(self) -> IVec3 {
        match self {
            Side::Above => IVec3::Y,
            Side::Below => IVec3::NEG_Y,
            Side::Left => IVec3::NEG_X,
            Side::Right => IVec3::X,
            Side::Forward => IVec3::Z,
            Side::Back => IVec3::NEG_Z,
        }
    }

    /// Outward unit normal
    #[inline]
    pub fn normal(self) -> Vec3 {
        self.offset().as_vec3()
    }

    /// Try to create from a vector (must be close to axis-aligned)
    pub fn from_normal(v: Vec3) -> Option<Self> {
        let abs = v.abs();
        if abs.x > abs.y && abs.x > abs.z {
            return Some(Self::from_axis(0, v.x > 0.0));
        }
        if abs.y > abs.x && abs.y > abs.z {
            return Some(Self::from_axis(1, v.y > 0.0));
        }
        if abs.z > abs.x && abs.z > abs.y {
            return Some(Self::from_axis(2, v.z > 0.0));
        }
        None
    }

    /// True if an octant lies against this side of its parent
    #[inline]
    pub fn touches(self, coord: ChildCoord) -> bool {
        let component = coord.as_ivec3()[self.axis()];
        component == i32::from(self.is_positive())
    }

    /// The three sides of its parent an octant lies against
    pub fn touched_by(coord: ChildCoord) -> [Side; 3] {
        [
            Self::from_axis(0, coord.x == 1),
            Self::from_axis(1, coord.y == 1),
            Self::from_axis(2, coord.z == 1),
        ]
    }

    /// The four octants lying against this side
    pub fn children(self) -> [ChildCoord; 4] {
        let mut out = [ChildCoord::new(0, 0, 0); 4];
        let mut n = 0;
        for coord in ChildCoord::ALL {
            if self.touches(coord) {
                out[n] = coord;
                n += 1;
            }
        }
        out
    }

    /// Iterator over all sides
    #[inline]
    pub fn iter() -> impl Iterator<Item = Side> {
        Self::ALL.iter().copied()
    }
}
