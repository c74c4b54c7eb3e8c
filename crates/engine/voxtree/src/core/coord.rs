// Octant coordinates and root-relative coordinate paths

use crate::core::side::Side;
use crate::error::{OctreeError, Result};
use glam::IVec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compact octant index in `[0, 8)`, or the `INVALID` sentinel
///
/// Layout: index = x + y*2 + z*4 = x | (y << 1) | (z << 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildIndex(u8);

impl ChildIndex {
    /// Produced by converting a coordinate with a component outside {0,1}
    pub const INVALID: ChildIndex = ChildIndex(u8::MAX);

    /// Wrap a raw index; anything >= 8 becomes `INVALID`
    #[inline]
    pub fn new(index: usize) -> Self {
        if index < 8 {
            ChildIndex(index as u8)
        } else {
            Self::INVALID
        }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 < 8
    }

    /// The index as an array offset, if valid
    #[inline]
    pub fn get(self) -> Option<usize> {
        self.is_valid().then_some(self.0 as usize)
    }

    /// The index as an array offset
    ///
    /// Panics on `INVALID`: indexing a child array with it is a logic error.
    #[inline]
    pub fn as_usize(self) -> usize {
        assert!(self.is_valid(), "attempted to index a child array with an invalid octant");
        self.0 as usize
    }

    /// Iterate over all eight valid indices
    #[inline]
    pub fn all() -> impl Iterator<Item = ChildIndex> {
        (0..8).map(|i| ChildIndex(i as u8))
    }
}

/// Octant selector within a parent cell, each component 0 or 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChildCoord {
    /// All eight octants ordered by index
    pub const ALL: [ChildCoord; 8] = [
        ChildCoord::new(0, 0, 0),
        ChildCoord::new(1, 0, 0),
        ChildCoord::new(0, 1, 0),
        ChildCoord::new(1, 1, 0),
        ChildCoord::new(0, 0, 1),
        ChildCoord::new(1, 0, 1),
        ChildCoord::new(0, 1, 1),
        ChildCoord::new(1, 1, 1),
    ];

    /// Unchecked constructor; out-of-range components are representable
    /// and map to `ChildIndex::INVALID`
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Checked constructor used by mutating APIs
    pub fn try_new(x: i32, y: i32, z: i32) -> Result<Self> {
        let coord = Self::new(x, y, z);
        coord.validate()?;
        Ok(coord)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        (0..=1).contains(&self.x) && (0..=1).contains(&self.y) && (0..=1).contains(&self.z)
    }

    pub fn validate(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(OctreeError::InvalidCoordinate {
                x: self.x,
                y: self.y,
                z: self.z,
            })
        }
    }

    /// Convert to compact index, `INVALID` when out of range
    #[inline]
    pub fn index(self) -> ChildIndex {
        if self.is_valid() {
            ChildIndex((self.x | (self.y << 1) | (self.z << 2)) as u8)
        } else {
            ChildIndex::INVALID
        }
    }

    /// Convert from compact index; `None` for `INVALID`
    #[inline]
    pub fn from_index(index: ChildIndex) -> Option<Self> {
        index.get().map(|i| Self::ALL[i])
    }

    #[inline]
    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }

    #[inline]
    pub fn from_ivec3(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    /// Octant letter used by the text format ('a'..'h')
    pub fn to_char(self) -> Option<char> {
        self.index().get().map(|i| (b'a' + i as u8) as char)
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a'..='h' => Some(Self::ALL[(c as u8 - b'a') as usize]),
            _ => None,
        }
    }
}

impl From<ChildCoord> for IVec3 {
    fn from(coord: ChildCoord) -> Self {
        coord.as_ivec3()
    }
}

/// Immutable sequence of octants from the tree root to a node
///
/// The root has the empty path and `path.depth() == node.depth` for every node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordPath {
    coords: Vec<ChildCoord>,
}

/// Result of a same-depth neighbor query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Neighbor {
    /// The adjacent cell lies inside the owning tree
    Inside(CoordPath),
    /// The carry ran past the root: the adjacent cell belongs to the sibling
    /// tree on `side`, addressed there by `path`
    Outside { side: Side, path: CoordPath },
}

impl Neighbor {
    /// The in-tree path, discarding cross-tree results
    pub fn inside(self) -> Option<CoordPath> {
        match self {
            Neighbor::Inside(path) => Some(path),
            Neighbor::Outside { .. } => None,
        }
    }

    pub fn is_inside(&self) -> bool {
        matches!(self, Neighbor::Inside(_))
    }

    pub fn path(&self) -> &CoordPath {
        match self {
            Neighbor::Inside(path) | Neighbor::Outside { path, .. } => path,
        }
    }
}

impl CoordPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from raw coordinates, rejecting invalid octants
    pub fn from_coords(coords: Vec<ChildCoord>) -> Result<Self> {
        for coord in &coords {
            coord.validate()?;
        }
        Ok(Self { coords })
    }

    /// Build a path from octant indices (0-7)
    pub fn from_indices(indices: &[usize]) -> Result<Self> {
        let coords = indices
            .iter()
            .map(|&i| {
                ChildCoord::from_index(ChildIndex::new(i)).ok_or(OctreeError::InvalidCoordinate {
                    x: i as i32,
                    y: 0,
                    z: 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { coords })
    }

    /// Path of the cell at integer position `pos` on a `2^depth` grid
    ///
    /// Returns `None` if `pos` lies outside `[0, 2^depth)` on any axis.
    pub fn from_position(pos: IVec3, depth: u32) -> Option<Self> {
        let extent = 1i64 << depth;
        let inside = |v: i32| (0..extent).contains(&(v as i64));
        if !(inside(pos.x) && inside(pos.y) && inside(pos.z)) {
            return None;
        }
        let coords = (0..depth)
            .rev()
            .map(|level| ChildCoord::from_ivec3((pos >> level as i32) & 1))
            .collect();
        Some(Self { coords })
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.coords.len() as u32
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.coords.is_empty()
    }

    #[inline]
    pub fn coords(&self) -> &[ChildCoord] {
        &self.coords
    }

    pub fn iter(&self) -> impl Iterator<Item = ChildCoord> + '_ {
        self.coords.iter().copied()
    }

    /// Coordinate within the parent, `None` for the root
    pub fn last(&self) -> Option<ChildCoord> {
        self.coords.last().copied()
    }

    /// Extend by one octant
    pub fn child(&self, coord: ChildCoord) -> Self {
        debug_assert!(coord.is_valid(), "invalid octant {coord:?}");
        let mut coords = Vec::with_capacity(self.coords.len() + 1);
        coords.extend_from_slice(&self.coords);
        coords.push(coord);
        Self { coords }
    }

    /// Path of the parent, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        (!self.is_root()).then(|| self.truncated(self.depth() - 1))
    }

    /// Ancestor path at `depth`; returns a clone when `depth >= self.depth()`
    pub fn truncated(&self, depth: u32) -> Self {
        let len = (depth as usize).min(self.coords.len());
        Self {
            coords: self.coords[..len].to_vec(),
        }
    }

    /// True if `self` is a (non-strict) prefix of `other`
    pub fn is_ancestor_of(&self, other: &CoordPath) -> bool {
        other.coords.starts_with(&self.coords)
    }

    /// Integer cell position on the `2^depth` grid of this path's depth
    pub fn position(&self) -> IVec3 {
        self.coords
            .iter()
            .fold(IVec3::ZERO, |pos, c| pos * 2 + c.as_ivec3())
    }

    /// Path of the adjacent cell at the same depth
    ///
    /// Offsets the deepest coordinate and ripples any overflow toward the
    /// root, one bit per axis per level. A carry surviving past the root
    /// yields `Neighbor::Outside` with the wrapped path, which addresses the
    /// same-depth cell inside the sibling tree on `side`.
    pub fn neighbor(&self, side: Side) -> Neighbor {
        let mut coords = self.coords.clone();
        let mut carry = side.offset();

        for coord in coords.iter_mut().rev() {
            if carry == IVec3::ZERO {
                break;
            }
            let moved = coord.as_ivec3() + carry;
            *coord = ChildCoord::from_ivec3(moved.rem_euclid(IVec3::splat(2)));
            carry = moved.div_euclid(IVec3::splat(2));
        }

        let path = Self { coords };
        if carry == IVec3::ZERO {
            Neighbor::Inside(path)
        } else {
            Neighbor::Outside { side, path }
        }
    }
}

impl fmt::Display for CoordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for coord in &self.coords {
            if let Some(c) = coord.to_char() {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for CoordPath {
    type Err = OctreeError;

    fn from_str(s: &str) -> Result<Self> {
        let coords = s
            .chars()
            .map(|c| {
                ChildCoord::from_char(c).ok_or(OctreeError::InvalidCoordinate {
                    x: c as i32,
                    y: 0,
                    z: 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { coords })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(coords: &[(i32, i32, i32)]) -> CoordPath {
        CoordPath::from_coords(coords.iter().map(|&(x, y, z)| ChildCoord::new(x, y, z)).collect())
            .unwrap()
    }

    #[test]
    fn test_index_bijection() {
        for index in ChildIndex::all() {
            let coord = ChildCoord::from_index(index).unwrap();
            assert_eq!(coord.index(), index);
        }
        for z in 0..2 {
            for y in 0..2 {
                for x in 0..2 {
                    let coord = ChildCoord::new(x, y, z);
                    assert_eq!(ChildCoord::from_index(coord.index()), Some(coord));
                    assert_eq!(coord.index().get(), Some((x + 2 * y + 4 * z) as usize));
                }
            }
        }
    }

    #[test]
    fn test_invalid_coordinate_maps_to_sentinel() {
        assert_eq!(ChildCoord::new(2, 0, 0).index(), ChildIndex::INVALID);
        assert_eq!(ChildCoord::new(0, -1, 0).index(), ChildIndex::INVALID);
        assert_eq!(ChildIndex::INVALID.get(), None);
        assert_eq!(ChildIndex::new(8), ChildIndex::INVALID);
        assert!(matches!(
            ChildCoord::try_new(0, 0, 3),
            Err(OctreeError::InvalidCoordinate { x: 0, y: 0, z: 3 })
        ));
    }

    #[test]
    #[should_panic(expected = "invalid octant")]
    fn test_invalid_index_panics_when_used() {
        let _ = ChildIndex::INVALID.as_usize();
    }

    #[test]
    fn test_carry_literal() {
        let start = path(&[(1, 1, 1), (0, 1, 0)]);

        let once = start.neighbor(Side::Right);
        assert_eq!(once, Neighbor::Inside(path(&[(1, 1, 1), (1, 1, 0)])));

        let twice = once.path().neighbor(Side::Right);
        assert_eq!(
            twice,
            Neighbor::Outside {
                side: Side::Right,
                path: path(&[(0, 1, 1), (0, 1, 0)]),
            }
        );
    }

    #[test]
    fn test_carry_inside_tree() {
        // Crossing from octant x=1 of the left half into x=0 of the right half
        let start = path(&[(0, 0, 0), (1, 0, 0)]);
        assert_eq!(
            start.neighbor(Side::Right),
            Neighbor::Inside(path(&[(1, 0, 0), (0, 0, 0)]))
        );
        assert_eq!(
            path(&[(1, 0, 0), (0, 0, 0)]).neighbor(Side::Left),
            Neighbor::Inside(start)
        );
    }

    #[test]
    fn test_root_has_no_inside_neighbor() {
        for side in Side::ALL {
            match CoordPath::root().neighbor(side) {
                Neighbor::Outside { side: s, path } => {
                    assert_eq!(s, side);
                    assert!(path.is_root());
                }
                other => panic!("root produced {other:?}"),
            }
        }
    }

    #[test]
    fn test_neighbor_inverse_law() {
        // Every path of depth 1..=3 against every side
        for depth in 1..=3u32 {
            let extent = 1 << depth;
            for x in 0..extent {
                for y in 0..extent {
                    for z in 0..extent {
                        let p = CoordPath::from_position(IVec3::new(x, y, z), depth).unwrap();
                        for side in Side::ALL {
                            if let Neighbor::Inside(n) = p.neighbor(side) {
                                assert_eq!(
                                    n.neighbor(side.opposite()),
                                    Neighbor::Inside(p.clone()),
                                    "path {p} side {side:?}"
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_neighbor_matches_grid_offset() {
        let p = CoordPath::from_position(IVec3::new(3, 4, 5), 3).unwrap();
        for side in Side::ALL {
            let target = IVec3::new(3, 4, 5) + side.offset();
            match p.neighbor(side) {
                Neighbor::Inside(n) => assert_eq!(n.position(), target),
                Neighbor::Outside { .. } => panic!("{side:?} should stay inside"),
            }
        }
    }

    #[test]
    fn test_position_round_trip() {
        let p = path(&[(1, 0, 1), (0, 1, 1), (1, 1, 0)]);
        assert_eq!(p.position(), IVec3::new(5, 3, 6));
        assert_eq!(CoordPath::from_position(p.position(), 3), Some(p));
        assert_eq!(CoordPath::from_position(IVec3::new(8, 0, 0), 3), None);
        assert_eq!(CoordPath::from_position(IVec3::new(-1, 0, 0), 3), None);
    }

    #[test]
    fn test_parent_and_truncate() {
        let p = path(&[(1, 0, 0), (0, 1, 0), (0, 0, 1)]);
        assert_eq!(p.parent(), Some(path(&[(1, 0, 0), (0, 1, 0)])));
        assert_eq!(p.truncated(1), path(&[(1, 0, 0)]));
        assert_eq!(p.truncated(10), p);
        assert!(p.truncated(1).is_ancestor_of(&p));
        assert_eq!(CoordPath::root().parent(), None);
    }

    #[test]
    fn test_text_form() {
        let p: CoordPath = "ahb".parse().unwrap();
        assert_eq!(p, path(&[(0, 0, 0), (1, 1, 1), (1, 0, 0)]));
        assert_eq!(p.to_string(), "ahb");
        assert!("ax".parse::<CoordPath>().is_err());
    }
}
