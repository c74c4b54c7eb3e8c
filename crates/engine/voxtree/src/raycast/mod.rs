//! Parametric octree ray traversal
//!
//! Rays are mirrored into the positive octant so every axis is walked in
//! increasing order; the mirror mask maps visited octants back to real
//! children. Children are visited strictly front to back, so the first
//! recorded hit is the nearest one.

use crate::core::{ChildCoord, CoordPath, NodeId, Octree, OctreeNode, Side};
use crate::error::{OctreeError, Result};
use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directions closer to zero than this are treated as parallel to an axis
const PARALLEL_EPSILON: f32 = 1e-7;
/// Stand-in for `1 / 0` on parallel axes
const PARALLEL_INV: f32 = 1e30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec3,
    /// Need not be normalized; distances are measured along the unit direction
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }
}

/// Traversal limits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RayQuery {
    /// Report hits at this depth instead of descending further
    pub depth: Option<u32>,
    /// Stop after the nearest hit
    pub stop_at_first: bool,
}

impl RayQuery {
    pub fn first() -> Self {
        Self {
            depth: None,
            stop_at_first: true,
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn at_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin along the unit direction, zero when the
    /// origin is inside the hit cell
    pub distance: f32,
    pub position: Vec3,
    /// Outward normal of the entered face
    pub normal: Vec3,
    pub side: Side,
    pub path: CoordPath,
    pub node: NodeId,
    /// Grid cell of the tree that was hit
    pub cell: IVec3,
    /// True for a depth-limited hit on a node that is not itself a solid leaf
    pub coarse: bool,
}

impl<T> Octree<T>
where
    T: Clone + PartialEq + fmt::Debug,
{
    /// Solid cells along `ray`, nearest first
    pub fn intersect(&self, ray: &Ray, query: RayQuery) -> Result<Vec<RayHit>> {
        if let Some(depth) = query.depth {
            if depth > self.config().max_depth {
                return Err(OctreeError::OutOfRangeDepth {
                    requested: depth,
                    max: self.config().max_depth,
                });
            }
        }
        let length = ray.direction.length();
        if !length.is_finite() || length < PARALLEL_EPSILON {
            return Err(OctreeError::InvalidDirection);
        }
        let direction = ray.direction / length;

        let bounds = self.bounds();
        let (min, max) = (bounds.min, bounds.max());
        let mut origin = ray.origin;
        let mut dir = direction;
        let mut mirror = 0usize;
        for axis in 0..3 {
            if dir[axis] < 0.0 {
                origin[axis] = min[axis] + max[axis] - origin[axis];
                dir[axis] = -dir[axis];
                mirror |= 1 << axis;
            }
        }

        let mut t0 = Vec3::ZERO;
        let mut t1 = Vec3::ZERO;
        for axis in 0..3 {
            if dir[axis] < PARALLEL_EPSILON {
                t0[axis] = (min[axis] - origin[axis]) * PARALLEL_INV;
                t1[axis] = (max[axis] - origin[axis]) * PARALLEL_INV;
            } else {
                t0[axis] = (min[axis] - origin[axis]) / dir[axis];
                t1[axis] = (max[axis] - origin[axis]) / dir[axis];
            }
        }

        let mut walk = Walk {
            tree: self,
            origin: ray.origin,
            direction,
            mirror,
            query,
            hits: Vec::new(),
        };
        if t0.max_element() < t1.min_element() {
            walk.descend(self.root(), t0, t1, &CoordPath::root());
        }
        tracing::trace!(hits = walk.hits.len(), "ray traversal finished");
        Ok(walk.hits)
    }

    /// Nearest solid cell along `ray`
    pub fn pick(&self, ray: &Ray) -> Result<Option<RayHit>> {
        Ok(self.intersect(ray, RayQuery::first())?.into_iter().next())
    }
}

struct Walk<'a, T> {
    tree: &'a Octree<T>,
    origin: Vec3,
    direction: Vec3,
    mirror: usize,
    query: RayQuery,
    hits: Vec<RayHit>,
}

impl<'a, T> Walk<'a, T>
where
    T: Clone + PartialEq + fmt::Debug,
{
    /// Visit a node spanning `[t0, t1]` per axis; true once traversal should stop
    fn descend(&mut self, id: NodeId, t0: Vec3, t1: Vec3, path: &CoordPath) -> bool {
        if t1.min_element() < 0.0 {
            return false;
        }
        let tree = self.tree;
        let Some(node) = tree.node(id) else {
            return false;
        };

        if node.is_solid() {
            self.record(id, node, t0, false);
            return self.query.stop_at_first;
        }
        if !node.has_solid_descendant() {
            return false;
        }
        if self.query.depth == Some(path.depth()) {
            self.record(id, node, t0, true);
            return self.query.stop_at_first;
        }

        let tm = (t0 + t1) * 0.5;
        let mut octant = first_octant(t0, tm);
        while octant < 8 {
            let (c0, c1) = child_span(octant, t0, tm, t1);
            let coord = ChildCoord::ALL[octant ^ self.mirror];
            if let Some(child) = node.child_at(coord) {
                if self.descend(child, c0, c1, &path.child(coord)) {
                    return true;
                }
            }
            octant = next_octant(octant, c1);
        }
        false
    }

    fn record(&mut self, id: NodeId, node: &OctreeNode<T>, t0: Vec3, coarse: bool) {
        let axis = if t0.x >= t0.y && t0.x >= t0.z {
            0
        } else if t0.y >= t0.z {
            1
        } else {
            2
        };
        // Mirrored rays enter through the positive face of the real cell
        let side = Side::from_axis(axis, self.mirror & (1 << axis) != 0);
        let distance = t0[axis].max(0.0);
        let hit = RayHit {
            distance,
            position: self.origin + self.direction * distance,
            normal: side.normal(),
            side,
            path: node.path().clone(),
            node: id,
            cell: self.tree.cell(),
            coarse,
        };
        tracing::trace!(path = %hit.path, distance, "ray hit");
        self.hits.push(hit);
    }
}

/// Octant (in mirrored space) the ray enters first
fn first_octant(t0: Vec3, tm: Vec3) -> usize {
    let mut octant = 0;
    if t0.x >= t0.y && t0.x >= t0.z {
        // Entered through the x plane
        if tm.y < t0.x {
            octant |= 2;
        }
        if tm.z < t0.x {
            octant |= 4;
        }
    } else if t0.y >= t0.z {
        if tm.x < t0.y {
            octant |= 1;
        }
        if tm.z < t0.y {
            octant |= 4;
        }
    } else {
        if tm.x < t0.z {
            octant |= 1;
        }
        if tm.y < t0.z {
            octant |= 2;
        }
    }
    octant
}

/// Parametric span of a child octant
fn child_span(octant: usize, t0: Vec3, tm: Vec3, t1: Vec3) -> (Vec3, Vec3) {
    let mut c0 = t0;
    let mut c1 = tm;
    for axis in 0..3 {
        if octant & (1 << axis) != 0 {
            c0[axis] = tm[axis];
            c1[axis] = t1[axis];
        }
    }
    (c0, c1)
}

/// Octant entered after leaving `octant` through its nearest exit plane,
/// 8 once the ray leaves the parent
fn next_octant(octant: usize, c1: Vec3) -> usize {
    let axis = if c1.x < c1.y && c1.x < c1.z {
        0
    } else if c1.y < c1.z {
        1
    } else {
        2
    };
    let bit = 1 << axis;
    if octant & bit != 0 {
        8
    } else {
        octant | bit
    }
}
