use crate::core::coord::{ChildCoord, ChildIndex, CoordPath};
use crate::core::side::Side;
use crate::mesh::buffer::FaceId;
use crate::policy::MeshId;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Handle to a node in an octree's arena
///
/// Handles carry the generation of their slot, so a handle to a removed node
/// never aliases whatever node later reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Axis-aligned cubic bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Edge length
    pub size: f32,
}

impl Aabb {
    pub fn new(min: Vec3, size: f32) -> Self {
        Self { min, size }
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.min + Vec3::splat(self.size)
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        self.min + Vec3::splat(self.size * 0.5)
    }

    /// Half-open containment test (`min <= p < max`)
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmplt(self.max()).all()
    }

    /// Bounds of an octant
    pub fn child(&self, coord: ChildCoord) -> Aabb {
        let half = self.size * 0.5;
        Aabb {
            min: self.min + coord.as_ivec3().as_vec3() * half,
            size: half,
        }
    }

    /// Octant containing `point` (points on the midplane go to the upper octant)
    pub fn octant_of(&self, point: Vec3) -> ChildCoord {
        let c = self.center();
        ChildCoord::new(
            i32::from(point.x >= c.x),
            i32::from(point.y >= c.y),
            i32::from(point.z >= c.z),
        )
    }

    /// Bounds of the same-size cell on `side`
    pub fn shifted(&self, side: Side) -> Aabb {
        Aabb {
            min: self.min + side.normal() * self.size,
            size: self.size,
        }
    }
}

/// A node of the octree
///
/// Nodes live in the owning tree's arena: the parent owns its children through
/// the child slots, and the parent link is a plain non-owning handle used only
/// for upward notification.
#[derive(Debug, Clone)]
pub struct OctreeNode<T> {
    pub(crate) bounds: Aabb,
    pub(crate) path: CoordPath,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: [Option<NodeId>; 8],
    pub(crate) child_count: u8,
    pub(crate) item: Option<T>,
    /// Solid descendant leaves lying against each side of this cell
    pub(crate) side_solids: [HashSet<NodeId>; 6],
    /// Solid leaves anywhere below this node
    pub(crate) solid_descendants: u32,
    pub(crate) faces: Vec<FaceId>,
    pub(crate) face_mesh: Option<MeshId>,
}

impl<T> OctreeNode<T> {
    pub(crate) fn new(bounds: Aabb, path: CoordPath, parent: Option<NodeId>) -> Self {
        Self {
            bounds,
            path,
            parent,
            children: [None; 8],
            child_count: 0,
            item: None,
            side_solids: Default::default(),
            solid_descendants: 0,
            faces: Vec::new(),
            face_mesh: None,
        }
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    #[inline]
    pub fn path(&self) -> &CoordPath {
        &self.path
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.path.depth()
    }

    /// Octant within the parent, `None` for the root
    pub fn index_in_parent(&self) -> Option<ChildIndex> {
        self.path.last().map(ChildCoord::index)
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child at an octant
    ///
    /// Panics if `index` is `ChildIndex::INVALID`.
    #[inline]
    pub fn child(&self, index: ChildIndex) -> Option<NodeId> {
        self.children[index.as_usize()]
    }

    pub fn child_at(&self, coord: ChildCoord) -> Option<NodeId> {
        self.child(coord.index())
    }

    /// Occupied child slots with their octant
    pub fn children(&self) -> impl Iterator<Item = (ChildCoord, NodeId)> + '_ {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|id| (ChildCoord::ALL[i], id)))
    }

    #[inline]
    pub fn child_count(&self) -> usize {
        self.child_count as usize
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.child_count == 0
    }

    #[inline]
    pub fn item(&self) -> Option<&T> {
        self.item.as_ref()
    }

    #[inline]
    pub fn has_item(&self) -> bool {
        self.item.is_some()
    }

    /// Solid means a leaf holding an item
    #[inline]
    pub fn is_solid(&self) -> bool {
        self.is_leaf() && self.has_item()
    }

    /// Solid descendant leaves touching `side` of this cell
    pub fn side_solids(&self, side: Side) -> &HashSet<NodeId> {
        &self.side_solids[side.index()]
    }

    pub fn side_solid_count(&self, side: Side) -> usize {
        self.side_solids[side.index()].len()
    }

    #[inline]
    pub fn has_solid_descendant(&self) -> bool {
        self.solid_descendants > 0
    }

    /// Faces currently emitted for this node
    pub fn faces(&self) -> &[FaceId] {
        &self.faces
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    node: Option<OctreeNode<T>>,
}

/// Slot arena owning every node of one tree
#[derive(Debug, Clone)]
pub(crate) struct NodeArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> NodeArena<T> {
    pub fn insert(&mut self, node: OctreeNode<T>) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Vacate a slot; later handles to it observe the node as deleted
    pub fn remove(&mut self, id: NodeId) -> Option<OctreeNode<T>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(node)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&OctreeNode<T>> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut OctreeNode<T>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.node.as_mut())
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_child_and_octant() {
        let bounds = Aabb::new(Vec3::ZERO, 8.0);
        let child = bounds.child(ChildCoord::new(1, 0, 1));
        assert_eq!(child.min, Vec3::new(4.0, 0.0, 4.0));
        assert_eq!(child.size, 4.0);
        assert_eq!(bounds.octant_of(Vec3::new(5.0, 1.0, 7.0)), ChildCoord::new(1, 0, 1));
        assert!(bounds.contains(Vec3::new(0.0, 7.9, 3.0)));
        assert!(!bounds.contains(Vec3::new(8.0, 0.0, 0.0)));
    }

    #[test]
    fn test_arena_generation_detects_stale_handles() {
        let mut arena = NodeArena::<u8>::default();
        let bounds = Aabb::new(Vec3::ZERO, 1.0);
        let a = arena.insert(OctreeNode::new(bounds, CoordPath::root(), None));
        assert!(arena.remove(a).is_some());
        assert!(!arena.contains(a));

        let b = arena.insert(OctreeNode::new(bounds, CoordPath::root(), None));
        assert_eq!(a.index, b.index);
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_some());
        assert!(arena.remove(a).is_none());
        assert_eq!(arena.len(), 1);
    }
}
