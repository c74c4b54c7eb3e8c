use crate::config::OctreeConfig;
use crate::core::coord::{ChildCoord, CoordPath, Neighbor};
use crate::core::node::{Aabb, NodeArena, NodeId, OctreeNode};
use crate::core::side::Side;
use crate::error::{OctreeError, Result};
use crate::mesh::buffer::FaceBuffer;
use crate::policy::{ItemPolicy, MeshId};
use glam::{IVec3, Vec3};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::Rc;

/// Where a path lands when walked down from the root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Located {
    /// An empty child slot was reached before the path ended
    Missing,
    /// A leaf at or above the path's depth
    Leaf(NodeId),
    /// The path ended at a subdivided node
    Branch(NodeId),
}

/// A deferred mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Edit<T> {
    Set(CoordPath, T),
    Remove(CoordPath),
}

/// A change next to the tree boundary that a sibling tree has to redraw
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundaryTouch {
    pub side: Side,
    pub path: CoordPath,
}

/// Sparse voxel octree with per-mesh face buffers
///
/// Nodes are owned by an arena; every mutation keeps the per-side solidity
/// sets of all ancestors current and queues the affected leaves for redraw.
/// Call [`Octree::process`] to turn queued work into published buffers.
pub struct Octree<T> {
    config: OctreeConfig,
    cell: IVec3,
    bounds: Aabb,
    pub(crate) nodes: NodeArena<T>,
    root: NodeId,
    pub(crate) policy: Rc<dyn ItemPolicy<T>>,
    pub(crate) buffers: BTreeMap<MeshId, FaceBuffer>,
    pub(crate) track_boundary: bool,
    pub(crate) boundary_touches: Vec<BoundaryTouch>,
}

impl<T> fmt::Debug for Octree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Octree")
            .field("cell", &self.cell)
            .field("bounds", &self.bounds)
            .field("nodes", &self.nodes.len())
            .field("meshes", &self.buffers.len())
            .finish_non_exhaustive()
    }
}

impl<T> Octree<T>
where
    T: Clone + PartialEq + fmt::Debug,
{
    /// Create a tree whose root covers `config`'s bounds
    pub fn new(config: OctreeConfig, policy: impl ItemPolicy<T> + 'static) -> Self {
        Self::with_policy(config, IVec3::ZERO, Rc::new(policy))
    }

    /// Create the tree occupying grid cell `cell` of a stitched world
    pub(crate) fn with_policy(
        config: OctreeConfig,
        cell: IVec3,
        policy: Rc<dyn ItemPolicy<T>>,
    ) -> Self {
        let base = config.bounds();
        let bounds = Aabb::new(base.min + cell.as_vec3() * base.size, base.size);
        let mut nodes = NodeArena::default();
        let root = nodes.insert(OctreeNode::new(bounds, CoordPath::root(), None));
        Self {
            config,
            cell,
            bounds,
            nodes,
            root,
            policy,
            buffers: BTreeMap::new(),
            track_boundary: false,
            boundary_touches: Vec::new(),
        }
    }

    /// Rebuild a tree from an enumeration of `(path, item)` pairs
    pub fn from_items<I>(
        config: OctreeConfig,
        policy: impl ItemPolicy<T> + 'static,
        items: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (CoordPath, T)>,
    {
        let mut tree = Self::new(config, policy);
        for (path, item) in items {
            tree.set_item(&path, item)?;
        }
        Ok(tree)
    }

    #[inline]
    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Grid cell of this tree in a stitched world (zero when standalone)
    #[inline]
    pub fn cell(&self) -> IVec3 {
        self.cell
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&OctreeNode<T>> {
        self.nodes.get(id)
    }

    /// Like [`Octree::node`], reporting removed nodes as an error
    pub fn try_node(&self, id: NodeId) -> Result<&OctreeNode<T>> {
        self.nodes.get(id).ok_or(OctreeError::StaleNode(id))
    }

    /// True once the node has been removed from the tree
    pub fn is_deleted(&self, id: NodeId) -> bool {
        !self.nodes.contains(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn policy(&self) -> &dyn ItemPolicy<T> {
        self.policy.as_ref()
    }

    /// Face buffers by mesh id
    pub fn buffers(&self) -> impl Iterator<Item = &FaceBuffer> + '_ {
        self.buffers.values()
    }

    pub fn buffer(&self, mesh: MeshId) -> Option<&FaceBuffer> {
        self.buffers.get(&mesh)
    }

    /// Live faces across all buffers
    pub fn face_count(&self) -> usize {
        self.buffers.values().map(FaceBuffer::live_faces).sum()
    }

    pub(crate) fn node_ref(&self, id: NodeId) -> &OctreeNode<T> {
        match self.nodes.get(id) {
            Some(node) => node,
            None => panic!("stale node {id:?} reached through a live link"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut OctreeNode<T> {
        match self.nodes.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node {id:?} reached through a live link"),
        }
    }

    fn check_depth(&self, depth: u32) -> Result<()> {
        if depth > self.config.max_depth {
            return Err(OctreeError::OutOfRangeDepth {
                requested: depth,
                max: self.config.max_depth,
            });
        }
        Ok(())
    }

    pub(crate) fn mesh_of(&self, id: NodeId) -> Option<MeshId> {
        self.node_ref(id).item().map(|item| self.policy.mesh_id(item))
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// Walk `path` from the root
    pub fn locate(&self, path: &CoordPath) -> Located {
        let mut current = self.root;
        for coord in path.iter() {
            let node = self.node_ref(current);
            if node.is_leaf() {
                return Located::Leaf(current);
            }
            match node.child_at(coord) {
                Some(child) => current = child,
                None => return Located::Missing,
            }
        }
        if self.node_ref(current).is_leaf() {
            Located::Leaf(current)
        } else {
            Located::Branch(current)
        }
    }

    /// Node at exactly `path`
    pub fn find(&self, path: &CoordPath) -> Option<NodeId> {
        let mut current = self.root;
        for coord in path.iter() {
            current = self.node_ref(current).child_at(coord)?;
        }
        Some(current)
    }

    /// Item covering the cell at `path`, possibly held by a shallower leaf
    pub fn item_at(&self, path: &CoordPath) -> Option<&T> {
        match self.locate(path) {
            Located::Leaf(id) => self.node_ref(id).item(),
            _ => None,
        }
    }

    /// Path of the `depth`-level cell containing `point`, descending by bounds
    pub fn path_at(&self, point: Vec3, depth: u32) -> Result<CoordPath> {
        self.check_depth(depth)?;
        if !self.bounds.contains(point) {
            return Err(OctreeError::PointOutOfBounds(point));
        }
        let mut bounds = self.bounds;
        let mut path = CoordPath::root();
        for _ in 0..depth {
            let coord = bounds.octant_of(point);
            bounds = bounds.child(coord);
            path = path.child(coord);
        }
        Ok(path)
    }

    // ------------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------------

    /// Create an empty child at `coord`
    ///
    /// A parent holding an item loses it first, since items only live on leaves.
    pub fn add_child(&mut self, parent: NodeId, coord: ChildCoord) -> Result<NodeId> {
        coord.validate()?;
        let node = self.try_node(parent)?;
        if node.child_at(coord).is_some() {
            return Err(OctreeError::DuplicateChild { parent, coord });
        }
        self.check_depth(node.depth() + 1)?;
        if node.has_item() {
            self.replace_item(parent, None);
        }
        Ok(self.insert_child(parent, coord))
    }

    /// Remove the child at `coord` together with its whole subtree
    ///
    /// Returns false if the slot was already empty.
    pub fn remove_child(&mut self, parent: NodeId, coord: ChildCoord) -> Result<bool> {
        coord.validate()?;
        if self.try_node(parent)?.child_at(coord).is_none() {
            return Ok(false);
        }
        self.detach_child(parent, coord);
        Ok(true)
    }

    fn insert_child(&mut self, parent: NodeId, coord: ChildCoord) -> NodeId {
        let (bounds, path) = {
            let p = self.node_ref(parent);
            (p.bounds.child(coord), p.path.child(coord))
        };
        let id = self
            .nodes
            .insert(OctreeNode::new(bounds, path, Some(parent)));
        let p = self.node_mut(parent);
        p.children[coord.index().as_usize()] = Some(id);
        p.child_count += 1;
        id
    }

    fn detach_child(&mut self, parent: NodeId, coord: ChildCoord) {
        let slot = coord.index().as_usize();
        let Some(child) = self.node_ref(parent).children[slot] else {
            return;
        };
        self.delete_subtree(child);
        let p = self.node_mut(parent);
        p.children[slot] = None;
        p.child_count -= 1;
    }

    /// Post-order teardown; each node stays linked while its own item is
    /// cleared so neighbor discovery still reaches it
    fn delete_subtree(&mut self, id: NodeId) {
        let children: Vec<ChildCoord> = self.node_ref(id).children().map(|(c, _)| c).collect();
        for coord in children {
            self.detach_child(id, coord);
        }
        if self.node_ref(id).has_item() {
            self.replace_item(id, None);
        }
        self.nodes.remove(id);
    }

    fn clear_children(&mut self, id: NodeId) {
        let children: Vec<ChildCoord> = self.node_ref(id).children().map(|(c, _)| c).collect();
        for coord in children {
            self.detach_child(id, coord);
        }
    }

    /// Split a solid leaf into eight children carrying its item
    fn subdivide(&mut self, id: NodeId) {
        let Some(item) = self.replace_item(id, None) else {
            return;
        };
        for coord in ChildCoord::ALL {
            let child = self.insert_child(id, coord);
            self.replace_item(child, Some(item.clone()));
        }
    }

    /// Walk to `path`, creating missing nodes and splitting solid leaves on the way
    fn descend_creating(&mut self, path: &CoordPath) -> NodeId {
        let mut current = self.root;
        for coord in path.iter() {
            if self.node_ref(current).has_item() {
                self.subdivide(current);
            }
            current = match self.node_ref(current).child_at(coord) {
                Some(child) => child,
                None => self.insert_child(current, coord),
            };
        }
        current
    }

    /// Drop empty leaves upward from `id`, never the root
    fn prune(&mut self, mut id: NodeId) {
        loop {
            let node = self.node_ref(id);
            let (Some(parent), Some(coord)) = (node.parent, node.path.last()) else {
                break;
            };
            if !node.is_leaf() || node.has_item() {
                break;
            }
            self.detach_child(parent, coord);
            id = parent;
        }
    }

    // ------------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------------

    /// Place `item` at `path`, creating nodes as needed
    ///
    /// A node that already has children loses them first. A shallower solid
    /// leaf on the way is split so the rest of its volume keeps its item.
    pub fn set_item(&mut self, path: &CoordPath, item: T) -> Result<NodeId> {
        self.check_depth(path.depth())?;
        let id = self.descend_creating(path);
        self.clear_children(id);
        self.replace_item(id, Some(item));
        Ok(id)
    }

    /// Clear the cell at `path`, returning the item it held
    ///
    /// Clearing a subdivided cell removes everything below it. Empty leaves
    /// left behind are pruned.
    pub fn remove_item(&mut self, path: &CoordPath) -> Result<Option<T>> {
        self.check_depth(path.depth())?;
        let target = match self.locate(path) {
            Located::Missing => return Ok(None),
            Located::Leaf(id) if self.node_ref(id).depth() < path.depth() => {
                if !self.node_ref(id).has_item() {
                    return Ok(None);
                }
                self.descend_creating(path)
            }
            Located::Leaf(id) | Located::Branch(id) => id,
        };
        self.clear_children(target);
        let old = self.replace_item(target, None);
        self.prune(target);
        Ok(old)
    }

    /// Place `item` in the `depth`-level cell containing `point`
    pub fn set_item_at(&mut self, point: Vec3, depth: u32, item: T) -> Result<NodeId> {
        let path = self.path_at(point, depth)?;
        self.set_item(&path, item)
    }

    /// Clear the `depth`-level cell containing `point`
    pub fn remove_item_at(&mut self, point: Vec3, depth: u32) -> Result<Option<T>> {
        let path = self.path_at(point, depth)?;
        self.remove_item(&path)
    }

    /// Apply queued edits in order, stopping at the first rejected one
    pub fn apply_edits<I>(&mut self, edits: I) -> Result<()>
    where
        I: IntoIterator<Item = Edit<T>>,
    {
        for edit in edits {
            match edit {
                Edit::Set(path, item) => {
                    self.set_item(&path, item)?;
                }
                Edit::Remove(path) => {
                    self.remove_item(&path)?;
                }
            }
        }
        Ok(())
    }

    /// Swap a leaf's item, keeping solidity, faces and queues consistent
    fn replace_item(&mut self, id: NodeId, item: Option<T>) -> Option<T> {
        debug_assert!(
            self.node_ref(id).is_leaf() || item.is_none(),
            "items only live on leaves"
        );
        if self.node_ref(id).item == item {
            return item;
        }

        let old_mesh = self.mesh_of(id);
        let old = std::mem::replace(&mut self.node_mut(id).item, item);
        let new_mesh = self.mesh_of(id);

        self.remove_faces(id);
        match (old.is_some(), new_mesh.is_some()) {
            (false, true) => self.update_solidity(id, true),
            (true, false) => self.update_solidity(id, false),
            _ => {}
        }

        if let Some(mesh) = new_mesh {
            self.buffer_mut(mesh).enqueue_draw(id);
        }
        if old_mesh.is_some() || new_mesh.is_some() {
            self.dirty_neighbors(id);
        }
        old
    }

    // ------------------------------------------------------------------------
    // Solidity aggregation
    // ------------------------------------------------------------------------

    /// Add or drop `leaf` in every ancestor's counters and in the side sets
    /// of the ancestor sides it lies against
    fn update_solidity(&mut self, leaf: NodeId, add: bool) {
        let mut touching = [true; 6];
        let mut child = leaf;
        loop {
            let node = self.node_ref(child);
            let (Some(parent), Some(coord)) = (node.parent, node.path.last()) else {
                break;
            };
            for side in Side::ALL {
                if !side.touches(coord) {
                    touching[side.index()] = false;
                }
            }

            let p = self.node_mut(parent);
            if add {
                p.solid_descendants += 1;
            } else {
                p.solid_descendants -= 1;
            }
            for side in Side::ALL {
                if touching[side.index()] {
                    let set = &mut p.side_solids[side.index()];
                    if add {
                        set.insert(leaf);
                    } else {
                        set.remove(&leaf);
                    }
                }
            }
            child = parent;
        }
    }

    // ------------------------------------------------------------------------
    // Dirty tracking
    // ------------------------------------------------------------------------

    pub(crate) fn buffer_mut(&mut self, mesh: MeshId) -> &mut FaceBuffer {
        let policy = &self.policy;
        self.buffers
            .entry(mesh)
            .or_insert_with(|| FaceBuffer::new(mesh, policy.material(mesh)))
    }

    /// Flag the node's faces removed in their buffer
    pub(crate) fn remove_faces(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        let faces = std::mem::take(&mut node.faces);
        let Some(mesh) = node.face_mesh.take() else {
            return;
        };
        if let Some(buffer) = self.buffers.get_mut(&mesh) {
            for face in faces {
                buffer.remove_face(face);
            }
        }
    }

    /// Queue the solid leaves facing `id` on each side
    fn dirty_neighbors(&mut self, id: NodeId) {
        let path = self.node_ref(id).path.clone();
        for side in Side::ALL {
            match path.neighbor(side) {
                Neighbor::Inside(neighbor) => self.touch(&neighbor, side.opposite()),
                Neighbor::Outside { side, path } if self.track_boundary => {
                    self.boundary_touches.push(BoundaryTouch { side, path });
                }
                Neighbor::Outside { .. } => {}
            }
        }
    }

    /// Queue the solid leaves at `path` lying against `facing`
    ///
    /// Leaves of every mesh are queued: a solid of any mesh turns a branch
    /// into a partial cover, so other meshes' faces split around it.
    pub(crate) fn touch(&mut self, path: &CoordPath, facing: Side) {
        for leaf in self.solids_facing(path, facing) {
            if let Some(mesh) = self.mesh_of(leaf) {
                self.buffer_mut(mesh).enqueue_draw(leaf);
            }
        }
    }

    /// Solid leaves covering `path` that lie against its `facing` side
    pub fn solids_facing(&self, path: &CoordPath, facing: Side) -> Vec<NodeId> {
        match self.locate(path) {
            Located::Missing => Vec::new(),
            Located::Leaf(id) => {
                if self.node_ref(id).is_solid() {
                    vec![id]
                } else {
                    Vec::new()
                }
            }
            Located::Branch(id) => self.node_ref(id).side_solids(facing).iter().copied().collect(),
        }
    }

    // ------------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------------

    /// `id` and everything below it, depth-first pre-order
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.try_node(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let node = self.node_ref(current);
            // Reverse so octant 0 is visited first
            stack.extend(node.children().map(|(_, c)| c).collect::<Vec<_>>().into_iter().rev());
        }
        Ok(out)
    }

    /// Every solid leaf, depth-first
    pub fn solid_leaves(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .unwrap_or_default()
            .into_iter()
            .filter(|&id| self.node_ref(id).is_solid())
            .collect()
    }

    /// `(path, item)` pairs, depth-first in octant order
    pub fn items_depth_first(&self) -> Vec<(CoordPath, T)> {
        self.solid_leaves()
            .into_iter()
            .filter_map(|id| {
                let node = self.node_ref(id);
                node.item().map(|item| (node.path.clone(), item.clone()))
            })
            .collect()
    }

    /// `(path, item)` pairs, shallowest first
    pub fn items_breadth_first(&self) -> Vec<(CoordPath, T)> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([self.root]);
        while let Some(id) = queue.pop_front() {
            let node = self.node_ref(id);
            if let Some(item) = node.item() {
                out.push((node.path.clone(), item.clone()));
            }
            queue.extend(node.children().map(|(_, c)| c));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DefaultPolicy;

    fn tree() -> Octree<u8> {
        let config = OctreeConfig {
            size: 8.0,
            max_depth: 4,
            ..Default::default()
        };
        Octree::new(config, DefaultPolicy)
    }

    fn p(s: &str) -> CoordPath {
        s.parse().unwrap()
    }

    /// Child-count and solidity bookkeeping must match a full recount
    fn check_invariants(tree: &Octree<u8>) {
        for id in tree.descendants(tree.root()).unwrap() {
            let node = tree.node(id).unwrap();
            assert_eq!(node.child_count(), node.children().count());
            assert!(!(node.has_item() && node.child_count() > 0));

            let below: Vec<NodeId> = tree
                .descendants(id)
                .unwrap()
                .into_iter()
                .skip(1)
                .filter(|&d| tree.node(d).unwrap().is_solid())
                .collect();
            assert_eq!(node.solid_descendants as usize, below.len());
            for side in Side::ALL {
                let expected = below
                    .iter()
                    .filter(|&&d| {
                        let path = tree.node(d).unwrap().path();
                        path.coords()[node.depth() as usize..]
                            .iter()
                            .all(|&c| side.touches(c))
                    })
                    .count();
                assert_eq!(node.side_solid_count(side), expected, "{side:?} at {}", node.path());
            }
        }
    }

    #[test]
    fn test_add_child_rejects_duplicates_and_invalid() {
        let mut tree = tree();
        let root = tree.root();
        let a = tree.add_child(root, ChildCoord::new(1, 0, 0)).unwrap();
        assert_eq!(tree.node(a).unwrap().path(), &p("b"));
        assert_eq!(
            tree.add_child(root, ChildCoord::new(1, 0, 0)),
            Err(OctreeError::DuplicateChild {
                parent: root,
                coord: ChildCoord::new(1, 0, 0)
            })
        );
        assert!(matches!(
            tree.add_child(root, ChildCoord::new(2, 0, 0)),
            Err(OctreeError::InvalidCoordinate { .. })
        ));
        assert_eq!(tree.node(root).unwrap().child_count(), 1);
    }

    #[test]
    fn test_depth_limit() {
        let mut tree = tree();
        assert_eq!(
            tree.set_item(&p("aaaaa"), 1),
            Err(OctreeError::OutOfRangeDepth {
                requested: 5,
                max: 4
            })
        );
        assert!(tree.set_item(&p("aaaa"), 1).is_ok());
    }

    #[test]
    fn test_set_item_creates_path() {
        let mut tree = tree();
        let id = tree.set_item(&p("hb"), 3).unwrap();
        let node = tree.node(id).unwrap();
        assert_eq!(node.depth(), 2);
        assert_eq!(node.item(), Some(&3));
        assert_eq!(node.bounds().min, Vec3::new(6.0, 4.0, 4.0));
        assert_eq!(node.bounds().size, 2.0);
        assert_eq!(tree.find(&p("hb")), Some(id));
        assert_eq!(tree.node_count(), 3);
        check_invariants(&tree);
    }

    #[test]
    fn test_set_item_on_branch_deletes_children() {
        let mut tree = tree();
        let child = tree.set_item(&p("aa"), 1).unwrap();
        let branch = tree.find(&p("a")).unwrap();
        tree.set_item(&p("a"), 2).unwrap();

        assert!(tree.is_deleted(child));
        assert_eq!(tree.try_node(child).err(), Some(OctreeError::StaleNode(child)));
        let node = tree.node(branch).unwrap();
        assert!(node.is_leaf());
        assert_eq!(node.item(), Some(&2));
        check_invariants(&tree);
    }

    #[test]
    fn test_setting_inside_solid_leaf_splits_it() {
        let mut tree = tree();
        tree.set_item(&p("a"), 1).unwrap();
        tree.set_item(&p("ah"), 2).unwrap();

        assert_eq!(tree.item_at(&p("ah")), Some(&2));
        for c in "abcdefg".chars() {
            let path = p(&format!("a{c}"));
            assert_eq!(tree.item_at(&path), Some(&1), "{path}");
        }
        assert_eq!(tree.item_at(&p("a")), None);
        check_invariants(&tree);
    }

    #[test]
    fn test_remove_item_prunes() {
        let mut tree = tree();
        tree.set_item(&p("abc"), 5).unwrap();
        assert_eq!(tree.node_count(), 4);

        assert_eq!(tree.remove_item(&p("abc")), Ok(Some(5)));
        assert_eq!(tree.node_count(), 1);
        assert!(tree.node(tree.root()).unwrap().is_leaf());
        assert_eq!(tree.remove_item(&p("abc")), Ok(None));
        check_invariants(&tree);
    }

    #[test]
    fn test_remove_inside_solid_leaf_keeps_rest() {
        let mut tree = tree();
        tree.set_item(&p("c"), 4).unwrap();
        assert_eq!(tree.remove_item(&p("cd")), Ok(Some(4)));

        assert_eq!(tree.item_at(&p("cd")), None);
        assert_eq!(tree.item_at(&p("ca")), Some(&4));
        assert_eq!(tree.solid_leaves().len(), 7);
        check_invariants(&tree);
    }

    #[test]
    fn test_remove_child_tears_down_subtree() {
        let mut tree = tree();
        tree.set_item(&p("ba"), 1).unwrap();
        tree.set_item(&p("bh"), 1).unwrap();
        let deep = tree.set_item(&p("bha"), 2).unwrap();
        let root = tree.root();

        assert_eq!(tree.remove_child(root, ChildCoord::new(1, 0, 0)), Ok(true));
        assert_eq!(tree.remove_child(root, ChildCoord::new(1, 0, 0)), Ok(false));
        assert!(tree.is_deleted(deep));
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.node(root).unwrap().solid_descendants, 0);
        check_invariants(&tree);
    }

    #[test]
    fn test_add_child_to_solid_leaf_clears_item() {
        let mut tree = tree();
        let id = tree.set_item(&p("a"), 1).unwrap();
        tree.add_child(id, ChildCoord::new(0, 0, 0)).unwrap();
        let node = tree.node(id).unwrap();
        assert!(!node.has_item());
        assert_eq!(node.child_count(), 1);
        check_invariants(&tree);
    }

    #[test]
    fn test_side_sets_track_touching_leaves() {
        let mut tree = tree();
        // "b" is x=1 of the root; "bb" is x=1 of "b": both on the root's right side
        let right = tree.set_item(&p("bb"), 1).unwrap();
        // "ba" is x=0 inside "b": not on the root's right side
        let inner = tree.set_item(&p("ba"), 1).unwrap();

        let root = tree.node(tree.root()).unwrap();
        assert!(root.side_solids(Side::Right).contains(&right));
        assert!(!root.side_solids(Side::Right).contains(&inner));
        assert!(root.side_solids(Side::Below).contains(&inner));
        assert_eq!(root.solid_descendants, 2);

        let b = tree.node(tree.find(&p("b")).unwrap()).unwrap();
        assert!(b.side_solids(Side::Left).contains(&inner));
        check_invariants(&tree);

        tree.remove_item(&p("bb")).unwrap();
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.side_solid_count(Side::Right), 0);
        check_invariants(&tree);
    }

    #[test]
    fn test_set_item_at_descends_by_bounds() {
        let mut tree = tree();
        let id = tree.set_item_at(Vec3::new(7.5, 0.5, 0.5), 2, 9).unwrap();
        assert_eq!(tree.node(id).unwrap().path(), &p("bb"));
        assert_eq!(
            tree.set_item_at(Vec3::new(9.0, 0.0, 0.0), 1, 1),
            Err(OctreeError::PointOutOfBounds(Vec3::new(9.0, 0.0, 0.0)))
        );
        assert_eq!(tree.remove_item_at(Vec3::new(7.0, 1.0, 1.0), 2), Ok(Some(9)));
    }

    #[test]
    fn test_enumeration_orders() {
        let mut tree = tree();
        tree.set_item(&p("ha"), 1).unwrap();
        tree.set_item(&p("b"), 2).unwrap();
        tree.set_item(&p("aab"), 3).unwrap();

        let depth_first: Vec<String> = tree
            .items_depth_first()
            .iter()
            .map(|(path, _)| path.to_string())
            .collect();
        assert_eq!(depth_first, ["aab", "b", "ha"]);

        let breadth_first: Vec<String> = tree
            .items_breadth_first()
            .iter()
            .map(|(path, _)| path.to_string())
            .collect();
        assert_eq!(breadth_first, ["b", "ha", "aab"]);
    }

    #[test]
    fn test_from_items_round_trip() {
        let mut tree = tree();
        tree.set_item(&p("ha"), 1).unwrap();
        tree.set_item(&p("c"), 2).unwrap();
        tree.set_item(&p("abcd"), 3).unwrap();

        for items in [tree.items_depth_first(), tree.items_breadth_first()] {
            let rebuilt = Octree::from_items(tree.config().clone(), DefaultPolicy, items).unwrap();
            assert_eq!(rebuilt.items_depth_first(), tree.items_depth_first());
            check_invariants(&rebuilt);
        }
    }

    #[test]
    fn test_apply_edits() {
        let mut tree = tree();
        tree.apply_edits([
            Edit::Set(p("a"), 1),
            Edit::Set(p("b"), 2),
            Edit::Remove(p("a")),
        ])
        .unwrap();
        assert_eq!(tree.items_depth_first(), vec![(p("b"), 2)]);
    }
}
