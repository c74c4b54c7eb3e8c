//! Stitched grid of equally sized trees
//!
//! Each tree owns one grid cell. Face resolution crosses into the adjacent
//! tree when a neighbor path leaves the root, and edits next to a boundary
//! queue the facing leaves of the adjacent tree for redraw.

use crate::config::OctreeConfig;
use crate::core::{CoordPath, NodeId, Octree, Side};
use crate::error::{OctreeError, Result};
use crate::mesh::{MeshSink, ProcessStats, SiblingTrees};
use crate::policy::ItemPolicy;
use crate::raycast::{Ray, RayHit, RayQuery};
use glam::{IVec3, Vec3};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

pub struct World<T> {
    config: OctreeConfig,
    policy: Rc<dyn ItemPolicy<T>>,
    trees: HashMap<IVec3, Octree<T>>,
}

impl<T> fmt::Debug for World<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("trees", &self.trees.len())
            .finish_non_exhaustive()
    }
}

/// Neighbors of one tree while it is taken out of the world
struct Stitched<'a, T> {
    trees: &'a HashMap<IVec3, Octree<T>>,
    cell: IVec3,
}

impl<T> SiblingTrees<T> for Stitched<'_, T> {
    fn sibling(&self, side: Side) -> Option<&Octree<T>> {
        self.trees.get(&(self.cell + side.offset()))
    }
}

impl<T> World<T>
where
    T: Clone + PartialEq + fmt::Debug,
{
    pub fn new(config: OctreeConfig, policy: impl ItemPolicy<T> + 'static) -> Self {
        Self {
            config,
            policy: Rc::new(policy),
            trees: HashMap::new(),
        }
    }

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    /// Tree at `cell`, created empty if absent
    pub fn insert_tree(&mut self, cell: IVec3) -> &mut Octree<T> {
        let config = &self.config;
        let policy = &self.policy;
        self.trees.entry(cell).or_insert_with(|| {
            tracing::debug!(?cell, "adding tree");
            let mut tree = Octree::with_policy(config.clone(), cell, Rc::clone(policy));
            tree.track_boundary = true;
            tree
        })
    }

    /// Drop the tree at `cell`, queueing the leaves that faced it
    pub fn remove_tree(&mut self, cell: IVec3) -> Option<Octree<T>> {
        let tree = self.trees.remove(&cell)?;
        for side in Side::ALL {
            let Some(sibling) = self.trees.get_mut(&(cell + side.offset())) else {
                continue;
            };
            // The sibling's leaves on its side facing the removed tree
            sibling.touch(&CoordPath::root(), side.opposite());
        }
        Some(tree)
    }

    pub fn tree(&self, cell: IVec3) -> Option<&Octree<T>> {
        self.trees.get(&cell)
    }

    pub fn tree_mut(&mut self, cell: IVec3) -> Option<&mut Octree<T>> {
        self.trees.get_mut(&cell)
    }

    /// Occupied cells in a stable order
    pub fn cells(&self) -> Vec<IVec3> {
        let mut cells: Vec<IVec3> = self.trees.keys().copied().collect();
        cells.sort_by_key(|c| (c.z, c.y, c.x));
        cells
    }

    /// Grid cell whose tree bounds contain `point`
    pub fn cell_at(&self, point: Vec3) -> IVec3 {
        ((point - self.config.min) / self.config.size)
            .floor()
            .as_ivec3()
    }

    pub fn set_item(&mut self, cell: IVec3, path: &CoordPath, item: T) -> Result<NodeId> {
        let tree = self
            .trees
            .get_mut(&cell)
            .ok_or(OctreeError::NoSuchTree(cell))?;
        let id = tree.set_item(path, item)?;
        self.propagate(cell);
        Ok(id)
    }

    pub fn remove_item(&mut self, cell: IVec3, path: &CoordPath) -> Result<Option<T>> {
        let tree = self
            .trees
            .get_mut(&cell)
            .ok_or(OctreeError::NoSuchTree(cell))?;
        let old = tree.remove_item(path)?;
        self.propagate(cell);
        Ok(old)
    }

    /// Place `item` in the `depth`-level cell containing the world point
    pub fn set_item_at(&mut self, point: Vec3, depth: u32, item: T) -> Result<NodeId> {
        let cell = self.cell_at(point);
        let path = self
            .trees
            .get(&cell)
            .ok_or(OctreeError::NoSuchTree(cell))?
            .path_at(point, depth)?;
        self.set_item(cell, &path, item)
    }

    pub fn item_at(&self, cell: IVec3, path: &CoordPath) -> Option<&T> {
        self.trees.get(&cell)?.item_at(path)
    }

    /// Hand boundary changes of the tree at `cell` to its neighbors
    fn propagate(&mut self, cell: IVec3) {
        let Some(tree) = self.trees.get_mut(&cell) else {
            return;
        };
        let touches = std::mem::take(&mut tree.boundary_touches);
        for touch in touches {
            let neighbor = cell + touch.side.offset();
            if let Some(sibling) = self.trees.get_mut(&neighbor) {
                tracing::trace!(?neighbor, path = %touch.path, "boundary touch");
                sibling.touch(&touch.path, touch.side.opposite());
            }
        }
    }

    /// Process every tree, resolving faces across tree boundaries
    pub fn process(&mut self, sink: &mut dyn MeshSink) -> ProcessStats {
        let mut stats = ProcessStats::default();
        let cells = self.cells();
        // Edits made through `tree_mut` have not been handed over yet
        for &cell in &cells {
            self.propagate(cell);
        }
        for cell in cells {
            let Some(mut tree) = self.trees.remove(&cell) else {
                continue;
            };
            let siblings = Stitched {
                trees: &self.trees,
                cell,
            };
            stats += tree.process_with(&siblings, sink);
            self.trees.insert(cell, tree);
        }
        stats
    }

    /// Hits across all trees, nearest first
    pub fn intersect(&self, ray: &Ray, query: RayQuery) -> Result<Vec<RayHit>> {
        let mut hits = Vec::new();
        for tree in self.trees.values() {
            hits.extend(tree.intersect(ray, query)?);
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        if query.stop_at_first {
            hits.truncate(1);
        }
        Ok(hits)
    }

    pub fn face_count(&self) -> usize {
        self.trees.values().map(Octree::face_count).sum()
    }
}
