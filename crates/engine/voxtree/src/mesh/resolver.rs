//! Side classification for face emission
//!
//! A solid leaf shows a face on a side unless an item of its own mesh covers
//! that side entirely. When the neighbor cell is subdivided, its children
//! lying against the shared plane are walked and a sub-face is emitted for
//! every part they leave open.

use crate::core::{Aabb, Located, Neighbor, NodeId, Octree, Side};
use crate::error::Result;
use crate::mesh::face::Quad;
use crate::policy::MeshId;
use std::fmt;

/// How the neighbor cell on one side covers a leaf's face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideState {
    /// Nothing covers the face
    Empty,
    /// A subdivided neighbor with solids against the shared plane
    Partial,
    /// A solid leaf of the same mesh covers the whole face
    Full,
}

/// Access to the trees stitched next to a tree
pub trait SiblingTrees<T> {
    fn sibling(&self, side: Side) -> Option<&Octree<T>>;
}

/// Standalone tree: everything beyond the root bounds is empty
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSiblings;

impl<T> SiblingTrees<T> for NoSiblings {
    fn sibling(&self, _side: Side) -> Option<&Octree<T>> {
        None
    }
}

/// Classify a located cell as seen through its `facing` side
///
/// With `mesh` set only items of that mesh count as covering.
fn classify<T>(
    tree: &Octree<T>,
    located: Located,
    facing: Side,
    mesh: Option<MeshId>,
) -> (SideState, Option<NodeId>)
where
    T: Clone + PartialEq + fmt::Debug,
{
    match located {
        Located::Missing => (SideState::Empty, None),
        Located::Leaf(id) => match tree.mesh_of(id) {
            Some(found) if mesh.map_or(true, |m| m == found) => (SideState::Full, None),
            _ => (SideState::Empty, None),
        },
        Located::Branch(id) => {
            if tree.node_ref(id).side_solid_count(facing) > 0 {
                (SideState::Partial, Some(id))
            } else {
                (SideState::Empty, None)
            }
        }
    }
}

fn located_node<T>(tree: &Octree<T>, id: NodeId) -> Located
where
    T: Clone + PartialEq + fmt::Debug,
{
    if tree.node_ref(id).is_leaf() {
        Located::Leaf(id)
    } else {
        Located::Branch(id)
    }
}

/// Sub-faces of `side` left open by the subdivided neighbor `branch`
fn emit_partial<T>(
    tree: &Octree<T>,
    branch: NodeId,
    side: Side,
    mesh: MeshId,
    out: &mut Vec<(Side, Quad)>,
) where
    T: Clone + PartialEq + fmt::Debug,
{
    let facing = side.opposite();
    let node = tree.node_ref(branch);
    for coord in facing.children() {
        let bounds: Aabb = node.bounds().child(coord);
        let Some(child) = node.child_at(coord) else {
            out.push((side, Quad::covered_by(side, bounds)));
            continue;
        };
        match classify(tree, located_node(tree, child), facing, Some(mesh)) {
            (SideState::Empty, _) => out.push((side, Quad::covered_by(side, bounds))),
            (SideState::Full, _) => {}
            (SideState::Partial, Some(inner)) => emit_partial(tree, inner, side, mesh, out),
            (SideState::Partial, None) => unreachable!("partial always names its branch"),
        }
    }
}

impl<T> Octree<T>
where
    T: Clone + PartialEq + fmt::Debug,
{
    /// State of `side` of node `id`, treating space outside the root as empty
    ///
    /// For a solid leaf only same-mesh items cover it; for any other node
    /// every item does.
    pub fn side_state(&self, id: NodeId, side: Side) -> Result<SideState> {
        let node = self.try_node(id)?;
        let mesh = self.mesh_of(id);
        Ok(match node.path().neighbor(side) {
            Neighbor::Inside(path) => classify(self, self.locate(&path), side.opposite(), mesh).0,
            Neighbor::Outside { .. } => SideState::Empty,
        })
    }

    /// Faces a solid leaf of `mesh` currently shows
    pub(crate) fn visible_faces(
        &self,
        id: NodeId,
        mesh: MeshId,
        siblings: &dyn SiblingTrees<T>,
    ) -> Vec<(Side, Quad)> {
        let node = self.node_ref(id);
        let mut out = Vec::with_capacity(6);
        for side in Side::ALL {
            let target = match node.path().neighbor(side) {
                Neighbor::Inside(path) => Some((self, path)),
                Neighbor::Outside { side, path } => siblings.sibling(side).map(|t| (t, path)),
            };
            let Some((tree, path)) = target else {
                out.push((side, Quad::new(side, node.bounds())));
                continue;
            };
            match classify(tree, tree.locate(&path), side.opposite(), Some(mesh)) {
                (SideState::Empty, _) => out.push((side, Quad::new(side, node.bounds()))),
                (SideState::Full, _) => {}
                (SideState::Partial, Some(branch)) => {
                    emit_partial(tree, branch, side, mesh, &mut out)
                }
                (SideState::Partial, None) => unreachable!("partial always names its branch"),
            }
        }
        out
    }
}
