//! Per-mesh face storage with deferred, batched removal
//!
//! Faces are appended to the tail of flat vertex/normal/uv arrays. Removing a
//! face only flags it and queues it; `compact` later fills each hole with the
//! last surviving face so the arrays stay contiguous. Order among surviving
//! faces is not preserved.

use crate::core::{NodeId, Side};
use crate::mesh::face::Quad;
use crate::policy::{MaterialId, MeshId};
use glam::{Vec2, Vec3};

/// Stable handle to a face within one buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(u32);

/// Face record: owning node plus its slot in the flat arrays
#[derive(Debug, Clone)]
pub struct Face {
    node: NodeId,
    side: Side,
    position: usize,
    removed: bool,
}

impl Face {
    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Index in the all-faces list
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// First of this face's four vertices in the flat arrays
    #[inline]
    pub fn vertex_offset(&self) -> usize {
        self.position * 4
    }

    #[inline]
    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

#[derive(Debug, Clone)]
pub struct FaceBuffer {
    mesh_id: MeshId,
    material: MaterialId,
    faces: Vec<Option<Face>>,
    free: Vec<u32>,
    all_faces: Vec<FaceId>,
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    draw_queue: Vec<NodeId>,
    removal_queue: Vec<FaceId>,
    live: usize,
}

impl FaceBuffer {
    pub fn new(mesh_id: MeshId, material: MaterialId) -> Self {
        Self {
            mesh_id,
            material,
            faces: Vec::new(),
            free: Vec::new(),
            all_faces: Vec::new(),
            vertices: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            draw_queue: Vec::new(),
            removal_queue: Vec::new(),
            live: 0,
        }
    }

    #[inline]
    pub fn mesh_id(&self) -> MeshId {
        self.mesh_id
    }

    #[inline]
    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Pre-reserve room for `additional` faces
    pub fn reserve(&mut self, additional: usize) {
        self.all_faces.reserve(additional);
        self.vertices.reserve(additional * 4);
        self.normals.reserve(additional * 4);
        self.uvs.reserve(additional * 4);
    }

    /// Append a face at the tail of the arrays
    pub fn add_face(&mut self, node: NodeId, side: Side, quad: &Quad) -> FaceId {
        let position = self.all_faces.len();
        let face = Face {
            node,
            side,
            position,
            removed: false,
        };
        let id = match self.free.pop() {
            Some(index) => {
                self.faces[index as usize] = Some(face);
                FaceId(index)
            }
            None => {
                self.faces.push(Some(face));
                FaceId(self.faces.len() as u32 - 1)
            }
        };

        self.all_faces.push(id);
        self.vertices.extend_from_slice(&quad.vertices);
        self.normals.extend_from_slice(&[quad.normal; 4]);
        self.uvs.extend_from_slice(&quad.uvs);
        self.live += 1;
        id
    }

    /// Flag a face removed and queue it for the next compaction
    ///
    /// Returns false if the face is unknown or already removed.
    pub fn remove_face(&mut self, id: FaceId) -> bool {
        let Some(Some(face)) = self.faces.get_mut(id.0 as usize) else {
            return false;
        };
        if face.removed {
            return false;
        }
        face.removed = true;
        self.live -= 1;
        self.removal_queue.push(id);
        true
    }

    /// Drop every queued face, filling holes from the tail
    ///
    /// Sorts the removal queue by position, then for each hole in ascending
    /// order moves the last surviving face into it. Costs O(k log k) for k
    /// removed faces. Returns the number of faces dropped.
    pub fn compact(&mut self) -> usize {
        if self.removal_queue.is_empty() {
            return 0;
        }
        let mut queue = std::mem::take(&mut self.removal_queue);
        queue.sort_unstable_by_key(|&id| self.face_ref(id).position);

        let mut end = self.all_faces.len();
        for &removed in &queue {
            let hole = self.face_ref(removed).position;
            while end > 0 && self.face_ref(self.all_faces[end - 1]).removed {
                end -= 1;
            }
            if hole >= end {
                break;
            }
            end -= 1;
            self.move_face(end, hole);
        }

        self.all_faces.truncate(end);
        self.vertices.truncate(end * 4);
        self.normals.truncate(end * 4);
        self.uvs.truncate(end * 4);

        let dropped = queue.len();
        for id in queue {
            self.faces[id.0 as usize] = None;
            self.free.push(id.0);
        }
        debug_assert_eq!(self.all_faces.len(), self.live);
        dropped
    }

    fn move_face(&mut self, from: usize, to: usize) {
        let id = self.all_faces[from];
        self.all_faces[to] = id;
        let (src, dst) = (from * 4, to * 4);
        self.vertices.copy_within(src..src + 4, dst);
        self.normals.copy_within(src..src + 4, dst);
        self.uvs.copy_within(src..src + 4, dst);
        if let Some(face) = self.faces[id.0 as usize].as_mut() {
            face.position = to;
        }
    }

    fn face_ref(&self, id: FaceId) -> &Face {
        self.faces[id.0 as usize]
            .as_ref()
            .expect("queued face must stay allocated until compaction")
    }

    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Faces in array order, including removed but not yet compacted ones
    pub fn all_faces(&self) -> impl Iterator<Item = &Face> + '_ {
        self.all_faces.iter().map(|&id| self.face_ref(id))
    }

    /// Faces not flagged removed
    #[inline]
    pub fn live_faces(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    #[inline]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    #[inline]
    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    /// Triangle indices for every live face, derived from current slots
    pub fn indices(&self) -> Vec<u32> {
        let mut indices = Vec::with_capacity(self.live * 6);
        for face in self.all_faces().filter(|f| !f.removed) {
            let base = face.vertex_offset() as u32;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        indices
    }

    pub fn enqueue_draw(&mut self, node: NodeId) {
        self.draw_queue.push(node);
    }

    pub(crate) fn take_draw_queue(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.draw_queue)
    }

    pub fn pending_draws(&self) -> usize {
        self.draw_queue.len()
    }

    pub fn pending_removals(&self) -> usize {
        self.removal_queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Aabb, CoordPath, NodeArena, OctreeNode};

    fn node_ids(n: usize) -> Vec<NodeId> {
        let mut arena = NodeArena::<u8>::default();
        (0..n)
            .map(|_| {
                arena.insert(OctreeNode::new(
                    Aabb::new(Vec3::ZERO, 1.0),
                    CoordPath::root(),
                    None,
                ))
            })
            .collect()
    }

    fn quad_at(i: usize) -> Quad {
        Quad::new(Side::Above, Aabb::new(Vec3::new(i as f32, 0.0, 0.0), 1.0))
    }

    fn assert_compact(buffer: &FaceBuffer) {
        assert_eq!(buffer.vertices().len(), 4 * buffer.all_faces.len());
        assert_eq!(buffer.normals().len(), buffer.vertices().len());
        assert_eq!(buffer.uvs().len(), buffer.vertices().len());
        assert!(buffer.all_faces().all(|f| !f.is_removed()));
        assert_eq!(buffer.indices().len(), 6 * buffer.live_faces());
        for (i, face) in buffer.all_faces().enumerate() {
            assert_eq!(face.position(), i);
        }
    }

    #[test]
    fn test_add_faces_appends() {
        let nodes = node_ids(3);
        let mut buffer = FaceBuffer::new(MeshId(1), MaterialId(1));
        buffer.reserve(3);
        for (i, &node) in nodes.iter().enumerate() {
            let id = buffer.add_face(node, Side::Above, &quad_at(i));
            assert_eq!(buffer.face(id).unwrap().vertex_offset(), i * 4);
        }
        assert_eq!(buffer.live_faces(), 3);
        assert_eq!(buffer.indices()[6..12], [4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn test_remove_is_deferred_until_compact() {
        let nodes = node_ids(1);
        let mut buffer = FaceBuffer::new(MeshId(1), MaterialId(1));
        let a = buffer.add_face(nodes[0], Side::Above, &quad_at(0));
        let b = buffer.add_face(nodes[0], Side::Below, &quad_at(1));

        assert!(buffer.remove_face(a));
        assert!(!buffer.remove_face(a));
        assert_eq!(buffer.vertices().len(), 8);
        assert_eq!(buffer.indices().len(), 6);
        assert_eq!(buffer.pending_removals(), 1);

        assert_eq!(buffer.compact(), 1);
        assert_compact(&buffer);
        assert_eq!(buffer.face(b).unwrap().position(), 0);
        assert_eq!(buffer.vertices()[0], quad_at(1).vertices[0]);
        assert!(buffer.face(a).is_none());
    }

    #[test]
    fn test_compact_moves_tail_into_holes() {
        let nodes = node_ids(1);
        let mut buffer = FaceBuffer::new(MeshId(1), MaterialId(1));
        let ids: Vec<_> = (0..6)
            .map(|i| buffer.add_face(nodes[0], Side::Above, &quad_at(i)))
            .collect();

        // Remove 1 and 3 plus the tail face 5
        for i in [3, 1, 5] {
            buffer.remove_face(ids[i]);
        }
        buffer.compact();
        assert_compact(&buffer);
        assert_eq!(buffer.live_faces(), 3);

        // Survivors keep their own geometry wherever they landed
        for i in [0, 2, 4] {
            let face = buffer.face(ids[i]).unwrap();
            assert_eq!(buffer.vertices()[face.vertex_offset()], quad_at(i).vertices[0]);
        }
    }

    #[test]
    fn test_remove_strict_subset() {
        let nodes = node_ids(1);
        let mut buffer = FaceBuffer::new(MeshId(2), MaterialId(2));
        let ids: Vec<_> = (0..50)
            .map(|i| buffer.add_face(nodes[0], Side::Left, &quad_at(i)))
            .collect();
        let removed: Vec<_> = ids.iter().copied().filter(|id| id.0 % 3 == 0).collect();
        for &id in &removed {
            buffer.remove_face(id);
        }
        buffer.compact();

        assert_compact(&buffer);
        assert_eq!(buffer.live_faces(), 50 - removed.len());
        for face in buffer.all_faces() {
            assert!(face.vertex_offset() + 4 <= buffer.vertices().len());
        }
    }

    #[test]
    fn test_remove_everything() {
        let nodes = node_ids(1);
        let mut buffer = FaceBuffer::new(MeshId(0), MaterialId(0));
        let ids: Vec<_> = (0..4)
            .map(|i| buffer.add_face(nodes[0], Side::Back, &quad_at(i)))
            .collect();
        for id in ids {
            buffer.remove_face(id);
        }
        assert_eq!(buffer.compact(), 4);
        assert!(buffer.is_empty());
        assert!(buffer.vertices().is_empty());

        // Freed ids are reused
        let again = buffer.add_face(nodes[0], Side::Back, &quad_at(0));
        assert_eq!(buffer.face(again).unwrap().position(), 0);
        assert_compact(&buffer);
    }
}
