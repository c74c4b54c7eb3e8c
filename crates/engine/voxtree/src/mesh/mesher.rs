use crate::core::{NodeId, Octree};
use crate::mesh::resolver::{NoSiblings, SiblingTrees};
use crate::mesh::sink::{MeshSink, MeshUpdate};
use crate::policy::MeshId;
use std::collections::HashSet;
use std::fmt;

/// Work done by one [`Octree::process`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStats {
    pub nodes_drawn: usize,
    pub faces_added: usize,
    pub faces_compacted: usize,
    pub meshes_published: usize,
}

impl std::ops::AddAssign for ProcessStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_drawn += rhs.nodes_drawn;
        self.faces_added += rhs.faces_added;
        self.faces_compacted += rhs.faces_compacted;
        self.meshes_published += rhs.meshes_published;
    }
}

impl<T> Octree<T>
where
    T: Clone + PartialEq + fmt::Debug,
{
    /// Drain every buffer's draw and removal queues and publish the buffers
    /// that changed
    pub fn process(&mut self, sink: &mut dyn MeshSink) -> ProcessStats {
        self.process_with(&NoSiblings, sink)
    }

    pub(crate) fn process_with(
        &mut self,
        siblings: &dyn SiblingTrees<T>,
        sink: &mut dyn MeshSink,
    ) -> ProcessStats {
        let mut stats = ProcessStats::default();
        let meshes: Vec<MeshId> = self.buffers.keys().copied().collect();

        for mesh in meshes {
            let Some(buffer) = self.buffers.get_mut(&mesh) else {
                continue;
            };
            let queue = buffer.take_draw_queue();
            if queue.is_empty() && buffer.pending_removals() == 0 {
                continue;
            }

            let mut seen = HashSet::with_capacity(queue.len());
            for id in queue {
                if seen.insert(id) {
                    self.redraw(id, mesh, siblings, &mut stats);
                }
            }

            let cell = self.cell();
            let Some(buffer) = self.buffers.get_mut(&mesh) else {
                continue;
            };
            let compacted = buffer.compact();
            stats.faces_compacted += compacted;

            let indices = buffer.indices();
            sink.publish(MeshUpdate {
                cell,
                mesh_id: mesh,
                material: buffer.material(),
                vertices: buffer.vertices(),
                normals: buffer.normals(),
                uvs: buffer.uvs(),
                indices: &indices,
            });
            stats.meshes_published += 1;

            tracing::debug!(
                ?cell,
                mesh = mesh.0,
                nodes = seen.len(),
                compacted,
                live = buffer.live_faces(),
                "published face buffer"
            );
        }
        stats
    }

    /// Replace the faces of one queued node
    fn redraw(
        &mut self,
        id: NodeId,
        mesh: MeshId,
        siblings: &dyn SiblingTrees<T>,
        stats: &mut ProcessStats,
    ) {
        let Some(node) = self.node(id) else {
            tracing::debug!(?id, "skipping draw of removed node");
            return;
        };
        // Queued before the item moved to another mesh; that change already
        // dropped the old faces
        if !node.is_solid() || self.mesh_of(id) != Some(mesh) {
            return;
        }
        self.remove_faces(id);

        let faces = self.visible_faces(id, mesh, siblings);
        tracing::trace!(?id, faces = faces.len(), "drawing node");

        let buffer = self.buffer_mut(mesh);
        buffer.reserve(faces.len());
        let ids: Vec<_> = faces
            .iter()
            .map(|(side, quad)| buffer.add_face(id, *side, quad))
            .collect();
        stats.nodes_drawn += 1;
        stats.faces_added += ids.len();

        if let Some(node) = self.nodes.get_mut(id) {
            node.faces = ids;
            node.face_mesh = Some(mesh);
        }
    }
}
