use crate::policy::{MaterialId, MeshId};
use glam::{IVec3, Vec2, Vec3};
use std::collections::HashMap;

/// A published view of one compacted face buffer
///
/// Slices borrow the buffer and are only valid for the duration of
/// [`MeshSink::publish`].
#[derive(Debug, Clone, Copy)]
pub struct MeshUpdate<'a> {
    /// Grid cell of the publishing tree
    pub cell: IVec3,
    pub mesh_id: MeshId,
    pub material: MaterialId,
    pub vertices: &'a [Vec3],
    pub normals: &'a [Vec3],
    pub uvs: &'a [Vec2],
    /// Two triangles per live face
    pub indices: &'a [u32],
}

/// Consumer of mesh updates, typically a renderer upload
pub trait MeshSink {
    fn publish(&mut self, update: MeshUpdate<'_>);
}

impl<F> MeshSink for F
where
    F: FnMut(MeshUpdate<'_>),
{
    fn publish(&mut self, update: MeshUpdate<'_>) {
        self(update)
    }
}

/// Owned geometry of one renderable chunk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubMesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl SubMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Latest state of one buffer as seen by a [`CollectingSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMesh {
    pub material: MaterialId,
    pub submeshes: Vec<SubMesh>,
    /// Times this buffer has been published
    pub revision: u32,
}

impl PublishedMesh {
    pub fn face_count(&self) -> usize {
        self.submeshes.iter().map(|m| m.indices.len() / 6).sum()
    }
}

/// Sink that keeps the latest geometry per buffer, split into chunks
///
/// Chunks never exceed `max_vertices` and never split a face, so large
/// buffers stay within renderer index limits.
#[derive(Debug, Clone)]
pub struct CollectingSink {
    max_vertices: usize,
    meshes: HashMap<(IVec3, MeshId), PublishedMesh>,
}

impl CollectingSink {
    pub fn new(max_vertices: usize) -> Self {
        Self {
            max_vertices,
            meshes: HashMap::new(),
        }
    }

    pub fn get(&self, cell: IVec3, mesh: MeshId) -> Option<&PublishedMesh> {
        self.meshes.get(&(cell, mesh))
    }

    pub fn meshes(&self) -> impl Iterator<Item = (&(IVec3, MeshId), &PublishedMesh)> + '_ {
        self.meshes.iter()
    }

    /// Faces across every collected buffer
    pub fn face_count(&self) -> usize {
        self.meshes.values().map(PublishedMesh::face_count).sum()
    }
}

impl MeshSink for CollectingSink {
    fn publish(&mut self, update: MeshUpdate<'_>) {
        let submeshes = split(&update, self.max_vertices);
        let entry = self
            .meshes
            .entry((update.cell, update.mesh_id))
            .or_insert_with(|| PublishedMesh {
                material: update.material,
                submeshes: Vec::new(),
                revision: 0,
            });
        entry.material = update.material;
        entry.submeshes = submeshes;
        entry.revision += 1;
    }
}

/// Break an update into chunks of whole faces with rebased indices
pub fn split(update: &MeshUpdate<'_>, max_vertices: usize) -> Vec<SubMesh> {
    let faces_per_chunk = (max_vertices / 4).max(1);
    update
        .indices
        .chunks(6 * faces_per_chunk)
        .map(|chunk| {
            let mut mesh = SubMesh::default();
            for face in chunk.chunks_exact(6) {
                let base = face[0] as usize;
                let rebased = mesh.vertices.len() as u32;
                mesh.vertices.extend_from_slice(&update.vertices[base..base + 4]);
                mesh.normals.extend_from_slice(&update.normals[base..base + 4]);
                mesh.uvs.extend_from_slice(&update.uvs[base..base + 4]);
                mesh.indices.extend(face.iter().map(|&i| i - face[0] + rebased));
            }
            mesh
        })
        .collect()
}
