use crate::{bvh, geom};
use crate::geom::V3Ops as _;

// Everything registered for one rebuild, gathered into a single value.
// Vertex indices on each triangle are global: a mesh's local index
// plus the number of vertices registered before it.
// The mesh's registration ordinal is used as its material tag
#[derive(Clone)]
#[derive(Debug, Default)]
pub struct SceneBatch {
    vertices: Vec<geom::V3<f32>>,
    normals: Vec<geom::V3<f32>>,
    triangles: Vec<geom::Triangle>,
    meshes: usize,
}

// One corner of a face: its local vertex index and an authored normal, if any
type Corner = (usize, Option<geom::V3<f32>>);

impl SceneBatch {
    pub fn new() -> Self { Self::default() }

    pub fn vertices(&self) -> &[geom::V3<f32>] { &self.vertices }

    pub fn normals(&self) -> &[geom::V3<f32>] { &self.normals }

    pub fn triangles(&self) -> &[geom::Triangle] { &self.triangles }

    pub fn mesh_count(&self) -> usize { self.meshes }

    pub fn is_empty(&self) -> bool { self.triangles.is_empty() }

    // Registers a world-space triangle list, returning the mesh's tag
    pub fn add_mesh(
        &mut self,
        positions: &[geom::V3<f32>],
        indices: &[u32],
    ) -> anyhow::Result<i32> {
        if indices.len() % 3 != 0 {
            anyhow::bail!("\
                Mesh index count must be a multiple of 3, got {}\
            ", indices.len());
        }

        let corners = indices.chunks_exact(3).map(|face| {
            [face[0], face[1], face[2]].map(|idx| (idx as usize, None))
        });

        self.push_mesh(positions, corners)
    }

    pub fn add_obj(&mut self, obj: &wavefront::Obj) -> anyhow::Result<i32> {
        let corners = obj.triangles().map(|face| {
            face.map(|vertex| (vertex.position_index(), vertex.normal()))
        });

        self.push_mesh(obj.positions(), corners)
    }

    fn push_mesh<C>(
        &mut self,
        positions: &[geom::V3<f32>],
        corners: C,
    ) -> anyhow::Result<i32>
        where C: Iterator<Item = [Corner; 3]> {

        let tag = i32::try_from(self.meshes)?;
        let first = self.vertices.len();

        // Nothing is committed until the whole mesh checks out
        let mut normals = vec![[0.; 3]; positions.len()];
        let mut triangles = Vec::new();

        for face in corners {
            let [a, b, c] = face.map(|(idx, _)| idx);

            if let Some(idx) = [a, b, c].into_iter().find(|&idx| idx >= positions.len()) {
                anyhow::bail!("\
                    Mesh {} references vertex {} but only has {} vertices\
                ", tag, idx, positions.len());
            }

            let (pa, pb, pc) = (positions[a], positions[b], positions[c]);

            // Corners without an authored normal get the face normal,
            // weighted by the angle the face subtends at that corner
            let normal = pb.sub(pa).cross(pc.sub(pa)).normalize();

            let wedges = [(pa, pb, pc), (pb, pc, pa), (pc, pa, pb)];
            for ((idx, authored), (p, q, r)) in face.into_iter().zip(wedges) {
                let weighted = authored.unwrap_or_else(|| normal.scale(p.angle(q, r)));

                normals[idx] = normals[idx].add(weighted);
            }

            let global = |idx: usize| i32::try_from(first + idx);

            triangles.push(geom::Triangle::new(
                [pa, pb, pc],
                [global(a)?, global(b)?, global(c)?],
                [tag; 3],
            ));
        }

        self.vertices.extend_from_slice(positions);
        self.normals.extend(normals.into_iter().map(|n| n.normalize()));
        self.triangles.append(&mut triangles);
        self.meshes += 1;

        Ok(tag)
    }

    pub fn build(&self, config: &bvh::BuildConfig) -> bvh::BvhTree {
        bvh::BvhTree::build(self.triangles.clone(), config)
    }

    pub fn build_with_stats(
        &self,
        config: &bvh::BuildConfig,
    ) -> (bvh::BvhTree, bvh::BuildStats) {
        bvh::BvhTree::build_with_stats(self.triangles.clone(), config)
    }
}
