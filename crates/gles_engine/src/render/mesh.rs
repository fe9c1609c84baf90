//! Indexed triangle meshes in fixed-point model space
//!
//! Meshes are immutable once built and shared through [`MeshHandle`], so a
//! primitive chain can carry a mesh reference across the render thread hand-off
//! without copying vertex data.

use crate::foundation::fixed::{Fp, FpVec3};
use crate::render::{RenderError, RenderResult};
use std::sync::Arc;

/// Shared, immutable mesh reference
pub type MeshHandle = Arc<Mesh>;

/// Indexed triangle list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mesh {
    name: String,
    vertices: Vec<FpVec3>,
    indices: Vec<u16>,
}

impl Mesh {
    /// Create a mesh, validating the index buffer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidMesh`] when the index count is not a multiple
    /// of three or an index points past the vertex buffer.
    pub fn new(name: impl Into<String>, vertices: Vec<FpVec3>, indices: Vec<u16>) -> RenderResult<Self> {
        let name = name.into();
        if indices.len() % 3 != 0 {
            return Err(RenderError::InvalidMesh(format!(
                "{name}: index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| usize::from(i) >= vertices.len()) {
            return Err(RenderError::InvalidMesh(format!(
                "{name}: index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }
        Ok(Self { name, vertices, indices })
    }

    /// Axis-aligned cube centred on the origin, counter-clockwise faces pointing outward
    #[must_use]
    pub fn cube(half_extent: Fp) -> Self {
        let (n, p) = (-half_extent, half_extent);
        let vertices = vec![
            FpVec3::new(n, n, n),
            FpVec3::new(p, n, n),
            FpVec3::new(p, p, n),
            FpVec3::new(n, p, n),
            FpVec3::new(n, n, p),
            FpVec3::new(p, n, p),
            FpVec3::new(p, p, p),
            FpVec3::new(n, p, p),
        ];
        let indices = vec![
            4, 5, 6, 4, 6, 7, // +Z
            1, 0, 3, 1, 3, 2, // -Z
            0, 4, 7, 0, 7, 3, // -X
            5, 1, 2, 5, 2, 6, // +X
            7, 6, 2, 7, 2, 3, // +Y
            0, 1, 5, 0, 5, 4, // -Y
        ];
        Self {
            name: "cube".to_string(),
            vertices,
            indices,
        }
    }

    /// Square in the XY plane facing +Z
    #[must_use]
    pub fn quad(half_extent: Fp) -> Self {
        let (n, p) = (-half_extent, half_extent);
        Self {
            name: "quad".to_string(),
            vertices: vec![
                FpVec3::new(n, n, Fp::ZERO),
                FpVec3::new(p, n, Fp::ZERO),
                FpVec3::new(p, p, Fp::ZERO),
                FpVec3::new(n, p, Fp::ZERO),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// Wrap in a shareable handle
    #[must_use]
    pub fn into_handle(self) -> MeshHandle {
        Arc::new(self)
    }

    /// Debug name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertex positions
    #[must_use]
    pub fn vertices(&self) -> &[FpVec3] {
        &self.vertices
    }

    /// Triangle indices
    #[must_use]
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Number of triangles
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate over triangles as vertex triples
    pub fn triangles(&self) -> impl Iterator<Item = [FpVec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.vertices[usize::from(tri[0])],
                self.vertices[usize::from(tri[1])],
                self.vertices[usize::from(tri[2])],
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_is_closed_and_outward() {
        let cube = Mesh::cube(Fp::ONE);
        assert_eq!(cube.vertices().len(), 8);
        assert_eq!(cube.triangle_count(), 12);
        for [a, b, c] in cube.triangles() {
            let normal = b.delta(a).cross(c.delta(a));
            let centroid = a.add(b).add(c);
            assert!(normal.dot(centroid) > Fp::ZERO, "inward face {a:?} {b:?} {c:?}");
        }
    }

    #[test]
    fn test_invalid_meshes_are_rejected() {
        let vertices = vec![FpVec3::ZERO, FpVec3::X, FpVec3::Y];
        assert!(matches!(
            Mesh::new("short", vertices.clone(), vec![0, 1]),
            Err(RenderError::InvalidMesh(_))
        ));
        assert!(matches!(
            Mesh::new("range", vertices.clone(), vec![0, 1, 3]),
            Err(RenderError::InvalidMesh(_))
        ));
        let ok = Mesh::new("tri", vertices, vec![0, 1, 2]);
        assert_eq!(ok.map(|m| m.triangle_count()).ok(), Some(1));
    }
}
