//! Latitude/longitude UV sphere.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::MeshData;

#[derive(Clone, Copy, Debug)]
pub struct SphereParams {
    pub radius: f32,
    /// Longitudinal segments, at least 3.
    pub segments: u32,
    /// Latitudinal rings, at least 2.
    pub rings: u32,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            segments: 64,
            rings: 32,
        }
    }
}

/// Build a UV sphere centered at the origin with outward normals.
///
/// Vertices along the seam and at the poles are duplicated so UVs stay
/// continuous; pole rows emit a single triangle per cell.
pub fn uv_sphere(params: &SphereParams) -> MeshData {
    let segments = params.segments.max(3);
    let rings = params.rings.max(2);
    let mut mesh = MeshData::default();

    for y in 0..=rings {
        let v = y as f32 / rings as f32;
        let phi = v * PI;
        for x in 0..=segments {
            let u = x as f32 / segments as f32;
            let theta = u * TAU;
            let normal = Vec3::new(-theta.cos() * phi.sin(), phi.cos(), theta.sin() * phi.sin());
            mesh.push_vertex(normal * params.radius, normal, [u, 1.0 - v]);
        }
    }

    let row = segments + 1;
    for y in 0..rings {
        for x in 0..segments {
            let a = y * row + x + 1;
            let b = y * row + x;
            let c = (y + 1) * row + x;
            let d = (y + 1) * row + x + 1;
            if y != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if y != rings - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_data::test_util::assert_well_formed;

    #[test]
    fn test_sphere_is_well_formed() {
        assert_well_formed(&uv_sphere(&SphereParams::default()));
    }

    #[test]
    fn test_vertices_lie_on_radius() {
        let mesh = uv_sphere(&SphereParams {
            radius: 2.5,
            segments: 16,
            rings: 8,
        });
        for v in &mesh.vertices {
            let r = Vec3::from_array(v.position).length();
            assert!((r - 2.5).abs() < 1e-4, "vertex at distance {r}");
        }
    }

    #[test]
    fn test_vertex_and_triangle_counts() {
        let mesh = uv_sphere(&SphereParams {
            radius: 1.0,
            segments: 8,
            rings: 4,
        });
        assert_eq!(mesh.vertices.len(), 9 * 5);
        // Pole rows contribute one triangle per cell, inner rows two.
        assert_eq!(mesh.triangle_count(), 8 * 2 + 8 * 2 * 2);
    }

    #[test]
    fn test_degenerate_params_are_clamped() {
        let mesh = uv_sphere(&SphereParams {
            radius: 1.0,
            segments: 0,
            rings: 0,
        });
        assert_eq!(mesh.vertices.len(), 4 * 3);
        assert_well_formed(&mesh);
    }

    #[test]
    fn test_front_faces_point_outward() {
        let mesh = uv_sphere(&SphereParams::default());
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| Vec3::from_array(mesh.vertices[i as usize].position));
            let face_normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal.dot(centroid) > 0.0, "inward-facing triangle {tri:?}");
        }
    }
}
