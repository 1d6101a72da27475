//! Subdivided plane in the XY plane facing +Z.

use glam::Vec3;

use crate::MeshData;

#[derive(Clone, Copy, Debug)]
pub struct PlaneParams {
    pub width: f32,
    pub height: f32,
    /// Cells along each axis, at least 1.
    pub subdivisions: u32,
}

impl Default for PlaneParams {
    fn default() -> Self {
        Self {
            width: 4.0,
            height: 2.0,
            subdivisions: 8,
        }
    }
}

pub fn plane(params: &PlaneParams) -> MeshData {
    let n = params.subdivisions.max(1);
    let cell_w = params.width / n as f32;
    let cell_h = params.height / n as f32;
    let mut mesh = MeshData::default();

    for iy in 0..=n {
        let y = iy as f32 * cell_h - params.height * 0.5;
        for ix in 0..=n {
            let x = ix as f32 * cell_w - params.width * 0.5;
            mesh.push_vertex(
                Vec3::new(x, -y, 0.0),
                Vec3::Z,
                [ix as f32 / n as f32, 1.0 - iy as f32 / n as f32],
            );
        }
    }

    let row = n + 1;
    for iy in 0..n {
        for ix in 0..n {
            let a = ix + row * iy;
            let b = ix + row * (iy + 1);
            let c = ix + 1 + row * (iy + 1);
            let d = ix + 1 + row * iy;
            mesh.push_quad(a, b, c, d);
        }
    }

    mesh
}
