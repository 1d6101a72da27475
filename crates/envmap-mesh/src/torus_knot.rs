//! (p, q) torus knot tube.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::MeshData;

#[derive(Clone, Copy, Debug)]
pub struct TorusKnotParams {
    pub radius: f32,
    /// Tube radius.
    pub tube: f32,
    pub tubular_segments: u32,
    pub radial_segments: u32,
    /// Windings around the axis of rotational symmetry.
    pub p: u32,
    /// Windings around the interior circle of the torus.
    pub q: u32,
}

impl Default for TorusKnotParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            tube: 0.3,
            tubular_segments: 128,
            radial_segments: 16,
            p: 2,
            q: 3,
        }
    }
}

/// Point on the knot centerline at parameter `u`.
fn curve_point(u: f32, p: f32, q: f32, radius: f32) -> Vec3 {
    let qu_over_p = q / p * u;
    let cs = qu_over_p.cos();
    Vec3::new(
        radius * (2.0 + cs) * 0.5 * u.cos(),
        radius * (2.0 + cs) * 0.5 * u.sin(),
        radius * qu_over_p.sin() * 0.5,
    )
}

/// Sweep a circle of radius `tube` along the knot centerline.
///
/// The frame at each step is built from the tangent `T = P(u + ε) - P(u)` and
/// `N = P(u + ε) + P(u)`, then orthogonalized as `B = T × N`, `N = B × T`.
pub fn torus_knot(params: &TorusKnotParams) -> MeshData {
    let tubular = params.tubular_segments.max(3);
    let radial = params.radial_segments.max(3);
    let p = params.p.max(1) as f32;
    let q = params.q as f32;
    let mut mesh = MeshData::default();

    for j in 0..=tubular {
        let u = j as f32 / tubular as f32 * p * TAU;
        let p1 = curve_point(u, p, q, params.radius);
        let p2 = curve_point(u + 0.01, p, q, params.radius);

        let t = p2 - p1;
        let n = p2 + p1;
        let b = t.cross(n).normalize();
        let n = b.cross(t).normalize();

        for i in 0..=radial {
            let v = i as f32 / radial as f32 * TAU;
            let cx = -params.tube * v.cos();
            let cy = params.tube * v.sin();
            let position = p1 + n * cx + b * cy;
            let normal = (position - p1).normalize();
            mesh.push_vertex(
                position,
                normal,
                [i as f32 / radial as f32, j as f32 / tubular as f32],
            );
        }
    }

    let row = radial + 1;
    for j in 1..=tubular {
        for i in 1..=radial {
            let a = row * (j - 1) + (i - 1);
            let b = row * j + (i - 1);
            let c = row * j + i;
            let d = row * (j - 1) + i;
            mesh.push_quad(a, b, c, d);
        }
    }

    mesh
}
