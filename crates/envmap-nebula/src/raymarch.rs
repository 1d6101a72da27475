//! CPU evaluation of the nebula program.
//!
//! Mirrors `fs_nebula` in [`crate::equirect::NEBULA_SHADER_SOURCE`] step for
//! step. `uv` is the quad's texture coordinate: origin bottom-left, so the
//! texture row `y` of a `w x h` target holds `uv.y = 1 - (y + 0.5) / h`.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};

use crate::bluenoise::NoiseTexture;
use crate::uniforms::ProjectionKind;

/// Fixed march length; there is no early exit.
pub const ITERATIONS: u32 = 44;

/// Longitude `uv.x * 2π`, colatitude `uv.y * π` to a unit direction (+Y up).
pub fn to_spherical(uv: Vec2) -> Vec3 {
    let theta = uv.x * TAU;
    let phi = uv.y * PI;
    Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()).normalize()
}

/// Direction to texture coordinates (top-left origin) in an equirectangular target.
///
/// Longitude is offset by half a turn relative to [`to_spherical`].
pub fn from_spherical(dir: Vec3) -> Vec2 {
    Vec2::new(
        dir.z.atan2(dir.x) / TAU + 0.5,
        1.0 - dir.y.clamp(-1.0, 1.0).acos() / PI,
    )
}

/// Aspect-corrected plane coordinate, also used as the noise lookup.
pub fn plane_coord(uv: Vec2, resolution: Vec2) -> Vec2 {
    (uv - 0.5) * Vec2::new(resolution.x / resolution.y, 1.0)
}

/// Ray direction for a pixel. Cartesian directions are not normalized.
pub fn view_direction(uv: Vec2, resolution: Vec2, projection: ProjectionKind) -> Vec3 {
    match projection {
        ProjectionKind::Equirectangular => to_spherical(uv),
        ProjectionKind::Cartesian => plane_coord(uv, resolution).extend(0.5),
    }
}

fn cos4(v: Vec4) -> Vec4 {
    Vec4::new(v.x.cos(), v.y.cos(), v.z.cos(), v.w.cos())
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Shade one pixel. `time` is in seconds. Alpha is always 1.
pub fn shade(
    uv: Vec2,
    resolution: Vec2,
    projection: ProjectionKind,
    time: f32,
    noise: &NoiseTexture,
) -> Vec4 {
    let coord = plane_coord(uv, resolution);
    let dir = view_direction(uv, resolution, projection);
    let jitter = noise.sample(coord) * 0.05;
    let rot = cos4(Vec4::splat(time * 0.2) + Vec4::new(0.0, 33.0, 11.0, 0.0));
    let phase = Vec4::new(0.0, 1.0, 2.0, 0.0);

    let mut color = Vec4::ZERO;
    let mut r = 0.0f32;
    for _ in 0..ITERATIONS {
        let mut p = r * dir;
        p.z -= 2.0;
        let d = p.length();
        p /= d * 0.2;
        let (x, z) = (p.x, p.z);
        p.x = x * rot.x + z * rot.y;
        p.z = x * rot.z + z * rot.w;

        let s = (d - 0.3).min(jitter) + 0.1;
        r += s;
        let g = (p.x + p.y.cos() * p.z.cos()).sin() * (p.z + p.y.sin() * (p.x + time).cos()).sin();
        let glow = smoothstep(0.5, 0.7, g);
        let core = glow + (1.0 - glow) * (0.05 / (d * d));
        let falloff = 1.0 - smoothstep(0.0, 5.0, d);
        let tint = Vec4::ONE + cos4(Vec4::splat(r * 3.0) + phase);
        color += 0.05 / (0.4 + s) * core * falloff * tint;
    }

    color.xyz().extend(1.0)
}

/// Shade a whole `width x height` target, rows top to bottom.
pub fn preview(
    width: u32,
    height: u32,
    projection: ProjectionKind,
    time: f32,
    noise: &NoiseTexture,
) -> Vec<Vec4> {
    let resolution = Vec2::new(width as f32, height as f32);
    let mut out = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let uv = Vec2::new(
                (x as f32 + 0.5) / width as f32,
                1.0 - (y as f32 + 0.5) / height as f32,
            );
            out.push(shade(uv, resolution, projection, time, noise));
        }
    }
    out
}

/// Mean RGB of a preview, for logging.
pub fn mean_color(pixels: &[Vec4]) -> Vec3 {
    if pixels.is_empty() {
        return Vec3::ZERO;
    }
    pixels.iter().map(|p| p.xyz()).sum::<Vec3>() / pixels.len() as f32
}
