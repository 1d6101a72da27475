//! Perspective camera shared by the skybox and the lit mesh.

use glam::{Mat4, Quat, Vec3, Vec4};

/// Right-handed perspective camera. Depth is reversed, so the near plane
/// lands on 1.0 and the depth buffer clears to 0.0.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    /// Vertical, in radians.
    pub fov_y: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov_y: 75f32.to_radians(),
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Move to `eye` and turn toward `target`, keeping world +Y up.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3) {
        let world_to_view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let (_, rotation, _) = world_to_view.inverse().to_scale_rotation_translation();
        self.position = eye;
        self.rotation = rotation.normalize();
    }

    /// Ignored while `height` is zero, as happens on minimize.
    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect_ratio = width / height;
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        // far and near swapped for reverse-Z
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.far, self.near)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Maps clip coordinates back to world-space directions with the
    /// translation left out. The skybox uses it to turn each pixel into a
    /// view ray that never gets closer as the camera moves.
    pub fn inverse_rotation_view_projection(&self) -> Mat4 {
        let rotation_only = Mat4::from_quat(self.rotation.conjugate());
        (self.projection_matrix() * rotation_only).inverse()
    }

    /// World-space direction through the clip-space point `(x, y)`.
    pub fn ray_direction(&self, x: f32, y: f32) -> Vec3 {
        let world = self.inverse_rotation_view_projection() * Vec4::new(x, y, 0.5, 1.0);
        (world.truncate() / world.w).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orbiting(eye: Vec3) -> Camera {
        let mut camera = Camera::default();
        camera.look_at(eye, Vec3::ZERO);
        camera
    }

    #[test]
    fn test_default_faces_neg_z() {
        assert!(Camera::default().forward().abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }

    #[test]
    fn test_look_at_faces_target_and_stays_upright() {
        let camera = orbiting(Vec3::new(3.0, 1.0, 4.0));
        let to_target = -camera.position.normalize();
        assert!(camera.forward().dot(to_target) > 0.9999);
        assert!((camera.rotation * Vec3::Y).y > 0.0);
    }

    #[test]
    fn test_minimized_window_keeps_aspect() {
        let mut camera = Camera::default();
        camera.set_aspect_ratio(800.0, 400.0);
        assert_eq!(camera.aspect_ratio, 2.0);
        camera.set_aspect_ratio(800.0, 0.0);
        assert_eq!(camera.aspect_ratio, 2.0);
    }

    #[test]
    fn test_depth_is_reversed() {
        let camera = Camera::default();
        let project = |z: f32| {
            let clip = camera.projection_matrix() * Vec4::new(0.0, 0.0, z, 1.0);
            clip.z / clip.w
        };
        assert!((project(-camera.near) - 1.0).abs() < 1e-4);
        assert!(project(-camera.far).abs() < 1e-4);
    }

    #[test]
    fn test_view_matrix_undoes_placement() {
        let camera = Camera {
            position: Vec3::new(10.0, 20.0, 30.0),
            rotation: Quat::from_rotation_y(1.2),
            ..Camera::default()
        };
        let eye = camera.view_matrix() * camera.position.extend(1.0);
        assert!(eye.truncate().length() < 1e-3);
    }

    #[test]
    fn test_rays_ignore_camera_translation() {
        let near = orbiting(Vec3::new(0.0, 0.0, 5.0));
        let mut far = near.clone();
        far.position += Vec3::new(100.0, -50.0, 20.0);
        assert!(
            near.inverse_rotation_view_projection()
                .abs_diff_eq(far.inverse_rotation_view_projection(), 1e-5)
        );
    }

    #[test]
    fn test_center_ray_is_forward() {
        let camera = orbiting(Vec3::new(2.0, 2.0, 2.0));
        assert!(camera.ray_direction(0.0, 0.0).dot(camera.forward()) > 0.999);
        assert!(camera.ray_direction(1.0, 0.0).dot(camera.rotation * Vec3::X) > 0.0);
    }
}
