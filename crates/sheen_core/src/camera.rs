use glam::{Mat4, Vec3};

use crate::transform::Transform;

/// Perspective camera. View and projection are derived on every call and
/// never cached, so a parameter change is visible on the next query.
#[derive(Clone, Debug)]
pub struct Camera {
    pub transform: Transform,
    /// Vertical field of view, in radians.
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            fov: 45.0f32.to_radians(),
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn at(position: Vec3) -> Self {
        Self {
            transform: Transform::from_xyz(position.x, position.y, position.z),
            ..Default::default()
        }
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    /// Updates the aspect ratio; the next projection query reflects it.
    pub fn set_parameters(&mut self, aspect_ratio: f32) {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
        } else {
            log::warn!("ignoring invalid aspect ratio {aspect_ratio}");
        }
    }

    /// Aspect ratio from a draw surface size. A zero-height surface (minimized
    /// window) leaves the previous aspect untouched.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.set_parameters(width as f32 / height as f32);
    }

    /// World -> View. Scale on the camera transform is ignored.
    pub fn compute_view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.transform.rotation, self.transform.translation)
            .inverse()
    }

    /// View -> Clip, with WebGPU's [0, 1] depth range.
    pub fn compute_projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.compute_projection_matrix() * self.compute_view_matrix()
    }

    /// Local -> Clip for an instance with the given model matrix.
    pub fn local_to_projection(&self, model: &Mat4) -> Mat4 {
        self.view_projection() * *model
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn view_matrix_moves_world_opposite_to_camera() {
        let camera = Camera::at(Vec3::new(0.0, 0.0, 2.0));
        let origin = camera.compute_view_matrix().transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, 0.0, -2.0), EPSILON));
    }

    #[test]
    fn projection_maps_near_and_far_to_unit_depth_range() {
        let camera = Camera::default();
        let proj = camera.compute_projection_matrix();

        let near = proj * Vec4::new(0.0, 0.0, -camera.near, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -camera.far, 1.0);

        assert!((near.z / near.w).abs() < EPSILON);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn projection_is_not_cached_across_aspect_changes() {
        let mut camera = Camera::default();
        let before = camera.compute_projection_matrix();
        camera.set_viewport(800, 800);
        let after = camera.compute_projection_matrix();

        assert!((camera.aspect_ratio - 1.0).abs() < EPSILON);
        assert_ne!(before, after);
    }

    #[test]
    fn zero_sized_viewport_keeps_previous_aspect() {
        let mut camera = Camera::default();
        camera.set_viewport(1280, 0);
        assert!((camera.aspect_ratio - 16.0 / 9.0).abs() < EPSILON);
    }

    #[test]
    fn local_to_projection_composes_model_last() {
        let camera = Camera::at(Vec3::new(0.0, 0.0, 2.0));
        let model = Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0));
        let expected = camera.view_projection() * model;
        assert_eq!(camera.local_to_projection(&model), expected);
    }
}
