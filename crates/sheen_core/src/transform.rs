use glam::{Mat4, Quat, Vec3};

/// Position, orientation and scale of a drawable instance or of the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Default::default()
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Rotates around the Y axis (Global Up)
    pub fn rotate_y(&mut self, angle_radians: f32) {
        self.rotation = Quat::from_rotation_y(angle_radians) * self.rotation;
    }

    /// Rotates around the X axis (Local Right)
    pub fn rotate_local_x(&mut self, angle_radians: f32) {
        self.rotation *= Quat::from_rotation_x(angle_radians);
    }

    /// Points the local -Z axis at `target`.
    pub fn looking_at(mut self, target: Vec3, up: Vec3) -> Self {
        // look_at_rh builds the world->view matrix; the object rotation is its inverse.
        let view = Mat4::look_at_rh(self.translation, target, up);
        self.rotation = Quat::from_mat4(&view.inverse());
        self
    }

    // --- Matrices ---

    /// Model matrix (Local -> World).
    pub fn compute_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Translation-only part of the model matrix.
    pub fn translation_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
    }

    // --- Directions ---

    /// Returns the "Forward" direction (-Z) relative to current rotation
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Returns the "Right" direction (+X) relative to current rotation
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Returns the "Up" direction (+Y) relative to current rotation
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn compute_matrix_applies_scale_then_rotation_then_translation() {
        let transform = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };

        let p = transform.compute_matrix().transform_point3(Vec3::X);
        // X scaled to 2, rotated 90deg around Y -> -Z, then translated.
        assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), EPSILON), "{p:?}");
    }

    #[test]
    fn translation_matrix_ignores_rotation_and_scale() {
        let transform = Transform::from_xyz(0.25, -0.4, 0.0)
            .with_scale(Vec3::splat(3.0));
        let m = transform.translation_matrix();
        assert!(m.transform_point3(Vec3::ONE).abs_diff_eq(Vec3::new(1.25, 0.6, 1.0), EPSILON));
    }

    #[test]
    fn looking_at_points_forward_at_target() {
        let transform = Transform::from_xyz(0.0, 0.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y);
        assert!(transform.forward().abs_diff_eq(-Vec3::Z, EPSILON));
        assert!(transform.up().abs_diff_eq(Vec3::Y, EPSILON));
    }
}
