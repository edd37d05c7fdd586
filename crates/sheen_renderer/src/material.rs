use glam::Vec3;

use crate::{programs::pbr_program::names, uniform::UniformSet};

/// Surface parameters of one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PbrMaterial {
    /// Display-encoded (sRGB) base color.
    pub albedo: [u8; 3],
    /// Perceptual roughness in [0, 1].
    pub roughness: f32,
    pub metallic: f32,
}

impl Default for PbrMaterial {
    fn default() -> Self {
        Self {
            albedo: [255, 255, 255],
            roughness: 0.5,
            metallic: 0.0,
        }
    }
}

impl PbrMaterial {
    pub fn new(albedo: [u8; 3], roughness: f32, metallic: f32) -> Self {
        Self {
            albedo,
            roughness: roughness.clamp(0.0, 1.0),
            metallic: metallic.clamp(0.0, 1.0),
        }
    }

    /// Albedo in [0, 1], still gamma encoded.
    pub fn albedo_gamma(&self) -> Vec3 {
        Vec3::from_array(self.albedo.map(|c| c as f32 / 255.0))
    }

    pub fn write_uniforms(&self, set: &mut UniformSet) {
        set.set(names::ALBEDO, self.albedo_gamma())
            .set(names::ROUGHNESS, self.roughness)
            .set(names::METALLIC, self.metallic);
    }
}
