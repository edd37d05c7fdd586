use glam::Vec3;

use crate::{programs::pbr_program::names, uniform::UniformSet};

/// Size of the `uLights` array in the PBR shaders.
pub const MAX_POINT_LIGHTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// `<= 0` switches the light off.
    pub intensity: f32,
}

impl PointLight {
    pub fn new(position: Vec3, intensity: f32) -> Self {
        Self {
            position,
            intensity,
        }
    }

    pub fn is_active(&self) -> bool {
        self.intensity > 0.0
    }
}

/// Writes every slot of `uLights`. Slots past `lights.len()` are switched
/// off so lights removed since the last frame do not linger.
pub fn write_lights(lights: &[PointLight], set: &mut UniformSet) {
    if lights.len() > MAX_POINT_LIGHTS {
        log::warn!(
            "{} point lights requested, only the first {MAX_POINT_LIGHTS} are used",
            lights.len()
        );
    }

    for i in 0..MAX_POINT_LIGHTS {
        let light = lights.get(i).copied().unwrap_or(PointLight::new(Vec3::ZERO, 0.0));
        set.set(names::light_position(i), light.position)
            .set(names::light_intensity(i), light.intensity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniform::UniformValue;

    #[test]
    fn unused_slots_are_switched_off() {
        let mut set = UniformSet::new();
        write_lights(&[PointLight::new(Vec3::new(1.0, 2.0, 3.0), 2.0)], &mut set);

        assert_eq!(set.len(), MAX_POINT_LIGHTS * 2);
        assert_eq!(
            set.get("uLights[0].position"),
            Some(&UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)))
        );
        assert_eq!(set.get("uLights[3].intensity"), Some(&UniformValue::Float(0.0)));
    }
}
