//! Image based lighting from equirectangular, RGBM encoded environment maps.
//!
//! The specular map packs [`SPECULAR_LEVELS`] prefiltered levels into one
//! texture. Level `k` is `2^-k` of the full width and sits at
//! `u ∈ [0, 2^-k)`, `v ∈ [1 - 2^-k, 1 - 2^-k + 2^-(k+1))`, forming a mip chain
//! the shader addresses by hand.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3, Vec4};
use sheen_assets::TextureData;

pub const SPECULAR_LEVELS: u32 = 6;
pub const RGBM_RANGE: f32 = 5.0;

/// Anything that can be sampled like a filtered 2D texture. Channels are
/// normalized to [0, 1].
pub trait EnvironmentMap {
    fn sample(&self, uv: Vec2) -> Vec4;
}

/// Bilinear, repeating in `u` and clamped in `v`, like the GPU sampler.
impl EnvironmentMap for TextureData {
    fn sample(&self, uv: Vec2) -> Vec4 {
        if self.width == 0 || self.height == 0 {
            return Vec4::ZERO;
        }

        let x = uv.x * self.width as f32 - 0.5;
        let y = uv.y * self.height as f32 - 0.5;
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);

        let texel = |xi: f32, yi: f32| {
            let xi = (xi as i64).rem_euclid(self.width as i64) as u32;
            let yi = (yi as i64).clamp(0, self.height as i64 - 1) as u32;
            Vec4::from_array(self.texel(xi, yi).map(|c| c as f32 / 255.0))
        };

        let top = texel(x0, y0).lerp(texel(x0 + 1.0, y0), fx);
        let bottom = texel(x0, y0 + 1.0).lerp(texel(x0 + 1.0, y0 + 1.0), fx);
        top.lerp(bottom, fy)
    }
}

/// Direction to equirectangular coordinates.
pub fn equirect_uv(dir: Vec3) -> Vec2 {
    Vec2::new(
        dir.z.atan2(dir.x) / TAU + 0.5,
        dir.y.clamp(-1.0, 1.0).asin() / PI + 0.5,
    )
}

pub fn decode_rgbm(rgbm: Vec4) -> Vec3 {
    rgbm.truncate() * rgbm.w * RGBM_RANGE
}

/// The two specular levels a roughness falls between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelBlend {
    pub lower: u32,
    pub upper: u32,
    /// Weight of `upper`.
    pub weight: f32,
}

pub fn specular_level_blend(perceptual_roughness: f32) -> LevelBlend {
    let max_level = (SPECULAR_LEVELS - 1) as f32;
    let level = perceptual_roughness.clamp(0.0, 1.0) * max_level;
    let lower = level.floor();
    let upper = (lower + 1.0).min(max_level);
    LevelBlend {
        lower: lower as u32,
        upper: upper as u32,
        weight: level - lower,
    }
}

/// Moves full-map coordinates into the region of `level`.
pub fn specular_level_uv(uv: Vec2, level: u32) -> Vec2 {
    let scale = 2f32.powi(-(level as i32));
    Vec2::new(uv.x * scale, uv.y * scale * 0.5 + 1.0 - scale)
}

/// Decoded irradiance around `normal`.
pub fn sample_irradiance(map: &dyn EnvironmentMap, normal: Vec3) -> Vec3 {
    decode_rgbm(map.sample(equirect_uv(normal)))
}

/// Decoded prefiltered radiance along `dir`, blended between two levels.
pub fn sample_prefiltered(map: &dyn EnvironmentMap, dir: Vec3, perceptual_roughness: f32) -> Vec3 {
    let uv = equirect_uv(dir);
    let blend = specular_level_blend(perceptual_roughness);
    let lower = decode_rgbm(map.sample(specular_level_uv(uv, blend.lower)));
    let upper = decode_rgbm(map.sample(specular_level_uv(uv, blend.upper)));
    lower.lerp(upper, blend.weight)
}

/// Split-sum scale and bias for `f0`.
pub fn sample_brdf_lut(lut: &dyn EnvironmentMap, n_dot_v: f32, perceptual_roughness: f32) -> Vec2 {
    let texel = lut.sample(Vec2::new(n_dot_v, perceptual_roughness));
    Vec2::new(texel.x, texel.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equirect_axes() {
        assert!(equirect_uv(Vec3::X).abs_diff_eq(Vec2::new(0.5, 0.5), 1e-6));
        assert!(equirect_uv(Vec3::Z).abs_diff_eq(Vec2::new(0.75, 0.5), 1e-6));
    }

    #[test]
    fn equirect_poles_pin_only_v() {
        // u is undefined at the poles; atan2 of signed zeros may land on either seam.
        assert!((equirect_uv(Vec3::Y).y - 1.0).abs() < 1e-6);
        assert!(equirect_uv(-Vec3::Y).y.abs() < 1e-6);
        assert!(equirect_uv(Vec3::new(0.0, -1.0, 0.0)).abs_diff_eq(Vec2::new(0.5, 0.0), 1e-6));
    }

    #[test]
    fn negative_x_sits_on_the_seam() {
        let uv = equirect_uv(-Vec3::X);
        assert!(uv.x.abs() < 1e-6 || (uv.x - 1.0).abs() < 1e-6, "{uv}");
        assert!((uv.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn level_regions_stack_without_overlap() {
        // Level 0 covers the top half band, level 1 the next quarter, ...
        let top = specular_level_uv(Vec2::new(1.0, 1.0), 0);
        assert!(top.abs_diff_eq(Vec2::new(1.0, 0.5), 1e-6));

        for k in 1..SPECULAR_LEVELS {
            let start = specular_level_uv(Vec2::ZERO, k);
            let end = specular_level_uv(Vec2::ONE, k);
            let previous_end = specular_level_uv(Vec2::ONE, k - 1);
            assert!((start.y - (1.0 - 2f32.powi(-(k as i32)))).abs() < 1e-6);
            assert!(end.y <= 1.0);
            assert!(start.y >= previous_end.y - 1e-6);
            assert!((end.x - 2f32.powi(-(k as i32))).abs() < 1e-6);
        }
    }

    #[test]
    fn rgbm_decode_scales_by_range() {
        let decoded = decode_rgbm(Vec4::new(1.0, 0.5, 0.0, 0.2));
        assert!(decoded.abs_diff_eq(Vec3::new(1.0, 0.5, 0.0), 1e-6));
        assert_eq!(decode_rgbm(Vec4::ZERO), Vec3::ZERO);
    }

    #[test]
    fn level_blend_at_extremes() {
        assert_eq!(
            specular_level_blend(0.0),
            LevelBlend {
                lower: 0,
                upper: 1,
                weight: 0.0
            }
        );
        let rough = specular_level_blend(1.0);
        assert_eq!((rough.lower, rough.upper), (5, 5));
        assert_eq!(rough.weight, 0.0);
    }

    #[test]
    fn texture_sampling_wraps_horizontally() {
        let mut data = TextureData::solid("env", [0, 0, 0, 255]);
        data.width = 2;
        data.pixels = vec![255, 0, 0, 255, 0, 0, 255, 255];

        // Texel centers.
        assert!(data.sample(Vec2::new(0.25, 0.5)).abs_diff_eq(Vec4::new(1.0, 0.0, 0.0, 1.0), 1e-6));
        assert!(data.sample(Vec2::new(0.75, 0.5)).abs_diff_eq(Vec4::new(0.0, 0.0, 1.0, 1.0), 1e-6));
        // The seam blends the last column with the first.
        assert!(data.sample(Vec2::new(1.0, 0.5)).abs_diff_eq(Vec4::new(0.5, 0.0, 0.5, 1.0), 1e-6));
    }
}
