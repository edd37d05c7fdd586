//! Microfacet BRDF terms shared by every diffuse model.
//!
//! `roughness` parameters below are the physical roughness (alpha), already
//! squared from the perceptual value and clamped away from zero.

use std::f32::consts::PI;

use glam::Vec3;

use super::EPSILON;

/// Clamped dot products for one light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotProducts {
    pub n_dot_v: f32,
    pub n_dot_l: f32,
    pub n_dot_h: f32,
    pub l_dot_h: f32,
    pub v_dot_h: f32,
    /// Only used by Oren-Nayar; kept signed.
    pub l_dot_v: f32,
}

impl DotProducts {
    /// `n`, `v` and `l` must be unit length (or zero).
    pub fn new(n: Vec3, v: Vec3, l: Vec3) -> Self {
        let h = (l + v).normalize_or_zero();
        let clamp = |x: f32| x.clamp(EPSILON, 1.0);
        Self {
            n_dot_v: clamp(n.dot(v)),
            n_dot_l: clamp(n.dot(l)),
            n_dot_h: clamp(n.dot(h)),
            l_dot_h: clamp(l.dot(h)),
            v_dot_h: clamp(v.dot(h)),
            l_dot_v: l.dot(v).clamp(-1.0, 1.0),
        }
    }
}

/// GGX / Trowbridge-Reitz normal distribution.
pub fn d_ggx(n_dot_h: f32, roughness: f32) -> f32 {
    let a2 = roughness * roughness;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * d * d)
}

fn g1_schlick_ggx(x: f32, k: f32) -> f32 {
    x / (x * (1.0 - k) + k)
}

/// Separable Smith shadowing-masking with the Schlick-GGX approximation.
pub fn g_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    let k = roughness * 0.5;
    g1_schlick_ggx(n_dot_v, k) * g1_schlick_ggx(n_dot_l, k)
}

pub fn f_schlick(u: f32, f0: Vec3) -> Vec3 {
    f0 + (Vec3::ONE - f0) * (1.0 - u).powi(5)
}

pub fn f_schlick_scalar(u: f32, f0: f32, f90: f32) -> f32 {
    f0 + (f90 - f0) * (1.0 - u).powi(5)
}

/// `D·G·F / (4·NoV·NoL)`, clamped to [0, 1].
pub fn specular(dots: &DotProducts, roughness: f32, fresnel: Vec3) -> Vec3 {
    let d = d_ggx(dots.n_dot_h, roughness);
    let g = g_smith(dots.n_dot_v, dots.n_dot_l, roughness);
    let value = d * g * fresnel / (4.0 * dots.n_dot_v * dots.n_dot_l);
    value.clamp(Vec3::ZERO, Vec3::ONE)
}

pub fn fd_lambert() -> f32 {
    1.0 / PI
}

/// Disney diffuse with Schlick retro-reflection.
pub fn fd_burley(dots: &DotProducts, roughness: f32) -> f32 {
    let f90 = 0.5 + 2.0 * roughness * dots.l_dot_h * dots.l_dot_h;
    let light = f_schlick_scalar(dots.n_dot_l, 1.0, f90);
    let view = f_schlick_scalar(dots.n_dot_v, 1.0, f90);
    light * view / PI
}

/// Qualitative Oren-Nayar, with sigma taken as the physical roughness.
pub fn fd_oren_nayar(dots: &DotProducts, roughness: f32) -> f32 {
    let s2 = roughness * roughness;
    let a = 1.0 - 0.5 * s2 / (s2 + 0.33);
    let b = 0.45 * s2 / (s2 + 0.09);
    let s = dots.l_dot_v - dots.n_dot_l * dots.n_dot_v;
    let t = if s > 0.0 {
        dots.n_dot_l.max(dots.n_dot_v)
    } else {
        1.0
    };
    (a + b * s.max(0.0) / t) / PI
}

/// Diffuse and specular weights `(kd, ks)` for a Fresnel value.
/// Per channel, `kd + ks <= 1`.
pub fn energy_weights(fresnel: Vec3, metallic: f32) -> (Vec3, Vec3) {
    let kd = (Vec3::ONE - fresnel) * (1.0 - metallic);
    (kd, fresnel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ggx_peaks_at_normal_incidence() {
        let a = 0.25;
        assert!(d_ggx(1.0, a) > d_ggx(0.9, a));
        assert!((d_ggx(1.0, a) - 1.0 / (PI * a * a)).abs() < 1e-3);
    }

    #[test]
    fn smith_is_one_at_normal_incidence() {
        assert!((g_smith(1.0, 1.0, 0.7) - 1.0).abs() < 1e-6);
        assert!(g_smith(0.1, 1.0, 0.7) < 1.0);
    }

    #[test]
    fn schlick_hits_f0_and_one() {
        let f0 = Vec3::splat(0.04);
        assert!(f_schlick(1.0, f0).abs_diff_eq(f0, 1e-6));
        assert!(f_schlick(0.0, f0).abs_diff_eq(Vec3::ONE, 1e-6));
    }

    #[test]
    fn oren_nayar_reduces_to_lambert_when_smooth() {
        let dots = DotProducts::new(Vec3::Z, Vec3::new(0.6, 0.0, 0.8), Vec3::new(-0.6, 0.0, 0.8));
        assert!((fd_oren_nayar(&dots, 0.0) - fd_lambert()).abs() < 1e-6);
    }

    #[test]
    fn burley_matches_lambert_when_f90_is_one() {
        // f90 = 0.5 + 2 * 0.25 * 1 = 1, so both Schlick weights are 1.
        let dots = DotProducts::new(Vec3::Z, Vec3::Z, Vec3::Z);
        assert!((fd_burley(&dots, 0.25) - fd_lambert()).abs() < 1e-6);
    }

    #[test]
    fn dot_products_never_reach_zero() {
        let dots = DotProducts::new(Vec3::Z, Vec3::X, -Vec3::Z);
        assert!(dots.n_dot_v >= EPSILON);
        assert!(dots.n_dot_l >= EPSILON);
        assert!(dots.n_dot_h >= EPSILON);
    }
}
