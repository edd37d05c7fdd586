//! CPU reference of the PBR fragment stage.
//!
//! `shaders/pbr.frag.wgsl` evaluates the same math per fragment on the GPU.
//! Keeping a CPU copy makes the lighting contract testable without an
//! adapter; any change to one side has to be mirrored in the other.

pub mod brdf;
pub mod color;
pub mod ibl;

use glam::{Mat4, Vec3, Vec4};

use crate::{
    light::PointLight, material::PbrMaterial, programs::pbr_program::names, uniform::UniformSet,
};
use brdf::DotProducts;
use ibl::EnvironmentMap;

/// Dielectric reflectance at normal incidence.
pub const DIELECTRIC_F0: f32 = 0.04;
/// Lower bound of every clamped dot product.
pub const EPSILON: f32 = 1e-4;
/// Lower bound of the physical roughness.
pub const MIN_ROUGHNESS: f32 = 1e-3;

/// Lighting position the vertex stage hands to the fragment stage.
///
/// Mirrors `(clip * uModel.translation).xyz`: the clip-space position times
/// the translation matrix as a row vector.
pub fn approximate_world_position(clip: Vec4, translation: &Mat4) -> Vec3 {
    (translation.transpose() * clip).truncate()
}

/// Diffuse lobe. Exactly one is active per program variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiffuseModel {
    #[default]
    Lambert,
    Burley,
    OrenNayar,
}

impl DiffuseModel {
    pub const ALL: [DiffuseModel; 3] = [
        DiffuseModel::Lambert,
        DiffuseModel::Burley,
        DiffuseModel::OrenNayar,
    ];

    /// Shader define selecting this model. Lambert is the fallback branch.
    pub fn define(self) -> Option<&'static str> {
        match self {
            DiffuseModel::Lambert => None,
            DiffuseModel::Burley => Some("DIFFUSE_BURLEY"),
            DiffuseModel::OrenNayar => Some("DIFFUSE_OREN_NAYAR"),
        }
    }

    /// BRDF value without albedo and energy weighting.
    pub fn evaluate(self, dots: &DotProducts, roughness: f32) -> f32 {
        match self {
            DiffuseModel::Lambert => brdf::fd_lambert(),
            DiffuseModel::Burley => brdf::fd_burley(dots, roughness),
            DiffuseModel::OrenNayar => brdf::fd_oren_nayar(dots, roughness),
        }
    }
}

/// Which image based terms are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IblMode {
    #[default]
    Off,
    Diffuse,
    Specular,
    Full,
}

impl IblMode {
    pub fn wants_diffuse(self) -> bool {
        matches!(self, IblMode::Diffuse | IblMode::Full)
    }

    pub fn wants_specular(self) -> bool {
        matches!(self, IblMode::Specular | IblMode::Full)
    }

    /// Sets `uIbl.diffuse` / `uIbl.specular`. A toggle is raised only when
    /// the mode asks for it and every map it samples is resident.
    pub fn write_uniforms(self, diffuse_ready: bool, specular_ready: bool, set: &mut UniformSet) {
        set.set(names::IBL_DIFFUSE, self.wants_diffuse() && diffuse_ready)
            .set(names::IBL_SPECULAR, self.wants_specular() && specular_ready);
    }

    /// Off -> Diffuse -> Specular -> Full -> Off.
    pub fn next(self) -> Self {
        match self {
            IblMode::Off => IblMode::Diffuse,
            IblMode::Diffuse => IblMode::Specular,
            IblMode::Specular => IblMode::Full,
            IblMode::Full => IblMode::Off,
        }
    }
}

/// Environment maps that are actually available. A missing map keeps the
/// matching term off regardless of [`IblMode`].
#[derive(Clone, Copy, Default)]
pub struct Environment<'a> {
    pub diffuse: Option<&'a dyn EnvironmentMap>,
    pub specular: Option<&'a dyn EnvironmentMap>,
    pub brdf_lut: Option<&'a dyn EnvironmentMap>,
}

/// Material inputs after the color-space and roughness remapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceParams {
    /// Linear albedo.
    pub albedo: Vec3,
    pub perceptual_roughness: f32,
    /// Physical roughness, `max(perceptual², MIN_ROUGHNESS)`.
    pub roughness: f32,
    pub metallic: f32,
    pub f0: Vec3,
}

impl SurfaceParams {
    pub fn from_material(material: &PbrMaterial) -> Self {
        let albedo = color::srgb_to_linear3(material.albedo_gamma());
        let perceptual_roughness = material.roughness.clamp(0.0, 1.0);
        let metallic = material.metallic.clamp(0.0, 1.0);
        Self {
            albedo,
            perceptual_roughness,
            roughness: (perceptual_roughness * perceptual_roughness).max(MIN_ROUGHNESS),
            metallic,
            f0: Vec3::splat(DIELECTRIC_F0).lerp(albedo, metallic),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShadingModel {
    pub diffuse: DiffuseModel,
    pub ibl: IblMode,
}

impl ShadingModel {
    pub fn new(diffuse: DiffuseModel, ibl: IblMode) -> Self {
        Self { diffuse, ibl }
    }

    /// Linear radiance leaving `position` toward `camera`, before clamping.
    pub fn radiance(
        &self,
        position: Vec3,
        normal: Vec3,
        camera: Vec3,
        material: &PbrMaterial,
        lights: &[PointLight],
        environment: &Environment,
    ) -> Vec3 {
        let surface = SurfaceParams::from_material(material);
        let n = normal.normalize_or_zero();
        let v = (camera - position).normalize_or_zero();
        let n_dot_v = n.dot(v).clamp(EPSILON, 1.0);

        let mut color = Vec3::ZERO;

        for light in lights.iter().filter(|l| l.is_active()) {
            let l = (light.position - position).normalize_or_zero();
            let dots = DotProducts::new(n, v, l);

            let fresnel = brdf::f_schlick(dots.v_dot_h, surface.f0);
            let (kd, _) = brdf::energy_weights(fresnel, surface.metallic);
            let specular = brdf::specular(&dots, surface.roughness, fresnel);
            let diffuse = kd * surface.albedo * self.diffuse.evaluate(&dots, surface.roughness);

            color += (diffuse + specular) * light.intensity * dots.n_dot_l;
        }

        let ambient_fresnel = brdf::f_schlick(n_dot_v, surface.f0);

        if let (true, Some(map)) = (self.ibl.wants_diffuse(), environment.diffuse) {
            let irradiance = ibl::sample_irradiance(map, n);
            color += (Vec3::ONE - ambient_fresnel) * (1.0 - surface.metallic) * surface.albedo * irradiance;
        }

        if let (true, Some(map), Some(lut)) =
            (self.ibl.wants_specular(), environment.specular, environment.brdf_lut)
        {
            let reflected = -v + 2.0 * n.dot(v) * n;
            let prefiltered = ibl::sample_prefiltered(map, reflected, surface.perceptual_roughness);
            let scale_bias = ibl::sample_brdf_lut(lut, n_dot_v, surface.perceptual_roughness);
            color += prefiltered * (surface.f0 * scale_bias.x + Vec3::splat(scale_bias.y));
        }

        color
    }

    /// Display-encoded color, each channel in [0, 1].
    pub fn shade(
        &self,
        position: Vec3,
        normal: Vec3,
        camera: Vec3,
        material: &PbrMaterial,
        lights: &[PointLight],
        environment: &Environment,
    ) -> Vec3 {
        let linear = self.radiance(position, normal, camera, material, lights, environment);
        color::linear_to_srgb3(linear.clamp(Vec3::ZERO, Vec3::ONE))
    }
}
