use super::{
    CompiledProgram, GpuProgram, GpuProgramRenderContext, ShaderDefines, ShaderProgram,
    ShaderSource,
};
use crate::{error::Result, shading::DiffuseModel};

pub const VERTEX_SOURCE: &str = include_str!("../shaders/pbr.vert.wgsl");
pub const FRAGMENT_SOURCE: &str = include_str!("../shaders/pbr.frag.wgsl");

/// Uniform names the PBR shaders declare.
pub mod names {
    pub const LOCAL_TO_PROJECTION: &str = "uModel.localToProjection";
    pub const MODEL_TRANSLATION: &str = "uModel.translation";
    pub const ALBEDO: &str = "uMaterial.albedo";
    pub const ROUGHNESS: &str = "uMaterial.roughness";
    pub const METALLIC: &str = "uMaterial.metallic";
    pub const CAMERA_POSITION: &str = "uCamera.position";
    pub const IBL_DIFFUSE: &str = "uIbl.diffuse";
    pub const IBL_SPECULAR: &str = "uIbl.specular";
    pub const ENV_DIFFUSE: &str = "uEnvDiffuse";
    pub const ENV_SPECULAR: &str = "uEnvSpecular";
    pub const BRDF_LUT: &str = "uBrdfLut";

    pub fn light_position(index: usize) -> String {
        format!("uLights[{index}].position")
    }

    pub fn light_intensity(index: usize) -> String {
        format!("uLights[{index}].intensity")
    }
}

/// Compile-time options of the PBR shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShadingConfig {
    pub diffuse: DiffuseModel,
    pub use_uv: bool,
}

impl ShadingConfig {
    pub fn defines(&self) -> ShaderDefines {
        let mut defines = ShaderDefines::new();
        if let Some(name) = self.diffuse.define() {
            defines.define(name);
        }
        if self.use_uv {
            defines.define("USE_UV");
        }
        defines
    }
}

pub struct PbrProgram {
    config: ShadingConfig,
    program: ShaderProgram,
}

impl PbrProgram {
    pub fn source(config: &ShadingConfig) -> ShaderSource {
        ShaderSource::new(format!("PBR ({:?})", config.diffuse), VERTEX_SOURCE, FRAGMENT_SOURCE)
            .with_defines(config.defines())
    }

    /// Compiles and links the variant on the CPU only.
    pub fn compile(config: &ShadingConfig) -> Result<CompiledProgram> {
        CompiledProgram::compile(&Self::source(config))
    }

    pub fn config(&self) -> &ShadingConfig {
        &self.config
    }
}

impl GpuProgram for PbrProgram {
    type InitData = ShadingConfig;

    fn new(ctx: &GpuProgramRenderContext, config: &Self::InitData) -> Result<Self> {
        let compiled = Self::compile(config)?;
        Ok(Self {
            config: *config,
            program: ShaderProgram::new(ctx, compiled),
        })
    }

    fn shader(&self) -> &ShaderProgram {
        &self.program
    }
}
