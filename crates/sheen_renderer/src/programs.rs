pub mod compile;
pub mod pbr_program;
pub mod preprocessor;
pub mod reflection;
pub mod shader_program;

pub use compile::{CompiledProgram, CompiledStage, ShaderSource};
pub use pbr_program::{PbrProgram, ShadingConfig};
pub use preprocessor::{PreprocessError, ShaderDefines, preprocess};
pub use reflection::{
    ProgramLayout, ReflectedUniform, SamplerBinding, TextureBinding, UniformBlock, UniformLocation,
};
pub use shader_program::{PipelineState, ShaderProgram};

use crate::error::Result;

/// Holds common WGPU references to simplify function signatures.
pub struct GpuProgramRenderContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub format: wgpu::TextureFormat, // The output format (Swapchain)
}

pub trait GpuProgram: Sized {
    /// Data required to pick the variant (e.g., shading options)
    type InitData;

    /// Compiles, links and reflects the shaders, then creates the GPU layouts.
    fn new(ctx: &GpuProgramRenderContext, init_data: &Self::InitData) -> Result<Self>;

    /// The linked program draws are issued with.
    fn shader(&self) -> &ShaderProgram;
}
