//! GPU side of the sheen PBR demo: shader programs compiled and reflected
//! with naga, a type-checked uniform binder, and a wgpu render context.

pub mod binder;
pub mod error;
pub mod light;
pub mod material;
pub mod mesh;
pub mod programs;
pub mod render;
pub mod shading;
pub mod texture;
pub mod uniform;

pub use binder::{BindReport, BoundUniforms, TextureResidency, TextureSlot, UniformBinder};
pub use error::{RenderError, Result, ShaderStage};
pub use light::{MAX_POINT_LIGHTS, PointLight, write_lights};
pub use material::PbrMaterial;
pub use mesh::{GpuGeometry, Vertex};
pub use programs::{
    CompiledProgram, GpuProgram, GpuProgramRenderContext, PbrProgram, PipelineState,
    ProgramLayout, ShaderDefines, ShaderProgram, ShaderSource, ShadingConfig,
};
pub use render::{DrawCall, Frame, RenderContext};
pub use shading::{DiffuseModel, IblMode, ShadingModel};
pub use texture::{GpuTexture, TextureCache};
pub use uniform::{TextureId, UniformKind, UniformSet, UniformValue};
