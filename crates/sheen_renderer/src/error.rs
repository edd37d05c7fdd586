//! Error types for program building, uniform binding and GPU bring-up.
//!
//! Compile and link failures are fatal for the program they belong to. The
//! binding conditions (`TypeMismatch`, `ResourceExhausted`, `TextureNotReady`,
//! `LayoutMismatch`) only ever skip a single uniform and are collected in a
//! [`BindReport`](crate::binder::BindReport) instead of being returned.

use std::fmt;

use thiserror::Error;

use crate::uniform::UniformKind;

/// One of the two programmable stages of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // GPU bring-up
    // ========================================================================
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequest(String),

    #[error("Failed to create WGPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    // ========================================================================
    // Programs (fatal for the program)
    // ========================================================================
    /// A stage failed to preprocess, parse or validate.
    #[error("{stage} shader failed to compile:\n{diagnostic}")]
    Compile {
        stage: ShaderStage,
        diagnostic: String,
    },

    /// Both stages compiled but do not fit together.
    #[error("Program failed to link: {0}")]
    Link(String),

    // ========================================================================
    // Binding (recoverable, skips one uniform)
    // ========================================================================
    #[error("Uniform '{name}' expects {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: UniformKind,
        found: UniformKind,
    },

    #[error("Uniform '{name}' needs texture unit {unit}, but only {limit} are available")]
    ResourceExhausted { name: String, unit: u32, limit: u32 },

    #[error("Texture bound to '{0}' has not finished uploading")]
    TextureNotReady(String),

    /// The staging blocks were sized for a different program.
    #[error("Uniform '{0}' does not fit the staging blocks it was bound into")]
    LayoutMismatch(String),

    // ========================================================================
    // Assets
    // ========================================================================
    /// A texture never resolved; the feature depending on it stays disabled.
    #[error("Asset unavailable: {0}")]
    AssetUnavailable(String),
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
