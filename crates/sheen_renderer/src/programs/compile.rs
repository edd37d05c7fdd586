//! Shader compilation and linking, done entirely on the CPU with naga.
//!
//! Each stage is preprocessed, parsed and validated on its own. Linking then
//! checks that the stages fit together and reflects the combined resource
//! interface. Nothing here touches the GPU, so a [`CompiledProgram`] can be
//! built and inspected in tests without an adapter.

use std::borrow::Cow;
use std::collections::BTreeMap;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::preprocessor::{ShaderDefines, preprocess};
use super::reflection::{self, ProgramLayout, StageResource};
use crate::error::{RenderError, Result, ShaderStage};

/// WGSL sources and defines for one program variant.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub label: String,
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
    pub defines: ShaderDefines,
}

impl ShaderSource {
    pub fn new(
        label: impl Into<String>,
        vertex: impl Into<Cow<'static, str>>,
        fragment: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            label: label.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
            defines: ShaderDefines::new(),
        }
    }

    pub fn with_defines(mut self, defines: ShaderDefines) -> Self {
        self.defines = defines;
        self
    }
}

/// One validated stage.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub stage: ShaderStage,
    /// Preprocessed WGSL, what the GPU driver receives.
    pub wgsl: String,
    pub entry_point: String,
    pub module: naga::Module,
}

/// A linked program: both stages plus the reflected layout.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub label: String,
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
    pub layout: ProgramLayout,
}

impl CompiledProgram {
    pub fn compile(source: &ShaderSource) -> Result<Self> {
        let stages = compile_stage(ShaderStage::Vertex, &source.vertex, &source.defines)
            .and_then(|vertex| {
                let fragment =
                    compile_stage(ShaderStage::Fragment, &source.fragment, &source.defines)?;
                let layout = link(&vertex, &fragment)?;
                Ok((vertex, fragment, layout))
            })
            .inspect_err(|e| log::error!("Program '{}': {e}", source.label));
        let (vertex, fragment, layout) = stages?;

        log::debug!(
            "Linked program '{}': {} uniforms, {} blocks, {} textures",
            source.label,
            layout.uniforms().len(),
            layout.blocks().len(),
            layout.textures().len()
        );

        Ok(Self {
            label: source.label.clone(),
            vertex,
            fragment,
            layout,
        })
    }
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

fn compile_stage(stage: ShaderStage, source: &str, defines: &ShaderDefines) -> Result<CompiledStage> {
    let wgsl = preprocess(source, defines).map_err(|e| RenderError::Compile {
        stage,
        diagnostic: e.to_string(),
    })?;

    let module = naga::front::wgsl::parse_str(&wgsl).map_err(|e| RenderError::Compile {
        stage,
        diagnostic: e.emit_to_string(&wgsl),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| RenderError::Compile {
            stage,
            diagnostic: e.emit_to_string(&wgsl),
        })?;

    let mut entry_points = module
        .entry_points
        .iter()
        .filter(|ep| ep.stage == naga_stage(stage));
    let entry_point = match (entry_points.next(), entry_points.next()) {
        (Some(ep), None) => ep.name.clone(),
        (None, _) => {
            return Err(RenderError::Link(format!("{stage} shader has no {stage} entry point")));
        }
        (Some(_), Some(_)) => {
            return Err(RenderError::Link(format!(
                "{stage} shader has more than one {stage} entry point"
            )));
        }
    };

    Ok(CompiledStage {
        stage,
        wgsl,
        entry_point,
        module,
    })
}

fn entry_point<'a>(stage: &'a CompiledStage) -> Option<&'a naga::EntryPoint> {
    stage
        .module
        .entry_points
        .iter()
        .find(|ep| ep.name == stage.entry_point)
}

/// `@location` slots of an entry point's interface, mapped to a type signature.
fn locations_of(
    module: &naga::Module,
    binding: Option<&naga::Binding>,
    ty: naga::Handle<naga::Type>,
    out: &mut BTreeMap<u32, String>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.insert(*location, format!("{:?}", module.types[ty].inner));
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    locations_of(module, member.binding.as_ref(), member.ty, out);
                }
            }
        }
    }
}

fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<ProgramLayout> {
    let (Some(vs), Some(fs)) = (entry_point(vertex), entry_point(fragment)) else {
        return Err(RenderError::Link("entry point disappeared after compilation".into()));
    };

    let mut outputs = BTreeMap::new();
    if let Some(result) = &vs.function.result {
        locations_of(&vertex.module, result.binding.as_ref(), result.ty, &mut outputs);
    }

    let mut inputs = BTreeMap::new();
    for argument in &fs.function.arguments {
        locations_of(&fragment.module, argument.binding.as_ref(), argument.ty, &mut inputs);
    }

    for (location, input) in &inputs {
        match outputs.get(location) {
            None => {
                return Err(RenderError::Link(format!(
                    "fragment input @location({location}) is not written by the vertex stage"
                )));
            }
            Some(output) if output != input => {
                return Err(RenderError::Link(format!(
                    "@location({location}) is {output} in the vertex stage but {input} in the fragment stage"
                )));
            }
            Some(_) => {}
        }
    }

    let vertex_resources = reflection::reflect_module(&vertex.module);
    let fragment_resources = reflection::reflect_module(&fragment.module);
    check_shared_bindings(&vertex_resources, &fragment_resources)?;

    Ok(reflection::build_layout(&vertex_resources, &fragment_resources))
}

fn check_shared_bindings(vertex: &[StageResource], fragment: &[StageResource]) -> Result<()> {
    for f in fragment {
        if let Some(v) = vertex.iter().find(|v| v.group == f.group && v.binding == f.binding) {
            if v.name != f.name || v.signature != f.signature {
                return Err(RenderError::Link(format!(
                    "@group({}) @binding({}) is '{}' in the vertex stage but '{}' in the fragment stage",
                    f.group, f.binding, v.name, f.name
                )));
            }
        }
    }

    // One name, one binding.
    for f in fragment {
        let clash = vertex
            .iter()
            .find(|v| v.name == f.name && (v.group, v.binding) != (f.group, f.binding));
        if let Some(v) = clash {
            return Err(RenderError::Link(format!(
                "'{}' is bound at ({}, {}) in the vertex stage but ({}, {}) in the fragment stage",
                f.name, v.group, v.binding, f.group, f.binding
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = r#"
        struct Out { @builtin(position) clip: vec4<f32>, @location(0) color: vec3<f32> }
        @vertex
        fn vs_main(@location(0) position: vec3<f32>) -> Out {
            var out: Out;
            out.clip = vec4<f32>(position, 1.0);
            out.color = position;
            return out;
        }
    "#;

    #[test]
    fn links_matching_stages() {
        let fs = "@fragment fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> { return vec4<f32>(color, 1.0); }";
        let program = CompiledProgram::compile(&ShaderSource::new("ok", VS, fs)).unwrap();
        assert_eq!(program.vertex.entry_point, "vs_main");
        assert_eq!(program.fragment.entry_point, "fs_main");
    }

    #[test]
    fn missing_varying_fails_to_link() {
        let fs = "@fragment fn fs_main(@location(3) color: vec3<f32>) -> @location(0) vec4<f32> { return vec4<f32>(color, 1.0); }";
        let err = CompiledProgram::compile(&ShaderSource::new("bad", VS, fs)).unwrap_err();
        assert!(matches!(err, RenderError::Link(_)), "{err}");
    }

    #[test]
    fn varying_type_mismatch_fails_to_link() {
        let fs = "@fragment fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> { return color; }";
        let err = CompiledProgram::compile(&ShaderSource::new("bad", VS, fs)).unwrap_err();
        assert!(matches!(err, RenderError::Link(_)), "{err}");
    }

    #[test]
    fn syntax_error_names_the_stage() {
        let fs = "@fragment fn fs_main( -> @location(0) vec4<f32> { }";
        let err = CompiledProgram::compile(&ShaderSource::new("bad", VS, fs)).unwrap_err();
        match err {
            RenderError::Compile { stage, diagnostic } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!diagnostic.is_empty());
            }
            other => panic!("expected a compile error, got {other}"),
        }
    }
}
