//! Program Tests
//!
//! Tests for:
//! - Every PBR variant compiling, linking and reflecting
//! - The uniform naming contract of the PBR shaders
//! - Compile and link failures keyed to the right stage

use sheen_renderer::{
    CompiledProgram, DiffuseModel, PbrProgram, RenderError, ShaderSource, ShaderStage,
    ShadingConfig, UniformKind,
    programs::pbr_program::{FRAGMENT_SOURCE, VERTEX_SOURCE},
};

fn compile_variant(diffuse: DiffuseModel, use_uv: bool) -> CompiledProgram {
    PbrProgram::compile(&ShadingConfig { diffuse, use_uv })
        .unwrap_or_else(|e| panic!("{diffuse:?} (uv: {use_uv}) failed: {e}"))
}

#[test]
fn every_variant_compiles() {
    for diffuse in DiffuseModel::ALL {
        for use_uv in [false, true] {
            let program = compile_variant(diffuse, use_uv);
            assert_eq!(program.vertex.entry_point, "vs_main");
            assert_eq!(program.fragment.entry_point, "fs_main");
        }
    }
}

#[test]
fn reflects_the_pbr_uniform_contract() {
    let program = compile_variant(DiffuseModel::Lambert, false);
    let layout = &program.layout;

    let expected = [
        ("uModel.localToProjection", UniformKind::Mat4),
        ("uModel.translation", UniformKind::Mat4),
        ("uMaterial.albedo", UniformKind::Vec3),
        ("uMaterial.roughness", UniformKind::Float),
        ("uMaterial.metallic", UniformKind::Float),
        ("uCamera.position", UniformKind::Vec3),
        ("uLights[0].position", UniformKind::Vec3),
        ("uLights[3].intensity", UniformKind::Float),
        ("uIbl.diffuse", UniformKind::Bool),
        ("uIbl.specular", UniformKind::Bool),
        ("uEnvDiffuse", UniformKind::Texture),
        ("uEnvSpecular", UniformKind::Texture),
        ("uBrdfLut", UniformKind::Texture),
    ];
    for (name, kind) in expected {
        let uniform = layout
            .uniform(name)
            .unwrap_or_else(|| panic!("'{name}' not reflected"));
        assert_eq!(uniform.kind, kind, "{name}");
    }

    // 2 model + 3 material + 1 camera + 4 * 2 lights + 2 toggles + 3 textures.
    assert_eq!(layout.uniforms().len(), 19);
    assert!(layout.uniform("uSampler").is_none());
    assert_eq!(layout.samplers().len(), 1);
    assert_eq!(layout.group_count(), 2);
}

#[test]
fn block_visibility_follows_usage() {
    let program = compile_variant(DiffuseModel::Lambert, false);
    let block = |name: &str| {
        program
            .layout
            .blocks()
            .iter()
            .find(|b| b.name == name)
            .cloned()
            .unwrap_or_else(|| panic!("no block {name}"))
    };

    assert_eq!(block("uModel").visibility, wgpu::ShaderStages::VERTEX);
    assert_eq!(block("uModel").size, 128);
    assert_eq!(block("uMaterial").visibility, wgpu::ShaderStages::FRAGMENT);
    assert_eq!(block("uLights").size, 64);
}

#[test]
fn defines_select_code_paths() {
    let lambert = compile_variant(DiffuseModel::Lambert, false);
    let burley = compile_variant(DiffuseModel::Burley, false);
    let oren_nayar = compile_variant(DiffuseModel::OrenNayar, true);

    let burley_f90 = "let f90 = 0.5 + 2.0 * a * l_dot_h * l_dot_h;";
    assert!(!lambert.fragment.wgsl.contains(burley_f90));
    assert!(burley.fragment.wgsl.contains(burley_f90));
    assert!(!burley.fragment.wgsl.contains("term_b"));
    assert!(oren_nayar.fragment.wgsl.contains("term_b"));

    assert!(!lambert.vertex.wgsl.contains("@location(2) uv"));
    assert!(oren_nayar.vertex.wgsl.contains("@location(2) uv"));
}

#[test]
fn vertex_stage_multiplies_clip_position_as_row_vector() {
    let program = compile_variant(DiffuseModel::Lambert, false);
    assert!(
        program
            .vertex
            .wgsl
            .contains("out.world_position = (clip * uModel.translation).xyz;")
    );
}

#[test]
fn syntax_error_is_reported_for_its_stage() {
    let source = ShaderSource::new("broken", VERTEX_SOURCE, "fn broken(");
    match CompiledProgram::compile(&source) {
        Err(RenderError::Compile { stage, diagnostic }) => {
            assert_eq!(stage, ShaderStage::Fragment);
            assert!(!diagnostic.is_empty());
        }
        other => panic!("expected a fragment compile error, got {other:?}"),
    }
}

#[test]
fn unbalanced_directive_is_a_compile_error() {
    let source = ShaderSource::new("broken", "#ifdef USE_UV\n", FRAGMENT_SOURCE);
    match CompiledProgram::compile(&source) {
        Err(RenderError::Compile { stage, diagnostic }) => {
            assert_eq!(stage, ShaderStage::Vertex);
            assert!(diagnostic.contains("#endif"), "{diagnostic}");
        }
        other => panic!("expected a vertex compile error, got {other:?}"),
    }
}

#[test]
fn type_error_is_a_compile_error() {
    let fragment = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0; }";
    let source = ShaderSource::new("broken", VERTEX_SOURCE, fragment);
    assert!(matches!(
        CompiledProgram::compile(&source),
        Err(RenderError::Compile {
            stage: ShaderStage::Fragment,
            ..
        })
    ));
}

#[test]
fn unmatched_varying_fails_to_link() {
    let fragment = "@fragment fn fs_main(@location(5) x: f32) -> @location(0) vec4<f32> { return vec4<f32>(x); }";
    let source = ShaderSource::new("broken", VERTEX_SOURCE, fragment);
    assert!(matches!(
        CompiledProgram::compile(&source),
        Err(RenderError::Link(_))
    ));
}

#[test]
fn missing_entry_point_fails_to_link() {
    let source = ShaderSource::new("broken", VERTEX_SOURCE, "fn helper() -> f32 { return 1.0; }");
    assert!(matches!(
        CompiledProgram::compile(&source),
        Err(RenderError::Link(_))
    ));
}

#[test]
fn conflicting_shared_binding_fails_to_link() {
    let vertex = r#"
        @group(0) @binding(0) var<uniform> uScale: f32;
        @vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(uScale); }
    "#;
    let fragment = r#"
        @group(0) @binding(0) var<uniform> uTint: vec3<f32>;
        @fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(uTint, 1.0); }
    "#;
    let source = ShaderSource::new("broken", vertex, fragment);
    assert!(matches!(
        CompiledProgram::compile(&source),
        Err(RenderError::Link(_))
    ));
}
