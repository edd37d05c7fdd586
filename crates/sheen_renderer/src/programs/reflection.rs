//! Reflection of a compiled program's resource interface.
//!
//! Every `var<uniform>` block is flattened into named leaves
//! (`uMaterial.albedo`, `uLights[2].intensity`, or the bare variable name for
//! non-struct blocks). Leaves of a kind the binder cannot set are skipped.
//! Sampled 2D textures become `Texture` uniforms. Samplers are tracked but
//! never exposed as uniforms: the program owns them.

use std::collections::HashMap;

use naga::{ArraySize, Handle, Module, Scalar, ScalarKind, Type, TypeInner, VectorSize};

use crate::uniform::UniformKind;

/// Where the binder writes a reflected uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformLocation {
    /// Byte offset inside the staging copy of uniform block `block`.
    Buffer { block: usize, offset: u32 },
    /// Texture slot, identified by its position in [`ProgramLayout::textures`].
    Texture { index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReflectedUniform {
    pub name: String,
    pub kind: UniformKind,
    pub location: UniformLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    /// Padded to 16 bytes, the uniform buffer alignment.
    pub size: u32,
    pub visibility: wgpu::ShaderStages,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub visibility: wgpu::ShaderStages,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerBinding {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub visibility: wgpu::ShaderStages,
}

/// Everything the binder and the GPU program need to know about a linked
/// program's parameters. Built once at link time and immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct ProgramLayout {
    blocks: Vec<UniformBlock>,
    textures: Vec<TextureBinding>,
    samplers: Vec<SamplerBinding>,
    uniforms: Vec<ReflectedUniform>,
    by_name: HashMap<String, usize>,
}

impl ProgramLayout {
    pub fn uniform(&self, name: &str) -> Option<&ReflectedUniform> {
        self.by_name.get(name).map(|&i| &self.uniforms[i])
    }

    /// Uniforms in declaration order.
    pub fn uniforms(&self) -> &[ReflectedUniform] {
        &self.uniforms
    }

    pub fn blocks(&self) -> &[UniformBlock] {
        &self.blocks
    }

    /// Sorted by `(group, binding)`. A texture's index here is its unit.
    pub fn textures(&self) -> &[TextureBinding] {
        &self.textures
    }

    pub fn samplers(&self) -> &[SamplerBinding] {
        &self.samplers
    }

    /// Number of bind groups the pipeline layout needs.
    pub fn group_count(&self) -> u32 {
        let blocks = self.blocks.iter().map(|b| b.group);
        let textures = self.textures.iter().map(|t| t.group);
        let samplers = self.samplers.iter().map(|s| s.group);
        blocks
            .chain(textures)
            .chain(samplers)
            .max()
            .map_or(0, |g| g + 1)
    }
}

/// Resource of one shader stage, before the two stages are merged.
#[derive(Debug, Clone)]
pub(crate) struct StageResource {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    /// Structural description used to check both stages agree on a binding.
    pub signature: String,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone)]
pub(crate) enum ResourceKind {
    Block {
        size: u32,
        leaves: Vec<(String, UniformKind, u32)>,
    },
    Texture,
    Sampler,
}

/// Collects the bound globals of one validated module, in declaration order.
pub(crate) fn reflect_module(module: &Module) -> Vec<StageResource> {
    let mut resources = Vec::new();

    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        let name = var
            .name
            .clone()
            .unwrap_or_else(|| format!("group{}_binding{}", binding.group, binding.binding));
        let inner = &module.types[var.ty].inner;

        let kind = match var.space {
            naga::AddressSpace::Uniform => {
                let mut leaves = Vec::new();
                flatten(module, var.ty, &name, 0, &mut leaves);
                ResourceKind::Block {
                    size: inner.size(module.to_ctx()),
                    leaves,
                }
            }
            naga::AddressSpace::Handle => match inner {
                TypeInner::Image {
                    dim: naga::ImageDimension::D2,
                    arrayed: false,
                    ..
                } => ResourceKind::Texture,
                TypeInner::Sampler { comparison: false } => ResourceKind::Sampler,
                _ => {
                    log::debug!("Skipping handle '{name}': only 2D textures and samplers are reflected");
                    continue;
                }
            },
            other => {
                log::debug!("Skipping global '{name}' in address space {other:?}");
                continue;
            }
        };

        resources.push(StageResource {
            signature: signature(module, var.ty),
            name,
            group: binding.group,
            binding: binding.binding,
            kind,
        });
    }

    resources
}

fn flatten(
    module: &Module,
    ty: Handle<Type>,
    path: &str,
    base: u32,
    out: &mut Vec<(String, UniformKind, u32)>,
) {
    match &module.types[ty].inner {
        TypeInner::Struct { members, .. } => {
            for member in members {
                let Some(member_name) = &member.name else {
                    continue;
                };
                let path = format!("{path}.{member_name}");
                flatten(module, member.ty, &path, base + member.offset, out);
            }
        }
        TypeInner::Array {
            base: element,
            size: ArraySize::Constant(count),
            stride,
        } => {
            for i in 0..count.get() {
                let path = format!("{path}[{i}]");
                flatten(module, *element, &path, base + i * stride, out);
            }
        }
        other => match leaf_kind(other) {
            Some(kind) => out.push((path.to_string(), kind, base)),
            None => log::debug!("Uniform '{path}' has an unsupported type and is not settable"),
        },
    }
}

const F32: Scalar = Scalar {
    kind: ScalarKind::Float,
    width: 4,
};

const U32: Scalar = Scalar {
    kind: ScalarKind::Uint,
    width: 4,
};

/// Maps a WGSL leaf type to the value kind the binder accepts.
///
/// WGSL forbids `bool` in uniform buffers, so a `u32` leaf carries booleans
/// as 0 or 1.
fn leaf_kind(inner: &TypeInner) -> Option<UniformKind> {
    match *inner {
        TypeInner::Scalar(F32) => Some(UniformKind::Float),
        TypeInner::Scalar(U32) => Some(UniformKind::Bool),
        TypeInner::Vector {
            size: VectorSize::Tri,
            scalar: F32,
        } => Some(UniformKind::Vec3),
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar: F32,
        } => Some(UniformKind::Mat4),
        _ => None,
    }
}

/// Handle-free description of a type, comparable across modules.
fn signature(module: &Module, ty: Handle<Type>) -> String {
    match &module.types[ty].inner {
        TypeInner::Struct { members, span } => {
            let fields: Vec<String> = members
                .iter()
                .map(|m| {
                    format!(
                        "{}@{}:{}",
                        m.name.as_deref().unwrap_or("_"),
                        m.offset,
                        signature(module, m.ty)
                    )
                })
                .collect();
            format!("struct{{{}}}/{span}", fields.join(","))
        }
        TypeInner::Array { base, size, stride } => {
            format!("array<{}, {size:?}>/{stride}", signature(module, *base))
        }
        other => format!("{other:?}"),
    }
}

/// Merges the resources of both stages into a layout.
///
/// The caller has already checked that shared bindings agree.
pub(crate) fn build_layout(
    vertex: &[StageResource],
    fragment: &[StageResource],
) -> ProgramLayout {
    let mut merged: Vec<(StageResource, wgpu::ShaderStages)> = Vec::new();
    let stages = [
        (vertex, wgpu::ShaderStages::VERTEX),
        (fragment, wgpu::ShaderStages::FRAGMENT),
    ];
    for (resources, stage) in stages {
        for resource in resources {
            let existing = merged
                .iter_mut()
                .find(|(r, _)| r.group == resource.group && r.binding == resource.binding);
            match existing {
                Some((_, visibility)) => *visibility |= stage,
                None => merged.push((resource.clone(), stage)),
            }
        }
    }

    let mut layout = ProgramLayout::default();

    let mut textures: Vec<(StageResource, wgpu::ShaderStages)> = merged
        .iter()
        .filter(|(r, _)| matches!(r.kind, ResourceKind::Texture))
        .cloned()
        .collect();
    textures.sort_by_key(|(r, _)| (r.group, r.binding));
    layout.textures = textures
        .into_iter()
        .map(|(r, visibility)| TextureBinding {
            name: r.name,
            group: r.group,
            binding: r.binding,
            visibility,
        })
        .collect();

    for (resource, visibility) in merged {
        match resource.kind {
            ResourceKind::Block { size, leaves } => {
                let block = layout.blocks.len();
                for (name, kind, offset) in leaves {
                    layout.push_uniform(ReflectedUniform {
                        name,
                        kind,
                        location: UniformLocation::Buffer { block, offset },
                    });
                }
                layout.blocks.push(UniformBlock {
                    name: resource.name,
                    group: resource.group,
                    binding: resource.binding,
                    size: size.max(1).next_multiple_of(16),
                    visibility,
                });
            }
            ResourceKind::Texture => {
                let index = layout
                    .textures
                    .iter()
                    .position(|t| t.group == resource.group && t.binding == resource.binding);
                if let Some(index) = index {
                    layout.push_uniform(ReflectedUniform {
                        name: resource.name,
                        kind: UniformKind::Texture,
                        location: UniformLocation::Texture { index },
                    });
                }
            }
            ResourceKind::Sampler => layout.samplers.push(SamplerBinding {
                name: resource.name,
                group: resource.group,
                binding: resource.binding,
                visibility,
            }),
        }
    }

    layout
}

impl ProgramLayout {
    fn push_uniform(&mut self, uniform: ReflectedUniform) {
        self.by_name.insert(uniform.name.clone(), self.uniforms.len());
        self.uniforms.push(uniform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reflect(source: &str) -> Vec<StageResource> {
        let module = naga::front::wgsl::parse_str(source).unwrap();
        reflect_module(&module)
    }

    #[test]
    fn flattens_structs_and_arrays() {
        let resources = reflect(
            r#"
            struct Light { position: vec3<f32>, intensity: f32 }
            struct Scene { lights: array<Light, 2>, exposure: f32, enabled: u32 }
            @group(0) @binding(0) var<uniform> uScene: Scene;
            @group(0) @binding(1) var<uniform> uTime: f32;
            "#,
        );
        let layout = build_layout(&resources, &[]);

        let names: Vec<&str> = layout.uniforms().iter().map(|u| u.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "uScene.lights[0].position",
                "uScene.lights[0].intensity",
                "uScene.lights[1].position",
                "uScene.lights[1].intensity",
                "uScene.exposure",
                "uScene.enabled",
                "uTime",
            ]
        );

        let second = layout.uniform("uScene.lights[1].intensity").unwrap();
        assert_eq!(second.kind, UniformKind::Float);
        assert_eq!(second.location, UniformLocation::Buffer { block: 0, offset: 28 });
        assert_eq!(layout.uniform("uScene.enabled").unwrap().kind, UniformKind::Bool);
        assert_eq!(layout.blocks()[1].size, 16);
    }

    #[test]
    fn unsupported_leaves_are_skipped() {
        let resources = reflect(
            r#"
            struct Params { tint: vec4<f32>, scale: f32 }
            @group(0) @binding(0) var<uniform> uParams: Params;
            "#,
        );
        let layout = build_layout(&resources, &[]);

        assert!(layout.uniform("uParams.tint").is_none());
        assert!(layout.uniform("uParams.scale").is_some());
    }

    #[test]
    fn textures_get_units_in_binding_order() {
        let resources = reflect(
            r#"
            @group(1) @binding(2) var tB: texture_2d<f32>;
            @group(1) @binding(0) var tA: texture_2d<f32>;
            @group(1) @binding(1) var s: sampler;
            "#,
        );
        let layout = build_layout(&resources, &[]);

        assert_eq!(layout.uniform("tA").unwrap().location, UniformLocation::Texture { index: 0 });
        assert_eq!(layout.uniform("tB").unwrap().location, UniformLocation::Texture { index: 1 });
        assert!(layout.uniform("s").is_none());
        assert_eq!(layout.samplers().len(), 1);
        assert_eq!(layout.group_count(), 2);
    }

    #[test]
    fn shared_bindings_merge_visibility() {
        let source = "@group(0) @binding(0) var<uniform> uExposure: f32;";
        let vertex = reflect(source);
        let fragment = reflect(source);
        let layout = build_layout(&vertex, &fragment);

        assert_eq!(layout.blocks().len(), 1);
        assert_eq!(layout.blocks()[0].visibility, wgpu::ShaderStages::VERTEX_FRAGMENT);
        assert_eq!(layout.uniforms().len(), 1);
    }
}
