use std::cell::RefCell;
use std::collections::HashMap;

use uuid::Uuid;

use super::{CompiledProgram, GpuProgramRenderContext, ProgramLayout};
use crate::{binder::BoundUniforms, mesh::Vertex, texture::TextureCache, texture::TextureHelper};

/// Fixed-function state a pipeline is specialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineState {
    pub depth_test: bool,
    pub cull_mode: Option<wgpu::Face>,
    pub topology: wgpu::PrimitiveTopology,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            depth_test: true,
            cull_mode: Some(wgpu::Face::Back),
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }
}

/// A linked program on the GPU.
///
/// Bind group layouts come straight from the reflected [`ProgramLayout`].
/// Render pipelines are created lazily, one per [`PipelineState`], and cached.
/// Single-threaded: only the render thread touches it.
pub struct ShaderProgram {
    id: Uuid,
    compiled: CompiledProgram,
    vertex_module: wgpu::ShaderModule,
    fragment_module: wgpu::ShaderModule,
    bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    format: wgpu::TextureFormat,
    pipelines: RefCell<HashMap<PipelineState, wgpu::RenderPipeline>>,
}

impl ShaderProgram {
    pub fn new(ctx: &GpuProgramRenderContext, compiled: CompiledProgram) -> Self {
        let device = ctx.device;
        let label = compiled.label.clone();

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} Vertex Shader")),
            source: wgpu::ShaderSource::Wgsl(compiled.vertex.wgsl.clone().into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} Fragment Shader")),
            source: wgpu::ShaderSource::Wgsl(compiled.fragment.wgsl.clone().into()),
        });

        let bind_group_layouts: Vec<wgpu::BindGroupLayout> = (0..compiled.layout.group_count())
            .map(|group| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{label} Bind Group Layout {group}")),
                    entries: &layout_entries(&compiled.layout, group),
                })
            })
            .collect();

        let layout_refs: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} Pipeline Layout")),
            bind_group_layouts: &layout_refs,
            push_constant_ranges: &[],
        });

        // Equirect maps wrap around horizontally but not across the poles.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        log::info!(
            "Program '{label}' ready: {} bind groups, {} uniforms",
            bind_group_layouts.len(),
            compiled.layout.uniforms().len()
        );

        Self {
            id: Uuid::new_v4(),
            compiled,
            vertex_module,
            fragment_module,
            bind_group_layouts,
            pipeline_layout,
            sampler,
            format: ctx.format,
            pipelines: RefCell::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.compiled.label
    }

    pub fn layout(&self) -> &ProgramLayout {
        &self.compiled.layout
    }

    pub fn compiled(&self) -> &CompiledProgram {
        &self.compiled
    }

    /// Zeroed staging blocks for this program.
    pub fn new_bound_uniforms(&self) -> BoundUniforms {
        BoundUniforms::new(&self.compiled.layout)
    }

    /// The cached pipeline for `state`, created on first use.
    pub fn pipeline(&self, device: &wgpu::Device, state: PipelineState) -> wgpu::RenderPipeline {
        if let Some(pipeline) = self.pipelines.borrow().get(&state) {
            return pipeline.clone();
        }

        log::debug!("Creating pipeline for '{}' with {state:?}", self.label());
        let pipeline = self.create_pipeline(device, state);
        self.pipelines.borrow_mut().insert(state, pipeline.clone());
        pipeline
    }

    fn create_pipeline(&self, device: &wgpu::Device, state: PipelineState) -> wgpu::RenderPipeline {
        let depth_stencil = if state.depth_test {
            wgpu::DepthStencilState {
                format: TextureHelper::DEPTH_FORMAT,
                depth_write_enabled: true,                  // Write Z-values
                depth_compare: wgpu::CompareFunction::Less, // Closer pixels win
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }
        } else {
            // The pass always carries a depth target, so the format must match.
            wgpu::DepthStencilState {
                format: TextureHelper::DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some(self.label()),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.vertex_module,
                entry_point: Some(&self.compiled.vertex.entry_point),
                compilation_options: Default::default(),
                buffers: &[Vertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.fragment_module,
                entry_point: Some(&self.compiled.fragment.entry_point),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            depth_stencil: Some(depth_stencil),
            primitive: wgpu::PrimitiveState {
                topology: state.topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: state.cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }

    /// One buffer per uniform block, for one draw slot.
    pub fn create_uniform_buffers(&self, device: &wgpu::Device) -> Vec<wgpu::Buffer> {
        self.compiled
            .layout
            .blocks()
            .iter()
            .map(|block| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&block.name),
                    size: block.size as wgpu::BufferAddress,
                    // COPY_DST: staged values are written every frame
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect()
    }

    /// Bind groups for one draw. Texture slots with nothing bound get the
    /// cache's fallback texture.
    pub fn create_bind_groups(
        &self,
        device: &wgpu::Device,
        buffers: &[wgpu::Buffer],
        uniforms: &BoundUniforms,
        textures: &TextureCache,
    ) -> Vec<wgpu::BindGroup> {
        let layout = &self.compiled.layout;

        self.bind_group_layouts
            .iter()
            .enumerate()
            .map(|(group, bind_group_layout)| {
                let group = group as u32;
                let mut entries = Vec::new();

                for (block, buffer) in layout.blocks().iter().zip(buffers) {
                    if block.group == group {
                        entries.push(wgpu::BindGroupEntry {
                            binding: block.binding,
                            resource: buffer.as_entire_binding(),
                        });
                    }
                }
                for texture in layout.textures().iter().filter(|t| t.group == group) {
                    let bound = uniforms.texture(&texture.name).map(|slot| slot.texture);
                    entries.push(wgpu::BindGroupEntry {
                        binding: texture.binding,
                        resource: wgpu::BindingResource::TextureView(
                            textures.view_or_fallback(bound),
                        ),
                    });
                }
                for sampler in layout.samplers().iter().filter(|s| s.group == group) {
                    entries.push(wgpu::BindGroupEntry {
                        binding: sampler.binding,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    });
                }

                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Draw Bind Group"),
                    layout: bind_group_layout,
                    entries: &entries,
                })
            })
            .collect()
    }
}

fn layout_entries(layout: &ProgramLayout, group: u32) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::new();

    for block in layout.blocks().iter().filter(|b| b.group == group) {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: block.binding,
            visibility: block.visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
    }
    for texture in layout.textures().iter().filter(|t| t.group == group) {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: texture.binding,
            visibility: texture.visibility,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        });
    }
    for sampler in layout.samplers().iter().filter(|s| s.group == group) {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: sampler.binding,
            visibility: sampler.visibility,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }

    entries
}
