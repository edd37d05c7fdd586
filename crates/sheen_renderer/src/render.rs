//! The render context and its per-frame lifecycle.
//!
//! ```text
//! begin_frame -> Frame::draw (repeated) -> end_frame
//! ```
//!
//! Draws only record what to do. `end_frame` writes each draw's staged
//! uniforms into that draw's own buffers (draw slots, reused frame to frame),
//! then encodes one render pass, submits and presents.

use std::collections::HashMap;
use std::sync::Arc;

use sheen_assets::{Geometry, TextureData};
use uuid::Uuid;
use wgpu::{Device, Queue, Surface, SurfaceConfiguration};
use winit::window::Window;

use crate::{
    binder::{BindReport, BoundUniforms, UniformBinder},
    error::{RenderError, Result},
    mesh::GpuGeometry,
    programs::{GpuProgramRenderContext, PipelineState, ShaderProgram},
    texture::{GpuTexture, TextureCache, TextureHelper},
    uniform::{TextureId, UniformSet},
};

pub struct RenderContext {
    pub device: Device,
    pub queue: Queue,
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    depth_texture: wgpu::TextureView,
    textures: TextureCache,
    /// Uniform buffers per program, one entry per draw of that program in a frame.
    draw_slots: HashMap<Uuid, Vec<Vec<wgpu::Buffer>>>,
    max_texture_units: u32,
}

impl RenderContext {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        log::info!("Initializing GPU");
        let size = window.inner_size();

        // 1. Create the Instance (Vulkan/Metal/DX12)
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        // 2. Create Surface (The canvas on the window). The Arc keeps the window alive.
        let surface = instance.create_surface(window)?;

        // 3. Request Adapter (Physical GPU)
        // We use 'pollster' to block on this async function
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::AdapterRequest(e.to_string()))?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        // 4. Request Device (Logical GPU connection)
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Sheen Device"),
            ..Default::default()
        }))?;

        // 5. Configure the Surface
        // The fragment stage encodes to sRGB itself, so prefer a linear target.
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| RenderError::AdapterRequest("surface reports no formats".into()))?;
        if format.is_srgb() {
            log::warn!("Only sRGB surface formats available; output will be encoded twice");
        }

        let config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync On
            desired_maximum_frame_latency: 2,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth_texture = TextureHelper::create_depth_texture(&device, &config, "Depth Texture");
        let textures = TextureCache::new(&device, &queue);
        let max_texture_units = device.limits().max_sampled_textures_per_shader_stage;

        log::info!(
            "Renderer ready: {}x{} {:?}, {} texture units",
            config.width,
            config.height,
            config.format,
            max_texture_units
        );

        Ok(Self {
            device,
            queue,
            surface,
            config,
            depth_texture,
            textures,
            draw_slots: HashMap::new(),
            max_texture_units,
        })
    }

    /// Reconfigures the surface. Zero sizes (minimized window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureHelper::create_depth_texture(&self.device, &self.config, "Depth Texture");
        log::debug!("Surface resized to {width}x{height}");
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    pub fn program_context(&self) -> GpuProgramRenderContext<'_> {
        GpuProgramRenderContext {
            device: &self.device,
            queue: &self.queue,
            format: self.config.format,
        }
    }

    pub fn binder(&self) -> UniformBinder {
        UniformBinder::new(self.max_texture_units)
    }

    /// Binds `set` for `program` and logs every skipped uniform.
    pub fn bind(
        &self,
        program: &ShaderProgram,
        set: &UniformSet,
        target: &mut BoundUniforms,
    ) -> BindReport {
        let report = self
            .binder()
            .bind(program.layout(), set, &self.textures, target);
        for error in &report.errors {
            match error {
                // Expected while assets stream in.
                RenderError::TextureNotReady(_) => log::debug!("{}: {error}", program.label()),
                _ => log::warn!("{}: {error}", program.label()),
            }
        }
        report
    }

    pub fn upload_geometry(&self, geometry: &Geometry) -> GpuGeometry {
        GpuGeometry::upload(&self.device, geometry)
    }

    /// Uploads `data` and returns the id uniform sets refer to it by.
    pub fn upload_texture(&mut self, data: &TextureData) -> TextureId {
        let id = TextureId::new();
        let texture = GpuTexture::from_data(&self.device, &self.queue, data);
        self.textures.insert(id, texture);
        log::info!("Uploaded texture '{}' ({}x{})", data.name, data.width, data.height);
        id
    }

    pub fn release_texture(&mut self, id: TextureId) -> bool {
        self.textures.remove(id).is_some()
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    /// Starts recording a frame: depth test on, back faces culled.
    pub fn begin_frame<'a>(&self) -> Frame<'a> {
        Frame {
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            },
            depth_test: true,
            cull_mode: Some(wgpu::Face::Back),
            draws: Vec::new(),
        }
    }

    /// Uploads staged uniforms, encodes every recorded draw, submits and presents.
    ///
    /// A lost or outdated surface is reconfigured and the frame is dropped.
    pub fn end_frame(&mut self, frame: Frame<'_>) -> Result<()> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out acquiring the next frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut cursors: HashMap<Uuid, usize> = HashMap::new();
        let mut prepared = Vec::with_capacity(frame.draws.len());

        for draw in &frame.draws {
            let program = draw.program;
            let cursor = cursors.entry(program.id()).or_insert(0);
            let slots = self.draw_slots.entry(program.id()).or_default();
            if slots.len() <= *cursor {
                slots.push(program.create_uniform_buffers(&self.device));
            }
            let buffers = &slots[*cursor];
            *cursor += 1;

            for (buffer, bytes) in buffers.iter().zip(draw.uniforms.blocks()) {
                self.queue.write_buffer(buffer, 0, bytes);
            }

            prepared.push(PreparedDraw {
                pipeline: program.pipeline(&self.device, draw.state),
                bind_groups: program.create_bind_groups(
                    &self.device,
                    buffers,
                    &draw.uniforms,
                    &self.textures,
                ),
                geometry: draw.geometry,
            });
        }

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0), // Clear to "Far" (1.0)
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for draw in &prepared {
                render_pass.set_pipeline(&draw.pipeline);
                for (group, bind_group) in draw.bind_groups.iter().enumerate() {
                    render_pass.set_bind_group(group as u32, bind_group, &[]);
                }
                render_pass.set_vertex_buffer(0, draw.geometry.vertex_buffer.slice(..));
                render_pass.set_index_buffer(
                    draw.geometry.index_buffer.slice(..),
                    draw.geometry.index_format,
                );
                render_pass.draw_indexed(0..draw.geometry.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

struct PreparedDraw<'a> {
    pipeline: wgpu::RenderPipeline,
    bind_groups: Vec<wgpu::BindGroup>,
    geometry: &'a GpuGeometry,
}

/// One draw request: program, its bound uniforms and the geometry.
pub struct DrawCall<'a> {
    program: &'a ShaderProgram,
    geometry: &'a GpuGeometry,
    uniforms: &'a BoundUniforms,
    depth_test: Option<bool>,
    cull_mode: Option<Option<wgpu::Face>>,
}

impl<'a> DrawCall<'a> {
    pub fn new(
        program: &'a ShaderProgram,
        geometry: &'a GpuGeometry,
        uniforms: &'a BoundUniforms,
    ) -> Self {
        Self {
            program,
            geometry,
            uniforms,
            depth_test: None,
            cull_mode: None,
        }
    }

    /// Overrides the frame's depth test for this draw only.
    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = Some(enabled);
        self
    }

    /// Overrides the frame's culling for this draw only.
    pub fn with_cull_mode(mut self, cull_mode: Option<wgpu::Face>) -> Self {
        self.cull_mode = Some(cull_mode);
        self
    }
}

struct QueuedDraw<'a> {
    program: &'a ShaderProgram,
    geometry: &'a GpuGeometry,
    /// Snapshot taken at draw time, so the caller may rebind right away.
    uniforms: BoundUniforms,
    state: PipelineState,
}

/// Draws recorded between [`RenderContext::begin_frame`] and
/// [`RenderContext::end_frame`].
pub struct Frame<'a> {
    clear_color: wgpu::Color,
    depth_test: bool,
    cull_mode: Option<wgpu::Face>,
    draws: Vec<QueuedDraw<'a>>,
}

impl<'a> Frame<'a> {
    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    /// Frame-wide depth test, applied to every draw without an override.
    pub fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    pub fn set_cull_mode(&mut self, cull_mode: Option<wgpu::Face>) {
        self.cull_mode = cull_mode;
    }

    pub fn draw(&mut self, call: DrawCall<'a>) {
        if call.geometry.index_count == 0 {
            log::debug!("Skipping draw of empty geometry with '{}'", call.program.label());
            return;
        }

        let state = PipelineState {
            depth_test: call.depth_test.unwrap_or(self.depth_test),
            cull_mode: call.cull_mode.unwrap_or(self.cull_mode),
            topology: call.geometry.topology,
        };
        self.draws.push(QueuedDraw {
            program: call.program,
            geometry: call.geometry,
            uniforms: call.uniforms.clone(),
            state,
        });
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }
}
