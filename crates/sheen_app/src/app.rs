use std::collections::HashMap;
use std::sync::Arc;

use glam::{Quat, Vec3};
use sheen_assets::{AssetEvent, AssetServer, Handle, TextureData, TextureFormat, primitives};
use sheen_core::{Camera, Time, Transform};
use sheen_renderer::{
    BoundUniforms, DiffuseModel, DrawCall, GpuGeometry, GpuProgram, IblMode, PbrMaterial,
    PbrProgram, PointLight, RenderContext, RenderError, ShadingConfig, TextureId, UniformSet,
    programs::pbr_program::names, write_lights,
};
use sheen_window::{AppHandler, Flow};
use winit::{keyboard::KeyCode, window::Window};

use crate::config::DemoConfig;

/// Which environment texture a pending load fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvSlot {
    Diffuse,
    Specular,
    BrdfLut,
}

#[derive(Default)]
struct EnvTextures {
    diffuse: Option<TextureId>,
    specular: Option<TextureId>,
    brdf_lut: Option<TextureId>,
}

impl EnvTextures {
    fn fill(&mut self, slot: EnvSlot, id: TextureId) {
        match slot {
            EnvSlot::Diffuse => self.diffuse = Some(id),
            EnvSlot::Specular => self.specular = Some(id),
            EnvSlot::BrdfLut => self.brdf_lut = Some(id),
        }
    }

    fn write_uniforms(&self, mode: IblMode, set: &mut UniformSet) {
        for (name, id) in [
            (names::ENV_DIFFUSE, self.diffuse),
            (names::ENV_SPECULAR, self.specular),
            (names::BRDF_LUT, self.brdf_lut),
        ] {
            if let Some(id) = id {
                set.set(name, id);
            }
        }
        mode.write_uniforms(
            self.diffuse.is_some(),
            self.specular.is_some() && self.brdf_lut.is_some(),
            set,
        );
    }
}

/// One sphere of the grid. Keeps one bound uniform block set per program
/// variant so switching variants never shows stale values from another cell.
struct Cell {
    transform: Transform,
    material: PbrMaterial,
    bound: Vec<BoundUniforms>,
}

/// Everything that needs a live window and GPU.
struct GpuState {
    render: RenderContext,
    sphere: GpuGeometry,
    /// Indexed like [`DiffuseModel::ALL`].
    programs: Vec<PbrProgram>,
    cells: Vec<Cell>,
    uniforms: UniformSet,
    env: EnvTextures,
}

/// The demo's application context. Constructed explicitly, driven by the
/// window loop through [`AppHandler`].
pub struct Application {
    config: DemoConfig,
    assets: AssetServer,
    camera: Camera,
    diffuse: DiffuseModel,
    ibl: IblMode,
    lights: Vec<PointLight>,
    pending: HashMap<Handle<TextureData>, EnvSlot>,
    gpu: Option<GpuState>,
}

impl Application {
    pub fn new(config: DemoConfig, assets: AssetServer) -> Self {
        let camera = Camera::at(Vec3::from_array(config.camera_position));
        Self {
            camera,
            diffuse: config.diffuse.into(),
            ibl: config.ibl.into(),
            lights: config.point_lights(),
            config,
            assets,
            pending: HashMap::new(),
            gpu: None,
        }
    }

    fn request_environment(&mut self) {
        let paths = self.config.assets.clone();
        for (slot, path) in [
            (EnvSlot::Diffuse, paths.diffuse_env),
            (EnvSlot::Specular, paths.specular_env),
            (EnvSlot::BrdfLut, paths.brdf_lut),
        ] {
            // Raw 8-bit data: RGBM and LUT values must not be sRGB decoded.
            let handle = self.assets.load_texture(path, TextureFormat::Rgba8Unorm);
            self.pending.insert(handle, slot);
        }
    }

    fn build_cells(&self, programs: &[PbrProgram]) -> Vec<Cell> {
        let grid = &self.config.grid;
        let columns = grid.roughness.len();
        let rows = grid.metallic.len();
        let origin = Vec3::new(
            -(columns.saturating_sub(1) as f32) * grid.spacing * 0.5,
            -(rows.saturating_sub(1) as f32) * grid.spacing * 0.5,
            0.0,
        );

        let mut cells = Vec::with_capacity(columns * rows);
        for (row, &metallic) in grid.metallic.iter().enumerate() {
            for (column, &roughness) in grid.roughness.iter().enumerate() {
                let center = origin + Vec3::new(column as f32, row as f32, 0.0) * grid.spacing;
                cells.push(Cell {
                    transform: Transform::from_xyz(center.x, center.y, center.z),
                    material: PbrMaterial::new(self.config.albedo, roughness, metallic),
                    bound: programs
                        .iter()
                        .map(|p| p.shader().new_bound_uniforms())
                        .collect(),
                });
            }
        }
        cells
    }

    fn program_index(&self) -> usize {
        DiffuseModel::ALL
            .iter()
            .position(|&m| m == self.diffuse)
            .unwrap_or(0)
    }

    /// Uploads every texture that finished decoding since the last frame.
    fn receive_assets(&mut self) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        for event in self.assets.poll() {
            let Some(slot) = self.pending.remove(&event.handle()) else {
                continue;
            };
            match event {
                AssetEvent::TextureLoaded { data, .. } => {
                    let id = gpu.render.upload_texture(&data);
                    gpu.env.fill(slot, id);
                }
                AssetEvent::TextureFailed { path, error, .. } => {
                    // Permanent: the IBL terms sampling this map stay off.
                    let error = RenderError::AssetUnavailable(format!(
                        "{slot:?} map {} ({error})",
                        path.display()
                    ));
                    log::warn!("{error}");
                }
            }
        }
    }

    fn animate_lights(&mut self, time: &Time) {
        if !self.config.animate_lights {
            return;
        }
        let rotation = Quat::from_rotation_y(time.elapsed_seconds() * self.config.light_speed);
        for (light, base) in self.lights.iter_mut().zip(&self.config.lights) {
            light.position = rotation * Vec3::from_array(base.position);
        }
    }
}

impl AppHandler for Application {
    fn init(&mut self, window: Arc<Window>) -> anyhow::Result<()> {
        let size = window.inner_size();
        let render = RenderContext::new(window)?;
        self.camera.set_viewport(size.width, size.height);

        let grid = &self.config.grid;
        let sphere = primitives::sphere(grid.radius, grid.segments, grid.segments)?;
        let sphere = render.upload_geometry(&sphere);

        let programs = DiffuseModel::ALL
            .iter()
            .map(|&diffuse| {
                PbrProgram::new(
                    &render.program_context(),
                    &ShadingConfig {
                        diffuse,
                        use_uv: false,
                    },
                )
            })
            .collect::<sheen_renderer::Result<Vec<_>>>()?;

        let cells = self.build_cells(&programs);
        log::info!(
            "Scene ready: {} spheres, {} program variants",
            cells.len(),
            programs.len()
        );

        self.gpu = Some(GpuState {
            render,
            sphere,
            programs,
            cells,
            uniforms: UniformSet::new(),
            env: EnvTextures::default(),
        });
        self.request_environment();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.render.resize(width, height);
        }
        self.camera.set_viewport(width, height);
    }

    fn frame(&mut self, time: &Time) -> anyhow::Result<()> {
        self.receive_assets();
        self.animate_lights(time);

        let program_index = self.program_index();
        let clear_color = self.config.clear_color();
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };

        // Frame-wide values first; per-cell values overwrite their own keys below.
        gpu.uniforms.set(names::CAMERA_POSITION, self.camera.position());
        write_lights(&self.lights, &mut gpu.uniforms);
        gpu.env.write_uniforms(self.ibl, &mut gpu.uniforms);

        let program = gpu.programs[program_index].shader();
        for cell in &mut gpu.cells {
            let model = cell.transform.compute_matrix();
            gpu.uniforms
                .set(names::LOCAL_TO_PROJECTION, self.camera.local_to_projection(&model))
                .set(names::MODEL_TRANSLATION, cell.transform.translation_matrix());
            cell.material.write_uniforms(&mut gpu.uniforms);
            gpu.render
                .bind(program, &gpu.uniforms, &mut cell.bound[program_index]);
        }

        let mut frame = gpu.render.begin_frame();
        frame.set_clear_color(clear_color);
        for cell in &gpu.cells {
            frame.draw(DrawCall::new(program, &gpu.sphere, &cell.bound[program_index]));
        }
        gpu.render.end_frame(frame)?;
        Ok(())
    }

    fn key(&mut self, code: KeyCode) -> Flow {
        let diffuse = match code {
            KeyCode::Escape => return Flow::Exit,
            KeyCode::KeyI => {
                self.ibl = self.ibl.next();
                log::info!("IBL: {:?}", self.ibl);
                return Flow::Continue;
            }
            KeyCode::Digit1 => DiffuseModel::Lambert,
            KeyCode::Digit2 => DiffuseModel::Burley,
            KeyCode::Digit3 => DiffuseModel::OrenNayar,
            _ => return Flow::Continue,
        };
        self.diffuse = diffuse;
        log::info!("Diffuse model: {diffuse:?}");
        Flow::Continue
    }

    fn teardown(&mut self) {
        // Dropping the state releases programs, buffers and textures.
        if self.gpu.take().is_some() {
            log::info!("Released GPU resources");
        }
        self.pending.clear();
    }
}
