use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use sheen_renderer::{DiffuseModel, IblMode, PointLight};
use sheen_window::WindowSettings;

#[derive(Parser, Debug, Default)]
#[command(version, about = "Physically based shading demo: a grid of spheres under point lights and IBL")]
pub struct Cli {
    /// JSON file with demo settings. Missing fields keep their defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Diffuse model to start with.
    #[arg(long, value_enum)]
    pub diffuse: Option<DiffuseChoice>,

    /// Image based lighting terms to start with.
    #[arg(long, value_enum)]
    pub ibl: Option<IblChoice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DiffuseChoice {
    #[default]
    Lambert,
    Burley,
    OrenNayar,
}

impl From<DiffuseChoice> for DiffuseModel {
    fn from(choice: DiffuseChoice) -> Self {
        match choice {
            DiffuseChoice::Lambert => DiffuseModel::Lambert,
            DiffuseChoice::Burley => DiffuseModel::Burley,
            DiffuseChoice::OrenNayar => DiffuseModel::OrenNayar,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IblChoice {
    Off,
    Diffuse,
    Specular,
    #[default]
    Full,
}

impl From<IblChoice> for IblMode {
    fn from(choice: IblChoice) -> Self {
        match choice {
            IblChoice::Off => IblMode::Off,
            IblChoice::Diffuse => IblMode::Diffuse,
            IblChoice::Specular => IblMode::Specular,
            IblChoice::Full => IblMode::Full,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Sheen PBR".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl From<&WindowConfig> for WindowSettings {
    fn from(config: &WindowConfig) -> Self {
        Self {
            title: config.title.clone(),
            width: config.width,
            height: config.height,
        }
    }
}

/// Sphere grid: one column per roughness value, one row per metallic value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub roughness: Vec<f32>,
    pub metallic: Vec<f32>,
    pub spacing: f32,
    pub radius: f32,
    pub segments: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        let ramp = vec![0.0, 0.25, 0.5, 0.75, 1.0];
        Self {
            roughness: ramp.clone(),
            metallic: ramp,
            spacing: 0.35,
            radius: 0.15,
            segments: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub intensity: f32,
}

impl From<&LightConfig> for PointLight {
    fn from(config: &LightConfig) -> Self {
        PointLight::new(Vec3::from_array(config.position), config.intensity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    /// RGBM irradiance map.
    pub diffuse_env: PathBuf,
    /// RGBM map with the prefiltered specular levels packed side by side.
    pub specular_env: PathBuf,
    pub brdf_lut: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            diffuse_env: PathBuf::from("assets/env_diffuse.png"),
            specular_env: PathBuf::from("assets/env_specular.png"),
            brdf_lut: PathBuf::from("assets/ggx-brdf-integrated.png"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub window: WindowConfig,
    pub clear_color: [f64; 4],
    /// Display-encoded base color shared by every sphere.
    pub albedo: [u8; 3],
    pub grid: GridConfig,
    pub camera_position: [f32; 3],
    pub lights: Vec<LightConfig>,
    pub diffuse: DiffuseChoice,
    pub ibl: IblChoice,
    pub assets: AssetPaths,
    /// Lights orbit the Y axis when enabled.
    pub animate_lights: bool,
    /// Radians per second.
    pub light_speed: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            clear_color: [0.05, 0.05, 0.05, 1.0],
            albedo: [255, 255, 255],
            grid: GridConfig::default(),
            camera_position: [0.0, 0.0, 2.0],
            lights: vec![
                LightConfig {
                    position: [1.0, 1.0, 2.0],
                    intensity: 1.0,
                },
                LightConfig {
                    position: [-1.0, -1.0, 2.0],
                    intensity: 0.5,
                },
            ],
            diffuse: DiffuseChoice::default(),
            ibl: IblChoice::default(),
            assets: AssetPaths::default(),
            animate_lights: true,
            light_speed: 0.5,
        }
    }
}

impl DemoConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Invalid demo configuration")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("In {}", path.display()))
    }

    /// File settings (or defaults), then command line overrides.
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(diffuse) = cli.diffuse {
            config.diffuse = diffuse;
        }
        if let Some(ibl) = cli.ibl {
            config.ibl = ibl;
        }
        Ok(config)
    }

    pub fn point_lights(&self) -> Vec<PointLight> {
        self.lights.iter().map(PointLight::from).collect()
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }
}
