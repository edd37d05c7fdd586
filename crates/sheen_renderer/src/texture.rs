use std::collections::HashMap;

use sheen_assets::{TextureData, TextureFormat};
use wgpu::{
    Device, Extent3d, Queue, SurfaceConfiguration, TextureDescriptor, TextureDimension,
    TextureUsages,
};

use crate::{binder::TextureResidency, uniform::TextureId};

pub struct TextureHelper;

impl TextureHelper {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float; // Standard depth format

    pub fn create_depth_texture(
        device: &Device,
        config: &SurfaceConfiguration,
        label: &str,
    ) -> wgpu::TextureView {
        let size = Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let desc = TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        };

        let texture = device.create_texture(&desc);
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}

fn wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

/// A sampled 2D texture living on the GPU.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn from_data(device: &Device, queue: &Queue, data: &TextureData) -> Self {
        let size = Extent3d {
            width: data.width.max(1),
            height: data.height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&TextureDescriptor {
            label: Some(&data.name),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: wgpu_format(data.format),
            // COPY_DST: we fill it right below
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(data.bytes_per_row()),
                rows_per_image: Some(data.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Every texture the context has uploaded, plus the stand-in used for slots
/// with nothing resident.
pub struct TextureCache {
    textures: HashMap<TextureId, GpuTexture>,
    fallback: GpuTexture,
}

impl TextureCache {
    pub fn new(device: &Device, queue: &Queue) -> Self {
        // Zero RGBM decodes to black, so an empty environment slot adds no light.
        let fallback = GpuTexture::from_data(
            device,
            queue,
            &TextureData::solid("Default Black Texture", [0, 0, 0, 0]),
        );
        Self {
            textures: HashMap::new(),
            fallback,
        }
    }

    pub fn insert(&mut self, id: TextureId, texture: GpuTexture) {
        if self.textures.insert(id, texture).is_some() {
            log::debug!("Replaced texture {:?}", id.0);
        }
    }

    pub fn remove(&mut self, id: TextureId) -> Option<GpuTexture> {
        self.textures.remove(&id)
    }

    pub fn get(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(&id)
    }

    /// View for `id`, or the fallback when it is missing.
    pub fn view_or_fallback(&self, id: Option<TextureId>) -> &wgpu::TextureView {
        id.and_then(|id| self.textures.get(&id))
            .map_or(&self.fallback.view, |t| &t.view)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl TextureResidency for TextureCache {
    fn is_resident(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }
}
