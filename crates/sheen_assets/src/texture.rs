use std::path::Path;

use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8Unorm,     // Raw 32-bit data (RGBM environment maps, lookup tables)
    Rgba8UnormSrgb, // Color textures sampled with hardware sRGB decode
}

/// Decoded pixels waiting for upload. Always 4 channels, 8 bits each.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub name: String,
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl TextureData {
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Decodes an encoded image (PNG, JPEG, ...) held in memory.
    pub fn decode(name: &str, bytes: &[u8], format: TextureFormat) -> Result<Self> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();

        Ok(Self {
            name: name.to_string(),
            width,
            height,
            pixels: img.into_raw(),
            format,
        })
    }

    /// Reads and decodes an image file.
    pub fn open(path: &Path, format: TextureFormat) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::decode(&path.display().to_string(), &bytes, format)
    }

    /// 1x1 texture of a single color, used as a stand-in for missing textures.
    pub fn solid(name: &str, rgba: [u8; 4]) -> Self {
        Self {
            name: name.to_string(),
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
            format: TextureFormat::Rgba8Unorm,
        }
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.width * Self::BYTES_PER_PIXEL
    }

    /// Texel at integer coordinates, clamped to the image edges.
    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let offset = ((y * self.width + x) * Self::BYTES_PER_PIXEL) as usize;
        match self.pixels.get(offset..offset + 4) {
            Some(p) => [p[0], p[1], p[2], p[3]],
            None => [0; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_png_round_trip() {
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([10, 20, 30, 40]));
        img.put_pixel(1, 0, image::Rgba([50, 60, 70, 80]));
        let mut encoded = std::io::Cursor::new(Vec::new());
        img.write_to(&mut encoded, image::ImageFormat::Png).unwrap();

        let data = TextureData::decode("tiny", encoded.get_ref(), TextureFormat::Rgba8Unorm).unwrap();

        assert_eq!((data.width, data.height), (2, 1));
        assert_eq!(data.texel(1, 0), [50, 60, 70, 80]);
        // Out-of-range lookups clamp to the edge.
        assert_eq!(data.texel(7, 3), [50, 60, 70, 80]);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = TextureData::decode("bad", b"definitely not a png", TextureFormat::Rgba8Unorm);
        assert!(err.is_err());
    }
}
