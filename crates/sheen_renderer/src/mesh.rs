use std::mem;

use bytemuck::{Pod, Zeroable};
use sheen_assets::{DrawMode, Geometry, IndexBuffer};
use wgpu::util::DeviceExt;

// 1. The GPU-Compatible Vertex
// #[repr(C)] ensures C-like memory layout (needed for graphics drivers)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3], // X, Y, Z
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0, // @location(0) in shader
                    format: wgpu::VertexFormat::Float32x3, // position
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: (mem::size_of::<[f32; 3]>() * 2) as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Interleaves the attribute arrays (SoA -> AoS). Missing UVs become zero.
pub fn interleave(geometry: &Geometry) -> Vec<Vertex> {
    let uvs = geometry.uvs();
    geometry
        .positions()
        .iter()
        .zip(geometry.normals())
        .enumerate()
        .map(|(i, (&position, &normal))| Vertex {
            position,
            normal,
            uv: uvs.and_then(|uvs| uvs.get(i).copied()).unwrap_or([0.0; 2]),
        })
        .collect()
}

/// Index bytes as the GPU will read them.
///
/// WebGPU has no 8-bit index format, so `U8` buffers are widened to 16 bits
/// here. The CPU buffer keeps its width.
pub fn index_bytes(indices: &IndexBuffer) -> (Vec<u8>, wgpu::IndexFormat) {
    match indices {
        IndexBuffer::U8(v) => {
            let widened: Vec<u16> = v.iter().map(|&i| i as u16).collect();
            (bytemuck::cast_slice(&widened).to_vec(), wgpu::IndexFormat::Uint16)
        }
        IndexBuffer::U16(v) => (bytemuck::cast_slice(v).to_vec(), wgpu::IndexFormat::Uint16),
        IndexBuffer::U32(v) => (bytemuck::cast_slice(v).to_vec(), wgpu::IndexFormat::Uint32),
    }
}

pub fn topology(mode: DrawMode) -> wgpu::PrimitiveTopology {
    match mode {
        DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
        DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
        DrawMode::Points => wgpu::PrimitiveTopology::PointList,
    }
}

/// GPU copy of a [`Geometry`]. Immutable once uploaded.
pub struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_format: wgpu::IndexFormat,
    pub index_count: u32,
    pub topology: wgpu::PrimitiveTopology,
}

impl GpuGeometry {
    pub fn upload(device: &wgpu::Device, geometry: &Geometry) -> Self {
        let vertices = interleave(geometry);
        let (indices, index_format) = index_bytes(geometry.indices());

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: &indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!(
            "Uploaded geometry: {} vertices, {} indices ({:?} on the CPU, {:?} on the GPU)",
            vertices.len(),
            geometry.indices().len(),
            geometry.indices().width(),
            index_format
        );

        Self {
            vertex_buffer,
            index_buffer,
            index_format,
            index_count: geometry.indices().len() as u32,
            topology: topology(geometry.mode()),
        }
    }
}

#[cfg(test)]
mod tests {
    use sheen_assets::{IndexWidth, primitives};

    use super::*;

    #[test]
    fn eight_bit_indices_widen_on_gpu_only() {
        let geometry = primitives::triangle().unwrap();
        assert_eq!(geometry.indices().width(), IndexWidth::U8);

        let (bytes, format) = index_bytes(geometry.indices());
        assert_eq!(format, wgpu::IndexFormat::Uint16);
        assert_eq!(bytes, bytemuck::cast_slice::<u16, u8>(&[0, 1, 2]));
        assert_eq!(geometry.indices().width(), IndexWidth::U8);
    }

    #[test]
    fn wide_indices_keep_their_format() {
        let (_, format) = index_bytes(&IndexBuffer::U32(vec![0, 70_000]));
        assert_eq!(format, wgpu::IndexFormat::Uint32);
    }

    #[test]
    fn interleave_fills_missing_uvs_with_zero() {
        let geometry = Geometry::from_indices(
            vec![[1.0, 2.0, 3.0]],
            vec![[0.0, 1.0, 0.0]],
            None,
            &[0, 0, 0],
        )
        .unwrap();

        let vertices = interleave(&geometry);
        assert_eq!(
            vertices,
            [Vertex {
                position: [1.0, 2.0, 3.0],
                normal: [0.0, 1.0, 0.0],
                uv: [0.0, 0.0],
            }]
        );
        assert_eq!(mem::size_of::<Vertex>(), 32);
    }
}
