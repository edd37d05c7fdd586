//! CPU-side geometry: vertex attribute arrays plus an index buffer packed at
//! the narrowest integer width able to address every vertex.
//!
//! A [`Geometry`] owns no GPU state. The render context reads it once during
//! upload and never mutates it.

use glam::{Mat4, Vec3};

use crate::error::{AssetError, Result};

/// Storage width of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    /// Narrowest width that can represent the largest index, `vertex_count - 1`.
    ///
    /// `0` and `1` vertices both map to [`IndexWidth::U8`].
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        let max_index = vertex_count.saturating_sub(1);
        if max_index <= u8::MAX as usize {
            IndexWidth::U8
        } else if max_index <= u16::MAX as usize {
            IndexWidth::U16
        } else {
            IndexWidth::U32
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            IndexWidth::U8 => 1,
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

/// Index sequence stored at a fixed width, chosen once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    pub fn width(&self) -> IndexWidth {
        match self {
            IndexBuffer::U8(_) => IndexWidth::U8,
            IndexBuffer::U16(_) => IndexWidth::U16,
            IndexBuffer::U32(_) => IndexWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U8(v) => v.len(),
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            IndexBuffer::U8(v) => v.get(i).map(|&x| x as u32),
            IndexBuffer::U16(v) => v.get(i).map(|&x| x as u32),
            IndexBuffer::U32(v) => v.get(i).copied(),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            IndexBuffer::U8(v) => Box::new(v.iter().map(|&x| x as u32)),
            IndexBuffer::U16(v) => Box::new(v.iter().map(|&x| x as u32)),
            IndexBuffer::U32(v) => Box::new(v.iter().copied()),
        }
    }
}

/// Packs `indices` at the width [`IndexWidth::for_vertex_count`] picks.
///
/// Fails if any index is `>= vertex_count`.
pub fn create_index_buffer(indices: &[u32], vertex_count: usize) -> Result<IndexBuffer> {
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(AssetError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }

    // Every index is < vertex_count, so the narrowing casts below are lossless.
    let buffer = match IndexWidth::for_vertex_count(vertex_count) {
        IndexWidth::U8 => IndexBuffer::U8(indices.iter().map(|&i| i as u8).collect()),
        IndexWidth::U16 => IndexBuffer::U16(indices.iter().map(|&i| i as u16).collect()),
        IndexWidth::U32 => IndexBuffer::U32(indices.to_vec()),
    };
    Ok(buffer)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    Triangles,
    Lines,
    Points,
}

#[derive(Debug, Clone)]
pub struct Geometry {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Option<Vec<[f32; 2]>>,
    indices: IndexBuffer,
    mode: DrawMode,
}

impl Geometry {
    /// Normals are expected to be unit length already; they are not renormalized here.
    pub fn new(
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        uvs: Option<Vec<[f32; 2]>>,
        indices: IndexBuffer,
        mode: DrawMode,
    ) -> Result<Self> {
        let vertex_count = positions.len();
        if normals.len() != vertex_count {
            return Err(AssetError::AttributeCountMismatch {
                attribute: "normal",
                expected: vertex_count,
                found: normals.len(),
            });
        }
        if let Some(uvs) = &uvs {
            if uvs.len() != vertex_count {
                return Err(AssetError::AttributeCountMismatch {
                    attribute: "uv",
                    expected: vertex_count,
                    found: uvs.len(),
                });
            }
        }
        if let Some(index) = indices.iter().find(|&i| i as usize >= vertex_count) {
            return Err(AssetError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        Ok(Self {
            positions,
            normals,
            uvs,
            indices,
            mode,
        })
    }

    /// Builds the index buffer from 32-bit indices, packing it narrower when possible.
    pub fn from_indices(
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        uvs: Option<Vec<[f32; 2]>>,
        indices: &[u32],
    ) -> Result<Self> {
        let indices = create_index_buffer(indices, positions.len())?;
        Self::new(positions, normals, uvs, indices, DrawMode::Triangles)
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn uvs(&self) -> Option<&[[f32; 2]]> {
        self.uvs.as_deref()
    }

    pub fn indices(&self) -> &IndexBuffer {
        &self.indices
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Bakes an affine transform into the positions, in place.
    ///
    /// Normals are left untouched: after a non-uniform scale they no longer
    /// match the surface. Prefer a per-instance model matrix when the
    /// original shape is still needed.
    pub fn translate(&mut self, matrix: &Mat4) {
        for p in &mut self.positions {
            let v = *matrix * Vec3::from_array(*p).extend(1.0);
            *p = [v.x, v.y, v.z];
        }
        log::debug!("baked transform into {} vertices", self.positions.len());
    }

    /// Adds `offset` to every position, in place.
    pub fn translate_by_vector(&mut self, offset: Vec3) {
        for p in &mut self.positions {
            *p = (Vec3::from_array(*p) + offset).to_array();
        }
        log::debug!(
            "baked offset {offset} into {} vertices",
            self.positions.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Geometry {
        Geometry::from_indices(
            vec![
                [-1.0, -1.0, 0.0],
                [1.0, -1.0, 0.0],
                [1.0, 1.0, 0.0],
                [-1.0, 1.0, 0.0],
            ],
            vec![[0.0, 0.0, 1.0]; 4],
            None,
            &[0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    #[test]
    fn width_boundaries() {
        let cases = [
            (0, IndexWidth::U8),
            (1, IndexWidth::U8),
            (2, IndexWidth::U8),
            (256, IndexWidth::U8),
            (257, IndexWidth::U16),
            (300, IndexWidth::U16),
            (40_000, IndexWidth::U16),
            (65_536, IndexWidth::U16),
            (65_537, IndexWidth::U32),
        ];
        for (count, expected) in cases {
            assert_eq!(IndexWidth::for_vertex_count(count), expected, "vertex count {count}");
        }
    }

    #[test]
    fn create_index_buffer_handles_degenerate_counts() {
        let empty = create_index_buffer(&[], 0).unwrap();
        assert_eq!(empty.width(), IndexWidth::U8);
        assert!(empty.is_empty());

        let single = create_index_buffer(&[0, 0, 0], 1).unwrap();
        assert_eq!(single, IndexBuffer::U8(vec![0, 0, 0]));
    }

    #[test]
    fn create_index_buffer_rejects_out_of_range_index() {
        let err = create_index_buffer(&[0, 1, 3], 3).unwrap_err();
        assert!(matches!(
            err,
            AssetError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            }
        ));
    }

    #[test]
    fn create_index_buffer_keeps_values_when_packing() {
        let indices = [0, 299, 150];
        let buffer = create_index_buffer(&indices, 300).unwrap();
        assert_eq!(buffer, IndexBuffer::U16(vec![0, 299, 150]));
        assert_eq!(buffer.iter().collect::<Vec<_>>(), indices);
    }

    #[test]
    fn geometry_rejects_mismatched_attributes() {
        let err = Geometry::from_indices(
            vec![[0.0; 3]; 3],
            vec![[0.0, 1.0, 0.0]; 2],
            None,
            &[0, 1, 2],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AssetError::AttributeCountMismatch {
                attribute: "normal",
                ..
            }
        ));
    }

    #[test]
    fn translate_by_vector_moves_positions_only() {
        let mut geometry = quad();
        let normals_before = geometry.normals().to_vec();

        geometry.translate_by_vector(Vec3::new(-0.5, 0.5, 0.0));

        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(geometry.positions()[0], [-1.5, -0.5, 0.0]);
        assert_eq!(geometry.positions()[2], [0.5, 1.5, 0.0]);
        assert_eq!(geometry.normals(), normals_before.as_slice());
    }

    #[test]
    fn translate_bakes_affine_matrix() {
        let mut geometry = quad();
        let matrix = Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0))
            * Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));

        geometry.translate(&matrix);

        assert_eq!(geometry.positions()[1], [2.0, -1.0, 2.0]);
        // Normals are not corrected for the non-uniform scale.
        assert_eq!(geometry.normals()[1], [0.0, 0.0, 1.0]);
    }
}
