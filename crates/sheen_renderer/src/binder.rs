//! Type-checked binding of a [`UniformSet`] onto a linked program.
//!
//! The binder never talks to the GPU. It writes values into CPU staging
//! blocks ([`BoundUniforms`]) laid out exactly like the program's uniform
//! buffers, and records which texture sits in which unit. The render context
//! uploads the staging blocks when the frame is submitted.

use std::collections::{BTreeMap, HashSet};

use glam::{Mat4, Vec3};

use crate::{
    error::RenderError,
    programs::reflection::{ProgramLayout, UniformLocation},
    uniform::{TextureId, UniformKind, UniformSet, UniformValue},
};

/// Answers whether a texture can be sampled yet.
pub trait TextureResidency {
    fn is_resident(&self, id: TextureId) -> bool;
}

impl TextureResidency for HashSet<TextureId> {
    fn is_resident(&self, id: TextureId) -> bool {
        self.contains(&id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSlot {
    pub unit: u32,
    pub texture: TextureId,
}

/// Staging copy of one program's parameters.
///
/// Lives as long as the draw it feeds, so a name missing from the next
/// [`UniformSet`] keeps its last bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundUniforms {
    blocks: Vec<Vec<u8>>,
    textures: BTreeMap<String, TextureSlot>,
}

impl BoundUniforms {
    /// Zeroed blocks sized for `layout`, no textures.
    pub fn new(layout: &ProgramLayout) -> Self {
        Self {
            blocks: layout
                .blocks()
                .iter()
                .map(|b| vec![0; b.size as usize])
                .collect(),
            textures: BTreeMap::new(),
        }
    }

    pub fn block(&self, index: usize) -> Option<&[u8]> {
        self.blocks.get(index).map(Vec::as_slice)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &[u8]> {
        self.blocks.iter().map(Vec::as_slice)
    }

    pub fn texture(&self, name: &str) -> Option<TextureSlot> {
        self.textures.get(name).copied()
    }

    pub fn textures(&self) -> impl Iterator<Item = (&str, TextureSlot)> {
        self.textures.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Decodes the currently staged value of `name`.
    pub fn read(&self, layout: &ProgramLayout, name: &str) -> Option<UniformValue> {
        let uniform = layout.uniform(name)?;
        match uniform.location {
            UniformLocation::Buffer { block, offset } => {
                let bytes = self.blocks.get(block)?;
                read_value(bytes, offset as usize, uniform.kind)
            }
            UniformLocation::Texture { .. } => self
                .textures
                .get(name)
                .map(|slot| UniformValue::Texture(slot.texture)),
        }
    }
}

/// Outcome of one [`UniformBinder::bind`] call.
#[derive(Debug, Default)]
pub struct BindReport {
    pub bound: usize,
    /// Names in the set the program does not declare. Expected, not an error.
    pub unknown: Vec<String>,
    pub errors: Vec<RenderError>,
}

impl BindReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn type_mismatches(&self) -> usize {
        self.errors
            .iter()
            .filter(|e| matches!(e, RenderError::TypeMismatch { .. }))
            .count()
    }
}

pub struct UniformBinder {
    max_texture_units: u32,
}

impl UniformBinder {
    pub fn new(max_texture_units: u32) -> Self {
        Self { max_texture_units }
    }

    pub fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    /// Applies every entry of `set` that `layout` declares.
    ///
    /// Each reflected uniform is handled independently: a failure skips that
    /// one uniform, leaves its previous value in `target`, and is recorded in
    /// the report. Binding the same set twice gives the same `target`.
    pub fn bind(
        &self,
        layout: &ProgramLayout,
        set: &UniformSet,
        residency: &dyn TextureResidency,
        target: &mut BoundUniforms,
    ) -> BindReport {
        let mut report = BindReport::default();

        for (name, _) in set.iter() {
            if layout.uniform(name).is_none() {
                log::trace!("Uniform '{name}' is not used by this program");
                report.unknown.push(name.to_string());
            }
        }

        for uniform in layout.uniforms() {
            let Some(value) = set.get(&uniform.name) else {
                continue;
            };

            if value.kind() != uniform.kind {
                report.errors.push(RenderError::TypeMismatch {
                    name: uniform.name.clone(),
                    expected: uniform.kind,
                    found: value.kind(),
                });
                continue;
            }

            match (uniform.location, value) {
                (UniformLocation::Buffer { block, offset }, value) => {
                    let written = target
                        .blocks
                        .get_mut(block)
                        .is_some_and(|bytes| write_value(bytes, offset as usize, value));
                    if !written {
                        report
                            .errors
                            .push(RenderError::LayoutMismatch(uniform.name.clone()));
                        continue;
                    }
                    report.bound += 1;
                }
                (UniformLocation::Texture { index }, UniformValue::Texture(id)) => {
                    let unit = index as u32;
                    if unit >= self.max_texture_units {
                        report.errors.push(RenderError::ResourceExhausted {
                            name: uniform.name.clone(),
                            unit,
                            limit: self.max_texture_units,
                        });
                        continue;
                    }
                    if !residency.is_resident(*id) {
                        report
                            .errors
                            .push(RenderError::TextureNotReady(uniform.name.clone()));
                        continue;
                    }
                    target.textures.insert(
                        uniform.name.clone(),
                        TextureSlot {
                            unit,
                            texture: *id,
                        },
                    );
                    report.bound += 1;
                }
                // Kinds already matched, so a texture value always meets a texture slot.
                (UniformLocation::Texture { .. }, _) => {}
            }
        }

        report
    }
}

/// Returns false when the range falls outside `block`.
fn write_bytes(block: &mut [u8], offset: usize, bytes: &[u8]) -> bool {
    match block.get_mut(offset..offset + bytes.len()) {
        Some(dst) => {
            dst.copy_from_slice(bytes);
            true
        }
        None => false,
    }
}

fn write_value(block: &mut [u8], offset: usize, value: &UniformValue) -> bool {
    match value {
        UniformValue::Float(v) => write_bytes(block, offset, bytemuck::bytes_of(v)),
        UniformValue::Bool(b) => write_bytes(block, offset, bytemuck::bytes_of(&u32::from(*b))),
        UniformValue::Vec3(v) => write_bytes(block, offset, bytemuck::cast_slice(&v.to_array())),
        UniformValue::Mat4(m) => {
            write_bytes(block, offset, bytemuck::cast_slice(&m.to_cols_array()))
        }
        UniformValue::Texture(_) => false,
    }
}

fn read_pod<T: bytemuck::Pod>(block: &[u8], offset: usize) -> Option<T> {
    let bytes = block.get(offset..offset + std::mem::size_of::<T>())?;
    Some(bytemuck::pod_read_unaligned(bytes))
}

fn read_value(block: &[u8], offset: usize, kind: UniformKind) -> Option<UniformValue> {
    match kind {
        UniformKind::Float => read_pod::<f32>(block, offset).map(UniformValue::Float),
        UniformKind::Bool => read_pod::<u32>(block, offset).map(|raw| UniformValue::Bool(raw != 0)),
        UniformKind::Vec3 => {
            read_pod::<[f32; 3]>(block, offset).map(|v| UniformValue::Vec3(Vec3::from_array(v)))
        }
        UniformKind::Mat4 => read_pod::<[f32; 16]>(block, offset)
            .map(|m| UniformValue::Mat4(Mat4::from_cols_array(&m))),
        UniformKind::Texture => None,
    }
}
