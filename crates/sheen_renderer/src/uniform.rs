use std::collections::HashMap;
use std::fmt;

use glam::{Mat4, Vec3};
use uuid::Uuid;

/// Identifies a texture owned by the render context's texture cache.
/// Uniform sets only reference textures, they never own them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub Uuid);

impl TextureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TextureId {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of value a reflected uniform accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Bool,
    Vec3,
    Mat4,
    Texture,
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformKind::Float => "float",
            UniformKind::Bool => "bool",
            UniformKind::Vec3 => "vec3",
            UniformKind::Mat4 => "mat4",
            UniformKind::Texture => "texture",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Bool(bool),
    Vec3(Vec3),
    Mat4(Mat4),
    Texture(TextureId),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Bool(_) => UniformKind::Bool,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Texture(_) => UniformKind::Texture,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(Vec3::from_array(v))
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<TextureId> for UniformValue {
    fn from(v: TextureId) -> Self {
        UniformValue::Texture(v)
    }
}

/// Named parameters for one or more draws, keyed by dotted path
/// (`"uMaterial.roughness"`, `"uLights[0].position"`).
///
/// A set may carry keys a program does not declare; the binder skips them,
/// so one set can feed every shader variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformSet {
    values: HashMap<String, UniformValue>,
}

impl UniformSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `name`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<UniformValue> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_existing_key() {
        let mut set = UniformSet::new();
        set.set("uMaterial.roughness", 0.25).set("uMaterial.roughness", 0.75);

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("uMaterial.roughness"), Some(&UniformValue::Float(0.75)));
    }

    #[test]
    fn value_kinds_follow_tags() {
        assert_eq!(UniformValue::from(true).kind(), UniformKind::Bool);
        assert_eq!(UniformValue::from([1.0, 2.0, 3.0]).kind(), UniformKind::Vec3);
        assert_eq!(UniformValue::from(Mat4::IDENTITY).kind(), UniformKind::Mat4);
        assert_eq!(UniformValue::from(TextureId::new()).kind(), UniformKind::Texture);
    }
}
