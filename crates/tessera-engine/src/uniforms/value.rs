use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::scene::{Shared, Texture};

/// Value stored under a uniform name.
#[derive(Debug, Clone)]
pub enum UniformValue {
    Scalar(f32),
    Vector(Vec<f32>),
    Texture(Shared<Texture>),
}

/// Packable view of a uniform, resolved once when a draw's uniforms are gathered.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformData<'a> {
    Scalar(f32),
    Vector(&'a [f32]),
}

impl UniformValue {
    /// Returns the packable form, or `None` for textures.
    #[inline]
    pub fn as_data(&self) -> Option<UniformData<'_>> {
        match self {
            Self::Scalar(v) => Some(UniformData::Scalar(*v)),
            Self::Vector(v) => Some(UniformData::Vector(v)),
            Self::Texture(_) => None,
        }
    }

    #[inline]
    pub fn as_texture(&self) -> Option<&Shared<Texture>> {
        match self {
            Self::Texture(t) => Some(t),
            _ => None,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Scalar(v)
    }
}

impl<const N: usize> From<[f32; N]> for UniformValue {
    fn from(v: [f32; N]) -> Self {
        Self::Vector(v.to_vec())
    }
}

impl From<Vec<f32>> for UniformValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Vector(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vector(v.to_array().to_vec())
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vector(v.to_array().to_vec())
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vector(v.to_array().to_vec())
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        Self::Vector(m.to_cols_array().to_vec())
    }
}

/// Three columns, each padded to four floats (`mat3x3<f32>` uniform layout).
impl From<Mat3> for UniformValue {
    fn from(m: Mat3) -> Self {
        let mut out = Vec::with_capacity(12);
        for col in [m.x_axis, m.y_axis, m.z_axis] {
            out.extend_from_slice(&[col.x, col.y, col.z, 0.0]);
        }
        Self::Vector(out)
    }
}

impl From<Shared<Texture>> for UniformValue {
    fn from(t: Shared<Texture>) -> Self {
        Self::Texture(t)
    }
}

/// Insertion-ordered uniform map.
///
/// Texture uniforms are bound in this order after the uniform buffer, so the order
/// here must match the shader's `@binding` numbering.
#[derive(Debug, Clone, Default)]
pub struct Uniforms {
    entries: Vec<(String, UniformValue)>,
}

impl Uniforms {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value, keeping the original position on replace.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<UniformValue> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Texture uniforms in insertion order.
    pub fn textures(&self) -> impl Iterator<Item = (&str, &Shared<Texture>)> {
        self.iter()
            .filter_map(|(n, v)| v.as_texture().map(|t| (n, t)))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mat3_is_column_padded() {
        let UniformValue::Vector(v) = UniformValue::from(Mat3::IDENTITY) else {
            panic!("expected vector");
        };
        assert_eq!(
            v,
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn replace_keeps_order() {
        let mut u = Uniforms::new();
        u.set("a", 1.0f32);
        u.set("b", [1.0f32, 2.0]);
        u.set("a", 3.0f32);
        let names: Vec<_> = u.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(matches!(u.get("a"), Some(UniformValue::Scalar(v)) if *v == 3.0));
    }

    #[test]
    fn textures_have_no_packed_form() {
        let t = crate::scene::shared(Texture::blank(1, 1));
        assert_eq!(UniformValue::from(t).as_data(), None);
        assert_eq!(UniformValue::from(2.0f32).as_data(), Some(UniformData::Scalar(2.0)));
    }
}
