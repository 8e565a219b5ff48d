use crate::math::BoundingSphere;

use super::ObjectId;

/// Name of the attribute used for bounds and non-indexed vertex counts.
pub const POSITION: &str = "position";

/// Element storage of an [`Attribute`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    Float32(Vec<f32>),
    Uint32(Vec<u32>),
    Uint16(Vec<u16>),
}

/// Scalar kind of an attribute's elements.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttributeKind {
    Float32,
    Uint32,
    Uint16,
}

impl AttributeData {
    #[inline]
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Float32(_) => AttributeKind::Float32,
            Self::Uint32(_) => AttributeKind::Uint32,
            Self::Uint16(_) => AttributeKind::Uint16,
        }
    }

    /// Number of scalar values.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Float32(v) => v.len(),
            Self::Uint32(v) => v.len(),
            Self::Uint16(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw little-endian bytes as uploaded to the GPU.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Float32(v) => bytemuck::cast_slice(v),
            Self::Uint32(v) => bytemuck::cast_slice(v),
            Self::Uint16(v) => bytemuck::cast_slice(v),
        }
    }

    /// Float view, if the data is `Float32`.
    #[inline]
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::Float32(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Vec<f32>> for AttributeData {
    fn from(v: Vec<f32>) -> Self {
        Self::Float32(v)
    }
}

impl From<Vec<u32>> for AttributeData {
    fn from(v: Vec<u32>) -> Self {
        Self::Uint32(v)
    }
}

impl From<Vec<u16>> for AttributeData {
    fn from(v: Vec<u16>) -> Self {
        Self::Uint16(v)
    }
}

/// Named vertex (or index) data source.
///
/// The GPU copy is rewritten on the next compile whenever `needs_update` is set;
/// the renderer clears the flag afterwards.
#[derive(Debug)]
pub struct Attribute {
    id: ObjectId,
    pub name: String,
    pub data: AttributeData,
    /// Scalars per element (1..=4).
    pub item_size: u32,
    pub needs_update: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, data: impl Into<AttributeData>, item_size: u32) -> Self {
        Self {
            id: ObjectId::next(),
            name: name.into(),
            data: data.into(),
            item_size: item_size.max(1),
            needs_update: false,
        }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Number of elements (`len / item_size`).
    #[inline]
    pub fn count(&self) -> u32 {
        (self.data.len() / self.item_size as usize) as u32
    }

    /// Replaces the data and marks the attribute dirty.
    pub fn set_data(&mut self, data: impl Into<AttributeData>) {
        self.data = data.into();
        self.needs_update = true;
    }
}

/// Attribute set of a drawable.
///
/// Attributes keep their declaration order, which becomes the shader input location
/// order (`@location(0)`, `@location(1)`, ...).
#[derive(Debug)]
pub struct Geometry {
    id: ObjectId,
    attributes: Vec<Attribute>,
    index: Option<Attribute>,

    bounds: Option<BoundingSphere>,
    bounds_dirty: bool,
}

impl Geometry {
    pub fn new() -> Self {
        Self {
            id: ObjectId::next(),
            attributes: Vec::new(),
            index: None,
            bounds: None,
            bounds_dirty: true,
        }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Builder-style [`set_attribute`](Self::set_attribute).
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.set_attribute(attribute);
        self
    }

    /// Builder-style [`set_index`](Self::set_index).
    pub fn with_index(mut self, index: Attribute) -> Self {
        self.set_index(Some(index));
        self
    }

    /// Inserts an attribute, replacing any attribute with the same name in place.
    pub fn set_attribute(&mut self, attribute: Attribute) {
        if attribute.name == POSITION {
            self.bounds_dirty = true;
        }
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(slot) => *slot = attribute,
            None => self.attributes.push(attribute),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Attribute> {
        let pos = self.attributes.iter().position(|a| a.name == name)?;
        if name == POSITION {
            self.bounds_dirty = true;
        }
        Some(self.attributes.remove(pos))
    }

    pub fn set_index(&mut self, index: Option<Attribute>) {
        self.index = index;
    }

    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    #[inline]
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        if name == POSITION {
            self.bounds_dirty = true;
        }
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    /// Non-index attributes in declaration order.
    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    #[inline]
    pub fn attributes_mut(&mut self) -> &mut [Attribute] {
        self.bounds_dirty = true;
        &mut self.attributes
    }

    #[inline]
    pub fn index(&self) -> Option<&Attribute> {
        self.index.as_ref()
    }

    #[inline]
    pub fn index_mut(&mut self) -> Option<&mut Attribute> {
        self.index.as_mut()
    }

    /// Iterates every attribute, index included.
    pub fn all_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().chain(self.index.iter())
    }

    pub fn all_attributes_mut(&mut self) -> impl Iterator<Item = &mut Attribute> {
        self.attributes.iter_mut().chain(self.index.iter_mut())
    }

    /// Identity of every attribute currently in the set, index last.
    ///
    /// The renderer compares this against what it registered to detect a change of
    /// shape.
    pub fn layout_signature(&self) -> Vec<ObjectId> {
        self.all_attributes().map(Attribute::id).collect()
    }

    /// Local-space bounding sphere of the `position` attribute.
    ///
    /// Recomputed lazily after positions were replaced or marked dirty.
    pub fn bounding_sphere(&mut self) -> Option<BoundingSphere> {
        let position_dirty = self.attribute(POSITION).is_some_and(|a| a.needs_update);
        if self.bounds_dirty || position_dirty {
            self.bounds = self.attribute(POSITION).and_then(|a| {
                a.data
                    .as_f32()
                    .and_then(|data| BoundingSphere::from_positions(data, a.item_size as usize))
            });
            self.bounds_dirty = false;
        }
        self.bounds
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Geometry {
        Geometry::new()
            .with_attribute(Attribute::new(
                POSITION,
                vec![0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                3,
            ))
            .with_attribute(Attribute::new("uv", vec![0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0], 2))
    }

    #[test]
    fn count_divides_by_item_size() {
        let g = triangle();
        assert_eq!(g.attribute(POSITION).unwrap().count(), 3);
        assert_eq!(g.attribute("uv").unwrap().count(), 3);
    }

    #[test]
    fn replacing_an_attribute_keeps_its_slot() {
        let mut g = triangle();
        let old = g.attribute(POSITION).unwrap().id();
        g.set_attribute(Attribute::new(POSITION, vec![0.0f32; 9], 3));
        assert_eq!(g.attributes()[0].name, POSITION);
        assert_ne!(g.attributes()[0].id(), old);
    }

    #[test]
    fn signature_changes_with_shape() {
        let mut g = triangle();
        let before = g.layout_signature();
        g.set_index(Some(Attribute::new("index", vec![0u16, 1, 2], 1)));
        assert_ne!(g.layout_signature(), before);
        assert_eq!(g.layout_signature().len(), 3);
    }

    #[test]
    fn bounds_follow_position_edits() {
        let mut g = triangle();
        let first = g.bounding_sphere().unwrap();
        if let Some(p) = g.attribute_mut(POSITION) {
            p.set_data(vec![0.0f32, 0.0, 0.0, 10.0, 0.0, 0.0]);
        }
        let second = g.bounding_sphere().unwrap();
        assert!(second.radius > first.radius);
    }

    #[test]
    fn set_data_marks_dirty() {
        let mut a = Attribute::new("color", vec![1.0f32; 4], 4);
        assert!(!a.needs_update);
        a.set_data(vec![0.5f32; 4]);
        assert!(a.needs_update);
    }
}
