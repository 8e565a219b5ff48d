use super::{ObjectId, Shared, Texture, TextureSource, shared};

/// Off-screen destination: one or more color attachments plus a depth buffer.
///
/// The renderer compiles the attachment views and a fresh depth buffer the first time
/// the target is used and again whenever `needs_update` is set.
#[derive(Debug)]
pub struct RenderTarget {
    id: ObjectId,
    width: u32,
    height: u32,
    textures: Vec<Shared<Texture>>,
    pub needs_update: bool,
}

impl RenderTarget {
    /// Creates a target with `count` blank RGBA8 attachments.
    pub fn new(width: u32, height: u32, count: usize) -> Self {
        let textures = (0..count.max(1))
            .map(|_| shared(Texture::blank(width, height)))
            .collect();
        Self::with_textures(width, height, textures)
    }

    /// Creates a target over caller-provided attachments.
    pub fn with_textures(width: u32, height: u32, textures: Vec<Shared<Texture>>) -> Self {
        Self {
            id: ObjectId::next(),
            width,
            height,
            textures,
            needs_update: false,
        }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Color attachments in `@location` order.
    #[inline]
    pub fn textures(&self) -> &[Shared<Texture>] {
        &self.textures
    }

    /// Convenience accessor for the first attachment.
    #[inline]
    pub fn texture(&self) -> Option<&Shared<Texture>> {
        self.textures.first()
    }

    /// Resizes every attachment and marks the target and attachments dirty.
    pub fn set_size(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        for texture in &self.textures {
            texture
                .borrow_mut()
                .set_source(TextureSource::Blank { width, height });
        }
        self.needs_update = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_marks_everything_dirty() {
        let mut rt = RenderTarget::new(64, 64, 2);
        rt.set_size(128, 32);
        assert!(rt.needs_update);
        for t in rt.textures() {
            let t = t.borrow();
            assert!(t.needs_update);
            assert_eq!(t.size(), (128, 32));
        }
    }

    #[test]
    fn same_size_is_a_no_op() {
        let mut rt = RenderTarget::new(64, 64, 1);
        rt.set_size(64, 64);
        assert!(!rt.needs_update);
    }
}
