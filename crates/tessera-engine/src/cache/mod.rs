//! Keyed store of compiled GPU resources with per-entry disposal.
//!
//! Every entry may carry a [`Disposer`]; it runs exactly once, when the entry is
//! replaced, deleted, evicted or drained. There is no other eviction policy.

use std::collections::HashMap;
use std::hash::Hash;

use crate::device::{
    BindGroupHandle, BufferHandle, GpuDevice, PipelineHandle, SamplerHandle, TextureHandle,
    TextureViewHandle,
};
use crate::scene::ObjectId;

/// Cleanup attached to a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposer {
    Buffer(BufferHandle),
    Texture(TextureHandle),
    TextureView(TextureViewHandle),
    Sampler(SamplerHandle),
    Pipeline(PipelineHandle),
    BindGroup(BindGroupHandle),
    /// Geometry hook: free the listed attributes' buffers and re-mark them dirty.
    Attributes(Vec<ObjectId>),
    Composite(Vec<Disposer>),
}

/// Executes disposers.
pub trait Reclaim {
    fn reclaim(&mut self, disposer: Disposer);
}

impl<D: GpuDevice + ?Sized> Reclaim for D {
    fn reclaim(&mut self, disposer: Disposer) {
        match disposer {
            Disposer::Buffer(h) => self.destroy_buffer(h),
            Disposer::Texture(h) => self.destroy_texture(h),
            Disposer::TextureView(h) => self.destroy_texture_view(h),
            Disposer::Sampler(h) => self.destroy_sampler(h),
            Disposer::Pipeline(h) => self.destroy_pipeline(h),
            Disposer::BindGroup(h) => self.destroy_bind_group(h),
            Disposer::Attributes(ids) => {
                // Needs the geometry and the buffer cache, which only the renderer's
                // geometry reclaimer has. Reaching this arm is a routing bug.
                debug_assert!(
                    ids.is_empty(),
                    "geometry hook for {} attributes sent to a bare device",
                    ids.len()
                );
                if !ids.is_empty() {
                    log::error!("geometry hook for {} attributes sent to a bare device", ids.len());
                }
            }
            Disposer::Composite(list) => {
                for d in list {
                    self.reclaim(d);
                }
            }
        }
    }
}

struct Entry<V> {
    value: V,
    dispose: Option<Disposer>,
}

/// At most one live value per key.
pub struct ResourceCache<K, V> {
    entries: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash + Copy, V> ResourceCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key).map(|e| &mut e.value)
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Installs `value` under `key`, disposing any previous entry first.
    pub fn set(
        &mut self,
        key: K,
        value: V,
        dispose: Option<Disposer>,
        reclaim: &mut (impl Reclaim + ?Sized),
    ) {
        if let Some(old) = self.entries.remove(&key) {
            if let Some(d) = old.dispose {
                reclaim.reclaim(d);
            }
        }
        self.entries.insert(key, Entry { value, dispose });
    }

    /// Removes the entry, running its disposer. Returns the removed value.
    pub fn delete(&mut self, key: &K, reclaim: &mut (impl Reclaim + ?Sized)) -> Option<V> {
        let entry = self.entries.remove(key)?;
        if let Some(d) = entry.dispose {
            reclaim.reclaim(d);
        }
        Some(entry.value)
    }

    /// Deletes every entry matching `predicate`; returns how many were removed.
    pub fn evict_where(
        &mut self,
        mut predicate: impl FnMut(&K, &V) -> bool,
        reclaim: &mut (impl Reclaim + ?Sized),
    ) -> usize {
        let doomed: Vec<K> = self
            .entries
            .iter()
            .filter(|(k, e)| predicate(k, &e.value))
            .map(|(k, _)| *k)
            .collect();
        for key in &doomed {
            self.delete(key, reclaim);
        }
        doomed.len()
    }

    /// Deletes every entry.
    pub fn drain(&mut self, reclaim: &mut (impl Reclaim + ?Sized)) {
        for (_, entry) in self.entries.drain() {
            if let Some(d) = entry.dispose {
                reclaim.reclaim(d);
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }
}

impl<K: Eq + Hash + Copy, V> Default for ResourceCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
