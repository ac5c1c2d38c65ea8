//! Shared handles to rasterizer-owned textures and shader programs.
//!
//! The draw pool never owns GPU resources. It holds `Arc` handles whose
//! identity is all it needs for state comparison and hashing; the rasterizer
//! resolves ids to real resources when a call is replayed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tessera_core::geometry::Size;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

impl TextureId {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u64);

impl ShaderId {
    fn next() -> Self {
        Self(NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A texture known to the rasterizer, usually an atlas shared by many calls.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    size: Size<u32>,
}

impl Texture {
    /// Register a texture of the given pixel size under a fresh id.
    pub fn new(size: Size<u32>) -> Arc<Self> {
        Arc::new(Self {
            id: TextureId::next(),
            size,
        })
    }

    /// Wrap an id the rasterizer already assigned.
    pub fn with_id(id: TextureId, size: Size<u32>) -> Arc<Self> {
        Arc::new(Self { id, size })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn size(&self) -> Size<u32> {
        self.size
    }
}

/// A compiled shader program the rasterizer can bind.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ShaderId,
    name: String,
}

impl ShaderProgram {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: ShaderId::next(),
            name: name.into(),
        })
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
