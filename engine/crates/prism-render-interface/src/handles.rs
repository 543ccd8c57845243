//! 对外暴露的资源句柄
//!
//! 句柄由 [`crate::resource_manager::ResourceManager`] 中的 `SlotMap` 分配，带代际信息，
//! 对象被移除后旧句柄不会再命中新的对象。

use slotmap::new_key_type;

new_key_type! {
    pub struct ShaderHandle;
    pub struct BufferHandle;
    /// 顶点 + 索引缓冲
    pub struct IndexedBufferHandle;
    pub struct TextureHandle;
    pub struct RenderTargetHandle;
    pub struct RenderPassHandle;
}

/// 可以作为 render graph 绑定来源的资源
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Buffer(BufferHandle),
    Texture(TextureHandle),
    RenderTarget(RenderTargetHandle),
}

impl From<BufferHandle> for ResourceRef {
    fn from(handle: BufferHandle) -> Self {
        Self::Buffer(handle)
    }
}

impl From<TextureHandle> for ResourceRef {
    fn from(handle: TextureHandle) -> Self {
        Self::Texture(handle)
    }
}

impl From<RenderTargetHandle> for ResourceRef {
    fn from(handle: RenderTargetHandle) -> Self {
        Self::RenderTarget(handle)
    }
}
