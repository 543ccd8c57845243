use std::rc::Rc;

use prism_gfx::basic::native::NativeHandle;
use prism_gfx::resources::copy_layout::GfxMipCopyInfo;
use prism_gfx::resources::resource::{GfxTextureDesc, SharedGpuResource};

use crate::memory_manager::MemoryAllocation;

pub struct Texture {
    pub(crate) desc: GfxTextureDesc,
    pub(crate) allocation: Rc<MemoryAllocation>,
}
// getters
impl Texture {
    #[inline]
    pub fn desc(&self) -> &GfxTextureDesc {
        &self.desc
    }
    #[inline]
    pub fn native(&self) -> NativeHandle {
        self.allocation.native()
    }
    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.allocation.meta().mip_levels
    }
    #[inline]
    pub fn resource(&self) -> &SharedGpuResource {
        self.allocation.resource()
    }
}

/// 已写入 staging buffer、等待在下一帧开始时拷贝到纹理的数据
pub struct PendingTextureUpload {
    pub(crate) staging: Rc<MemoryAllocation>,
    pub(crate) texture: SharedGpuResource,
    pub(crate) mips: Vec<GfxMipCopyInfo>,
}
