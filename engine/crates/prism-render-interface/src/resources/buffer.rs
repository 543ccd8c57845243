use std::rc::Rc;

use prism_gfx::basic::native::NativeHandle;
use prism_gfx::pipelines::pipeline::GfxIndexFormat;
use prism_gfx::resources::resource::SharedGpuResource;

use crate::memory_manager::MemoryAllocation;

pub struct Buffer {
    pub(crate) allocation: Rc<MemoryAllocation>,
}
// getters
impl Buffer {
    #[inline]
    pub fn name(&self) -> &str {
        self.allocation.name()
    }
    #[inline]
    pub fn size(&self) -> u64 {
        self.allocation.size()
    }
    #[inline]
    pub fn native(&self) -> NativeHandle {
        self.allocation.native()
    }
    #[inline]
    pub fn resource(&self) -> &SharedGpuResource {
        self.allocation.resource()
    }
}

/// 由场景提供的顶点 / 索引数据
#[derive(Clone, Debug, Default)]
pub struct IndexedBufferDesc {
    pub name: String,
    pub vertex_data: Vec<u8>,
    pub vertex_stride: u32,
    pub index_data: Vec<u8>,
    pub index_format: GfxIndexFormat,
}

pub struct IndexedBuffer {
    pub(crate) vertex: Rc<MemoryAllocation>,
    pub(crate) index: Rc<MemoryAllocation>,
    pub(crate) vertex_stride: u32,
    pub(crate) index_format: GfxIndexFormat,
}
// getters
impl IndexedBuffer {
    #[inline]
    pub fn vertex_resource(&self) -> &SharedGpuResource {
        self.vertex.resource()
    }
    #[inline]
    pub fn index_resource(&self) -> &SharedGpuResource {
        self.index.resource()
    }
    #[inline]
    pub fn vertex_stride(&self) -> u32 {
        self.vertex_stride
    }
    #[inline]
    pub fn vertex_buffer_size(&self) -> u64 {
        self.vertex.size()
    }
    #[inline]
    pub fn index_buffer_size(&self) -> u64 {
        self.index.size()
    }
    #[inline]
    pub fn index_format(&self) -> GfxIndexFormat {
        self.index_format
    }
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        (self.vertex.size() / self.vertex_stride as u64) as u32
    }
    #[inline]
    pub fn index_count(&self) -> u32 {
        (self.index.size() / self.index_format.stride() as u64) as u32
    }
}
