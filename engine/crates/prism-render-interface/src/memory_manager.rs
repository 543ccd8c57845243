//! 内存管理器
//!
//! 负责 buffer / texture 的原生内存分配，维护存活分配的列表。
//! 这里不做任何延迟释放的记账，那一层在 [`crate::resource_manager::ResourceManager`] 中。

use std::rc::Rc;

use prism_gfx::basic::format::GfxFormat;
use prism_gfx::basic::native::NativeHandle;
use prism_gfx::basic::usage::GfxUsageFlags;
use prism_gfx::descriptors::descriptor::GfxDescriptorViewType;
use prism_gfx::error::GfxResult;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::resources::copy_layout::{GfxTextureCopyLayout, full_mip_count};
use prism_gfx::resources::resource::{
    GfxBufferDesc, GfxClearValue, GfxTextureDesc, GpuResource, GpuResourceKind, SharedGpuResource,
};
use prism_gfx::resources::resource_state::GfxResourceState;

/// 创建 descriptor 时需要的元数据
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorCreationMeta {
    pub format: GfxFormat,
    pub usage: GfxUsageFlags,
    pub is_texture: bool,
    pub mip_levels: u32,
}

impl DescriptorCreationMeta {
    /// 作为 render target 使用时的视图类型
    pub fn target_view_type(&self) -> Option<GfxDescriptorViewType> {
        if self.usage.contains(GfxUsageFlags::DEPTH_STENCIL) {
            Some(GfxDescriptorViewType::Dsv)
        } else if self.usage.contains(GfxUsageFlags::RENDER_TARGET) {
            Some(GfxDescriptorViewType::Rtv)
        } else {
            None
        }
    }
}

/// 一次内存分配：原生内存 + descriptor 元数据 + 拥有的资源
#[derive(Debug)]
pub struct MemoryAllocation {
    name: String,
    native: NativeHandle,
    size: u64,
    meta: DescriptorCreationMeta,
    clear_value: Option<GfxClearValue>,
    /// 纹理的逐 mip 拷贝布局
    copy_layout: Option<GfxTextureCopyLayout>,
    resource: SharedGpuResource,
}
// getters
impl MemoryAllocation {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[inline]
    pub fn native(&self) -> NativeHandle {
        self.native
    }
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }
    #[inline]
    pub fn meta(&self) -> &DescriptorCreationMeta {
        &self.meta
    }
    #[inline]
    pub fn clear_value(&self) -> Option<GfxClearValue> {
        self.clear_value
    }
    #[inline]
    pub fn copy_layout(&self) -> Option<&GfxTextureCopyLayout> {
        self.copy_layout.as_ref()
    }
    #[inline]
    pub fn resource(&self) -> &SharedGpuResource {
        &self.resource
    }
}

pub struct MemoryManager {
    device: Rc<dyn GfxDevice>,
    live_allocations: Vec<Rc<MemoryAllocation>>,
}
// new & init
impl MemoryManager {
    pub fn new(device: Rc<dyn GfxDevice>) -> Self {
        Self {
            device,
            live_allocations: Vec::new(),
        }
    }
}
// allocate
impl MemoryManager {
    pub fn allocate_buffer_memory(&mut self, desc: &GfxBufferDesc) -> GfxResult<Rc<MemoryAllocation>> {
        let native = self.device.create_buffer(desc)?;
        let resource = GpuResource::new_shared(
            desc.name.clone(),
            GpuResourceKind::Buffer { size: desc.size },
            desc.format,
            desc.usage,
            native,
            GfxResourceState::Common,
        );

        let allocation = Rc::new(MemoryAllocation {
            name: desc.name.clone(),
            native,
            size: desc.size,
            meta: DescriptorCreationMeta {
                format: desc.format,
                usage: desc.usage,
                is_texture: false,
                mip_levels: 1,
            },
            clear_value: None,
            copy_layout: None,
            resource,
        });
        self.live_allocations.push(allocation.clone());
        log::debug!("allocate buffer `{}`: {} bytes", desc.name, desc.size);
        Ok(allocation)
    }

    pub fn allocate_texture_memory(&mut self, desc: &GfxTextureDesc) -> GfxResult<Rc<MemoryAllocation>> {
        let mip_levels = if desc.generate_mips { full_mip_count(desc.width, desc.height) } else { 1 };
        let copy_layout =
            GfxTextureCopyLayout::new(desc.format, desc.width, desc.height, mip_levels, self.device.copy_alignment());

        let native = self.device.create_texture(desc, mip_levels)?;
        let resource = GpuResource::new_shared(
            desc.name.clone(),
            GpuResourceKind::Texture {
                width: desc.width,
                height: desc.height,
                mip_levels,
            },
            desc.format,
            desc.usage,
            native,
            GfxResourceState::Undefined,
        );

        let allocation = Rc::new(MemoryAllocation {
            name: desc.name.clone(),
            native,
            size: copy_layout.total_size(),
            meta: DescriptorCreationMeta {
                format: desc.format,
                usage: desc.usage,
                is_texture: true,
                mip_levels,
            },
            clear_value: desc.clear_value,
            copy_layout: Some(copy_layout),
            resource,
        });
        self.live_allocations.push(allocation.clone());
        log::debug!(
            "allocate texture `{}`: {}x{} {:?}, {} mips",
            desc.name,
            desc.width,
            desc.height,
            desc.format,
            mip_levels
        );
        Ok(allocation)
    }

    /// 纹理上传使用的 staging buffer
    pub fn allocate_staging_memory(&mut self, name: &str, size: u64) -> GfxResult<Rc<MemoryAllocation>> {
        self.allocate_buffer_memory(&GfxBufferDesc {
            name: format!("{}-staging", name),
            size,
            usage: GfxUsageFlags::HOST_WRITE | GfxUsageFlags::TRANSFER_SRC,
            format: GfxFormat::Unknown,
        })
    }
}
// release
impl MemoryManager {
    /// 立即释放一个分配
    ///
    /// # Panics
    /// 分配不在存活列表中时 panic：这意味着重复释放或者记账出错。
    pub fn release_memory_allocation(&mut self, allocation: &Rc<MemoryAllocation>) {
        let index = self
            .live_allocations
            .iter()
            .position(|live| Rc::ptr_eq(live, allocation))
            .unwrap_or_else(|| panic!("memory allocation `{}` is not alive", allocation.name()));

        let allocation = self.live_allocations.swap_remove(index);
        self.device.release_memory(allocation.native());
    }

    /// 释放所有存活的分配，不管上层的延迟释放队列
    pub fn release_all_resource(&mut self) {
        let _span = prism_crate_tools::profile_span!("MemoryManager::release_all_resource");
        if !self.live_allocations.is_empty() {
            log::info!("release {} live memory allocations", self.live_allocations.len());
        }
        for allocation in self.live_allocations.drain(..) {
            self.device.release_memory(allocation.native());
        }
    }
}
// getters
impl MemoryManager {
    #[inline]
    pub fn live_allocation_count(&self) -> usize {
        self.live_allocations.len()
    }

    pub fn is_alive(&self, allocation: &Rc<MemoryAllocation>) -> bool {
        self.live_allocations.iter().any(|live| Rc::ptr_eq(live, allocation))
    }

    #[inline]
    pub fn device(&self) -> &Rc<dyn GfxDevice> {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use prism_gfx::backends::headless::device::HeadlessDevice;
    use prism_gfx::backends::headless::journal::HeadlessJournal;
    use prism_gfx::foundation::device::GfxBackendKind;

    use super::*;

    fn manager(kind: GfxBackendKind) -> (MemoryManager, Rc<RefCell<HeadlessJournal>>) {
        let journal = Rc::new(RefCell::new(HeadlessJournal::default()));
        let device = HeadlessDevice::new(kind, journal.clone());
        (MemoryManager::new(Rc::new(device)), journal)
    }

    fn texture_desc(generate_mips: bool) -> GfxTextureDesc {
        GfxTextureDesc {
            name: "albedo".to_string(),
            width: 300,
            height: 200,
            format: GfxFormat::Rgba8Unorm,
            usage: GfxUsageFlags::SHADER_RESOURCE | GfxUsageFlags::TRANSFER_DST,
            generate_mips,
            clear_value: None,
        }
    }

    #[test]
    fn test_texture_mip_chain_and_layout() {
        let (mut manager, _) = manager(GfxBackendKind::D3d12);

        let with_mips = manager.allocate_texture_memory(&texture_desc(true)).unwrap();
        assert_eq!(with_mips.meta().mip_levels, 9);
        let layout = with_mips.copy_layout().unwrap();
        assert_eq!(layout.mip_count(), 9);
        assert_eq!(layout.mips()[0].row_pitch, 1280);

        let without_mips = manager.allocate_texture_memory(&texture_desc(false)).unwrap();
        assert_eq!(without_mips.meta().mip_levels, 1);
        assert_eq!(manager.live_allocation_count(), 2);
    }

    #[test]
    fn test_release_by_identity() {
        let (mut manager, journal) = manager(GfxBackendKind::Vulkan);
        let a = manager.allocate_texture_memory(&texture_desc(false)).unwrap();
        let b = manager.allocate_texture_memory(&texture_desc(false)).unwrap();

        manager.release_memory_allocation(&b);
        assert!(manager.is_alive(&a));
        assert!(!manager.is_alive(&b));
        assert!(journal.borrow().released_memories.contains(&b.native()));
    }

    #[test]
    #[should_panic(expected = "is not alive")]
    fn test_double_release_panics() {
        let (mut manager, _) = manager(GfxBackendKind::Vulkan);
        let a = manager.allocate_staging_memory("tmp", 64).unwrap();
        manager.release_memory_allocation(&a);
        manager.release_memory_allocation(&a);
    }

    #[test]
    fn test_release_all_resource() {
        let (mut manager, journal) = manager(GfxBackendKind::Vulkan);
        manager.allocate_staging_memory("a", 16).unwrap();
        manager.allocate_texture_memory(&texture_desc(true)).unwrap();

        manager.release_all_resource();
        assert_eq!(manager.live_allocation_count(), 0);
        assert_eq!(journal.borrow().live_memory_count(), 0);
    }
}
