//! 资源管理器
//!
//! 使用 SlotMap 存储 shader / buffer / texture / render target / render pass，对外提供轻量级的 Handle。
//! 内存与 descriptor 的实际分配委托给 [`MemoryManager`] 和 [`DescriptorManager`]，
//! 可能仍被在途 GPU 工作引用的对象进入 [`DeferredReleaseQueue`]。

use std::rc::Rc;

use itertools::Itertools;
use slotmap::SlotMap;

use prism_gfx::basic::native::GfxExtent2D;
use prism_gfx::basic::usage::GfxUsageFlags;
use prism_gfx::commands::command_list::GfxCommandList;
use prism_gfx::commands::state_tracker::GfxStateTracker;
use prism_gfx::descriptors::descriptor::GfxDescriptorViewType;
use prism_gfx::error::GfxResult;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::pipelines::pipeline::GfxPipelineDesc;
use prism_gfx::pipelines::shader::{GfxShaderDesc, GfxShaderStage};
use prism_gfx::resources::resource::{GfxBufferDesc, GfxTextureDesc, SharedGpuResource};
use prism_gfx::resources::resource_state::GfxResourceState;
use prism_gfx::swapchain::render_swapchain::GfxSwapchain;

use crate::deferred_release::{DeferredReleaseItem, DeferredReleaseQueue};
use crate::descriptor_manager::{DescriptorAllocation, DescriptorManager};
use crate::handles::{
    BufferHandle, IndexedBufferHandle, RenderPassHandle, RenderTargetHandle, ResourceRef, ShaderHandle, TextureHandle,
};
use crate::memory_manager::MemoryManager;
use crate::resources::buffer::{Buffer, IndexedBuffer, IndexedBufferDesc};
use crate::resources::render_pass::{RenderPass, RenderPassDesc};
use crate::resources::render_target::{RenderTarget, RenderTargetDesc};
use crate::resources::shader::Shader;
use crate::resources::swapchain_target::{SwapchainImageTarget, SwapchainTargets};
use crate::resources::texture::{PendingTextureUpload, Texture};
use crate::root_binding::RootSignatureLayoutBuilder;

pub struct ResourceManager {
    device: Rc<dyn GfxDevice>,
    memory_manager: MemoryManager,
    descriptor_manager: DescriptorManager,
    deferred_release: DeferredReleaseQueue,

    shaders: SlotMap<ShaderHandle, Shader>,
    buffers: SlotMap<BufferHandle, Buffer>,
    indexed_buffers: SlotMap<IndexedBufferHandle, IndexedBuffer>,
    textures: SlotMap<TextureHandle, Texture>,
    render_targets: SlotMap<RenderTargetHandle, RenderTarget>,
    render_passes: SlotMap<RenderPassHandle, Rc<RenderPass>>,

    swapchain_targets: SwapchainTargets,
    pending_uploads: Vec<PendingTextureUpload>,

    window_extent: GfxExtent2D,
    destroyed: bool,
}
// new & init
impl ResourceManager {
    pub fn new(device: Rc<dyn GfxDevice>, back_buffer_count: u32, window_extent: GfxExtent2D) -> Self {
        Self {
            memory_manager: MemoryManager::new(device.clone()),
            descriptor_manager: DescriptorManager::new(device.clone()),
            deferred_release: DeferredReleaseQueue::new(back_buffer_count),
            device,

            shaders: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            indexed_buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            render_targets: SlotMap::with_key(),
            render_passes: SlotMap::with_key(),

            swapchain_targets: SwapchainTargets::default(),
            pending_uploads: Vec::new(),

            window_extent,
            destroyed: false,
        }
    }
}
// destroy
impl ResourceManager {
    /// 调用者必须保证 GPU 已经空闲
    pub fn destroy(&mut self) {
        let _span = prism_crate_tools::profile_span!("ResourceManager::destroy");

        self.deferred_release.force_flush(&mut self.memory_manager, &mut self.descriptor_manager);
        self.pending_uploads.clear();

        for (_, render_pass) in self.render_passes.drain() {
            render_pass.root_signature.destroy(self.device.as_ref(), &mut self.descriptor_manager);
            self.device.release_object(render_pass.pipeline);
        }
        for (_, shader) in self.shaders.drain() {
            self.device.release_object(shader.native);
        }
        self.swapchain_targets.release(&mut self.descriptor_manager);

        self.buffers.clear();
        self.indexed_buffers.clear();
        self.textures.clear();
        self.render_targets.clear();

        self.descriptor_manager.release_all();
        self.memory_manager.release_all_resource();
        self.destroyed = true;
    }
}
impl Drop for ResourceManager {
    fn drop(&mut self) {
        if !self.destroyed && !std::thread::panicking() {
            log::error!("ResourceManager dropped without destroy()");
        }
    }
}
// deferred release
impl ResourceManager {
    /// 每次 surface sync 调用一次
    pub fn advance_deferred_release(&mut self) -> usize {
        let _span = prism_crate_tools::profile_span!("ResourceManager::cleanup");
        self.deferred_release.advance_and_release(&mut self.memory_manager, &mut self.descriptor_manager)
    }

    /// 调用者必须保证 GPU 已经空闲
    pub fn flush_deferred_release(&mut self) -> usize {
        self.deferred_release.force_flush(&mut self.memory_manager, &mut self.descriptor_manager)
    }

    #[inline]
    pub fn defer_release_descriptor(&mut self, descriptor: Rc<DescriptorAllocation>) {
        self.deferred_release.enqueue(DeferredReleaseItem::Descriptor(descriptor));
    }

    #[inline]
    pub fn deferred_release(&self) -> &DeferredReleaseQueue {
        &self.deferred_release
    }
}
// Shader API
impl ResourceManager {
    pub fn create_shader(&mut self, desc: &GfxShaderDesc) -> GfxResult<ShaderHandle> {
        let native = self.device.create_shader(desc)?;
        Ok(self.shaders.insert(Shader {
            name: desc.name.clone(),
            stage: desc.stage,
            native,
            reflection: desc.reflection.clone(),
            vertex_inputs: desc.vertex_inputs.clone(),
        }))
    }

    pub fn get_shader(&self, handle: ShaderHandle) -> Option<&Shader> {
        self.shaders.get(handle)
    }
}
// Buffer API
impl ResourceManager {
    /// 创建 host visible 的 buffer，内容通过 [`Self::upload_buffer_data`] 写入
    pub fn create_buffer(&mut self, desc: &GfxBufferDesc) -> GfxResult<BufferHandle> {
        let mut desc = desc.clone();
        desc.usage |= GfxUsageFlags::HOST_WRITE;
        let allocation = self.memory_manager.allocate_buffer_memory(&desc)?;
        Ok(self.buffers.insert(Buffer { allocation }))
    }

    /// 把 `data` 的前 `size` 个字节写到 buffer 的 `offset` 处
    pub fn upload_buffer_data(&mut self, handle: BufferHandle, data: &[u8], offset: u64, size: u64) -> GfxResult<()> {
        assert!(size as usize <= data.len(), "upload size {} exceeds data length {}", size, data.len());
        let buffer = self.buffers.get(handle).unwrap_or_else(|| panic!("invalid buffer handle {:?}", handle));
        self.device.write_buffer(buffer.native(), offset, &data[..size as usize])
    }

    pub fn get_buffer(&self, handle: BufferHandle) -> Option<&Buffer> {
        self.buffers.get(handle)
    }

    /// 延迟销毁
    pub fn destroy_buffer(&mut self, handle: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(handle) {
            self.deferred_release.enqueue(DeferredReleaseItem::Memory(buffer.allocation));
        }
    }

    pub fn create_indexed_buffer(&mut self, desc: &IndexedBufferDesc) -> GfxResult<IndexedBufferHandle> {
        assert!(desc.vertex_stride > 0, "indexed buffer `{}` has zero vertex stride", desc.name);

        let vertex = self.memory_manager.allocate_buffer_memory(&GfxBufferDesc {
            name: format!("{}-vertices", desc.name),
            size: desc.vertex_data.len() as u64,
            usage: GfxUsageFlags::VERTEX | GfxUsageFlags::HOST_WRITE,
            format: Default::default(),
        })?;
        let index = self.memory_manager.allocate_buffer_memory(&GfxBufferDesc {
            name: format!("{}-indices", desc.name),
            size: desc.index_data.len() as u64,
            usage: GfxUsageFlags::INDEX | GfxUsageFlags::HOST_WRITE,
            format: Default::default(),
        })?;
        self.device.write_buffer(vertex.native(), 0, &desc.vertex_data)?;
        self.device.write_buffer(index.native(), 0, &desc.index_data)?;

        Ok(self.indexed_buffers.insert(IndexedBuffer {
            vertex,
            index,
            vertex_stride: desc.vertex_stride,
            index_format: desc.index_format,
        }))
    }

    pub fn get_indexed_buffer(&self, handle: IndexedBufferHandle) -> Option<&IndexedBuffer> {
        self.indexed_buffers.get(handle)
    }

    pub fn destroy_indexed_buffer(&mut self, handle: IndexedBufferHandle) {
        if let Some(buffer) = self.indexed_buffers.remove(handle) {
            self.deferred_release.enqueue(DeferredReleaseItem::Memory(buffer.vertex));
            self.deferred_release.enqueue(DeferredReleaseItem::Memory(buffer.index));
        }
    }
}
// Texture API
impl ResourceManager {
    pub fn create_texture(&mut self, desc: &GfxTextureDesc) -> GfxResult<TextureHandle> {
        let allocation = self.memory_manager.allocate_texture_memory(desc)?;
        Ok(self.textures.insert(Texture {
            desc: desc.clone(),
            allocation,
        }))
    }

    /// 上传纹理数据，`levels[i]` 是第 i 层 mip 紧密排列的像素
    ///
    /// 数据先按拷贝布局写入 staging buffer，拷贝命令在下一帧开始时由 [`Self::flush_pending_uploads`] 录制。
    pub fn upload_texture_data(&mut self, handle: TextureHandle, levels: &[&[u8]]) -> GfxResult<()> {
        let texture = self.textures.get(handle).unwrap_or_else(|| panic!("invalid texture handle {:?}", handle));
        let Some(layout) = texture.allocation.copy_layout() else {
            panic!("texture `{}` has no copy layout", texture.desc.name);
        };
        assert!(
            !levels.is_empty() && levels.len() as u32 <= layout.mip_count(),
            "texture `{}` has {} mips, got {} levels",
            texture.desc.name,
            layout.mip_count(),
            levels.len()
        );
        assert!(
            texture.desc.usage.contains(GfxUsageFlags::TRANSFER_DST),
            "texture `{}` is not a transfer destination",
            texture.desc.name
        );

        let mut staging_bytes = vec![0u8; layout.total_size() as usize];
        for (level, data) in levels.iter().enumerate() {
            layout.write_mip(level as u32, data, &mut staging_bytes);
        }
        let mips = layout.mips()[..levels.len()].to_vec();
        let texture_resource = texture.resource().clone();

        let staging = self.memory_manager.allocate_staging_memory(&texture.desc.name, layout.total_size())?;
        self.device.write_buffer(staging.native(), 0, &staging_bytes)?;

        self.pending_uploads.push(PendingTextureUpload {
            staging,
            texture: texture_resource,
            mips,
        });
        Ok(())
    }

    /// 录制所有待上传纹理的拷贝命令，staging buffer 进入延迟释放队列
    pub fn flush_pending_uploads(&mut self, cmd: &mut dyn GfxCommandList) -> usize {
        let backend = self.device.backend_kind();
        let uploads = std::mem::take(&mut self.pending_uploads);
        let count = uploads.len();

        for upload in uploads {
            GfxStateTracker::transition_shared(cmd, backend, &upload.texture, GfxResourceState::CopyDest);
            let dst = upload.texture.borrow().native();
            for mip in &upload.mips {
                cmd.copy_buffer_to_texture(upload.staging.native(), dst, mip);
            }
            self.deferred_release.enqueue(DeferredReleaseItem::Memory(upload.staging));
        }
        count
    }

    #[inline]
    pub fn pending_upload_count(&self) -> usize {
        self.pending_uploads.len()
    }

    pub fn get_texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle)
    }

    pub fn destroy_texture(&mut self, handle: TextureHandle) {
        if let Some(texture) = self.textures.remove(handle) {
            self.deferred_release.enqueue(DeferredReleaseItem::Memory(texture.allocation));
        }
    }
}
// Render Target API
impl ResourceManager {
    pub fn create_render_target(&mut self, desc: &RenderTargetDesc) -> GfxResult<RenderTargetHandle> {
        let extent = desc.size.resolve(self.window_extent);
        let render_target = self.allocate_render_target(desc.clone(), extent)?;
        Ok(self.render_targets.insert(render_target))
    }

    fn allocate_render_target(&mut self, desc: RenderTargetDesc, extent: GfxExtent2D) -> GfxResult<RenderTarget> {
        let allocation = self.memory_manager.allocate_texture_memory(&desc.texture_desc(extent))?;
        let Some(view_type) = allocation.meta().target_view_type() else {
            panic!("render target `{}` needs RENDER_TARGET or DEPTH_STENCIL usage", desc.name);
        };
        let view = match self.descriptor_manager.create_descriptor(
            &format!("{}-view", desc.name),
            view_type,
            std::slice::from_ref(allocation.resource()),
            false,
        ) {
            Ok(view) => view,
            Err(err) => {
                self.memory_manager.release_memory_allocation(&allocation);
                return Err(err);
            }
        };

        Ok(RenderTarget {
            desc,
            extent,
            allocation,
            view,
        })
    }

    /// 窗口尺寸变化后重新分配尺寸变化的 window-relative render target
    ///
    /// 旧的内存和视图进入延迟释放队列，返回重新分配的数量。
    /// 任何一个分配失败时已经分配的新 target 立即释放，旧的 target 和窗口尺寸都保持不变。
    pub fn resize_window_relative_targets(&mut self, window_extent: GfxExtent2D) -> GfxResult<usize> {
        let stale = self
            .render_targets
            .iter()
            .filter(|(_, rt)| rt.desc.size.is_window_relative() && rt.desc.size.resolve(window_extent) != rt.extent)
            .map(|(handle, _)| handle)
            .collect_vec();

        let mut replacements = Vec::with_capacity(stale.len());
        for handle in stale {
            let desc = self.render_targets[handle].desc.clone();
            let extent = desc.size.resolve(window_extent);
            match self.allocate_render_target(desc, extent) {
                Ok(new_target) => replacements.push((handle, new_target)),
                Err(err) => {
                    // 新分配的 target 还没有被录制过，可以直接释放
                    for (_, unused) in replacements {
                        self.descriptor_manager.release_descriptor(&unused.view);
                        self.memory_manager.release_memory_allocation(&unused.allocation);
                    }
                    return Err(err);
                }
            }
        }

        self.window_extent = window_extent;
        let reallocated = replacements.len();
        for (handle, new_target) in replacements {
            let old_target = std::mem::replace(&mut self.render_targets[handle], new_target);
            log::info!(
                "reallocate render target `{}`: {}x{} -> {}x{}",
                old_target.desc.name,
                old_target.extent.width,
                old_target.extent.height,
                self.render_targets[handle].extent.width,
                self.render_targets[handle].extent.height
            );
            self.deferred_release.enqueue(DeferredReleaseItem::Descriptor(old_target.view));
            self.deferred_release.enqueue(DeferredReleaseItem::Memory(old_target.allocation));
        }
        Ok(reallocated)
    }

    pub fn get_render_target(&self, handle: RenderTargetHandle) -> Option<&RenderTarget> {
        self.render_targets.get(handle)
    }

    pub fn destroy_render_target(&mut self, handle: RenderTargetHandle) {
        if let Some(render_target) = self.render_targets.remove(handle) {
            self.deferred_release.enqueue(DeferredReleaseItem::Descriptor(render_target.view));
            self.deferred_release.enqueue(DeferredReleaseItem::Memory(render_target.allocation));
        }
    }
}
// Render Pass API
impl ResourceManager {
    /// 检查管线类型要求的 shader 阶段，合并所有阶段的反射信息，构建 root signature 和管线
    ///
    /// # Panics
    /// shader 句柄无效，或缺少管线类型要求的阶段
    pub fn create_render_pass(&mut self, desc: &RenderPassDesc) -> GfxResult<RenderPassHandle> {
        let shaders = desc
            .shaders
            .iter()
            .map(|handle| {
                self.shaders
                    .get(*handle)
                    .unwrap_or_else(|| panic!("render pass `{}` uses invalid shader {:?}", desc.name, handle))
            })
            .collect_vec();

        for stage in desc.kind.required_stages() {
            assert!(
                shaders.iter().any(|shader| shader.stage == *stage),
                "render pass `{}` ({:?}) is missing a {:?} shader",
                desc.name,
                desc.kind,
                stage
            );
        }

        let mut layout = RootSignatureLayoutBuilder::new(desc.name.clone());
        for shader in &shaders {
            layout.add_reflection_entries(&shader.reflection);
        }
        let root_signature = layout.build_root_signature(self.device.as_ref(), &mut self.descriptor_manager)?;

        let pipeline_desc = GfxPipelineDesc {
            name: desc.name.clone(),
            kind: desc.kind,
            root_signature: root_signature.native(),
            shaders: shaders.iter().map(|shader| (shader.stage, shader.native)).collect(),
            color_formats: desc.color_formats.clone(),
            depth_format: desc.depth_format,
            topology: desc.topology,
            vertex_inputs: shaders
                .iter()
                .find(|shader| shader.stage == GfxShaderStage::Vertex)
                .map(|shader| shader.vertex_inputs.clone())
                .unwrap_or_default(),
        };
        let pipeline = match self.device.create_pipeline(&pipeline_desc) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                root_signature.destroy(self.device.as_ref(), &mut self.descriptor_manager);
                return Err(err);
            }
        };

        Ok(self.render_passes.insert(Rc::new(RenderPass {
            name: desc.name.clone(),
            kind: desc.kind,
            root_signature,
            pipeline,
            topology: desc.topology,
        })))
    }

    pub fn get_render_pass(&self, handle: RenderPassHandle) -> Option<Rc<RenderPass>> {
        self.render_passes.get(handle).cloned()
    }
}
// Swapchain Target API
impl ResourceManager {
    pub fn rebuild_swapchain_targets(&mut self, swapchain: &dyn GfxSwapchain) -> GfxResult<()> {
        self.swapchain_targets.rebuild(swapchain, &mut self.descriptor_manager)
    }

    pub fn stash_swapchain_targets(&mut self) {
        self.swapchain_targets.stash(&mut self.descriptor_manager);
    }

    pub fn restore_swapchain_targets(&mut self, swapchain: &dyn GfxSwapchain) -> GfxResult<()> {
        self.swapchain_targets.restore(swapchain, &mut self.descriptor_manager)
    }

    pub fn release_swapchain_targets(&mut self) {
        self.swapchain_targets.release(&mut self.descriptor_manager);
    }

    #[inline]
    pub fn swapchain_target(&self, image_index: u32) -> Option<&SwapchainImageTarget> {
        self.swapchain_targets.get(image_index)
    }

    #[inline]
    pub fn has_swapchain_targets(&self) -> bool {
        !self.swapchain_targets.is_empty()
    }
}
// tools
impl ResourceManager {
    /// # Panics
    /// 句柄已经失效
    pub fn resolve_resource(&self, resource: ResourceRef) -> SharedGpuResource {
        let shared = match resource {
            ResourceRef::Buffer(handle) => self.buffers.get(handle).map(|b| b.resource().clone()),
            ResourceRef::Texture(handle) => self.textures.get(handle).map(|t| t.resource().clone()),
            ResourceRef::RenderTarget(handle) => self.render_targets.get(handle).map(|rt| rt.resource().clone()),
        };
        shared.unwrap_or_else(|| panic!("resource {:?} was never allocated or is already destroyed", resource))
    }

    pub fn create_descriptor(
        &mut self,
        name: &str,
        view_type: GfxDescriptorViewType,
        resources: &[SharedGpuResource],
        as_table: bool,
    ) -> GfxResult<Rc<DescriptorAllocation>> {
        self.descriptor_manager.create_descriptor(name, view_type, resources, as_table)
    }

    #[inline]
    pub fn device(&self) -> &Rc<dyn GfxDevice> {
        &self.device
    }
    #[inline]
    pub fn descriptor_manager_mut(&mut self) -> &mut DescriptorManager {
        &mut self.descriptor_manager
    }
    #[inline]
    pub fn descriptor_manager(&self) -> &DescriptorManager {
        &self.descriptor_manager
    }
    #[inline]
    pub fn memory_manager(&self) -> &MemoryManager {
        &self.memory_manager
    }
    #[inline]
    pub fn window_extent(&self) -> GfxExtent2D {
        self.window_extent
    }
}
