//! 对外的渲染器接口
//!
//! 创建资源、声明 render graph 节点，然后每帧调用 [`Renderer::tick`]：
//!
//! 1. sync 交换链（推进延迟释放、处理 resize）
//! 2. 等待当前槽位的 fence，调用 tick 回调（在这里重新注册节点）
//! 3. acquire → 录制 render graph → 提交 → present
//! 4. 清空本帧的节点队列

use std::rc::Rc;

use prism_gfx::backend::{GfxBackendCreateInfo, GfxBackendFactory};
use prism_gfx::basic::format::GfxFormat;
use prism_gfx::basic::native::GfxExtent2D;
use prism_gfx::error::GfxResult;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::pipelines::shader::GfxShaderDesc;
use prism_gfx::resources::resource::{GfxBufferDesc, GfxTextureDesc};
use prism_gfx::swapchain::render_swapchain::GfxSwapchain;
use prism_render_graph::node::{RgNodeDesc, RgNodeHandle};
use prism_render_graph::render_graph::RenderGraph;
use prism_render_graph::stats::RgFrameStats;
use prism_render_interface::frame_counter::{FrameCounter, FrameLabel};
use prism_render_interface::handles::{
    BufferHandle, IndexedBufferHandle, RenderPassHandle, RenderTargetHandle, ResourceRef, ShaderHandle, TextureHandle,
};
use prism_render_interface::resource_manager::ResourceManager;
use prism_render_interface::resources::buffer::IndexedBufferDesc;
use prism_render_interface::resources::render_pass::RenderPassDesc;
use prism_render_interface::resources::render_target::RenderTargetDesc;

use crate::config::RendererConfig;
use crate::frame_slots::FrameSlots;
use crate::swapchain_lifecycle::{SurfaceFailureKind, SurfaceSyncContext, SurfaceSyncResult, SwapchainLifecycle};

pub struct DefaultRendererSettings;
impl DefaultRendererSettings {
    pub const SWAPCHAIN_FORMAT: GfxFormat = GfxFormat::Bgra8Unorm;
}

/// 传给 tick 回调的帧信息
#[derive(Clone, Copy, Debug)]
pub struct FrameInfo {
    pub frame_id: u64,
    pub frame_label: FrameLabel,
    pub render_extent: GfxExtent2D,
}

pub type TickCallback = Box<dyn FnMut(&mut Renderer, &FrameInfo)>;

/// 一次 tick 的结果
#[derive(Clone, Copy, Debug)]
pub struct TickResult {
    pub sync: SurfaceSyncResult,
    /// 没有提交任何 GPU 工作时为 `None`（最小化、交换链不可用、acquire 失败）
    pub stats: Option<RgFrameStats>,
}

pub struct Renderer {
    config: RendererConfig,
    device: Rc<dyn GfxDevice>,
    swapchain: Box<dyn GfxSwapchain>,

    resource_manager: ResourceManager,
    render_graph: RenderGraph,
    lifecycle: SwapchainLifecycle,

    frame_counter: FrameCounter,
    frame_slots: FrameSlots,
    tick_callback: Option<TickCallback>,

    destroyed: bool,
}

// new & init
impl Renderer {
    pub fn new(config: RendererConfig, factory: &dyn GfxBackendFactory) -> GfxResult<Self> {
        let _span = prism_crate_tools::profile_span!("Renderer::new");
        let window_extent = GfxExtent2D::new(config.window_width, config.window_height);
        let backend = factory.create(&GfxBackendCreateInfo {
            app_name: config.app_name.clone(),
            window_extent,
            back_buffer_count: config.back_buffer_count,
            swapchain_format: DefaultRendererSettings::SWAPCHAIN_FORMAT,
        })?;

        let mut resource_manager =
            ResourceManager::new(backend.device.clone(), config.back_buffer_count, backend.swapchain.extent());
        let frame_slots = FrameSlots::new(backend.device.as_ref(), config.back_buffer_count)?;

        let mut lifecycle = SwapchainLifecycle::new(config.swapchain.clone());
        lifecycle.initialize(backend.swapchain.as_ref(), &mut resource_manager);

        log::info!(
            "renderer `{}` created on {:?}: {}x{}, {} back buffers",
            config.app_name,
            factory.backend_kind(),
            window_extent.width,
            window_extent.height,
            config.back_buffer_count
        );

        Ok(Self {
            frame_counter: FrameCounter::new(0, config.back_buffer_count),
            config,
            device: backend.device,
            swapchain: backend.swapchain,
            resource_manager,
            render_graph: RenderGraph::new(),
            lifecycle,
            frame_slots,
            tick_callback: None,
            destroyed: false,
        })
    }
}
// getters
impl Renderer {
    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }
    #[inline]
    pub fn device(&self) -> &Rc<dyn GfxDevice> {
        &self.device
    }
    #[inline]
    pub fn swapchain(&self) -> &dyn GfxSwapchain {
        self.swapchain.as_ref()
    }
    #[inline]
    pub fn resource_manager(&self) -> &ResourceManager {
        &self.resource_manager
    }
    #[inline]
    pub fn resource_manager_mut(&mut self) -> &mut ResourceManager {
        &mut self.resource_manager
    }
    #[inline]
    pub fn render_graph(&self) -> &RenderGraph {
        &self.render_graph
    }
    #[inline]
    pub fn render_graph_mut(&mut self) -> &mut RenderGraph {
        &mut self.render_graph
    }
    #[inline]
    pub fn lifecycle(&self) -> &SwapchainLifecycle {
        &self.lifecycle
    }
    #[inline]
    pub fn frame_counter(&self) -> &FrameCounter {
        &self.frame_counter
    }
}
// Resource API
impl Renderer {
    pub fn create_shader(&mut self, desc: &GfxShaderDesc) -> GfxResult<ShaderHandle> {
        self.resource_manager.create_shader(desc)
    }

    pub fn create_texture(&mut self, desc: &GfxTextureDesc) -> GfxResult<TextureHandle> {
        self.resource_manager.create_texture(desc)
    }

    /// 数据在下一帧开始时拷贝到纹理
    pub fn upload_texture_data(&mut self, handle: TextureHandle, levels: &[&[u8]]) -> GfxResult<()> {
        self.resource_manager.upload_texture_data(handle, levels)
    }

    pub fn create_buffer(&mut self, desc: &GfxBufferDesc) -> GfxResult<BufferHandle> {
        self.resource_manager.create_buffer(desc)
    }

    pub fn upload_buffer_data(&mut self, handle: BufferHandle, data: &[u8], offset: u64, size: u64) -> GfxResult<()> {
        self.resource_manager.upload_buffer_data(handle, data, offset, size)
    }

    pub fn create_indexed_buffer(&mut self, desc: &IndexedBufferDesc) -> GfxResult<IndexedBufferHandle> {
        self.resource_manager.create_indexed_buffer(desc)
    }

    pub fn create_render_target(&mut self, desc: &RenderTargetDesc) -> GfxResult<RenderTargetHandle> {
        self.resource_manager.create_render_target(desc)
    }

    pub fn create_render_pass(&mut self, desc: &RenderPassDesc) -> GfxResult<RenderPassHandle> {
        self.resource_manager.create_render_pass(desc)
    }
}
// Render Graph API
impl Renderer {
    pub fn create_render_graph_node(&mut self, desc: RgNodeDesc) -> RgNodeHandle {
        self.render_graph.create_node(desc)
    }

    /// 节点只在注册的那一帧执行
    pub fn register_render_graph_node(&mut self, handle: RgNodeHandle) {
        self.render_graph.register_node(handle);
    }

    pub fn remove_render_graph_node(&mut self, handle: RgNodeHandle) -> bool {
        self.render_graph.remove_node(handle, &mut self.resource_manager)
    }

    /// 每帧结束时拷贝到交换链 image 的颜色输出
    pub fn set_final_color_output(&mut self, output: Option<ResourceRef>) {
        self.render_graph.set_final_color_output(output);
    }

    /// 每次 tick 调用一次，在 render graph 执行之前
    pub fn set_tick_callback(&mut self, callback: impl FnMut(&mut Renderer, &FrameInfo) + 'static) {
        self.tick_callback = Some(Box::new(callback));
    }

    pub fn clear_tick_callback(&mut self) {
        self.tick_callback = None;
    }
}
// update
impl Renderer {
    pub fn sync_window_surface(&mut self, width: u32, height: u32) -> SurfaceSyncResult {
        self.lifecycle.sync(
            width,
            height,
            SurfaceSyncContext {
                swapchain: self.swapchain.as_mut(),
                resource_manager: &mut self.resource_manager,
                frame_fence: self.frame_slots.last_submitted_fence(),
            },
        )
    }

    /// 推进一帧，`width` / `height` 是窗口当前的尺寸
    pub fn tick(&mut self, width: u32, height: u32) -> GfxResult<TickResult> {
        let _span = prism_crate_tools::profile_span!("Renderer::tick");

        let sync = self.sync_window_surface(width, height);
        let stats = if sync.status.can_render() { self.execute_frame(sync.render_extent())? } else { None };

        prism_crate_tools::profile::frame_mark();
        Ok(TickResult { sync, stats })
    }

    fn execute_frame(&mut self, render_extent: GfxExtent2D) -> GfxResult<Option<RgFrameStats>> {
        let _span = prism_crate_tools::profile_span!("Renderer::execute_frame");
        let slot = self.frame_counter.frame_slot();

        // 等待这个槽位上一次的提交完成之后才能重新录制
        self.frame_slots.wait(slot, self.device.as_ref());

        let frame_info = FrameInfo {
            frame_id: self.frame_counter.frame_id(),
            frame_label: self.frame_counter.frame_label(),
            render_extent,
        };
        if let Some(mut callback) = self.tick_callback.take() {
            callback(self, &frame_info);
            // 回调中可能设置了新的回调
            if self.tick_callback.is_none() {
                self.tick_callback = Some(callback);
            }
        }

        if let Err(err) = self.swapchain.acquire_new_frame() {
            self.lifecycle.notify_surface_failure(SurfaceFailureKind::Acquire, err);
            self.render_graph.clear_queued();
            return Ok(None);
        }
        let image_index = self.swapchain.current_image_index();

        let cmd = self.frame_slots.command_list_mut(slot);
        cmd.begin();
        let recorded = self.render_graph.execute(cmd, &mut self.resource_manager, render_extent, Some(image_index));
        cmd.end();
        self.render_graph.clear_queued();
        let stats = recorded?;

        self.frame_slots.submit(slot, self.device.as_ref())?;
        if let Err(err) = self.swapchain.present() {
            self.lifecycle.notify_surface_failure(SurfaceFailureKind::Present, err);
        }

        log::trace!("{} {}", self.frame_counter.frame_name(), stats);
        self.frame_counter.next_frame();
        Ok(Some(stats))
    }
}
// destroy
impl Renderer {
    pub fn destroy(mut self) {
        let _span = prism_crate_tools::profile_span!("Renderer::destroy");
        self.device.wait_idle();

        self.tick_callback = None;
        self.render_graph.destroy(&mut self.resource_manager);
        self.resource_manager.destroy();
        self.swapchain.release();
        self.destroyed = true;
    }
}
impl Drop for Renderer {
    fn drop(&mut self) {
        if !self.destroyed && !std::thread::panicking() {
            log::error!("Renderer dropped without destroy()");
        }
    }
}
