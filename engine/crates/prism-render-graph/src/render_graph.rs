//! Render Graph 执行器
//!
//! # 每帧流程
//!
//! 1. 录制待上传纹理的拷贝命令
//! 2. 按注册顺序执行每个节点：
//!    pre-render 回调 → 绑定管线 / root signature / 视口 / 拓扑 → 逐个绑定（状态转换 + descriptor 写入）
//!    → 一次性提交 descriptor → 图形 pass 的 begin_rendering → 命令 → end_rendering
//! 3. 把最终颜色输出拷贝到本帧的交换链图像，并转换到 Present
//!
//! 执行结束后由调用者在 present 之后 [`RenderGraph::clear_queued`]，下一帧重新注册节点。

use std::collections::HashMap;
use std::rc::Rc;

use itertools::Itertools;
use slotmap::SlotMap;

use prism_gfx::basic::native::{GfxExtent2D, GfxRect, GfxViewport};
use prism_gfx::commands::command_list::{GfxColorAttachment, GfxCommandList, GfxDepthAttachment, GfxRenderingInfo};
use prism_gfx::commands::state_tracker::GfxStateTracker;
use prism_gfx::descriptors::descriptor::GfxDescriptorViewType;
use prism_gfx::error::GfxResult;
use prism_gfx::foundation::device::GfxBackendKind;
use prism_gfx::pipelines::pipeline::GfxPipelineKind;
use prism_gfx::resources::resource::{GfxClearValue, SharedGpuResource};
use prism_gfx::resources::resource_state::GfxResourceState;
use prism_render_interface::descriptor_manager::DescriptorAllocation;
use prism_render_interface::handles::ResourceRef;
use prism_render_interface::resource_manager::ResourceManager;

use crate::binding::RgBinding;
use crate::command::RgCommand;
use crate::node::{RgNode, RgNodeDesc, RgNodeHandle};
use crate::stats::RgFrameStats;

#[derive(Default)]
pub struct RenderGraph {
    nodes: SlotMap<RgNodeHandle, RgNode>,
    /// 本帧注册的节点，按注册顺序执行
    queued: Vec<RgNodeHandle>,
    final_color_output: Option<ResourceRef>,
}

// new & init
impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_node(&mut self, desc: RgNodeDesc) -> RgNodeHandle {
        log::debug!("create render graph node `{}`", desc.name);
        self.nodes.insert(RgNode::new(desc))
    }
}
// getters
impl RenderGraph {
    #[inline]
    pub fn node(&self, handle: RgNodeHandle) -> Option<&RgNode> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn node_mut(&mut self, handle: RgNodeHandle) -> Option<&mut RgNode> {
        self.nodes.get_mut(handle)
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn queued_nodes(&self) -> &[RgNodeHandle] {
        &self.queued
    }

    #[inline]
    pub fn final_color_output(&self) -> Option<ResourceRef> {
        self.final_color_output
    }
}
// update
impl RenderGraph {
    /// 把节点加入本帧的执行队列
    ///
    /// 同一帧内重复注册会被忽略。
    ///
    /// # Panics
    /// 节点句柄无效
    pub fn register_node(&mut self, handle: RgNodeHandle) {
        let node = self.nodes.get(handle).unwrap_or_else(|| panic!("register of invalid node {:?}", handle));
        if self.queued.contains(&handle) {
            log::warn!("node `{}` is already registered in this frame, ignored", node.name());
            return;
        }
        self.queued.push(handle);
    }

    /// 删除节点，缓存的 descriptor 进入延迟释放队列
    pub fn remove_node(&mut self, handle: RgNodeHandle, resource_manager: &mut ResourceManager) -> bool {
        let Some(mut node) = self.nodes.remove(handle) else {
            return false;
        };
        node.release_descriptors(resource_manager);
        self.queued.retain(|queued| *queued != handle);
        true
    }

    /// 为 `None` 时不向交换链图像拷贝
    pub fn set_final_color_output(&mut self, output: Option<ResourceRef>) {
        self.final_color_output = output;
    }

    /// 在 present 之后调用
    pub fn clear_queued(&mut self) {
        self.queued.clear();
    }
}
// destroy
impl RenderGraph {
    pub fn destroy(&mut self, resource_manager: &mut ResourceManager) {
        for (_, mut node) in self.nodes.drain() {
            node.release_descriptors(resource_manager);
        }
        self.queued.clear();
        self.final_color_output = None;
    }
}
// execute
impl RenderGraph {
    /// 录制本帧所有已注册节点
    ///
    /// `swapchain_image_index` 为 `None` 时（例如交换链不可用）跳过最终拷贝和 Present 转换。
    pub fn execute(
        &mut self,
        cmd: &mut dyn GfxCommandList,
        resource_manager: &mut ResourceManager,
        window_extent: GfxExtent2D,
        swapchain_image_index: Option<u32>,
    ) -> GfxResult<RgFrameStats> {
        let _span = prism_crate_tools::profile_span!("RenderGraph::execute");
        let mut stats = RgFrameStats {
            texture_uploads: resource_manager.flush_pending_uploads(cmd) as u32,
            ..Default::default()
        };

        for handle in self.queued.clone() {
            let Some(node) = self.nodes.get_mut(handle) else {
                continue;
            };
            Self::execute_node(node, cmd, resource_manager, window_extent, &mut stats)?;
            stats.nodes_executed += 1;
        }

        if let Some(image_index) = swapchain_image_index {
            self.present_to_swapchain(cmd, resource_manager, image_index, window_extent, &mut stats);
        }
        Ok(stats)
    }

    fn execute_node(
        node: &mut RgNode,
        cmd: &mut dyn GfxCommandList,
        resource_manager: &mut ResourceManager,
        window_extent: GfxExtent2D,
        stats: &mut RgFrameStats,
    ) -> GfxResult<()> {
        let _span = prism_crate_tools::profile_span!("RenderGraph::execute_node");
        let backend = resource_manager.device().backend_kind();

        if let Some(pre_render) = node.desc.pre_render.as_mut() {
            pre_render(resource_manager);
        }

        let pass = resource_manager.get_render_pass(node.desc.render_pass).unwrap_or_else(|| {
            panic!("node `{}` uses invalid render pass {:?}", node.desc.name, node.desc.render_pass)
        });
        let kind = pass.kind();
        let extent = node.desc.viewport_extent(window_extent);

        cmd.bind_pipeline(kind, pass.pipeline());
        cmd.bind_root_signature(kind, pass.root_signature().native());
        cmd.set_viewport(GfxViewport::from_extent(extent));
        cmd.set_scissor(GfxRect::from_extent(extent));
        cmd.set_primitive_topology(pass.topology());

        for binding in &node.desc.bindings {
            assert!(
                !binding.resources.is_empty(),
                "binding `{}` of node `{}` has no resources",
                binding.name,
                node.desc.name
            );
            assert!(
                binding.is_descriptor_table() || binding.resources.len() == 1,
                "binding `{}` of node `{}` has {} resources but is not a descriptor table",
                binding.name,
                node.desc.name,
                binding.resources.len()
            );

            let resources = binding
                .resources
                .iter()
                .map(|resource| resource_manager.resolve_resource(*resource))
                .collect_vec();
            let view_type = binding.view_type(&resources[0].borrow());
            let descriptor = Self::acquire_descriptor(
                &node.desc.name,
                &mut node.descriptors,
                binding,
                view_type,
                &resources,
                resource_manager,
                stats,
            )?;

            for resource in &resources {
                let state = binding.required_state(kind, &resource.borrow());
                Self::transition(cmd, backend, resource, state, stats);
            }
            resource_manager
                .descriptor_manager_mut()
                .update_descriptor(pass.root_signature().allocation(&binding.name), &descriptor);
        }
        stats.descriptor_writes += resource_manager.descriptor_manager_mut().finalize_update_descriptors(cmd, kind) as u32;

        let is_graphics = kind == GfxPipelineKind::Graphics;
        if is_graphics {
            // 渲染区域内不能插入 barrier，顶点 / 索引缓冲和 attachment 都要提前转换
            for command in &node.desc.commands {
                if let RgCommand::DrawIndexed { buffer, .. } = command {
                    let indexed = resource_manager
                        .get_indexed_buffer(*buffer)
                        .unwrap_or_else(|| panic!("node `{}` draws invalid indexed buffer {:?}", node.desc.name, buffer));
                    Self::transition(cmd, backend, indexed.vertex_resource(), GfxResourceState::VertexAndConstantBuffer, stats);
                    Self::transition(cmd, backend, indexed.index_resource(), GfxResourceState::IndexBuffer, stats);
                }
            }
            let rendering_info = Self::rendering_info(&node.desc, cmd, resource_manager, backend, extent, stats);
            cmd.begin_rendering(&rendering_info);
        }

        for command in &node.desc.commands {
            Self::record_command(&node.desc.name, kind, command, cmd, resource_manager, stats);
        }

        if is_graphics {
            cmd.end_rendering();
        }
        Ok(())
    }

    /// 复用缓存的 descriptor；来源资源、视图类型或者 table 形式变化时重新创建，旧的进入延迟释放队列
    fn acquire_descriptor(
        node_name: &str,
        descriptors: &mut HashMap<String, Rc<DescriptorAllocation>>,
        binding: &RgBinding,
        view_type: GfxDescriptorViewType,
        resources: &[SharedGpuResource],
        resource_manager: &mut ResourceManager,
        stats: &mut RgFrameStats,
    ) -> GfxResult<Rc<DescriptorAllocation>> {
        if let Some(cached) = descriptors.get(&binding.name)
            && cached.is_created_from(resources)
            && cached.view_type() == view_type
            && cached.is_table() == binding.is_descriptor_table()
        {
            return Ok(cached.clone());
        }

        let descriptor = resource_manager.create_descriptor(
            &format!("{}.{}", node_name, binding.name),
            view_type,
            resources,
            binding.is_descriptor_table(),
        )?;
        stats.descriptors_created += 1;

        if let Some(stale) = descriptors.insert(binding.name.clone(), descriptor.clone()) {
            log::debug!("node `{}`: binding `{}` changed, recreate descriptor", node_name, binding.name);
            resource_manager.defer_release_descriptor(stale);
        }
        Ok(descriptor)
    }

    fn rendering_info(
        desc: &RgNodeDesc,
        cmd: &mut dyn GfxCommandList,
        resource_manager: &ResourceManager,
        backend: GfxBackendKind,
        extent: GfxExtent2D,
        stats: &mut RgFrameStats,
    ) -> GfxRenderingInfo {
        let mut rendering_info = GfxRenderingInfo {
            render_area: GfxRect::from_extent(extent),
            ..Default::default()
        };

        for color in &desc.color_targets {
            let target = resource_manager
                .get_render_target(color.target)
                .unwrap_or_else(|| panic!("node `{}` renders to invalid target {:?}", desc.name, color.target));
            Self::transition(cmd, backend, target.resource(), GfxResourceState::RenderTarget, stats);
            rendering_info.color_attachments.push(GfxColorAttachment {
                view: target.view().native(),
                clear: color.clear.then(|| match target.clear_value() {
                    Some(GfxClearValue::Color(color)) => color,
                    _ => [0.0; 4],
                }),
            });
        }

        if let Some(depth) = &desc.depth_target {
            let target = resource_manager
                .get_render_target(depth.target)
                .unwrap_or_else(|| panic!("node `{}` uses invalid depth target {:?}", desc.name, depth.target));
            Self::transition(cmd, backend, target.resource(), depth.required_state(), stats);
            rendering_info.depth_attachment = Some(GfxDepthAttachment {
                view: target.view().native(),
                clear: depth.clear.then(|| match target.clear_value() {
                    Some(GfxClearValue::DepthStencil { depth, .. }) => depth,
                    _ => 1.0,
                }),
                write_enabled: depth.write_enabled,
            });
        }
        rendering_info
    }

    fn record_command(
        node_name: &str,
        kind: GfxPipelineKind,
        command: &RgCommand,
        cmd: &mut dyn GfxCommandList,
        resource_manager: &ResourceManager,
        stats: &mut RgFrameStats,
    ) {
        let expected_kind = match command {
            RgCommand::Draw { .. } | RgCommand::DrawIndexed { .. } => GfxPipelineKind::Graphics,
            RgCommand::Dispatch { .. } => GfxPipelineKind::Compute,
            RgCommand::TraceRays { .. } => GfxPipelineKind::RayTracing,
        };
        assert_eq!(expected_kind, kind, "node `{}`: {:?} cannot be recorded in a {:?} pass", node_name, command, kind);

        match *command {
            RgCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => {
                cmd.draw(vertex_count, instance_count, first_vertex, first_instance);
                stats.draws += 1;
            }
            RgCommand::DrawIndexed { buffer, instance_count } => {
                let Some(indexed) = resource_manager.get_indexed_buffer(buffer) else {
                    panic!("node `{}` draws invalid indexed buffer {:?}", node_name, buffer);
                };
                cmd.bind_vertex_buffer(
                    indexed.vertex_resource().borrow().native(),
                    indexed.vertex_stride(),
                    indexed.vertex_buffer_size(),
                );
                cmd.bind_index_buffer(
                    indexed.index_resource().borrow().native(),
                    indexed.index_format(),
                    indexed.index_buffer_size(),
                );
                cmd.draw_indexed(indexed.index_count(), instance_count, 0, 0, 0);
                stats.draws += 1;
            }
            RgCommand::Dispatch { x, y, z } => {
                cmd.dispatch(x, y, z);
                stats.dispatches += 1;
            }
            RgCommand::TraceRays { width, height, depth } => {
                cmd.trace_rays(width, height, depth);
                stats.trace_calls += 1;
            }
        }
    }

    /// 最终颜色输出 → 交换链图像，然后转换到 Present
    fn present_to_swapchain(
        &self,
        cmd: &mut dyn GfxCommandList,
        resource_manager: &ResourceManager,
        image_index: u32,
        window_extent: GfxExtent2D,
        stats: &mut RgFrameStats,
    ) {
        let backend = resource_manager.device().backend_kind();
        let Some(target) = resource_manager.swapchain_target(image_index) else {
            log::warn!("swapchain image {} has no wrapper, skip present transition", image_index);
            return;
        };
        let swapchain_image = target.resource().clone();

        if let Some(output) = self.final_color_output {
            let source = resource_manager.resolve_resource(output);
            Self::transition(cmd, backend, &source, GfxResourceState::CopySource, stats);
            Self::transition(cmd, backend, &swapchain_image, GfxResourceState::CopyDest, stats);

            let src_extent = source.borrow().extent();
            let dst_extent = swapchain_image.borrow().extent();
            let extent = GfxExtent2D::new(
                window_extent.width.min(src_extent.width).min(dst_extent.width),
                window_extent.height.min(src_extent.height).min(dst_extent.height),
            );
            cmd.copy_texture(source.borrow().native(), swapchain_image.borrow().native(), extent);
        }

        Self::transition(cmd, backend, &swapchain_image, GfxResourceState::Present, stats);
    }

    #[inline]
    fn transition(
        cmd: &mut dyn GfxCommandList,
        backend: GfxBackendKind,
        resource: &SharedGpuResource,
        state: GfxResourceState,
        stats: &mut RgFrameStats,
    ) {
        if GfxStateTracker::transition_shared(cmd, backend, resource, state) {
            stats.barriers += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use prism_gfx::backend::GfxBackendCreateInfo;
    use prism_gfx::backends::headless::SharedHeadlessJournal;
    use prism_gfx::backends::headless::command_list::{HeadlessCommand, HeadlessCommandList};
    use prism_gfx::backends::headless::device::HeadlessDevice;
    use prism_gfx::backends::headless::journal::HeadlessJournal;
    use prism_gfx::backends::headless::swapchain::HeadlessSwapchain;
    use prism_gfx::basic::format::GfxFormat;
    use prism_gfx::basic::usage::GfxUsageFlags;
    use prism_gfx::pipelines::pipeline::GfxPrimitiveTopology;
    use prism_gfx::pipelines::shader::{GfxReflectionBindingType, GfxShaderDesc, GfxShaderReflectionEntry, GfxShaderStage};
    use prism_gfx::resources::resource::{GfxBufferDesc, GfxTextureDesc};
    use prism_render_interface::handles::{BufferHandle, RenderPassHandle, RenderTargetHandle, ShaderHandle, TextureHandle};
    use prism_render_interface::resources::render_pass::RenderPassDesc;
    use prism_render_interface::resources::render_target::{RenderTargetDesc, RenderTargetSize};

    use super::*;

    const WINDOW: GfxExtent2D = GfxExtent2D { width: 64, height: 32 };

    struct Fixture {
        journal: SharedHeadlessJournal,
        rm: ResourceManager,
        graph: RenderGraph,
    }

    impl Fixture {
        fn new(kind: GfxBackendKind) -> Self {
            let journal = Rc::new(RefCell::new(HeadlessJournal::default()));
            let device = Rc::new(HeadlessDevice::new(kind, journal.clone()));
            Self {
                journal,
                rm: ResourceManager::new(device, 2, WINDOW),
                graph: RenderGraph::new(),
            }
        }

        fn shader(&mut self, stage: GfxShaderStage, reflection: Vec<GfxShaderReflectionEntry>) -> ShaderHandle {
            self.rm
                .create_shader(&GfxShaderDesc {
                    name: format!("{:?}", stage),
                    stage,
                    entry_point: "main".to_string(),
                    bytecode: vec![0; 4],
                    reflection,
                    vertex_inputs: vec![],
                })
                .unwrap()
        }

        fn forward_pass(&mut self) -> RenderPassHandle {
            let vs = self.shader(
                GfxShaderStage::Vertex,
                vec![GfxShaderReflectionEntry::new("camera", GfxReflectionBindingType::ConstantBuffer, 1)],
            );
            let ps = self.shader(
                GfxShaderStage::Pixel,
                vec![GfxShaderReflectionEntry::new("albedo", GfxReflectionBindingType::TextureSrv, 1)],
            );
            self.rm
                .create_render_pass(&RenderPassDesc {
                    name: "forward".to_string(),
                    kind: GfxPipelineKind::Graphics,
                    shaders: vec![vs, ps],
                    color_formats: vec![GfxFormat::Rgba8Unorm],
                    depth_format: None,
                    topology: GfxPrimitiveTopology::TriangleList,
                })
                .unwrap()
        }

        fn compute_pass(&mut self) -> RenderPassHandle {
            let cs = self.shader(
                GfxShaderStage::Compute,
                vec![GfxShaderReflectionEntry::new("output", GfxReflectionBindingType::TextureUav, 1)],
            );
            self.rm
                .create_render_pass(&RenderPassDesc {
                    name: "blur".to_string(),
                    kind: GfxPipelineKind::Compute,
                    shaders: vec![cs],
                    color_formats: vec![],
                    depth_format: None,
                    topology: GfxPrimitiveTopology::TriangleList,
                })
                .unwrap()
        }

        fn constants(&mut self) -> BufferHandle {
            self.rm
                .create_buffer(&GfxBufferDesc {
                    name: "camera".to_string(),
                    size: 64,
                    usage: GfxUsageFlags::CONSTANT,
                    format: GfxFormat::Unknown,
                })
                .unwrap()
        }

        fn texture(&mut self, name: &str) -> TextureHandle {
            self.rm
                .create_texture(&GfxTextureDesc {
                    name: name.to_string(),
                    width: 4,
                    height: 4,
                    format: GfxFormat::Rgba8Unorm,
                    usage: GfxUsageFlags::SHADER_RESOURCE | GfxUsageFlags::TRANSFER_DST,
                    generate_mips: false,
                    clear_value: None,
                })
                .unwrap()
        }

        fn scene_color(&mut self) -> RenderTargetHandle {
            self.rm
                .create_render_target(&RenderTargetDesc {
                    name: "scene-color".to_string(),
                    format: GfxFormat::Rgba8Unorm,
                    usage: GfxUsageFlags::RENDER_TARGET | GfxUsageFlags::UNORDERED_ACCESS | GfxUsageFlags::TRANSFER_SRC,
                    size: RenderTargetSize::WindowRelative {
                        scale: 1.0,
                        min_width: 1,
                        min_height: 1,
                    },
                    clear_value: Some(GfxClearValue::Color([0.1, 0.2, 0.3, 1.0])),
                })
                .unwrap()
        }

        fn execute(&mut self, swapchain_image_index: Option<u32>) -> (RgFrameStats, Vec<HeadlessCommand>) {
            let mut cmd = HeadlessCommandList::new("frame");
            cmd.begin();
            let stats = self.graph.execute(&mut cmd, &mut self.rm, WINDOW, swapchain_image_index).unwrap();
            cmd.end();
            (stats, cmd.commands().to_vec())
        }

        fn destroy(mut self) {
            self.graph.destroy(&mut self.rm);
            self.rm.destroy();
        }
    }

    fn forward_node(fixture: &mut Fixture) -> (RgNodeHandle, TextureHandle, RenderTargetHandle) {
        let pass = fixture.forward_pass();
        let camera = fixture.constants();
        let albedo = fixture.texture("albedo");
        let target = fixture.scene_color();
        let node = fixture.graph.create_node(
            RgNodeDesc::new("forward", pass)
                .bind(RgBinding::cbv("camera", camera))
                .bind(RgBinding::srv("albedo", albedo))
                .color_target(target, true)
                .command(RgCommand::Draw {
                    vertex_count: 3,
                    instance_count: 1,
                    first_vertex: 0,
                    first_instance: 0,
                }),
        );
        (node, albedo, target)
    }

    #[test]
    fn test_graphics_node_records_in_order() {
        let mut fixture = Fixture::new(GfxBackendKind::Vulkan);
        let (node, _, _) = forward_node(&mut fixture);
        fixture.graph.register_node(node);

        let (stats, commands) = fixture.execute(None);
        assert_eq!(stats.nodes_executed, 1);
        assert_eq!(stats.draws, 1);
        assert_eq!(stats.descriptors_created, 2);
        assert_eq!(stats.descriptor_writes, 2);

        let position = |pred: &dyn Fn(&HeadlessCommand) -> bool| commands.iter().position(|c| pred(c)).unwrap();
        let bind_pipeline = position(&|c| matches!(c, HeadlessCommand::BindPipeline { .. }));
        let bind_descriptors = position(&|c| matches!(c, HeadlessCommand::BindDescriptors { .. }));
        let begin = position(&|c| matches!(c, HeadlessCommand::BeginRendering(_)));
        let draw = position(&|c| matches!(c, HeadlessCommand::Draw { .. }));
        let end = position(&|c| matches!(c, HeadlessCommand::EndRendering));
        assert!(bind_pipeline < bind_descriptors && bind_descriptors < begin && begin < draw && draw < end);

        // 所有 barrier 都在渲染区域之外
        assert!(commands[begin..end].iter().all(|c| !matches!(c, HeadlessCommand::Barrier(_))));

        let HeadlessCommand::BeginRendering(info) = &commands[begin] else { unreachable!() };
        assert_eq!(info.color_attachments[0].clear, Some([0.1, 0.2, 0.3, 1.0]));

        fixture.destroy();
    }

    #[test]
    fn test_second_frame_reuses_descriptors_and_skips_barriers() {
        let mut fixture = Fixture::new(GfxBackendKind::D3d12);
        let (node, _, _) = forward_node(&mut fixture);

        fixture.graph.register_node(node);
        let (first, _) = fixture.execute(None);
        fixture.graph.clear_queued();
        assert!(first.barriers > 0);

        fixture.graph.register_node(node);
        let (second, _) = fixture.execute(None);
        assert_eq!(second.descriptors_created, 0);
        assert_eq!(second.barriers, 0);
        assert_eq!(second.descriptor_writes, 2);

        fixture.destroy();
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let mut fixture = Fixture::new(GfxBackendKind::Vulkan);
        let (node, _, _) = forward_node(&mut fixture);

        fixture.graph.register_node(node);
        fixture.graph.register_node(node);
        assert_eq!(fixture.graph.queued_nodes().len(), 1);

        let (stats, _) = fixture.execute(None);
        assert_eq!(stats.nodes_executed, 1);
        fixture.destroy();
    }

    #[test]
    fn test_changed_sources_recreate_descriptor() {
        let mut fixture = Fixture::new(GfxBackendKind::Vulkan);
        let (node, _, _) = forward_node(&mut fixture);
        fixture.graph.register_node(node);
        fixture.execute(None);

        let replacement = fixture.texture("albedo-2");
        let stale = fixture.graph.node(node).unwrap().cached_descriptor("albedo").unwrap().clone();
        fixture.graph.node_mut(node).unwrap().desc_mut().bindings[1] = RgBinding::srv("albedo", replacement);

        let pending_before = fixture.rm.deferred_release().pending_count();
        let (stats, _) = fixture.execute(None);
        assert_eq!(stats.descriptors_created, 1);
        assert_eq!(fixture.rm.deferred_release().pending_count(), pending_before + 1);

        // 旧 descriptor 在退休之前仍然存活
        assert!(fixture.journal.borrow().descriptors.contains_key(&stale.native()));
        drop(stale);
        fixture.destroy();
    }

    #[test]
    fn test_table_flag_change_recreates_descriptor() {
        let mut fixture = Fixture::new(GfxBackendKind::Vulkan);
        let (node, albedo, _) = forward_node(&mut fixture);
        fixture.graph.register_node(node);
        fixture.execute(None);
        fixture.graph.clear_queued();
        assert!(!fixture.graph.node(node).unwrap().cached_descriptor("albedo").unwrap().is_table());

        // 同一个资源，只改成 descriptor table 形式
        fixture.graph.node_mut(node).unwrap().desc_mut().bindings[1] =
            RgBinding::srv("albedo", albedo).with_descriptor_table(true);
        fixture.graph.register_node(node);
        let pending_before = fixture.rm.deferred_release().pending_count();
        let (stats, _) = fixture.execute(None);
        fixture.graph.clear_queued();
        assert_eq!(stats.descriptors_created, 1);
        assert_eq!(fixture.rm.deferred_release().pending_count(), pending_before + 1);
        assert!(fixture.graph.node(node).unwrap().cached_descriptor("albedo").unwrap().is_table());

        // 形式不再变化时复用
        fixture.graph.register_node(node);
        let (stats, _) = fixture.execute(None);
        assert_eq!(stats.descriptors_created, 0);
        fixture.destroy();
    }

    #[test]
    fn test_compute_node_has_no_rendering_scope() {
        let mut fixture = Fixture::new(GfxBackendKind::D3d12);
        let pass = fixture.compute_pass();
        let target = fixture.scene_color();
        let node = fixture.graph.create_node(
            RgNodeDesc::new("blur", pass)
                .bind(RgBinding::uav("output", target))
                .command(RgCommand::Dispatch { x: 8, y: 4, z: 1 }),
        );
        fixture.graph.register_node(node);

        let (stats, commands) = fixture.execute(None);
        assert_eq!(stats.dispatches, 1);
        assert!(commands.iter().all(|c| !matches!(c, HeadlessCommand::BeginRendering(_))));
        assert!(
            commands
                .iter()
                .any(|c| matches!(c, HeadlessCommand::Barrier(b) if b.after == GfxResourceState::UnorderedAccess))
        );
        fixture.destroy();
    }

    #[test]
    fn test_pre_render_callback_runs_only_for_registered_frames() {
        let mut fixture = Fixture::new(GfxBackendKind::Vulkan);
        let (node, _, _) = forward_node(&mut fixture);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        fixture.graph.node_mut(node).unwrap().desc_mut().pre_render =
            Some(Box::new(move |_: &mut ResourceManager| counter.set(counter.get() + 1)));

        fixture.graph.register_node(node);
        fixture.execute(None);
        fixture.graph.clear_queued();
        fixture.execute(None);
        assert_eq!(calls.get(), 1);
        fixture.destroy();
    }

    #[test]
    fn test_final_output_is_copied_to_swapchain_and_presented() {
        let mut fixture = Fixture::new(GfxBackendKind::Vulkan);
        let swapchain = HeadlessSwapchain::new(
            fixture.journal.clone(),
            &GfxBackendCreateInfo {
                app_name: "graph".to_string(),
                window_extent: WINDOW,
                back_buffer_count: 2,
                swapchain_format: GfxFormat::Bgra8Unorm,
            },
        )
        .unwrap();
        fixture.rm.rebuild_swapchain_targets(&swapchain).unwrap();

        let (node, _, target) = forward_node(&mut fixture);
        fixture.graph.register_node(node);
        fixture.graph.set_final_color_output(Some(target.into()));

        let (_, commands) = fixture.execute(Some(0));
        let copy = commands.iter().position(|c| matches!(c, HeadlessCommand::CopyTexture { .. })).unwrap();
        let HeadlessCommand::CopyTexture { extent, .. } = &commands[copy] else { unreachable!() };
        assert_eq!(*extent, WINDOW);
        assert!(matches!(commands.last(), Some(HeadlessCommand::Barrier(b)) if b.after == GfxResourceState::Present));

        fixture.rm.release_swapchain_targets();
        fixture.destroy();
    }

    #[test]
    fn test_remove_node_defers_descriptor_release() {
        let mut fixture = Fixture::new(GfxBackendKind::Vulkan);
        let (node, _, _) = forward_node(&mut fixture);
        fixture.graph.register_node(node);
        fixture.execute(None);

        let pending_before = fixture.rm.deferred_release().pending_count();
        assert!(fixture.graph.remove_node(node, &mut fixture.rm));
        assert!(fixture.graph.queued_nodes().is_empty());
        assert_eq!(fixture.rm.deferred_release().pending_count(), pending_before + 2);
        assert!(!fixture.graph.remove_node(node, &mut fixture.rm));
        fixture.destroy();
    }

    #[test]
    #[should_panic(expected = "cannot be recorded in a Compute pass")]
    fn test_draw_in_compute_pass_panics() {
        let mut fixture = Fixture::new(GfxBackendKind::Vulkan);
        let pass = fixture.compute_pass();
        let target = fixture.scene_color();
        let node = fixture.graph.create_node(
            RgNodeDesc::new("broken", pass).bind(RgBinding::uav("output", target)).command(RgCommand::Draw {
                vertex_count: 3,
                instance_count: 1,
                first_vertex: 0,
                first_instance: 0,
            }),
        );
        fixture.graph.register_node(node);
        fixture.execute(None);
    }
}
