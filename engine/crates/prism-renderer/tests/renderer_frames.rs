use std::cell::Cell;
use std::rc::Rc;

use prism_gfx::backends::headless::command_list::HeadlessCommand;
use prism_gfx::backends::headless::{HeadlessBackendFactory, SharedHeadlessJournal};
use prism_gfx::basic::format::GfxFormat;
use prism_gfx::basic::native::{GfxExtent2D, NativeHandle};
use prism_gfx::basic::usage::GfxUsageFlags;
use prism_gfx::foundation::device::GfxBackendKind;
use prism_gfx::pipelines::pipeline::{GfxPipelineKind, GfxPrimitiveTopology};
use prism_gfx::pipelines::shader::{GfxReflectionBindingType, GfxShaderDesc, GfxShaderReflectionEntry, GfxShaderStage};
use prism_gfx::resources::resource_state::GfxResourceState;
use prism_render_graph::binding::RgBinding;
use prism_render_graph::command::RgCommand;
use prism_render_graph::node::{RgNodeDesc, RgNodeHandle};
use prism_render_interface::handles::RenderTargetHandle;
use prism_render_interface::resources::render_pass::RenderPassDesc;
use prism_render_interface::resources::render_target::{RenderTargetDesc, RenderTargetSize};
use prism_renderer::config::{RendererConfig, SwapchainLifecycleConfig};
use prism_renderer::renderer::Renderer;
use prism_renderer::swapchain_lifecycle::{SurfaceSyncStatus, SwapchainLifecycleState};

struct Harness {
    renderer: Renderer,
    journal: SharedHeadlessJournal,
    node: RgNodeHandle,
    target: RenderTargetHandle,
}

fn harness(kind: GfxBackendKind, back_buffer_count: u32) -> Harness {
    prism_crate_tools::init_log::init_test_log();

    let config = RendererConfig {
        app_name: "tests".to_string(),
        window_width: 320,
        window_height: 240,
        back_buffer_count,
        swapchain: SwapchainLifecycleConfig {
            min_stable_frames_before_resize: 3,
            retry_cooldown_base_frames: 1,
            retry_cooldown_max_frames: 16,
            failure_log_period: 8,
        },
        ..Default::default()
    };
    let factory = HeadlessBackendFactory::new(kind);
    let journal = factory.journal();
    let mut renderer = Renderer::new(config, &factory).unwrap();

    let vs = renderer
        .create_shader(&GfxShaderDesc {
            name: "vs".to_string(),
            stage: GfxShaderStage::Vertex,
            entry_point: "main".to_string(),
            bytecode: vec![0; 4],
            reflection: vec![],
            vertex_inputs: vec![],
        })
        .unwrap();
    let ps = renderer
        .create_shader(&GfxShaderDesc {
            name: "ps".to_string(),
            stage: GfxShaderStage::Pixel,
            entry_point: "main".to_string(),
            bytecode: vec![0; 4],
            reflection: vec![GfxShaderReflectionEntry::new("history", GfxReflectionBindingType::TextureSrv, 1)],
            vertex_inputs: vec![],
        })
        .unwrap();
    let pass = renderer
        .create_render_pass(&RenderPassDesc {
            name: "fullscreen".to_string(),
            kind: GfxPipelineKind::Graphics,
            shaders: vec![vs, ps],
            color_formats: vec![GfxFormat::Rgba8Unorm],
            depth_format: None,
            topology: GfxPrimitiveTopology::TriangleList,
        })
        .unwrap();

    let window_relative = RenderTargetSize::WindowRelative {
        scale: 0.5,
        min_width: 1,
        min_height: 1,
    };
    let history = renderer
        .create_render_target(&RenderTargetDesc {
            name: "history".to_string(),
            format: GfxFormat::Rgba8Unorm,
            usage: GfxUsageFlags::RENDER_TARGET | GfxUsageFlags::SHADER_RESOURCE,
            size: window_relative,
            clear_value: None,
        })
        .unwrap();
    let target = renderer
        .create_render_target(&RenderTargetDesc {
            name: "color".to_string(),
            format: GfxFormat::Rgba8Unorm,
            usage: GfxUsageFlags::RENDER_TARGET | GfxUsageFlags::TRANSFER_SRC,
            size: RenderTargetSize::WindowRelative {
                scale: 1.0,
                min_width: 1,
                min_height: 1,
            },
            clear_value: None,
        })
        .unwrap();

    let node = renderer.create_render_graph_node(
        RgNodeDesc::new("fullscreen", pass)
            .bind(RgBinding::srv("history", history))
            .color_target(target, true)
            .command(RgCommand::Draw {
                vertex_count: 3,
                instance_count: 1,
                first_vertex: 0,
                first_instance: 0,
            }),
    );
    renderer.set_final_color_output(Some(target.into()));

    Harness {
        renderer,
        journal,
        node,
        target,
    }
}

fn register_every_tick(harness: &mut Harness) {
    let node = harness.node;
    harness.renderer.set_tick_callback(move |renderer, _| renderer.register_render_graph_node(node));
}

#[test]
fn test_unregistered_node_is_not_executed_next_tick() {
    let mut h = harness(GfxBackendKind::Vulkan, 2);

    h.renderer.register_render_graph_node(h.node);
    let first = h.renderer.tick(320, 240).unwrap();
    assert_eq!(first.stats.unwrap().nodes_executed, 1);
    assert!(h.renderer.render_graph().queued_nodes().is_empty());

    let second = h.renderer.tick(320, 240).unwrap();
    assert_eq!(second.stats.unwrap().nodes_executed, 0);
    assert_eq!(h.journal.borrow().submissions.len(), 2);

    h.renderer.destroy();
}

#[test]
fn test_frames_are_presented_in_swapchain_order() {
    let mut h = harness(GfxBackendKind::D3d12, 3);
    register_every_tick(&mut h);

    for _ in 0..5 {
        let result = h.renderer.tick(320, 240).unwrap();
        assert_eq!(result.sync.status, SurfaceSyncStatus::Ready);
        assert_eq!(result.stats.unwrap().draws, 1);
    }

    let journal = h.journal.borrow();
    assert_eq!(journal.present_count, 5);
    assert_eq!(journal.submissions.len(), 5);
    // 每一帧最后都把交换链 image 转换到 Present
    for submission in &journal.submissions {
        assert!(matches!(
            submission.commands.last(),
            Some(HeadlessCommand::Barrier(barrier)) if barrier.after == GfxResourceState::Present
        ));
        assert!(submission.commands.iter().any(|c| matches!(c, HeadlessCommand::CopyTexture { .. })));
    }
    assert_eq!(h.renderer.frame_counter().frame_id(), 5);
    drop(journal);

    h.renderer.destroy();
}

#[test]
fn test_minimized_window_skips_gpu_work() {
    let mut h = harness(GfxBackendKind::Vulkan, 2);
    let ticks = Rc::new(Cell::new(0));
    let counter = ticks.clone();
    let node = h.node;
    h.renderer.set_tick_callback(move |renderer, _| {
        counter.set(counter.get() + 1);
        renderer.register_render_graph_node(node);
    });

    for _ in 0..4 {
        let result = h.renderer.tick(0, 0).unwrap();
        assert_eq!(result.sync.status, SurfaceSyncStatus::Minimized);
        assert!(result.stats.is_none());
    }
    assert_eq!(ticks.get(), 0);
    assert!(h.journal.borrow().submissions.is_empty());

    // 恢复到原来的尺寸不需要 resize
    let result = h.renderer.tick(320, 240).unwrap();
    assert_eq!(result.sync.status, SurfaceSyncStatus::Ready);
    assert_eq!(ticks.get(), 1);
    assert!(h.journal.borrow().resize_calls.is_empty());

    h.renderer.destroy();
}

#[test]
fn test_resize_reallocates_window_relative_targets_safely() {
    let mut h = harness(GfxBackendKind::Vulkan, 2);
    register_every_tick(&mut h);
    h.renderer.tick(320, 240).unwrap();

    let old_native = h.renderer.resource_manager().get_render_target(h.target).unwrap().resource().borrow().native();
    let old_history_view = history_view(&h);

    let statuses = (0..3).map(|_| h.renderer.tick(640, 480).unwrap().sync.status).collect::<Vec<_>>();
    assert_eq!(statuses, vec![SurfaceSyncStatus::Ready, SurfaceSyncStatus::Ready, SurfaceSyncStatus::Resized]);
    assert_eq!(h.journal.borrow().resize_calls, vec![(640, 480)]);

    let target = h.renderer.resource_manager().get_render_target(h.target).unwrap();
    assert_eq!(target.extent(), GfxExtent2D::new(640, 480));

    // 节点的绑定来源变了，descriptor 被重新创建
    assert_ne!(history_view(&h), old_history_view);

    // 旧的 allocation 在 latency 次 sync 之后才释放
    let latency = h.renderer.resource_manager().deferred_release().latency();
    assert_eq!(latency, 3);
    for _ in 0..latency - 1 {
        h.renderer.tick(640, 480).unwrap();
        assert!(h.journal.borrow().is_memory_live(old_native));
    }
    h.renderer.tick(640, 480).unwrap();
    assert!(!h.journal.borrow().is_memory_live(old_native));

    h.renderer.destroy();
}

fn history_view(h: &Harness) -> NativeHandle {
    h.renderer.render_graph().node(h.node).unwrap().cached_descriptor("history").unwrap().native()
}

#[test]
fn test_present_failure_triggers_recovery_on_next_tick() {
    let mut h = harness(GfxBackendKind::D3d12, 2);
    register_every_tick(&mut h);

    h.journal.borrow_mut().surface_script.present_failures = 1;
    let failed = h.renderer.tick(320, 240).unwrap();
    assert!(failed.stats.is_some());
    assert_eq!(h.renderer.lifecycle().state(), SwapchainLifecycleState::ResizePending);
    assert_eq!(h.renderer.lifecycle().present_failure_count(), 1);

    let recovered = h.renderer.tick(320, 240).unwrap();
    assert_eq!(recovered.sync.status, SurfaceSyncStatus::Resized);
    assert_eq!(h.journal.borrow().resize_calls, vec![(320, 240)]);
    assert_eq!(h.renderer.lifecycle().present_failure_count(), 0);

    h.renderer.destroy();
}

#[test]
fn test_acquire_failure_skips_submission() {
    let mut h = harness(GfxBackendKind::Vulkan, 2);
    register_every_tick(&mut h);

    h.journal.borrow_mut().surface_script.acquire_failures = 1;
    let result = h.renderer.tick(320, 240).unwrap();
    assert!(result.stats.is_none());
    assert!(h.journal.borrow().submissions.is_empty());
    assert!(h.renderer.render_graph().queued_nodes().is_empty());
    assert_eq!(h.renderer.lifecycle().acquire_failure_count(), 1);

    assert_eq!(h.renderer.tick(320, 240).unwrap().sync.status, SurfaceSyncStatus::Resized);
    h.renderer.destroy();
}

#[test]
fn test_resize_backoff_is_monotonic_and_capped() {
    let mut h = harness(GfxBackendKind::Vulkan, 2);
    register_every_tick(&mut h);
    h.journal.borrow_mut().surface_script.resize_failures = 6;

    let mut cooldowns = Vec::new();
    let mut last_failures = 0;
    for _ in 0..200 {
        let result = h.renderer.tick(400, 300).unwrap();
        let lifecycle = h.renderer.lifecycle();
        if lifecycle.resize_failures() > last_failures {
            last_failures = lifecycle.resize_failures();
            cooldowns.push(lifecycle.retry_cooldown());
        }
        if result.sync.status == SurfaceSyncStatus::Resized {
            break;
        }
        // 冷却期间不执行 render graph
        assert!(result.stats.is_none() || result.sync.status == SurfaceSyncStatus::Ready);
    }

    assert_eq!(cooldowns, vec![1, 2, 4, 8, 16, 16]);
    assert_eq!(h.journal.borrow().resize_calls.len(), 7);
    assert_eq!(h.renderer.swapchain().extent(), GfxExtent2D::new(400, 300));

    h.renderer.destroy();
}
