//! 在 headless 后端上跑一段模拟的窗口事件序列：
//! 拖拽 resize、最小化、恢复以及一次 present 失败，打印每帧的生命周期状态和统计。
//!
//! ```text
//! cargo run --bin headless_frames -- [config.toml]
//! ```

mod demo_scene;

use anyhow::Context;

use prism_gfx::backends::headless::HeadlessBackendFactory;
use prism_renderer::config::RendererConfig;
use prism_renderer::renderer::Renderer;

use demo_scene::DemoScene;

/// 模拟的窗口尺寸序列
fn window_sizes(config: &RendererConfig) -> Vec<(u32, u32)> {
    let (w, h) = (config.window_width, config.window_height);
    let mut sizes = vec![(w, h); 4];
    // 拖拽过程中尺寸每帧都在变化，不应触发 resize
    sizes.extend((1..=6).map(|step| (w + step * 16, h + step * 9)));
    // 松开鼠标，尺寸稳定下来
    sizes.extend(vec![(w + 96, h + 54); 5]);
    sizes.extend(vec![(0, 0); 3]);
    sizes.extend(vec![(w + 96, h + 54); 6]);
    sizes
}

fn main() -> anyhow::Result<()> {
    prism_crate_tools::init_log::init_log();

    let config = match std::env::args().nth(1) {
        Some(path) => RendererConfig::from_file(&path)?,
        None => RendererConfig::default(),
    };
    log::info!("config: {:?}", config);

    let factory = HeadlessBackendFactory::new(config.emulated_backend.into());
    let journal = factory.journal();
    let mut renderer = Renderer::new(config.clone(), &factory).context("创建 renderer 失败")?;

    let scene = DemoScene::new(&mut renderer).context("创建场景失败")?;
    renderer.set_tick_callback(move |renderer, frame| {
        log::debug!("tick frame {} [{}]", frame.frame_id, frame.frame_label);
        renderer.register_render_graph_node(scene.forward);
        renderer.register_render_graph_node(scene.post);
    });

    for (idx, (width, height)) in window_sizes(&config).into_iter().enumerate() {
        if idx == 22 {
            // 模拟一次 present 失败，下一帧会立即重建交换链
            journal.borrow_mut().surface_script.present_failures = 1;
        }

        let result = renderer.tick(width, height)?;
        match result.stats {
            Some(stats) => log::info!(
                "#{:02} {}x{} -> {:?} {:?} | {}",
                idx,
                width,
                height,
                result.sync.status,
                result.sync.state,
                stats
            ),
            None => log::info!(
                "#{:02} {}x{} -> {:?} {:?} | skipped",
                idx,
                width,
                height,
                result.sync.status,
                result.sync.state
            ),
        }
    }

    {
        let journal = journal.borrow();
        log::info!(
            "submissions: {}, resize calls: {:?}, presents: {}, live memories: {}",
            journal.submissions.len(),
            journal.resize_calls,
            journal.present_count,
            journal.live_memory_count()
        );
    }

    renderer.destroy();
    Ok(())
}
