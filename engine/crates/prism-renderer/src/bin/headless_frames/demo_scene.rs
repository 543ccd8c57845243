use std::cell::Cell;
use std::rc::Rc;

use prism_gfx::basic::format::GfxFormat;
use prism_gfx::basic::usage::GfxUsageFlags;
use prism_gfx::error::GfxResult;
use prism_gfx::pipelines::pipeline::{GfxIndexFormat, GfxPipelineKind, GfxPrimitiveTopology};
use prism_gfx::pipelines::shader::{GfxReflectionBindingType, GfxShaderDesc, GfxShaderReflectionEntry, GfxShaderStage};
use prism_gfx::resources::resource::{GfxBufferDesc, GfxClearValue, GfxTextureDesc};
use prism_render_graph::binding::RgBinding;
use prism_render_graph::command::RgCommand;
use prism_render_graph::node::{RgNodeDesc, RgNodeHandle};
use prism_render_interface::resources::buffer::IndexedBufferDesc;
use prism_render_interface::resources::render_pass::RenderPassDesc;
use prism_render_interface::resources::render_target::{RenderTargetDesc, RenderTargetSize};
use prism_renderer::renderer::Renderer;

/// 一个前向绘制节点加一个全屏后处理节点
pub struct DemoScene {
    pub forward: RgNodeHandle,
    pub post: RgNodeHandle,
}

fn shader_desc(name: &str, stage: GfxShaderStage, reflection: Vec<GfxShaderReflectionEntry>) -> GfxShaderDesc {
    GfxShaderDesc {
        name: name.to_string(),
        stage,
        entry_point: "main".to_string(),
        // 字节码由外部的编译器提供，这里只需要一个占位
        bytecode: vec![0x03, 0x02, 0x23, 0x07],
        reflection,
        vertex_inputs: if stage == GfxShaderStage::Vertex { vec![GfxFormat::Rg32Float] } else { vec![] },
    }
}

impl DemoScene {
    pub fn new(renderer: &mut Renderer) -> GfxResult<Self> {
        let camera = renderer.create_buffer(&GfxBufferDesc {
            name: "camera".to_string(),
            size: 64,
            usage: GfxUsageFlags::CONSTANT,
            format: GfxFormat::Unknown,
        })?;

        let albedo = renderer.create_texture(&GfxTextureDesc {
            name: "checker".to_string(),
            width: 8,
            height: 8,
            format: GfxFormat::Rgba8Unorm,
            usage: GfxUsageFlags::SHADER_RESOURCE | GfxUsageFlags::TRANSFER_DST,
            generate_mips: true,
            clear_value: None,
        })?;
        let checker = (0..64u32)
            .flat_map(|idx| if (idx / 8 + idx % 8) % 2 == 0 { [255u8; 4] } else { [0, 0, 0, 255] })
            .collect::<Vec<_>>();
        renderer.upload_texture_data(albedo, &[checker.as_slice()])?;

        let quad = renderer.create_indexed_buffer(&IndexedBufferDesc {
            name: "quad".to_string(),
            vertex_data: [[-1.0f32, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]]
                .iter()
                .flatten()
                .flat_map(|v| v.to_le_bytes())
                .collect(),
            vertex_stride: 8,
            index_data: [0u16, 1, 2, 0, 2, 3].iter().flat_map(|i| i.to_le_bytes()).collect(),
            index_format: GfxIndexFormat::U16,
        })?;

        let scene_color = renderer.create_render_target(&RenderTargetDesc {
            name: "scene-color".to_string(),
            format: GfxFormat::Rgba16Float,
            usage: GfxUsageFlags::RENDER_TARGET | GfxUsageFlags::SHADER_RESOURCE,
            size: RenderTargetSize::WindowRelative {
                scale: 1.0,
                min_width: 1,
                min_height: 1,
            },
            clear_value: Some(GfxClearValue::Color([0.05, 0.05, 0.08, 1.0])),
        })?;
        let depth = renderer.create_render_target(&RenderTargetDesc {
            name: "depth".to_string(),
            format: GfxFormat::D32Float,
            usage: GfxUsageFlags::DEPTH_STENCIL,
            size: RenderTargetSize::WindowRelative {
                scale: 1.0,
                min_width: 1,
                min_height: 1,
            },
            clear_value: Some(GfxClearValue::DepthStencil { depth: 1.0, stencil: 0 }),
        })?;
        let output = renderer.create_render_target(&RenderTargetDesc {
            name: "tonemapped".to_string(),
            format: GfxFormat::Bgra8Unorm,
            usage: GfxUsageFlags::RENDER_TARGET | GfxUsageFlags::UNORDERED_ACCESS | GfxUsageFlags::TRANSFER_SRC,
            size: RenderTargetSize::WindowRelative {
                scale: 1.0,
                min_width: 1,
                min_height: 1,
            },
            clear_value: None,
        })?;

        let vs = renderer.create_shader(&shader_desc(
            "forward-vs",
            GfxShaderStage::Vertex,
            vec![GfxShaderReflectionEntry::new("camera", GfxReflectionBindingType::ConstantBuffer, 1)],
        ))?;
        let ps = renderer.create_shader(&shader_desc(
            "forward-ps",
            GfxShaderStage::Pixel,
            vec![
                GfxShaderReflectionEntry::new("albedo", GfxReflectionBindingType::TextureSrv, 1),
                GfxShaderReflectionEntry::new("linear_sampler", GfxReflectionBindingType::Sampler, 1),
            ],
        ))?;
        let cs = renderer.create_shader(&shader_desc(
            "tonemap-cs",
            GfxShaderStage::Compute,
            vec![
                GfxShaderReflectionEntry::new("scene", GfxReflectionBindingType::TextureSrv, 1),
                GfxShaderReflectionEntry::new("output", GfxReflectionBindingType::TextureUav, 1),
            ],
        ))?;

        let forward_pass = renderer.create_render_pass(&RenderPassDesc {
            name: "forward".to_string(),
            kind: GfxPipelineKind::Graphics,
            shaders: vec![vs, ps],
            color_formats: vec![GfxFormat::Rgba16Float],
            depth_format: Some(GfxFormat::D32Float),
            topology: GfxPrimitiveTopology::TriangleList,
        })?;
        let tonemap_pass = renderer.create_render_pass(&RenderPassDesc {
            name: "tonemap".to_string(),
            kind: GfxPipelineKind::Compute,
            shaders: vec![cs],
            color_formats: vec![],
            depth_format: None,
            topology: GfxPrimitiveTopology::TriangleList,
        })?;

        let time = Rc::new(Cell::new(0u32));
        let forward = renderer.create_render_graph_node(
            RgNodeDesc::new("forward", forward_pass)
                .bind(RgBinding::cbv("camera", camera))
                .bind(RgBinding::srv("albedo", albedo))
                .color_target(scene_color, true)
                .depth_target(depth, true, true)
                .command(RgCommand::DrawIndexed {
                    buffer: quad,
                    instance_count: 1,
                })
                .pre_render(move |resource_manager| {
                    time.set(time.get().wrapping_add(1));
                    let data = time.get().to_le_bytes();
                    if let Err(err) = resource_manager.upload_buffer_data(camera, &data, 0, data.len() as u64) {
                        log::error!("failed to update camera constants: {}", err);
                    }
                }),
        );
        let post = renderer.create_render_graph_node(
            RgNodeDesc::new("tonemap", tonemap_pass)
                .bind(RgBinding::srv("scene", scene_color))
                .bind(RgBinding::uav("output", output))
                .command(RgCommand::Dispatch { x: 160, y: 90, z: 1 }),
        );
        renderer.set_final_color_output(Some(output.into()));

        Ok(Self { forward, post })
    }
}
