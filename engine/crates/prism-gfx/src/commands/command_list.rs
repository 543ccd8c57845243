use crate::basic::native::{GfxExtent2D, GfxRect, GfxViewport, NativeHandle};
use crate::commands::barrier::GfxBarrier;
use crate::descriptors::descriptor::GfxDescriptorWrite;
use crate::pipelines::pipeline::{GfxIndexFormat, GfxPipelineKind, GfxPrimitiveTopology};
use crate::resources::copy_layout::GfxMipCopyInfo;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GfxColorAttachment {
    /// RTV
    pub view: NativeHandle,
    /// 为 `Some` 时在 pass 开始时清除
    pub clear: Option<[f32; 4]>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GfxDepthAttachment {
    /// DSV
    pub view: NativeHandle,
    pub clear: Option<f32>,
    pub write_enabled: bool,
}

/// 动态渲染（dynamic rendering / OMSetRenderTargets）所需的信息
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GfxRenderingInfo {
    pub color_attachments: Vec<GfxColorAttachment>,
    pub depth_attachment: Option<GfxDepthAttachment>,
    pub render_area: GfxRect,
}

/// 命令列表能力接口
///
/// 每个后备缓冲槽位持有一个命令列表，只有在对应 fence 完成之后才会被重新 `begin`。
pub trait GfxCommandList {
    fn name(&self) -> &str;
    /// 命令列表的原生句柄，提交时用来找到对应的后端对象
    fn native(&self) -> NativeHandle;

    fn begin(&mut self);
    fn end(&mut self);

    fn resource_barrier(&mut self, barrier: &GfxBarrier);

    fn bind_pipeline(&mut self, kind: GfxPipelineKind, pipeline: NativeHandle);
    fn bind_root_signature(&mut self, kind: GfxPipelineKind, root_signature: NativeHandle);
    fn set_viewport(&mut self, viewport: GfxViewport);
    fn set_scissor(&mut self, scissor: GfxRect);
    fn set_primitive_topology(&mut self, topology: GfxPrimitiveTopology);
    /// 一次性提交一批 descriptor 绑定
    fn bind_descriptors(&mut self, kind: GfxPipelineKind, writes: &[GfxDescriptorWrite]);
    fn bind_vertex_buffer(&mut self, buffer: NativeHandle, stride: u32, size: u64);
    fn bind_index_buffer(&mut self, buffer: NativeHandle, format: GfxIndexFormat, size: u64);

    fn begin_rendering(&mut self, info: &GfxRenderingInfo);
    fn end_rendering(&mut self);

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32);
    fn trace_rays(&mut self, width: u32, height: u32, depth: u32);

    /// 拷贝 `extent` 大小的区域（左上角对齐）
    fn copy_texture(&mut self, src: NativeHandle, dst: NativeHandle, extent: GfxExtent2D);
    /// 把 staging buffer 中一个 mip 的数据拷贝到纹理
    fn copy_buffer_to_texture(&mut self, src: NativeHandle, dst: NativeHandle, mip: &GfxMipCopyInfo);
}
