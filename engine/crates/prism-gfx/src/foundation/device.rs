use crate::basic::native::NativeHandle;
use crate::commands::command_list::GfxCommandList;
use crate::descriptors::descriptor::GfxDescriptorDesc;
use crate::error::GfxResult;
use crate::pipelines::pipeline::GfxPipelineDesc;
use crate::pipelines::root_signature::GfxRootSignatureDesc;
use crate::pipelines::shader::GfxShaderDesc;
use crate::resources::copy_layout::GfxCopyAlignment;
use crate::resources::resource::{GfxBufferDesc, GfxTextureDesc};

/// 后端的编程模型类别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum GfxBackendKind {
    #[default]
    Vulkan,
    D3d12,
}

impl GfxBackendKind {
    #[inline]
    pub const fn copy_alignment(&self) -> GfxCopyAlignment {
        match self {
            GfxBackendKind::Vulkan => GfxCopyAlignment::VULKAN,
            GfxBackendKind::D3d12 => GfxCopyAlignment::D3D12,
        }
    }
}

/// 设备能力接口
///
/// 所有方法都是 `&self`：和 `ash::Device` 一样，设备对象本身在逻辑上是不可变的，
/// 后端在内部维护原生对象表。组件通过构造参数拿到 `Rc<dyn GfxDevice>`，没有全局单例。
pub trait GfxDevice {
    fn backend_kind(&self) -> GfxBackendKind;

    #[inline]
    fn copy_alignment(&self) -> GfxCopyAlignment {
        self.backend_kind().copy_alignment()
    }

    // resource memory
    fn create_buffer(&self, desc: &GfxBufferDesc) -> GfxResult<NativeHandle>;
    fn create_texture(&self, desc: &GfxTextureDesc, mip_levels: u32) -> GfxResult<NativeHandle>;
    fn release_memory(&self, memory: NativeHandle);
    /// 写入 host visible 的 buffer
    fn write_buffer(&self, buffer: NativeHandle, offset: u64, data: &[u8]) -> GfxResult<()>;

    // descriptors
    fn create_descriptor(&self, desc: &GfxDescriptorDesc) -> GfxResult<NativeHandle>;
    fn release_descriptor(&self, descriptor: NativeHandle);

    // pipeline objects
    fn create_shader(&self, desc: &GfxShaderDesc) -> GfxResult<NativeHandle>;
    fn create_root_signature(&self, desc: &GfxRootSignatureDesc) -> GfxResult<NativeHandle>;
    fn create_pipeline(&self, desc: &GfxPipelineDesc) -> GfxResult<NativeHandle>;
    /// 释放 shader / root signature / pipeline
    fn release_object(&self, object: NativeHandle);

    // submission
    fn create_command_list(&self, name: &str) -> GfxResult<Box<dyn GfxCommandList>>;
    /// 提交命令列表，返回这次提交对应的 fence 值
    fn submit(&self, cmd: &mut dyn GfxCommandList) -> GfxResult<u64>;
    fn completed_fence_value(&self) -> u64;
    /// 阻塞直到 fence 达到 `value`
    fn wait_for_fence(&self, value: u64);
    /// 阻塞直到 GPU 完全空闲
    fn wait_idle(&self);
}
