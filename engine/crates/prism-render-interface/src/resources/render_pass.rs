use prism_gfx::basic::format::GfxFormat;
use prism_gfx::basic::native::NativeHandle;
use prism_gfx::pipelines::pipeline::{GfxPipelineKind, GfxPrimitiveTopology};

use crate::handles::ShaderHandle;
use crate::root_signature::RootSignature;

#[derive(Clone, Debug)]
pub struct RenderPassDesc {
    pub name: String,
    pub kind: GfxPipelineKind,
    pub shaders: Vec<ShaderHandle>,
    pub color_formats: Vec<GfxFormat>,
    pub depth_format: Option<GfxFormat>,
    pub topology: GfxPrimitiveTopology,
}

/// 管线对象 + 由所有 shader 阶段反射合并出的 root signature
pub struct RenderPass {
    pub(crate) name: String,
    pub(crate) kind: GfxPipelineKind,
    pub(crate) root_signature: RootSignature,
    pub(crate) pipeline: NativeHandle,
    pub(crate) topology: GfxPrimitiveTopology,
}
// getters
impl RenderPass {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[inline]
    pub fn kind(&self) -> GfxPipelineKind {
        self.kind
    }
    #[inline]
    pub fn root_signature(&self) -> &RootSignature {
        &self.root_signature
    }
    #[inline]
    pub fn pipeline(&self) -> NativeHandle {
        self.pipeline
    }
    #[inline]
    pub fn topology(&self) -> GfxPrimitiveTopology {
        self.topology
    }
}
