use crate::basic::format::GfxFormat;
use crate::basic::native::NativeHandle;
use crate::pipelines::shader::GfxShaderStage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxPipelineKind {
    Graphics,
    Compute,
    RayTracing,
}

impl GfxPipelineKind {
    /// 该类型管线必须提供的 shader 阶段
    pub fn required_stages(&self) -> &'static [GfxShaderStage] {
        match self {
            GfxPipelineKind::Graphics => &[GfxShaderStage::Vertex, GfxShaderStage::Pixel],
            GfxPipelineKind::Compute => &[GfxShaderStage::Compute],
            GfxPipelineKind::RayTracing => &[GfxShaderStage::RayGen],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum GfxPrimitiveTopology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum GfxIndexFormat {
    U16,
    #[default]
    U32,
}

impl GfxIndexFormat {
    pub const fn stride(&self) -> u32 {
        match self {
            GfxIndexFormat::U16 => 2,
            GfxIndexFormat::U32 => 4,
        }
    }
}

/// 交给后端创建管线对象的描述
#[derive(Clone, Debug)]
pub struct GfxPipelineDesc {
    pub name: String,
    pub kind: GfxPipelineKind,
    pub root_signature: NativeHandle,
    /// (stage, shader 原生句柄)
    pub shaders: Vec<(GfxShaderStage, NativeHandle)>,
    pub color_formats: Vec<GfxFormat>,
    pub depth_format: Option<GfxFormat>,
    pub topology: GfxPrimitiveTopology,
    pub vertex_inputs: Vec<GfxFormat>,
}
