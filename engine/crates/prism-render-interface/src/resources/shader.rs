use prism_gfx::basic::format::GfxFormat;
use prism_gfx::basic::native::NativeHandle;
use prism_gfx::pipelines::shader::{GfxShaderReflectionEntry, GfxShaderStage};

/// 已创建的 shader 对象，保留反射信息供 render pass 合并 root signature 布局
pub struct Shader {
    pub(crate) name: String,
    pub(crate) stage: GfxShaderStage,
    pub(crate) native: NativeHandle,
    pub(crate) reflection: Vec<GfxShaderReflectionEntry>,
    pub(crate) vertex_inputs: Vec<GfxFormat>,
}
// getters
impl Shader {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[inline]
    pub fn stage(&self) -> GfxShaderStage {
        self.stage
    }
    #[inline]
    pub fn native(&self) -> NativeHandle {
        self.native
    }
    #[inline]
    pub fn reflection(&self) -> &[GfxShaderReflectionEntry] {
        &self.reflection
    }
    #[inline]
    pub fn vertex_inputs(&self) -> &[GfxFormat] {
        &self.vertex_inputs
    }
}
