use crate::basic::format::GfxFormat;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxShaderStage {
    Vertex,
    Pixel,
    Compute,
    RayGen,
    Miss,
    ClosestHit,
    AnyHit,
}

/// 反射得到的绑定类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxReflectionBindingType {
    ConstantBuffer,
    /// 32 位 root 常量
    RootConstants { num_32bit_values: u32 },
    /// 只读 buffer（structured / byte address）
    BufferSrv,
    /// 可写 buffer
    BufferUav,
    /// 只读纹理
    TextureSrv,
    /// 可写纹理
    TextureUav,
    Sampler,
    AccelerationStructure,
}

/// 反射提供者给出的一条绑定
///
/// `register_count == 0` 表示无界数组（bindless）。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxShaderReflectionEntry {
    pub name: String,
    pub binding_type: GfxReflectionBindingType,
    pub register_count: u32,
    pub space: u32,
    pub register_index: u32,
}

impl GfxShaderReflectionEntry {
    pub fn new(name: impl Into<String>, binding_type: GfxReflectionBindingType, register_count: u32) -> Self {
        Self {
            name: name.into(),
            binding_type,
            register_count,
            space: 0,
            register_index: 0,
        }
    }
}

/// 已编译的 shader，字节码由外部的编译器产生
#[derive(Clone, Debug)]
pub struct GfxShaderDesc {
    pub name: String,
    pub stage: GfxShaderStage,
    pub entry_point: String,
    pub bytecode: Vec<u8>,
    pub reflection: Vec<GfxShaderReflectionEntry>,
    /// 顶点着色器的输入格式，其他阶段为空
    pub vertex_inputs: Vec<GfxFormat>,
}
