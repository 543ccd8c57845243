//! Root signature 的后端无关描述
//!
//! 名字到 allocation 的映射由上层的 allocator 计算，这里只定义
//! 后端构建 root signature（D3D12）或 descriptor set layout（Vulkan）所需的扁平记录。

/// HLSL 寄存器类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GfxRegisterType {
    /// `b#`：constant buffer / root constant
    ConstantBuffer,
    /// `t#`：shader resource
    ShaderResource,
    /// `u#`：unordered access
    UnorderedAccess,
    /// `s#`：sampler
    Sampler,
}

impl GfxRegisterType {
    pub const fn prefix(&self) -> char {
        match self {
            GfxRegisterType::ConstantBuffer => 'b',
            GfxRegisterType::ShaderResource => 't',
            GfxRegisterType::UnorderedAccess => 'u',
            GfxRegisterType::Sampler => 's',
        }
    }
}

/// 一个 root parameter 在 root signature 中的位置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxRootSignatureAllocation {
    pub register_type: GfxRegisterType,
    /// 起始寄存器
    pub register_begin: u32,
    /// 结束寄存器（不包含）；bindless 范围为 [`Self::UNBOUNDED_REGISTER_END`]
    pub register_end: u32,
    pub space: u32,
    /// 所有非 sampler 参数共享的全局序号，sampler 没有全局序号
    pub global_parameter_index: Option<u32>,
    /// 在所属 space 内从 0 开始的序号，供按 space 局部槽位绑定的后端使用
    pub local_space_index: u32,
    pub bindless: bool,
}

impl GfxRootSignatureAllocation {
    pub const UNBOUNDED_REGISTER_END: u32 = u32::MAX;

    #[inline]
    pub fn register_count(&self) -> Option<u32> {
        if self.bindless { None } else { Some(self.register_end - self.register_begin) }
    }

    /// 该 allocation 是否覆盖 (register_type, register, space)
    pub fn covers(&self, register_type: GfxRegisterType, register: u32, space: u32) -> bool {
        self.register_type == register_type
            && self.space == space
            && register >= self.register_begin
            && register < self.register_end
    }
}

/// root parameter 在后端的形态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GfxRootParameterShape {
    /// 32 位常量
    Constants { num_32bit_values: u32 },
    /// root descriptor（单个 CBV/SRV/UAV）
    Descriptor,
    /// descriptor table
    Table,
    /// 静态 sampler
    StaticSampler,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxRootParameterDesc {
    pub name: String,
    pub shape: GfxRootParameterShape,
    pub allocation: GfxRootSignatureAllocation,
}

/// 交给后端构建 root signature 的描述
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GfxRootSignatureDesc {
    pub name: String,
    /// 按 `global_parameter_index` 排序的非 sampler 参数
    pub parameters: Vec<GfxRootParameterDesc>,
    pub static_samplers: Vec<GfxRootParameterDesc>,
    /// 被使用到的 space 数量
    pub space_count: u32,
}
