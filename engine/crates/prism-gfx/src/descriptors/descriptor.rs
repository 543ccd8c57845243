use crate::basic::format::GfxFormat;
use crate::basic::native::NativeHandle;
use crate::pipelines::root_signature::GfxRegisterType;

/// descriptor 的视图类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxDescriptorViewType {
    Cbv,
    Srv,
    Uav,
    Rtv,
    Dsv,
    Sampler,
    AccelerationStructure,
}

impl GfxDescriptorViewType {
    /// 绑定到 root signature 时对应的寄存器类型；RTV/DSV 不经过 root signature
    pub fn register_type(&self) -> Option<GfxRegisterType> {
        match self {
            GfxDescriptorViewType::Cbv => Some(GfxRegisterType::ConstantBuffer),
            GfxDescriptorViewType::Srv | GfxDescriptorViewType::AccelerationStructure => {
                Some(GfxRegisterType::ShaderResource)
            }
            GfxDescriptorViewType::Uav => Some(GfxRegisterType::UnorderedAccess),
            GfxDescriptorViewType::Sampler => Some(GfxRegisterType::Sampler),
            GfxDescriptorViewType::Rtv | GfxDescriptorViewType::Dsv => None,
        }
    }
}

/// 创建 descriptor 的请求
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxDescriptorDesc {
    pub view_type: GfxDescriptorViewType,
    /// 视图指向的资源，多于一个时为 descriptor table
    pub resources: Vec<NativeHandle>,
    pub format: GfxFormat,
    /// 为 true 时以 descriptor table 的方式创建（即使只有一个资源）
    pub as_table: bool,
}

/// 一次 descriptor 绑定的值类型记录
///
/// 在一帧内按槽位累积，最后在 `finalize` 时一次性提交给命令列表。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxDescriptorWrite {
    pub register_type: GfxRegisterType,
    pub register_begin: u32,
    pub space: u32,
    pub global_parameter_index: Option<u32>,
    pub local_space_index: u32,
    pub descriptor: NativeHandle,
    pub view_type: GfxDescriptorViewType,
    pub is_table: bool,
    pub descriptor_count: u32,
}
