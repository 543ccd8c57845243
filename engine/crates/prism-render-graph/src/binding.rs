use prism_gfx::basic::usage::GfxUsageFlags;
use prism_gfx::descriptors::descriptor::GfxDescriptorViewType;
use prism_gfx::pipelines::pipeline::GfxPipelineKind;
use prism_gfx::resources::resource::GpuResource;
use prism_gfx::resources::resource_state::GfxResourceState;
use prism_render_interface::handles::{RenderTargetHandle, ResourceRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgBindingKind {
    ConstantBuffer,
    ShaderResource,
    UnorderedAccess,
}

/// 按 shader 参数名声明的一个资源绑定
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgBinding {
    /// shader 反射中的参数名
    pub name: String,
    pub kind: RgBindingKind,
    pub resources: Vec<ResourceRef>,
    /// 以 descriptor table 的形式绑定；构造时默认为 "资源数量大于 1"，之后只能通过
    /// [`Self::with_descriptor_table`] 在构造链上修改
    as_descriptor_table: bool,
}

// new & init
impl RgBinding {
    pub fn new(name: impl Into<String>, kind: RgBindingKind, resources: Vec<ResourceRef>) -> Self {
        let as_descriptor_table = resources.len() > 1;
        Self {
            name: name.into(),
            kind,
            resources,
            as_descriptor_table,
        }
    }

    pub fn cbv(name: impl Into<String>, resource: impl Into<ResourceRef>) -> Self {
        Self::new(name, RgBindingKind::ConstantBuffer, vec![resource.into()])
    }

    pub fn srv(name: impl Into<String>, resource: impl Into<ResourceRef>) -> Self {
        Self::new(name, RgBindingKind::ShaderResource, vec![resource.into()])
    }

    pub fn srv_array(name: impl Into<String>, resources: Vec<ResourceRef>) -> Self {
        Self::new(name, RgBindingKind::ShaderResource, resources)
    }

    pub fn uav(name: impl Into<String>, resource: impl Into<ResourceRef>) -> Self {
        Self::new(name, RgBindingKind::UnorderedAccess, vec![resource.into()])
    }

    /// 显式指定是否以 table 形式绑定，例如只有一个元素但需要预留扩展的 table
    pub fn with_descriptor_table(mut self, as_descriptor_table: bool) -> Self {
        self.as_descriptor_table = as_descriptor_table;
        self
    }
}
// getters
impl RgBinding {
    #[inline]
    pub fn is_descriptor_table(&self) -> bool {
        self.as_descriptor_table
    }
}
// tools
impl RgBinding {
    /// 来源资源在绑定前需要处于的状态
    pub fn required_state(&self, pipeline_kind: GfxPipelineKind, resource: &GpuResource) -> GfxResourceState {
        match self.kind {
            RgBindingKind::ConstantBuffer => GfxResourceState::VertexAndConstantBuffer,
            RgBindingKind::UnorderedAccess => GfxResourceState::UnorderedAccess,
            RgBindingKind::ShaderResource if is_acceleration_structure(resource) => {
                GfxResourceState::RaytracingAccelerationStructure
            }
            RgBindingKind::ShaderResource => match pipeline_kind {
                GfxPipelineKind::Graphics => GfxResourceState::AllShaderResource,
                GfxPipelineKind::Compute | GfxPipelineKind::RayTracing => GfxResourceState::NonPixelShaderResource,
            },
        }
    }

    pub fn view_type(&self, resource: &GpuResource) -> GfxDescriptorViewType {
        match self.kind {
            RgBindingKind::ConstantBuffer => GfxDescriptorViewType::Cbv,
            RgBindingKind::UnorderedAccess => GfxDescriptorViewType::Uav,
            RgBindingKind::ShaderResource if is_acceleration_structure(resource) => {
                GfxDescriptorViewType::AccelerationStructure
            }
            RgBindingKind::ShaderResource => GfxDescriptorViewType::Srv,
        }
    }
}

fn is_acceleration_structure(resource: &GpuResource) -> bool {
    !resource.is_texture() && resource.usage().contains(GfxUsageFlags::RAY_TRACING)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgColorTarget {
    pub target: RenderTargetHandle,
    /// 为 true 时使用 render target 的 clear value 清除
    pub clear: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgDepthTarget {
    pub target: RenderTargetHandle,
    /// 为 true 时转换到 depth-write，否则 depth-read
    pub write_enabled: bool,
    pub clear: bool,
}

impl RgDepthTarget {
    #[inline]
    pub fn required_state(&self) -> GfxResourceState {
        if self.write_enabled { GfxResourceState::DepthWrite } else { GfxResourceState::DepthRead }
    }
}
