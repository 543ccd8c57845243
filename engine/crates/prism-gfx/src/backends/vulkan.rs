//! Vulkan 类后端的映射表
//!
//! 把后端无关的状态 / 格式 / usage 换算成 synchronization2 的 stage、access 和 image layout。

use ash::vk;
use ash::vk::Handle;

use crate::basic::format::GfxFormat;
use crate::basic::usage::GfxUsageFlags;
use crate::resources::resource_state::GfxResourceState;

/// 某个状态在 Vulkan 下的 stage / access / layout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VkStateMasks {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
    pub layout: vk::ImageLayout,
}

impl VkStateMasks {
    #[inline]
    const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2, layout: vk::ImageLayout) -> Self {
        Self { stage, access, layout }
    }

    /// 写操作的 access flags
    const WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
        vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
            | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw()
            | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw()
            | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
            | vk::AccessFlags2::MEMORY_WRITE.as_raw()
            | vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR.as_raw(),
    );

    /// 用于 barrier src 的 access（去掉读操作）
    #[inline]
    pub fn src_access(&self) -> vk::AccessFlags2 {
        self.access & Self::WRITE_ACCESS
    }

    pub fn from_state(state: GfxResourceState) -> Self {
        use vk::AccessFlags2 as A;
        use vk::ImageLayout as L;
        use vk::PipelineStageFlags2 as S;

        match state {
            GfxResourceState::Undefined => Self::new(S::TOP_OF_PIPE, A::NONE, L::UNDEFINED),
            GfxResourceState::Common => Self::new(S::ALL_COMMANDS, A::MEMORY_READ | A::MEMORY_WRITE, L::GENERAL),
            GfxResourceState::CopySource => Self::new(S::TRANSFER, A::TRANSFER_READ, L::TRANSFER_SRC_OPTIMAL),
            GfxResourceState::CopyDest => Self::new(S::TRANSFER, A::TRANSFER_WRITE, L::TRANSFER_DST_OPTIMAL),
            GfxResourceState::VertexAndConstantBuffer => Self::new(
                S::VERTEX_INPUT | S::VERTEX_SHADER | S::FRAGMENT_SHADER | S::COMPUTE_SHADER,
                A::VERTEX_ATTRIBUTE_READ | A::UNIFORM_READ,
                L::UNDEFINED,
            ),
            GfxResourceState::IndexBuffer => Self::new(S::INDEX_INPUT, A::INDEX_READ, L::UNDEFINED),
            GfxResourceState::RenderTarget => Self::new(
                S::COLOR_ATTACHMENT_OUTPUT,
                A::COLOR_ATTACHMENT_READ | A::COLOR_ATTACHMENT_WRITE,
                L::COLOR_ATTACHMENT_OPTIMAL,
            ),
            GfxResourceState::DepthWrite => Self::new(
                S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS,
                A::DEPTH_STENCIL_ATTACHMENT_READ | A::DEPTH_STENCIL_ATTACHMENT_WRITE,
                L::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            ),
            GfxResourceState::DepthRead => Self::new(
                S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS,
                A::DEPTH_STENCIL_ATTACHMENT_READ,
                L::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            ),
            GfxResourceState::UnorderedAccess => Self::new(
                S::COMPUTE_SHADER | S::FRAGMENT_SHADER | S::RAY_TRACING_SHADER_KHR,
                A::SHADER_STORAGE_READ | A::SHADER_STORAGE_WRITE,
                L::GENERAL,
            ),
            GfxResourceState::NonPixelShaderResource => Self::new(
                S::VERTEX_SHADER | S::COMPUTE_SHADER | S::RAY_TRACING_SHADER_KHR,
                A::SHADER_SAMPLED_READ | A::SHADER_STORAGE_READ,
                L::SHADER_READ_ONLY_OPTIMAL,
            ),
            GfxResourceState::PixelShaderResource => Self::new(
                S::FRAGMENT_SHADER,
                A::SHADER_SAMPLED_READ | A::SHADER_STORAGE_READ,
                L::SHADER_READ_ONLY_OPTIMAL,
            ),
            GfxResourceState::AllShaderResource => Self::new(
                S::VERTEX_SHADER | S::FRAGMENT_SHADER | S::COMPUTE_SHADER | S::RAY_TRACING_SHADER_KHR,
                A::SHADER_SAMPLED_READ | A::SHADER_STORAGE_READ,
                L::SHADER_READ_ONLY_OPTIMAL,
            ),
            GfxResourceState::Present => Self::new(S::BOTTOM_OF_PIPE, A::NONE, L::PRESENT_SRC_KHR),
            GfxResourceState::RaytracingAccelerationStructure => Self::new(
                S::ACCELERATION_STRUCTURE_BUILD_KHR | S::RAY_TRACING_SHADER_KHR,
                A::ACCELERATION_STRUCTURE_READ_KHR | A::ACCELERATION_STRUCTURE_WRITE_KHR,
                L::UNDEFINED,
            ),
        }
    }
}

/// Vulkan 下一次状态转换的完整参数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VkTransitionBarrier {
    pub src_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub aspect: vk::ImageAspectFlags,
}

impl VkTransitionBarrier {
    pub fn new(before: GfxResourceState, after: GfxResourceState, is_texture: bool, format: GfxFormat) -> Self {
        let src = VkStateMasks::from_state(before);
        let dst = VkStateMasks::from_state(after);

        // buffer 没有 layout
        let (old_layout, new_layout) =
            if is_texture { (src.layout, dst.layout) } else { (vk::ImageLayout::UNDEFINED, vk::ImageLayout::UNDEFINED) };

        Self {
            src_stage: src.stage,
            src_access: src.src_access(),
            dst_stage: dst.stage,
            dst_access: dst.access,
            old_layout,
            new_layout,
            aspect: infer_image_aspect(format),
        }
    }

    /// 转换为 `vk::ImageMemoryBarrier2`，layer 和 mip 覆盖全部 subresource
    pub fn to_image_barrier(&self, image: u64) -> vk::ImageMemoryBarrier2<'static> {
        vk::ImageMemoryBarrier2::default()
            .image(vk::Image::from_raw(image))
            .src_stage_mask(self.src_stage)
            .src_access_mask(self.src_access)
            .dst_stage_mask(self.dst_stage)
            .dst_access_mask(self.dst_access)
            .old_layout(self.old_layout)
            .new_layout(self.new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: self.aspect,
                base_mip_level: 0,
                level_count: vk::REMAINING_MIP_LEVELS,
                base_array_layer: 0,
                layer_count: vk::REMAINING_ARRAY_LAYERS,
            })
    }

    pub fn to_buffer_barrier(&self, buffer: u64) -> vk::BufferMemoryBarrier2<'static> {
        vk::BufferMemoryBarrier2::default()
            .buffer(vk::Buffer::from_raw(buffer))
            .offset(0)
            .size(vk::WHOLE_SIZE)
            .src_stage_mask(self.src_stage)
            .src_access_mask(self.src_access)
            .dst_stage_mask(self.dst_stage)
            .dst_access_mask(self.dst_access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
    }
}

/// 根据 format 推断 image aspect
pub fn infer_image_aspect(format: GfxFormat) -> vk::ImageAspectFlags {
    match format {
        GfxFormat::D32Float => vk::ImageAspectFlags::DEPTH,
        GfxFormat::D24UnormS8Uint => vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        _ => vk::ImageAspectFlags::COLOR,
    }
}

pub fn to_vk_format(format: GfxFormat) -> vk::Format {
    match format {
        GfxFormat::Unknown => vk::Format::UNDEFINED,
        GfxFormat::R8Unorm => vk::Format::R8_UNORM,
        GfxFormat::Rg8Unorm => vk::Format::R8G8_UNORM,
        GfxFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        GfxFormat::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
        GfxFormat::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        GfxFormat::Bgra8Srgb => vk::Format::B8G8R8A8_SRGB,
        GfxFormat::R16Float => vk::Format::R16_SFLOAT,
        GfxFormat::Rgba16Float => vk::Format::R16G16B16A16_SFLOAT,
        GfxFormat::R32Float => vk::Format::R32_SFLOAT,
        GfxFormat::Rg32Float => vk::Format::R32G32_SFLOAT,
        GfxFormat::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
        GfxFormat::R32Uint => vk::Format::R32_UINT,
        GfxFormat::R16Uint => vk::Format::R16_UINT,
        GfxFormat::D32Float => vk::Format::D32_SFLOAT,
        GfxFormat::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
    }
}

pub fn to_vk_buffer_usage(usage: GfxUsageFlags) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
    if usage.contains(GfxUsageFlags::TRANSFER_SRC) {
        flags |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(GfxUsageFlags::TRANSFER_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    if usage.contains(GfxUsageFlags::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(GfxUsageFlags::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(GfxUsageFlags::INDIRECT) {
        flags |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    if usage.contains(GfxUsageFlags::CONSTANT) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.intersects(GfxUsageFlags::SHADER_RESOURCE | GfxUsageFlags::UNORDERED_ACCESS) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(GfxUsageFlags::RAY_TRACING) {
        flags |= vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR
            | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR;
    }
    flags
}

pub fn to_vk_image_usage(usage: GfxUsageFlags) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(GfxUsageFlags::RENDER_TARGET) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(GfxUsageFlags::DEPTH_STENCIL) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(GfxUsageFlags::SHADER_RESOURCE) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(GfxUsageFlags::UNORDERED_ACCESS) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    if usage.contains(GfxUsageFlags::TRANSFER_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(GfxUsageFlags::TRANSFER_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    flags
}
