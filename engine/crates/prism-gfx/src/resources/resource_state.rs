//! 资源状态定义
//!
//! 后端无关的状态枚举。每个 [`crate::resources::resource::GpuResource`] 上的状态字段
//! 是决定下一次使用前需要什么 barrier 的唯一依据。

use crate::basic::usage::GfxUsageFlags;
use crate::resources::resource::GpuResourceKind;

/// GPU 资源当前同步到的访问模式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum GfxResourceState {
    /// 初始状态，内容未定义。只能作为 barrier 的 before 状态出现
    #[default]
    Undefined,
    Common,
    CopySource,
    CopyDest,
    VertexAndConstantBuffer,
    IndexBuffer,
    RenderTarget,
    DepthWrite,
    DepthRead,
    UnorderedAccess,
    /// 非像素着色器阶段可读
    NonPixelShaderResource,
    /// 像素着色器阶段可读
    PixelShaderResource,
    /// 所有着色器阶段可读
    AllShaderResource,
    Present,
    RaytracingAccelerationStructure,
}

impl GfxResourceState {
    /// 该状态是否会写入资源
    #[inline]
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            GfxResourceState::CopyDest
                | GfxResourceState::RenderTarget
                | GfxResourceState::DepthWrite
                | GfxResourceState::UnorderedAccess
        )
    }

    #[inline]
    pub fn is_shader_resource(&self) -> bool {
        matches!(
            self,
            GfxResourceState::NonPixelShaderResource
                | GfxResourceState::PixelShaderResource
                | GfxResourceState::AllShaderResource
        )
    }

    /// 资源在声明了 `usage` 的前提下，能否被转换到该状态
    ///
    /// `Undefined` 永远不是合法的目标状态；`Common` 对所有资源都合法。
    pub fn is_allowed_for(&self, kind: &GpuResourceKind, usage: GfxUsageFlags) -> bool {
        let is_texture = matches!(kind, GpuResourceKind::Texture { .. });
        match self {
            GfxResourceState::Undefined => false,
            GfxResourceState::Common => true,
            GfxResourceState::CopySource => usage.contains(GfxUsageFlags::TRANSFER_SRC),
            GfxResourceState::CopyDest => usage.contains(GfxUsageFlags::TRANSFER_DST),
            GfxResourceState::VertexAndConstantBuffer => {
                !is_texture && usage.intersects(GfxUsageFlags::VERTEX | GfxUsageFlags::CONSTANT)
            }
            GfxResourceState::IndexBuffer => !is_texture && usage.contains(GfxUsageFlags::INDEX),
            GfxResourceState::RenderTarget => is_texture && usage.contains(GfxUsageFlags::RENDER_TARGET),
            GfxResourceState::DepthWrite | GfxResourceState::DepthRead => {
                is_texture && usage.contains(GfxUsageFlags::DEPTH_STENCIL)
            }
            GfxResourceState::UnorderedAccess => usage.contains(GfxUsageFlags::UNORDERED_ACCESS),
            GfxResourceState::NonPixelShaderResource
            | GfxResourceState::PixelShaderResource
            | GfxResourceState::AllShaderResource => usage.contains(GfxUsageFlags::SHADER_RESOURCE),
            GfxResourceState::Present => is_texture && usage.contains(GfxUsageFlags::RENDER_TARGET),
            GfxResourceState::RaytracingAccelerationStructure => {
                !is_texture && usage.contains(GfxUsageFlags::RAY_TRACING)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_is_never_a_target() {
        let kind = GpuResourceKind::Buffer { size: 16 };
        assert!(!GfxResourceState::Undefined.is_allowed_for(&kind, GfxUsageFlags::all()));
    }

    #[test]
    fn test_texture_states_follow_usage() {
        let kind = GpuResourceKind::Texture {
            width: 4,
            height: 4,
            mip_levels: 1,
        };
        let usage = GfxUsageFlags::RENDER_TARGET | GfxUsageFlags::SHADER_RESOURCE;

        assert!(GfxResourceState::RenderTarget.is_allowed_for(&kind, usage));
        assert!(GfxResourceState::PixelShaderResource.is_allowed_for(&kind, usage));
        assert!(!GfxResourceState::UnorderedAccess.is_allowed_for(&kind, usage));
        assert!(!GfxResourceState::IndexBuffer.is_allowed_for(&kind, GfxUsageFlags::all()));
    }
}
