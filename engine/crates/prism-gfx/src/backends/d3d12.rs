//! D3D12 类后端的映射表

use crate::basic::format::GfxFormat;
use crate::resources::resource_state::GfxResourceState;

bitflags::bitflags! {
    /// 与 `D3D12_RESOURCE_STATES` 数值一致
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct D3d12ResourceStates: u32 {
        const COMMON = 0;
        const VERTEX_AND_CONSTANT_BUFFER = 0x1;
        const INDEX_BUFFER = 0x2;
        const RENDER_TARGET = 0x4;
        const UNORDERED_ACCESS = 0x8;
        const DEPTH_WRITE = 0x10;
        const DEPTH_READ = 0x20;
        const NON_PIXEL_SHADER_RESOURCE = 0x40;
        const PIXEL_SHADER_RESOURCE = 0x80;
        const INDIRECT_ARGUMENT = 0x200;
        const COPY_DEST = 0x400;
        const COPY_SOURCE = 0x800;
        const RAYTRACING_ACCELERATION_STRUCTURE = 0x400000;
    }
}

impl D3d12ResourceStates {
    pub const PRESENT: Self = Self::COMMON;

    pub fn from_state(state: GfxResourceState) -> Self {
        match state {
            GfxResourceState::Undefined | GfxResourceState::Common => Self::COMMON,
            GfxResourceState::CopySource => Self::COPY_SOURCE,
            GfxResourceState::CopyDest => Self::COPY_DEST,
            GfxResourceState::VertexAndConstantBuffer => Self::VERTEX_AND_CONSTANT_BUFFER,
            GfxResourceState::IndexBuffer => Self::INDEX_BUFFER,
            GfxResourceState::RenderTarget => Self::RENDER_TARGET,
            GfxResourceState::DepthWrite => Self::DEPTH_WRITE,
            GfxResourceState::DepthRead => Self::DEPTH_READ,
            GfxResourceState::UnorderedAccess => Self::UNORDERED_ACCESS,
            GfxResourceState::NonPixelShaderResource => Self::NON_PIXEL_SHADER_RESOURCE,
            GfxResourceState::PixelShaderResource => Self::PIXEL_SHADER_RESOURCE,
            GfxResourceState::AllShaderResource => Self::NON_PIXEL_SHADER_RESOURCE | Self::PIXEL_SHADER_RESOURCE,
            GfxResourceState::Present => Self::PRESENT,
            GfxResourceState::RaytracingAccelerationStructure => Self::RAYTRACING_ACCELERATION_STRUCTURE,
        }
    }
}

/// `D3D12_RESOURCE_TRANSITION_BARRIER` 的 before / after
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct D3d12TransitionBarrier {
    pub before: D3d12ResourceStates,
    pub after: D3d12ResourceStates,
}

impl D3d12TransitionBarrier {
    pub fn new(before: GfxResourceState, after: GfxResourceState) -> Self {
        Self {
            before: D3d12ResourceStates::from_state(before),
            after: D3d12ResourceStates::from_state(after),
        }
    }

    /// before 与 after 数值相同（例如 COMMON -> PRESENT），后端录制时可以跳过
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// `DXGI_FORMAT` 数值
pub fn to_dxgi_format(format: GfxFormat) -> u32 {
    match format {
        GfxFormat::Unknown => 0,
        GfxFormat::Rgba32Float => 2,
        GfxFormat::Rgba16Float => 10,
        GfxFormat::Rg32Float => 16,
        GfxFormat::Rgba8Unorm => 28,
        GfxFormat::Rgba8Srgb => 29,
        GfxFormat::D32Float => 40,
        GfxFormat::R32Float => 41,
        GfxFormat::R32Uint => 42,
        GfxFormat::D24UnormS8Uint => 45,
        GfxFormat::Rg8Unorm => 49,
        GfxFormat::R16Float => 54,
        GfxFormat::R16Uint => 57,
        GfxFormat::R8Unorm => 61,
        GfxFormat::Bgra8Unorm => 87,
        GfxFormat::Bgra8Srgb => 91,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_bits() {
        assert_eq!(D3d12ResourceStates::from_state(GfxResourceState::CopyDest).bits(), 0x400);
        assert_eq!(D3d12ResourceStates::from_state(GfxResourceState::AllShaderResource).bits(), 0xc0);
        assert_eq!(D3d12ResourceStates::from_state(GfxResourceState::Present).bits(), 0);
    }

    #[test]
    fn test_common_to_present_is_noop() {
        assert!(D3d12TransitionBarrier::new(GfxResourceState::Common, GfxResourceState::Present).is_noop());
        assert!(!D3d12TransitionBarrier::new(GfxResourceState::RenderTarget, GfxResourceState::Present).is_noop());
    }
}
