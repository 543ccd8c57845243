//! 后端无关的 barrier 描述
//!
//! 由 [`crate::commands::state_tracker::GfxStateTracker`] 根据前后状态计算，
//! 同时带上目标后端已经换算好的 stage / access / layout。

use crate::backends::d3d12::D3d12TransitionBarrier;
use crate::backends::vulkan::VkTransitionBarrier;
use crate::basic::native::NativeHandle;
use crate::foundation::device::GfxBackendKind;
use crate::resources::resource::GpuResource;
use crate::resources::resource_state::GfxResourceState;

/// 已经换算到目标后端的 barrier 参数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GfxNativeBarrier {
    Vulkan(VkTransitionBarrier),
    D3d12(D3d12TransitionBarrier),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxBarrier {
    pub resource: NativeHandle,
    pub is_texture: bool,
    pub before: GfxResourceState,
    pub after: GfxResourceState,
    pub native: GfxNativeBarrier,
}

impl GfxBarrier {
    pub fn transition(
        backend: GfxBackendKind,
        resource: &GpuResource,
        before: GfxResourceState,
        after: GfxResourceState,
    ) -> Self {
        let native = match backend {
            GfxBackendKind::Vulkan => {
                GfxNativeBarrier::Vulkan(VkTransitionBarrier::new(before, after, resource.is_texture(), resource.format()))
            }
            GfxBackendKind::D3d12 => GfxNativeBarrier::D3d12(D3d12TransitionBarrier::new(before, after)),
        };

        Self {
            resource: resource.native(),
            is_texture: resource.is_texture(),
            before,
            after,
            native,
        }
    }
}
