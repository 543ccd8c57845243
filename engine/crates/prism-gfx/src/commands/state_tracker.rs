//! 资源状态跟踪
//!
//! 资源上的状态字段是下一次使用前需要什么 barrier 的唯一依据。
//! 状态相同则什么都不做（幂等），否则恰好发出一个 barrier 并更新状态。
//! 同一条命令流中对同一资源的多次转换按调用顺序严格排序。

use crate::commands::barrier::GfxBarrier;
use crate::commands::command_list::GfxCommandList;
use crate::foundation::device::GfxBackendKind;
use crate::resources::resource::{GpuResource, SharedGpuResource};
use crate::resources::resource_state::GfxResourceState;

pub struct GfxStateTracker;

impl GfxStateTracker {
    /// 将资源转换到 `new_state`
    ///
    /// # 返回
    /// 是否发出了 barrier
    ///
    /// # Panics
    /// 目标状态与资源声明的 usage 不兼容时直接 panic，不会替换成相近的状态。
    pub fn transition(
        cmd: &mut dyn GfxCommandList,
        backend: GfxBackendKind,
        resource: &mut GpuResource,
        new_state: GfxResourceState,
    ) -> bool {
        let current_state = resource.state();
        if current_state == new_state {
            return false;
        }

        assert!(
            new_state.is_allowed_for(resource.kind(), resource.usage()),
            "resource `{}` (usage {:?}) cannot be transitioned to {:?}",
            resource.name(),
            resource.usage(),
            new_state
        );

        let barrier = GfxBarrier::transition(backend, resource, current_state, new_state);
        cmd.resource_barrier(&barrier);
        resource.set_state(new_state);

        log::trace!("transition `{}`: {:?} -> {:?}", resource.name(), current_state, new_state);
        true
    }

    #[inline]
    pub fn transition_shared(
        cmd: &mut dyn GfxCommandList,
        backend: GfxBackendKind,
        resource: &SharedGpuResource,
        new_state: GfxResourceState,
    ) -> bool {
        Self::transition(cmd, backend, &mut resource.borrow_mut(), new_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::headless::command_list::{HeadlessCommand, HeadlessCommandList};
    use crate::basic::format::GfxFormat;
    use crate::basic::native::NativeHandle;
    use crate::basic::usage::GfxUsageFlags;
    use crate::resources::resource::GpuResourceKind;

    fn test_texture() -> GpuResource {
        GpuResource::new(
            "color",
            GpuResourceKind::Texture {
                width: 8,
                height: 8,
                mip_levels: 1,
            },
            GfxFormat::Rgba8Unorm,
            GfxUsageFlags::RENDER_TARGET | GfxUsageFlags::SHADER_RESOURCE | GfxUsageFlags::TRANSFER_SRC,
            NativeHandle(7),
            GfxResourceState::Undefined,
        )
    }

    fn barrier_count(cmd: &HeadlessCommandList) -> usize {
        cmd.commands().iter().filter(|c| matches!(c, HeadlessCommand::Barrier(_))).count()
    }

    #[test]
    fn test_redundant_transition_is_noop() {
        for backend in [GfxBackendKind::Vulkan, GfxBackendKind::D3d12] {
            let mut cmd = HeadlessCommandList::new("test");
            let mut texture = test_texture();

            assert!(GfxStateTracker::transition(&mut cmd, backend, &mut texture, GfxResourceState::PixelShaderResource));
            assert!(!GfxStateTracker::transition(&mut cmd, backend, &mut texture, GfxResourceState::PixelShaderResource));

            assert_eq!(barrier_count(&cmd), 1);
            assert_eq!(texture.state(), GfxResourceState::PixelShaderResource);
        }
    }

    #[test]
    fn test_transitions_are_ordered_by_call() {
        let mut cmd = HeadlessCommandList::new("test");
        let mut texture = test_texture();

        GfxStateTracker::transition(&mut cmd, GfxBackendKind::Vulkan, &mut texture, GfxResourceState::RenderTarget);
        GfxStateTracker::transition(&mut cmd, GfxBackendKind::Vulkan, &mut texture, GfxResourceState::CopySource);

        let barriers = cmd
            .commands()
            .iter()
            .filter_map(|c| match c {
                HeadlessCommand::Barrier(b) => Some((b.before, b.after)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(
            barriers,
            vec![
                (GfxResourceState::Undefined, GfxResourceState::RenderTarget),
                (GfxResourceState::RenderTarget, GfxResourceState::CopySource),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "cannot be transitioned")]
    fn test_incompatible_state_panics() {
        let mut cmd = HeadlessCommandList::new("test");
        let mut texture = test_texture();
        GfxStateTracker::transition(&mut cmd, GfxBackendKind::D3d12, &mut texture, GfxResourceState::UnorderedAccess);
    }
}
