//! 交换链 image 的包装
//!
//! 每个 image 包装成一个 [`GpuResource`] 加一个 RTV，状态跟踪和普通纹理一致。
//! resize 前包装会被收起（释放 RTV，记下每个 image 的状态）；resize 失败时按记下的状态恢复，
//! 成功时按新的 images 重建。

use std::rc::Rc;

use prism_gfx::basic::native::NativeHandle;
use prism_gfx::basic::usage::GfxUsageFlags;
use prism_gfx::descriptors::descriptor::GfxDescriptorViewType;
use prism_gfx::error::GfxResult;
use prism_gfx::resources::resource::{GpuResource, GpuResourceKind, SharedGpuResource};
use prism_gfx::resources::resource_state::GfxResourceState;
use prism_gfx::swapchain::render_swapchain::GfxSwapchain;

use crate::descriptor_manager::{DescriptorAllocation, DescriptorManager};

pub struct SwapchainImageTarget {
    pub(crate) resource: SharedGpuResource,
    pub(crate) rtv: Rc<DescriptorAllocation>,
}
// getters
impl SwapchainImageTarget {
    #[inline]
    pub fn resource(&self) -> &SharedGpuResource {
        &self.resource
    }
    #[inline]
    pub fn rtv(&self) -> &Rc<DescriptorAllocation> {
        &self.rtv
    }
}

#[derive(Default)]
pub struct SwapchainTargets {
    targets: Vec<SwapchainImageTarget>,
    /// 收起时每个 image 的 (native, state)
    stashed: Vec<(NativeHandle, GfxResourceState)>,
}
// update
impl SwapchainTargets {
    /// 按交换链当前的 images 重建，所有 image 的状态从 `Undefined` 开始
    pub fn rebuild(
        &mut self,
        swapchain: &dyn GfxSwapchain,
        descriptor_manager: &mut DescriptorManager,
    ) -> GfxResult<()> {
        self.release(descriptor_manager);
        self.stashed.clear();
        self.create(swapchain, descriptor_manager, |_| GfxResourceState::Undefined)
    }

    /// 释放包装，记下每个 image 的状态
    pub fn stash(&mut self, descriptor_manager: &mut DescriptorManager) {
        self.stashed = self
            .targets
            .iter()
            .map(|target| {
                let resource = target.resource.borrow();
                (resource.native(), resource.state())
            })
            .collect();
        self.release(descriptor_manager);
    }

    /// resize 失败后恢复：images 没有变化，沿用收起时的状态
    pub fn restore(
        &mut self,
        swapchain: &dyn GfxSwapchain,
        descriptor_manager: &mut DescriptorManager,
    ) -> GfxResult<()> {
        let stashed = std::mem::take(&mut self.stashed);
        self.release(descriptor_manager);
        self.create(swapchain, descriptor_manager, |native| {
            stashed
                .iter()
                .find(|(stashed_native, _)| *stashed_native == native)
                .map_or(GfxResourceState::Undefined, |(_, state)| *state)
        })
    }

    pub fn release(&mut self, descriptor_manager: &mut DescriptorManager) {
        for target in self.targets.drain(..) {
            descriptor_manager.release_descriptor(&target.rtv);
        }
    }

    fn create(
        &mut self,
        swapchain: &dyn GfxSwapchain,
        descriptor_manager: &mut DescriptorManager,
        initial_state: impl Fn(NativeHandle) -> GfxResourceState,
    ) -> GfxResult<()> {
        let extent = swapchain.extent();
        for (idx, native) in swapchain.images().into_iter().enumerate() {
            let resource = GpuResource::new_shared(
                format!("swapchain-image-{}", idx),
                GpuResourceKind::Texture {
                    width: extent.width,
                    height: extent.height,
                    mip_levels: 1,
                },
                swapchain.format(),
                GfxUsageFlags::RENDER_TARGET | GfxUsageFlags::TRANSFER_DST,
                native,
                initial_state(native),
            );
            let rtv = descriptor_manager.create_descriptor(
                &format!("swapchain-rtv-{}", idx),
                GfxDescriptorViewType::Rtv,
                std::slice::from_ref(&resource),
                false,
            )?;
            self.targets.push(SwapchainImageTarget { resource, rtv });
        }
        Ok(())
    }
}
// getters
impl SwapchainTargets {
    #[inline]
    pub fn get(&self, image_index: u32) -> Option<&SwapchainImageTarget> {
        self.targets.get(image_index as usize)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }
}
