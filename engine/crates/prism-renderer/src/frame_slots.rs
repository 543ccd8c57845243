//! 每个 back buffer 槽位一个命令列表和 fence
//!
//! 槽位按帧序号轮转，命令列表只有在对应的 fence 完成之后才会被重新录制，
//! 因此 CPU 最多领先 GPU `back_buffer_count` 帧。

use itertools::Itertools;

use prism_gfx::commands::command_list::GfxCommandList;
use prism_gfx::error::GfxResult;
use prism_gfx::foundation::device::GfxDevice;

pub struct FrameSlot {
    cmd: Box<dyn GfxCommandList>,
    /// 最后一次提交的 fence，0 表示从未提交
    fence: u64,
}

pub struct FrameSlots {
    slots: Vec<FrameSlot>,
    last_submitted_fence: u64,
}

// new & init
impl FrameSlots {
    pub fn new(device: &dyn GfxDevice, back_buffer_count: u32) -> GfxResult<Self> {
        let slots = (0..back_buffer_count)
            .map(|idx| {
                Ok(FrameSlot {
                    cmd: device.create_command_list(&format!("frame-cmd-{}", idx))?,
                    fence: 0,
                })
            })
            .collect::<GfxResult<Vec<_>>>()?;
        Ok(Self {
            slots,
            last_submitted_fence: 0,
        })
    }
}
// getters
impl FrameSlots {
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn last_submitted_fence(&self) -> u64 {
        self.last_submitted_fence
    }

    pub fn fences(&self) -> Vec<u64> {
        self.slots.iter().map(|slot| slot.fence).collect_vec()
    }
}
// update
impl FrameSlots {
    /// 等待槽位上一次的提交完成
    pub fn wait(&self, slot: usize, device: &dyn GfxDevice) {
        let _span = prism_crate_tools::profile_span!("FrameSlots::wait");
        let fence = self.slots[slot].fence;
        if fence > device.completed_fence_value() {
            device.wait_for_fence(fence);
        }
    }

    /// 调用前需要先 [`Self::wait`]
    #[inline]
    pub fn command_list_mut(&mut self, slot: usize) -> &mut dyn GfxCommandList {
        self.slots[slot].cmd.as_mut()
    }

    /// 提交槽位的命令列表，记下 fence
    pub fn submit(&mut self, slot: usize, device: &dyn GfxDevice) -> GfxResult<u64> {
        let frame_slot = &mut self.slots[slot];
        let fence = device.submit(frame_slot.cmd.as_mut())?;
        frame_slot.fence = fence;
        self.last_submitted_fence = fence;
        Ok(fence)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use prism_gfx::backends::headless::device::HeadlessDevice;
    use prism_gfx::backends::headless::journal::HeadlessJournal;
    use prism_gfx::foundation::device::GfxBackendKind;

    use super::*;

    #[test]
    fn test_slots_remember_their_fences() {
        let journal = Rc::new(RefCell::new(HeadlessJournal::default()));
        let device = HeadlessDevice::new(GfxBackendKind::Vulkan, journal.clone());
        let mut slots = FrameSlots::new(&device, 2).unwrap();
        assert_eq!(slots.len(), 2);

        for slot in [0, 1, 0] {
            slots.wait(slot, &device);
            let cmd = slots.command_list_mut(slot);
            cmd.begin();
            cmd.dispatch(1, 1, 1);
            cmd.end();
            slots.submit(slot, &device).unwrap();
        }

        assert_eq!(slots.fences(), vec![3, 2]);
        assert_eq!(slots.last_submitted_fence(), 3);
        assert_eq!(journal.borrow().submissions.len(), 3);
        assert_eq!(journal.borrow().submissions[0].name, "frame-cmd-0");
    }
}
