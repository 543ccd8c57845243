//! 延迟释放队列
//!
//! 入队的对象被标记一个退休帧 `counter + latency`，其中 `latency = max(2, back_buffer_count + 1)`。
//! 计数器每次 surface sync 恰好前进一，退休帧不晚于计数器的对象在那次 sync 开始时被释放。
//! 一旦入队，其他组件不能再持有这些对象用于复用。

use std::rc::Rc;

use crate::descriptor_manager::{DescriptorAllocation, DescriptorManager};
use crate::memory_manager::{MemoryAllocation, MemoryManager};

#[derive(Debug)]
pub enum DeferredReleaseItem {
    Memory(Rc<MemoryAllocation>),
    Descriptor(Rc<DescriptorAllocation>),
}

impl DeferredReleaseItem {
    fn name(&self) -> &str {
        match self {
            DeferredReleaseItem::Memory(memory) => memory.name(),
            DeferredReleaseItem::Descriptor(descriptor) => descriptor.name(),
        }
    }

    fn release(self, memory_manager: &mut MemoryManager, descriptor_manager: &mut DescriptorManager) {
        match self {
            DeferredReleaseItem::Memory(memory) => memory_manager.release_memory_allocation(&memory),
            DeferredReleaseItem::Descriptor(descriptor) => descriptor_manager.release_descriptor(&descriptor),
        }
    }
}

pub struct DeferredReleaseQueue {
    counter: u64,
    latency: u64,
    /// (item, retire frame)
    entries: Vec<(DeferredReleaseItem, u64)>,
}
// new & init
impl DeferredReleaseQueue {
    pub fn new(back_buffer_count: u32) -> Self {
        Self {
            counter: 0,
            latency: Self::latency_for(back_buffer_count),
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn latency_for(back_buffer_count: u32) -> u64 {
        (back_buffer_count as u64 + 1).max(2)
    }
}
// update
impl DeferredReleaseQueue {
    /// 入队，返回退休帧
    pub fn enqueue(&mut self, item: DeferredReleaseItem) -> u64 {
        let retire_frame = self.counter + self.latency;
        log::trace!("defer release of `{}` until frame {}", item.name(), retire_frame);
        self.entries.push((item, retire_frame));
        retire_frame
    }

    /// 计数器前进一帧，并释放已经退休的对象，返回释放的数量
    pub fn advance_and_release(
        &mut self,
        memory_manager: &mut MemoryManager,
        descriptor_manager: &mut DescriptorManager,
    ) -> usize {
        self.counter += 1;

        let counter = self.counter;
        let (retired, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.entries).into_iter().partition(|(_, retire_frame)| *retire_frame <= counter);
        self.entries = pending;

        let released = retired.len();
        for (item, _) in retired {
            item.release(memory_manager, descriptor_manager);
        }
        released
    }

    /// 不管退休帧，立即释放所有对象；调用者必须保证 GPU 已经空闲
    pub fn force_flush(&mut self, memory_manager: &mut MemoryManager, descriptor_manager: &mut DescriptorManager) -> usize {
        let _span = prism_crate_tools::profile_span!("DeferredReleaseQueue::force_flush");
        let released = self.entries.len();
        for (item, _) in self.entries.drain(..) {
            item.release(memory_manager, descriptor_manager);
        }
        released
    }
}
// getters
impl DeferredReleaseQueue {
    #[inline]
    pub fn counter(&self) -> u64 {
        self.counter
    }
    #[inline]
    pub fn latency(&self) -> u64 {
        self.latency
    }
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use prism_gfx::backends::headless::device::HeadlessDevice;
    use prism_gfx::backends::headless::journal::HeadlessJournal;
    use prism_gfx::foundation::device::{GfxBackendKind, GfxDevice};

    use super::*;

    fn managers() -> (MemoryManager, DescriptorManager) {
        let journal = Rc::new(RefCell::new(HeadlessJournal::default()));
        let device: Rc<dyn GfxDevice> = Rc::new(HeadlessDevice::new(GfxBackendKind::Vulkan, journal));
        (MemoryManager::new(device.clone()), DescriptorManager::new(device))
    }

    #[test]
    fn test_latency() {
        assert_eq!(DeferredReleaseQueue::latency_for(0), 2);
        assert_eq!(DeferredReleaseQueue::latency_for(1), 2);
        assert_eq!(DeferredReleaseQueue::latency_for(3), 4);
    }

    #[test]
    fn test_never_released_before_retire_frame() {
        for back_buffer_count in [1, 2, 3, 5] {
            let (mut memory, mut descriptors) = managers();
            let mut queue = DeferredReleaseQueue::new(back_buffer_count);

            // 先前进几帧，入队时计数器不为 0
            for _ in 0..3 {
                queue.advance_and_release(&mut memory, &mut descriptors);
            }
            let allocation = memory.allocate_staging_memory("old", 64).unwrap();
            let enqueued_at = queue.counter();
            let retire_frame = queue.enqueue(DeferredReleaseItem::Memory(allocation.clone()));
            assert_eq!(retire_frame, enqueued_at + queue.latency());

            while queue.counter() + 1 < retire_frame {
                assert_eq!(queue.advance_and_release(&mut memory, &mut descriptors), 0);
                assert!(memory.is_alive(&allocation));
            }
            assert_eq!(queue.advance_and_release(&mut memory, &mut descriptors), 1);
            assert_eq!(queue.counter(), retire_frame);
            assert!(!memory.is_alive(&allocation));
        }
    }

    #[test]
    fn test_force_flush_releases_everything() {
        let (mut memory, mut descriptors) = managers();
        let mut queue = DeferredReleaseQueue::new(3);
        queue.enqueue(DeferredReleaseItem::Memory(memory.allocate_staging_memory("a", 4).unwrap()));
        queue.enqueue(DeferredReleaseItem::Descriptor(descriptors.create_sampler_descriptor("s").unwrap()));

        assert_eq!(queue.force_flush(&mut memory, &mut descriptors), 2);
        assert_eq!(queue.pending_count(), 0);
        assert_eq!(memory.live_allocation_count(), 0);
        assert_eq!(descriptors.live_descriptor_count(), 0);
    }
}
