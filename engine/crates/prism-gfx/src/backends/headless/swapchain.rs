use crate::backend::GfxBackendCreateInfo;
use crate::backends::headless::SharedHeadlessJournal;
use crate::backends::headless::journal::{HeadlessJournal, HeadlessMemory};
use crate::basic::format::GfxFormat;
use crate::basic::native::NativeHandle;
use crate::error::{GfxError, GfxResult, GfxSurfaceError};
use crate::swapchain::render_swapchain::GfxSwapchain;

/// headless 交换链，失败行为由 [`crate::backends::headless::journal::HeadlessSurfaceScript`] 控制
pub struct HeadlessSwapchain {
    journal: SharedHeadlessJournal,
    width: u32,
    height: u32,
    format: GfxFormat,
    image_count: u32,
    images: Vec<NativeHandle>,
    current_image_index: u32,
    next_image_index: u32,
}

// new & init
impl HeadlessSwapchain {
    pub fn new(journal: SharedHeadlessJournal, info: &GfxBackendCreateInfo) -> GfxResult<Self> {
        let mut swapchain = Self {
            journal,
            width: info.window_extent.width,
            height: info.window_extent.height,
            format: info.swapchain_format,
            image_count: info.back_buffer_count.max(2),
            images: Vec::new(),
            current_image_index: 0,
            next_image_index: 0,
        };
        swapchain.create_images();
        Ok(swapchain)
    }

    fn create_images(&mut self) {
        let mut journal = self.journal.borrow_mut();
        self.images = (0..self.image_count)
            .map(|idx| {
                let handle = journal.alloc_handle();
                journal.memories.insert(
                    handle,
                    HeadlessMemory {
                        name: format!("swapchain-image-{}", idx),
                        size: self.width as u64 * self.height as u64 * self.format.bytes_per_pixel() as u64,
                        is_texture: true,
                        bytes: None,
                    },
                );
                handle
            })
            .collect();
        self.current_image_index = 0;
        self.next_image_index = 0;
    }

    fn destroy_images(&mut self) {
        let mut journal = self.journal.borrow_mut();
        for image in self.images.drain(..) {
            journal.memories.remove(&image);
        }
    }
}

impl GfxSwapchain for HeadlessSwapchain {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> GfxFormat {
        self.format
    }

    fn image_count(&self) -> u32 {
        self.image_count
    }

    fn images(&self) -> Vec<NativeHandle> {
        self.images.clone()
    }

    fn current_image_index(&self) -> u32 {
        self.current_image_index
    }

    fn supports_in_place_resize(&self) -> bool {
        self.journal.borrow().surface_script.supports_in_place_resize
    }

    fn acquire_new_frame(&mut self) -> Result<(), GfxSurfaceError> {
        let mut journal = self.journal.borrow_mut();
        journal.acquire_count += 1;
        if self.images.is_empty() {
            return Err(GfxSurfaceError::SurfaceLost);
        }
        if HeadlessJournal::consume_failure(&mut journal.surface_script.acquire_failures) {
            return Err(GfxSurfaceError::OutOfDate);
        }

        self.current_image_index = self.next_image_index;
        Ok(())
    }

    fn present(&mut self) -> Result<(), GfxSurfaceError> {
        let mut journal = self.journal.borrow_mut();
        journal.present_count += 1;
        if HeadlessJournal::consume_failure(&mut journal.surface_script.present_failures) {
            return Err(GfxSurfaceError::OutOfDate);
        }

        self.next_image_index = (self.current_image_index + 1) % self.image_count;
        Ok(())
    }

    fn host_wait_present_finished(&mut self) {}

    fn resize(&mut self, width: u32, height: u32) -> bool {
        {
            let mut journal = self.journal.borrow_mut();
            journal.resize_calls.push((width, height));
            if !journal.surface_script.supports_in_place_resize
                || HeadlessJournal::consume_failure(&mut journal.surface_script.resize_failures)
            {
                return false;
            }
        }

        self.destroy_images();
        self.width = width;
        self.height = height;
        self.create_images();
        true
    }

    fn release(&mut self) {
        self.destroy_images();
    }

    fn recreate(&mut self, width: u32, height: u32) -> GfxResult<()> {
        {
            let mut journal = self.journal.borrow_mut();
            journal.recreate_calls.push((width, height));
            if HeadlessJournal::consume_failure(&mut journal.surface_script.recreate_failures) {
                return Err(GfxError::CreateFailed {
                    kind: "swapchain",
                    name: "headless".to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
        }

        self.destroy_images();
        self.width = width;
        self.height = height;
        self.create_images();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GfxBackendFactory;
    use crate::backends::headless::HeadlessBackendFactory;
    use crate::basic::native::GfxExtent2D;
    use crate::foundation::device::GfxBackendKind;

    fn create_info() -> GfxBackendCreateInfo {
        GfxBackendCreateInfo {
            app_name: "test".to_string(),
            window_extent: GfxExtent2D::new(64, 32),
            back_buffer_count: 3,
            swapchain_format: GfxFormat::Bgra8Unorm,
        }
    }

    #[test]
    fn test_images_round_robin() {
        let factory = HeadlessBackendFactory::new(GfxBackendKind::Vulkan);
        let mut backend = factory.create(&create_info()).unwrap();

        let mut indices = vec![];
        for _ in 0..4 {
            backend.swapchain.acquire_new_frame().unwrap();
            indices.push(backend.swapchain.current_image_index());
            backend.swapchain.present().unwrap();
        }
        assert_eq!(indices, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_scripted_resize_failure_keeps_images() {
        let factory = HeadlessBackendFactory::new(GfxBackendKind::D3d12);
        let mut backend = factory.create(&create_info()).unwrap();
        factory.journal().borrow_mut().surface_script.resize_failures = 1;

        let images = backend.swapchain.images();
        assert!(!backend.swapchain.resize(128, 128));
        assert_eq!(backend.swapchain.images(), images);
        assert_eq!(backend.swapchain.width(), 64);

        assert!(backend.swapchain.resize(128, 128));
        assert_eq!(backend.swapchain.extent(), GfxExtent2D::new(128, 128));
        assert_eq!(factory.journal().borrow().resize_calls, vec![(128, 128), (128, 128)]);
    }
}
