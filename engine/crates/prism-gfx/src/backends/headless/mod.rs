//! 没有 GPU 也能运行的后端
//!
//! 所有原生对象都只是 journal 中的一条记录：命令列表录制的命令、提交、资源的创建与释放、
//! 交换链的 resize / recreate 调用都会被记下来，测试和 `headless_frames` 直接检查 journal。
//! 它可以模拟 Vulkan 类或 D3D12 类后端，两套 barrier 映射都会被走到。

pub mod command_list;
pub mod device;
pub mod journal;
pub mod swapchain;

use std::cell::RefCell;
use std::rc::Rc;

use crate::backend::{GfxBackend, GfxBackendCreateInfo, GfxBackendFactory};
use crate::backends::headless::device::HeadlessDevice;
use crate::backends::headless::journal::HeadlessJournal;
use crate::backends::headless::swapchain::HeadlessSwapchain;
use crate::error::GfxResult;
use crate::foundation::device::GfxBackendKind;

pub type SharedHeadlessJournal = Rc<RefCell<HeadlessJournal>>;

pub struct HeadlessBackendFactory {
    kind: GfxBackendKind,
    journal: SharedHeadlessJournal,
}

impl HeadlessBackendFactory {
    pub fn new(kind: GfxBackendKind) -> Self {
        Self {
            kind,
            journal: Rc::new(RefCell::new(HeadlessJournal::default())),
        }
    }

    /// 与创建出来的设备、交换链共享的 journal
    #[inline]
    pub fn journal(&self) -> SharedHeadlessJournal {
        self.journal.clone()
    }
}

impl GfxBackendFactory for HeadlessBackendFactory {
    fn backend_kind(&self) -> GfxBackendKind {
        self.kind
    }

    fn create(&self, info: &GfxBackendCreateInfo) -> GfxResult<GfxBackend> {
        log::info!(
            "create headless backend `{}`, emulating {:?}, {}x{} with {} back buffers",
            info.app_name,
            self.kind,
            info.window_extent.width,
            info.window_extent.height,
            info.back_buffer_count
        );

        let device = HeadlessDevice::new(self.kind, self.journal.clone());
        let swapchain = HeadlessSwapchain::new(self.journal.clone(), info)?;
        Ok(GfxBackend {
            device: Rc::new(device),
            swapchain: Box::new(swapchain),
        })
    }
}
