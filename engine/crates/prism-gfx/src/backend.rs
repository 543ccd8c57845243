//! 后端工厂
//!
//! 启动时根据配置选定一个工厂，一次性创建出设备和交换链，
//! 之后所有调用都经由能力接口，不再需要知道具体的后端类型。

use std::rc::Rc;

use crate::basic::format::GfxFormat;
use crate::basic::native::GfxExtent2D;
use crate::error::GfxResult;
use crate::foundation::device::{GfxBackendKind, GfxDevice};
use crate::swapchain::render_swapchain::GfxSwapchain;

#[derive(Clone, Debug)]
pub struct GfxBackendCreateInfo {
    pub app_name: String,
    pub window_extent: GfxExtent2D,
    pub back_buffer_count: u32,
    pub swapchain_format: GfxFormat,
}

pub struct GfxBackend {
    pub device: Rc<dyn GfxDevice>,
    pub swapchain: Box<dyn GfxSwapchain>,
}

pub trait GfxBackendFactory {
    fn backend_kind(&self) -> GfxBackendKind;
    fn create(&self, info: &GfxBackendCreateInfo) -> GfxResult<GfxBackend>;
}
