use crate::basic::format::GfxFormat;
use crate::basic::native::{GfxExtent2D, NativeHandle};
use crate::error::{GfxResult, GfxSurfaceError};

/// 交换链能力接口
///
/// acquire / present 的失败是可恢复的，以 [`GfxSurfaceError`] 的形式返回，
/// 由生命周期状态机决定如何重试。
pub trait GfxSwapchain {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn format(&self) -> GfxFormat;
    fn image_count(&self) -> u32;
    /// 当前所有 back buffer 的原生句柄
    fn images(&self) -> Vec<NativeHandle>;
    fn current_image_index(&self) -> u32;

    /// 是否支持原地 resize；不支持的后端需要销毁后重建交换链
    fn supports_in_place_resize(&self) -> bool;

    fn acquire_new_frame(&mut self) -> Result<(), GfxSurfaceError>;
    fn present(&mut self) -> Result<(), GfxSurfaceError>;
    fn host_wait_present_finished(&mut self);

    /// 原地 resize，失败时交换链保持原来的尺寸和 images
    fn resize(&mut self, width: u32, height: u32) -> bool;
    /// 释放交换链对象本身
    fn release(&mut self);
    /// 重新创建交换链对象
    fn recreate(&mut self, width: u32, height: u32) -> GfxResult<()>;

    #[inline]
    fn extent(&self) -> GfxExtent2D {
        GfxExtent2D::new(self.width(), self.height())
    }
}
