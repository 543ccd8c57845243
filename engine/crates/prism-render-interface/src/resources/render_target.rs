use std::rc::Rc;

use prism_gfx::basic::format::GfxFormat;
use prism_gfx::basic::native::GfxExtent2D;
use prism_gfx::basic::usage::GfxUsageFlags;
use prism_gfx::resources::resource::{GfxClearValue, GfxTextureDesc, SharedGpuResource};

use crate::descriptor_manager::DescriptorAllocation;
use crate::memory_manager::MemoryAllocation;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderTargetSize {
    Fixed { width: u32, height: u32 },
    /// 窗口尺寸乘以 `scale` 后向下取整，不小于最小尺寸
    WindowRelative { scale: f32, min_width: u32, min_height: u32 },
}

impl RenderTargetSize {
    pub fn resolve(&self, window: GfxExtent2D) -> GfxExtent2D {
        match *self {
            RenderTargetSize::Fixed { width, height } => GfxExtent2D::new(width, height),
            RenderTargetSize::WindowRelative {
                scale,
                min_width,
                min_height,
            } => GfxExtent2D::new(
                ((window.width as f32 * scale).floor() as u32).max(min_width).max(1),
                ((window.height as f32 * scale).floor() as u32).max(min_height).max(1),
            ),
        }
    }

    #[inline]
    pub fn is_window_relative(&self) -> bool {
        matches!(self, RenderTargetSize::WindowRelative { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderTargetDesc {
    pub name: String,
    pub format: GfxFormat,
    /// 必须包含 `RENDER_TARGET` 或 `DEPTH_STENCIL`
    pub usage: GfxUsageFlags,
    pub size: RenderTargetSize,
    pub clear_value: Option<GfxClearValue>,
}

impl RenderTargetDesc {
    pub(crate) fn texture_desc(&self, extent: GfxExtent2D) -> GfxTextureDesc {
        GfxTextureDesc {
            name: self.name.clone(),
            width: extent.width,
            height: extent.height,
            format: self.format,
            usage: self.usage,
            generate_mips: false,
            clear_value: self.clear_value,
        }
    }
}

pub struct RenderTarget {
    pub(crate) desc: RenderTargetDesc,
    pub(crate) extent: GfxExtent2D,
    pub(crate) allocation: Rc<MemoryAllocation>,
    /// RTV 或 DSV
    pub(crate) view: Rc<DescriptorAllocation>,
}
// getters
impl RenderTarget {
    #[inline]
    pub fn desc(&self) -> &RenderTargetDesc {
        &self.desc
    }
    #[inline]
    pub fn extent(&self) -> GfxExtent2D {
        self.extent
    }
    #[inline]
    pub fn is_depth(&self) -> bool {
        self.desc.usage.contains(GfxUsageFlags::DEPTH_STENCIL)
    }
    #[inline]
    pub fn resource(&self) -> &SharedGpuResource {
        self.allocation.resource()
    }
    #[inline]
    pub fn view(&self) -> &Rc<DescriptorAllocation> {
        &self.view
    }
    #[inline]
    pub fn clear_value(&self) -> Option<GfxClearValue> {
        self.desc.clear_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_relative_extent() {
        let size = RenderTargetSize::WindowRelative {
            scale: 0.5,
            min_width: 64,
            min_height: 64,
        };
        assert_eq!(size.resolve(GfxExtent2D::new(1025, 769)), GfxExtent2D::new(512, 384));
        assert_eq!(size.resolve(GfxExtent2D::new(100, 30)), GfxExtent2D::new(64, 64));

        let fixed = RenderTargetSize::Fixed { width: 16, height: 8 };
        assert_eq!(fixed.resolve(GfxExtent2D::new(1920, 1080)), GfxExtent2D::new(16, 8));
    }
}
