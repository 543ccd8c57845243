use std::collections::HashMap;
use std::rc::Rc;

use slotmap::new_key_type;

use prism_gfx::basic::native::GfxExtent2D;
use prism_render_interface::descriptor_manager::DescriptorAllocation;
use prism_render_interface::handles::{RenderPassHandle, RenderTargetHandle};
use prism_render_interface::resource_manager::ResourceManager;

use crate::binding::{RgBinding, RgColorTarget, RgDepthTarget};
use crate::command::RgCommand;

new_key_type! {
    pub struct RgNodeHandle;
}

/// 在绑定资源之前调用，通常用来上传本帧的常量
pub type RgPreRenderCallback = Box<dyn FnMut(&mut ResourceManager)>;

/// 节点的声明
pub struct RgNodeDesc {
    pub name: String,
    pub render_pass: RenderPassHandle,
    /// 任一分量为 [`Self::WINDOW_SIZE`] 时视口使用窗口尺寸
    pub viewport_width: i32,
    pub viewport_height: i32,
    pub bindings: Vec<RgBinding>,
    pub color_targets: Vec<RgColorTarget>,
    pub depth_target: Option<RgDepthTarget>,
    pub commands: Vec<RgCommand>,
    pub pre_render: Option<RgPreRenderCallback>,
}

// new & init
impl RgNodeDesc {
    pub const WINDOW_SIZE: i32 = -1;

    pub fn new(name: impl Into<String>, render_pass: RenderPassHandle) -> Self {
        Self {
            name: name.into(),
            render_pass,
            viewport_width: Self::WINDOW_SIZE,
            viewport_height: Self::WINDOW_SIZE,
            bindings: Vec::new(),
            color_targets: Vec::new(),
            depth_target: None,
            commands: Vec::new(),
            pre_render: None,
        }
    }

    pub fn with_viewport(mut self, width: i32, height: i32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    pub fn bind(mut self, binding: RgBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn color_target(mut self, target: RenderTargetHandle, clear: bool) -> Self {
        self.color_targets.push(RgColorTarget { target, clear });
        self
    }

    pub fn depth_target(mut self, target: RenderTargetHandle, write_enabled: bool, clear: bool) -> Self {
        self.depth_target = Some(RgDepthTarget {
            target,
            write_enabled,
            clear,
        });
        self
    }

    pub fn command(mut self, command: RgCommand) -> Self {
        self.commands.push(command);
        self
    }

    pub fn pre_render(mut self, callback: impl FnMut(&mut ResourceManager) + 'static) -> Self {
        self.pre_render = Some(Box::new(callback));
        self
    }
}
// tools
impl RgNodeDesc {
    pub fn viewport_extent(&self, window_extent: GfxExtent2D) -> GfxExtent2D {
        match (u32::try_from(self.viewport_width), u32::try_from(self.viewport_height)) {
            (Ok(width), Ok(height)) => GfxExtent2D::new(width, height),
            _ => window_extent,
        }
    }
}

/// 图中的一个节点
///
/// 节点在多帧之间存活；按参数名缓存的 descriptor 只在来源资源不变时复用。
pub struct RgNode {
    pub(crate) desc: RgNodeDesc,
    pub(crate) descriptors: HashMap<String, Rc<DescriptorAllocation>>,
}

// new & init
impl RgNode {
    pub(crate) fn new(desc: RgNodeDesc) -> Self {
        Self {
            desc,
            descriptors: HashMap::new(),
        }
    }
}
// getters
impl RgNode {
    #[inline]
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    #[inline]
    pub fn desc(&self) -> &RgNodeDesc {
        &self.desc
    }

    /// 修改绑定或命令之后，下一次执行会检查缓存的 descriptor 是否仍然有效
    #[inline]
    pub fn desc_mut(&mut self) -> &mut RgNodeDesc {
        &mut self.desc
    }

    pub fn cached_descriptor(&self, parameter: &str) -> Option<&Rc<DescriptorAllocation>> {
        self.descriptors.get(parameter)
    }
}
// destroy
impl RgNode {
    /// 缓存的 descriptor 可能仍被在途的帧引用，进入延迟释放队列
    pub(crate) fn release_descriptors(&mut self, resource_manager: &mut ResourceManager) {
        for (_, descriptor) in self.descriptors.drain() {
            resource_manager.defer_release_descriptor(descriptor);
        }
    }
}
