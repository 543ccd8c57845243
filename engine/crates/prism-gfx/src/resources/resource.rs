use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::basic::format::GfxFormat;
use crate::basic::native::{GfxExtent2D, NativeHandle};
use crate::basic::usage::GfxUsageFlags;
use crate::resources::resource_state::GfxResourceState;

/// 进程内唯一的资源 id，用于判断两个引用是否指向同一个资源
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuResourceId(u64);

impl GpuResourceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpuResourceKind {
    Buffer { size: u64 },
    Texture { width: u32, height: u32, mip_levels: u32 },
}

/// 缓冲区的逻辑描述
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfxBufferDesc {
    pub name: String,
    pub size: u64,
    pub usage: GfxUsageFlags,
    /// structured buffer 的元素格式，普通字节流使用 `Unknown`
    pub format: GfxFormat,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GfxClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u8 },
}

/// 纹理的逻辑描述
#[derive(Clone, Debug, PartialEq)]
pub struct GfxTextureDesc {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub format: GfxFormat,
    pub usage: GfxUsageFlags,
    /// 为 true 时分配完整的 mip chain
    pub generate_mips: bool,
    pub clear_value: Option<GfxClearValue>,
}

impl GfxTextureDesc {
    #[inline]
    pub fn extent(&self) -> GfxExtent2D {
        GfxExtent2D::new(self.width, self.height)
    }
}

/// GPU 资源
///
/// `state` 只能通过 [`crate::commands::state_tracker::GfxStateTracker::transition`] 修改，
/// 其他组件不应缓存它的值。
#[derive(Debug)]
pub struct GpuResource {
    id: GpuResourceId,
    name: String,
    kind: GpuResourceKind,
    format: GfxFormat,
    usage: GfxUsageFlags,
    native: NativeHandle,
    state: GfxResourceState,
}

pub type SharedGpuResource = Rc<RefCell<GpuResource>>;
pub type WeakGpuResource = Weak<RefCell<GpuResource>>;

// new & init
impl GpuResource {
    pub fn new(
        name: impl Into<String>,
        kind: GpuResourceKind,
        format: GfxFormat,
        usage: GfxUsageFlags,
        native: NativeHandle,
        initial_state: GfxResourceState,
    ) -> Self {
        Self {
            id: GpuResourceId::next(),
            name: name.into(),
            kind,
            format,
            usage,
            native,
            state: initial_state,
        }
    }

    pub fn new_shared(
        name: impl Into<String>,
        kind: GpuResourceKind,
        format: GfxFormat,
        usage: GfxUsageFlags,
        native: NativeHandle,
        initial_state: GfxResourceState,
    ) -> SharedGpuResource {
        Rc::new(RefCell::new(Self::new(name, kind, format, usage, native, initial_state)))
    }
}
// getters
impl GpuResource {
    #[inline]
    pub fn id(&self) -> GpuResourceId {
        self.id
    }
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[inline]
    pub fn kind(&self) -> &GpuResourceKind {
        &self.kind
    }
    #[inline]
    pub fn format(&self) -> GfxFormat {
        self.format
    }
    #[inline]
    pub fn usage(&self) -> GfxUsageFlags {
        self.usage
    }
    #[inline]
    pub fn native(&self) -> NativeHandle {
        self.native
    }
    #[inline]
    pub fn state(&self) -> GfxResourceState {
        self.state
    }
    #[inline]
    pub fn is_texture(&self) -> bool {
        matches!(self.kind, GpuResourceKind::Texture { .. })
    }
    pub fn extent(&self) -> GfxExtent2D {
        match self.kind {
            GpuResourceKind::Texture { width, height, .. } => GfxExtent2D::new(width, height),
            GpuResourceKind::Buffer { size } => GfxExtent2D::new(u32::try_from(size).unwrap_or(u32::MAX), 1),
        }
    }
}
// state
impl GpuResource {
    #[inline]
    pub(crate) fn set_state(&mut self, state: GfxResourceState) {
        self.state = state;
    }
}
