use crate::basic::native::NativeHandle;

/// 可恢复的后端调用错误
///
/// 致命的配置错误（非法的 root parameter 类型、查表失败等）不会出现在这里，它们直接 panic。
#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    #[error("backend failed to create {kind} `{name}`: {reason}")]
    CreateFailed {
        kind: &'static str,
        name: String,
        reason: String,
    },
    #[error("native object {0:?} is unknown to the backend")]
    UnknownNativeObject(NativeHandle),
    #[error("write of {size} bytes at offset {offset} exceeds buffer size {capacity}")]
    WriteOutOfBounds { offset: u64, size: u64, capacity: u64 },
    #[error("buffer {0:?} is not host visible")]
    NotHostVisible(NativeHandle),
}

/// 交换链相关的可恢复错误，会被汇报给生命周期状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GfxSurfaceError {
    #[error("swapchain is out of date")]
    OutOfDate,
    #[error("surface lost")]
    SurfaceLost,
    #[error("timeout while waiting for the presentation engine")]
    Timeout,
}

pub type GfxResult<T> = Result<T, GfxError>;
