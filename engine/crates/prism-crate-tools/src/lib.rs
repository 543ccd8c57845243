//! Prism 工具集
//!
//! 提供日志初始化以及 profiling zone 的辅助宏。

pub mod init_log;
pub mod profile;

#[doc(hidden)]
pub use tracy_client as __tracy;
