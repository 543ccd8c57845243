//! Prism Renderer
//!
//! 把 GFX 层、资源管理和 render graph 组装成一个可以逐帧 tick 的 [`renderer::Renderer`]：
//!
//! - [`swapchain_lifecycle`]: 交换链状态机，负责 resize 的去抖、失败后的退避重试以及延迟释放的推进
//! - [`frame_slots`]: 每个 back buffer 槽位一个命令列表和 fence
//! - [`config`]: TOML 配置

pub mod config;
pub mod frame_slots;
pub mod renderer;
pub mod swapchain_lifecycle;
