//! Prism GFX 层
//!
//! 这一层只描述 "GPU 能做什么"，不关心具体的 API 对象如何创建：
//!
//! - `foundation` / `commands` / `swapchain` 中的 trait 是后端能力接口，
//!   由 Vulkan 类或 D3D12 类的后端对象实现，启动时通过 [`backend::GfxBackendFactory`] 一次性选定。
//! - `resources` 中的 [`resources::resource::GpuResource`] 持有资源的当前状态，
//!   只能经由 [`commands::state_tracker::GfxStateTracker`] 修改。
//! - `backends` 提供两类后端的 barrier / format 映射表，以及一个可以在没有 GPU 的环境中运行的 headless 后端。

pub mod backend;
pub mod backends;
pub mod basic;
pub mod commands;
pub mod descriptors;
pub mod error;
pub mod foundation;
pub mod pipelines;
pub mod resources;
pub mod swapchain;
