//! Render Graph
//!
//! 一帧内按注册顺序执行的节点列表，不做依赖推导：
//!
//! - **RgNodeDesc / RgNode**: 一个 pass + 按 shader 参数名声明的资源绑定 + 有序的 draw / dispatch / trace 命令
//! - **RenderGraph**: 节点表和本帧的执行队列；执行完毕后队列被清空，调用者需要每帧重新注册
//!
//! 执行时每个绑定的来源资源先经过状态转换，再把 descriptor 写入 root signature 中对应的槽位。

pub mod binding;
pub mod command;
pub mod node;
pub mod render_graph;
pub mod stats;
