pub mod buffer;
pub mod render_pass;
pub mod render_target;
pub mod shader;
pub mod swapchain_target;
pub mod texture;
