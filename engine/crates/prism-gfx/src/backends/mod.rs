pub mod d3d12;
pub mod headless;
pub mod vulkan;
