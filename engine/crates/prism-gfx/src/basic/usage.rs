bitflags::bitflags! {
    /// 资源声明的用途
    ///
    /// 资源能被转换到哪些状态由这里决定，见 [`crate::resources::resource_state::GfxResourceState::is_allowed_for`]。
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct GfxUsageFlags: u32 {
        const RENDER_TARGET = 1 << 0;
        const DEPTH_STENCIL = 1 << 1;
        const SHADER_RESOURCE = 1 << 2;
        const UNORDERED_ACCESS = 1 << 3;
        const TRANSFER_SRC = 1 << 4;
        const TRANSFER_DST = 1 << 5;
        const VERTEX = 1 << 6;
        const INDEX = 1 << 7;
        const INDIRECT = 1 << 8;
        const CONSTANT = 1 << 9;
        const RAY_TRACING = 1 << 10;
        /// CPU 可写（upload heap / host visible memory）
        const HOST_WRITE = 1 << 11;
    }
}
