use prism_render_interface::handles::IndexedBufferHandle;

/// 节点中排队的 GPU 工作，按列表顺序录制
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RgCommand {
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    /// 绑定顶点 / 索引缓冲并绘制全部索引
    DrawIndexed {
        buffer: IndexedBufferHandle,
        instance_count: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    TraceRays {
        width: u32,
        height: u32,
        depth: u32,
    },
}
