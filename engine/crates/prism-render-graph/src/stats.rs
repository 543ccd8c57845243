use std::fmt;

/// 一帧 render graph 执行的统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RgFrameStats {
    pub nodes_executed: u32,
    pub barriers: u32,
    pub descriptors_created: u32,
    pub descriptor_writes: u32,
    pub draws: u32,
    pub dispatches: u32,
    pub trace_calls: u32,
    pub texture_uploads: u32,
}

impl fmt::Display for RgFrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nodes: {}, barriers: {}, descriptors: {}/{}, draws: {}, dispatches: {}, traces: {}, uploads: {}",
            self.nodes_executed,
            self.barriers,
            self.descriptors_created,
            self.descriptor_writes,
            self.draws,
            self.dispatches,
            self.trace_calls,
            self.texture_uploads
        )
    }
}
