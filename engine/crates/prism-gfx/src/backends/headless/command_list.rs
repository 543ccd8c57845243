use std::cell::RefCell;
use std::rc::Rc;

use crate::backends::headless::SharedHeadlessJournal;
use crate::backends::headless::journal::HeadlessJournal;
use crate::basic::native::{GfxExtent2D, GfxRect, GfxViewport, NativeHandle};
use crate::commands::barrier::GfxBarrier;
use crate::commands::command_list::{GfxCommandList, GfxRenderingInfo};
use crate::descriptors::descriptor::GfxDescriptorWrite;
use crate::pipelines::pipeline::{GfxIndexFormat, GfxPipelineKind, GfxPrimitiveTopology};
use crate::resources::copy_layout::GfxMipCopyInfo;

/// headless 命令列表录制下来的一条命令
#[derive(Clone, Debug, PartialEq)]
pub enum HeadlessCommand {
    Barrier(GfxBarrier),
    BindPipeline {
        kind: GfxPipelineKind,
        pipeline: NativeHandle,
    },
    BindRootSignature {
        kind: GfxPipelineKind,
        root_signature: NativeHandle,
    },
    SetViewport(GfxViewport),
    SetScissor(GfxRect),
    SetPrimitiveTopology(GfxPrimitiveTopology),
    BindDescriptors {
        kind: GfxPipelineKind,
        writes: Vec<GfxDescriptorWrite>,
    },
    BindVertexBuffer {
        buffer: NativeHandle,
        stride: u32,
        size: u64,
    },
    BindIndexBuffer {
        buffer: NativeHandle,
        format: GfxIndexFormat,
        size: u64,
    },
    BeginRendering(GfxRenderingInfo),
    EndRendering,
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
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
    CopyTexture {
        src: NativeHandle,
        dst: NativeHandle,
        extent: GfxExtent2D,
    },
    CopyBufferToTexture {
        src: NativeHandle,
        dst: NativeHandle,
        mip: GfxMipCopyInfo,
    },
}

pub struct HeadlessCommandList {
    name: String,
    native: NativeHandle,
    journal: SharedHeadlessJournal,
    recording: bool,
    commands: Vec<HeadlessCommand>,
}

// new & init
impl HeadlessCommandList {
    /// 独立的命令列表，拥有自己的 journal
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_journal(name, Rc::new(RefCell::new(HeadlessJournal::default())))
    }

    pub fn with_journal(name: impl Into<String>, journal: SharedHeadlessJournal) -> Self {
        let native = journal.borrow_mut().alloc_handle();
        Self {
            name: name.into(),
            native,
            journal,
            recording: false,
            commands: Vec::new(),
        }
    }
}
// getters
impl HeadlessCommandList {
    /// 最近一次 `begin` 之后录制的命令
    #[inline]
    pub fn commands(&self) -> &[HeadlessCommand] {
        &self.commands
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording
    }
}

impl GfxCommandList for HeadlessCommandList {
    fn name(&self) -> &str {
        &self.name
    }

    fn native(&self) -> NativeHandle {
        self.native
    }

    fn begin(&mut self) {
        debug_assert!(!self.recording, "command list `{}` is already recording", self.name);
        self.recording = true;
        self.commands.clear();
    }

    fn end(&mut self) {
        debug_assert!(self.recording, "command list `{}` is not recording", self.name);
        self.recording = false;
        self.journal
            .borrow_mut()
            .recorded
            .insert(self.native, (self.name.clone(), self.commands.clone()));
    }

    fn resource_barrier(&mut self, barrier: &GfxBarrier) {
        self.commands.push(HeadlessCommand::Barrier(*barrier));
    }

    fn bind_pipeline(&mut self, kind: GfxPipelineKind, pipeline: NativeHandle) {
        self.commands.push(HeadlessCommand::BindPipeline { kind, pipeline });
    }

    fn bind_root_signature(&mut self, kind: GfxPipelineKind, root_signature: NativeHandle) {
        self.commands.push(HeadlessCommand::BindRootSignature { kind, root_signature });
    }

    fn set_viewport(&mut self, viewport: GfxViewport) {
        self.commands.push(HeadlessCommand::SetViewport(viewport));
    }

    fn set_scissor(&mut self, scissor: GfxRect) {
        self.commands.push(HeadlessCommand::SetScissor(scissor));
    }

    fn set_primitive_topology(&mut self, topology: GfxPrimitiveTopology) {
        self.commands.push(HeadlessCommand::SetPrimitiveTopology(topology));
    }

    fn bind_descriptors(&mut self, kind: GfxPipelineKind, writes: &[GfxDescriptorWrite]) {
        self.commands.push(HeadlessCommand::BindDescriptors {
            kind,
            writes: writes.to_vec(),
        });
    }

    fn bind_vertex_buffer(&mut self, buffer: NativeHandle, stride: u32, size: u64) {
        self.commands.push(HeadlessCommand::BindVertexBuffer { buffer, stride, size });
    }

    fn bind_index_buffer(&mut self, buffer: NativeHandle, format: GfxIndexFormat, size: u64) {
        self.commands.push(HeadlessCommand::BindIndexBuffer { buffer, format, size });
    }

    fn begin_rendering(&mut self, info: &GfxRenderingInfo) {
        self.commands.push(HeadlessCommand::BeginRendering(info.clone()));
    }

    fn end_rendering(&mut self) {
        self.commands.push(HeadlessCommand::EndRendering);
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, _first_vertex: u32, _first_instance: u32) {
        self.commands.push(HeadlessCommand::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.commands.push(HeadlessCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
        });
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) {
        self.commands.push(HeadlessCommand::Dispatch {
            x: group_count_x,
            y: group_count_y,
            z: group_count_z,
        });
    }

    fn trace_rays(&mut self, width: u32, height: u32, depth: u32) {
        self.commands.push(HeadlessCommand::TraceRays { width, height, depth });
    }

    fn copy_texture(&mut self, src: NativeHandle, dst: NativeHandle, extent: GfxExtent2D) {
        self.commands.push(HeadlessCommand::CopyTexture { src, dst, extent });
    }

    fn copy_buffer_to_texture(&mut self, src: NativeHandle, dst: NativeHandle, mip: &GfxMipCopyInfo) {
        self.commands.push(HeadlessCommand::CopyBufferToTexture { src, dst, mip: *mip });
    }
}
