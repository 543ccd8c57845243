use std::collections::HashMap;

use crate::backends::headless::command_list::HeadlessCommand;
use crate::basic::native::NativeHandle;

/// 一块由 headless 设备创建的内存
#[derive(Clone, Debug)]
pub struct HeadlessMemory {
    pub name: String,
    pub size: u64,
    pub is_texture: bool,
    /// 只有 host visible 的 buffer 才保存内容
    pub bytes: Option<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct HeadlessSubmission {
    pub name: String,
    pub fence: u64,
    pub commands: Vec<HeadlessCommand>,
}

/// 交换链的脚本化失败
///
/// 计数器大于 0 时，下一次对应调用失败并把计数器减一。
#[derive(Clone, Copy, Debug)]
pub struct HeadlessSurfaceScript {
    pub resize_failures: u32,
    pub recreate_failures: u32,
    pub acquire_failures: u32,
    pub present_failures: u32,
    pub supports_in_place_resize: bool,
}

impl Default for HeadlessSurfaceScript {
    fn default() -> Self {
        Self {
            resize_failures: 0,
            recreate_failures: 0,
            acquire_failures: 0,
            present_failures: 0,
            supports_in_place_resize: true,
        }
    }
}

/// headless 后端的全部可观测状态
#[derive(Debug, Default)]
pub struct HeadlessJournal {
    next_handle: u64,

    pub memories: HashMap<NativeHandle, HeadlessMemory>,
    pub descriptors: HashMap<NativeHandle, String>,
    pub objects: HashMap<NativeHandle, String>,
    pub released_memories: Vec<NativeHandle>,
    pub released_descriptors: Vec<NativeHandle>,

    /// 已经 `end` 但还没提交的命令列表
    pub(crate) recorded: HashMap<NativeHandle, (String, Vec<HeadlessCommand>)>,
    pub submissions: Vec<HeadlessSubmission>,

    pub surface_script: HeadlessSurfaceScript,
    /// 为 `Some(n)` 时再成功创建 n 个纹理，之后的 `create_texture` 全部失败
    pub texture_creation_budget: Option<u32>,
    /// 每一次原地 resize 调用（无论成功与否）
    pub resize_calls: Vec<(u32, u32)>,
    pub recreate_calls: Vec<(u32, u32)>,
    pub acquire_count: u64,
    pub present_count: u64,
    pub wait_idle_count: u64,
}

// handles
impl HeadlessJournal {
    pub(crate) fn alloc_handle(&mut self) -> NativeHandle {
        self.next_handle += 1;
        NativeHandle(self.next_handle)
    }
}
// tools
impl HeadlessJournal {
    #[inline]
    pub fn live_memory_count(&self) -> usize {
        self.memories.len()
    }

    #[inline]
    pub fn live_descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_memory_live(&self, memory: NativeHandle) -> bool {
        self.memories.contains_key(&memory)
    }

    /// 所有提交中的命令，按提交顺序展开
    pub fn submitted_commands(&self) -> impl Iterator<Item = &HeadlessCommand> {
        self.submissions.iter().flat_map(|submission| submission.commands.iter())
    }

    pub fn last_submission(&self) -> Option<&HeadlessSubmission> {
        self.submissions.last()
    }

    /// host visible buffer 的当前内容
    pub fn buffer_bytes(&self, buffer: NativeHandle) -> Option<&[u8]> {
        self.memories.get(&buffer).and_then(|memory| memory.bytes.as_deref())
    }

    /// 消耗一次脚本化失败
    pub(crate) fn consume_failure(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}
