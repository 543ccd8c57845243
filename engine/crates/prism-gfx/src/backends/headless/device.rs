use std::cell::Cell;

use crate::backends::headless::SharedHeadlessJournal;
use crate::backends::headless::command_list::HeadlessCommandList;
use crate::backends::headless::journal::{HeadlessMemory, HeadlessSubmission};
use crate::basic::native::NativeHandle;
use crate::basic::usage::GfxUsageFlags;
use crate::commands::command_list::GfxCommandList;
use crate::descriptors::descriptor::GfxDescriptorDesc;
use crate::error::{GfxError, GfxResult};
use crate::foundation::device::{GfxBackendKind, GfxDevice};
use crate::pipelines::pipeline::GfxPipelineDesc;
use crate::pipelines::root_signature::GfxRootSignatureDesc;
use crate::pipelines::shader::GfxShaderDesc;
use crate::resources::resource::{GfxBufferDesc, GfxTextureDesc};

/// headless 设备
///
/// 提交即完成：`submit` 返回的 fence 值立刻变成已完成。
pub struct HeadlessDevice {
    kind: GfxBackendKind,
    journal: SharedHeadlessJournal,
    last_fence: Cell<u64>,
}

impl HeadlessDevice {
    pub fn new(kind: GfxBackendKind, journal: SharedHeadlessJournal) -> Self {
        Self {
            kind,
            journal,
            last_fence: Cell::new(0),
        }
    }

    #[inline]
    pub fn journal(&self) -> SharedHeadlessJournal {
        self.journal.clone()
    }
}

impl GfxDevice for HeadlessDevice {
    fn backend_kind(&self) -> GfxBackendKind {
        self.kind
    }

    fn create_buffer(&self, desc: &GfxBufferDesc) -> GfxResult<NativeHandle> {
        if desc.size == 0 {
            return Err(GfxError::CreateFailed {
                kind: "buffer",
                name: desc.name.clone(),
                reason: "size is zero".to_string(),
            });
        }

        let mut journal = self.journal.borrow_mut();
        let handle = journal.alloc_handle();
        let bytes = desc.usage.contains(GfxUsageFlags::HOST_WRITE).then(|| vec![0u8; desc.size as usize]);
        journal.memories.insert(
            handle,
            HeadlessMemory {
                name: desc.name.clone(),
                size: desc.size,
                is_texture: false,
                bytes,
            },
        );
        Ok(handle)
    }

    fn create_texture(&self, desc: &GfxTextureDesc, mip_levels: u32) -> GfxResult<NativeHandle> {
        if desc.extent().is_zero_area() || mip_levels == 0 {
            return Err(GfxError::CreateFailed {
                kind: "texture",
                name: desc.name.clone(),
                reason: format!("invalid extent {}x{} with {} mips", desc.width, desc.height, mip_levels),
            });
        }

        let mut journal = self.journal.borrow_mut();
        if let Some(budget) = journal.texture_creation_budget.as_mut() {
            if *budget == 0 {
                return Err(GfxError::CreateFailed {
                    kind: "texture",
                    name: desc.name.clone(),
                    reason: "scripted failure".to_string(),
                });
            }
            *budget -= 1;
        }
        let handle = journal.alloc_handle();
        journal.memories.insert(
            handle,
            HeadlessMemory {
                name: desc.name.clone(),
                size: desc.width as u64 * desc.height as u64 * desc.format.bytes_per_pixel() as u64,
                is_texture: true,
                bytes: None,
            },
        );
        Ok(handle)
    }

    fn release_memory(&self, memory: NativeHandle) {
        let mut journal = self.journal.borrow_mut();
        if journal.memories.remove(&memory).is_none() {
            log::warn!("headless: release unknown memory {:?}", memory);
            return;
        }
        journal.released_memories.push(memory);
    }

    fn write_buffer(&self, buffer: NativeHandle, offset: u64, data: &[u8]) -> GfxResult<()> {
        let mut journal = self.journal.borrow_mut();
        let memory = journal.memories.get_mut(&buffer).ok_or(GfxError::UnknownNativeObject(buffer))?;
        let capacity = memory.size;
        let bytes = memory.bytes.as_mut().ok_or(GfxError::NotHostVisible(buffer))?;

        let size = data.len() as u64;
        if offset.checked_add(size).is_none_or(|end| end > capacity) {
            return Err(GfxError::WriteOutOfBounds { offset, size, capacity });
        }
        bytes[offset as usize..(offset + size) as usize].copy_from_slice(data);
        Ok(())
    }

    fn create_descriptor(&self, desc: &GfxDescriptorDesc) -> GfxResult<NativeHandle> {
        let mut journal = self.journal.borrow_mut();
        if let Some(missing) = desc.resources.iter().find(|r| !journal.memories.contains_key(r)) {
            return Err(GfxError::UnknownNativeObject(*missing));
        }

        let handle = journal.alloc_handle();
        journal
            .descriptors
            .insert(handle, format!("{:?} x{}", desc.view_type, desc.resources.len()));
        Ok(handle)
    }

    fn release_descriptor(&self, descriptor: NativeHandle) {
        let mut journal = self.journal.borrow_mut();
        if journal.descriptors.remove(&descriptor).is_none() {
            log::warn!("headless: release unknown descriptor {:?}", descriptor);
            return;
        }
        journal.released_descriptors.push(descriptor);
    }

    fn create_shader(&self, desc: &GfxShaderDesc) -> GfxResult<NativeHandle> {
        let mut journal = self.journal.borrow_mut();
        let handle = journal.alloc_handle();
        journal.objects.insert(handle, format!("shader `{}` ({:?})", desc.name, desc.stage));
        Ok(handle)
    }

    fn create_root_signature(&self, desc: &GfxRootSignatureDesc) -> GfxResult<NativeHandle> {
        let mut journal = self.journal.borrow_mut();
        let handle = journal.alloc_handle();
        journal.objects.insert(
            handle,
            format!(
                "root signature `{}` ({} params, {} samplers)",
                desc.name,
                desc.parameters.len(),
                desc.static_samplers.len()
            ),
        );
        Ok(handle)
    }

    fn create_pipeline(&self, desc: &GfxPipelineDesc) -> GfxResult<NativeHandle> {
        let mut journal = self.journal.borrow_mut();
        if !journal.objects.contains_key(&desc.root_signature) {
            return Err(GfxError::UnknownNativeObject(desc.root_signature));
        }
        if let Some((_, missing)) = desc.shaders.iter().find(|(_, shader)| !journal.objects.contains_key(shader)) {
            return Err(GfxError::UnknownNativeObject(*missing));
        }

        let handle = journal.alloc_handle();
        journal.objects.insert(handle, format!("pipeline `{}` ({:?})", desc.name, desc.kind));
        Ok(handle)
    }

    fn release_object(&self, object: NativeHandle) {
        if self.journal.borrow_mut().objects.remove(&object).is_none() {
            log::warn!("headless: release unknown object {:?}", object);
        }
    }

    fn create_command_list(&self, name: &str) -> GfxResult<Box<dyn GfxCommandList>> {
        Ok(Box::new(HeadlessCommandList::with_journal(name, self.journal.clone())))
    }

    fn submit(&self, cmd: &mut dyn GfxCommandList) -> GfxResult<u64> {
        let mut journal = self.journal.borrow_mut();
        let (name, commands) = journal.recorded.remove(&cmd.native()).ok_or(GfxError::UnknownNativeObject(cmd.native()))?;

        let fence = self.last_fence.get() + 1;
        self.last_fence.set(fence);
        journal.submissions.push(HeadlessSubmission { name, fence, commands });
        Ok(fence)
    }

    fn completed_fence_value(&self) -> u64 {
        self.last_fence.get()
    }

    fn wait_for_fence(&self, value: u64) {
        debug_assert!(value <= self.last_fence.get(), "wait for fence {} that was never submitted", value);
    }

    fn wait_idle(&self) {
        self.journal.borrow_mut().wait_idle_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backends::headless::journal::HeadlessJournal;
    use crate::basic::format::GfxFormat;

    fn device() -> HeadlessDevice {
        HeadlessDevice::new(GfxBackendKind::D3d12, Rc::new(RefCell::new(HeadlessJournal::default())))
    }

    fn upload_desc(size: u64) -> GfxBufferDesc {
        GfxBufferDesc {
            name: "upload".to_string(),
            size,
            usage: GfxUsageFlags::HOST_WRITE | GfxUsageFlags::TRANSFER_SRC,
            format: GfxFormat::Unknown,
        }
    }

    #[test]
    fn test_write_buffer_bounds() {
        let device = device();
        let buffer = device.create_buffer(&upload_desc(8)).unwrap();

        device.write_buffer(buffer, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.journal().borrow().buffer_bytes(buffer).unwrap(), &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            device.write_buffer(buffer, 6, &[0; 4]),
            Err(GfxError::WriteOutOfBounds { capacity: 8, .. })
        ));
    }

    #[test]
    fn test_submit_completes_immediately() {
        let device = device();
        let mut cmd = device.create_command_list("frame").unwrap();
        cmd.begin();
        cmd.dispatch(1, 1, 1);
        cmd.end();

        let fence = device.submit(cmd.as_mut()).unwrap();
        assert_eq!(device.completed_fence_value(), fence);
        assert_eq!(device.journal().borrow().submissions.len(), 1);
        // 同一次录制不能提交两次
        assert!(device.submit(cmd.as_mut()).is_err());
    }

    #[test]
    fn test_texture_creation_budget() {
        let device = device();
        let desc = GfxTextureDesc {
            name: "target".to_string(),
            width: 4,
            height: 4,
            format: GfxFormat::Rgba8Unorm,
            usage: GfxUsageFlags::RENDER_TARGET,
            generate_mips: false,
            clear_value: None,
        };
        device.journal().borrow_mut().texture_creation_budget = Some(1);

        assert!(device.create_texture(&desc, 1).is_ok());
        assert!(matches!(device.create_texture(&desc, 1), Err(GfxError::CreateFailed { kind: "texture", .. })));
        assert!(device.create_texture(&desc, 1).is_err());

        device.journal().borrow_mut().texture_creation_budget = None;
        assert!(device.create_texture(&desc, 1).is_ok());
    }
}
