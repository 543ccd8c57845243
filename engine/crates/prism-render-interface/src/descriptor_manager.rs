//! Descriptor 的创建、释放，以及一帧内 descriptor 绑定的批量提交

use std::collections::BTreeMap;
use std::rc::Rc;

use prism_gfx::basic::format::GfxFormat;
use prism_gfx::basic::native::NativeHandle;
use prism_gfx::commands::command_list::GfxCommandList;
use prism_gfx::descriptors::descriptor::{GfxDescriptorDesc, GfxDescriptorViewType, GfxDescriptorWrite};
use prism_gfx::error::GfxResult;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::pipelines::pipeline::GfxPipelineKind;
use prism_gfx::pipelines::root_signature::{GfxRegisterType, GfxRootSignatureAllocation};
use prism_gfx::resources::resource::{GpuResourceId, SharedGpuResource, WeakGpuResource};

/// 一个视图，弱引用它的来源资源
///
/// 绑定前需要通过来源资源做状态转换，但视图本身不延长资源的生命周期。
#[derive(Debug)]
pub struct DescriptorAllocation {
    name: String,
    native: NativeHandle,
    view_type: GfxDescriptorViewType,
    is_table: bool,
    sources: Vec<WeakGpuResource>,
    source_ids: Vec<GpuResourceId>,
}
// getters
impl DescriptorAllocation {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[inline]
    pub fn native(&self) -> NativeHandle {
        self.native
    }
    #[inline]
    pub fn view_type(&self) -> GfxDescriptorViewType {
        self.view_type
    }
    #[inline]
    pub fn is_table(&self) -> bool {
        self.is_table
    }
    #[inline]
    pub fn descriptor_count(&self) -> u32 {
        self.sources.len().max(1) as u32
    }
    /// 仍然存活的来源资源
    pub fn sources(&self) -> impl Iterator<Item = SharedGpuResource> + '_ {
        self.sources.iter().filter_map(|source| source.upgrade())
    }
    #[inline]
    pub fn source_ids(&self) -> &[GpuResourceId] {
        &self.source_ids
    }
    /// 是否恰好由 `resources`（按顺序）创建
    pub fn is_created_from(&self, resources: &[SharedGpuResource]) -> bool {
        self.source_ids.len() == resources.len()
            && self.source_ids.iter().zip(resources).all(|(id, resource)| *id == resource.borrow().id())
    }
}

/// 一帧内累积的 descriptor 绑定，按槽位去重
#[derive(Default)]
pub struct DescriptorUpdater {
    writes: BTreeMap<(u32, GfxRegisterType, u32), GfxDescriptorWrite>,
}

impl DescriptorUpdater {
    /// 同一个槽位只保留最后一次写入
    pub fn update(&mut self, allocation: &GfxRootSignatureAllocation, descriptor: &DescriptorAllocation) {
        let key = (allocation.space, allocation.register_type, allocation.register_begin);
        self.writes.insert(
            key,
            GfxDescriptorWrite {
                register_type: allocation.register_type,
                register_begin: allocation.register_begin,
                space: allocation.space,
                global_parameter_index: allocation.global_parameter_index,
                local_space_index: allocation.local_space_index,
                descriptor: descriptor.native(),
                view_type: descriptor.view_type(),
                is_table: descriptor.is_table(),
                descriptor_count: descriptor.descriptor_count(),
            },
        );
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// 按 (space, register type, register) 的顺序一次性提交
    pub fn flush(&mut self, cmd: &mut dyn GfxCommandList, kind: GfxPipelineKind) -> usize {
        if self.writes.is_empty() {
            return 0;
        }
        let writes = std::mem::take(&mut self.writes).into_values().collect::<Vec<_>>();
        cmd.bind_descriptors(kind, &writes);
        writes.len()
    }
}

pub struct DescriptorManager {
    device: Rc<dyn GfxDevice>,
    live_descriptors: Vec<Rc<DescriptorAllocation>>,
    updater: DescriptorUpdater,
    /// 创建过的 descriptor 总数
    created_count: u64,
}
// new & init
impl DescriptorManager {
    pub fn new(device: Rc<dyn GfxDevice>) -> Self {
        Self {
            device,
            live_descriptors: Vec::new(),
            updater: DescriptorUpdater::default(),
            created_count: 0,
        }
    }
}
// create
impl DescriptorManager {
    /// 在 `resources` 上创建视图；多于一个资源或 `as_table` 为 true 时以 table 的形式创建
    pub fn create_descriptor(
        &mut self,
        name: &str,
        view_type: GfxDescriptorViewType,
        resources: &[SharedGpuResource],
        as_table: bool,
    ) -> GfxResult<Rc<DescriptorAllocation>> {
        assert!(!resources.is_empty(), "descriptor `{}` has no source resource", name);

        let is_table = as_table || resources.len() > 1;
        let desc = GfxDescriptorDesc {
            view_type,
            resources: resources.iter().map(|r| r.borrow().native()).collect(),
            format: resources[0].borrow().format(),
            as_table: is_table,
        };
        let native = self.device.create_descriptor(&desc)?;

        Ok(self.track(DescriptorAllocation {
            name: name.to_string(),
            native,
            view_type,
            is_table,
            sources: resources.iter().map(Rc::downgrade).collect(),
            source_ids: resources.iter().map(|r| r.borrow().id()).collect(),
        }))
    }

    /// 静态 sampler 的 descriptor，没有来源资源
    pub fn create_sampler_descriptor(&mut self, name: &str) -> GfxResult<Rc<DescriptorAllocation>> {
        let desc = GfxDescriptorDesc {
            view_type: GfxDescriptorViewType::Sampler,
            resources: vec![],
            format: GfxFormat::Unknown,
            as_table: false,
        };
        let native = self.device.create_descriptor(&desc)?;

        Ok(self.track(DescriptorAllocation {
            name: name.to_string(),
            native,
            view_type: GfxDescriptorViewType::Sampler,
            is_table: false,
            sources: vec![],
            source_ids: vec![],
        }))
    }

    fn track(&mut self, allocation: DescriptorAllocation) -> Rc<DescriptorAllocation> {
        let allocation = Rc::new(allocation);
        self.live_descriptors.push(allocation.clone());
        self.created_count += 1;
        allocation
    }
}
// release
impl DescriptorManager {
    /// # Panics
    /// descriptor 不在存活列表中时 panic
    pub fn release_descriptor(&mut self, allocation: &Rc<DescriptorAllocation>) {
        let index = self
            .live_descriptors
            .iter()
            .position(|live| Rc::ptr_eq(live, allocation))
            .unwrap_or_else(|| panic!("descriptor `{}` is not alive", allocation.name()));

        let allocation = self.live_descriptors.swap_remove(index);
        self.device.release_descriptor(allocation.native());
    }

    pub fn release_all(&mut self) {
        for allocation in self.live_descriptors.drain(..) {
            self.device.release_descriptor(allocation.native());
        }
    }
}
// update
impl DescriptorManager {
    #[inline]
    pub fn update_descriptor(&mut self, allocation: &GfxRootSignatureAllocation, descriptor: &DescriptorAllocation) {
        self.updater.update(allocation, descriptor);
    }

    /// 把累积的绑定一次性提交到命令列表，返回提交的绑定数量
    #[inline]
    pub fn finalize_update_descriptors(&mut self, cmd: &mut dyn GfxCommandList, kind: GfxPipelineKind) -> usize {
        self.updater.flush(cmd, kind)
    }
}
// getters
impl DescriptorManager {
    #[inline]
    pub fn live_descriptor_count(&self) -> usize {
        self.live_descriptors.len()
    }
    #[inline]
    pub fn created_count(&self) -> u64 {
        self.created_count
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use prism_gfx::backends::headless::command_list::{HeadlessCommand, HeadlessCommandList};
    use prism_gfx::backends::headless::device::HeadlessDevice;
    use prism_gfx::backends::headless::journal::HeadlessJournal;
    use prism_gfx::basic::usage::GfxUsageFlags;
    use prism_gfx::foundation::device::GfxBackendKind;
    use prism_gfx::resources::resource::GfxTextureDesc;

    use super::*;
    use crate::memory_manager::MemoryManager;

    fn managers() -> (MemoryManager, DescriptorManager) {
        let journal = Rc::new(RefCell::new(HeadlessJournal::default()));
        let device: Rc<dyn GfxDevice> = Rc::new(HeadlessDevice::new(GfxBackendKind::D3d12, journal));
        (MemoryManager::new(device.clone()), DescriptorManager::new(device))
    }

    fn texture(memory: &mut MemoryManager, name: &str) -> SharedGpuResource {
        let desc = GfxTextureDesc {
            name: name.to_string(),
            width: 4,
            height: 4,
            format: GfxFormat::Rgba8Unorm,
            usage: GfxUsageFlags::SHADER_RESOURCE,
            generate_mips: false,
            clear_value: None,
        };
        memory.allocate_texture_memory(&desc).unwrap().resource().clone()
    }

    fn allocation(space: u32, register_begin: u32) -> GfxRootSignatureAllocation {
        GfxRootSignatureAllocation {
            register_type: GfxRegisterType::ShaderResource,
            register_begin,
            register_end: register_begin + 1,
            space,
            global_parameter_index: Some(register_begin),
            local_space_index: register_begin,
            bindless: false,
        }
    }

    #[test]
    fn test_descriptor_tracks_sources_weakly() {
        let (mut memory, mut descriptors) = managers();
        let a = texture(&mut memory, "a");
        let b = texture(&mut memory, "b");

        let table = descriptors
            .create_descriptor("textures", GfxDescriptorViewType::Srv, &[a.clone(), b.clone()], false)
            .unwrap();
        assert!(table.is_table());
        assert_eq!(table.descriptor_count(), 2);
        assert!(table.is_created_from(&[a.clone(), b.clone()]));
        assert!(!table.is_created_from(&[b.clone(), a.clone()]));
        assert_eq!(Rc::strong_count(&a), 2);
    }

    #[test]
    fn test_single_resource_table_is_explicit() {
        let (mut memory, mut descriptors) = managers();
        let a = texture(&mut memory, "a");

        let single = descriptors.create_descriptor("a", GfxDescriptorViewType::Srv, &[a.clone()], false).unwrap();
        let table = descriptors.create_descriptor("a-table", GfxDescriptorViewType::Srv, &[a], true).unwrap();
        assert!(!single.is_table());
        assert!(table.is_table());
    }

    #[test]
    fn test_updates_are_batched_and_deduplicated() {
        let (mut memory, mut descriptors) = managers();
        let a = texture(&mut memory, "a");
        let view = descriptors.create_descriptor("a", GfxDescriptorViewType::Srv, &[a], false).unwrap();

        descriptors.update_descriptor(&allocation(1, 2), &view);
        descriptors.update_descriptor(&allocation(0, 0), &view);
        descriptors.update_descriptor(&allocation(1, 2), &view);

        let mut cmd = HeadlessCommandList::new("test");
        assert_eq!(descriptors.finalize_update_descriptors(&mut cmd, GfxPipelineKind::Graphics), 2);
        assert_eq!(descriptors.finalize_update_descriptors(&mut cmd, GfxPipelineKind::Graphics), 0);

        match cmd.commands() {
            [HeadlessCommand::BindDescriptors { writes, .. }] => {
                assert_eq!(writes.iter().map(|w| w.space).collect::<Vec<_>>(), vec![0, 1]);
            }
            other => panic!("unexpected commands {:?}", other),
        }
    }

    #[test]
    #[should_panic(expected = "is not alive")]
    fn test_release_unknown_descriptor_panics() {
        let (_, mut descriptors) = managers();
        let sampler = descriptors.create_sampler_descriptor("linear").unwrap();
        descriptors.release_descriptor(&sampler);
        descriptors.release_descriptor(&sampler);
    }
}
