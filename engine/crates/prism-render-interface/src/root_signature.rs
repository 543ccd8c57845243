use std::rc::Rc;

use indexmap::IndexMap;
use prism_gfx::basic::native::NativeHandle;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::pipelines::root_signature::{GfxRootParameterDesc, GfxRootSignatureAllocation, GfxRootSignatureDesc};

use crate::descriptor_manager::{DescriptorAllocation, DescriptorManager};

/// 已构建的 root signature
///
/// 布局构建完成后不可变，参数名到 allocation 的查询失败视为配置错误。
pub struct RootSignature {
    name: String,
    native: NativeHandle,
    parameters: IndexMap<String, GfxRootParameterDesc>,
    space_count: u32,
    static_sampler_descriptors: Vec<Rc<DescriptorAllocation>>,
}
// new & init
impl RootSignature {
    pub(crate) fn new(
        desc: GfxRootSignatureDesc,
        native: NativeHandle,
        static_sampler_descriptors: Vec<Rc<DescriptorAllocation>>,
    ) -> Self {
        let parameters = desc
            .parameters
            .into_iter()
            .chain(desc.static_samplers)
            .map(|param| (param.name.clone(), param))
            .collect();

        Self {
            name: desc.name,
            native,
            parameters,
            space_count: desc.space_count,
            static_sampler_descriptors,
        }
    }
}
// getters
impl RootSignature {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[inline]
    pub fn native(&self) -> NativeHandle {
        self.native
    }
    #[inline]
    pub fn space_count(&self) -> u32 {
        self.space_count
    }

    /// # Panics
    /// 参数名不在布局中
    pub fn allocation(&self, name: &str) -> &GfxRootSignatureAllocation {
        match self.parameters.get(name) {
            Some(param) => &param.allocation,
            None => panic!("root signature `{}` has no parameter named `{}`", self.name, name),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&GfxRootParameterDesc> {
        self.parameters.get(name)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &GfxRootParameterDesc> {
        self.parameters.values()
    }

    #[inline]
    pub fn static_sampler_descriptors(&self) -> &[Rc<DescriptorAllocation>] {
        &self.static_sampler_descriptors
    }
}
// destroy
impl RootSignature {
    pub fn destroy(&self, device: &dyn GfxDevice, descriptor_manager: &mut DescriptorManager) {
        for sampler in &self.static_sampler_descriptors {
            descriptor_manager.release_descriptor(sampler);
        }
        device.release_object(self.native);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use prism_gfx::backends::headless::device::HeadlessDevice;
    use prism_gfx::backends::headless::journal::HeadlessJournal;
    use prism_gfx::foundation::device::GfxBackendKind;
    use prism_gfx::pipelines::root_signature::GfxRootParameterShape;

    use crate::root_binding::{DescriptorRangeType, RootParameterInfo, RootParameterType, RootSignatureLayoutBuilder};

    use super::*;

    #[test]
    fn test_build_and_lookup() {
        let journal = Rc::new(RefCell::new(HeadlessJournal::default()));
        let device: Rc<dyn GfxDevice> = Rc::new(HeadlessDevice::new(GfxBackendKind::D3d12, journal.clone()));
        let mut descriptors = DescriptorManager::new(device.clone());

        let mut builder = RootSignatureLayoutBuilder::new("lighting");
        builder.add_root_parameter_with_register_count(&RootParameterInfo::new("scene", RootParameterType::Cbv, 1));
        builder.add_root_parameter_with_register_count(&RootParameterInfo::new(
            "textures",
            RootParameterType::DescriptorTable {
                range_type: DescriptorRangeType::Srv,
            },
            0,
        ));
        builder.add_root_parameter_with_register_count(&RootParameterInfo::new(
            "linear",
            RootParameterType::Sampler,
            1,
        ));

        let root_signature = builder.build_root_signature(device.as_ref(), &mut descriptors).unwrap();
        assert_eq!(root_signature.space_count(), 3);
        assert!(root_signature.allocation("textures").bindless);
        assert_eq!(
            root_signature.parameter("linear").unwrap().shape,
            GfxRootParameterShape::StaticSampler
        );
        assert_eq!(root_signature.static_sampler_descriptors().len(), 1);
        assert_eq!(descriptors.live_descriptor_count(), 1);

        root_signature.destroy(device.as_ref(), &mut descriptors);
        assert_eq!(descriptors.live_descriptor_count(), 0);
        assert!(journal.borrow().objects.is_empty());
    }

    #[test]
    #[should_panic(expected = "has no parameter named `missing`")]
    fn test_lookup_miss_panics() {
        let device: Rc<dyn GfxDevice> =
            Rc::new(HeadlessDevice::new(GfxBackendKind::Vulkan, Rc::new(RefCell::new(HeadlessJournal::default()))));
        let mut descriptors = DescriptorManager::new(device.clone());
        let root_signature =
            RootSignatureLayoutBuilder::new("empty").build_root_signature(device.as_ref(), &mut descriptors).unwrap();
        root_signature.allocation("missing");
    }
}
