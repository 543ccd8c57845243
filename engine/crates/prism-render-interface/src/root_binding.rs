//! Root signature 的布局分配
//!
//! 输入是 shader 反射得到的参数（名字 + 类型 + 寄存器数量），输出每个参数的
//! (register type, register 范围, space, 全局序号, space 内序号)。
//!
//! space 的分配规则：
//! - 至多一个 "普通资源" space，所有定长的 CBV / SRV / UAV / table 共用，第一次遇到时创建；
//! - 至多一个 sampler space，第一次遇到 sampler 时创建；
//! - 每个 bindless table（数量为 0）独占一个新的 space，寄存器从 0 开始。
//!
//! space 序号单调递增，分配出去之后不会再被其他角色使用。

use std::collections::HashMap;

use indexmap::IndexMap;
use itertools::Itertools;
use prism_gfx::error::GfxResult;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::pipelines::root_signature::{
    GfxRegisterType, GfxRootParameterDesc, GfxRootParameterShape, GfxRootSignatureAllocation, GfxRootSignatureDesc,
};
use prism_gfx::pipelines::shader::{GfxReflectionBindingType, GfxShaderReflectionEntry};

use crate::descriptor_manager::DescriptorManager;
use crate::root_signature::RootSignature;

/// descriptor table 中 range 的类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorRangeType {
    Cbv,
    Srv,
    Uav,
    Sampler,
    /// 反射没能给出类型，出现即为配置错误
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RootParameterType {
    Constants { num_32bit_values: u32 },
    Cbv,
    Srv,
    Uav,
    Sampler,
    DescriptorTable { range_type: DescriptorRangeType },
}

impl RootParameterType {
    pub fn register_type(&self) -> GfxRegisterType {
        match self {
            RootParameterType::Constants { .. } | RootParameterType::Cbv => GfxRegisterType::ConstantBuffer,
            RootParameterType::Srv => GfxRegisterType::ShaderResource,
            RootParameterType::Uav => GfxRegisterType::UnorderedAccess,
            RootParameterType::Sampler => GfxRegisterType::Sampler,
            RootParameterType::DescriptorTable { range_type } => match range_type {
                DescriptorRangeType::Cbv => GfxRegisterType::ConstantBuffer,
                DescriptorRangeType::Srv => GfxRegisterType::ShaderResource,
                DescriptorRangeType::Uav => GfxRegisterType::UnorderedAccess,
                DescriptorRangeType::Sampler => GfxRegisterType::Sampler,
                DescriptorRangeType::Unknown => panic!("descriptor table range has an unknown type"),
            },
        }
    }

    #[inline]
    pub fn is_table(&self) -> bool {
        matches!(self, RootParameterType::DescriptorTable { .. })
    }
}

/// 一个待分配的 root parameter
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootParameterInfo {
    pub name: String,
    pub parameter_type: RootParameterType,
    /// 占用的寄存器数量；table 为 0 时表示 bindless
    pub register_count: u32,
}

impl RootParameterInfo {
    pub fn new(name: impl Into<String>, parameter_type: RootParameterType, register_count: u32) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            register_count,
        }
    }

    /// 反射条目到 root parameter 的映射
    ///
    /// 纹理总是走 descriptor table；数量为 1 的 buffer 使用 root descriptor。
    pub fn from_reflection(entry: &GfxShaderReflectionEntry) -> Self {
        let table = |range_type| RootParameterType::DescriptorTable { range_type };
        let single_or_table = |single, range_type| {
            if entry.register_count == 1 { single } else { table(range_type) }
        };

        let parameter_type = match entry.binding_type {
            GfxReflectionBindingType::RootConstants { num_32bit_values } => {
                RootParameterType::Constants { num_32bit_values }
            }
            GfxReflectionBindingType::ConstantBuffer => single_or_table(RootParameterType::Cbv, DescriptorRangeType::Cbv),
            GfxReflectionBindingType::BufferSrv => single_or_table(RootParameterType::Srv, DescriptorRangeType::Srv),
            GfxReflectionBindingType::BufferUav => single_or_table(RootParameterType::Uav, DescriptorRangeType::Uav),
            GfxReflectionBindingType::TextureSrv => table(DescriptorRangeType::Srv),
            GfxReflectionBindingType::TextureUav => table(DescriptorRangeType::Uav),
            GfxReflectionBindingType::Sampler => {
                single_or_table(RootParameterType::Sampler, DescriptorRangeType::Sampler)
            }
            GfxReflectionBindingType::AccelerationStructure => RootParameterType::Srv,
        };

        Self::new(entry.name.clone(), parameter_type, entry.register_count)
    }

    fn shape(&self) -> GfxRootParameterShape {
        match self.parameter_type {
            RootParameterType::Constants { num_32bit_values } => GfxRootParameterShape::Constants { num_32bit_values },
            RootParameterType::Cbv | RootParameterType::Srv | RootParameterType::Uav => {
                GfxRootParameterShape::Descriptor
            }
            RootParameterType::Sampler => GfxRootParameterShape::StaticSampler,
            RootParameterType::DescriptorTable {
                range_type: DescriptorRangeType::Sampler,
            } if self.register_count > 0 => GfxRootParameterShape::StaticSampler,
            RootParameterType::DescriptorTable { .. } => GfxRootParameterShape::Table,
        }
    }
}

/// 逐个参数分配寄存器，最后构建 [`RootSignature`]
pub struct RootSignatureLayoutBuilder {
    name: String,
    parameters: IndexMap<String, (RootParameterInfo, GfxRootSignatureAllocation)>,

    next_space: u32,
    normal_space: Option<u32>,
    sampler_space: Option<u32>,
    bindless_spaces: Vec<u32>,

    /// (space, register type) -> 下一个可用寄存器
    register_counters: HashMap<(u32, GfxRegisterType), u32>,
    /// space -> 下一个 space 内序号
    local_counters: HashMap<u32, u32>,
    next_global_index: u32,
}
// new & init
impl RootSignatureLayoutBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: IndexMap::new(),
            next_space: 0,
            normal_space: None,
            sampler_space: None,
            bindless_spaces: Vec::new(),
            register_counters: HashMap::new(),
            local_counters: HashMap::new(),
            next_global_index: 0,
        }
    }
}
// allocate
impl RootSignatureLayoutBuilder {
    /// 为一个参数分配位置
    ///
    /// 同名参数（例如 VS 和 PS 都引用的常量）只分配一次，直接返回已有的结果。
    ///
    /// # Panics
    /// 同名参数类型冲突，或 table 的 range 类型未知。
    pub fn add_root_parameter_with_register_count(&mut self, info: &RootParameterInfo) -> GfxRootSignatureAllocation {
        if let Some((existing, allocation)) = self.parameters.get(&info.name) {
            assert_eq!(
                existing.parameter_type, info.parameter_type,
                "root parameter `{}` is declared with conflicting types",
                info.name
            );
            return allocation.clone();
        }

        let register_type = info.parameter_type.register_type();
        let bindless = info.parameter_type.is_table() && info.register_count == 0;

        let space = if bindless {
            let space = self.claim_space();
            self.bindless_spaces.push(space);
            space
        } else if register_type == GfxRegisterType::Sampler {
            match self.sampler_space {
                Some(space) => space,
                None => {
                    let space = self.claim_space();
                    self.sampler_space = Some(space);
                    space
                }
            }
        } else {
            match self.normal_space {
                Some(space) => space,
                None => {
                    let space = self.claim_space();
                    self.normal_space = Some(space);
                    space
                }
            }
        };

        let (register_begin, register_end) = if bindless {
            (0, GfxRootSignatureAllocation::UNBOUNDED_REGISTER_END)
        } else {
            let count = info.register_count.max(1);
            let counter = self.register_counters.entry((space, register_type)).or_insert(0);
            let begin = *counter;
            *counter += count;
            (begin, begin + count)
        };

        let local_counter = self.local_counters.entry(space).or_insert(0);
        let local_space_index = *local_counter;
        *local_counter += 1;

        let global_parameter_index = if register_type == GfxRegisterType::Sampler {
            None
        } else {
            let index = self.next_global_index;
            self.next_global_index += 1;
            Some(index)
        };

        let allocation = GfxRootSignatureAllocation {
            register_type,
            register_begin,
            register_end,
            space,
            global_parameter_index,
            local_space_index,
            bindless,
        };
        log::trace!(
            "root signature `{}`: `{}` -> {}{} space{}",
            self.name,
            info.name,
            register_type.prefix(),
            register_begin,
            space
        );

        self.parameters.insert(info.name.clone(), (info.clone(), allocation.clone()));
        allocation
    }

    /// 按顺序分配一组反射条目
    pub fn add_reflection_entries(&mut self, entries: &[GfxShaderReflectionEntry]) {
        for entry in entries {
            self.add_root_parameter_with_register_count(&RootParameterInfo::from_reflection(entry));
        }
    }

    #[inline]
    fn claim_space(&mut self) -> u32 {
        let space = self.next_space;
        self.next_space += 1;
        space
    }
}
// getters
impl RootSignatureLayoutBuilder {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allocation(&self, name: &str) -> Option<&GfxRootSignatureAllocation> {
        self.parameters.get(name).map(|(_, allocation)| allocation)
    }

    /// 按分配顺序遍历
    pub fn allocations(&self) -> impl Iterator<Item = (&str, &GfxRootSignatureAllocation)> {
        self.parameters.iter().map(|(name, (_, allocation))| (name.as_str(), allocation))
    }

    #[inline]
    pub fn space_count(&self) -> u32 {
        self.next_space
    }

    #[inline]
    pub fn bindless_spaces(&self) -> &[u32] {
        &self.bindless_spaces
    }
}
// build
impl RootSignatureLayoutBuilder {
    /// 构建后端的 root signature 对象，并为静态 sampler 创建 descriptor
    pub fn build_root_signature(
        &self,
        device: &dyn GfxDevice,
        descriptor_manager: &mut DescriptorManager,
    ) -> GfxResult<RootSignature> {
        let _span = prism_crate_tools::profile_span!("build_root_signature");

        let descs = self.parameters.iter().map(|(name, (info, allocation))| GfxRootParameterDesc {
            name: name.clone(),
            shape: info.shape(),
            allocation: allocation.clone(),
        });
        let (static_samplers, parameters): (Vec<_>, Vec<_>) =
            descs.partition(|desc| desc.shape == GfxRootParameterShape::StaticSampler);
        let parameters = parameters
            .into_iter()
            .sorted_by_key(|desc| desc.allocation.global_parameter_index)
            .collect_vec();

        let desc = GfxRootSignatureDesc {
            name: self.name.clone(),
            parameters,
            static_samplers,
            space_count: self.next_space,
        };
        let native = device.create_root_signature(&desc)?;

        let sampler_descriptors = desc
            .static_samplers
            .iter()
            .map(|sampler| descriptor_manager.create_sampler_descriptor(&sampler.name))
            .collect::<GfxResult<Vec<_>>>()?;

        log::debug!(
            "build root signature `{}`: {} parameters, {} static samplers, {} spaces",
            self.name,
            desc.parameters.len(),
            desc.static_samplers.len(),
            desc.space_count
        );
        Ok(RootSignature::new(desc, native, sampler_descriptors))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn table(range_type: DescriptorRangeType) -> RootParameterType {
        RootParameterType::DescriptorTable { range_type }
    }

    fn mixed_builder() -> RootSignatureLayoutBuilder {
        let mut builder = RootSignatureLayoutBuilder::new("mixed");
        for info in [
            RootParameterInfo::new("per_frame", RootParameterType::Cbv, 1),
            RootParameterInfo::new("bindless_textures", table(DescriptorRangeType::Srv), 0),
            RootParameterInfo::new("linear_sampler", RootParameterType::Sampler, 1),
            RootParameterInfo::new("gbuffer", table(DescriptorRangeType::Srv), 3),
            RootParameterInfo::new("instances", RootParameterType::Srv, 1),
            RootParameterInfo::new("bindless_buffers", table(DescriptorRangeType::Uav), 0),
            RootParameterInfo::new("push", RootParameterType::Constants { num_32bit_values: 4 }, 1),
            RootParameterInfo::new("output", RootParameterType::Uav, 1),
            RootParameterInfo::new("point_sampler", RootParameterType::Sampler, 1),
        ] {
            builder.add_root_parameter_with_register_count(&info);
        }
        builder
    }

    #[test]
    fn test_register_triples_are_unique() {
        let builder = mixed_builder();
        let mut seen = HashSet::new();
        for (name, allocation) in builder.allocations().filter(|(_, a)| !a.bindless) {
            for register in allocation.register_begin..allocation.register_end {
                assert!(
                    seen.insert((allocation.register_type, register, allocation.space)),
                    "`{}` reuses {}{} space{}",
                    name,
                    allocation.register_type.prefix(),
                    register,
                    allocation.space
                );
            }
        }
    }

    #[test]
    fn test_bindless_ranges_own_their_space() {
        let builder = mixed_builder();
        for (name, allocation) in builder.allocations().filter(|(_, a)| a.bindless) {
            assert_eq!(allocation.register_begin, 0);
            assert_eq!(allocation.register_end, GfxRootSignatureAllocation::UNBOUNDED_REGISTER_END);
            let sharing = builder
                .allocations()
                .filter(|(other, a)| *other != name && a.space == allocation.space)
                .count();
            assert_eq!(sharing, 0, "bindless `{}` shares its space", name);
        }
        assert_eq!(builder.bindless_spaces().len(), 2);
    }

    #[test]
    fn test_space_roles_follow_first_use() {
        let builder = mixed_builder();
        let space_of = |name: &str| builder.allocation(name).unwrap().space;

        // per_frame -> normal(0), bindless_textures -> 1, linear_sampler -> sampler(2), bindless_buffers -> 3
        assert_eq!(space_of("per_frame"), 0);
        assert_eq!(space_of("bindless_textures"), 1);
        assert_eq!(space_of("linear_sampler"), 2);
        assert_eq!(space_of("gbuffer"), 0);
        assert_eq!(space_of("bindless_buffers"), 3);
        assert_eq!(space_of("point_sampler"), 2);
        assert_eq!(builder.space_count(), 4);
    }

    #[test]
    fn test_register_counters_are_per_type() {
        let builder = mixed_builder();
        let registers = |name: &str| {
            let a = builder.allocation(name).unwrap();
            (a.register_begin, a.register_end)
        };

        assert_eq!(registers("per_frame"), (0, 1));
        assert_eq!(registers("gbuffer"), (0, 3));
        assert_eq!(registers("instances"), (3, 4));
        assert_eq!(registers("push"), (1, 2));
        assert_eq!(registers("output"), (0, 1));
        assert_eq!(registers("linear_sampler"), (0, 1));
        assert_eq!(registers("point_sampler"), (1, 2));
    }

    #[test]
    fn test_global_and_local_indices() {
        let builder = mixed_builder();
        let a = |name: &str| builder.allocation(name).unwrap().clone();

        let globals = ["per_frame", "bindless_textures", "gbuffer", "instances", "bindless_buffers", "push", "output"]
            .map(|name| a(name).global_parameter_index);
        assert_eq!(globals, [0, 1, 2, 3, 4, 5, 6].map(Some));
        assert_eq!(a("linear_sampler").global_parameter_index, None);

        assert_eq!(a("per_frame").local_space_index, 0);
        assert_eq!(a("gbuffer").local_space_index, 1);
        assert_eq!(a("output").local_space_index, 4);
        assert_eq!(a("bindless_textures").local_space_index, 0);
        assert_eq!(a("point_sampler").local_space_index, 1);
    }

    #[test]
    fn test_duplicate_name_returns_existing_allocation() {
        let mut builder = RootSignatureLayoutBuilder::new("dup");
        let info = RootParameterInfo::new("camera", RootParameterType::Cbv, 1);
        let first = builder.add_root_parameter_with_register_count(&info);
        let second = builder.add_root_parameter_with_register_count(&info);
        assert_eq!(first, second);
        assert_eq!(builder.allocations().count(), 1);
    }

    #[test]
    #[should_panic(expected = "unknown type")]
    fn test_unknown_range_type_panics() {
        let mut builder = RootSignatureLayoutBuilder::new("bad");
        builder.add_root_parameter_with_register_count(&RootParameterInfo::new(
            "broken",
            table(DescriptorRangeType::Unknown),
            1,
        ));
    }

    #[test]
    fn test_reflection_mapping() {
        let entry = |binding_type, count| GfxShaderReflectionEntry::new("x", binding_type, count);

        assert_eq!(
            RootParameterInfo::from_reflection(&entry(GfxReflectionBindingType::TextureSrv, 1)).parameter_type,
            table(DescriptorRangeType::Srv)
        );
        assert_eq!(
            RootParameterInfo::from_reflection(&entry(GfxReflectionBindingType::BufferSrv, 1)).parameter_type,
            RootParameterType::Srv
        );
        assert_eq!(
            RootParameterInfo::from_reflection(&entry(GfxReflectionBindingType::BufferUav, 0)).parameter_type,
            table(DescriptorRangeType::Uav)
        );
        assert_eq!(
            RootParameterInfo::from_reflection(&entry(GfxReflectionBindingType::AccelerationStructure, 1))
                .parameter_type,
            RootParameterType::Srv
        );
    }
}
