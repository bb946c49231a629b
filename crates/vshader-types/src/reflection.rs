use crate::material::ParamType;
use crate::stage::StageFlags;

/// Kind of a reflected descriptor binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DescriptorKind {
    UniformBuffer = 0,
    StorageBuffer = 1,
    SampledImage = 2,
    StorageImage = 3,
    Sampler = 4,
    CombinedImageSampler = 5,
    AccelerationStructure = 6,
    Unknown = 7,
}

impl DescriptorKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        use DescriptorKind::*;
        [
            UniformBuffer,
            StorageBuffer,
            SampledImage,
            StorageImage,
            Sampler,
            CombinedImageSampler,
            AccelerationStructure,
            Unknown,
        ]
        .into_iter()
        .find(|k| *k as u8 == v)
    }

    /// True for descriptor kinds the material assembler treats as textures.
    pub fn is_texture(self) -> bool {
        matches!(self, Self::CombinedImageSampler | Self::SampledImage)
    }
}

/// One reflected descriptor binding.
///
/// `count == 0` if and only if the binding is a runtime-sized array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorBinding {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub count: u32,
    pub kind: DescriptorKind,
    pub stage_flags: StageFlags,
    pub runtime_sized: bool,
}

/// One member of a reflected uniform/storage block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMember {
    pub name: String,
    pub offset: u32,
    pub size: u32,
    pub ty: ParamType,
}

/// A reflected uniform, storage, or push-constant block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub name: String,
    pub set: u32,
    pub binding: u32,
    pub size: u32,
    pub is_push_constant: bool,
    pub stage_flags: StageFlags,
    pub members: Vec<BlockMember>,
}

/// The descriptor/block table extracted from a SPIR-V module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderReflection {
    pub descriptors: Vec<DescriptorBinding>,
    pub blocks: Vec<BlockLayout>,

    pub has_local_size: bool,
    pub local_size: [u32; 3],
}

impl ShaderReflection {
    /// Finds a non-push-constant block by name.
    pub fn find_block(&self, name: &str) -> Option<&BlockLayout> {
        self.blocks
            .iter()
            .find(|b| !b.is_push_constant && b.name == name)
    }

    /// Finds a descriptor binding by name.
    pub fn find_descriptor(&self, name: &str) -> Option<&DescriptorBinding> {
        self.descriptors.iter().find(|d| d.name == name)
    }
}
