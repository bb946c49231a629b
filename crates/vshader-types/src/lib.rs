//! Shared vocabulary of the vshader pipeline.
//!
//! Every other crate in the workspace produces or consumes the records
//! defined here: shader stages, render state, reflection tables, material
//! descriptions and the in-memory `.vshbin` payload. The crate also hosts
//! the 64-bit content-hashing primitive used pervasively for identity.

#![forbid(unsafe_code)]

mod binary;
mod error;
mod hash;
mod material;
mod reflection;
mod render_state;
mod stage;

pub use crate::binary::ShaderBinary;
pub use crate::error::{Error, ErrorCode, Result};
pub use crate::hash::{hash64, hash64_str, hash64_words};
pub use crate::material::{
    MaterialDescription, MaterialParamDesc, MaterialTextureDesc, ParamDefault, ParamRange,
    ParamType, Semantic, TextureType, PARAM_DEFAULT_BYTES,
};
pub use crate::reflection::{
    BlockLayout, BlockMember, DescriptorBinding, DescriptorKind, ShaderReflection,
};
pub use crate::render_state::{BlendFactor, BlendOp, ColorMask, CompareOp, CullMode, RenderState};
pub use crate::stage::{ShaderStage, StageFlags};
