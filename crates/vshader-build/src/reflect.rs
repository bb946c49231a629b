//! SPIR-V reflection via `naga`.
//!
//! The pipeline only needs the descriptor/block tables and the compute
//! workgroup size; `naga`'s SPIR-V frontend provides the module structure
//! and this module flattens it into [`ShaderReflection`].
//!
//! Combined-vs-separate sampled images are not distinguishable at this
//! level; sampled image bindings are reported as
//! [`DescriptorKind::CombinedImageSampler`], which downstream consumers
//! treat identically to separate sampled images.
//!
//! `naga` does not accept ray-tracing execution models. Those modules
//! still build and pack: a parse failure on a ray-tracing stage degrades
//! to an empty reflection instead of failing the build.

use vshader_types::{
    BlockLayout, BlockMember, DescriptorBinding, DescriptorKind, Error, ParamType, Result,
    ShaderReflection, ShaderStage,
};

fn map_param_type(inner: &naga::TypeInner) -> ParamType {
    use naga::{ScalarKind, TypeInner, VectorSize};

    match inner {
        TypeInner::Scalar(scalar) => match scalar.kind {
            ScalarKind::Sint => ParamType::Int,
            ScalarKind::Uint => ParamType::UInt,
            ScalarKind::Bool => ParamType::Bool,
            _ => ParamType::Float,
        },
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float => match size {
            VectorSize::Bi => ParamType::Vec2,
            VectorSize::Tri => ParamType::Vec3,
            VectorSize::Quad => ParamType::Vec4,
        },
        TypeInner::Matrix { columns, .. } => match columns {
            naga::VectorSize::Tri => ParamType::Mat3,
            naga::VectorSize::Quad => ParamType::Mat4,
            _ => ParamType::Float,
        },
        _ => ParamType::Float,
    }
}

/// Reflects a SPIR-V module into descriptor and block tables.
///
/// `stage` supplies the stage flags attached to each symbol; reflection is
/// run on single-stage modules only. Ray-tracing modules that the
/// reflector cannot parse yield an empty reflection rather than an error,
/// so their artifacts carry no descriptor tables but still round-trip.
pub fn reflect_spirv(spirv: &[u32], stage: ShaderStage) -> Result<ShaderReflection> {
    let mut bytes = Vec::with_capacity(spirv.len() * 4);
    for word in spirv {
        bytes.extend_from_slice(&word.to_le_bytes());
    }

    let module = match naga::front::spv::parse_u8_slice(
        &bytes,
        &naga::front::spv::Options::default(),
    ) {
        Ok(module) => module,
        Err(e) if stage.is_ray_tracing() => {
            tracing::debug!(
                stage = %stage,
                error = %e,
                "ray-tracing module not reflectable; emitting empty reflection"
            );
            return Ok(ShaderReflection::default());
        }
        Err(e) => {
            return Err(Error::reflect(format!("failed to parse SPIR-V module: {e}")));
        }
    };

    let gctx = module.to_ctx();
    let stage_flags = stage.flag();
    let mut out = ShaderReflection::default();

    for (_, var) in module.global_variables.iter() {
        let ty = &module.types[var.ty];
        let binding = var.binding.as_ref();

        match var.space {
            naga::AddressSpace::Uniform | naga::AddressSpace::Storage { .. } => {
                let is_storage = matches!(var.space, naga::AddressSpace::Storage { .. });
                let name = ty
                    .name
                    .clone()
                    .or_else(|| var.name.clone())
                    .unwrap_or_default();
                let (set, bind) = binding.map_or((0, 0), |b| (b.group, b.binding));

                out.descriptors.push(DescriptorBinding {
                    name: name.clone(),
                    set,
                    binding: bind,
                    count: 1,
                    kind: if is_storage {
                        DescriptorKind::StorageBuffer
                    } else {
                        DescriptorKind::UniformBuffer
                    },
                    stage_flags,
                    runtime_sized: false,
                });

                out.blocks.push(block_layout(
                    &module, gctx, name, set, bind, false, stage_flags, var.ty,
                ));
            }
            naga::AddressSpace::PushConstant => {
                let name = ty
                    .name
                    .clone()
                    .or_else(|| var.name.clone())
                    .unwrap_or_default();
                out.blocks.push(block_layout(
                    &module,
                    gctx,
                    name,
                    0,
                    0,
                    true,
                    stage_flags,
                    var.ty,
                ));
            }
            naga::AddressSpace::Handle => {
                let name = var.name.clone().unwrap_or_default();
                let (set, bind) = binding.map_or((0, 0), |b| (b.group, b.binding));

                let (inner, count, runtime_sized) = match &ty.inner {
                    naga::TypeInner::BindingArray { base, size } => {
                        let element = &module.types[*base].inner;
                        match size {
                            naga::ArraySize::Constant(n) => (element, n.get(), false),
                            _ => (element, 0, true),
                        }
                    }
                    other => (other, 1, false),
                };

                let kind = match inner {
                    naga::TypeInner::Image { class, .. } => match class {
                        naga::ImageClass::Storage { .. } => DescriptorKind::StorageImage,
                        _ => DescriptorKind::CombinedImageSampler,
                    },
                    naga::TypeInner::Sampler { .. } => DescriptorKind::Sampler,
                    naga::TypeInner::AccelerationStructure { .. } => {
                        DescriptorKind::AccelerationStructure
                    }
                    _ => DescriptorKind::Unknown,
                };

                out.descriptors.push(DescriptorBinding {
                    name,
                    set,
                    binding: bind,
                    count,
                    kind,
                    stage_flags,
                    runtime_sized,
                });
            }
            _ => {}
        }
    }

    if stage == ShaderStage::Comp {
        if let Some(ep) = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == naga::ShaderStage::Compute)
        {
            out.has_local_size = true;
            out.local_size = ep.workgroup_size;
        }
    }

    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn block_layout(
    module: &naga::Module,
    gctx: naga::proc::GlobalCtx<'_>,
    name: String,
    set: u32,
    binding: u32,
    is_push_constant: bool,
    stage_flags: vshader_types::StageFlags,
    ty: naga::Handle<naga::Type>,
) -> BlockLayout {
    let inner = &module.types[ty].inner;
    let size = inner.size(gctx);

    let mut members = Vec::new();
    if let naga::TypeInner::Struct {
        members: struct_members,
        ..
    } = inner
    {
        for member in struct_members {
            let member_inner = &module.types[member.ty].inner;
            members.push(BlockMember {
                name: member.name.clone().unwrap_or_default(),
                offset: member.offset,
                size: member_inner.size(gctx),
                ty: map_param_type(member_inner),
            });
        }
    }

    BlockLayout {
        name,
        set,
        binding,
        size,
        is_push_constant,
        stage_flags,
        members,
    }
}
