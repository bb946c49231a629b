//! Artifact assembly: reflection + metadata → material description.
//!
//! Policy:
//! - Material parameters are the members of the uniform block named by
//!   `material_block_name` (default `"Material"`). Every metadata `param`
//!   must resolve to a member of that block; the parameter's type always
//!   comes from reflection, and a declared default is rewritten to it.
//! - Without such a block the shader is still valid (fullscreen passes,
//!   compute, ray tracing) as long as no metadata params are declared.
//! - Textures are the sampled-image descriptors; every metadata `texture`
//!   must resolve to a reflected descriptor. The texture type stays
//!   `Unknown` at this level.
//! - Render state is copied from metadata verbatim.

use vshader_metadata::ParsedMetadata;
use vshader_types::{
    Error, MaterialDescription, MaterialParamDesc, MaterialTextureDesc, Result, Semantic,
    ShaderReflection, TextureType,
};

/// Builds and validates the material description for one artifact.
pub fn assemble_material(
    reflection: &ShaderReflection,
    meta: &ParsedMetadata,
) -> Result<MaterialDescription> {
    let mut out = MaterialDescription::default();

    match reflection.find_block(&out.material_block_name) {
        Some(block) => {
            out.material_param_size = block.size;
            out.params.reserve(block.members.len());

            for member in &block.members {
                let mut param = MaterialParamDesc {
                    name: member.name.clone(),
                    ty: member.ty,
                    offset: member.offset,
                    size: member.size,
                    semantic: Semantic::Unknown,
                    default: None,
                    range: None,
                };

                if let Some(meta_param) = meta.params.get(&member.name) {
                    param.semantic = meta_param.semantic;
                    if let Some(mut default) = meta_param.default {
                        default.ty = member.ty;
                        param.default = Some(default);
                    }
                    param.range = meta_param.range;
                }

                out.params.push(param);
            }

            for name in meta.params.keys() {
                if !block.members.iter().any(|m| &m.name == name) {
                    return Err(Error::parse(format!(
                        "metadata param '{name}' not found in {} block members",
                        out.material_block_name
                    )));
                }
            }
        }
        None => {
            if !meta.params.is_empty() {
                return Err(Error::parse(format!(
                    "shader declares metadata params but has no {} block",
                    out.material_block_name
                )));
            }
            out.material_param_size = 0;
        }
    }

    for desc in &reflection.descriptors {
        if !desc.kind.is_texture() {
            continue;
        }

        let semantic = meta
            .textures
            .get(&desc.name)
            .map_or(Semantic::Unknown, |t| t.semantic);

        out.textures.push(MaterialTextureDesc {
            name: desc.name.clone(),
            ty: TextureType::Unknown,
            set: desc.set,
            binding: desc.binding,
            count: desc.count,
            semantic,
        });
    }

    for name in meta.textures.keys() {
        if reflection.find_descriptor(name).is_none() {
            return Err(Error::parse(format!(
                "metadata texture '{name}' not found in reflected descriptors"
            )));
        }
    }

    out.render_state = meta.render_state;
    Ok(out)
}
