//! The `.vshbin` single-artifact container.
//!
//! ```text
//! 0..8    magic "VSHBIN\0\0"
//! 8..12   version u32            (current = 2)
//! 12..16  flags u32              (low 8 bits = stage; rest reserved = 0)
//! 16..24  contentHash u64
//! 24..32  spirvHash u64
//! ```
//!
//! followed by chunks of `tag u32 | size u32 | payload[size]`:
//!
//! - `SIDH` (optional): u64 shader id hash
//! - `VKEY` (optional): u64 variant hash
//! - `SPRV` (required): SPIR-V bytes, size % 4 == 0
//! - `REFL` (required): reflection table
//! - `MDES` (required): material description
//!
//! Unknown tags are skipped so newer writers stay readable.

use std::path::Path;

use vshader_types::{
    hash64_words, BlendFactor, BlendOp, BlockLayout, BlockMember, ColorMask, CompareOp, CullMode,
    DescriptorBinding, DescriptorKind, Error, MaterialDescription, MaterialParamDesc,
    MaterialTextureDesc, ParamDefault, ParamRange, ParamType, RenderState, Result, Semantic,
    ShaderBinary, ShaderReflection, ShaderStage, StageFlags, TextureType, PARAM_DEFAULT_BYTES,
};

use crate::codec::{write_file_atomic, ByteReader, ByteWriter, ChunkTag};

/// Magic bytes at offset 0.
pub const VSHBIN_MAGIC: [u8; 8] = *b"VSHBIN\0\0";
/// Current format version.
pub const VSHBIN_VERSION: u32 = 2;

const HEADER_SIZE: usize = 32;

const TAG_SIDH: ChunkTag = ChunkTag::new(b"SIDH");
const TAG_VKEY: ChunkTag = ChunkTag::new(b"VKEY");
const TAG_SPRV: ChunkTag = ChunkTag::new(b"SPRV");
const TAG_REFL: ChunkTag = ChunkTag::new(b"REFL");
const TAG_MDES: ChunkTag = ChunkTag::new(b"MDES");

// ------------------------------------------------------------
// REFL payload
// ------------------------------------------------------------

fn serialize_reflection(r: &ShaderReflection) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(256);

    w.u32(r.descriptors.len() as u32);
    for d in &r.descriptors {
        w.string(&d.name);
        w.u32(d.set);
        w.u32(d.binding);
        w.u32(d.count);
        w.u8(d.kind as u8);
        w.u32(d.stage_flags.bits());
        w.bool(d.runtime_sized);
    }

    w.u32(r.blocks.len() as u32);
    for b in &r.blocks {
        w.string(&b.name);
        w.u32(b.set);
        w.u32(b.binding);
        w.u32(b.size);
        w.bool(b.is_push_constant);
        w.u32(b.stage_flags.bits());

        w.u32(b.members.len() as u32);
        for m in &b.members {
            w.string(&m.name);
            w.u32(m.offset);
            w.u32(m.size);
        }
    }

    w.into_vec()
}

fn deserialize_reflection(payload: &[u8]) -> Result<ShaderReflection> {
    let mut r = ByteReader::new(payload);
    let mut out = ShaderReflection::default();

    let desc_count = r.u32("REFL descriptor count")?;
    for _ in 0..desc_count {
        let name = r.string("REFL descriptor name")?;
        let set = r.u32("REFL descriptor set")?;
        let binding = r.u32("REFL descriptor binding")?;
        let count = r.u32("REFL descriptor count")?;
        let kind_raw = r.u8("REFL descriptor kind")?;
        let kind = DescriptorKind::from_u8(kind_raw)
            .ok_or_else(|| Error::deserialize(format!("REFL: bad descriptor kind {kind_raw}")))?;
        let stage_flags = StageFlags::from_bits_retain(r.u32("REFL descriptor stage flags")?);
        let runtime_sized = r.bool("REFL descriptor runtime-sized flag")?;

        out.descriptors.push(DescriptorBinding {
            name,
            set,
            binding,
            count,
            kind,
            stage_flags,
            runtime_sized,
        });
    }

    let block_count = r.u32("REFL block count")?;
    for _ in 0..block_count {
        let name = r.string("REFL block name")?;
        let set = r.u32("REFL block set")?;
        let binding = r.u32("REFL block binding")?;
        let size = r.u32("REFL block size")?;
        let is_push_constant = r.bool("REFL block push-constant flag")?;
        let stage_flags = StageFlags::from_bits_retain(r.u32("REFL block stage flags")?);

        let member_count = r.u32("REFL member count")?;
        let mut members = Vec::with_capacity(member_count.min(1024) as usize);
        for _ in 0..member_count {
            let name = r.string("REFL member name")?;
            let offset = r.u32("REFL member offset")?;
            let size = r.u32("REFL member size")?;
            members.push(BlockMember {
                name,
                offset,
                size,
                ty: ParamType::Float,
            });
        }

        out.blocks.push(BlockLayout {
            name,
            set,
            binding,
            size,
            is_push_constant,
            stage_flags,
            members,
        });
    }

    r.finish("REFL")?;
    Ok(out)
}

// ------------------------------------------------------------
// MDES payload
// ------------------------------------------------------------

fn serialize_material(m: &MaterialDescription) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(256);

    w.string(&m.material_block_name);
    w.u32(m.material_param_size);

    let rs = &m.render_state;
    w.bool(rs.depth_test);
    w.bool(rs.depth_write);
    w.u8(rs.depth_func as u8);
    w.u8(rs.cull as u8);
    w.bool(rs.blend_enable);
    w.u8(rs.src_color as u8);
    w.u8(rs.dst_color as u8);
    w.u8(rs.color_op as u8);
    w.u8(rs.src_alpha as u8);
    w.u8(rs.dst_alpha as u8);
    w.u8(rs.alpha_op as u8);
    w.u8(rs.color_mask.bits());
    w.bool(rs.alpha_to_coverage);
    w.f32(rs.depth_bias_factor);
    w.f32(rs.depth_bias_units);

    w.u32(m.params.len() as u32);
    for p in &m.params {
        w.string(&p.name);
        w.u8(p.ty as u8);
        w.u32(p.offset);
        w.u32(p.size);
        w.u32(p.semantic as u32);

        w.bool(p.default.is_some());
        if let Some(def) = &p.default {
            w.u8(def.ty as u8);
            w.bytes(&def.bytes);
        }

        w.bool(p.range.is_some());
        if let Some(range) = &p.range {
            w.f64(range.min);
            w.f64(range.max);
        }
    }

    w.u32(m.textures.len() as u32);
    for t in &m.textures {
        w.string(&t.name);
        w.u8(t.ty as u8);
        w.u32(t.set);
        w.u32(t.binding);
        w.u32(t.count);
        w.u32(t.semantic as u32);
    }

    w.into_vec()
}

fn deserialize_material(payload: &[u8]) -> Result<MaterialDescription> {
    let mut r = ByteReader::new(payload);

    let material_block_name = r.string("MDES material block name")?;
    let material_param_size = r.u32("MDES material param size")?;

    let depth_test = r.bool("MDES depthTest")?;
    let depth_write = r.bool("MDES depthWrite")?;
    let depth_func = enum_u8(&mut r, "MDES depthFunc", CompareOp::from_u8)?;
    let cull = enum_u8(&mut r, "MDES cull", CullMode::from_u8)?;
    let blend_enable = r.bool("MDES blendEnable")?;
    let src_color = enum_u8(&mut r, "MDES srcColor", BlendFactor::from_u8)?;
    let dst_color = enum_u8(&mut r, "MDES dstColor", BlendFactor::from_u8)?;
    let color_op = enum_u8(&mut r, "MDES colorOp", BlendOp::from_u8)?;
    let src_alpha = enum_u8(&mut r, "MDES srcAlpha", BlendFactor::from_u8)?;
    let dst_alpha = enum_u8(&mut r, "MDES dstAlpha", BlendFactor::from_u8)?;
    let alpha_op = enum_u8(&mut r, "MDES alphaOp", BlendOp::from_u8)?;
    let color_mask_raw = r.u8("MDES colorMask")?;
    let color_mask = ColorMask::from_bits(color_mask_raw)
        .ok_or_else(|| Error::deserialize(format!("MDES: bad color mask {color_mask_raw:#x}")))?;
    let alpha_to_coverage = r.bool("MDES alphaToCoverage")?;
    let depth_bias_factor = r.f32("MDES depthBiasFactor")?;
    let depth_bias_units = r.f32("MDES depthBiasUnits")?;

    let render_state = RenderState {
        depth_test,
        depth_write,
        depth_func,
        cull,
        blend_enable,
        src_color,
        dst_color,
        color_op,
        src_alpha,
        dst_alpha,
        alpha_op,
        color_mask,
        alpha_to_coverage,
        depth_bias_factor,
        depth_bias_units,
    };

    let param_count = r.u32("MDES param count")?;
    let mut params = Vec::with_capacity(param_count.min(1024) as usize);
    for _ in 0..param_count {
        let name = r.string("MDES param name")?;
        let ty = enum_u8(&mut r, "MDES param type", ParamType::from_u8)?;
        let offset = r.u32("MDES param offset")?;
        let size = r.u32("MDES param size")?;
        let semantic_raw = r.u32("MDES param semantic")?;
        let semantic = Semantic::from_u32(semantic_raw)
            .ok_or_else(|| Error::deserialize(format!("MDES: bad semantic {semantic_raw}")))?;

        let default = if r.bool("MDES hasDefault")? {
            let def_ty = enum_u8(&mut r, "MDES default type", ParamType::from_u8)?;
            let bytes = r.take(PARAM_DEFAULT_BYTES, "MDES default values")?;
            let mut buf = [0u8; PARAM_DEFAULT_BYTES];
            buf.copy_from_slice(bytes);
            Some(ParamDefault { ty: def_ty, bytes: buf })
        } else {
            None
        };

        let range = if r.bool("MDES hasRange")? {
            let min = r.f64("MDES range min")?;
            let max = r.f64("MDES range max")?;
            Some(ParamRange { min, max })
        } else {
            None
        };

        params.push(MaterialParamDesc {
            name,
            ty,
            offset,
            size,
            semantic,
            default,
            range,
        });
    }

    let texture_count = r.u32("MDES texture count")?;
    let mut textures = Vec::with_capacity(texture_count.min(1024) as usize);
    for _ in 0..texture_count {
        let name = r.string("MDES texture name")?;
        let ty = enum_u8(&mut r, "MDES texture type", TextureType::from_u8)?;
        let set = r.u32("MDES texture set")?;
        let binding = r.u32("MDES texture binding")?;
        let count = r.u32("MDES texture count")?;
        let semantic_raw = r.u32("MDES texture semantic")?;
        let semantic = Semantic::from_u32(semantic_raw)
            .ok_or_else(|| Error::deserialize(format!("MDES: bad semantic {semantic_raw}")))?;

        textures.push(MaterialTextureDesc {
            name,
            ty,
            set,
            binding,
            count,
            semantic,
        });
    }

    r.finish("MDES")?;

    Ok(MaterialDescription {
        material_block_name,
        material_param_size,
        params,
        textures,
        render_state,
    })
}

fn enum_u8<T>(r: &mut ByteReader<'_>, what: &str, from: fn(u8) -> Option<T>) -> Result<T> {
    let raw = r.u8(what)?;
    from(raw).ok_or_else(|| Error::deserialize(format!("{what}: bad value {raw}")))
}

// ------------------------------------------------------------
// Container
// ------------------------------------------------------------

/// Serializes a shader binary into `.vshbin` bytes.
///
/// `SIDH` and `VKEY` chunks are emitted only when the corresponding hash is
/// non-zero, so a zero hash round-trips as zero.
pub fn write_vshbin(bin: &ShaderBinary) -> Result<Vec<u8>> {
    if bin.spirv.is_empty() {
        return Err(Error::serialize("cannot write .vshbin with empty SPIR-V"));
    }

    let mut w = ByteWriter::with_capacity(HEADER_SIZE + 64 + bin.spirv.len() * 4);

    w.bytes(&VSHBIN_MAGIC);
    w.u32(VSHBIN_VERSION);
    w.u32(u32::from(bin.stage as u8));
    w.u64(bin.content_hash);
    w.u64(bin.spirv_hash);
    debug_assert_eq!(w.len(), HEADER_SIZE);

    let chunk = |w: &mut ByteWriter, tag: ChunkTag, payload: &[u8]| {
        w.bytes(&tag.0);
        w.u32(payload.len() as u32);
        w.bytes(payload);
    };

    if bin.shader_id_hash != 0 {
        chunk(&mut w, TAG_SIDH, &bin.shader_id_hash.to_le_bytes());
    }
    if bin.variant_hash != 0 {
        chunk(&mut w, TAG_VKEY, &bin.variant_hash.to_le_bytes());
    }

    let mut sprv = Vec::with_capacity(bin.spirv.len() * 4);
    for word in &bin.spirv {
        sprv.extend_from_slice(&word.to_le_bytes());
    }
    chunk(&mut w, TAG_SPRV, &sprv);
    chunk(&mut w, TAG_REFL, &serialize_reflection(&bin.reflection));
    chunk(&mut w, TAG_MDES, &serialize_material(&bin.material_desc));

    Ok(w.into_vec())
}

/// Parses `.vshbin` bytes.
///
/// Unknown chunk tags are skipped. Fails on bad magic, unsupported version,
/// truncated chunks, missing required chunks, misaligned SPIR-V, or a
/// SPIR-V hash mismatch.
pub fn read_vshbin(bytes: &[u8]) -> Result<ShaderBinary> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::deserialize("file too small to be a valid .vshbin"));
    }

    let mut r = ByteReader::new(bytes);
    let magic = r.take(8, "magic")?;
    if magic != VSHBIN_MAGIC {
        return Err(Error::deserialize("invalid magic header (not a .vshbin)"));
    }

    let version = r.u32("version")?;
    if version < 1 || version > VSHBIN_VERSION {
        return Err(Error::deserialize(format!(
            "unsupported .vshbin version {version}"
        )));
    }

    let flags = r.u32("flags")?;
    let stage_raw = (flags & 0xFF) as u8;
    let stage = ShaderStage::from_u8(stage_raw)
        .ok_or_else(|| Error::deserialize(format!("bad stage {stage_raw} in header flags")))?;

    let content_hash = r.u64("contentHash")?;
    let spirv_hash = r.u64("spirvHash")?;

    let mut shader_id_hash = 0u64;
    let mut variant_hash = 0u64;
    let mut spirv: Option<Vec<u32>> = None;
    let mut reflection: Option<ShaderReflection> = None;
    let mut material_desc: Option<MaterialDescription> = None;

    while r.remaining() > 0 {
        let tag_bytes = r.take(4, "chunk tag")?;
        let tag = ChunkTag([tag_bytes[0], tag_bytes[1], tag_bytes[2], tag_bytes[3]]);
        let size = r.u32("chunk size")? as usize;
        if size > r.remaining() {
            return Err(Error::deserialize(format!(
                "chunk {tag} size {size} exceeds file bounds"
            )));
        }
        let payload = r.take(size, "chunk payload")?;

        match tag {
            TAG_SIDH => {
                let mut pr = ByteReader::new(payload);
                shader_id_hash = pr.u64("SIDH hash")?;
                pr.finish("SIDH")?;
            }
            TAG_VKEY => {
                let mut pr = ByteReader::new(payload);
                variant_hash = pr.u64("VKEY hash")?;
                pr.finish("VKEY")?;
            }
            TAG_SPRV => {
                if size % 4 != 0 {
                    return Err(Error::deserialize("SPRV chunk size not a multiple of 4"));
                }
                let words = payload
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                spirv = Some(words);
            }
            TAG_REFL => {
                reflection = Some(deserialize_reflection(payload)?);
            }
            TAG_MDES => {
                material_desc = Some(deserialize_material(payload)?);
            }
            _ => {
                // Unknown chunk; skip for forward compatibility.
            }
        }
    }

    let spirv = spirv.ok_or_else(|| Error::deserialize("missing SPRV chunk"))?;
    let reflection = reflection.ok_or_else(|| Error::deserialize("missing REFL chunk"))?;
    let material_desc = material_desc.ok_or_else(|| Error::deserialize("missing MDES chunk"))?;

    if spirv_hash != 0 {
        let computed = hash64_words(&spirv, 0);
        if computed != spirv_hash {
            return Err(Error::deserialize("SPIR-V hash mismatch"));
        }
    }

    Ok(ShaderBinary {
        content_hash,
        spirv_hash,
        shader_id_hash,
        variant_hash,
        stage,
        reflection,
        material_desc,
        spirv,
    })
}

/// Serializes and writes a `.vshbin` file atomically.
pub fn write_vshbin_file(path: &Path, bin: &ShaderBinary) -> Result<()> {
    let bytes = write_vshbin(bin)?;
    write_file_atomic(path, &bytes)
}

/// Reads and parses a `.vshbin` file.
pub fn read_vshbin_file(path: &Path) -> Result<ShaderBinary> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::io(format!("failed to read file {}: {e}", path.display())))?;
    read_vshbin(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn sample_binary() -> ShaderBinary {
        let spirv = vec![0x0723_0203u32, 0x0001_0500, 42, 7, 9];
        let reflection = ShaderReflection {
            descriptors: vec![
                DescriptorBinding {
                    name: "Material".into(),
                    set: 0,
                    binding: 0,
                    count: 1,
                    kind: DescriptorKind::UniformBuffer,
                    stage_flags: StageFlags::FRAG,
                    runtime_sized: false,
                },
                DescriptorBinding {
                    name: "albedoTex".into(),
                    set: 0,
                    binding: 1,
                    count: 0,
                    kind: DescriptorKind::CombinedImageSampler,
                    stage_flags: StageFlags::FRAG,
                    runtime_sized: true,
                },
            ],
            blocks: vec![BlockLayout {
                name: "Material".into(),
                set: 0,
                binding: 0,
                size: 32,
                is_push_constant: false,
                stage_flags: StageFlags::FRAG,
                members: vec![
                    BlockMember {
                        name: "baseColor".into(),
                        offset: 0,
                        size: 16,
                        ty: ParamType::Float,
                    },
                    BlockMember {
                        name: "metallic".into(),
                        offset: 16,
                        size: 4,
                        ty: ParamType::Float,
                    },
                ],
            }],
            has_local_size: false,
            local_size: [0; 3],
        };

        let material_desc = MaterialDescription {
            material_block_name: "Material".into(),
            material_param_size: 32,
            params: vec![MaterialParamDesc {
                name: "baseColor".into(),
                ty: ParamType::Vec4,
                offset: 0,
                size: 16,
                semantic: Semantic::BaseColor,
                default: Some(ParamDefault {
                    ty: ParamType::Vec4,
                    bytes: {
                        let mut b = [0u8; PARAM_DEFAULT_BYTES];
                        for i in 0..4 {
                            b[i * 4..i * 4 + 4].copy_from_slice(&1.0f32.to_le_bytes());
                        }
                        b
                    },
                }),
                range: Some(ParamRange { min: 0.0, max: 1.0 }),
            }],
            textures: vec![MaterialTextureDesc {
                name: "albedoTex".into(),
                ty: TextureType::Unknown,
                set: 0,
                binding: 1,
                count: 1,
                semantic: Semantic::BaseColor,
            }],
            render_state: RenderState {
                blend_enable: true,
                src_color: BlendFactor::SrcAlpha,
                dst_color: BlendFactor::OneMinusSrcAlpha,
                depth_bias_factor: 1.25,
                ..RenderState::default()
            },
        };

        ShaderBinary {
            content_hash: 0x1111_2222_3333_4444,
            spirv_hash: hash64_words(&spirv, 0),
            shader_id_hash: 0xaaaa_bbbb_cccc_dddd,
            variant_hash: 0x5555_6666_7777_8888,
            stage: ShaderStage::Frag,
            reflection,
            material_desc,
            spirv,
        }
    }

    #[test]
    fn round_trip_preserves_everything() {
        let bin = sample_binary();
        let bytes = write_vshbin(&bin).unwrap();
        let back = read_vshbin(&bytes).unwrap();
        assert_eq!(back, bin);
    }

    #[test]
    fn zero_hashes_round_trip_as_zero_and_omit_chunks() {
        let mut bin = sample_binary();
        bin.shader_id_hash = 0;
        bin.variant_hash = 0;

        let bytes = write_vshbin(&bin).unwrap();
        let with_chunks = write_vshbin(&sample_binary()).unwrap();
        assert_eq!(bytes.len(), with_chunks.len() - 2 * (8 + 8));

        let back = read_vshbin(&bytes).unwrap();
        assert_eq!(back.shader_id_hash, 0);
        assert_eq!(back.variant_hash, 0);
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let bin = sample_binary();
        let mut bytes = write_vshbin(&bin).unwrap();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(read_vshbin(&bad_magic).is_err());

        bytes[8] = 99; // version
        assert!(read_vshbin(&bytes).is_err());
    }

    #[test]
    fn rejects_truncated_chunk() {
        let bytes = write_vshbin(&sample_binary()).unwrap();
        assert!(read_vshbin(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn detects_spirv_tampering() {
        let bytes = write_vshbin(&sample_binary()).unwrap();

        // Locate the SPRV payload and flip one byte inside it.
        let pos = bytes
            .windows(4)
            .position(|w| w == b"SPRV")
            .expect("SPRV tag present");
        let mut tampered = bytes.clone();
        tampered[pos + 8] ^= 0x01;

        let err = read_vshbin(&tampered).unwrap_err();
        assert!(err.to_string().contains("hash mismatch"), "{err}");
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        let bin = sample_binary();
        let bytes = write_vshbin(&bin).unwrap();

        // Inject an unknown chunk right after the header.
        let mut patched = Vec::new();
        patched.extend_from_slice(&bytes[..HEADER_SIZE]);
        patched.extend_from_slice(b"XTRA");
        patched.extend_from_slice(&5u32.to_le_bytes());
        patched.extend_from_slice(b"hello");
        patched.extend_from_slice(&bytes[HEADER_SIZE..]);

        let back = read_vshbin(&patched).unwrap();
        assert_eq!(back, bin);
    }

    #[test]
    fn missing_required_chunk_fails() {
        let bin = sample_binary();
        let bytes = write_vshbin(&bin).unwrap();

        // Rewrite the MDES tag so the reader no longer recognizes it.
        let pos = bytes
            .windows(4)
            .position(|w| w == b"MDES")
            .expect("MDES tag present");
        let mut patched = bytes.clone();
        patched[pos..pos + 4].copy_from_slice(b"ZZZZ");

        let err = read_vshbin(&patched).unwrap_err();
        assert!(err.to_string().contains("MDES"), "{err}");
    }

    #[test]
    fn file_round_trip_is_atomic_and_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("pbr.frag.vshbin");

        let bin = sample_binary();
        write_vshbin_file(&path, &bin).unwrap();
        // No temp file left behind.
        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);

        let back = read_vshbin_file(&path).unwrap();
        assert_eq!(back, bin);

        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk, write_vshbin(&bin).unwrap());
    }
}
