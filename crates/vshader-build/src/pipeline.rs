//! Hash derivation, cache, and the single-shader build path.
//!
//! Four hashes with distinct roles:
//!
//! - **source hash** — `hash64(sourceText)`; stored as the artifact's
//!   `contentHash` and used as a fallback variant identity.
//! - **build hash** — the cache key; chains source text, virtual path,
//!   stage, normalized defines, include dirs, and a stable metadata
//!   serialization. Define order does not affect it.
//! - **SPIR-V hash** — `hash64` over the word stream; written into the
//!   artifact and re-verified on read.
//! - **variant hash** — identity of `(shader id, stage, permutation
//!   assignment)`; 0 when no permutation keywords are declared. Shares
//!   its serialized layout with the runtime [`VariantKey`].

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use vshader_container::{read_vshbin_file, write_vshbin_file, VariantKey};
use vshader_metadata::{
    parse_keyword_value, parse_metadata, EngineKeywordsFile, KeywordDispatch, KeywordScope,
    ParsedMetadata,
};
use vshader_types::{hash64, hash64_str, hash64_words, Result, ShaderBinary, ShaderStage};

use crate::assemble::assemble_material;
use crate::frontend::compile_glsl_to_spirv;
use crate::options::{CompileOptions, Define, SourceInput};
use crate::reflect::reflect_spirv;
use crate::shader_id::{shader_id_from_virtual_path, shader_id_hash};

/// Default on-disk cache directory.
pub const DEFAULT_CACHE_DIR: &str = ".vshader_cache";

/// A single-shader build request.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub source: SourceInput,
    pub options: CompileOptions,

    /// Engine-wide keyword settings, consulted for Global-scope
    /// permutation keywords when computing the variant hash.
    pub engine_keywords: Option<EngineKeywordsFile>,

    pub enable_cache: bool,
    pub cache_dir: PathBuf,
}

impl BuildRequest {
    pub fn new(source: SourceInput, options: CompileOptions) -> Self {
        Self {
            source,
            options,
            engine_keywords: None,
            enable_cache: true,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

/// The outcome of a single-shader build.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub binary: ShaderBinary,
    pub log: String,
    pub from_cache: bool,
}

/// Joins defines into a canonical newline-separated list, lex-sorted so
/// that `-D` order cannot perturb the build hash.
fn normalize_define_list(defines: &[Define]) -> String {
    let mut lines: Vec<String> = defines.iter().map(Define::canonical).collect();
    lines.sort();
    let mut out = String::new();
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Stable textual serialization of the metadata fields that shape the
/// compiled artifact. Keyword declarations are deliberately excluded: they
/// only affect the variant hash (beyond the defines they induce).
fn metadata_hash_text(meta: &ParsedMetadata) -> String {
    let mut m = String::with_capacity(256);
    let rs = &meta.render_state;

    let _ = write!(
        m,
        "material={}\n\
         depthTest={}\ndepthWrite={}\ndepthFunc={}\ncull={}\n\
         blendEnable={}\nsrcColor={}\ndstColor={}\ncolorOp={}\n\
         srcAlpha={}\ndstAlpha={}\nalphaOp={}\ncolorMask={}\n\
         alphaToCoverage={}\ndepthBiasFactor={}\ndepthBiasUnits={}\n",
        u8::from(meta.has_material_decl),
        u8::from(rs.depth_test),
        u8::from(rs.depth_write),
        rs.depth_func as u8,
        rs.cull as u8,
        u8::from(rs.blend_enable),
        rs.src_color as u8,
        rs.dst_color as u8,
        rs.color_op as u8,
        rs.src_alpha as u8,
        rs.dst_alpha as u8,
        rs.alpha_op as u8,
        rs.color_mask.bits(),
        u8::from(rs.alpha_to_coverage),
        rs.depth_bias_factor,
        rs.depth_bias_units,
    );

    // BTreeMap iteration is already lexicographic.
    for (name, pm) in &meta.params {
        let _ = write!(m, "p:{name}:sem={}\n", pm.semantic as u32);
        if let Some(def) = &pm.default {
            let _ = write!(m, "p:{name}:def=");
            for b in def.bytes {
                let _ = write!(m, "{b},");
            }
            m.push('\n');
        }
        if let Some(range) = &pm.range {
            let _ = write!(m, "p:{name}:range={},{}\n", range.min, range.max);
        }
    }
    for (name, tm) in &meta.textures {
        let _ = write!(m, "t:{name}:sem={}\n", tm.semantic as u32);
    }

    m
}

/// Computes the cache key for `(source, options, metadata)`.
pub fn compute_build_hash(
    source: &SourceInput,
    options: &CompileOptions,
    meta: &ParsedMetadata,
) -> u64 {
    let mut h = 0u64;
    h = hash64(source.source_text.as_bytes(), h);
    h = hash64(source.virtual_path.as_bytes(), h);
    h = hash64(&[options.stage as u8], h);
    h = hash64(normalize_define_list(&options.defines).as_bytes(), h);
    for dir in &options.include_dirs {
        h = hash64(dir.to_string_lossy().as_bytes(), h);
    }
    h = hash64(metadata_hash_text(meta).as_bytes(), h);
    h
}

/// Computes the variant hash for one permutation assignment.
///
/// Only Permutation-dispatch keywords contribute. Per keyword, the value
/// resolution order is: explicit define, engine-keywords setting (for
/// Global scope only), declaration default. Returns 0 when the shader
/// declares no permutation keywords.
pub fn compute_variant_hash(
    meta: &ParsedMetadata,
    options: &CompileOptions,
    engine_keywords: Option<&EngineKeywordsFile>,
    shader_identity_hash: u64,
    stage: ShaderStage,
) -> Result<u64> {
    let defines: BTreeMap<&str, &Define> = options
        .defines
        .iter()
        .map(|d| (d.name.as_str(), d))
        .collect();

    let mut key = VariantKey::new();
    key.set_shader_id_hash(shader_identity_hash);
    key.set_stage(stage);

    let mut any = false;
    for decl in meta.keywords.iter() {
        if decl.dispatch != KeywordDispatch::Permutation {
            continue;
        }

        let mut value = decl.default_value;
        if let Some(define) = defines.get(decl.name.as_str()) {
            value = parse_keyword_value(decl, define.raw_value())?;
        } else if decl.scope == KeywordScope::Global {
            if let Some(raw) = engine_keywords.and_then(|kw| kw.values.get(&decl.name)) {
                value = parse_keyword_value(decl, raw)?;
            }
        }

        key.set_hashed(hash64_str(&decl.name), value);
        any = true;
    }

    if !any {
        return Ok(0);
    }
    Ok(key.build())
}

fn cache_path(cache_dir: &Path, build_hash: u64) -> PathBuf {
    cache_dir.join(format!("{build_hash:016x}.vshbin"))
}

/// Compiles, reflects, and assembles one shader, read-through against the
/// on-disk cache.
pub fn build_shader(req: &BuildRequest) -> Result<BuildResult> {
    // Metadata parses first so it contributes to the cache key even when
    // compilation would fail later.
    let meta = parse_metadata(&req.source.source_text)
        .map_err(|e| e.with_context(&req.source.virtual_path))?;

    let build_hash = compute_build_hash(&req.source, &req.options, &meta);
    let source_hash = hash64_str(&req.source.source_text);

    if req.enable_cache {
        let path = cache_path(&req.cache_dir, build_hash);
        if let Ok(binary) = read_vshbin_file(&path) {
            tracing::debug!(path = %path.display(), "cache hit");
            return Ok(BuildResult {
                binary,
                log: format!("cache hit: {}", path.display()),
                from_cache: true,
            });
        }
    }

    let compiled = compile_glsl_to_spirv(&req.source, &req.options)?;
    let reflection = reflect_spirv(&compiled.spirv, req.options.stage)?;

    let id = shader_id_from_virtual_path(&req.source.virtual_path);
    let id_hash = if id.is_empty() {
        0
    } else {
        shader_id_hash(&id)
    };
    let identity = if id_hash != 0 { id_hash } else { source_hash };

    let variant_hash = compute_variant_hash(
        &meta,
        &req.options,
        req.engine_keywords.as_ref(),
        identity,
        req.options.stage,
    )
    .map_err(|e| e.with_context(&req.source.virtual_path))?;

    let material_desc =
        assemble_material(&reflection, &meta).map_err(|e| e.with_context(&req.source.virtual_path))?;

    let binary = ShaderBinary {
        content_hash: source_hash,
        spirv_hash: hash64_words(&compiled.spirv, 0),
        shader_id_hash: id_hash,
        variant_hash,
        stage: req.options.stage,
        reflection,
        material_desc,
        spirv: compiled.spirv,
    };

    if req.enable_cache {
        let path = cache_path(&req.cache_dir, build_hash);
        if let Err(e) = write_vshbin_file(&path, &binary) {
            tracing::warn!(path = %path.display(), error = %e, "failed to store cache entry");
        }
    }

    Ok(BuildResult {
        binary,
        log: compiled.info_log,
        from_cache: false,
    })
}

/// Assembles a `ShaderBinary` from raw SPIR-V, with reflection and an
/// empty-metadata material description. Both content and SPIR-V hashes
/// cover the word stream since there is no source.
pub fn build_from_spirv(spirv: &[u32], stage: ShaderStage) -> Result<ShaderBinary> {
    let reflection = reflect_spirv(spirv, stage)?;
    let meta = ParsedMetadata::default();
    let material_desc = assemble_material(&reflection, &meta)?;

    let words_hash = hash64_words(spirv, 0);
    Ok(ShaderBinary {
        content_hash: words_hash,
        spirv_hash: words_hash,
        shader_id_hash: 0,
        variant_hash: 0,
        stage,
        reflection,
        material_desc,
        spirv: spirv.to_vec(),
    })
}
