//! Library building: variant expansion over a shader tree, and packing of
//! precompiled artifacts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use vshader_container::{read_vshbin_file, write_vshbin, write_vslib, ShaderLibraryEntry};
use vshader_metadata::{eval_only_if, parse_metadata, EngineKeywordsFile, KeywordDecl};
use vshader_types::{Error, Result};

use crate::manifest::{BuildManifest, ManifestEntry};
use crate::options::{CompileOptions, SourceInput};
use crate::pipeline::{build_shader, BuildRequest, DEFAULT_CACHE_DIR};
use crate::variants::{enumerate_variants, infer_stage_from_path, resolve_keyword_values};

/// Inputs for one library build.
#[derive(Debug, Clone)]
pub struct LibraryBuildRequest {
    /// Root directory for scanning and for deriving virtual paths.
    pub shader_root: PathBuf,
    /// Explicit shader list (relative to `shader_root` unless absolute);
    /// empty means "scan `shader_root` recursively".
    pub shaders: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,

    pub engine_keywords: Option<EngineKeywordsFile>,
    /// Raw `.vkw` bytes to embed into the output library.
    pub engine_keywords_bytes: Vec<u8>,

    pub out_path: PathBuf,
    pub enable_cache: bool,
    pub cache_dir: PathBuf,
    /// Discard `only_if`-violating variants instead of failing.
    pub skip_invalid: bool,
    /// Optional JSON manifest output.
    pub manifest_path: Option<PathBuf>,
}

impl LibraryBuildRequest {
    pub fn new(shader_root: impl Into<PathBuf>, out_path: impl Into<PathBuf>) -> Self {
        Self {
            shader_root: shader_root.into(),
            shaders: Vec::new(),
            include_dirs: Vec::new(),
            engine_keywords: None,
            engine_keywords_bytes: Vec::new(),
            out_path: out_path.into(),
            enable_cache: true,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            skip_invalid: false,
            manifest_path: None,
        }
    }
}

/// Accounting for one library build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryBuildReport {
    /// Entries written to the library.
    pub entries: usize,
    /// Variants enumerated across all sources, pre-pruning.
    pub variants: usize,
    /// Variants discarded by `only_if` constraints.
    pub pruned: usize,
    /// Variants skipped because their `(keyHash, stage)` already existed.
    pub duplicates: usize,
}

/// Recursively finds `*.vshader` sources under `root`, sorted for
/// deterministic build order.
pub fn scan_shader_root(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "vshader"))
        .collect();
    files.sort();
    files
}

fn virtual_path_for(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

/// Everything a library build produces before anything is written out.
#[derive(Debug, Clone)]
pub struct LibraryBuildOutput {
    pub entries: Vec<ShaderLibraryEntry>,
    pub manifest: BuildManifest,
    pub report: LibraryBuildReport,
}

/// Builds a `.vshlib` by expanding every permutation variant of every
/// source under the shader root.
///
/// The first fatal error stops the whole build; pruned and duplicate
/// counts accumulated so far are reported via logs regardless.
pub fn build_library(req: &LibraryBuildRequest) -> Result<LibraryBuildReport> {
    let output = collect_library_entries(req)?;
    write_library_output(req, &output)?;
    Ok(output.report)
}

/// Writes the library (and the optional manifest) produced by
/// [`collect_library_entries`].
pub fn write_library_output(req: &LibraryBuildRequest, output: &LibraryBuildOutput) -> Result<()> {
    tracing::info!(
        entries = output.report.entries,
        variants = output.report.variants,
        pruned = output.report.pruned,
        duplicates = output.report.duplicates,
        "writing {}",
        req.out_path.display()
    );

    let keywords = (!req.engine_keywords_bytes.is_empty()).then_some(&req.engine_keywords_bytes[..]);
    write_vslib(&req.out_path, &output.entries, keywords)?;

    if let Some(manifest_path) = &req.manifest_path {
        output.manifest.save(manifest_path)?;
    }

    Ok(())
}

/// Expands and compiles every variant, without writing the library.
pub fn collect_library_entries(req: &LibraryBuildRequest) -> Result<LibraryBuildOutput> {
    let shader_root = req.shader_root.as_path();

    // Implicit include search: the root itself, plus root/include if present.
    let mut include_dirs = req.include_dirs.clone();
    include_dirs.push(shader_root.to_path_buf());
    let implicit_include = shader_root.join("include");
    if implicit_include.is_dir() {
        include_dirs.push(implicit_include);
    }

    let shader_files: Vec<PathBuf> = if req.shaders.is_empty() {
        scan_shader_root(shader_root)
    } else {
        let mut files: Vec<PathBuf> = req
            .shaders
            .iter()
            .map(|p| {
                if p.is_absolute() {
                    p.clone()
                } else {
                    shader_root.join(p)
                }
            })
            .collect();
        files.sort();
        files
    };

    if shader_files.is_empty() {
        return Err(Error::io(format!(
            "no shaders found under: {}",
            shader_root.display()
        )));
    }

    tracing::info!(count = shader_files.len(), "building shader library");

    let mut report = LibraryBuildReport::default();
    let mut entries: Vec<ShaderLibraryEntry> = Vec::new();
    let mut manifest = BuildManifest::default();
    let mut seen: HashSet<(u64, u8)> = HashSet::new();

    for (index, path) in shader_files.iter().enumerate() {
        let virtual_path = virtual_path_for(path, shader_root);

        let stage = infer_stage_from_path(path).ok_or_else(|| {
            Error::invalid_argument(format!(
                "cannot infer stage from file name: {}",
                path.display()
            ))
        })?;

        tracing::info!(
            "[{}/{}] {virtual_path}",
            index + 1,
            shader_files.len()
        );

        let source_text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read shader {}: {e}", path.display())))?;

        let meta = parse_metadata(&source_text).map_err(|e| e.with_context(&virtual_path))?;

        let permute_decls: Vec<&KeywordDecl> = meta.permutation_keywords().collect();
        let variants = enumerate_variants(&permute_decls);
        report.variants += variants.len();

        tracing::debug!(variants = variants.len(), "{virtual_path}");

        for (variant_index, defines) in variants.iter().enumerate() {
            let ctx =
                resolve_keyword_values(&meta.keywords, defines, req.engine_keywords.as_ref())
                    .map_err(|e| e.with_context(&virtual_path))?;

            let mut violated = None;
            for decl in meta.keywords.iter().filter(|d| !d.constraint.is_empty()) {
                let satisfied = eval_only_if(&decl.constraint, &ctx)
                    .map_err(|e| e.with_context(&virtual_path))?;
                if !satisfied {
                    violated = Some(decl.name.clone());
                    break;
                }
            }

            if let Some(keyword) = violated {
                report.pruned += 1;
                if !req.skip_invalid {
                    return Err(Error::parse(format!(
                        "variant violates only_if constraint: {virtual_path} ({keyword})"
                    )));
                }
                tracing::debug!(
                    variant = variant_index + 1,
                    keyword = %keyword,
                    "{virtual_path}: pruned"
                );
                continue;
            }

            let mut options = CompileOptions::new(stage);
            options.defines = defines.clone();
            options.include_dirs = include_dirs.clone();

            let mut build = BuildRequest::new(
                SourceInput {
                    virtual_path: virtual_path.clone(),
                    source_text: source_text.clone(),
                },
                options,
            );
            build.engine_keywords = req.engine_keywords.clone();
            build.enable_cache = req.enable_cache;
            build.cache_dir = req.cache_dir.clone();

            let built = build_shader(&build)?;
            let bin = built.binary;

            let key_hash = bin.key_hash();
            if !seen.insert((key_hash, stage as u8)) {
                report.duplicates += 1;
                tracing::debug!(
                    variant = variant_index + 1,
                    key_hash,
                    "{virtual_path}: duplicate entry skipped"
                );
                continue;
            }

            tracing::debug!(
                variant = variant_index + 1,
                total = variants.len(),
                key_hash,
                variant_hash = bin.variant_hash,
                from_cache = built.from_cache,
                "{virtual_path}: built"
            );

            let blob = write_vshbin(&bin).map_err(|e| e.with_context(&virtual_path))?;
            entries.push(ShaderLibraryEntry {
                key_hash,
                stage,
                blob,
            });
            manifest.entries.push(ManifestEntry {
                virtual_path: virtual_path.clone(),
                stage: stage.token().to_string(),
                key_hash,
                content_hash: bin.content_hash,
                variant_hash: bin.variant_hash,
                shader_id_hash: bin.shader_id_hash,
            });
        }
    }

    report.entries = entries.len();
    manifest.sort();

    Ok(LibraryBuildOutput {
        entries,
        manifest,
        report,
    })
}

/// Packs precompiled `.vshbin` files into a `.vshlib`.
///
/// Unlike [`build_library`], a duplicate `(keyHash, stage)` among explicit
/// inputs is a hard `InvalidArgument` error. Returns the entry count.
pub fn pack_library(
    inputs: &[PathBuf],
    out_path: &Path,
    engine_keywords_bytes: Option<&[u8]>,
) -> Result<usize> {
    let entries = collect_pack_entries(inputs)?;
    let count = entries.len();
    write_vslib(out_path, &entries, engine_keywords_bytes)?;
    Ok(count)
}

/// Reads and keys the `.vshbin` inputs for a pack, without writing.
pub fn collect_pack_entries(inputs: &[PathBuf]) -> Result<Vec<ShaderLibraryEntry>> {
    if inputs.is_empty() {
        return Err(Error::invalid_argument(
            "packlib requires at least one input .vshbin",
        ));
    }

    let mut entries = Vec::with_capacity(inputs.len());
    let mut seen: HashSet<(u64, u8)> = HashSet::new();

    for path in inputs {
        let bin = read_vshbin_file(path).map_err(|e| e.with_context(path.display()))?;

        let key_hash = bin.key_hash();
        if !seen.insert((key_hash, bin.stage as u8)) {
            return Err(Error::invalid_argument(format!(
                "duplicate entry for keyHash={key_hash:#018x} stage={} input={}",
                bin.stage,
                path.display()
            )));
        }

        let blob = std::fs::read(path)
            .map_err(|e| Error::io(format!("failed to read {}: {e}", path.display())))?;

        tracing::debug!(
            key_hash,
            stage = %bin.stage,
            "{}: packed",
            path.display()
        );

        entries.push(ShaderLibraryEntry {
            key_hash,
            stage: bin.stage,
            blob,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vshader_container::{read_vslib, write_vshbin_file};
    use vshader_types::ShaderStage;

    fn minimal_binary(variant_hash: u64, stage: ShaderStage) -> vshader_types::ShaderBinary {
        let spirv = vec![0x0723_0203u32, variant_hash as u32 + 1];
        vshader_types::ShaderBinary {
            content_hash: 0x100 + variant_hash,
            spirv_hash: vshader_types::hash64_words(&spirv, 0),
            shader_id_hash: 0,
            variant_hash,
            stage,
            reflection: Default::default(),
            material_desc: Default::default(),
            spirv,
        }
    }

    #[test]
    fn scan_finds_only_vshader_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("fx")).unwrap();
        std::fs::write(root.join("fx/blur.frag.vshader"), "").unwrap();
        std::fs::write(root.join("pbr.frag.vshader"), "").unwrap();
        std::fs::write(root.join("readme.md"), "").unwrap();

        let files = scan_shader_root(root);
        assert_eq!(
            files,
            vec![root.join("fx/blur.frag.vshader"), root.join("pbr.frag.vshader")]
        );
    }

    #[test]
    fn packlib_round_trips_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.vshbin");
        let b = dir.path().join("b.vshbin");
        write_vshbin_file(&a, &minimal_binary(0xaa, ShaderStage::Frag)).unwrap();
        write_vshbin_file(&b, &minimal_binary(0xbb, ShaderStage::Vert)).unwrap();

        let out = dir.path().join("out.vshlib");
        let count = pack_library(&[a.clone(), b.clone()], &out, None).unwrap();
        assert_eq!(count, 2);

        let lib = read_vslib(&out).unwrap();
        assert_eq!(lib.entries.len(), 2);
        assert_eq!(lib.entries[0].key_hash, 0xaa);
        assert_eq!(lib.entries[1].key_hash, 0xbb);

        let blob =
            vshader_container::extract_vslib_blob(&lib, 0xaa, ShaderStage::Frag).unwrap();
        assert_eq!(blob, std::fs::read(&a).unwrap());
    }

    #[test]
    fn packlib_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.vshbin");
        let b = dir.path().join("b.vshbin");
        // Same variant hash and stage: a source conflict.
        write_vshbin_file(&a, &minimal_binary(0xcc, ShaderStage::Frag)).unwrap();
        write_vshbin_file(&b, &minimal_binary(0xcc, ShaderStage::Frag)).unwrap();

        let out = dir.path().join("out.vshlib");
        let err = pack_library(&[a, b], &out, None).unwrap_err();
        assert_eq!(err.code(), vshader_types::ErrorCode::InvalidArgument);
    }

    #[test]
    fn packlib_without_inputs_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let err = pack_library(&[], &dir.path().join("o.vshlib"), None).unwrap_err();
        assert_eq!(err.code(), vshader_types::ErrorCode::InvalidArgument);
    }

    #[test]
    fn key_hash_falls_back_to_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.vshbin");
        write_vshbin_file(&a, &minimal_binary(0, ShaderStage::Comp)).unwrap();

        let out = dir.path().join("out.vshlib");
        pack_library(&[a], &out, None).unwrap();

        let lib = read_vslib(&out).unwrap();
        assert_eq!(lib.entries[0].key_hash, 0x100);
    }
}
