//! GLSL → SPIR-V frontend glue.
//!
//! The heavy lifting belongs to `shaderc`; this module maps our options
//! onto its API, resolves `#include` directives against the source's own
//! directory plus the configured include paths, and records every resolved
//! include as a dependency.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Once;

use vshader_types::{Error, Result, ShaderStage};

use crate::options::{CompileOptions, CompileOutput, SourceInput};

/// One-shot process-wide latch for frontend setup.
///
/// `shaderc` keeps its state per compiler instance, so there is nothing to
/// tear down; the latch exists to make initialization observable exactly
/// once and to keep re-initialization a race-safe no-op.
static FRONTEND_INIT: Once = Once::new();

fn ensure_frontend_initialized() {
    FRONTEND_INIT.call_once(|| {
        tracing::debug!("shaderc frontend ready (target Vulkan 1.2, SPIR-V 1.5 default)");
    });
}

fn shader_kind(stage: ShaderStage) -> shaderc::ShaderKind {
    match stage {
        ShaderStage::Vert => shaderc::ShaderKind::Vertex,
        ShaderStage::Frag => shaderc::ShaderKind::Fragment,
        ShaderStage::Comp => shaderc::ShaderKind::Compute,
        ShaderStage::Task => shaderc::ShaderKind::Task,
        ShaderStage::Mesh => shaderc::ShaderKind::Mesh,
        ShaderStage::Rgen => shaderc::ShaderKind::RayGeneration,
        ShaderStage::Rmiss => shaderc::ShaderKind::Miss,
        ShaderStage::Rchit => shaderc::ShaderKind::ClosestHit,
        ShaderStage::Rahit => shaderc::ShaderKind::AnyHit,
        ShaderStage::Rint => shaderc::ShaderKind::Intersection,
        ShaderStage::Unknown => shaderc::ShaderKind::InferFromSource,
    }
}

fn spirv_version(encoded: u32) -> Result<shaderc::SpirvVersion> {
    Ok(match encoded {
        0 | 15 => shaderc::SpirvVersion::V1_5,
        10 => shaderc::SpirvVersion::V1_0,
        11 => shaderc::SpirvVersion::V1_1,
        12 => shaderc::SpirvVersion::V1_2,
        13 => shaderc::SpirvVersion::V1_3,
        14 => shaderc::SpirvVersion::V1_4,
        16 => shaderc::SpirvVersion::V1_6,
        other => {
            return Err(Error::invalid_argument(format!(
                "unsupported SPIR-V version {other} (expected major*10+minor, e.g. 15)"
            )))
        }
    })
}

/// Resolves an include request.
///
/// Order: absolute path as-is, then the includer's directory, then the
/// root source's directory, then the configured include directories.
fn resolve_include(
    requested: &str,
    includer: &str,
    search_dirs: &[PathBuf],
) -> Option<PathBuf> {
    let requested_path = Path::new(requested);
    if requested_path.is_absolute() {
        return requested_path.exists().then(|| requested_path.to_path_buf());
    }

    if !includer.is_empty() {
        let includer_path = Path::new(includer);
        let base = if includer_path.extension().is_some() {
            includer_path.parent().unwrap_or(Path::new(""))
        } else {
            includer_path
        };
        if !base.as_os_str().is_empty() {
            let candidate = base.join(requested_path);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for dir in search_dirs {
        let candidate = dir.join(requested_path);
        if candidate.exists() {
            return Some(candidate);
        }
    }

    None
}

fn normalize_dep_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Compiles one GLSL source to SPIR-V.
///
/// `virtual_path` names the source for diagnostics and anchors relative
/// include resolution. Include files resolved during the compile are
/// reported back as dependencies.
pub fn compile_glsl_to_spirv(
    input: &SourceInput,
    options: &CompileOptions,
) -> Result<CompileOutput> {
    ensure_frontend_initialized();

    if input.virtual_path.is_empty() {
        return Err(Error::invalid_argument("virtualPath must not be empty"));
    }

    let mut search_dirs = Vec::with_capacity(options.include_dirs.len() + 1);
    if let Some(parent) = Path::new(&input.virtual_path).parent() {
        if !parent.as_os_str().is_empty() {
            search_dirs.push(parent.to_path_buf());
        }
    }
    search_dirs.extend(options.include_dirs.iter().cloned());

    // Dependency recording shared with the include callback.
    let dependencies: RefCell<(Vec<PathBuf>, HashSet<PathBuf>)> =
        RefCell::new((Vec::new(), HashSet::new()));

    let compiler = shaderc::Compiler::new()
        .map_err(|e| Error::compile(format!("failed to create shaderc compiler: {e}")))?;
    let mut opts = shaderc::CompileOptions::new()
        .map_err(|e| Error::compile(format!("failed to create shaderc options: {e}")))?;

    opts.set_source_language(shaderc::SourceLanguage::GLSL);
    opts.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_2 as u32,
    );
    opts.set_target_spirv(spirv_version(options.spirv_version)?);

    if options.optimize {
        opts.set_optimization_level(shaderc::OptimizationLevel::Performance);
    } else {
        opts.set_optimization_level(shaderc::OptimizationLevel::Zero);
    }
    // There is no separate strip pass in shaderc; debug info is simply not
    // generated unless requested and not stripped.
    if options.debug_info && !options.strip_debug_info {
        opts.set_generate_debug_info();
    }

    for define in &options.defines {
        opts.add_macro_definition(&define.name, define.value.as_deref());
    }

    {
        let dependencies = &dependencies;
        let search_dirs = &search_dirs;
        opts.set_include_callback(move |requested, _ty, includer, _depth| {
            let resolved = resolve_include(requested, includer, search_dirs)
                .ok_or_else(|| format!("cannot resolve include \"{requested}\""))?;

            let content = std::fs::read_to_string(&resolved)
                .map_err(|e| format!("failed to read include {}: {e}", resolved.display()))?;

            let normalized = normalize_dep_path(&resolved);
            let mut deps = dependencies.borrow_mut();
            if deps.1.insert(normalized.clone()) {
                deps.0.push(normalized);
            }

            Ok(shaderc::ResolvedInclude {
                resolved_name: resolved.to_string_lossy().into_owned(),
                content,
            })
        });
    }

    let artifact = compiler
        .compile_into_spirv(
            &input.source_text,
            shader_kind(options.stage),
            &input.virtual_path,
            "main",
            Some(&opts),
        )
        .map_err(|e| {
            Error::compile(format!(
                "glslang failed for stage {}: {e}",
                options.stage.token()
            ))
        })?;

    let info_log = artifact.get_warning_messages();
    let spirv = artifact.as_binary().to_vec();
    drop(opts);

    Ok(CompileOutput {
        spirv,
        info_log,
        dependencies: dependencies.into_inner().0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_resolution_prefers_includer_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("common.glsl"), "// sub").unwrap();
        std::fs::write(dir.path().join("common.glsl"), "// root").unwrap();

        let includer = sub.join("main.frag");
        let resolved = resolve_include(
            "common.glsl",
            includer.to_str().unwrap(),
            &[dir.path().to_path_buf()],
        )
        .unwrap();
        assert_eq!(resolved, sub.join("common.glsl"));
    }

    #[test]
    fn include_resolution_falls_back_to_search_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lights.glsl"), "// lib").unwrap();

        let resolved =
            resolve_include("lights.glsl", "", &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(resolved, dir.path().join("lights.glsl"));

        assert!(resolve_include("missing.glsl", "", &[dir.path().to_path_buf()]).is_none());
    }

    #[test]
    fn empty_virtual_path_is_rejected() {
        let input = SourceInput {
            virtual_path: String::new(),
            source_text: "#version 460\nvoid main() {}\n".into(),
        };
        let err =
            compile_glsl_to_spirv(&input, &CompileOptions::new(ShaderStage::Vert)).unwrap_err();
        assert_eq!(err.code(), vshader_types::ErrorCode::InvalidArgument);
    }

    #[test]
    fn compiles_minimal_vertex_shader() {
        let input = SourceInput {
            virtual_path: "test.vert.vshader".into(),
            source_text: "#version 460\nvoid main() { gl_Position = vec4(0); }\n".into(),
        };
        let out = compile_glsl_to_spirv(&input, &CompileOptions::new(ShaderStage::Vert)).unwrap();
        assert!(!out.spirv.is_empty());
        // SPIR-V magic word.
        assert_eq!(out.spirv[0], 0x0723_0203);
        assert!(out.dependencies.is_empty());
    }

    #[test]
    fn defines_reach_the_preprocessor() {
        let input = SourceInput {
            virtual_path: "test.frag.vshader".into(),
            source_text: "#version 460\n#ifndef USE_RED\n#error USE_RED not defined\n#endif\nlayout(location=0) out vec4 o;\nvoid main() { o = vec4(1,0,0,1); }\n"
                .into(),
        };

        let mut options = CompileOptions::new(ShaderStage::Frag);
        options.defines.push(crate::options::Define::parse("USE_RED=1"));
        assert!(compile_glsl_to_spirv(&input, &options).is_ok());

        let options = CompileOptions::new(ShaderStage::Frag);
        let err = compile_glsl_to_spirv(&input, &options).unwrap_err();
        assert_eq!(err.code(), vshader_types::ErrorCode::Compile);
    }
}
