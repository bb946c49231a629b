//! The compile-reflect-assemble pipeline.
//!
//! This crate glues the external collaborators (the `shaderc` GLSL
//! frontend and `naga` SPIR-V reflection) to the metadata and container
//! layers:
//!
//! - [`build_shader`] compiles one source into a [`vshader_types::ShaderBinary`],
//!   read-through against an on-disk cache keyed by a composite build hash.
//! - [`build_library`] enumerates permutation variants per source under
//!   constraint pruning and packs the artifacts into a `.vshlib`.
//! - [`pack_library`] builds a `.vshlib` from precompiled `.vshbin` files.
//!
//! All hashes are derived with the shared XXH64 primitive and are
//! deterministic for fixed inputs.

#![forbid(unsafe_code)]

mod assemble;
mod frontend;
mod library;
mod manifest;
mod options;
mod pipeline;
mod reflect;
mod shader_id;
mod variants;

pub use crate::assemble::assemble_material;
pub use crate::frontend::compile_glsl_to_spirv;
pub use crate::library::{
    build_library, collect_library_entries, collect_pack_entries, pack_library, scan_shader_root,
    write_library_output, LibraryBuildOutput, LibraryBuildReport, LibraryBuildRequest,
};
pub use crate::manifest::{merge_manifests, BuildManifest, ManifestEntry};
pub use crate::options::{CompileOptions, CompileOutput, Define, SourceInput};
pub use crate::pipeline::{
    build_from_spirv, build_shader, compute_build_hash, compute_variant_hash, BuildRequest,
    BuildResult, DEFAULT_CACHE_DIR,
};
pub use crate::reflect::reflect_spirv;
pub use crate::shader_id::{shader_id_from_virtual_path, shader_id_hash};
pub use crate::variants::{enumerate_variants, infer_stage_from_path, resolve_keyword_values};
