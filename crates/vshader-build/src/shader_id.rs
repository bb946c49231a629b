//! Stable, path-derived shader identity.
//!
//! Runtime code addresses shaders by a logical id rather than a content
//! hash, so the id must survive recompiles. It is the virtual path's file
//! stem: `shaders/pbr.frag.vshader` → `"pbr.frag"`.

use std::path::Path;

use vshader_types::hash64_str;

/// Derives the logical shader id from a virtual path.
pub fn shader_id_from_virtual_path(virtual_path: &str) -> String {
    Path::new(virtual_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Hash of a logical shader id.
pub fn shader_id_hash(shader_id: &str) -> u64 {
    hash64_str(shader_id)
}
