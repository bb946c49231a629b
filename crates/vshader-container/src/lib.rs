//! On-disk container formats.
//!
//! Two formats, both little-endian and versioned:
//!
//! - `.vshbin` — one compiled shader artifact: a fixed 32-byte header
//!   followed by tagged chunks (SPIR-V, reflection, material description,
//!   optional identity hashes). Content-addressed: the SPIR-V payload hash
//!   stored in the header is re-verified on read.
//! - `.vshlib` — a random-access library of artifacts keyed by
//!   `(keyHash, stage)`, with a sorted table of contents and an optional
//!   embedded engine-keywords payload.
//!
//! Inputs are treated as untrusted: every offset and size is validated and
//! malformed data fails with a `Deserialize` error, never a panic.

#![forbid(unsafe_code)]

mod codec;
mod variant_key;
mod vshbin;
mod vshlib;

pub use crate::codec::ChunkTag;
pub use crate::variant_key::{VariantKey, VariantKeyEntry};
pub use crate::vshbin::{
    read_vshbin, read_vshbin_file, write_vshbin, write_vshbin_file, VSHBIN_MAGIC, VSHBIN_VERSION,
};
pub use crate::vshlib::{
    extract_vslib_blob, read_vslib, write_vslib, write_vslib_bytes, ShaderLibrary,
    ShaderLibraryEntry, ShaderLibraryTocEntry, VSHLIB_MAGIC, VSHLIB_VERSION,
};
