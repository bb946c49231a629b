//! The `.vshlib` random-access library container.
//!
//! ```text
//! 0..8     magic "VSHLIB\0\0"
//! 8..12    version u32          (current = 2)
//! 12..16   flags u32            (reserved = 0)
//! 16..20   entryCount u32
//! 20..24   reserved u32
//! 24..32   tocOffset u64
//! 32..40   tocSize u64
//! 40..48   keywordsOffset u64   (0 if absent)
//! 48..56   keywordsSize u64
//! ```
//!
//! Blobs start immediately after the header; the TOC follows the blobs;
//! optional engine-keywords bytes trail the TOC. TOC entries are 32 bytes
//! (`keyHash u64 | stage u8 | reserved[7] | offset u64 | size u64`) and are
//! stored in ascending `(keyHash, stage)` order, so lookups may binary
//! search; at current library sizes a linear scan is just as good.

use std::path::Path;

use vshader_types::{Error, Result, ShaderStage};

use crate::codec::{write_file_atomic, ByteReader, ByteWriter};

/// Magic bytes at offset 0.
pub const VSHLIB_MAGIC: [u8; 8] = *b"VSHLIB\0\0";
/// Current format version.
pub const VSHLIB_VERSION: u32 = 2;

const HEADER_SIZE: u64 = 56;
const TOC_ENTRY_SIZE: u64 = 32;

/// One artifact to be packed into a library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderLibraryEntry {
    pub key_hash: u64,
    pub stage: ShaderStage,
    /// Typically a full `.vshbin` payload.
    pub blob: Vec<u8>,
}

/// One parsed table-of-contents entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderLibraryTocEntry {
    pub key_hash: u64,
    pub stage: ShaderStage,
    pub offset: u64,
    pub size: u64,
}

/// A library read into memory: TOC plus the raw blob region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderLibrary {
    pub entries: Vec<ShaderLibraryTocEntry>,
    /// Concatenated blob storage (file bytes between header and TOC).
    pub blob_data: Vec<u8>,
    /// Raw embedded `engine_keywords.vkw` bytes; empty if absent.
    pub engine_keywords_vkw: Vec<u8>,
}

/// Serializes a library to bytes.
///
/// Entries are sorted by `(keyHash, stage)`; a zero `keyHash` or an
/// `Unknown` stage is rejected with `InvalidArgument`.
pub fn write_vslib_bytes(
    entries: &[ShaderLibraryEntry],
    engine_keywords_vkw: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut sorted: Vec<&ShaderLibraryEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| (e.key_hash, e.stage as u8));

    let mut toc = ByteWriter::with_capacity(sorted.len() * TOC_ENTRY_SIZE as usize);
    let mut blob_data = ByteWriter::with_capacity(sorted.iter().map(|e| e.blob.len()).sum());

    let mut blob_offset = HEADER_SIZE;
    for e in &sorted {
        if e.stage == ShaderStage::Unknown {
            return Err(Error::invalid_argument(
                "vshlib entry has unknown shader stage",
            ));
        }
        if e.key_hash == 0 {
            return Err(Error::invalid_argument(
                "vshlib entry has keyHash=0 (reserved/invalid)",
            ));
        }

        toc.u64(e.key_hash);
        toc.u8(e.stage as u8);
        toc.bytes(&[0u8; 7]);
        toc.u64(blob_offset);
        toc.u64(e.blob.len() as u64);

        blob_data.bytes(&e.blob);
        blob_offset += e.blob.len() as u64;
    }

    let toc_offset = HEADER_SIZE + blob_data.len() as u64;
    let toc_size = toc.len() as u64;
    let keywords_size = engine_keywords_vkw.map_or(0, |b| b.len() as u64);
    let keywords_offset = if keywords_size > 0 {
        toc_offset + toc_size
    } else {
        0
    };

    let mut w =
        ByteWriter::with_capacity((HEADER_SIZE + toc_size + keywords_size) as usize + blob_data.len());
    w.bytes(&VSHLIB_MAGIC);
    w.u32(VSHLIB_VERSION);
    w.u32(0); // flags
    w.u32(sorted.len() as u32);
    w.u32(0); // reserved
    w.u64(toc_offset);
    w.u64(toc_size);
    w.u64(keywords_offset);
    w.u64(keywords_size);
    debug_assert_eq!(w.len() as u64, HEADER_SIZE);

    w.bytes(&blob_data.into_vec());
    w.bytes(&toc.into_vec());
    if keywords_size > 0 {
        w.bytes(engine_keywords_vkw.unwrap_or_default());
    }

    Ok(w.into_vec())
}

/// Serializes a library and writes it atomically.
pub fn write_vslib(
    path: &Path,
    entries: &[ShaderLibraryEntry],
    engine_keywords_vkw: Option<&[u8]>,
) -> Result<()> {
    let bytes = write_vslib_bytes(entries, engine_keywords_vkw)?;
    write_file_atomic(path, &bytes)
}

/// Reads and validates a `.vshlib` file.
pub fn read_vslib(path: &Path) -> Result<ShaderLibrary> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::io(format!("failed to read file {}: {e}", path.display())))?;
    read_vslib_bytes(&bytes)
}

fn read_vslib_bytes(bytes: &[u8]) -> Result<ShaderLibrary> {
    let file_size = bytes.len() as u64;
    if file_size < HEADER_SIZE {
        return Err(Error::deserialize("file too small to be a valid .vshlib"));
    }

    let mut r = ByteReader::new(bytes);
    let magic = r.take(8, "magic")?;
    if magic != VSHLIB_MAGIC {
        return Err(Error::deserialize("invalid VSHLIB magic"));
    }

    let version = r.u32("version")?;
    if version != VSHLIB_VERSION {
        return Err(Error::deserialize(format!(
            "unsupported VSHLIB version {version}"
        )));
    }

    let _flags = r.u32("flags")?;
    let entry_count = r.u32("entry count")?;
    let _reserved = r.u32("reserved")?;
    let toc_offset = r.u64("toc offset")?;
    let toc_size = r.u64("toc size")?;
    let keywords_offset = r.u64("keywords offset")?;
    let keywords_size = r.u64("keywords size")?;

    if toc_offset < HEADER_SIZE
        || toc_offset.checked_add(toc_size).is_none_or(|end| end > file_size)
    {
        return Err(Error::deserialize("VSHLIB TOC out of file range"));
    }
    if toc_size != u64::from(entry_count) * TOC_ENTRY_SIZE {
        return Err(Error::deserialize("VSHLIB TOC size does not match entry count"));
    }

    if keywords_offset != 0 {
        if keywords_offset
            .checked_add(keywords_size)
            .is_none_or(|end| end > file_size)
        {
            return Err(Error::deserialize("VSHLIB keywords bytes out of file range"));
        }
        if keywords_offset < toc_offset + toc_size {
            return Err(Error::deserialize("VSHLIB keywords bytes overlap TOC"));
        }
    }

    let blob_data = bytes[HEADER_SIZE as usize..toc_offset as usize].to_vec();

    let mut entries = Vec::with_capacity(entry_count.min(4096) as usize);
    let mut toc = ByteReader::new(&bytes[toc_offset as usize..(toc_offset + toc_size) as usize]);
    for _ in 0..entry_count {
        let key_hash = toc.u64("TOC key hash")?;
        let stage_raw = toc.u8("TOC stage")?;
        let stage = ShaderStage::from_u8(stage_raw)
            .ok_or_else(|| Error::deserialize(format!("TOC: bad stage {stage_raw}")))?;
        toc.take(7, "TOC reserved")?;
        let offset = toc.u64("TOC blob offset")?;
        let size = toc.u64("TOC blob size")?;

        if offset < HEADER_SIZE || offset.checked_add(size).is_none_or(|end| end > toc_offset) {
            return Err(Error::deserialize("VSHLIB entry blob out of range"));
        }

        entries.push(ShaderLibraryTocEntry {
            key_hash,
            stage,
            offset,
            size,
        });
    }

    let engine_keywords_vkw = if keywords_offset != 0 && keywords_size > 0 {
        bytes[keywords_offset as usize..(keywords_offset + keywords_size) as usize].to_vec()
    } else {
        Vec::new()
    };

    Ok(ShaderLibrary {
        entries,
        blob_data,
        engine_keywords_vkw,
    })
}

/// Returns the blob bytes for `(keyHash, stage)`.
///
/// A miss is an `Io` "entry not found" error, matching the runtime loader's
/// view that a missing entry is a content problem, not a format problem.
pub fn extract_vslib_blob(
    lib: &ShaderLibrary,
    key_hash: u64,
    stage: ShaderStage,
) -> Result<Vec<u8>> {
    for e in &lib.entries {
        if e.key_hash == key_hash && e.stage == stage {
            let rel = e
                .offset
                .checked_sub(HEADER_SIZE)
                .ok_or_else(|| Error::deserialize("VSHLIB entry out of range"))?
                as usize;
            let end = rel
                .checked_add(e.size as usize)
                .filter(|end| *end <= lib.blob_data.len())
                .ok_or_else(|| Error::deserialize("VSHLIB entry out of range"))?;
            return Ok(lib.blob_data[rel..end].to_vec());
        }
    }

    Err(Error::io("VSHLIB entry not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(key: u64, stage: ShaderStage, blob: &[u8]) -> ShaderLibraryEntry {
        ShaderLibraryEntry {
            key_hash: key,
            stage,
            blob: blob.to_vec(),
        }
    }

    #[test]
    fn round_trip_sorts_entries_and_preserves_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shaders.vshlib");

        let entries = vec![
            entry(30, ShaderStage::Frag, b"third"),
            entry(10, ShaderStage::Frag, b"second"),
            entry(10, ShaderStage::Vert, b"first"),
        ];
        write_vslib(&path, &entries, None).unwrap();

        let lib = read_vslib(&path).unwrap();
        assert_eq!(lib.entries.len(), 3);

        let keys: Vec<_> = lib
            .entries
            .iter()
            .map(|e| (e.key_hash, e.stage as u8))
            .collect();
        assert_eq!(keys, vec![(10, 0), (10, 1), (30, 1)]);

        assert_eq!(
            extract_vslib_blob(&lib, 10, ShaderStage::Vert).unwrap(),
            b"first"
        );
        assert_eq!(
            extract_vslib_blob(&lib, 10, ShaderStage::Frag).unwrap(),
            b"second"
        );
        assert_eq!(
            extract_vslib_blob(&lib, 30, ShaderStage::Frag).unwrap(),
            b"third"
        );
        assert!(lib.engine_keywords_vkw.is_empty());
    }

    #[test]
    fn missing_entry_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.vshlib");
        write_vslib(&path, &[entry(1, ShaderStage::Vert, b"x")], None).unwrap();

        let lib = read_vslib(&path).unwrap();
        let err = extract_vslib_blob(&lib, 1, ShaderStage::Frag).unwrap_err();
        assert_eq!(err.code(), vshader_types::ErrorCode::Io);
        assert!(err.to_string().contains("not found"), "{err}");
    }

    #[test]
    fn embedded_keywords_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.vshlib");
        let vkw = b"keyword permute global USE_SHADOW\nset USE_SHADOW=1\n";

        write_vslib(&path, &[entry(7, ShaderStage::Comp, b"blob")], Some(vkw)).unwrap();
        let lib = read_vslib(&path).unwrap();
        assert_eq!(lib.engine_keywords_vkw, vkw);
    }

    #[test]
    fn rejects_invalid_entries_on_write() {
        let err =
            write_vslib_bytes(&[entry(0, ShaderStage::Vert, b"x")], None).unwrap_err();
        assert_eq!(err.code(), vshader_types::ErrorCode::InvalidArgument);

        let err =
            write_vslib_bytes(&[entry(1, ShaderStage::Unknown, b"x")], None).unwrap_err();
        assert_eq!(err.code(), vshader_types::ErrorCode::InvalidArgument);
    }

    #[test]
    fn empty_library_round_trips() {
        let bytes = write_vslib_bytes(&[], None).unwrap();
        assert_eq!(bytes.len() as u64, HEADER_SIZE);
        let lib = read_vslib_bytes(&bytes).unwrap();
        assert!(lib.entries.is_empty());
        assert!(lib.blob_data.is_empty());
    }

    #[test]
    fn rejects_out_of_range_toc_entry() {
        let mut bytes = write_vslib_bytes(&[entry(5, ShaderStage::Frag, b"data!")], None).unwrap();

        // Corrupt the blob size of the single TOC entry.
        let toc_offset =
            u64::from_le_bytes(bytes[24..32].try_into().unwrap()) as usize;
        let size_pos = toc_offset + 8 + 1 + 7 + 8;
        bytes[size_pos..size_pos + 8].copy_from_slice(&u64::MAX.to_le_bytes());

        assert!(read_vslib_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let bytes = write_vslib_bytes(&[], None).unwrap();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'W';
        assert!(read_vslib_bytes(&bad_magic).is_err());

        let mut bad_version = bytes;
        bad_version[8] = 9;
        assert!(read_vslib_bytes(&bad_version).is_err());
    }
}
