//! Loads a `.vshlib`, derives a variant key the way a renderer would, and
//! extracts the matching artifact.
//!
//! ```text
//! cargo run -p vshader-container --example load_library -- shaders.vshlib pbr.frag
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use vshader_container::{extract_vslib_blob, read_vshbin, read_vslib, VariantKey};
use vshader_types::ShaderStage;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let (Some(lib_path), Some(shader_id)) = (args.next(), args.next()) else {
        eprintln!("usage: load_library <shaders.vshlib> <shader-id> [KEYWORD=VALUE]...");
        return ExitCode::from(1);
    };

    let lib = match read_vslib(&PathBuf::from(&lib_path)) {
        Ok(lib) => lib,
        Err(e) => {
            eprintln!("failed to load {lib_path}: {e}");
            return ExitCode::from(2);
        }
    };

    println!("{lib_path}: {} entries", lib.entries.len());
    for e in &lib.entries {
        println!(
            "  keyHash={:#018x} stage={} offset={} size={}",
            e.key_hash, e.stage, e.offset, e.size
        );
    }

    let mut key = VariantKey::new();
    key.set_shader_id(&shader_id);
    key.set_stage(ShaderStage::Frag);
    for kv in args {
        let (name, value) = kv.split_once('=').unwrap_or((kv.as_str(), "1"));
        let value: u32 = value.parse().unwrap_or(1);
        key.set(name, value);
    }

    let variant_hash = key.build();
    let blob = match extract_vslib_blob(&lib, variant_hash, ShaderStage::Frag) {
        Ok(blob) => blob,
        Err(e) => {
            eprintln!("variant {variant_hash:#018x} of '{shader_id}' not found: {e}");
            return ExitCode::from(4);
        }
    };

    match read_vshbin(&blob) {
        Ok(bin) => {
            println!("resolved '{shader_id}' variant {variant_hash:#018x}:");
            println!("  shaderIdHash: {:#018x}", bin.shader_id_hash);
            println!("  contentHash:  {:#018x}", bin.content_hash);
            println!("  spirv words:  {}", bin.spirv.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to parse embedded vshbin: {e}");
            ExitCode::from(5)
        }
    }
}
