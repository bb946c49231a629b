//! CLI smoke tests: verb dispatch, exit codes, and a full compile → pack
//! round trip through the real binary.

use std::path::Path;
use std::process::Command;

fn vshaderc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_vshaderc"))
}

fn write(path: &Path, text: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

const MINIMAL_FRAG: &str = "#version 460\nlayout(location=0) out vec4 o;\nvoid main() { o = vec4(1); }\n";

#[test]
fn no_args_exits_with_usage() {
    let status = vshaderc().status().unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn unknown_flag_exits_2() {
    let status = vshaderc()
        .args(["compile", "--frobnicate"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(2));

    let status = vshaderc().args(["frobnicate"]).status().unwrap();
    assert_eq!(status.code(), Some(2));
}

#[test]
fn invalid_stage_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.frag.vshader");
    write(&input, MINIMAL_FRAG);

    let status = vshaderc()
        .args(["compile", "-S", "geom", "-o", "out.vshbin"])
        .arg("-i")
        .arg(&input)
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(3));
}

#[test]
fn missing_input_exits_4() {
    let dir = tempfile::tempdir().unwrap();
    let status = vshaderc()
        .args(["compile", "-S", "frag", "-i", "missing.vshader", "-o", "out.vshbin"])
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(4));
}

#[test]
fn bad_keywords_file_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.frag.vshader");
    write(&input, MINIMAL_FRAG);
    let vkw = dir.path().join("engine.vkw");
    write(&vkw, "frobnicate USE_SHADOW\n");

    let status = vshaderc()
        .args(["compile", "-S", "frag", "-o", "out.vshbin"])
        .arg("-i")
        .arg(&input)
        .arg("--keywords-file")
        .arg(&vkw)
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(3));
}

#[test]
fn metadata_error_exits_5() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.frag.vshader");
    write(
        &input,
        "#version 460\n#pragma vultra state ZTest Maybe\nvoid main() {}\n",
    );

    let status = vshaderc()
        .args(["compile", "-S", "frag", "-o", "out.vshbin", "--no-cache"])
        .arg("-i")
        .arg(&input)
        .current_dir(dir.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(5));
}

#[test]
fn compile_then_packlib_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.frag.vshader");
    write(&input, MINIMAL_FRAG);
    let bin_path = dir.path().join("a.frag.vshbin");

    let status = vshaderc()
        .args(["compile", "-S", "frag", "--no-cache"])
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&bin_path)
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(0));
    assert!(bin_path.is_file());

    let lib_path = dir.path().join("out.vshlib");
    let status = vshaderc()
        .arg("packlib")
        .arg("-o")
        .arg(&lib_path)
        .arg(&bin_path)
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(0));
    assert!(lib_path.is_file());

    // Duplicate inputs are a pack conflict, not an unreadable input.
    let status = vshaderc()
        .arg("packlib")
        .arg("-o")
        .arg(&lib_path)
        .arg(&bin_path)
        .arg(&bin_path)
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(5));

    // A missing input still reads as an input error.
    let status = vshaderc()
        .arg("packlib")
        .arg("-o")
        .arg(&lib_path)
        .arg(dir.path().join("missing.vshbin"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(4));
}

#[test]
fn implicit_compile_verb() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("a.frag.vshader");
    write(&input, MINIMAL_FRAG);
    let out = dir.path().join("a.vshbin");

    // argv[1] starts with '-': treated as `compile`.
    let status = vshaderc()
        .args(["-S", "frag", "--no-cache"])
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&out)
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(0));
    assert!(out.is_file());
}

#[test]
fn build_scans_and_writes_library() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("shaders");
    write(&root.join("a.frag.vshader"), MINIMAL_FRAG);
    write(
        &root.join("b.vert.vshader"),
        "#version 460\nvoid main() { gl_Position = vec4(0); }\n",
    );
    let out = dir.path().join("lib/out.vshlib");

    let status = vshaderc()
        .arg("build")
        .arg("--shader_root")
        .arg(&root)
        .arg("-o")
        .arg(&out)
        .arg("--cache")
        .arg(dir.path().join("cache"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(0));
    assert!(out.is_file());
}

#[test]
fn empty_shader_root_exits_4() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("empty");
    std::fs::create_dir_all(&root).unwrap();

    let status = vshaderc()
        .arg("build")
        .arg("--shader_root")
        .arg(&root)
        .arg("-o")
        .arg(dir.path().join("out.vshlib"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(4));
}

#[test]
fn mergemanifest_merges_and_detects_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    let conflict = dir.path().join("c.json");

    write(
        &a,
        r#"{"entries":[{"virtual_path":"pbr.frag.vshader","stage":"frag","key_hash":1,"content_hash":2,"variant_hash":1,"shader_id_hash":3}]}"#,
    );
    write(
        &b,
        r#"{"entries":[{"virtual_path":"sky.vert.vshader","stage":"vert","key_hash":9,"content_hash":8,"variant_hash":9,"shader_id_hash":7}]}"#,
    );
    write(
        &conflict,
        r#"{"entries":[{"virtual_path":"other.frag.vshader","stage":"frag","key_hash":1,"content_hash":5,"variant_hash":1,"shader_id_hash":6}]}"#,
    );

    let out = dir.path().join("merged.json");
    let status = vshaderc()
        .arg("mergemanifest")
        .arg("-o")
        .arg(&out)
        .arg(&a)
        .arg(&b)
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(0));
    let merged = std::fs::read_to_string(&out).unwrap();
    assert!(merged.contains("pbr.frag.vshader"));
    assert!(merged.contains("sky.vert.vshader"));

    let status = vshaderc()
        .arg("mergemanifest")
        .arg("-o")
        .arg(&out)
        .arg(&a)
        .arg(&conflict)
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(5));
}
