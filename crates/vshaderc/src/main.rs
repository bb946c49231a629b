//! `vshaderc` — offline shader compiler driver.
//!
//! Three pipeline operations plus a manifest utility:
//!
//! ```text
//! vshaderc compile -i <in.vshader> -o <out.vshbin> -S <stage> [options]
//! vshaderc build --shader_root <dir> -o <out.vshlib> [options]
//! vshaderc packlib -o <out.vshlib> <in.vshbin>... [options]
//! vshaderc mergemanifest -o <out.json> <in.json>...
//! ```
//!
//! Exit codes: 0 success, 1 usage/no-args, 2 unknown/missing flag,
//! 3 invalid stage or keyword-file parse error, 4 input missing/unreadable
//! or scan empty, 5 metadata/build failure or constraint violation,
//! 6 internal/output-dir failure, 7 write failure.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use vshader_build::{
    build_shader, collect_library_entries, collect_pack_entries, merge_manifests,
    write_library_output, BuildRequest, CompileOptions, Define, LibraryBuildRequest, SourceInput,
    DEFAULT_CACHE_DIR,
};
use vshader_container::{write_vshbin_file, write_vslib};
use vshader_metadata::{load_vkw_file, EngineKeywordsFile, KeywordDispatch, KeywordScope};
use vshader_types::ShaderStage;

const EXIT_USAGE: u8 = 1;
const EXIT_FLAGS: u8 = 2;
const EXIT_STAGE_OR_KEYWORDS: u8 = 3;
const EXIT_INPUT: u8 = 4;
const EXIT_BUILD: u8 = 5;
const EXIT_INTERNAL: u8 = 6;
const EXIT_WRITE: u8 = 7;

#[derive(Debug, Parser)]
#[command(
    name = "vshaderc",
    about = "Offline shader compiler: .vshader sources to .vshbin artifacts and .vshlib libraries",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile one shader source into a .vshbin artifact.
    Compile(CompileArgs),
    /// Build a .vshlib from a shader directory tree, expanding variants.
    Build(BuildArgs),
    /// Pack precompiled .vshbin files into a .vshlib.
    Packlib(PacklibArgs),
    /// Merge build manifests, failing on key conflicts.
    Mergemanifest(MergeManifestArgs),
}

#[derive(Debug, clap::Args)]
struct CompileArgs {
    /// Input shader source.
    #[arg(short = 'i', value_name = "INPUT")]
    input: PathBuf,

    /// Output .vshbin path.
    #[arg(short = 'o', value_name = "OUTPUT")]
    output: PathBuf,

    /// Shader stage: vert, frag, comp, task, mesh, rgen, rmiss, rchit, rahit, rint.
    #[arg(short = 'S', value_name = "STAGE")]
    stage: String,

    /// Add an include directory (repeatable).
    #[arg(short = 'I', value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Define a macro (repeatable; VALUE optional).
    #[arg(short = 'D', value_name = "NAME[=VALUE]")]
    defines: Vec<String>,

    /// Load engine_keywords.vkw and inject global permute values the
    /// shader declares.
    #[arg(long = "keywords-file", value_name = "VKW")]
    keywords_file: Option<PathBuf>,

    /// Disable the on-disk cache.
    #[arg(long = "no-cache")]
    no_cache: bool,

    /// Cache directory.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CACHE_DIR)]
    cache: PathBuf,

    /// Verbose logging.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, clap::Args)]
struct BuildArgs {
    /// Root directory scanned for *.vshader sources.
    #[arg(long = "shader_root", value_name = "DIR")]
    shader_root: PathBuf,

    /// Build only specific shaders (repeatable, relative to shader_root
    /// unless absolute).
    #[arg(long = "shader", value_name = "PATH")]
    shaders: Vec<PathBuf>,

    /// Add an include directory (repeatable).
    #[arg(short = 'I', value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Load engine keywords (.vkw) and embed them into the output library.
    #[arg(long = "keywords-file", value_name = "VKW")]
    keywords_file: Option<PathBuf>,

    /// Output .vshlib path.
    #[arg(short = 'o', value_name = "OUTPUT")]
    output: PathBuf,

    /// Disable the on-disk cache.
    #[arg(long = "no-cache")]
    no_cache: bool,

    /// Cache directory.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CACHE_DIR)]
    cache: PathBuf,

    /// Skip variants failing only_if constraints instead of erroring.
    #[arg(long = "skip-invalid")]
    skip_invalid: bool,

    /// Also write a JSON build manifest.
    #[arg(long = "manifest", value_name = "JSON")]
    manifest: Option<PathBuf>,

    /// Verbose logging.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, clap::Args)]
struct PacklibArgs {
    /// Output .vshlib path.
    #[arg(short = 'o', value_name = "OUTPUT")]
    output: PathBuf,

    /// Embed keywords file bytes into the output library.
    #[arg(long = "keywords-file", value_name = "VKW")]
    keywords_file: Option<PathBuf>,

    /// Input .vshbin files.
    #[arg(value_name = "VSHBIN", required = true)]
    inputs: Vec<PathBuf>,

    /// Verbose logging.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, clap::Args)]
struct MergeManifestArgs {
    /// Output manifest path.
    #[arg(short = 'o', value_name = "OUTPUT")]
    output: PathBuf,

    /// Input manifest files.
    #[arg(value_name = "JSON", required = true)]
    inputs: Vec<PathBuf>,

    /// Verbose logging.
    #[arg(long)]
    verbose: bool,
}

/// A failure with its process exit code already decided.
struct CliError {
    exit: u8,
    message: String,
}

impl CliError {
    fn new(exit: u8, message: impl Into<String>) -> Self {
        Self {
            exit,
            message: message.into(),
        }
    }
}

type CliResult = Result<(), CliError>;

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let mut args: Vec<OsString> = std::env::args_os().collect();

    if args.len() <= 1 {
        let _ = Cli::command().print_help();
        return ExitCode::from(EXIT_USAGE);
    }

    // Backward compatibility: `vshaderc -i ...` is an implicit `compile`.
    let first = args[1].to_string_lossy().into_owned();
    let is_help = matches!(first.as_str(), "-h" | "--help" | "-V" | "--version");
    if first.starts_with('-') && !is_help {
        args.insert(1, OsString::from("compile"));
    }

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => {
            let is_help = matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            );
            let _ = e.print();
            return if is_help {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_FLAGS)
            };
        }
    };

    let verbose = match &cli.command {
        Command::Compile(a) => a.verbose,
        Command::Build(a) => a.verbose,
        Command::Packlib(a) => a.verbose,
        Command::Mergemanifest(a) => a.verbose,
    };
    init_logging(verbose);

    let result = match cli.command {
        Command::Compile(args) => cmd_compile(args),
        Command::Build(args) => cmd_build(args),
        Command::Packlib(args) => cmd_packlib(args),
        Command::Mergemanifest(args) => cmd_mergemanifest(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e.message);
            ExitCode::from(e.exit)
        }
    }
}

fn load_keywords(path: &std::path::Path) -> Result<(EngineKeywordsFile, Vec<u8>), CliError> {
    let keywords = load_vkw_file(path).map_err(|e| {
        CliError::new(
            EXIT_STAGE_OR_KEYWORDS,
            format!("failed to load keywords file {}: {e}", path.display()),
        )
    })?;
    let bytes = std::fs::read(path).map_err(|e| {
        CliError::new(
            EXIT_STAGE_OR_KEYWORDS,
            format!("failed to read keywords file bytes {}: {e}", path.display()),
        )
    })?;
    Ok((keywords, bytes))
}

fn cmd_compile(args: CompileArgs) -> CliResult {
    let stage = ShaderStage::parse_token(&args.stage).ok_or_else(|| {
        CliError::new(EXIT_STAGE_OR_KEYWORDS, format!("invalid stage: {}", args.stage))
    })?;

    let source_text = std::fs::read_to_string(&args.input).map_err(|e| {
        CliError::new(
            EXIT_INPUT,
            format!("failed to read input file {}: {e}", args.input.display()),
        )
    })?;

    let mut defines: Vec<Define> = args.defines.iter().map(|d| Define::parse(d)).collect();

    let engine_keywords = match &args.keywords_file {
        Some(path) => {
            let (keywords, _) = load_keywords(path)?;
            inject_engine_defines(&args.input, &source_text, &keywords, &mut defines)?;
            Some(keywords)
        }
        None => None,
    };

    let mut options = CompileOptions::new(stage);
    options.defines = defines;
    options.include_dirs = args.include_dirs;

    let mut request = BuildRequest::new(
        SourceInput {
            virtual_path: args.input.to_string_lossy().replace('\\', "/"),
            source_text,
        },
        options,
    );
    request.engine_keywords = engine_keywords;
    request.enable_cache = !args.no_cache;
    request.cache_dir = args.cache;

    let started = std::time::Instant::now();
    let result = build_shader(&request)
        .map_err(|e| CliError::new(EXIT_BUILD, format!("build failed: {e}")))?;
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        from_cache = result.from_cache,
        "compiled {}",
        args.input.display()
    );

    write_vshbin_file(&args.output, &result.binary)
        .map_err(|e| CliError::new(EXIT_WRITE, format!("write failed: {e}")))?;

    tracing::info!("wrote {}", args.output.display());
    if !result.log.is_empty() {
        tracing::debug!("compile log:\n{}", result.log);
    }

    Ok(())
}

/// Injects engine `set` values as defines for Global-scope permutation
/// keywords the shader declares, without overriding explicit `-D`s.
fn inject_engine_defines(
    input: &std::path::Path,
    source_text: &str,
    keywords: &EngineKeywordsFile,
    defines: &mut Vec<Define>,
) -> CliResult {
    let meta = vshader_metadata::parse_metadata(source_text).map_err(|e| {
        CliError::new(
            EXIT_BUILD,
            format!(
                "failed to parse shader metadata for keyword injection: {}: {e}",
                input.display()
            ),
        )
    })?;

    let existing: BTreeSet<String> = defines.iter().map(|d| d.name.clone()).collect();

    for decl in &meta.keywords {
        if decl.dispatch != KeywordDispatch::Permutation || decl.scope != KeywordScope::Global {
            continue;
        }
        if existing.contains(&decl.name) {
            continue;
        }
        if let Some(value) = keywords.values.get(&decl.name) {
            tracing::debug!(keyword = %decl.name, value = %value, "injecting engine keyword");
            defines.push(Define::new(decl.name.clone(), Some(value)));
        }
    }

    Ok(())
}

fn cmd_build(args: BuildArgs) -> CliResult {
    let mut request = LibraryBuildRequest::new(&args.shader_root, &args.output);
    request.shaders = args.shaders;
    request.include_dirs = args.include_dirs;
    request.enable_cache = !args.no_cache;
    request.cache_dir = args.cache;
    request.skip_invalid = args.skip_invalid;
    request.manifest_path = args.manifest;

    if let Some(path) = &args.keywords_file {
        let (keywords, bytes) = load_keywords(path)?;
        request.engine_keywords = Some(keywords);
        request.engine_keywords_bytes = bytes;
    }

    let output = collect_library_entries(&request).map_err(|e| {
        let exit = match e.code() {
            vshader_types::ErrorCode::Io => EXIT_INPUT,
            _ => EXIT_BUILD,
        };
        CliError::new(exit, format!("build failed: {e}"))
    })?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CliError::new(
                    EXIT_INTERNAL,
                    format!("failed to create output directory {}: {e}", parent.display()),
                )
            })?;
        }
    }

    write_library_output(&request, &output)
        .map_err(|e| CliError::new(EXIT_WRITE, format!("write failed: {e}")))?;

    tracing::info!(
        entries = output.report.entries,
        pruned = output.report.pruned,
        duplicates = output.report.duplicates,
        "wrote {}",
        args.output.display()
    );
    Ok(())
}

fn cmd_packlib(args: PacklibArgs) -> CliResult {
    let keywords_bytes = match &args.keywords_file {
        Some(path) => {
            let (_, bytes) = load_keywords(path)?;
            tracing::info!("embedding keywords file: {}", path.display());
            Some(bytes)
        }
        None => None,
    };

    let entries = collect_pack_entries(&args.inputs).map_err(|e| {
        let exit = match e.code() {
            vshader_types::ErrorCode::InvalidArgument => EXIT_BUILD,
            _ => EXIT_INPUT,
        };
        CliError::new(exit, format!("packlib failed: {e}"))
    })?;

    write_vslib(&args.output, &entries, keywords_bytes.as_deref())
        .map_err(|e| CliError::new(EXIT_WRITE, format!("packlib write failed: {e}")))?;

    tracing::info!(entries = entries.len(), "wrote {}", args.output.display());
    Ok(())
}

fn cmd_mergemanifest(args: MergeManifestArgs) -> CliResult {
    let merged = merge_manifests(&args.inputs).map_err(|e| {
        let exit = match e.code() {
            vshader_types::ErrorCode::InvalidArgument => EXIT_BUILD,
            _ => EXIT_INPUT,
        };
        CliError::new(exit, format!("mergemanifest failed: {e}"))
    })?;

    merged
        .save(&args.output)
        .map_err(|e| CliError::new(EXIT_WRITE, format!("mergemanifest write failed: {e}")))?;

    tracing::info!(entries = merged.entries.len(), "wrote {}", args.output.display());
    Ok(())
}
