use std::path::PathBuf;

use vshader_types::ShaderStage;

/// One preprocessor define (`-D NAME` or `-D NAME=VALUE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    pub fn new(name: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value: value.map(str::to_string),
        }
    }

    /// Parses the CLI form `NAME` or `NAME=VALUE`.
    pub fn parse(s: &str) -> Self {
        match s.split_once('=') {
            Some((name, value)) => Self {
                name: name.to_string(),
                value: Some(value.to_string()),
            },
            None => Self {
                name: s.to_string(),
                value: None,
            },
        }
    }

    /// Canonical `name` / `name=value` form used for hashing.
    pub fn canonical(&self) -> String {
        match &self.value {
            Some(v) => format!("{}={v}", self.name),
            None => self.name.clone(),
        }
    }

    /// The raw value text as seen by keyword resolution; absent means
    /// "defined without a value".
    pub fn raw_value(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Options for a single frontend invocation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub stage: ShaderStage,

    /// Target SPIR-V version encoded as `major * 10 + minor`
    /// (e.g. `15` = SPIR-V 1.5); 0 selects the environment default.
    pub spirv_version: u32,

    pub optimize: bool,
    pub debug_info: bool,
    pub strip_debug_info: bool,

    pub defines: Vec<Define>,
    pub include_dirs: Vec<PathBuf>,
}

impl CompileOptions {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            spirv_version: 0,
            optimize: false,
            debug_info: false,
            strip_debug_info: false,
            defines: Vec::new(),
            include_dirs: Vec::new(),
        }
    }
}

/// One shader source handed to the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInput {
    /// Anchors include resolution and diagnostics; must be non-empty.
    pub virtual_path: String,
    pub source_text: String,
}

/// What the frontend produced.
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    pub spirv: Vec<u32>,
    pub info_log: String,
    /// Include files resolved during compilation, deduplicated, in
    /// resolution order.
    pub dependencies: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_parsing() {
        assert_eq!(
            Define::parse("USE_SHADOW"),
            Define::new("USE_SHADOW", None)
        );
        assert_eq!(
            Define::parse("PASS=FORWARD"),
            Define::new("PASS", Some("FORWARD"))
        );
        assert_eq!(Define::parse("EMPTY="), Define::new("EMPTY", Some("")));
    }

    #[test]
    fn canonical_form() {
        assert_eq!(Define::parse("A").canonical(), "A");
        assert_eq!(Define::parse("A=1").canonical(), "A=1");
    }
}
