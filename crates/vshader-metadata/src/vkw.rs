//! Parser for the engine-wide keywords file (`engine_keywords.vkw`).
//!
//! Line-oriented, `#` comments. Two directives:
//!
//! ```text
//! keyword <permute|runtime|special> [<global|material|pass|local>] <NAME>[=<rhs>]
//! set <NAME>=<VALUE>
//! ```
//!
//! `set` values stay unparsed text until they are resolved against a
//! concrete declaration.

use std::collections::BTreeMap;
use std::path::Path;

use vshader_types::{Error, Result};

use crate::keywords::KeywordDecl;

/// The parsed contents of a `.vkw` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineKeywordsFile {
    /// Declarations in file order.
    pub decls: Vec<KeywordDecl>,
    /// `set` directives: name -> raw (unparsed) value.
    pub values: BTreeMap<String, String>,
}

/// Parses `.vkw` text. Errors carry the 1-based line number.
pub fn parse_vkw(text: &str) -> Result<EngineKeywordsFile> {
    let mut out = EngineKeywordsFile::default();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let toks: Vec<&str> = line.split_whitespace().collect();
        match toks[0] {
            "keyword" => {
                let decl = KeywordDecl::parse_tokens(&toks[1..])
                    .map_err(|e| e.with_context(format!("vkw line {line_no}")))?;
                out.decls.push(decl);
            }
            "set" => {
                let payload = toks.get(1).ok_or_else(|| {
                    Error::parse(format!("vkw line {line_no}: set requires NAME=VALUE"))
                })?;
                let (name, value) = payload.split_once('=').ok_or_else(|| {
                    Error::parse(format!("vkw line {line_no}: set requires NAME=VALUE"))
                })?;
                out.values.insert(name.to_string(), value.to_string());
            }
            other => {
                return Err(Error::parse(format!(
                    "vkw line {line_no}: unknown directive: {other}"
                )))
            }
        }
    }

    Ok(out)
}

/// Reads and parses a `.vkw` file from disk.
pub fn load_vkw_file(path: &Path) -> Result<EngineKeywordsFile> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read vkw file {}: {e}", path.display())))?;
    parse_vkw(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::{KeywordDispatch, KeywordScope, KeywordValueKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_declarations_and_settings() {
        let text = "\
# engine-wide keywords
keyword permute global USE_SHADOW
keyword runtime global DEBUG_VIEW=NONE|NORMAL|ALBEDO

set USE_SHADOW=1
set DEBUG_VIEW=NORMAL
";
        let kw = parse_vkw(text).unwrap();

        assert_eq!(kw.decls.len(), 2);
        assert_eq!(kw.decls[0].name, "USE_SHADOW");
        assert_eq!(kw.decls[0].dispatch, KeywordDispatch::Permutation);
        assert_eq!(kw.decls[0].scope, KeywordScope::Global);
        assert_eq!(kw.decls[1].kind, KeywordValueKind::Enum);
        assert_eq!(kw.decls[1].enumerants, vec!["NONE", "NORMAL", "ALBEDO"]);

        assert_eq!(kw.values.len(), 2);
        assert_eq!(kw.values["USE_SHADOW"], "1");
        assert_eq!(kw.values["DEBUG_VIEW"], "NORMAL");
    }

    #[test]
    fn set_keeps_raw_value_text() {
        let kw = parse_vkw("set LIGHT_COUNT=0004\n").unwrap();
        assert_eq!(kw.values["LIGHT_COUNT"], "0004");
    }

    #[test]
    fn errors_include_line_number() {
        let err = parse_vkw("keyword permute OK\nfrobnicate X\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");

        let err = parse_vkw("\n\nset BROKEN\n").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");

        let err = parse_vkw("keyword sometimes X\n").unwrap_err();
        assert!(err.to_string().contains("line 1"), "{err}");
    }
}
