use vshader_types::{Error, Result};

/// How a keyword participates in compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeywordDispatch {
    /// Enumerated at build time; each value yields a distinct artifact.
    Permutation = 0,
    /// Recorded in metadata only; resolved by the runtime.
    #[default]
    Runtime = 1,
    /// Reserved for host-side specialization constants.
    Specialization = 2,
}

impl KeywordDispatch {
    /// Parses the declaration token (`permute`, `runtime`, `special`).
    pub fn parse_token(s: &str) -> Option<Self> {
        Some(match s {
            "permute" => Self::Permutation,
            "runtime" => Self::Runtime,
            "special" => Self::Specialization,
            _ => return None,
        })
    }
}

/// Who owns a keyword's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeywordScope {
    #[default]
    ShaderLocal = 0,
    Global = 1,
    Material = 2,
    Pass = 3,
}

impl KeywordScope {
    /// Parses the optional scope token. `local`, `shader` and
    /// `shaderlocal` are accepted spellings for [`KeywordScope::ShaderLocal`].
    pub fn parse_token(s: &str) -> Option<Self> {
        Some(match s {
            "global" => Self::Global,
            "material" => Self::Material,
            "pass" => Self::Pass,
            "local" | "shader" | "shaderlocal" => Self::ShaderLocal,
            _ => return None,
        })
    }
}

/// Value domain of a keyword.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeywordValueKind {
    #[default]
    Bool = 0,
    Enum = 1,
}

/// A keyword declaration from a shader pragma or a `.vkw` file.
///
/// Invariants: `Bool` keywords have `default_value ∈ {0,1}` and no
/// enumerants; `Enum` keywords have at least one enumerant and
/// `default_value < enumerants.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordDecl {
    pub name: String,
    pub dispatch: KeywordDispatch,
    pub scope: KeywordScope,
    pub kind: KeywordValueKind,

    /// Bool: 0/1. Enum: index into `enumerants`.
    pub default_value: u32,

    /// Enumerant names; empty iff `kind == Bool`.
    pub enumerants: Vec<String>,

    /// Raw pruning constraint, e.g. `only_if(SURFACE==CUTOUT)`; empty if none.
    pub constraint: String,
}

impl KeywordDecl {
    /// Parses the token list of a declaration, after the leading directive
    /// token has been stripped:
    ///
    /// ```text
    /// <dispatch> [<scope>] <NAME>[=<rhs>] [only_if(<expr>)]
    /// ```
    ///
    /// `rhs` is `0`/`1` for a Bool default, or a `|`-separated enumerant
    /// list for an Enum.
    pub fn parse_tokens(toks: &[&str]) -> Result<Self> {
        let mut decl = KeywordDecl::default();

        let mut it = toks.iter();
        let dispatch_tok = it
            .next()
            .ok_or_else(|| Error::parse("keyword declaration is missing a dispatch token"))?;
        decl.dispatch = KeywordDispatch::parse_token(dispatch_tok)
            .ok_or_else(|| Error::parse(format!("unknown keyword dispatch: {dispatch_tok}")))?;

        let mut name_tok = *it
            .next()
            .ok_or_else(|| Error::parse("keyword declaration requires a name"))?;
        if let Some(scope) = KeywordScope::parse_token(name_tok) {
            decl.scope = scope;
            name_tok = it
                .next()
                .ok_or_else(|| Error::parse("keyword declaration requires a name"))?;
        }

        let (name, rhs) = match name_tok.split_once('=') {
            Some((n, r)) if !r.is_empty() => (n, Some(r)),
            Some((n, _)) => (n, None),
            None => (name_tok, None),
        };
        if name.is_empty() {
            return Err(Error::parse("keyword declaration has an empty name"));
        }
        decl.name = name.to_string();

        if let Some(rhs) = rhs {
            if rhs == "0" || rhs == "1" {
                decl.kind = KeywordValueKind::Bool;
                decl.default_value = u32::from(rhs == "1");
            } else {
                decl.kind = KeywordValueKind::Enum;
                decl.enumerants = rhs
                    .split('|')
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect();
                if decl.enumerants.is_empty() {
                    return Err(Error::parse(format!(
                        "enum keyword '{}' has no enumerants",
                        decl.name
                    )));
                }
                decl.default_value = 0;
            }
        }

        for tok in it {
            if tok.starts_with("only_if(") && tok.ends_with(')') {
                decl.constraint = tok.to_string();
            } else {
                return Err(Error::parse(format!(
                    "unexpected token in keyword declaration: {tok}"
                )));
            }
        }

        Ok(decl)
    }
}

/// Parses a raw bool value. An empty string means "present", i.e. 1.
pub fn parse_bool_value(s: &str) -> Option<u32> {
    match s {
        "" | "1" | "true" | "TRUE" | "True" => Some(1),
        "0" | "false" | "FALSE" | "False" => Some(0),
        _ => None,
    }
}

/// Resolves a raw textual value against a declaration.
///
/// Bool keywords accept the usual truthy/falsy spellings. Enum keywords
/// accept a numeric index or an enumerant name; an empty value resolves to
/// the declaration default.
pub fn parse_keyword_value(decl: &KeywordDecl, raw: &str) -> Result<u32> {
    if decl.kind == KeywordValueKind::Bool {
        return parse_bool_value(raw).ok_or_else(|| {
            Error::parse(format!("invalid bool value '{raw}' for keyword '{}'", decl.name))
        });
    }

    if raw.is_empty() {
        return Ok(decl.default_value);
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        let idx: u32 = raw.parse().map_err(|_| {
            Error::parse(format!("enum index overflow for keyword '{}'", decl.name))
        })?;
        if idx as usize >= decl.enumerants.len() {
            return Err(Error::parse(format!(
                "enum index {idx} out of range for keyword '{}'",
                decl.name
            )));
        }
        return Ok(idx);
    }

    decl.enumerants
        .iter()
        .position(|e| e == raw)
        .map(|i| i as u32)
        .ok_or_else(|| {
            Error::parse(format!(
                "unknown enum value '{raw}' for keyword '{}'",
                decl.name
            ))
        })
}
