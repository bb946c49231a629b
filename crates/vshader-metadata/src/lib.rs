//! Declarative metadata layered over standard GLSL.
//!
//! Shaders annotate themselves with `#pragma vultra …` (material params,
//! textures, render state) and `#pragma keyword …` (compile-time keyword
//! declarations). This crate extracts those annotations, evaluates
//! `only_if(…)` pruning constraints, and parses the external
//! `engine_keywords.vkw` file that carries engine-wide keyword settings.
//!
//! Everything here is pure text processing over value types; no I/O except
//! the one `.vkw` file loader.

#![forbid(unsafe_code)]

mod expr;
mod keywords;
mod pragma;
mod vkw;

pub use crate::expr::{eval_only_if, KeywordValueContext};
pub use crate::keywords::{
    parse_bool_value, parse_keyword_value, KeywordDecl, KeywordDispatch, KeywordScope,
    KeywordValueKind,
};
pub use crate::pragma::{parse_metadata, ParamMeta, ParsedMetadata, TextureMeta};
pub use crate::vkw::{load_vkw_file, parse_vkw, EngineKeywordsFile};
