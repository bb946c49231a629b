//! Permutation variant enumeration and constraint pruning support.

use std::collections::BTreeMap;
use std::path::Path;

use vshader_metadata::{
    parse_keyword_value, EngineKeywordsFile, KeywordDecl, KeywordScope, KeywordValueContext,
    KeywordValueKind,
};
use vshader_types::{Result, ShaderStage};

use crate::options::Define;

/// Infers the stage from a `<name>.<stage>.vshader` filename.
pub fn infer_stage_from_path(path: &Path) -> Option<ShaderStage> {
    if path.extension()?.to_str()? != "vshader" {
        return None;
    }
    let stem = Path::new(path.file_stem()?);
    let stage_ext = stem.extension()?.to_str()?;
    ShaderStage::parse_token(stage_ext)
}

/// Expands permutation declarations into the cartesian product of their
/// value spaces, expressed as define lists.
///
/// Bool keywords contribute `{0,1}`; Enum keywords contribute their
/// enumerant names. With no permutation keywords the result is a single
/// empty variant.
pub fn enumerate_variants(permute_decls: &[&KeywordDecl]) -> Vec<Vec<Define>> {
    let mut variants = vec![Vec::new()];

    for decl in permute_decls {
        let values: Vec<String> = match decl.kind {
            KeywordValueKind::Bool => vec!["0".to_string(), "1".to_string()],
            KeywordValueKind::Enum => decl.enumerants.clone(),
        };

        let mut next = Vec::with_capacity(variants.len() * values.len());
        for variant in &variants {
            for value in &values {
                let mut v = variant.clone();
                v.push(Define::new(decl.name.clone(), Some(value)));
                next.push(v);
            }
        }
        variants = next;
    }

    variants
}

/// Resolves the value of every declared keyword for one variant.
///
/// Per keyword: explicit define, then the engine-keywords setting (for
/// Global scope only), then the declaration default. The result feeds the
/// `only_if` evaluator.
pub fn resolve_keyword_values<'a>(
    decls: &'a [KeywordDecl],
    defines: &[Define],
    engine_keywords: Option<&EngineKeywordsFile>,
) -> Result<KeywordValueContext<'a>> {
    let define_map: BTreeMap<&str, &Define> =
        defines.iter().map(|d| (d.name.as_str(), d)).collect();

    let mut ctx = KeywordValueContext::default();
    for decl in decls {
        ctx.decls.insert(decl.name.as_str(), decl);

        let mut value = decl.default_value;
        if let Some(define) = define_map.get(decl.name.as_str()) {
            value = parse_keyword_value(decl, define.raw_value())?;
        } else if decl.scope == KeywordScope::Global {
            if let Some(raw) = engine_keywords.and_then(|kw| kw.values.get(&decl.name)) {
                value = parse_keyword_value(decl, raw)?;
            }
        }

        ctx.values.insert(decl.name.as_str(), value);
    }

    Ok(ctx)
}
