//! Line-oriented scanner for `#pragma vultra …` and `#pragma keyword …`.
//!
//! Only lines whose first non-whitespace prefix matches one of the two
//! directives are interpreted; everything else passes through untouched to
//! the GLSL frontend. The grammar is strict: unknown tokens, wrong arity
//! and malformed attributes fail with a line-numbered parse error.

use std::collections::BTreeMap;

use vshader_types::{
    BlendFactor, BlendOp, CompareOp, CullMode, ColorMask, Error, ParamDefault, ParamRange,
    RenderState, Result, Semantic,
};

use crate::keywords::KeywordDecl;

/// Metadata attached to one `param` pragma.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMeta {
    pub semantic: Semantic,
    pub default: Option<ParamDefault>,
    pub range: Option<ParamRange>,
}

/// Metadata attached to one `texture` pragma.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureMeta {
    pub semantic: Semantic,
}

/// Everything extracted from a shader source's pragmas.
///
/// Params and textures are keyed by name in a `BTreeMap` so that hashing
/// iterates them in lexicographic order without an extra sort. Keyword
/// declarations keep source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMetadata {
    pub has_material_decl: bool,
    pub params: BTreeMap<String, ParamMeta>,
    pub textures: BTreeMap<String, TextureMeta>,
    pub keywords: Vec<KeywordDecl>,
    pub render_state: RenderState,
    pub render_state_explicit: bool,
}

impl ParsedMetadata {
    /// Keyword declarations with Permutation dispatch, in source order.
    pub fn permutation_keywords(&self) -> impl Iterator<Item = &KeywordDecl> {
        self.keywords
            .iter()
            .filter(|k| k.dispatch == crate::keywords::KeywordDispatch::Permutation)
    }
}

/// Extracts an attribute payload from a token shaped `name(payload)`.
fn attr_payload<'a>(token: &'a str, name: &str) -> Option<&'a str> {
    let rest = token.strip_prefix(name)?;
    rest.strip_prefix('(')?.strip_suffix(')')
}

fn parse_on_off(tok: &str) -> Option<bool> {
    match tok {
        "On" => Some(true),
        "Off" => Some(false),
        _ => None,
    }
}

fn parse_csv_floats(payload: &str) -> Option<Vec<f32>> {
    let mut out = Vec::new();
    for item in payload.split(',') {
        let item = item.trim();
        if item.is_empty() {
            return None;
        }
        out.push(item.parse::<f32>().ok()?);
    }
    (!out.is_empty()).then_some(out)
}

/// Scans `source` and collects pragma metadata.
///
/// Error messages carry the 1-based line number; the caller is expected to
/// prefix the source path.
pub fn parse_metadata(source: &str) -> Result<ParsedMetadata> {
    let mut out = ParsedMetadata::default();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim_start();

        if line.starts_with("#pragma vultra") {
            parse_vultra_line(line, &mut out)
                .map_err(|e| e.with_context(format!("line {line_no}")))?;
        } else if line.starts_with("#pragma keyword") {
            parse_keyword_line(line, &mut out)
                .map_err(|e| e.with_context(format!("line {line_no}")))?;
        }
    }

    Ok(out)
}

fn parse_vultra_line(line: &str, out: &mut ParsedMetadata) -> Result<()> {
    let toks: Vec<&str> = line.split_whitespace().collect();
    // toks[0] = "#pragma", toks[1] = "vultra"
    if toks.len() < 3 {
        return Err(Error::parse("#pragma vultra line has too few tokens"));
    }

    match toks[2] {
        "material" => {
            out.has_material_decl = true;
            Ok(())
        }
        "param" => parse_param(&toks[3..], out),
        "texture" => parse_texture(&toks[3..], out),
        "state" => parse_state(&toks[3..], out),
        "render" => {
            // Parsed for forward compatibility; no storage yet.
            out.render_state_explicit = true;
            Ok(())
        }
        other => Err(Error::parse(format!(
            "unknown #pragma vultra directive: {other}"
        ))),
    }
}

fn parse_param(toks: &[&str], out: &mut ParsedMetadata) -> Result<()> {
    let name = *toks
        .first()
        .ok_or_else(|| Error::parse("param pragma requires a parameter name"))?;
    let meta = out.params.entry(name.to_string()).or_default();

    for tok in &toks[1..] {
        if let Some(payload) = attr_payload(tok, "semantic") {
            meta.semantic = Semantic::parse_token(payload)
                .ok_or_else(|| Error::parse(format!("unknown semantic: {payload}")))?;
        } else if let Some(payload) = attr_payload(tok, "default") {
            let values = parse_csv_floats(payload)
                .filter(|v| v.len() <= 16)
                .ok_or_else(|| Error::parse("invalid default(...) list"))?;
            meta.default = Some(ParamDefault::from_floats(&values));
        } else if let Some(payload) = attr_payload(tok, "range") {
            let values = parse_csv_floats(payload)
                .filter(|v| v.len() == 2)
                .ok_or_else(|| Error::parse("range(min,max) expects exactly two numbers"))?;
            meta.range = Some(ParamRange {
                min: f64::from(values[0]),
                max: f64::from(values[1]),
            });
        } else {
            return Err(Error::parse(format!("unknown param attribute token: {tok}")));
        }
    }

    Ok(())
}

fn parse_texture(toks: &[&str], out: &mut ParsedMetadata) -> Result<()> {
    let name = *toks
        .first()
        .ok_or_else(|| Error::parse("texture pragma requires a texture name"))?;
    let meta = out.textures.entry(name.to_string()).or_default();

    for tok in &toks[1..] {
        if let Some(payload) = attr_payload(tok, "semantic") {
            meta.semantic = Semantic::parse_token(payload)
                .ok_or_else(|| Error::parse(format!("unknown semantic: {payload}")))?;
        } else {
            return Err(Error::parse(format!(
                "unknown texture attribute token: {tok}"
            )));
        }
    }

    Ok(())
}

fn parse_state(toks: &[&str], out: &mut ParsedMetadata) -> Result<()> {
    let sub = *toks
        .first()
        .ok_or_else(|| Error::parse("state pragma requires a subkind"))?;
    let args = &toks[1..];
    let rs = &mut out.render_state;

    match sub {
        "Blend" => {
            let [src, dst] = two_args(args, "Blend requires src dst")?;
            let src = BlendFactor::parse_token(src)
                .ok_or_else(|| Error::parse(format!("unknown blend source factor: {src}")))?;
            let dst = BlendFactor::parse_token(dst)
                .ok_or_else(|| Error::parse(format!("unknown blend destination factor: {dst}")))?;
            rs.blend_enable = true;
            rs.src_color = src;
            rs.dst_color = dst;
            rs.src_alpha = src;
            rs.dst_alpha = dst;
        }
        "BlendOp" => {
            let [color, alpha] = two_args(args, "BlendOp requires colorOp alphaOp")?;
            rs.color_op = BlendOp::parse_token(color)
                .ok_or_else(|| Error::parse(format!("unknown blend color operation: {color}")))?;
            rs.alpha_op = BlendOp::parse_token(alpha)
                .ok_or_else(|| Error::parse(format!("unknown blend alpha operation: {alpha}")))?;
            rs.blend_enable = true;
        }
        "ZTest" => {
            let v = one_arg(args, "ZTest requires On|Off")?;
            rs.depth_test =
                parse_on_off(v).ok_or_else(|| Error::parse("ZTest expects On|Off"))?;
        }
        "ZWrite" => {
            let v = one_arg(args, "ZWrite requires On|Off")?;
            rs.depth_write =
                parse_on_off(v).ok_or_else(|| Error::parse("ZWrite expects On|Off"))?;
        }
        "CompareOp" => {
            let v = one_arg(args, "CompareOp requires a comparison function")?;
            rs.depth_func = CompareOp::parse_token(v)
                .ok_or_else(|| Error::parse(format!("unknown compare op: {v}")))?;
        }
        "Cull" => {
            let v = one_arg(args, "Cull requires None|Back|Front")?;
            rs.cull = CullMode::parse_token(v)
                .ok_or_else(|| Error::parse(format!("unknown cull mode: {v}")))?;
        }
        "AlphaToCoverage" => {
            let v = one_arg(args, "AlphaToCoverage requires On|Off")?;
            rs.alpha_to_coverage =
                parse_on_off(v).ok_or_else(|| Error::parse("AlphaToCoverage expects On|Off"))?;
        }
        "ColorMask" => {
            let v = one_arg(args, "ColorMask requires a combination of R,G,B,A")?;
            rs.color_mask = ColorMask::parse_token(v)
                .ok_or_else(|| Error::parse(format!("unknown color mask: {v}")))?;
        }
        "DepthBias" => {
            let [factor, units] = two_args(args, "DepthBias requires factor and units")?;
            rs.depth_bias_factor = factor
                .parse()
                .map_err(|_| Error::parse(format!("invalid DepthBias factor value: {factor}")))?;
            rs.depth_bias_units = units
                .parse()
                .map_err(|_| Error::parse(format!("invalid DepthBias units value: {units}")))?;
        }
        other => return Err(Error::parse(format!("unknown state subkind: {other}"))),
    }

    out.render_state_explicit = true;
    Ok(())
}

fn one_arg<'a>(args: &[&'a str], msg: &str) -> Result<&'a str> {
    match args {
        [a, ..] => Ok(a),
        [] => Err(Error::parse(msg)),
    }
}

fn two_args<'a>(args: &[&'a str], msg: &str) -> Result<[&'a str; 2]> {
    match args {
        [a, b, ..] => Ok([a, b]),
        _ => Err(Error::parse(msg)),
    }
}

fn parse_keyword_line(line: &str, out: &mut ParsedMetadata) -> Result<()> {
    let toks: Vec<&str> = line.split_whitespace().collect();
    // toks[0] = "#pragma", toks[1] = "keyword"
    if toks.len() < 3 {
        return Err(Error::parse("#pragma keyword line has too few tokens"));
    }

    let decl = KeywordDecl::parse_tokens(&toks[2..])?;
    out.keywords.push(decl);
    Ok(())
}
