use bitflags::bitflags;

/// Depth comparison function (`ZTest` / `CompareOp` pragma).
///
/// Wire discriminants (`u8`) are frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompareOp {
    Never = 0,
    Less = 1,
    Equal = 2,
    LessOrEqual = 3,
    Greater = 4,
    NotEqual = 5,
    GreaterOrEqual = 6,
    Always = 7,
}

impl CompareOp {
    pub fn from_u8(v: u8) -> Option<Self> {
        use CompareOp::*;
        [
            Never,
            Less,
            Equal,
            LessOrEqual,
            Greater,
            NotEqual,
            GreaterOrEqual,
            Always,
        ]
        .into_iter()
        .find(|op| *op as u8 == v)
    }

    /// Parses the pragma token (`Never`, `Less`, …).
    pub fn parse_token(s: &str) -> Option<Self> {
        Some(match s {
            "Never" => Self::Never,
            "Less" => Self::Less,
            "Equal" => Self::Equal,
            "LessOrEqual" => Self::LessOrEqual,
            "Greater" => Self::Greater,
            "NotEqual" => Self::NotEqual,
            "GreaterOrEqual" => Self::GreaterOrEqual,
            "Always" => Self::Always,
            _ => return None,
        })
    }
}

/// Blend factor for source/destination color and alpha channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlendFactor {
    Zero = 0,
    One = 1,
    SrcColor = 2,
    OneMinusSrcColor = 3,
    DstColor = 4,
    OneMinusDstColor = 5,
    SrcAlpha = 6,
    OneMinusSrcAlpha = 7,
    DstAlpha = 8,
    OneMinusDstAlpha = 9,
}

impl BlendFactor {
    pub fn from_u8(v: u8) -> Option<Self> {
        use BlendFactor::*;
        [
            Zero,
            One,
            SrcColor,
            OneMinusSrcColor,
            DstColor,
            OneMinusDstColor,
            SrcAlpha,
            OneMinusSrcAlpha,
            DstAlpha,
            OneMinusDstAlpha,
        ]
        .into_iter()
        .find(|f| *f as u8 == v)
    }

    pub fn parse_token(s: &str) -> Option<Self> {
        Some(match s {
            "Zero" => Self::Zero,
            "One" => Self::One,
            "SrcColor" => Self::SrcColor,
            "OneMinusSrcColor" => Self::OneMinusSrcColor,
            "DstColor" => Self::DstColor,
            "OneMinusDstColor" => Self::OneMinusDstColor,
            "SrcAlpha" => Self::SrcAlpha,
            "OneMinusSrcAlpha" => Self::OneMinusSrcAlpha,
            "DstAlpha" => Self::DstAlpha,
            "OneMinusDstAlpha" => Self::OneMinusDstAlpha,
            _ => return None,
        })
    }
}

/// Blend equation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlendOp {
    Add = 0,
    Subtract = 1,
    ReverseSubtract = 2,
    Min = 3,
    Max = 4,
}

impl BlendOp {
    pub fn from_u8(v: u8) -> Option<Self> {
        use BlendOp::*;
        [Add, Subtract, ReverseSubtract, Min, Max]
            .into_iter()
            .find(|op| *op as u8 == v)
    }

    pub fn parse_token(s: &str) -> Option<Self> {
        Some(match s {
            "Add" => Self::Add,
            "Subtract" => Self::Subtract,
            "ReverseSubtract" => Self::ReverseSubtract,
            "Min" => Self::Min,
            "Max" => Self::Max,
            _ => return None,
        })
    }
}

/// Face culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CullMode {
    None = 0,
    Back = 1,
    Front = 2,
}

impl CullMode {
    pub fn from_u8(v: u8) -> Option<Self> {
        use CullMode::*;
        [None, Back, Front].into_iter().find(|c| *c as u8 == v)
    }

    pub fn parse_token(s: &str) -> Option<Self> {
        Some(match s {
            "None" => Self::None,
            "Back" => Self::Back,
            "Front" => Self::Front,
            _ => return None,
        })
    }
}

bitflags! {
    /// Per-channel color write mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorMask: u8 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
    }
}

impl ColorMask {
    pub const RGBA: Self = Self::all();

    /// Parses a mask token of letters drawn from `{R,G,B,A}`.
    pub fn parse_token(s: &str) -> Option<Self> {
        let mut mask = Self::empty();
        for c in s.chars() {
            mask |= match c {
                'R' => Self::R,
                'G' => Self::G,
                'B' => Self::B,
                'A' => Self::A,
                _ => return None,
            };
        }
        Some(mask)
    }
}

/// Fixed-function pipeline state declared by `#pragma vultra state …`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: CompareOp,

    pub cull: CullMode,

    pub blend_enable: bool,
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub color_op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub alpha_op: BlendOp,

    pub color_mask: ColorMask,
    pub alpha_to_coverage: bool,

    pub depth_bias_factor: f32,
    pub depth_bias_units: f32,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            depth_func: CompareOp::LessOrEqual,
            cull: CullMode::Back,
            blend_enable: false,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            color_op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            alpha_op: BlendOp::Add,
            color_mask: ColorMask::RGBA,
            alpha_to_coverage: false,
            depth_bias_factor: 0.0,
            depth_bias_units: 0.0,
        }
    }
}
