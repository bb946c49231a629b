use crate::render_state::RenderState;

/// Well-known material semantic attached to a param or texture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Semantic {
    #[default]
    Unknown = 0,
    BaseColor = 1,
    Metallic = 2,
    Roughness = 3,
    Normal = 4,
    Emissive = 5,
    Occlusion = 6,
    Opacity = 7,
    AlphaClip = 8,
    Custom = 9,
}

impl Semantic {
    pub fn from_u32(v: u32) -> Option<Self> {
        use Semantic::*;
        [
            Unknown, BaseColor, Metallic, Roughness, Normal, Emissive, Occlusion, Opacity,
            AlphaClip, Custom,
        ]
        .into_iter()
        .find(|s| *s as u32 == v)
    }

    /// Parses the pragma token (`BaseColor`, `Metallic`, …).
    pub fn parse_token(s: &str) -> Option<Self> {
        Some(match s {
            "Unknown" => Self::Unknown,
            "BaseColor" => Self::BaseColor,
            "Metallic" => Self::Metallic,
            "Roughness" => Self::Roughness,
            "Normal" => Self::Normal,
            "Emissive" => Self::Emissive,
            "Occlusion" => Self::Occlusion,
            "Opacity" => Self::Opacity,
            "AlphaClip" => Self::AlphaClip,
            "Custom" => Self::Custom,
            _ => return None,
        })
    }
}

/// Scalar/vector/matrix type of a material parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParamType {
    #[default]
    Float = 0,
    Vec2 = 1,
    Vec3 = 2,
    Vec4 = 3,
    Int = 4,
    UInt = 5,
    Bool = 6,
    Mat3 = 7,
    Mat4 = 8,
}

impl ParamType {
    pub fn from_u8(v: u8) -> Option<Self> {
        use ParamType::*;
        [Float, Vec2, Vec3, Vec4, Int, UInt, Bool, Mat3, Mat4]
            .into_iter()
            .find(|t| *t as u8 == v)
    }
}

/// Dimensionality of a material texture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TextureType {
    Tex2D = 0,
    TexCube = 1,
    Tex3D = 2,
    Tex2DArray = 3,
    #[default]
    Unknown = 4,
}

impl TextureType {
    pub fn from_u8(v: u8) -> Option<Self> {
        use TextureType::*;
        [Tex2D, TexCube, Tex3D, Tex2DArray, Unknown]
            .into_iter()
            .find(|t| *t as u8 == v)
    }
}

/// Size of the packed default-value buffer; enough for a `mat4`.
pub const PARAM_DEFAULT_BYTES: usize = 64;

/// Declarative `[min, max]` UI range for a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

/// Packed default value for a parameter.
///
/// The pragma parser packs the literal floats little-endian; the concrete
/// `ty` is unresolved until the assembler rewrites it from reflection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDefault {
    pub ty: ParamType,
    pub bytes: [u8; PARAM_DEFAULT_BYTES],
}

impl ParamDefault {
    /// Packs up to 16 `f32` values little-endian; excess values are dropped.
    pub fn from_floats(values: &[f32]) -> Self {
        let mut bytes = [0u8; PARAM_DEFAULT_BYTES];
        for (i, v) in values.iter().take(16).enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        Self {
            ty: ParamType::Float,
            bytes,
        }
    }
}

impl Default for ParamDefault {
    fn default() -> Self {
        Self {
            ty: ParamType::Float,
            bytes: [0u8; PARAM_DEFAULT_BYTES],
        }
    }
}

/// One configurable material parameter, resolved against reflection.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialParamDesc {
    pub name: String,
    pub ty: ParamType,
    pub offset: u32,
    pub size: u32,
    pub semantic: Semantic,
    pub default: Option<ParamDefault>,
    pub range: Option<ParamRange>,
}

/// One material texture slot, resolved against reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialTextureDesc {
    pub name: String,
    pub ty: TextureType,
    pub set: u32,
    pub binding: u32,
    pub count: u32,
    pub semantic: Semantic,
}

/// The declarative view of a shader's configurable surface.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDescription {
    pub material_block_name: String,
    pub material_param_size: u32,
    pub params: Vec<MaterialParamDesc>,
    pub textures: Vec<MaterialTextureDesc>,
    pub render_state: RenderState,
}

impl Default for MaterialDescription {
    fn default() -> Self {
        Self {
            material_block_name: "Material".to_string(),
            material_param_size: 0,
            params: Vec::new(),
            textures: Vec::new(),
            render_state: RenderState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_packs_little_endian() {
        let def = ParamDefault::from_floats(&[1.0, 0.5]);
        assert_eq!(&def.bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&def.bytes[4..8], &0.5f32.to_le_bytes());
        assert!(def.bytes[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn default_caps_at_sixteen_values() {
        let values = [2.0f32; 20];
        let def = ParamDefault::from_floats(&values);
        assert_eq!(&def.bytes[60..64], &2.0f32.to_le_bytes());
    }

    #[test]
    fn semantic_tokens() {
        assert_eq!(Semantic::parse_token("BaseColor"), Some(Semantic::BaseColor));
        assert_eq!(Semantic::parse_token("basecolor"), None);
    }
}
