use core::fmt;

use bitflags::bitflags;

/// A single shader pipeline stage.
///
/// The `u8` discriminants are part of the on-disk format (`.vshbin` header
/// flags, `.vshlib` TOC entries) and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ShaderStage {
    Vert = 0,
    Frag = 1,
    Comp = 2,
    Task = 3,
    Mesh = 4,
    Rgen = 5,
    Rmiss = 6,
    Rchit = 7,
    Rahit = 8,
    Rint = 9,
    /// Reserved sentinel; never valid in a library entry.
    Unknown = 255,
}

impl ShaderStage {
    /// All concrete stages, in discriminant order.
    pub const ALL: [ShaderStage; 10] = [
        Self::Vert,
        Self::Frag,
        Self::Comp,
        Self::Task,
        Self::Mesh,
        Self::Rgen,
        Self::Rmiss,
        Self::Rchit,
        Self::Rahit,
        Self::Rint,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| *s as u8 == v)
    }

    /// Parses the CLI / filename stage token (`vert`, `frag`, …).
    pub fn parse_token(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.token() == s)
    }

    /// The canonical lowercase token, as used in `-S` and filename suffixes.
    pub fn token(self) -> &'static str {
        match self {
            Self::Vert => "vert",
            Self::Frag => "frag",
            Self::Comp => "comp",
            Self::Task => "task",
            Self::Mesh => "mesh",
            Self::Rgen => "rgen",
            Self::Rmiss => "rmiss",
            Self::Rchit => "rchit",
            Self::Rahit => "rahit",
            Self::Rint => "rint",
            Self::Unknown => "unknown",
        }
    }

    /// True for the ray-tracing pipeline stages.
    pub fn is_ray_tracing(self) -> bool {
        matches!(
            self,
            Self::Rgen | Self::Rmiss | Self::Rchit | Self::Rahit | Self::Rint
        )
    }

    /// The stage as a single-bit flag set.
    pub fn flag(self) -> StageFlags {
        match self {
            Self::Vert => StageFlags::VERT,
            Self::Frag => StageFlags::FRAG,
            Self::Comp => StageFlags::COMP,
            Self::Task => StageFlags::TASK,
            Self::Mesh => StageFlags::MESH,
            Self::Rgen => StageFlags::RGEN,
            Self::Rmiss => StageFlags::RMISS,
            Self::Rchit => StageFlags::RCHIT,
            Self::Rahit => StageFlags::RAHIT,
            Self::Rint => StageFlags::RINT,
            Self::Unknown => StageFlags::empty(),
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

bitflags! {
    /// Bitmask of stages a symbol is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StageFlags: u32 {
        const VERT = 1 << 0;
        const FRAG = 1 << 1;
        const COMP = 1 << 2;
        const TASK = 1 << 3;
        const MESH = 1 << 4;
        const RGEN = 1 << 5;
        const RMISS = 1 << 6;
        const RCHIT = 1 << 7;
        const RAHIT = 1 << 8;
        const RINT = 1 << 9;
    }
}
