//! Block safety levels tracked per chain.

/// The safety level of a block.
///
/// Levels are totally ordered from the most confirmed ([`SafetyLevel::Finalized`]) to the least
/// confirmed ([`SafetyLevel::LocalUnsafe`]). `a < b` reads "`a` is at most as advanced as `b`":
/// on a consistent chain the head at a lower level never has a higher number than the head at a
/// higher level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SafetyLevel {
    /// The block is derived from finalized L1 data.
    #[cfg_attr(feature = "serde", serde(rename = "finalized"))]
    Finalized,
    /// The block is safe and all its cross-chain dependencies are safe.
    #[cfg_attr(feature = "serde", serde(rename = "safe"))]
    CrossSafe,
    /// The block is derived from L1 data but its dependencies are not yet verified.
    #[cfg_attr(feature = "serde", serde(rename = "local-safe"))]
    LocalSafe,
    /// The block is unsafe and all its cross-chain dependencies are at least cross-unsafe.
    #[cfg_attr(feature = "serde", serde(rename = "cross-unsafe"))]
    CrossUnsafe,
    /// The block has been accepted locally only.
    #[cfg_attr(feature = "serde", serde(rename = "unsafe"))]
    LocalUnsafe,
}

impl SafetyLevel {
    /// All levels, from the most to the least confirmed.
    pub const ALL: [Self; 5] =
        [Self::Finalized, Self::CrossSafe, Self::LocalSafe, Self::CrossUnsafe, Self::LocalUnsafe];
}

impl TryFrom<&str> for SafetyLevel {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "finalized" => Ok(Self::Finalized),
            "safe" => Ok(Self::CrossSafe),
            "local-safe" => Ok(Self::LocalSafe),
            "cross-unsafe" => Ok(Self::CrossUnsafe),
            "unsafe" => Ok(Self::LocalUnsafe),
            _ => Err(()),
        }
    }
}

impl core::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Finalized => write!(f, "finalized"),
            Self::CrossSafe => write!(f, "safe"),
            Self::LocalSafe => write!(f, "local-safe"),
            Self::CrossUnsafe => write!(f, "cross-unsafe"),
            Self::LocalUnsafe => write!(f, "unsafe"),
        }
    }
}
