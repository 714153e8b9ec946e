use std::str::FromStr;

use crate::DomainError;

/// A content fingerprint that can decide whether two images look alike.
///
/// No symmetry or transitivity is assumed by callers: the list builder only
/// asks `current.is_similar(&previous)` for strictly adjacent images.
pub trait PerceptualHash {
    fn is_similar(&self, other: &Self) -> bool;
}

/// 64-bit perceptual fingerprint as stored in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHash(u64);

impl ImageHash {
    /// Maximum number of differing bits for two hashes to count as similar.
    pub const SIMILARITY_THRESHOLD: u32 = 10;

    pub fn new(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn distance(self, other: Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl PerceptualHash for ImageHash {
    fn is_similar(&self, other: &Self) -> bool {
        self.distance(*other) <= Self::SIMILARITY_THRESHOLD
    }
}

impl FromStr for ImageHash {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = value.trim();
        let digits = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
            .unwrap_or(digits);
        if digits.is_empty() || digits.len() > 16 {
            return Err(DomainError::InvalidHash(value.to_string()));
        }
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| DomainError::InvalidHash(value.to_string()))
    }
}

impl std::fmt::Display for ImageHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
