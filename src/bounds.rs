// Pure bounds predicates, tiny free functions over integers only. These run
// before any allocation sized off an attacker-controlled count: a blob that
// claims a billion tags must be rejected here, not after `il * 16` bytes
// have already been requested from the allocator.

use crate::tags::TagType;

/// Absurdly large but still finite upper bound on index-entry count.
/// Chosen well above any legitimate header (real-world headers carry at
/// most a few thousand tags) while still bounding worst-case allocation
/// to a few hundred MB even on an all-entries-maximal blob.
pub const MAX_TAGS: i32 = 1_000_000;

/// Upper bound on the data-area byte length.
pub const MAX_DATA_LEN: i32 = 256 * 1024 * 1024;

/// True if `il` is negative, zero, or exceeds [`MAX_TAGS`].
pub fn hdrchk_tags(il: i32) -> bool {
    il <= 0 || il > MAX_TAGS
}

/// True if `dl` is negative or exceeds [`MAX_DATA_LEN`].
///
/// Unlike `hdrchk_tags`, `dl == 0` is legal: a region can carry its
/// 16-byte trailer and nothing else lives alongside it when `il == 1`.
pub fn hdrchk_data(dl: i32) -> bool {
    dl < 0 || dl > MAX_DATA_LEN
}

/// True when `value` does not lie in `[0, limit]`.
pub fn hdrchk_range(limit: i32, value: i32) -> bool {
    value < 0 || value > limit
}

/// True when `t` is not one of the nine declared wire types.
pub fn hdrchk_type(t: u32) -> bool {
    TagType::from_u32(t).is_none()
}
