// Error taxonomy and the small closed `Verdict` enumeration higher layers
// see.
//
// The original C core threads a `char **msg` out-parameter through every
// validation routine and returns an `rpmRC` success/failure code. This
// generalizes that into a proper `Result<T, HdrError>` for structural
// failures (blob/region/index-verifier errors) plus a standalone
// `Verdict` for the crypto-verification outcome.

use std::fmt;

/// Every way blob construction, region validation, or index verification
/// can fail. Each variant's `Display` mirrors the corresponding
/// `rasprintf` message in `lib/package.c` so log output stays legible to
/// anyone who has debugged the original format.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HdrError {
    #[error("hdr magic: BAD")]
    BadMagic,

    #[error("hdr tags: BAD, no. of tags({0}) out of range")]
    BadTagCount(i32),

    #[error("hdr data: BAD, no. of bytes({0}) out of range")]
    BadDataLen(i32),

    #[error("blob size({uc}): BAD, 16 + 16 * il({il}) + dl({dl})")]
    BadBlobSize { uc: usize, il: i32, dl: i32 },

    #[error("region: no tags")]
    RegionNoTags,

    #[error("region tag: BAD, tag {tag} type {ty} offset {offset} count {count}")]
    RegionTagBad {
        tag: i32,
        ty: u32,
        offset: i32,
        count: i32,
    },

    #[error("region offset: BAD, tag {tag} type {ty} offset {offset} count {count}")]
    RegionOffsetBad {
        tag: i32,
        ty: u32,
        offset: i32,
        count: i32,
    },

    #[error("region trailer: BAD, tag {tag} type {ty} offset {offset} count {count}")]
    RegionTrailerBad {
        tag: i32,
        ty: u32,
        offset: i32,
        count: i32,
    },

    #[error("region {region_tag} size: BAD, ril {ril} il {il} rdl {rdl} dl {dl}")]
    RegionSizeBad {
        region_tag: i32,
        ril: i32,
        il: i32,
        rdl: i32,
        dl: i32,
    },

    #[error("region {region_tag}: tag number mismatch il {il} ril {ril} dl {dl} rdl {rdl}")]
    RegionExactSizeMismatch {
        region_tag: i32,
        il: i32,
        ril: i32,
        dl: i32,
        rdl: i32,
    },

    #[error("hdr type: BAD, tag {tag} type {ty}")]
    BadEntryType { tag: i32, ty: u32 },

    #[error("hdr data: BAD, tag {tag} offset {offset} count {count} overflows dl {dl}")]
    DataOverflow {
        tag: i32,
        offset: i32,
        count: i32,
        dl: i32,
    },

    #[error("hdr tags: BAD, tag {tag} offset {offset} is not {align}-byte aligned")]
    Misaligned { tag: i32, offset: i32, align: usize },

    #[error("hdr tags: BAD, tag {tag} offset {offset} not monotonic with previous entry")]
    NotMonotonic { tag: i32, offset: i32 },

    #[error("hdr tags: BAD, tag {tag} string value not NUL terminated within data area")]
    StringNotTerminated { tag: i32 },

    #[error("hdr size({expected}): BAD, read returned {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("hdr load: BAD")]
    ImportFailed,

    #[error("hdr region: metadata header has no immutable region")]
    NotImmutableHeader,

    #[error("sig parse({context}): BAD: {reason}")]
    SignatureParse { context: &'static str, reason: String },

    #[error("{0}")]
    Io(String),

    #[error("parse error at offset {0}")]
    Malformed(usize),
}

impl From<std::io::Error> for HdrError {
    fn from(e: std::io::Error) -> Self {
        HdrError::Io(e.to_string())
    }
}

impl HdrError {
    /// Render the way `rasprintf`'s `*msg` out-parameter would have:
    /// one line, no trailing newline.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// The verdict returned to callers.
///
/// `NotFound` is not failure: it signals "this input is not what we
/// expected" (no region marker, no header-only crypto candidate, stream
/// doesn't look like a package at all) and callers are expected to
/// recover from it in specific places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Ok,
    NotFound,
    NotTrusted,
    NoKey,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Ok => "OK",
            Verdict::NotFound => "NOTFOUND",
            Verdict::NotTrusted => "NOTTRUSTED",
            Verdict::NoKey => "NOKEY",
            Verdict::Fail => "FAIL",
        };
        f.write_str(s)
    }
}

/// A validated result that is allowed to be legitimately absent, as
/// opposed to a hard parse/structural failure. Used by the region
/// validator (no region-marker tag present) and the header-only
/// signature selector (no recognised tag present): both cases are
/// `NotFound`, not `HdrError`.
#[derive(Debug)]
pub enum OrNotFound<T> {
    Found(T),
    NotFound,
}

impl<T> OrNotFound<T> {
    pub fn found(self) -> Option<T> {
        match self {
            OrNotFound::Found(v) => Some(v),
            OrNotFound::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OrNotFound::NotFound)
    }
}

pub type HdrResult<T> = Result<T, HdrError>;
