// The wire type domain and the fixed, four-field index-entry record every
// header's index area is built out of.

use nom::{
    combinator::map,
    number::complete::{be_i32, be_u32},
    sequence::tuple,
    IResult,
};

/// 8-byte magic sentinel every header blob must open with.
pub const HEADER_MAGIC: [u8; 8] = [0x8e, 0xad, 0xe8, 0x01, 0x00, 0x00, 0x00, 0x00];

/// Tag marking the immutable region (`HEADERIMMUTABLE`).
pub const REGIONTAG_IMMUTABLE: i32 = 63;
/// Tag marking the signature-header region (`HEADERSIGNATURES`).
pub const REGIONTAG_SIGNATURE: i32 = 62;

/// Header-only digest/signature tags, carried outside the immutable region.
pub const TAG_SHA1HEADER: i32 = 269;
pub const TAG_RSAHEADER: i32 = 268;
pub const TAG_DSAHEADER: i32 = 267;

/// Package-level signature-header tags.
pub const SIGTAG_SIZE: i32 = 1000;
pub const SIGTAG_PGP: i32 = 1002;
pub const SIGTAG_MD5: i32 = 1004;
pub const SIGTAG_GPG: i32 = 1005;
pub const SIGTAG_PGP5: i32 = 1006;
pub const SIGTAG_PAYLOADSIZE: i32 = 1007;
pub const SIGTAG_SHA1: i32 = 269;
pub const SIGTAG_DSA: i32 = 267;
pub const SIGTAG_RSA: i32 = 268;

/// Destination tags the legacy merge remaps signature-header entries to.
pub const TAG_SIGSIZE: i32 = 1000;
pub const TAG_SIGPGP: i32 = 1002;
pub const TAG_SIGMD5: i32 = 1004;
pub const TAG_SIGGPG: i32 = 1005;
pub const TAG_SIGPGP5: i32 = 1006;
pub const TAG_ARCHIVESIZE: i32 = 1046;

/// Signature-space bound: `SHA1`/`DSA`/`RSA` survive the legacy merge only
/// when they lie in `[SIGBASE, TAGBASE)`.
pub const HEADER_SIGBASE: i32 = -128;
pub const HEADER_TAGBASE: i32 = 1000;

pub const TAG_HEADERIMMUTABLE: i32 = REGIONTAG_IMMUTABLE;
pub const TAG_SOURCEPACKAGE: i32 = 1106;
pub const TAG_SOURCERPM: i32 = 1044;
pub const TAG_OLDFILENAMES: i32 = 1027;

/// The nine declared wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TagType {
    Null = 0,
    Char = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    String = 6,
    Bin = 7,
    StringArray = 8,
    I18nString = 9,
}

impl TagType {
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => TagType::Null,
            1 => TagType::Char,
            2 => TagType::Int8,
            3 => TagType::Int16,
            4 => TagType::Int32,
            5 => TagType::Int64,
            6 => TagType::String,
            7 => TagType::Bin,
            8 => TagType::StringArray,
            9 => TagType::I18nString,
            _ => return None,
        })
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Natural alignment of one element, in bytes. Variable-length byte
    /// types (`STRING`, `BIN`, the array types) need only byte alignment.
    pub fn alignment(self) -> usize {
        match self {
            TagType::Null => 1,
            TagType::Char | TagType::Int8 => 1,
            TagType::Int16 => 2,
            TagType::Int32 => 4,
            TagType::Int64 => 8,
            TagType::String | TagType::Bin | TagType::StringArray | TagType::I18nString => 1,
        }
    }

    /// Fixed per-element size for the scalar integer types; `None` for
    /// the variable-length byte/string/array types, whose total payload
    /// length must be derived some other way (`BIN` and region trailers
    /// carry an explicit byte count in `count`; `STRING`/`STRING_ARRAY`/
    /// `I18NSTRING` scan for a terminating NUL).
    pub fn fixed_element_size(self) -> Option<usize> {
        match self {
            TagType::Null => Some(0),
            TagType::Char | TagType::Int8 => Some(1),
            TagType::Int16 => Some(2),
            TagType::Int32 => Some(4),
            TagType::Int64 => Some(8),
            TagType::Bin => Some(1),
            TagType::String | TagType::StringArray | TagType::I18nString => None,
        }
    }

    pub fn is_scalar_integer(self) -> bool {
        matches!(
            self,
            TagType::Char | TagType::Int8 | TagType::Int16 | TagType::Int32 | TagType::Int64
        )
    }

    pub fn is_array_type(self) -> bool {
        matches!(self, TagType::StringArray | TagType::I18nString)
    }
}

/// One 16-byte index entry: `tag`/`type`/`offset`/`count`, network byte
/// order on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub tag: i32,
    pub ty: u32,
    pub offset: i32,
    pub count: i32,
}

pub const ENTRY_SIZE: usize = 16;

fn t_tag(buffer: &[u8]) -> IResult<&[u8], i32> {
    be_i32(buffer)
}

fn t_type(buffer: &[u8]) -> IResult<&[u8], u32> {
    be_u32(buffer)
}

fn t_offset(buffer: &[u8]) -> IResult<&[u8], i32> {
    be_i32(buffer)
}

fn t_count(buffer: &[u8]) -> IResult<&[u8], i32> {
    be_i32(buffer)
}

/// Parse one index entry. Byte order is converted at the accessor, never
/// cached pre-decoded: the blob never stores a byte-swapped copy.
pub fn parse_entry(buffer: &[u8]) -> IResult<&[u8], EntryInfo> {
    map(
        tuple((t_tag, t_type, t_offset, t_count)),
        |(tag, ty, offset, count)| EntryInfo {
            tag,
            ty,
            offset,
            count,
        },
    )(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_one_entry() {
        let bytes = [
            0x00, 0x00, 0x00, 0x3f, // tag = 63
            0x00, 0x00, 0x00, 0x07, // type = BIN
            0x00, 0x00, 0x00, 0x00, // offset = 0
            0x00, 0x00, 0x00, 0x10, // count = 16
        ];
        let (rest, entry) = parse_entry(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            entry,
            EntryInfo {
                tag: 63,
                ty: TagType::Bin.as_u32(),
                offset: 0,
                count: 16,
            }
        );
    }

    #[test]
    fn negative_offset_round_trips() {
        let bytes = [
            0x00, 0x00, 0x00, 0x3f, 0x00, 0x00, 0x00, 0x07, 0xff, 0xff, 0xff, 0xf0, // -16
            0x00, 0x00, 0x00, 0x10,
        ];
        let (_, entry) = parse_entry(&bytes).unwrap();
        assert_eq!(entry.offset, -16);
    }

    #[test]
    fn type_alignment_matches_declared_widths() {
        assert_eq!(TagType::Int64.alignment(), 8);
        assert_eq!(TagType::Int32.alignment(), 4);
        assert_eq!(TagType::Int16.alignment(), 2);
        assert_eq!(TagType::Bin.alignment(), 1);
    }

    #[test]
    fn unknown_type_rejected() {
        assert_eq!(TagType::from_u32(42), None);
    }
}
