// `Blob`: an in-memory, bounds-checked view over a header. A fixed prelude
// (magic, tag count, data length) followed by a variable-length run of
// fixed-size index entries and a data area, parsed straight off a byte
// buffer. `Blob` owns one buffer and hands out bounds-checked sub-slices;
// entries are decoded at the accessor, never cached pre-decoded.

use nom::{combinator::map, number::complete::be_i32, sequence::tuple, IResult};

use crate::bounds::{hdrchk_data, hdrchk_range, hdrchk_tags};
use crate::error::{HdrError, HdrResult, OrNotFound};
use crate::region::validate_region;
use crate::tags::{parse_entry, EntryInfo, ENTRY_SIZE, HEADER_MAGIC};
use crate::verify_info::verify_info;

/// A parsed, bounds-checked header blob.
///
/// Owns its bytes. Once constructed by [`hdrblob_init`] and validated, its
/// entries may be read but never mutated.
#[derive(Debug)]
pub struct Blob {
    bytes: Vec<u8>,
    pub region_tag: i32,
    pub exact_size: bool,
    pub il: i32,
    pub dl: i32,
    /// Region index-entry count; filled in by the region validator.
    pub ril: i32,
    /// Region data-area byte length; filled in by the region validator.
    pub rdl: i32,
}

fn t_word(buffer: &[u8]) -> IResult<&[u8], i32> {
    be_i32(buffer)
}

fn parse_prelude(buffer: &[u8]) -> IResult<&[u8], ([u8; 8], i32, i32)> {
    map(
        tuple((nom::bytes::complete::take(8usize), t_word, t_word)),
        |(magic, il, dl): (&[u8], i32, i32)| {
            let mut m = [0u8; 8];
            m.copy_from_slice(magic);
            (m, il, dl)
        },
    )(buffer)
}

/// Byte length of the fixed prelude every blob opens with: the 8-byte
/// magic sentinel plus the `il`/`dl` words.
const PRELUDE_SIZE: usize = 16;

impl Blob {
    pub fn pvlen(&self) -> usize {
        PRELUDE_SIZE + ENTRY_SIZE * self.il as usize + self.dl as usize
    }

    /// The raw index-entry area, `16 * il` bytes.
    pub fn pe_bytes(&self) -> &[u8] {
        let start = PRELUDE_SIZE;
        let end = start + ENTRY_SIZE * self.il as usize;
        &self.bytes[start..end]
    }

    /// The raw data area, `dl` bytes.
    pub fn data(&self) -> &[u8] {
        let start = PRELUDE_SIZE + ENTRY_SIZE * self.il as usize;
        &self.bytes[start..]
    }

    /// Decode index entry `i`, converting from network byte order on
    /// access. Bounds-checked against `il`.
    pub fn entry(&self, i: i32) -> HdrResult<EntryInfo> {
        if hdrchk_range(self.il - 1, i) {
            return Err(HdrError::Malformed(PRELUDE_SIZE + ENTRY_SIZE * i.max(0) as usize));
        }
        let start = i as usize * ENTRY_SIZE;
        let slice = &self.pe_bytes()[start..start + ENTRY_SIZE];
        let (_, entry) = parse_entry(slice).map_err(|_| HdrError::Malformed(start))?;
        Ok(entry)
    }

    /// Iterate the first `ril` entries (the immutable region's own index),
    /// used by the header-only digest.
    pub fn region_entries(&self) -> impl Iterator<Item = HdrResult<EntryInfo>> + '_ {
        (0..self.ril).map(move |i| self.entry(i))
    }

    /// Iterate entries `[ril, il)`: everything outside the immutable
    /// region, where header-only signatures/digests live.
    pub fn trailing_entries(&self) -> impl Iterator<Item = HdrResult<(i32, EntryInfo)>> + '_ {
        (self.ril..self.il).map(move |i| self.entry(i).map(|e| (i, e)))
    }

    /// Hand the owned buffer over to the caller, consuming the blob: after
    /// this call nothing inside the blob retains a reference into the
    /// bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Build and fully validate a `Blob`.
///
/// `region_tag` is the tag the blob is expected to open with (the
/// immutable region for a package-file header, the signature region for
/// a signature header). `exact_size` requires the region to cover the
/// entire blob; only package-file metadata headers set this.
///
/// Returns `NotFound` (not an error) when the blob is otherwise
/// structurally sound but its first entry does not open with
/// `region_tag` -- the caller may treat this as "no region here".
pub fn hdrblob_init(buf: &[u8], region_tag: i32, exact_size: bool) -> HdrResult<OrNotFound<Blob>> {
    if buf.len() < 16 {
        return Err(HdrError::BadMagic);
    }

    let (rest, (magic, il, dl)) = parse_prelude(buf).map_err(|_| HdrError::BadMagic)?;
    let _ = rest;

    if magic != HEADER_MAGIC {
        return Err(HdrError::BadMagic);
    }
    if hdrchk_tags(il) {
        return Err(HdrError::BadTagCount(il));
    }
    if hdrchk_data(dl) {
        return Err(HdrError::BadDataLen(dl));
    }

    let pvlen = PRELUDE_SIZE + ENTRY_SIZE * il as usize + dl as usize;
    if buf.len() != pvlen {
        return Err(HdrError::BadBlobSize {
            uc: buf.len(),
            il,
            dl,
        });
    }

    let blob = Blob {
        bytes: buf.to_vec(),
        region_tag,
        exact_size,
        il,
        dl,
        ril: 0,
        rdl: 0,
    };

    let blob = match validate_region(blob)? {
        OrNotFound::Found(b) => b,
        OrNotFound::NotFound => return Ok(OrNotFound::NotFound),
    };

    verify_info(&blob)?;

    Ok(OrNotFound::Found(blob))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn word(v: i32) -> [u8; 4] {
        v.to_be_bytes()
    }

    fn minimal_signature_blob() -> Vec<u8> {
        // il=1, dl=16: one region-opening entry, whose data is the
        // 16-byte trailer pointing back at itself.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&HEADER_MAGIC);
        bytes.extend_from_slice(&word(1)); // il
        bytes.extend_from_slice(&word(16)); // dl
        bytes.extend_from_slice(&word(62)); // tag = region tag
        bytes.extend_from_slice(&word(7)); // type = BIN
        bytes.extend_from_slice(&word(0)); // offset
        bytes.extend_from_slice(&word(16)); // count
        bytes.extend_from_slice(&word(62)); // trailer tag
        bytes.extend_from_slice(&word(7)); // trailer type
        bytes.extend_from_slice(&word(-16)); // trailer offset
        bytes.extend_from_slice(&word(16)); // trailer count
        bytes
    }

    #[test]
    fn minimal_signature_header_is_ok() {
        let bytes = minimal_signature_blob();
        let blob = hdrblob_init(&bytes, 62, false).unwrap().found().unwrap();
        assert_eq!(blob.ril, 1);
        assert_eq!(blob.rdl, 16);
        assert_eq!(blob.pvlen(), bytes.len());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = minimal_signature_blob();
        bytes[0] = 0;
        assert_eq!(
            hdrblob_init(&bytes, 62, false).unwrap_err(),
            HdrError::BadMagic
        );
    }

    #[test]
    fn wrong_blob_size_is_rejected() {
        let mut bytes = minimal_signature_blob();
        bytes.push(0);
        assert!(matches!(
            hdrblob_init(&bytes, 62, false).unwrap_err(),
            HdrError::BadBlobSize { .. }
        ));
    }

    #[test]
    fn unexpected_region_tag_is_not_found() {
        let bytes = minimal_signature_blob();
        let result = hdrblob_init(&bytes, 63, false).unwrap();
        assert!(result.is_not_found());
    }

    #[test]
    fn zero_tags_fails_before_region_check() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&HEADER_MAGIC);
        bytes.extend_from_slice(&word(0));
        bytes.extend_from_slice(&word(0));
        assert_eq!(
            hdrblob_init(&bytes, 62, false).unwrap_err(),
            HdrError::BadTagCount(0)
        );
    }
}
