// Region validator: confirms a blob opens with its expected region marker
// and that the 16-byte trailer at the offset it names points consistently
// back at the region's own size.

use crate::error::{HdrError, HdrResult, OrNotFound};
use crate::tags::TagType;
use crate::Blob;

const REGION_TAG_TYPE: u32 = TagType::Bin as u32;
const REGION_TAG_COUNT: i32 = 16;

/// Validate `blob`'s opening region marker and trailer, filling in `ril`
/// and `rdl` on success.
///
/// Returns `NotFound` when the first entry's tag is not `blob.region_tag`
/// -- not every blob is expected to open with every region.
pub fn validate_region(mut blob: Blob) -> HdrResult<OrNotFound<Blob>> {
    if blob.il < 1 {
        return Err(HdrError::RegionNoTags);
    }

    let einfo = blob.entry(0)?;

    if einfo.tag != blob.region_tag {
        return Ok(OrNotFound::NotFound);
    }

    if !(einfo.ty == REGION_TAG_TYPE && einfo.count == REGION_TAG_COUNT) {
        return Err(HdrError::RegionTagBad {
            tag: einfo.tag,
            ty: einfo.ty,
            offset: einfo.offset,
            count: einfo.count,
        });
    }

    if einfo.offset < 0 || (einfo.offset as i64 + REGION_TAG_COUNT as i64) > blob.dl as i64 {
        return Err(HdrError::RegionOffsetBad {
            tag: einfo.tag,
            ty: einfo.ty,
            offset: einfo.offset,
            count: einfo.count,
        });
    }

    let trailer_start = einfo.offset as usize;
    let trailer_bytes = &blob.data()[trailer_start..trailer_start + REGION_TAG_COUNT as usize];
    let (_, mut trailer) = crate::tags::parse_entry(trailer_bytes)
        .map_err(|_| HdrError::Malformed(trailer_start))?;
    let rdl = einfo.offset + REGION_TAG_COUNT;

    // The trailer stores its offset as the negative of the region's
    // byte length within `pe`.
    trailer.offset = -trailer.offset;

    if !(trailer.tag == blob.region_tag
        && trailer.ty == REGION_TAG_TYPE
        && trailer.count == REGION_TAG_COUNT)
    {
        return Err(HdrError::RegionTrailerBad {
            tag: trailer.tag,
            ty: trailer.ty,
            offset: trailer.offset,
            count: trailer.count,
        });
    }

    let ril = trailer.offset / crate::tags::ENTRY_SIZE as i32;
    if trailer.offset % crate::tags::ENTRY_SIZE as i32 != 0 || ril < 0 || ril > blob.il {
        return Err(HdrError::RegionSizeBad {
            region_tag: blob.region_tag,
            ril,
            il: blob.il,
            rdl,
            dl: blob.dl,
        });
    }

    if blob.exact_size && !(ril == blob.il && rdl == blob.dl) {
        return Err(HdrError::RegionExactSizeMismatch {
            region_tag: blob.region_tag,
            il: blob.il,
            ril,
            dl: blob.dl,
            rdl,
        });
    }

    blob.ril = ril;
    blob.rdl = rdl;

    Ok(OrNotFound::Found(blob))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::hdrblob_init;
    use pretty_assertions::assert_eq;

    fn word(v: i32) -> [u8; 4] {
        v.to_be_bytes()
    }

    fn region_blob(region_tag: i32, il: i32, dl: i32, trailer_offset: i32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&crate::tags::HEADER_MAGIC);
        bytes.extend_from_slice(&word(il));
        bytes.extend_from_slice(&word(dl));
        bytes.extend_from_slice(&word(region_tag));
        bytes.extend_from_slice(&word(7));
        bytes.extend_from_slice(&word(0));
        bytes.extend_from_slice(&word(16));
        // pad out the rest of the index area for il > 1
        for _ in 1..il {
            bytes.extend_from_slice(&word(0));
            bytes.extend_from_slice(&word(7));
            bytes.extend_from_slice(&word(0));
            bytes.extend_from_slice(&word(1));
        }
        bytes.extend_from_slice(&word(region_tag));
        bytes.extend_from_slice(&word(7));
        bytes.extend_from_slice(&word(trailer_offset));
        bytes.extend_from_slice(&word(16));
        for _ in 16..dl {
            bytes.push(0);
        }
        bytes
    }

    #[test]
    fn trailer_offset_not_divisible_by_16_fails() {
        let bytes = region_blob(62, 1, 16, -15);
        let err = hdrblob_init(&bytes, 62, false).unwrap_err();
        assert!(matches!(err, HdrError::RegionSizeBad { .. }));
    }

    #[test]
    fn exact_size_mismatch_is_rejected_for_package_headers() {
        let bytes = region_blob(63, 2, 32, -16);
        let err = hdrblob_init(&bytes, 63, true).unwrap_err();
        assert!(matches!(err, HdrError::RegionExactSizeMismatch { .. }));
    }

    #[test]
    fn non_exact_region_permits_trailing_entries() {
        let bytes = region_blob(62, 2, 32, -16);
        let blob = hdrblob_init(&bytes, 62, false).unwrap().found().unwrap();
        assert_eq!(blob.ril, 1);
        assert_eq!(blob.rdl, 16);
        assert_eq!(blob.il, 2);
    }
}
