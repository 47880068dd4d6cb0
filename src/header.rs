// The owned `Header` object `header_import` produces from a validated
// `Blob`. Once imported, nothing in the header retains a reference into
// the original byte buffer: every entry's payload is copied out.

use std::collections::BTreeMap;

use crate::error::{HdrError, HdrResult};
use crate::tags::{TagType, TAG_HEADERIMMUTABLE};
use crate::verify_info::payload_byte_len;
use crate::Blob;

#[derive(Debug, Clone)]
pub struct HeaderEntry {
    pub ty: TagType,
    pub count: i32,
    pub data: Vec<u8>,
}

/// An independently reference-counted, fully owned header.
#[derive(Debug, Default)]
pub struct Header {
    entries: BTreeMap<i32, HeaderEntry>,
}

impl Header {
    /// `header_import`: copy every entry's payload out of a validated
    /// blob, plus synthesize the `HEADERIMMUTABLE` tag's self-contained
    /// region serialization (`ril`, `rdl`, the region's own index
    /// entries, and its data bytes -- the same ingredients the
    /// header-only digest covers, minus the leading magic, which the
    /// package-level digest step prepends itself).
    pub fn from_blob(blob: Blob) -> HdrResult<Header> {
        let mut entries = BTreeMap::new();

        let ril = blob.ril;
        let rdl = blob.rdl;
        let mut region_bytes = Vec::with_capacity(8 + 16 * ril as usize + rdl as usize);
        region_bytes.extend_from_slice(&ril.to_be_bytes());
        region_bytes.extend_from_slice(&rdl.to_be_bytes());
        region_bytes.extend_from_slice(&blob.pe_bytes()[0..16 * ril as usize]);
        region_bytes.extend_from_slice(&blob.data()[0..rdl as usize]);

        for i in 0..blob.il {
            let entry = blob.entry(i)?;
            let ty = TagType::from_u32(entry.ty).ok_or(HdrError::BadEntryType {
                tag: entry.tag,
                ty: entry.ty,
            })?;
            let len = payload_byte_len(blob.data(), ty, entry.offset, entry.count)?;
            let start = entry.offset as usize;
            let data = blob.data()[start..start + len].to_vec();
            entries.insert(
                entry.tag,
                HeaderEntry {
                    ty,
                    count: entry.count,
                    data,
                },
            );
        }

        entries.insert(
            TAG_HEADERIMMUTABLE,
            HeaderEntry {
                ty: TagType::Bin,
                count: region_bytes.len() as i32,
                data: region_bytes,
            },
        );

        Ok(Header { entries })
    }

    pub fn is_entry(&self, tag: i32) -> bool {
        self.entries.contains_key(&tag)
    }

    pub fn get(&self, tag: i32) -> Option<&HeaderEntry> {
        self.entries.get(&tag)
    }

    /// Insert only when `tag` is not already present. Returns whether the
    /// insert happened, used by the legacy-signature merge to skip a tag
    /// the destination header already carries.
    pub fn put_if_absent(&mut self, tag: i32, entry: HeaderEntry) -> bool {
        if self.entries.contains_key(&tag) {
            return false;
        }
        self.entries.insert(tag, entry);
        true
    }

    pub fn put(&mut self, tag: i32, entry: HeaderEntry) {
        self.entries.insert(tag, entry);
    }
}
