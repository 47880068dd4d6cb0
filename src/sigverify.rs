// Header-only signature selection and verification: walks the entries
// trailing the immutable region, picks the strongest enabled digest or
// signature tag, and verifies it over the region's own bytes.

use crate::blob::Blob;
use crate::collab::{DigestEngine, Keyring, SignatureParser};
use crate::error::{HdrError, HdrResult, OrNotFound, Verdict};
use crate::package::VerifyFlags;
use crate::tags::{TagType, HEADER_MAGIC, TAG_DSAHEADER, TAG_RSAHEADER, TAG_SHA1HEADER};
use crate::verify_info::payload_byte_len;

/// Select the strongest enabled header-only digest/signature tag in
/// `blob.pe[ril..il]` and verify it, returning `NotFound` when there is
/// no such tag -- the caller treats that as "sanity check passed, no
/// crypto available".
///
/// Precondition: `blob.il > blob.ril` (checked by the caller); an empty
/// trailing range here just returns `NotFound`.
pub fn select_and_verify(
    blob: &Blob,
    flags: VerifyFlags,
    sig_parser: &dyn SignatureParser,
    digest_engine: &dyn DigestEngine,
    keyring: &dyn Keyring,
) -> HdrResult<OrNotFound<(Verdict, u32)>> {
    let mut chosen = None;

    for pair in blob.trailing_entries() {
        let (_, entry) = pair?;
        match entry.tag {
            TAG_SHA1HEADER if !flags.contains(VerifyFlags::NO_SHA1_HEADER) && chosen.is_none() => {
                chosen = Some(entry);
            }
            TAG_RSAHEADER if !flags.contains(VerifyFlags::NO_RSA_HEADER) => {
                chosen = Some(entry);
            }
            TAG_DSAHEADER if !flags.contains(VerifyFlags::NO_DSA_HEADER) => {
                chosen = Some(entry);
            }
            _ => {}
        }
    }

    let entry = match chosen {
        Some(e) => e,
        None => return Ok(OrNotFound::NotFound),
    };

    let data = blob.data();
    let ty = TagType::from_u32(entry.ty).ok_or(HdrError::BadEntryType {
        tag: entry.tag,
        ty: entry.ty,
    })?;
    let len = payload_byte_len(data, ty, entry.offset, entry.count)?;
    let start = entry.offset as usize;
    let tag_data = &data[start..start + len];

    let sig_params = sig_parser.parse_sig("header-only", tag_data)?;
    let mut ctx = digest_engine.init(sig_params.hash_algo);

    // magic, then ril/rdl, then the region's own index entries, then the
    // region's data bytes.
    ctx.update(&HEADER_MAGIC);
    ctx.update(&blob.ril.to_be_bytes());
    ctx.update(&blob.rdl.to_be_bytes());
    ctx.update(&blob.pe_bytes()[0..16 * blob.ril as usize]);
    ctx.update(&data[0..blob.rdl as usize]);

    let verdict = keyring.verify(tag_data, &sig_params, ctx);
    Ok(OrNotFound::Found((verdict, sig_params.key_id())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::hdrblob_init;
    use crate::collab::fakes::{FixedKeyring, FixedSigParser, NullDigestEngine};
    use crate::collab::HashAlgo;
    use pretty_assertions::assert_eq;

    fn word(v: i32) -> [u8; 4] {
        v.to_be_bytes()
    }

    /// A package-style blob: one-entry immutable region (`ril=1`,
    /// `rdl=16`) followed by one trailing `SHA1HEADER` entry.
    fn blob_with_header_only_sha1() -> Vec<u8> {
        let mut bytes = Vec::new();
        let il = 2i32;
        let mut data = vec![0u8; 16]; // region trailer lives here
        let sha1_payload = b"deadbeef\0";
        let sha1_offset = data.len() as i32;
        data.extend_from_slice(sha1_payload);
        let dl = data.len() as i32;

        bytes.extend_from_slice(&HEADER_MAGIC);
        bytes.extend_from_slice(&word(il));
        bytes.extend_from_slice(&word(dl));
        bytes.extend_from_slice(&word(63));
        bytes.extend_from_slice(&word(7));
        bytes.extend_from_slice(&word(0));
        bytes.extend_from_slice(&word(16));
        bytes.extend_from_slice(&word(TAG_SHA1HEADER));
        bytes.extend_from_slice(&word(6)); // STRING
        bytes.extend_from_slice(&word(sha1_offset));
        bytes.extend_from_slice(&word(1));

        data[0..4].copy_from_slice(&word(63));
        data[4..8].copy_from_slice(&word(7));
        data[8..12].copy_from_slice(&word(-16));
        data[12..16].copy_from_slice(&word(16));
        bytes.extend_from_slice(&data);
        bytes
    }

    #[test]
    fn sha1_header_chosen_and_verified() {
        let bytes = blob_with_header_only_sha1();
        let blob = hdrblob_init(&bytes, 63, true).unwrap().found().unwrap();
        let sig_parser = FixedSigParser {
            hash_algo: HashAlgo::Sha1,
            signer_id: [0x01, 0x02, 0x03, 0x04, 0, 0, 0, 0],
        };
        let digest_engine = NullDigestEngine;
        let keyring = FixedKeyring(Verdict::Ok);
        let result = select_and_verify(&blob, VerifyFlags::empty(), &sig_parser, &digest_engine, &keyring)
            .unwrap()
            .found()
            .unwrap();
        assert_eq!(result.0, Verdict::Ok);
        assert_eq!(result.1, 0x01020304);
    }

    #[test]
    fn sha1_header_suppressed_by_policy_yields_not_found() {
        let bytes = blob_with_header_only_sha1();
        let blob = hdrblob_init(&bytes, 63, true).unwrap().found().unwrap();
        let sig_parser = FixedSigParser {
            hash_algo: HashAlgo::Sha1,
            signer_id: [0u8; 8],
        };
        let digest_engine = NullDigestEngine;
        let keyring = FixedKeyring(Verdict::Ok);
        let result = select_and_verify(
            &blob,
            VerifyFlags::NO_SHA1_HEADER,
            &sig_parser,
            &digest_engine,
            &keyring,
        )
        .unwrap();
        assert!(result.is_not_found());
    }
}
