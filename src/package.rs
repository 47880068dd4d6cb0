// Package reader: orchestrates lead, signature header, metadata header,
// header-only verification, header import, package-level verification,
// legacy retrofit, and the signature-header tag merge.

use std::io::Read;

use crate::blob::{hdrblob_init, Blob};
use crate::bounds::{hdrchk_data, hdrchk_tags};
use crate::collab::{
    DigestEngine, HeaderImporter, Keyring, LeadReader, LeadType, LegacyConverter,
    SignatureHeaderReader, SignatureParser, SourceClassifier,
};
use crate::error::{HdrError, HdrResult, OrNotFound, Verdict};
use crate::header::{Header, HeaderEntry};
use crate::sigverify;
use crate::tags::{
    TagType, EntryInfo, ENTRY_SIZE, HEADER_MAGIC, HEADER_SIGBASE, HEADER_TAGBASE, SIGTAG_DSA,
    SIGTAG_GPG, SIGTAG_MD5, SIGTAG_PAYLOADSIZE, SIGTAG_PGP, SIGTAG_PGP5, SIGTAG_RSA, SIGTAG_SHA1,
    SIGTAG_SIZE, TAG_ARCHIVESIZE, TAG_HEADERIMMUTABLE, TAG_OLDFILENAMES, TAG_SIGGPG, TAG_SIGMD5,
    TAG_SIGPGP, TAG_SIGPGP5, TAG_SIGSIZE, TAG_SOURCEPACKAGE, TAG_SOURCERPM,
};
use crate::verify_info::payload_byte_len;

bitflags::bitflags! {
    /// Verification policy flags (`vsflags`). Header-only flags gate the
    /// header-only digest/signature selection; the plain (non-`_HEADER`)
    /// flags gate package-level signature selection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VerifyFlags: u32 {
        const NO_SHA1_HEADER = 1 << 0;
        const NO_RSA_HEADER  = 1 << 1;
        const NO_DSA_HEADER  = 1 << 2;
        const NO_SHA1        = 1 << 3;
        const NO_RSA         = 1 << 4;
        const NO_DSA         = 1 << 5;
    }
}

/// Everything `read_package`/`read_package_file` need from the caller,
/// beyond the byte stream itself: the opaque collaborators this crate
/// calls but does not implement.
pub struct Collaborators<'a> {
    pub lead_reader: &'a mut dyn LeadReader,
    pub sig_header_reader: &'a mut dyn SignatureHeaderReader,
    pub sig_parser: &'a dyn SignatureParser,
    pub digest_engine: &'a dyn DigestEngine,
    pub keyring: &'a dyn Keyring,
    pub importer: &'a dyn HeaderImporter,
    pub legacy: &'a dyn LegacyConverter,
    pub source_classifier: &'a dyn SourceClassifier,
}

/// `header_check(bytes) -> (verdict, message)`: validate an
/// already-in-memory header blob, with no package/lead machinery
/// involved. Uses a loose (non-exact-size) blob so a standalone header
/// carrying trailing header-only digest/signature entries still
/// validates instead of being rejected outright.
pub fn header_check(
    bytes: &[u8],
    flags: VerifyFlags,
    sig_parser: &dyn SignatureParser,
    digest_engine: &dyn DigestEngine,
    keyring: &dyn Keyring,
) -> (Verdict, Option<String>) {
    match hdrblob_init(bytes, TAG_HEADERIMMUTABLE, false) {
        Err(e) => (Verdict::Fail, Some(e.message())),
        Ok(OrNotFound::NotFound) => (Verdict::Ok, Some("Header sanity check: OK".to_string())),
        Ok(OrNotFound::Found(blob)) => {
            if blob.il <= blob.ril {
                return (Verdict::Ok, Some("Header sanity check: OK".to_string()));
            }
            match sigverify::select_and_verify(&blob, flags, sig_parser, digest_engine, keyring) {
                Err(e) => (Verdict::Fail, Some(e.message())),
                Ok(OrNotFound::NotFound) => {
                    (Verdict::Ok, Some("Header sanity check: OK".to_string()))
                }
                Ok(OrNotFound::Found((verdict, _key_id))) => (verdict, None),
            }
        }
    }
}

/// Read 16 bytes (magic + `il` + `dl`), bounds-check before allocating,
/// then read the remainder and fully validate as an immutable-region
/// metadata header.
fn read_metadata_blob(fd: &mut dyn Read) -> HdrResult<Blob> {
    let mut prelude = [0u8; 16];
    fd.read_exact(&mut prelude)?;

    let il = i32::from_be_bytes(prelude[8..12].try_into().unwrap());
    let dl = i32::from_be_bytes(prelude[12..16].try_into().unwrap());

    if prelude[0..8] != HEADER_MAGIC {
        return Err(HdrError::BadMagic);
    }
    if hdrchk_tags(il) {
        return Err(HdrError::BadTagCount(il));
    }
    if hdrchk_data(dl) {
        return Err(HdrError::BadDataLen(dl));
    }

    let pvlen = 16 + ENTRY_SIZE * il as usize + dl as usize;
    let mut buf = vec![0u8; pvlen];
    buf[0..16].copy_from_slice(&prelude);
    fd.read_exact(&mut buf[16..])?;

    match hdrblob_init(&buf, TAG_HEADERIMMUTABLE, true)? {
        OrNotFound::Found(blob) => Ok(blob),
        OrNotFound::NotFound => Err(HdrError::NotImmutableHeader),
    }
}

/// `read_header(fd) -> (Header, verdict, message)`: read-and-validate-only
/// path for just a metadata header, with no signature-header/lead
/// involvement.
pub fn read_header(
    fd: &mut dyn Read,
    flags: VerifyFlags,
    sig_parser: &dyn SignatureParser,
    digest_engine: &dyn DigestEngine,
    keyring: &dyn Keyring,
    importer: &dyn HeaderImporter,
) -> HdrResult<(Header, Verdict, Option<String>)> {
    let blob = read_metadata_blob(fd)?;

    let (verdict, message) = if blob.il > blob.ril {
        match sigverify::select_and_verify(&blob, flags, sig_parser, digest_engine, keyring)? {
            OrNotFound::NotFound => (Verdict::Ok, None),
            OrNotFound::Found((v, _)) => (v, None),
        }
    } else {
        (Verdict::Ok, None)
    };

    let header = importer.header_import(blob)?;
    Ok((header, verdict, message))
}

/// Remap a legacy signature-header tag to its metadata-header-space
/// counterpart. `None` means "drop this tag entirely" (the
/// signature-space tags, once out of range).
fn remap_legacy_tag(tag: i32) -> Option<i32> {
    match tag {
        t if t == SIGTAG_SIZE => Some(TAG_SIGSIZE),
        t if t == SIGTAG_PGP => Some(TAG_SIGPGP),
        t if t == SIGTAG_MD5 => Some(TAG_SIGMD5),
        t if t == SIGTAG_GPG => Some(TAG_SIGGPG),
        t if t == SIGTAG_PGP5 => Some(TAG_SIGPGP5),
        t if t == SIGTAG_PAYLOADSIZE => Some(TAG_ARCHIVESIZE),
        t if t == SIGTAG_SHA1 || t == SIGTAG_DSA || t == SIGTAG_RSA => {
            if t >= HEADER_SIGBASE && t < HEADER_TAGBASE {
                Some(t)
            } else {
                None
            }
        }
        other => Some(other),
    }
}

/// Whether a remapped tag's `(type, count)` satisfies the admission
/// rules for merging into the destination header.
fn admissible(ty: TagType, count: i32) -> bool {
    if count < 0 || hdrchk_data(count) {
        return false;
    }
    match ty {
        TagType::StringArray | TagType::I18nString => false,
        TagType::String | TagType::Bin => count < 16384,
        t if t.is_scalar_integer() => count == 1,
        _ => true,
    }
}

/// Walk every entry of the signature header, remapping and admitting
/// legacy signature tags into `header`.
fn merge_signature_tags(header: &mut Header, sig_blob: &Blob) -> HdrResult<()> {
    for i in 0..sig_blob.il {
        let entry = sig_blob.entry(i)?;

        let dest_tag = match remap_legacy_tag(entry.tag) {
            Some(t) => t,
            None => continue,
        };
        if header.is_entry(dest_tag) {
            continue;
        }
        let ty = match TagType::from_u32(entry.ty) {
            Some(t) => t,
            None => continue,
        };
        if !admissible(ty, entry.count) {
            continue;
        }

        let len = payload_byte_len(sig_blob.data(), ty, entry.offset, entry.count)?;
        let start = entry.offset as usize;
        let data = sig_blob.data()[start..start + len].to_vec();
        header.put_if_absent(
            dest_tag,
            HeaderEntry {
                ty,
                count: entry.count,
                data,
            },
        );
    }
    Ok(())
}

/// Choose the first enabled package-level signature tag, in `DSA`, `RSA`,
/// `SHA1` order.
fn select_package_signature(sig_blob: &Blob, flags: VerifyFlags) -> HdrResult<Option<EntryInfo>> {
    let mut entries = Vec::with_capacity(sig_blob.il as usize);
    for i in 0..sig_blob.il {
        entries.push(sig_blob.entry(i)?);
    }
    let find = |tag: i32| entries.iter().find(|e| e.tag == tag).copied();

    if !flags.contains(VerifyFlags::NO_DSA) {
        if let Some(e) = find(SIGTAG_DSA) {
            return Ok(Some(e));
        }
    }
    if !flags.contains(VerifyFlags::NO_RSA) {
        if let Some(e) = find(SIGTAG_RSA) {
            return Ok(Some(e));
        }
    }
    if !flags.contains(VerifyFlags::NO_SHA1) {
        if let Some(e) = find(SIGTAG_SHA1) {
            return Ok(Some(e));
        }
    }
    Ok(None)
}

/// `read_package(fd, vsflags, ...) -> (Header, key_id, verdict, message)`.
/// Returns `NotFound` with no message when the stream doesn't look like a
/// package at all.
pub fn read_package(
    fd: &mut dyn Read,
    flags: VerifyFlags,
    collab: &mut Collaborators<'_>,
) -> HdrResult<OrNotFound<(Header, u32, Verdict, Option<String>)>> {
    // 1. Lead.
    let lead_type = match collab.lead_reader.read_lead()? {
        OrNotFound::Found(lt) => lt,
        OrNotFound::NotFound => return Ok(OrNotFound::NotFound),
    };

    // 2. Signature header.
    let sig_blob = collab.sig_header_reader.read_signature_header()?;

    // 3. Signature selection.
    let selected = select_package_signature(&sig_blob, flags)?;

    // 4. Metadata header.
    let meta_blob = read_metadata_blob(fd)?;

    // 5. Header-only verification.
    let (mut verdict, mut message) = if meta_blob.il > meta_blob.ril {
        match sigverify::select_and_verify(
            &meta_blob,
            flags,
            collab.sig_parser,
            collab.digest_engine,
            collab.keyring,
        )? {
            OrNotFound::NotFound => (Verdict::Ok, None),
            OrNotFound::Found((v, _)) => (v, None),
        }
    } else {
        (Verdict::Ok, None)
    };

    // 6. Header import.
    let mut header = collab.importer.header_import(meta_blob)?;

    let mut key_id = 0u32;

    // 7. Package-level verification.
    if let Some(entry) = selected {
        let data = sig_blob.data();
        let ty = TagType::from_u32(entry.ty).ok_or(HdrError::BadEntryType {
            tag: entry.tag,
            ty: entry.ty,
        })?;
        let len = payload_byte_len(data, ty, entry.offset, entry.count)?;
        let start = entry.offset as usize;
        let tag_data = &data[start..start + len];

        let sig_params = collab.sig_parser.parse_sig("package", tag_data)?;
        key_id = sig_params.key_id();

        let mut ctx = collab.digest_engine.init(sig_params.hash_algo);
        ctx.update(&HEADER_MAGIC);
        let immutable = header
            .get(TAG_HEADERIMMUTABLE)
            .expect("header_import always synthesizes HEADERIMMUTABLE");
        ctx.update(&immutable.data);

        verdict = collab.keyring.verify(tag_data, &sig_params, ctx);
        message = None;
    }

    // 8. Legacy retrofit.
    if lead_type == LeadType::Source
        && collab.source_classifier.is_source(&header)
        && !header.is_entry(TAG_SOURCEPACKAGE)
    {
        header.put(
            TAG_SOURCEPACKAGE,
            HeaderEntry {
                ty: TagType::Int32,
                count: 1,
                data: 1i32.to_be_bytes().to_vec(),
            },
        );
    }
    if !header.is_entry(TAG_SOURCEPACKAGE) && collab.source_classifier.is_source(&header) {
        header.put(
            TAG_SOURCERPM,
            HeaderEntry {
                ty: TagType::String,
                count: 1,
                data: b"(none)\0".to_vec(),
            },
        );
    }
    if !header.is_entry(TAG_HEADERIMMUTABLE) {
        collab.legacy.retrofit_v3(&mut header);
    } else if header.is_entry(TAG_OLDFILENAMES) {
        collab.legacy.compress_filelist(&mut header);
    }

    // 9. Merge signature-header tags.
    merge_signature_tags(&mut header, &sig_blob)?;

    // 10. Return.
    Ok(OrNotFound::Found((header, key_id, verdict, message)))
}

/// `read_package_file(fd, filename, vsflags, ...) -> (Header, verdict)`:
/// full package read plus the process-wide warn-once logging policy.
pub fn read_package_file(
    fd: &mut dyn Read,
    filename: &str,
    flags: VerifyFlags,
    collab: &mut Collaborators<'_>,
) -> HdrResult<OrNotFound<(Header, Verdict)>> {
    match read_package(fd, flags, collab) {
        Err(e) => {
            log::error!("{filename}: {}", e.message());
            Err(e)
        }
        Ok(OrNotFound::NotFound) => {
            log::warn!("{filename}: not a package");
            Ok(OrNotFound::NotFound)
        }
        Ok(OrNotFound::Found((header, key_id, verdict, message))) => {
            match verdict {
                Verdict::Ok => {
                    log::debug!("{filename}: {}", message.as_deref().unwrap_or("OK"));
                }
                Verdict::Fail => {
                    log::error!("{filename}: {}", message.as_deref().unwrap_or("FAIL"));
                }
                Verdict::NotFound => {
                    log::warn!("{filename}: {}", message.as_deref().unwrap_or("NOTFOUND"));
                }
                Verdict::NotTrusted | Verdict::NoKey => {
                    let warnset = crate::warnset::global();
                    if warnset.was_seen(key_id) {
                        log::debug!("{filename}: key {key_id:08x} {verdict}");
                    } else {
                        log::warn!("{filename}: key {key_id:08x} {verdict}");
                    }
                    warnset.record(key_id);
                }
            }
            Ok(OrNotFound::Found((header, verdict)))
        }
    }
}
