// Opaque collaborators: the transaction/policy object, the keyring, the
// OpenPGP signature parser, the digest engine, the lead/signature-header
// readers, and the legacy-header helpers this crate calls but does not
// implement.
//
// Kept as narrow traits so fakes can drive every branch of the selection
// matrix in tests.

use crate::error::{HdrResult, OrNotFound, Verdict};

/// Hash algorithm reported by the signature parser. The concrete set is
/// owned by the OpenPGP layer; this crate only needs to thread the value
/// from `parse_sig` through to [`DigestEngine::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgo {
    Sha1,
    Sha256,
    Other(u8),
}

/// Opaque signature parameters, as handed back by `parse_sig`.
/// `signer_id` is the 8-byte OpenPGP signer id; the package reader
/// extracts a 32-bit key id from its first four bytes.
#[derive(Debug, Clone)]
pub struct SigParams {
    pub hash_algo: HashAlgo,
    pub signer_id: [u8; 8],
    /// Parser-defined opaque payload, passed back to the keyring
    /// verbatim; this crate never inspects it.
    pub opaque: Vec<u8>,
}

impl SigParams {
    /// The key id: first four bytes of the signer id, big-endian.
    pub fn key_id(&self) -> u32 {
        u32::from_be_bytes(self.signer_id[0..4].try_into().unwrap())
    }
}

/// The OpenPGP signature parser (`parse_sig`): takes a tag-data slice,
/// yields hash algorithm + opaque signature parameters.
pub trait SignatureParser {
    fn parse_sig(&self, context: &'static str, tag_data: &[u8]) -> HdrResult<SigParams>;
}

/// A live digest computation. Fed bytes in the exact order the header-only
/// and package-level verification steps require; owned locally within one
/// verification call and always consumed (by [`Keyring::verify`]) before
/// that call returns, on every exit path.
pub trait DigestCtx {
    fn update(&mut self, data: &[u8]);
}

/// The digest engine (`DigestCtx::init/update/finalize`). `finalize` is
/// not exposed here: the keyring owns the ctx once handed it and
/// finalizes internally as part of `verify`.
pub trait DigestEngine {
    fn init(&self, algo: HashAlgo) -> Box<dyn DigestCtx>;
}

/// The keyring: an opaque signature verifier over a digest context plus
/// signature parameters.
pub trait Keyring {
    fn verify(&self, sig_tag_data: &[u8], params: &SigParams, ctx: Box<dyn DigestCtx>) -> Verdict;
}

/// Verification policy flags the transaction-set object supplies. Exposed
/// here as a trait rather than binding to a concrete `TS` type, since the
/// transaction-set object itself is out of scope.
pub trait VerifyPolicy {
    fn flags(&self) -> crate::package::VerifyFlags;
}

/// What the lead preamble reader hands back: just the lead type, the one
/// field the legacy retrofit cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadType {
    Binary,
    Source,
}

/// Reads the fixed-size lead preamble. Returns `NotFound` when the stream
/// looks like a text manifest rather than a package.
pub trait LeadReader {
    fn read_lead(&mut self) -> HdrResult<OrNotFound<LeadType>>;
}

/// Reads and validates the signature-header blob, including consuming
/// the 8-byte alignment padding after its data area.
pub trait SignatureHeaderReader {
    fn read_signature_header(&mut self) -> HdrResult<crate::blob::Blob>;
}

/// Upgrades an older header layout after load. Semantics are delegated,
/// not defined here.
pub trait LegacyConverter {
    fn retrofit_v3(&self, h: &mut crate::header::Header);
    fn compress_filelist(&self, h: &mut crate::header::Header);
}

/// `header_is_source`: whether a header describes a source package.
/// Modeled as a narrow collaborator so the retrofit step can call it
/// without this crate inventing header-content heuristics of its own.
pub trait SourceClassifier {
    fn is_source(&self, h: &crate::header::Header) -> bool;
}

/// `header_import`: takes ownership of a validated blob's bytes and
/// produces an independently reference-counted `Header`. The actual
/// tag-store representation is a higher-layer concern; this crate only
/// needs the ownership-transfer contract.
pub trait HeaderImporter {
    fn header_import(&self, blob: crate::blob::Blob) -> HdrResult<crate::header::Header>;
}
