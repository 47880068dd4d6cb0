//! Parser and verifier for a software-package archive's tag-indexed header
//! blob: bounds-checked parsing, immutable-region validation, and
//! digest/signature verification against a caller-supplied keyring.
//!
//! Producing or signing headers, and everything above the single package
//! file (transactions, installs, databases, the CLI) is out of scope --
//! see the module docs on [`collab`] for the traits this crate expects its
//! caller to supply.

pub mod bounds;
pub mod tags;
pub mod blob;
pub mod region;
pub mod verify_info;
pub mod collab;
pub mod sigverify;
pub mod header;
pub mod warnset;
pub mod package;
pub mod error;

pub use blob::Blob;
pub use error::{HdrError, Verdict};
pub use package::{header_check, read_header, read_package, read_package_file, VerifyFlags};
