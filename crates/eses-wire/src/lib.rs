//! On-wire structures for the ESES enclosure-services protocol.
//!
//! SES (like the rest of SCSI) is a big-endian protocol: every multi-byte
//! numeric field is stored most-significant byte first, and most records are
//! bit-packed into fixed layouts. This crate owns those layouts so the rest
//! of the emulator can work with typed, host-native values:
//!
//! - [`codec`]: bounds-checked big-endian readers/writers over byte regions
//! - [`page`]: the 8-byte common diagnostic-page header and page codes
//! - [`cdb`]: the SCSI command blocks the enclosure accepts
//! - [`sense`]: sense-data construction (sense key / ASC / ASCQ)
//! - [`element`]: the 4-byte status/control element records, one per kind
//! - [`download`]: microcode download control/status structures
//! - [`mode`]: mode parameter lists and the EMC vendor mode pages
//! - [`buf`]: READ/WRITE BUFFER descriptors
//!
//! Decoding never reads past the supplied region; a region shorter than the
//! structure it must hold fails with [`WireError::MalformedPage`].

pub mod buf;
pub mod cdb;
pub mod codec;
pub mod download;
pub mod element;
pub mod mode;
pub mod page;
pub mod sense;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WireError>;

/// Errors raised while encoding or decoding wire structures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The supplied region is shorter than the structure it must hold.
    #[error("malformed page: need {needed} bytes at offset {offset}, have {available}")]
    MalformedPage {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A field carries a value the protocol does not define.
    #[error("invalid field value: {0}")]
    InvalidField(&'static str),
}
