//! The ESES enclosure-services engine.
//!
//! A [`VirtualEnclosure`] stands in for one SAS enclosure's services
//! processor: it accepts the SCSI commands a real expander firmware would
//! (INQUIRY, SEND/RECEIVE DIAGNOSTIC, READ/WRITE BUFFER, MODE SENSE/SELECT)
//! and maintains the emulated hardware state those commands observe and
//! mutate — drive slots, expander phys, connectors, power supplies, cooling,
//! temperature sensors, displays.
//!
//! The engine is strictly synchronous: one command at a time per enclosure,
//! run to completion against caller-supplied byte regions. Callers serialize
//! commands per instance; the shared [`eses_registry::Registry`] is immutable
//! after startup and safe to share across instances.
//!
//! Side effects that reach outside the enclosure (drive login/logout, power
//! cycling) go through the [`SlotActuator`] seam supplied per command.

mod actuator;
mod buffers;
mod control_page;
mod dispatch;
mod download;
mod emc_page;
mod enclosure;
mod mode_pages;
mod state;
mod status_page;
#[cfg(test)]
mod test_util;

pub use actuator::SlotActuator;
pub use buffers::{BufferInfo, BufferSet};
pub use dispatch::CommandOutcome;
pub use download::{CompletedImage, DownloadState, DownloadStation};
pub use enclosure::VirtualEnclosure;
pub use mode_pages::{ModePageSet, ValueSet};
pub use state::ElementStateStore;

use eses_wire::sense::{
    SenseInfo, SenseKey, ASC_ENCLOSURE_SERVICES_TRANSFER_REFUSED,
    ASC_ENCLOSURE_SERVICES_UNAVAILABLE, ASC_INVALID_FIELD_IN_CDB,
    ASC_INVALID_FIELD_IN_PARAMETER_LIST, ASC_UNSUPPORTED_ENCLOSURE_FUNCTION,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EsesError>;

/// Command failures, each mapping to one sense triple.
///
/// Variants follow the error taxonomy of the services processor: bad
/// requests and protocol violations are the client's fault and leave state
/// untouched; [`EsesError::Internal`] marks a lookup the engine believed
/// could not fail and is reported as a NOT READY condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EsesError {
    #[error("unsupported diagnostic page {0:#04x}")]
    UnsupportedPage(u8),

    #[error("unsupported enclosure function: {0}")]
    UnsupportedFunction(&'static str),

    #[error("invalid field in CDB")]
    InvalidCdbField,

    #[error("invalid field in parameter list")]
    InvalidParameterField,

    #[error("transfer refused: {0}")]
    TransferRefused(&'static str),

    #[error("malformed parameter data: {0}")]
    Malformed(#[from] eses_wire::WireError),

    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl EsesError {
    /// The sense triple reported with the CHECK CONDITION status.
    pub fn sense(&self) -> SenseInfo {
        match self {
            EsesError::UnsupportedPage(_) | EsesError::UnsupportedFunction(_) => {
                SenseInfo::new(SenseKey::IllegalRequest, ASC_UNSUPPORTED_ENCLOSURE_FUNCTION)
            }
            EsesError::InvalidCdbField => {
                SenseInfo::new(SenseKey::IllegalRequest, ASC_INVALID_FIELD_IN_CDB)
            }
            EsesError::InvalidParameterField | EsesError::Malformed(_) => SenseInfo::new(
                SenseKey::IllegalRequest,
                ASC_INVALID_FIELD_IN_PARAMETER_LIST,
            ),
            EsesError::TransferRefused(_) => SenseInfo::new(
                SenseKey::IllegalRequest,
                ASC_ENCLOSURE_SERVICES_TRANSFER_REFUSED,
            ),
            EsesError::Internal(_) => {
                SenseInfo::new(SenseKey::NotReady, ASC_ENCLOSURE_SERVICES_UNAVAILABLE)
            }
        }
    }
}
