//! Mode parameter lists and the EMC ESES vendor mode pages.

use crate::codec::{ByteReader, ByteWriter};
use crate::{Result, WireError};

/// MODE SENSE/SELECT (10) parameter list header size.
pub const MODE_PARAM_LIST_HEADER_SIZE: usize = 8;

/// Common two-byte mode page header size.
pub const MODE_PAGE_HEADER_SIZE: usize = 2;

/// Size of each EMC ESES mode page including its header.
pub const EMC_ESES_MODE_PAGE_SIZE: usize = 16;

/// Value of the page-length byte of the EMC ESES mode pages (bytes following
/// the two-byte header).
pub const EMC_ESES_MODE_PAGE_LEN: u8 = 0x0e;

/// The mode parameter list header of a MODE SENSE/SELECT (10) transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeParameterListHeader {
    /// Bytes following this field; reserved (zero) on MODE SELECT.
    pub mode_data_length: u16,
    pub medium_type: u8,
    pub device_specific: u8,
    pub block_descriptor_length: u16,
}

impl ModeParameterListHeader {
    pub fn decode(buf: &[u8]) -> Result<ModeParameterListHeader> {
        let mut r = ByteReader::new(buf);
        let mode_data_length = r.u16_be()?;
        let medium_type = r.u8()?;
        let device_specific = r.u8()?;
        r.skip(2)?;
        let block_descriptor_length = r.u16_be()?;
        Ok(ModeParameterListHeader {
            mode_data_length,
            medium_type,
            device_specific,
            block_descriptor_length,
        })
    }

    pub fn encode(&self, w: &mut ByteWriter) {
        w.u16_be(self.mode_data_length);
        w.u8(self.medium_type);
        w.u8(self.device_specific);
        w.zeros(2);
        w.u16_be(self.block_descriptor_length);
    }
}

/// Header shared by every mode page: page code, SPF, PS and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModePageHeader {
    pub page_code: u8,
    pub spf: bool,
    /// Parameters-saveable: set on MODE SENSE for persistable pages,
    /// reserved on MODE SELECT.
    pub ps: bool,
    pub page_length: u8,
}

impl ModePageHeader {
    pub fn decode(buf: &[u8]) -> Result<ModePageHeader> {
        let mut r = ByteReader::new(buf);
        let b0 = r.u8()?;
        let page_length = r.u8()?;
        Ok(ModePageHeader {
            page_code: b0 & 0x3f,
            spf: b0 & 0x40 != 0,
            ps: b0 & 0x80 != 0,
            page_length,
        })
    }

    pub fn encode(&self, w: &mut ByteWriter) {
        let mut b0 = self.page_code & 0x3f;
        if self.spf {
            b0 |= 0x40;
        }
        if self.ps {
            b0 |= 0x80;
        }
        w.u8(b0);
        w.u8(self.page_length);
    }
}

/// EMC ESES persistent mode page (20h) parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistentModePage {
    pub bad_exp_recovery_enabled: bool,
    pub ha_mode: bool,
    pub ssu_disable: bool,
    pub disable_indicator_ctrl: bool,
}

impl PersistentModePage {
    /// Mask of the defined bits in parameter byte 2, for the changeable set.
    pub const CHANGEABLE_BYTE2: u8 = 0xf0;

    pub fn decode_body(body: &[u8]) -> Result<PersistentModePage> {
        if body.is_empty() {
            return Err(WireError::MalformedPage {
                offset: 0,
                needed: 1,
                available: 0,
            });
        }
        let b = body[0];
        Ok(PersistentModePage {
            bad_exp_recovery_enabled: b & 0x10 != 0,
            ha_mode: b & 0x20 != 0,
            ssu_disable: b & 0x40 != 0,
            disable_indicator_ctrl: b & 0x80 != 0,
        })
    }

    pub fn encode_body(&self, w: &mut ByteWriter) {
        let mut b = 0u8;
        if self.bad_exp_recovery_enabled {
            b |= 0x10;
        }
        if self.ha_mode {
            b |= 0x20;
        }
        if self.ssu_disable {
            b |= 0x40;
        }
        if self.disable_indicator_ctrl {
            b |= 0x80;
        }
        w.u8(b);
        w.zeros(13);
    }
}

/// EMC ESES non-persistent mode page (21h) parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NonPersistentModePage {
    pub sps_dev_supported: bool,
    pub include_drive_connectors: bool,
    pub disable_auto_shutdown: bool,
    pub disable_auto_cooling_ctrl: bool,
    pub activity_led_ctrl: bool,
    pub test_mode: bool,
}

impl NonPersistentModePage {
    pub const CHANGEABLE_BYTE2: u8 = 0xf9;

    pub fn decode_body(body: &[u8]) -> Result<NonPersistentModePage> {
        if body.is_empty() {
            return Err(WireError::MalformedPage {
                offset: 0,
                needed: 1,
                available: 0,
            });
        }
        let b = body[0];
        Ok(NonPersistentModePage {
            sps_dev_supported: b & 0x01 != 0,
            include_drive_connectors: b & 0x08 != 0,
            disable_auto_shutdown: b & 0x10 != 0,
            disable_auto_cooling_ctrl: b & 0x20 != 0,
            activity_led_ctrl: b & 0x40 != 0,
            test_mode: b & 0x80 != 0,
        })
    }

    pub fn encode_body(&self, w: &mut ByteWriter) {
        let mut b = 0u8;
        if self.sps_dev_supported {
            b |= 0x01;
        }
        if self.include_drive_connectors {
            b |= 0x08;
        }
        if self.disable_auto_shutdown {
            b |= 0x10;
        }
        if self.disable_auto_cooling_ctrl {
            b |= 0x20;
        }
        if self.activity_led_ctrl {
            b |= 0x40;
        }
        if self.test_mode {
            b |= 0x80;
        }
        w.u8(b);
        w.zeros(13);
    }
}
