//! Command descriptor blocks accepted by the virtual enclosure.

use crate::{Result, WireError};

pub const OP_INQUIRY: u8 = 0x12;
pub const OP_RECEIVE_DIAGNOSTIC_RESULTS: u8 = 0x1c;
pub const OP_SEND_DIAGNOSTIC: u8 = 0x1d;
pub const OP_WRITE_BUFFER: u8 = 0x3b;
pub const OP_READ_BUFFER: u8 = 0x3c;
pub const OP_MODE_SELECT_10: u8 = 0x55;
pub const OP_MODE_SENSE_10: u8 = 0x5a;

/// READ BUFFER / WRITE BUFFER transfer modes the enclosure honors.
pub const BUF_MODE_DATA: u8 = 0x02;
pub const BUF_MODE_DESCRIPTOR: u8 = 0x03;

fn need(cdb: &[u8], len: usize) -> Result<()> {
    if cdb.len() < len {
        return Err(WireError::MalformedPage {
            offset: 0,
            needed: len,
            available: cdb.len(),
        });
    }
    Ok(())
}

fn u16_at(cdb: &[u8], off: usize) -> u16 {
    u16::from_be_bytes([cdb[off], cdb[off + 1]])
}

fn u24_at(cdb: &[u8], off: usize) -> u32 {
    (cdb[off] as u32) << 16 | (cdb[off + 1] as u32) << 8 | cdb[off + 2] as u32
}

/// INQUIRY (12h).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InquiryCdb {
    pub evpd: bool,
    pub page_code: u8,
    pub allocation_length: u16,
}

impl InquiryCdb {
    pub fn decode(cdb: &[u8]) -> Result<InquiryCdb> {
        need(cdb, 6)?;
        Ok(InquiryCdb {
            evpd: cdb[1] & 0x01 != 0,
            page_code: cdb[2],
            allocation_length: u16_at(cdb, 3),
        })
    }
}

/// RECEIVE DIAGNOSTIC RESULTS (1Ch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveDiagnosticCdb {
    pub page_code_valid: bool,
    pub page_code: u8,
    pub allocation_length: u16,
}

impl ReceiveDiagnosticCdb {
    pub fn decode(cdb: &[u8]) -> Result<ReceiveDiagnosticCdb> {
        need(cdb, 6)?;
        Ok(ReceiveDiagnosticCdb {
            page_code_valid: cdb[1] & 0x01 != 0,
            page_code: cdb[2],
            allocation_length: u16_at(cdb, 3),
        })
    }
}

/// SEND DIAGNOSTIC (1Dh).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendDiagnosticCdb {
    pub unit_offline: bool,
    pub device_offline: bool,
    pub self_test: bool,
    pub page_format: bool,
    pub self_test_code: u8,
    pub parameter_list_length: u16,
    pub control: u8,
}

impl SendDiagnosticCdb {
    pub fn decode(cdb: &[u8]) -> Result<SendDiagnosticCdb> {
        need(cdb, 6)?;
        Ok(SendDiagnosticCdb {
            unit_offline: cdb[1] & 0x01 != 0,
            device_offline: cdb[1] & 0x02 != 0,
            self_test: cdb[1] & 0x04 != 0,
            page_format: cdb[1] & 0x10 != 0,
            self_test_code: (cdb[1] >> 5) & 0x07,
            parameter_list_length: u16_at(cdb, 3),
            control: cdb[5],
        })
    }
}

/// READ BUFFER (3Ch) / WRITE BUFFER (3Bh) share a layout; only the length
/// field's meaning differs (allocation vs. parameter list length).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCdb {
    pub mode: u8,
    pub buffer_id: u8,
    pub buffer_offset: u32,
    pub length: u32,
}

impl BufferCdb {
    pub fn decode(cdb: &[u8]) -> Result<BufferCdb> {
        need(cdb, 10)?;
        Ok(BufferCdb {
            mode: cdb[1] & 0x1f,
            buffer_id: cdb[2],
            buffer_offset: u24_at(cdb, 3),
            length: u24_at(cdb, 6),
        })
    }
}

/// MODE SENSE (10) (5Ah).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSense10Cdb {
    pub dbd: bool,
    pub llbaa: bool,
    pub page_code: u8,
    /// Page control field: 0 current, 1 changeable, 2 default, 3 saved.
    pub pc: u8,
    pub subpage_code: u8,
    pub allocation_length: u16,
}

impl ModeSense10Cdb {
    pub fn decode(cdb: &[u8]) -> Result<ModeSense10Cdb> {
        need(cdb, 10)?;
        Ok(ModeSense10Cdb {
            dbd: cdb[1] & 0x08 != 0,
            llbaa: cdb[1] & 0x10 != 0,
            page_code: cdb[2] & 0x3f,
            pc: (cdb[2] >> 6) & 0x03,
            subpage_code: cdb[3],
            allocation_length: u16_at(cdb, 7),
        })
    }
}

/// MODE SELECT (10) (55h).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSelect10Cdb {
    pub save_pages: bool,
    pub page_format: bool,
    pub parameter_list_length: u16,
}

impl ModeSelect10Cdb {
    pub fn decode(cdb: &[u8]) -> Result<ModeSelect10Cdb> {
        need(cdb, 10)?;
        Ok(ModeSelect10Cdb {
            save_pages: cdb[1] & 0x01 != 0,
            page_format: cdb[1] & 0x10 != 0,
            parameter_list_length: u16_at(cdb, 7),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_diagnostic_fields() {
        // page_format set, parameter list 0x0204
        let cdb = [OP_SEND_DIAGNOSTIC, 0x10, 0x00, 0x02, 0x04, 0x00];
        let d = SendDiagnosticCdb::decode(&cdb).unwrap();
        assert!(d.page_format);
        assert!(!d.self_test);
        assert_eq!(d.self_test_code, 0);
        assert_eq!(d.parameter_list_length, 0x0204);
    }

    #[test]
    fn buffer_cdb_24_bit_fields() {
        let cdb = [
            OP_READ_BUFFER,
            BUF_MODE_DATA,
            0x03,
            0x00,
            0x10,
            0x00,
            0x00,
            0x02,
            0x00,
            0x00,
        ];
        let d = BufferCdb::decode(&cdb).unwrap();
        assert_eq!(d.mode, BUF_MODE_DATA);
        assert_eq!(d.buffer_id, 3);
        assert_eq!(d.buffer_offset, 0x1000);
        assert_eq!(d.length, 0x200);
    }

    #[test]
    fn mode_sense_page_control() {
        let cdb = [OP_MODE_SENSE_10, 0x08, 0xe0, 0x00, 0, 0, 0, 0x10, 0x00, 0];
        let d = ModeSense10Cdb::decode(&cdb).unwrap();
        assert!(d.dbd);
        assert_eq!(d.page_code, 0x20);
        assert_eq!(d.pc, 3);
    }

    #[test]
    fn truncated_cdb_rejected() {
        assert!(BufferCdb::decode(&[OP_READ_BUFFER, 0x02, 0x00]).is_err());
    }
}
