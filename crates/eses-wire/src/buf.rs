//! READ/WRITE BUFFER wire structures.

use crate::codec::ByteWriter;

/// Buffer types appearing in configuration-page buffer descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BufferType {
    Eeprom = 0,
    ActiveTrace = 1,
    SavedTrace = 2,
    EventLog = 3,
    SavedDump = 4,
    ActiveRam = 5,
    Registers = 6,
}

impl BufferType {
    pub fn from_u8(v: u8) -> Option<BufferType> {
        match v {
            0 => Some(BufferType::Eeprom),
            1 => Some(BufferType::ActiveTrace),
            2 => Some(BufferType::SavedTrace),
            3 => Some(BufferType::EventLog),
            4 => Some(BufferType::SavedDump),
            5 => Some(BufferType::ActiveRam),
            6 => Some(BufferType::Registers),
            _ => None,
        }
    }
}

/// Buffer descriptor carried in a subenclosure descriptor (4 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub buf_id: u8,
    pub buf_type: BufferType,
    pub writable: bool,
    pub buf_index: u8,
    pub buf_spec_info: u8,
}

impl BufferDescriptor {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b1 = self.buf_type as u8 & 0x7f;
        if self.writable {
            b1 |= 0x80;
        }
        [self.buf_id, b1, self.buf_index, self.buf_spec_info]
    }

    pub fn from_bytes(b: [u8; 4]) -> Option<BufferDescriptor> {
        Some(BufferDescriptor {
            buf_id: b[0],
            buf_type: BufferType::from_u8(b[1] & 0x7f)?,
            writable: b[1] & 0x80 != 0,
            buf_index: b[2],
            buf_spec_info: b[3],
        })
    }
}

/// READ BUFFER descriptor-mode response: alignment boundary plus a 24-bit
/// capacity.
pub fn encode_read_buffer_descriptor(offset_boundary: u8, capacity: u32) -> [u8; 4] {
    let mut w = ByteWriter::with_capacity(4);
    w.u8(offset_boundary);
    w.u8((capacity >> 16) as u8);
    w.u8((capacity >> 8) as u8);
    w.u8(capacity as u8);
    let v = w.into_vec();
    [v[0], v[1], v[2], v[3]]
}
