//! Identified byte buffers served over READ/WRITE BUFFER.

use eses_registry::EnclosureConfig;
use eses_wire::buf::{encode_read_buffer_descriptor, BufferType};

use crate::{EsesError, Result};

// Capacities per buffer type.
const EEPROM_SIZE: usize = 4096;
const TRACE_BUF_SIZE: usize = 12 * 1024;
const EVENT_LOG_SIZE: usize = 8 * 1024;
const DEFAULT_BUF_SIZE: usize = 4096;

/// One identified buffer with its access attributes.
#[derive(Debug, Clone)]
pub struct BufferInfo {
    pub buf_id: u8,
    pub buf_type: BufferType,
    pub writable: bool,
    /// READ/WRITE BUFFER offsets must be multiples of `2^offset_boundary`.
    pub offset_boundary: u8,
    pub data: Vec<u8>,
}

impl BufferInfo {
    fn alignment(&self) -> u32 {
        1 << self.offset_boundary
    }
}

/// The enclosure's buffer set, seeded from the configuration page's buffer
/// descriptors.
#[derive(Debug, Clone)]
pub struct BufferSet {
    buffers: Vec<BufferInfo>,
}

impl BufferSet {
    pub fn new(config: &EnclosureConfig) -> BufferSet {
        let buffers = config
            .buffer_descriptors()
            .map(|(_, desc)| {
                let size = match desc.buf_type {
                    BufferType::Eeprom => EEPROM_SIZE,
                    BufferType::ActiveTrace | BufferType::SavedTrace => TRACE_BUF_SIZE,
                    BufferType::EventLog => EVENT_LOG_SIZE,
                    _ => DEFAULT_BUF_SIZE,
                };
                BufferInfo {
                    buf_id: desc.buf_id,
                    buf_type: desc.buf_type,
                    writable: desc.writable,
                    offset_boundary: 2,
                    data: vec![0; size],
                }
            })
            .collect();
        BufferSet { buffers }
    }

    pub fn get(&self, buf_id: u8) -> Option<&BufferInfo> {
        self.buffers.iter().find(|b| b.buf_id == buf_id)
    }

    pub fn get_mut(&mut self, buf_id: u8) -> Option<&mut BufferInfo> {
        self.buffers.iter_mut().find(|b| b.buf_id == buf_id)
    }

    /// READ BUFFER data mode: a short read past the end returns the
    /// available remainder, never an error.
    pub fn read(&self, buf_id: u8, offset: u32, alloc_len: u32) -> Result<Vec<u8>> {
        let info = self.get(buf_id).ok_or(EsesError::InvalidCdbField)?;
        if offset % info.alignment() != 0 {
            return Err(EsesError::InvalidCdbField);
        }
        let start = (offset as usize).min(info.data.len());
        let end = start.saturating_add(alloc_len as usize).min(info.data.len());
        Ok(info.data[start..end].to_vec())
    }

    /// READ BUFFER descriptor mode.
    pub fn read_descriptor(&self, buf_id: u8) -> Result<[u8; 4]> {
        let info = self.get(buf_id).ok_or(EsesError::InvalidCdbField)?;
        Ok(encode_read_buffer_descriptor(
            info.offset_boundary,
            info.data.len() as u32,
        ))
    }

    /// WRITE BUFFER data mode. EEPROM-type buffers maintain an XOR checksum
    /// in their last byte, recomputed over the rest after every write.
    pub fn write(&mut self, buf_id: u8, offset: u32, data: &[u8]) -> Result<()> {
        let info = self.get_mut(buf_id).ok_or(EsesError::InvalidCdbField)?;
        if !info.writable {
            return Err(EsesError::InvalidCdbField);
        }
        if offset % info.alignment() != 0 {
            return Err(EsesError::InvalidCdbField);
        }
        let start = offset as usize;
        let end = start
            .checked_add(data.len())
            .ok_or(EsesError::InvalidCdbField)?;
        if end > info.data.len() {
            return Err(EsesError::InvalidCdbField);
        }
        info.data[start..end].copy_from_slice(data);
        if info.buf_type == BufferType::Eeprom {
            let last = info.data.len() - 1;
            let checksum = info.data[..last].iter().fold(0u8, |acc, b| acc ^ b);
            info.data[last] = checksum;
        }
        Ok(())
    }

    /// Writes echoed String Out text at the head of a trace buffer,
    /// truncated to capacity.
    pub fn write_trace(&mut self, buf_id: u8, text: &[u8]) {
        if let Some(info) = self.get_mut(buf_id) {
            let n = text.len().min(info.data.len());
            info.data[..n].copy_from_slice(&text[..n]);
        }
    }

    /// Zeroes a buffer's contents, keeping its identity and attributes.
    /// The writable flag governs WRITE BUFFER only; clear actions arrive
    /// through the EMC control page.
    pub fn clear(&mut self, buf_id: u8) {
        if let Some(info) = self.get_mut(buf_id) {
            info.data.fill(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eses_registry::Registry;
    use eses_topology::EnclosureType;

    fn buffers() -> BufferSet {
        let registry = Registry::build().unwrap();
        BufferSet::new(&registry.config(EnclosureType::Viper))
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut set = buffers();
        // buffer 0 is the local LCC EEPROM, writable
        set.write(0, 0, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(set.read(0, 0, 8).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn non_writable_buffer_rejects_writes() {
        let mut set = buffers();
        // buffer 1 is the active trace buffer, read-only over WRITE BUFFER
        assert_eq!(
            set.write(1, 0, &[0xaa]),
            Err(EsesError::InvalidCdbField)
        );
    }

    #[test]
    fn unknown_buffer_id_rejected() {
        let set = buffers();
        assert_eq!(set.read(0x77, 0, 4), Err(EsesError::InvalidCdbField));
    }

    #[test]
    fn misaligned_offset_rejected() {
        let mut set = buffers();
        assert_eq!(set.read(0, 3, 4), Err(EsesError::InvalidCdbField));
        assert_eq!(set.write(0, 2, &[1]), Err(EsesError::InvalidCdbField));
    }

    #[test]
    fn read_past_end_returns_remainder() {
        let mut set = buffers();
        let cap = set.get(0).unwrap().data.len() as u32;
        set.write(0, cap - 8, &[9; 8]).unwrap();
        let tail = set.read(0, cap - 8, 64).unwrap();
        assert_eq!(tail.len(), 8);
    }

    #[test]
    fn oversized_write_rejected() {
        let mut set = buffers();
        let cap = set.get(0).unwrap().data.len() as u32;
        assert_eq!(
            set.write(0, cap - 4, &[0; 8]),
            Err(EsesError::InvalidCdbField)
        );
    }

    #[test]
    fn eeprom_write_maintains_xor_checksum() {
        let mut set = buffers();
        set.write(0, 0, &[0x10, 0x20, 0x40]).unwrap();
        let info = set.get(0).unwrap();
        let expected = info.data[..info.data.len() - 1]
            .iter()
            .fold(0u8, |a, b| a ^ b);
        assert_eq!(info.data[info.data.len() - 1], expected);
        assert_eq!(expected, 0x10 ^ 0x20 ^ 0x40);
    }

    #[test]
    fn descriptor_reports_capacity_and_boundary() {
        let set = buffers();
        let d = set.read_descriptor(0).unwrap();
        assert_eq!(d[0], 2);
        assert_eq!(
            u32::from_be_bytes([0, d[1], d[2], d[3]]),
            set.get(0).unwrap().data.len() as u32
        );
    }
}
