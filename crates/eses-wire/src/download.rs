//! Microcode download control/status wire structures.

use crate::codec::{ByteReader, ByteWriter};
use crate::Result;

/// Download page modes (byte 8 of the control page).
pub const DL_MODE_DOWNLOAD: u8 = 0x0e;
pub const DL_MODE_ACTIVATE: u8 = 0x0f;

/// Byte offset where the image data begins in the control page.
pub const DL_UCODE_DATA_OFFSET: usize = 24;

/// Largest send-diagnostic page accepted during a download.
pub const DL_MAX_PAGE_LENGTH: u16 = 4096;

/// CDES-1 microcode image format: offsets into the assembled image.
pub const MCODE_IMAGE_COMPONENT_TYPE_OFFSET: usize = 24;
pub const MCODE_IMAGE_REV_OFFSET: usize = 40;
pub const MCODE_IMAGE_REV_SIZE: usize = 5;

/// Download status codes reported in the status descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DownloadStatusCode {
    /// No download in progress.
    #[default]
    None = 0x00,
    InProgress = 0x01,
    UpdatingFlash = 0x02,
    UpdatingNonVol = 0x03,
    ImageInUse = 0x10,
    NeedsActivate = 0x13,
    ErrorPageField = 0x80,
    ErrorChecksum = 0x81,
    ErrorTimeout = 0x82,
    ErrorImage = 0x83,
    ErrorBackup = 0x84,
    NoImage = 0x85,
    ActivateFailed = 0xf0,
}

/// Header of the Download Microcode Control page (page 0Eh, send side).
///
/// The image chunk follows at [`DL_UCODE_DATA_OFFSET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadControlHeader {
    pub subenclosure_id: u8,
    pub page_length: u16,
    pub gen_code: u32,
    pub mode: u8,
    pub buffer_id: u8,
    /// Offset of this chunk within the whole image.
    pub buffer_offset: u32,
    /// Total image size.
    pub image_length: u32,
    /// Size of this chunk.
    pub transfer_length: u32,
}

impl DownloadControlHeader {
    pub fn decode(buf: &[u8]) -> Result<DownloadControlHeader> {
        let mut r = ByteReader::new(buf);
        r.skip(1)?; // page code, already dispatched on
        let subenclosure_id = r.u8()?;
        let page_length = r.u16_be()?;
        let gen_code = r.u32_be()?;
        let mode = r.u8()?;
        r.skip(2)?;
        let buffer_id = r.u8()?;
        let buffer_offset = r.u32_be()?;
        let image_length = r.u32_be()?;
        let transfer_length = r.u32_be()?;
        Ok(DownloadControlHeader {
            subenclosure_id,
            page_length,
            gen_code,
            mode,
            buffer_id,
            buffer_offset,
            image_length,
            transfer_length,
        })
    }
}

/// The single status descriptor in the Download Microcode Status page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadStatusDescriptor {
    pub subenclosure_id: u8,
    pub status: DownloadStatusCode,
    pub additional_status: u8,
    /// Largest image the subenclosure accepts.
    pub max_size: u32,
    pub expected_buffer_id: u8,
    pub expected_buffer_offset: u32,
}

/// Builds the Download Microcode Status page (page 0Eh, receive side).
pub fn encode_download_status_page(
    gen_code: u32,
    desc: &DownloadStatusDescriptor,
) -> Vec<u8> {
    let mut w = ByteWriter::with_capacity(24);
    w.u8(0x0e);
    w.u8(1); // one status descriptor
    w.u16_be(0); // patched below
    w.u32_be(gen_code);
    // descriptor
    w.u8(0);
    w.u8(desc.subenclosure_id);
    w.u8(desc.status as u8);
    w.u8(desc.additional_status);
    w.u32_be(desc.max_size);
    w.zeros(3);
    w.u8(desc.expected_buffer_id);
    w.u32_be(desc.expected_buffer_offset);
    crate::page::finish_page(&mut w);
    w.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_header_decode() {
        let mut raw = vec![0u8; 32];
        raw[0] = 0x0e;
        raw[1] = 0x02; // subenclosure
        raw[2..4].copy_from_slice(&100u16.to_be_bytes());
        raw[4..8].copy_from_slice(&7u32.to_be_bytes());
        raw[8] = DL_MODE_DOWNLOAD;
        raw[11] = 0x05;
        raw[12..16].copy_from_slice(&0x800u32.to_be_bytes());
        raw[16..20].copy_from_slice(&0x2000u32.to_be_bytes());
        raw[20..24].copy_from_slice(&0x400u32.to_be_bytes());
        let hdr = DownloadControlHeader::decode(&raw).unwrap();
        assert_eq!(hdr.subenclosure_id, 2);
        assert_eq!(hdr.gen_code, 7);
        assert_eq!(hdr.mode, DL_MODE_DOWNLOAD);
        assert_eq!(hdr.buffer_id, 5);
        assert_eq!(hdr.buffer_offset, 0x800);
        assert_eq!(hdr.image_length, 0x2000);
        assert_eq!(hdr.transfer_length, 0x400);
    }

    #[test]
    fn status_page_layout() {
        let desc = DownloadStatusDescriptor {
            subenclosure_id: 1,
            status: DownloadStatusCode::NeedsActivate,
            max_size: 0x0100_0000,
            ..Default::default()
        };
        let page = encode_download_status_page(0x42, &desc);
        assert_eq!(page.len(), 24);
        assert_eq!(page[0], 0x0e);
        assert_eq!(page[1], 1);
        assert_eq!(u16::from_be_bytes([page[2], page[3]]) as usize, page.len() - 4);
        assert_eq!(page[10], 0x13);
    }
}
