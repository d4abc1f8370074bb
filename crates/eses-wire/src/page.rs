//! Diagnostic page codes and the common page header.

use crate::codec::{ByteReader, ByteWriter};
use crate::Result;

/// Size of the common diagnostic-page header.
pub const PAGE_HEADER_SIZE: usize = 8;

/// The page-length field counts everything after the first 4 header bytes.
pub const PAGE_LENGTH_ADJUST: usize = 4;

/// Largest page the emulated services processor will accept or produce.
pub const PAGE_MAX_SIZE: usize = 2500;

/// Diagnostic page codes served by the enclosure.
///
/// Control and status pages share a code; the transfer direction of the
/// carrying command distinguishes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PageCode {
    SupportedPages = 0x00,
    Configuration = 0x01,
    /// Enclosure Status (in) / Enclosure Control (out).
    Enclosure = 0x02,
    /// String In (in) / String Out (out).
    String = 0x04,
    AdditionalElementStatus = 0x0a,
    /// Download Microcode Status (in) / Control (out).
    DownloadMicrocode = 0x0e,
    /// EMC Enclosure Status (in) / Control (out).
    EmcEnclosure = 0x10,
    /// EMC Statistics Status (in) / Control (out).
    EmcStatistics = 0x11,
}

impl PageCode {
    pub fn from_u8(v: u8) -> Option<PageCode> {
        match v {
            0x00 => Some(PageCode::SupportedPages),
            0x01 => Some(PageCode::Configuration),
            0x02 => Some(PageCode::Enclosure),
            0x04 => Some(PageCode::String),
            0x0a => Some(PageCode::AdditionalElementStatus),
            0x0e => Some(PageCode::DownloadMicrocode),
            0x10 => Some(PageCode::EmcEnclosure),
            0x11 => Some(PageCode::EmcStatistics),
            _ => None,
        }
    }
}

/// Mode page codes (carried by MODE SENSE/SELECT, not diagnostic pages).
pub const MODE_PG_EMC_ESES_PERSISTENT: u8 = 0x20;
pub const MODE_PG_EMC_ESES_NON_PERSISTENT: u8 = 0x21;
pub const MODE_PG_ALL_SUPPORTED: u8 = 0x3f;

/// The 8-byte header common to the diagnostic pages above.
///
/// Byte 1 is page specific (secondary-subenclosure count on the
/// Configuration page, summary bits on the Enclosure Status page); it is
/// carried raw here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageHeader {
    pub page_code: u8,
    pub page_specific: u8,
    /// Length of everything after the first 4 header bytes.
    pub page_length: u16,
    pub gen_code: u32,
}

impl PageHeader {
    /// Total page size including the 4 bytes the length field excludes.
    pub fn page_size(&self) -> usize {
        self.page_length as usize + PAGE_LENGTH_ADJUST
    }

    pub fn decode(buf: &[u8]) -> Result<PageHeader> {
        let mut r = ByteReader::new(buf);
        Ok(PageHeader {
            page_code: r.u8()?,
            page_specific: r.u8()?,
            page_length: r.u16_be()?,
            gen_code: r.u32_be()?,
        })
    }

    pub fn encode(&self, w: &mut ByteWriter) {
        w.u8(self.page_code);
        w.u8(self.page_specific);
        w.u16_be(self.page_length);
        w.u32_be(self.gen_code);
    }
}

/// Patches the page-length field of an assembled page so it covers the whole
/// writer contents.
pub fn finish_page(w: &mut ByteWriter) {
    let len = (w.len() - PAGE_LENGTH_ADJUST) as u16;
    w.patch_u16_be(2, len);
}
