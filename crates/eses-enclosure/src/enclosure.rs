//! One emulated services-processor instance.

use std::sync::Arc;

use eses_registry::{EnclosureConfig, Registry, SubenclosureType};
use eses_topology::{EnclosureProfile, EnclosureType};
use eses_wire::download::MCODE_IMAGE_REV_SIZE;

use crate::buffers::BufferSet;
use crate::download::{CompletedImage, DownloadStation};
use crate::mode_pages::ModePageSet;
use crate::state::ElementStateStore;
use crate::{EsesError, Result};

/// Standard INQUIRY data served for the enclosure: the SES device header
/// plus the vendor area carrying the catalogue identity.
pub const INQUIRY_DATA_SIZE: usize = 96;
const INQUIRY_SERIAL_OFFSET: usize = 36;
const INQUIRY_BOARD_TYPE_OFFSET: usize = 52;
const INQUIRY_ESES_VERSION_OFFSET: usize = 54;
const INQUIRY_PLATFORM_TYPE_OFFSET: usize = 55;
const INQUIRY_SAS_ADDRESS_OFFSET: usize = 56;

/// Offsets within a subenclosure descriptor used when activation rewrites
/// firmware revisions in the served Configuration page.
const SUBENCL_PROD_REV_OFFSET: usize = 36;
const SUBENCL_FIRST_VER_DESC_OFFSET: usize = 64;
const VER_DESC_SIZE: usize = 20;
const VER_DESC_REV_OFFSET: usize = 2;

/// One virtual enclosure: element state, mode pages, buffers, download
/// station and the served copy of the Configuration page.
///
/// Callers serialize commands per instance; everything here is mutated only
/// from within a single command's execution.
pub struct VirtualEnclosure {
    config: Arc<EnclosureConfig>,
    /// Served Configuration page; starts as the registry template and picks
    /// up firmware revisions as activations land.
    config_page: Vec<u8>,
    gen_code: u32,
    pub state: ElementStateStore,
    pub mode_pages: ModePageSet,
    pub downloads: DownloadStation,
    pub buffers: BufferSet,
    sas_address: u64,
    pub(crate) pending_unit_attention: bool,
}

impl VirtualEnclosure {
    pub fn new(registry: &Registry, encl_type: EnclosureType, sas_address: u64) -> VirtualEnclosure {
        let config = registry.config(encl_type);
        let state = ElementStateStore::new(config.profile());
        let buffers = BufferSet::new(&config);
        let config_page = config.page.clone();
        VirtualEnclosure {
            config,
            config_page,
            gen_code: 0,
            state,
            mode_pages: ModePageSet::new(),
            downloads: DownloadStation::new(),
            buffers,
            sas_address,
            pending_unit_attention: false,
        }
    }

    pub fn config(&self) -> &EnclosureConfig {
        &self.config
    }

    pub fn profile(&self) -> &'static EnclosureProfile {
        self.config.profile()
    }

    pub fn sas_address(&self) -> u64 {
        self.sas_address
    }

    /// The generation code every control submission must echo.
    pub fn generation_code(&self) -> u32 {
        self.gen_code
    }

    /// Bumps the generation code after a configuration change and arms the
    /// unit-attention condition clients see on their next command.
    pub(crate) fn bump_generation_code(&mut self) {
        self.gen_code = self.gen_code.wrapping_add(1);
        self.pending_unit_attention = true;
    }

    /// The Configuration page with the live generation code stamped in.
    pub fn configuration_page(&self) -> Vec<u8> {
        let mut page = self.config_page.clone();
        page[4..8].copy_from_slice(&self.gen_code.to_be_bytes());
        page
    }

    /// Standard INQUIRY data: SES device type plus the catalogue identity
    /// in the vendor-specific area.
    pub fn inquiry_data(&self) -> Vec<u8> {
        let identity = self.profile().identity;
        let primary = &self.config.subenclosures[0];
        let mut data = vec![0u8; INQUIRY_DATA_SIZE];
        data[0] = 0x0d; // SES device
        data[2] = 0x05; // SPC-3
        data[3] = 0x02; // response data format
        data[4] = (INQUIRY_DATA_SIZE - 5) as u8;
        write_ascii(&mut data[8..16], identity.vendor_id);
        write_ascii(&mut data[16..32], identity.product_id);
        data[32..36].copy_from_slice(&primary.prod_rev_level);
        write_ascii(
            &mut data[INQUIRY_SERIAL_OFFSET..INQUIRY_SERIAL_OFFSET + 16],
            &primary.serial_number,
        );
        data[INQUIRY_BOARD_TYPE_OFFSET..INQUIRY_BOARD_TYPE_OFFSET + 2]
            .copy_from_slice(&identity.board_type.to_be_bytes());
        data[INQUIRY_ESES_VERSION_OFFSET] = identity.eses_version;
        data[INQUIRY_PLATFORM_TYPE_OFFSET] = identity.platform_type;
        data[INQUIRY_SAS_ADDRESS_OFFSET..INQUIRY_SAS_ADDRESS_OFFSET + 8]
            .copy_from_slice(&self.sas_address.to_be_bytes());
        data
    }

    /// Propagates an activated image's revision into the served
    /// Configuration page: the matching version descriptor and, for main
    /// images, the subenclosure product revision level.
    pub(crate) fn apply_firmware_revision(&mut self, image: &CompletedImage) -> Result<()> {
        let subencl = self
            .config
            .subenclosure(image.subenclosure_id)
            .ok_or(EsesError::Internal("activated subenclosure not in config"))?;
        let (ver_index, ver_desc) = subencl
            .ver_descs
            .iter()
            .enumerate()
            .find(|(_, v)| v.comp_type == image.component_type && v.downloadable)
            .or_else(|| {
                subencl
                    .ver_descs
                    .iter()
                    .enumerate()
                    .find(|(_, v)| v.main)
            })
            .ok_or(EsesError::Internal(
                "no version descriptor for activated component",
            ))?;

        let desc_offset = subencl.page_offset
            + SUBENCL_FIRST_VER_DESC_OFFSET
            + ver_index * VER_DESC_SIZE;
        let rev_offset = desc_offset + VER_DESC_REV_OFFSET;
        self.config_page[rev_offset..rev_offset + MCODE_IMAGE_REV_SIZE]
            .copy_from_slice(&image.revision);
        // Mark the descriptor updated.
        self.config_page[desc_offset + 1] |= 0x40;

        if ver_desc.main {
            let prod_rev = prod_rev_from_fw_rev(&image.revision);
            let off = subencl.page_offset + SUBENCL_PROD_REV_OFFSET;
            self.config_page[off..off + 4].copy_from_slice(&prod_rev);
        }
        Ok(())
    }

    /// Buffer id of the local LCC's active trace buffer.
    pub(crate) fn active_trace_buffer_id(&self) -> Option<u8> {
        self.config.buffer_id(
            SubenclosureType::Lcc,
            eses_topology::Side::A.id(),
            eses_wire::buf::BufferType::ActiveTrace,
        )
    }
}

fn write_ascii(dst: &mut [u8], s: &str) {
    let raw = s.as_bytes();
    let n = raw.len().min(dst.len());
    dst[..n].copy_from_slice(&raw[..n]);
    dst[n..].fill(b' ');
}

/// Squeezes a 5-byte firmware revision into the 4-digit product revision
/// level, dropping the dot if one is present ("1.40 " becomes "140 ").
fn prod_rev_from_fw_rev(rev: &[u8; MCODE_IMAGE_REV_SIZE]) -> [u8; 4] {
    if rev[2] == b'.' {
        [rev[0], rev[1], rev[3], rev[4]]
    } else {
        [rev[0], rev[1], rev[2], rev[3]]
    }
}
