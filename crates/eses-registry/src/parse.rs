//! Configuration page parsing and layout derivation.

use eses_topology::EnclosureType;
use eses_wire::buf::BufferDescriptor;
use eses_wire::codec::ByteReader;
use eses_wire::element::ElementType;
use eses_wire::page::{PageHeader, PAGE_HEADER_SIZE};
use eses_wire::{Result, WireError};

use crate::{derive_layout, EnclosureConfig, SubenclosureType};

/// Size of a version descriptor on the wire.
pub const VER_DESC_SIZE: usize = 20;
pub const VER_DESC_REV_SIZE: usize = 5;

/// A version descriptor from a subenclosure descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDescriptor {
    pub elem_index: u8,
    pub comp_type: u8,
    pub downloadable: bool,
    pub updated: bool,
    pub main: bool,
    /// CDES-1 revision, 5 ASCII bytes.
    pub rev: [u8; VER_DESC_REV_SIZE],
    pub comp_id: [u8; 12],
    pub buf_id: u8,
}

/// A parsed subenclosure descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubenclosureDescriptor {
    pub subencl_id: u8,
    pub subencl_type: SubenclosureType,
    pub side: u8,
    /// Physical slot; power supplies derive it from the descriptor text,
    /// everything else uses the side id.
    pub slot: u8,
    pub vendor_id: String,
    pub product_id: String,
    pub prod_rev_level: [u8; 4],
    pub serial_number: String,
    pub peer_subencl_id: u8,
    pub num_type_desc_headers: u8,
    pub ver_descs: Vec<VersionDescriptor>,
    pub buf_descs: Vec<BufferDescriptor>,
    pub text: String,
    /// Byte offset of this descriptor within the page; version-descriptor
    /// updates are written back here.
    pub page_offset: usize,
}

/// A type descriptor header; their order defines the page layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptorHeader {
    pub elem_type: ElementType,
    pub num_possible_elems: u8,
    pub subencl_id: u8,
    pub text_len: u8,
}

fn ps_slot_from_text(text: &str) -> u8 {
    match text {
        "Power Supply A" | "Power Supply A1" => 0,
        "Power Supply B" => 1,
        "Power Supply A0" => 1,
        "Power Supply B1" => 2,
        "Power Supply B0" => 3,
        _ => 0,
    }
}

fn parse_subenclosure(
    r: &mut ByteReader<'_>,
    page_offset: usize,
) -> Result<SubenclosureDescriptor> {
    let b0 = r.u8()?;
    let _ = b0; // services-processor counts, not used by the emulation
    let subencl_id = r.u8()?;
    let num_type_desc_headers = r.u8()?;
    let desc_len = r.u8()?;
    let end = page_offset + desc_len as usize + 4;
    r.skip(8)?; // NAA logical id
    let vendor_id = String::from_utf8_lossy(r.bytes(8)?).trim_end().to_string();
    let product_id = String::from_utf8_lossy(r.bytes(16)?).trim_end().to_string();
    let prod_rev_level = r.array::<4>()?;
    let type_raw = r.u8()?;
    let subencl_type = SubenclosureType::from_u8(type_raw)
        .ok_or(WireError::InvalidField("subenclosure type"))?;
    let side = r.u8()? & 0x1f;
    r.skip(1)?; // side name
    r.skip(1)?; // container
    r.skip(1)?; // manager
    let peer_subencl_id = r.u8()?;
    r.skip(1)?; // enclosure-relative uid
    let serial_number = String::from_utf8_lossy(r.bytes(16)?).trim_end().to_string();
    let num_ver_descs = r.u8()?;

    let mut ver_descs = Vec::with_capacity(num_ver_descs as usize);
    for _ in 0..num_ver_descs {
        let elem_index = r.u8()?;
        let b1 = r.u8()?;
        let rev = r.array::<VER_DESC_REV_SIZE>()?;
        let comp_id = r.array::<12>()?;
        let buf_id = r.u8()?;
        ver_descs.push(VersionDescriptor {
            elem_index,
            comp_type: b1 & 0x1f,
            downloadable: b1 & 0x20 != 0,
            updated: b1 & 0x40 != 0,
            main: b1 & 0x80 != 0,
            rev,
            comp_id,
            buf_id,
        });
    }

    let num_buf_descs = r.u8()?;
    let mut buf_descs = Vec::with_capacity(num_buf_descs as usize);
    for _ in 0..num_buf_descs {
        let raw = r.array::<4>()?;
        buf_descs.push(
            BufferDescriptor::from_bytes(raw)
                .ok_or(WireError::InvalidField("buffer type"))?,
        );
    }

    let num_vpd_pages = r.u8()?;
    r.skip(num_vpd_pages as usize)?;
    let text_len = r.u8()?;
    let text = String::from_utf8_lossy(r.bytes(text_len as usize)?).to_string();

    // Descriptors are self-sized; tolerate trailing pad up to the declared
    // length, but never run past it.
    if r.position() > end {
        return Err(WireError::InvalidField("subenclosure descriptor length"));
    }
    r.seek(end)?;

    let slot = match subencl_type {
        SubenclosureType::PowerSupply => ps_slot_from_text(&text),
        _ => side,
    };

    Ok(SubenclosureDescriptor {
        subencl_id,
        subencl_type,
        side,
        slot,
        vendor_id,
        product_id,
        prod_rev_level,
        serial_number,
        peer_subencl_id,
        num_type_desc_headers,
        ver_descs,
        buf_descs,
        text,
        page_offset,
    })
}

/// Parses a Configuration page and derives the element layout from its
/// type-descriptor-header walk.
pub fn parse_configuration_page(
    encl_type: EnclosureType,
    page: &[u8],
) -> Result<EnclosureConfig> {
    let header = PageHeader::decode(page)?;
    if header.page_code != 0x01 {
        return Err(WireError::InvalidField("configuration page code"));
    }
    let page_size = header.page_size();
    if page.len() < page_size {
        return Err(WireError::MalformedPage {
            offset: 0,
            needed: page_size,
            available: page.len(),
        });
    }

    let mut r = ByteReader::new(&page[..page_size]);
    r.seek(PAGE_HEADER_SIZE)?;

    let total_subencls = header.page_specific as usize + 1;
    let mut subenclosures = Vec::with_capacity(total_subencls);
    for _ in 0..total_subencls {
        let offset = r.position();
        subenclosures.push(parse_subenclosure(&mut r, offset)?);
    }

    let total_groups: usize = subenclosures
        .iter()
        .map(|s| s.num_type_desc_headers as usize)
        .sum();
    let mut headers = Vec::with_capacity(total_groups);
    for _ in 0..total_groups {
        let elem_raw = r.u8()?;
        let elem_type =
            ElementType::from_u8(elem_raw).ok_or(WireError::InvalidField("element type"))?;
        let num_possible_elems = r.u8()?;
        let subencl_id = r.u8()?;
        let text_len = r.u8()?;
        headers.push(TypeDescriptorHeader {
            elem_type,
            num_possible_elems,
            subencl_id,
            text_len,
        });
    }
    // Type-descriptor texts follow; their lengths are already accounted for.

    let (groups, status_page_size, num_elements) = derive_layout(&headers, &subenclosures)
        .map_err(WireError::InvalidField)?;

    Ok(EnclosureConfig {
        encl_type,
        page: page[..page_size].to_vec(),
        subenclosures,
        groups,
        status_page_size,
        num_elements,
    })
}
