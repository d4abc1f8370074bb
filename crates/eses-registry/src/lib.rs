//! The configuration registry: per-enclosure-type template Configuration
//! pages and the element layout derived from them.
//!
//! The registry is built once at startup from the topology tables and is
//! read-only afterwards; [`VirtualEnclosure`]s share `Arc`s into it. The
//! ordered list of type-descriptor headers in the Configuration page is the
//! single source of truth for the layout of the Enclosure Status/Control
//! pages: every group's byte offset and element index are derived by walking
//! that list in order, never stored independently.
//!
//! [`VirtualEnclosure`]: ../eses_enclosure/struct.VirtualEnclosure.html

mod parse;
mod template;

pub use parse::{
    parse_configuration_page, SubenclosureDescriptor, TypeDescriptorHeader, VersionDescriptor,
};
pub use template::build_configuration_page;

use std::collections::HashMap;
use std::sync::Arc;

use eses_topology::{EnclosureProfile, EnclosureType, Side};
use eses_wire::buf::BufferDescriptor;
use eses_wire::element::{ElementType, ELEMENT_SIZE};
use eses_wire::page::PAGE_HEADER_SIZE;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("template page for {0:?} failed to parse: {1}")]
    BadTemplate(EnclosureType, eses_wire::WireError),

    #[error("template page for {0:?} is inconsistent: {1}")]
    Inconsistent(EnclosureType, &'static str),
}

/// Subenclosure types appearing in subenclosure descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SubenclosureType {
    PowerSupply = 0x02,
    Cooling = 0x03,
    Lcc = 0x07,
    Ups = 0x0b,
    Chassis = 0x0e,
}

impl SubenclosureType {
    pub fn from_u8(v: u8) -> Option<SubenclosureType> {
        match v {
            0x02 => Some(SubenclosureType::PowerSupply),
            0x03 => Some(SubenclosureType::Cooling),
            0x07 => Some(SubenclosureType::Lcc),
            0x0b => Some(SubenclosureType::Ups),
            0x0e => Some(SubenclosureType::Chassis),
            _ => None,
        }
    }
}

/// One element group in page-layout order, with its derived position.
///
/// `byte_offset` points at the group's overall element; the first individual
/// element sits one record later. `first_elem_index` is the element index of
/// the first individual element (overall elements are not indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementGroup {
    pub elem_type: ElementType,
    pub subencl_id: u8,
    pub subencl_type: SubenclosureType,
    /// Side id of the owning subenclosure (0x1F for the chassis).
    pub side: u8,
    pub num_possible_elems: u8,
    pub first_elem_index: u8,
    pub byte_offset: u16,
}

impl ElementGroup {
    /// Byte offset of the n-th individual element (0-based).
    pub fn individual_offset(&self, n: u8) -> u16 {
        self.byte_offset + ELEMENT_SIZE as u16 * (1 + n as u16)
    }
}

/// Optional narrowing filters for group lookups, mirroring the original
/// lookup interface: most callers only key on (subenclosure type, side,
/// element type), but display groups are disambiguated by element count.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupFilter {
    pub num_possible_elems: Option<u8>,
    pub subencl_id: Option<u8>,
}

impl GroupFilter {
    pub fn num_elems(n: u8) -> GroupFilter {
        GroupFilter {
            num_possible_elems: Some(n),
            ..Default::default()
        }
    }
}

/// Everything the engine needs to know about one enclosure type.
#[derive(Debug)]
pub struct EnclosureConfig {
    pub encl_type: EnclosureType,
    /// The template Configuration page (generation code zeroed; the live
    /// value is stamped in by the owning enclosure when the page is served).
    pub page: Vec<u8>,
    pub subenclosures: Vec<SubenclosureDescriptor>,
    groups: Vec<ElementGroup>,
    /// Size of the Enclosure Status/Control page this layout produces.
    pub status_page_size: u16,
    /// Total count of individual elements.
    pub num_elements: u8,
}

impl EnclosureConfig {
    pub fn profile(&self) -> &'static EnclosureProfile {
        eses_topology::profile(self.encl_type)
    }

    /// The ordered element layout. Builders and the control processor must
    /// walk this, and only this.
    pub fn layout(&self) -> impl Iterator<Item = &ElementGroup> {
        self.groups.iter()
    }

    /// Looks up a group by its addressing key. `None` means the enclosure
    /// type legitimately has no such element; callers skip and continue.
    pub fn find_group(
        &self,
        subencl_type: SubenclosureType,
        side: u8,
        elem_type: ElementType,
        filter: GroupFilter,
    ) -> Option<&ElementGroup> {
        self.groups.iter().find(|g| {
            g.subencl_type == subencl_type
                && g.side == side
                && g.elem_type == elem_type
                && filter
                    .num_possible_elems
                    .map_or(true, |n| g.num_possible_elems == n)
                && filter.subencl_id.map_or(true, |id| g.subencl_id == id)
        })
    }

    /// Byte offset of a group's overall element in the status/control page.
    pub fn offset_of(
        &self,
        subencl_type: SubenclosureType,
        side: u8,
        elem_type: ElementType,
        filter: GroupFilter,
    ) -> Option<u16> {
        self.find_group(subencl_type, side, elem_type, filter)
            .map(|g| g.byte_offset)
    }

    /// Element index of a group's first individual element.
    pub fn index_of(
        &self,
        subencl_type: SubenclosureType,
        side: u8,
        elem_type: ElementType,
        filter: GroupFilter,
    ) -> Option<u8> {
        self.find_group(subencl_type, side, elem_type, filter)
            .map(|g| g.first_elem_index)
    }

    pub fn subenclosure(&self, subencl_id: u8) -> Option<&SubenclosureDescriptor> {
        self.subenclosures.iter().find(|s| s.subencl_id == subencl_id)
    }

    /// Finds a subenclosure by type and slot (PS slots derive from the
    /// descriptor text; every other type's slot is its side id).
    pub fn subenclosure_by_slot(
        &self,
        subencl_type: SubenclosureType,
        slot: u8,
    ) -> Option<&SubenclosureDescriptor> {
        self.subenclosures
            .iter()
            .find(|s| s.subencl_type == subencl_type && s.slot == slot)
    }

    /// All buffer descriptors with their owning subenclosure id.
    pub fn buffer_descriptors(&self) -> impl Iterator<Item = (u8, &BufferDescriptor)> {
        self.subenclosures
            .iter()
            .flat_map(|s| s.buf_descs.iter().map(move |d| (s.subencl_id, d)))
    }

    /// Buffer id lookup by owning subenclosure and buffer type.
    pub fn buffer_id(
        &self,
        subencl_type: SubenclosureType,
        side: u8,
        buf_type: eses_wire::buf::BufferType,
    ) -> Option<u8> {
        self.subenclosures
            .iter()
            .filter(|s| s.subencl_type == subencl_type && s.side == side)
            .flat_map(|s| s.buf_descs.iter())
            .find(|d| d.buf_type == buf_type)
            .map(|d| d.buf_id)
    }

    /// Primary-subenclosure id for a given LCC side.
    pub fn lcc_subencl_id(&self, side: Side) -> Option<u8> {
        self.subenclosures
            .iter()
            .find(|s| s.subencl_type == SubenclosureType::Lcc && s.side == side.id())
            .map(|s| s.subencl_id)
    }
}

/// Registry of every served enclosure type, built once and shared.
#[derive(Debug)]
pub struct Registry {
    configs: HashMap<EnclosureType, Arc<EnclosureConfig>>,
}

impl Registry {
    /// Builds the registry from the topology-driven template catalogue.
    pub fn build() -> Result<Registry> {
        let mut configs = HashMap::new();
        for encl_type in EnclosureType::ALL {
            let page = template::build_configuration_page(encl_type);
            let config = parse::parse_configuration_page(encl_type, &page)
                .map_err(|e| RegistryError::BadTemplate(encl_type, e))?;
            configs.insert(encl_type, Arc::new(config));
        }
        Ok(Registry { configs })
    }

    pub fn config(&self, encl_type: EnclosureType) -> Arc<EnclosureConfig> {
        // build() populated every variant
        Arc::clone(&self.configs[&encl_type])
    }
}

/// Derives group positions from an ordered type-descriptor-header walk:
/// each group occupies one overall element plus `num_possible_elems`
/// individual elements, 4 bytes apiece.
pub(crate) fn derive_layout(
    headers: &[TypeDescriptorHeader],
    subenclosures: &[SubenclosureDescriptor],
) -> std::result::Result<(Vec<ElementGroup>, u16, u8), &'static str> {
    let mut groups = Vec::with_capacity(headers.len());
    let mut byte_offset = PAGE_HEADER_SIZE as u16;
    let mut elem_index: u16 = 0;
    for hdr in headers {
        let owner = subenclosures
            .iter()
            .find(|s| s.subencl_id == hdr.subencl_id)
            .ok_or("type descriptor header names an unknown subenclosure")?;
        groups.push(ElementGroup {
            elem_type: hdr.elem_type,
            subencl_id: hdr.subencl_id,
            subencl_type: owner.subencl_type,
            side: owner.side,
            num_possible_elems: hdr.num_possible_elems,
            first_elem_index: u8::try_from(elem_index)
                .map_err(|_| "element index overflows one byte")?,
            byte_offset,
        });
        byte_offset += ELEMENT_SIZE as u16 * (1 + hdr.num_possible_elems as u16);
        elem_index += hdr.num_possible_elems as u16;
    }
    let total = u8::try_from(elem_index).map_err(|_| "element count overflows one byte")?;
    Ok((groups, byte_offset, total))
}
