//! The EMC vendor diagnostic pages: Enclosure Status/Control (10h) and
//! Statistics Status (11h).
//!
//! Both pages cross-reference elements of the Enclosure Status page, so every
//! index and offset written here comes from the registry's layout. The status
//! page body is a list of information-element groups, each with a three-byte
//! header naming the element type, count and per-element size; the statistics
//! page is a run of per-element counter records keyed by element offset.

use eses_registry::{ElementGroup, GroupFilter, SubenclosureType};
use eses_topology::Side;
use eses_wire::buf::BufferType;
use eses_wire::codec::{ByteReader, ByteWriter};
use eses_wire::element::{ElementType, ELEMENT_SIZE};
use eses_wire::page::{finish_page, PageHeader, PAGE_HEADER_SIZE};

use crate::actuator::SlotActuator;
use crate::enclosure::VirtualEnclosure;
use crate::{EsesError, Result};

// Information element group types.
const INFO_ELEM_SAS_CONN: u8 = 0;
const INFO_ELEM_TRACE_BUF: u8 = 1;
const INFO_ELEM_ENCL_TIME: u8 = 2;
const INFO_ELEM_GENERAL: u8 = 3;

const SAS_CONN_INFO_ELEM_SIZE: u8 = 13;
const TRACE_BUF_INFO_ELEM_SIZE: u8 = 29;
const ENCL_TIME_INFO_ELEM_SIZE: u8 = 8;
const GENERAL_INFO_ELEM_SIZE: u8 = 4;

/// Offset of the first information element group within the page.
const FIRST_INFO_ELEM_GROUP_OFFSET: usize = 12;

/// Time-zone value reported when none is configured.
const ENCL_TIME_ZONE_UNSPECIFIED: u8 = 96;

/// Trace-buffer control action requesting the buffer be cleared.
const TRACE_BUF_ACTION_CLEAR: u8 = 2;

/// Element offset (the numbering that counts overall elements too) of a
/// group's n-th individual element.
fn elem_offset(g: &ElementGroup, n: u8) -> u8 {
    ((g.byte_offset as usize - PAGE_HEADER_SIZE) / ELEMENT_SIZE) as u8 + 1 + n
}

/// Builds the EMC Enclosure Status page (10h).
pub(crate) fn build_emc_enclosure_status_page(encl: &VirtualEnclosure) -> Result<Vec<u8>> {
    let cfg = encl.config();
    let profile = encl.profile();
    let local = Side::A.id();

    let mut w = ByteWriter::with_capacity(FIRST_INFO_ELEM_GROUP_OFFSET + 128);
    w.u8(0x10);
    w.u8(0);
    w.u16_be(0); // patched by finish_page
    w.u32_be(encl.generation_code());
    w.zeros(2);
    w.u8(0); // no shutdown scheduled, page not partial
    let num_groups_at = w.len();
    w.u8(0);
    let mut num_groups = 0u8;

    // SAS connector information: one element per local connector, carrying
    // the attached address and the lane's phy.
    if let Some(g) = cfg.find_group(
        SubenclosureType::Lcc,
        local,
        ElementType::SasConnector,
        GroupFilter::default(),
    ) {
        w.u8(INFO_ELEM_SAS_CONN);
        w.u8(g.num_possible_elems);
        w.u8(SAS_CONN_INFO_ELEM_SIZE);
        for pos in 0..g.num_possible_elems {
            let port = pos / profile.conns_per_port;
            let within_port = pos % profile.conns_per_port;
            // Lane entries name the phy they carry; the whole-connector
            // entry leads each port with no phy of its own.
            let attached_phy = if within_port == 0 {
                None
            } else {
                profile
                    .connector_to_phy
                    .get(port as usize)
                    .and_then(|lanes| lanes.get(within_port as usize - 1))
                    .copied()
            };
            w.u8(elem_offset(g, pos));
            w.u64_be(0); // nothing cabled to the emulated wide ports
            w.u8(0);
            w.u8((port & 0x0f) | 0x20); // wide port id, enable
            w.u8(port);
            w.u8(attached_phy.unwrap_or(0xff));
        }
        num_groups += 1;
    }

    // Trace buffer information for the local LCC's active trace.
    if let Some(buf_id) = cfg.buffer_id(SubenclosureType::Lcc, local, BufferType::ActiveTrace) {
        let rev = cfg.subenclosures[0].prod_rev_level;
        w.u8(INFO_ELEM_TRACE_BUF);
        w.u8(1);
        w.u8(TRACE_BUF_INFO_ELEM_SIZE);
        w.u8(buf_id);
        w.u8(0); // no action
        w.u8(0xff); // not tied to an element
        w.bytes(&rev);
        w.u8(b' ');
        w.zeros(21); // timestamp, not tracked
        num_groups += 1;
    }

    // General information per drive slot: power-cycle state. Cycles run to
    // completion within the command that requests them, so the bit always
    // reads back clear.
    if let Some(g) = cfg.find_group(
        SubenclosureType::Lcc,
        local,
        ElementType::ArrayDeviceSlot,
        GroupFilter::default(),
    ) {
        w.u8(INFO_ELEM_GENERAL);
        w.u8(g.num_possible_elems);
        w.u8(GENERAL_INFO_ELEM_SIZE);
        for slot in 0..g.num_possible_elems {
            w.u8(elem_offset(g, slot));
            w.u8(0x80); // FRU
            w.u8(0); // no power cycle in progress
            w.u8(0);
        }
        num_groups += 1;
    }

    // Enclosure time: never configured on the emulated processor.
    w.u8(INFO_ELEM_ENCL_TIME);
    w.u8(1);
    w.u8(ENCL_TIME_INFO_ELEM_SIZE);
    w.u8(0); // year, not valid
    w.u8(0);
    w.u8(0);
    w.u8(ENCL_TIME_ZONE_UNSPECIFIED);
    w.u32_be(0);
    num_groups += 1;

    w.patch_u8(num_groups_at, num_groups);
    finish_page(&mut w);
    Ok(w.into_vec())
}

/// Applies an EMC Enclosure Control page (10h).
///
/// The only control the emulation honors is the general-information drive
/// power cycle; connector and trace-buffer elements are accepted and
/// ignored, as the firmware does for fields it does not implement.
pub(crate) fn process_emc_enclosure_control_page(
    encl: &mut VirtualEnclosure,
    act: &mut dyn SlotActuator,
    page: &[u8],
) -> Result<()> {
    let header = PageHeader::decode(page)?;
    if header.gen_code != encl.generation_code() {
        return Err(EsesError::TransferRefused("generation code mismatch"));
    }
    let body = page
        .get(..header.page_size())
        .ok_or(EsesError::InvalidParameterField)?;

    let slot_group = encl
        .config()
        .find_group(
            SubenclosureType::Lcc,
            Side::A.id(),
            ElementType::ArrayDeviceSlot,
            GroupFilter::default(),
        )
        .copied();

    if body.len() < FIRST_INFO_ELEM_GROUP_OFFSET {
        // A bare header carries no groups to apply.
        return Ok(());
    }
    let num_groups = body[FIRST_INFO_ELEM_GROUP_OFFSET - 1];
    let mut r = ByteReader::new(body);
    r.seek(FIRST_INFO_ELEM_GROUP_OFFSET)?;
    for _ in 0..num_groups {
        let elem_type = r.u8()?;
        let num_elems = r.u8()?;
        let elem_size = r.u8()? as usize;
        for _ in 0..num_elems {
            let elem = r.bytes(elem_size)?;
            match elem_type {
                INFO_ELEM_GENERAL if elem.len() >= GENERAL_INFO_ELEM_SIZE as usize => {
                    if elem[2] & 0x80 == 0 {
                        continue;
                    }
                    let Some(g) = slot_group else {
                        continue;
                    };
                    let first = elem_offset(&g, 0);
                    let offset = elem[0];
                    if offset < first || offset >= first + g.num_possible_elems {
                        continue;
                    }
                    let slot = offset - first;
                    if act.slot_occupied(slot) {
                        act.power_cycle_drive(slot);
                        let count = &mut encl.state.slot_power_down_count[slot as usize];
                        *count = count.wrapping_add(1);
                    }
                }
                INFO_ELEM_TRACE_BUF if elem.len() >= 2 => {
                    if elem[1] == TRACE_BUF_ACTION_CLEAR {
                        encl.buffers.clear(elem[0]);
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

const DEVICE_SLOT_STATS_LEN: u8 = 2;
const EXP_PHY_STATS_LEN: u8 = 26;
const SAS_EXP_STATS_LEN: u8 = 2;

/// Builds the EMC Statistics Status page (11h): per-element counter records
/// for the drive slots, expander phys and the expander, in layout order.
pub(crate) fn build_emc_statistics_page(encl: &VirtualEnclosure) -> Result<Vec<u8>> {
    let cfg = encl.config();
    let local = Side::A.id();

    let mut w = ByteWriter::with_capacity(PAGE_HEADER_SIZE + 256);
    w.u8(0x11);
    w.u8(0);
    w.u16_be(0); // patched by finish_page
    w.u32_be(encl.generation_code());

    for g in cfg.layout() {
        if g.subencl_type != SubenclosureType::Lcc || g.side != local {
            continue;
        }
        match g.elem_type {
            ElementType::ArrayDeviceSlot => {
                for slot in 0..g.num_possible_elems {
                    w.u8(elem_offset(g, slot));
                    w.u8(DEVICE_SLOT_STATS_LEN);
                    w.u8(encl.state.slot_insert_count[slot as usize]);
                    w.u8(encl.state.slot_power_down_count[slot as usize]);
                }
            }
            ElementType::ExpanderPhy => {
                // Link-level error counters are not modeled and stay zero;
                // the change count tracks control-driven transitions.
                for phy_id in 0..g.num_possible_elems {
                    w.u8(elem_offset(g, phy_id));
                    w.u8(EXP_PHY_STATS_LEN);
                    w.zeros(21);
                    w.u8(
                        encl.state
                            .phy_change_count
                            .get(phy_id as usize)
                            .copied()
                            .unwrap_or(0),
                    );
                    w.zeros(4);
                }
            }
            ElementType::SasExpander => {
                w.u8(elem_offset(g, 0));
                w.u8(SAS_EXP_STATS_LEN);
                w.u16_be(0);
            }
            _ => {}
        }
    }

    finish_page(&mut w);
    Ok(w.into_vec())
}
