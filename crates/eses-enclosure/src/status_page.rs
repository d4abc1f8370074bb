//! Builders for the status-side diagnostic pages.
//!
//! Every builder walks the registry's ordered element layout; nothing here
//! assumes an independent ordering. For each group one overall element is
//! written, then the individual elements, so group byte offsets line up with
//! the offsets the registry derived.

use eses_registry::{ElementGroup, GroupFilter, SubenclosureType};
use eses_topology::Side;
use eses_wire::codec::ByteWriter;
use eses_wire::element::{
    ElementType, SasConnectorStatus, StatusCode, CONN_TYPE_MINI_SAS_4X, ELEMENT_SIZE,
};
use eses_wire::page::{finish_page, PAGE_HEADER_SIZE};

use crate::enclosure::VirtualEnclosure;
use crate::{EsesError, Result};

/// Builds the Enclosure Status page (02h).
pub(crate) fn build_enclosure_status_page(encl: &VirtualEnclosure) -> Result<Vec<u8>> {
    let cfg = encl.config();
    let mut page = vec![0u8; cfg.status_page_size as usize];
    page[0] = 0x02;
    page[2..4].copy_from_slice(&(cfg.status_page_size - 4).to_be_bytes());
    page[4..8].copy_from_slice(&encl.generation_code().to_be_bytes());

    for group in cfg.layout() {
        fill_group(encl, group, &mut page)?;
    }
    Ok(page)
}

fn put(page: &mut [u8], offset: u16, n: u8, bytes: [u8; 4]) {
    let at = offset as usize + ELEMENT_SIZE * (1 + n as usize);
    page[at..at + ELEMENT_SIZE].copy_from_slice(&bytes);
}

fn fill_group(encl: &VirtualEnclosure, g: &ElementGroup, page: &mut [u8]) -> Result<()> {
    let state = &encl.state;
    let profile = encl.profile();
    let local = g.side == Side::A.id();
    match (g.subencl_type, g.elem_type) {
        (SubenclosureType::Lcc, ElementType::ArrayDeviceSlot) if local => {
            for (i, slot) in state.drive_slots.iter().enumerate() {
                put(page, g.byte_offset, i as u8, slot.to_bytes());
            }
        }
        (SubenclosureType::Lcc, ElementType::ExpanderPhy) if local => {
            // Every phy reports the element index of its owning expander.
            let exp_index = encl
                .config()
                .index_of(
                    SubenclosureType::Lcc,
                    g.side,
                    ElementType::SasExpander,
                    GroupFilter::default(),
                )
                .ok_or(EsesError::Internal("phy group without an expander group"))?;
            for (i, phy) in state.phys.iter().enumerate() {
                let mut phy = *phy;
                phy.expander_index = exp_index;
                put(page, g.byte_offset, i as u8, phy.to_bytes());
            }
        }
        (SubenclosureType::Lcc, ElementType::SasConnector) => {
            for i in 0..g.num_possible_elems {
                let link = profile
                    .conn_physical_link(i)
                    .ok_or(EsesError::Internal("connector position out of range"))?;
                let mut conn = if local {
                    state.local_conns[i as usize]
                } else {
                    // The peer LCC's cable state is not modeled; its
                    // connectors report not-installed.
                    SasConnectorStatus {
                        conn_type: CONN_TYPE_MINI_SAS_4X,
                        ..Default::default()
                    }
                };
                if !local {
                    conn.common.code = StatusCode::NotInstalled;
                }
                conn.conn_physical_link = link;
                put(page, g.byte_offset, i, conn.to_bytes());
            }
        }
        (SubenclosureType::Lcc, ElementType::SasExpander) => {
            let exp = if local {
                state.local_expander
            } else {
                state.peer_expander
            };
            put(page, g.byte_offset, 0, exp.to_bytes());
        }
        (SubenclosureType::Lcc, ElementType::EscElectronics) => {
            let esc = if local { state.local_esc } else { state.peer_esc };
            put(page, g.byte_offset, 0, esc.to_bytes());
        }
        (SubenclosureType::Lcc, ElementType::Enclosure) => {
            let encl_elem = if local {
                state.local_encl
            } else {
                state.peer_encl
            };
            put(page, g.byte_offset, 0, encl_elem.to_bytes());
        }
        (SubenclosureType::Lcc, ElementType::TempSensor) => {
            let sensors = if local {
                &state.temp_sensors_local
            } else {
                &state.temp_sensors_peer
            };
            for (i, sensor) in sensors.iter().take(g.num_possible_elems as usize).enumerate() {
                put(page, g.byte_offset, i as u8, sensor.to_bytes());
            }
        }
        (SubenclosureType::Lcc, ElementType::Display) if local => {
            // The two-character display comes first in the layout and owns
            // display characters 0-1; the one-character display shows the
            // last character.
            let base = if g.num_possible_elems == 2 { 0usize } else { 2 };
            for i in 0..g.num_possible_elems as usize {
                if let Some(d) = state.displays.get(base + i) {
                    put(page, g.byte_offset, i as u8, d.to_bytes());
                }
            }
        }
        (SubenclosureType::Chassis, ElementType::Enclosure) => {
            put(page, g.byte_offset, 0, state.chassis_encl.to_bytes());
        }
        (SubenclosureType::PowerSupply, ElementType::PowerSupply) => {
            let slot = ps_slot(encl, g)?;
            if let Some(ps) = state.power_supplies.get(slot as usize) {
                // The overall element mirrors the individual one.
                let at = g.byte_offset as usize;
                page[at..at + ELEMENT_SIZE].copy_from_slice(&ps.to_bytes());
                put(page, g.byte_offset, 0, ps.to_bytes());
            }
        }
        (SubenclosureType::PowerSupply, ElementType::Cooling) => {
            let slot = ps_slot(encl, g)?;
            let per_ps = profile.cooling_per_ps as usize;
            let base = slot as usize * per_ps;
            for i in 0..g.num_possible_elems as usize {
                if let Some(fan) = state.cooling.get(base + i) {
                    put(page, g.byte_offset, i as u8, fan.to_bytes());
                }
            }
        }
        // Peer-owned drive slot/phy/display groups do not occur in the
        // served layouts; anything else stays zeroed (status unsupported).
        _ => {}
    }
    Ok(())
}

fn ps_slot(encl: &VirtualEnclosure, g: &ElementGroup) -> Result<u8> {
    encl.config()
        .subenclosure(g.subencl_id)
        .map(|s| s.slot)
        .ok_or(EsesError::Internal("element group without a subenclosure"))
}

/// Builds the Additional Element Status page (0Ah): per drive slot a SAS
/// protocol descriptor carrying the attached device's address and phy, then
/// one descriptor for the local expander cross-referencing connectors.
pub(crate) fn build_additional_status_page(encl: &VirtualEnclosure) -> Result<Vec<u8>> {
    let cfg = encl.config();
    let profile = encl.profile();
    let local = Side::A.id();

    let mut w = ByteWriter::with_capacity(PAGE_HEADER_SIZE + 64);
    w.u8(0x0a);
    w.u8(0);
    w.u16_be(0); // patched by finish_page
    w.u32_be(encl.generation_code());

    if let Some(first_slot_index) = cfg.index_of(
        SubenclosureType::Lcc,
        local,
        ElementType::ArrayDeviceSlot,
        GroupFilter::default(),
    ) {
        for slot in 0..profile.drive_slots {
            let phy_id = profile
                .phy_for_slot(slot)
                .ok_or(EsesError::Internal("slot without a phy mapping"))?;
            // Descriptor header: SAS protocol, element-index-present.
            w.u8(0x16);
            w.u8(2 + 32); // descriptor length after this byte pair
            w.u8(0);
            w.u8(first_slot_index + slot);
            // Array-device-slot protocol-specific info.
            w.u8(1); // one phy descriptor
            w.u8(0); // descriptor type 0
            w.u8(0);
            w.u8(slot);
            // Phy descriptor: 12 ignored bytes, SAS address, phy id, pad.
            w.zeros(12);
            w.u64_be(drive_sas_address(encl.sas_address(), slot));
            w.u8(phy_id);
            w.zeros(7);
        }
    }

    if let Some(exp_index) = cfg.index_of(
        SubenclosureType::Lcc,
        local,
        ElementType::SasExpander,
        GroupFilter::default(),
    ) {
        let conn_index = cfg.index_of(
            SubenclosureType::Lcc,
            local,
            ElementType::SasConnector,
            GroupFilter::default(),
        );
        let phy_count = profile.phys;
        // Descriptor header for the expander.
        w.u8(0x16);
        w.u8(2 + 10 + 2 * phy_count);
        w.u8(0);
        w.u8(exp_index);
        // SAS-expander protocol-specific info.
        w.u8(phy_count);
        w.u8(0);
        w.u16_be(0);
        w.u64_be(encl.sas_address());
        // Expander phy descriptors: connector element index per phy.
        for phy_id in 0..phy_count {
            let conn_elem = connector_for_phy(encl, phy_id)
                .and_then(|pos| conn_index.map(|base| base + pos));
            w.u8(conn_elem.unwrap_or(0xff));
            let other = profile
                .slot_for_phy(phy_id)
                .and_then(|slot| {
                    cfg.index_of(
                        SubenclosureType::Lcc,
                        local,
                        ElementType::ArrayDeviceSlot,
                        GroupFilter::default(),
                    )
                    .map(|base| base + slot)
                });
            w.u8(other.unwrap_or(0xff));
        }
    }

    finish_page(&mut w);
    Ok(w.into_vec())
}

/// Connector element position (within the local LCC's connector group) that
/// carries a phy, if the phy is wired to a wide-port lane.
fn connector_for_phy(encl: &VirtualEnclosure, phy_id: u8) -> Option<u8> {
    let profile = encl.profile();
    for (conn_id, lanes) in profile.connector_to_phy.iter().enumerate() {
        if let Some(lane) = lanes.iter().position(|&p| p == phy_id) {
            // Whole-connector element first, lanes follow it.
            return Some(conn_id as u8 * profile.conns_per_port + 1 + lane as u8);
        }
    }
    None
}

/// Emulated drives sit directly below the enclosure's address.
pub(crate) fn drive_sas_address(enclosure_address: u64, slot: u8) -> u64 {
    enclosure_address + 1 + slot as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use eses_registry::Registry;
    use eses_topology::EnclosureType;
    use eses_wire::element::{ArrayDeviceSlotStatus, ExpanderPhyStatus};
    use eses_wire::page::PageHeader;

    fn enclosure() -> VirtualEnclosure {
        let registry = Registry::build().unwrap();
        VirtualEnclosure::new(&registry, EnclosureType::Viper, 0x5000_0972_0000_1000)
    }

    #[test]
    fn status_page_has_registry_size_and_gen_code() {
        let encl = enclosure();
        let page = build_enclosure_status_page(&encl).unwrap();
        assert_eq!(page.len(), encl.config().status_page_size as usize);
        let hdr = PageHeader::decode(&page).unwrap();
        assert_eq!(hdr.page_code, 0x02);
        assert_eq!(hdr.page_size(), page.len());
        assert_eq!(hdr.gen_code, encl.generation_code());
    }

    #[test]
    fn slot_and_phy_elements_land_at_registry_offsets() {
        let encl = enclosure();
        let page = build_enclosure_status_page(&encl).unwrap();
        let cfg = encl.config();

        let slots = cfg
            .find_group(
                SubenclosureType::Lcc,
                Side::A.id(),
                ElementType::ArrayDeviceSlot,
                GroupFilter::default(),
            )
            .unwrap();
        let first = slots.individual_offset(0) as usize;
        let parsed =
            ArrayDeviceSlotStatus::from_bytes(page[first..first + 4].try_into().unwrap());
        assert_eq!(parsed, encl.state.drive_slots[0]);

        let phys = cfg
            .find_group(
                SubenclosureType::Lcc,
                Side::A.id(),
                ElementType::ExpanderPhy,
                GroupFilter::default(),
            )
            .unwrap();
        let at = phys.individual_offset(5) as usize;
        let phy = ExpanderPhyStatus::from_bytes(page[at..at + 4].try_into().unwrap());
        assert_eq!(phy.phy_id, 5);
        assert!(phy.phy_ready);
        // exp_index points at the local expander group
        let exp_index = cfg
            .index_of(
                SubenclosureType::Lcc,
                Side::A.id(),
                ElementType::SasExpander,
                GroupFilter::default(),
            )
            .unwrap();
        assert_eq!(phy.expander_index, exp_index);
    }

    #[test]
    fn peer_connectors_report_not_installed() {
        let encl = enclosure();
        let page = build_enclosure_status_page(&encl).unwrap();
        let g = encl
            .config()
            .find_group(
                SubenclosureType::Lcc,
                Side::B.id(),
                ElementType::SasConnector,
                GroupFilter::default(),
            )
            .unwrap();
        let at = g.individual_offset(1) as usize;
        let conn = SasConnectorStatus::from_bytes(page[at..at + 4].try_into().unwrap());
        assert_eq!(conn.common.code, StatusCode::NotInstalled);
        assert_eq!(conn.conn_physical_link, 0);
    }

    #[test]
    fn additional_page_lists_every_slot() {
        let encl = enclosure();
        let page = build_additional_status_page(&encl).unwrap();
        let hdr = PageHeader::decode(&page).unwrap();
        assert_eq!(hdr.page_code, 0x0a);
        assert_eq!(hdr.page_size(), page.len());

        // First descriptor: drive slot 0 with its wired phy.
        let d = &page[PAGE_HEADER_SIZE..];
        assert_eq!(d[0], 0x16);
        let slot_num = d[7];
        assert_eq!(slot_num, 0);
        let phy_id = d[28];
        assert_eq!(phy_id, encl.profile().phy_for_slot(0).unwrap());
        let addr = u64::from_be_bytes(d[20..28].try_into().unwrap());
        assert_eq!(addr, drive_sas_address(encl.sas_address(), 0));
    }
}
