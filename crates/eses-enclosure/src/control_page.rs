//! The Enclosure Control page processor.
//!
//! An incoming control page is laid out exactly like the Enclosure Status
//! page the client last read, so element positions come from the same
//! registry lookups the status builder uses. Groups the page layout does not
//! carry are skipped; a missing lookup that the layout says must exist is an
//! internal error.
//!
//! Only groups whose elements have the select bit set are applied, and the
//! side effects of applying them (drive login/logout, LCC power cycling) run
//! through the [`SlotActuator`] the caller supplies.

use eses_registry::{ElementGroup, GroupFilter, SubenclosureType};
use eses_topology::{Side, SIDE_MIDPLANE};
use eses_wire::element::{
    ArrayDeviceSlotControl, DisplayControl, ElementType, EnclosureControl, ExpanderPhyControl,
    StatusCode, DISPLAY_MODE_CHAR, ELEMENT_SIZE, POWER_CYCLE_RQST_BEGIN, POWER_CYCLE_RQST_CANCEL,
    POWER_CYCLE_RQST_RETURN_CC,
};
use eses_wire::page::{PageHeader, PAGE_LENGTH_ADJUST};
use eses_wire::WireError;
use tracing::debug;

use crate::actuator::SlotActuator;
use crate::enclosure::VirtualEnclosure;
use crate::{EsesError, Result};

/// Half-second ticks an LCC power cycle waits before dropping power.
const LCC_POWER_CYCLE_DELAY: u8 = 10;

/// Longest client-requested power-cycle delay accepted, in half seconds.
const MAX_POWER_CYCLE_DELAY: u8 = 60;

/// Applies an Enclosure Control page (02h).
///
/// The page length and generation code are validated before anything is
/// touched; groups are then applied in layout order, so an internal failure
/// mid-walk leaves earlier groups applied.
pub(crate) fn process_enclosure_control_page(
    encl: &mut VirtualEnclosure,
    act: &mut dyn SlotActuator,
    page: &[u8],
) -> Result<()> {
    let header = PageHeader::decode(page)?;
    let expected_len = encl.config().status_page_size as usize - PAGE_LENGTH_ADJUST;
    if header.page_length as usize != expected_len {
        return Err(EsesError::TransferRefused(
            "control page length does not match the configuration",
        ));
    }
    if page.len() < header.page_size() {
        return Err(WireError::MalformedPage {
            offset: 0,
            needed: header.page_size(),
            available: page.len(),
        }
        .into());
    }
    if header.gen_code != encl.generation_code() {
        debug!(
            page = header.gen_code,
            current = encl.generation_code(),
            "control page generation code mismatch"
        );
        return Err(EsesError::TransferRefused("generation code mismatch"));
    }

    let local = Side::A.id();

    if let Some(g) = find(encl, SubenclosureType::Lcc, local, ElementType::ExpanderPhy, None) {
        process_phy_elems(encl, act, page, &g)?;
    }
    if let Some(g) = find(
        encl,
        SubenclosureType::Lcc,
        local,
        ElementType::ArrayDeviceSlot,
        None,
    ) {
        process_drive_slot_elems(encl, act, page, &g)?;
    }
    if let Some(g) = find(
        encl,
        SubenclosureType::Chassis,
        SIDE_MIDPLANE,
        ElementType::Enclosure,
        None,
    ) {
        process_chassis_encl_elem(encl, page, &g)?;
    }
    if let Some(g) = find(encl, SubenclosureType::Lcc, local, ElementType::Enclosure, None) {
        process_local_encl_elem(encl, act, page, &g)?;
    }
    if let Some(g) = find(
        encl,
        SubenclosureType::Lcc,
        Side::B.id(),
        ElementType::Enclosure,
        None,
    ) {
        process_peer_encl_elem(encl, page, &g)?;
    }
    if let Some(g) = find(encl, SubenclosureType::Lcc, local, ElementType::Display, Some(2)) {
        process_display_elems(encl, page, &g, 0)?;
    }
    if let Some(g) = find(encl, SubenclosureType::Lcc, local, ElementType::Display, Some(1)) {
        process_display_elems(encl, page, &g, 2)?;
    }
    Ok(())
}

fn find(
    encl: &VirtualEnclosure,
    subencl_type: SubenclosureType,
    side: u8,
    elem_type: ElementType,
    num_elems: Option<u8>,
) -> Option<ElementGroup> {
    let filter = match num_elems {
        Some(n) => GroupFilter::num_elems(n),
        None => GroupFilter::default(),
    };
    encl.config()
        .find_group(subencl_type, side, elem_type, filter)
        .copied()
}

fn elem_bytes(page: &[u8], g: &ElementGroup, n: u8) -> Result<[u8; 4]> {
    let at = g.individual_offset(n) as usize;
    let raw = page.get(at..at + ELEMENT_SIZE).ok_or(WireError::MalformedPage {
        offset: at,
        needed: ELEMENT_SIZE,
        available: page.len().saturating_sub(at),
    })?;
    // The slice is exactly ELEMENT_SIZE long.
    Ok(raw.try_into().unwrap_or([0; ELEMENT_SIZE]))
}

/// Phy control elements: disable drops the phy to unavailable and logs the
/// attached drive out; enable brings it back and logs the drive in, provided
/// the slot is occupied and powered on. Phys force-disabled through the
/// management API ignore control pages until re-enabled the same way.
fn process_phy_elems(
    encl: &mut VirtualEnclosure,
    act: &mut dyn SlotActuator,
    page: &[u8],
    g: &ElementGroup,
) -> Result<()> {
    let profile = encl.profile();
    for phy_id in 0..g.num_possible_elems {
        let ctrl = ExpanderPhyControl::from_bytes(elem_bytes(page, g, phy_id)?);
        if !ctrl.common.selected() {
            continue;
        }
        let mut phy = *encl
            .state
            .phy(phy_id)
            .ok_or(EsesError::Internal("phy element without phy state"))?;
        if phy.force_disabled {
            continue;
        }

        let mut changed = false;
        if ctrl.common.disable() {
            if phy.common.code != StatusCode::Unavailable {
                phy.common.code = StatusCode::Unavailable;
                phy.phy_ready = false;
                changed = true;
                if let Some(slot) = profile.slot_for_phy(phy_id) {
                    if act.slot_occupied(slot) && act.drive_logged_in(slot) {
                        act.logout_drive(slot);
                    }
                }
            }
        } else if phy.common.code == StatusCode::Unavailable {
            phy.common.code = StatusCode::Ok;
            changed = true;
            if let Some(slot) = profile.slot_for_phy(phy_id) {
                if act.slot_occupied(slot) {
                    let slot_stat = encl
                        .state
                        .drive_slot(slot)
                        .ok_or(EsesError::Internal("phy maps to a slot without state"))?;
                    if !slot_stat.dev_off {
                        phy.phy_ready = true;
                        act.login_drive(slot);
                    }
                }
            }
        }

        *encl
            .state
            .phy_mut(phy_id)
            .ok_or(EsesError::Internal("phy element without phy state"))? = phy;
        if changed {
            encl.state.note_phy_change(phy_id);
        }
    }
    Ok(())
}

/// Drive-slot control elements. `dev_off` transitions power the slot off or
/// on with the matching logout/login; the requested ok/ident/fault patterns
/// are copied through unconditionally.
fn process_drive_slot_elems(
    encl: &mut VirtualEnclosure,
    act: &mut dyn SlotActuator,
    page: &[u8],
    g: &ElementGroup,
) -> Result<()> {
    let profile = encl.profile();
    for slot in 0..g.num_possible_elems {
        let ctrl = ArrayDeviceSlotControl::from_bytes(elem_bytes(page, g, slot)?);
        if !ctrl.common.selected() {
            continue;
        }
        let mut slot_stat = *encl
            .state
            .drive_slot(slot)
            .ok_or(EsesError::Internal("slot element without slot state"))?;
        let phy_id = profile
            .phy_for_slot(slot)
            .ok_or(EsesError::Internal("slot without a phy mapping"))?;
        let mut phy = *encl
            .state
            .phy(phy_id)
            .ok_or(EsesError::Internal("slot phy without phy state"))?;

        if act.slot_occupied(slot) {
            if ctrl.dev_off && !slot_stat.dev_off {
                // Power off: drop the phy ready bit and log the drive out if
                // it is still in (a phy control element earlier in this page
                // may already have logged it out).
                if phy.common.code != StatusCode::Unavailable {
                    phy.common.code = StatusCode::Ok;
                }
                phy.phy_ready = false;
                if act.drive_logged_in(slot) {
                    act.logout_drive(slot);
                }
                let count = &mut encl.state.slot_power_down_count[slot as usize];
                *count = count.wrapping_add(1);
                encl.state.note_phy_change(phy_id);
            } else if !ctrl.dev_off && slot_stat.dev_off && phy.common.code == StatusCode::Ok {
                phy.phy_ready = true;
                act.login_drive(slot);
                encl.state.note_phy_change(phy_id);
            }
        }

        // An empty powered-off slot stays powered off; inserting a drive
        // later does not power it back on.
        slot_stat.dev_off = ctrl.dev_off;
        slot_stat.ok = ctrl.rqst_ok;
        slot_stat.ident = ctrl.rqst_ident;
        slot_stat.fault_requested = ctrl.rqst_fault;

        *encl
            .state
            .drive_slot_mut(slot)
            .ok_or(EsesError::Internal("slot element without slot state"))? = slot_stat;
        *encl
            .state
            .phy_mut(phy_id)
            .ok_or(EsesError::Internal("slot phy without phy state"))? = phy;
    }
    Ok(())
}

fn process_chassis_encl_elem(
    encl: &mut VirtualEnclosure,
    page: &[u8],
    g: &ElementGroup,
) -> Result<()> {
    let ctrl = EnclosureControl::from_bytes(elem_bytes(page, g, 0)?);
    if !ctrl.common.selected() {
        return Ok(());
    }
    let stat = &mut encl.state.chassis_encl;
    stat.ident = ctrl.rqst_ident;
    stat.failure_indication = ctrl.rqst_failure;
    stat.failure_requested = ctrl.rqst_failure;
    stat.warning_indication = ctrl.rqst_warning;
    stat.warning_requested = ctrl.rqst_warning;
    Ok(())
}

/// The local LCC's enclosure element carries the indicator bits plus the
/// power-cycle request. Requesting a cycle resets the LCC (these models do
/// not power cycle the whole enclosure) and clears the per-slot counters.
fn process_local_encl_elem(
    encl: &mut VirtualEnclosure,
    act: &mut dyn SlotActuator,
    page: &[u8],
    g: &ElementGroup,
) -> Result<()> {
    let ctrl = EnclosureControl::from_bytes(elem_bytes(page, g, 0)?);
    if !ctrl.common.selected() {
        return Ok(());
    }
    let stat = &mut encl.state.local_encl;
    stat.ident = ctrl.rqst_ident;
    stat.failure_indication = ctrl.rqst_failure;
    stat.failure_requested = ctrl.rqst_failure;
    stat.warning_indication = ctrl.rqst_warning;
    stat.warning_requested = ctrl.rqst_warning;

    match ctrl.power_cycle_request {
        POWER_CYCLE_RQST_RETURN_CC => {
            return Err(EsesError::UnsupportedFunction(
                "power cycle request value 3 is not defined",
            ));
        }
        POWER_CYCLE_RQST_BEGIN => {
            if ctrl.power_off_duration != 0 || ctrl.power_cycle_delay > MAX_POWER_CYCLE_DELAY {
                return Err(EsesError::UnsupportedFunction(
                    "power cycle duration/delay out of range",
                ));
            }
            act.power_cycle_lcc(LCC_POWER_CYCLE_DELAY);
            encl.state.clear_slot_counters();
        }
        POWER_CYCLE_RQST_CANCEL => {
            // Nothing is scheduled far enough ahead to cancel.
        }
        _ => {}
    }
    Ok(())
}

/// The peer LCC's enclosure element takes the same indicator copies as the
/// local one; power cycling is only honored through the local element.
fn process_peer_encl_elem(
    encl: &mut VirtualEnclosure,
    page: &[u8],
    g: &ElementGroup,
) -> Result<()> {
    let ctrl = EnclosureControl::from_bytes(elem_bytes(page, g, 0)?);
    if !ctrl.common.selected() {
        return Ok(());
    }
    let stat = &mut encl.state.peer_encl;
    stat.ident = ctrl.rqst_ident;
    stat.failure_indication = ctrl.rqst_failure;
    stat.failure_requested = ctrl.rqst_failure;
    stat.warning_indication = ctrl.rqst_warning;
    stat.warning_requested = ctrl.rqst_warning;
    Ok(())
}

fn process_display_elems(
    encl: &mut VirtualEnclosure,
    page: &[u8],
    g: &ElementGroup,
    base_char: u8,
) -> Result<()> {
    for i in 0..g.num_possible_elems {
        let ctrl = DisplayControl::from_bytes(elem_bytes(page, g, i)?);
        if !ctrl.common.selected() {
            continue;
        }
        let display = encl
            .state
            .displays
            .get_mut((base_char + i) as usize)
            .ok_or(EsesError::Internal("display element without display state"))?;
        display.fail = ctrl.rqst_fail;
        display.ident = ctrl.rqst_ident;
        if ctrl.display_mode == DISPLAY_MODE_CHAR {
            display.display_char = ctrl.display_char;
            display.display_mode = ctrl.display_mode;
        }
    }
    Ok(())
}
