//! Live element state for one virtual enclosure.

use eses_topology::EnclosureProfile;
use eses_wire::element::{
    ArrayDeviceSlotStatus, CommonStatus, CoolingStatus, DisplayStatus, EnclosureStatus,
    EscElectronicsStatus, ExpanderPhyStatus, PowerSupplyStatus, SasConnectorStatus,
    SasExpanderStatus, StatusCode, TempSensorStatus, CONN_TYPE_MINI_SAS_4X, DISPLAY_MODE_CHAR,
};

/// Power-on default for temperature sensors: 25 C, reported with the
/// protocol's +20 offset.
const DEFAULT_TEMP_READING: u8 = 25 + 20;

/// Cooling defaults: medium speed code, 3300 rpm reported in tens.
const DEFAULT_SPEED_CODE: u8 = 4;
const DEFAULT_FAN_SPEED: u16 = 330;

/// Every addressable element's live status, plus the per-slot counters the
/// EMC statistics page reports.
///
/// Local means the emulated services processor's own LCC (side A); the peer
/// LCC's elements are tracked so peer-addressed status groups can be served.
#[derive(Debug, Clone)]
pub struct ElementStateStore {
    pub phys: Vec<ExpanderPhyStatus>,
    /// State transitions per phy, reported by the statistics page.
    pub phy_change_count: Vec<u8>,
    pub drive_slots: Vec<ArrayDeviceSlotStatus>,
    pub slot_insert_count: Vec<u8>,
    pub slot_power_down_count: Vec<u8>,
    pub local_conns: Vec<SasConnectorStatus>,
    pub power_supplies: Vec<PowerSupplyStatus>,
    /// Cooling elements, grouped per power supply.
    pub cooling: Vec<CoolingStatus>,
    pub temp_sensors_local: Vec<TempSensorStatus>,
    pub temp_sensors_peer: Vec<TempSensorStatus>,
    pub displays: Vec<DisplayStatus>,
    pub local_encl: EnclosureStatus,
    pub peer_encl: EnclosureStatus,
    pub chassis_encl: EnclosureStatus,
    pub local_expander: SasExpanderStatus,
    pub peer_expander: SasExpanderStatus,
    pub local_esc: EscElectronicsStatus,
    pub peer_esc: EscElectronicsStatus,
}

impl ElementStateStore {
    /// Power-on state: everything installed reports OK, phys are ready.
    pub fn new(profile: &EnclosureProfile) -> ElementStateStore {
        let phys = (0..profile.phys)
            .map(|i| ExpanderPhyStatus {
                common: CommonStatus::ok(),
                phy_id: i,
                phy_ready: true,
                link_ready: true,
                spinup_enabled: true,
                ..Default::default()
            })
            .collect();
        let drive_slots = (0..profile.drive_slots)
            .map(|_| ArrayDeviceSlotStatus {
                common: CommonStatus::ok(),
                ..Default::default()
            })
            .collect();
        let local_conns = (0..profile.conns_per_lcc)
            .map(|_| SasConnectorStatus {
                common: CommonStatus::ok(),
                conn_type: CONN_TYPE_MINI_SAS_4X,
                ..Default::default()
            })
            .collect();
        let power_supplies = (0..profile.power_supplies)
            .map(|_| PowerSupplyStatus {
                common: CommonStatus::ok(),
                requested_on: true,
                ..Default::default()
            })
            .collect();
        let cooling = (0..profile.power_supplies * profile.cooling_per_ps)
            .map(|_| CoolingStatus {
                common: CommonStatus::ok(),
                requested_on: true,
                actual_speed_code: DEFAULT_SPEED_CODE,
                actual_fan_speed: DEFAULT_FAN_SPEED,
                ..Default::default()
            })
            .collect();
        let temp_sensor = TempSensorStatus {
            common: CommonStatus::ok(),
            temp: DEFAULT_TEMP_READING,
            ..Default::default()
        };
        let displays = (0..profile.display_chars())
            .map(|_| DisplayStatus {
                common: CommonStatus::ok(),
                display_mode: DISPLAY_MODE_CHAR,
                display_char: b' ',
                ..Default::default()
            })
            .collect();
        let encl = EnclosureStatus {
            common: CommonStatus::ok(),
            ..Default::default()
        };
        ElementStateStore {
            phys,
            phy_change_count: vec![0; profile.phys as usize],
            drive_slots,
            slot_insert_count: vec![0; profile.drive_slots as usize],
            slot_power_down_count: vec![0; profile.drive_slots as usize],
            local_conns,
            power_supplies,
            cooling,
            temp_sensors_local: vec![temp_sensor; profile.temp_sensors_per_lcc as usize],
            temp_sensors_peer: vec![temp_sensor; profile.temp_sensors_per_lcc as usize],
            displays,
            local_encl: encl,
            peer_encl: encl,
            chassis_encl: encl,
            local_expander: SasExpanderStatus {
                common: CommonStatus::ok(),
                ..Default::default()
            },
            peer_expander: SasExpanderStatus {
                common: CommonStatus::ok(),
                ..Default::default()
            },
            local_esc: EscElectronicsStatus {
                common: CommonStatus::ok(),
                report: true,
                ..Default::default()
            },
            peer_esc: EscElectronicsStatus {
                common: CommonStatus::ok(),
                ..Default::default()
            },
        }
    }

    pub fn phy(&self, phy_id: u8) -> Option<&ExpanderPhyStatus> {
        self.phys.get(phy_id as usize)
    }

    pub fn phy_mut(&mut self, phy_id: u8) -> Option<&mut ExpanderPhyStatus> {
        self.phys.get_mut(phy_id as usize)
    }

    pub fn drive_slot(&self, slot: u8) -> Option<&ArrayDeviceSlotStatus> {
        self.drive_slots.get(slot as usize)
    }

    pub fn drive_slot_mut(&mut self, slot: u8) -> Option<&mut ArrayDeviceSlotStatus> {
        self.drive_slots.get_mut(slot as usize)
    }

    /// Marks a phy disabled the way the firmware does: unavailable with the
    /// ready bit dropped.
    pub fn force_phy_down(&mut self, phy_id: u8) {
        if let Some(phy) = self.phys.get_mut(phy_id as usize) {
            phy.common.code = StatusCode::Unavailable;
            phy.phy_ready = false;
        }
        self.note_phy_change(phy_id);
    }

    /// Bumps the per-phy change counter the statistics page reports.
    pub fn note_phy_change(&mut self, phy_id: u8) {
        if let Some(c) = self.phy_change_count.get_mut(phy_id as usize) {
            *c = c.wrapping_add(1);
        }
    }

    /// Records a drive insertion; the count surfaces in the EMC statistics
    /// page until an LCC power cycle clears it.
    pub fn record_insertion(&mut self, slot: u8) {
        if let Some(c) = self.slot_insert_count.get_mut(slot as usize) {
            *c = c.wrapping_add(1);
        }
    }

    pub fn clear_slot_counters(&mut self) {
        self.slot_insert_count.iter_mut().for_each(|c| *c = 0);
        self.slot_power_down_count.iter_mut().for_each(|c| *c = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eses_topology::{profile, EnclosureType};

    #[test]
    fn power_on_defaults() {
        let p = profile(EnclosureType::Viper);
        let s = ElementStateStore::new(p);
        assert_eq!(s.phys.len(), 36);
        assert!(s.phys.iter().all(|p| p.phy_ready));
        assert_eq!(s.phys[21].phy_id, 21);
        assert_eq!(s.drive_slots.len(), 15);
        assert!(s.drive_slots.iter().all(|d| d.common.code == StatusCode::Ok));
        assert_eq!(s.cooling.len(), 4);
        assert_eq!(s.displays.len(), 3);
        assert!(s.local_esc.report);
        assert!(!s.peer_esc.report);
    }

    #[test]
    fn force_phy_down_drops_ready() {
        let p = profile(EnclosureType::Viper);
        let mut s = ElementStateStore::new(p);
        s.force_phy_down(9);
        assert_eq!(s.phys[9].common.code, StatusCode::Unavailable);
        assert!(!s.phys[9].phy_ready);
        assert_eq!(s.phy_change_count[9], 1);
    }
}
