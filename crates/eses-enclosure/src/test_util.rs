//! Recording actuator shared by the engine's unit tests.

use crate::actuator::SlotActuator;

/// Tracks every actuation so tests can assert on exact call sequences.
#[derive(Debug, Default)]
pub(crate) struct RecordingActuator {
    pub occupied: Vec<u8>,
    pub logged_in: Vec<u8>,
    pub logins: Vec<u8>,
    pub logouts: Vec<u8>,
    pub drive_cycles: Vec<u8>,
    pub lcc_cycles: u32,
}

impl RecordingActuator {
    /// Drives present and logged in at the given slots.
    pub fn occupied(slots: Vec<u8>) -> RecordingActuator {
        RecordingActuator {
            occupied: slots.clone(),
            logged_in: slots,
            ..Default::default()
        }
    }
}

impl SlotActuator for RecordingActuator {
    fn slot_occupied(&self, slot: u8) -> bool {
        self.occupied.contains(&slot)
    }

    fn drive_logged_in(&self, slot: u8) -> bool {
        self.logged_in.contains(&slot)
    }

    fn login_drive(&mut self, slot: u8) {
        self.logins.push(slot);
        if !self.logged_in.contains(&slot) {
            self.logged_in.push(slot);
        }
    }

    fn logout_drive(&mut self, slot: u8) {
        self.logouts.push(slot);
        self.logged_in.retain(|&s| s != slot);
    }

    fn power_cycle_drive(&mut self, slot: u8) {
        self.drive_cycles.push(slot);
    }

    fn power_cycle_lcc(&mut self, _delay: u8) {
        self.lcc_cycles += 1;
    }
}
