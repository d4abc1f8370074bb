//! Shared harness for the CDB-level integration tests.
#![allow(dead_code)] // not every test binary uses every helper

use eses_enclosure::SlotActuator;

/// Actuator that records every call so tests can assert exact effects.
#[derive(Debug, Default)]
pub struct TestActuator {
    pub occupied: Vec<u8>,
    pub logged_in: Vec<u8>,
    pub logins: Vec<u8>,
    pub logouts: Vec<u8>,
    pub drive_cycles: Vec<u8>,
    pub lcc_cycles: u32,
}

impl TestActuator {
    /// Drives present and logged in at the given slots.
    pub fn with_drives(slots: &[u8]) -> TestActuator {
        TestActuator {
            occupied: slots.to_vec(),
            logged_in: slots.to_vec(),
            ..Default::default()
        }
    }
}

impl SlotActuator for TestActuator {
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

pub const OP_INQUIRY: u8 = 0x12;
pub const OP_RECEIVE_DIAG: u8 = 0x1c;
pub const OP_SEND_DIAG: u8 = 0x1d;

/// RECEIVE DIAGNOSTIC RESULTS for a page, with a generous allocation.
pub fn receive_cdb(page_code: u8) -> [u8; 6] {
    [OP_RECEIVE_DIAG, 0x01, page_code, 0xff, 0xff, 0]
}

/// SEND DIAGNOSTIC carrying a parameter list of the given length.
pub fn send_cdb(list_len: usize) -> [u8; 6] {
    [
        OP_SEND_DIAG,
        0x10,
        0,
        (list_len >> 8) as u8,
        list_len as u8,
        0,
    ]
}

/// (sense key, ASC, ASCQ) of a failed command.
pub fn sense_of(outcome: &eses_enclosure::CommandOutcome) -> (u8, u8, u8) {
    let sense = outcome.sense.expect("CHECK CONDITION carries sense data");
    (sense[2] & 0x0f, sense[12], sense[13])
}
