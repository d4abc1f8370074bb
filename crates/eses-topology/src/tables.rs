//! The static per-model profiles.
//!
//! Counts and wiring follow the shipped expander firmware for each model.
//! Slot→phy maps are in slot order; connector maps are per connector id in
//! lane order.

use crate::{EnclosureIdentity, EnclosureProfile, EnclosureType};

const VIPER_SLOT_TO_PHY: &[u8] = &[20, 22, 23, 21, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9];
const VIPER_CONN_TO_PHY: &[&[u8]] = &[&[4, 5, 6, 7], &[0, 1, 2, 3]];

const PINECONE_SLOT_TO_PHY: &[u8] = &[19, 20, 21, 22, 15, 18, 23, 16, 17, 14, 13, 12];
const PINECONE_CONN_TO_PHY: &[&[u8]] = &[&[0, 1, 2, 3], &[4, 5, 6, 7]];

const MAGNUM_SLOT_TO_PHY: &[u8] = &[4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18];
const MAGNUM_CONN_TO_PHY: &[&[u8]] = &[&[0, 1, 2, 3]];

const BUNKER_SLOT_TO_PHY: &[u8] = &[12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26];
const BUNKER_CONN_TO_PHY: &[&[u8]] = &[&[1, 0, 2, 3], &[4, 5, 6, 7]];

const CITADEL_SLOT_TO_PHY: &[u8] = &[
    8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31,
    32,
];
const CITADEL_CONN_TO_PHY: &[&[u8]] = &[&[0, 1, 2, 3], &[4, 5, 6, 7]];

const DERRINGER_SLOT_TO_PHY: &[u8] = &[
    11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33,
    34, 35,
];
const DERRINGER_CONN_TO_PHY: &[&[u8]] = &[&[4, 5, 6, 7], &[0, 1, 2, 3]];

const ANCHO_SLOT_TO_PHY: &[u8] = &[23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 5];
const ANCHO_CONN_TO_PHY: &[&[u8]] = &[&[0, 1, 2, 3], &[6, 7, 8, 9]];

const TABASCO_SLOT_TO_PHY: &[u8] = &[
    11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33,
    34, 35,
];
const TABASCO_CONN_TO_PHY: &[&[u8]] = &[&[4, 5, 6, 7], &[0, 1, 2, 3]];

const VOYAGER_EE_SLOT_TO_PHY: &[u8] = &[
    6, 1, 2, 5, 9, 8, 3, 7, 15, 18, 22, 27, 0, 4, 12, 20, 23, 28, 11, 10, 13, 19, 24, 30, 14, 16,
    17, 21, 26, 25,
];
const VOYAGER_EE_CONN_TO_PHY: &[&[u8]] = &[&[31, 32, 33, 34]];

static PROFILES: &[EnclosureProfile] = &[
    EnclosureProfile {
        encl_type: EnclosureType::Viper,
        drive_slots: 15,
        phys: 36,
        conns_per_lcc: 10,
        conns_per_port: 5,
        lanes_per_port: 4,
        power_supplies: 2,
        cooling_per_ps: 2,
        temp_sensors_per_lcc: 1,
        two_digit_displays: 1,
        one_digit_displays: 1,
        drive_slot_to_phy: VIPER_SLOT_TO_PHY,
        connector_to_phy: VIPER_CONN_TO_PHY,
        identity: EnclosureIdentity {
            vendor_id: "EMC",
            product_id: "ESES VIPER",
            board_type: 0x0004,
            platform_type: 0x01,
            eses_version: 1,
        },
    },
    EnclosureProfile {
        encl_type: EnclosureType::Pinecone,
        drive_slots: 12,
        phys: 24,
        conns_per_lcc: 10,
        conns_per_port: 5,
        lanes_per_port: 4,
        power_supplies: 2,
        cooling_per_ps: 2,
        temp_sensors_per_lcc: 0,
        two_digit_displays: 1,
        one_digit_displays: 1,
        drive_slot_to_phy: PINECONE_SLOT_TO_PHY,
        connector_to_phy: PINECONE_CONN_TO_PHY,
        identity: EnclosureIdentity {
            vendor_id: "EMC",
            product_id: "ESES PINECONE",
            board_type: 0x0007,
            platform_type: 0x08,
            eses_version: 1,
        },
    },
    EnclosureProfile {
        encl_type: EnclosureType::Magnum,
        drive_slots: 15,
        phys: 24,
        conns_per_lcc: 5,
        conns_per_port: 5,
        lanes_per_port: 4,
        power_supplies: 0,
        cooling_per_ps: 0,
        temp_sensors_per_lcc: 0,
        two_digit_displays: 0,
        one_digit_displays: 0,
        drive_slot_to_phy: MAGNUM_SLOT_TO_PHY,
        connector_to_phy: MAGNUM_CONN_TO_PHY,
        identity: EnclosureIdentity {
            vendor_id: "EMC",
            product_id: "ESES MAGNUM",
            board_type: 0x0002,
            platform_type: 0x03,
            eses_version: 1,
        },
    },
    EnclosureProfile {
        encl_type: EnclosureType::Bunker,
        drive_slots: 15,
        phys: 36,
        conns_per_lcc: 10,
        conns_per_port: 5,
        lanes_per_port: 4,
        power_supplies: 0,
        cooling_per_ps: 0,
        temp_sensors_per_lcc: 0,
        two_digit_displays: 0,
        one_digit_displays: 0,
        drive_slot_to_phy: BUNKER_SLOT_TO_PHY,
        connector_to_phy: BUNKER_CONN_TO_PHY,
        identity: EnclosureIdentity {
            vendor_id: "EMC",
            product_id: "ESES BUNKER",
            board_type: 0x0005,
            platform_type: 0x04,
            eses_version: 1,
        },
    },
    EnclosureProfile {
        encl_type: EnclosureType::Citadel,
        drive_slots: 25,
        phys: 36,
        conns_per_lcc: 10,
        conns_per_port: 5,
        lanes_per_port: 4,
        power_supplies: 0,
        cooling_per_ps: 0,
        temp_sensors_per_lcc: 0,
        two_digit_displays: 0,
        one_digit_displays: 0,
        drive_slot_to_phy: CITADEL_SLOT_TO_PHY,
        connector_to_phy: CITADEL_CONN_TO_PHY,
        identity: EnclosureIdentity {
            vendor_id: "EMC",
            product_id: "ESES CITADEL",
            board_type: 0x0005,
            platform_type: 0x05,
            eses_version: 1,
        },
    },
    EnclosureProfile {
        encl_type: EnclosureType::Derringer,
        drive_slots: 25,
        phys: 36,
        conns_per_lcc: 10,
        conns_per_port: 5,
        lanes_per_port: 4,
        power_supplies: 2,
        cooling_per_ps: 2,
        temp_sensors_per_lcc: 1,
        two_digit_displays: 1,
        one_digit_displays: 1,
        drive_slot_to_phy: DERRINGER_SLOT_TO_PHY,
        connector_to_phy: DERRINGER_CONN_TO_PHY,
        identity: EnclosureIdentity {
            vendor_id: "EMC",
            product_id: "ESES DERRINGER",
            board_type: 0x0003,
            platform_type: 0x02,
            eses_version: 1,
        },
    },
    EnclosureProfile {
        encl_type: EnclosureType::Ancho,
        drive_slots: 15,
        phys: 36,
        conns_per_lcc: 10,
        conns_per_port: 5,
        lanes_per_port: 4,
        power_supplies: 2,
        cooling_per_ps: 2,
        temp_sensors_per_lcc: 1,
        two_digit_displays: 1,
        one_digit_displays: 1,
        drive_slot_to_phy: ANCHO_SLOT_TO_PHY,
        connector_to_phy: ANCHO_CONN_TO_PHY,
        identity: EnclosureIdentity {
            vendor_id: "EMC",
            product_id: "ESES ANCHO",
            board_type: 0x0013,
            platform_type: 0x16,
            eses_version: 1,
        },
    },
    EnclosureProfile {
        encl_type: EnclosureType::Tabasco,
        drive_slots: 25,
        phys: 36,
        conns_per_lcc: 10,
        conns_per_port: 5,
        lanes_per_port: 4,
        power_supplies: 2,
        cooling_per_ps: 2,
        temp_sensors_per_lcc: 1,
        two_digit_displays: 1,
        one_digit_displays: 1,
        drive_slot_to_phy: TABASCO_SLOT_TO_PHY,
        connector_to_phy: TABASCO_CONN_TO_PHY,
        identity: EnclosureIdentity {
            vendor_id: "EMC",
            product_id: "ESES TABASCO",
            board_type: 0x0014,
            platform_type: 0x17,
            eses_version: 1,
        },
    },
    EnclosureProfile {
        encl_type: EnclosureType::VoyagerEe,
        drive_slots: 30,
        phys: 36,
        conns_per_lcc: 5,
        conns_per_port: 5,
        lanes_per_port: 4,
        power_supplies: 0,
        cooling_per_ps: 0,
        temp_sensors_per_lcc: 0,
        two_digit_displays: 0,
        one_digit_displays: 0,
        drive_slot_to_phy: VOYAGER_EE_SLOT_TO_PHY,
        connector_to_phy: VOYAGER_EE_CONN_TO_PHY,
        identity: EnclosureIdentity {
            vendor_id: "EMC",
            product_id: "ESES VOYAGER EE",
            board_type: 0x0009,
            platform_type: 0x0a,
            eses_version: 1,
        },
    },
];

/// Profile for an enclosure model. Every variant of [`EnclosureType`] has an
/// entry.
pub fn profile(encl_type: EnclosureType) -> &'static EnclosureProfile {
    PROFILES
        .iter()
        .find(|p| p.encl_type == encl_type)
        .unwrap_or_else(|| unreachable!("profile table covers every EnclosureType"))
}
