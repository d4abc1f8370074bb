//! Per-hardware-variant topology tables for the emulated enclosures.
//!
//! Each enclosure model differs only in counts and wiring: how many drive
//! slots, how many expander phys, which phy each slot is cabled to, how the
//! wide-port connectors break out into lanes. One static table captures all
//! of it; everything that used to be a per-model special case is a lookup
//! plus shared arithmetic.

mod tables;

pub use tables::profile;

/// The enclosure models served by the emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnclosureType {
    Viper,
    Pinecone,
    Magnum,
    Bunker,
    Citadel,
    Derringer,
    Ancho,
    Tabasco,
    VoyagerEe,
}

impl EnclosureType {
    pub const ALL: [EnclosureType; 9] = [
        EnclosureType::Viper,
        EnclosureType::Pinecone,
        EnclosureType::Magnum,
        EnclosureType::Bunker,
        EnclosureType::Citadel,
        EnclosureType::Derringer,
        EnclosureType::Ancho,
        EnclosureType::Tabasco,
        EnclosureType::VoyagerEe,
    ];
}

/// LCC side within the enclosure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    A = 0,
    B = 1,
}

impl Side {
    pub fn peer(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// Side id used by midplane-mounted subenclosures (the chassis).
pub const SIDE_MIDPLANE: u8 = 0x1f;

/// Identity reported by INQUIRY and the configuration page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnclosureIdentity {
    pub vendor_id: &'static str,
    pub product_id: &'static str,
    pub board_type: u16,
    pub platform_type: u8,
    /// ESES specification revision implemented by the expander firmware.
    pub eses_version: u8,
}

/// Where a connector position falls within the LCC's connector list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorRange {
    /// Primary (host-facing) wide port.
    Upstream,
    /// Expansion wide port.
    Downstream,
    /// Internal connector wired to a child expander; carries the connector id.
    Internal { connector_id: u8 },
}

/// The static per-model profile.
///
/// Slot→phy maps come from the expander cabling of the real hardware; the
/// numbers are load bearing, clients key their drive management on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnclosureProfile {
    pub encl_type: EnclosureType,
    pub drive_slots: u8,
    pub phys: u8,
    /// Connector elements per LCC (all wide ports, every lane plus the
    /// whole-connector entries).
    pub conns_per_lcc: u8,
    /// Connector elements per wide port (1 whole-connector + lanes).
    pub conns_per_port: u8,
    /// Individual lanes per wide port.
    pub lanes_per_port: u8,
    pub power_supplies: u8,
    pub cooling_per_ps: u8,
    pub temp_sensors_per_lcc: u8,
    /// Display characters: (two-digit displays, one-digit displays).
    pub two_digit_displays: u8,
    pub one_digit_displays: u8,
    pub drive_slot_to_phy: &'static [u8],
    /// Per connector id, the phy of each individual lane.
    pub connector_to_phy: &'static [&'static [u8]],
    pub identity: EnclosureIdentity,
}

impl EnclosureProfile {
    /// Phy wired to a drive slot.
    pub fn phy_for_slot(&self, slot: u8) -> Option<u8> {
        self.drive_slot_to_phy.get(slot as usize).copied()
    }

    /// Drive slot a phy is wired to, if any.
    pub fn slot_for_phy(&self, phy_id: u8) -> Option<u8> {
        self.drive_slot_to_phy
            .iter()
            .position(|&p| p == phy_id)
            .map(|slot| slot as u8)
    }

    /// Total display characters.
    pub fn display_chars(&self) -> u8 {
        self.two_digit_displays * 2 + self.one_digit_displays
    }

    /// Lane number reported in a connector element's physical-link field:
    /// 0xFF for the whole-connector entry, otherwise the lane within the
    /// port.
    pub fn conn_physical_link(&self, position: u8) -> Option<u8> {
        if position >= self.conns_per_lcc {
            return None;
        }
        let within_port = position % self.conns_per_port;
        if within_port == 0 {
            Some(0xff)
        } else {
            Some(within_port - 1)
        }
    }

    /// Classifies a connector position. Port 0 is upstream, port 1 is the
    /// expansion port; further ports are internal connectors.
    pub fn conn_range(&self, position: u8) -> Option<ConnectorRange> {
        if position >= self.conns_per_lcc {
            return None;
        }
        let port = position / self.conns_per_port;
        match port {
            0 => Some(ConnectorRange::Upstream),
            1 if self.has_expansion_port() => Some(ConnectorRange::Downstream),
            n => Some(ConnectorRange::Internal { connector_id: n }),
        }
    }

    /// Single-ported models (edge expanders wired straight to the
    /// controller) have no expansion connector.
    pub fn has_expansion_port(&self) -> bool {
        self.conns_per_lcc > self.conns_per_port
    }
}
