//! The 4-byte status and control element records.
//!
//! Each element group in the Enclosure Status/Control pages is a run of
//! fixed 4-byte records: one overall record followed by one record per
//! possible element. Byte 0 is common to every kind (the status code or the
//! select/disable control bits); bytes 1-3 are kind specific and bit-packed.
//! The layouts here follow the ESES 1.0 records byte for byte.

use bitflags::bitflags;

/// Size of every status/control element record.
pub const ELEMENT_SIZE: usize = 4;

/// Element types appearing in type descriptor headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    PowerSupply = 0x02,
    Cooling = 0x03,
    TempSensor = 0x04,
    EscElectronics = 0x07,
    Ups = 0x0b,
    Display = 0x0c,
    Enclosure = 0x0e,
    Language = 0x10,
    ArrayDeviceSlot = 0x17,
    SasExpander = 0x18,
    SasConnector = 0x19,
    /// EMC-specific expander phy element.
    ExpanderPhy = 0x81,
}

impl ElementType {
    pub fn from_u8(v: u8) -> Option<ElementType> {
        match v {
            0x02 => Some(ElementType::PowerSupply),
            0x03 => Some(ElementType::Cooling),
            0x04 => Some(ElementType::TempSensor),
            0x07 => Some(ElementType::EscElectronics),
            0x0b => Some(ElementType::Ups),
            0x0c => Some(ElementType::Display),
            0x0e => Some(ElementType::Enclosure),
            0x10 => Some(ElementType::Language),
            0x17 => Some(ElementType::ArrayDeviceSlot),
            0x18 => Some(ElementType::SasExpander),
            0x19 => Some(ElementType::SasConnector),
            0x81 => Some(ElementType::ExpanderPhy),
            _ => None,
        }
    }
}

/// Element status codes (low nibble of status byte 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum StatusCode {
    #[default]
    Unsupported = 0x0,
    Ok = 0x1,
    Critical = 0x2,
    NonCritical = 0x3,
    Unrecoverable = 0x4,
    NotInstalled = 0x5,
    Unknown = 0x6,
    /// Installed with no errors but not turned on.
    Unavailable = 0x7,
}

impl StatusCode {
    pub fn from_u8(v: u8) -> Option<StatusCode> {
        match v & 0x0f {
            0x0 => Some(StatusCode::Unsupported),
            0x1 => Some(StatusCode::Ok),
            0x2 => Some(StatusCode::Critical),
            0x3 => Some(StatusCode::NonCritical),
            0x4 => Some(StatusCode::Unrecoverable),
            0x5 => Some(StatusCode::NotInstalled),
            0x6 => Some(StatusCode::Unknown),
            0x7 => Some(StatusCode::Unavailable),
            _ => None,
        }
    }
}

/// Common status byte: status code plus swap/predicted-failure bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommonStatus {
    pub code: StatusCode,
    pub swap: bool,
    pub prd_fail: bool,
}

impl CommonStatus {
    pub fn ok() -> CommonStatus {
        CommonStatus {
            code: StatusCode::Ok,
            ..Default::default()
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut b = self.code as u8;
        if self.swap {
            b |= 1 << 4;
        }
        if self.prd_fail {
            b |= 1 << 6;
        }
        b
    }

    pub fn from_byte(b: u8) -> CommonStatus {
        CommonStatus {
            // The nibble covers every defined code, so the unwrap cannot
            // trip; fall back to Unsupported anyway.
            code: StatusCode::from_u8(b).unwrap_or(StatusCode::Unsupported),
            swap: b & (1 << 4) != 0,
            prd_fail: b & (1 << 6) != 0,
        }
    }
}

bitflags! {
    /// Common control byte of every control element.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CommonControl: u8 {
        const RST_SWAP = 1 << 4;
        const DISABLE = 1 << 5;
        const PRD_FAIL = 1 << 6;
        const SELECT = 1 << 7;
    }
}

impl CommonControl {
    pub fn selected(self) -> bool {
        self.contains(CommonControl::SELECT)
    }

    pub fn disable(self) -> bool {
        self.contains(CommonControl::DISABLE)
    }
}

fn bit(b: u8, n: u8) -> bool {
    b & (1 << n) != 0
}

fn set(b: &mut u8, n: u8, v: bool) {
    if v {
        *b |= 1 << n;
    }
}

/// Power supply status element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerSupplyStatus {
    pub common: CommonStatus,
    pub ident: bool,
    pub dc_over_current: bool,
    pub dc_under_voltage: bool,
    pub dc_over_voltage: bool,
    pub dc_fail: bool,
    pub ac_fail: bool,
    pub temp_warn: bool,
    pub over_temp_fail: bool,
    pub off: bool,
    pub requested_on: bool,
    pub fail: bool,
    pub hot_swap: bool,
}

impl PowerSupplyStatus {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.to_byte(), 0, 0, 0];
        set(&mut b[1], 7, self.ident);
        set(&mut b[2], 1, self.dc_over_current);
        set(&mut b[2], 2, self.dc_under_voltage);
        set(&mut b[2], 3, self.dc_over_voltage);
        set(&mut b[3], 0, self.dc_fail);
        set(&mut b[3], 1, self.ac_fail);
        set(&mut b[3], 2, self.temp_warn);
        set(&mut b[3], 3, self.over_temp_fail);
        set(&mut b[3], 4, self.off);
        set(&mut b[3], 5, self.requested_on);
        set(&mut b[3], 6, self.fail);
        set(&mut b[3], 7, self.hot_swap);
        b
    }

    pub fn from_bytes(b: [u8; 4]) -> PowerSupplyStatus {
        PowerSupplyStatus {
            common: CommonStatus::from_byte(b[0]),
            ident: bit(b[1], 7),
            dc_over_current: bit(b[2], 1),
            dc_under_voltage: bit(b[2], 2),
            dc_over_voltage: bit(b[2], 3),
            dc_fail: bit(b[3], 0),
            ac_fail: bit(b[3], 1),
            temp_warn: bit(b[3], 2),
            over_temp_fail: bit(b[3], 3),
            off: bit(b[3], 4),
            requested_on: bit(b[3], 5),
            fail: bit(b[3], 6),
            hot_swap: bit(b[3], 7),
        }
    }
}

/// Power supply control element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerSupplyControl {
    pub common: CommonControl,
    pub rqst_ident: bool,
    pub rqst_on: bool,
    pub rqst_fail: bool,
}

impl PowerSupplyControl {
    pub fn from_bytes(b: [u8; 4]) -> PowerSupplyControl {
        PowerSupplyControl {
            common: CommonControl::from_bits_truncate(b[0]),
            rqst_ident: bit(b[1], 7),
            rqst_on: bit(b[3], 5),
            rqst_fail: bit(b[3], 6),
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.bits(), 0, 0, 0];
        set(&mut b[1], 7, self.rqst_ident);
        set(&mut b[3], 5, self.rqst_on);
        set(&mut b[3], 6, self.rqst_fail);
        b
    }
}

/// Cooling (fan) status element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoolingStatus {
    pub common: CommonStatus,
    pub ident: bool,
    /// Fan speed in tens of RPM (10 bits on the wire).
    pub actual_fan_speed: u16,
    pub actual_speed_code: u8,
    pub off: bool,
    pub requested_on: bool,
    pub fail: bool,
}

impl CoolingStatus {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.to_byte(), 0, 0, 0];
        b[1] = ((self.actual_fan_speed >> 8) & 0x03) as u8;
        set(&mut b[1], 7, self.ident);
        b[2] = (self.actual_fan_speed & 0xff) as u8;
        b[3] = self.actual_speed_code & 0x07;
        set(&mut b[3], 4, self.off);
        set(&mut b[3], 5, self.requested_on);
        set(&mut b[3], 6, self.fail);
        b
    }

    pub fn from_bytes(b: [u8; 4]) -> CoolingStatus {
        CoolingStatus {
            common: CommonStatus::from_byte(b[0]),
            ident: bit(b[1], 7),
            actual_fan_speed: ((b[1] as u16 & 0x03) << 8) | b[2] as u16,
            actual_speed_code: b[3] & 0x07,
            off: bit(b[3], 4),
            requested_on: bit(b[3], 5),
            fail: bit(b[3], 6),
        }
    }
}

/// Cooling control element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoolingControl {
    pub common: CommonControl,
    pub rqst_ident: bool,
    pub requested_speed_code: u8,
    pub rqst_on: bool,
    pub rqst_fail: bool,
}

impl CoolingControl {
    pub fn from_bytes(b: [u8; 4]) -> CoolingControl {
        CoolingControl {
            common: CommonControl::from_bits_truncate(b[0]),
            rqst_ident: bit(b[1], 7),
            requested_speed_code: b[3] & 0x07,
            rqst_on: bit(b[3], 5),
            rqst_fail: bit(b[3], 6),
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.bits(), 0, 0, 0];
        set(&mut b[1], 7, self.rqst_ident);
        b[3] = self.requested_speed_code & 0x07;
        set(&mut b[3], 5, self.rqst_on);
        set(&mut b[3], 6, self.rqst_fail);
        b
    }
}

/// Temperature sensor status element. The temperature field carries the
/// reading offset by +20 degrees C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TempSensorStatus {
    pub common: CommonStatus,
    pub ident: bool,
    pub temp: u8,
    pub ot_warning: bool,
    pub ot_failure: bool,
}

impl TempSensorStatus {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.to_byte(), 0, self.temp, 0];
        set(&mut b[1], 7, self.ident);
        set(&mut b[3], 2, self.ot_warning);
        set(&mut b[3], 3, self.ot_failure);
        b
    }

    pub fn from_bytes(b: [u8; 4]) -> TempSensorStatus {
        TempSensorStatus {
            common: CommonStatus::from_byte(b[0]),
            ident: bit(b[1], 7),
            temp: b[2],
            ot_warning: bit(b[3], 2),
            ot_failure: bit(b[3], 3),
        }
    }
}

/// ESC electronics (LCC controller) status element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscElectronicsStatus {
    pub common: CommonStatus,
    pub fail: bool,
    pub ident: bool,
    /// True on the local LCC, false on the peer.
    pub report: bool,
    pub hot_swap: bool,
}

impl EscElectronicsStatus {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.to_byte(), 0, 0, 0];
        set(&mut b[1], 6, self.fail);
        set(&mut b[1], 7, self.ident);
        set(&mut b[2], 0, self.report);
        set(&mut b[3], 7, self.hot_swap);
        b
    }

    pub fn from_bytes(b: [u8; 4]) -> EscElectronicsStatus {
        EscElectronicsStatus {
            common: CommonStatus::from_byte(b[0]),
            fail: bit(b[1], 6),
            ident: bit(b[1], 7),
            report: bit(b[2], 0),
            hot_swap: bit(b[3], 7),
        }
    }
}

/// Array device slot status element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayDeviceSlotStatus {
    pub common: CommonStatus,
    pub ok: bool,
    pub ident: bool,
    pub rmv: bool,
    pub ready_to_insert: bool,
    pub do_not_remove: bool,
    pub dev_off: bool,
    pub fault_requested: bool,
    pub fault_sensed: bool,
}

impl ArrayDeviceSlotStatus {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.to_byte(), 0, 0, 0];
        set(&mut b[1], 7, self.ok);
        set(&mut b[2], 1, self.ident);
        set(&mut b[2], 2, self.rmv);
        set(&mut b[2], 3, self.ready_to_insert);
        set(&mut b[2], 6, self.do_not_remove);
        set(&mut b[3], 4, self.dev_off);
        set(&mut b[3], 5, self.fault_requested);
        set(&mut b[3], 6, self.fault_sensed);
        b
    }

    pub fn from_bytes(b: [u8; 4]) -> ArrayDeviceSlotStatus {
        ArrayDeviceSlotStatus {
            common: CommonStatus::from_byte(b[0]),
            ok: bit(b[1], 7),
            ident: bit(b[2], 1),
            rmv: bit(b[2], 2),
            ready_to_insert: bit(b[2], 3),
            do_not_remove: bit(b[2], 6),
            dev_off: bit(b[3], 4),
            fault_requested: bit(b[3], 5),
            fault_sensed: bit(b[3], 6),
        }
    }
}

/// Array device slot control element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayDeviceSlotControl {
    pub common: CommonControl,
    pub rqst_ok: bool,
    pub rqst_ident: bool,
    pub rqst_rmv: bool,
    pub rqst_insert: bool,
    pub do_not_remove: bool,
    pub dev_off: bool,
    pub rqst_fault: bool,
}

impl ArrayDeviceSlotControl {
    pub fn from_bytes(b: [u8; 4]) -> ArrayDeviceSlotControl {
        ArrayDeviceSlotControl {
            common: CommonControl::from_bits_truncate(b[0]),
            rqst_ok: bit(b[1], 7),
            rqst_ident: bit(b[2], 1),
            rqst_rmv: bit(b[2], 2),
            rqst_insert: bit(b[2], 3),
            do_not_remove: bit(b[2], 6),
            dev_off: bit(b[3], 4),
            rqst_fault: bit(b[3], 5),
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.bits(), 0, 0, 0];
        set(&mut b[1], 7, self.rqst_ok);
        set(&mut b[2], 1, self.rqst_ident);
        set(&mut b[2], 2, self.rqst_rmv);
        set(&mut b[2], 3, self.rqst_insert);
        set(&mut b[2], 6, self.do_not_remove);
        set(&mut b[3], 4, self.dev_off);
        set(&mut b[3], 5, self.rqst_fault);
        b
    }
}

/// Expander phy status element (EMC type 0x81).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpanderPhyStatus {
    pub common: CommonStatus,
    /// Element index of the expander containing this phy.
    pub expander_index: u8,
    pub phy_id: u8,
    pub force_disabled: bool,
    pub carrier_detect: bool,
    pub sata_spinup_hold: bool,
    pub spinup_enabled: bool,
    pub link_ready: bool,
    pub phy_ready: bool,
}

impl ExpanderPhyStatus {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.to_byte(), self.expander_index, 0, 0];
        b[2] = self.phy_id & 0x7f;
        set(&mut b[2], 7, self.force_disabled);
        set(&mut b[3], 3, self.carrier_detect);
        set(&mut b[3], 4, self.sata_spinup_hold);
        set(&mut b[3], 5, self.spinup_enabled);
        set(&mut b[3], 6, self.link_ready);
        set(&mut b[3], 7, self.phy_ready);
        b
    }

    pub fn from_bytes(b: [u8; 4]) -> ExpanderPhyStatus {
        ExpanderPhyStatus {
            common: CommonStatus::from_byte(b[0]),
            expander_index: b[1],
            phy_id: b[2] & 0x7f,
            force_disabled: bit(b[2], 7),
            carrier_detect: bit(b[3], 3),
            sata_spinup_hold: bit(b[3], 4),
            spinup_enabled: bit(b[3], 5),
            link_ready: bit(b[3], 6),
            phy_ready: bit(b[3], 7),
        }
    }
}

/// Expander phy control element. Only the common byte matters to the
/// emulation (disable/select); the spinup bits are carried for fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpanderPhyControl {
    pub common: CommonControl,
    pub spinup_sas: bool,
    pub force_enable: bool,
}

impl ExpanderPhyControl {
    pub fn from_bytes(b: [u8; 4]) -> ExpanderPhyControl {
        ExpanderPhyControl {
            common: CommonControl::from_bits_truncate(b[0]),
            spinup_sas: bit(b[3], 6),
            force_enable: bit(b[3], 7),
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.bits(), 0, 0, 0];
        set(&mut b[3], 6, self.spinup_sas);
        set(&mut b[3], 7, self.force_enable);
        b
    }
}

/// SAS connector status element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SasConnectorStatus {
    pub common: CommonStatus,
    pub conn_type: u8,
    pub ident: bool,
    /// Lane within the wide port, or 0xFF for the whole-connector element.
    pub conn_physical_link: u8,
    pub fail: bool,
}

/// Connector type codes.
pub const CONN_TYPE_MINI_SAS_4X: u8 = 0x2;
pub const CONN_TYPE_INTERNAL: u8 = 0x3f;
pub const ENTIRE_CONNECTOR_PHYSICAL_LINK: u8 = 0xff;

impl SasConnectorStatus {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [
            self.common.to_byte(),
            self.conn_type & 0x7f,
            self.conn_physical_link,
            0,
        ];
        set(&mut b[1], 7, self.ident);
        set(&mut b[3], 6, self.fail);
        b
    }

    pub fn from_bytes(b: [u8; 4]) -> SasConnectorStatus {
        SasConnectorStatus {
            common: CommonStatus::from_byte(b[0]),
            conn_type: b[1] & 0x7f,
            ident: bit(b[1], 7),
            conn_physical_link: b[2],
            fail: bit(b[3], 6),
        }
    }
}

/// SAS connector control element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SasConnectorControl {
    pub common: CommonControl,
    pub rqst_ident: bool,
    pub rqst_fail: bool,
}

impl SasConnectorControl {
    pub fn from_bytes(b: [u8; 4]) -> SasConnectorControl {
        SasConnectorControl {
            common: CommonControl::from_bits_truncate(b[0]),
            rqst_ident: bit(b[1], 7),
            rqst_fail: bit(b[3], 6),
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.bits(), 0, 0, 0];
        set(&mut b[1], 7, self.rqst_ident);
        set(&mut b[3], 6, self.rqst_fail);
        b
    }
}

/// SAS expander status element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SasExpanderStatus {
    pub common: CommonStatus,
    pub fail: bool,
    pub ident: bool,
}

impl SasExpanderStatus {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.to_byte(), 0, 0, 0];
        set(&mut b[1], 6, self.fail);
        set(&mut b[1], 7, self.ident);
        b
    }

    pub fn from_bytes(b: [u8; 4]) -> SasExpanderStatus {
        SasExpanderStatus {
            common: CommonStatus::from_byte(b[0]),
            fail: bit(b[1], 6),
            ident: bit(b[1], 7),
        }
    }
}

/// UPS/SPS status element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpsStatus {
    pub common: CommonStatus,
    pub battery_status: u8,
    pub intf_fail: bool,
    pub warn: bool,
    pub ups_fail: bool,
    pub dc_fail: bool,
    pub ac_fail: bool,
    pub batt_fail: bool,
    pub fail: bool,
    pub ident: bool,
}

impl UpsStatus {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.to_byte(), self.battery_status, 0, 0];
        set(&mut b[2], 0, self.intf_fail);
        set(&mut b[2], 1, self.warn);
        set(&mut b[2], 2, self.ups_fail);
        set(&mut b[2], 3, self.dc_fail);
        set(&mut b[2], 4, self.ac_fail);
        set(&mut b[3], 1, self.batt_fail);
        set(&mut b[3], 6, self.fail);
        set(&mut b[3], 7, self.ident);
        b
    }

    pub fn from_bytes(b: [u8; 4]) -> UpsStatus {
        UpsStatus {
            common: CommonStatus::from_byte(b[0]),
            battery_status: b[1],
            intf_fail: bit(b[2], 0),
            warn: bit(b[2], 1),
            ups_fail: bit(b[2], 2),
            dc_fail: bit(b[2], 3),
            ac_fail: bit(b[2], 4),
            batt_fail: bit(b[3], 1),
            fail: bit(b[3], 6),
            ident: bit(b[3], 7),
        }
    }
}

/// Enclosure status element (chassis or LCC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnclosureStatus {
    pub common: CommonStatus,
    pub ident: bool,
    pub warning_indication: bool,
    pub failure_indication: bool,
    pub time_until_power_cycle: u8,
    pub warning_requested: bool,
    pub failure_requested: bool,
    pub requested_power_off_duration: u8,
}

impl EnclosureStatus {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.to_byte(), 0, 0, 0];
        set(&mut b[1], 7, self.ident);
        set(&mut b[2], 0, self.warning_indication);
        set(&mut b[2], 1, self.failure_indication);
        b[2] |= (self.time_until_power_cycle & 0x3f) << 2;
        set(&mut b[3], 0, self.warning_requested);
        set(&mut b[3], 1, self.failure_requested);
        b[3] |= (self.requested_power_off_duration & 0x3f) << 2;
        b
    }

    pub fn from_bytes(b: [u8; 4]) -> EnclosureStatus {
        EnclosureStatus {
            common: CommonStatus::from_byte(b[0]),
            ident: bit(b[1], 7),
            warning_indication: bit(b[2], 0),
            failure_indication: bit(b[2], 1),
            time_until_power_cycle: (b[2] >> 2) & 0x3f,
            warning_requested: bit(b[3], 0),
            failure_requested: bit(b[3], 1),
            requested_power_off_duration: (b[3] >> 2) & 0x3f,
        }
    }
}

/// Enclosure control element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnclosureControl {
    pub common: CommonControl,
    pub rqst_ident: bool,
    pub power_cycle_delay: u8,
    pub power_cycle_request: u8,
    pub rqst_warning: bool,
    pub rqst_failure: bool,
    pub power_off_duration: u8,
}

/// Values of [`EnclosureControl::power_cycle_request`].
pub const POWER_CYCLE_RQST_NONE: u8 = 0;
pub const POWER_CYCLE_RQST_BEGIN: u8 = 1;
pub const POWER_CYCLE_RQST_CANCEL: u8 = 2;
pub const POWER_CYCLE_RQST_RETURN_CC: u8 = 3;

impl EnclosureControl {
    pub fn from_bytes(b: [u8; 4]) -> EnclosureControl {
        EnclosureControl {
            common: CommonControl::from_bits_truncate(b[0]),
            rqst_ident: bit(b[1], 7),
            power_cycle_delay: b[2] & 0x3f,
            power_cycle_request: (b[2] >> 6) & 0x03,
            rqst_warning: bit(b[3], 0),
            rqst_failure: bit(b[3], 1),
            power_off_duration: (b[3] >> 2) & 0x3f,
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.bits(), 0, 0, 0];
        set(&mut b[1], 7, self.rqst_ident);
        b[2] = (self.power_cycle_delay & 0x3f) | ((self.power_cycle_request & 0x03) << 6);
        set(&mut b[3], 0, self.rqst_warning);
        set(&mut b[3], 1, self.rqst_failure);
        b[3] |= (self.power_off_duration & 0x3f) << 2;
        b
    }
}

/// Display status element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayStatus {
    pub common: CommonStatus,
    pub display_mode: u8,
    pub fail: bool,
    pub ident: bool,
    pub display_char: u8,
}

/// Display mode where the written character is shown.
pub const DISPLAY_MODE_CHAR: u8 = 0x02;

impl DisplayStatus {
    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.to_byte(), self.display_mode & 0x03, self.display_char, 0];
        set(&mut b[1], 6, self.fail);
        set(&mut b[1], 7, self.ident);
        b
    }

    pub fn from_bytes(b: [u8; 4]) -> DisplayStatus {
        DisplayStatus {
            common: CommonStatus::from_byte(b[0]),
            display_mode: b[1] & 0x03,
            fail: bit(b[1], 6),
            ident: bit(b[1], 7),
            display_char: b[2],
        }
    }
}

/// Display control element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayControl {
    pub common: CommonControl,
    pub display_mode: u8,
    pub rqst_fail: bool,
    pub rqst_ident: bool,
    pub display_char: u8,
}

impl DisplayControl {
    pub fn from_bytes(b: [u8; 4]) -> DisplayControl {
        DisplayControl {
            common: CommonControl::from_bits_truncate(b[0]),
            display_mode: b[1] & 0x03,
            rqst_fail: bit(b[1], 6),
            rqst_ident: bit(b[1], 7),
            display_char: b[2],
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let mut b = [self.common.bits(), self.display_mode & 0x03, self.display_char, 0];
        set(&mut b[1], 6, self.rqst_fail);
        set(&mut b[1], 7, self.rqst_ident);
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_status_byte_packing() {
        let s = CommonStatus {
            code: StatusCode::Unavailable,
            swap: true,
            prd_fail: true,
        };
        assert_eq!(s.to_byte(), 0x57);
        assert_eq!(CommonStatus::from_byte(0x57), s);
    }

    #[test]
    fn slot_status_round_trip() {
        let s = ArrayDeviceSlotStatus {
            common: CommonStatus::ok(),
            ok: true,
            ident: true,
            dev_off: true,
            fault_requested: true,
            ..Default::default()
        };
        assert_eq!(ArrayDeviceSlotStatus::from_bytes(s.to_bytes()), s);
        // dev_off is byte 3 bit 4
        assert_eq!(s.to_bytes()[3] & 0x10, 0x10);
    }

    #[test]
    fn phy_status_round_trip() {
        let s = ExpanderPhyStatus {
            common: CommonStatus::ok(),
            expander_index: 7,
            phy_id: 21,
            phy_ready: true,
            link_ready: true,
            ..Default::default()
        };
        let b = s.to_bytes();
        assert_eq!(b[1], 7);
        assert_eq!(b[2], 21);
        assert_eq!(b[3] & 0xc0, 0xc0);
        assert_eq!(ExpanderPhyStatus::from_bytes(b), s);
    }

    #[test]
    fn control_select_bit() {
        let mut raw = [0u8; 4];
        raw[0] = 0x80;
        assert!(ArrayDeviceSlotControl::from_bytes(raw).common.selected());
        raw[0] = 0x20;
        let c = ExpanderPhyControl::from_bytes(raw);
        assert!(c.common.disable() && !c.common.selected());
    }

    #[test]
    fn enclosure_control_power_cycle_fields() {
        let mut raw = [0x80u8, 0, 0, 0];
        raw[2] = (1 << 6) | 10; // begin power cycle, delay 10
        let c = EnclosureControl::from_bytes(raw);
        assert_eq!(c.power_cycle_request, POWER_CYCLE_RQST_BEGIN);
        assert_eq!(c.power_cycle_delay, 10);
        assert_eq!(c.power_off_duration, 0);
        assert_eq!(EnclosureControl::from_bytes(c.to_bytes()), c);
    }
}
