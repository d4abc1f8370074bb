//! Golden-byte checks for the bit-packed wire layouts.
//!
//! Each case pins a record against hand-assembled bytes, so a refactor that
//! moves a bit shows up as a byte diff rather than a round-trip that still
//! happens to agree with itself.

use eses_wire::buf::{BufferDescriptor, BufferType};
use eses_wire::codec::ByteWriter;
use eses_wire::element::{
    ArrayDeviceSlotStatus, CommonStatus, CoolingStatus, DisplayStatus, EnclosureControl,
    ExpanderPhyStatus, PowerSupplyStatus, SasConnectorStatus, StatusCode, TempSensorStatus,
    UpsStatus, CONN_TYPE_MINI_SAS_4X, ENTIRE_CONNECTOR_PHYSICAL_LINK,
};
use eses_wire::mode::{ModePageHeader, ModeParameterListHeader};
use eses_wire::sense::{SenseInfo, SenseKey, ASC_INVALID_FIELD_IN_CDB};

fn ok() -> CommonStatus {
    CommonStatus {
        code: StatusCode::Ok,
        ..Default::default()
    }
}

#[test]
fn power_supply_status_bytes() {
    let ps = PowerSupplyStatus {
        common: ok(),
        ident: true,
        ac_fail: true,
        off: true,
        requested_on: true,
        ..Default::default()
    };
    // byte 1: ident is bit 7; byte 3: ac_fail bit 1, off bit 4, rqsted_on bit 5
    assert_eq!(ps.to_bytes(), [0x01, 0x80, 0x00, 0x32]);
}

#[test]
fn cooling_fan_speed_spans_two_bytes() {
    let fan = CoolingStatus {
        common: ok(),
        actual_fan_speed: 0x2ef, // 7500 rpm in tens
        actual_speed_code: 0x05,
        ..Default::default()
    };
    let b = fan.to_bytes();
    assert_eq!(b, [0x01, 0x02, 0xef, 0x05]);
    assert_eq!(CoolingStatus::from_bytes(b).actual_fan_speed, 0x2ef);
}

#[test]
fn temp_sensor_reading_is_byte_two() {
    let sensor = TempSensorStatus {
        common: ok(),
        temp: 45, // 25 C with the +20 offset
        ot_warning: true,
        ..Default::default()
    };
    assert_eq!(sensor.to_bytes(), [0x01, 0x00, 45, 0x04]);
}

#[test]
fn drive_slot_bits() {
    let slot = ArrayDeviceSlotStatus {
        common: ok(),
        ok: true,
        rmv: true,
        dev_off: true,
        fault_sensed: true,
        ..Default::default()
    };
    // ok: byte1 bit7; rmv: byte2 bit2; dev_off: byte3 bit4; fault_sensed: byte3 bit6
    assert_eq!(slot.to_bytes(), [0x01, 0x80, 0x04, 0x50]);
}

#[test]
fn phy_status_bits() {
    let phy = ExpanderPhyStatus {
        common: ok(),
        expander_index: 0x41,
        phy_id: 0x12,
        force_disabled: true,
        spinup_enabled: true,
        link_ready: true,
        phy_ready: true,
        ..Default::default()
    };
    assert_eq!(phy.to_bytes(), [0x01, 0x41, 0x92, 0xe0]);
}

#[test]
fn connector_whole_and_lane_entries() {
    let whole = SasConnectorStatus {
        common: ok(),
        conn_type: CONN_TYPE_MINI_SAS_4X,
        conn_physical_link: ENTIRE_CONNECTOR_PHYSICAL_LINK,
        ..Default::default()
    };
    assert_eq!(whole.to_bytes(), [0x01, 0x02, 0xff, 0x00]);

    let lane = SasConnectorStatus {
        common: ok(),
        conn_type: CONN_TYPE_MINI_SAS_4X,
        conn_physical_link: 2,
        fail: true,
        ..Default::default()
    };
    assert_eq!(lane.to_bytes(), [0x01, 0x02, 0x02, 0x40]);
}

#[test]
fn ups_battery_and_failure_bits() {
    let ups = UpsStatus {
        common: ok(),
        battery_status: 0x02,
        ac_fail: true,
        batt_fail: true,
        ident: true,
        ..Default::default()
    };
    assert_eq!(ups.to_bytes(), [0x01, 0x02, 0x10, 0x82]);
}

#[test]
fn enclosure_control_packs_cycle_fields_into_byte_two() {
    let ctrl = EnclosureControl {
        power_cycle_request: 1,
        power_cycle_delay: 0x2a,
        power_off_duration: 3,
        ..Default::default()
    };
    let b = ctrl.to_bytes();
    assert_eq!(b[2], 0x40 | 0x2a);
    assert_eq!(b[3], 3 << 2);
    assert_eq!(EnclosureControl::from_bytes(b), ctrl);
}

#[test]
fn display_mode_and_character() {
    let d = DisplayStatus {
        common: ok(),
        display_mode: 0x02,
        display_char: b'3',
        fail: true,
        ..Default::default()
    };
    assert_eq!(d.to_bytes(), [0x01, 0x42, b'3', 0x00]);
}

#[test]
fn buffer_descriptor_writable_bit() {
    let d = BufferDescriptor {
        buf_id: 7,
        buf_type: BufferType::ActiveTrace,
        writable: true,
        buf_index: 1,
        buf_spec_info: 0,
    };
    assert_eq!(d.to_bytes(), [7, 0x81, 1, 0]);
    assert_eq!(
        BufferDescriptor::from_bytes([7, 0x01, 1, 0]).map(|d| d.writable),
        Some(false)
    );
}

#[test]
fn mode_structures_encode_reserved_fields_as_zero() {
    let mut w = ByteWriter::new();
    ModeParameterListHeader {
        mode_data_length: 0x1c,
        ..Default::default()
    }
    .encode(&mut w);
    assert_eq!(w.as_slice(), &[0x00, 0x1c, 0, 0, 0, 0, 0, 0]);

    let mut w = ByteWriter::new();
    ModePageHeader {
        page_code: 0x21,
        spf: false,
        ps: false,
        page_length: 0x0e,
    }
    .encode(&mut w);
    assert_eq!(w.as_slice(), &[0x21, 0x0e]);
}

#[test]
fn fixed_sense_data_is_spc_shaped() {
    let sense = SenseInfo::new(SenseKey::IllegalRequest, ASC_INVALID_FIELD_IN_CDB).to_fixed_sense_data();
    assert_eq!(sense.len(), 18);
    assert_eq!(sense[0], 0x70); // current errors, fixed format
    assert_eq!(sense[2], 0x05);
    assert_eq!(sense[7], 10); // additional sense length
    assert_eq!((sense[12], sense[13]), (0x24, 0x00));
}
