//! Template Configuration page generation.
//!
//! The catalogue the engine consumes is a set of binary Configuration pages,
//! one per enclosure model. Real arrays flash them into the expander; here
//! they are produced from the topology profile so that counts, wiring and
//! identity stay in one place.

use eses_topology::{profile, EnclosureProfile, EnclosureType, Side, SIDE_MIDPLANE};
use eses_wire::buf::{BufferDescriptor, BufferType};
use eses_wire::codec::ByteWriter;
use eses_wire::element::ElementType;
use eses_wire::page::finish_page;

/// Version-descriptor component types used in the templates.
pub const COMP_TYPE_EXPANDER_FW: u8 = 0;
pub const COMP_TYPE_BOOT_LOADER_FW: u8 = 1;
pub const COMP_TYPE_PS_FW: u8 = 4;

/// Subenclosure ids are assigned in template order.
pub const SUBENCL_LCC_A: u8 = 0;
pub const SUBENCL_LCC_B: u8 = 1;
pub const SUBENCL_CHASSIS: u8 = 2;
pub const SUBENCL_PS_A: u8 = 3;
pub const SUBENCL_PS_B: u8 = 4;

const INITIAL_EXPANDER_REV: &str = "1.25 ";
const INITIAL_PS_REV: &str = "0.37 ";

struct TypeHeader {
    elem_type: ElementType,
    num_possible_elems: u8,
    subencl_id: u8,
    text: &'static str,
}

struct VerDescSpec {
    comp_type: u8,
    downloadable: bool,
    main: bool,
    rev: &'static str,
    comp_id: &'static str,
    buf_id: u8,
}

struct SubenclSpec {
    subencl_id: u8,
    subencl_type: u8,
    side: u8,
    side_name: u8,
    peer: u8,
    container: u8,
    text: String,
    serial: String,
    ver_descs: Vec<VerDescSpec>,
    buf_descs: Vec<BufferDescriptor>,
}

/// Builds the Configuration page for an enclosure model. The generation
/// code is left zero; the owning enclosure stamps the live value when the
/// page is served.
pub fn build_configuration_page(encl_type: EnclosureType) -> Vec<u8> {
    let p = profile(encl_type);
    let subencls = subenclosures(p);
    let headers = type_headers(p);

    let mut w = ByteWriter::with_capacity(1024);
    w.u8(0x01); // Configuration page code
    w.u8((subencls.len() - 1) as u8); // secondary subenclosure count
    w.u16_be(0); // page length, patched at the end
    w.u32_be(0); // generation code

    for s in &subencls {
        encode_subenclosure(&mut w, p, s, &headers);
    }
    for h in &headers {
        w.u8(h.elem_type as u8);
        w.u8(h.num_possible_elems);
        w.u8(h.subencl_id);
        w.u8(h.text.len() as u8);
    }
    for h in &headers {
        w.bytes(h.text.as_bytes());
    }

    finish_page(&mut w);
    w.into_vec()
}

fn subenclosures(p: &EnclosureProfile) -> Vec<SubenclSpec> {
    let mut out = Vec::new();
    let serial_base = format!("{:016}", p.identity.board_type);
    for side in [Side::A, Side::B] {
        let (id, peer, eeprom, trace) = match side {
            Side::A => (SUBENCL_LCC_A, SUBENCL_LCC_B, 0, 1),
            Side::B => (SUBENCL_LCC_B, SUBENCL_LCC_A, 2, 3),
        };
        out.push(SubenclSpec {
            subencl_id: id,
            subencl_type: 0x07, // LCC
            side: side.id(),
            side_name: b'A' + side.id(),
            peer,
            container: SUBENCL_CHASSIS,
            text: format!("Local LCC {}", (b'A' + side.id()) as char),
            serial: format!("LCC{}{}", side.id(), serial_base),
            ver_descs: vec![
                VerDescSpec {
                    comp_type: COMP_TYPE_EXPANDER_FW,
                    downloadable: true,
                    main: true,
                    rev: INITIAL_EXPANDER_REV,
                    comp_id: "CDES EMA    ",
                    buf_id: eeprom,
                },
                VerDescSpec {
                    comp_type: COMP_TYPE_BOOT_LOADER_FW,
                    downloadable: true,
                    main: false,
                    rev: INITIAL_EXPANDER_REV,
                    comp_id: "CDES BOOT   ",
                    buf_id: eeprom,
                },
            ],
            buf_descs: vec![
                BufferDescriptor {
                    buf_id: eeprom,
                    buf_type: BufferType::Eeprom,
                    writable: true,
                    buf_index: 2, // local LCC EEPROM
                    buf_spec_info: 0,
                },
                BufferDescriptor {
                    buf_id: trace,
                    buf_type: BufferType::ActiveTrace,
                    writable: false,
                    buf_index: 0,
                    buf_spec_info: 0,
                },
            ],
        });
    }
    out.push(SubenclSpec {
        subencl_id: SUBENCL_CHASSIS,
        subencl_type: 0x0e, // chassis
        side: SIDE_MIDPLANE,
        side_name: b' ',
        peer: 0xff,
        container: SUBENCL_CHASSIS,
        text: "Chassis".to_string(),
        serial: format!("CHS {serial_base}"),
        ver_descs: Vec::new(),
        buf_descs: vec![BufferDescriptor {
            buf_id: 4,
            buf_type: BufferType::EventLog,
            writable: false,
            buf_index: 0,
            buf_spec_info: 0,
        }],
    });
    if p.power_supplies >= 2 {
        for (id, side, name, peer) in [
            (SUBENCL_PS_A, Side::A, "Power Supply A", SUBENCL_PS_B),
            (SUBENCL_PS_B, Side::B, "Power Supply B", SUBENCL_PS_A),
        ] {
            out.push(SubenclSpec {
                subencl_id: id,
                subencl_type: 0x02, // power supply
                side: side.id(),
                side_name: b'A' + side.id(),
                peer,
                container: SUBENCL_CHASSIS,
                text: name.to_string(),
                serial: format!("PS{} {serial_base}", side.id()),
                ver_descs: vec![VerDescSpec {
                    comp_type: COMP_TYPE_PS_FW,
                    downloadable: true,
                    main: true,
                    rev: INITIAL_PS_REV,
                    comp_id: "PS FW       ",
                    buf_id: 0xff,
                }],
                buf_descs: Vec::new(),
            });
        }
    }
    out
}

fn type_headers(p: &EnclosureProfile) -> Vec<TypeHeader> {
    let mut h = Vec::new();
    let mut push = |elem_type, num, subencl_id, text| {
        h.push(TypeHeader {
            elem_type,
            num_possible_elems: num,
            subencl_id,
            text,
        })
    };

    // Local LCC first: this ordering defines element addressing and is
    // load bearing.
    if p.drive_slots > 0 {
        push(
            ElementType::ArrayDeviceSlot,
            p.drive_slots,
            SUBENCL_LCC_A,
            "Array Device Slot",
        );
    }
    push(ElementType::ExpanderPhy, p.phys, SUBENCL_LCC_A, "Expander Phy");
    push(
        ElementType::SasConnector,
        p.conns_per_lcc,
        SUBENCL_LCC_A,
        "SAS Connector",
    );
    push(ElementType::SasExpander, 1, SUBENCL_LCC_A, "SAS Expander");
    push(
        ElementType::EscElectronics,
        1,
        SUBENCL_LCC_A,
        "ESC Electronics",
    );
    push(ElementType::Enclosure, 1, SUBENCL_LCC_A, "Enclosure");
    if p.temp_sensors_per_lcc > 0 {
        push(
            ElementType::TempSensor,
            p.temp_sensors_per_lcc,
            SUBENCL_LCC_A,
            "Temperature Sensor",
        );
    }
    for _ in 0..p.two_digit_displays {
        push(ElementType::Display, 2, SUBENCL_LCC_A, "Display");
    }
    for _ in 0..p.one_digit_displays {
        push(ElementType::Display, 1, SUBENCL_LCC_A, "Display");
    }

    // Peer LCC.
    push(
        ElementType::SasConnector,
        p.conns_per_lcc,
        SUBENCL_LCC_B,
        "SAS Connector",
    );
    push(ElementType::SasExpander, 1, SUBENCL_LCC_B, "SAS Expander");
    push(
        ElementType::EscElectronics,
        1,
        SUBENCL_LCC_B,
        "ESC Electronics",
    );
    push(ElementType::Enclosure, 1, SUBENCL_LCC_B, "Enclosure");
    if p.temp_sensors_per_lcc > 0 {
        push(
            ElementType::TempSensor,
            p.temp_sensors_per_lcc,
            SUBENCL_LCC_B,
            "Temperature Sensor",
        );
    }

    // Chassis.
    push(ElementType::Enclosure, 1, SUBENCL_CHASSIS, "Enclosure");

    // Power supplies with their cooling elements.
    if p.power_supplies >= 2 {
        push(ElementType::PowerSupply, 1, SUBENCL_PS_A, "Power Supply");
        if p.cooling_per_ps > 0 {
            push(ElementType::Cooling, p.cooling_per_ps, SUBENCL_PS_A, "Cooling");
        }
        push(ElementType::PowerSupply, 1, SUBENCL_PS_B, "Power Supply");
        if p.cooling_per_ps > 0 {
            push(ElementType::Cooling, p.cooling_per_ps, SUBENCL_PS_B, "Cooling");
        }
    }
    h
}

fn encode_subenclosure(
    w: &mut ByteWriter,
    p: &EnclosureProfile,
    s: &SubenclSpec,
    headers: &[TypeHeader],
) {
    let num_hdrs = headers
        .iter()
        .filter(|h| h.subencl_id == s.subencl_id)
        .count() as u8;

    let start = w.len();
    // byte 0: services-processor counts (two EMAs, one per LCC)
    let rel_proc = if s.subencl_type == 0x07 { s.side } else { 0 };
    w.u8(0x02 | (rel_proc & 0x07) << 4);
    w.u8(s.subencl_id);
    w.u8(num_hdrs);
    w.u8(0); // descriptor length, patched below
    // NAA logical id: NAA 5 in the high nibble, EMC IEEE company id.
    w.u8(0x52);
    w.u8(0);
    w.bytes(&[0x00, 0x00, 0x97]);
    w.bytes(&[0, 0, p.identity.platform_type]);
    w.ascii(p.identity.vendor_id, 8);
    w.ascii(p.identity.product_id, 16);
    w.ascii(INITIAL_EXPANDER_REV.trim(), 4);
    w.u8(s.subencl_type);
    // side (5 bits) | FRU bit: everything but the chassis is replaceable
    let fru = if s.subencl_type == 0x0e { 0x00 } else { 0x80 };
    w.u8((s.side & 0x1f) | fru);
    w.u8(s.side_name);
    w.u8(s.container);
    w.u8(s.subencl_id); // manager
    w.u8(s.peer);
    w.u8(s.subencl_id); // enclosure-relative uid
    w.ascii(&s.serial, 16);
    w.u8(s.ver_descs.len() as u8);
    for v in &s.ver_descs {
        w.u8(0xff); // element index, none
        let mut b1 = v.comp_type & 0x1f;
        if v.downloadable {
            b1 |= 0x20;
        }
        if v.main {
            b1 |= 0x80;
        }
        w.u8(b1);
        w.ascii(v.rev, 5);
        w.ascii(v.comp_id, 12);
        w.u8(v.buf_id);
    }
    w.u8(s.buf_descs.len() as u8);
    for d in &s.buf_descs {
        w.bytes(&d.to_bytes());
    }
    w.u8(0); // no VPD pages
    w.u8(s.text.len() as u8);
    w.bytes(s.text.as_bytes());

    // The descriptor-length byte excludes the first 4 bytes.
    let total = w.len() - start;
    w.patch_u8(start + 3, (total - 4) as u8);
}
