//! Layout derivation properties over the whole catalogue.

use proptest::prelude::*;

use eses_registry::Registry;
use eses_topology::EnclosureType;
use eses_wire::element::ELEMENT_SIZE;
use eses_wire::page::PAGE_HEADER_SIZE;

fn group_ranges(encl_type: EnclosureType) -> Vec<(std::ops::Range<usize>, String)> {
    let registry = Registry::build().unwrap();
    let cfg = registry.config(encl_type);
    cfg.layout()
        .map(|g| {
            let start = g.byte_offset as usize;
            let end = start + ELEMENT_SIZE * (1 + g.num_possible_elems as usize);
            let key = format!(
                "{:?}/{}/{:?}/{}",
                g.subencl_type, g.side, g.elem_type, g.num_possible_elems
            );
            (start..end, key)
        })
        .collect()
}

proptest! {
    /// Distinct element groups never overlap in byte range, and every group
    /// lies within the derived status-page size.
    #[test]
    fn element_groups_are_injective(type_index in 0..EnclosureType::ALL.len()) {
        let encl_type = EnclosureType::ALL[type_index];
        let registry = Registry::build().unwrap();
        let cfg = registry.config(encl_type);
        let ranges = group_ranges(encl_type);

        for (i, (a, a_key)) in ranges.iter().enumerate() {
            prop_assert!(a.start >= PAGE_HEADER_SIZE);
            prop_assert!(a.end <= cfg.status_page_size as usize);
            for (b, b_key) in ranges.iter().skip(i + 1) {
                prop_assert!(
                    a.end <= b.start || b.end <= a.start,
                    "{encl_type:?}: {a_key} [{a:?}] overlaps {b_key} [{b:?}]"
                );
            }
        }
    }

    /// Group lookups resolve back to the group they index: the byte offset
    /// returned for a key equals the offset of the group carrying that key.
    #[test]
    fn lookups_agree_with_layout(type_index in 0..EnclosureType::ALL.len()) {
        let encl_type = EnclosureType::ALL[type_index];
        let registry = Registry::build().unwrap();
        let cfg = registry.config(encl_type);
        for g in cfg.layout() {
            let filter = eses_registry::GroupFilter {
                num_possible_elems: Some(g.num_possible_elems),
                subencl_id: Some(g.subencl_id),
            };
            let offset = cfg.offset_of(g.subencl_type, g.side, g.elem_type, filter);
            prop_assert_eq!(offset, Some(g.byte_offset));
            let index = cfg.index_of(g.subencl_type, g.side, g.elem_type, filter);
            prop_assert_eq!(index, Some(g.first_elem_index));
        }
    }
}
