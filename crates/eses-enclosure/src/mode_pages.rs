//! The EMC ESES vendor mode pages.
//!
//! Two pages, one persistent (20h) and one volatile (21h), each kept as four
//! value sets the way MODE SENSE exposes them: current, changeable, default
//! and saved. MODE SELECT writes current; the save bit folds current into
//! saved for the persistable page only.

use eses_wire::cdb::{ModeSelect10Cdb, ModeSense10Cdb};
use eses_wire::codec::ByteWriter;
use eses_wire::mode::{
    ModePageHeader, ModeParameterListHeader, NonPersistentModePage, PersistentModePage,
    EMC_ESES_MODE_PAGE_LEN, EMC_ESES_MODE_PAGE_SIZE, MODE_PAGE_HEADER_SIZE,
    MODE_PARAM_LIST_HEADER_SIZE,
};
use eses_wire::page::{
    MODE_PG_ALL_SUPPORTED, MODE_PG_EMC_ESES_NON_PERSISTENT, MODE_PG_EMC_ESES_PERSISTENT,
};

use crate::{EsesError, Result};

/// Which of the four value sets a MODE SENSE asks for (the PC field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueSet {
    Current = 0,
    Changeable = 1,
    Default = 2,
    Saved = 3,
}

impl ValueSet {
    fn from_pc(pc: u8) -> ValueSet {
        match pc & 0x03 {
            0 => ValueSet::Current,
            1 => ValueSet::Changeable,
            2 => ValueSet::Default,
            _ => ValueSet::Saved,
        }
    }
}

/// Mode-page state for one enclosure.
#[derive(Debug, Clone, Default)]
pub struct ModePageSet {
    pub persistent_current: PersistentModePage,
    pub persistent_saved: PersistentModePage,
    pub non_persistent_current: NonPersistentModePage,
}

impl ModePageSet {
    pub fn new() -> ModePageSet {
        ModePageSet::default()
    }

    /// True when the test-mode bit of the non-persistent page is set; the
    /// String Out echo path keys on it.
    pub fn test_mode(&self) -> bool {
        self.non_persistent_current.test_mode
    }

    /// Builds the MODE SENSE (10) response.
    pub fn mode_sense(&self, cdb: &ModeSense10Cdb) -> Result<Vec<u8>> {
        // Block descriptors are never served; LLBAA is meaningless here.
        if !cdb.dbd || cdb.llbaa || cdb.subpage_code != 0 {
            return Err(EsesError::InvalidCdbField);
        }
        let set = ValueSet::from_pc(cdb.pc);

        let mut w = ByteWriter::with_capacity(
            MODE_PARAM_LIST_HEADER_SIZE + 2 * EMC_ESES_MODE_PAGE_SIZE,
        );
        ModeParameterListHeader::default().encode(&mut w);
        match cdb.page_code {
            MODE_PG_EMC_ESES_PERSISTENT => self.encode_persistent(&mut w, set),
            MODE_PG_EMC_ESES_NON_PERSISTENT => self.encode_non_persistent(&mut w, set),
            MODE_PG_ALL_SUPPORTED => {
                self.encode_persistent(&mut w, set);
                self.encode_non_persistent(&mut w, set);
            }
            _ => return Err(EsesError::InvalidCdbField),
        }
        // mode data length excludes its own two bytes
        let total = w.len() as u16 - 2;
        w.patch_u16_be(0, total);

        let mut data = w.into_vec();
        data.truncate(cdb.allocation_length as usize);
        Ok(data)
    }

    fn encode_persistent(&self, w: &mut ByteWriter, set: ValueSet) {
        ModePageHeader {
            page_code: MODE_PG_EMC_ESES_PERSISTENT,
            spf: false,
            ps: true,
            page_length: EMC_ESES_MODE_PAGE_LEN,
        }
        .encode(w);
        match set {
            ValueSet::Current => self.persistent_current.encode_body(w),
            ValueSet::Saved => self.persistent_saved.encode_body(w),
            ValueSet::Default => PersistentModePage::default().encode_body(w),
            ValueSet::Changeable => {
                w.u8(PersistentModePage::CHANGEABLE_BYTE2);
                w.zeros(13);
            }
        }
    }

    fn encode_non_persistent(&self, w: &mut ByteWriter, set: ValueSet) {
        ModePageHeader {
            page_code: MODE_PG_EMC_ESES_NON_PERSISTENT,
            spf: false,
            ps: false,
            page_length: EMC_ESES_MODE_PAGE_LEN,
        }
        .encode(w);
        match set {
            ValueSet::Current => self.non_persistent_current.encode_body(w),
            // The page is volatile: saved and default read identically.
            ValueSet::Saved | ValueSet::Default => {
                NonPersistentModePage::default().encode_body(w)
            }
            ValueSet::Changeable => {
                w.u8(NonPersistentModePage::CHANGEABLE_BYTE2);
                w.zeros(13);
            }
        }
    }

    /// Applies a MODE SELECT (10) parameter list.
    pub fn mode_select(&mut self, cdb: &ModeSelect10Cdb, param_list: &[u8]) -> Result<()> {
        if !cdb.page_format {
            return Err(EsesError::InvalidCdbField);
        }
        let list_len = (cdb.parameter_list_length as usize).min(param_list.len());
        if list_len < MODE_PARAM_LIST_HEADER_SIZE {
            return Err(EsesError::InvalidParameterField);
        }
        let header = ModeParameterListHeader::decode(param_list)?;
        if header.block_descriptor_length != 0 {
            return Err(EsesError::InvalidParameterField);
        }

        let mut pos = MODE_PARAM_LIST_HEADER_SIZE;
        while pos < list_len {
            let page = ModePageHeader::decode(&param_list[pos..list_len])?;
            if page.spf {
                return Err(EsesError::InvalidParameterField);
            }
            let body_start = pos + MODE_PAGE_HEADER_SIZE;
            let body_end = body_start + page.page_length as usize;
            if page.page_length != EMC_ESES_MODE_PAGE_LEN || body_end > list_len {
                return Err(EsesError::InvalidParameterField);
            }
            let body = &param_list[body_start..body_end];
            match page.page_code {
                MODE_PG_EMC_ESES_PERSISTENT => {
                    self.persistent_current = PersistentModePage::decode_body(body)?;
                    if cdb.save_pages {
                        self.persistent_saved = self.persistent_current;
                    }
                }
                MODE_PG_EMC_ESES_NON_PERSISTENT => {
                    // The save bit is ignored here: nothing to persist.
                    self.non_persistent_current = NonPersistentModePage::decode_body(body)?;
                }
                _ => return Err(EsesError::InvalidParameterField),
            }
            pos = body_end;
        }
        Ok(())
    }
}
