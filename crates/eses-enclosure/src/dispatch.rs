//! The command dispatcher: one CDB in, one response region out.
//!
//! Every command a client can address to the enclosure funnels through
//! [`VirtualEnclosure::handle_command`], which routes to the page builders
//! and processors and folds their outcome into a SCSI status plus sense
//! data. Nothing here retries; a failed command reports CHECK CONDITION and
//! leaves retry policy to the transport.

use eses_wire::cdb::{
    BufferCdb, InquiryCdb, ModeSelect10Cdb, ModeSense10Cdb, ReceiveDiagnosticCdb,
    SendDiagnosticCdb, BUF_MODE_DATA, BUF_MODE_DESCRIPTOR, OP_INQUIRY, OP_MODE_SELECT_10,
    OP_MODE_SENSE_10, OP_READ_BUFFER, OP_RECEIVE_DIAGNOSTIC_RESULTS, OP_SEND_DIAGNOSTIC,
    OP_WRITE_BUFFER,
};
use eses_wire::download::{
    encode_download_status_page, DownloadControlHeader, DL_MAX_PAGE_LENGTH, DL_MODE_ACTIVATE,
    DL_MODE_DOWNLOAD, DL_UCODE_DATA_OFFSET,
};
use eses_wire::page::PageCode;
use eses_wire::sense::{
    SenseInfo, SenseKey, ASC_TARGET_OPERATING_CONDITIONS_CHANGED, SCSI_STATUS_CHECK_CONDITION,
    SCSI_STATUS_GOOD, SENSE_DATA_SIZE,
};
use tracing::warn;

use crate::actuator::SlotActuator;
use crate::control_page::process_enclosure_control_page;
use crate::emc_page::{
    build_emc_enclosure_status_page, build_emc_statistics_page, process_emc_enclosure_control_page,
};
use crate::enclosure::VirtualEnclosure;
use crate::status_page::{build_additional_status_page, build_enclosure_status_page};
use crate::{EsesError, Result};

/// Byte offset of the echo bit in the String Out page.
const STR_OUT_ECHO_OFFSET: usize = 4;
/// Byte offset where the String Out text begins.
const STR_OUT_DATA_OFFSET: usize = 5;

/// What a command produced: the SCSI status, any data-in bytes, and the
/// sense data accompanying a CHECK CONDITION.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub scsi_status: u8,
    pub data: Vec<u8>,
    pub sense: Option<[u8; SENSE_DATA_SIZE]>,
}

impl CommandOutcome {
    fn good(data: Vec<u8>) -> CommandOutcome {
        CommandOutcome {
            scsi_status: SCSI_STATUS_GOOD,
            data,
            sense: None,
        }
    }

    fn check(sense: SenseInfo) -> CommandOutcome {
        CommandOutcome {
            scsi_status: SCSI_STATUS_CHECK_CONDITION,
            data: Vec::new(),
            sense: Some(sense.to_fixed_sense_data()),
        }
    }

    pub fn is_good(&self) -> bool {
        self.scsi_status == SCSI_STATUS_GOOD
    }
}

impl VirtualEnclosure {
    /// Executes one CDB against the enclosure. `data_out` carries the
    /// command's parameter data (Send Diagnostic pages, Mode Select lists,
    /// Write Buffer payloads); data-in commands return their bytes in the
    /// outcome.
    pub fn handle_command(
        &mut self,
        act: &mut dyn SlotActuator,
        cdb: &[u8],
        data_out: &[u8],
    ) -> CommandOutcome {
        let Some(&opcode) = cdb.first() else {
            return CommandOutcome::check(EsesError::InvalidCdbField.sense());
        };

        // A configuration change (firmware activation) raises a one-shot
        // unit attention; INQUIRY is exempt, as SPC requires.
        if self.pending_unit_attention && opcode != OP_INQUIRY {
            self.pending_unit_attention = false;
            return CommandOutcome::check(SenseInfo::new(
                SenseKey::UnitAttention,
                ASC_TARGET_OPERATING_CONDITIONS_CHANGED,
            ));
        }

        match self.dispatch(act, opcode, cdb, data_out) {
            Ok(data) => CommandOutcome::good(data),
            Err(err) => {
                if let EsesError::Internal(reason) = &err {
                    warn!(reason = *reason, opcode, "command failed on an internal invariant");
                }
                CommandOutcome::check(err.sense())
            }
        }
    }

    fn dispatch(
        &mut self,
        act: &mut dyn SlotActuator,
        opcode: u8,
        cdb: &[u8],
        data_out: &[u8],
    ) -> Result<Vec<u8>> {
        match opcode {
            OP_INQUIRY => {
                let d = InquiryCdb::decode(cdb)?;
                if d.evpd {
                    // Vital product data pages are not served.
                    return Err(EsesError::InvalidCdbField);
                }
                let mut data = self.inquiry_data();
                data.truncate(d.allocation_length as usize);
                Ok(data)
            }
            OP_RECEIVE_DIAGNOSTIC_RESULTS => {
                let d = ReceiveDiagnosticCdb::decode(cdb)?;
                if !d.page_code_valid {
                    return Err(EsesError::InvalidCdbField);
                }
                let mut data = self.receive_diagnostic_page(d.page_code)?;
                data.truncate(d.allocation_length as usize);
                Ok(data)
            }
            OP_SEND_DIAGNOSTIC => {
                let d = SendDiagnosticCdb::decode(cdb)?;
                if d.self_test {
                    // A default self test always passes; no page follows.
                    return Ok(Vec::new());
                }
                if d.self_test_code != 0 || d.control != 0 || !d.page_format {
                    return Err(EsesError::InvalidCdbField);
                }
                let list_len = (d.parameter_list_length as usize).min(data_out.len());
                let page = &data_out[..list_len];
                let Some(&page_code) = page.first() else {
                    return Err(EsesError::InvalidParameterField);
                };
                self.send_diagnostic_page(act, page_code, page)?;
                Ok(Vec::new())
            }
            OP_READ_BUFFER => {
                let d = BufferCdb::decode(cdb)?;
                match d.mode {
                    BUF_MODE_DATA => self.buffers.read(d.buffer_id, d.buffer_offset, d.length),
                    BUF_MODE_DESCRIPTOR => {
                        let mut data = self.buffers.read_descriptor(d.buffer_id)?.to_vec();
                        data.truncate(d.length as usize);
                        Ok(data)
                    }
                    _ => Err(EsesError::InvalidCdbField),
                }
            }
            OP_WRITE_BUFFER => {
                let d = BufferCdb::decode(cdb)?;
                if d.mode != BUF_MODE_DATA {
                    return Err(EsesError::InvalidCdbField);
                }
                let data = data_out
                    .get(..d.length as usize)
                    .ok_or(EsesError::InvalidParameterField)?;
                self.buffers.write(d.buffer_id, d.buffer_offset, data)?;
                Ok(Vec::new())
            }
            OP_MODE_SENSE_10 => {
                let d = ModeSense10Cdb::decode(cdb)?;
                self.mode_pages.mode_sense(&d)
            }
            OP_MODE_SELECT_10 => {
                let d = ModeSelect10Cdb::decode(cdb)?;
                self.mode_pages.mode_select(&d, data_out)?;
                Ok(Vec::new())
            }
            _ => Err(EsesError::InvalidCdbField),
        }
    }

    fn receive_diagnostic_page(&self, page_code: u8) -> Result<Vec<u8>> {
        match PageCode::from_u8(page_code) {
            Some(PageCode::Configuration) => Ok(self.configuration_page()),
            Some(PageCode::Enclosure) => build_enclosure_status_page(self),
            Some(PageCode::AdditionalElementStatus) => build_additional_status_page(self),
            Some(PageCode::DownloadMicrocode) => Ok(encode_download_status_page(
                self.generation_code(),
                &self.downloads.status_descriptor(),
            )),
            Some(PageCode::EmcEnclosure) => build_emc_enclosure_status_page(self),
            Some(PageCode::EmcStatistics) => build_emc_statistics_page(self),
            _ => Err(EsesError::UnsupportedPage(page_code)),
        }
    }

    fn send_diagnostic_page(
        &mut self,
        act: &mut dyn SlotActuator,
        page_code: u8,
        page: &[u8],
    ) -> Result<()> {
        match PageCode::from_u8(page_code) {
            Some(PageCode::Enclosure) => process_enclosure_control_page(self, act, page),
            Some(PageCode::EmcEnclosure) => process_emc_enclosure_control_page(self, act, page),
            Some(PageCode::DownloadMicrocode) => self.process_microcode_control_page(page),
            Some(PageCode::String) => self.process_string_out_page(page),
            _ => Err(EsesError::UnsupportedPage(page_code)),
        }
    }

    /// Download Microcode Control page (0Eh): validation, then the station's
    /// download and/or activate transitions. An accepted activation rewrites
    /// the served Configuration page and bumps the generation code.
    fn process_microcode_control_page(&mut self, page: &[u8]) -> Result<()> {
        let hdr = DownloadControlHeader::decode(page)?;
        if hdr.page_length > DL_MAX_PAGE_LENGTH {
            self.downloads
                .abort_session(hdr.subenclosure_id, "control page too long");
            return Err(EsesError::InvalidParameterField);
        }
        if hdr.gen_code != self.generation_code() {
            self.downloads
                .abort_session(hdr.subenclosure_id, "generation code mismatch");
            return Err(EsesError::TransferRefused("generation code mismatch"));
        }
        let chunk = page.get(DL_UCODE_DATA_OFFSET..).unwrap_or(&[]);
        match hdr.mode {
            DL_MODE_DOWNLOAD => self.downloads.handle_download(&hdr, chunk),
            DL_MODE_ACTIVATE => {
                if hdr.transfer_length != 0 && hdr.transfer_length == hdr.image_length {
                    // The whole image rode in on the activate page.
                    self.downloads.handle_download(&hdr, chunk)?;
                } else if hdr.transfer_length != hdr.image_length {
                    self.downloads
                        .abort_session(hdr.subenclosure_id, "activate with a partial image");
                    return Err(EsesError::TransferRefused("activate with a partial image"));
                }
                let image = self.downloads.handle_activate(&hdr)?;
                self.apply_firmware_revision(&image)?;
                self.downloads.activation_complete();
                self.bump_generation_code();
                Ok(())
            }
            _ => {
                self.downloads
                    .abort_session(hdr.subenclosure_id, "unknown control mode");
                Err(EsesError::TransferRefused("unknown download control mode"))
            }
        }
    }

    /// String Out page (04h): with the echo bit set and the mode-page test
    /// mode enabled, the NUL-terminated string lands in the active trace
    /// buffer.
    fn process_string_out_page(&mut self, page: &[u8]) -> Result<()> {
        if page.len() <= STR_OUT_DATA_OFFSET {
            return Err(EsesError::InvalidParameterField);
        }
        let echo = page[STR_OUT_ECHO_OFFSET] & 0x80 != 0;
        if !echo || !self.mode_pages.test_mode() {
            return Ok(());
        }
        let text = &page[STR_OUT_DATA_OFFSET..];
        let end = text
            .iter()
            .position(|&b| b == 0)
            .map(|p| p + 1) // keep the terminator
            .unwrap_or(text.len());
        let buf_id = self
            .active_trace_buffer_id()
            .ok_or(EsesError::Internal("LCC without an active trace buffer"))?;
        self.buffers.write_trace(buf_id, &text[..end]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::RecordingActuator;
    use eses_registry::Registry;
    use eses_topology::EnclosureType;
    use eses_wire::download::{
        DownloadStatusCode, MCODE_IMAGE_COMPONENT_TYPE_OFFSET, MCODE_IMAGE_REV_OFFSET,
    };
    use eses_wire::page::PageHeader;

    fn enclosure() -> VirtualEnclosure {
        let registry = Registry::build().unwrap();
        VirtualEnclosure::new(&registry, EnclosureType::Derringer, 0x5000_0972_0000_4000)
    }

    fn receive_cdb(page_code: u8) -> [u8; 6] {
        [OP_RECEIVE_DIAGNOSTIC_RESULTS, 0x01, page_code, 0xff, 0xff, 0]
    }

    fn send_cdb(list_len: u16) -> [u8; 6] {
        [
            OP_SEND_DIAGNOSTIC,
            0x10,
            0,
            (list_len >> 8) as u8,
            list_len as u8,
            0,
        ]
    }

    fn sense_of(outcome: &CommandOutcome) -> (u8, u8, u8) {
        let sense = outcome.sense.unwrap();
        (sense[2] & 0x0f, sense[12], sense[13])
    }

    #[test]
    fn inquiry_respects_allocation_length() {
        let mut encl = enclosure();
        let mut act = RecordingActuator::default();
        let cdb = [OP_INQUIRY, 0, 0, 0, 36, 0];
        let out = encl.handle_command(&mut act, &cdb, &[]);
        assert!(out.is_good());
        assert_eq!(out.data.len(), 36);
        assert_eq!(&out.data[8..11], b"EMC");
    }

    #[test]
    fn receive_configuration_and_status_pages() {
        let mut encl = enclosure();
        let mut act = RecordingActuator::default();

        let out = encl.handle_command(&mut act, &receive_cdb(0x01), &[]);
        assert!(out.is_good());
        assert_eq!(out.data[0], 0x01);

        let out = encl.handle_command(&mut act, &receive_cdb(0x02), &[]);
        assert!(out.is_good());
        let hdr = PageHeader::decode(&out.data).unwrap();
        assert_eq!(hdr.page_code, 0x02);
        assert_eq!(hdr.page_size(), encl.config().status_page_size as usize);
    }

    #[test]
    fn unknown_receive_page_is_unsupported() {
        let mut encl = enclosure();
        let mut act = RecordingActuator::default();
        let out = encl.handle_command(&mut act, &receive_cdb(0x7e), &[]);
        assert_eq!(sense_of(&out), (0x05, 0x35, 0x01));
    }

    #[test]
    fn self_test_is_a_good_no_op() {
        let mut encl = enclosure();
        let mut act = RecordingActuator::default();
        let cdb = [OP_SEND_DIAGNOSTIC, 0x04, 0, 0, 0, 0];
        let out = encl.handle_command(&mut act, &cdb, &[]);
        assert!(out.is_good());
    }

    #[test]
    fn send_diagnostic_cdb_sanity_checks() {
        let mut encl = enclosure();
        let mut act = RecordingActuator::default();
        // page_format clear
        let cdb = [OP_SEND_DIAGNOSTIC, 0x00, 0, 0, 4, 0];
        let out = encl.handle_command(&mut act, &cdb, &[0x02, 0, 0, 0]);
        assert_eq!(sense_of(&out), (0x05, 0x24, 0x00));
        // control byte set
        let cdb = [OP_SEND_DIAGNOSTIC, 0x10, 0, 0, 4, 0x01];
        let out = encl.handle_command(&mut act, &cdb, &[0x02, 0, 0, 0]);
        assert_eq!(sense_of(&out), (0x05, 0x24, 0x00));
    }

    #[test]
    fn control_page_with_stale_gen_code_refused() {
        let mut encl = enclosure();
        let mut act = RecordingActuator::occupied(vec![0]);
        let status = encl.handle_command(&mut act, &receive_cdb(0x02), &[]).data;
        let mut ctrl = status.clone();
        ctrl[4..8].copy_from_slice(&0xdead_beefu32.to_be_bytes());
        let out = encl.handle_command(&mut act, &send_cdb(ctrl.len() as u16), &ctrl);
        assert_eq!(sense_of(&out), (0x05, 0x35, 0x03));
    }

    #[test]
    fn full_download_activate_cycle() {
        let mut encl = enclosure();
        let mut act = RecordingActuator::default();

        let mut image = vec![0u8; 128];
        image[MCODE_IMAGE_COMPONENT_TYPE_OFFSET] = 0x00; // expander firmware
        image[MCODE_IMAGE_REV_OFFSET..MCODE_IMAGE_REV_OFFSET + 5].copy_from_slice(b"1.55 ");

        // Two 64-byte download pages, then a bare activate.
        for (i, chunk) in image.chunks(64).enumerate() {
            let mut page = vec![0u8; DL_UCODE_DATA_OFFSET + chunk.len()];
            page[0] = 0x0e;
            page[1] = 0; // local LCC subenclosure
            let page_len = page.len();
            page[2..4].copy_from_slice(&((page_len - 4) as u16).to_be_bytes());
            page[4..8].copy_from_slice(&encl.generation_code().to_be_bytes());
            page[8] = DL_MODE_DOWNLOAD;
            page[11] = 0; // EEPROM buffer
            page[12..16].copy_from_slice(&((i * 64) as u32).to_be_bytes());
            page[16..20].copy_from_slice(&(image.len() as u32).to_be_bytes());
            page[20..24].copy_from_slice(&(chunk.len() as u32).to_be_bytes());
            page[DL_UCODE_DATA_OFFSET..].copy_from_slice(chunk);
            let out = encl.handle_command(&mut act, &send_cdb(page.len() as u16), &page);
            assert!(out.is_good(), "chunk {i} rejected");
        }

        let status = encl.handle_command(&mut act, &receive_cdb(0x0e), &[]).data;
        assert_eq!(status[10], DownloadStatusCode::NeedsActivate as u8);

        let mut activate = vec![0u8; DL_UCODE_DATA_OFFSET];
        activate[0] = 0x0e;
        let activate_len = activate.len();
        activate[2..4].copy_from_slice(&((activate_len - 4) as u16).to_be_bytes());
        activate[4..8].copy_from_slice(&encl.generation_code().to_be_bytes());
        activate[8] = DL_MODE_ACTIVATE;
        let out = encl.handle_command(&mut act, &send_cdb(activate.len() as u16), &activate);
        assert!(out.is_good());

        // The configuration changed: the next command reports unit
        // attention once, then the new revision is visible.
        let out = encl.handle_command(&mut act, &receive_cdb(0x01), &[]);
        assert_eq!(sense_of(&out), (0x06, 0x3f, 0x00));
        let out = encl.handle_command(&mut act, &receive_cdb(0x01), &[]);
        assert!(out.is_good());
        let page = out.data;
        assert_eq!(u32::from_be_bytes(page[4..8].try_into().unwrap()), 1);
        assert!(
            page.windows(5).any(|w| w == b"1.55 "),
            "activated revision not in config page"
        );
    }

    #[test]
    fn activate_without_image_reports_no_image_status() {
        let mut encl = enclosure();
        let mut act = RecordingActuator::default();
        let mut activate = vec![0u8; DL_UCODE_DATA_OFFSET];
        activate[0] = 0x0e;
        let activate_len = activate.len();
        activate[2..4].copy_from_slice(&((activate_len - 4) as u16).to_be_bytes());
        activate[8] = DL_MODE_ACTIVATE;
        let out = encl.handle_command(&mut act, &send_cdb(activate.len() as u16), &activate);
        assert_eq!(sense_of(&out), (0x05, 0x35, 0x03));

        let status = encl.handle_command(&mut act, &receive_cdb(0x0e), &[]).data;
        assert_eq!(status[10], DownloadStatusCode::NoImage as u8);
    }

    #[test]
    fn buffer_commands_round_trip() {
        let mut encl = enclosure();
        let mut act = RecordingActuator::default();

        let payload = [0xa5u8; 16];
        let write = [OP_WRITE_BUFFER, BUF_MODE_DATA, 0, 0, 0, 0, 0, 0, 16, 0];
        let out = encl.handle_command(&mut act, &write, &payload);
        assert!(out.is_good());

        let read = [OP_READ_BUFFER, BUF_MODE_DATA, 0, 0, 0, 0, 0, 0, 16, 0];
        let out = encl.handle_command(&mut act, &read, &[]);
        assert!(out.is_good());
        assert_eq!(out.data, payload);

        // Active trace buffer is read-only.
        let write_ro = [OP_WRITE_BUFFER, BUF_MODE_DATA, 1, 0, 0, 0, 0, 0, 4, 0];
        let out = encl.handle_command(&mut act, &write_ro, &payload);
        assert_eq!(sense_of(&out), (0x05, 0x24, 0x00));

        let desc = [OP_READ_BUFFER, BUF_MODE_DESCRIPTOR, 0, 0, 0, 0, 0, 0, 4, 0];
        let out = encl.handle_command(&mut act, &desc, &[]);
        assert!(out.is_good());
        assert_eq!(out.data.len(), 4);
    }

    #[test]
    fn string_out_echo_needs_test_mode() {
        let mut encl = enclosure();
        let mut act = RecordingActuator::default();

        let mut page = vec![0x04u8, 0, 0, 0, 0x80];
        page.extend_from_slice(b"hello\0");
        let len_bytes = ((page.len() - 4) as u16).to_be_bytes();
        page[2..4].copy_from_slice(&len_bytes);

        // Without test mode the page is accepted but nothing is traced.
        let out = encl.handle_command(&mut act, &send_cdb(page.len() as u16), &page);
        assert!(out.is_good());
        let trace_id = encl.active_trace_buffer_id().unwrap();
        assert_eq!(&encl.buffers.get(trace_id).unwrap().data[..5], &[0; 5]);

        // Enable test mode via MODE SELECT, then the echo lands.
        let mut list = vec![0u8; 8];
        list.extend_from_slice(&[0x21, 0x0e, 0x80]);
        list.extend_from_slice(&[0; 13]);
        let select = [
            OP_MODE_SELECT_10,
            0x10,
            0,
            0,
            0,
            0,
            0,
            0,
            list.len() as u8,
            0,
        ];
        let out = encl.handle_command(&mut act, &select, &list);
        assert!(out.is_good());

        let out = encl.handle_command(&mut act, &send_cdb(page.len() as u16), &page);
        assert!(out.is_good());
        assert_eq!(&encl.buffers.get(trace_id).unwrap().data[..6], b"hello\0");
    }

    #[test]
    fn unknown_opcode_is_invalid_cdb() {
        let mut encl = enclosure();
        let mut act = RecordingActuator::default();
        let out = encl.handle_command(&mut act, &[0xa0, 0, 0, 0, 0, 0], &[]);
        assert_eq!(sense_of(&out), (0x05, 0x24, 0x00));
    }
}
