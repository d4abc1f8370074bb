//! The firmware download/activate state machine.
//!
//! An image arrives as a series of Download Microcode Control pages, each
//! carrying a chunk with its offset into the declared total. The station
//! assembles chunks into an owned buffer, validates every transition, and
//! tracks the status code the Download Microcode Status page reports.
//!
//! A chunk naming a different subenclosure while a download is in progress
//! silently discards the old session and starts over. The original firmware
//! behaves this way (an aborted upgrade is restarted by the client without
//! an explicit cancel), so clients depend on it.

use eses_wire::download::{
    DownloadControlHeader, DownloadStatusCode, DownloadStatusDescriptor,
    MCODE_IMAGE_COMPONENT_TYPE_OFFSET, MCODE_IMAGE_REV_OFFSET, MCODE_IMAGE_REV_SIZE,
};
use tracing::{debug, warn};

use crate::{EsesError, Result};

/// Where the station is in the multi-page protocol.
///
/// Every transition is driven by one incoming control page:
/// `Idle → Downloading` on the first chunk, `Downloading → ImageComplete`
/// on the chunk that finishes the tiling, `ImageComplete → NeedsActivate`
/// once the image header parses, and back to `Idle` after activation (or on
/// any protocol violation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadState {
    #[default]
    Idle,
    Downloading,
    /// Fully tiled; the embedded header has not been examined yet.
    ImageComplete,
    /// Assembled and parsed; waiting for the activate page.
    NeedsActivate,
}

/// A parsed, fully assembled image awaiting activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedImage {
    pub subenclosure_id: u8,
    pub component_type: u8,
    pub revision: [u8; MCODE_IMAGE_REV_SIZE],
}

#[derive(Debug, Clone)]
struct Session {
    subenclosure_id: u8,
    buffer_id: u8,
    image_length: u32,
    image: Vec<u8>,
}

/// Download/activate state for one enclosure.
#[derive(Debug, Clone, Default)]
pub struct DownloadStation {
    state: DownloadState,
    session: Option<Session>,
    completed: Option<CompletedImage>,
    status: DownloadStatusDescriptor,
}

/// Largest image the station accepts, reported as `max_size` in the status
/// page.
const MAX_IMAGE_SIZE: u32 = 4 * 1024 * 1024;

impl DownloadStation {
    pub fn new() -> DownloadStation {
        DownloadStation {
            status: DownloadStatusDescriptor {
                max_size: MAX_IMAGE_SIZE,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    /// The status descriptor served in the Download Microcode Status page.
    pub fn status_descriptor(&self) -> DownloadStatusDescriptor {
        self.status
    }

    /// The image waiting for activation, if any.
    pub fn completed_image(&self) -> Option<&CompletedImage> {
        self.completed.as_ref()
    }

    fn fail(&mut self, code: DownloadStatusCode, reason: &'static str) -> EsesError {
        warn!(reason, "microcode download rejected");
        self.state = DownloadState::Idle;
        self.session = None;
        self.status.status = code;
        EsesError::TransferRefused(reason)
    }

    /// Records a page-level failure seen before the download handlers ran:
    /// the session is discarded and the status page reports a page-field
    /// error against the named subenclosure.
    pub(crate) fn abort_session(&mut self, subenclosure_id: u8, reason: &'static str) {
        warn!(reason, "microcode control page rejected");
        self.state = DownloadState::Idle;
        self.session = None;
        self.status.subenclosure_id = subenclosure_id;
        self.status.status = DownloadStatusCode::ErrorPageField;
    }

    /// Handles the download half of a control page: appends the chunk,
    /// finishing the session when the image is fully tiled.
    pub fn handle_download(&mut self, hdr: &DownloadControlHeader, chunk: &[u8]) -> Result<()> {
        self.status.subenclosure_id = hdr.subenclosure_id;
        self.status.status = DownloadStatusCode::InProgress;

        if hdr.image_length == 0 {
            return Err(self.fail(DownloadStatusCode::ErrorPageField, "zero image length"));
        }
        if hdr.image_length > MAX_IMAGE_SIZE {
            return Err(self.fail(
                DownloadStatusCode::ErrorPageField,
                "image exceeds download capacity",
            ));
        }

        let restart = match &self.session {
            None => true,
            Some(s) if s.subenclosure_id != hdr.subenclosure_id => {
                // Another subenclosure's download supersedes the session.
                debug!(
                    old = s.subenclosure_id,
                    new = hdr.subenclosure_id,
                    "download superseded by another subenclosure"
                );
                true
            }
            Some(_) => false,
        };
        if restart {
            self.state = DownloadState::Downloading;
            self.completed = None;
            self.session = Some(Session {
                subenclosure_id: hdr.subenclosure_id,
                buffer_id: hdr.buffer_id,
                image_length: hdr.image_length,
                image: vec![0; hdr.image_length as usize],
            });
        }

        // The session exists from here on; the borrow is re-taken so the
        // failure paths can reset it.
        let (expected_len, end) = {
            let s = self.session.as_ref().ok_or(EsesError::Internal(
                "download session missing after start",
            ))?;
            (
                s.image_length,
                hdr.buffer_offset.checked_add(hdr.transfer_length),
            )
        };
        if expected_len != hdr.image_length {
            return Err(self.fail(
                DownloadStatusCode::ErrorPageField,
                "image length changed mid-download",
            ));
        }
        let end = match end {
            Some(e) if e <= expected_len => e,
            _ => {
                return Err(self.fail(
                    DownloadStatusCode::ErrorPageField,
                    "chunk extends past declared image length",
                ))
            }
        };
        if chunk.len() < hdr.transfer_length as usize {
            return Err(self.fail(
                DownloadStatusCode::ErrorPageField,
                "page shorter than its transfer length",
            ));
        }

        let s = self
            .session
            .as_mut()
            .ok_or(EsesError::Internal("download session missing after start"))?;
        s.image[hdr.buffer_offset as usize..end as usize]
            .copy_from_slice(&chunk[..hdr.transfer_length as usize]);
        self.status.expected_buffer_id = s.buffer_id;
        self.status.expected_buffer_offset = end;

        if end == expected_len {
            self.state = DownloadState::ImageComplete;
            self.finish_image()?;
        }
        Ok(())
    }

    /// Runs on a fully tiled image: parse the CDES-1 header and move to the
    /// needs-activate state.
    fn finish_image(&mut self) -> Result<()> {
        self.status.status = DownloadStatusCode::UpdatingFlash;
        let s = self
            .session
            .take()
            .ok_or(EsesError::Internal("image completion without a session"))?;

        if s.image.len() < MCODE_IMAGE_REV_OFFSET + MCODE_IMAGE_REV_SIZE {
            return Err(self.fail(
                DownloadStatusCode::ErrorImage,
                "image too small for a microcode header",
            ));
        }
        let component_type = s.image[MCODE_IMAGE_COMPONENT_TYPE_OFFSET];
        let mut revision = [0u8; MCODE_IMAGE_REV_SIZE];
        revision.copy_from_slice(
            &s.image[MCODE_IMAGE_REV_OFFSET..MCODE_IMAGE_REV_OFFSET + MCODE_IMAGE_REV_SIZE],
        );

        debug!(
            subenclosure = s.subenclosure_id,
            component_type, "microcode image assembled"
        );
        self.completed = Some(CompletedImage {
            subenclosure_id: s.subenclosure_id,
            component_type,
            revision,
        });
        self.state = DownloadState::NeedsActivate;
        self.status.status = DownloadStatusCode::NeedsActivate;
        self.status.expected_buffer_offset = 0;
        Ok(())
    }

    /// Handles the activate half of a control page. Returns the image that
    /// was activated; the caller propagates its revision into the
    /// configuration and bumps the generation code.
    pub fn handle_activate(&mut self, hdr: &DownloadControlHeader) -> Result<CompletedImage> {
        match self.completed.take() {
            Some(image) if image.subenclosure_id == hdr.subenclosure_id => {
                self.status.status = DownloadStatusCode::UpdatingNonVol;
                Ok(image)
            }
            other => {
                self.completed = other;
                self.session = None;
                if self.completed.is_none() {
                    self.state = DownloadState::Idle;
                }
                self.status.status = DownloadStatusCode::NoImage;
                warn!(
                    subenclosure = hdr.subenclosure_id,
                    "activate without a downloaded image"
                );
                Err(EsesError::TransferRefused("no image to activate"))
            }
        }
    }

    /// Marks the cycle finished after activation took effect.
    pub fn activation_complete(&mut self) {
        self.state = DownloadState::Idle;
        self.status.status = DownloadStatusCode::None;
        self.status.expected_buffer_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(subencl: u8, offset: u32, total: u32, len: u32) -> DownloadControlHeader {
        DownloadControlHeader {
            subenclosure_id: subencl,
            buffer_offset: offset,
            image_length: total,
            transfer_length: len,
            ..Default::default()
        }
    }

    fn image(total: usize) -> Vec<u8> {
        let mut img = vec![0u8; total];
        img[MCODE_IMAGE_COMPONENT_TYPE_OFFSET] = 0x04;
        img[MCODE_IMAGE_REV_OFFSET..MCODE_IMAGE_REV_OFFSET + MCODE_IMAGE_REV_SIZE]
            .copy_from_slice(b"1.40 ");
        img
    }

    #[test]
    fn exact_tiling_reaches_needs_activate() {
        let mut dl = DownloadStation::new();
        let img = image(256);
        for (i, chunk) in img.chunks(64).enumerate() {
            let hdr = header(1, i as u32 * 64, 256, 64);
            dl.handle_download(&hdr, chunk).unwrap();
        }
        assert_eq!(dl.state(), DownloadState::NeedsActivate);
        assert_eq!(
            dl.status_descriptor().status,
            DownloadStatusCode::NeedsActivate
        );
        let done = dl.completed_image().unwrap();
        assert_eq!(done.component_type, 0x04);
        assert_eq!(&done.revision, b"1.40 ");
    }

    #[test]
    fn overflowing_chunk_resets_to_idle() {
        let mut dl = DownloadStation::new();
        let img = image(256);
        dl.handle_download(&header(1, 0, 256, 64), &img[..64]).unwrap();
        let err = dl
            .handle_download(&header(1, 224, 256, 64), &img[..64])
            .unwrap_err();
        assert!(matches!(err, EsesError::TransferRefused(_)));
        assert_eq!(dl.state(), DownloadState::Idle);
        assert_eq!(
            dl.status_descriptor().status,
            DownloadStatusCode::ErrorPageField
        );
    }

    #[test]
    fn image_length_must_stay_constant() {
        let mut dl = DownloadStation::new();
        let img = image(256);
        dl.handle_download(&header(1, 0, 256, 64), &img[..64]).unwrap();
        let err = dl
            .handle_download(&header(1, 64, 512, 64), &img[..64])
            .unwrap_err();
        assert!(matches!(err, EsesError::TransferRefused(_)));
        assert_eq!(dl.state(), DownloadState::Idle);
    }

    #[test]
    fn other_subenclosure_supersedes_session() {
        let mut dl = DownloadStation::new();
        let img = image(128);
        dl.handle_download(&header(1, 0, 256, 64), &img[..64]).unwrap();
        // Different subenclosure, different geometry: old session dropped.
        dl.handle_download(&header(3, 0, 128, 128), &img).unwrap();
        assert_eq!(dl.state(), DownloadState::NeedsActivate);
        assert_eq!(dl.completed_image().unwrap().subenclosure_id, 3);
    }

    #[test]
    fn activate_without_image_reports_no_image() {
        let mut dl = DownloadStation::new();
        let err = dl.handle_activate(&header(1, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, EsesError::TransferRefused(_)));
        assert_eq!(dl.status_descriptor().status, DownloadStatusCode::NoImage);
    }

    #[test]
    fn activate_consumes_completed_image() {
        let mut dl = DownloadStation::new();
        let img = image(128);
        dl.handle_download(&header(2, 0, 128, 128), &img).unwrap();
        let done = dl.handle_activate(&header(2, 0, 0, 0)).unwrap();
        assert_eq!(done.subenclosure_id, 2);
        dl.activation_complete();
        assert_eq!(dl.state(), DownloadState::Idle);
        assert_eq!(dl.status_descriptor().status, DownloadStatusCode::None);
    }

    #[test]
    fn zero_image_length_rejected() {
        let mut dl = DownloadStation::new();
        let err = dl.handle_download(&header(1, 0, 0, 0), &[]).unwrap_err();
        assert!(matches!(err, EsesError::TransferRefused(_)));
        assert_eq!(dl.state(), DownloadState::Idle);
    }
}
