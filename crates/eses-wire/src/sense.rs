//! SCSI sense data for failed enclosure commands.

/// SCSI status byte values returned by the dispatcher.
pub const SCSI_STATUS_GOOD: u8 = 0x00;
pub const SCSI_STATUS_CHECK_CONDITION: u8 = 0x02;

/// Fixed-format sense buffer size the enclosure reports.
pub const SENSE_DATA_SIZE: usize = 18;

/// Sense keys used by the emulated services processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SenseKey {
    NoSense = 0x0,
    NotReady = 0x2,
    IllegalRequest = 0x5,
    UnitAttention = 0x6,
}

/// An additional sense code / qualifier pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdditionalSense {
    pub asc: u8,
    pub ascq: u8,
}

pub const ASC_INVALID_FIELD_IN_CDB: AdditionalSense = AdditionalSense { asc: 0x24, ascq: 0x00 };
pub const ASC_INVALID_FIELD_IN_PARAMETER_LIST: AdditionalSense =
    AdditionalSense { asc: 0x26, ascq: 0x00 };
pub const ASC_UNSUPPORTED_ENCLOSURE_FUNCTION: AdditionalSense =
    AdditionalSense { asc: 0x35, ascq: 0x01 };
pub const ASC_ENCLOSURE_SERVICES_UNAVAILABLE: AdditionalSense =
    AdditionalSense { asc: 0x35, ascq: 0x02 };
pub const ASC_ENCLOSURE_SERVICES_TRANSFER_REFUSED: AdditionalSense =
    AdditionalSense { asc: 0x35, ascq: 0x03 };
pub const ASC_TARGET_OPERATING_CONDITIONS_CHANGED: AdditionalSense =
    AdditionalSense { asc: 0x3f, ascq: 0x00 };

/// The full triple attached to a CHECK CONDITION response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenseInfo {
    pub key: SenseKey,
    pub additional: AdditionalSense,
}

impl SenseInfo {
    pub const fn new(key: SenseKey, additional: AdditionalSense) -> SenseInfo {
        SenseInfo { key, additional }
    }

    /// Fixed-format sense data (response code 0x70, current errors).
    pub fn to_fixed_sense_data(self) -> [u8; SENSE_DATA_SIZE] {
        let mut data = [0u8; SENSE_DATA_SIZE];
        data[0] = 0x70;
        data[2] = self.key as u8 & 0x0f;
        data[7] = (SENSE_DATA_SIZE - 8) as u8;
        data[12] = self.additional.asc;
        data[13] = self.additional.ascq;
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_sense_layout() {
        let sense = SenseInfo::new(SenseKey::IllegalRequest, ASC_ENCLOSURE_SERVICES_TRANSFER_REFUSED);
        let data = sense.to_fixed_sense_data();
        assert_eq!(data[0], 0x70);
        assert_eq!(data[2], 0x05);
        assert_eq!(data[12], 0x35);
        assert_eq!(data[13], 0x03);
    }
}
