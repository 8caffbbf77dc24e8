//! Binary layout of the persisted settings record.

use serde::Serialize;

/// Signature marking a record as written by this firmware.
///
/// Bump it on any layout change; older records are then reset to defaults.
pub const MAGIC: u32 = 0xDEED_BEEF;

/// NMEA2000 source address requested when nothing has been persisted.
pub const DEFAULT_DEVICE_ADDRESS: u8 = 22;

/// Size of the record on the medium.
///
/// Signature (4 bytes LE), device address (1 byte), 3 reserved zero bytes.
/// Matches the padded struct image earlier firmware wrote verbatim.
pub const RECORD_SIZE: usize = 8;

const ADDRESS_OFFSET: usize = 4;

/// Settings record as stored on the durable medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersistedConfig {
    /// Must equal [`MAGIC`] for the record to be valid.
    pub signature: u32,

    /// Persisted NMEA2000 source address.
    pub device_address: u8,
}

impl PersistedConfig {
    /// Creates a valid record with the given address.
    #[must_use]
    pub const fn new(device_address: u8) -> Self {
        Self {
            signature: MAGIC,
            device_address,
        }
    }

    /// Returns `true` if the signature marks an initialized record.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.signature == MAGIC
    }

    /// Encodes the record into its fixed-size blob.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[..ADDRESS_OFFSET].copy_from_slice(&self.signature.to_le_bytes());
        bytes[ADDRESS_OFFSET] = self.device_address;
        bytes
    }

    /// Decodes a record from its fixed-size blob.
    ///
    /// Never fails: validity is judged by [`Self::is_valid`].
    #[must_use]
    pub const fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        Self {
            signature: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            device_address: bytes[ADDRESS_OFFSET],
        }
    }
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_ADDRESS)
    }
}
