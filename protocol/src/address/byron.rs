//! Byron-era bootstrap addresses.
//!
//! Byron addresses are Base58-encoded CBOR: `[#6.24(bytes .cbor payload),
//! crc]` where the payload is `[address_root, attributes, address_type]`.
//! The engine never derives new Byron addresses, but UTXOs created before
//! Shelley still live on them, so inputs can reference them and combine
//! must be able to build the matching bootstrap witness — which embeds the
//! address attributes verbatim.
//!
//! We do not re-verify the CRC checksum: an address that reached us inside
//! a coin reference was already validated by the indexer that served it,
//! and the ledger re-checks on submission.

use minicbor::data::Tag;
use minicbor::Decoder;

use super::AddressError;

/// CBOR tag for "encoded CBOR data item" wrapping the Byron payload.
const CBOR_IN_CBOR_TAG: u64 = 24;

/// A decoded Byron bootstrap address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByronAddress {
    bytes: Vec<u8>,
}

impl ByronAddress {
    /// Parse a Base58 address string, validating the CBOR structure.
    pub fn from_base58(addr: &str) -> Result<Self, AddressError> {
        let bytes = bs58::decode(addr)
            .into_vec()
            .map_err(|_| AddressError::NotByron {
                address: addr.to_string(),
            })?;
        Self::from_raw_bytes(&bytes).map_err(|_| AddressError::NotByron {
            address: addr.to_string(),
        })
    }

    /// Wrap raw CBOR bytes, validating the outer `[tag 24 payload, crc]`
    /// shape and the inner payload structure.
    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let address = Self {
            bytes: bytes.to_vec(),
        };
        // Parsing the attributes exercises the full structure.
        address.attributes()?;
        Ok(address)
    }

    /// The raw CBOR byte form used inside transaction outputs.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Render back to the Base58 string form.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.bytes).into_string()
    }

    /// The re-encoded address attributes map, exactly as it must appear in
    /// the bootstrap witness.
    pub fn attributes(&self) -> Result<Vec<u8>, AddressError> {
        let malformed = || AddressError::NotByron {
            address: bs58::encode(&self.bytes).into_string(),
        };

        let mut outer = Decoder::new(&self.bytes);
        let outer_len = outer.array().map_err(|_| malformed())?;
        if outer_len != Some(2) {
            return Err(malformed());
        }
        let tag = outer.tag().map_err(|_| malformed())?;
        if tag != Tag::new(CBOR_IN_CBOR_TAG) {
            return Err(malformed());
        }
        let payload = outer.bytes().map_err(|_| malformed())?;
        outer.u64().map_err(|_| malformed())?; // crc, unchecked

        let mut inner = Decoder::new(payload);
        let inner_len = inner.array().map_err(|_| malformed())?;
        if inner_len != Some(3) {
            return Err(malformed());
        }
        inner.bytes().map_err(|_| malformed())?; // address root
        let start = inner.position();
        inner.skip().map_err(|_| malformed())?; // attributes map
        let end = inner.position();
        inner.u64().map_err(|_| malformed())?; // address type

        Ok(payload[start..end].to_vec())
    }
}

/// `true` if the string decodes as a structurally valid Byron address.
pub fn is_byron_address(addr: &str) -> bool {
    ByronAddress::from_base58(addr).is_ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
