//! Shelley-era address parsing, rendering, and reward address derivation.
//!
//! A Shelley address is a header byte followed by one or two 28-byte
//! credential hashes. The header's high nibble is the address type, the low
//! nibble the network id. The construction engine needs exactly three
//! things from all this: raw bytes for CBOR outputs, the reward address a
//! staking key must sign with, and enough classification to pick the right
//! witness shape.

use bech32::{Bech32, Hrp};

use super::byron;
use super::AddressError;
use crate::config::{Network, KEY_HASH_BYTES, REWARD_ACCOUNT_BYTES};
use crate::crypto::keys::VerificationKey;

/// Header high-nibble for Byron bootstrap addresses.
const HEADER_BYRON: u8 = 0x8;

/// Header high-nibbles for reward addresses (key and script credential).
const HEADER_REWARD_KEY: u8 = 0xe;
const HEADER_REWARD_SCRIPT: u8 = 0xf;

/// The era an address string belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressEra {
    /// Bech32 Shelley address (payment or reward).
    Shelley,
    /// Base58 Byron bootstrap address.
    Byron,
}

/// The Bech32 prefix for payment addresses on a network.
pub fn payment_hrp(network: Network) -> &'static str {
    match network {
        Network::Mainnet => "addr",
        Network::Preprod | Network::Preview => "addr_test",
    }
}

/// The Bech32 prefix for reward (stake) addresses on a network.
pub fn stake_hrp(network: Network) -> &'static str {
    match network {
        Network::Mainnet => "stake",
        Network::Preprod | Network::Preview => "stake_test",
    }
}

// ---------------------------------------------------------------------------
// ShelleyAddress
// ---------------------------------------------------------------------------

/// A decoded Shelley address: header byte plus credential payload.
///
/// Stored as the raw byte form that appears inside transaction outputs;
/// the Bech32 string form is recomputed on demand from the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelleyAddress {
    bytes: Vec<u8>,
}

impl ShelleyAddress {
    /// Parse a Bech32 address string.
    ///
    /// Accepts payment and reward prefixes for any network we serve; the
    /// header byte is validated against the prefix so a `stake1...` string
    /// carrying a payment header is rejected rather than misfiled.
    pub fn from_bech32(addr: &str) -> Result<Self, AddressError> {
        let (hrp, data) = bech32::decode(addr).map_err(|_| AddressError::Unparseable {
            address: addr.to_string(),
        })?;

        let prefix = hrp.to_string();
        let is_reward_prefix = matches!(prefix.as_str(), "stake" | "stake_test");
        let is_payment_prefix = matches!(prefix.as_str(), "addr" | "addr_test");
        if !is_reward_prefix && !is_payment_prefix {
            return Err(AddressError::UnexpectedHrp {
                address: addr.to_string(),
                hrp: prefix,
            });
        }

        let address = Self::from_raw_bytes(&data)?;
        let header_is_reward = matches!(
            address.header() >> 4,
            HEADER_REWARD_KEY | HEADER_REWARD_SCRIPT
        );
        if header_is_reward != is_reward_prefix {
            return Err(AddressError::UnexpectedHrp {
                address: addr.to_string(),
                hrp: prefix,
            });
        }
        Ok(address)
    }

    /// Wrap raw output bytes (header + payload) after validating shape.
    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        if bytes.is_empty() {
            return Err(AddressError::InvalidLength { got: 0 });
        }
        let header = bytes[0];
        let expected_len = match header >> 4 {
            // Base addresses: payment credential + stake credential.
            0x0..=0x3 => 1 + 2 * KEY_HASH_BYTES,
            // Pointer addresses carry a variable-length pointer; accept
            // anything longer than a single credential.
            0x4 | 0x5 => 0,
            // Enterprise and reward addresses: a single credential.
            0x6 | 0x7 | 0xe | 0xf => 1 + KEY_HASH_BYTES,
            _ => return Err(AddressError::UnknownHeader { header }),
        };
        if expected_len != 0 && bytes.len() != expected_len {
            return Err(AddressError::InvalidLength { got: bytes.len() });
        }
        if expected_len == 0 && bytes.len() <= 1 + KEY_HASH_BYTES {
            return Err(AddressError::InvalidLength { got: bytes.len() });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// The header byte: type nibble in the high half, network in the low.
    pub fn header(&self) -> u8 {
        self.bytes[0]
    }

    /// The network nibble (1 mainnet, 0 testnet).
    pub fn network_nibble(&self) -> u8 {
        self.header() & 0x0f
    }

    /// `true` for reward (stake) addresses.
    pub fn is_reward(&self) -> bool {
        matches!(self.header() >> 4, HEADER_REWARD_KEY | HEADER_REWARD_SCRIPT)
    }

    /// The first credential hash after the header. For payment addresses
    /// this is the payment credential; for reward addresses the staking
    /// credential.
    pub fn first_credential(&self) -> &[u8] {
        &self.bytes[1..1 + KEY_HASH_BYTES]
    }

    /// The raw byte form used inside transaction outputs.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Render back to the canonical Bech32 string for this header.
    pub fn to_bech32(&self) -> Result<String, AddressError> {
        let mainnet = self.network_nibble() == 1;
        let prefix = match (self.is_reward(), mainnet) {
            (true, true) => "stake",
            (true, false) => "stake_test",
            (false, true) => "addr",
            (false, false) => "addr_test",
        };
        let hrp = Hrp::parse(prefix).expect("static HRP is valid");
        bech32::encode::<Bech32>(hrp, &self.bytes).map_err(|_| AddressError::InvalidLength {
            got: self.bytes.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Era classification and byte conversion
// ---------------------------------------------------------------------------

/// Decide which era an address string belongs to.
///
/// Shelley wins if the string is valid Bech32 with one of our prefixes;
/// otherwise we try Byron Base58. Anything else is unparseable.
pub fn classify(addr: &str) -> Result<AddressEra, AddressError> {
    if ShelleyAddress::from_bech32(addr).is_ok() {
        return Ok(AddressEra::Shelley);
    }
    if byron::is_byron_address(addr) {
        return Ok(AddressEra::Byron);
    }
    Err(AddressError::Unparseable {
        address: addr.to_string(),
    })
}

/// The raw bytes of an address as they appear inside a transaction output.
pub fn address_to_bytes(addr: &str) -> Result<Vec<u8>, AddressError> {
    match classify(addr)? {
        AddressEra::Shelley => Ok(ShelleyAddress::from_bech32(addr)?.as_bytes().to_vec()),
        AddressEra::Byron => Ok(byron::ByronAddress::from_base58(addr)?.as_bytes().to_vec()),
    }
}

/// Render output bytes back into an address string.
///
/// Byron addresses are CBOR arrays and always start with 0x82; everything
/// else must carry a valid Shelley header.
pub fn address_from_bytes(bytes: &[u8]) -> Result<String, AddressError> {
    if bytes.first() == Some(&0x82) || bytes.first().map(|b| b >> 4) == Some(HEADER_BYRON) {
        return Ok(byron::ByronAddress::from_raw_bytes(bytes)?.to_base58());
    }
    ShelleyAddress::from_raw_bytes(bytes)?.to_bech32()
}

// ---------------------------------------------------------------------------
// Reward address derivation
// ---------------------------------------------------------------------------

/// Derive the reward address controlled by a staking public key.
///
/// `header = 0xe0 | network nibble`, payload = blake2b-224 of the key.
/// This is the address that must sign for stake delegations, withdrawals,
/// and deregistrations built from that key.
pub fn reward_address_from_key(key: &VerificationKey, network: Network) -> String {
    reward_address_from_key_hash(&key.key_hash(), network)
}

/// Derive a reward address from an existing 28-byte key hash.
pub fn reward_address_from_key_hash(key_hash: &[u8; 28], network: Network) -> String {
    let mut bytes = Vec::with_capacity(REWARD_ACCOUNT_BYTES);
    bytes.push((HEADER_REWARD_KEY << 4) | network.id_nibble());
    bytes.extend_from_slice(key_hash);
    let hrp = Hrp::parse(stake_hrp(network)).expect("static HRP is valid");
    bech32::encode::<Bech32>(hrp, &bytes).expect("encoding a 29-byte payload never fails")
}

/// The 29 raw bytes (header + credential) of a reward address, as used for
/// withdrawal map keys and pool reward accounts.
pub fn reward_account_bytes(addr: &str) -> Result<[u8; 29], AddressError> {
    let parsed = ShelleyAddress::from_bech32(addr)?;
    if !parsed.is_reward() {
        return Err(AddressError::NotRewardAddress {
            address: addr.to_string(),
        });
    }
    let mut out = [0u8; REWARD_ACCOUNT_BYTES];
    out.copy_from_slice(parsed.as_bytes());
    Ok(out)
}

/// Render 29 reward account bytes back into a Bech32 stake address.
pub fn reward_address_from_account_bytes(bytes: &[u8]) -> Result<String, AddressError> {
    let parsed = ShelleyAddress::from_raw_bytes(bytes)?;
    if !parsed.is_reward() {
        return Err(AddressError::NotRewardAddress {
            address: hex::encode(bytes),
        });
    }
    parsed.to_bech32()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::SignerKeypair;

    fn staking_key() -> VerificationKey {
        SignerKeypair::from_seed(&[1u8; 32]).verification_key()
    }

    #[test]
    fn reward_address_roundtrip_mainnet() {
        let addr = reward_address_from_key(&staking_key(), Network::Mainnet);
        assert!(addr.starts_with("stake1"));

        let bytes = reward_account_bytes(&addr).unwrap();
        assert_eq!(bytes.len(), 29);
        assert_eq!(bytes[0], 0xe1);

        let back = reward_address_from_account_bytes(&bytes).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn reward_address_roundtrip_testnet() {
        let addr = reward_address_from_key(&staking_key(), Network::Preprod);
        assert!(addr.starts_with("stake_test1"));
        let bytes = reward_account_bytes(&addr).unwrap();
        assert_eq!(bytes[0], 0xe0);
    }

    #[test]
    fn reward_derivation_is_deterministic() {
        let a = reward_address_from_key(&staking_key(), Network::Mainnet);
        let b = reward_address_from_key(&staking_key(), Network::Mainnet);
        assert_eq!(a, b);
    }

    #[test]
    fn base_address_roundtrips_through_bytes() {
        // Synthesize a base address: payment + stake credentials.
        let payment = SignerKeypair::from_seed(&[2u8; 32]).verification_key();
        let stake = staking_key();
        let mut bytes = vec![0x01]; // base address, mainnet
        bytes.extend_from_slice(&payment.key_hash());
        bytes.extend_from_slice(&stake.key_hash());

        let addr = address_from_bytes(&bytes).unwrap();
        assert!(addr.starts_with("addr1"));
        assert_eq!(classify(&addr).unwrap(), AddressEra::Shelley);
        assert_eq!(address_to_bytes(&addr).unwrap(), bytes);
    }

    #[test]
    fn enterprise_address_roundtrips() {
        let payment = SignerKeypair::from_seed(&[3u8; 32]).verification_key();
        let mut bytes = vec![0x60]; // enterprise key, testnet
        bytes.extend_from_slice(&payment.key_hash());

        let addr = address_from_bytes(&bytes).unwrap();
        assert!(addr.starts_with("addr_test1"));
        assert_eq!(address_to_bytes(&addr).unwrap(), bytes);
    }

    #[test]
    fn rejects_garbage() {
        assert!(classify("not-an-address").is_err());
        assert!(ShelleyAddress::from_bech32("addr1qqqq").is_err());
    }

    #[test]
    fn rejects_wrong_prefix_for_header() {
        // A reward payload rendered under the payment prefix must fail.
        let stake = staking_key();
        let mut bytes = vec![0xe1];
        bytes.extend_from_slice(&stake.key_hash());
        let hrp = Hrp::parse("addr").unwrap();
        let mislabeled = bech32::encode::<Bech32>(hrp, &bytes).unwrap();
        assert!(ShelleyAddress::from_bech32(&mislabeled).is_err());
    }

    #[test]
    fn rejects_truncated_payload() {
        assert!(ShelleyAddress::from_raw_bytes(&[0x01; 20]).is_err());
        assert!(ShelleyAddress::from_raw_bytes(&[]).is_err());
    }

    #[test]
    fn reward_account_bytes_rejects_payment_address() {
        let payment = SignerKeypair::from_seed(&[4u8; 32]).verification_key();
        let mut bytes = vec![0x61];
        bytes.extend_from_slice(&payment.key_hash());
        let addr = address_from_bytes(&bytes).unwrap();
        assert!(matches!(
            reward_account_bytes(&addr),
            Err(AddressError::NotRewardAddress { .. })
        ));
    }
}
