use crate::error::{LedgerError, Result};
use crate::utils::{base58_decode, base58_encode, new_key_pair, sha256_digest};
use serde::{Deserialize, Serialize};

pub use crate::utils::hash_pub_key;

const VERSION: u8 = 0x00;
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;

/// A P-256 key pair. `public_key` is the raw 64-byte `x ‖ y` form used in
/// transaction inputs.
#[derive(Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let (pkcs8, public_key) = new_key_pair()?;
        Ok(Wallet { pkcs8, public_key })
    }

    pub fn get_address(&self) -> String {
        convert_address(hash_pub_key(self.public_key.as_slice()).as_slice())
    }

    pub fn get_pub_key_hash(&self) -> Vec<u8> {
        hash_pub_key(self.public_key.as_slice())
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }
}

fn checksum(payload: &[u8]) -> Vec<u8> {
    let first_sha = sha256_digest(payload);
    let second_sha = sha256_digest(first_sha.as_slice());
    second_sha[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}

pub fn validate_address(address: &str) -> bool {
    address_to_pub_key_hash(address).is_ok()
}

/// Decode `version ‖ pub_key_hash ‖ checksum` and return the key hash.
pub fn address_to_pub_key_hash(address: &str) -> Result<Vec<u8>> {
    let payload =
        base58_decode(address).map_err(|_| LedgerError::InvalidAddress(address.to_string()))?;
    if payload.len() < ADDRESS_CHECK_SUM_LEN + 1 {
        return Err(LedgerError::InvalidAddress(address.to_string()));
    }

    let (versioned, actual_checksum) = payload.split_at(payload.len() - ADDRESS_CHECK_SUM_LEN);
    if versioned[0] != VERSION || checksum(versioned).as_slice() != actual_checksum {
        return Err(LedgerError::InvalidAddress(address.to_string()));
    }
    Ok(versioned[1..].to_vec())
}

pub fn convert_address(pub_hash_key: &[u8]) -> String {
    let mut payload: Vec<u8> = vec![VERSION];
    payload.extend(pub_hash_key);
    let checksum = checksum(payload.as_slice());
    payload.extend(checksum.as_slice());
    base58_encode(payload.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_round_trip() {
        let wallet = Wallet::new().unwrap();
        let address = wallet.get_address();

        assert!(validate_address(&address));
        assert_eq!(
            address_to_pub_key_hash(&address).unwrap(),
            wallet.get_pub_key_hash()
        );
        assert_eq!(wallet.get_pub_key_hash().len(), 20);
        assert_eq!(wallet.get_public_key().len(), 64);
    }

    #[test]
    fn test_corrupted_address_is_rejected() {
        let address = Wallet::new().unwrap().get_address();
        let mut chars: Vec<char> = address.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '2' { '3' } else { '2' };
        let corrupted: String = chars.into_iter().collect();

        assert!(!validate_address(&corrupted));
        assert!(!validate_address(""));
        assert!(!validate_address("0OIl"));
        match address_to_pub_key_hash("abc") {
            Err(LedgerError::InvalidAddress(addr)) => assert_eq!(addr, "abc"),
            other => panic!("expected InvalidAddress, got {other:?}"),
        }
    }

    #[test]
    fn test_convert_address_matches_wallet() {
        let wallet = Wallet::new().unwrap();
        assert_eq!(
            convert_address(&wallet.get_pub_key_hash()),
            wallet.get_address()
        );
    }
}
