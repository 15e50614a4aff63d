use num_bigint::BigUint;
use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, UnparsedPublicKey, ECDSA_P256_SHA256_FIXED,
    ECDSA_P256_SHA256_FIXED_SIGNING,
};
use ripemd::{Digest as RipemdDigest, Ripemd160};

use crate::error::{LedgerError, Result};

/// Byte width of one P-256 field element (a coordinate, or `r`/`s` of a signature).
pub const P256_FIELD_LEN: usize = 32;

/// SEC1 tag for an uncompressed curve point.
const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

pub fn ripemd160_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// RIPEMD-160 over SHA-256 of a raw public key; this is what outputs are locked to.
pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = sha256_digest(pub_key);
    ripemd160_digest(pub_key_sha256.as_slice())
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| LedgerError::InvalidAddress(format!("Invalid base58 encoding: {e}")))
}

/// Two big-endian unsigned integers stored back to back.
///
/// This is the wire layout of both signatures (`r ‖ s`) and public keys
/// (`x ‖ y`). Decoding splits the input at exactly half its length; encoding
/// left-pads each half to [`P256_FIELD_LEN`] bytes so the result is always
/// 64 bytes wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarPair {
    pub first: BigUint,
    pub second: BigUint,
}

impl ScalarPair {
    pub fn from_concatenated(bytes: &[u8]) -> Result<ScalarPair> {
        if bytes.is_empty() || bytes.len() % 2 != 0 {
            return Err(LedgerError::Crypto(format!(
                "Expected an even, non-zero number of bytes, got {}",
                bytes.len()
            )));
        }
        let split = bytes.len() / 2;
        if split > P256_FIELD_LEN {
            return Err(LedgerError::Crypto(format!(
                "Each half must fit in {P256_FIELD_LEN} bytes, got {split}"
            )));
        }
        Ok(ScalarPair {
            first: BigUint::from_bytes_be(&bytes[..split]),
            second: BigUint::from_bytes_be(&bytes[split..]),
        })
    }

    pub fn to_fixed_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(P256_FIELD_LEN * 2);
        out.extend(left_pad(&self.first)?);
        out.extend(left_pad(&self.second)?);
        Ok(out)
    }
}

fn left_pad(value: &BigUint) -> Result<Vec<u8>> {
    let bytes = value.to_bytes_be();
    if bytes.len() > P256_FIELD_LEN {
        return Err(LedgerError::Crypto(format!(
            "Integer is {} bytes wide, limit is {P256_FIELD_LEN}",
            bytes.len()
        )));
    }
    let mut padded = vec![0u8; P256_FIELD_LEN - bytes.len()];
    padded.extend(bytes);
    Ok(padded)
}

/// Generate a fresh P-256 key pair.
///
/// Returns the PKCS#8 document and the raw `x ‖ y` public key.
pub fn new_key_pair() -> Result<(Vec<u8>, Vec<u8>)> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
        .map_err(|e| LedgerError::Crypto(format!("Failed to generate ECDSA key pair: {e}")))?
        .as_ref()
        .to_vec();
    let public_key = public_key_from_pkcs8(&pkcs8)?;
    Ok((pkcs8, public_key))
}

/// Raw `x ‖ y` public key of a PKCS#8 document (the SEC1 tag byte is dropped).
pub fn public_key_from_pkcs8(pkcs8: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| LedgerError::Crypto(format!("Failed to create key pair from PKCS8: {e}")))?;
    let sec1 = key_pair.public_key().as_ref();
    match sec1.split_first() {
        Some((&SEC1_UNCOMPRESSED_TAG, coordinates)) => Ok(coordinates.to_vec()),
        _ => Err(LedgerError::Crypto(
            "Unexpected public key encoding".to_string(),
        )),
    }
}

/// Sign `message` and return the raw `r ‖ s` signature (64 bytes, not ASN.1).
pub fn ecdsa_p256_sha256_sign_digest(pkcs8: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| LedgerError::Crypto(format!("Failed to create key pair from PKCS8: {e}")))?;
    let signature = key_pair
        .sign(&rng, message)
        .map_err(|e| LedgerError::Crypto(format!("Failed to sign message: {e}")))?;
    let pair = ScalarPair::from_concatenated(signature.as_ref())?;
    pair.to_fixed_bytes()
}

/// Check a raw `r ‖ s` signature against a raw `x ‖ y` public key.
/// Malformed encodings verify as false.
pub fn ecdsa_p256_sha256_sign_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    let coordinates = match ScalarPair::from_concatenated(public_key)
        .and_then(|point| point.to_fixed_bytes())
    {
        Ok(coordinates) => coordinates,
        Err(_) => return false,
    };
    let signature = match ScalarPair::from_concatenated(signature)
        .and_then(|pair| pair.to_fixed_bytes())
    {
        Ok(signature) => signature,
        Err(_) => return false,
    };

    let mut sec1 = Vec::with_capacity(coordinates.len() + 1);
    sec1.push(SEC1_UNCOMPRESSED_TAG);
    sec1.extend(coordinates);

    let peer_public_key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, sec1);
    peer_public_key.verify(message, signature.as_ref()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let digest = sha256_digest(b"abc");
        assert_eq!(
            data_encoding::HEXLOWER.encode(&digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_pub_key_is_twenty_bytes() {
        assert_eq!(hash_pub_key(b"some key").len(), 20);
    }

    #[test]
    fn test_key_pair_has_raw_coordinates() {
        let (pkcs8, public_key) = new_key_pair().unwrap();
        assert_eq!(public_key.len(), P256_FIELD_LEN * 2);
        assert_eq!(public_key_from_pkcs8(&pkcs8).unwrap(), public_key);
    }

    #[test]
    fn test_sign_then_verify() {
        let (pkcs8, public_key) = new_key_pair().unwrap();
        let message = sha256_digest(b"payload");

        let signature = ecdsa_p256_sha256_sign_digest(&pkcs8, &message).unwrap();
        assert_eq!(signature.len(), P256_FIELD_LEN * 2);
        assert!(ecdsa_p256_sha256_sign_verify(
            &public_key,
            &signature,
            &message
        ));

        let other = sha256_digest(b"other payload");
        assert!(!ecdsa_p256_sha256_sign_verify(
            &public_key,
            &signature,
            &other
        ));
    }

    #[test]
    fn test_verify_rejects_malformed_encodings() {
        let (pkcs8, public_key) = new_key_pair().unwrap();
        let message = sha256_digest(b"payload");
        let signature = ecdsa_p256_sha256_sign_digest(&pkcs8, &message).unwrap();

        assert!(!ecdsa_p256_sha256_sign_verify(&public_key, &signature[1..], &message));
        assert!(!ecdsa_p256_sha256_sign_verify(&[], &signature, &message));
    }

    #[test]
    fn test_scalar_pair_splits_at_half_and_pads() {
        let pair = ScalarPair::from_concatenated(&[0x01, 0x02, 0x03, 0x04]).unwrap();
        assert_eq!(pair.first, BigUint::from(0x0102u32));
        assert_eq!(pair.second, BigUint::from(0x0304u32));

        let fixed = pair.to_fixed_bytes().unwrap();
        assert_eq!(fixed.len(), 64);
        assert_eq!(&fixed[30..32], &[0x01, 0x02]);
        assert_eq!(&fixed[62..64], &[0x03, 0x04]);
        assert!(fixed[..30].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_scalar_pair_rejects_bad_lengths() {
        assert!(ScalarPair::from_concatenated(&[]).is_err());
        assert!(ScalarPair::from_concatenated(&[1, 2, 3]).is_err());
        assert!(ScalarPair::from_concatenated(&[7u8; 66]).is_err());
    }
}
