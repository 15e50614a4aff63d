//! Utility functions and helpers
//!
//! Hashing, ECDSA signing and verification, base58, and the bincode helpers
//! used for the block and wallet encodings.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    base58_decode, base58_encode, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    hash_pub_key, new_key_pair, public_key_from_pkcs8, ripemd160_digest, sha256_digest,
    ScalarPair, P256_FIELD_LEN,
};

pub use serialization::{deserialize, serialize};
