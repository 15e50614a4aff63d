// Wire encoding shared by blocks and the wallet file: bincode 2, standard config.
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Encode `data` as bincode. Block hashes are never taken over this encoding,
/// only over the layouts in `core`.
pub fn serialize<T: Serialize + bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| LedgerError::Serialization(format!("Failed to encode: {e}")))
}

/// Decode a value written by [`serialize`]. Trailing bytes are ignored.
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de> + bincode::Decode<()>,
{
    let config = bincode::config::standard();
    let (data, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| LedgerError::Serialization(format!("Failed to decode: {e}")))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
    struct Record {
        key: Vec<u8>,
        index: i32,
        value: u64,
    }

    #[test]
    fn test_record_survives_encoding() {
        let original = Record {
            key: vec![0xab; 32],
            index: -1,
            value: 100,
        };

        let serialized = serialize(&original).expect("Serialization should work");
        let deserialized: Record = deserialize(&serialized).expect("Deserialization should work");

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let record = Record {
            key: vec![1, 2, 3],
            index: 7,
            value: 42,
        };
        assert_eq!(serialize(&record).unwrap(), serialize(&record.clone()).unwrap());
    }

    #[test]
    fn test_malformed_bytes_are_rejected() {
        let invalid_bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<Record> = deserialize(&invalid_bytes);
        assert!(result.is_err());
    }
}
