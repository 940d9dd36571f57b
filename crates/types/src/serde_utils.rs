//! Serde helpers for the hex-or-decimal number encodings used by prestate files.

use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

/// Parse `0x`-prefixed hex or plain decimal into a `u64`.
pub fn parse_u64(raw: &str) -> Result<u64, std::num::ParseIntError> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse::<u64>(),
    }
}

/// `u64` accepted as a JSON number, a decimal string or a `0x` hex string; written as hex.
pub mod hex_or_decimal_u64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(value) => Ok(value),
            NumberOrString::String(raw) => parse_u64(&raw).map_err(serde::de::Error::custom),
        }
    }
}

/// `U256` accepted as a JSON number, a decimal string or a `0x` hex string; written as hex.
pub mod hex_or_decimal_u256 {
    use super::*;
    use alloy_primitives::U256;
    use std::str::FromStr as _;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:#x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(value) => Ok(U256::from(value)),
            NumberOrString::String(raw) => {
                U256::from_str(raw.trim()).map_err(serde::de::Error::custom)
            }
        }
    }
}

/// Optional block-number keyed hash table whose keys are hex-or-decimal strings.
pub mod block_hashes {
    use super::*;
    use alloy_primitives::B256;
    use serde::Serialize as _;
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        value: &Option<BTreeMap<u64, B256>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .as_ref()
            .map(|table| {
                table
                    .iter()
                    .map(|(number, hash)| (number.to_string(), *hash))
                    .collect::<BTreeMap<_, _>>()
            })
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BTreeMap<u64, B256>>, D::Error> {
        let Some(raw) = Option::<BTreeMap<String, B256>>::deserialize(deserializer)? else {
            return Ok(None);
        };
        raw.into_iter()
            .map(|(number, hash)| {
                parse_u64(&number)
                    .map(|number| (number, hash))
                    .map_err(serde::de::Error::custom)
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Some)
    }
}
