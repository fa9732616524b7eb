// Amounts as decimal strings in JSON and snapshots
use super::primitives::Amount;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_str_radix(10))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse::<Amount>().map_err(serde::de::Error::custom)
}
