//! Static per-collection boost dataset.
//!
//! The dataset is the collection's token metadata reduced to the attribute
//! lists, keyed by item id:
//!
//! ```json
//! {"42": [{"trait_type": "Vision", "value": 40, "display_type": "number"}, ...]}
//! ```
//!
//! Only attributes with a `display_type` are boosts; the rest are cosmetic.

use std::{collections::HashMap, ops::RangeInclusive, path::Path};

use serde::Deserialize;

use crate::{
    error::BoostError,
    types::{AttributeSet, TokenId, Trait},
};

#[derive(Deserialize)]
struct RawAttribute {
    trait_type: String,
    value: serde_json::Value,
    #[serde(default)]
    display_type: Option<String>,
}

/// Read-only item id to boosts table.
#[derive(Clone, Debug)]
pub struct BoostTable {
    ids: RangeInclusive<TokenId>,
    records: HashMap<TokenId, AttributeSet>,
}

impl BoostTable {
    pub fn new(ids: RangeInclusive<TokenId>, records: HashMap<TokenId, AttributeSet>) -> Self {
        Self { ids, records }
    }

    /// Parse the metadata attributes dataset.
    pub fn from_json(ids: RangeInclusive<TokenId>, json: &str) -> Result<Self, BoostError> {
        let raw: HashMap<String, Vec<RawAttribute>> = serde_json::from_str(json)?;

        let mut records = HashMap::with_capacity(raw.len());
        for (key, attributes) in raw {
            let id: TokenId = key
                .trim()
                .parse()
                .map_err(|_| BoostError::InvalidDataset(format!("bad item id {key:?}")))?;
            records.insert(id, parse_attributes(id, &attributes)?);
        }

        Ok(Self { ids, records })
    }

    pub fn load(ids: RangeInclusive<TokenId>, path: impl AsRef<Path>) -> Result<Self, BoostError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(ids, &json)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn lookup(&self, id: TokenId) -> Result<AttributeSet, BoostError> {
        if !self.ids.contains(&id) {
            return Err(BoostError::InvalidItemId(id));
        }
        self.records
            .get(&id)
            .copied()
            .ok_or(BoostError::MissingRecord(id))
    }
}

fn parse_attributes(id: TokenId, attributes: &[RawAttribute]) -> Result<AttributeSet, BoostError> {
    let mut boosts = AttributeSet::default();
    for attr in attributes {
        if attr.display_type.is_none() {
            continue;
        }
        let Some(t) = Trait::from_name(&attr.trait_type) else {
            continue;
        };
        let value = match &attr.value {
            serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            BoostError::InvalidDataset(format!("item {id}: bad {} value {}", t.name(), attr.value))
        })?;
        boosts.set(t, value);
    }
    Ok(boosts)
}
