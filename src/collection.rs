//! Collections the bot announces sales for.
//!
//! Every supported collection is a row in a small table keyed by
//! [`CollectionKind`]: the contract to query, the permalink prefix for
//! items and whether sales carry boosts. Adding a collection means adding
//! a variant and a row.

use std::{fmt, ops::RangeInclusive, str::FromStr};

use alloy::primitives::{Address, address};

/// Supported collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Kong,
    Sneaker,
    Rookie,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [Self::Kong, Self::Sneaker, Self::Rookie];

    /// Stable numeric code, also used by the legacy command line.
    pub fn code(&self) -> u8 {
        match self {
            Self::Kong => 0,
            Self::Sneaker => 1,
            Self::Rookie => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Kong => "kong",
            Self::Sneaker => "sneaker",
            Self::Rookie => "rookie",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s || kind.code().to_string() == s)
            .ok_or_else(|| format!("unknown collection: {s}"))
    }
}

const KONG_CONTRACT: Address = address!("0xef0182dc0574cd5874494a120750fd222fdb909a");
const SNEAKER_CONTRACT: Address = address!("0x5180f2a553e76fac3cf019c8011711cf2b5c6035");

const KONG_IDS: RangeInclusive<u64> = 0..=9999;

const ASSET_URL_BASE: &str = "https://opensea.io/assets";

/// Collection the sales are announced for.
#[derive(Clone, Debug)]
pub struct Collection {
    kind: CollectionKind,
    contract: Address,
    boosted_ids: Option<RangeInclusive<u64>>,
}

impl Collection {
    pub fn kong() -> Self {
        Self {
            kind: CollectionKind::Kong,
            contract: KONG_CONTRACT,
            boosted_ids: Some(KONG_IDS),
        }
    }

    pub fn sneaker() -> Self {
        Self {
            kind: CollectionKind::Sneaker,
            contract: SNEAKER_CONTRACT,
            boosted_ids: None,
        }
    }

    /// Rookie contract has no well-known address and comes from configuration.
    pub fn rookie(contract: Address) -> Self {
        Self {
            kind: CollectionKind::Rookie,
            contract,
            boosted_ids: None,
        }
    }

    /// Looks up the table row for `kind`, with an optional contract override.
    pub fn from_kind(kind: CollectionKind, contract: Option<Address>) -> crate::error::Result<Self> {
        let mut collection = match kind {
            CollectionKind::Kong => Self::kong(),
            CollectionKind::Sneaker => Self::sneaker(),
            CollectionKind::Rookie => {
                let contract = contract.ok_or(crate::error::Error::MissingContract(kind))?;
                Self::rookie(contract)
            }
        };
        if let Some(contract) = contract {
            collection.contract = contract;
        }
        Ok(collection)
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Contract address in the lowercase form the marketplace uses.
    pub fn contract_hex(&self) -> String {
        self.contract.to_string().to_lowercase()
    }

    /// Item id range covered by the boost dataset, `None` for collections
    /// without boosts.
    pub fn boosted_ids(&self) -> Option<&RangeInclusive<u64>> {
        self.boosted_ids.as_ref()
    }

    pub fn is_boosted(&self) -> bool {
        self.boosted_ids.is_some()
    }

    pub fn item_url(&self, token_id: u64) -> String {
        format!("{ASSET_URL_BASE}/{}/{token_id}", self.contract_hex())
    }
}
