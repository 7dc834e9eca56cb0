//! Raw marketplace event to [`Sale`] normalization.
//!
//! A single-asset event yields one sale. A bundle event yields one sale per
//! bundled item, in bundle order, all sharing the trade level fields.

use tracing::debug;

use crate::{
    boosts::BoostTable,
    error::NormalizeError,
    types::{
        AttributeSet, BundleRef, Party, RawAccount, RawAsset, RawSaleEvent, Sale, SaleInstant,
    },
};

/// Item name prefixes of collections without boosts: sneakers and
/// unrevealed rookies.
pub const NON_BOOSTED_PREFIXES: &[&str] = &["RKL Sneakers", "Rookie"];

/// Number of address characters shown for accounts without a username.
const ADDRESS_PREFIX_LEN: usize = 6;

/// Registered username of the account, if any.
pub fn counterparty(account: &RawAccount) -> Option<&str> {
    account
        .user
        .as_ref()
        .and_then(|u| u.username.as_deref())
        .filter(|name| !name.is_empty())
}

fn party(account: Option<&RawAccount>, side: &str) -> Result<Party, NormalizeError> {
    let account = account.ok_or_else(|| NormalizeError::missing(side))?;
    let address = account
        .address
        .clone()
        .ok_or_else(|| NormalizeError::missing(&format!("{side} address")))?;

    let name = match counterparty(account) {
        Some(name) => name.to_string(),
        None => address.chars().take(ADDRESS_PREFIX_LEN).collect(),
    };

    Ok(Party { name, address })
}

/// Trade level fields shared by every item of the event.
struct Trade {
    total_price: alloy::primitives::U256,
    payment_decimals: u8,
    payment_symbol: String,
    payment_usd_rate: f64,
    buyer: Party,
    seller: Party,
    instant: SaleInstant,
}

impl Trade {
    fn parse(event: &RawSaleEvent) -> Result<Self, NormalizeError> {
        let total_price = event
            .total_price
            .ok_or_else(|| NormalizeError::missing("total_price"))?;

        let payment = event
            .payment_token
            .as_ref()
            .ok_or_else(|| NormalizeError::missing("payment_token"))?;
        let payment_symbol = payment
            .symbol
            .clone()
            .ok_or_else(|| NormalizeError::missing("payment_token.symbol"))?;
        let payment_decimals = payment
            .decimals
            .ok_or_else(|| NormalizeError::missing("payment_token.decimals"))?;
        let payment_usd_rate = payment
            .usd_price
            .ok_or_else(|| NormalizeError::missing("payment_token.usd_price"))?;

        let tx = event
            .transaction
            .as_ref()
            .ok_or_else(|| NormalizeError::missing("transaction"))?;
        let block_number = tx
            .block_number
            .ok_or_else(|| NormalizeError::missing("transaction.block_number"))?;
        let tx_index = tx
            .transaction_index
            .ok_or_else(|| NormalizeError::missing("transaction.transaction_index"))?;

        Ok(Self {
            total_price,
            payment_decimals,
            payment_symbol,
            payment_usd_rate,
            buyer: party(event.winner_account.as_ref(), "buyer")?,
            seller: party(event.seller.as_ref(), "seller")?,
            instant: SaleInstant::new(block_number, tx_index),
        })
    }
}

/// Turns raw events into sales, attaching boosts where the collection has
/// them.
#[derive(Clone, Copy, Debug, Default)]
pub struct Normalizer<'a> {
    boosts: Option<&'a BoostTable>,
}

impl<'a> Normalizer<'a> {
    pub fn new(boosts: Option<&'a BoostTable>) -> Self {
        Self { boosts }
    }

    pub fn normalize(&self, event: &RawSaleEvent) -> Result<Vec<Sale>, NormalizeError> {
        let (assets, bundle) = match (&event.asset_bundle, &event.asset) {
            (Some(bundle), _) => {
                if bundle.assets.is_empty() {
                    return Err(NormalizeError::MalformedEvent("empty bundle".to_string()));
                }
                let name = bundle
                    .name
                    .clone()
                    .ok_or_else(|| NormalizeError::missing("asset_bundle.name"))?;
                let link = bundle
                    .permalink
                    .clone()
                    .ok_or_else(|| NormalizeError::missing("asset_bundle.permalink"))?;
                (bundle.assets.as_slice(), Some(BundleRef { name, link }))
            }
            (None, Some(asset)) => (std::slice::from_ref(asset), None),
            (None, None) => return Err(NormalizeError::missing("asset or asset_bundle")),
        };

        let trade = Trade::parse(event)?;

        assets
            .iter()
            .map(|asset| self.sale(asset, &trade, bundle.clone()))
            .collect()
    }

    fn sale(
        &self,
        asset: &RawAsset,
        trade: &Trade,
        bundle: Option<BundleRef>,
    ) -> Result<Sale, NormalizeError> {
        let token_id = asset
            .token_id
            .ok_or_else(|| NormalizeError::missing("asset.token_id"))?;
        let item_name = asset
            .name
            .clone()
            .unwrap_or_else(|| format!("#{token_id}"));

        let boosts = if is_boosted_name(&item_name) {
            self.boosts_for(token_id)
        } else {
            None
        };

        Ok(Sale {
            item_name,
            token_id,
            image_url: asset.image_url.clone().filter(|url| !url.is_empty()),
            total_price: trade.total_price,
            payment_decimals: trade.payment_decimals,
            payment_symbol: trade.payment_symbol.clone(),
            payment_usd_rate: trade.payment_usd_rate,
            buyer: trade.buyer.clone(),
            seller: trade.seller.clone(),
            instant: trade.instant,
            boosts,
            bundle,
        })
    }

    fn boosts_for(&self, token_id: u64) -> Option<AttributeSet> {
        let table = self.boosts?;
        match table.lookup(token_id) {
            Ok(boosts) => Some(boosts),
            Err(e) => {
                debug!(token_id, %e, "No boosts for item");
                None
            }
        }
    }
}

fn is_boosted_name(name: &str) -> bool {
    !NON_BOOSTED_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}
