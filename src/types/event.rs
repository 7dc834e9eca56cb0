//! Marketplace sale event wire format.
//!
//! Every field is optional at this layer: presence of the required ones is
//! checked during normalization so a single incomplete record can be
//! reported and skipped on its own.

use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, de};

/// One page of the marketplace events endpoint.
///
/// Records are kept undecoded so one bad record does not fail the page.
#[derive(Debug, Default, Deserialize)]
pub struct EventsPage {
    #[serde(default)]
    pub asset_events: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawSaleEvent {
    #[serde(default)]
    pub asset: Option<RawAsset>,

    #[serde(default)]
    pub asset_bundle: Option<RawBundle>,

    #[serde(default, deserialize_with = "opt_u256")]
    pub total_price: Option<U256>,

    #[serde(default)]
    pub payment_token: Option<RawPaymentToken>,

    /// Buyer.
    #[serde(default)]
    pub winner_account: Option<RawAccount>,

    #[serde(default)]
    pub seller: Option<RawAccount>,

    #[serde(default)]
    pub transaction: Option<RawTransaction>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawAsset {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub image_url: Option<String>,

    #[serde(default, deserialize_with = "opt_u64")]
    pub token_id: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawBundle {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub permalink: Option<String>,

    #[serde(default)]
    pub assets: Vec<RawAsset>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawPaymentToken {
    #[serde(default)]
    pub symbol: Option<String>,

    #[serde(default)]
    pub decimals: Option<u8>,

    #[serde(default, deserialize_with = "opt_f64")]
    pub usd_price: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawAccount {
    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub user: Option<RawUser>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawTransaction {
    #[serde(default, deserialize_with = "opt_u64")]
    pub block_number: Option<u64>,

    #[serde(default, deserialize_with = "opt_u64")]
    pub transaction_index: Option<u64>,
}

/// The marketplace is inconsistent about quoting numbers: amounts come as
/// decimal strings or as JSON numbers, possibly beyond `u64`.
enum Numeric {
    Number(serde_json::Number),
    Str(String),
}

impl Numeric {
    fn deserialize_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Self>, D::Error> {
        match Option::<serde_json::Value>::deserialize(d)? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::Number(n)) => Ok(Some(Self::Number(n))),
            Some(serde_json::Value::String(s)) => Ok(Some(Self::Str(s.trim().to_string()))),
            Some(other) => Err(de::Error::custom(format!("expected a number, got {other}"))),
        }
    }
}

fn opt_u256<'de, D: Deserializer<'de>>(d: D) -> Result<Option<U256>, D::Error> {
    let digits = match Numeric::deserialize_opt(d)? {
        None => return Ok(None),
        Some(Numeric::Str(s)) => s,
        Some(Numeric::Number(n)) => {
            if let Some(v) = n.as_u64() {
                return Ok(Some(U256::from(v)));
            }
            // Exact digits, numbers keep their source text
            let digits = n.to_string();
            if let Ok(v) = digits.parse::<U256>() {
                return Ok(Some(v));
            }
            match n.as_f64() {
                Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => format!("{v:.0}"),
                _ => digits,
            }
        }
    };
    digits
        .parse::<U256>()
        .map(Some)
        .map_err(|e| de::Error::custom(format!("invalid amount {digits:?}: {e}")))
}

fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    match Numeric::deserialize_opt(d)? {
        None => Ok(None),
        Some(Numeric::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected an unsigned integer, got {n}"))),
        Some(Numeric::Str(s)) => s.parse::<u64>().map(Some).map_err(de::Error::custom),
    }
}

fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    match Numeric::deserialize_opt(d)? {
        None => Ok(None),
        Some(Numeric::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid number {n}"))),
        Some(Numeric::Str(s)) => s.parse::<f64>().map(Some).map_err(de::Error::custom),
    }
}
