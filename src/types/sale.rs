//! Normalized sale data structures.

use alloy::primitives::U256;

use super::{SaleInstant, TokenId};
use crate::num;

/// Named boost traits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trait {
    Vision,
    Shooting,
    Finish,
    Defense,
}

impl Trait {
    pub const ALL: [Trait; 4] = [Self::Vision, Self::Shooting, Self::Finish, Self::Defense];

    /// Trait name as it appears in token metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vision => "Vision",
            Self::Shooting => "Shooting",
            Self::Finish => "Finish",
            Self::Defense => "Defense",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Boost values of a single item.
///
/// The total is never stored, it is always the sum of the four traits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttributeSet {
    vision: u32,
    shooting: u32,
    finish: u32,
    defense: u32,
}

impl AttributeSet {
    pub fn new(vision: u32, shooting: u32, finish: u32, defense: u32) -> Self {
        Self {
            vision,
            shooting,
            finish,
            defense,
        }
    }

    pub fn get(&self, t: Trait) -> u32 {
        match t {
            Trait::Vision => self.vision,
            Trait::Shooting => self.shooting,
            Trait::Finish => self.finish,
            Trait::Defense => self.defense,
        }
    }

    pub(crate) fn set(&mut self, t: Trait, value: u32) {
        match t {
            Trait::Vision => self.vision = value,
            Trait::Shooting => self.shooting = value,
            Trait::Finish => self.finish = value,
            Trait::Defense => self.defense = value,
        }
    }

    pub fn total(&self) -> u32 {
        Trait::ALL.iter().map(|t| self.get(*t)).sum()
    }
}

/// Buyer or seller as displayed.
#[derive(Clone, Debug, PartialEq)]
pub struct Party {
    /// Registered username or the address prefix.
    pub name: String,
    pub address: String,
}

/// Bundle a sale belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct BundleRef {
    pub name: String,
    pub link: String,
}

/// One item changing hands in one trade.
///
/// Items of a bundle trade share everything except the item fields and
/// boosts.
#[derive(Clone, Debug, PartialEq)]
pub struct Sale {
    pub item_name: String,

    pub token_id: TokenId,

    /// Missing for unrevealed items.
    pub image_url: Option<String>,

    /// Total trade price in payment token minor units.
    pub total_price: U256,

    pub payment_decimals: u8,

    pub payment_symbol: String,

    /// USD price of one payment token.
    pub payment_usd_rate: f64,

    pub buyer: Party,

    pub seller: Party,

    pub instant: SaleInstant,

    pub boosts: Option<AttributeSet>,

    /// Present iff the sale is one item of a bundle trade.
    pub bundle: Option<BundleRef>,
}

impl Sale {
    pub fn is_bundled(&self) -> bool {
        self.bundle.is_some()
    }

    /// Total price in payment token units.
    pub fn price_in_token(&self) -> f64 {
        num::Converter::new(self.payment_decimals).to_f64(self.total_price)
    }

    pub fn price_usd(&self) -> f64 {
        self.price_in_token() * self.payment_usd_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_sum() {
        let boosts = AttributeSet::new(10, 20, 30, 40);
        assert_eq!(boosts.total(), 100);
        assert_eq!(boosts.get(Trait::Finish), 30);
        assert_eq!(AttributeSet::default().total(), 0);
    }

    #[test]
    fn test_trait_names() {
        for t in Trait::ALL {
            assert_eq!(Trait::from_name(t.name()), Some(t));
        }
        assert_eq!(Trait::from_name("vision"), None);
    }
}
