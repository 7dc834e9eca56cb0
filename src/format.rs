//! Sale announcements: chat embeds and social posts.
//!
//! Every item of a bundle gets its own embed so the whole bundle is visible
//! in chat, while the social post is written once per trade from the first
//! sale.

use serde::Serialize;

use crate::{
    collection::Collection,
    error::FormatError,
    num,
    types::{Sale, Trait},
};

const PROFILE_URL_BASE: &str = "https://opensea.io";

/// Chat embed, serialized in the Discord webhook schema.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: impl Into<String>, value: impl ToString, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
            inline,
        }
    }
}

/// Everything published for one trade.
#[derive(Clone, Debug, PartialEq)]
pub struct Announcement {
    pub embeds: Vec<Embed>,
    pub post: String,
}

/// `Price: 1.5 ETH, ($3750.00)` without the `Price: ` label.
fn price(sale: &Sale) -> String {
    format!(
        "{} {}, (${})",
        num::display_amount(sale.price_in_token()),
        sale.payment_symbol,
        num::display_usd(sale.price_usd()),
    )
}

fn profile_link(name: &str, address: &str) -> String {
    format!("[{name}]({PROFILE_URL_BASE}/{address})")
}

/// Builds announcements for one collection.
#[derive(Clone, Copy, Debug)]
pub struct Formatter<'a> {
    collection: &'a Collection,
}

impl<'a> Formatter<'a> {
    pub fn new(collection: &'a Collection) -> Self {
        Self { collection }
    }

    /// Formats the sales of a single normalized event.
    pub fn announce(&self, sales: &[Sale]) -> Result<Announcement, FormatError> {
        Ok(Announcement {
            embeds: self.embeds(sales)?,
            post: self.post(sales)?,
        })
    }

    pub fn embeds(&self, sales: &[Sale]) -> Result<Vec<Embed>, FormatError> {
        if sales.is_empty() {
            return Err(FormatError::EmptyInput);
        }
        Ok(sales.iter().map(|sale| self.embed(sale)).collect())
    }

    pub fn embed(&self, sale: &Sale) -> Embed {
        let mut description = format!("Price: {}", price(sale));
        let (title, url) = match &sale.bundle {
            Some(bundle) => {
                description = format!("Bundle Total {description}");
                (format!("Bundle: '{}' Sold", bundle.name), bundle.link.clone())
            }
            None => (
                format!("{} Sold", sale.item_name),
                self.collection.item_url(sale.token_id),
            ),
        };

        let mut fields = Vec::new();
        if let Some(boosts) = sale.boosts.filter(|_| self.collection.is_boosted()) {
            fields.push(EmbedField::new("Boost Total", boosts.total(), false));
            for t in [Trait::Defense, Trait::Finish, Trait::Shooting, Trait::Vision] {
                fields.push(EmbedField::new(t.name(), boosts.get(t), true));
            }
        }
        fields.push(EmbedField::new(
            "Seller",
            profile_link(&sale.seller.name, &sale.seller.address),
            false,
        ));
        fields.push(EmbedField::new(
            "Buyer",
            profile_link(&sale.buyer.name, &sale.buyer.address),
            true,
        ));

        Embed {
            title,
            description,
            url,
            thumbnail: sale.image_url.clone().map(|url| Thumbnail { url }),
            fields,
        }
    }

    /// Single post for the whole trade, built from the first sale.
    pub fn post(&self, sales: &[Sale]) -> Result<String, FormatError> {
        let sale = sales.first().ok_or(FormatError::EmptyInput)?;

        let (name, link) = match &sale.bundle {
            Some(bundle) => (bundle.name.clone(), bundle.link.clone()),
            None => (
                sale.item_name.clone(),
                self.collection.item_url(sale.token_id),
            ),
        };

        let boost_text = match sale.boosts {
            Some(b) if !sale.is_bundled() && self.collection.is_boosted() => format!(
                "{} overall\n👀 {} | 🎯 {}\n💪 {} | 🛡️ {}\n",
                b.total(),
                b.get(Trait::Vision),
                b.get(Trait::Shooting),
                b.get(Trait::Finish),
                b.get(Trait::Defense),
            ),
            _ => String::new(),
        };

        Ok(format!("{name} bought for {}\n{boost_text}{link}", price(sale)))
    }
}
