//! NFT sales announcer.
//!
//! # Overview
//!
//! Polls the marketplace for completed sales of a collection and announces
//! each new one to a chat channel (one embed per item) and a social
//! network (one post per trade).
//!
//! Use [`poll::Poller`] to run the loop for one [`collection::Collection`].
//! It is generic over the marketplace ([`feed::SalesFeed`]), the chat and
//! social sinks ([`publish::ChatSink`], [`publish::SocialSink`]) and the
//! watermark storage ([`watermark::WatermarkStore`]).
//!
//! The pure pieces can be used on their own:
//!
//! * [`normalize::Normalizer`] turns a raw event into sales, one per bundled
//!   item, attaching boosts from a [`boosts::BoostTable`].
//!
//! * [`format::Formatter`] turns the sales of one event into chat embeds and
//!   a social post.
//!
//! * [`watermark::Watermark`] decides which sales were already announced.
//!
//! # Limitations/follow-ups
//!
//! * Only the first page of the feed is read each cycle. A burst of more
//!   sales than the page limit between two cycles is announced partially.
//!
//! * Chat delivery is not retried within a cycle; the next cycle picks up
//!   from the last announced sale.
//!
//! * Freshness is strict on `(block, transaction index)`. Several items
//!   bought as separate events within one transaction share that locator,
//!   so only the first of them is announced.
//!
//! # Testing
//!
//! [`testing`] module provides in-memory collaborators and a raw event
//! builder to drive full poll cycles.

pub mod boosts;
pub mod collection;
pub mod error;
pub mod feed;
pub mod format;
pub mod normalize;
pub mod num;
pub mod oauth;
pub mod poll;
pub mod publish;
pub mod testing;
pub mod types;
pub mod watermark;

pub use collection::{Collection, CollectionKind};
