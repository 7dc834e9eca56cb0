mod event;
mod sale;

pub use event::*;
pub use sale::{AttributeSet, BundleRef, Party, Sale, Trait};

/// Item (token) ID within a collection.
pub type TokenId = u64;

/// Position of a sale in chain history.
///
/// Ordered lexicographically: block number first, then the index of the
/// transaction within the block.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord, Hash, Default)]
pub struct SaleInstant {
    block_number: u64,
    tx_index: u64,
}

impl SaleInstant {
    pub fn new(block_number: u64, tx_index: u64) -> Self {
        Self {
            block_number,
            tx_index,
        }
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn tx_index(&self) -> u64 {
        self.tx_index
    }
}

impl std::fmt::Display for SaleInstant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.block_number, self.tx_index)
    }
}
