use serde::{Deserialize, Serialize};

pub mod store;

/// Best-chain membership of a block, per chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Canonicity {
    /// On the chain's current best path
    Canonical,
    /// Known to the chain but not currently best
    Orphaned,
}

/// One row per (chain, block) pair ever offered to a chain's policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub in_longest: bool,
    /// Denormalized copy of the block's height, `None` while unconnected
    pub height: Option<u32>,
}

impl Candidate {
    pub fn canonicity(&self) -> Canonicity {
        if self.in_longest {
            Canonicity::Canonical
        } else {
            Canonicity::Orphaned
        }
    }
}
