use crate::{
    constants::GENESIS_PREV_HASH,
    stats::Cumulative,
    tx::{TxHash, TxId},
};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

pub mod parser;
pub mod source;
pub mod store;

pub type BlockId = u64;

#[derive(Default, Hash, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    /// Parent-hash sentinel declared by genesis blocks
    pub const GENESIS_PREV: Self = Self(GENESIS_PREV_HASH);
}

/// Parsed block header fields, stored verbatim on the block record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_hash: BlockHash,
    pub merkle_root: TxHash,
    pub time: i64,
    pub bits: u32,
    pub nonce: u32,
}

/// A block as persisted by the indexer
///
/// Header content is append-only; `height`, `prev_block_id`,
/// `search_block_id`, `value_in` and `cumulative` are revised as ancestry
/// resolves or inputs link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub hash: BlockHash,
    pub header: BlockHeader,
    pub num_tx: u32,
    pub tx_ids: Vec<TxId>,

    /// Satoshis consumed by this block's transactions, `None` while any
    /// non-generation input is unlinked
    pub value_in: Option<u64>,
    pub value_out: u64,
    pub value_destroyed: u64,

    /// `None` until connected to a known genesis
    pub height: Option<u32>,
    /// `None` means the parent block has not been seen (orphan)
    pub prev_block_id: Option<BlockId>,
    /// Ancestor skip pointer, see [crate::state::ancestry]
    pub search_block_id: Option<BlockId>,

    /// Cumulative statistics, present once `height` is known
    pub cumulative: Option<Cumulative>,
}

impl BlockRecord {
    pub fn is_genesis(&self) -> bool {
        self.header.prev_hash == BlockHash::GENESIS_PREV
    }

    pub fn summary(&self) -> String {
        match self.height {
            Some(height) => format!("{} (height {height})", self.hash),
            None => format!("{} (unconnected)", self.hash),
        }
    }
}

impl Display for BlockHash {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Debug for BlockHash {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "BlockHash({self})")
    }
}
