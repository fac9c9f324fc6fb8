use crate::{
    block::{BlockHash, BlockId},
    constants::*,
    tx::{ScriptResolver, StandardScriptResolver, TxHash},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

pub mod store;

#[derive(Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize, Deserialize)]
pub struct ChainId(pub u32);

impl Display for ChainId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named validation policy/currency, as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub chain_id: ChainId,
    pub name: String,
    pub magic: [u8; 4],
    pub address_version: u8,
    pub decimals: u8,
    pub genesis_prev_hash: BlockHash,
    /// Current best tip, `None` until a genesis block is accepted
    pub last_block_id: Option<BlockId>,
}

/// Computes a block's identity hash from its serialized header
pub trait BlockHasher: Send + Sync {
    fn block_hash(&self, header_bytes: &[u8]) -> BlockHash;
}

/// Computes a transaction's identity hash from its serialized bytes
pub trait TxHasher: Send + Sync {
    fn tx_hash(&self, tx_bytes: &[u8]) -> TxHash;
}

/// Combines transaction hashes into the header's declared merkle root
pub trait MerkleCombiner: Send + Sync {
    fn merkle_root(&self, tx_hashes: &[TxHash]) -> TxHash;
}

/// Double SHA-256: the default hash for block identity, tx identity, and
/// merkle combination on bitcoin-family chains
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256d;

impl Sha256d {
    pub fn digest(bytes: &[u8]) -> [u8; 32] {
        Sha256::digest(Sha256::digest(bytes)).into()
    }
}

impl BlockHasher for Sha256d {
    fn block_hash(&self, header_bytes: &[u8]) -> BlockHash {
        BlockHash(Self::digest(header_bytes))
    }
}

impl TxHasher for Sha256d {
    fn tx_hash(&self, tx_bytes: &[u8]) -> TxHash {
        TxHash(Self::digest(tx_bytes))
    }
}

impl MerkleCombiner for Sha256d {
    /// Classic pairwise tree, duplicating the last element on odd levels
    fn merkle_root(&self, tx_hashes: &[TxHash]) -> TxHash {
        let mut level: Vec<[u8; 32]> = tx_hashes.iter().map(|h| h.0).collect();
        if level.is_empty() {
            return TxHash::default();
        }
        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                let mut concat = [0; 64];
                concat[..32].copy_from_slice(&pair[0]);
                concat[32..].copy_from_slice(pair.last().unwrap_or(&pair[0]));
                next.push(Self::digest(&concat));
            }
            level = next;
        }
        TxHash(level[0])
    }
}

/// Chain-specific behaviors composed from one strategy object per axis
#[derive(Clone)]
pub struct ChainPolicy {
    pub chain_id: ChainId,
    pub name: String,
    pub magic: [u8; 4],
    pub address_version: u8,
    pub decimals: u8,
    pub genesis_prev_hash: BlockHash,
    pub block_hasher: Arc<dyn BlockHasher>,
    pub tx_hasher: Arc<dyn TxHasher>,
    pub merkle: Arc<dyn MerkleCombiner>,
    pub scripts: Arc<dyn ScriptResolver>,
}

impl ChainPolicy {
    /// SHA-256d everywhere, standard scripts, zero-hash genesis parent
    pub fn bitcoin_like(chain_id: ChainId, name: &str, magic: [u8; 4]) -> Self {
        Self {
            chain_id,
            name: name.to_string(),
            magic,
            address_version: MAINNET_ADDRESS_VERSION,
            decimals: 8,
            genesis_prev_hash: BlockHash::GENESIS_PREV,
            block_hasher: Arc::new(Sha256d),
            tx_hasher: Arc::new(Sha256d),
            merkle: Arc::new(Sha256d),
            scripts: Arc::new(StandardScriptResolver),
        }
    }

    pub fn mainnet(chain_id: ChainId) -> Self {
        Self::bitcoin_like(chain_id, "Mainnet", MAINNET_MAGIC)
    }

    pub fn testnet(chain_id: ChainId) -> Self {
        Self {
            address_version: TESTNET_ADDRESS_VERSION,
            ..Self::bitcoin_like(chain_id, "Testnet", TESTNET_MAGIC)
        }
    }

    pub fn regtest(chain_id: ChainId) -> Self {
        Self {
            address_version: TESTNET_ADDRESS_VERSION,
            ..Self::bitcoin_like(chain_id, "Regtest", REGTEST_MAGIC)
        }
    }

    pub fn record(&self) -> ChainRecord {
        ChainRecord {
            chain_id: self.chain_id,
            name: self.name.clone(),
            magic: self.magic,
            address_version: self.address_version,
            decimals: self.decimals,
            genesis_prev_hash: self.genesis_prev_hash,
            last_block_id: None,
        }
    }
}

impl std::fmt::Debug for ChainPolicy {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("ChainPolicy")
            .field("chain_id", &self.chain_id)
            .field("name", &self.name)
            .field("magic", &hex::encode(self.magic))
            .finish()
    }
}
