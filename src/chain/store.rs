use crate::{
    block::BlockId,
    chain::{ChainId, ChainRecord},
};
use speedb::WriteBatch;

pub trait ChainStore {
    /// Add or replace a chain record
    fn put_chain(&self, chain: &ChainRecord) -> anyhow::Result<()>;

    /// Get a chain record
    fn get_chain(&self, chain_id: ChainId) -> anyhow::Result<Option<ChainRecord>>;

    /// Get all known chains
    fn get_chains(&self) -> anyhow::Result<Vec<ChainRecord>>;

    /// Stage the chain's best tip
    fn set_chain_tip_batch(
        &self,
        chain_id: ChainId,
        tip: BlockId,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()>;

    /// Get the chain's best tip
    fn get_chain_tip(&self, chain_id: ChainId) -> anyhow::Result<Option<BlockId>>;
}
