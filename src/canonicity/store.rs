use crate::{
    block::BlockId,
    canonicity::{Candidate, Canonicity},
    chain::ChainId,
};
use speedb::WriteBatch;

pub trait CanonicityStore {
    /// Stage the candidate row for (chain, block)
    fn put_candidate_batch(
        &self,
        chain: ChainId,
        block: BlockId,
        candidate: &Candidate,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()>;

    /// Get the candidate row for (chain, block)
    fn get_candidate(&self, chain: ChainId, block: BlockId) -> anyhow::Result<Option<Candidate>>;

    /// Stage the best-path block at a height
    fn set_canonical_at_height_batch(
        &self,
        chain: ChainId,
        height: u32,
        block: BlockId,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()>;

    /// Stage removal of the best-path entry at a height
    fn clear_canonical_at_height_batch(&self, chain: ChainId, height: u32, batch: &mut WriteBatch);

    /// Get the best-path block at a height
    fn get_canonical_block_at_height(
        &self,
        chain: ChainId,
        height: u32,
    ) -> anyhow::Result<Option<BlockId>>;

    /// Whether the block is on the chain's current best path
    fn is_in_best_chain(&self, chain: ChainId, block: BlockId) -> anyhow::Result<bool> {
        Ok(self
            .get_candidate(chain, block)?
            .map(|candidate| candidate.canonicity() == Canonicity::Canonical)
            .unwrap_or(false))
    }
}
