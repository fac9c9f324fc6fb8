use super::{column_families::ColumnFamilyHelpers, IndexerStore};
use crate::{
    block::BlockId,
    canonicity::{store::CanonicityStore, Candidate},
    chain::ChainId,
    store::{chain_block_key, chain_height_key, u64_be_bytes, u64_from_be_bytes},
};
use log::trace;
use speedb::WriteBatch;

impl CanonicityStore for IndexerStore {
    fn put_candidate_batch(
        &self,
        chain: ChainId,
        block: BlockId,
        candidate: &Candidate,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!(
            "Staging candidate (chain {chain}, block {block}): in_longest {}",
            candidate.in_longest
        );
        self.put_json_batch(
            self.chain_candidates_cf(),
            &chain_block_key(chain.0, block),
            candidate,
            batch,
        )
    }

    fn get_candidate(&self, chain: ChainId, block: BlockId) -> anyhow::Result<Option<Candidate>> {
        trace!("Getting candidate (chain {chain}, block {block})");
        self.get_json(self.chain_candidates_cf(), &chain_block_key(chain.0, block))
    }

    fn set_canonical_at_height_batch(
        &self,
        chain: ChainId,
        height: u32,
        block: BlockId,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!("Staging canonical block at (chain {chain}, height {height}): {block}");
        batch.put_cf(
            self.canonicity_length_cf(),
            chain_height_key(chain.0, height),
            u64_be_bytes(block),
        );
        Ok(())
    }

    fn clear_canonical_at_height_batch(&self, chain: ChainId, height: u32, batch: &mut WriteBatch) {
        trace!("Staging removal of canonical block at (chain {chain}, height {height})");
        batch.delete_cf(self.canonicity_length_cf(), chain_height_key(chain.0, height));
    }

    fn get_canonical_block_at_height(
        &self,
        chain: ChainId,
        height: u32,
    ) -> anyhow::Result<Option<BlockId>> {
        trace!("Getting canonical block at (chain {chain}, height {height})");
        self.database
            .get_pinned_cf(self.canonicity_length_cf(), chain_height_key(chain.0, height))?
            .map(u64_from_be_bytes)
            .transpose()
    }
}
