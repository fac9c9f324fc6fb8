use super::{column_families::ColumnFamilyHelpers, fixed_keys::FixedKeys, IndexerStore};
use crate::{
    block::{store::BlockStore, BlockHash, BlockId, BlockRecord},
    store::{u64_be_bytes, u64_from_be_bytes},
};
use log::trace;
use speedb::WriteBatch;

impl BlockStore for IndexerStore {
    fn next_block_id(&self) -> anyhow::Result<BlockId> {
        self.next_seq(Self::NEXT_BLOCK_ID_KEY)
    }

    fn put_block_batch(
        &self,
        id: BlockId,
        block: &BlockRecord,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!("Staging block {id}: {}", block.summary());
        self.put_json_batch(self.blocks_cf(), &u64_be_bytes(id), block, batch)?;
        batch.put_cf(self.blocks_hash_cf(), block.hash.0, u64_be_bytes(id));
        Ok(())
    }

    fn get_block(&self, id: BlockId) -> anyhow::Result<Option<BlockRecord>> {
        trace!("Getting block {id}");
        self.get_json(self.blocks_cf(), &u64_be_bytes(id))
    }

    fn get_block_id(&self, hash: &BlockHash) -> anyhow::Result<Option<BlockId>> {
        trace!("Getting block id for {hash}");
        self.database
            .get_pinned_cf(self.blocks_hash_cf(), hash.0)?
            .map(u64_from_be_bytes)
            .transpose()
    }

    fn get_block_by_hash(
        &self,
        hash: &BlockHash,
    ) -> anyhow::Result<Option<(BlockId, BlockRecord)>> {
        trace!("Getting block with hash {hash}");
        match self.get_block_id(hash)? {
            None => Ok(None),
            Some(id) => Ok(self.get_block(id)?.map(|block| (id, block))),
        }
    }

    fn put_block_children_batch(
        &self,
        parent: BlockId,
        children: &[BlockId],
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!("Staging children of block {parent}: {children:?}");
        self.put_json_batch(
            self.blocks_children_cf(),
            &u64_be_bytes(parent),
            &children,
            batch,
        )
    }

    fn get_block_children(&self, parent: BlockId) -> anyhow::Result<Vec<BlockId>> {
        trace!("Getting children of block {parent}");
        Ok(self
            .get_json(self.blocks_children_cf(), &u64_be_bytes(parent))?
            .unwrap_or_default())
    }

    fn put_orphans_waiting_batch(
        &self,
        awaited_parent: &BlockHash,
        orphans: &[BlockId],
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!("Staging orphans waiting on {awaited_parent}: {orphans:?}");
        if orphans.is_empty() {
            batch.delete_cf(self.blocks_orphans_cf(), awaited_parent.0);
            return Ok(());
        }
        self.put_json_batch(self.blocks_orphans_cf(), &awaited_parent.0, &orphans, batch)
    }

    fn get_orphans_waiting(&self, awaited_parent: &BlockHash) -> anyhow::Result<Vec<BlockId>> {
        trace!("Getting orphans waiting on {awaited_parent}");
        Ok(self
            .get_json(self.blocks_orphans_cf(), &awaited_parent.0)?
            .unwrap_or_default())
    }
}
