use super::{column_families::ColumnFamilyHelpers, IndexerStore};
use crate::{
    block::BlockId,
    chain::{store::ChainStore, ChainId, ChainRecord},
    store::u32_be_bytes,
};
use anyhow::Context;
use log::trace;
use speedb::{IteratorMode, WriteBatch};

impl ChainStore for IndexerStore {
    fn put_chain(&self, chain: &ChainRecord) -> anyhow::Result<()> {
        trace!("Adding chain {} ({})", chain.chain_id, chain.name);
        self.database.put_cf(
            self.chains_cf(),
            u32_be_bytes(chain.chain_id.0),
            serde_json::to_vec(chain)?,
        )?;
        Ok(())
    }

    fn get_chain(&self, chain_id: ChainId) -> anyhow::Result<Option<ChainRecord>> {
        trace!("Getting chain {chain_id}");
        self.get_json(self.chains_cf(), &u32_be_bytes(chain_id.0))
    }

    fn get_chains(&self) -> anyhow::Result<Vec<ChainRecord>> {
        trace!("Getting all chains");
        let mut chains = vec![];
        for entry in self.database.iterator_cf(self.chains_cf(), IteratorMode::Start) {
            let (_, value) = entry?;
            chains.push(serde_json::from_slice(&value)?);
        }
        Ok(chains)
    }

    fn set_chain_tip_batch(
        &self,
        chain_id: ChainId,
        tip: BlockId,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        trace!("Staging tip of chain {chain_id}: block {tip}");
        let mut chain = self
            .get_chain(chain_id)?
            .with_context(|| format!("unknown chain {chain_id}"))?;
        chain.last_block_id = Some(tip);
        self.put_json_batch(self.chains_cf(), &u32_be_bytes(chain_id.0), &chain, batch)
    }

    fn get_chain_tip(&self, chain_id: ChainId) -> anyhow::Result<Option<BlockId>> {
        trace!("Getting tip of chain {chain_id}");
        Ok(self.get_chain(chain_id)?.and_then(|chain| chain.last_block_id))
    }
}
