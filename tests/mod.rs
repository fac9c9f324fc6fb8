//////////////////
// Test modules //
//////////////////

mod state;
mod store;

//////////////////
// Test helpers //
//////////////////


pub mod helpers {
    use crate::generators::TestBlock;
    use std::sync::Arc;
    use utxo_indexer::{
        block::BlockId,
        chain::{ChainId, ChainPolicy},
        state::IndexerState,
        store::IndexerStore,
    };

    pub const CHAIN: ChainId = ChainId(1);

    /// Sets up a new temp dir, deleted when it goes out of scope
    pub fn setup_new_db_dir(prefix: &str) -> anyhow::Result<tempfile::TempDir> {
        let store_dir = tempfile::TempDir::with_prefix(prefix)?;
        if store_dir.path().exists() {
            std::fs::remove_dir_all(store_dir.path())?;
        }
        Ok(store_dir)
    }

    /// Engine over a fresh store with a single mainnet-style chain
    pub fn test_state(store_dir: &tempfile::TempDir) -> anyhow::Result<IndexerState> {
        let store = Arc::new(IndexerStore::new(store_dir.path())?);
        IndexerState::new(store, [ChainPolicy::mainnet(CHAIN)])
    }

    pub fn import(state: &IndexerState, block: &TestBlock) -> anyhow::Result<BlockId> {
        Ok(state.import_block(&block.encode(), &[CHAIN])?)
    }
}
