use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use std::{path::PathBuf, sync::Arc};
use utxo_indexer::{
    block::{source::FilesystemSource, store::BlockStore},
    chain::{store::ChainStore, ChainId, ChainPolicy},
    constants::BLOCK_REPORTING_FREQ,
    state::{ImportError, IndexerState},
    store::IndexerStore,
};

#[derive(Parser, Debug)]
#[command(name = "utxo-indexer", version, about = "Blockchain ingestion and chain-reorganization engine")]
struct Cli {
    /// Directory containing blk*.dat block files
    #[arg(long)]
    blocks_dir: PathBuf,

    /// Directory for the block database
    #[arg(long, default_value = "./utxo-indexer-db")]
    db_path: PathBuf,

    /// Chain policy to index
    #[arg(long, value_enum, default_value_t = Network::Mainnet)]
    network: Network,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    fn policy(self) -> ChainPolicy {
        match self {
            Self::Mainnet => ChainPolicy::mainnet(ChainId(1)),
            Self::Testnet => ChainPolicy::testnet(ChainId(2)),
            Self::Regtest => ChainPolicy::regtest(ChainId(3)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    stderrlog::new()
        .module(module_path!())
        .module("utxo_indexer")
        .timestamp(stderrlog::Timestamp::Millisecond)
        .verbosity(cli.verbose as usize + 1)
        .init()?;

    let policy = cli.network.policy();
    let chain_id = policy.chain_id;
    info!("Opening block database at {}", cli.db_path.display());

    let store = Arc::new(IndexerStore::new(&cli.db_path)?);
    let state = IndexerState::new(store, [policy])?;
    for chain in state.store.get_chains()? {
        info!("Chain {}: {}", chain.chain_id, chain.name);
    }
    let source = FilesystemSource::new(&cli.blocks_dir)?;

    let mut imported = 0;
    let mut rejected = 0;
    let mut foreign = 0;
    for block in source {
        let block = block?;
        let chains = state.chains_matching_magic(block.magic);
        if chains.is_empty() {
            foreign += 1;
            continue;
        }
        match state.import_block(&block.bytes, &chains) {
            Ok(_) => {
                imported += 1;
                if imported % BLOCK_REPORTING_FREQ == 0 {
                    info!("Imported {imported} blocks");
                }
            }
            Err(
                e @ (ImportError::Malformed(_)
                | ImportError::InvalidMerkleRoot { .. }
                | ImportError::ValueOverflow(_)),
            ) => {
                warn!("Rejecting block: {e}");
                rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("Done: {imported} imported, {rejected} rejected, {foreign} foreign");
    if let Some(tip) = state.get_chain_tip(chain_id)? {
        let block = state
            .store
            .get_block(tip)?
            .context("chain tip block exists")?;
        info!("Chain {chain_id} tip: {}", block.summary());
    }
    Ok(())
}
