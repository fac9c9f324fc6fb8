//! This module contains the implementations of all store traits for the
//! [IndexerStore]

// traits
pub mod column_families;
pub mod fixed_keys;

// impls
pub mod block_store_impl;
pub mod canonicity_store_impl;
pub mod chain_store_impl;
pub mod column_families_impl;
pub mod tx_store_impl;

use self::fixed_keys::FixedKeys;
use anyhow::{anyhow, Context};
use serde::{de::DeserializeOwned, Serialize};
use speedb::{ColumnFamilyDescriptor, DBCompressionType, WriteBatch, DB};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct IndexerStore {
    pub db_path: PathBuf,
    pub database: DB,
}

impl IndexerStore {
    /// Add the corresponding CF helper to [column_families::ColumnFamilyHelpers]
    const COLUMN_FAMILIES: [&'static str; 14] = [
        // blocks
        "blocks",
        "blocks-hash",
        "blocks-children",
        "blocks-orphans",
        // chains
        "chains",
        // canonicity
        "chain-candidates",
        "canonicity-length",
        // transactions
        "txs",
        "txs-hash",
        "txs-blocks",
        "txouts",
        "txins",
        "txins-unlinked",
        "txins-provenance",
    ];

    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let mut cf_opts = speedb::Options::default();
        cf_opts.set_max_write_buffer_number(16);
        cf_opts.set_compression_type(DBCompressionType::Zstd);

        let mut database_opts = speedb::Options::default();
        database_opts.create_missing_column_families(true);
        database_opts.create_if_missing(true);

        let column_families = Self::COLUMN_FAMILIES
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, cf_opts.clone()));
        let database = DB::open_cf_descriptors(&database_opts, path, column_families)?;
        Ok(Self {
            db_path: PathBuf::from(path),
            database,
        })
    }

    /// Atomically commit a staged batch
    pub fn write_batch(&self, batch: WriteBatch) -> anyhow::Result<()> {
        Ok(self.database.write(batch)?)
    }

    /// Allocate the next value of a persisted sequence (ids start at 1)
    pub(crate) fn next_seq(&self, key: &'static [u8]) -> anyhow::Result<u64> {
        let next = self
            .database
            .get(key)?
            .map(u64_from_be_bytes)
            .transpose()?
            .unwrap_or(1);
        self.database.put(key, (next + 1).to_be_bytes())?;
        Ok(next)
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        cf: &speedb::ColumnFamily,
        key: &[u8],
    ) -> anyhow::Result<Option<T>> {
        Ok(self
            .database
            .get_pinned_cf(cf, key)?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()?)
    }

    pub(crate) fn put_json_batch<T: Serialize>(
        &self,
        cf: &speedb::ColumnFamily,
        key: &[u8],
        value: &T,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        batch.put_cf(cf, key, serde_json::to_vec(value)?);
        Ok(())
    }
}

impl FixedKeys for IndexerStore {}

// key encoding helpers

pub fn u32_be_bytes(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

pub fn u64_be_bytes(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

pub fn u64_from_be_bytes(bytes: impl AsRef<[u8]>) -> anyhow::Result<u64> {
    Ok(u64::from_be_bytes(
        bytes
            .as_ref()
            .try_into()
            .map_err(|_| anyhow!("invalid u64 key bytes"))
            .context("u64 key")?,
    ))
}

/// chain id (BE) ++ block id (BE)
pub fn chain_block_key(chain: u32, block: u64) -> [u8; 12] {
    let mut key = [0; 12];
    key[..4].copy_from_slice(&chain.to_be_bytes());
    key[4..].copy_from_slice(&block.to_be_bytes());
    key
}

/// chain id (BE) ++ height (BE)
pub fn chain_height_key(chain: u32, height: u32) -> [u8; 8] {
    let mut key = [0; 8];
    key[..4].copy_from_slice(&chain.to_be_bytes());
    key[4..].copy_from_slice(&height.to_be_bytes());
    key
}

/// tx id (BE) ++ output position (BE)
pub fn txout_key(tx_id: u64, n: u32) -> [u8; 12] {
    let mut key = [0; 12];
    key[..8].copy_from_slice(&tx_id.to_be_bytes());
    key[8..].copy_from_slice(&n.to_be_bytes());
    key
}

/// block id (BE) ++ txin id (BE)
pub fn provenance_key(block: u64, txin: u64) -> [u8; 16] {
    let mut key = [0; 16];
    key[..8].copy_from_slice(&block.to_be_bytes());
    key[8..].copy_from_slice(&txin.to_be_bytes());
    key
}
