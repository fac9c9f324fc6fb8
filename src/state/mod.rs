//! The ingestion engine: imports raw blocks, links transactions, adopts
//! orphans, propagates cumulative statistics, and resolves each chain's best
//! tip.
//!
//! Per-block import is staged in a single [WriteBatch] and committed
//! atomically. Propagation down already-stored descendants commits one batch
//! per visited block, which keeps the cascade resumable: every block's
//! snapshot is a pure function of its parent's persisted snapshot.

pub mod ancestry;

use crate::{
    block::{
        parser::{parse_block, ParseError, RawTx},
        store::BlockStore,
        BlockHash, BlockId, BlockRecord,
    },
    canonicity::{store::CanonicityStore, Candidate, Canonicity},
    chain::{store::ChainStore, ChainId, ChainPolicy},
    stats::{genesis_cumulative, next_cumulative, ChainWork, Cumulative, OwnValues},
    store::IndexerStore,
    tx::{store::TxStore, OutPoint, TxHash, TxId, TxInId, TxInRecord, TxOutRecord, TxRecord},
};
use ancestry::{get_block_id_at_height, is_descended_from, search_height, AncestryCache};
use anyhow::Context;
use log::{debug, info, trace};
use speedb::WriteBatch;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, PoisonError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed block: {0}")]
    Malformed(#[from] ParseError),

    #[error("merkle root mismatch: header declares {expected}, transactions hash to {computed}")]
    InvalidMerkleRoot { expected: TxHash, computed: TxHash },

    #[error("no usable chain policy among candidates")]
    NoPolicy,

    #[error("value overflow in tx {0}")]
    ValueOverflow(TxHash),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct IndexerState {
    pub store: Arc<IndexerStore>,
    policies: HashMap<ChainId, ChainPolicy>,
    /// Serializes imports: id allocation and the duplicate check assume a
    /// single importer
    ingest_lock: Mutex<()>,
}

impl IndexerState {
    /// Open the engine over a store, registering any chains not yet persisted
    pub fn new(
        store: Arc<IndexerStore>,
        policies: impl IntoIterator<Item = ChainPolicy>,
    ) -> anyhow::Result<Self> {
        let mut map = HashMap::new();
        for policy in policies {
            if store.get_chain(policy.chain_id)?.is_none() {
                store.put_chain(&policy.record())?;
            }
            map.insert(policy.chain_id, policy);
        }
        Ok(Self {
            store,
            policies: map,
            ingest_lock: Mutex::new(()),
        })
    }

    /// Chains whose protocol magic matches a raw block's framing
    pub fn chains_matching_magic(&self, magic: [u8; 4]) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self
            .policies
            .values()
            .filter(|policy| policy.magic == magic)
            .map(|policy| policy.chain_id)
            .collect();
        chains.sort();
        chains
    }

    /// Import one raw block and offer it to the candidate chains
    ///
    /// Idempotent: re-importing known bytes returns the existing block id
    /// without duplicating any row, and re-runs the block's finalization so
    /// an import interrupted after its commit is repaired by re-ingestion.
    pub fn import_block(
        &self,
        bytes: &[u8],
        candidate_chains: &[ChainId],
    ) -> Result<BlockId, ImportError> {
        let _guard = self
            .ingest_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let policy = candidate_chains
            .first()
            .and_then(|chain| self.policies.get(chain))
            .ok_or(ImportError::NoPolicy)?;

        let raw = parse_block(bytes)?;
        let hash = policy.block_hasher.block_hash(&raw.header_bytes);

        // duplicate import: redo finalization and re-offer, a no-op when the
        // prior import ran to completion
        if let Some(existing) = self.store.get_block_id(&hash)? {
            debug!("Block {hash} already imported as {existing}");
            self.refresh_block(existing)?;
            let (top, _) = self.adopt_descendants(existing)?;
            for chain in candidate_chains {
                self.offer_block_to_chain(*chain, existing)?;
                if top != existing {
                    self.offer_block_to_chain(*chain, top)?;
                }
            }
            return Ok(existing);
        }

        let tx_hashes: Vec<TxHash> = raw
            .txs
            .iter()
            .map(|tx| policy.tx_hasher.tx_hash(&tx.raw))
            .collect();
        let computed = policy.merkle.merkle_root(&tx_hashes);
        if computed != raw.header.merkle_root {
            return Err(ImportError::InvalidMerkleRoot {
                expected: raw.header.merkle_root,
                computed,
            });
        }

        let block_id = self.store.next_block_id()?;
        let mut ctx = ImportCtx::new(&self.store);

        let mut tx_ids = Vec::with_capacity(raw.txs.len());
        let mut new_txs = vec![];
        for (index, raw_tx) in raw.txs.iter().enumerate() {
            let (tx_id, is_new) =
                self.stage_transaction(&mut ctx, policy, raw_tx, tx_hashes[index], index)?;
            ctx.add_tx_block(tx_id, block_id)?;
            if is_new {
                new_txs.push((tx_hashes[index], tx_id));
            }
            tx_ids.push(tx_id);
        }
        self.heal_unlinked(&mut ctx, block_id, &new_txs)?;

        // parent linkage
        let is_genesis = raw.header.prev_hash == policy.genesis_prev_hash;
        let parent = if is_genesis {
            None
        } else {
            self.store.get_block_by_hash(&raw.header.prev_hash)?
        };
        let (height, prev_block_id) = match (&parent, is_genesis) {
            (_, true) => (Some(0), None),
            (Some((parent_id, parent_block)), false) => {
                (parent_block.height.map(|h| h + 1), Some(*parent_id))
            }
            (None, false) => (None, None),
        };

        let mut cache = AncestryCache::default();
        let search_block_id = match (height, prev_block_id) {
            (Some(h), Some(parent_id)) => match search_height(h) {
                Some(target) => get_block_id_at_height(&self.store, &mut cache, target, parent_id)?,
                None => None,
            },
            _ => None,
        };

        // own values from the staged transactions
        let mut value_out = 0u64;
        let mut value_destroyed = 0u64;
        let mut value_in = Some(0u64);
        for tx_id in &tx_ids {
            let tx = ctx.get_tx(*tx_id)?.context("staged tx exists")?;
            value_out = value_out
                .checked_add(tx.value_out)
                .ok_or(ImportError::ValueOverflow(tx.hash))?;
            value_destroyed = value_destroyed
                .checked_add(tx.value_destroyed)
                .ok_or(ImportError::ValueOverflow(tx.hash))?;
            value_in = match (value_in, tx.value_in) {
                (Some(total), Some(v)) => Some(
                    total
                        .checked_add(v)
                        .ok_or(ImportError::ValueOverflow(tx.hash))?,
                ),
                _ => None,
            };
        }
        let has_spend = raw
            .txs
            .iter()
            .flat_map(|tx| &tx.inputs)
            .any(|input| !input.is_generation());

        // destroyed coin-age needs input provenance, resolved post-commit
        let own = OwnValues {
            time: raw.header.time,
            bits: raw.header.bits,
            value_in,
            value_out,
            value_destroyed,
            ss_destroyed: if has_spend { None } else { Some(0) },
        };
        let cumulative = if is_genesis {
            Some(genesis_cumulative(&own))
        } else {
            parent.as_ref().and_then(|(_, parent_block)| {
                parent_block
                    .cumulative
                    .as_ref()
                    .map(|pc| next_cumulative(pc, parent_block.header.time, &own))
            })
        };

        let record = BlockRecord {
            hash,
            header: raw.header.clone(),
            num_tx: raw.txs.len() as u32,
            tx_ids,
            value_in,
            value_out,
            value_destroyed,
            height,
            prev_block_id,
            search_block_id,
            cumulative,
        };
        debug!("Importing block {}", record.summary());
        ctx.put_block(block_id, record)?;

        if let Some(parent_id) = prev_block_id {
            let mut children = self.store.get_block_children(parent_id)?;
            if !children.contains(&block_id) {
                children.push(block_id);
            }
            self.store
                .put_block_children_batch(parent_id, &children, &mut ctx.batch)?;
        } else if !is_genesis {
            // orphan: register for adoption once the parent arrives
            let mut waiting = self.store.get_orphans_waiting(&raw.header.prev_hash)?;
            if !waiting.contains(&block_id) {
                waiting.push(block_id);
            }
            self.store
                .put_orphans_waiting_batch(&raw.header.prev_hash, &waiting, &mut ctx.batch)?;
        }

        // connect any orphans that were waiting on this block
        let adopted = self.store.get_orphans_waiting(&hash)?;
        if !adopted.is_empty() {
            info!("Block {hash} adopts {} waiting orphan(s)", adopted.len());
            for orphan in &adopted {
                let mut orphan_block = ctx
                    .get_block(*orphan)?
                    .with_context(|| format!("waiting orphan {orphan} exists"))?;
                orphan_block.prev_block_id = Some(block_id);
                ctx.put_block(*orphan, orphan_block)?;
            }
            self.store
                .put_block_children_batch(block_id, &adopted, &mut ctx.batch)?;
            self.store
                .put_orphans_waiting_batch(&hash, &[], &mut ctx.batch)?;
        }

        let healed = ctx.healed_blocks.clone();
        self.store.write_batch(ctx.batch)?;

        // finalize destroyed coin-age, cascade to descendants, resolve tips
        self.refresh_block(block_id)?;
        let (top, _) = self.adopt_descendants(block_id)?;
        for chain in candidate_chains {
            self.offer_block_to_chain(*chain, block_id)?;
            if top != block_id {
                self.offer_block_to_chain(*chain, top)?;
            }
        }
        for block in healed {
            self.refresh_and_cascade(block)?;
        }
        Ok(block_id)
    }

    /// Stage one transaction, reusing an already-stored one by hash
    fn stage_transaction(
        &self,
        ctx: &mut ImportCtx,
        policy: &ChainPolicy,
        raw: &RawTx,
        hash: TxHash,
        index: usize,
    ) -> Result<(TxId, bool), ImportError> {
        if let Some(tx_id) = ctx.get_tx_id(&hash)? {
            // re-check linkage: new information may have arrived since
            let mut tx = ctx.get_tx(tx_id)?.context("indexed tx exists")?;
            let value_in = Self::tx_value_in(ctx, &tx)?;
            if tx.value_in != value_in {
                tx.value_in = value_in;
                ctx.put_tx(tx_id, tx)?;
            }
            return Ok((tx_id, false));
        }

        let tx_id = self.store.next_tx_id()?;
        let is_coinbase = index == 0 && raw.inputs.iter().all(|input| input.is_generation());

        let mut value_out = 0u64;
        let mut value_destroyed = 0u64;
        for (n, output) in raw.outputs.iter().enumerate() {
            let resolved = policy.scripts.resolve_owner(&output.script_pubkey);
            let txout = TxOutRecord {
                value: output.value,
                owner: resolved.owner,
            };
            value_out = value_out
                .checked_add(txout.value)
                .ok_or(ImportError::ValueOverflow(hash))?;
            if txout.is_burn() {
                value_destroyed = value_destroyed
                    .checked_add(txout.value)
                    .ok_or(ImportError::ValueOverflow(hash))?;
            }
            ctx.put_txout(tx_id, n as u32, txout)?;
        }

        let mut txin_ids = Vec::with_capacity(raw.inputs.len());
        for (i, input) in raw.inputs.iter().enumerate() {
            let txin_id = self.store.next_txin_id()?;
            let prevout = if input.is_generation() {
                None
            } else {
                match ctx.get_tx_id(&input.prevout_hash)? {
                    Some(prev_tx) => {
                        ctx.get_txout(prev_tx, input.prevout_n)?.map(|_| OutPoint {
                            tx_id: prev_tx,
                            n: input.prevout_n,
                        })
                    }
                    None => None,
                }
            };
            if prevout.is_none() && !input.is_generation() {
                trace!("Unlinked input {txin_id} awaiting tx {}", input.prevout_hash);
                let mut waiting = ctx.get_unlinked(&input.prevout_hash)?;
                waiting.push(txin_id);
                ctx.put_unlinked(&input.prevout_hash, waiting)?;
            }
            ctx.put_txin(
                txin_id,
                TxInRecord {
                    tx_id,
                    index: i as u32,
                    prevout_hash: input.prevout_hash,
                    prevout_n: input.prevout_n,
                    prevout,
                },
            )?;
            txin_ids.push(txin_id);
        }

        let mut tx = TxRecord {
            hash,
            version: raw.version,
            locktime: raw.locktime,
            num_in: raw.inputs.len() as u32,
            num_out: raw.outputs.len() as u32,
            txin_ids,
            is_coinbase,
            value_in: None,
            value_out,
            value_destroyed,
        };
        tx.value_in = Self::tx_value_in(ctx, &tx)?;
        ctx.put_tx(tx_id, tx)?;
        Ok((tx_id, true))
    }

    /// Total satoshis consumed by a transaction's linked inputs
    ///
    /// `None` while any non-generation input is unlinked; generation inputs
    /// definitionally consume nothing.
    fn tx_value_in(ctx: &ImportCtx, tx: &TxRecord) -> anyhow::Result<Option<u64>> {
        if tx.is_coinbase {
            return Ok(Some(0));
        }
        let mut total: u64 = 0;
        for txin_id in &tx.txin_ids {
            let txin = ctx.get_txin(*txin_id)?.context("indexed txin exists")?;
            if txin.is_generation() {
                continue;
            }
            match txin.prevout {
                None => return Ok(None),
                Some(prevout) => {
                    let value = ctx
                        .get_txout(prevout.tx_id, prevout.n)?
                        .context("linked prevout exists")?
                        .value;
                    total = total.checked_add(value).context("input value overflow")?;
                }
            }
        }
        Ok(Some(total))
    }

    /// Link inputs that were waiting on the transactions just staged
    fn heal_unlinked(
        &self,
        ctx: &mut ImportCtx,
        importing: BlockId,
        new_txs: &[(TxHash, TxId)],
    ) -> anyhow::Result<()> {
        for (hash, tx_id) in new_txs {
            let waiting = ctx.get_unlinked(hash)?;
            if waiting.is_empty() {
                continue;
            }
            let mut remaining = vec![];
            let mut spenders = vec![];
            for txin_id in waiting {
                let mut txin = ctx.get_txin(txin_id)?.context("unlinked txin exists")?;
                match ctx.get_txout(*tx_id, txin.prevout_n)? {
                    Some(_) => {
                        txin.prevout = Some(OutPoint {
                            tx_id: *tx_id,
                            n: txin.prevout_n,
                        });
                        let spender = txin.tx_id;
                        ctx.put_txin(txin_id, txin)?;
                        if !spenders.contains(&spender) {
                            spenders.push(spender);
                        }
                    }
                    // references an output position the tx does not have
                    None => remaining.push(txin_id),
                }
            }
            ctx.put_unlinked(hash, remaining)?;

            for spender in spenders {
                let mut tx = ctx.get_tx(spender)?.context("spending tx exists")?;
                let value_in = Self::tx_value_in(ctx, &tx)?;
                if tx.value_in == value_in {
                    continue;
                }
                trace!("Healed inputs of tx {spender}: value_in {value_in:?}");
                tx.value_in = value_in;
                ctx.put_tx(spender, tx)?;
                if value_in.is_none() {
                    continue;
                }
                for block in ctx.get_tx_blocks(spender)? {
                    if block == importing {
                        continue;
                    }
                    // the containing block's stats are finalized post-commit
                    let Some(mut record) = ctx.get_block(block)? else {
                        continue;
                    };
                    record.value_in = Self::block_value_in(ctx, &record)?;
                    ctx.put_block(block, record)?;
                    if !ctx.healed_blocks.contains(&block) {
                        ctx.healed_blocks.push(block);
                    }
                }
            }
        }
        Ok(())
    }

    fn block_value_in(ctx: &ImportCtx, block: &BlockRecord) -> anyhow::Result<Option<u64>> {
        let mut total = 0u64;
        for tx_id in &block.tx_ids {
            match ctx.get_tx(*tx_id)?.context("block tx exists")?.value_in {
                Some(value) => total = total.checked_add(value).context("block value overflow")?,
                None => return Ok(None),
            }
        }
        Ok(Some(total))
    }

    /// Recompute a committed block's derived values and persist them
    fn refresh_block(&self, id: BlockId) -> anyhow::Result<()> {
        let mut cache = AncestryCache::default();
        let mut block = self
            .store
            .get_block(id)?
            .with_context(|| format!("block {id} exists"))?;
        let parent = match block.prev_block_id {
            Some(parent_id) => Some((
                parent_id,
                self.store
                    .get_block(parent_id)?
                    .with_context(|| format!("parent {parent_id} exists"))?,
            )),
            None => None,
        };
        let mut batch = WriteBatch::default();
        self.recompute_block(
            &mut cache,
            id,
            &mut block,
            parent.as_ref().map(|(pid, record)| (*pid, record)),
            &mut batch,
        )?;
        self.store.put_block_batch(id, &block, &mut batch)?;
        self.store.write_batch(batch)
    }

    /// Re-derive a block's mutable columns from its parent's snapshot and its
    /// stored transactions
    ///
    /// Deterministic and idempotent: recomputing an already-correct block
    /// yields identical values.
    fn recompute_block(
        &self,
        cache: &mut AncestryCache,
        id: BlockId,
        block: &mut BlockRecord,
        parent: Option<(BlockId, &BlockRecord)>,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        if block.is_genesis() {
            block.height = Some(0);
        } else if let Some((parent_id, parent_block)) = parent {
            block.prev_block_id = Some(parent_id);
            block.height = parent_block.height.map(|h| h + 1);
        }

        let mut value_out = 0u64;
        let mut value_destroyed = 0u64;
        let mut value_in = Some(0u64);
        for tx_id in &block.tx_ids {
            let tx = self
                .store
                .get_tx(*tx_id)?
                .with_context(|| format!("tx {tx_id} exists"))?;
            value_out = value_out
                .checked_add(tx.value_out)
                .with_context(|| format!("value overflow in block {id}"))?;
            value_destroyed = value_destroyed
                .checked_add(tx.value_destroyed)
                .with_context(|| format!("value overflow in block {id}"))?;
            value_in = match (value_in, tx.value_in) {
                (Some(total), Some(v)) => Some(
                    total
                        .checked_add(v)
                        .with_context(|| format!("value overflow in block {id}"))?,
                ),
                _ => None,
            };
        }
        block.value_in = value_in;
        block.value_out = value_out;
        block.value_destroyed = value_destroyed;

        if block.search_block_id.is_none() {
            if let (Some(height), Some(parent_id)) = (block.height, block.prev_block_id) {
                if let Some(target) = search_height(height) {
                    block.search_block_id =
                        get_block_id_at_height(&self.store, cache, target, parent_id)?;
                }
            }
        }

        let ss_destroyed = self.compute_ss_destroyed(cache, id, block, batch)?;
        let own = OwnValues {
            time: block.header.time,
            bits: block.header.bits,
            value_in,
            value_out,
            value_destroyed,
            ss_destroyed,
        };
        block.cumulative = if block.is_genesis() {
            Some(genesis_cumulative(&own))
        } else {
            parent.and_then(|(_, parent_block)| {
                parent_block
                    .cumulative
                    .as_ref()
                    .map(|pc| next_cumulative(pc, parent_block.header.time, &own))
            })
        };
        cache.prime(id, block.height, block.prev_block_id, block.search_block_id);
        Ok(())
    }

    /// Destroyed coin-age: sum over linked inputs of prevout value times the
    /// age of the output's origin block
    ///
    /// `None` while any input is unlinked or its origin block cannot yet be
    /// placed on this block's ancestor path. Resolved origins are persisted
    /// as provenance rows so later passes skip the ancestry search.
    fn compute_ss_destroyed(
        &self,
        cache: &mut AncestryCache,
        id: BlockId,
        block: &BlockRecord,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<Option<i128>> {
        if block.value_in.is_none() {
            return Ok(None);
        }
        let known: HashMap<_, _> = self.store.get_block_provenance(id)?.into_iter().collect();
        let anchor = block.prev_block_id;
        let mut total = 0i128;
        for tx_id in &block.tx_ids {
            let tx = self
                .store
                .get_tx(*tx_id)?
                .with_context(|| format!("tx {tx_id} exists"))?;
            for txin_id in &tx.txin_ids {
                let txin = self
                    .store
                    .get_txin(*txin_id)?
                    .with_context(|| format!("txin {txin_id} exists"))?;
                if txin.is_generation() {
                    continue;
                }
                let Some(prevout) = txin.prevout else {
                    return Ok(None);
                };
                let origin = match known.get(txin_id) {
                    Some(origin) => *origin,
                    None => {
                        let mut found = None;
                        for candidate in self.store.get_tx_blocks(prevout.tx_id)? {
                            let is_origin = candidate == id
                                || anchor.map_or(false, |anchor| anchor == candidate)
                                || match anchor {
                                    Some(anchor) => {
                                        is_descended_from(&self.store, cache, anchor, candidate)?
                                    }
                                    None => false,
                                };
                            if is_origin {
                                found = Some(candidate);
                                break;
                            }
                        }
                        match found {
                            Some(origin) => {
                                self.store.put_provenance_batch(id, *txin_id, origin, batch)?;
                                origin
                            }
                            None => return Ok(None),
                        }
                    }
                };
                let origin_time = if origin == id {
                    block.header.time
                } else {
                    self.store
                        .get_block(origin)?
                        .with_context(|| format!("origin block {origin} exists"))?
                        .header
                        .time
                };
                let value = self
                    .store
                    .get_txout(prevout.tx_id, prevout.n)?
                    .context("linked prevout exists")?
                    .value;
                total += value as i128 * (block.header.time - origin_time) as i128;
            }
        }
        Ok(Some(total))
    }

    /// Propagate a block's snapshot to every stored descendant, iteratively
    ///
    /// Returns the heaviest block found anywhere in the subtree (including
    /// the trigger), the candidate the resolver compares against each chain's
    /// tip.
    pub fn adopt_descendants(
        &self,
        trigger: BlockId,
    ) -> anyhow::Result<(BlockId, Option<ChainWork>)> {
        let mut cache = AncestryCache::default();
        let trigger_block = self
            .store
            .get_block(trigger)?
            .with_context(|| format!("block {trigger} exists"))?;
        let mut best = (
            trigger,
            trigger_block
                .cumulative
                .as_ref()
                .and_then(|c| c.chain_work.clone()),
        );

        let mut queue = VecDeque::from([(trigger, trigger_block)]);
        while let Some((parent_id, parent)) = queue.pop_front() {
            for child_id in self.store.get_block_children(parent_id)? {
                let mut child = self
                    .store
                    .get_block(child_id)?
                    .with_context(|| format!("child block {child_id} exists"))?;
                let before = child.clone();
                let mut batch = WriteBatch::default();
                self.recompute_block(
                    &mut cache,
                    child_id,
                    &mut child,
                    Some((parent_id, &parent)),
                    &mut batch,
                )?;
                if child != before {
                    trace!("Propagating stats to descendant {}", child.summary());
                    self.store.put_block_batch(child_id, &child, &mut batch)?;
                }
                if !batch.is_empty() {
                    self.store.write_batch(batch)?;
                }

                let work = child.cumulative.as_ref().and_then(|c| c.chain_work.clone());
                if work_improves(&work, &best.1) {
                    best = (child_id, work);
                }
                queue.push_back((child_id, child));
            }
        }
        Ok(best)
    }

    /// Re-derive a healed block's stats and push them down its subtree
    fn refresh_and_cascade(&self, block: BlockId) -> anyhow::Result<()> {
        self.refresh_block(block)?;
        let (top, _) = self.adopt_descendants(block)?;
        for chain in self.policies.keys() {
            if self.store.get_candidate(*chain, block)?.is_some() {
                self.offer_block_to_chain(*chain, top)?;
            }
        }
        Ok(())
    }

    /// Decide whether a candidate block displaces a chain's current tip
    ///
    /// Strict greater-than on cumulative work; ties keep the existing tip.
    pub fn offer_block_to_chain(&self, chain: ChainId, top: BlockId) -> anyhow::Result<()> {
        let chain_record = self
            .store
            .get_chain(chain)?
            .with_context(|| format!("chain {chain} exists"))?;
        let block = self
            .store
            .get_block(top)?
            .with_context(|| format!("block {top} exists"))?;
        let work = block.cumulative.as_ref().and_then(|c| c.chain_work.clone());

        let mut batch = WriteBatch::default();
        match (chain_record.last_block_id, work) {
            // ancestry unresolved: candidate for later reconsideration
            (_, None) => {
                let in_longest = self
                    .store
                    .get_candidate(chain, top)?
                    .map_or(false, |c| c.in_longest);
                self.store.put_candidate_batch(
                    chain,
                    top,
                    &Candidate {
                        in_longest,
                        height: block.height,
                    },
                    &mut batch,
                )?;
            }
            // first tip ever: a connected block seeds the best path outright
            (None, Some(_)) => {
                info!("Chain {chain} starts at {}", block.summary());
                self.apply_reorg(chain, None, top, &mut batch)?;
            }
            (Some(tip_id), Some(_)) if tip_id == top => {
                // repeated offer of the current tip is a repair no-op
                self.store.put_candidate_batch(
                    chain,
                    top,
                    &Candidate {
                        in_longest: true,
                        height: block.height,
                    },
                    &mut batch,
                )?;
            }
            (Some(tip_id), Some(work)) => {
                let tip = self
                    .store
                    .get_block(tip_id)?
                    .with_context(|| format!("tip block {tip_id} exists"))?;
                let tip_work = tip.cumulative.as_ref().and_then(|c| c.chain_work.clone());
                if tip_work.as_ref().map_or(true, |tw| work > *tw) {
                    info!(
                        "Reorg on chain {chain}: {} -> {}",
                        tip.summary(),
                        block.summary()
                    );
                    self.apply_reorg(chain, Some(tip_id), top, &mut batch)?;
                } else {
                    let in_longest = self
                        .store
                        .get_candidate(chain, top)?
                        .map_or(false, |c| c.in_longest);
                    self.store.put_candidate_batch(
                        chain,
                        top,
                        &Candidate {
                            in_longest,
                            height: block.height,
                        },
                        &mut batch,
                    )?;
                }
            }
        }
        self.store.write_batch(batch)
    }

    /// Stage the membership flips moving a chain's best path to `new_top`
    ///
    /// Walks both tips back to their common ancestor, disconnecting the old
    /// side and connecting the new, all within the caller's batch.
    fn apply_reorg(
        &self,
        chain: ChainId,
        old_tip: Option<BlockId>,
        new_top: BlockId,
        batch: &mut WriteBatch,
    ) -> anyhow::Result<()> {
        let mut to_disconnect = vec![];
        let mut to_connect = vec![];
        let mut old = self.load_path_node(old_tip)?;
        let mut new = self.load_path_node(Some(new_top))?;
        loop {
            match (&old, &new) {
                (None, None) => break,
                (Some(o), Some(n)) if o.0 == n.0 => break,
                _ => {
                    let old_height = old.as_ref().map_or(-1, |o| o.1 as i64);
                    let new_height = new.as_ref().map_or(-1, |n| n.1 as i64);
                    if old_height >= new_height {
                        let (id, height, prev) = old.take().context("old path not exhausted")?;
                        to_disconnect.push((id, height));
                        old = self.load_path_node(prev)?;
                    }
                    if new_height >= old_height {
                        let (id, height, prev) = new.take().context("new path not exhausted")?;
                        to_connect.push((id, height));
                        new = self.load_path_node(prev)?;
                    }
                }
            }
        }

        for (id, height) in &to_disconnect {
            self.store.put_candidate_batch(
                chain,
                *id,
                &Candidate {
                    in_longest: false,
                    height: Some(*height),
                },
                batch,
            )?;
            self.store.clear_canonical_at_height_batch(chain, *height, batch);
        }
        // apply root-ward to tip-ward
        for (id, height) in to_connect.iter().rev() {
            self.store.put_candidate_batch(
                chain,
                *id,
                &Candidate {
                    in_longest: true,
                    height: Some(*height),
                },
                batch,
            )?;
            self.store
                .set_canonical_at_height_batch(chain, *height, *id, batch)?;
        }
        self.store.set_chain_tip_batch(chain, new_top, batch)
    }

    #[allow(clippy::type_complexity)]
    fn load_path_node(
        &self,
        id: Option<BlockId>,
    ) -> anyhow::Result<Option<(BlockId, u32, Option<BlockId>)>> {
        match id {
            None => Ok(None),
            Some(id) => {
                let block = self
                    .store
                    .get_block(id)?
                    .with_context(|| format!("path block {id} exists"))?;
                let height = block
                    .height
                    .with_context(|| format!("best-path block {id} is connected"))?;
                Ok(Some((id, height, block.prev_block_id)))
            }
        }
    }

    // query surface

    pub fn get_block_by_hash(
        &self,
        hash: &BlockHash,
    ) -> anyhow::Result<Option<(BlockId, BlockRecord)>> {
        self.store.get_block_by_hash(hash)
    }

    pub fn get_chain_tip(&self, chain: ChainId) -> anyhow::Result<Option<BlockId>> {
        self.store.get_chain_tip(chain)
    }

    /// Cumulative stats with explicit unknowns, never fabricated zeros
    pub fn get_cumulative_stats(&self, block: BlockId) -> anyhow::Result<Option<Cumulative>> {
        Ok(self.store.get_block(block)?.and_then(|b| b.cumulative))
    }

    pub fn is_in_best_chain(&self, chain: ChainId, block: BlockId) -> anyhow::Result<bool> {
        self.store.is_in_best_chain(chain, block)
    }

    /// `None` if the block was never offered to the chain
    pub fn get_block_canonicity(
        &self,
        chain: ChainId,
        block: BlockId,
    ) -> anyhow::Result<Option<Canonicity>> {
        Ok(self
            .store
            .get_candidate(chain, block)?
            .map(|candidate| candidate.canonicity()))
    }
}

fn work_improves(candidate: &Option<ChainWork>, best: &Option<ChainWork>) -> bool {
    match (candidate, best) {
        (Some(candidate), Some(best)) => candidate > best,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Staging context for one block import
///
/// Batched writes are invisible to store reads until commit, so every record
/// staged during the import is mirrored here and consulted before the store.
struct ImportCtx<'a> {
    store: &'a IndexerStore,
    batch: WriteBatch,
    tx_ids: HashMap<TxHash, TxId>,
    txs: HashMap<TxId, TxRecord>,
    txouts: HashMap<(TxId, u32), TxOutRecord>,
    txins: HashMap<TxInId, TxInRecord>,
    tx_blocks: HashMap<TxId, Vec<BlockId>>,
    unlinked: HashMap<TxHash, Vec<TxInId>>,
    blocks: HashMap<BlockId, BlockRecord>,
    /// Already-committed blocks whose inputs linked during this import
    healed_blocks: Vec<BlockId>,
}

impl<'a> ImportCtx<'a> {
    fn new(store: &'a IndexerStore) -> Self {
        Self {
            store,
            batch: WriteBatch::default(),
            tx_ids: HashMap::new(),
            txs: HashMap::new(),
            txouts: HashMap::new(),
            txins: HashMap::new(),
            tx_blocks: HashMap::new(),
            unlinked: HashMap::new(),
            blocks: HashMap::new(),
            healed_blocks: vec![],
        }
    }

    fn get_tx_id(&self, hash: &TxHash) -> anyhow::Result<Option<TxId>> {
        match self.tx_ids.get(hash) {
            Some(id) => Ok(Some(*id)),
            None => self.store.get_tx_id(hash),
        }
    }

    fn get_tx(&self, id: TxId) -> anyhow::Result<Option<TxRecord>> {
        match self.txs.get(&id) {
            Some(tx) => Ok(Some(tx.clone())),
            None => self.store.get_tx(id),
        }
    }

    fn put_tx(&mut self, id: TxId, tx: TxRecord) -> anyhow::Result<()> {
        self.store.put_tx_batch(id, &tx, &mut self.batch)?;
        self.tx_ids.insert(tx.hash, id);
        self.txs.insert(id, tx);
        Ok(())
    }

    fn get_txout(&self, tx_id: TxId, n: u32) -> anyhow::Result<Option<TxOutRecord>> {
        match self.txouts.get(&(tx_id, n)) {
            Some(txout) => Ok(Some(txout.clone())),
            None => self.store.get_txout(tx_id, n),
        }
    }

    fn put_txout(&mut self, tx_id: TxId, n: u32, txout: TxOutRecord) -> anyhow::Result<()> {
        self.store.put_txout_batch(tx_id, n, &txout, &mut self.batch)?;
        self.txouts.insert((tx_id, n), txout);
        Ok(())
    }

    fn get_txin(&self, id: TxInId) -> anyhow::Result<Option<TxInRecord>> {
        match self.txins.get(&id) {
            Some(txin) => Ok(Some(txin.clone())),
            None => self.store.get_txin(id),
        }
    }

    fn put_txin(&mut self, id: TxInId, txin: TxInRecord) -> anyhow::Result<()> {
        self.store.put_txin_batch(id, &txin, &mut self.batch)?;
        self.txins.insert(id, txin);
        Ok(())
    }

    fn get_tx_blocks(&self, tx_id: TxId) -> anyhow::Result<Vec<BlockId>> {
        match self.tx_blocks.get(&tx_id) {
            Some(blocks) => Ok(blocks.clone()),
            None => self.store.get_tx_blocks(tx_id),
        }
    }

    fn add_tx_block(&mut self, tx_id: TxId, block: BlockId) -> anyhow::Result<()> {
        let mut blocks = self.get_tx_blocks(tx_id)?;
        if !blocks.contains(&block) {
            blocks.push(block);
        }
        self.store
            .put_tx_blocks_batch(tx_id, &blocks, &mut self.batch)?;
        self.tx_blocks.insert(tx_id, blocks);
        Ok(())
    }

    fn get_unlinked(&self, hash: &TxHash) -> anyhow::Result<Vec<TxInId>> {
        match self.unlinked.get(hash) {
            Some(waiting) => Ok(waiting.clone()),
            None => self.store.get_unlinked_txins(hash),
        }
    }

    fn put_unlinked(&mut self, hash: &TxHash, waiting: Vec<TxInId>) -> anyhow::Result<()> {
        self.store
            .put_unlinked_txins_batch(hash, &waiting, &mut self.batch)?;
        self.unlinked.insert(*hash, waiting);
        Ok(())
    }

    fn get_block(&self, id: BlockId) -> anyhow::Result<Option<BlockRecord>> {
        match self.blocks.get(&id) {
            Some(block) => Ok(Some(block.clone())),
            None => self.store.get_block(id),
        }
    }

    fn put_block(&mut self, id: BlockId, block: BlockRecord) -> anyhow::Result<()> {
        self.store.put_block_batch(id, &block, &mut self.batch)?;
        self.blocks.insert(id, block);
        Ok(())
    }
}
