use speedb::ColumnFamily;

pub trait ColumnFamilyHelpers {
    /// CF for storing block records: `block id -> BlockRecord`
    fn blocks_cf(&self) -> &ColumnFamily;

    /// CF for the block hash index: `hash -> block id`
    fn blocks_hash_cf(&self) -> &ColumnFamily;

    /// CF for the children index: `block id -> Vec<block id>`
    fn blocks_children_cf(&self) -> &ColumnFamily;

    /// CF for orphans awaiting a parent: `parent hash -> Vec<block id>`
    fn blocks_orphans_cf(&self) -> &ColumnFamily;

    /// CF for chain records: `chain id -> ChainRecord`
    fn chains_cf(&self) -> &ColumnFamily;

    /// CF for candidate rows: `chain id ++ block id -> Candidate`
    fn chain_candidates_cf(&self) -> &ColumnFamily;

    /// CF for the best path by height: `chain id ++ height -> block id`
    fn canonicity_length_cf(&self) -> &ColumnFamily;

    /// CF for tx records: `tx id -> TxRecord`
    fn txs_cf(&self) -> &ColumnFamily;

    /// CF for the tx hash index: `hash -> tx id`
    fn txs_hash_cf(&self) -> &ColumnFamily;

    /// CF for blocks containing a tx: `tx id -> Vec<block id>`
    fn txs_blocks_cf(&self) -> &ColumnFamily;

    /// CF for outputs: `tx id ++ n -> TxOutRecord`
    fn txouts_cf(&self) -> &ColumnFamily;

    /// CF for inputs: `txin id -> TxInRecord`
    fn txins_cf(&self) -> &ColumnFamily;

    /// CF for unlinked-input retry: `prevout tx hash -> Vec<txin id>`
    fn txins_unlinked_cf(&self) -> &ColumnFamily;

    /// CF for input provenance: `block id ++ txin id -> origin block id`
    fn txins_provenance_cf(&self) -> &ColumnFamily;
}
