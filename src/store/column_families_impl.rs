use super::{column_families::ColumnFamilyHelpers, IndexerStore};
use speedb::ColumnFamily;

impl ColumnFamilyHelpers for IndexerStore {
    fn blocks_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("blocks")
            .expect("blocks column family exists")
    }

    fn blocks_hash_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("blocks-hash")
            .expect("blocks-hash column family exists")
    }

    fn blocks_children_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("blocks-children")
            .expect("blocks-children column family exists")
    }

    fn blocks_orphans_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("blocks-orphans")
            .expect("blocks-orphans column family exists")
    }

    fn chains_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("chains")
            .expect("chains column family exists")
    }

    fn chain_candidates_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("chain-candidates")
            .expect("chain-candidates column family exists")
    }

    fn canonicity_length_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("canonicity-length")
            .expect("canonicity-length column family exists")
    }

    fn txs_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("txs")
            .expect("txs column family exists")
    }

    fn txs_hash_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("txs-hash")
            .expect("txs-hash column family exists")
    }

    fn txs_blocks_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("txs-blocks")
            .expect("txs-blocks column family exists")
    }

    fn txouts_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("txouts")
            .expect("txouts column family exists")
    }

    fn txins_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("txins")
            .expect("txins column family exists")
    }

    fn txins_unlinked_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("txins-unlinked")
            .expect("txins-unlinked column family exists")
    }

    fn txins_provenance_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("txins-provenance")
            .expect("txins-provenance column family exists")
    }
}
