pub trait FixedKeys {
    const NEXT_BLOCK_ID_KEY: &'static [u8] = "next_block_id".as_bytes();
    const NEXT_TX_ID_KEY: &'static [u8] = "next_tx_id".as_bytes();
    const NEXT_TXIN_ID_KEY: &'static [u8] = "next_txin_id".as_bytes();
}
