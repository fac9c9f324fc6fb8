mod blocks;
mod txs;
