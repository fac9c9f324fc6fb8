pub mod block;
pub mod canonicity;
pub mod chain;
pub mod constants;
pub mod state;
pub mod stats;
pub mod store;
pub mod tx;
