mod ancestry;
mod linear_chain;
mod rejects;
mod reorg;
mod unlinked_inputs;
