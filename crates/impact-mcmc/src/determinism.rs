use impact_core::derive_substream_seed;

const EXCHANGE_SALT: u64 = 0xA5A5_A5A5_A5A5_A5A5;
const INITIAL_SALT: u64 = 0x3C3C_3C3C_3C3C_3C3C;
const REFINE_SALT: u64 = 0x5A5A_5A5A_5A5A_5A5A;

/// Seed of the proposal stream used by a state slot during one outer
/// iteration. Keyed by slot rather than rank so that a chain's stream does
/// not depend on where exchanges have moved it.
pub fn chain_seed(master_seed: u64, slot: usize, iteration: usize) -> u64 {
    let intermediate = derive_substream_seed(master_seed, slot as u64);
    derive_substream_seed(intermediate, iteration as u64)
}

/// Seed for the exchange attempt between ranks `pair` and `pair + 1`.
pub fn exchange_seed(master_seed: u64, iteration: usize, pair: usize) -> u64 {
    let intermediate = derive_substream_seed(master_seed ^ EXCHANGE_SALT, iteration as u64);
    derive_substream_seed(intermediate, pair as u64)
}

/// Seed for drawing the initial state of a slot.
pub fn initial_seed(master_seed: u64, slot: usize) -> u64 {
    derive_substream_seed(master_seed ^ INITIAL_SALT, slot as u64)
}

/// Seed handed to the spectral-line provider for a slot and iteration.
pub fn refinement_seed(master_seed: u64, slot: usize, iteration: usize) -> u64 {
    let intermediate = derive_substream_seed(master_seed ^ REFINE_SALT, slot as u64);
    derive_substream_seed(intermediate, iteration as u64)
}
